//! Scoped, typed context for a render pass.
//!
//! Layout code deep inside a page tree needs to know which site it belongs
//! to, which article is being rendered, which tag page it sits on. Rather
//! than threading those through every constructor, they live in an
//! [`Environment`] that the render context carries:
//!
//! ```text
//! baseline (per build)      site config, all content, themes
//!   └── route scope         page metadata, rendering path
//!         └── article scope current article / current tag / http error
//!               └── …       any nested `with_scope` the layout installs
//! ```
//!
//! Keys are types implementing [`EnvironmentKey`]; each declares its value
//! type and a default, so reads never fail. [`Environment::with_scope`]
//! installs a value for the duration of a closure and restores the previous
//! one through a drop guard, which also runs when the closure returns an
//! error or panics.
//!
//! An `Environment` is `!Sync`: concurrent route renders each
//! [`fork`](Environment::fork) their own copy of the baseline instead of
//! sharing one scope stack.

use crate::config::SiteConfig;
use crate::content::{Category, Content, HttpError};
use crate::render::PageMetadata;
use crate::theme::Theme;
use std::any::{Any, TypeId};
use std::cell::RefCell;
use std::collections::HashMap;
use std::sync::Arc;

type Slot = Arc<dyn Any + Send + Sync>;

/// A strongly-typed environment key with a default value.
pub trait EnvironmentKey: 'static {
    type Value: Clone + Send + Sync + 'static;

    /// Used in panic messages when a required value is missing.
    const NAME: &'static str;

    fn default_value() -> Self::Value;
}

#[derive(Clone, Default)]
pub struct Environment {
    values: RefCell<HashMap<TypeId, Slot>>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("keys", &self.values.borrow().len())
            .finish()
    }
}

impl Environment {
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a value, falling back to the key's default.
    pub fn get<K: EnvironmentKey>(&self) -> K::Value {
        self.values
            .borrow()
            .get(&TypeId::of::<K>())
            .and_then(|slot| slot.downcast_ref::<K::Value>())
            .cloned()
            .unwrap_or_else(K::default_value)
    }

    /// Read an `Option`-valued key that must be set in the current scope.
    ///
    /// # Panics
    ///
    /// When no value is installed. Reading a scoped value outside its scope
    /// is a layout bug, not a recoverable condition.
    pub fn require<K, T>(&self) -> T
    where
        K: EnvironmentKey<Value = Option<T>>,
        T: Clone + Send + Sync + 'static,
    {
        match self.get::<K>() {
            Some(value) => value,
            None => panic!(
                "`{}` was read outside of a scope that provides it",
                K::NAME
            ),
        }
    }

    /// Install a baseline value. Used while assembling the per-build
    /// environment, before any scope is opened.
    pub fn set<K: EnvironmentKey>(&mut self, value: K::Value) {
        self.values
            .get_mut()
            .insert(TypeId::of::<K>(), Arc::new(value));
    }

    /// Run `operation` with `key` bound to `value`, restoring the previous
    /// binding afterwards on every exit path.
    pub fn with_scope<K, R>(&self, value: K::Value, operation: impl FnOnce() -> R) -> R
    where
        K: EnvironmentKey,
    {
        let _guard = self.push::<K>(value);
        operation()
    }

    /// Bind `key` until the returned guard is dropped.
    pub fn push<K: EnvironmentKey>(&self, value: K::Value) -> ScopeGuard<'_> {
        let key = TypeId::of::<K>();
        let previous = self.values.borrow_mut().insert(key, Arc::new(value));
        ScopeGuard {
            environment: self,
            key,
            previous,
        }
    }

    /// An independent copy of the current bindings.
    pub fn fork(&self) -> Environment {
        self.clone()
    }
}

/// Restores a key's previous binding on drop.
#[must_use = "the scope ends as soon as the guard is dropped"]
pub struct ScopeGuard<'a> {
    environment: &'a Environment,
    key: TypeId,
    previous: Option<Slot>,
}

impl Drop for ScopeGuard<'_> {
    fn drop(&mut self) {
        let mut values = self.environment.values.borrow_mut();
        match self.previous.take() {
            Some(previous) => {
                values.insert(self.key, previous);
            }
            None => {
                values.remove(&self.key);
            }
        }
    }
}

// ============================================================================
// Built-in keys
// ============================================================================

/// The configuration of the site being published.
pub struct SiteKey;

impl EnvironmentKey for SiteKey {
    type Value = Arc<SiteConfig>;
    const NAME: &'static str = "site";
    fn default_value() -> Self::Value {
        Arc::new(SiteConfig::default())
    }
}

/// Every published piece of content, in load order.
pub struct AllContentKey;

impl EnvironmentKey for AllContentKey {
    type Value = Arc<Vec<Arc<Content>>>;
    const NAME: &'static str = "all content";
    fn default_value() -> Self::Value {
        Arc::new(Vec::new())
    }
}

/// The themes the site declares.
pub struct ThemesKey;

impl EnvironmentKey for ThemesKey {
    type Value = Arc<Vec<Theme>>;
    const NAME: &'static str = "themes";
    fn default_value() -> Self::Value {
        Arc::new(Vec::new())
    }
}

/// The theme whose breakpoints apply to styles resolved in this scope.
pub struct ActiveThemeKey;

impl EnvironmentKey for ActiveThemeKey {
    type Value = Option<Arc<Theme>>;
    const NAME: &'static str = "active theme";
    fn default_value() -> Self::Value {
        None
    }
}

/// Title, description, and canonical URL of the route being rendered.
pub struct PageKey;

impl EnvironmentKey for PageKey {
    type Value = PageMetadata;
    const NAME: &'static str = "page";
    fn default_value() -> Self::Value {
        PageMetadata::default()
    }
}

/// The site-relative path of the route being rendered.
pub struct RenderingPathKey;

impl EnvironmentKey for RenderingPathKey {
    type Value = String;
    const NAME: &'static str = "rendering path";
    fn default_value() -> Self::Value {
        String::new()
    }
}

pub struct ArticleKey;

impl EnvironmentKey for ArticleKey {
    type Value = Option<Arc<Content>>;
    const NAME: &'static str = "article";
    fn default_value() -> Self::Value {
        None
    }
}

/// The tag (or all-tags) listing a tag page is rendering.
pub struct CategoryKey;

impl EnvironmentKey for CategoryKey {
    type Value = Option<Arc<Category>>;
    const NAME: &'static str = "category";
    fn default_value() -> Self::Value {
        None
    }
}

pub struct HttpErrorKey;

impl EnvironmentKey for HttpErrorKey {
    type Value = Option<HttpError>;
    const NAME: &'static str = "http error";
    fn default_value() -> Self::Value {
        None
    }
}
