//! Render context and path rewriting.
//!
//! Every node renders against a [`RenderContext`]: the route's
//! [`Environment`], the site's [`PathRewriter`], and two accumulators (the
//! route's [`StyleSheet`] and its deduplicated warnings). A context lives for
//! exactly one route render; the publishing pipeline collects its
//! accumulators with [`RenderContext::finish`] and reduces them across
//! routes.
//!
//! ## Path rewriting
//!
//! Local paths (leading `/`) are rewritten by two independent settings:
//!
//! | Site URL | `use_relative_paths` | `/css/styles.css` becomes |
//! |----------|----------------------|---------------------------|
//! | `https://example.com` | false | `/css/styles.css` |
//! | `https://example.com` | true | `css/styles.css` |
//! | `https://example.com/subsite` | false | `/subsite/css/styles.css` |
//! | `https://example.com/subsite` | true | `subsite/css/styles.css` |
//!
//! External URLs (`https://…`, `mailto:…`, `//cdn…`) and paths without a
//! leading slash pass through untouched.

use crate::config::SiteConfig;
use crate::content::{Category, Content, HttpError};
use crate::environment::{
    ActiveThemeKey, ArticleKey, CategoryKey, Environment, HttpErrorKey, PageKey, SiteKey,
};
use crate::style::{Style, StyleSheet};
use crate::theme::Breakpoints;
use std::cell::RefCell;
use std::collections::BTreeSet;
use std::sync::Arc;

/// Title, description, and canonical URL of a rendered route.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    /// Absolute canonical URL.
    pub url: String,
    pub image: Option<String>,
}

/// Rewrites site-local paths for subsite mounting and relative linking.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PathRewriter {
    prefix: String,
    relative: bool,
}

impl PathRewriter {
    /// `base_url`'s path component becomes the subsite prefix.
    pub fn new(base_url: &str, relative: bool) -> Self {
        Self {
            prefix: url_path(base_url),
            relative,
        }
    }

    pub fn from_config(config: &SiteConfig) -> Self {
        Self::new(&config.url, config.use_relative_paths)
    }

    /// `/subsite`, or empty for a root-mounted site.
    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    pub fn rewrite(&self, path: &str) -> String {
        if path.is_empty() || is_external(path) || !path.starts_with('/') {
            return path.to_string();
        }
        let full = format!("{}{}", self.prefix, path);
        if self.relative {
            full.trim_start_matches('/').to_string()
        } else {
            full
        }
    }
}

/// The path component of a URL without its trailing slash: `/subsite`.
pub fn url_path(url: &str) -> String {
    let without_scheme = match url.find("://") {
        Some(index) => &url[index + 3..],
        None => url,
    };
    let path = match without_scheme.find('/') {
        Some(index) => &without_scheme[index..],
        None => "",
    };
    let path = path.split(['?', '#']).next().unwrap_or("");
    path.trim_end_matches('/').to_string()
}

/// True for anything with a URL scheme or a protocol-relative `//` prefix.
pub fn is_external(path: &str) -> bool {
    if path.starts_with("//") {
        return true;
    }
    match path.find(':') {
        Some(index) if index > 0 => {
            let scheme = &path[..index];
            scheme.starts_with(|c: char| c.is_ascii_alphabetic())
                && scheme
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '+' | '-' | '.'))
        }
        _ => false,
    }
}

/// Join a site base URL and a site-relative path into an absolute URL.
pub fn absolute_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let path = path.trim_start_matches('/');
    if path.is_empty() {
        format!("{base}/")
    } else {
        format!("{base}/{path}")
    }
}

pub struct RenderContext {
    environment: Environment,
    paths: PathRewriter,
    styles: RefCell<StyleSheet>,
    warnings: RefCell<BTreeSet<String>>,
}

impl RenderContext {
    /// Path settings are taken from the environment's site configuration.
    pub fn new(environment: Environment) -> Self {
        let paths = PathRewriter::from_config(&environment.get::<SiteKey>());
        Self {
            environment,
            paths,
            styles: RefCell::new(StyleSheet::new()),
            warnings: RefCell::new(BTreeSet::new()),
        }
    }

    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    pub fn site(&self) -> Arc<SiteConfig> {
        self.environment.get::<SiteKey>()
    }

    pub fn page(&self) -> PageMetadata {
        self.environment.get::<PageKey>()
    }

    /// The article being rendered.
    ///
    /// # Panics
    ///
    /// Outside an article route.
    pub fn article(&self) -> Arc<Content> {
        self.environment.require::<ArticleKey, _>()
    }

    /// The tag listing being rendered.
    ///
    /// # Panics
    ///
    /// Outside a tag route.
    pub fn category(&self) -> Arc<Category> {
        self.environment.require::<CategoryKey, _>()
    }

    /// # Panics
    ///
    /// Outside an error route.
    pub fn http_error(&self) -> HttpError {
        self.environment.require::<HttpErrorKey, _>()
    }

    pub fn paths(&self) -> &PathRewriter {
        &self.paths
    }

    pub fn path(&self, path: &str) -> String {
        self.paths.rewrite(path)
    }

    /// Resolve `style` against the active theme's breakpoints (or the
    /// defaults) and register it; returns the class to apply.
    pub fn register_style(&self, style: &Style) -> Option<String> {
        let resolved = style.resolve(&self.breakpoints());
        self.styles.borrow_mut().register(&resolved)
    }

    pub fn breakpoints(&self) -> Breakpoints {
        self.environment
            .get::<ActiveThemeKey>()
            .map(|theme| theme.resolved_breakpoints())
            .unwrap_or_default()
    }

    pub fn add_warning(&self, message: impl Into<String>) {
        self.warnings.borrow_mut().insert(message.into());
    }

    /// Consume the context, returning the styles and warnings gathered.
    pub fn finish(self) -> (StyleSheet, BTreeSet<String>) {
        (self.styles.into_inner(), self.warnings.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::style::Style;
    use crate::test_helpers::context_for;
    use crate::theme::{BreakpointOverrides, Theme};

    // =========================================================================
    // Path rewriting
    // =========================================================================

    #[test]
    fn root_site_absolute_paths_unchanged() {
        let paths = PathRewriter::new("https://example.com", false);
        assert_eq!(paths.rewrite("/js/test.js"), "/js/test.js");
    }

    #[test]
    fn root_site_relative_paths_strip_slash() {
        let paths = PathRewriter::new("https://example.com", true);
        assert_eq!(paths.rewrite("/js/test.js"), "js/test.js");
    }

    #[test]
    fn subsite_absolute() {
        let paths = PathRewriter::new("https://example.com/subsite", false);
        assert_eq!(paths.rewrite("/css/styles.css"), "/subsite/css/styles.css");
    }

    #[test]
    fn subsite_relative() {
        let paths = PathRewriter::new("https://example.com/subsite/", true);
        assert_eq!(paths.rewrite("/css/styles.css"), "subsite/css/styles.css");
    }

    #[test]
    fn external_urls_never_rewritten() {
        for relative in [false, true] {
            let paths = PathRewriter::new("https://example.com/subsite", relative);
            for url in [
                "https://cdn.example.org/lib.js",
                "http://example.org",
                "mailto:someone@example.com",
                "//cdn.example.org/x.css",
            ] {
                assert_eq!(paths.rewrite(url), url);
            }
        }
    }

    #[test]
    fn paths_without_leading_slash_and_empty_unchanged() {
        let paths = PathRewriter::new("https://example.com/subsite", false);
        assert_eq!(paths.rewrite("images/a.png"), "images/a.png");
        assert_eq!(paths.rewrite(""), "");
        assert_eq!(paths.rewrite("#top"), "#top");
    }

    #[test]
    fn url_path_extraction() {
        assert_eq!(url_path("https://example.com"), "");
        assert_eq!(url_path("https://example.com/"), "");
        assert_eq!(url_path("https://example.com/a/b/"), "/a/b");
        assert_eq!(url_path("https://example.com/a?x=1"), "/a");
    }

    #[test]
    fn absolute_url_joins_cleanly() {
        assert_eq!(absolute_url("https://example.com/", "/about"), "https://example.com/about");
        assert_eq!(absolute_url("https://example.com", ""), "https://example.com/");
    }

    // =========================================================================
    // Context
    // =========================================================================

    #[test]
    fn context_reads_paths_from_site() {
        let cx = context_for("https://example.com/docs", true);
        assert_eq!(cx.path("/index.html"), "docs/index.html");
        assert_eq!(cx.paths().prefix(), "/docs");
    }

    #[test]
    fn register_style_uses_active_theme_breakpoints() {
        use crate::environment::ActiveThemeKey;
        use crate::style::MediaQuery;
        use crate::theme::Breakpoint;

        let cx = context_for("https://example.com", false);
        let mut theme = Theme::light("narrow");
        theme.breakpoints = BreakpointOverrides {
            medium: Some("600px".into()),
            ..Default::default()
        };
        let style = Style::new()
            .declaration("color", "red")
            .when(MediaQuery::Breakpoint(Breakpoint::Medium));

        cx.environment()
            .with_scope::<ActiveThemeKey, _>(Some(Arc::new(theme)), || cx.register_style(&style));
        let (sheet, _) = cx.finish();
        assert!(sheet.to_css().contains("(min-width: 600px)"));
    }

    #[test]
    fn warnings_are_deduplicated() {
        let cx = context_for("https://example.com", false);
        cx.add_warning("same");
        cx.add_warning("same");
        let (_, warnings) = cx.finish();
        assert_eq!(warnings.len(), 1);
    }

    #[test]
    #[should_panic(expected = "`article` was read outside of a scope")]
    fn article_outside_scope_fails_fast() {
        let cx = context_for("https://example.com", false);
        cx.article();
    }
}
