//! Declarative styles and their resolution into CSS rules.
//!
//! A [`Style`] is a set of declarations plus the conditions under which they
//! apply. Resolving it against a set of [`Breakpoints`] yields a
//! [`ResolvedStyle`] with concrete media conditions, selector guards, and a
//! generated class name:
//!
//! ```text
//! Style { color: red } when [Dark, Breakpoint(Medium), Theme("Ocean")]
//!   → .style-1a2b3c4d
//!   → @media (prefers-color-scheme: dark) and (min-width: 768px) {
//!         [data-theme-state="ocean"] .style-1a2b3c4d { color: red; }
//!     }
//! ```
//!
//! The class name is a SHA-256 digest of the canonical rule text, so every
//! use of an identical style across a build collapses to one rule in the
//! [`StyleSheet`], and any difference in declarations or conditions yields a
//! different name.

use crate::attributes::InlineStyle;
use crate::theme::{Breakpoint, Breakpoints, theme_selector};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Preference {
    Reduce,
    NoPreference,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Contrast {
    NoPreference,
    More,
    Less,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Orientation {
    Portrait,
    Landscape,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DisplayMode {
    Browser,
    Fullscreen,
    MinimalUi,
    PictureInPicture,
    Standalone,
}

/// A condition a style can be guarded by.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MediaQuery {
    DarkScheme,
    LightScheme,
    ReducedMotion(Preference),
    ReducedTransparency(Preference),
    Contrast(Contrast),
    Orientation(Orientation),
    DisplayMode(DisplayMode),
    Breakpoint(Breakpoint),
    /// `(min-width: <value>)` with an explicit length.
    MinWidth(String),
    /// Scopes the style to a theme id; resolves to a selector, not `@media`.
    Theme(String),
}

/// A resolved [`MediaQuery`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Condition {
    Media(String),
    Selector(String),
}

fn preference(value: Preference, reduce: &str) -> &str {
    match value {
        Preference::Reduce => reduce,
        Preference::NoPreference => "no-preference",
    }
}

impl MediaQuery {
    pub fn resolve(&self, breakpoints: &Breakpoints) -> Condition {
        let media = match self {
            MediaQuery::DarkScheme => "prefers-color-scheme: dark".to_string(),
            MediaQuery::LightScheme => "prefers-color-scheme: light".to_string(),
            MediaQuery::ReducedMotion(p) => {
                format!("prefers-reduced-motion: {}", preference(*p, "reduce"))
            }
            MediaQuery::ReducedTransparency(p) => {
                format!("prefers-reduced-transparency: {}", preference(*p, "reduce"))
            }
            MediaQuery::Contrast(c) => format!(
                "prefers-contrast: {}",
                match c {
                    Contrast::NoPreference => "no-preference",
                    Contrast::More => "more",
                    Contrast::Less => "less",
                }
            ),
            MediaQuery::Orientation(o) => format!(
                "orientation: {}",
                match o {
                    Orientation::Portrait => "portrait",
                    Orientation::Landscape => "landscape",
                }
            ),
            MediaQuery::DisplayMode(mode) => format!(
                "display-mode: {}",
                match mode {
                    DisplayMode::Browser => "browser",
                    DisplayMode::Fullscreen => "fullscreen",
                    DisplayMode::MinimalUi => "minimal-ui",
                    DisplayMode::PictureInPicture => "picture-in-picture",
                    DisplayMode::Standalone => "standalone",
                }
            ),
            MediaQuery::Breakpoint(bp) => format!("min-width: {}", breakpoints.value(*bp)),
            MediaQuery::MinWidth(value) => format!("min-width: {value}"),
            MediaQuery::Theme(id) => return Condition::Selector(theme_selector(id)),
        };
        Condition::Media(format!("({media})"))
    }
}

/// A declarative, unresolved style.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct Style {
    declarations: Vec<InlineStyle>,
    conditions: Vec<MediaQuery>,
}

impl Style {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a declaration. Empty values are ignored; a repeated property keeps
    /// its position and takes the new value.
    pub fn declaration(mut self, property: impl Into<String>, value: impl Into<String>) -> Self {
        let declaration = InlineStyle::new(property, value);
        if declaration.property.trim().is_empty() || declaration.value.trim().is_empty() {
            return self;
        }
        match self
            .declarations
            .iter_mut()
            .find(|d| d.property == declaration.property)
        {
            Some(existing) => existing.value = declaration.value,
            None => self.declarations.push(declaration),
        }
        self
    }

    /// AND a condition onto any existing ones.
    pub fn when(mut self, query: MediaQuery) -> Self {
        if !self.conditions.contains(&query) {
            self.conditions.push(query);
        }
        self
    }

    pub fn for_theme(self, id: impl Into<String>) -> Self {
        self.when(MediaQuery::Theme(id.into()))
    }

    /// Combine two styles: declarations merge with `other` winning per
    /// property, conditions are ANDed.
    pub fn merged(mut self, other: &Style) -> Self {
        for declaration in &other.declarations {
            self = self.declaration(declaration.property.clone(), declaration.value.clone());
        }
        for condition in &other.conditions {
            self = self.when(condition.clone());
        }
        self
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub fn declarations(&self) -> &[InlineStyle] {
        &self.declarations
    }

    pub fn resolve(&self, breakpoints: &Breakpoints) -> ResolvedStyle {
        let mut media_queries = Vec::new();
        let mut selectors = Vec::new();
        for condition in &self.conditions {
            match condition.resolve(breakpoints) {
                Condition::Media(m) => media_queries.push(m),
                Condition::Selector(s) => selectors.push(s),
            }
        }
        ResolvedStyle::new(self.declarations.clone(), media_queries, selectors)
    }
}

/// Concrete CSS produced from a [`Style`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResolvedStyle {
    pub declarations: Vec<InlineStyle>,
    pub media_queries: Vec<String>,
    pub selectors: Vec<String>,
    pub class_name: String,
}

impl ResolvedStyle {
    pub fn new(
        declarations: Vec<InlineStyle>,
        media_queries: Vec<String>,
        selectors: Vec<String>,
    ) -> Self {
        let mut resolved = Self {
            declarations,
            media_queries,
            selectors,
            class_name: String::new(),
        };
        resolved.class_name = format!("style-{}", short_digest(&resolved.canonical()));
        resolved
    }

    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    fn canonical(&self) -> String {
        let declarations: Vec<String> =
            self.declarations.iter().map(InlineStyle::to_string).collect();
        format!(
            "{}|{}|{}",
            declarations.join(";"),
            self.media_queries.join(" and "),
            self.selectors.join("")
        )
    }

    /// The full rule text, or an empty string for a style with no
    /// declarations.
    pub fn css_rule(&self) -> String {
        if self.declarations.is_empty() {
            return String::new();
        }

        let target = if self.selectors.is_empty() {
            format!(".{}", self.class_name)
        } else {
            format!("{} .{}", self.selectors.join(""), self.class_name)
        };

        let indent = if self.media_queries.is_empty() { "" } else { "    " };
        let mut rule = format!("{indent}{target} {{\n");
        for declaration in &self.declarations {
            rule.push_str(&format!("{indent}    {declaration};\n"));
        }
        rule.push_str(&format!("{indent}}}\n"));

        if self.media_queries.is_empty() {
            rule
        } else {
            format!("@media {} {{\n{rule}}}\n", self.media_queries.join(" and "))
        }
    }
}

fn short_digest(text: &str) -> String {
    let digest = Sha256::digest(text.as_bytes());
    digest[..4].iter().map(|b| format!("{b:02x}")).collect()
}

/// Deduplicated collection of generated rules, keyed by class name.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StyleSheet {
    rules: BTreeMap<String, String>,
}

impl StyleSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a rule and return the class that activates it, or `None` for an
    /// empty style.
    pub fn register(&mut self, style: &ResolvedStyle) -> Option<String> {
        if style.is_empty() {
            return None;
        }
        self.rules
            .entry(style.class_name.clone())
            .or_insert_with(|| style.css_rule());
        Some(style.class_name.clone())
    }

    pub fn extend(&mut self, other: StyleSheet) {
        for (class, rule) in other.rules {
            self.rules.entry(class).or_insert(rule);
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn to_css(&self) -> String {
        self.rules.values().cloned().collect::<Vec<_>>().join("\n")
    }
}
