//! Themes, breakpoints, and the generated `css/themes.min.css`.
//!
//! A [`Theme`] is a named set of overrides for the framework's CSS custom
//! properties. Each theme is emitted as a `[data-bs-theme="<id>"]` block; the
//! page's theme-switcher script flips that attribute on `<html>`.
//!
//! ## Breakpoints
//!
//! | Breakpoint | Default |
//! |------------|---------|
//! | small | 576px |
//! | medium | 768px |
//! | large | 992px |
//! | x-large | 1200px |
//! | xx-large | 1400px |
//!
//! A theme may override any of them. With `cascade = true` (the default), an
//! unset breakpoint inherits the closest smaller breakpoint that *was* set,
//! so overriding only `small = "640px"` moves every larger breakpoint that
//! the theme leaves alone to 640px too.

use serde::{Deserialize, Serialize};

/// Responsive breakpoint names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Breakpoint {
    Small,
    Medium,
    Large,
    XLarge,
    XxLarge,
}

impl Breakpoint {
    pub const ALL: [Breakpoint; 5] = [
        Breakpoint::Small,
        Breakpoint::Medium,
        Breakpoint::Large,
        Breakpoint::XLarge,
        Breakpoint::XxLarge,
    ];

    fn index(self) -> usize {
        self as usize
    }

    /// Short suffix used by the container variables (`sm`, `md`, ...).
    pub fn suffix(self) -> &'static str {
        match self {
            Breakpoint::Small => "sm",
            Breakpoint::Medium => "md",
            Breakpoint::Large => "lg",
            Breakpoint::XLarge => "xl",
            Breakpoint::XxLarge => "xxl",
        }
    }
}

const DEFAULT_BREAKPOINTS: [&str; 5] = ["576px", "768px", "992px", "1200px", "1400px"];
const DEFAULT_CONTAINER_WIDTHS: [&str; 5] = ["540px", "720px", "960px", "1140px", "1320px"];

/// Resolved breakpoint widths.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Breakpoints {
    values: [String; 5],
}

impl Default for Breakpoints {
    fn default() -> Self {
        Self {
            values: DEFAULT_BREAKPOINTS.map(str::to_string),
        }
    }
}

impl Breakpoints {
    pub fn value(&self, breakpoint: Breakpoint) -> &str {
        &self.values[breakpoint.index()]
    }

    /// Apply a theme's overrides on top of the defaults.
    pub fn from_overrides(overrides: &BreakpointOverrides) -> Self {
        let explicit = [
            &overrides.small,
            &overrides.medium,
            &overrides.large,
            &overrides.x_large,
            &overrides.xx_large,
        ];

        let mut values = DEFAULT_BREAKPOINTS.map(str::to_string);
        for (index, value) in explicit.iter().enumerate() {
            match value {
                Some(value) => values[index] = value.clone(),
                None if overrides.cascade => {
                    let inherited = explicit[..index].iter().rev().find_map(|v| v.as_ref());
                    if let Some(inherited) = inherited {
                        values[index] = inherited.clone();
                    }
                }
                None => {}
            }
        }
        Self { values }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct BreakpointOverrides {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub x_large: Option<String>,
    pub xx_large: Option<String>,
    pub cascade: bool,
}

impl Default for BreakpointOverrides {
    fn default() -> Self {
        Self {
            small: None,
            medium: None,
            large: None,
            x_large: None,
            xx_large: None,
            cascade: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorScheme {
    #[default]
    Light,
    Dark,
}

/// A site theme loaded from a `[[themes]]` table.
///
/// Every color/font field is optional; unset fields keep the framework
/// default and produce no CSS variable.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Theme {
    pub id: String,
    pub scheme: ColorScheme,
    pub accent: Option<String>,
    pub secondary_accent: Option<String>,
    pub background: Option<String>,
    pub text: Option<String>,
    pub link: Option<String>,
    pub link_hover: Option<String>,
    pub border: Option<String>,
    pub font: Option<String>,
    pub monospace_font: Option<String>,
    pub root_font_size: Option<String>,
    pub body_font_size: Option<String>,
    pub max_widths: ContainerWidths,
    pub breakpoints: BreakpointOverrides,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            id: "light".to_string(),
            scheme: ColorScheme::Light,
            accent: None,
            secondary_accent: None,
            background: None,
            text: None,
            link: None,
            link_hover: None,
            border: None,
            font: None,
            monospace_font: None,
            root_font_size: None,
            body_font_size: None,
            max_widths: ContainerWidths::default(),
            breakpoints: BreakpointOverrides::default(),
        }
    }
}

/// Container max-width overrides per breakpoint.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ContainerWidths {
    pub small: Option<String>,
    pub medium: Option<String>,
    pub large: Option<String>,
    pub x_large: Option<String>,
    pub xx_large: Option<String>,
}

impl ContainerWidths {
    fn get(&self, breakpoint: Breakpoint) -> Option<&String> {
        match breakpoint {
            Breakpoint::Small => self.small.as_ref(),
            Breakpoint::Medium => self.medium.as_ref(),
            Breakpoint::Large => self.large.as_ref(),
            Breakpoint::XLarge => self.x_large.as_ref(),
            Breakpoint::XxLarge => self.xx_large.as_ref(),
        }
    }
}

impl Theme {
    pub fn light(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn dark(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            scheme: ColorScheme::Dark,
            ..Self::default()
        }
    }

    pub fn resolved_breakpoints(&self) -> Breakpoints {
        Breakpoints::from_overrides(&self.breakpoints)
    }

    /// The selector that scopes a style to this theme.
    pub fn selector(&self) -> String {
        theme_selector(&self.id)
    }

    /// `(variable, value)` pairs for every field the theme sets.
    pub fn variables(&self) -> Vec<(String, String)> {
        let mut vars = Vec::new();
        let mut add = |name: &str, value: &Option<String>| {
            if let Some(value) = value {
                vars.push((name.to_string(), value.clone()));
            }
        };

        add("--bs-primary", &self.accent);
        add("--bs-secondary", &self.secondary_accent);
        add("--bs-body-bg", &self.background);
        add("--bs-body-color", &self.text);
        add("--bs-link-color", &self.link);
        add("--bs-link-hover-color", &self.link_hover);
        add("--bs-border-color", &self.border);
        add("--bs-body-font-family", &self.font);
        add("--bs-font-monospace", &self.monospace_font);
        add("--bs-root-font-size", &self.root_font_size);
        add("--bs-body-font-size", &self.body_font_size);

        for breakpoint in Breakpoint::ALL {
            if let Some(width) = self.max_widths.get(breakpoint) {
                vars.push((format!("--bs-container-{}", breakpoint.suffix()), width.clone()));
            }
        }
        vars
    }
}

/// `[data-theme-state="<kebab-cased id>"]`
pub fn theme_selector(id: &str) -> String {
    format!("[data-theme-state=\"{}\"]", kebab_case(id))
}

/// `"OceanBreeze"` / `"ocean breeze"` / `"ocean_breeze"` → `"ocean-breeze"`.
pub fn kebab_case(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 4);
    let mut previous_lower = false;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            if ch.is_uppercase() && previous_lower && !out.ends_with('-') {
                out.push('-');
            }
            out.extend(ch.to_lowercase());
            previous_lower = ch.is_lowercase() || ch.is_numeric();
        } else {
            if !out.is_empty() && !out.ends_with('-') {
                out.push('-');
            }
            previous_lower = false;
        }
    }
    out.trim_end_matches('-').to_string()
}

/// The default `.container` max-widths, overridable through
/// `--bs-container-*` variables.
fn container_defaults() -> String {
    let mut css = String::from(".container {\n");
    for breakpoint in Breakpoint::ALL {
        let index = breakpoint.index();
        css.push_str(&format!(
            "    @media (min-width: {}) {{\n        max-width: var(--bs-container-{}, {});\n    }}\n",
            DEFAULT_BREAKPOINTS[index],
            breakpoint.suffix(),
            DEFAULT_CONTAINER_WIDTHS[index],
        ));
    }
    css.push_str("}\n\n");
    css
}

/// Generate the contents of `css/themes.min.css`. Returns `None` when the
/// site declares no themes.
pub fn generate_themes_css(themes: &[Theme]) -> Option<String> {
    if themes.is_empty() {
        return None;
    }

    let supports_light = themes.iter().any(|t| t.scheme == ColorScheme::Light);
    let supports_dark = themes.iter().any(|t| t.scheme == ColorScheme::Dark);

    let mut css = format!(
        ":root {{\n    --supports-light-theme: {supports_light};\n    --supports-dark-theme: {supports_dark};\n    --bs-root-font-size: 16px;\n    font-size: var(--bs-root-font-size);\n}}\n\n"
    );
    css.push_str(&container_defaults());

    for theme in themes {
        let vars: Vec<String> = theme
            .variables()
            .into_iter()
            .map(|(name, value)| format!("{name}: {value}"))
            .collect();
        css.push_str(&format!(
            "[data-bs-theme=\"{}\"] {{\n    {}\n}}\n\n",
            theme.id,
            vars.join(";\n    ")
        ));
    }
    Some(css)
}
