//! Site configuration module.
//!
//! Handles loading, validating, and merging the project's `config.toml`.
//! The file's presence also marks the project root: a source directory
//! without one is not a site.
//!
//! ## Project Layout
//!
//! ```text
//! my-site/
//! ├── config.toml        # Site configuration (required marker)
//! ├── content/           # Markdown content, one route per file
//! │   ├── about.md
//! │   └── posts/
//! │       └── hello.md
//! └── assets/            # Copied verbatim into the build
//!     └── images/
//! ```
//!
//! ## Configuration Options
//!
//! ```toml
//! name = "My Site"
//! url = "https://example.com/blog"   # path component becomes the subsite prefix
//! use_relative_paths = false
//!
//! [feed]
//! mode = "full"                      # or "description-only"
//! content_count = 20
//!
//! [[robots.disallow]]
//! agent = "GPTBot"
//! paths = ["*"]
//!
//! [[themes]]
//! id = "light"
//! scheme = "light"
//! accent = "#0d6efd"
//! ```
//!
//! ## Partial Configuration
//!
//! Config files are sparse. Only the keys you set override the stock
//! defaults; unknown keys are rejected to catch typos early. Arrays such as
//! `themes` replace the default list as a whole.

use crate::theme::Theme;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Site configuration loaded from `config.toml`.
///
/// All fields have defaults. Unknown keys are rejected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SiteConfig {
    /// Site name, used in titles, the feed, and the manifest.
    pub name: String,
    /// Appended to every page title, e.g. `" - My Site"`.
    pub title_suffix: String,
    pub description: String,
    pub author: String,
    /// BCP 47 language tag for `<html lang>`.
    pub language: String,
    /// Base URL. Its path component is the subsite prefix.
    pub url: String,
    /// Emit local links without a leading slash.
    pub use_relative_paths: bool,
    /// IANA time zone name, informational only.
    pub time_zone: Option<String>,
    /// Site-relative path of the favicon.
    pub favicon: Option<String>,
    /// Include the icon font stylesheet.
    pub builtin_icons: bool,
    /// Directory under the project root holding Markdown content.
    pub content_root: String,
    pub feed: FeedConfig,
    pub robots: RobotsConfig,
    pub manifest: ManifestConfig,
    pub themes: Vec<Theme>,
    pub processing: ProcessingConfig,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            name: "My Site".to_string(),
            title_suffix: String::new(),
            description: String::new(),
            author: String::new(),
            language: "en".to_string(),
            url: "https://example.com".to_string(),
            use_relative_paths: false,
            time_zone: None,
            favicon: None,
            builtin_icons: false,
            content_root: "content".to_string(),
            feed: FeedConfig::default(),
            robots: RobotsConfig::default(),
            manifest: ManifestConfig::default(),
            themes: vec![Theme::light("light"), Theme::dark("dark")],
            processing: ProcessingConfig::default(),
        }
    }
}

impl SiteConfig {
    /// Validate config values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.name.trim().is_empty() {
            return Err(ConfigError::Validation("name must not be empty".into()));
        }
        if !(self.url.starts_with("https://") || self.url.starts_with("http://")) {
            return Err(ConfigError::Validation(format!(
                "url must start with http:// or https://, got {:?}",
                self.url
            )));
        }
        if self.feed.content_count == 0 {
            return Err(ConfigError::Validation(
                "feed.content_count must be greater than zero".into(),
            ));
        }
        if let Some(image) = &self.feed.image {
            if image.width > FeedImage::MAX_WIDTH || image.height > FeedImage::MAX_HEIGHT {
                return Err(ConfigError::Validation(format!(
                    "feed.image must be at most {}x{} pixels",
                    FeedImage::MAX_WIDTH,
                    FeedImage::MAX_HEIGHT
                )));
            }
        }
        if self.themes.is_empty() {
            return Err(ConfigError::Validation(
                "at least one light or dark theme is required".into(),
            ));
        }
        let mut ids = HashSet::new();
        for theme in &self.themes {
            if theme.id.trim().is_empty() {
                return Err(ConfigError::Validation("theme ids must not be empty".into()));
            }
            if !ids.insert(theme.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate theme id {:?}",
                    theme.id
                )));
            }
        }
        Ok(())
    }

    /// A page title followed by `title_suffix`.
    pub fn full_title(&self, title: &str) -> String {
        format!("{title}{}", self.title_suffix)
    }

    /// The theme a page shows before any switching happens.
    pub fn default_theme(&self) -> Option<&Theme> {
        self.themes.first()
    }
}

/// Parallel processing settings.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ProcessingConfig {
    /// Maximum number of parallel render workers.
    /// When absent, defaults to the number of CPU cores.
    /// Values larger than the core count are clamped down.
    pub max_threads: Option<usize>,
}

/// Resolve the effective thread count from config.
///
/// - `None` → use all available cores
/// - `Some(n)` → use `min(n, cores)` (user can constrain down, not up)
pub fn effective_threads(config: &ProcessingConfig) -> usize {
    let cores = std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1);
    config
        .max_threads
        .map(|n| n.clamp(1, cores))
        .unwrap_or(cores)
}

/// How much of each article the feed carries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FeedMode {
    /// Description plus the full rendered body.
    #[default]
    Full,
    /// Description only.
    DescriptionOnly,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FeedConfig {
    pub enabled: bool,
    pub mode: FeedMode,
    /// Newest items to include.
    pub content_count: usize,
    /// Site-relative output path.
    pub path: String,
    pub image: Option<FeedImage>,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            mode: FeedMode::Full,
            content_count: 20,
            path: "/feed.rss".to_string(),
            image: None,
        }
    }
}

/// RSS channel image. RSS caps these at 144x400.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FeedImage {
    pub url: String,
    pub width: u32,
    pub height: u32,
}

impl FeedImage {
    pub const MAX_WIDTH: u32 = 144;
    pub const MAX_HEIGHT: u32 = 400;
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RobotsConfig {
    pub disallow: Vec<DisallowRule>,
}

/// Paths a user agent may not crawl. `*` (or an empty list) blocks
/// everything.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DisallowRule {
    pub agent: String,
    #[serde(default)]
    pub paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ManifestConfig {
    pub enabled: bool,
    /// Defaults to the site name.
    pub short_name: Option<String>,
    pub theme_color: String,
    pub background_color: String,
    pub categories: Vec<String>,
    pub icons: Vec<ManifestIcon>,
}

impl Default for ManifestConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            short_name: None,
            theme_color: "#ffffff".to_string(),
            background_color: "#ffffff".to_string(),
            categories: Vec::new(),
            icons: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ManifestIcon {
    /// Site-relative path.
    pub src: String,
    /// e.g. `"192x192"`.
    pub sizes: String,
    #[serde(rename = "type", default = "default_icon_type")]
    pub mime_type: String,
}

fn default_icon_type() -> String {
    "image/png".to_string()
}

// =============================================================================
// Loading
// =============================================================================
//
// A site's config.toml is layered over `SiteConfig::default()` as TOML
// tables before deserializing, so a file only names what it changes while
// `deny_unknown_fields` still catches typos in the names it does use.

/// `SiteConfig::default()` as a TOML table.
pub fn default_table() -> Result<toml::Value, ConfigError> {
    Ok(toml::Value::try_from(SiteConfig::default())?)
}

/// Layer `site` over `defaults`. Sections (`[feed]`, `[manifest]`, ...)
/// combine key by key; any other value, arrays included, is taken from
/// `site` as written.
pub fn layer_tables(defaults: toml::Value, site: toml::Value) -> toml::Value {
    match (defaults, site) {
        (toml::Value::Table(mut combined), toml::Value::Table(site)) => {
            for (key, value) in site {
                let layered = match combined.remove(&key) {
                    Some(default) => layer_tables(default, value),
                    None => value,
                };
                combined.insert(key, layered);
            }
            toml::Value::Table(combined)
        }
        (_, site) => site,
    }
}

/// Read, layer, deserialize and validate `config.toml` in the site root.
/// A root without the file gets the defaults.
pub fn load_config(root: &Path) -> Result<SiteConfig, ConfigError> {
    let path = root.join("config.toml");
    let mut table = default_table()?;
    if path.is_file() {
        let site: toml::Value = toml::from_str(&fs::read_to_string(&path)?)?;
        log::debug!("Layering {} over defaults", path.display());
        table = layer_tables(table, site);
    }
    let config: SiteConfig = table.try_into()?;
    config.validate()?;
    Ok(config)
}

/// Returns a fully-commented stock `config.toml` with all keys and explanations.
///
/// Used by the `gen-config` CLI command.
pub fn stock_config_toml() -> &'static str {
    r##"# Kindling Configuration
# ======================
# All settings are optional. Remove or comment out any you don't need.
# Values shown below are the defaults.
#
# This file also marks the project root: `kindling build` refuses to run
# in a directory without it. Unknown keys will cause an error.

# Site name, used in page titles, the feed, and the web app manifest.
name = "My Site"

# Appended to every page title, e.g. " - My Site".
title_suffix = ""

description = ""
author = ""

# Language tag written to <html lang>.
language = "en"

# Base URL of the published site. A path component (for example
# "https://example.com/blog") mounts the site as a subsite: every local
# link gets that prefix.
url = "https://example.com"

# Emit local links without a leading slash ("css/site.css" instead of
# "/css/site.css").
use_relative_paths = false

# Informational IANA time zone name.
# time_zone = "Europe/London"

# Site-relative favicon path.
# favicon = "/images/favicon.png"

# Include the icon font stylesheet in every page.
builtin_icons = false

# Directory holding Markdown content, relative to this file.
content_root = "content"

# ---------------------------------------------------------------------------
# RSS feed
# ---------------------------------------------------------------------------
[feed]
enabled = true

# "full" includes each article body, "description-only" just the summary.
mode = "full"

# Newest items to include.
content_count = 20

# Output path of the feed.
path = "/feed.rss"

# Optional channel image, at most 144x400 pixels.
# [feed.image]
# url = "https://example.com/images/feed.png"
# width = 144
# height = 144

# ---------------------------------------------------------------------------
# robots.txt
# ---------------------------------------------------------------------------
[robots]
# With no rules every crawler may index everything.
disallow = []

# [[robots.disallow]]
# agent = "GPTBot"
# paths = ["*"]

# ---------------------------------------------------------------------------
# Web app manifest
# ---------------------------------------------------------------------------
[manifest]
enabled = true
# short_name = "Site"
theme_color = "#ffffff"
background_color = "#ffffff"
categories = []
icons = []

# [[manifest.icons]]
# src = "/images/icon-192.png"
# sizes = "192x192"
# type = "image/png"

# ---------------------------------------------------------------------------
# Processing
# ---------------------------------------------------------------------------
[processing]
# Maximum parallel render workers.
# Omit or comment out to auto-detect (= number of CPU cores).
# max_threads = 4

# ---------------------------------------------------------------------------
# Themes
# ---------------------------------------------------------------------------
# The first theme is shown by default. Every color and font key is optional.
[[themes]]
id = "light"
scheme = "light"

[themes.max_widths]

[themes.breakpoints]
cascade = true

[[themes]]
id = "dark"
scheme = "dark"

[themes.max_widths]

[themes.breakpoints]
cascade = true
"##
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::theme::ColorScheme;
    use tempfile::TempDir;

    #[test]
    fn default_config_values() {
        let config = SiteConfig::default();
        assert_eq!(config.name, "My Site");
        assert_eq!(config.language, "en");
        assert!(!config.use_relative_paths);
        assert_eq!(config.feed.content_count, 20);
        assert_eq!(config.feed.path, "/feed.rss");
        assert_eq!(config.themes.len(), 2);
        assert_eq!(config.themes[1].scheme, ColorScheme::Dark);
    }

    #[test]
    fn parse_partial_config() {
        let toml = r#"
name = "Notes"
[feed]
mode = "description-only"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.name, "Notes");
        assert_eq!(config.feed.mode, FeedMode::DescriptionOnly);
        // Defaults preserved
        assert_eq!(config.feed.content_count, 20);
        assert_eq!(config.url, "https://example.com");
    }

    #[test]
    fn parse_robots_rules() {
        let toml = r#"
[[robots.disallow]]
agent = "GPTBot"
paths = ["*"]

[[robots.disallow]]
agent = "Googlebot"
paths = ["/drafts", "/private"]
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.robots.disallow.len(), 2);
        assert_eq!(config.robots.disallow[1].paths, vec!["/drafts", "/private"]);
    }

    #[test]
    fn parse_manifest_icon_type_key() {
        let toml = r#"
[[manifest.icons]]
src = "/icon.png"
sizes = "192x192"
type = "image/webp"
"#;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.manifest.icons[0].mime_type, "image/webp");
    }

    #[test]
    fn themes_replace_defaults() {
        let toml = r##"
[[themes]]
id = "Ocean Blue"
scheme = "dark"
accent = "#0af"
"##;
        let config: SiteConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.themes.len(), 1);
        assert_eq!(config.themes[0].accent.as_deref(), Some("#0af"));
    }

    #[test]
    fn full_title_appends_suffix() {
        let config = SiteConfig {
            title_suffix: " - Notes".into(),
            ..SiteConfig::default()
        };
        assert_eq!(config.full_title("Home"), "Home - Notes");
    }

    // =========================================================================
    // load_config tests
    // =========================================================================

    #[test]
    fn load_config_returns_default_when_no_file() {
        let tmp = TempDir::new().unwrap();
        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config, SiteConfig::default());
    }

    #[test]
    fn load_config_reads_file() {
        let tmp = TempDir::new().unwrap();
        fs::write(
            tmp.path().join("config.toml"),
            r#"
name = "Field Notes"
url = "https://example.com/notes"
use_relative_paths = true

[processing]
max_threads = 2
"#,
        )
        .unwrap();

        let config = load_config(tmp.path()).unwrap();
        assert_eq!(config.name, "Field Notes");
        assert_eq!(config.url, "https://example.com/notes");
        assert!(config.use_relative_paths);
        assert_eq!(config.processing.max_threads, Some(2));
        // Unspecified values should be defaults
        assert_eq!(config.feed.content_count, 20);
    }

    #[test]
    fn load_config_invalid_toml_is_error() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "this is not valid toml [[[").unwrap();
        assert!(matches!(load_config(tmp.path()), Err(ConfigError::Toml(_))));
    }

    // =========================================================================
    // Processing config tests
    // =========================================================================

    #[test]
    fn effective_threads_auto() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        assert_eq!(effective_threads(&ProcessingConfig { max_threads: None }), cores);
    }

    #[test]
    fn effective_threads_clamped_to_cores() {
        let cores = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(1);
        let config = ProcessingConfig {
            max_threads: Some(cores + 16),
        };
        assert_eq!(effective_threads(&config), cores);
    }

    #[test]
    fn effective_threads_user_constrains_down() {
        let config = ProcessingConfig {
            max_threads: Some(1),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    #[test]
    fn effective_threads_zero_means_one() {
        let config = ProcessingConfig {
            max_threads: Some(0),
        };
        assert_eq!(effective_threads(&config), 1);
    }

    // =========================================================================
    // Layering
    // =========================================================================

    #[test]
    fn site_scalar_replaces_default() {
        let base: toml::Value = toml::from_str(r#"name = "a""#).unwrap();
        let overlay: toml::Value = toml::from_str(r#"name = "b""#).unwrap();
        let merged = layer_tables(base, overlay);
        assert_eq!(merged.get("name").and_then(|v| v.as_str()), Some("b"));
    }

    #[test]
    fn sections_keep_unnamed_default_keys() {
        let base: toml::Value = toml::from_str(
            r#"
[feed]
content_count = 20
path = "/feed.rss"
"#,
        )
        .unwrap();
        let overlay: toml::Value = toml::from_str("[feed]\ncontent_count = 5").unwrap();
        let merged = layer_tables(base, overlay);
        let feed = merged.get("feed").unwrap();
        assert_eq!(feed.get("content_count").and_then(|v| v.as_integer()), Some(5));
        assert_eq!(feed.get("path").and_then(|v| v.as_str()), Some("/feed.rss"));
    }

    #[test]
    fn site_arrays_replace_defaults() {
        let base: toml::Value = toml::from_str("list = [1, 2, 3]").unwrap();
        let overlay: toml::Value = toml::from_str("list = [9]").unwrap();
        let merged = layer_tables(base, overlay);
        assert_eq!(merged.get("list").and_then(|v| v.as_array()).map(Vec::len), Some(1));
    }

    // =========================================================================
    // Unknown key rejection tests
    // =========================================================================

    #[test]
    fn unknown_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("nmae = \"typo\"");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_nested_key_rejected() {
        let result: Result<SiteConfig, _> = toml::from_str("[feed]\ncount = 3");
        assert!(result.is_err());
    }

    #[test]
    fn unknown_key_rejected_via_load_config() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[manifest]\ncolour = \"red\"\n").unwrap();
        assert!(load_config(tmp.path()).is_err());
    }

    // =========================================================================
    // Validation tests
    // =========================================================================

    #[test]
    fn validate_default_config_passes() {
        assert!(SiteConfig::default().validate().is_ok());
    }

    #[test]
    fn validate_empty_name() {
        let config = SiteConfig {
            name: "  ".into(),
            ..SiteConfig::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Validation(_))));
    }

    #[test]
    fn validate_url_scheme() {
        let config = SiteConfig {
            url: "example.com".into(),
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_feed_count_zero() {
        let mut config = SiteConfig::default();
        config.feed.content_count = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_feed_image_bounds() {
        let mut config = SiteConfig::default();
        config.feed.image = Some(FeedImage {
            url: "https://example.com/i.png".into(),
            width: 144,
            height: 400,
        });
        assert!(config.validate().is_ok());
        config.feed.image.as_mut().unwrap().width = 145;
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_duplicate_theme_ids() {
        let config = SiteConfig {
            themes: vec![Theme::light("a"), Theme::dark("a")],
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn validate_no_themes() {
        let config = SiteConfig {
            themes: Vec::new(),
            ..SiteConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn load_config_validates_values() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("config.toml"), "[feed]\ncontent_count = 0\n").unwrap();
        assert!(matches!(
            load_config(tmp.path()),
            Err(ConfigError::Validation(_))
        ));
    }

    // =========================================================================
    // stock_config_toml tests
    // =========================================================================

    #[test]
    fn stock_config_toml_is_valid_toml() {
        let _: toml::Value =
            toml::from_str(stock_config_toml()).expect("stock config must be valid TOML");
    }

    #[test]
    fn stock_config_toml_roundtrips_to_defaults() {
        let from_stock: SiteConfig = toml::from_str(stock_config_toml()).unwrap();
        assert_eq!(from_stock, SiteConfig::default());
    }

    #[test]
    fn default_table_has_every_section() {
        let value = default_table().unwrap();
        assert!(value.is_table());
        for key in ["feed", "robots", "manifest", "themes", "processing"] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
    }
}
