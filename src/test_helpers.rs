//! Shared test utilities.
//!
//! Render contexts with a given site configuration, in-memory content,
//! on-disk site fixtures, and a Markdown renderer that records its calls.
//!
//! # Usage
//!
//! ```rust
//! use crate::test_helpers::*;
//!
//! let cx = context_for("https://example.com/blog", true);
//! assert_eq!(cx.path("/css/a.css"), "blog/css/a.css");
//!
//! let tmp = TempDir::new().unwrap();
//! let root = write_site_root(tmp.path(), "name = \"Notes\"");
//! write_content(&root.join("content"), "posts/hello.md", "# Hello");
//! ```

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::config::SiteConfig;
use crate::content::{Content, parse_date};
use crate::element::{Node, text};
use crate::environment::{ActiveThemeKey, Environment, SiteKey, ThemesKey};
use crate::markdown::{MarkdownError, MarkdownRenderer, ParsedMarkdown};
use crate::render::RenderContext;
use crate::site::StaticPage;

// =========================================================================
// Render contexts
// =========================================================================

/// A context whose environment carries `config` as the site and its themes.
pub fn context_with(config: SiteConfig) -> RenderContext {
    let themes = Arc::new(config.themes.clone());
    let mut environment = Environment::new();
    environment.set::<ActiveThemeKey>(themes.first().cloned().map(Arc::new));
    environment.set::<ThemesKey>(themes);
    environment.set::<SiteKey>(Arc::new(config));
    RenderContext::new(environment)
}

/// A context for a site at `url`, optionally emitting relative paths.
pub fn context_for(url: &str, relative: bool) -> RenderContext {
    context_with(SiteConfig {
        url: url.to_string(),
        use_relative_paths: relative,
        ..SiteConfig::default()
    })
}

/// A context with default configuration and nothing scoped.
pub fn plain_context() -> RenderContext {
    RenderContext::new(Environment::new())
}

// =========================================================================
// Content fixtures
// =========================================================================

/// An article at `path` dated 2024-05-24 15:30 with no front matter.
pub fn sample_content(path: &str, title: &str) -> Content {
    let date = parse_date("2024-05-24 15:30").unwrap();
    Content {
        title: title.to_string(),
        description: format!("About {title}"),
        body: format!("<p>{title}</p>"),
        path: path.to_string(),
        metadata: BTreeMap::new(),
        date,
        last_modified: date,
        has_automatic_date: false,
        source: PathBuf::from(format!("{}.md", path.trim_start_matches('/'))),
    }
}

/// Write `text` to `root/relative`, creating parent directories.
pub fn write_content(root: &Path, relative: &str, text: &str) -> PathBuf {
    let path = root.join(relative);
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    std::fs::write(&path, text).unwrap();
    path
}

/// Create `parent/site/config.toml` with `config` and return the site root.
pub fn write_site_root(parent: &Path, config: &str) -> PathBuf {
    let root = parent.join("site");
    write_content(&root, "config.toml", config);
    root
}

/// A static page whose body is its title in a paragraph.
pub struct TextPage {
    path: String,
    title: String,
}

impl TextPage {
    pub fn new(path: &str, title: &str) -> Self {
        Self {
            path: path.to_string(),
            title: title.to_string(),
        }
    }
}

impl StaticPage for TextPage {
    fn path(&self) -> String {
        self.path.clone()
    }

    fn title(&self) -> String {
        self.title.clone()
    }

    fn body(&self, _cx: &RenderContext) -> Node {
        text(self.title.clone())
    }
}

// =========================================================================
// Recording Markdown renderer
// =========================================================================

/// Returns canned output and records every `parse` call.
#[derive(Default)]
pub struct RecordingRenderer {
    calls: Mutex<Vec<(String, bool)>>,
}

impl RecordingRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// `(markdown, remove_title)` for each call, in order.
    pub fn calls(&self) -> Vec<(String, bool)> {
        self.calls.lock().unwrap().clone()
    }
}

impl MarkdownRenderer for RecordingRenderer {
    fn parse(&self, markdown: &str, remove_title: bool) -> Result<ParsedMarkdown, MarkdownError> {
        self.calls
            .lock()
            .unwrap()
            .push((markdown.to_string(), remove_title));
        if markdown.contains("<<invalid>>") {
            return Err(MarkdownError::BadMarkdown {
                path: PathBuf::new(),
                message: "rejected by test renderer".to_string(),
            });
        }
        Ok(ParsedMarkdown {
            title: String::new(),
            description: "Recorded".to_string(),
            body: "<p>recorded</p>".to_string(),
            metadata: BTreeMap::new(),
        })
    }
}
