//! Loaded Markdown content.
//!
//! Every `*.md` file under `content/` becomes one [`Content`]. Its route path
//! mirrors the file's location: `content/posts/hello.md` is published at
//! `/posts/hello`, unless front matter sets `path`. The first path segment
//! (`posts`) is the content type; files at the top level have none.
//!
//! Recognised front-matter keys:
//!
//! | Key | Meaning |
//! |-----|---------|
//! | `date` | Publication date (`2024-05-24`, `2024-05-24 15:30`, `2024-05-24 15:30:00`) |
//! | `modified`, `lastModified` | Last modification date, same formats |
//! | `layout` | Name of the article layout to render with |
//! | `tags` | Comma-separated tag names |
//! | `author`, `subtitle`, `image`, `alt` | Presentation metadata |
//! | `published` | `false` keeps the file out of the build |
//! | `path` | Overrides the route path |

use crate::element::{Node, link};
use crate::markdown::{MarkdownError, MarkdownRenderer};
use crate::publish::PublishingError;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use walkdir::WalkDir;

const WORDS_PER_MINUTE: usize = 250;

const DATE_FORMATS: &[&str] = &["%Y-%m-%d %H:%M:%S", "%Y-%m-%d %H:%M"];

/// One published piece of Markdown content.
#[derive(Debug, Clone, PartialEq)]
pub struct Content {
    pub title: String,
    pub description: String,
    /// Rendered HTML body.
    pub body: String,
    /// Site-relative route path with a leading slash.
    pub path: String,
    pub metadata: BTreeMap<String, String>,
    pub date: DateTime<Utc>,
    pub last_modified: DateTime<Utc>,
    /// True when `date` came from the file system rather than front matter.
    pub has_automatic_date: bool,
    pub source: PathBuf,
}

impl Content {
    fn meta(&self, key: &str) -> Option<&str> {
        self.metadata
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn layout(&self) -> Option<&str> {
        self.meta("layout")
    }

    pub fn tags(&self) -> Vec<String> {
        self.meta("tags")
            .map(|tags| {
                tags.split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn has_tags(&self) -> bool {
        !self.tags().is_empty()
    }

    pub fn author(&self) -> Option<&str> {
        self.meta("author")
    }

    pub fn subtitle(&self) -> Option<&str> {
        self.meta("subtitle")
    }

    pub fn image(&self) -> Option<&str> {
        self.meta("image")
    }

    pub fn image_description(&self) -> &str {
        self.meta("alt").unwrap_or("")
    }

    /// Anything other than a literal `false` counts as published.
    pub fn is_published(&self) -> bool {
        self.meta("published") != Some("false")
    }

    /// First path segment for content inside a subdirectory.
    pub fn content_type(&self) -> Option<&str> {
        let segments: Vec<&str> = self.path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() > 1 {
            Some(segments[0])
        } else {
            None
        }
    }

    /// Counts runs of word characters and hyphens in the rendered body.
    pub fn estimated_word_count(&self) -> usize {
        let text = strip_tags(&self.body);
        text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
            .filter(|w| !w.is_empty())
            .count()
    }

    pub fn estimated_reading_minutes(&self) -> usize {
        self.estimated_word_count().div_ceil(WORDS_PER_MINUTE)
    }

    /// One `/tags/<slug>` link per tag.
    pub fn tag_links(&self) -> Vec<Node> {
        self.tags()
            .into_iter()
            .map(|tag| {
                let target = format!("/tags/{}", slugify(&tag));
                link(tag, target)
                    .class("badge")
                    .attribute("rel", "tag")
            })
            .collect()
    }
}

/// A group of articles sharing a tag. `name` is `None` for the listing of
/// every tagged article.
#[derive(Debug, Clone, PartialEq)]
pub struct Category {
    pub name: Option<String>,
    pub path: String,
    pub articles: Vec<Arc<Content>>,
}

impl Category {
    /// Build the all-tags category followed by one category per tag, sorted
    /// by slug. Tags that slug to the same value share a category.
    pub fn collect(content: &[Arc<Content>]) -> Vec<Category> {
        let mut by_slug: BTreeMap<String, (String, Vec<Arc<Content>>)> = BTreeMap::new();
        let mut tagged = Vec::new();

        for item in content {
            let tags = item.tags();
            if tags.is_empty() {
                continue;
            }
            tagged.push(Arc::clone(item));
            let mut seen = BTreeSet::new();
            for tag in tags {
                let slug = slugify(&tag);
                if slug.is_empty() || !seen.insert(slug.clone()) {
                    continue;
                }
                by_slug
                    .entry(slug)
                    .or_insert_with(|| (tag, Vec::new()))
                    .1
                    .push(Arc::clone(item));
            }
        }

        let mut categories = vec![Category {
            name: None,
            path: "/tags".to_string(),
            articles: tagged,
        }];
        categories.extend(by_slug.into_iter().map(|(slug, (name, articles))| Category {
            name: Some(name),
            path: format!("/tags/{slug}"),
            articles,
        }));
        categories
    }
}

/// The error an error page is rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpError {
    pub status_code: u16,
    pub title: String,
    pub description: String,
}

impl HttpError {
    pub fn page_not_found() -> Self {
        Self {
            status_code: 404,
            title: "Page Not Found".to_string(),
            description: "The page you requested could not be found.".to_string(),
        }
    }
}

/// Lowercase alphanumeric runs joined by single hyphens.
pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut pending_dash = false;
    for c in text.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Remove anything between `<` and `>`.
pub fn strip_tags(html: &str) -> String {
    let mut out = String::with_capacity(html.len());
    let mut in_tag = false;
    for c in html.chars() {
        match c {
            '<' => in_tag = true,
            '>' if in_tag => in_tag = false,
            _ if !in_tag => out.push(c),
            _ => {}
        }
    }
    out
}

/// Parse a front-matter date. Date-only values are midnight UTC.
pub fn parse_date(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    for format in DATE_FORMATS {
        if let Ok(parsed) = NaiveDateTime::parse_from_str(value, format) {
            return Some(parsed.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Content loaded from a directory, plus the non-fatal problems found.
#[derive(Debug, Default)]
pub struct LoadedContent {
    pub content: Vec<Arc<Content>>,
    pub warnings: BTreeSet<String>,
}

/// Load every published `*.md` file under `dir`, in path order.
///
/// A missing directory yields no content. Symlinks are followed. Unreadable
/// entries, symlink loops and Markdown the renderer rejects abort the load;
/// malformed dates only add a warning.
pub fn load_content(
    dir: &Path,
    renderer: &dyn MarkdownRenderer,
) -> Result<LoadedContent, MarkdownError> {
    let mut loaded = LoadedContent::default();
    if !dir.is_dir() {
        return Ok(loaded);
    }

    for entry in WalkDir::new(dir).follow_links(true).sort_by_file_name() {
        let entry = entry.map_err(|e| MarkdownError::Unopenable {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| dir.to_path_buf()),
            source: e.into(),
        })?;
        let path = entry.path();
        if !entry.file_type().is_file() || path.extension().is_none_or(|ext| ext != "md") {
            continue;
        }
        let content = load_file(dir, path, renderer, &mut loaded.warnings)?;
        if content.is_published() {
            log::debug!("Loaded {} -> {}", path.display(), content.path);
            loaded.content.push(Arc::new(content));
        } else {
            log::debug!("Skipping unpublished {}", path.display());
        }
    }

    Ok(loaded)
}

fn load_file(
    root: &Path,
    path: &Path,
    renderer: &dyn MarkdownRenderer,
    warnings: &mut BTreeSet<String>,
) -> Result<Content, MarkdownError> {
    let parsed = renderer.parse_file(path, true)?;

    let file_modified = std::fs::metadata(path)
        .and_then(|m| m.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now());

    let mut date_for = |keys: &[&str]| -> Option<DateTime<Utc>> {
        for key in keys {
            let Some(value) = parsed.metadata.get(*key) else {
                continue;
            };
            match parse_date(value) {
                Some(date) => return Some(date),
                None => {
                    let warning = PublishingError::BadContentDateFormat(path.to_path_buf());
                    warnings.insert(warning.to_string());
                }
            }
        }
        None
    };

    let declared_date = date_for(&["date"]);
    let last_modified = date_for(&["modified", "lastModified"]).unwrap_or(file_modified);

    let route = match parsed.metadata.get("path").filter(|p| !p.trim().is_empty()) {
        Some(custom) => format!("/{}", custom.trim().trim_matches('/')),
        None => route_for(root, path),
    };

    Ok(Content {
        title: strip_tags(&parsed.title),
        description: strip_tags(&parsed.description),
        body: parsed.body,
        path: route,
        metadata: parsed.metadata,
        date: declared_date.unwrap_or(file_modified),
        last_modified,
        has_automatic_date: declared_date.is_none(),
        source: path.to_path_buf(),
    })
}

/// `/posts/hello` for `<root>/posts/hello.md`.
fn route_for(root: &Path, path: &Path) -> String {
    let relative = path.strip_prefix(root).unwrap_or(path).with_extension("");
    let segments: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    format!("/{}", segments.join("/"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::markdown::PulldownRenderer;
    use crate::test_helpers::{RecordingRenderer, sample_content, write_content};
    use tempfile::TempDir;

    // =========================================================================
    // Metadata accessors
    // =========================================================================

    #[test]
    fn tags_are_split_and_trimmed() {
        let mut content = sample_content("/posts/a", "A");
        content
            .metadata
            .insert("tags".into(), " rust ,  static sites,, ".into());
        assert_eq!(content.tags(), vec!["rust", "static sites"]);
    }

    #[test]
    fn content_type_is_first_segment() {
        assert_eq!(sample_content("/posts/a", "A").content_type(), Some("posts"));
        assert_eq!(sample_content("/about", "A").content_type(), None);
    }

    #[test]
    fn published_unless_false() {
        let mut content = sample_content("/a", "A");
        assert!(content.is_published());
        content.metadata.insert("published".into(), "false".into());
        assert!(!content.is_published());
        content.metadata.insert("published".into(), "nonsense".into());
        assert!(content.is_published());
    }

    #[test]
    fn reading_time_rounds_up() {
        let mut content = sample_content("/a", "A");
        content.body = format!("<p>{}</p>", vec!["word"; 251].join(" "));
        assert_eq!(content.estimated_word_count(), 251);
        assert_eq!(content.estimated_reading_minutes(), 2);
    }

    #[test]
    fn slugs() {
        assert_eq!(slugify("Static Sites!"), "static-sites");
        assert_eq!(slugify("  Rust  "), "rust");
        assert_eq!(slugify("C++ & Rust"), "c-rust");
    }

    // =========================================================================
    // Dates
    // =========================================================================

    #[test]
    fn parses_all_date_formats() {
        assert_eq!(
            parse_date("2024-05-24").unwrap().to_rfc3339(),
            "2024-05-24T00:00:00+00:00"
        );
        assert_eq!(
            parse_date("2024-05-24 15:30").unwrap().to_rfc3339(),
            "2024-05-24T15:30:00+00:00"
        );
        assert_eq!(
            parse_date("2024-5-4 15:30:12").unwrap().to_rfc3339(),
            "2024-05-04T15:30:12+00:00"
        );
        assert!(parse_date("24th May").is_none());
    }

    // =========================================================================
    // Loading
    // =========================================================================

    #[test]
    fn loads_paths_from_file_layout() {
        let tmp = TempDir::new().unwrap();
        write_content(tmp.path(), "posts/hello.md", "# Hello\n\nWorld.");
        write_content(tmp.path(), "about.md", "# About\n\nMe.");
        let loaded = load_content(tmp.path(), &PulldownRenderer).unwrap();
        let paths: Vec<&str> = loaded.content.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/about", "/posts/hello"]);
        assert_eq!(loaded.content[1].title, "Hello");
        assert!(!loaded.content[1].body.contains("<h1>"));
    }

    #[test]
    fn path_front_matter_overrides() {
        let tmp = TempDir::new().unwrap();
        write_content(tmp.path(), "x.md", "---\npath: custom/place/\n---\n# X\n");
        let loaded = load_content(tmp.path(), &PulldownRenderer).unwrap();
        assert_eq!(loaded.content[0].path, "/custom/place");
    }

    #[test]
    fn unpublished_content_is_skipped() {
        let tmp = TempDir::new().unwrap();
        write_content(tmp.path(), "draft.md", "---\npublished: false\n---\n# Draft\n");
        let loaded = load_content(tmp.path(), &PulldownRenderer).unwrap();
        assert!(loaded.content.is_empty());
    }

    #[test]
    fn bad_date_warns_and_falls_back() {
        let tmp = TempDir::new().unwrap();
        write_content(tmp.path(), "a.md", "---\ndate: yesterday\n---\n# A\n");
        write_content(tmp.path(), "b.md", "---\ndate: 2024-05-24 15:30\n---\n# B\n");
        let loaded = load_content(tmp.path(), &PulldownRenderer).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.content[0].has_automatic_date);
        assert!(!loaded.content[1].has_automatic_date);
        assert_eq!(loaded.content[1].date.to_rfc3339(), "2024-05-24T15:30:00+00:00");
    }

    #[test]
    fn renderer_is_asked_to_remove_titles() {
        let tmp = TempDir::new().unwrap();
        write_content(tmp.path(), "notes/first-light.md", "No heading.");
        let renderer = RecordingRenderer::new();
        let loaded = load_content(tmp.path(), &renderer).unwrap();

        let calls = renderer.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].1);
        assert_eq!(loaded.content[0].title, "first-light");
        assert_eq!(loaded.content[0].body, "<p>recorded</p>");
    }

    #[test]
    fn renderer_failure_names_the_file() {
        let tmp = TempDir::new().unwrap();
        let path = write_content(tmp.path(), "broken.md", "<<invalid>>");
        let result = load_content(tmp.path(), &RecordingRenderer::new());
        assert!(matches!(
            result,
            Err(MarkdownError::BadMarkdown { path: p, .. }) if p == path
        ));
    }

    #[cfg(unix)]
    #[test]
    fn unwalkable_directory_aborts_load() {
        let tmp = TempDir::new().unwrap();
        write_content(tmp.path(), "a.md", "# A\n");
        std::os::unix::fs::symlink(tmp.path(), tmp.path().join("loop")).unwrap();
        let result = load_content(tmp.path(), &PulldownRenderer);
        assert!(matches!(result, Err(MarkdownError::Unopenable { .. })));
    }

    #[test]
    fn missing_directory_is_empty() {
        let tmp = TempDir::new().unwrap();
        let loaded = load_content(&tmp.path().join("content"), &PulldownRenderer).unwrap();
        assert!(loaded.content.is_empty());
    }

    // =========================================================================
    // Categories
    // =========================================================================

    #[test]
    fn categories_group_by_slug() {
        let mut a = sample_content("/posts/a", "A");
        a.metadata.insert("tags".into(), "Rust, Web".into());
        let mut b = sample_content("/posts/b", "B");
        b.metadata.insert("tags".into(), "rust".into());
        let c = sample_content("/posts/c", "C");
        let all: Vec<Arc<Content>> = vec![Arc::new(a), Arc::new(b), Arc::new(c)];

        let categories = Category::collect(&all);
        let paths: Vec<&str> = categories.iter().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["/tags", "/tags/rust", "/tags/web"]);
        assert_eq!(categories[0].articles.len(), 2);
        assert_eq!(categories[1].name.as_deref(), Some("Rust"));
        assert_eq!(categories[1].articles.len(), 2);
    }
}
