//! Markdown parsing.
//!
//! Content files are Markdown with optional front matter:
//!
//! ```text
//! ---
//! layout: Story
//! date: 2024-05-24 15:30
//! tags: rust, static sites
//! ---
//!
//! # The title
//!
//! The first paragraph doubles as the description.
//! ```
//!
//! Front matter is a block of `key: value` lines fenced by `---`. Keys keep
//! their case; values are trimmed. Lines without a colon are ignored.
//!
//! The renderer sits behind [`MarkdownRenderer`] so a site can swap
//! implementations; [`PulldownRenderer`] is the stock one.

use pulldown_cmark::{Event, HeadingLevel, Options, Parser, Tag, TagEnd, html};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MarkdownError {
    #[error("Unable to open {path}: {source}")]
    Unopenable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse Markdown in {path}: {message}")]
    BadMarkdown { path: PathBuf, message: String },
}

/// The result of parsing one Markdown document.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedMarkdown {
    pub title: String,
    pub description: String,
    /// Rendered HTML.
    pub body: String,
    pub metadata: BTreeMap<String, String>,
}

pub trait MarkdownRenderer: Send + Sync {
    /// Parse `markdown`. With `remove_title`, the heading that supplies the
    /// title is left out of the body.
    fn parse(&self, markdown: &str, remove_title: bool) -> Result<ParsedMarkdown, MarkdownError>;

    /// Parse a file, falling back to the file stem when the document has no
    /// title heading.
    fn parse_file(&self, path: &Path, remove_title: bool) -> Result<ParsedMarkdown, MarkdownError> {
        let markdown = fs::read_to_string(path).map_err(|source| MarkdownError::Unopenable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut parsed = self.parse(&markdown, remove_title).map_err(|e| match e {
            MarkdownError::BadMarkdown { message, .. } => MarkdownError::BadMarkdown {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })?;
        if parsed.title.is_empty() {
            if let Some(stem) = path.file_stem() {
                parsed.title = stem.to_string_lossy().into_owned();
            }
        }
        Ok(parsed)
    }
}

/// Split a document into its front matter entries and the remaining body.
///
/// A document without an opening `---` line has no front matter. An opening
/// fence with no closing fence is treated as ordinary Markdown.
pub fn split_front_matter(markdown: &str) -> (BTreeMap<String, String>, &str) {
    let mut metadata = BTreeMap::new();
    let trimmed = markdown.trim_start_matches('\u{feff}');

    let Some(rest) = trimmed
        .strip_prefix("---\n")
        .or_else(|| trimmed.strip_prefix("---\r\n"))
    else {
        return (metadata, trimmed);
    };

    let mut offset = 0;
    for line in rest.split_inclusive('\n') {
        offset += line.len();
        let content = line.trim_end_matches(['\r', '\n']);
        if content.trim() == "---" {
            return (metadata, &rest[offset..]);
        }
        if let Some((key, value)) = content.split_once(':') {
            let key = key.trim();
            if !key.is_empty() {
                metadata.insert(key.to_string(), value.trim().to_string());
            }
        }
    }

    (BTreeMap::new(), trimmed)
}

/// Markdown rendering through `pulldown-cmark`.
#[derive(Debug, Clone, Copy, Default)]
pub struct PulldownRenderer;

impl PulldownRenderer {
    fn options() -> Options {
        Options::ENABLE_TABLES
            | Options::ENABLE_STRIKETHROUGH
            | Options::ENABLE_FOOTNOTES
            | Options::ENABLE_TASKLISTS
    }
}

impl MarkdownRenderer for PulldownRenderer {
    fn parse(&self, markdown: &str, remove_title: bool) -> Result<ParsedMarkdown, MarkdownError> {
        let (metadata, source) = split_front_matter(markdown);
        let events: Vec<Event<'_>> = Parser::new_ext(source, Self::options()).collect();

        let mut title = String::new();
        let mut description = String::new();
        let mut kept = Vec::with_capacity(events.len());

        let mut in_title = false;
        let mut title_done = false;
        let mut in_paragraph = false;
        let mut description_done = false;

        for event in events {
            match &event {
                Event::Start(Tag::Heading {
                    level: HeadingLevel::H1,
                    ..
                }) if !title_done => {
                    in_title = true;
                    if remove_title {
                        continue;
                    }
                }
                Event::End(TagEnd::Heading(HeadingLevel::H1)) if in_title => {
                    in_title = false;
                    title_done = true;
                    if remove_title {
                        continue;
                    }
                }
                Event::Start(Tag::Paragraph) if !description_done => in_paragraph = true,
                Event::End(TagEnd::Paragraph) if in_paragraph => {
                    in_paragraph = false;
                    description_done = !description.trim().is_empty();
                }
                Event::Text(text) | Event::Code(text) => {
                    if in_title {
                        title.push_str(text);
                    } else if in_paragraph {
                        description.push_str(text);
                    }
                }
                Event::SoftBreak if in_paragraph => description.push(' '),
                _ => {}
            }
            if in_title && remove_title {
                continue;
            }
            kept.push(event);
        }

        let mut body = String::with_capacity(source.len() * 3 / 2);
        html::push_html(&mut body, kept.into_iter());

        Ok(ParsedMarkdown {
            title: title.trim().to_string(),
            description: description.trim().to_string(),
            body,
            metadata,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(markdown: &str, remove_title: bool) -> ParsedMarkdown {
        PulldownRenderer.parse(markdown, remove_title).unwrap()
    }

    // =========================================================================
    // Front matter
    // =========================================================================

    #[test]
    fn front_matter_split() {
        let (meta, body) = split_front_matter("---\nlayout: Story\ntags: a, b\n---\n# Hi\n");
        assert_eq!(meta.get("layout").map(String::as_str), Some("Story"));
        assert_eq!(meta.get("tags").map(String::as_str), Some("a, b"));
        assert_eq!(body, "# Hi\n");
    }

    #[test]
    fn value_may_contain_colons() {
        let (meta, _) = split_front_matter("---\ndate: 2024-05-24 15:30\n---\n");
        assert_eq!(meta.get("date").map(String::as_str), Some("2024-05-24 15:30"));
    }

    #[test]
    fn no_front_matter() {
        let (meta, body) = split_front_matter("# Title\n\nText");
        assert!(meta.is_empty());
        assert_eq!(body, "# Title\n\nText");
    }

    #[test]
    fn unterminated_front_matter_is_body() {
        let (meta, body) = split_front_matter("---\nkey: value\n");
        assert!(meta.is_empty());
        assert_eq!(body, "---\nkey: value\n");
    }

    // =========================================================================
    // Title and description
    // =========================================================================

    #[test]
    fn extracts_title_and_description() {
        let parsed = parse("# Hello\n\nFirst *para*.\n\nSecond.", false);
        assert_eq!(parsed.title, "Hello");
        assert_eq!(parsed.description, "First para.");
        assert!(parsed.body.contains("<h1>Hello</h1>"));
        assert!(parsed.body.contains("<p>Second.</p>"));
    }

    #[test]
    fn remove_title_drops_heading_from_body() {
        let parsed = parse("# Hello\n\nBody text.", true);
        assert_eq!(parsed.title, "Hello");
        assert!(!parsed.body.contains("<h1>"));
        assert!(parsed.body.contains("<p>Body text.</p>"));
    }

    #[test]
    fn only_first_h1_is_title() {
        let parsed = parse("# One\n\n# Two\n", true);
        assert_eq!(parsed.title, "One");
        assert!(parsed.body.contains("<h1>Two</h1>"));
    }

    #[test]
    fn tables_enabled() {
        let parsed = parse("| a | b |\n|---|---|\n| 1 | 2 |\n", false);
        assert!(parsed.body.contains("<table>"));
    }

    #[test]
    fn file_stem_is_fallback_title() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("my-notes.md");
        fs::write(&path, "Just text.").unwrap();
        let parsed = PulldownRenderer.parse_file(&path, true).unwrap();
        assert_eq!(parsed.title, "my-notes");
        assert_eq!(parsed.description, "Just text.");
    }

    #[test]
    fn missing_file_is_unopenable() {
        let tmp = TempDir::new().unwrap();
        let result = PulldownRenderer.parse_file(&tmp.path().join("nope.md"), true);
        assert!(matches!(result, Err(MarkdownError::Unopenable { .. })));
    }
}
