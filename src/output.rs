//! CLI output formatting for the `check` and `build` commands.
//!
//! Output is organised by route, not by file. Each route shows its kind,
//! positional index, and title, with the file it writes as secondary
//! context after an arrow. Generated files, assets, and warnings follow in
//! their own sections.
//!
//! # Output Format
//!
//! ## Check
//!
//! ```text
//! Routes
//! 001 Home     /
//! 002 Page     /about
//! 003 Article  /posts/hello
//! 004 Tag      /tags
//! 005 Error    /404.html
//!
//! 5 routes, 1 article
//! ```
//!
//! ## Build
//!
//! ```text
//! Routes
//! 001 Home: Home → index.html
//! 002 Article: Hello → posts/hello/index.html
//!
//! Generated
//!     css/themes.min.css
//!     css/styles.min.css
//!     sitemap.xml
//!
//! Warnings
//!     Content dates should be in the format 2024-05-24 15:30. (content/a.md)
//!
//! Published 2 routes, 3 files, 0 assets, 4 style rules
//! ```
//!
//! Each command has a `format_*` function returning `Vec<String>` and a
//! `print_*` wrapper that writes to stdout. Format functions do no I/O.

use crate::publish::{BuildReport, Route, RouteSource};

/// Width of the kind column in route listings.
const KIND_WIDTH: usize = 8;

/// Longest title shown before truncating.
const TITLE_WIDTH: usize = 60;

fn format_index(pos: usize) -> String {
    format!("{:0>3}", pos)
}

fn indent(depth: usize) -> String {
    "    ".repeat(depth)
}

/// Truncate to `max` characters, appending `...` when shortened.
fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        text.to_string()
    } else {
        let head: String = text.chars().take(max).collect();
        format!("{head}...")
    }
}

fn plural(count: usize, singular: &str, plural: &str) -> String {
    if count == 1 {
        format!("{count} {singular}")
    } else {
        format!("{count} {plural}")
    }
}

// ============================================================================
// Check
// ============================================================================

/// The route table a build would write.
pub fn format_routes(routes: &[Route]) -> Vec<String> {
    let mut lines = vec!["Routes".to_string()];
    for (i, route) in routes.iter().enumerate() {
        lines.push(format!(
            "{} {:<width$} /{}",
            format_index(i + 1),
            route.source.label(),
            route.path,
            width = KIND_WIDTH
        ));
    }

    let articles = routes
        .iter()
        .filter(|r| matches!(r.source, RouteSource::Article { .. }))
        .count();
    lines.push(String::new());
    lines.push(format!(
        "{}, {}",
        plural(routes.len(), "route", "routes"),
        plural(articles, "article", "articles")
    ));
    lines
}

pub fn print_routes(routes: &[Route]) {
    for line in format_routes(routes) {
        println!("{}", line);
    }
}

// ============================================================================
// Build
// ============================================================================

pub fn format_build_report(report: &BuildReport) -> Vec<String> {
    let mut lines = vec!["Routes".to_string()];
    for (i, route) in report.routes.iter().enumerate() {
        lines.push(format!(
            "{} {}: {} \u{2192} {}",
            format_index(i + 1),
            route.kind,
            truncate(&route.title, TITLE_WIDTH),
            route.output.display()
        ));
    }

    if !report.generated.is_empty() {
        lines.push(String::new());
        lines.push("Generated".to_string());
        for file in &report.generated {
            lines.push(format!("{}{}", indent(1), file.display()));
        }
    }

    if !report.warnings.is_empty() {
        lines.push(String::new());
        lines.push("Warnings".to_string());
        for warning in &report.warnings {
            lines.push(format!("{}{}", indent(1), warning));
        }
    }

    lines.push(String::new());
    lines.push(format!(
        "Published {}, {}, {}, {}",
        plural(report.routes.len(), "route", "routes"),
        plural(report.generated.len(), "file", "files"),
        plural(report.assets_copied, "asset", "assets"),
        plural(report.style_rules, "style rule", "style rules"),
    ));
    lines
}

pub fn print_build_report(report: &BuildReport) {
    for line in format_build_report(report) {
        println!("{}", line);
    }
}
