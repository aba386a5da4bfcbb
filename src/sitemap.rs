//! `sitemap.xml` generation.

use crate::feed::escape_xml;
use crate::render::absolute_url;

/// One sitemap entry.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    /// Site-relative route path, without a leading slash.
    pub path: String,
    /// 0.0–1.0.
    pub priority: f64,
}

impl Location {
    pub fn new(path: impl Into<String>, priority: f64) -> Self {
        Self {
            path: path.into(),
            priority,
        }
    }
}

/// Render every location under `base_url`, sorted by path.
pub fn render_sitemap(base_url: &str, locations: &[Location]) -> String {
    let mut sorted: Vec<&Location> = locations.iter().collect();
    sorted.sort_by(|a, b| a.path.cmp(&b.path));

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str("<urlset xmlns=\"http://www.sitemaps.org/schemas/sitemap/0.9\">\n");
    for location in sorted {
        out.push_str("<url>\n");
        out.push_str(&format!(
            "<loc>{}</loc>\n",
            escape_xml(&absolute_url(base_url, &location.path))
        ));
        out.push_str(&format!("<priority>{:.1}</priority>\n", location.priority));
        out.push_str("</url>\n");
    }
    out.push_str("</urlset>\n");
    out
}
