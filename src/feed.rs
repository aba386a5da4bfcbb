//! RSS 2.0 feed generation.
//!
//! The feed lists the newest articles first, capped at
//! `feed.content_count`. In [`FeedMode::Full`] each item also carries the
//! rendered body in `content:encoded`, with site-local `href`/`src` values
//! turned into absolute URLs so readers outside the site can follow them.

use crate::config::{FeedMode, SiteConfig};
use crate::content::Content;
use crate::render::absolute_url;
use chrono::Utc;
use std::sync::Arc;

/// Render the feed, or `None` when the feed is disabled.
pub fn render_feed(config: &SiteConfig, content: &[Arc<Content>]) -> Option<String> {
    if !config.feed.enabled {
        return None;
    }

    let mut items: Vec<&Arc<Content>> = content.iter().collect();
    items.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));
    items.truncate(config.feed.content_count);

    let site_link = absolute_url(&config.url, "");
    let feed_link = absolute_url(&config.url, &config.feed.path);
    let build_date = items
        .first()
        .map(|item| item.date)
        .unwrap_or_else(Utc::now);

    let mut out = String::new();
    out.push_str("<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n");
    out.push_str(
        "<rss version=\"2.0\" \
         xmlns:dc=\"http://purl.org/dc/elements/1.1/\" \
         xmlns:content=\"http://purl.org/rss/1.0/modules/content/\" \
         xmlns:atom=\"http://www.w3.org/2005/Atom\">\n",
    );
    out.push_str("<channel>\n");
    out.push_str(&format!("<title>{}</title>\n", escape_xml(&config.name)));
    out.push_str(&format!("<link>{}</link>\n", escape_xml(&site_link)));
    out.push_str(&format!(
        "<description>{}</description>\n",
        escape_xml(&config.description)
    ));
    out.push_str(&format!("<language>{}</language>\n", escape_xml(&config.language)));
    out.push_str(&format!(
        "<generator>kindling v{}</generator>\n",
        env!("CARGO_PKG_VERSION")
    ));
    out.push_str(&format!(
        "<lastBuildDate>{}</lastBuildDate>\n",
        build_date.to_rfc2822()
    ));
    out.push_str(&format!(
        "<atom:link href=\"{}\" rel=\"self\" type=\"application/rss+xml\"/>\n",
        escape_xml(&feed_link)
    ));

    if let Some(image) = &config.feed.image {
        out.push_str("<image>\n");
        out.push_str(&format!("<url>{}</url>\n", escape_xml(&image.url)));
        out.push_str(&format!("<title>{}</title>\n", escape_xml(&config.name)));
        out.push_str(&format!("<link>{}</link>\n", escape_xml(&site_link)));
        out.push_str(&format!("<width>{}</width>\n", image.width));
        out.push_str(&format!("<height>{}</height>\n", image.height));
        out.push_str("</image>\n");
    }

    for item in items {
        let link = absolute_url(&config.url, &item.path);
        out.push_str("<item>\n");
        out.push_str(&format!("<title>{}</title>\n", escape_xml(&item.title)));
        out.push_str(&format!("<link>{}</link>\n", escape_xml(&link)));
        out.push_str(&format!(
            "<guid isPermaLink=\"true\">{}</guid>\n",
            escape_xml(&link)
        ));
        out.push_str(&format!("<pubDate>{}</pubDate>\n", item.date.to_rfc2822()));

        let author = item.author().unwrap_or(&config.author);
        if !author.is_empty() {
            out.push_str(&format!("<dc:creator>{}</dc:creator>\n", cdata(author)));
        }
        for tag in item.tags() {
            out.push_str(&format!("<category>{}</category>\n", escape_xml(&tag)));
        }

        out.push_str(&format!(
            "<description>{}</description>\n",
            cdata(&item.description)
        ));
        if config.feed.mode == FeedMode::Full {
            let body = make_links_absolute(&item.body, &config.url);
            out.push_str(&format!(
                "<content:encoded>{}</content:encoded>\n",
                cdata(&body)
            ));
        }
        out.push_str("</item>\n");
    }

    out.push_str("</channel>\n</rss>\n");
    Some(out)
}

/// Rewrite `href="/…"` and `src="/…"` to absolute URLs under `base_url`.
pub fn make_links_absolute(html: &str, base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let mut out = html.to_string();
    for attribute in ["href", "src"] {
        for quote in ['"', '\''] {
            let local = format!("{attribute}={quote}/");
            // Leave protocol-relative `//host` links alone.
            let protocol_relative = format!("{attribute}={quote}//");
            let placeholder = format!("{attribute}={quote}\u{0}");
            out = out
                .replace(&protocol_relative, &placeholder)
                .replace(&local, &format!("{attribute}={quote}{base}/"))
                .replace(&placeholder, &protocol_relative);
        }
    }
    out
}

/// Wrap text in a CDATA section, splitting any embedded terminator.
fn cdata(text: &str) -> String {
    format!("<![CDATA[{}]]>", text.replace("]]>", "]]]]><![CDATA[>"))
}

pub(crate) fn escape_xml(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(ch),
        }
    }
    out
}
