//! Site declaration: configuration plus the pages and layouts that render it.
//!
//! A [`Site`] names everything the publishing pipeline renders:
//!
//! | Piece | Trait | Routes |
//! |-------|-------|--------|
//! | home page | [`StaticPage`] | `/` |
//! | static pages | [`StaticPage`] | one each, at `StaticPage::path` |
//! | article layouts | [`ArticlePage`] | one route per Markdown file |
//! | tag layout | [`TagPage`] | `/tags` and `/tags/<slug>` |
//! | error page | [`ErrorPage`] | `/404.html` |
//! | main layout | [`Layout`] | wraps every route body in a full document |
//!
//! Page bodies are built inside the route's environment scope, so an article
//! layout reads its article with [`RenderContext::article`] and a tag layout
//! reads its category with [`RenderContext::category`].
//!
//! [`Site::standard`] assembles a usable site from configuration alone with
//! the built-in layouts in this module.

use crate::config::SiteConfig;
use crate::content::{Content, HttpError};
use crate::element::{
    Kind, Node, body, component, divider, document, emphasis, group, head, heading, link, list,
    meta_charset, meta_link, meta_property, meta_tag, raw, script_code, section, span, text,
    title,
};
use crate::environment::{AllContentKey, ThemesKey};
use crate::markdown::{MarkdownRenderer, PulldownRenderer};
use crate::render::RenderContext;
use crate::style::{MediaQuery, Style};
use crate::theme::Breakpoint;
use std::sync::Arc;

pub const THEMES_CSS_PATH: &str = "/css/themes.min.css";
pub const STYLES_CSS_PATH: &str = "/css/styles.min.css";
pub const ICONS_CSS_PATH: &str = "/css/bootstrap-icons.min.css";
pub const MANIFEST_PATH: &str = "/manifest.webmanifest";

const THEME_SWITCHER: &str = "\
function switchTheme(id) {
    const root = document.documentElement;
    root.setAttribute('data-bs-theme', id);
    root.setAttribute('data-theme-state', id.replace(/([a-z0-9])([A-Z])/g, '$1-$2').toLowerCase().replace(/[^a-z0-9]+/g, '-').replace(/^-+|-+$/g, ''));
    localStorage.setItem('kindling-theme', id);
}
(function () {
    const saved = localStorage.getItem('kindling-theme');
    if (saved) switchTheme(saved);
})();";

/// Wraps a route body in a complete HTML document.
pub trait Layout: Send + Sync {
    fn render(&self, content: Node, cx: &RenderContext) -> Node;
}

/// A page with a fixed route.
pub trait StaticPage: Send + Sync {
    /// Site-relative path without a leading slash; empty for the home page.
    fn path(&self) -> String;
    fn title(&self) -> String;
    fn description(&self) -> String {
        String::new()
    }
    fn image(&self) -> Option<String> {
        None
    }
    fn body(&self, cx: &RenderContext) -> Node;
}

/// Renders one article. Articles choose a layout by `name` through their
/// `layout` front matter.
pub trait ArticlePage: Send + Sync {
    fn name(&self) -> &str;
    fn body(&self, cx: &RenderContext) -> Node;
}

/// Renders a tag listing from [`RenderContext::category`].
pub trait TagPage: Send + Sync {
    fn body(&self, cx: &RenderContext) -> Node;
}

/// Renders the error page from [`RenderContext::http_error`].
pub trait ErrorPage: Send + Sync {
    fn error(&self) -> HttpError {
        HttpError::page_not_found()
    }
    fn body(&self, cx: &RenderContext) -> Node;
}

pub struct Site {
    config: Arc<SiteConfig>,
    home: Arc<dyn StaticPage>,
    pages: Vec<Arc<dyn StaticPage>>,
    article_pages: Vec<Arc<dyn ArticlePage>>,
    tag_page: Option<Arc<dyn TagPage>>,
    error_page: Option<Arc<dyn ErrorPage>>,
    layout: Arc<dyn Layout>,
    markdown: Arc<dyn MarkdownRenderer>,
}

impl std::fmt::Debug for Site {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Site")
            .field("name", &self.config.name)
            .field("pages", &self.pages.len())
            .field("article_pages", &self.article_pages.len())
            .field("tag_page", &self.tag_page.is_some())
            .field("error_page", &self.error_page.is_some())
            .finish()
    }
}

impl Site {
    /// A site with the listing home page, the standard document layout, and
    /// nothing else.
    pub fn new(config: SiteConfig) -> Self {
        Self {
            config: Arc::new(config),
            home: Arc::new(HomeListing),
            pages: Vec::new(),
            article_pages: Vec::new(),
            tag_page: None,
            error_page: None,
            layout: Arc::new(StandardLayout),
            markdown: Arc::new(PulldownRenderer),
        }
    }

    /// A site using every built-in layout.
    pub fn standard(config: SiteConfig) -> Self {
        Self::new(config)
            .article_page(StandardArticle)
            .tag_page(TagListing)
            .error_page(NotFound)
    }

    pub fn home(mut self, page: impl StaticPage + 'static) -> Self {
        self.home = Arc::new(page);
        self
    }

    pub fn page(mut self, page: impl StaticPage + 'static) -> Self {
        self.pages.push(Arc::new(page));
        self
    }

    /// The first article page added is the default for articles without a
    /// `layout` key.
    pub fn article_page(mut self, page: impl ArticlePage + 'static) -> Self {
        self.article_pages.push(Arc::new(page));
        self
    }

    pub fn tag_page(mut self, page: impl TagPage + 'static) -> Self {
        self.tag_page = Some(Arc::new(page));
        self
    }

    pub fn error_page(mut self, page: impl ErrorPage + 'static) -> Self {
        self.error_page = Some(Arc::new(page));
        self
    }

    pub fn layout(mut self, layout: impl Layout + 'static) -> Self {
        self.layout = Arc::new(layout);
        self
    }

    pub fn markdown(mut self, renderer: impl MarkdownRenderer + 'static) -> Self {
        self.markdown = Arc::new(renderer);
        self
    }

    pub fn config(&self) -> &Arc<SiteConfig> {
        &self.config
    }

    pub fn home_page(&self) -> &Arc<dyn StaticPage> {
        &self.home
    }

    pub fn static_pages(&self) -> &[Arc<dyn StaticPage>] {
        &self.pages
    }

    pub fn article_pages(&self) -> &[Arc<dyn ArticlePage>] {
        &self.article_pages
    }

    pub fn tag_layout(&self) -> Option<&Arc<dyn TagPage>> {
        self.tag_page.as_ref()
    }

    pub fn error_layout(&self) -> Option<&Arc<dyn ErrorPage>> {
        self.error_page.as_ref()
    }

    pub fn main_layout(&self) -> &Arc<dyn Layout> {
        &self.layout
    }

    pub fn markdown_renderer(&self) -> &dyn MarkdownRenderer {
        self.markdown.as_ref()
    }

    /// The article page for a `layout` front-matter value.
    pub fn article_page_named(&self, name: &str) -> Option<&Arc<dyn ArticlePage>> {
        self.article_pages.iter().find(|p| p.name() == name)
    }
}

// ============================================================================
// Standard document
// ============================================================================

/// `<head>` contents shared by every built-in layout.
pub fn standard_head() -> Node {
    component("standard head", Kind::Head, |cx| {
        let site = cx.site();
        let page = cx.page();
        let themes = cx.environment().get::<ThemesKey>();

        let mut items = vec![
            meta_charset(),
            meta_tag("viewport", "width=device-width, initial-scale=1"),
            meta_tag("generator", format!("kindling v{}", env!("CARGO_PKG_VERSION"))),
        ];
        if !page.description.is_empty() {
            items.push(meta_tag("description", page.description.clone()));
        }
        if !site.author.is_empty() {
            items.push(meta_tag("author", site.author.clone()));
        }
        items.push(title(site.full_title(&page.title)));

        items.push(meta_property("og:site_name", site.name.clone()));
        items.push(meta_property("og:title", page.title.clone()));
        if !page.description.is_empty() {
            items.push(meta_property("og:description", page.description.clone()));
        }
        if !page.url.is_empty() {
            items.push(meta_property("og:url", page.url.clone()));
        }
        if let Some(image) = &page.image {
            items.push(meta_property("og:image", image.clone()));
        }

        items.push(meta_link(THEMES_CSS_PATH, "stylesheet"));
        items.push(meta_link(STYLES_CSS_PATH, "stylesheet"));
        if site.builtin_icons {
            items.push(meta_link(ICONS_CSS_PATH, "stylesheet"));
        }
        if !page.url.is_empty() {
            items.push(meta_link(page.url.clone(), "canonical"));
        }
        if let Some(favicon) = &site.favicon {
            items.push(meta_link(favicon.clone(), "icon"));
        }
        if site.feed.enabled {
            items.push(
                meta_link(site.feed.path.clone(), "alternate")
                    .attribute("type", "application/rss+xml")
                    .attribute("title", site.name.clone()),
            );
        }
        if site.manifest.enabled {
            items.push(meta_link(MANIFEST_PATH, "manifest"));
        }
        if themes.len() > 1 {
            items.push(script_code(THEME_SWITCHER));
        }
        group(items)
    })
}

/// The full document around a route body.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLayout;

impl Layout for StandardLayout {
    fn render(&self, content: Node, cx: &RenderContext) -> Node {
        let site = cx.site();
        let theme = site
            .default_theme()
            .map(|t| t.id.clone())
            .unwrap_or_else(|| "light".to_string());
        let main = section([content])
            .class("container")
            .style_rule(
                Style::new()
                    .declaration("padding-top", "2rem")
                    .declaration("padding-bottom", "2rem")
                    .when(MediaQuery::Breakpoint(Breakpoint::Medium)),
            )
            .attribute("role", "main");
        document(
            &site.language,
            &theme,
            head([standard_head()]),
            body([main, footer(cx)]),
        )
    }
}

fn footer(cx: &RenderContext) -> Node {
    let themes = cx.environment().get::<ThemesKey>();
    let switcher: Vec<Node> = if themes.len() > 1 {
        themes
            .iter()
            .map(|theme| {
                span(theme.id.clone())
                    .class("theme-choice")
                    .attribute("role", "button")
                    .on_click([crate::event::Action::SwitchTheme(theme.id.clone())])
            })
            .collect()
    } else {
        Vec::new()
    };
    section([divider(), group(switcher)]).class("container footer")
}

// ============================================================================
// Built-in pages
// ============================================================================

fn newest_first(content: &[Arc<Content>]) -> Vec<Arc<Content>> {
    let mut sorted = content.to_vec();
    sorted.sort_by(|a, b| b.date.cmp(&a.date).then_with(|| a.path.cmp(&b.path)));
    sorted
}

fn article_summary(article: &Content) -> Node {
    group([
        heading(3, link(article.title.clone(), article.path.clone())),
        text(emphasis(article.date.format("%B %-d, %Y").to_string())),
        if article.description.is_empty() {
            Node::Empty
        } else {
            text(article.description.clone())
        },
    ])
}

/// Lists every article, newest first.
#[derive(Debug, Clone, Copy, Default)]
pub struct HomeListing;

impl StaticPage for HomeListing {
    fn path(&self) -> String {
        String::new()
    }

    fn title(&self) -> String {
        "Home".to_string()
    }

    fn body(&self, cx: &RenderContext) -> Node {
        let site = cx.site();
        let content = cx.environment().get::<AllContentKey>();
        let articles: Vec<Node> = newest_first(&content)
            .iter()
            .map(|a| article_summary(a))
            .collect();
        group([
            heading(1, site.name.clone()),
            if site.description.is_empty() {
                Node::Empty
            } else {
                text(site.description.clone()).class("lead")
            },
            list(articles).class("list-unstyled"),
        ])
    }
}

/// Title, byline, tags, then the rendered Markdown.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardArticle;

impl ArticlePage for StandardArticle {
    fn name(&self) -> &str {
        "Article"
    }

    fn body(&self, cx: &RenderContext) -> Node {
        let article = cx.article();
        let minutes = article.estimated_reading_minutes();
        let mut byline = vec![article.date.format("%B %-d, %Y").to_string()];
        if let Some(author) = article.author() {
            byline.push(author.to_string());
        }
        byline.push(format!("{minutes} min read"));

        group([
            heading(1, article.title.clone()),
            article
                .subtitle()
                .map(|s| heading(2, s.to_string()).class("text-secondary"))
                .unwrap_or_default(),
            text(emphasis(byline.join(" · "))),
            if article.has_tags() {
                section(article.tag_links()).class("tags")
            } else {
                Node::Empty
            },
            raw(article.body.clone()),
        ])
    }
}

/// Articles carrying the current tag, or every tagged article on `/tags`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TagListing;

impl TagPage for TagListing {
    fn body(&self, cx: &RenderContext) -> Node {
        let category = cx.category();
        let heading_text = match &category.name {
            Some(name) => format!("Tagged “{name}”"),
            None => "Tags".to_string(),
        };
        let articles: Vec<Node> = newest_first(&category.articles)
            .iter()
            .map(|a| article_summary(a))
            .collect();
        group([heading(1, heading_text), list(articles).class("list-unstyled")])
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct NotFound;

impl ErrorPage for NotFound {
    fn body(&self, cx: &RenderContext) -> Node {
        let error = cx.http_error();
        group([
            heading(1, error.title),
            text(error.description),
            text(link("Return to the home page", "/")),
        ])
    }
}
