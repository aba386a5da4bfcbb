//! The publishing pipeline.
//!
//! One [`PublishingContext`] drives one build:
//!
//! ```text
//! 1. Validate   source dir exists and holds config.toml
//! 2. Load       content/**/*.md → Vec<Content>        (markdown renderer)
//! 3. Enumerate  home, static pages, articles, tags, error page → Vec<Route>
//! 4. Render     every route in parallel                (rayon, one Environment per route)
//! 5. Write      staging dir: routes, assets/, css, sitemap, feed, robots, manifest
//! 6. Swap       build dir → .dist.old, staging dir → build dir, drop .dist.old
//! ```
//!
//! Steps 1–3 fail before anything touches the disk. A build directory that
//! is the source directory, or one of its parents, is rejected in step 1. Rendering is
//! side-effect free; its per-route style sheets, warnings, and sitemap
//! entries are reduced once every route has rendered. Writing happens in a
//! staging directory next to the build directory, so a failed build leaves
//! the previous output untouched and no partial site behind.
//!
//! ## Output Structure
//!
//! ```text
//! dist/
//! ├── index.html                 # home (priority 1.0)
//! ├── about/index.html           # static page (0.9)
//! ├── posts/hello/index.html     # article (0.8)
//! ├── tags/index.html            # all tags (0.7)
//! ├── tags/rust/index.html       # one tag (0.6)
//! ├── 404.html                   # error page (not in the sitemap)
//! ├── css/themes.min.css
//! ├── css/styles.min.css         # every generated style class
//! ├── sitemap.xml
//! ├── feed.rss
//! ├── robots.txt
//! ├── manifest.webmanifest
//! └── …                          # assets/ copied verbatim
//! ```

use crate::config::{ConfigError, SiteConfig, effective_threads, load_config};
use crate::content::{Category, Content, HttpError, load_content};
use crate::element::Render;
use crate::environment::{
    ActiveThemeKey, AllContentKey, ArticleKey, CategoryKey, Environment, HttpErrorKey, PageKey,
    RenderingPathKey, SiteKey, ThemesKey,
};
use crate::feed::render_feed;
use crate::manifest::render_manifest;
use crate::markdown::MarkdownError;
use crate::render::{PageMetadata, RenderContext, absolute_url, is_external};
use crate::robots::render_robots;
use crate::site::{ArticlePage, ErrorPage, Site, StaticPage, TagPage};
use crate::sitemap::{Location, render_sitemap};
use crate::style::StyleSheet;
use crate::theme::{Theme, generate_themes_css};
use rayon::prelude::*;
use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use walkdir::WalkDir;

#[derive(Error, Debug)]
pub enum PublishingError {
    #[error("Source directory not found: {0}")]
    MissingSourceDirectory(PathBuf),
    #[error("No config.toml in {0}; run the build from a site root")]
    MissingSiteRoot(PathBuf),
    #[error("Unable to open {path}: {source}")]
    UnopenableFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to parse Markdown in {path}: {message}")]
    BadMarkdown { path: PathBuf, message: String },
    #[error("Content dates should be in the format 2024-05-24 15:30. ({0})")]
    BadContentDateFormat(PathBuf),
    #[error("Content has no layout, and the site declares no article page to use by default")]
    MissingDefaultLayout,
    #[error("Content requested the article layout {0:?}, which the site does not declare")]
    MissingNamedLayout(String),
    #[error("Build directory {build} is or contains the site source {site}")]
    BuildDirectoryOverlapsSource { build: PathBuf, site: PathBuf },
    #[error("Two routes write to the same location: {0}")]
    DuplicateDirectory(PathBuf),
    #[error("Unable to create build directory {path}: {source}")]
    FailedToCreateBuildDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to write {path}: {source}")]
    FailedToCreateBuildFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Unable to write feed: {0}")]
    FailedToWriteFeed(#[source] std::io::Error),
    #[error("Unable to serialize manifest: {0}")]
    Manifest(#[from] serde_json::Error),
    #[error("Unable to start render workers: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
}

impl From<MarkdownError> for PublishingError {
    fn from(error: MarkdownError) -> Self {
        match error {
            MarkdownError::Unopenable { path, source } => {
                PublishingError::UnopenableFile { path, source }
            }
            MarkdownError::BadMarkdown { path, message } => {
                PublishingError::BadMarkdown { path, message }
            }
        }
    }
}

// ============================================================================
// Routes
// ============================================================================

/// What a route renders.
#[derive(Clone)]
pub enum RouteSource {
    Home(Arc<dyn StaticPage>),
    Static(Arc<dyn StaticPage>),
    Article {
        content: Arc<Content>,
        page: Arc<dyn ArticlePage>,
    },
    Tag {
        category: Arc<Category>,
        page: Arc<dyn TagPage>,
    },
    Error {
        error: HttpError,
        page: Arc<dyn ErrorPage>,
    },
}

impl RouteSource {
    pub fn label(&self) -> &'static str {
        match self {
            RouteSource::Home(_) => "Home",
            RouteSource::Static(_) => "Page",
            RouteSource::Article { .. } => "Article",
            RouteSource::Tag { .. } => "Tag",
            RouteSource::Error { .. } => "Error",
        }
    }
}

/// One rendered output file.
#[derive(Clone)]
pub struct Route {
    /// Site-relative path without leading or trailing slashes.
    pub path: String,
    /// Sitemap priority; `None` keeps the route out of the sitemap.
    pub priority: Option<f64>,
    pub source: RouteSource,
}

impl Route {
    /// File written for this route, relative to the build directory.
    pub fn output_file(&self) -> PathBuf {
        match self.source {
            RouteSource::Error { .. } => PathBuf::from(&self.path),
            _ if self.path.is_empty() => PathBuf::from("index.html"),
            _ => Path::new(&self.path).join("index.html"),
        }
    }
}

impl std::fmt::Debug for Route {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Route")
            .field("kind", &self.source.label())
            .field("path", &self.path)
            .field("priority", &self.priority)
            .finish()
    }
}

fn route_path(path: &str) -> String {
    path.trim_matches('/').to_string()
}

// ============================================================================
// Build report
// ============================================================================

/// One written route, for CLI output.
#[derive(Debug, Clone, PartialEq)]
pub struct RouteReport {
    pub kind: &'static str,
    pub title: String,
    pub output: PathBuf,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BuildReport {
    pub routes: Vec<RouteReport>,
    /// Auxiliary files (css, sitemap, feed, robots, manifest), relative to
    /// the build directory.
    pub generated: Vec<PathBuf>,
    pub assets_copied: usize,
    pub style_rules: usize,
    pub warnings: Vec<String>,
}

struct RenderedRoute {
    report: RouteReport,
    html: String,
    styles: StyleSheet,
    warnings: BTreeSet<String>,
    location: Option<Location>,
}

/// The immutable per-build part of every route's environment.
struct Baseline {
    site: Arc<SiteConfig>,
    content: Arc<Vec<Arc<Content>>>,
    themes: Arc<Vec<Theme>>,
}

impl Baseline {
    fn environment(&self) -> Environment {
        let mut environment = Environment::new();
        environment.set::<SiteKey>(Arc::clone(&self.site));
        environment.set::<AllContentKey>(Arc::clone(&self.content));
        environment.set::<ThemesKey>(Arc::clone(&self.themes));
        environment.set::<ActiveThemeKey>(self.themes.first().cloned().map(Arc::new));
        environment
    }
}

// ============================================================================
// Publishing context
// ============================================================================

pub struct PublishingContext {
    site: Site,
    source: PathBuf,
    build_dir: PathBuf,
    content: Vec<Arc<Content>>,
    warnings: BTreeSet<String>,
}

impl PublishingContext {
    /// Check that `source` is a site root and that replacing `build_dir`
    /// cannot remove it. Nothing is loaded yet.
    pub fn new(
        site: Site,
        source: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Result<Self, PublishingError> {
        let source = source.into();
        let build_dir = build_dir.into();
        check_paths(&source, &build_dir)?;
        Ok(Self {
            site,
            source,
            build_dir,
            content: Vec::new(),
            warnings: BTreeSet::new(),
        })
    }

    /// Load `config.toml` from `source` and publish with the built-in
    /// layouts.
    pub fn from_source(
        source: impl Into<PathBuf>,
        build_dir: impl Into<PathBuf>,
    ) -> Result<Self, PublishingError> {
        let source = source.into();
        let build_dir = build_dir.into();
        check_paths(&source, &build_dir)?;
        let config = load_config(&source)?;
        Self::new(Site::standard(config), source, build_dir)
    }

    pub fn site(&self) -> &Site {
        &self.site
    }

    pub fn config(&self) -> &SiteConfig {
        self.site.config()
    }

    pub fn content(&self) -> &[Arc<Content>] {
        &self.content
    }

    pub fn warnings(&self) -> &BTreeSet<String> {
        &self.warnings
    }

    pub fn content_dir(&self) -> PathBuf {
        self.source.join(&self.config().content_root)
    }

    /// Parse every Markdown file under the content directory.
    pub fn load_content(&mut self) -> Result<(), PublishingError> {
        let dir = self.content_dir();
        log::info!("Loading content from {}", dir.display());
        let loaded = load_content(&dir, self.site.markdown_renderer())?;
        log::info!("Loaded {} content files", loaded.content.len());
        self.content = loaded.content;
        self.warnings.extend(loaded.warnings);
        Ok(())
    }

    /// Every route the build writes, in render order.
    pub fn routes(&self) -> Result<Vec<Route>, PublishingError> {
        let mut routes = vec![Route {
            path: route_path(&self.site.home_page().path()),
            priority: Some(1.0),
            source: RouteSource::Home(Arc::clone(self.site.home_page())),
        }];

        for page in self.site.static_pages() {
            routes.push(Route {
                path: route_path(&page.path()),
                priority: Some(0.9),
                source: RouteSource::Static(Arc::clone(page)),
            });
        }

        for content in &self.content {
            let page = match content.layout() {
                Some(name) => self
                    .site
                    .article_page_named(name)
                    .ok_or_else(|| PublishingError::MissingNamedLayout(name.to_string()))?,
                None => self
                    .site
                    .article_pages()
                    .first()
                    .ok_or(PublishingError::MissingDefaultLayout)?,
            };
            routes.push(Route {
                path: route_path(&content.path),
                priority: Some(0.8),
                source: RouteSource::Article {
                    content: Arc::clone(content),
                    page: Arc::clone(page),
                },
            });
        }

        if let Some(page) = self.site.tag_layout() {
            for category in Category::collect(&self.content) {
                let priority = if category.name.is_none() { 0.7 } else { 0.6 };
                routes.push(Route {
                    path: route_path(&category.path),
                    priority: Some(priority),
                    source: RouteSource::Tag {
                        category: Arc::new(category),
                        page: Arc::clone(page),
                    },
                });
            }
        }

        if let Some(page) = self.site.error_layout() {
            routes.push(Route {
                path: "404.html".to_string(),
                priority: None,
                source: RouteSource::Error {
                    error: page.error(),
                    page: Arc::clone(page),
                },
            });
        }

        let mut seen = HashSet::new();
        for route in &routes {
            let output = route.output_file();
            if !seen.insert(output.clone()) {
                return Err(PublishingError::DuplicateDirectory(output));
            }
        }

        Ok(routes)
    }

    fn page_metadata(&self, route: &Route) -> PageMetadata {
        let config = self.config();
        let url = absolute_url(&config.url, &route.path);
        match &route.source {
            RouteSource::Home(page) | RouteSource::Static(page) => PageMetadata {
                title: page.title(),
                description: Some(page.description())
                    .filter(|d| !d.is_empty())
                    .unwrap_or_else(|| config.description.clone()),
                url,
                image: page.image(),
            },
            RouteSource::Article { content, .. } => PageMetadata {
                title: content.title.clone(),
                description: content.description.clone(),
                url,
                image: content.image().map(|image| {
                    if is_external(image) {
                        image.to_string()
                    } else {
                        absolute_url(&config.url, image)
                    }
                }),
            },
            RouteSource::Tag { category, .. } => {
                let title = match &category.name {
                    Some(name) => format!("Tag: {name}"),
                    None => "Tags".to_string(),
                };
                PageMetadata {
                    description: title.clone(),
                    title,
                    url,
                    image: None,
                }
            }
            RouteSource::Error { error, .. } => PageMetadata {
                title: error.title.clone(),
                description: error.description.clone(),
                url,
                image: None,
            },
        }
    }

    /// Render one route against its own copy of the baseline environment.
    fn render_route(&self, route: &Route, environment: Environment) -> RenderedRoute {
        log::debug!("Rendering {} /{}", route.source.label(), route.path);
        let metadata = self.page_metadata(route);
        let title = metadata.title.clone();
        let cx = RenderContext::new(environment);

        let html = {
            let env = cx.environment();
            let _page = env.push::<PageKey>(metadata);
            let _path = env.push::<RenderingPathKey>(route.path.clone());
            let _article = env.push::<ArticleKey>(match &route.source {
                RouteSource::Article { content, .. } => Some(Arc::clone(content)),
                _ => None,
            });
            let _category = env.push::<CategoryKey>(match &route.source {
                RouteSource::Tag { category, .. } => Some(Arc::clone(category)),
                _ => None,
            });
            let _error = env.push::<HttpErrorKey>(match &route.source {
                RouteSource::Error { error, .. } => Some(error.clone()),
                _ => None,
            });

            let body = match &route.source {
                RouteSource::Home(page) | RouteSource::Static(page) => page.body(&cx),
                RouteSource::Article { page, .. } => page.body(&cx),
                RouteSource::Tag { page, .. } => page.body(&cx),
                RouteSource::Error { page, .. } => page.body(&cx),
            };
            self.site.main_layout().render(body, &cx).render(&cx)
        };

        let (styles, warnings) = cx.finish();
        RenderedRoute {
            report: RouteReport {
                kind: route.source.label(),
                title,
                output: route.output_file(),
            },
            html,
            styles,
            warnings,
            location: route
                .priority
                .map(|priority| Location::new(route.path.clone(), priority)),
        }
    }

    fn render_all(&self, routes: &[Route]) -> Result<Vec<RenderedRoute>, PublishingError> {
        let threads = effective_threads(&self.config().processing);
        log::info!("Rendering {} routes on {} threads", routes.len(), threads);

        let baseline = Baseline {
            site: Arc::clone(self.site.config()),
            content: Arc::new(self.content.clone()),
            themes: Arc::new(self.config().themes.clone()),
        };
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build()?;
        let rendered: Vec<RenderedRoute> = pool.install(|| {
            routes
                .par_iter()
                .map_init(
                    || baseline.environment(),
                    |environment, route| self.render_route(route, environment.fork()),
                )
                .collect()
        });
        Ok(rendered)
    }

    /// Run the whole build. The build directory is replaced only when every
    /// step succeeds.
    pub fn publish(mut self) -> Result<BuildReport, PublishingError> {
        self.load_content()?;
        let routes = self.routes()?;
        let rendered = self.render_all(&routes)?;

        let staging = sibling_dir(&self.build_dir, "staging");
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|source| {
                PublishingError::FailedToCreateBuildDirectory {
                    path: staging.clone(),
                    source,
                }
            })?;
        }
        create_dir(&staging)?;

        let report = match self.write_site(&staging, rendered) {
            Ok(report) => report,
            Err(e) => {
                log::debug!("Removing staging directory {}", staging.display());
                let _ = fs::remove_dir_all(&staging);
                return Err(e);
            }
        };

        swap_into_place(&staging, &self.build_dir)?;
        log::info!("Published to {}", self.build_dir.display());

        for warning in &report.warnings {
            log::warn!("{warning}");
        }
        Ok(report)
    }

    fn write_site(
        &self,
        staging: &Path,
        rendered: Vec<RenderedRoute>,
    ) -> Result<BuildReport, PublishingError> {
        let config = self.config();
        let mut report = BuildReport::default();
        let mut styles = StyleSheet::new();
        let mut warnings = self.warnings.clone();
        let mut locations = Vec::new();

        for route in rendered {
            write_file(&staging.join(&route.report.output), &route.html)?;
            styles.extend(route.styles);
            warnings.extend(route.warnings);
            locations.extend(route.location);
            report.routes.push(route.report);
        }

        report.assets_copied = copy_assets(&self.source.join("assets"), staging)?;

        if let Some(css) = generate_themes_css(&config.themes) {
            report.generated.push(write_generated(staging, "css/themes.min.css", &css)?);
        }
        report.style_rules = styles.len();
        report
            .generated
            .push(write_generated(staging, "css/styles.min.css", &styles.to_css())?);

        let sitemap = render_sitemap(&config.url, &locations);
        report.generated.push(write_generated(staging, "sitemap.xml", &sitemap)?);

        if let Some(feed) = render_feed(config, &self.content) {
            let relative = PathBuf::from(route_path(&config.feed.path));
            let path = staging.join(&relative);
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent).map_err(PublishingError::FailedToWriteFeed)?;
            }
            fs::write(&path, feed).map_err(PublishingError::FailedToWriteFeed)?;
            report.generated.push(relative);
        }

        let robots = render_robots(&config.robots);
        report.generated.push(write_generated(staging, "robots.txt", &robots)?);

        if let Some(manifest) = render_manifest(config)? {
            report
                .generated
                .push(write_generated(staging, "manifest.webmanifest", &manifest)?);
        }

        report.warnings = warnings.into_iter().collect();
        Ok(report)
    }
}

/// A site root is a directory holding `config.toml`. The build directory
/// is replaced wholesale, so it must not be the source or one of its parents.
fn check_paths(source: &Path, build_dir: &Path) -> Result<(), PublishingError> {
    if !source.is_dir() {
        return Err(PublishingError::MissingSourceDirectory(source.to_path_buf()));
    }
    if !source.join("config.toml").is_file() {
        return Err(PublishingError::MissingSiteRoot(source.to_path_buf()));
    }
    let site = resolve_path(source);
    let build = resolve_path(build_dir);
    if site.starts_with(&build) {
        return Err(PublishingError::BuildDirectoryOverlapsSource { build, site });
    }
    Ok(())
}

/// Canonicalize the longest existing prefix of `path` and append the rest,
/// so paths that do not exist yet still compare against real ones.
fn resolve_path(path: &Path) -> PathBuf {
    let absolute = std::path::absolute(path).unwrap_or_else(|_| path.to_path_buf());
    let mut existing = absolute.as_path();
    let mut missing = Vec::new();
    loop {
        if let Ok(canonical) = existing.canonicalize() {
            return missing
                .iter()
                .rev()
                .fold(canonical, |resolved, part| resolved.join(part));
        }
        match (existing.parent(), existing.file_name()) {
            (Some(parent), Some(name)) => {
                missing.push(name.to_os_string());
                existing = parent;
            }
            _ => return absolute,
        }
    }
}

/// `dist` → `.dist.<suffix>` in the same parent directory.
fn sibling_dir(build_dir: &Path, suffix: &str) -> PathBuf {
    let name = build_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "build".to_string());
    build_dir.with_file_name(format!(".{name}.{suffix}"))
}

/// Move the previous output aside, move `staging` into its place, then drop
/// the previous output. A failed move restores the previous output.
fn swap_into_place(staging: &Path, build_dir: &Path) -> Result<(), PublishingError> {
    let previous = sibling_dir(build_dir, "old");
    if previous.exists() {
        fs::remove_dir_all(&previous).map_err(|source| {
            PublishingError::FailedToCreateBuildDirectory {
                path: previous.clone(),
                source,
            }
        })?;
    }

    let had_previous = build_dir.exists();
    if had_previous {
        if let Err(source) = fs::rename(build_dir, &previous) {
            let _ = fs::remove_dir_all(staging);
            return Err(PublishingError::FailedToCreateBuildDirectory {
                path: build_dir.to_path_buf(),
                source,
            });
        }
    }

    if let Err(source) = fs::rename(staging, build_dir) {
        if had_previous {
            let _ = fs::rename(&previous, build_dir);
        }
        let _ = fs::remove_dir_all(staging);
        return Err(PublishingError::FailedToCreateBuildDirectory {
            path: build_dir.to_path_buf(),
            source,
        });
    }

    if had_previous {
        if let Err(e) = fs::remove_dir_all(&previous) {
            log::warn!("Unable to remove previous output {}: {e}", previous.display());
        }
    }
    Ok(())
}

fn create_dir(path: &Path) -> Result<(), PublishingError> {
    fs::create_dir_all(path).map_err(|source| PublishingError::FailedToCreateBuildDirectory {
        path: path.to_path_buf(),
        source,
    })
}

fn write_file(path: &Path, contents: &str) -> Result<(), PublishingError> {
    if let Some(parent) = path.parent() {
        create_dir(parent)?;
    }
    log::debug!("Writing {}", path.display());
    fs::write(path, contents).map_err(|source| PublishingError::FailedToCreateBuildFile {
        path: path.to_path_buf(),
        source,
    })
}

fn write_generated(
    staging: &Path,
    relative: &str,
    contents: &str,
) -> Result<PathBuf, PublishingError> {
    write_file(&staging.join(relative), contents)?;
    Ok(PathBuf::from(relative))
}

/// Copy `assets/` into the build root, returning the number of files.
fn copy_assets(assets: &Path, staging: &Path) -> Result<usize, PublishingError> {
    if !assets.is_dir() {
        return Ok(0);
    }
    let mut copied = 0;
    for entry in WalkDir::new(assets).sort_by_file_name() {
        let entry = entry.map_err(|e| PublishingError::UnopenableFile {
            path: e.path().map(Path::to_path_buf).unwrap_or_else(|| assets.to_path_buf()),
            source: e.into(),
        })?;
        if !entry.file_type().is_file() {
            continue;
        }
        let relative = entry.path().strip_prefix(assets).unwrap_or(entry.path());
        let destination = staging.join(relative);
        if let Some(parent) = destination.parent() {
            create_dir(parent)?;
        }
        fs::copy(entry.path(), &destination).map_err(|source| {
            PublishingError::FailedToCreateBuildFile {
                path: destination.clone(),
                source,
            }
        })?;
        copied += 1;
    }
    log::info!("Copied {copied} asset files");
    Ok(copied)
}
