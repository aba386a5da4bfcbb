//! Web app manifest generation (`manifest.webmanifest`).

use crate::config::SiteConfig;
use crate::render::PathRewriter;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct WebManifest<'a> {
    id: String,
    name: &'a str,
    short_name: &'a str,
    lang: &'a str,
    start_url: String,
    scope: String,
    display: &'a str,
    orientation: &'a str,
    theme_color: &'a str,
    background_color: &'a str,
    categories: &'a [String],
    icons: Vec<Icon<'a>>,
}

#[derive(Debug, Serialize)]
struct Icon<'a> {
    src: String,
    sizes: &'a str,
    #[serde(rename = "type")]
    mime_type: &'a str,
}

/// Pretty JSON for the manifest, or `None` when it is disabled. Icon paths,
/// the start URL, the id and the scope all go through the site's path
/// rewriter, so the start URL stays inside the scope under a subsite.
pub fn render_manifest(config: &SiteConfig) -> Result<Option<String>, serde_json::Error> {
    if !config.manifest.enabled {
        return Ok(None);
    }
    let paths = PathRewriter::from_config(config);
    let manifest = &config.manifest;
    let scope = paths.rewrite("/");
    let start_url = format!("{scope}?source=pwa");
    let document = WebManifest {
        id: start_url.clone(),
        name: &config.name,
        short_name: manifest.short_name.as_deref().unwrap_or(&config.name),
        lang: &config.language,
        start_url,
        scope,
        display: "standalone",
        orientation: "any",
        theme_color: &manifest.theme_color,
        background_color: &manifest.background_color,
        categories: &manifest.categories,
        icons: manifest
            .icons
            .iter()
            .map(|icon| Icon {
                src: paths.rewrite(&icon.src),
                sizes: &icon.sizes,
                mime_type: &icon.mime_type,
            })
            .collect(),
    };
    serde_json::to_string_pretty(&document).map(Some)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ManifestIcon;

    fn config_with_icon(url: &str, relative: bool) -> SiteConfig {
        let mut config = SiteConfig {
            url: url.into(),
            use_relative_paths: relative,
            ..SiteConfig::default()
        };
        config.manifest.icons.push(ManifestIcon {
            src: "/images/icon-192.png".into(),
            sizes: "192x192".into(),
            mime_type: "image/png".into(),
        });
        config
    }

    #[test]
    fn disabled_manifest_is_none() {
        let mut config = SiteConfig::default();
        config.manifest.enabled = false;
        assert!(render_manifest(&config).unwrap().is_none());
    }

    #[test]
    fn manifest_fields() {
        let json = render_manifest(&config_with_icon("https://example.com", false))
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["name"], "My Site");
        assert_eq!(value["short_name"], "My Site");
        assert_eq!(value["start_url"], "/?source=pwa");
        assert_eq!(value["display"], "standalone");
        assert_eq!(value["scope"], "/");
        assert_eq!(value["icons"][0]["src"], "/images/icon-192.png");
        assert_eq!(value["icons"][0]["type"], "image/png");
    }

    #[test]
    fn subsite_start_url_stays_in_scope() {
        let json = render_manifest(&config_with_icon("https://example.com/subsite", false))
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["scope"], "/subsite/");
        assert_eq!(value["start_url"], "/subsite/?source=pwa");
        assert_eq!(value["id"], "/subsite/?source=pwa");
        assert_eq!(value["icons"][0]["src"], "/subsite/images/icon-192.png");
    }

    #[test]
    fn icon_paths_follow_subsite_and_relative_mode() {
        let json = render_manifest(&config_with_icon("https://example.com/subsite", true))
            .unwrap()
            .unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["icons"][0]["src"], "subsite/images/icon-192.png");
        assert_eq!(value["scope"], "subsite/");
        assert_eq!(value["start_url"], "subsite/?source=pwa");
    }
}
