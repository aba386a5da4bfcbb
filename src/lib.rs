//! # Kindling
//!
//! A static site generator where pages are Rust values. Layouts build trees
//! of typed elements, modifiers attach attributes and styles to them, and the
//! publishing pipeline renders every route of the site into plain HTML, CSS,
//! and the usual companions: feed, sitemap, robots file, web app manifest.
//!
//! # Architecture: Declare, Render, Publish
//!
//! ```text
//! 1. Declare   Site { config, home, pages, article/tag/error layouts }
//! 2. Render    Node tree + Environment  →  HTML string + style rules
//! 3. Publish   routes → staging dir → build dir (swapped in on success)
//! ```
//!
//! Element trees are built fresh for every route and never shared between
//! renders. What a layout needs to know about its surroundings (the site,
//! the current article, the current tag) comes from a typed, scoped
//! [`environment::Environment`] rather than from constructor arguments, so
//! deep components read context without it being threaded through every
//! call.
//!
//! # Module Map
//!
//! | Module | Role |
//! |--------|------|
//! | [`attributes`] | `CoreAttributes`: id, classes, inline styles, custom, data, aria, events; rendering order |
//! | [`event`] | Event types and actions compiled to inline JavaScript handlers |
//! | [`element`] | `Node` trees, primitives, components, modifiers, element constructors |
//! | [`environment`] | Typed keys and scoped values visible while rendering |
//! | [`style`] | Conditional styles resolved to hashed class names and CSS rules |
//! | [`theme`] | Themes, breakpoints, and the theme stylesheet |
//! | [`render`] | `RenderContext` and path rewriting for subsites and relative output |
//! | [`markdown`] | The Markdown renderer seam and its pulldown-cmark implementation |
//! | [`content`] | Loaded articles: front matter, dates, tags, reading time |
//! | [`site`] | Site declaration, layout traits, built-in layouts |
//! | [`config`] | `config.toml` loading, validation, stock defaults |
//! | [`publish`] | The build: routes, parallel rendering, staged writing |
//! | [`feed`], [`sitemap`], [`robots`], [`manifest`] | Auxiliary output generators |
//! | [`output`] | CLI output formatting |
//!
//! # Design Decisions
//!
//! ## Styles Become Classes
//!
//! A style attached with a modifier never ends up inline. It is resolved
//! against the active theme's breakpoints, hashed into a `style-xxxxxxxx`
//! class, and collected into one `css/styles.min.css` for the whole site.
//! Identical styles on different pages share a class and a rule.
//!
//! ## Paths Are Rewritten at Render Time
//!
//! Elements store paths exactly as the layout wrote them (`/css/site.css`).
//! The render context rewrites them for the configured base URL: a site at
//! `https://example.com/blog` gets `/blog/css/site.css`, and with relative
//! paths enabled, `blog/css/site.css`. External URLs pass through untouched.
//!
//! ## Staged Output
//!
//! A build writes into a sibling staging directory and replaces the output
//! directory only after every file is written. A failed build leaves the
//! previous output in place and nothing half-written beside it.
//!
//! ## Maud for Escaping
//!
//! Attribute values and text are escaped with [Maud](https://maud.lambda.xyz/)'s
//! escaper. The element tree itself is built at runtime, so the markup is
//! assembled by the tree and Maud only guarantees the escaping.

pub mod attributes;
pub mod config;
pub mod content;
pub mod element;
pub mod environment;
pub mod event;
pub mod feed;
pub mod manifest;
pub mod markdown;
pub mod output;
pub mod publish;
pub mod render;
pub mod robots;
pub mod site;
pub mod sitemap;
pub mod style;
pub mod theme;

#[cfg(test)]
pub(crate) mod test_helpers;
