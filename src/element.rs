//! Element composition.
//!
//! A page is a tree of [`Node`]s. Nodes are plain values: cloning is cheap
//! enough, and every modifier consumes a node and returns a new one, so a
//! node that has been handed to a modifier can never be observed changing.
//!
//! ## Node variants
//!
//! | Variant | Renders as | Holds attributes? |
//! |---------|------------|-------------------|
//! | `Empty` | nothing | no |
//! | `Text` | escaped text | no |
//! | `Raw` | pre-rendered markup | no |
//! | `Group` | children, concatenated | no |
//! | `Component` | whatever its closure builds at render time | no |
//! | `Primitive` | `<tag attrs>children</tag>` | yes |
//!
//! ## Modifiers
//!
//! Only primitives carry [`CoreAttributes`]. Applying a modifier to any other
//! non-empty node first wraps it in a neutral primitive (`<div>` for block
//! content, `<span>` for inline), then modifies the wrapper. Later modifiers
//! find a primitive and modify it in turn, so a chain adds exactly one
//! wrapper. Modifying an empty node returns it unchanged, and a wrapper whose
//! content renders nothing at render time (a component that builds
//! `Node::Empty`, say) renders nothing itself.
//!
//! ```text
//! group([a, b]).class("x").id("y")  →  <div id="y" class="x">ab</div>
//! text("Hi").class("x")             →  <p class="x">Hi</p>
//! Node::Empty.class("x")            →  (nothing)
//! ```

use crate::attributes::{Attribute, CoreAttributes, InlineStyle, escape_html};
use crate::event::{Action, EventType};
use crate::render::RenderContext;
use crate::style::Style;
use crate::theme::kebab_case;
use std::fmt;
use std::sync::Arc;

/// Anything that produces markup against a render context.
pub trait Render {
    fn render(&self, cx: &RenderContext) -> String;
}

/// Where a node may appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Kind {
    /// Standalone structural content.
    Block,
    /// Participates in text flow.
    Inline,
    /// Belongs in the document `<head>`.
    Head,
}

type Builder = dyn Fn(&RenderContext) -> Node + Send + Sync;

/// Content whose shape depends on the environment at render time.
#[derive(Clone)]
pub struct Component {
    name: &'static str,
    kind: Kind,
    body: Arc<Builder>,
}

impl fmt::Debug for Component {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Component")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// An element that owns its attributes.
#[derive(Debug, Clone)]
pub struct Primitive {
    tag: String,
    kind: Kind,
    void: bool,
    attributes: CoreAttributes,
    rules: Vec<Style>,
    children: Vec<Node>,
    /// Set on modifier wrappers: render nothing when the children do.
    collapse_empty: bool,
}

impl Primitive {
    pub fn new(tag: impl Into<String>, kind: Kind) -> Self {
        Self {
            tag: tag.into(),
            kind,
            void: false,
            attributes: CoreAttributes::new(),
            rules: Vec::new(),
            children: Vec::new(),
            collapse_empty: false,
        }
    }

    /// An element with no closing tag (`<img>`, `<meta>`, `<link>`, `<hr>`).
    pub fn void(tag: impl Into<String>, kind: Kind) -> Self {
        Self {
            void: true,
            ..Self::new(tag, kind)
        }
    }

    pub fn child(mut self, node: impl Into<Node>) -> Self {
        self.children.push(node.into());
        self
    }

    pub fn children<I, N>(mut self, nodes: I) -> Self
    where
        I: IntoIterator<Item = N>,
        N: Into<Node>,
    {
        self.children.extend(nodes.into_iter().map(Into::into));
        self
    }

    pub fn with_attribute(mut self, attribute: Attribute) -> Self {
        self.attributes.append_custom(attribute);
        self
    }

    pub fn tag(&self) -> &str {
        &self.tag
    }

    pub fn attributes(&self) -> &CoreAttributes {
        &self.attributes
    }

    pub fn attributes_mut(&mut self) -> &mut CoreAttributes {
        &mut self.attributes
    }

    pub fn add_rule(&mut self, style: Style) {
        if !style.is_empty() {
            self.rules.push(style);
        }
    }

    pub fn into_node(self) -> Node {
        Node::Primitive(Box::new(self))
    }
}

impl Render for Primitive {
    fn render(&self, cx: &RenderContext) -> String {
        let contents: String = if self.void {
            String::new()
        } else {
            self.children.iter().map(|c| c.render(cx)).collect()
        };
        if self.collapse_empty && contents.is_empty() {
            return String::new();
        }

        let mut attributes = self.attributes.clone();
        for rule in &self.rules {
            if let Some(class) = cx.register_style(rule) {
                attributes.append_classes([class]);
            }
        }
        let rewrite = |path: &str| cx.path(path);
        if self.void {
            format!("<{}{}>", self.tag, attributes.render_with(&rewrite))
        } else {
            attributes.wrap(&self.tag, &contents, &rewrite)
        }
    }
}

#[derive(Debug, Clone, Default)]
pub enum Node {
    #[default]
    Empty,
    Text(String),
    Raw(String),
    Group(Vec<Node>),
    Component(Component),
    Primitive(Box<Primitive>),
}

impl From<&str> for Node {
    fn from(text: &str) -> Self {
        Node::Text(text.to_string())
    }
}

impl From<String> for Node {
    fn from(text: String) -> Self {
        Node::Text(text)
    }
}

impl From<Primitive> for Node {
    fn from(primitive: Primitive) -> Self {
        primitive.into_node()
    }
}

impl From<Vec<Node>> for Node {
    fn from(nodes: Vec<Node>) -> Self {
        Node::Group(nodes)
    }
}

impl<T: Into<Node>> From<Option<T>> for Node {
    fn from(node: Option<T>) -> Self {
        node.map(Into::into).unwrap_or(Node::Empty)
    }
}

impl Render for Node {
    fn render(&self, cx: &RenderContext) -> String {
        match self {
            Node::Empty => String::new(),
            Node::Text(text) => escape_html(text),
            Node::Raw(markup) => markup.clone(),
            Node::Group(children) => children.iter().map(|c| c.render(cx)).collect(),
            Node::Component(component) => (component.body)(cx).render(cx),
            Node::Primitive(primitive) => primitive.render(cx),
        }
    }
}

impl Node {
    pub fn kind(&self) -> Kind {
        match self {
            Node::Empty | Node::Text(_) => Kind::Inline,
            Node::Raw(_) | Node::Group(_) => Kind::Block,
            Node::Component(component) => component.kind,
            Node::Primitive(primitive) => primitive.kind,
        }
    }

    /// True for content that statically renders as nothing.
    pub fn is_empty(&self) -> bool {
        match self {
            Node::Empty => true,
            Node::Text(text) | Node::Raw(text) => text.is_empty(),
            Node::Group(children) => children.iter().all(Node::is_empty),
            Node::Component(_) | Node::Primitive(_) => false,
        }
    }

    pub fn as_primitive(&self) -> Option<&Primitive> {
        match self {
            Node::Primitive(primitive) => Some(primitive),
            _ => None,
        }
    }

    /// Apply `change` to this node's attribute holder, wrapping non-primitive
    /// content first.
    pub fn modify(self, change: impl FnOnce(&mut Primitive)) -> Node {
        match self {
            node if node.is_empty() => node,
            Node::Primitive(mut primitive) => {
                change(&mut primitive);
                Node::Primitive(primitive)
            }
            other => {
                let mut wrapper = match other.kind() {
                    Kind::Inline => Primitive::new("span", Kind::Inline),
                    Kind::Block | Kind::Head => Primitive::new("div", Kind::Block),
                }
                .child(other);
                wrapper.collapse_empty = true;
                change(&mut wrapper);
                wrapper.into_node()
            }
        }
    }

    pub fn id(self, id: impl Into<String>) -> Node {
        let id = id.into();
        self.modify(|p| p.attributes.set_id(id))
    }

    pub fn class(self, class: impl Into<String>) -> Node {
        let class = class.into();
        self.modify(|p| p.attributes.append_classes([class]))
    }

    pub fn classes<I, S>(self, classes: I) -> Node
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let classes: Vec<String> = classes.into_iter().map(|c| c.as_ref().to_string()).collect();
        self.modify(|p| p.attributes.append_classes(classes))
    }

    /// Inline `style="property: value"`.
    pub fn style(self, property: impl Into<String>, value: impl Into<String>) -> Node {
        let style = InlineStyle::new(property, value);
        self.modify(|p| p.attributes.append_style(style))
    }

    /// Attach a declarative style; it is resolved into a generated class when
    /// the node renders.
    pub fn style_rule(self, style: Style) -> Node {
        self.modify(|p| p.add_rule(style))
    }

    pub fn attribute(self, name: impl Into<String>, value: impl Into<String>) -> Node {
        let attribute = Attribute::new(name, value);
        self.modify(|p| p.attributes.append_custom(attribute))
    }

    pub fn flag(self, name: impl Into<String>) -> Node {
        let attribute = Attribute::flag(name);
        self.modify(|p| p.attributes.append_custom(attribute))
    }

    pub fn data(self, name: impl Into<String>, value: impl Into<String>) -> Node {
        let (name, value) = (name.into(), value.into());
        self.modify(|p| p.attributes.append_data(name, value))
    }

    pub fn aria(self, name: impl Into<String>, value: impl Into<String>) -> Node {
        let (name, value) = (name.into(), value.into());
        self.modify(|p| p.attributes.append_aria(name, value))
    }

    /// Merge a whole attribute bundle.
    pub fn attributes(self, attributes: &CoreAttributes) -> Node {
        self.modify(|p| p.attributes.merge(attributes))
    }

    pub fn on(self, event: EventType, actions: impl IntoIterator<Item = Action>) -> Node {
        let actions: Vec<Action> = actions.into_iter().collect();
        self.modify(|p| p.attributes.append_event(event, actions))
    }

    pub fn on_click(self, actions: impl IntoIterator<Item = Action>) -> Node {
        self.on(EventType::Click, actions)
    }

    /// Run `over` when the pointer enters and `out` when it leaves.
    pub fn on_hover(
        self,
        over: impl IntoIterator<Item = Action>,
        out: impl IntoIterator<Item = Action>,
    ) -> Node {
        self.on(EventType::MouseOver, over).on(EventType::MouseOut, out)
    }

    pub fn hidden(self) -> Node {
        self.class("d-none")
    }

    pub fn margin(self, value: impl Into<String>) -> Node {
        self.style("margin", value)
    }

    pub fn padding(self, value: impl Into<String>) -> Node {
        self.style("padding", value)
    }

    pub fn foreground(self, color: impl Into<String>) -> Node {
        self.style("color", color)
    }

    pub fn background(self, color: impl Into<String>) -> Node {
        self.style("background-color", color)
    }

    pub fn opacity(self, value: f64) -> Node {
        self.style("opacity", format!("{value}"))
    }

    pub fn frame_width(self, width: impl Into<String>) -> Node {
        self.style("width", width)
    }
}

// ============================================================================
// Element constructors
// ============================================================================

/// A body paragraph: `<p>…</p>`.
pub fn text(content: impl Into<Node>) -> Node {
    Primitive::new("p", Kind::Block).child(content).into_node()
}

/// `<h1>`…`<h6>`; levels outside 1–6 are clamped.
pub fn heading(level: u8, content: impl Into<Node>) -> Node {
    let level = level.clamp(1, 6);
    Primitive::new(format!("h{level}"), Kind::Block)
        .child(content)
        .into_node()
}

pub fn span(content: impl Into<Node>) -> Node {
    Primitive::new("span", Kind::Inline).child(content).into_node()
}

pub fn strong(content: impl Into<Node>) -> Node {
    Primitive::new("strong", Kind::Inline).child(content).into_node()
}

pub fn emphasis(content: impl Into<Node>) -> Node {
    Primitive::new("em", Kind::Inline).child(content).into_node()
}

pub fn code(content: impl Into<Node>) -> Node {
    Primitive::new("code", Kind::Inline).child(content).into_node()
}

/// `<a href>`; local targets are rewritten at render time.
pub fn link(content: impl Into<Node>, target: impl Into<String>) -> Node {
    Primitive::new("a", Kind::Inline)
        .with_attribute(Attribute::path("href", target))
        .child(content)
        .into_node()
}

pub fn image(src: impl Into<String>, alt: impl Into<String>) -> Node {
    Primitive::void("img", Kind::Inline)
        .with_attribute(Attribute::path("src", src))
        .with_attribute(Attribute::new("alt", alt))
        .into_node()
}

pub fn script_file(src: impl Into<String>) -> Node {
    Primitive::new("script", Kind::Block)
        .with_attribute(Attribute::path("src", src))
        .into_node()
}

pub fn script_code(code: impl Into<String>) -> Node {
    Primitive::new("script", Kind::Block)
        .child(Node::Raw(code.into()))
        .into_node()
}

pub fn meta_charset() -> Node {
    Primitive::void("meta", Kind::Head)
        .with_attribute(Attribute::new("charset", "utf-8"))
        .into_node()
}

pub fn meta_tag(name: impl Into<String>, content: impl Into<String>) -> Node {
    Primitive::void("meta", Kind::Head)
        .with_attribute(Attribute::new("name", name))
        .with_attribute(Attribute::new("content", content))
        .into_node()
}

/// `<meta property=… content=…>`, used by Open Graph tags.
pub fn meta_property(property: impl Into<String>, content: impl Into<String>) -> Node {
    Primitive::void("meta", Kind::Head)
        .with_attribute(Attribute::new("property", property))
        .with_attribute(Attribute::new("content", content))
        .into_node()
}

pub fn meta_link(href: impl Into<String>, rel: impl Into<String>) -> Node {
    Primitive::void("link", Kind::Head)
        .with_attribute(Attribute::path("href", href))
        .with_attribute(Attribute::new("rel", rel))
        .into_node()
}

pub fn title(text: impl Into<String>) -> Node {
    Primitive::new("title", Kind::Head)
        .child(Node::Text(text.into()))
        .into_node()
}

/// A generic block container: `<div>`.
pub fn section<I, N>(children: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Primitive::new("div", Kind::Block).children(children).into_node()
}

/// Children rendered back to back with no wrapper.
pub fn group<I, N>(children: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Node::Group(children.into_iter().map(Into::into).collect())
}

fn list_with_tag<I, N>(tag: &str, items: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    let items = items.into_iter().map(|item| {
        let node = item.into();
        match node.as_primitive() {
            Some(p) if p.tag() == "li" => node,
            _ => Primitive::new("li", Kind::Block).child(node).into_node(),
        }
    });
    Primitive::new(tag, Kind::Block).children(items).into_node()
}

/// `<ul>`; items that are not already `<li>` get wrapped.
pub fn list<I, N>(items: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    list_with_tag("ul", items)
}

pub fn ordered_list<I, N>(items: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    list_with_tag("ol", items)
}

pub fn list_item(content: impl Into<Node>) -> Node {
    Primitive::new("li", Kind::Block).child(content).into_node()
}

pub fn divider() -> Node {
    Primitive::void("hr", Kind::Block).into_node()
}

/// Pre-rendered markup, emitted verbatim.
pub fn raw(markup: impl Into<String>) -> Node {
    Node::Raw(markup.into())
}

/// Text that is HTML-escaped on render. Equivalent to `Node::from(text)`.
pub fn escaped(text: impl Into<String>) -> Node {
    Node::Text(text.into())
}

/// Build content lazily from the render context.
pub fn component<F>(name: &'static str, kind: Kind, body: F) -> Node
where
    F: Fn(&RenderContext) -> Node + Send + Sync + 'static,
{
    Node::Component(Component {
        name,
        kind,
        body: Arc::new(body),
    })
}

pub fn head<I, N>(items: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Primitive::new("head", Kind::Head).children(items).into_node()
}

pub fn body<I, N>(children: I) -> Node
where
    I: IntoIterator<Item = N>,
    N: Into<Node>,
{
    Primitive::new("body", Kind::Block).children(children).into_node()
}

/// `<!doctype html><html lang=… data-bs-theme=… data-theme-state=…>head body</html>`
///
/// `data-theme-state` carries the kebab-cased theme id that theme-scoped
/// styles select on.
pub fn document(language: &str, theme: &str, head: Node, body: Node) -> Node {
    let html = Primitive::new("html", Kind::Block)
        .with_attribute(Attribute::new("lang", language))
        .with_attribute(Attribute::new("data-bs-theme", theme))
        .with_attribute(Attribute::new("data-theme-state", kebab_case(theme)))
        .child(head)
        .child(body);
    group([raw("<!doctype html>"), html.into_node()])
}
