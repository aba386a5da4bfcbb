//! Per-element attribute storage.
//!
//! [`CoreAttributes`] is the bundle every primitive element carries. It holds
//! the element id, free-form attributes, CSS classes, inline styles, `data-*`
//! and `aria-*` attributes, and event bindings, and renders them in a fixed
//! order:
//!
//! ```text
//! <tag id="…" custom="…" flag class="a b" style="p: v; q: w" data-x="…" aria-y="…" onclick="…">
//! ```
//!
//! ## Merge semantics
//!
//! | Category | Storage | Duplicate handling |
//! |----------|---------|--------------------|
//! | `id` | single value | last non-empty value wins |
//! | custom attributes | insertion order | same name replaces value in place |
//! | classes | insertion order | duplicates ignored |
//! | inline styles | insertion order | same property replaces value in place |
//! | data / aria | sorted by name | same name replaces value |
//! | events | insertion order | same event type appends actions |
//!
//! Empty ids, empty class names, empty style values and empty attribute names
//! are dropped silently: layouts are composed programmatically and a blank
//! value is treated as "nothing to add".

use crate::event::{Action, Event, EventType};
use maud::html;
use std::collections::BTreeMap;
use std::fmt;

/// HTML-escape text through maud's escaper.
pub fn escape_html(text: &str) -> String {
    html! { (text) }.into_string()
}

/// A free-form attribute. `value == None` renders as a bare boolean attribute.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Attribute {
    pub name: String,
    pub value: AttributeValue,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum AttributeValue {
    /// Rendered escaped, as-is.
    Text(String),
    /// A site path; rewritten by the render context before output.
    Path(String),
    /// Boolean attribute such as `disabled`.
    Flag,
}

impl Attribute {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Text(value.into()),
        }
    }

    pub fn path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Path(path.into()),
        }
    }

    pub fn flag(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: AttributeValue::Flag,
        }
    }
}

/// One `property: value` inline declaration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InlineStyle {
    pub property: String,
    pub value: String,
}

impl InlineStyle {
    pub fn new(property: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            property: property.into(),
            value: value.into(),
        }
    }
}

impl fmt::Display for InlineStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.property, self.value)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CoreAttributes {
    id: String,
    custom: Vec<Attribute>,
    classes: Vec<String>,
    styles: Vec<InlineStyle>,
    data: BTreeMap<String, String>,
    aria: BTreeMap<String, String>,
    events: Vec<Event>,
}

impl CoreAttributes {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn id(&self) -> Option<&str> {
        (!self.id.is_empty()).then_some(self.id.as_str())
    }

    pub fn classes(&self) -> &[String] {
        &self.classes
    }

    pub fn styles(&self) -> &[InlineStyle] {
        &self.styles
    }

    pub fn custom(&self) -> &[Attribute] {
        &self.custom
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn data(&self, name: &str) -> Option<&str> {
        self.data.get(name).map(String::as_str)
    }

    pub fn aria(&self, name: &str) -> Option<&str> {
        self.aria.get(name).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.id.is_empty()
            && self.custom.is_empty()
            && self.classes.is_empty()
            && self.styles.is_empty()
            && self.data.is_empty()
            && self.aria.is_empty()
            && self.events.iter().all(|e| e.actions.is_empty())
    }

    pub fn set_id(&mut self, id: impl Into<String>) {
        let id = id.into();
        if !id.trim().is_empty() {
            self.id = id;
        }
    }

    /// Add classes; whitespace-separated strings are split.
    pub fn append_classes<I, S>(&mut self, classes: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        for class in classes {
            for name in class.as_ref().split_whitespace() {
                if !self.classes.iter().any(|c| c == name) {
                    self.classes.push(name.to_string());
                }
            }
        }
    }

    pub fn remove_class(&mut self, class: &str) {
        self.classes.retain(|c| c != class);
    }

    pub fn append_style(&mut self, style: InlineStyle) {
        if style.property.trim().is_empty() || style.value.trim().is_empty() {
            return;
        }
        match self.styles.iter_mut().find(|s| s.property == style.property) {
            Some(existing) => existing.value = style.value,
            None => self.styles.push(style),
        }
    }

    pub fn append_custom(&mut self, attribute: Attribute) {
        if attribute.name.trim().is_empty() {
            return;
        }
        match self.custom.iter_mut().find(|a| a.name == attribute.name) {
            Some(existing) => existing.value = attribute.value,
            None => self.custom.push(attribute),
        }
    }

    /// Add a `data-<name>` attribute. The prefix is added on render.
    pub fn append_data(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !name.trim().is_empty() {
            self.data.insert(name, value.into());
        }
    }

    /// Add an `aria-<name>` attribute. The prefix is added on render.
    pub fn append_aria(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if !name.trim().is_empty() {
            self.aria.insert(name, value.into());
        }
    }

    pub fn append_event(&mut self, kind: EventType, actions: impl IntoIterator<Item = Action>) {
        let actions: Vec<Action> = actions.into_iter().collect();
        match self.events.iter_mut().find(|e| e.kind == kind) {
            Some(existing) => existing.actions.extend(actions),
            None => self.events.push(Event::new(kind, actions)),
        }
    }

    /// Fold `other` into `self`; `other` wins wherever a category keeps a
    /// single value per key.
    pub fn merge(&mut self, other: &CoreAttributes) {
        if !other.id.is_empty() {
            self.id = other.id.clone();
        }
        for attribute in &other.custom {
            self.append_custom(attribute.clone());
        }
        self.append_classes(&other.classes);
        for style in &other.styles {
            self.append_style(style.clone());
        }
        for (name, value) in &other.data {
            self.data.insert(name.clone(), value.clone());
        }
        for (name, value) in &other.aria {
            self.aria.insert(name.clone(), value.clone());
        }
        for event in &other.events {
            self.append_event(event.kind, event.actions.iter().cloned());
        }
    }

    /// Render as a leading-space attribute string, rewriting path values
    /// through `rewrite`.
    pub fn render_with(&self, rewrite: &dyn Fn(&str) -> String) -> String {
        let mut out = String::new();

        if !self.id.is_empty() {
            push_attr(&mut out, "id", &self.id);
        }

        for attribute in &self.custom {
            match &attribute.value {
                AttributeValue::Text(value) => push_attr(&mut out, &attribute.name, value),
                AttributeValue::Path(path) => push_attr(&mut out, &attribute.name, &rewrite(path)),
                AttributeValue::Flag => {
                    out.push(' ');
                    out.push_str(&attribute.name);
                }
            }
        }

        if !self.classes.is_empty() {
            push_attr(&mut out, "class", &self.classes.join(" "));
        }

        if !self.styles.is_empty() {
            let styles: Vec<String> = self.styles.iter().map(InlineStyle::to_string).collect();
            push_attr(&mut out, "style", &styles.join("; "));
        }

        for (name, value) in &self.data {
            push_attr(&mut out, &format!("data-{name}"), value);
        }

        for (name, value) in &self.aria {
            push_attr(&mut out, &format!("aria-{name}"), value);
        }

        for event in &self.events {
            if let Some(script) = event.compiled() {
                // Already escaped for the attribute context.
                out.push_str(&format!(" {}=\"{}\"", event.kind.attribute_name(), script));
            }
        }

        out
    }

    /// `<tag attrs>contents</tag>`
    pub fn wrap(&self, tag: &str, contents: &str, rewrite: &dyn Fn(&str) -> String) -> String {
        format!("<{tag}{}>{contents}</{tag}>", self.render_with(rewrite))
    }
}

fn push_attr(out: &mut String, name: &str, value: &str) {
    out.push(' ');
    out.push_str(name);
    out.push_str("=\"");
    out.push_str(&escape_html(value));
    out.push('"');
}

/// Renders with paths left untouched.
impl fmt::Display for CoreAttributes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render_with(&|p| p.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wrap(attributes: &CoreAttributes) -> String {
        attributes.wrap("tag", "", &|p| p.to_string())
    }

    // =========================================================================
    // Rendering order
    // =========================================================================

    #[test]
    fn classes_render_in_insertion_order() {
        let mut attributes = CoreAttributes::new();
        attributes.append_classes(["foo", "bar"]);
        attributes.append_classes(["baz qux"]);
        assert_eq!(wrap(&attributes), r#"<tag class="foo bar baz qux"></tag>"#);
    }

    #[test]
    fn styles_join_with_semicolons() {
        let mut attributes = CoreAttributes::new();
        attributes.append_style(InlineStyle::new("z-index", "1"));
        attributes.append_style(InlineStyle::new("accent-color", "red"));
        attributes.append_style(InlineStyle::new("cursor", "pointer"));
        assert_eq!(
            wrap(&attributes),
            r#"<tag style="z-index: 1; accent-color: red; cursor: pointer"></tag>"#
        );
    }

    #[test]
    fn full_render_order() {
        let mut attributes = CoreAttributes::new();
        attributes.append_event(EventType::Click, [Action::ShowAlert("hi".into())]);
        attributes.append_aria("label", "Close");
        attributes.append_data("key", "value");
        attributes.append_style(InlineStyle::new("color", "red"));
        attributes.append_classes(["btn"]);
        attributes.append_custom(Attribute::new("custom", "part"));
        attributes.set_id("main");
        assert_eq!(
            attributes.to_string(),
            r#" id="main" custom="part" class="btn" style="color: red" data-key="value" aria-label="Close" onclick="alert('hi')""#
        );
    }

    #[test]
    fn boolean_attributes_render_bare() {
        let mut attributes = CoreAttributes::new();
        attributes.append_custom(Attribute::flag("disabled"));
        attributes.append_custom(Attribute::flag("required"));
        attributes.append_custom(Attribute::flag("selected"));
        assert_eq!(wrap(&attributes), "<tag disabled required selected></tag>");
    }

    #[test]
    fn values_are_html_escaped() {
        let mut attributes = CoreAttributes::new();
        attributes.append_custom(Attribute::new("title", r#"a "quoted" <b>"#));
        assert_eq!(
            attributes.to_string(),
            r#" title="a &quot;quoted&quot; &lt;b&gt;""#
        );
    }

    #[test]
    fn path_values_go_through_rewrite() {
        let mut attributes = CoreAttributes::new();
        attributes.append_custom(Attribute::path("src", "/js/app.js"));
        let rendered = attributes.render_with(&|p| format!("/sub{p}"));
        assert_eq!(rendered, r#" src="/sub/js/app.js""#);
    }

    // =========================================================================
    // Permissive input handling
    // =========================================================================

    #[test]
    fn empty_id_is_noop() {
        let mut attributes = CoreAttributes::new();
        attributes.set_id("first");
        attributes.set_id("");
        assert_eq!(attributes.id(), Some("first"));
    }

    #[test]
    fn empty_class_and_style_values_dropped() {
        let mut attributes = CoreAttributes::new();
        attributes.append_classes(["", "   "]);
        attributes.append_style(InlineStyle::new("color", ""));
        attributes.append_custom(Attribute::new("", "x"));
        assert!(attributes.is_empty());
        assert_eq!(attributes.to_string(), "");
    }

    #[test]
    fn event_without_actions_not_rendered() {
        let mut attributes = CoreAttributes::new();
        attributes.append_event(EventType::Click, []);
        assert_eq!(attributes.to_string(), "");
    }

    // =========================================================================
    // Merge
    // =========================================================================

    #[test]
    fn duplicate_classes_collapse() {
        let mut attributes = CoreAttributes::new();
        attributes.append_classes(["a", "b", "a"]);
        assert_eq!(attributes.classes(), &["a".to_string(), "b".to_string()]);
    }

    #[test]
    fn style_last_write_wins_per_property() {
        let mut attributes = CoreAttributes::new();
        attributes.append_style(InlineStyle::new("color", "red"));
        attributes.append_style(InlineStyle::new("margin", "0"));
        attributes.append_style(InlineStyle::new("color", "blue"));
        assert_eq!(attributes.to_string(), r#" style="color: blue; margin: 0""#);
    }

    #[test]
    fn merge_takes_other_id_and_unions_sets() {
        let mut a = CoreAttributes::new();
        a.set_id("a");
        a.append_classes(["x"]);
        a.append_data("one", "1");

        let mut b = CoreAttributes::new();
        b.set_id("b");
        b.append_classes(["y", "x"]);
        b.append_data("two", "2");

        a.merge(&b);
        assert_eq!(a.id(), Some("b"));
        assert_eq!(a.classes(), &["x".to_string(), "y".to_string()]);
        assert_eq!(a.data("one"), Some("1"));
        assert_eq!(a.data("two"), Some("2"));
    }

    #[test]
    fn merge_keeps_id_when_other_has_none() {
        let mut a = CoreAttributes::new();
        a.set_id("keep");
        a.merge(&CoreAttributes::new());
        assert_eq!(a.id(), Some("keep"));
    }

    #[test]
    fn data_and_aria_merge_commutes() {
        let mut left = CoreAttributes::new();
        left.append_data("a", "1");
        left.append_aria("hidden", "true");
        let mut right = CoreAttributes::new();
        right.append_data("b", "2");
        right.append_aria("label", "x");

        let mut ab = left.clone();
        ab.merge(&right);
        let mut ba = right.clone();
        ba.merge(&left);
        assert_eq!(ab.to_string(), ba.to_string());
    }

    #[test]
    fn events_of_same_type_accumulate_actions() {
        let mut attributes = CoreAttributes::new();
        attributes.append_event(EventType::Click, [Action::ShowAlert("a".into())]);
        attributes.append_event(EventType::Click, [Action::ShowAlert("b".into())]);
        assert_eq!(attributes.events().len(), 1);
        assert_eq!(
            attributes.to_string(),
            r#" onclick="alert('a'); alert('b')""#
        );
    }
}
