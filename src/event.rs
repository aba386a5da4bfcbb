//! DOM event bindings.
//!
//! An [`Event`] pairs an [`EventType`] with an ordered list of [`Action`]s.
//! At render time every action compiles to a JavaScript statement, the
//! statements are joined with `"; "`, and the result becomes the value of the
//! `onX="..."` attribute:
//!
//! ```text
//! Event { onclick, [ShowAlert("Hi"), HideElement("menu")] }
//!   → onclick="alert('Hi'); document.getElementById('menu').classList.add('d-none')"
//! ```
//!
//! Actions are emitted as single-quoted JS string literals inside a
//! double-quoted HTML attribute, so interpolated text goes through
//! [`escape_for_javascript`]: `'` becomes `\'` and `"` becomes `&quot;`.

use std::fmt;

/// The DOM events an element can respond to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventType {
    Click,
    DoubleClick,
    MouseDown,
    MouseUp,
    MouseOver,
    MouseOut,
    MouseEnter,
    MouseLeave,
    Focus,
    Blur,
    Change,
    Input,
    Submit,
    KeyDown,
    KeyUp,
    Load,
}

impl EventType {
    /// The HTML attribute name, e.g. `onclick`.
    pub fn attribute_name(self) -> &'static str {
        match self {
            EventType::Click => "onclick",
            EventType::DoubleClick => "ondblclick",
            EventType::MouseDown => "onmousedown",
            EventType::MouseUp => "onmouseup",
            EventType::MouseOver => "onmouseover",
            EventType::MouseOut => "onmouseout",
            EventType::MouseEnter => "onmouseenter",
            EventType::MouseLeave => "onmouseleave",
            EventType::Focus => "onfocus",
            EventType::Blur => "onblur",
            EventType::Change => "onchange",
            EventType::Input => "oninput",
            EventType::Submit => "onsubmit",
            EventType::KeyDown => "onkeydown",
            EventType::KeyUp => "onkeyup",
            EventType::Load => "onload",
        }
    }

    /// The DOM event name without the `on` prefix, as used by
    /// `addEventListener`.
    pub fn dom_name(self) -> &'static str {
        &self.attribute_name()[2..]
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.attribute_name())
    }
}

/// A single step run when an event fires.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// `alert('message')`
    ShowAlert(String),
    /// Removes the `d-none` class from the element with this id.
    ShowElement(String),
    /// Adds the `d-none` class to the element with this id.
    HideElement(String),
    /// Toggles the `d-none` class on the element with this id.
    ToggleElement(String),
    /// Switches the active theme through the theme-switcher script.
    SwitchTheme(String),
    /// Raw JavaScript, emitted as-is.
    Custom(String),
}

impl Action {
    /// Compile the action to a single JavaScript statement.
    pub fn compile(&self) -> String {
        match self {
            Action::ShowAlert(message) => format!("alert('{}')", escape_for_javascript(message)),
            Action::ShowElement(id) => format!(
                "document.getElementById('{}').classList.remove('d-none')",
                escape_for_javascript(id)
            ),
            Action::HideElement(id) => format!(
                "document.getElementById('{}').classList.add('d-none')",
                escape_for_javascript(id)
            ),
            Action::ToggleElement(id) => format!(
                "document.getElementById('{}').classList.toggle('d-none')",
                escape_for_javascript(id)
            ),
            Action::SwitchTheme(id) => format!("switchTheme('{}')", escape_for_javascript(id)),
            Action::Custom(code) => code.clone(),
        }
    }
}

/// An event type bound to the actions it triggers.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Event {
    pub kind: EventType,
    pub actions: Vec<Action>,
}

impl Event {
    pub fn new(kind: EventType, actions: impl IntoIterator<Item = Action>) -> Self {
        Self {
            kind,
            actions: actions.into_iter().collect(),
        }
    }

    /// The compiled handler body, or `None` when there is nothing to run.
    pub fn compiled(&self) -> Option<String> {
        if self.actions.is_empty() {
            return None;
        }
        let statements: Vec<String> = self.actions.iter().map(Action::compile).collect();
        Some(statements.join("; "))
    }
}

/// Escape text for a single-quoted JS literal inside a double-quoted HTML
/// attribute.
pub fn escape_for_javascript(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            '\'' => out.push_str("\\'"),
            '"' => out.push_str("&quot;"),
            '\n' => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}
