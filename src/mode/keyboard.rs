//! Logical keypresses and the hints-mode actions they can be bound to.
//!
//! Raw key events are normalized by a keyboard layer outside this crate; the
//! controller only ever sees [`KeyPress`] values.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A normalized keypress
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct KeyPress {
    /// `KeyboardEvent.key`: a printable character or a named key such as
    /// `Escape`, `Enter` or `Backspace`
    pub key: String,
    #[serde(default)]
    pub ctrl: bool,
    #[serde(default)]
    pub alt: bool,
    #[serde(default)]
    pub shift: bool,
}

impl KeyPress {
    pub fn new(key: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            ..Self::default()
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    /// The typed character, for unmodified (or shift-only) single-char keys
    pub fn printable(&self) -> Option<char> {
        if self.ctrl || self.alt {
            return None;
        }
        let mut chars = self.key.chars();
        match (chars.next(), chars.next()) {
            (Some(c), None) if !c.is_control() => Some(c),
            _ => None,
        }
    }

    /// Keypresses for every character of `text`
    pub fn sequence(text: &str) -> Vec<KeyPress> {
        text.chars().map(|c| KeyPress::new(c.to_string())).collect()
    }
}

/// Key combination a [`HintsAction`] is bound to, written like `Ctrl+Enter`
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Shortcut {
    pub key: String,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl Shortcut {
    pub fn matches(&self, press: &KeyPress) -> bool {
        self.key.eq_ignore_ascii_case(&press.key)
            && self.ctrl == press.ctrl
            && self.alt == press.alt
            && self.shift == press.shift
    }
}

impl FromStr for Shortcut {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut shortcut = Shortcut {
            key: String::new(),
            ctrl: false,
            alt: false,
            shift: false,
        };
        // "Ctrl++" binds the plus key.
        let (modifiers, key) = if let Some(modifiers) = s.strip_suffix("++") {
            (modifiers, "+")
        } else {
            s.rsplit_once('+').unwrap_or(("", s))
        };
        if key.is_empty() {
            return Err(format!("missing key in shortcut {:?}", s));
        }
        for modifier in modifiers.split('+').filter(|m| !m.is_empty()) {
            match modifier.to_ascii_lowercase().as_str() {
                "ctrl" | "control" => shortcut.ctrl = true,
                "alt" => shortcut.alt = true,
                "shift" => shortcut.shift = true,
                other => return Err(format!("unknown modifier {:?} in {:?}", other, s)),
            }
        }
        shortcut.key = key.to_string();
        Ok(shortcut)
    }
}

impl TryFrom<String> for Shortcut {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Shortcut> for String {
    fn from(shortcut: Shortcut) -> Self {
        shortcut.to_string()
    }
}

impl fmt::Display for Shortcut {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            write!(f, "Ctrl+")?;
        }
        if self.alt {
            write!(f, "Alt+")?;
        }
        if self.shift {
            write!(f, "Shift+")?;
        }
        write!(f, "{}", self.key)
    }
}

/// Things the user can ask for while hints are shown
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum HintsAction {
    ExitHintsMode,
    /// Activate the best match (Enter); `alt` switches to the mode's
    /// alternate action, e.g. a foreground tab instead of a background one
    ActivateHint { alt: bool },
    Backspace,
    RotateHints { forward: bool },
    RefreshHints,
    TogglePeek,
}

/// One entry of the shortcut table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyBinding {
    pub shortcut: Shortcut,
    pub action: HintsAction,
}

impl KeyBinding {
    fn new(shortcut: &str, action: HintsAction) -> Option<Self> {
        shortcut.parse().ok().map(|shortcut| Self { shortcut, action })
    }
}

/// Built-in shortcut table
pub fn default_key_bindings() -> Vec<KeyBinding> {
    [
        ("Escape", HintsAction::ExitHintsMode),
        ("Enter", HintsAction::ActivateHint { alt: false }),
        ("Ctrl+Enter", HintsAction::ActivateHint { alt: true }),
        ("Backspace", HintsAction::Backspace),
        ("Tab", HintsAction::RotateHints { forward: true }),
        ("Shift+Tab", HintsAction::RotateHints { forward: false }),
        ("Ctrl+Backspace", HintsAction::RefreshHints),
        ("Ctrl+Shift+ ", HintsAction::TogglePeek),
    ]
    .into_iter()
    .filter_map(|(shortcut, action)| KeyBinding::new(shortcut, action))
    .collect()
}

/// Look up the action bound to a keypress
pub fn action_for(bindings: &[KeyBinding], press: &KeyPress) -> Option<HintsAction> {
    bindings
        .iter()
        .find(|binding| binding.shortcut.matches(press))
        .map(|binding| binding.action)
}
