use crate::catalog::listeners::ClickListenerObserver;
use crate::dom::injected::SHADOW_MARKER_TAG;
use crate::dom::tree::{DomTree, ElementData, NodeId};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// What kind of hint target an element is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "kebab-case")]
pub enum ElementType {
    /// Natively clickable, or marked clickable by role or framework attribute
    Clickable,
    /// Only known to be clickable because a page script listens for clicks
    ClickableEvent,
    Link,
    Label,
    Textarea,
    Scrollable,
    /// Has text that can be selected, and nothing more
    Selectable,
}

impl ElementType {
    /// Types whose hints should lose to everything else
    pub fn is_low_priority(self) -> bool {
        matches!(
            self,
            ElementType::Scrollable | ElementType::Selectable | ElementType::ClickableEvent
        )
    }
}

/// Which element types a discovery pass should report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "kebab-case")]
pub enum ElementTypes {
    /// Everything except plain selectable text
    #[default]
    Default,
    /// Everything, including plain selectable text
    Selectable,
}

impl ElementTypes {
    pub fn includes(self, element_type: ElementType) -> bool {
        match self {
            ElementTypes::Default => element_type != ElementType::Selectable,
            ElementTypes::Selectable => true,
        }
    }
}

/// Never hinted, whatever else they look like
const EXCLUDED_TAGS: &[&str] = &["FORM", "HTML", "BODY", "HEAD", "SCRIPT", "STYLE", "TEMPLATE"];

const CLICKABLE_TAGS: &[&str] = &["BUTTON", "SELECT", "SUMMARY", "AUDIO", "VIDEO", "OPTION", "EMBED", "OBJECT"];

const FRAME_TAGS: &[&str] = &["IFRAME", "FRAME"];

/// Elements that honour the `disabled` attribute
const DISABLEABLE_TAGS: &[&str] = &["BUTTON", "INPUT", "SELECT", "TEXTAREA", "OPTION", "OPTGROUP", "FIELDSET"];

const CLICKABLE_ROLES: &[&str] = &[
    "button",
    "checkbox",
    "combobox",
    "link",
    "menuitem",
    "menuitemcheckbox",
    "menuitemradio",
    "option",
    "radio",
    "switch",
    "tab",
    "treeitem",
];

/// Inline-handler and framework attributes that imply a click handler
const CLICKABLE_ATTRIBUTES: &[&str] = &[
    "onclick",
    "onmousedown",
    "onmouseup",
    "ng-click",
    "data-ng-click",
    "x-on:click",
    "@click",
    "v-on:click",
];

/// Attributes whose change can change an element's type
pub const RELEVANT_ATTRIBUTES: &[&str] = &[
    "href",
    "role",
    "contenteditable",
    "disabled",
    "type",
    "jsaction",
    "onclick",
    "onmousedown",
    "onmouseup",
    "ng-click",
    "data-ng-click",
    "x-on:click",
    "@click",
    "v-on:click",
];

pub fn is_frame(element: &ElementData) -> bool {
    FRAME_TAGS.iter().any(|tag| element.is_tag(tag))
}

pub fn is_disabled(element: &ElementData) -> bool {
    DISABLEABLE_TAGS.iter().any(|tag| element.is_tag(tag)) && element.has_attribute("disabled")
}

fn is_content_editable(element: &ElementData) -> bool {
    element
        .attribute("contenteditable")
        .is_some_and(|value| !value.eq_ignore_ascii_case("false"))
}

fn is_scrollable(element: &ElementData) -> bool {
    if !element.style.is_scroll_container() {
        return false;
    }
    let Some(bounds) = element.bounds() else {
        return false;
    };
    element.style.scroll_width.is_some_and(|w| w > bounds.width + 1.0)
        || element.style.scroll_height.is_some_and(|h| h > bounds.height + 1.0)
}

fn link_type(element: &ElementData) -> ElementType {
    match element.attribute("href") {
        Some(href) if !href.trim_start().to_ascii_lowercase().starts_with("javascript:") => ElementType::Link,
        _ => ElementType::Clickable,
    }
}

fn has_clickable_attribute(element: &ElementData) -> bool {
    CLICKABLE_ATTRIBUTES.iter().any(|name| element.has_attribute(name))
        || element
            .attribute("jsaction")
            .is_some_and(|value| value.contains("click"))
}

fn has_direct_text(dom: &DomTree, id: NodeId) -> bool {
    dom.children(id)
        .iter()
        .filter_map(|&child| dom.text(child))
        .any(|text| !text.text.trim().is_empty())
}

/// Classify an element as a hint target, or `None` if it is not one
pub fn classify(dom: &DomTree, id: NodeId, listeners: &dyn ClickListenerObserver) -> Option<ElementType> {
    let element = dom.element(id)?;

    if EXCLUDED_TAGS.iter().any(|tag| element.is_tag(tag))
        || element.is_tag(SHADOW_MARKER_TAG)
        || is_frame(element)
        || is_disabled(element)
    {
        return None;
    }

    // Even a plain <div> can be contenteditable, which trumps all the below.
    if is_content_editable(element) {
        return Some(ElementType::Textarea);
    }

    match element.tag_name.as_str() {
        "A" => return Some(link_type(element)),
        "INPUT" => {
            return match element.attribute("type") {
                Some(kind) if kind.eq_ignore_ascii_case("hidden") => None,
                _ => Some(ElementType::Clickable),
            };
        }
        "TEXTAREA" => return Some(ElementType::Textarea),
        "LABEL" => return Some(ElementType::Label),
        tag if CLICKABLE_TAGS.contains(&tag) => return Some(ElementType::Clickable),
        _ => {}
    }

    if element
        .attribute("role")
        .is_some_and(|role| CLICKABLE_ROLES.contains(&role.trim().to_ascii_lowercase().as_str()))
        || has_clickable_attribute(element)
    {
        return Some(ElementType::Clickable);
    }

    if listeners.has_click_listener(id) {
        return Some(ElementType::ClickableEvent);
    }

    if is_scrollable(element) {
        return Some(ElementType::Scrollable);
    }

    if has_direct_text(dom, id) {
        return Some(ElementType::Selectable);
    }

    None
}
