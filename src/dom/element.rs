use crate::dom::geometry::{BoundingBox, Insets};
use crate::dom::page::PageFixture;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Serialized description of a DOM element (or text node) used to build a
/// document. Pages are described as a tree of these.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ElementNode {
    /// HTML tag name (e.g., "div", "button", "input"), or `#text` for a text node
    pub tag_name: String,

    /// Element attributes (e.g., id, class, href, etc.)
    #[serde(default)]
    pub attributes: HashMap<String, String>,

    /// Text content. On a `#text` node this is the node's data; on an element
    /// it becomes a leading text child laid out over the element's content box.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text_content: Option<String>,

    /// Child elements
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<ElementNode>,

    /// Primary layout box in the frame's viewport coordinates
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bounding_box: Option<BoundingBox>,

    /// Extra client rects for inline content that wraps across lines
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub extra_rects: Vec<BoundingBox>,

    /// Computed style subset the engine cares about
    #[serde(default)]
    pub style: Style,

    /// Event types registered through `addEventListener` by page scripts
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub listeners: Vec<String>,

    /// Shadow tree attached to this element
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shadow_root: Option<ShadowRootNode>,

    /// Document loaded inside this element (iframes only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame: Option<Box<PageFixture>>,
}

/// Shadow tree description
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ShadowRootNode {
    #[serde(default)]
    pub mode: ShadowMode,
    #[serde(default)]
    pub children: Vec<ElementNode>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ShadowMode {
    #[default]
    Open,
    Closed,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Position {
    #[default]
    Static,
    Relative,
    Absolute,
    Fixed,
    Sticky,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Overflow {
    #[default]
    Visible,
    Hidden,
    Auto,
    Scroll,
}

/// Computed style subset
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
#[serde(default)]
pub struct Style {
    pub display_none: bool,
    pub visibility_hidden: bool,
    pub pointer_events_none: bool,
    pub position: Position,
    pub z_index: i32,
    pub overflow: Overflow,
    /// Border plus padding on each side
    pub insets: Insets,
    /// `scrollWidth` and `scrollHeight`, when larger than the box
    pub scroll_width: Option<f64>,
    pub scroll_height: Option<f64>,
}

impl Style {
    /// Whether the element can be the result of a hit test
    pub fn is_hit_testable(&self) -> bool {
        !self.display_none && !self.visibility_hidden && !self.pointer_events_none
    }

    pub fn is_scroll_container(&self) -> bool {
        matches!(self.overflow, Overflow::Auto | Overflow::Scroll)
    }
}

/// Tag name used for text nodes in fixtures
pub const TEXT_NODE: &str = "#text";

impl ElementNode {
    /// Create a new ElementNode
    pub fn new(tag_name: impl Into<String>) -> Self {
        Self {
            tag_name: tag_name.into(),
            attributes: HashMap::new(),
            text_content: None,
            children: Vec::new(),
            bounding_box: None,
            extra_rects: Vec::new(),
            style: Style::default(),
            listeners: Vec::new(),
            shadow_root: None,
            frame: None,
        }
    }

    /// Builder method: add one attribute
    pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.add_attribute(key, value);
        self
    }

    /// Builder method: set text content
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text_content = Some(text.into());
        self
    }

    /// Builder method: set children
    pub fn with_children(mut self, children: Vec<ElementNode>) -> Self {
        self.children = children;
        self
    }

    /// Builder method: set bounding box
    pub fn with_bounding_box(mut self, x: f64, y: f64, width: f64, height: f64) -> Self {
        self.bounding_box = Some(BoundingBox::new(x, y, width, height));
        self
    }

    /// Builder method: set style
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    /// Builder method: register an event listener
    pub fn with_listener(mut self, event_type: impl Into<String>) -> Self {
        self.listeners.push(event_type.into());
        self
    }

    /// Builder method: attach a shadow tree
    pub fn with_shadow_root(mut self, mode: ShadowMode, children: Vec<ElementNode>) -> Self {
        self.shadow_root = Some(ShadowRootNode { mode, children });
        self
    }

    /// Builder method: load a document inside this element
    pub fn with_frame(mut self, page: PageFixture) -> Self {
        self.frame = Some(Box::new(page));
        self
    }

    /// Add a single attribute
    pub fn add_attribute(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.attributes.insert(key.into(), value.into());
    }

    /// Add a child element
    pub fn add_child(&mut self, child: ElementNode) {
        self.children.push(child);
    }

    /// Check if element is a specific tag
    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    pub fn is_text(&self) -> bool {
        self.tag_name == TEXT_NODE
    }

    /// All client rects described by this node
    pub fn rects(&self) -> Vec<BoundingBox> {
        self.bounding_box
            .iter()
            .chain(self.extra_rects.iter())
            .copied()
            .collect()
    }
}
