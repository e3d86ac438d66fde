use crate::dom::element::{ElementNode, ShadowMode};
use crate::dom::geometry::{BoundingBox, Point};
use crate::dom::injected::{InjectedEnvelope, PageHooks};
use crate::dom::tree::{DomTree, NodeId};
use crate::error::{HintsError, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Browsing context id within a tab. The top frame is always `0`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize, JsonSchema,
)]
pub struct FrameId(pub u32);

impl FrameId {
    pub const TOP: FrameId = FrameId(0);

    pub const fn is_top(self) -> bool {
        self.0 == 0
    }
}

impl fmt::Display for FrameId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "frame {}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ViewportSize {
    pub width: f64,
    pub height: f64,
}

impl Default for ViewportSize {
    fn default() -> Self {
        Self {
            width: 1280.0,
            height: 800.0,
        }
    }
}

/// Serialized description of a document
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PageFixture {
    #[serde(default)]
    pub url: String,

    #[serde(default)]
    pub viewport: ViewportSize,

    /// A frame that never answers messages (cross-origin sandbox, 404, ...)
    #[serde(default = "default_responsive")]
    pub responsive: bool,

    /// The `<body>` element
    pub body: ElementNode,
}

fn default_responsive() -> bool {
    true
}

impl PageFixture {
    pub fn new(body: ElementNode) -> Self {
        Self {
            url: String::new(),
            viewport: ViewportSize::default(),
            responsive: true,
            body,
        }
    }

    pub fn with_viewport(mut self, width: f64, height: f64) -> Self {
        self.viewport = ViewportSize { width, height };
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    pub fn unresponsive(mut self) -> Self {
        self.responsive = false;
        self
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| HintsError::FixtureParseFailed(e.to_string()))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ActivationKind {
    Click,
    Focus,
    Select,
}

/// Something done to an element of this page on the user's behalf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Activation {
    pub node: NodeId,
    pub kind: ActivationKind,
}

/// One browsing context: its document, viewport and page-context hooks
#[derive(Debug, Clone)]
pub struct Page {
    frame_id: FrameId,
    url: String,
    dom: DomTree,
    viewport: ViewportSize,
    responsive: bool,
    hooks: PageHooks,
    html: NodeId,
    body: NodeId,
    activations: Vec<Activation>,
}

/// An iframe element of a freshly built page and the document it should load
pub type PendingFrame = (NodeId, PageFixture);

/// Approximate advance of one character, used to lay out fixture text
const CHAR_WIDTH: f64 = 7.0;
const LINE_HEIGHT: f64 = 16.0;

impl Page {
    /// Create an empty page with `<html><body></body></html>`
    pub fn new(frame_id: FrameId, viewport: ViewportSize) -> Self {
        let mut dom = DomTree::new();
        let html = dom.create_element("html");
        let body = dom.create_element("body");
        let document = dom.document();
        // Both nodes are fresh and detached, so these cannot fail.
        let _ = dom.append_child(document, html);
        let _ = dom.append_child(html, body);
        let _ = dom.set_rects(body, vec![BoundingBox::new(0.0, 0.0, viewport.width, viewport.height)]);
        dom.clear_records();
        Self {
            frame_id,
            url: String::new(),
            dom,
            viewport,
            responsive: true,
            hooks: PageHooks::new(),
            html,
            body,
            activations: Vec::new(),
        }
    }

    /// Build a page from a fixture. Iframes with a nested document are
    /// returned so the caller can create their frames.
    pub fn from_fixture(frame_id: FrameId, fixture: &PageFixture) -> Result<(Self, Vec<PendingFrame>)> {
        if !fixture.body.is_tag("body") {
            return Err(HintsError::FixtureParseFailed(format!(
                "page root must be <body>, got <{}>",
                fixture.body.tag_name
            )));
        }
        let mut page = Self::new(frame_id, fixture.viewport);
        page.url = fixture.url.clone();
        page.responsive = fixture.responsive;

        let mut pending = Vec::new();
        let body = page.body;
        page.apply_element(body, &fixture.body, &mut pending)?;
        for child in &fixture.body.children {
            page.build_node(body, child, &mut pending)?;
        }
        page.dom.clear_records();
        Ok((page, pending))
    }

    fn build_node(&mut self, parent: NodeId, node: &ElementNode, pending: &mut Vec<PendingFrame>) -> Result<NodeId> {
        if node.is_text() {
            let text = self
                .dom
                .create_text(node.text_content.clone().unwrap_or_default(), node.rects());
            self.dom.append_child(parent, text)?;
            return Ok(text);
        }

        let id = self.dom.create_element(&node.tag_name);
        self.dom.append_child(parent, id)?;
        self.apply_element(id, node, pending)?;
        for child in &node.children {
            self.build_node(id, child, pending)?;
        }
        Ok(id)
    }

    fn apply_element(&mut self, id: NodeId, node: &ElementNode, pending: &mut Vec<PendingFrame>) -> Result<()> {
        let mut attributes: Vec<_> = node.attributes.iter().collect();
        attributes.sort();
        for (name, value) in attributes {
            self.dom.set_attribute(id, name, value.clone())?;
        }
        let rects = node.rects();
        if !rects.is_empty() {
            self.dom.set_rects(id, rects.clone())?;
        }
        self.dom.set_style(id, node.style)?;
        for event_type in &node.listeners {
            if event_type == "onclick" {
                self.hooks.set_onclick(id, true);
            } else {
                self.hooks.add_event_listener(id, event_type);
            }
        }

        if let Some(text) = &node.text_content {
            let text_rects = rects
                .first()
                .map(|rect| vec![layout_text(text, &rect.inset(&node.style.insets))])
                .unwrap_or_default();
            let text_node = self.dom.create_text(text.clone(), text_rects);
            self.dom.append_child(id, text_node)?;
        }

        if let Some(shadow) = &node.shadow_root {
            let root = self.attach_shadow(id, shadow.mode)?;
            for child in &shadow.children {
                self.build_node(root, child, pending)?;
            }
        }

        if let Some(frame) = &node.frame {
            pending.push((id, (**frame).clone()));
        }
        Ok(())
    }

    pub fn frame_id(&self) -> FrameId {
        self.frame_id
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn dom(&self) -> &DomTree {
        &self.dom
    }

    pub fn dom_mut(&mut self) -> &mut DomTree {
        &mut self.dom
    }

    pub fn html(&self) -> NodeId {
        self.html
    }

    pub fn body(&self) -> NodeId {
        self.body
    }

    /// The frame's own viewport, as the root of a viewport chain
    pub fn viewport(&self) -> BoundingBox {
        BoundingBox::new(0.0, 0.0, self.viewport.width, self.viewport.height)
    }

    pub fn set_viewport_size(&mut self, width: f64, height: f64) {
        self.viewport = ViewportSize { width, height };
    }

    pub fn is_responsive(&self) -> bool {
        self.responsive
    }

    pub fn set_responsive(&mut self, responsive: bool) {
        self.responsive = responsive;
    }

    /// Scroll the viewport; content moves the opposite way
    pub fn scroll_by(&mut self, dx: f64, dy: f64) {
        self.dom.translate_all(-dx, -dy);
    }

    /// Link an iframe element to the frame showing its document
    pub fn set_content_frame(&mut self, iframe: NodeId, frame: FrameId) -> Result<()> {
        let element = self
            .dom
            .element_mut(iframe)
            .ok_or_else(|| HintsError::NodeNotFound(iframe.to_string()))?;
        element.content_frame = Some(frame);
        Ok(())
    }

    pub fn install_channel(&mut self, secret: u64) {
        self.hooks.install_channel(secret, &mut self.dom);
    }

    pub fn take_injected_messages(&mut self) -> Vec<InjectedEnvelope> {
        self.hooks.take_messages()
    }

    /// Page script calls `element.addEventListener(type, ...)`
    pub fn add_event_listener(&mut self, node: NodeId, event_type: &str) {
        self.hooks.add_event_listener(node, event_type);
    }

    pub fn remove_event_listener(&mut self, node: NodeId, event_type: &str) {
        self.hooks.remove_event_listener(node, event_type);
    }

    pub fn set_onclick(&mut self, node: NodeId, present: bool) {
        self.hooks.set_onclick(node, present);
    }

    /// Page script calls `element.attachShadow({mode})`
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> Result<NodeId> {
        let root = self.dom.attach_shadow(host, mode)?;
        self.hooks
            .on_attach_shadow(host, mode == ShadowMode::Closed, &mut self.dom);
        Ok(root)
    }

    /// Whether any box of the element intersects this frame's viewport
    pub fn intersects_viewport(&self, node: NodeId) -> bool {
        let viewport = self.viewport();
        self.dom.element(node).is_some_and(|element| {
            !element.style.display_none
                && element
                    .rects
                    .iter()
                    .any(|rect| rect.is_visible() && rect.intersection(&viewport).is_some())
        })
    }

    pub fn element_at_point(&self, point: Point) -> Option<NodeId> {
        if !self.viewport().contains(point) {
            return None;
        }
        self.dom.element_at_point(point)
    }

    /// Find an element by its `id` attribute, looking into shadow trees
    pub fn get_element_by_id(&self, id: &str) -> Option<NodeId> {
        self.dom.composed_order().into_iter().find(|&node| {
            self.dom
                .element(node)
                .is_some_and(|element| element.attribute("id") == Some(id))
        })
    }

    fn activate(&mut self, node: NodeId, kind: ActivationKind) -> Result<()> {
        if !self.dom.is_element(node) || !self.dom.is_connected(node) {
            return Err(HintsError::NodeNotFound(format!("{} is not in {}", node, self.frame_id)));
        }
        self.activations.push(Activation { node, kind });
        Ok(())
    }

    pub fn click(&mut self, node: NodeId) -> Result<()> {
        self.activate(node, ActivationKind::Click)
    }

    pub fn focus(&mut self, node: NodeId) -> Result<()> {
        self.activate(node, ActivationKind::Focus)
    }

    pub fn select(&mut self, node: NodeId) -> Result<()> {
        self.activate(node, ActivationKind::Select)
    }

    pub fn activations(&self) -> &[Activation] {
        &self.activations
    }
}

/// Lay out a single line of text at the left of `content`, vertically centred
fn layout_text(text: &str, content: &BoundingBox) -> BoundingBox {
    let chars = text.trim().chars().count() as f64;
    let width = (chars * CHAR_WIDTH).min(content.width);
    let height = LINE_HEIGHT.min(content.height);
    BoundingBox::new(content.x, content.center_y() - height / 2.0, width, height)
}
