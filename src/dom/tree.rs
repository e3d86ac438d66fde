use crate::dom::element::{ShadowMode, Style};
use crate::dom::geometry::{BoundingBox, Point};
use crate::dom::page::FrameId;
use crate::error::{HintsError, Result};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

/// Handle to a node of a [`DomTree`].
///
/// Node ids are never reused within a document: a node that is removed from
/// the tree and inserted again keeps its id, like a DOM node reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(u32);

impl NodeId {
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Element payload
#[derive(Debug, Clone, PartialEq)]
pub struct ElementData {
    /// Upper-cased node name, as `Element.nodeName` reports it for HTML
    pub tag_name: String,
    pub attributes: IndexMap<String, String>,
    pub rects: Vec<BoundingBox>,
    pub style: Style,
    /// Child browsing context of an `<iframe>`/`<frame>`
    pub content_frame: Option<FrameId>,
}

impl ElementData {
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name).map(String::as_str)
    }

    pub fn has_attribute(&self, name: &str) -> bool {
        self.attributes.contains_key(name)
    }

    pub fn is_tag(&self, tag: &str) -> bool {
        self.tag_name.eq_ignore_ascii_case(tag)
    }

    /// Smallest box containing all client rects
    pub fn bounds(&self) -> Option<BoundingBox> {
        self.rects.iter().copied().reduce(|a, b| {
            BoundingBox::from_edges(
                a.x.min(b.x),
                a.y.min(b.y),
                a.right().max(b.right()),
                a.bottom().max(b.bottom()),
            )
        })
    }
}

/// Text node payload
#[derive(Debug, Clone, PartialEq)]
pub struct TextData {
    pub text: String,
    /// One rect per laid-out line
    pub rects: Vec<BoundingBox>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum NodeData {
    Document,
    Element(ElementData),
    Text(TextData),
    ShadowRoot { mode: ShadowMode },
}

#[derive(Debug, Clone)]
struct Node {
    data: NodeData,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationKind {
    Added,
    Removed,
    Attribute(String),
}

/// One observed change, as a `MutationObserver` would report it.
///
/// `scope` is the tree root (document or shadow root) the change happened in;
/// observers only see records of the scopes they observe. `parent` is the
/// node children were added to or removed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MutationRecord {
    pub kind: MutationKind,
    pub target: NodeId,
    pub parent: Option<NodeId>,
    pub scope: NodeId,
}

/// Arena-backed document tree.
///
/// Shadow roots are not children of their hosts; the host/root relation lives
/// in side tables so that node payloads never point back into the tree.
#[derive(Debug, Clone)]
pub struct DomTree {
    nodes: Vec<Node>,
    shadow_root_of: HashMap<NodeId, NodeId>,
    shadow_host_of: HashMap<NodeId, NodeId>,
    records: Vec<MutationRecord>,
}

impl Default for DomTree {
    fn default() -> Self {
        Self::new()
    }
}

impl DomTree {
    /// Create a tree containing only the document node
    pub fn new() -> Self {
        Self {
            nodes: vec![Node {
                data: NodeData::Document,
                parent: None,
                children: Vec::new(),
            }],
            shadow_root_of: HashMap::new(),
            shadow_host_of: HashMap::new(),
            records: Vec::new(),
        }
    }

    pub const fn document(&self) -> NodeId {
        NodeId(0)
    }

    /// Number of nodes ever created in this document
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.len() <= 1
    }

    fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| HintsError::NodeNotFound(id.to_string()))
    }

    fn node_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| HintsError::NodeNotFound(id.to_string()))
    }

    fn push(&mut self, data: NodeData) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(Node {
            data,
            parent: None,
            children: Vec::new(),
        });
        id
    }

    pub fn get(&self, id: NodeId) -> Option<&NodeData> {
        self.nodes.get(id.index()).map(|node| &node.data)
    }

    pub fn element(&self, id: NodeId) -> Option<&ElementData> {
        match self.get(id) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub(crate) fn element_mut(&mut self, id: NodeId) -> Option<&mut ElementData> {
        match self.nodes.get_mut(id.index()).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => Some(element),
            _ => None,
        }
    }

    pub fn text(&self, id: NodeId) -> Option<&TextData> {
        match self.get(id) {
            Some(NodeData::Text(text)) => Some(text),
            _ => None,
        }
    }

    pub fn is_element(&self, id: NodeId) -> bool {
        self.element(id).is_some()
    }

    pub fn tag_name(&self, id: NodeId) -> Option<&str> {
        self.element(id).map(|element| element.tag_name.as_str())
    }

    /// Create a detached element
    pub fn create_element(&mut self, tag_name: &str) -> NodeId {
        self.push(NodeData::Element(ElementData {
            tag_name: tag_name.to_ascii_uppercase(),
            attributes: IndexMap::new(),
            rects: Vec::new(),
            style: Style::default(),
            content_frame: None,
        }))
    }

    /// Create a detached text node
    pub fn create_text(&mut self, text: impl Into<String>, rects: Vec<BoundingBox>) -> NodeId {
        self.push(NodeData::Text(TextData {
            text: text.into(),
            rects,
        }))
    }

    pub fn parent(&self, id: NodeId) -> Option<NodeId> {
        self.nodes.get(id.index()).and_then(|node| node.parent)
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        self.nodes
            .get(id.index())
            .map(|node| node.children.as_slice())
            .unwrap_or(&[])
    }

    /// First element child
    pub fn first_element_child(&self, id: NodeId) -> Option<NodeId> {
        self.children(id).iter().copied().find(|&child| self.is_element(child))
    }

    /// Append `child` as the last child of `parent`, moving it if it is
    /// already inserted elsewhere.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<()> {
        self.node(parent)?;
        self.node(child)?;
        if self.contains(child, parent) {
            return Err(HintsError::NodeNotFound(format!(
                "{} cannot be inserted into its own descendant {}",
                child, parent
            )));
        }
        if matches!(self.get(child), Some(NodeData::Document | NodeData::ShadowRoot { .. })) {
            return Err(HintsError::NodeNotFound(format!("{} cannot be inserted", child)));
        }
        if self.parent(child).is_some() {
            self.remove(child)?;
        }

        self.node_mut(parent)?.children.push(child);
        self.node_mut(child)?.parent = Some(parent);

        let scope = self.root_node(parent);
        self.records.push(MutationRecord {
            kind: MutationKind::Added,
            target: child,
            parent: Some(parent),
            scope,
        });
        Ok(())
    }

    /// Detach `child` from its parent. The node stays alive and can be
    /// inserted again under the same id.
    pub fn remove(&mut self, child: NodeId) -> Result<()> {
        let Some(parent) = self.node(child)?.parent else {
            return Ok(());
        };
        let scope = self.root_node(parent);
        self.node_mut(parent)?.children.retain(|&c| c != child);
        self.node_mut(child)?.parent = None;
        self.records.push(MutationRecord {
            kind: MutationKind::Removed,
            target: child,
            parent: Some(parent),
            scope,
        });
        Ok(())
    }

    pub fn set_attribute(&mut self, id: NodeId, name: &str, value: impl Into<String>) -> Result<()> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| HintsError::NodeNotFound(id.to_string()))?;
        element.attributes.insert(name.to_string(), value.into());
        self.record_attribute(id, name);
        Ok(())
    }

    pub fn remove_attribute(&mut self, id: NodeId, name: &str) -> Result<()> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| HintsError::NodeNotFound(id.to_string()))?;
        if element.attributes.shift_remove(name).is_some() {
            self.record_attribute(id, name);
        }
        Ok(())
    }

    fn record_attribute(&mut self, id: NodeId, name: &str) {
        let scope = self.root_node(id);
        self.records.push(MutationRecord {
            kind: MutationKind::Attribute(name.to_string()),
            target: id,
            parent: None,
            scope,
        });
    }

    /// Replace the computed style of an element (no mutation record, like a
    /// stylesheet change)
    pub fn set_style(&mut self, id: NodeId, style: Style) -> Result<()> {
        let element = self
            .element_mut(id)
            .ok_or_else(|| HintsError::NodeNotFound(id.to_string()))?;
        element.style = style;
        Ok(())
    }

    /// Attach a shadow root to `host`
    pub fn attach_shadow(&mut self, host: NodeId, mode: ShadowMode) -> Result<NodeId> {
        if !self.is_element(host) {
            return Err(HintsError::NodeNotFound(host.to_string()));
        }
        if let Some(&existing) = self.shadow_root_of.get(&host) {
            return Ok(existing);
        }
        let root = self.push(NodeData::ShadowRoot { mode });
        self.shadow_root_of.insert(host, root);
        self.shadow_host_of.insert(root, host);
        Ok(root)
    }

    /// `Element.shadowRoot`: only open shadow roots are exposed
    pub fn shadow_root(&self, host: NodeId) -> Option<NodeId> {
        let root = *self.shadow_root_of.get(&host)?;
        match self.get(root) {
            Some(NodeData::ShadowRoot {
                mode: ShadowMode::Open,
            }) => Some(root),
            _ => None,
        }
    }

    /// Shadow root regardless of mode, for page-context code that created it
    pub(crate) fn any_shadow_root(&self, host: NodeId) -> Option<NodeId> {
        self.shadow_root_of.get(&host).copied()
    }

    pub fn shadow_host(&self, root: NodeId) -> Option<NodeId> {
        self.shadow_host_of.get(&root).copied()
    }

    pub fn is_shadow_root(&self, id: NodeId) -> bool {
        matches!(self.get(id), Some(NodeData::ShadowRoot { .. }))
    }

    /// `Node.getRootNode()`: the topmost ancestor, without crossing shadow
    /// boundaries
    pub fn root_node(&self, id: NodeId) -> NodeId {
        let mut current = id;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        current
    }

    /// Whether the node is in the document, looking through shadow hosts
    pub fn is_connected(&self, id: NodeId) -> bool {
        let mut current = id;
        loop {
            let root = self.root_node(current);
            if root == self.document() {
                return true;
            }
            match self.shadow_host(root) {
                Some(host) => current = host,
                None => return false,
            }
        }
    }

    /// Composed parent: the parent node, or the host when at a shadow root
    pub fn composed_parent(&self, id: NodeId) -> Option<NodeId> {
        self.parent(id).or_else(|| self.shadow_host(id))
    }

    /// Inclusive, composed ancestor check
    pub fn contains(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = Some(node);
        while let Some(id) = current {
            if id == ancestor {
                return true;
            }
            current = self.composed_parent(id);
        }
        false
    }

    /// Light-tree descendants of `id` in document order, excluding `id`
    pub fn descendants(&self, id: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(id).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Connected nodes in paint order: document order, with each shadow tree
    /// following its host
    pub fn composed_order(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack = vec![self.document()];
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
            if let Some(root) = self.any_shadow_root(next) {
                stack.push(root);
            }
        }
        out
    }

    /// Client rects of an element or text node
    pub fn client_rects(&self, id: NodeId) -> &[BoundingBox] {
        match self.get(id) {
            Some(NodeData::Element(element)) => &element.rects,
            Some(NodeData::Text(text)) => &text.rects,
            _ => &[],
        }
    }

    /// Change the layout of a node. Layout changes produce no mutation record.
    pub fn set_rects(&mut self, id: NodeId, rects: Vec<BoundingBox>) -> Result<()> {
        match self.nodes.get_mut(id.index()).map(|node| &mut node.data) {
            Some(NodeData::Element(element)) => element.rects = rects,
            Some(NodeData::Text(text)) => text.rects = rects,
            _ => return Err(HintsError::NodeNotFound(id.to_string())),
        }
        Ok(())
    }

    /// Shift every laid-out box, as scrolling the viewport does
    pub fn translate_all(&mut self, dx: f64, dy: f64) {
        for node in &mut self.nodes {
            let rects = match &mut node.data {
                NodeData::Element(element) => &mut element.rects,
                NodeData::Text(text) => &mut text.rects,
                _ => continue,
            };
            for rect in rects.iter_mut() {
                *rect = rect.translate(dx, dy);
            }
        }
    }

    /// Topmost hit-testable element under `point` (frame-local coordinates).
    /// Higher z-index wins; ties go to the element painted later.
    pub fn element_at_point(&self, point: Point) -> Option<NodeId> {
        let mut best: Option<(i32, usize, NodeId)> = None;
        for (order, id) in self.composed_order().into_iter().enumerate() {
            let Some(element) = self.element(id) else {
                continue;
            };
            if !element.style.is_hit_testable() || !element.rects.iter().any(|r| r.contains(point)) {
                continue;
            }
            let key = (element.style.z_index, order);
            if best.is_none_or(|(z, o, _)| key >= (z, o)) {
                best = Some((key.0, key.1, id));
            }
        }
        best.map(|(_, _, id)| id)
    }

    /// Descendant text nodes of `id` in the light tree
    pub fn text_nodes(&self, id: NodeId) -> Vec<NodeId> {
        self.descendants(id)
            .into_iter()
            .filter(|&node| self.text(node).is_some())
            .collect()
    }

    /// `textContent`: raw concatenation of all descendant text
    pub fn text_content(&self, id: NodeId) -> String {
        self.text_nodes(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .map(|text| text.text.as_str())
            .collect()
    }

    /// Text of laid-out text nodes with whitespace collapsed, roughly what
    /// `innerText` would give
    pub fn visible_text(&self, id: NodeId) -> String {
        let joined = self
            .text_nodes(id)
            .into_iter()
            .filter_map(|node| self.text(node))
            .filter(|text| text.rects.iter().any(BoundingBox::is_visible))
            .map(|text| text.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        normalize_whitespace(&joined)
    }

    /// Take all mutation records accumulated since the last call
    pub fn take_records(&mut self) -> Vec<MutationRecord> {
        std::mem::take(&mut self.records)
    }

    pub fn has_records(&self) -> bool {
        !self.records.is_empty()
    }

    pub(crate) fn clear_records(&mut self) {
        self.records.clear();
    }
}

/// Collapse whitespace runs into single spaces and trim the ends
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
