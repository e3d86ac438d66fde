use crate::catalog::ElementType;
use crate::dom::tree::NodeId;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What a frame remembers about an element it has reported
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct IndexedElement {
    pub node: NodeId,
    pub element_type: ElementType,
}

/// Map of per-frame element indices to elements.
/// Uses IndexMap to preserve insertion order.
///
/// An element keeps its index for as long as the map lives, even if it leaves
/// the document and comes back.
#[derive(Debug, Clone, Default)]
pub struct ElementIndex {
    /// Map from index to element
    map: IndexMap<usize, IndexedElement>,

    /// Reverse lookup
    by_node: IndexMap<NodeId, usize>,

    /// Next available index
    next_index: usize,
}

impl ElementIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an element and return its index, reusing the index it got
    /// before if there is one
    pub fn register(&mut self, node: NodeId, element_type: ElementType) -> usize {
        if let Some(&index) = self.by_node.get(&node) {
            self.map.insert(index, IndexedElement { node, element_type });
            return index;
        }
        let index = self.next_index;
        self.map.insert(index, IndexedElement { node, element_type });
        self.by_node.insert(node, index);
        self.next_index += 1;
        index
    }

    /// Get element by index
    pub fn get(&self, index: usize) -> Option<&IndexedElement> {
        self.map.get(&index)
    }

    pub fn index_of(&self, node: NodeId) -> Option<usize> {
        self.by_node.get(&node).copied()
    }

    pub fn contains(&self, index: usize) -> bool {
        self.map.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// Forget all elements; indices start over
    pub fn clear(&mut self) {
        self.map.clear();
        self.by_node.clear();
        self.next_index = 0;
    }

    /// Iterate over all (index, element) pairs in registration order
    pub fn iter(&self) -> impl Iterator<Item = (usize, &IndexedElement)> {
        self.map.iter().map(|(index, element)| (*index, element))
    }

    /// Export to JSON for debugging
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(&self.map)
    }
}
