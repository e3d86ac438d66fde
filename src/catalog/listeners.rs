use crate::dom::injected::{InjectedEnvelope, InjectedMessage};
use crate::dom::tree::NodeId;
use indexmap::IndexSet;
use rand::Rng;

/// Capability: does this element currently have a click-triggering listener?
///
/// Backed by page-context instrumentation in a browser. Hosts without such
/// instrumentation can use [`NoClickListeners`].
pub trait ClickListenerObserver {
    fn has_click_listener(&self, node: NodeId) -> bool;
}

/// Observer for environments that cannot see page listeners
#[derive(Debug, Clone, Copy, Default)]
pub struct NoClickListeners;

impl ClickListenerObserver for NoClickListeners {
    fn has_click_listener(&self, _node: NodeId) -> bool {
        false
    }
}

/// What an accepted injected message asks the catalog to do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelEvent {
    /// Click-listener presence changed; the element needs re-classifying
    ListenersChanged(NodeId),
    /// A closed shadow root can be recovered through this marker node
    ShadowRootMarker(NodeId),
}

/// Receiving end of the injected channel.
///
/// Remembers which elements have click listeners according to messages that
/// carried the right secret; everything else is dropped.
#[derive(Debug, Clone)]
pub struct ClickListenerRegistry {
    secret: u64,
    nodes: IndexSet<NodeId>,
}

impl Default for ClickListenerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ClickListenerRegistry {
    /// Registry with a fresh random secret
    pub fn new() -> Self {
        Self::with_secret(rand::thread_rng().r#gen())
    }

    pub fn with_secret(secret: u64) -> Self {
        Self {
            secret,
            nodes: IndexSet::new(),
        }
    }

    /// Secret the page side must attach to its messages
    pub fn secret(&self) -> u64 {
        self.secret
    }

    /// Validate and apply one message from the page context
    pub fn receive(&mut self, envelope: &InjectedEnvelope) -> Option<ChannelEvent> {
        if envelope.secret != self.secret {
            log::trace!("Dropping injected message with wrong secret");
            return None;
        }
        match envelope.message {
            InjectedMessage::ClickListenerAdded { node } => {
                self.nodes.insert(node);
                Some(ChannelEvent::ListenersChanged(node))
            }
            InjectedMessage::ClickListenerRemoved { node } => {
                self.nodes.shift_remove(&node);
                Some(ChannelEvent::ListenersChanged(node))
            }
            InjectedMessage::ShadowRootMarker { marker } => Some(ChannelEvent::ShadowRootMarker(marker)),
        }
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

impl ClickListenerObserver for ClickListenerRegistry {
    fn has_click_listener(&self, node: NodeId) -> bool {
        self.nodes.contains(&node)
    }
}
