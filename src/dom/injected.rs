//! Page-context instrumentation.
//!
//! Listeners registered by page scripts are invisible to an isolated content
//! script, and so are closed shadow roots. This component plays the part of
//! the small script injected into the page's own execution context: it
//! observes `addEventListener`/`removeEventListener`, `onclick`-style property
//! assignment and `attachShadow`, and forwards what it sees over a channel that
//! is keyed by a secret only the content script knows.

use crate::dom::tree::{DomTree, NodeId};
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};

/// Event types that make an element clickable when listened to
pub const CLICK_EVENTS: &[&str] = &["click", "mousedown", "mouseup", "pointerdown", "pointerup"];

/// Tag name of the temporary node used to hand over closed shadow roots
pub const SHADOW_MARKER_TAG: &str = "browser-hints-shadow-marker";

/// Message posted from the page context to the content script
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum InjectedMessage {
    ClickListenerAdded { node: NodeId },
    ClickListenerRemoved { node: NodeId },
    /// A marker node was appended inside a closed shadow root; its root node
    /// is the shadow root
    ShadowRootMarker { marker: NodeId },
}

/// Message plus the channel secret it was sent with
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InjectedEnvelope {
    pub secret: u64,
    pub message: InjectedMessage,
}

/// Listener bookkeeping of the page context
#[derive(Debug, Clone, Default)]
pub struct PageHooks {
    secret: Option<u64>,
    listeners: IndexMap<NodeId, Vec<String>>,
    onclick: IndexSet<NodeId>,
    closed_hosts: IndexSet<NodeId>,
    outbox: Vec<InjectedEnvelope>,
}

impl PageHooks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start forwarding to a content script. Everything observed before the
    /// channel existed is replayed.
    pub fn install_channel(&mut self, secret: u64, dom: &mut DomTree) {
        self.secret = Some(secret);
        self.outbox.clear();

        let clickable: Vec<NodeId> = self
            .listeners
            .keys()
            .chain(self.onclick.iter())
            .copied()
            .filter(|&node| self.has_click_listener(node))
            .collect::<IndexSet<_>>()
            .into_iter()
            .collect();
        for node in clickable {
            self.post(InjectedMessage::ClickListenerAdded { node });
        }

        let hosts: Vec<NodeId> = self.closed_hosts.iter().copied().collect();
        for host in hosts {
            self.hand_over_shadow_root(host, dom);
        }
    }

    pub fn has_channel(&self) -> bool {
        self.secret.is_some()
    }

    fn post(&mut self, message: InjectedMessage) {
        if let Some(secret) = self.secret {
            self.outbox.push(InjectedEnvelope { secret, message });
        }
    }

    /// Drain messages waiting for the content script
    pub fn take_messages(&mut self) -> Vec<InjectedEnvelope> {
        std::mem::take(&mut self.outbox)
    }

    pub fn has_click_listener(&self, node: NodeId) -> bool {
        self.onclick.contains(&node)
            || self
                .listeners
                .get(&node)
                .is_some_and(|types| types.iter().any(|t| is_click_event(t)))
    }

    pub fn add_event_listener(&mut self, node: NodeId, event_type: &str) {
        let had = self.has_click_listener(node);
        self.listeners
            .entry(node)
            .or_default()
            .push(event_type.to_string());
        if !had && self.has_click_listener(node) {
            self.post(InjectedMessage::ClickListenerAdded { node });
        }
    }

    pub fn remove_event_listener(&mut self, node: NodeId, event_type: &str) {
        let had = self.has_click_listener(node);
        if let Some(types) = self.listeners.get_mut(&node) {
            if let Some(pos) = types.iter().position(|t| t == event_type) {
                types.remove(pos);
            }
            if types.is_empty() {
                self.listeners.shift_remove(&node);
            }
        }
        if had && !self.has_click_listener(node) {
            self.post(InjectedMessage::ClickListenerRemoved { node });
        }
    }

    /// `element.onclick = handler` / `element.onclick = null`
    pub fn set_onclick(&mut self, node: NodeId, present: bool) {
        let had = self.has_click_listener(node);
        if present {
            self.onclick.insert(node);
        } else {
            self.onclick.shift_remove(&node);
        }
        match (had, self.has_click_listener(node)) {
            (false, true) => self.post(InjectedMessage::ClickListenerAdded { node }),
            (true, false) => self.post(InjectedMessage::ClickListenerRemoved { node }),
            _ => {}
        }
    }

    /// Called from the `attachShadow` hook
    pub fn on_attach_shadow(&mut self, host: NodeId, closed: bool, dom: &mut DomTree) {
        if closed {
            self.closed_hosts.insert(host);
            self.hand_over_shadow_root(host, dom);
        }
    }

    fn hand_over_shadow_root(&mut self, host: NodeId, dom: &mut DomTree) {
        if !self.has_channel() {
            return;
        }
        let Some(root) = dom.any_shadow_root(host) else {
            return;
        };
        let marker = dom.create_element(SHADOW_MARKER_TAG);
        if dom.append_child(root, marker).is_ok() {
            self.post(InjectedMessage::ShadowRootMarker { marker });
        }
    }
}

pub fn is_click_event(event_type: &str) -> bool {
    CLICK_EVENTS.contains(&event_type)
}
