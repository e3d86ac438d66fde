//! Which catalogued elements and child frames are currently on screen.
//!
//! Membership is driven by intersection ticks, the equivalent of
//! `IntersectionObserver` callbacks. Above a ceiling of tracked elements the
//! per-element tracking is dropped and every catalogued element counts as a
//! candidate; frame tracking always continues.

use crate::dom::page::Page;
use crate::dom::tree::{MutationKind, MutationRecord, NodeId};
use indexmap::IndexSet;

/// Tag of the node inserted to flush pending observer callbacks
pub const PROBE_TAG: &str = "browser-hints-probe";

/// Progress of a [`VisibilityTracker::begin_flush`] request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlushState {
    Idle,
    /// Probe inserted; waiting for the mutation tick that reports it
    AwaitingMutations { probe: NodeId, waiters: usize },
    /// Mutations seen; waiting for one intersection tick
    AwaitingIntersections { probe: NodeId, waiters: usize },
}

#[derive(Debug, Clone)]
pub struct VisibilityTracker {
    ceiling: usize,
    bailed_out: bool,
    observed: IndexSet<NodeId>,
    visible: IndexSet<NodeId>,
    frames: IndexSet<NodeId>,
    visible_frames: IndexSet<NodeId>,
    flush: FlushState,
}

impl VisibilityTracker {
    pub fn new(ceiling: usize) -> Self {
        Self {
            ceiling,
            bailed_out: false,
            observed: IndexSet::new(),
            visible: IndexSet::new(),
            frames: IndexSet::new(),
            visible_frames: IndexSet::new(),
            flush: FlushState::Idle,
        }
    }

    /// Start tracking an element
    pub fn observe(&mut self, node: NodeId) {
        if self.bailed_out {
            return;
        }
        self.observed.insert(node);
        if self.observed.len() > self.ceiling {
            self.bail_out();
        }
    }

    pub fn unobserve(&mut self, node: NodeId) {
        self.observed.shift_remove(&node);
        self.visible.shift_remove(&node);
    }

    pub fn observe_frame(&mut self, node: NodeId) {
        self.frames.insert(node);
    }

    pub fn unobserve_frame(&mut self, node: NodeId) {
        self.frames.shift_remove(&node);
        self.visible_frames.shift_remove(&node);
    }

    fn bail_out(&mut self) {
        log::warn!(
            "Tracking more than {} elements; disabling per-element visibility tracking",
            self.ceiling
        );
        self.bailed_out = true;
        self.observed.clear();
        self.visible.clear();
    }

    pub fn is_bailed_out(&self) -> bool {
        self.bailed_out
    }

    pub fn observed_len(&self) -> usize {
        self.observed.len()
    }

    /// Whether a catalogued element is a candidate for being on screen
    pub fn is_visible(&self, node: NodeId) -> bool {
        self.bailed_out || self.visible.contains(&node)
    }

    /// Visible elements, or `None` once tracking has bailed out
    pub fn visible_elements(&self) -> Option<&IndexSet<NodeId>> {
        if self.bailed_out {
            None
        } else {
            Some(&self.visible)
        }
    }

    pub fn visible_frames(&self) -> &IndexSet<NodeId> {
        &self.visible_frames
    }

    /// One intersection tick: re-evaluate every observed target. Returns the
    /// number of targets whose visibility changed.
    pub fn intersection_tick(&mut self, intersects: impl Fn(NodeId) -> bool) -> usize {
        let mut changed = 0;
        for &node in &self.observed {
            let now_visible = intersects(node);
            let was_visible = self.visible.contains(&node);
            if now_visible && !was_visible {
                self.visible.insert(node);
                changed += 1;
            } else if !now_visible && was_visible {
                self.visible.shift_remove(&node);
                changed += 1;
            }
        }
        for &node in &self.frames {
            let now_visible = intersects(node);
            if now_visible != self.visible_frames.contains(&node) {
                if now_visible {
                    self.visible_frames.insert(node);
                } else {
                    self.visible_frames.shift_remove(&node);
                }
                changed += 1;
            }
        }
        changed
    }

    pub fn flush_state(&self) -> FlushState {
        self.flush
    }

    /// Request a flush: once it completes, every DOM change made before the
    /// request is reflected in the catalog and the visible sets. Concurrent
    /// requests share one probe.
    pub fn begin_flush(&mut self, page: &mut Page) {
        self.flush = match self.flush {
            FlushState::Idle => {
                let html = page.html();
                let dom = page.dom_mut();
                let probe = dom.create_element(PROBE_TAG);
                if dom.append_child(html, probe).is_err() {
                    // Nothing to wait for if the probe cannot be inserted.
                    FlushState::AwaitingIntersections { probe, waiters: 1 }
                } else {
                    FlushState::AwaitingMutations { probe, waiters: 1 }
                }
            }
            FlushState::AwaitingMutations { probe, waiters } => FlushState::AwaitingMutations {
                probe,
                waiters: waiters + 1,
            },
            FlushState::AwaitingIntersections { probe, waiters } => FlushState::AwaitingIntersections {
                probe,
                waiters: waiters + 1,
            },
        };
    }

    /// Feed the records of a mutation tick. Returns `true` if the probe was
    /// among them.
    pub fn on_mutation_tick(&mut self, page: &mut Page, records: &[MutationRecord]) -> bool {
        let FlushState::AwaitingMutations { probe, waiters } = self.flush else {
            return false;
        };
        let seen = records
            .iter()
            .any(|record| record.target == probe && record.kind == MutationKind::Added);
        if seen {
            let _ = page.dom_mut().remove(probe);
            self.flush = FlushState::AwaitingIntersections { probe, waiters };
        }
        seen
    }

    /// Call after an intersection tick. Returns the number of flush requests
    /// that completed with it.
    pub fn on_intersection_tick(&mut self) -> usize {
        match self.flush {
            FlushState::AwaitingIntersections { waiters, .. } => {
                self.flush = FlushState::Idle;
                waiters
            }
            _ => 0,
        }
    }

    /// Forget everything, e.g. when the frame navigates
    pub fn reset(&mut self) {
        self.bailed_out = false;
        self.observed.clear();
        self.visible.clear();
        self.frames.clear();
        self.visible_frames.clear();
        self.flush = FlushState::Idle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::page::{FrameId, ViewportSize};
    use crate::dom::tree::DomTree;

    fn ids(n: usize) -> Vec<NodeId> {
        let mut dom = DomTree::new();
        (0..n).map(|_| dom.create_element("div")).collect()
    }

    #[test]
    fn test_intersection_tick() {
        let nodes = ids(3);
        let mut tracker = VisibilityTracker::new(10);
        for &node in &nodes {
            tracker.observe(node);
        }

        let changed = tracker.intersection_tick(|node| node != nodes[1]);
        assert_eq!(changed, 2);
        assert!(tracker.is_visible(nodes[0]));
        assert!(!tracker.is_visible(nodes[1]));

        let changed = tracker.intersection_tick(|node| node != nodes[1]);
        assert_eq!(changed, 0);

        tracker.unobserve(nodes[0]);
        assert!(!tracker.is_visible(nodes[0]));
        assert_eq!(tracker.visible_elements().map(|v| v.len()), Some(1));
    }

    #[test]
    fn test_bail_out_keeps_frames() {
        let nodes = ids(5);
        let mut tracker = VisibilityTracker::new(3);
        tracker.observe_frame(nodes[4]);
        for &node in &nodes[..4] {
            tracker.observe(node);
        }

        assert!(tracker.is_bailed_out());
        assert_eq!(tracker.observed_len(), 0);
        assert!(tracker.visible_elements().is_none());
        // Every element is a candidate after bailing out.
        assert!(tracker.is_visible(nodes[0]));

        tracker.intersection_tick(|_| true);
        assert!(tracker.visible_frames().contains(&nodes[4]));
    }

    #[test]
    fn test_flush_collapses_requests() {
        let mut page = Page::new(FrameId::TOP, ViewportSize::default());
        let mut tracker = VisibilityTracker::new(10);

        tracker.begin_flush(&mut page);
        tracker.begin_flush(&mut page);
        let FlushState::AwaitingMutations { probe, waiters } = tracker.flush_state() else {
            panic!("flush should wait for mutations");
        };
        assert_eq!(waiters, 2);
        assert!(page.dom().is_connected(probe));

        // An intersection tick before the mutation tick completes nothing.
        assert_eq!(tracker.on_intersection_tick(), 0);

        let records = page.dom_mut().take_records();
        assert!(tracker.on_mutation_tick(&mut page, &records));
        assert!(!page.dom().is_connected(probe));

        assert_eq!(tracker.on_intersection_tick(), 2);
        assert_eq!(tracker.flush_state(), FlushState::Idle);
    }
}
