//! Element catalog
//!
//! Keeps the authoritative set of hintable elements of one frame and their
//! types, updated incrementally from mutation records and from the injected
//! click-listener channel. Work is queued and drained in deadline-bounded
//! slices; see [`queue`].

pub mod classify;
pub mod listeners;
pub mod queue;
pub mod visibility;

pub use classify::{ElementType, ElementTypes, classify};
pub use listeners::{ChannelEvent, ClickListenerObserver, ClickListenerRegistry, NoClickListeners};
pub use queue::{
    Clock, DrainOutcome, IdleDeadline, ManualClock, SliceDeadline, StepBudget, SystemClock, Unbounded, WorkQueue,
};
pub use visibility::{FlushState, VisibilityTracker};

use self::classify::RELEVANT_ATTRIBUTES;
use crate::dom::page::Page;
use crate::dom::tree::{DomTree, MutationKind, MutationRecord, NodeId};
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// Kind of change an element went through
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mutation {
    /// Inserted into an observed tree; its subtree is walked
    Added,
    /// Left the tree; its subtree is forgotten
    Removed,
    /// An attribute, its children's text or its listeners changed
    Changed,
}

/// One unit of queued catalog work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Work {
    mutation: Mutation,
    node: NodeId,
}

#[derive(Debug, Clone)]
pub struct ElementCatalog {
    elements: IndexMap<NodeId, ElementType>,
    frames: IndexSet<NodeId>,
    /// Tree roots whose mutation records are processed
    scopes: IndexSet<NodeId>,
    /// Shadow roots known to the catalog, by host
    shadow_roots: HashMap<NodeId, NodeId>,
    queue: WorkQueue<Work>,
    listeners: ClickListenerRegistry,
    visibility: VisibilityTracker,
}

impl ElementCatalog {
    pub fn new(max_tracked_elements: usize) -> Self {
        Self::with_registry(max_tracked_elements, ClickListenerRegistry::new())
    }

    pub fn with_registry(max_tracked_elements: usize, listeners: ClickListenerRegistry) -> Self {
        Self {
            elements: IndexMap::new(),
            frames: IndexSet::new(),
            scopes: IndexSet::new(),
            shadow_roots: HashMap::new(),
            queue: WorkQueue::new(),
            listeners,
            visibility: VisibilityTracker::new(max_tracked_elements),
        }
    }

    /// Start cataloguing a page: observe its document, open the injected
    /// channel and queue a walk of the whole tree.
    pub fn attach(&mut self, page: &mut Page) {
        let document = page.dom().document();
        self.scopes.insert(document);
        page.dom_mut().take_records();
        page.install_channel(self.listeners.secret());
        self.queue.push(Work {
            mutation: Mutation::Added,
            node: page.html(),
        });
        self.queue.schedule();
        self.receive_injected(page);
    }

    /// Forget everything, e.g. before the frame loads a new document
    pub fn reset(&mut self) {
        self.elements.clear();
        self.frames.clear();
        self.scopes.clear();
        self.shadow_roots.clear();
        self.queue.clear();
        self.visibility.reset();
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn element_type(&self, node: NodeId) -> Option<ElementType> {
        self.elements.get(&node).copied()
    }

    pub fn elements(&self) -> &IndexMap<NodeId, ElementType> {
        &self.elements
    }

    /// Catalogued `<iframe>`/`<frame>` elements
    pub fn frames(&self) -> &IndexSet<NodeId> {
        &self.frames
    }

    pub fn listeners(&self) -> &ClickListenerRegistry {
        &self.listeners
    }

    pub fn visibility(&self) -> &VisibilityTracker {
        &self.visibility
    }

    pub fn is_observing(&self, scope: NodeId) -> bool {
        self.scopes.contains(&scope)
    }

    pub fn has_pending_work(&self) -> bool {
        !self.queue.is_empty()
    }

    /// Catalogued elements that are candidates for being on screen, in
    /// catalog order
    pub fn candidates(&self) -> Vec<(NodeId, ElementType)> {
        self.elements
            .iter()
            .filter(|(node, _)| self.visibility.is_visible(**node))
            .map(|(node, element_type)| (*node, *element_type))
            .collect()
    }

    /// Queue an element change for the next slice
    pub fn apply_mutation(&mut self, mutation: Mutation, node: NodeId) {
        self.queue.push(Work { mutation, node });
        self.queue.schedule();
    }

    /// Translate mutation records into queued work. Records of scopes the
    /// catalog does not observe are dropped.
    pub fn enqueue_records(&mut self, dom: &DomTree, records: &[MutationRecord]) {
        for record in records {
            if !self.scopes.contains(&record.scope) {
                continue;
            }
            // Text changes affect the element holding the text.
            if dom.text(record.target).is_some() {
                if let Some(parent) = record.parent.filter(|&p| dom.is_element(p)) {
                    self.queue.push(Work {
                        mutation: Mutation::Changed,
                        node: parent,
                    });
                }
                continue;
            }
            let mutation = match &record.kind {
                MutationKind::Added => Mutation::Added,
                MutationKind::Removed => Mutation::Removed,
                MutationKind::Attribute(name) if RELEVANT_ATTRIBUTES.contains(&name.as_str()) => Mutation::Changed,
                MutationKind::Attribute(_) => continue,
            };
            self.queue.push(Work {
                mutation,
                node: record.target,
            });
        }
        self.queue.schedule();
    }

    /// Mutation-observer tick: collect the page's records and injected
    /// messages and queue the resulting work. Completes the first phase of a
    /// pending flush.
    pub fn on_mutation_tick(&mut self, page: &mut Page) {
        let records = page.dom_mut().take_records();
        self.visibility.on_mutation_tick(page, &records);
        self.enqueue_records(page.dom(), &records);
        self.receive_injected(page);
    }

    /// Intersection-observer tick. Returns the number of flushes completed.
    pub fn on_intersection_tick(&mut self, page: &Page) -> usize {
        self.visibility
            .intersection_tick(|node| page.intersects_viewport(node));
        self.visibility.on_intersection_tick()
    }

    pub fn begin_flush(&mut self, page: &mut Page) {
        self.visibility.begin_flush(page);
    }

    /// Bring the catalog and the visible sets fully up to date
    pub fn flush_now(&mut self, page: &mut Page) {
        self.begin_flush(page);
        self.on_mutation_tick(page);
        self.process(page.dom(), &Unbounded);
        self.on_intersection_tick(page);
    }

    fn receive_injected(&mut self, page: &mut Page) {
        for envelope in page.take_injected_messages() {
            match self.listeners.receive(&envelope) {
                Some(ChannelEvent::ListenersChanged(node)) => {
                    self.queue.push(Work {
                        mutation: Mutation::Changed,
                        node,
                    });
                }
                Some(ChannelEvent::ShadowRootMarker(marker)) => self.recover_shadow_root(page, marker),
                None => {}
            }
        }
        self.queue.schedule();
    }

    /// Second half of the closed shadow root handshake
    fn recover_shadow_root(&mut self, page: &mut Page, marker: NodeId) {
        let dom = page.dom_mut();
        let root = dom.root_node(marker);
        let _ = dom.remove(marker);
        let Some(host) = dom.shadow_host(root) else {
            log::trace!("Shadow root marker {} is not in a shadow tree", marker);
            return;
        };
        // The marker's removal happens in a scope nobody processes yet.
        let records = dom.take_records();
        self.enqueue_records(page.dom(), &records);

        self.shadow_roots.insert(host, root);
        if page.dom().is_connected(host) {
            self.observe_shadow_root(page.dom(), root);
        }
    }

    fn observe_shadow_root(&mut self, dom: &DomTree, root: NodeId) {
        if self.scopes.insert(root) {
            log::trace!("Observing shadow root {}", root);
            self.queue.push_front_all(
                dom.children(root)
                    .iter()
                    .map(|&node| Work {
                        mutation: Mutation::Added,
                        node,
                    })
                    .collect::<Vec<_>>()
                    .into_iter(),
            );
        }
    }

    /// Run one slice of queued work
    pub fn process<D: IdleDeadline + ?Sized>(&mut self, dom: &DomTree, deadline: &D) -> DrainOutcome {
        let mut queue = std::mem::take(&mut self.queue);
        let outcome = queue.run(deadline, |work, queue| self.step(dom, work, queue));
        self.queue = queue;
        outcome
    }

    fn step(&mut self, dom: &DomTree, work: Work, queue: &mut WorkQueue<Work>) {
        match work.mutation {
            Mutation::Added => {
                if !dom.is_connected(work.node) {
                    return;
                }
                self.update(dom, work.node);

                let mut follow_up: Vec<Work> = dom
                    .children(work.node)
                    .iter()
                    .filter(|&&child| dom.is_element(child))
                    .map(|&node| Work {
                        mutation: Mutation::Added,
                        node,
                    })
                    .collect();
                if let Some(root) = self.shadow_root_of(dom, work.node) {
                    if self.scopes.insert(root) {
                        follow_up.extend(dom.children(root).iter().map(|&node| Work {
                            mutation: Mutation::Added,
                            node,
                        }));
                    }
                }
                queue.push_front_all(follow_up.into_iter());
            }
            Mutation::Removed => {
                if dom.is_connected(work.node) {
                    // Moved rather than removed; the matching Added record
                    // re-walks it.
                    return;
                }
                self.forget_subtree(dom, work.node);
            }
            Mutation::Changed => {
                if dom.is_connected(work.node) {
                    self.update(dom, work.node);
                }
            }
        }
    }

    /// Open shadow root, or a closed one recovered through the handshake
    fn shadow_root_of(&mut self, dom: &DomTree, host: NodeId) -> Option<NodeId> {
        if let Some(root) = dom.shadow_root(host) {
            self.shadow_roots.insert(host, root);
            return Some(root);
        }
        self.shadow_roots.get(&host).copied()
    }

    fn update(&mut self, dom: &DomTree, node: NodeId) {
        let Some(element) = dom.element(node) else {
            return;
        };
        if classify::is_frame(element) {
            if self.frames.insert(node) {
                self.visibility.observe_frame(node);
            }
            return;
        }
        match classify(dom, node, &self.listeners) {
            Some(element_type) => {
                if self.elements.insert(node, element_type).is_none() {
                    self.visibility.observe(node);
                }
            }
            None => {
                if self.elements.shift_remove(&node).is_some() {
                    self.visibility.unobserve(node);
                }
            }
        }
    }

    fn forget(&mut self, node: NodeId) {
        if self.elements.shift_remove(&node).is_some() {
            self.visibility.unobserve(node);
        }
        if self.frames.shift_remove(&node) {
            self.visibility.unobserve_frame(node);
        }
    }

    fn forget_subtree(&mut self, dom: &DomTree, node: NodeId) {
        let mut stack = vec![node];
        while let Some(next) = stack.pop() {
            self.forget(next);
            stack.extend(dom.children(next).iter().copied());
            if let Some(&root) = self.shadow_roots.get(&next) {
                if self.scopes.shift_remove(&root) {
                    log::trace!("Stopped observing shadow root {}", root);
                }
                stack.extend(dom.children(root).iter().copied());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element::{ElementNode, ShadowMode};
    use crate::dom::page::{FrameId, PageFixture};

    fn page(children: Vec<ElementNode>) -> Page {
        let body = ElementNode::new("body").with_children(children);
        let (page, _) = Page::from_fixture(FrameId::TOP, &PageFixture::new(body)).unwrap();
        page
    }

    fn link(id: &str) -> ElementNode {
        ElementNode::new("a")
            .with_attribute("href", "/a")
            .with_attribute("id", id)
            .with_bounding_box(0.0, 0.0, 50.0, 20.0)
    }

    fn attached(page: &mut Page) -> ElementCatalog {
        let mut catalog = ElementCatalog::new(100);
        catalog.attach(page);
        catalog.process(page.dom(), &Unbounded);
        catalog
    }

    #[test]
    fn test_initial_walk() {
        let mut page = page(vec![
            link("a"),
            ElementNode::new("div").with_children(vec![ElementNode::new("button").with_attribute("id", "b")]),
            ElementNode::new("form"),
        ]);
        let catalog = attached(&mut page);

        assert_eq!(catalog.len(), 2);
        let a = page.get_element_by_id("a").unwrap();
        let b = page.get_element_by_id("b").unwrap();
        assert_eq!(catalog.element_type(a), Some(ElementType::Link));
        assert_eq!(catalog.element_type(b), Some(ElementType::Clickable));
    }

    #[test]
    fn test_processing_yields_to_deadline() {
        let mut page = page((0..20).map(|i| link(&format!("l{i}"))).collect());
        let mut catalog = ElementCatalog::new(100);
        catalog.attach(&mut page);

        let outcome = catalog.process(page.dom(), &StepBudget::new(5));
        assert_eq!(outcome, DrainOutcome::Yielded);
        assert!(catalog.len() < 20);
        assert!(catalog.has_pending_work());

        let outcome = catalog.process(page.dom(), &Unbounded);
        assert_eq!(outcome, DrainOutcome::Done);
        assert_eq!(catalog.len(), 20);
    }

    #[test]
    fn test_mutations() {
        let mut page = page(vec![link("a")]);
        let mut catalog = attached(&mut page);
        let a = page.get_element_by_id("a").unwrap();
        let body = page.body();

        let button = page.dom_mut().create_element("button");
        page.dom_mut().append_child(body, button).unwrap();
        page.dom_mut().remove(a).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(button), Some(ElementType::Clickable));
        assert_eq!(catalog.element_type(a), None);

        page.dom_mut().set_attribute(button, "disabled", "").unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(button), None);
    }

    #[test]
    fn test_unrelated_attributes_are_skipped() {
        let mut page = page(vec![link("a")]);
        let mut catalog = attached(&mut page);
        let a = page.get_element_by_id("a").unwrap();

        page.dom_mut().set_attribute(a, "class", "nav").unwrap();
        page.dom_mut().set_attribute(a, "title", "Home").unwrap();
        catalog.on_mutation_tick(&mut page);
        assert!(catalog.queue.is_empty());

        page.dom_mut().set_attribute(a, "href", "javascript:void(0)").unwrap();
        catalog.on_mutation_tick(&mut page);
        assert_eq!(catalog.queue.len(), 1);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(a), Some(ElementType::Clickable));
    }

    #[test]
    fn test_remove_and_reinsert_in_one_batch() {
        let mut page = page(vec![link("a")]);
        let mut catalog = attached(&mut page);
        let a = page.get_element_by_id("a").unwrap();
        let body = page.body();

        page.dom_mut().remove(a).unwrap();
        page.dom_mut().append_child(body, a).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(a), Some(ElementType::Link));
    }

    #[test]
    fn test_text_changes_reclassify_parent() {
        let mut page = page(vec![ElementNode::new("p").with_attribute("id", "p")]);
        let mut catalog = attached(&mut page);
        let p = page.get_element_by_id("p").unwrap();
        assert_eq!(catalog.element_type(p), None);

        let text = page.dom_mut().create_text("Hello", Vec::new());
        page.dom_mut().append_child(p, text).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(p), Some(ElementType::Selectable));

        page.dom_mut().remove(text).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(p), None);
    }

    #[test]
    fn test_click_listener_reclassifies() {
        let mut page = page(vec![ElementNode::new("div").with_attribute("id", "d")]);
        let mut catalog = attached(&mut page);
        let d = page.get_element_by_id("d").unwrap();
        assert_eq!(catalog.element_type(d), None);

        page.add_event_listener(d, "click");
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(d), Some(ElementType::ClickableEvent));

        page.remove_event_listener(d, "click");
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(d), None);
    }

    #[test]
    fn test_shadow_roots() {
        let host = |id: &str, mode: ShadowMode| {
            ElementNode::new("div")
                .with_attribute("id", id)
                .with_shadow_root(mode, vec![ElementNode::new("button").with_attribute("id", &format!("{id}-inner"))])
        };
        let mut page = page(vec![host("open", ShadowMode::Open), host("closed", ShadowMode::Closed)]);
        let mut catalog = attached(&mut page);

        let open_inner = page.get_element_by_id("open-inner").unwrap();
        let closed_inner = page.get_element_by_id("closed-inner").unwrap();
        assert_eq!(catalog.element_type(open_inner), Some(ElementType::Clickable));
        assert_eq!(catalog.element_type(closed_inner), Some(ElementType::Clickable));
        // The handover marker is gone again.
        let closed_root = page.dom().root_node(closed_inner);
        assert_eq!(page.dom().children(closed_root), &[closed_inner]);
        assert!(catalog.is_observing(closed_root));

        // Mutations inside the closed root are seen.
        let extra = page.dom_mut().create_element("textarea");
        page.dom_mut().append_child(closed_root, extra).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(extra), Some(ElementType::Textarea));

        // Removing the host tears the scope down; reinserting re-establishes it.
        let closed_host = page.get_element_by_id("closed").unwrap();
        let body = page.body();
        page.dom_mut().remove(closed_host).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert!(!catalog.is_observing(closed_root));
        assert_eq!(catalog.element_type(closed_inner), None);

        page.dom_mut().append_child(body, closed_host).unwrap();
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert!(catalog.is_observing(closed_root));
        assert_eq!(catalog.element_type(closed_inner), Some(ElementType::Clickable));
    }

    #[test]
    fn test_forged_channel_messages_are_ignored() {
        let mut page = page(vec![ElementNode::new("div").with_attribute("id", "d")]);
        let mut catalog = ElementCatalog::with_registry(100, ClickListenerRegistry::with_secret(1));
        catalog.attach(&mut page);
        catalog.process(page.dom(), &Unbounded);
        let d = page.get_element_by_id("d").unwrap();

        // A page script that re-installs the channel with its own secret.
        page.install_channel(2);
        page.add_event_listener(d, "click");
        catalog.on_mutation_tick(&mut page);
        catalog.process(page.dom(), &Unbounded);
        assert_eq!(catalog.element_type(d), None);
    }

    #[test]
    fn test_frames_and_visibility() {
        let mut page = page(vec![
            link("a"),
            ElementNode::new("iframe")
                .with_attribute("id", "f")
                .with_bounding_box(0.0, 100.0, 300.0, 200.0),
        ]);
        let mut catalog = attached(&mut page);
        let a = page.get_element_by_id("a").unwrap();
        let f = page.get_element_by_id("f").unwrap();

        assert!(catalog.frames().contains(&f));
        assert_eq!(catalog.element_type(f), None);
        assert!(catalog.candidates().is_empty());

        catalog.flush_now(&mut page);
        assert_eq!(catalog.candidates(), vec![(a, ElementType::Link)]);
        assert!(catalog.visibility().visible_frames().contains(&f));
        assert_eq!(catalog.visibility().flush_state(), FlushState::Idle);

        page.scroll_by(0.0, 5000.0);
        catalog.flush_now(&mut page);
        assert!(catalog.candidates().is_empty());
    }
}
