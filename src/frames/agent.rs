use crate::catalog::{
    ClickListenerObserver, Clock, ElementCatalog, ElementType, ElementTypes, FlushState, IdleDeadline, SliceDeadline,
    Unbounded,
};
use crate::dom::geometry::{BoundingBox, Viewport, visible_box};
use crate::dom::page::{FrameId, Page};
use crate::dom::tree::{DomTree, NodeId, normalize_whitespace};
use crate::error::{HintsError, Result};
use crate::frames::index::ElementIndex;
use crate::frames::messages::{ElementUpdate, FrameAction, FromFrame, SessionToken, ToFrame};
use crate::hints::assign::{FrameRef, VisibleElement};
use crate::measure::{MeasureOptions, matching_text_rects, measure};
use crate::options::{HintsOptions, Timing};
use std::time::Instant;
use url::Url;

/// Attributes that stand in for text on elements without any
const TEXT_ATTRIBUTES: &[&str] = &["aria-label", "title", "alt", "placeholder", "value"];

/// Where a frame sends something
#[derive(Debug, Clone, PartialEq)]
pub enum FrameOutput {
    ToController(FromFrame),
    ToFrame { frame: FrameId, message: ToFrame },
}

/// A request that needs an up-to-date catalog before it can be answered
#[derive(Debug, Clone)]
enum Request {
    Find {
        token: SessionToken,
        types: ElementTypes,
        received: Instant,
    },
    Update {
        token: SessionToken,
    },
    TextRects {
        token: SessionToken,
        indexes: Vec<usize>,
        words: Vec<String>,
    },
}

/// The part of the hints engine living inside one frame.
///
/// Owns the frame's catalog and the index of elements reported in the current
/// session. Requests are answered once a catalog flush completes, from
/// [`FrameAgent::pump`].
#[derive(Debug)]
pub struct FrameAgent {
    frame: FrameId,
    active: bool,
    catalog: ElementCatalog,
    index: ElementIndex,
    token: Option<SessionToken>,
    types: ElementTypes,
    /// Viewport chain from the top frame down to this frame
    viewports: Vec<Viewport>,
    pending: Vec<Request>,
    measure: MeasureOptions,
    timing: Timing,
}

impl FrameAgent {
    pub fn new(frame: FrameId, options: &HintsOptions) -> Self {
        Self {
            frame,
            active: false,
            catalog: ElementCatalog::new(options.max_tracked_elements),
            index: ElementIndex::new(),
            token: None,
            types: ElementTypes::Default,
            viewports: Vec::new(),
            pending: Vec::new(),
            measure: MeasureOptions::from(options),
            timing: options.timing,
        }
    }

    pub fn frame(&self) -> FrameId {
        self.frame
    }

    /// Start cataloguing `page`. Pages that do not run our script stay
    /// inactive and never answer.
    pub fn attach(&mut self, page: &mut Page) -> bool {
        if !page.is_responsive() {
            log::debug!("{} does not accept scripts; hints stay inactive there", self.frame);
            self.active = false;
            return false;
        }
        self.catalog.attach(page);
        self.active = true;
        true
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn catalog(&self) -> &ElementCatalog {
        &self.catalog
    }

    pub fn index(&self) -> &ElementIndex {
        &self.index
    }

    pub fn token(&self) -> Option<SessionToken> {
        self.token
    }

    /// Whether a request is waiting for the next flush
    pub fn has_pending_requests(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Handle one command addressed to this frame
    pub fn handle(&mut self, page: &mut Page, message: ToFrame, clock: &dyn Clock) -> Result<Vec<FrameOutput>> {
        if !self.active {
            return Ok(Vec::new());
        }
        let mut out = Vec::new();
        match message {
            ToFrame::StartFindElements { token, types } => {
                self.start_session(token, types, vec![page.viewport()]);
                self.request(page, Request::Find {
                    token,
                    types,
                    received: clock.now(),
                });
            }
            ToFrame::FindElements {
                token,
                types,
                viewports,
            } => {
                out.push(FrameOutput::ToController(FromFrame::ReportVisibleFrame {
                    token,
                    frame: self.frame,
                }));
                self.start_session(token, types, viewports);
                self.request(page, Request::Find {
                    token,
                    types,
                    received: clock.now(),
                });
            }
            ToFrame::UpdateElements { token } => {
                if self.is_current(token) {
                    self.request(page, Request::Update { token });
                }
            }
            ToFrame::GetTextRects { token, indexes, words } => {
                if self.is_current(token) {
                    self.request(page, Request::TextRects { token, indexes, words });
                }
            }
            ToFrame::ActivateElement { token, index, action } => {
                if self.is_current(token) {
                    self.activate(page, index, action)?;
                }
            }
            ToFrame::ClearSession => {
                self.token = None;
                self.pending.clear();
                self.index.clear();
                self.viewports.clear();
            }
        }
        Ok(out)
    }

    /// Run one turn of the frame's event loop: a mutation tick, a slice of
    /// catalog work and an intersection tick. Answers pending requests once
    /// their flush has completed.
    pub fn pump(&mut self, page: &mut Page, clock: &dyn Clock) -> Vec<FrameOutput> {
        if !self.active {
            return Vec::new();
        }
        self.catalog.on_mutation_tick(page);
        if matches!(self.catalog.visibility().flush_state(), FlushState::AwaitingIntersections { .. }) {
            self.catalog.process(page.dom(), &Unbounded);
        } else {
            let slice = SliceDeadline::new(clock, self.timing.idle_slice());
            self.catalog.process(page.dom(), &slice);
        }
        if self.catalog.on_intersection_tick(page) == 0 {
            return Vec::new();
        }

        let mut out = Vec::new();
        for request in std::mem::take(&mut self.pending) {
            out.extend(self.serve(page, request, clock));
        }
        out
    }

    /// The frame's document is going away
    pub fn leave(&mut self) -> FrameOutput {
        self.catalog.reset();
        self.index.clear();
        self.token = None;
        self.pending.clear();
        self.active = false;
        FrameOutput::ToController(FromFrame::PageLeave { frame: self.frame })
    }

    fn start_session(&mut self, token: SessionToken, types: ElementTypes, viewports: Vec<Viewport>) {
        if self.token != Some(token) {
            self.index.clear();
            self.pending.clear();
        }
        self.token = Some(token);
        self.types = types;
        self.viewports = viewports;
    }

    fn is_current(&self, token: SessionToken) -> bool {
        let current = self.token == Some(token);
        if !current {
            log::trace!("{} dropping command for stale session {}", self.frame, token);
        }
        current
    }

    fn request(&mut self, page: &mut Page, request: Request) {
        self.pending.push(request);
        self.catalog.begin_flush(page);
    }

    fn serve(&mut self, page: &Page, request: Request, clock: &dyn Clock) -> Vec<FrameOutput> {
        match request {
            Request::Find { token, types, received } if self.token == Some(token) => {
                let deadline = SliceDeadline::until(clock, received + self.timing.discovery_deadline());
                let elements = self.collect_elements(page, types, &deadline);
                let children = self.child_frames(page, token);
                let report = FromFrame::ReportVisibleElements {
                    token,
                    frame: self.frame,
                    elements,
                    num_frames: children.len(),
                    duration: clock.now().saturating_duration_since(received),
                };
                // The report must reach the controller before any child's
                // confirmation does.
                let mut out = vec![FrameOutput::ToController(report)];
                out.extend(children);
                out
            }
            Request::Update { token } if self.token == Some(token) => {
                let updates = self.update_elements(page);
                vec![FrameOutput::ToController(FromFrame::ReportUpdatedElements {
                    token,
                    frame: self.frame,
                    updates,
                })]
            }
            Request::TextRects { token, indexes, words } if self.token == Some(token) => {
                let rects = self.text_rects(page, &indexes, &words);
                vec![FrameOutput::ToController(FromFrame::ReportTextRects {
                    token,
                    frame: self.frame,
                    rects,
                })]
            }
            _ => Vec::new(),
        }
    }

    /// Measure every visible candidate of the requested types and register it
    /// in the session index.
    ///
    /// Once `deadline` has expired the remaining elements are still reported,
    /// with their raw text content instead of their rendered label.
    pub fn collect_elements(
        &mut self,
        page: &Page,
        types: ElementTypes,
        deadline: &dyn IdleDeadline,
    ) -> Vec<VisibleElement> {
        let dom = page.dom();
        let mut elements = Vec::new();
        for (node, element_type) in self.catalog.candidates() {
            if !types.includes(element_type) {
                continue;
            }
            if element_type == ElementType::Label && self.labels_own_control(dom, node) {
                continue;
            }
            let measurements = match measure(page, node, element_type, &self.viewports, &self.measure) {
                Ok(measurements) => measurements,
                Err(rejection) => {
                    log::trace!("{}: {}", self.frame, rejection);
                    continue;
                }
            };
            let text = if deadline.expired() {
                dom.text_content(node)
            } else {
                label_text(dom, node)
            };
            let url = match element_type {
                ElementType::Link => dom
                    .element(node)
                    .and_then(|element| element.attribute("href"))
                    .map(|href| resolve_url(page.url(), href)),
                _ => None,
            };
            let index = self.index.register(node, element_type);
            elements.push(VisibleElement {
                element_type,
                measurements,
                has_click_listener: self.catalog.listeners().has_click_listener(node),
                url,
                text,
                frame: FrameRef { id: self.frame, index },
            });
        }
        elements
    }

    /// A label wrapping its control would only duplicate the control's hint
    fn labels_own_control(&self, dom: &DomTree, label: NodeId) -> bool {
        dom.descendants(label).into_iter().any(|node| {
            matches!(
                self.catalog.element_type(node),
                Some(ElementType::Clickable | ElementType::Textarea)
            )
        })
    }

    /// Ask every visible child frame to join the session
    fn child_frames(&self, page: &Page, token: SessionToken) -> Vec<FrameOutput> {
        let dom = page.dom();
        self.catalog
            .visibility()
            .visible_frames()
            .iter()
            .filter_map(|&node| {
                let element = dom.element(node)?;
                let frame = element.content_frame?;
                let content = element.rects.first()?.inset(&element.style.insets);
                visible_box(&content, &self.viewports)?;
                let mut viewports = self.viewports.clone();
                viewports.push(content);
                Some(FrameOutput::ToFrame {
                    frame,
                    message: ToFrame::FindElements {
                        token,
                        types: self.types,
                        viewports,
                    },
                })
            })
            .collect()
    }

    /// Re-measure every element reported in this session
    fn update_elements(&self, page: &Page) -> Vec<ElementUpdate> {
        let dom = page.dom();
        self.index
            .iter()
            .map(|(index, entry)| {
                let element_type = self.catalog.element_type(entry.node);
                let measurements = element_type.and_then(|element_type| {
                    measure(page, entry.node, element_type, &self.viewports, &self.measure).ok()
                });
                ElementUpdate {
                    index,
                    measurements,
                    text: label_text(dom, entry.node),
                }
            })
            .collect()
    }

    fn text_rects(&self, page: &Page, indexes: &[usize], words: &[String]) -> Vec<BoundingBox> {
        let dom = page.dom();
        indexes
            .iter()
            .filter_map(|&index| self.index.get(index))
            .flat_map(|entry| {
                let Some(bounds) = dom.element(entry.node).and_then(|element| element.bounds()) else {
                    return Vec::new();
                };
                match visible_box(&bounds, &self.viewports) {
                    Some(within) => matching_text_rects(dom, entry.node, words, &self.viewports, &within),
                    None => Vec::new(),
                }
            })
            .collect()
    }

    fn activate(&self, page: &mut Page, index: usize, action: FrameAction) -> Result<()> {
        let entry = self.index.get(index).ok_or_else(|| HintsError::ActivationFailed {
            index,
            reason: format!("no such element in {}", self.frame),
        })?;
        log::debug!("{}: {:?} element {} ({})", self.frame, action, index, entry.node);
        let result = match action {
            FrameAction::Click => page.click(entry.node),
            FrameAction::Focus => page.focus(entry.node),
            FrameAction::Select => page.select(entry.node),
        };
        result.map_err(|e| HintsError::ActivationFailed {
            index,
            reason: e.to_string(),
        })
    }
}

/// Text a hint can be filtered by: the rendered text, or a descriptive
/// attribute for elements without any
fn label_text(dom: &DomTree, node: NodeId) -> String {
    let text = dom.visible_text(node);
    if !text.is_empty() {
        return text;
    }
    dom.element(node)
        .and_then(|element| {
            TEXT_ATTRIBUTES
                .iter()
                .filter_map(|name| element.attribute(name))
                .find(|value| !value.trim().is_empty())
        })
        .map(normalize_whitespace)
        .unwrap_or_default()
}

/// Absolute form of `href`. Links into the page itself come back in their
/// fragment-only form so they are never mistaken for page-level destinations.
pub fn resolve_url(base: &str, href: &str) -> String {
    if href.starts_with('#') {
        return href.to_string();
    }
    let Ok(mut page) = Url::parse(base) else {
        return href.to_string();
    };
    let Ok(mut url) = page.join(href) else {
        return href.to_string();
    };
    if let Some(fragment) = url.fragment().map(str::to_string) {
        url.set_fragment(None);
        page.set_fragment(None);
        if url == page {
            return format!("#{}", fragment);
        }
        url.set_fragment(Some(&fragment));
    }
    url.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{ManualClock, StepBudget};
    use crate::dom::element::ElementNode;
    use crate::dom::page::PageFixture;

    fn link(id: &str, href: &str, text: &str, y: f64) -> ElementNode {
        ElementNode::new("a")
            .with_attribute("id", id)
            .with_attribute("href", href)
            .with_text(text)
            .with_bounding_box(10.0, y, 100.0, 20.0)
    }

    fn setup(children: Vec<ElementNode>) -> (FrameAgent, Page, ManualClock) {
        let fixture = PageFixture::new(ElementNode::new("body").with_children(children))
            .with_viewport(800.0, 600.0)
            .with_url("https://example.com/docs/");
        let (mut page, _) = Page::from_fixture(FrameId::TOP, &fixture).unwrap();
        let mut agent = FrameAgent::new(FrameId::TOP, &HintsOptions::default());
        assert!(agent.attach(&mut page));
        (agent, page, ManualClock::new(Instant::now()))
    }

    fn reports(out: &[FrameOutput]) -> Vec<&FromFrame> {
        out.iter()
            .filter_map(|output| match output {
                FrameOutput::ToController(message) => Some(message),
                _ => None,
            })
            .collect()
    }

    fn find(agent: &mut FrameAgent, page: &mut Page, clock: &ManualClock, token: SessionToken) -> Vec<FrameOutput> {
        let message = ToFrame::StartFindElements {
            token,
            types: ElementTypes::Default,
        };
        assert!(agent.handle(page, message, clock).unwrap().is_empty());
        agent.pump(page, clock)
    }

    fn elements(out: &[FrameOutput]) -> Vec<VisibleElement> {
        reports(out)
            .into_iter()
            .find_map(|message| match message {
                FromFrame::ReportVisibleElements { elements, .. } => Some(elements.clone()),
                _ => None,
            })
            .unwrap()
    }

    #[test]
    fn test_discovery_reports_visible_elements() {
        let (mut agent, mut page, clock) = setup(vec![
            link("home", "/", "Home", 10.0),
            link("about", "about", "About us", 40.0),
            link("far", "/far", "Far away", 2000.0),
        ]);
        let out = find(&mut agent, &mut page, &clock, SessionToken(1));

        let found = elements(&out);
        assert_eq!(found.len(), 2);
        assert_eq!(found[0].url.as_deref(), Some("https://example.com/"));
        assert_eq!(found[1].url.as_deref(), Some("https://example.com/docs/about"));
        assert_eq!(found[1].text, "About us");
        assert_eq!(found[1].frame, FrameRef { id: FrameId::TOP, index: 1 });
        assert!(!agent.has_pending_requests());
        // The flush probe is gone again.
        assert_eq!(page.dom().children(page.html()), &[page.body()]);
    }

    #[test]
    fn test_nothing_until_flushed() {
        let (mut agent, mut page, clock) = setup(vec![link("home", "/", "Home", 10.0)]);
        // Idle pumps never report anything.
        assert!(agent.pump(&mut page, &clock).is_empty());
        let out = find(&mut agent, &mut page, &clock, SessionToken(1));
        assert_eq!(elements(&out).len(), 1);
        assert!(agent.pump(&mut page, &clock).is_empty());
    }

    #[test]
    fn test_label_wrapping_control_is_skipped() {
        let (mut agent, mut page, clock) = setup(vec![
            ElementNode::new("label")
                .with_attribute("id", "wrap")
                .with_bounding_box(10.0, 10.0, 200.0, 20.0)
                .with_children(vec![
                    ElementNode::new("input")
                        .with_attribute("type", "checkbox")
                        .with_bounding_box(10.0, 12.0, 16.0, 16.0),
                ]),
            ElementNode::new("label")
                .with_attribute("for", "other")
                .with_text("Remember me")
                .with_bounding_box(10.0, 50.0, 200.0, 20.0),
        ]);
        let out = find(&mut agent, &mut page, &clock, SessionToken(1));
        let types: Vec<ElementType> = elements(&out).iter().map(|e| e.element_type).collect();
        assert_eq!(types.iter().filter(|t| **t == ElementType::Label).count(), 1);
        assert_eq!(types.len(), 2);
    }

    #[test]
    fn test_fan_out_to_child_frames() {
        let child = PageFixture::new(
            ElementNode::new("body").with_children(vec![link("inner", "/inner", "Inner", 10.0)]),
        )
        .with_viewport(300.0, 200.0);
        let fixture = PageFixture::new(ElementNode::new("body").with_children(vec![
            link("top", "/top", "Top", 10.0),
            ElementNode::new("iframe")
                .with_bounding_box(100.0, 200.0, 300.0, 200.0)
                .with_frame(child),
        ]))
        .with_viewport(800.0, 600.0);
        let (mut page, pending) = Page::from_fixture(FrameId::TOP, &fixture).unwrap();
        let (iframe, _) = pending[0].clone();
        page.set_content_frame(iframe, FrameId(1)).unwrap();

        let mut agent = FrameAgent::new(FrameId::TOP, &HintsOptions::default());
        agent.attach(&mut page);
        let clock = ManualClock::new(Instant::now());
        let out = find(&mut agent, &mut page, &clock, SessionToken(3));

        assert_eq!(out.len(), 2);
        assert!(matches!(
            &out[0],
            FrameOutput::ToController(FromFrame::ReportVisibleElements { num_frames: 1, .. })
        ));
        match &out[1] {
            FrameOutput::ToFrame {
                frame,
                message: ToFrame::FindElements { token, viewports, .. },
            } => {
                assert_eq!(*frame, FrameId(1));
                assert_eq!(*token, SessionToken(3));
                assert_eq!(
                    viewports,
                    &vec![
                        BoundingBox::new(0.0, 0.0, 800.0, 600.0),
                        BoundingBox::new(100.0, 200.0, 300.0, 200.0),
                    ]
                );
            }
            other => panic!("unexpected output {:?}", other),
        }
    }

    #[test]
    fn test_child_frame_confirms_before_reporting() {
        let fixture = PageFixture::new(
            ElementNode::new("body").with_children(vec![link("inner", "/inner", "Inner", 10.0)]),
        )
        .with_viewport(300.0, 200.0);
        let (mut page, _) = Page::from_fixture(FrameId(1), &fixture).unwrap();
        let mut agent = FrameAgent::new(FrameId(1), &HintsOptions::default());
        agent.attach(&mut page);
        let clock = ManualClock::new(Instant::now());

        let message = ToFrame::FindElements {
            token: SessionToken(3),
            types: ElementTypes::Default,
            viewports: vec![
                BoundingBox::new(0.0, 0.0, 800.0, 600.0),
                BoundingBox::new(100.0, 200.0, 300.0, 200.0),
            ],
        };
        let out = agent.handle(&mut page, message, &clock).unwrap();
        assert_eq!(
            out,
            vec![FrameOutput::ToController(FromFrame::ReportVisibleFrame {
                token: SessionToken(3),
                frame: FrameId(1),
            })]
        );

        let found = elements(&agent.pump(&mut page, &clock));
        assert_eq!(found.len(), 1);
        // Offset into the top frame's coordinates.
        assert_eq!(found[0].measurements.x, 110.0);
        assert_eq!(found[0].frame.id, FrameId(1));
    }

    #[test]
    fn test_stale_tokens_are_ignored() {
        let (mut agent, mut page, clock) = setup(vec![link("home", "/", "Home", 10.0)]);
        find(&mut agent, &mut page, &clock, SessionToken(1));

        let stale = ToFrame::UpdateElements { token: SessionToken(2) };
        assert!(agent.handle(&mut page, stale, &clock).unwrap().is_empty());
        assert!(!agent.has_pending_requests());
        assert!(agent.pump(&mut page, &clock).is_empty());
    }

    #[test]
    fn test_update_after_remove_and_reinsert() {
        let (mut agent, mut page, clock) = setup(vec![link("home", "/", "Home", 10.0), link("b", "/b", "B", 40.0)]);
        let token = SessionToken(1);
        let before = elements(&find(&mut agent, &mut page, &clock, token));

        let home = page.get_element_by_id("home").unwrap();
        let body = page.body();
        page.dom_mut().remove(home).unwrap();
        agent.handle(&mut page, ToFrame::UpdateElements { token }, &clock).unwrap();
        let out = agent.pump(&mut page, &clock);
        let updates = match reports(&out)[..] {
            [FromFrame::ReportUpdatedElements { updates, .. }] => updates.clone(),
            _ => panic!("expected an update report"),
        };
        assert_eq!(updates.len(), 2);
        assert_eq!(updates[0].measurements, None);

        page.dom_mut().append_child(body, home).unwrap();
        agent.handle(&mut page, ToFrame::UpdateElements { token }, &clock).unwrap();
        let out = agent.pump(&mut page, &clock);
        let updates = match reports(&out)[..] {
            [FromFrame::ReportUpdatedElements { updates, .. }] => updates.clone(),
            _ => panic!("expected an update report"),
        };
        assert_eq!(updates[0].index, 0);
        assert_eq!(updates[0].measurements, Some(before[0].measurements));
        assert_eq!(agent.index().index_of(home), Some(0));
    }

    #[test]
    fn test_deadline_falls_back_to_raw_text() {
        let (mut agent, mut page, _) = setup(vec![link("home", "/", "  Sign\n  in ", 10.0)]);
        agent.catalog.flush_now(&mut page);
        agent.viewports = vec![page.viewport()];

        let found = agent.collect_elements(&page, ElementTypes::Default, &Unbounded);
        assert_eq!(found[0].text, "Sign in");
        let found = agent.collect_elements(&page, ElementTypes::Default, &StepBudget::new(0));
        assert_eq!(found[0].text, "  Sign\n  in ");
        // Same element, same index.
        assert_eq!(found[0].frame.index, 0);
    }

    #[test]
    fn test_text_rects() {
        let (mut agent, mut page, clock) = setup(vec![link("home", "/", "Home page", 10.0), link("b", "/b", "Blog", 40.0)]);
        let token = SessionToken(1);
        find(&mut agent, &mut page, &clock, token);

        let message = ToFrame::GetTextRects {
            token,
            indexes: vec![0, 1],
            words: vec!["home".to_string()],
        };
        agent.handle(&mut page, message, &clock).unwrap();
        let out = agent.pump(&mut page, &clock);
        match reports(&out)[..] {
            [FromFrame::ReportTextRects { rects, .. }] => {
                assert_eq!(rects.len(), 1);
                assert_eq!(rects[0].y, 12.0);
            }
            _ => panic!("expected text rects"),
        }
    }

    #[test]
    fn test_activation() {
        let (mut agent, mut page, clock) = setup(vec![link("home", "/", "Home", 10.0)]);
        let token = SessionToken(1);
        find(&mut agent, &mut page, &clock, token);

        let click = ToFrame::ActivateElement {
            token,
            index: 0,
            action: FrameAction::Click,
        };
        agent.handle(&mut page, click, &clock).unwrap();
        assert_eq!(page.activations().len(), 1);

        let missing = ToFrame::ActivateElement {
            token,
            index: 7,
            action: FrameAction::Focus,
        };
        assert!(matches!(
            agent.handle(&mut page, missing, &clock),
            Err(HintsError::ActivationFailed { index: 7, .. })
        ));
    }

    #[test]
    fn test_unresponsive_page_stays_inactive() {
        let fixture = PageFixture::new(ElementNode::new("body")).unresponsive();
        let (mut page, _) = Page::from_fixture(FrameId(2), &fixture).unwrap();
        let mut agent = FrameAgent::new(FrameId(2), &HintsOptions::default());
        assert!(!agent.attach(&mut page));

        let clock = ManualClock::new(Instant::now());
        let message = ToFrame::StartFindElements {
            token: SessionToken(1),
            types: ElementTypes::Default,
        };
        assert!(agent.handle(&mut page, message, &clock).unwrap().is_empty());
        assert!(agent.pump(&mut page, &clock).is_empty());
    }

    #[test]
    fn test_leave_resets() {
        let (mut agent, mut page, clock) = setup(vec![link("home", "/", "Home", 10.0)]);
        find(&mut agent, &mut page, &clock, SessionToken(1));
        let out = agent.leave();
        assert_eq!(out, FrameOutput::ToController(FromFrame::PageLeave { frame: FrameId::TOP }));
        assert!(agent.index().is_empty());
        assert!(agent.catalog().is_empty());
        assert!(!agent.is_active());
    }

    #[test]
    fn test_label_text_falls_back_to_attributes() {
        let mut dom = DomTree::new();
        let input = dom.create_element("input");
        dom.append_child(dom.document(), input).unwrap();
        dom.set_attribute(input, "placeholder", " Search   docs ").unwrap();
        assert_eq!(label_text(&dom, input), "Search docs");
    }

    #[test]
    fn test_resolve_url() {
        assert_eq!(resolve_url("https://a.test/x/y", "../z"), "https://a.test/z");
        assert_eq!(resolve_url("https://a.test/", "#top"), "#top");
        assert_eq!(resolve_url("", "/a"), "/a");
        assert_eq!(resolve_url("https://a.test/", "https://b.test/"), "https://b.test/");
        assert_eq!(resolve_url("https://a.test/docs", "/docs#install"), "#install");
        assert_eq!(resolve_url("https://a.test/docs#top", "https://a.test/docs#x"), "#x");
        assert_eq!(resolve_url("https://a.test/docs", "/blog#x"), "https://a.test/blog#x");
    }
}
