use crate::browser::renderer::{HintRenderer, RecordingRenderer};
use crate::catalog::ManualClock;
use crate::dom::page::{FrameId, Page, PageFixture};
use crate::error::{HintsError, Result};
use crate::frames::agent::{FrameAgent, FrameOutput};
use crate::frames::messages::{FromFrame, ToFrame};
use crate::mode::controller::{Effect, HintsController};
use crate::mode::keyboard::KeyPress;
use crate::mode::policy::HintsMode;
use crate::options::HintsOptions;
use indexmap::IndexMap;
use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

/// Upper bound on event-loop rounds per call, against frames that keep
/// producing work forever
const MAX_ROUNDS: usize = 1_000;

/// Tab id within a [`BrowserSession`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TabId(pub u32);

impl fmt::Display for TabId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tab {}", self.0)
    }
}

/// A tab the controller asked the browser to open
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenedTab {
    pub url: String,
    pub foreground: bool,
}

/// One browsing context of a tab
#[derive(Debug)]
struct FrameContext {
    page: Page,
    agent: FrameAgent,
    parent: Option<FrameId>,
}

/// A message in flight between the tab's parts
#[derive(Debug)]
enum Envelope {
    ToFrame { frame: FrameId, message: ToFrame },
    ToController(FromFrame),
}

/// One tab: its frames, the hints controller and the renderer.
///
/// Frames and controller only talk through a FIFO message bus, the way
/// `postMessage` connects them in a browser. Every input runs the bus and the
/// frames' event loops until nothing is left to do.
#[derive(Debug)]
pub struct TabSession<R: HintRenderer = RecordingRenderer> {
    id: TabId,
    options: HintsOptions,
    controller: HintsController,
    frames: IndexMap<FrameId, FrameContext>,
    bus: VecDeque<Envelope>,
    renderer: R,
    clock: ManualClock,
    next_frame: u32,
    opened_tabs: Vec<OpenedTab>,
    traces: Vec<(String, Duration)>,
}

impl TabSession<RecordingRenderer> {
    /// Open a tab showing `fixture`, painting into a [`RecordingRenderer`]
    pub fn open(id: TabId, fixture: &PageFixture, options: &HintsOptions, now: Instant) -> Result<Self> {
        Self::with_renderer(id, fixture, options, RecordingRenderer::new(), now)
    }
}

impl<R: HintRenderer> TabSession<R> {
    pub fn with_renderer(
        id: TabId,
        fixture: &PageFixture,
        options: &HintsOptions,
        renderer: R,
        now: Instant,
    ) -> Result<Self> {
        let mut tab = Self {
            id,
            options: options.clone(),
            controller: HintsController::new(options.clone())?,
            frames: IndexMap::new(),
            bus: VecDeque::new(),
            renderer,
            clock: ManualClock::new(now),
            next_frame: 1,
            opened_tabs: Vec::new(),
            traces: Vec::new(),
        };
        tab.load_frame(FrameId::TOP, None, fixture)?;
        log::debug!("Opened {} with {} frames", id, tab.frames.len());
        Ok(tab)
    }

    /// Build a frame and, recursively, the frames of its iframes
    fn load_frame(&mut self, frame: FrameId, parent: Option<FrameId>, fixture: &PageFixture) -> Result<()> {
        let (mut page, children) = Page::from_fixture(frame, fixture)?;
        for (iframe, child_fixture) in &children {
            let child = FrameId(self.next_frame);
            self.next_frame += 1;
            page.set_content_frame(*iframe, child)?;
            self.load_frame(child, Some(frame), child_fixture)?;
        }
        let mut agent = FrameAgent::new(frame, &self.options);
        agent.attach(&mut page);
        self.frames.insert(frame, FrameContext { page, agent, parent });
        Ok(())
    }

    pub fn id(&self) -> TabId {
        self.id
    }

    pub fn controller(&self) -> &HintsController {
        &self.controller
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Frame ids, parents before children
    pub fn frame_ids(&self) -> Vec<FrameId> {
        let mut ids: Vec<FrameId> = self.frames.keys().copied().collect();
        ids.sort();
        ids
    }

    pub fn parent_of(&self, frame: FrameId) -> Option<FrameId> {
        self.frames.get(&frame).and_then(|context| context.parent)
    }

    pub fn page(&self, frame: FrameId) -> Result<&Page> {
        self.frames
            .get(&frame)
            .map(|context| &context.page)
            .ok_or(HintsError::FrameNotFound(frame.0))
    }

    /// The frame's page, for changing its document between inputs
    pub fn page_mut(&mut self, frame: FrameId) -> Result<&mut Page> {
        self.frames
            .get_mut(&frame)
            .map(|context| &mut context.page)
            .ok_or(HintsError::FrameNotFound(frame.0))
    }

    pub fn agent(&self, frame: FrameId) -> Result<&FrameAgent> {
        self.frames
            .get(&frame)
            .map(|context| &context.agent)
            .ok_or(HintsError::FrameNotFound(frame.0))
    }

    /// Tabs the controller asked to open, oldest first
    pub fn opened_tabs(&self) -> &[OpenedTab] {
        &self.opened_tabs
    }

    /// Phase timings reported by the controller
    pub fn traces(&self) -> &[(String, Duration)] {
        &self.traces
    }

    /// Enter hints mode and run discovery as far as it goes
    pub fn enter_hints(&mut self, mode: HintsMode, now: Instant) -> Result<()> {
        self.clock.set(now);
        let effects = self.controller.enter(mode, now);
        self.apply(effects);
        self.run_until_idle(now)
    }

    pub fn press(&mut self, press: &KeyPress, now: Instant) -> Result<()> {
        self.clock.set(now);
        let effects = self.controller.on_key(press, now);
        self.apply(effects);
        self.run_until_idle(now)
    }

    /// Type `text` one character at a time
    pub fn type_keys(&mut self, text: &str, now: Instant) -> Result<()> {
        for press in KeyPress::sequence(text) {
            self.press(&press, now)?;
        }
        Ok(())
    }

    /// Fire the controller's timers and let frames catch up with page changes
    pub fn tick(&mut self, now: Instant) -> Result<()> {
        self.clock.set(now);
        let effects = self.controller.tick(now);
        self.apply(effects);
        self.run_until_idle(now)
    }

    /// When [`TabSession::tick`] next has something to do
    pub fn next_deadline(&self) -> Option<Instant> {
        self.controller.next_deadline()
    }

    /// The window lost focus
    pub fn blur(&mut self) {
        let effects = self.controller.blur();
        self.apply(effects);
    }

    /// Load a new document into `frame`. Its former child frames are
    /// discarded.
    pub fn navigate(&mut self, frame: FrameId, fixture: &PageFixture, now: Instant) -> Result<()> {
        self.clock.set(now);
        let context = self
            .frames
            .get_mut(&frame)
            .ok_or(HintsError::FrameNotFound(frame.0))?;
        let parent = context.parent;
        match context.agent.leave() {
            FrameOutput::ToController(message) => self.bus.push_back(Envelope::ToController(message)),
            FrameOutput::ToFrame { frame, message } => self.bus.push_back(Envelope::ToFrame { frame, message }),
        }
        self.remove_frame(frame);
        log::debug!("{} of {} navigating to {:?}", frame, self.id, fixture.url);
        self.load_frame(frame, parent, fixture)?;
        self.run_until_idle(now)
    }

    fn remove_frame(&mut self, frame: FrameId) {
        let children: Vec<FrameId> = self
            .frames
            .iter()
            .filter(|(_, context)| context.parent == Some(frame))
            .map(|(id, _)| *id)
            .collect();
        for child in children {
            self.remove_frame(child);
        }
        self.frames.shift_remove(&frame);
    }

    /// Forget all hints state; the tab is going away
    pub fn close(&mut self) {
        self.controller.close();
        self.bus.clear();
        for context in self.frames.values_mut() {
            context.agent.leave();
        }
    }

    fn apply(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ToFrame { frame, message } => self.bus.push_back(Envelope::ToFrame { frame, message }),
                Effect::ToRenderer(message) => self.renderer.render(&message),
                Effect::OpenTab { url, foreground } => {
                    log::debug!("{} opening {} ({})", self.id, url, if foreground { "foreground" } else { "background" });
                    self.opened_tabs.push(OpenedTab { url, foreground });
                }
                Effect::Trace { label, duration } => {
                    log::debug!("{} {}: {:?}", self.id, label, duration);
                    self.traces.push((label, duration));
                }
            }
        }
    }

    fn route(&mut self, outputs: Vec<FrameOutput>) {
        for output in outputs {
            match output {
                FrameOutput::ToController(message) => self.bus.push_back(Envelope::ToController(message)),
                FrameOutput::ToFrame { frame, message } => self.bus.push_back(Envelope::ToFrame { frame, message }),
            }
        }
    }

    /// Deliver queued messages and run frame event loops until the tab is
    /// quiet
    pub fn run_until_idle(&mut self, now: Instant) -> Result<()> {
        for _ in 0..MAX_ROUNDS {
            while let Some(envelope) = self.bus.pop_front() {
                self.deliver(envelope, now)?;
            }

            let mut outputs = Vec::new();
            for context in self.frames.values_mut() {
                outputs.extend(context.agent.pump(&mut context.page, &self.clock));
            }
            if outputs.is_empty() && self.bus.is_empty() {
                return Ok(());
            }
            self.route(outputs);
        }
        log::warn!("{} still busy after {} rounds", self.id, MAX_ROUNDS);
        Ok(())
    }

    fn deliver(&mut self, envelope: Envelope, now: Instant) -> Result<()> {
        match envelope {
            Envelope::ToFrame { frame, message } => {
                let Some(context) = self.frames.get_mut(&frame) else {
                    log::debug!("Dropping message to vanished {}", frame);
                    return Ok(());
                };
                match context.agent.handle(&mut context.page, message, &self.clock) {
                    Ok(outputs) => self.route(outputs),
                    // The element may have left the page since it was hinted.
                    Err(e @ HintsError::ActivationFailed { .. }) => log::debug!("{}: {}", frame, e),
                    Err(e) => return Err(e),
                }
            }
            Envelope::ToController(message) => {
                let effects = self.controller.on_frame_message(message, now);
                self.apply(effects);
            }
        }
        Ok(())
    }
}

/// All open tabs, each with its own hints state
#[derive(Debug)]
pub struct BrowserSession {
    options: HintsOptions,
    tabs: IndexMap<TabId, TabSession>,
    active: Option<TabId>,
    next_tab: u32,
}

impl BrowserSession {
    pub fn new(options: HintsOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            options,
            tabs: IndexMap::new(),
            active: None,
            next_tab: 1,
        })
    }

    pub fn options(&self) -> &HintsOptions {
        &self.options
    }

    /// Open a tab showing `fixture` and make it the active one
    pub fn open_tab(&mut self, fixture: &PageFixture, now: Instant) -> Result<TabId> {
        let id = TabId(self.next_tab);
        self.next_tab += 1;
        let tab = TabSession::open(id, fixture, &self.options, now)?;
        self.tabs.insert(id, tab);
        self.active = Some(id);
        Ok(id)
    }

    pub fn tab(&self, id: TabId) -> Result<&TabSession> {
        self.tabs.get(&id).ok_or(HintsError::TabNotFound(id.0))
    }

    pub fn tab_mut(&mut self, id: TabId) -> Result<&mut TabSession> {
        self.tabs.get_mut(&id).ok_or(HintsError::TabNotFound(id.0))
    }

    pub fn active_tab(&mut self) -> Result<&mut TabSession> {
        let id = self.active.ok_or(HintsError::TabNotFound(0))?;
        self.tab_mut(id)
    }

    pub fn activate_tab(&mut self, id: TabId) -> Result<()> {
        if !self.tabs.contains_key(&id) {
            return Err(HintsError::TabNotFound(id.0));
        }
        self.active = Some(id);
        Ok(())
    }

    pub fn tab_ids(&self) -> Vec<TabId> {
        self.tabs.keys().copied().collect()
    }

    /// Close a tab, dropping its hints state
    pub fn close_tab(&mut self, id: TabId) -> Result<()> {
        let mut tab = self.tabs.shift_remove(&id).ok_or(HintsError::TabNotFound(id.0))?;
        tab.close();
        if self.active == Some(id) {
            self.active = self.tabs.keys().last().copied();
        }
        log::debug!("Closed {}", id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dom::element::ElementNode;

    fn button(id: &str, y: f64, text: &str) -> ElementNode {
        ElementNode::new("button")
            .with_attribute("id", id)
            .with_bounding_box(20.0, y, 120.0, 24.0)
            .with_text(text)
    }

    fn fixture() -> PageFixture {
        PageFixture::new(
            ElementNode::new("body")
                .with_bounding_box(0.0, 0.0, 800.0, 600.0)
                .with_children(vec![button("save", 20.0, "Save"), button("load", 60.0, "Load")]),
        )
        .with_viewport(800.0, 600.0)
        .with_url("https://example.com/")
    }

    fn framed_fixture() -> PageFixture {
        let child = PageFixture::new(
            ElementNode::new("body")
                .with_bounding_box(0.0, 0.0, 300.0, 200.0)
                .with_children(vec![button("inner", 10.0, "Inner")]),
        )
        .with_viewport(300.0, 200.0);
        let iframe = ElementNode::new("iframe")
            .with_bounding_box(100.0, 200.0, 300.0, 200.0)
            .with_frame(child);
        let mut page = fixture();
        page.body.add_child(iframe);
        page
    }

    #[test]
    fn test_open_builds_frames() {
        let now = Instant::now();
        let tab = TabSession::open(TabId(1), &framed_fixture(), &HintsOptions::new(), now).unwrap();
        assert_eq!(tab.frame_ids(), vec![FrameId::TOP, FrameId(1)]);
        assert_eq!(tab.parent_of(FrameId(1)), Some(FrameId::TOP));
        assert!(tab.agent(FrameId(1)).unwrap().is_active());
        assert!(tab.page(FrameId(2)).is_err());
    }

    #[test]
    fn test_enter_hints_renders_all_frames() {
        let now = Instant::now();
        let options = HintsOptions::new().chars("ab");
        let mut tab = TabSession::open(TabId(1), &framed_fixture(), &options, now).unwrap();
        tab.enter_hints(HintsMode::Click, now).unwrap();
        assert_eq!(tab.controller().state().name(), "hinting");
        assert_eq!(tab.renderer().visible_hints().len(), 3);
        assert!(tab.traces().iter().any(|(label, _)| label == "collect"));
    }

    #[test]
    fn test_activation_reaches_page() {
        let now = Instant::now();
        let options = HintsOptions::new().chars("ab");
        let mut tab = TabSession::open(TabId(1), &fixture(), &options, now).unwrap();
        tab.enter_hints(HintsMode::Click, now).unwrap();
        tab.type_keys("b", now).unwrap();

        let page = tab.page(FrameId::TOP).unwrap();
        assert_eq!(page.activations().len(), 1);
        assert_eq!(Some(page.activations()[0].node), page.get_element_by_id("load"));
        assert_eq!(tab.controller().state().name(), "idle");
        assert!(tab.agent(FrameId::TOP).unwrap().token().is_none());
    }

    #[test]
    fn test_navigate_exits_hints() {
        let now = Instant::now();
        let mut tab = TabSession::open(TabId(1), &framed_fixture(), &HintsOptions::new(), now).unwrap();
        tab.enter_hints(HintsMode::Click, now).unwrap();
        tab.navigate(FrameId::TOP, &fixture(), now).unwrap();
        assert_eq!(tab.controller().state().name(), "idle");
        assert!(!tab.renderer().is_rendered());
        assert_eq!(tab.frame_ids(), vec![FrameId::TOP]);
    }

    #[test]
    fn test_browser_session_tabs() {
        let now = Instant::now();
        let mut browser = BrowserSession::new(HintsOptions::new()).unwrap();
        let first = browser.open_tab(&fixture(), now).unwrap();
        let second = browser.open_tab(&fixture(), now).unwrap();
        assert_eq!(browser.active_tab().unwrap().id(), second);

        browser.tab_mut(first).unwrap().enter_hints(HintsMode::Click, now).unwrap();
        assert_eq!(browser.tab(second).unwrap().controller().state().name(), "idle");

        browser.close_tab(second).unwrap();
        assert_eq!(browser.active_tab().unwrap().id(), first);
        assert!(browser.tab(second).is_err());
        assert!(browser.close_tab(second).is_err());
        assert_eq!(browser.tab_ids(), vec![first]);
    }
}
