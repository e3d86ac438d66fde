use crate::dom::page::FrameId;
use crate::error::Result;
use crate::frames::messages::{ElementUpdate, FromFrame, HintView, RendererMessage, SessionToken, ToFrame};
use crate::frames::pending::PendingElements;
use crate::hints::assign::{AssignOptions, ElementWithHint, FrameRef, assign_hints};
use crate::hints::matching::{HintMatch, filter_words, match_hint_chars, single_hint};
use crate::mode::keyboard::{HintsAction, KeyPress, action_for};
use crate::mode::policy::{ActivationPlan, AfterActivation, HintsMode};
use crate::mode::state::{Collecting, Hinting, HintsState, UpdatePoll};
use crate::options::HintsOptions;
use indexmap::{IndexMap, IndexSet};
use std::time::{Duration, Instant};

/// Something the controller wants done by its environment
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    ToFrame { frame: FrameId, message: ToFrame },
    ToRenderer(RendererMessage),
    OpenTab { url: String, foreground: bool },
    /// Timing of one phase, for diagnostics
    Trace { label: String, duration: Duration },
}

/// Hints-mode state machine of one tab.
///
/// Every input takes the current time and returns the effects to carry out;
/// timers are polled through [`HintsController::tick`], with
/// [`HintsController::next_deadline`] telling when that is next needed.
#[derive(Debug)]
pub struct HintsController {
    options: HintsOptions,
    alphabet: Vec<char>,
    state: HintsState,
    unrender_at: Option<Instant>,
}

impl HintsController {
    pub fn new(options: HintsOptions) -> Result<Self> {
        options.validate()?;
        Ok(Self {
            alphabet: options.alphabet(),
            options,
            state: HintsState::Idle,
            unrender_at: None,
        })
    }

    pub fn state(&self) -> &HintsState {
        &self.state
    }

    pub fn options(&self) -> &HintsOptions {
        &self.options
    }

    /// Enter hints mode, or restart it in another mode
    pub fn enter(&mut self, mode: HintsMode, now: Instant) -> Vec<Effect> {
        self.start_collecting(mode, String::new(), now)
    }

    fn start_collecting(&mut self, mode: HintsMode, entered_text: String, now: Instant) -> Vec<Effect> {
        let token = SessionToken::random();
        log::debug!(
            "Hints mode {}: {} -> collecting (session {})",
            mode,
            self.state.name(),
            token
        );
        self.unrender_at = None;
        self.state = HintsState::Collecting(Collecting {
            mode,
            token,
            pending: PendingElements::new(now, self.options.timing.frame_timeout()),
            entered_text,
        });
        vec![Effect::ToFrame {
            frame: FrameId::TOP,
            message: ToFrame::StartFindElements {
                token,
                types: mode.element_types(),
            },
        }]
    }

    /// Handle a message from one of the tab's frames
    pub fn on_frame_message(&mut self, message: FromFrame, now: Instant) -> Vec<Effect> {
        if let FromFrame::PageLeave { frame } = message {
            return self.on_page_leave(frame, now);
        }
        if message.token() != self.state.token() {
            log::trace!("Dropping stale frame message {:?}", message.token());
            return Vec::new();
        }

        match message {
            FromFrame::ReportVisibleFrame { .. } => {
                if let HintsState::Collecting(collecting) = &mut self.state {
                    collecting.pending.frame_confirmed();
                }
                Vec::new()
            }
            FromFrame::ReportVisibleElements {
                frame,
                elements,
                num_frames,
                duration,
                ..
            } => {
                let HintsState::Collecting(collecting) = &mut self.state else {
                    return Vec::new();
                };
                collecting
                    .pending
                    .frame_reported(frame, elements, num_frames, duration, now);
                if collecting.pending.is_complete() {
                    self.start_hinting(now)
                } else {
                    Vec::new()
                }
            }
            FromFrame::ReportUpdatedElements { frame, updates, .. } => self.apply_updates(frame, updates, now),
            FromFrame::ReportTextRects { frame, rects, .. } => match self.state {
                HintsState::Hinting(_) => vec![Effect::ToRenderer(RendererMessage::RenderTextRects { frame, rects })],
                _ => Vec::new(),
            },
            FromFrame::PageLeave { .. } => Vec::new(),
        }
    }

    fn start_hinting(&mut self, now: Instant) -> Vec<Effect> {
        let HintsState::Collecting(collecting) = std::mem::take(&mut self.state) else {
            return Vec::new();
        };
        let Collecting {
            mode,
            token,
            pending,
            entered_text,
        } = collecting;

        let mut effects = vec![Effect::Trace {
            label: "collect".to_string(),
            duration: now.saturating_duration_since(pending.started()),
        }];
        let mut frames = vec![FrameId::TOP];
        for &(frame, duration) in &pending.durations {
            effects.push(Effect::Trace {
                label: format!("discover {}", frame),
                duration,
            });
            if !frames.contains(&frame) {
                frames.push(frame);
            }
        }

        let elements: Vec<ElementWithHint> = pending
            .elements
            .into_iter()
            .enumerate()
            .map(|(index, element)| ElementWithHint::new(index, element))
            .collect();
        let timing = &self.options.timing;
        let mut hinting = Hinting {
            mode,
            token,
            elements,
            frames,
            entered_chars: String::new(),
            entered_text,
            peeking: false,
            gone: IndexSet::new(),
            highlighted: IndexMap::new(),
            rotation: 0,
            update: UpdatePoll::new(now, timing.update_interval(), timing.min_update_interval()),
        };
        reassign(&self.alphabet, &mut hinting);
        log::debug!(
            "Hints mode {}: collecting -> hinting ({} elements from {} frames)",
            mode,
            hinting.elements.len(),
            hinting.frames.len()
        );

        effects.push(Effect::ToRenderer(RendererMessage::Render {
            hints: views(&hinting),
        }));
        if !hinting.entered_text.is_empty() {
            effects.extend(text_rect_requests(&hinting));
        }
        self.state = HintsState::Hinting(hinting);
        effects
    }

    fn apply_updates(&mut self, frame: FrameId, updates: Vec<ElementUpdate>, now: Instant) -> Vec<Effect> {
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        let mut changed = Vec::new();
        let mut text_changed = false;
        for update in updates {
            let key = FrameRef {
                id: frame,
                index: update.index,
            };
            let Some(position) = hinting.elements.iter().position(|e| e.element.frame == key) else {
                continue;
            };
            let element = &mut hinting.elements[position];
            match update.measurements {
                None => {
                    if hinting.gone.insert(element.index) {
                        changed.push(position);
                    }
                }
                Some(measurements) => {
                    let came_back = hinting.gone.shift_remove(&element.index);
                    let moved = element.element.measurements != measurements;
                    element.element.measurements = measurements;
                    if element.element.text != update.text {
                        element.element.text = update.text;
                        text_changed = true;
                    }
                    if came_back || moved {
                        changed.push(position);
                    }
                }
            }
        }
        hinting.update.frame_done(now);

        if text_changed && !filter_words(&hinting.entered_text).is_empty() {
            reassign(&self.alphabet, hinting);
            let mut effects = vec![update_all(hinting)];
            effects.extend(text_rect_requests(hinting));
            return effects;
        }
        if changed.is_empty() {
            return Vec::new();
        }
        let all = views(hinting);
        vec![Effect::ToRenderer(RendererMessage::UpdateHints {
            updates: changed.into_iter().map(|position| all[position].clone()).collect(),
        })]
    }

    fn on_page_leave(&mut self, frame: FrameId, now: Instant) -> Vec<Effect> {
        if frame.is_top() {
            log::debug!("Top frame is unloading");
            return self.exit(now);
        }
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        hinting.frames.retain(|&f| f != frame);
        let mut changed = Vec::new();
        for (position, element) in hinting.elements.iter().enumerate() {
            if element.element.frame.id == frame && hinting.gone.insert(element.index) {
                changed.push(position);
            }
        }
        if changed.is_empty() {
            return Vec::new();
        }
        let all = views(hinting);
        vec![Effect::ToRenderer(RendererMessage::UpdateHints {
            updates: changed.into_iter().map(|position| all[position].clone()).collect(),
        })]
    }

    /// Handle a normalized keypress
    pub fn on_key(&mut self, press: &KeyPress, now: Instant) -> Vec<Effect> {
        let action = action_for(&self.options.key_bindings, press);
        let hinting = matches!(self.state, HintsState::Hinting(_));
        let collecting = matches!(self.state, HintsState::Collecting(_));
        match action {
            Some(action) if hinting => return self.on_action(action, now),
            Some(HintsAction::ExitHintsMode) if collecting => return self.exit(now),
            _ if !hinting => return Vec::new(),
            _ => {}
        }
        let Some(c) = press.printable() else {
            return Vec::new();
        };
        if self.alphabet.contains(&c) {
            self.enter_hint_char(c, now)
        } else {
            self.enter_text_char(c, now)
        }
    }

    fn on_action(&mut self, action: HintsAction, now: Instant) -> Vec<Effect> {
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        match action {
            HintsAction::ExitHintsMode => self.exit(now),
            HintsAction::ActivateHint { alt } => match best_match(hinting) {
                Some(hint) => self.activate_hint(&hint, alt, now),
                None => Vec::new(),
            },
            HintsAction::Backspace => {
                if hinting.entered_chars.pop().is_some() {
                    vec![update_all(hinting)]
                } else if hinting.entered_text.pop().is_some() {
                    self.refilter(now, false)
                } else {
                    Vec::new()
                }
            }
            HintsAction::RotateHints { forward } => {
                let n = hinting.elements.len().max(1);
                hinting.rotation = if forward {
                    (hinting.rotation + 1) % n
                } else {
                    (hinting.rotation + n - 1) % n
                };
                vec![update_all(hinting)]
            }
            HintsAction::RefreshHints => {
                let mode = hinting.mode;
                let entered_text = std::mem::take(&mut hinting.entered_text);
                self.start_collecting(mode, entered_text, now)
            }
            HintsAction::TogglePeek => {
                hinting.peeking = !hinting.peeking;
                vec![Effect::ToRenderer(RendererMessage::Peek {
                    peeking: hinting.peeking,
                })]
            }
        }
    }

    fn enter_hint_char(&mut self, c: char, now: Instant) -> Vec<Effect> {
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        let mut entered = hinting.entered_chars.clone();
        entered.push(c);
        let present = present_elements(hinting);
        match match_hint_chars(&present, &entered) {
            HintMatch::None => {
                log::trace!("No hint starts with {:?}", entered);
                Vec::new()
            }
            HintMatch::Partial => {
                hinting.entered_chars = entered;
                vec![update_all(hinting)]
            }
            HintMatch::Exact(hint) => {
                hinting.entered_chars = entered;
                self.activate_hint(&hint, false, now)
            }
        }
    }

    fn enter_text_char(&mut self, c: char, now: Instant) -> Vec<Effect> {
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        if !hinting.entered_chars.is_empty() {
            // Hint entry has begun; text filtering is locked out.
            return Vec::new();
        }
        hinting.entered_text.push(c);
        self.refilter(now, true)
    }

    /// Re-assign hints for the current filter text
    fn refilter(&mut self, now: Instant, auto_activate: bool) -> Vec<Effect> {
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        reassign(&self.alphabet, hinting);
        let mut effects = vec![update_all(hinting)];
        effects.extend(text_rect_requests(hinting));

        let filtering = !filter_words(&hinting.entered_text).is_empty();
        if auto_activate && filtering && self.options.auto_activate {
            let present = present_elements(hinting);
            if let Some(hint) = single_hint(&present).map(str::to_string) {
                log::debug!("Filter left a single hint {:?}", hint);
                effects.extend(self.activate_hint(&hint, false, now));
            }
        }
        effects
    }

    fn activate_hint(&mut self, hint: &str, alt: bool, now: Instant) -> Vec<Effect> {
        let HintsState::Hinting(hinting) = &mut self.state else {
            return Vec::new();
        };
        let Some(position) = (0..hinting.elements.len())
            .find(|&position| hinting.elements[position].hint == hint && !hinting.elements[position].hidden)
        else {
            return Vec::new();
        };
        let chosen = hinting.elements[position].clone();
        let element = &chosen.element;
        let mode = hinting.mode;
        let token = hinting.token;

        let mut effects = Vec::new();
        match mode.plan(element.element_type, element.url.as_deref(), alt) {
            ActivationPlan::Frame(action) => {
                log::debug!("Activating {:?} {:?} in {}", hint, action, element.frame.id);
                effects.push(Effect::ToFrame {
                    frame: element.frame.id,
                    message: ToFrame::ActivateElement {
                        token,
                        index: element.frame.index,
                        action,
                    },
                });
            }
            ActivationPlan::OpenTab { url, foreground } => {
                log::debug!("Opening {} from hint {:?}", url, hint);
                effects.push(Effect::OpenTab { url, foreground });
            }
        }

        let delay = self.options.timing.unrender_delay();
        hinting.highlighted.insert(chosen.index, now + delay);
        let all = views(hinting);
        effects.push(Effect::ToRenderer(RendererMessage::UpdateHints {
            updates: vec![all[position].clone()],
        }));

        match mode.after_activation() {
            AfterActivation::Exit => {
                let frames = hinting.frames.clone();
                log::debug!("Hints mode {}: hinting -> idle", mode);
                self.state = HintsState::Idle;
                self.unrender_at = Some(now + delay);
                effects.extend(clear_sessions(&frames));
            }
            AfterActivation::Recollect => {
                effects.extend(self.start_collecting(mode, String::new(), now));
            }
            AfterActivation::KeepHinting => {
                let had_text = !hinting.entered_text.is_empty();
                hinting.entered_chars.clear();
                hinting.entered_text.clear();
                reassign(&self.alphabet, hinting);
                effects.push(update_all(hinting));
                if had_text {
                    effects.extend(text_rect_requests(hinting));
                }
            }
        }
        effects
    }

    /// Leave hints mode right away
    pub fn exit(&mut self, _now: Instant) -> Vec<Effect> {
        let frames = match &self.state {
            HintsState::Idle => {
                if self.unrender_at.take().is_some() {
                    return vec![Effect::ToRenderer(RendererMessage::Unrender)];
                }
                return Vec::new();
            }
            HintsState::Collecting(_) => vec![FrameId::TOP],
            HintsState::Hinting(hinting) => hinting.frames.clone(),
        };
        log::debug!("Hints mode: {} -> idle", self.state.name());
        self.state = HintsState::Idle;
        self.unrender_at = None;
        let mut effects = vec![Effect::ToRenderer(RendererMessage::Unrender)];
        effects.extend(clear_sessions(&frames));
        effects
    }

    /// The window lost focus: stop peeking, keep hinting
    pub fn blur(&mut self) -> Vec<Effect> {
        match &mut self.state {
            HintsState::Hinting(hinting) if hinting.peeking => {
                hinting.peeking = false;
                vec![Effect::ToRenderer(RendererMessage::Peek { peeking: false })]
            }
            _ => Vec::new(),
        }
    }

    /// The tab is gone; nothing is left to notify
    pub fn close(&mut self) {
        self.state = HintsState::Idle;
        self.unrender_at = None;
    }

    /// Fire whatever timers are due
    pub fn tick(&mut self, now: Instant) -> Vec<Effect> {
        let mut effects = Vec::new();
        if self.unrender_at.is_some_and(|at| now >= at) {
            self.unrender_at = None;
            effects.push(Effect::ToRenderer(RendererMessage::Unrender));
        }

        let timed_out = match &self.state {
            HintsState::Collecting(collecting) => collecting.pending.timed_out(now),
            _ => false,
        };
        if timed_out {
            if let HintsState::Collecting(collecting) = &self.state {
                log::debug!(
                    "Frame timeout: proceeding without {} silent frames",
                    collecting.pending.pending_frames.answering
                );
            }
            effects.extend(self.start_hinting(now));
            return effects;
        }

        if let HintsState::Hinting(hinting) = &mut self.state {
            let expired: Vec<usize> = hinting
                .highlighted
                .iter()
                .filter(|(_, until)| now >= **until)
                .map(|(index, _)| *index)
                .collect();
            if !expired.is_empty() {
                for index in &expired {
                    hinting.highlighted.shift_remove(index);
                }
                let all = views(hinting);
                effects.push(Effect::ToRenderer(RendererMessage::UpdateHints {
                    updates: expired
                        .iter()
                        .filter_map(|&index| hinting.position_of(index))
                        .map(|position| all[position].clone())
                        .collect(),
                }));
            }

            if hinting.update.is_due(now) {
                hinting.update.start(now, hinting.frames.len());
                let token = hinting.token;
                effects.extend(hinting.frames.iter().map(|&frame| Effect::ToFrame {
                    frame,
                    message: ToFrame::UpdateElements { token },
                }));
            }
        }
        effects
    }

    /// Earliest instant at which [`HintsController::tick`] has work to do
    pub fn next_deadline(&self) -> Option<Instant> {
        let state = match &self.state {
            HintsState::Idle => None,
            HintsState::Collecting(collecting) => collecting.pending.deadline(),
            HintsState::Hinting(hinting) => {
                let highlight = hinting.highlighted.values().min().copied();
                [hinting.update.deadline(), highlight].into_iter().flatten().min()
            }
        };
        [state, self.unrender_at].into_iter().flatten().min()
    }
}

fn reassign(alphabet: &[char], hinting: &mut Hinting) {
    let words = filter_words(&hinting.entered_text);
    let options = AssignOptions {
        alphabet,
        combine: hinting.mode.combine_policy(),
        filter: (!words.is_empty()).then_some(words.as_slice()),
    };
    assign_hints(&mut hinting.elements, &options);
}

/// Elements still on the page
fn present_elements(hinting: &Hinting) -> Vec<ElementWithHint> {
    hinting
        .elements
        .iter()
        .filter(|element| !hinting.gone.contains(&element.index))
        .cloned()
        .collect()
}

/// Hint Enter would activate: the shortest shown hint
fn best_match(hinting: &Hinting) -> Option<String> {
    hinting
        .shown()
        .into_iter()
        .map(|element| element.hint)
        .min_by(|a, b| a.len().cmp(&b.len()).then_with(|| a.cmp(b)))
}

fn views(hinting: &Hinting) -> Vec<HintView> {
    let elements = &hinting.elements;
    let n = elements.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| elements[b].weight().total_cmp(&elements[a].weight()).then(a.cmp(&b)));
    let mut z = vec![0.0; n];
    for (rank, &position) in order.iter().enumerate() {
        z[position] = ((n - 1 - rank + hinting.rotation) % n) as f64;
    }

    let matched = hinting.entered_chars.chars().count();
    elements
        .iter()
        .enumerate()
        .map(|(position, element)| {
            let shown = hinting.is_shown(position);
            let measurements = &element.element.measurements;
            HintView {
                index: element.index,
                hint: element.hint.clone(),
                matched_chars: if shown { matched } else { 0 },
                x: measurements.x,
                y: measurements.y,
                align: measurements.align,
                max_x: measurements.max_x,
                z: z[position],
                hidden: !shown,
                highlighted: hinting.highlighted.contains_key(&element.index),
            }
        })
        .collect()
}

fn update_all(hinting: &Hinting) -> Effect {
    Effect::ToRenderer(RendererMessage::UpdateHints {
        updates: views(hinting),
    })
}

/// Ask each frame for the boxes of text matching the filter. Without a filter
/// the renderer is told to drop the boxes it shows.
fn text_rect_requests(hinting: &Hinting) -> Vec<Effect> {
    let words = filter_words(&hinting.entered_text);
    hinting
        .frames
        .iter()
        .map(|&frame| {
            if words.is_empty() {
                return Effect::ToRenderer(RendererMessage::RenderTextRects {
                    frame,
                    rects: Vec::new(),
                });
            }
            let indexes = hinting
                .elements
                .iter()
                .filter(|element| element.element.frame.id == frame && !element.hidden)
                .map(|element| element.element.frame.index)
                .collect();
            Effect::ToFrame {
                frame,
                message: ToFrame::GetTextRects {
                    token: hinting.token,
                    indexes,
                    words: words.clone(),
                },
            }
        })
        .collect()
}

fn clear_sessions(frames: &[FrameId]) -> Vec<Effect> {
    frames
        .iter()
        .map(|&frame| Effect::ToFrame {
            frame,
            message: ToFrame::ClearSession,
        })
        .collect()
}
