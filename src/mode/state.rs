use crate::dom::page::FrameId;
use crate::frames::messages::SessionToken;
use crate::frames::pending::PendingElements;
use crate::hints::assign::ElementWithHint;
use crate::mode::policy::HintsMode;
use indexmap::{IndexMap, IndexSet};
use std::time::{Duration, Instant};

/// Hints mode of one tab
#[derive(Debug, Clone, Default)]
pub enum HintsState {
    #[default]
    Idle,
    Collecting(Collecting),
    Hinting(Hinting),
}

impl HintsState {
    pub fn name(&self) -> &'static str {
        match self {
            HintsState::Idle => "idle",
            HintsState::Collecting(_) => "collecting",
            HintsState::Hinting(_) => "hinting",
        }
    }

    pub fn token(&self) -> Option<SessionToken> {
        match self {
            HintsState::Idle => None,
            HintsState::Collecting(collecting) => Some(collecting.token),
            HintsState::Hinting(hinting) => Some(hinting.token),
        }
    }

    pub fn mode(&self) -> Option<HintsMode> {
        match self {
            HintsState::Idle => None,
            HintsState::Collecting(collecting) => Some(collecting.mode),
            HintsState::Hinting(hinting) => Some(hinting.mode),
        }
    }
}

/// Waiting for frames to report their elements
#[derive(Debug, Clone)]
pub struct Collecting {
    pub mode: HintsMode,
    pub token: SessionToken,
    pub pending: PendingElements,
    /// Filter text carried over from a refresh
    pub entered_text: String,
}

/// Hints are shown and keystrokes go to them
#[derive(Debug, Clone)]
pub struct Hinting {
    pub mode: HintsMode,
    pub token: SessionToken,
    pub elements: Vec<ElementWithHint>,
    /// Frames that reported, in report order
    pub frames: Vec<FrameId>,
    pub entered_chars: String,
    pub entered_text: String,
    pub peeking: bool,
    /// Elements that left the page or the screen since they were hinted
    pub gone: IndexSet<usize>,
    /// Recently activated hints and when their highlight ends
    pub highlighted: IndexMap<usize, Instant>,
    /// Offset applied to stacking order by hint rotation
    pub rotation: usize,
    pub update: UpdatePoll,
}

impl Hinting {
    /// Whether the element's hint is currently shown
    pub fn is_shown(&self, position: usize) -> bool {
        let element = &self.elements[position];
        !element.hidden
            && !self.gone.contains(&element.index)
            && !element.hint.is_empty()
            && element.hint.starts_with(self.entered_chars.as_str())
    }

    /// Elements that can still be chosen
    pub fn shown(&self) -> Vec<ElementWithHint> {
        (0..self.elements.len())
            .filter(|&position| self.is_shown(position))
            .map(|position| self.elements[position].clone())
            .collect()
    }

    pub fn position_of(&self, index: usize) -> Option<usize> {
        self.elements.iter().position(|element| element.index == index)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InFlight {
    started: Instant,
    remaining: usize,
}

/// Re-measurement schedule. One cycle runs at a time; the next one starts
/// `interval` after the previous one started, but never sooner than `min`
/// after it finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UpdatePoll {
    interval: Duration,
    min: Duration,
    next: Option<Instant>,
    in_flight: Option<InFlight>,
}

impl UpdatePoll {
    pub fn new(now: Instant, interval: Duration, min: Duration) -> Self {
        Self {
            interval,
            min,
            next: Some(now + interval),
            in_flight: None,
        }
    }

    /// Whether a new cycle should start. A cycle whose frames have been
    /// silent for a whole interval is abandoned.
    pub fn is_due(&self, now: Instant) -> bool {
        match self.in_flight {
            Some(cycle) => now.saturating_duration_since(cycle.started) >= self.interval,
            None => self.next.is_some_and(|next| now >= next),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.is_some()
    }

    pub fn start(&mut self, now: Instant, frames: usize) {
        self.next = None;
        self.in_flight = Some(InFlight {
            started: now,
            remaining: frames,
        });
        if frames == 0 {
            self.frame_done(now);
        }
    }

    /// One frame answered. Returns `true` when that completed the cycle.
    pub fn frame_done(&mut self, now: Instant) -> bool {
        let Some(cycle) = self.in_flight.as_mut() else {
            return false;
        };
        cycle.remaining = cycle.remaining.saturating_sub(1);
        if cycle.remaining > 0 {
            return false;
        }
        let elapsed = now.saturating_duration_since(cycle.started);
        self.next = Some(now + self.interval.saturating_sub(elapsed).max(self.min));
        self.in_flight = None;
        true
    }

    /// When the next cycle is due
    pub fn deadline(&self) -> Option<Instant> {
        match self.in_flight {
            Some(cycle) => Some(cycle.started + self.interval),
            None => self.next,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTERVAL: Duration = Duration::from_millis(500);
    const MIN: Duration = Duration::from_millis(100);

    #[test]
    fn test_poll_waits_for_interval() {
        let now = Instant::now();
        let poll = UpdatePoll::new(now, INTERVAL, MIN);
        assert!(!poll.is_due(now + Duration::from_millis(499)));
        assert!(poll.is_due(now + INTERVAL));
        assert_eq!(poll.deadline(), Some(now + INTERVAL));
    }

    #[test]
    fn test_fast_cycle_keeps_cadence() {
        let now = Instant::now();
        let mut poll = UpdatePoll::new(now, INTERVAL, MIN);
        poll.start(now, 2);
        assert!(!poll.frame_done(now + Duration::from_millis(10)));
        assert!(poll.frame_done(now + Duration::from_millis(50)));
        assert_eq!(poll.deadline(), Some(now + INTERVAL));
    }

    #[test]
    fn test_slow_cycle_waits_minimum() {
        let now = Instant::now();
        let mut poll = UpdatePoll::new(now, INTERVAL, MIN);
        poll.start(now, 1);
        let done = now + Duration::from_millis(450);
        poll.frame_done(done);
        assert_eq!(poll.deadline(), Some(done + MIN));
    }

    #[test]
    fn test_overlapping_cycles_are_not_started() {
        let now = Instant::now();
        let mut poll = UpdatePoll::new(now, INTERVAL, MIN);
        poll.start(now, 1);
        assert!(poll.is_in_flight());
        assert!(!poll.is_due(now + Duration::from_millis(100)));
        // A frame that never answers does not stall polling forever.
        assert!(poll.is_due(now + INTERVAL));
    }

    #[test]
    fn test_no_frames_completes_immediately() {
        let now = Instant::now();
        let mut poll = UpdatePoll::new(now, INTERVAL, MIN);
        poll.start(now, 0);
        assert!(!poll.is_in_flight());
        assert_eq!(poll.deadline(), Some(now + INTERVAL));
    }

    #[test]
    fn test_state_accessors() {
        let state = HintsState::default();
        assert_eq!(state.name(), "idle");
        assert_eq!(state.token(), None);
        assert_eq!(state.mode(), None);
    }
}
