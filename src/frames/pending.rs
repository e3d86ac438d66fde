use crate::dom::page::FrameId;
use crate::hints::assign::VisibleElement;
use std::time::{Duration, Instant};

/// Frames the controller is still waiting for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PendingFrames {
    /// Asked, but not yet confirmed alive
    pub answering: usize,
    /// Alive, element report not yet in
    pub collecting: usize,
}

/// Reports accumulated while collecting
#[derive(Debug, Clone)]
pub struct PendingElements {
    pub pending_frames: PendingFrames,
    pub elements: Vec<VisibleElement>,
    /// Per-frame discovery durations, for traces
    pub durations: Vec<(FrameId, Duration)>,
    started: Instant,
    timeout: Duration,
    deadline: Option<Instant>,
}

impl PendingElements {
    /// Waiting for the top frame's report, which was requested directly
    pub fn new(now: Instant, timeout: Duration) -> Self {
        Self {
            pending_frames: PendingFrames {
                answering: 0,
                collecting: 1,
            },
            elements: Vec::new(),
            durations: Vec::new(),
            started: now,
            timeout,
            deadline: None,
        }
    }

    pub fn started(&self) -> Instant {
        self.started
    }

    /// Instant at which waiting for silent frames stops, if any are awaited
    pub fn deadline(&self) -> Option<Instant> {
        self.deadline.filter(|_| self.pending_frames.answering > 0)
    }

    /// A child frame confirmed it is alive
    pub fn frame_confirmed(&mut self) {
        let frames = &mut self.pending_frames;
        frames.answering = frames.answering.saturating_sub(1);
        frames.collecting += 1;
    }

    /// A frame delivered its elements and asked `num_frames` children in turn
    pub fn frame_reported(
        &mut self,
        frame: FrameId,
        elements: Vec<VisibleElement>,
        num_frames: usize,
        duration: Duration,
        now: Instant,
    ) {
        let frames = &mut self.pending_frames;
        frames.collecting = frames.collecting.saturating_sub(1);
        if num_frames > 0 {
            frames.answering += num_frames;
            self.deadline = Some(now + self.timeout);
        }
        self.elements.extend(elements);
        self.durations.push((frame, duration));
    }

    pub fn is_complete(&self) -> bool {
        self.pending_frames == PendingFrames::default()
    }

    /// Whether silent frames should be given up on
    pub fn timed_out(&self, now: Instant) -> bool {
        self.deadline().is_some_and(|deadline| now >= deadline)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TIMEOUT: Duration = Duration::from_millis(100);

    #[test]
    fn test_top_frame_only() {
        let now = Instant::now();
        let mut pending = PendingElements::new(now, TIMEOUT);
        assert!(!pending.is_complete());

        pending.frame_reported(FrameId::TOP, Vec::new(), 0, Duration::ZERO, now);
        assert!(pending.is_complete());
        assert_eq!(pending.deadline(), None);
    }

    #[test]
    fn test_child_frames() {
        let now = Instant::now();
        let mut pending = PendingElements::new(now, TIMEOUT);
        pending.frame_reported(FrameId::TOP, Vec::new(), 2, Duration::ZERO, now);
        assert_eq!(
            pending.pending_frames,
            PendingFrames {
                answering: 2,
                collecting: 0
            }
        );

        pending.frame_confirmed();
        pending.frame_reported(FrameId(1), Vec::new(), 0, Duration::ZERO, now);
        assert!(!pending.is_complete());
        pending.frame_confirmed();
        pending.frame_reported(FrameId(2), Vec::new(), 0, Duration::ZERO, now);
        assert!(pending.is_complete());
        assert_eq!(pending.durations.len(), 3);
    }

    #[test]
    fn test_timeout_rearms() {
        let now = Instant::now();
        let mut pending = PendingElements::new(now, TIMEOUT);
        pending.frame_reported(FrameId::TOP, Vec::new(), 1, Duration::ZERO, now);
        assert!(!pending.timed_out(now + Duration::from_millis(99)));

        let later = now + Duration::from_millis(50);
        pending.frame_confirmed();
        pending.frame_reported(FrameId(1), Vec::new(), 1, Duration::ZERO, later);
        assert!(!pending.timed_out(now + TIMEOUT));
        assert!(pending.timed_out(later + TIMEOUT));
    }
}
