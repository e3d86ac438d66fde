//! Deadline-bounded incremental work.
//!
//! DOM-originated bursts (an initial HTML payload, a large list render) are
//! queued and drained in slices. A slice stops as soon as its deadline has no
//! time left; the rest of the queue waits for the next idle period.

use std::cell::Cell;
use std::collections::VecDeque;
use std::time::{Duration, Instant};

/// Source of the current time
pub trait Clock {
    fn now(&self) -> Instant;
}

/// Wall clock
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Instant {
        Instant::now()
    }
}

/// Clock that only moves when told to
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Cell<Instant>,
}

impl ManualClock {
    pub fn new(start: Instant) -> Self {
        Self {
            now: Cell::new(start),
        }
    }

    pub fn advance(&self, by: Duration) {
        self.now.set(self.now.get() + by);
    }

    pub fn set(&self, now: Instant) {
        self.now.set(now);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.now.get()
    }
}

/// `IdleDeadline` equivalent: how much of the current slice is left
pub trait IdleDeadline {
    fn time_remaining(&self) -> Duration;

    fn expired(&self) -> bool {
        self.time_remaining().is_zero()
    }
}

/// Deadline ending at a fixed instant of a clock
#[derive(Debug)]
pub struct SliceDeadline<'a, C: Clock + ?Sized> {
    clock: &'a C,
    end: Instant,
}

impl<'a, C: Clock + ?Sized> SliceDeadline<'a, C> {
    pub fn new(clock: &'a C, slice: Duration) -> Self {
        Self {
            end: clock.now() + slice,
            clock,
        }
    }

    pub fn until(clock: &'a C, end: Instant) -> Self {
        Self { clock, end }
    }
}

impl<C: Clock + ?Sized> IdleDeadline for SliceDeadline<'_, C> {
    fn time_remaining(&self) -> Duration {
        self.end.saturating_duration_since(self.clock.now())
    }
}

/// Deadline that never runs out, for flushing everything synchronously
#[derive(Debug, Clone, Copy, Default)]
pub struct Unbounded;

impl IdleDeadline for Unbounded {
    fn time_remaining(&self) -> Duration {
        Duration::MAX
    }
}

/// Deadline that allows a fixed number of checks, for deterministic slicing
#[derive(Debug)]
pub struct StepBudget {
    steps: Cell<usize>,
}

impl StepBudget {
    pub fn new(steps: usize) -> Self {
        Self {
            steps: Cell::new(steps),
        }
    }
}

impl IdleDeadline for StepBudget {
    fn time_remaining(&self) -> Duration {
        let left = self.steps.get();
        if left == 0 {
            return Duration::ZERO;
        }
        self.steps.set(left - 1);
        Duration::from_millis(1)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainOutcome {
    /// The queue is empty
    Done,
    /// The deadline ran out with work left; another slice is scheduled
    Yielded,
}

/// FIFO of pending work with an idle-callback style "scheduled" flag
#[derive(Debug, Clone)]
pub struct WorkQueue<T> {
    items: VecDeque<T>,
    scheduled: bool,
}

impl<T> Default for WorkQueue<T> {
    fn default() -> Self {
        Self {
            items: VecDeque::new(),
            scheduled: false,
        }
    }
}

impl<T> WorkQueue<T> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, item: T) {
        self.items.push_back(item);
    }

    /// Queue follow-up work ahead of everything else, keeping its order
    pub fn push_front_all(&mut self, items: impl DoubleEndedIterator<Item = T>) {
        for item in items.rev() {
            self.items.push_front(item);
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.scheduled = false;
    }

    /// Ask for an idle slice. Returns `true` only if none was pending, so
    /// repeated calls collapse into one callback.
    pub fn schedule(&mut self) -> bool {
        if self.scheduled || self.items.is_empty() {
            return false;
        }
        self.scheduled = true;
        true
    }

    pub fn is_scheduled(&self) -> bool {
        self.scheduled
    }

    /// Run one slice: process items until the queue is empty or the deadline
    /// expires. `step` may queue follow-up work on the queue it is given.
    pub fn run<D, F>(&mut self, deadline: &D, mut step: F) -> DrainOutcome
    where
        D: IdleDeadline + ?Sized,
        F: FnMut(T, &mut WorkQueue<T>),
    {
        self.scheduled = false;
        loop {
            if self.items.is_empty() {
                return DrainOutcome::Done;
            }
            if deadline.expired() {
                self.scheduled = true;
                return DrainOutcome::Yielded;
            }
            if let Some(item) = self.items.pop_front() {
                step(item, self);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_until_done() {
        let mut queue = WorkQueue::new();
        queue.extend_for_test([1, 2, 3]);
        let mut seen = Vec::new();
        let outcome = queue.run(&Unbounded, |item, _| seen.push(item));
        assert_eq!(outcome, DrainOutcome::Done);
        assert_eq!(seen, vec![1, 2, 3]);
    }

    #[test]
    fn test_run_yields_and_resumes() {
        let mut queue = WorkQueue::new();
        queue.extend_for_test(0..10);
        let mut seen = Vec::new();

        let outcome = queue.run(&StepBudget::new(4), |item, _| seen.push(item));
        assert_eq!(outcome, DrainOutcome::Yielded);
        assert_eq!(seen, vec![0, 1, 2, 3]);
        assert!(queue.is_scheduled());

        let outcome = queue.run(&StepBudget::new(100), |item, _| seen.push(item));
        assert_eq!(outcome, DrainOutcome::Done);
        assert_eq!(seen, (0..10).collect::<Vec<_>>());
        assert!(!queue.is_scheduled());
    }

    #[test]
    fn test_follow_up_work_runs_first() {
        let mut queue = WorkQueue::new();
        queue.extend_for_test([1, 5]);
        let mut seen = Vec::new();
        queue.run(&Unbounded, |item, queue| {
            seen.push(item);
            if item == 1 {
                queue.push_front_all([2, 3, 4].into_iter());
            }
        });
        assert_eq!(seen, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_schedule_collapses() {
        let mut queue: WorkQueue<u8> = WorkQueue::new();
        assert!(!queue.schedule());
        queue.push(1);
        assert!(queue.schedule());
        assert!(!queue.schedule());
    }

    #[test]
    fn test_slice_deadline() {
        let clock = ManualClock::new(Instant::now());
        let deadline = SliceDeadline::new(&clock, Duration::from_millis(10));
        assert_eq!(deadline.time_remaining(), Duration::from_millis(10));
        clock.advance(Duration::from_millis(4));
        assert_eq!(deadline.time_remaining(), Duration::from_millis(6));
        clock.advance(Duration::from_millis(20));
        assert!(deadline.expired());
    }

    impl<T> WorkQueue<T> {
        fn extend_for_test(&mut self, items: impl IntoIterator<Item = T>) {
            for item in items {
                self.push(item);
            }
        }
    }
}
