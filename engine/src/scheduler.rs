//! The discrete-event scheduler (§4.1).
//!
//! The scheduler itself only owns `now` and the global minimum deadline; it
//! has no notion of what a "peripheral" is. The owner of all peripheral
//! state (the `World` type in the `host-sim` board crate) recomputes the
//! minimum across its own deadlines and pushes it in with
//! [`Scheduler::recompute_next_event`] whenever any deadline changes, via
//! its own `find_next_event()`.

use crate::time::{SimTime, TIME_NEVER};

#[derive(Debug)]
pub struct Scheduler {
    now: SimTime,
    next_event_time: SimTime,
}

impl Default for Scheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl Scheduler {
    pub fn new() -> Self {
        Scheduler {
            now: 0,
            next_event_time: TIME_NEVER,
        }
    }

    pub fn get_time(&self) -> SimTime {
        self.now
    }

    pub fn get_next_event_time(&self) -> SimTime {
        self.next_event_time
    }

    /// Recompute `next_event_time` as the minimum of `deadlines` (and the
    /// scheduler's own current value is discarded — callers must pass every
    /// live deadline each time, which is what `World::find_next_event`
    /// does).
    pub fn recompute_next_event(&mut self, deadlines: impl Iterator<Item = SimTime>) {
        self.next_event_time = deadlines.min().unwrap_or(TIME_NEVER);
    }

    /// Advance `now` to `target`. `target` must not be before `now`: the
    /// scheduler's monotonicity invariant is the caller's responsibility to
    /// uphold (the driver loop never calls this with a time in the past).
    pub fn advance_to(&mut self, target: SimTime) {
        debug_assert!(target >= self.now, "simulated time must not go backwards");
        self.now = target;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_event_is_min_of_live_deadlines() {
        let mut s = Scheduler::new();
        s.recompute_next_event([100u64, 50, TIME_NEVER, 75].into_iter());
        assert_eq!(s.get_next_event_time(), 50);
    }

    #[test]
    fn empty_deadlines_means_never() {
        let mut s = Scheduler::new();
        s.recompute_next_event(std::iter::empty());
        assert_eq!(s.get_next_event_time(), TIME_NEVER);
    }

    #[test]
    fn advance_moves_now_forward() {
        let mut s = Scheduler::new();
        s.advance_to(152);
        assert_eq!(s.get_time(), 152);
    }
}
