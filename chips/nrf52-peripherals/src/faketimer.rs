//! Fake busy-wait timer (§4.9): a no-interrupt-vector wake source used by
//! firmware spin-waits. Bypasses the interrupt controller's lock via the
//! phony hard IRQ line so a busy-waiting CPU always wakes on time.

use sim_engine::{SimTime, TIME_NEVER};

pub struct FakeTimer {
    instance: u32,
    deadline: SimTime,
}

impl FakeTimer {
    pub fn new(instance: u32) -> Self {
        FakeTimer { instance, deadline: TIME_NEVER }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// Pulls the deadline earlier if `when` is sooner than what's armed;
    /// never pushes it later (§4.9).
    pub fn wake_in_time(&mut self, when: SimTime) {
        if when < self.deadline {
            self.deadline = when;
        }
    }

    pub fn deadline(&self) -> SimTime {
        self.deadline
    }

    /// Returns true if it is time to raise the phony hard IRQ and clears
    /// the deadline.
    pub fn fire(&mut self, now: SimTime) -> bool {
        if self.deadline == now {
            self.deadline = TIME_NEVER;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wake_in_time_only_pulls_earlier() {
        let mut f = FakeTimer::new(0);
        f.wake_in_time(100);
        f.wake_in_time(200);
        assert_eq!(f.deadline(), 100);
        f.wake_in_time(50);
        assert_eq!(f.deadline(), 50);
    }

    #[test]
    fn fire_matches_exact_deadline_only() {
        let mut f = FakeTimer::new(0);
        f.wake_in_time(10);
        assert!(!f.fire(9));
        assert!(f.fire(10));
        assert_eq!(f.deadline(), TIME_NEVER);
    }
}
