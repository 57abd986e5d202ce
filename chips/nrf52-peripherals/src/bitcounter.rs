//! Bitcounter (§4.9): RADIO-side helper kept in scope as a small event-
//! network participant even though RADIO PHY itself is out of scope.
//!
//! TODO: FEC1/FEC2 coded-PHY bits-per-symbol changes mid-count are not
//! modeled; `bits_per_us` is fixed for the lifetime of one BCSTART..BCSTOP.

use sim_engine::{SimTime, TIME_NEVER};

pub struct Bitcounter {
    instance: u32,
    running: bool,
    bits_per_us: f64,
    deadline: SimTime,
}

impl Bitcounter {
    pub fn new(instance: u32, bits_per_us: f64) -> Self {
        Bitcounter { instance, running: false, bits_per_us, deadline: TIME_NEVER }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn task_bcstart(&mut self, bcc: u32, now: SimTime) {
        self.running = true;
        self.arm(bcc, now);
    }

    fn arm(&mut self, bcc: u32, now: SimTime) {
        let delay = (bcc as f64 / self.bits_per_us).round() as u64;
        self.deadline = now + delay;
    }

    pub fn task_bcstop(&mut self) {
        self.running = false;
        self.deadline = TIME_NEVER;
    }

    /// A later BCC write while still running schedules the next match.
    pub fn rewrite_bcc(&mut self, bcc: u32, now: SimTime) {
        if self.running {
            self.arm(bcc, now);
        }
    }

    pub fn deadline(&self) -> SimTime {
        self.deadline
    }

    pub fn fire(&mut self, now: SimTime) -> bool {
        if self.deadline == now {
            self.deadline = TIME_NEVER;
            true
        } else {
            false
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bcstart_arms_deadline_from_bcc() {
        let mut bc = Bitcounter::new(0, 1.0);
        bc.task_bcstart(100, 0);
        assert_eq!(bc.deadline(), 100);
    }

    #[test]
    fn stays_running_after_match_for_a_later_rewrite() {
        let mut bc = Bitcounter::new(0, 1.0);
        bc.task_bcstart(10, 0);
        assert!(bc.fire(10));
        assert!(bc.is_running());
        bc.rewrite_bcc(5, 10);
        assert_eq!(bc.deadline(), 15);
    }
}
