//! GRTC: 52-bit global syscounter with per-domain interrupt routing (§4.5).

use crate::counter_math::ticks_to_reach;
use sim_engine::{SimTime, TIME_NEVER};

const WRAP: u64 = 1 << 52;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompareEvent(pub usize);

#[derive(Debug, Clone, Copy)]
struct Cc {
    value: u64,
    enabled: bool,
    deadline: SimTime,
}

impl Default for Cc {
    fn default() -> Self {
        Cc { value: 0, enabled: false, deadline: TIME_NEVER }
    }
}

/// Mirror of SYSCOUNTERL/H as last read by one domain: tracks whether the
/// low word has wrapped since that domain's last low-word read (§4.5).
#[derive(Debug, Clone, Copy, Default)]
pub struct DomainMirror {
    last_low_read: u32,
    overflow_seen: bool,
}

pub struct Grtc {
    instance: u32,
    n_cc: usize,
    n_domains: usize,
    running: bool,
    base_time: SimTime,
    base_value: u64,
    cc: Vec<Cc>,
    /// INTERVAL for CC[0]'s free-running auto-reload mode.
    interval: u64,
    domains: Vec<DomainMirror>,
}

impl Grtc {
    pub fn new(instance: u32, n_cc: usize, n_domains: usize) -> Self {
        Grtc {
            instance,
            n_cc,
            n_domains,
            running: true,
            base_time: 0,
            base_value: 0,
            cc: vec![Cc::default(); n_cc],
            interval: 0,
            domains: vec![DomainMirror::default(); n_domains],
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn syscounter(&self, now: SimTime) -> u64 {
        if !self.running {
            return self.base_value % WRAP;
        }
        (self.base_value + (now - self.base_time)) % WRAP
    }

    pub fn set_interval(&mut self, value: u64) {
        self.interval = value % WRAP;
    }

    /// TASK_CAPTURE\[n\]: snapshot SYSCOUNTER into CC\[n\] and disable its
    /// compare (§4.5).
    pub fn task_capture(&mut self, n: usize, now: SimTime) {
        self.cc[n].value = self.syscounter(now);
        self.cc[n].enabled = false;
        self.cc[n].deadline = TIME_NEVER;
    }

    /// Write to CC\[n\].CCH: enables compare at the currently-stored value.
    pub fn write_cch(&mut self, n: usize, now: SimTime) {
        self.cc[n].enabled = true;
        self.recompute_cc(n, now);
    }

    /// Write to CC\[n\].CCL: disables compare.
    pub fn write_ccl(&mut self, n: usize) {
        self.cc[n].enabled = false;
        self.cc[n].deadline = TIME_NEVER;
    }

    /// CCADD: atomically set CC\[n\] to `SYSCOUNTER + offset` (reference =
    /// syscounter) or `CC[n] + offset` (reference = self), then enable
    /// compare (§4.5).
    pub fn task_ccadd(&mut self, n: usize, offset: u64, reference_is_syscounter: bool, now: SimTime) {
        let base = if reference_is_syscounter {
            self.syscounter(now)
        } else {
            self.cc[n].value
        };
        self.cc[n].value = (base + offset) % WRAP;
        self.cc[n].enabled = true;
        self.recompute_cc(n, now);
    }

    fn recompute_cc(&mut self, n: usize, now: SimTime) {
        if !self.cc[n].enabled {
            self.cc[n].deadline = TIME_NEVER;
            return;
        }
        let cur = self.syscounter(now);
        let ticks = ticks_to_reach(cur, self.cc[n].value, WRAP);
        self.cc[n].deadline = now + ticks;
    }

    pub fn deadline(&self) -> SimTime {
        self.cc.iter().map(|c| c.deadline).min().unwrap_or(TIME_NEVER)
    }

    pub fn fire(&mut self, now: SimTime) -> Vec<CompareEvent> {
        let mut events = Vec::new();
        for n in 0..self.n_cc {
            if self.cc[n].deadline != now {
                continue;
            }
            events.push(CompareEvent(n));
            if n == 0 && self.interval != 0 {
                self.cc[0].value = (self.cc[0].value + self.interval) % WRAP;
                self.recompute_cc(0, now);
            } else {
                self.cc[n].enabled = false;
                self.cc[n].deadline = TIME_NEVER;
            }
        }
        events
    }

    /// Read SYSCOUNTERL/H for `domain`, reporting and latching overflow in
    /// the high word if the low word has wrapped since that domain's last
    /// read (§4.5).
    pub fn read_syscounter_mirror(&mut self, domain: usize, now: SimTime) -> (u32, u32, bool) {
        let value = self.syscounter(now);
        let low = (value & 0xFFFF_FFFF) as u32;
        let high = ((value >> 32) & 0xFFFFF) as u32;
        let d = &mut self.domains[domain];
        let wrapped = low < d.last_low_read;
        d.overflow_seen |= wrapped;
        let overflow = d.overflow_seen;
        d.last_low_read = low;
        (low, high, overflow)
    }

    pub fn clear_domain_overflow(&mut self, domain: usize) {
        self.domains[domain].overflow_seen = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn capture_snapshots_and_disables_compare() {
        let mut g = Grtc::new(0, 4, 1);
        g.task_capture(0, 50);
        assert_eq!(g.cc[0].value, 50);
        assert!(!g.cc[0].enabled);
    }

    #[test]
    fn ccadd_with_syscounter_reference() {
        let mut g = Grtc::new(0, 4, 1);
        g.task_ccadd(0, 100, true, 10);
        assert_eq!(g.cc[0].value, 110);
        assert_eq!(g.deadline(), 110);
    }

    #[test]
    fn interval_reload_on_cc0_only() {
        let mut g = Grtc::new(0, 4, 1);
        g.set_interval(1000);
        g.write_cch(0, 0);
        g.cc[0].value = 1000;
        g.cc[0].deadline = 1000;
        let ev = g.fire(1000);
        assert_eq!(ev, vec![CompareEvent(0)]);
        assert_eq!(g.cc[0].value, 2000);
        assert!(g.cc[0].enabled);
    }

    #[test]
    fn non_interval_cc_disables_after_match() {
        let mut g = Grtc::new(0, 4, 1);
        g.write_cch(1, 0);
        g.cc[1].value = 5;
        g.cc[1].deadline = 5;
        g.fire(5);
        assert!(!g.cc[1].enabled);
    }

    #[test]
    fn domain_mirror_reports_overflow_once_per_wrap() {
        let mut g = Grtc::new(0, 4, 1);
        g.base_value = (1u64 << 32) - 5;
        let (_, _, overflow) = g.read_syscounter_mirror(0, 0);
        assert!(!overflow);
        let (_, _, overflow) = g.read_syscounter_mirror(0, 10);
        assert!(overflow);
    }
}
