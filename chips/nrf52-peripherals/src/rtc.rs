//! RTC: 24-bit low-frequency counter with 4 compare/capture registers
//! (§4.5).

use crate::counter_math::ticks_to_reach;
use sim_engine::{SimTime, TIME_NEVER};

const WRAP: u64 = 1 << 24;
pub const N_CC: usize = 4;

#[derive(Debug, Clone, Copy, Default)]
pub struct Shorts {
    /// SHORTS\[i\] COMPARE\[i\]_CLEAR.
    pub compare_clear: [bool; N_CC],
    /// SHORTS\[i\] COMPARE\[i\]_STOP.
    pub compare_stop: [bool; N_CC],
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RtcEvent {
    Compare(usize),
    Tick,
    Ovrflw,
}

pub struct Rtc {
    instance: u32,
    running: bool,
    lfclk_ready: bool,
    prescaler: u32,
    base_time: SimTime,
    base_value: u64,
    cc: [u32; N_CC],
    cc_enabled: [bool; N_CC],
    cc_deadline: [SimTime; N_CC],
    tick_enabled: bool,
    tick_deadline: SimTime,
    ovrflw_deadline: SimTime,
    pub shorts: Shorts,
}

impl Rtc {
    pub fn new(instance: u32) -> Self {
        Rtc {
            instance,
            running: false,
            lfclk_ready: false,
            prescaler: 0,
            base_time: 0,
            base_value: 0,
            cc: [0; N_CC],
            cc_enabled: [false; N_CC],
            cc_deadline: [TIME_NEVER; N_CC],
            tick_enabled: false,
            tick_deadline: TIME_NEVER,
            ovrflw_deadline: TIME_NEVER,
            shorts: Shorts::default(),
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn note_lfclk_started(&mut self) {
        self.lfclk_ready = true;
    }

    fn tick_period_us(&self) -> u64 {
        ((self.prescaler as u64 + 1) * 1_000_000) / 32768
    }

    /// `ticks` RTC periods, in microseconds, computed with a single
    /// division so that e.g. 5 ticks at PRESCALER=0 comes out to 152 (not
    /// 5 * 30 = 150): the per-tick period truncates to whole microseconds
    /// but the *cumulative* duration should not compound that truncation.
    fn ticks_to_us(&self, ticks: u64) -> u64 {
        (ticks * (self.prescaler as u64 + 1) * 1_000_000) / 32768
    }

    pub fn counter(&self, now: SimTime) -> u32 {
        if !self.running {
            return (self.base_value % WRAP) as u32;
        }
        let elapsed_ticks = (now - self.base_time) / self.tick_period_us().max(1);
        ((self.base_value + elapsed_ticks) % WRAP) as u32
    }

    pub fn set_prescaler(&mut self, value: u32) {
        self.prescaler = value & 0xFFF;
    }

    pub fn task_start(&mut self, now: SimTime) -> bool {
        if !self.lfclk_ready {
            return false;
        }
        if self.running {
            return true;
        }
        self.running = true;
        self.base_time = now;
        self.base_value = 0;
        self.recompute_all(now);
        true
    }

    pub fn task_stop(&mut self, now: SimTime) {
        self.base_value = self.counter(now) as u64;
        self.running = false;
        self.cc_deadline = [TIME_NEVER; N_CC];
        self.tick_deadline = TIME_NEVER;
        self.ovrflw_deadline = TIME_NEVER;
    }

    pub fn task_clear(&mut self, now: SimTime) {
        self.base_time = now;
        self.base_value = 0;
        if self.running {
            self.recompute_all(now);
        }
    }

    pub fn task_trigovrflw(&mut self, now: SimTime) {
        self.base_time = now;
        self.base_value = 0xFFFFF0;
        if self.running {
            self.recompute_all(now);
        }
    }

    pub fn set_cc(&mut self, i: usize, value: u32, now: SimTime) {
        self.cc[i] = value & 0xFFFFFF;
        if self.running && self.cc_enabled[i] {
            self.recompute_cc(i, now);
        }
    }

    pub fn set_cc_enabled(&mut self, i: usize, enabled: bool, now: SimTime) {
        self.cc_enabled[i] = enabled;
        if !enabled {
            self.cc_deadline[i] = TIME_NEVER;
        } else if self.running {
            self.recompute_cc(i, now);
        }
    }

    pub fn set_tick_enabled(&mut self, enabled: bool, now: SimTime) {
        self.tick_enabled = enabled;
        if !enabled {
            self.tick_deadline = TIME_NEVER;
        } else if self.running {
            self.tick_deadline = now + self.ticks_to_us(1);
        }
    }

    fn recompute_cc(&mut self, i: usize, now: SimTime) {
        let cur = self.counter(now) as u64;
        let ticks = ticks_to_reach(cur, self.cc[i] as u64, WRAP);
        self.cc_deadline[i] = now + self.ticks_to_us(ticks);
    }

    fn recompute_all(&mut self, now: SimTime) {
        for i in 0..N_CC {
            if self.cc_enabled[i] {
                self.recompute_cc(i, now);
            }
        }
        if self.tick_enabled {
            self.tick_deadline = now + self.ticks_to_us(1);
        }
        let ticks = ticks_to_reach(self.counter(now) as u64, 0, WRAP);
        self.ovrflw_deadline = now + self.ticks_to_us(ticks);
    }

    pub fn deadline(&self) -> SimTime {
        self.cc_deadline
            .iter()
            .copied()
            .chain([self.tick_deadline, self.ovrflw_deadline])
            .min()
            .unwrap_or(TIME_NEVER)
    }

    /// Fire every sub-event whose deadline is exactly `now`, applying
    /// SHORTS and returning the events to publish in a deterministic
    /// (CC0..CC3, TICK, OVRFLW) order.
    pub fn fire(&mut self, now: SimTime) -> Vec<RtcEvent> {
        let mut events = Vec::new();
        let mut do_clear = false;
        let mut do_stop = false;
        for i in 0..N_CC {
            if self.cc_deadline[i] == now {
                events.push(RtcEvent::Compare(i));
                do_clear |= self.shorts.compare_clear[i];
                do_stop |= self.shorts.compare_stop[i];
            }
        }
        if self.tick_deadline == now {
            events.push(RtcEvent::Tick);
            self.tick_deadline = now + self.ticks_to_us(1);
        }
        if self.ovrflw_deadline == now {
            events.push(RtcEvent::Ovrflw);
        }
        if do_clear {
            self.task_clear(now);
        }
        if do_stop {
            self.task_stop(now);
        } else {
            for i in 0..N_CC {
                if self.cc_deadline[i] == now && self.cc_enabled[i] && !do_clear {
                    self.recompute_cc(i, now);
                }
            }
            if self.ovrflw_deadline == now {
                self.ovrflw_deadline = now + self.ticks_to_us(WRAP);
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spec §8 S1.
    #[test]
    fn rtc_basic_compare() {
        let mut rtc = Rtc::new(0);
        rtc.note_lfclk_started();
        assert!(rtc.task_start(0));
        rtc.set_cc_enabled(0, true, 0);
        rtc.set_cc(0, 5, 0);
        assert_eq!(rtc.deadline(), 152); // 5 * 1e6/32768 truncated
        let ev = rtc.fire(152);
        assert_eq!(ev[0], RtcEvent::Compare(0));
    }

    #[test]
    fn start_without_lfclk_is_ignored() {
        let mut rtc = Rtc::new(0);
        assert!(!rtc.task_start(0));
        assert!(!rtc.is_running());
    }

    #[test]
    fn trigovrflw_forces_counter() {
        let mut rtc = Rtc::new(0);
        rtc.note_lfclk_started();
        rtc.task_start(0);
        rtc.task_trigovrflw(10);
        assert_eq!(rtc.counter(10), 0xFFFFF0);
    }

    #[test]
    fn compare_clear_shortcut_resets_counter() {
        let mut rtc = Rtc::new(0);
        rtc.note_lfclk_started();
        rtc.task_start(0);
        rtc.shorts.compare_clear[0] = true;
        rtc.set_cc_enabled(0, true, 0);
        rtc.set_cc(0, 3, 0);
        let deadline = rtc.cc_deadline[0];
        rtc.fire(deadline);
        assert_eq!(rtc.counter(deadline), 0);
    }
}
