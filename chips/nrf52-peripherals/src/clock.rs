//! CLOCK / POWER / RESET (§4.4): oscillator state machines and the
//! LF-calibration timer.

use sim_engine::{SimTime, TIME_NEVER};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OscState {
    Stopped,
    Starting,
    Started,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockEvent {
    HfclkStarted,
    LfclkStarted,
    Done,
    Ctto,
    Ctstarted,
    Ctstopped,
}

pub struct Clock {
    instance: u32,
    pub hfclk: OscState,
    pub lfclk: OscState,
    pub lfclk_calib: OscState,
    pub caltimer: OscState,
    hfclk_deadline: SimTime,
    lfclk_deadline: SimTime,
    calib_deadline: SimTime,
    caltimer_deadline: SimTime,
    pub ctiv: u32,
    pending: Vec<ClockEvent>,
}

impl Clock {
    pub fn new(instance: u32) -> Self {
        Clock {
            instance,
            hfclk: OscState::Stopped,
            lfclk: OscState::Stopped,
            lfclk_calib: OscState::Stopped,
            caltimer: OscState::Stopped,
            hfclk_deadline: TIME_NEVER,
            lfclk_deadline: TIME_NEVER,
            calib_deadline: TIME_NEVER,
            caltimer_deadline: TIME_NEVER,
            ctiv: 0,
            pending: Vec::new(),
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn deadline(&self) -> SimTime {
        [
            self.hfclk_deadline,
            self.lfclk_deadline,
            self.calib_deadline,
            self.caltimer_deadline,
        ]
        .into_iter()
        .min()
        .unwrap_or(TIME_NEVER)
    }

    /// Instantaneous XTAL start-up: one delta cycle from `now`.
    pub fn task_hfclkstart(&mut self, now: SimTime) {
        if matches!(self.hfclk, OscState::Stopped | OscState::Stopping) {
            self.hfclk = OscState::Starting;
            self.hfclk_deadline = now;
        }
    }

    pub fn task_hfclkstop(&mut self, now: SimTime) {
        if self.hfclk != OscState::Stopped {
            self.hfclk = OscState::Stopping;
            self.hfclk_deadline = now;
        }
    }

    pub fn task_lfclkstart(&mut self, now: SimTime) {
        if matches!(self.lfclk, OscState::Stopped | OscState::Stopping) {
            self.lfclk = OscState::Starting;
            self.lfclk_deadline = now;
        }
    }

    pub fn task_lfclkstop(&mut self, now: SimTime) {
        if self.lfclk != OscState::Stopped {
            self.lfclk = OscState::Stopping;
            self.lfclk_deadline = now;
        }
    }

    pub fn task_cal(&mut self, now: SimTime) {
        if self.hfclk == OscState::Started {
            self.lfclk_calib = OscState::Starting;
            self.calib_deadline = now;
        }
    }

    /// Arm the calibration timer for `CTIV * 250_000` microseconds.
    pub fn task_ctstart(&mut self, now: SimTime) {
        self.caltimer = OscState::Starting;
        self.caltimer_deadline = now + self.ctiv as u64 * 250_000;
    }

    pub fn task_ctstop(&mut self, now: SimTime) {
        self.caltimer = OscState::Stopping;
        self.caltimer_deadline = now;
    }

    /// Advance any state machine whose deadline is `now`, returning the
    /// events to publish.
    pub fn fire(&mut self, now: SimTime) -> Vec<ClockEvent> {
        let mut events = Vec::new();
        if self.hfclk_deadline == now {
            self.hfclk_deadline = TIME_NEVER;
            match self.hfclk {
                OscState::Starting => {
                    self.hfclk = OscState::Started;
                    events.push(ClockEvent::HfclkStarted);
                }
                OscState::Stopping => self.hfclk = OscState::Stopped,
                _ => {}
            }
        }
        if self.lfclk_deadline == now {
            self.lfclk_deadline = TIME_NEVER;
            match self.lfclk {
                OscState::Starting => {
                    self.lfclk = OscState::Started;
                    events.push(ClockEvent::LfclkStarted);
                }
                OscState::Stopping => self.lfclk = OscState::Stopped,
                _ => {}
            }
        }
        if self.calib_deadline == now {
            self.calib_deadline = TIME_NEVER;
            self.lfclk_calib = OscState::Stopped;
            events.push(ClockEvent::Done);
        }
        if self.caltimer_deadline == now {
            self.caltimer_deadline = TIME_NEVER;
            match self.caltimer {
                OscState::Starting => {
                    self.caltimer = OscState::Started;
                    events.push(ClockEvent::Ctstarted);
                    events.push(ClockEvent::Ctto);
                }
                OscState::Stopping => {
                    self.caltimer = OscState::Stopped;
                    events.push(ClockEvent::Ctstopped);
                }
                _ => {}
            }
        }
        events
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hfclkstart_completes_in_one_delta() {
        let mut c = Clock::new(0);
        c.task_hfclkstart(10);
        assert_eq!(c.deadline(), 10);
        let ev = c.fire(10);
        assert_eq!(c.hfclk, OscState::Started);
        assert_eq!(ev, vec![ClockEvent::HfclkStarted]);
    }

    #[test]
    fn cal_requires_hfclk_started() {
        let mut c = Clock::new(0);
        c.task_cal(5);
        assert_eq!(c.deadline(), TIME_NEVER);
        c.task_hfclkstart(0);
        c.fire(0);
        c.task_cal(5);
        assert_eq!(c.deadline(), 5);
    }

    #[test]
    fn ctstart_arms_for_ctiv_times_250000() {
        let mut c = Clock::new(0);
        c.ctiv = 4;
        c.task_ctstart(100);
        assert_eq!(c.deadline(), 100 + 4 * 250_000);
    }
}
