//! The composition root (§9 design note: "`World` owns everything"):
//! every peripheral instance, the scheduler, and the lifecycle registry
//! live here rather than behind the global mutable statics the original
//! BabbleSim C model used. `regw_sideeffects_*` methods are this file's
//! equivalent of the original's register-write side-effect functions:
//! each one finishes every state update, event publication, interrupt
//! reevaluation and deadline recompute before returning (§5).

use nrf52_peripherals::bitcounter::Bitcounter;
use nrf52_peripherals::clock::Clock;
use nrf52_peripherals::dppi::{Dppi, SubscribeParam};
use nrf52_peripherals::egu::Egu;
use nrf52_peripherals::faketimer::FakeTimer;
use nrf52_peripherals::gpio::GpioPort;
use nrf52_peripherals::gpiote::{Gpiote, Polarity};
use nrf52_peripherals::grtc::Grtc;
use nrf52_peripherals::intctrl::{IntCtrl, PHONY_HARD_IRQ};
use nrf52_peripherals::ipc::Ipc;
use nrf52_peripherals::mutex::Mutex;
use nrf52_peripherals::nvmc::Nvmc;
use nrf52_peripherals::ppib::Ppib;
use nrf52_peripherals::rramc::Rramc;
use nrf52_peripherals::rtc::Rtc;
use nrf52_peripherals::timer::Timer;
use nrf52_peripherals::uart::{Uart, UartBackend};
use peripheral_backends::uart_loopback::LoopbackBackend;
use sim_engine::{LifecycleRegistry, Phase, Scheduler, SimTime, TIME_NEVER};

/// Interrupt line numbers on the single CPU interrupt controller modeled
/// here. A real chip has many more; these are the ones this simulator's
/// wired peripherals actually raise.
mod irq_line {
    pub const RTC0: u32 = 0;
    pub const TIMER0: u32 = 1;
    pub const UART0: u32 = 2;
    pub const GPIOTE0: u32 = 3;
}

/// Tagged DPPI subscriber identity, decoded from the `u32` cookie stored
/// in `Dppi`'s subscriber lists (see `dppi.rs` module doc for why this is
/// a tag rather than a boxed closure).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DppiTask {
    TimerStart(u32),
    TimerStop(u32),
    RtcStart(u32),
    RtcStop(u32),
    EguTrigger(u32, usize),
    /// Tag 6 doesn't go through `Dppi` at all: it's the same tagged-cookie
    /// trick reused for GPIO's pin-change listener field (`gpio.rs`), so
    /// `dispatch_gpio_listeners` can share `DppiTask`'s encode/decode.
    GpioListener(usize),
}

impl DppiTask {
    fn encode(self) -> u32 {
        match self {
            DppiTask::TimerStart(i) => (1 << 24) | i,
            DppiTask::TimerStop(i) => (2 << 24) | i,
            DppiTask::RtcStart(i) => (3 << 24) | i,
            DppiTask::RtcStop(i) => (4 << 24) | i,
            DppiTask::EguTrigger(i, n) => (5 << 24) | (i << 8) | n as u32,
            DppiTask::GpioListener(n) => (6 << 24) | n as u32,
        }
    }

    fn decode(cookie: u32) -> Option<Self> {
        let tag = cookie >> 24;
        match tag {
            1 => Some(DppiTask::TimerStart(cookie & 0xFFFFFF)),
            2 => Some(DppiTask::TimerStop(cookie & 0xFFFFFF)),
            3 => Some(DppiTask::RtcStart(cookie & 0xFFFFFF)),
            4 => Some(DppiTask::RtcStop(cookie & 0xFFFFFF)),
            5 => Some(DppiTask::EguTrigger((cookie >> 8) & 0xFFFF, (cookie & 0xFF) as usize)),
            6 => Some(DppiTask::GpioListener((cookie & 0xFFFFFF) as usize)),
            _ => None,
        }
    }
}

pub struct World {
    pub scheduler: Scheduler,
    pub lifecycle: LifecycleRegistry<World>,
    pub intctrl: IntCtrl,
    pub dppi: Dppi,
    pub clock0: Clock,
    pub rtc0: Rtc,
    pub timer0: Timer,
    pub grtc0: Grtc,
    pub gpio0: GpioPort,
    pub gpiote0: Gpiote,
    pub uart0: Uart,
    uart0_backend: Box<dyn UartBackend>,
    pub nvmc: Nvmc,
    pub rramc: Rramc,
    pub egu0: Egu,
    pub ipc0: Ipc,
    pub ppib0: Ppib,
    pub mutex0: Mutex,
    pub bitcounter0: Bitcounter,
    pub faketimer0: FakeTimer,
}

impl World {
    pub fn new() -> Self {
        let mut rtc0 = Rtc::new(0);
        rtc0.note_lfclk_started();
        World {
            scheduler: Scheduler::new(),
            lifecycle: LifecycleRegistry::new(),
            intctrl: IntCtrl::new(0),
            dppi: Dppi::new(0, 32, 4),
            clock0: Clock::new(0),
            rtc0,
            timer0: Timer::new(0, 8),
            grtc0: Grtc::new(0, 8, 4),
            gpio0: GpioPort::new(0),
            gpiote0: Gpiote::new(0, 8),
            uart0: Uart::new(0),
            uart0_backend: Box::new(LoopbackBackend::new()),
            nvmc: Nvmc::new(0, 1024 * 1024, 4096),
            rramc: Rramc::new(0, 1024 * 1024, 4096),
            egu0: Egu::new(0, 16),
            ipc0: Ipc::new(0, 16),
            ppib0: Ppib::new(0, 16, true),
            mutex0: Mutex::new(0, 8),
            bitcounter0: Bitcounter::new(0, 1.0),
            faketimer0: FakeTimer::new(0),
        }
    }

    pub fn set_uart0_backend(&mut self, backend: Box<dyn UartBackend>) {
        self.uart0_backend = backend;
    }

    /// `next_event_time == min(all peripheral deadlines, TIME_NEVER)`
    /// (§8 invariant 1).
    pub fn find_next_event(&self) -> SimTime {
        [
            self.rtc0.deadline(),
            self.timer0.deadline(),
            self.grtc0.deadline(),
            self.clock0.deadline(),
            self.uart0.deadline(),
            self.nvmc.deadline(),
            self.bitcounter0.deadline(),
            self.faketimer0.deadline(),
        ]
        .into_iter()
        .min()
        .unwrap_or(TIME_NEVER)
    }

    /// Advance the scheduler to the next pending deadline, fire every
    /// peripheral whose deadline matches, reevaluate interrupts and DPPI
    /// publications, and return the new time. Returns `TIME_NEVER` (and
    /// does not move the clock) if nothing is pending.
    pub fn advance_and_dispatch(&mut self) -> SimTime {
        let next = self.find_next_event();
        if next == TIME_NEVER {
            return TIME_NEVER;
        }
        self.scheduler.advance_to(next);

        for ev in self.rtc0.fire(next) {
            use nrf52_peripherals::rtc::RtcEvent;
            if matches!(ev, RtcEvent::Compare(_)) {
                self.intctrl.set_pulse(irq_line::RTC0);
            }
        }
        for _ in self.timer0.fire(next) {
            self.intctrl.set_pulse(irq_line::TIMER0);
        }
        for _ in self.grtc0.fire(next) {}
        for clock_ev in self.clock0.fire(next) {
            let _ = clock_ev;
        }
        for _ in self.uart0.fire(next) {
            self.intctrl.set_pulse(irq_line::UART0);
        }
        self.nvmc.fire(next);
        self.bitcounter0.fire(next);
        if self.faketimer0.fire(next) {
            self.wake_busy_wait_cpu();
        }

        self.scheduler.recompute_next_event(std::iter::once(self.find_next_event()));
        next
    }

    /// Route one subscriber cookie pulled from `Dppi::event_signal` to
    /// the concrete peripheral task it names.
    fn route_task(&mut self, cookie: u32, now: SimTime) {
        match DppiTask::decode(cookie) {
            Some(DppiTask::TimerStart(_)) => self.timer0.task_start(now),
            Some(DppiTask::TimerStop(_)) => self.timer0.task_stop(now),
            Some(DppiTask::RtcStart(_)) => {
                self.rtc0.task_start(now);
            }
            Some(DppiTask::RtcStop(_)) => self.rtc0.task_stop(now),
            Some(DppiTask::EguTrigger(_, n)) => self.egu0.task_trigger(n),
            None => log::warn!("dppi: unroutable cookie {cookie:#x}"),
        }
    }

    /// Publish `channel`'s subscriber list, dispatching each task. The
    /// subscriber list is cloned out of `Dppi` first (see `dppi.rs`)
    /// specifically so this loop can freely call back into `self`.
    fn publish_channel(&mut self, channel: usize, now: SimTime) {
        let subs = self.dppi.event_signal(channel);
        for sub in subs {
            self.route_task(sub.cookie, now);
        }
    }

    /// EGU0.TASKS_TRIGGER\[i\]: pends EVENTS_TRIGGERED\[i\] and, if its
    /// PUBLISH register is armed, signals DPPI (§4.9).
    pub fn regw_sideeffects_egu_trigger(&mut self, i: usize, publish_reg: u32, now: SimTime) {
        self.egu0.task_trigger(i);
        self.dispatch_publish(publish_reg, now);
    }

    /// Generic PUBLISH-register-gated dispatch shared by every
    /// EVENTS_*/PUBLISH_* pair (§4.3).
    fn dispatch_publish(&mut self, publish_reg: u32, now: SimTime) {
        if publish_reg & 0x8000_0000 == 0 {
            return;
        }
        self.publish_channel((publish_reg & 0xFF) as usize, now);
    }

    /// DPPIC.CHENSET write (§4.3).
    pub fn regw_sideeffects_dppi_chenset(&mut self, mask: u64) {
        self.dppi.set_chenset(mask);
    }

    pub fn regw_sideeffects_dppi_chenclr(&mut self, mask: u64) {
        self.dppi.set_chenclr(mask);
    }

    /// TIMER0.SUBSCRIBE_START write (§4.3 common subscribe side effect).
    pub fn regw_sideeffects_timer0_subscribe_start(&mut self, reg_value: u32) {
        if reg_value & 0x8000_0000 == 0 {
            return;
        }
        let channel = (reg_value & 0xFF) as usize;
        let cookie = DppiTask::TimerStart(0).encode();
        let _ = self.dppi.channel_subscribe(channel, cookie, SubscribeParam::NoParam);
    }

    /// RTC0 CC\[i\] write, including the interrupt-pend reevaluation the
    /// spec's S1 scenario checks (§8 S1).
    pub fn regw_sideeffects_rtc0_cc(&mut self, i: usize, value: u32, now: SimTime) {
        self.rtc0.set_cc(i, value, now);
    }

    pub fn regw_sideeffects_rtc0_cc_enabled(&mut self, i: usize, enabled: bool, now: SimTime) {
        self.rtc0.set_cc_enabled(i, enabled, now);
    }

    pub fn regw_sideeffects_rtc0_task_start(&mut self, now: SimTime) {
        self.rtc0.task_start(now);
    }

    /// GPIOTE.CONFIG\[n\] in Event mode (§4.6): registers the channel as
    /// `pin`'s change listener via the same tagged-cookie mechanism DPPI
    /// uses, so a GPIO write's returned listener list can be routed back
    /// here without `GpioPort` knowing anything about `Gpiote`.
    pub fn regw_sideeffects_gpiote_configure_event(&mut self, n: usize, pin: usize, polarity: Polarity) {
        let initial_level = (self.gpio0.in_reg() >> pin) & 1 != 0;
        self.gpiote0.configure_event(n, 0, pin as u32, polarity, initial_level);
        let cookie = DppiTask::GpioListener(n).encode();
        let listeners = self.gpio0.peri_pin_control(pin, None, None, None, Some(cookie), None);
        self.dispatch_gpio_listeners(listeners);
    }

    /// Every GPIO write that can flip `IN` bits (DIR/OUT/OUTSET/OUTCLR)
    /// goes through one of these so the resulting listener cookies reach
    /// GPIOTE and a DETECT rising edge pends GPIOTE0 (§4.6).
    pub fn regw_sideeffects_gpio_write_dir(&mut self, value: u32) {
        let before = self.gpio0.detect_signal();
        let listeners = self.gpio0.write_dir(value);
        self.dispatch_gpio_listeners(listeners);
        self.pend_gpiote_on_rising_detect(before);
    }

    pub fn regw_sideeffects_gpio_write_outset(&mut self, mask: u32) {
        let before = self.gpio0.detect_signal();
        let listeners = self.gpio0.write_outset(mask);
        self.dispatch_gpio_listeners(listeners);
        self.pend_gpiote_on_rising_detect(before);
    }

    pub fn regw_sideeffects_gpio_write_outclr(&mut self, mask: u32) {
        let before = self.gpio0.detect_signal();
        let listeners = self.gpio0.write_outclr(mask);
        self.dispatch_gpio_listeners(listeners);
        self.pend_gpiote_on_rising_detect(before);
    }

    /// External stimulus (e.g. a GPIO input file, §6) forcing a pin level.
    pub fn regw_sideeffects_gpio_external_level(&mut self, pin: usize, level: bool) {
        let before = self.gpio0.detect_signal();
        let listeners = self.gpio0.apply_external_level(pin, level);
        self.dispatch_gpio_listeners(listeners);
        self.pend_gpiote_on_rising_detect(before);
    }

    fn pend_gpiote_on_rising_detect(&mut self, was_asserted: bool) {
        if self.gpio0.detect_signal() && !was_asserted {
            self.intctrl.set_pulse(irq_line::GPIOTE0);
        }
    }

    /// Decode listener cookies returned by a `GpioPort` mutation and feed
    /// each matching GPIOTE channel its new pin level, pending GPIOTE0 on
    /// any edge match (§4.6 Event mode).
    fn dispatch_gpio_listeners(&mut self, listeners: Vec<u32>) {
        for cookie in listeners {
            if let Some(DppiTask::GpioListener(n)) = DppiTask::decode(cookie) {
                let (_, pin) = self.gpiote0.channel_pin(n);
                let level = (self.gpio0.in_reg() >> pin) & 1 != 0;
                if self.gpiote0.on_pin_change(n, level) {
                    self.intctrl.set_pulse(irq_line::GPIOTE0);
                }
            }
        }
    }

    /// Phony-hard-IRQ wake used by a busy-waiting firmware loop (§4.9);
    /// bypasses the interrupt controller's lock.
    pub fn wake_busy_wait_cpu(&mut self) {
        self.intctrl.set_pulse(PHONY_HARD_IRQ);
    }

    pub fn run_lifecycle(&mut self, phase: Phase) {
        let mut registry = std::mem::replace(&mut self.lifecycle, LifecycleRegistry::new());
        registry.run_phase(phase, self);
        self.lifecycle = registry;
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spec §8 S1.
    #[test]
    fn rtc_compare_pends_the_interrupt_line() {
        let mut w = World::new();
        w.intctrl.enable(irq_line::RTC0);
        w.regw_sideeffects_rtc0_task_start(0);
        w.regw_sideeffects_rtc0_cc_enabled(0, true, 0);
        w.regw_sideeffects_rtc0_cc(0, 5, 0);
        assert_eq!(w.find_next_event(), 152);
        let t = w.advance_and_dispatch();
        assert_eq!(t, 152);
        assert!(w.intctrl.is_pending(irq_line::RTC0));
    }

    // Spec §8 S2.
    #[test]
    fn egu_trigger_routes_through_dppi_to_timer_start() {
        let mut w = World::new();
        let cookie = DppiTask::TimerStart(0).encode();
        w.dppi.channel_subscribe(7, cookie, SubscribeParam::NoParam).unwrap();
        w.regw_sideeffects_dppi_chenset(1 << 7);
        w.regw_sideeffects_egu_trigger(3, 0x8000_0000 | 7, 0);
        assert!(w.timer0.is_running());
    }

    #[test]
    fn find_next_event_is_never_when_nothing_armed() {
        let w = World::new();
        assert_eq!(w.find_next_event(), TIME_NEVER);
    }

    // Spec §8 S5, driven through World's GPIO/GPIOTE wiring rather than
    // GpioPort directly.
    #[test]
    fn gpiote_event_channel_pends_its_irq_line_on_rising_edge() {
        let mut w = World::new();
        w.intctrl.enable(irq_line::GPIOTE0);
        w.regw_sideeffects_gpiote_configure_event(0, 3, Polarity::LoToHi);
        assert!(!w.intctrl.is_pending(irq_line::GPIOTE0));
        w.regw_sideeffects_gpio_external_level(3, true);
        assert!(w.intctrl.is_pending(irq_line::GPIOTE0));
    }

    #[test]
    fn faketimer_wake_raises_phony_irq_through_advance_and_dispatch() {
        let mut w = World::new();
        w.faketimer0.wake_in_time(42);
        let t = w.advance_and_dispatch();
        assert_eq!(t, 42);
        assert!(w.intctrl.take_awaking_cpu());
    }
}
