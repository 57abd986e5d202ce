//! End-to-end scenarios, literally transcribed from the spec's §8
//! worked examples (S1-S3, S6 have unit-test coverage closer to the
//! peripheral they exercise; these integration tests cover the
//! cross-peripheral wiring that only `World` can exercise).

use host_sim::world::World;
use nrf52_peripherals::dppi::SubscribeParam;
use nrf52_peripherals::nvmc::Wen;

// S1 — RTC basic compare, driven end-to-end through World.
#[test]
fn rtc_basic_compare_asserts_cpu_irq_line() {
    let mut w = World::new();
    w.intctrl.enable(0); // RTC0's line
    w.regw_sideeffects_rtc0_task_start(0);
    w.regw_sideeffects_rtc0_cc_enabled(0, true, 0);
    w.regw_sideeffects_rtc0_cc(0, 5, 0);
    let t = w.advance_and_dispatch();
    assert_eq!(t, 152);
    assert!(w.intctrl.is_pending(0));
}

// S2 — DPPI routing from EGU0 to TIMER0.
#[test]
fn egu_trigger_starts_timer_via_dppi_same_delta() {
    let mut w = World::new();
    // Mirrors EGU0.PUBLISH_TRIGGERED[3] = 0x80000000 | 7 and
    // TIMER0.SUBSCRIBE_START = 0x80000000 | 7 being written, then
    // DPPIC.CHENSET = 1<<7.
    w.regw_sideeffects_timer0_subscribe_start(0x8000_0000 | 7);
    w.regw_sideeffects_dppi_chenset(1 << 7);
    assert!(!w.timer0.is_running());
    w.regw_sideeffects_egu_trigger(3, 0x8000_0000 | 7, 0);
    assert!(w.timer0.is_running());
}

// S4 — NVMC partial erase accumulation and eventual completion.
#[test]
fn flash_partial_erase_accumulates_then_completes() {
    let mut w = World::new();
    w.nvmc.flash_erase_warnings = true;
    w.nvmc.set_config(Wen::Wen);
    w.nvmc.word_write(0x1000, 0x0000_0000, 0).unwrap();
    for _ in 0..4 {
        w.nvmc.task_erasepagepartial(0x1000, 10_000);
    }
    assert!(w.nvmc.partially_erased(0x1000));
    assert_eq!(w.nvmc.read_word(0x1000), 0);
    w.nvmc.task_erasepagepartial(0x1000, 90_000);
    assert_eq!(w.nvmc.read_word(0x1000), 0xFFFF_FFFF);
}

// S5 — GPIOTE EVENTS_PORT via LDETECT and LATCH clear/re-raise.
#[test]
fn gpiote_port_event_fires_on_latched_detect_and_again_after_clear() {
    use nrf52_peripherals::gpio::DetectMode;

    let mut w = World::new();
    w.gpio0.set_sense(3, true, false);
    w.gpio0.set_detect_mode(DetectMode::Ldetect);

    let rose = w.gpio0.apply_external_level(3, true);
    assert!(!rose.is_empty() || w.gpio0.detect_signal());
    assert!(w.gpio0.detect_signal());

    w.gpio0.apply_external_level(3, false);
    let rose_again = w.gpio0.write_latch_clear(1 << 3);
    assert!(!rose_again);

    w.gpio0.apply_external_level(3, true);
    assert!(w.gpio0.detect_signal());
}

// S6 — IRQ priority and lock, at the World level.
#[test]
fn irq_priority_and_lock_scenario_on_world_intctrl() {
    let mut w = World::new();
    w.intctrl.prio_set(4, 1);
    w.intctrl.prio_set(5, 0);
    w.intctrl.enable(4);
    w.intctrl.enable(5);
    w.intctrl.set_pulse(4);
    w.intctrl.set_pulse(5);
    assert_eq!(w.intctrl.highest_pending(), Some(5));

    w.intctrl.change_lock(true);
    w.intctrl.prio_set(3, 0);
    w.intctrl.enable(3);
    w.intctrl.set_pulse(3);
    assert!(!w.intctrl.take_awaking_cpu());

    assert!(w.intctrl.change_lock(false));
    assert!(w.intctrl.take_awaking_cpu());
}

#[test]
fn dppi_subscribe_unsubscribe_round_trip_leaves_capacity_invariant() {
    let mut w = World::new();
    w.dppi.channel_subscribe(0, 1, SubscribeParam::NoParam).unwrap();
    let cap = w.dppi.capacity(0);
    assert_eq!(w.dppi.subscriber_count(0), 1);
    w.dppi.channel_unsubscribe(0, 1, SubscribeParam::NoParam).unwrap();
    assert_eq!(w.dppi.subscriber_count(0), 0);
    assert_eq!(w.dppi.capacity(0), cap);
}
