//! Shared arithmetic for the discrete-time counters (RTC, TIMER, GRTC,
//! §4.5). Each of those peripherals is not ticked every microsecond;
//! instead the absolute time at which `counter == target` next holds is
//! computed once and stored as a deadline.

/// Number of ticks from `current` until the counter next reads `target`,
/// given a `wrap`-tick wide counter. Returns `wrap` (a full lap) rather
/// than 0 when `current == target`, since the caller always wants the
/// *next* occurrence, not "now".
pub fn ticks_to_reach(current: u64, target: u64, wrap: u64) -> u64 {
    debug_assert!(wrap > 0);
    let target = target % wrap;
    let current = current % wrap;
    if target == current {
        wrap
    } else {
        (target + wrap - current) % wrap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_value_means_a_full_lap() {
        assert_eq!(ticks_to_reach(5, 5, 16), 16);
    }

    #[test]
    fn ahead_target_is_the_simple_difference() {
        assert_eq!(ticks_to_reach(2, 7, 16), 5);
    }

    #[test]
    fn behind_target_wraps() {
        assert_eq!(ticks_to_reach(14, 2, 16), 4);
    }
}
