//! Interrupt controller (§4.2), grounded on `original_source/src/HW_models/irq_ctrl.c`.
//!
//! Up to 64 lines per instance, packed into one `u64` per status word. A
//! "phony hard IRQ" line number (outside the normal 0..64 range) bypasses
//! the global lock and is reserved for the fake busy-wait timer.

/// Interrupt number used by the fake timer to force a CPU wake even while
/// globally locked. Never a real peripheral line.
pub const PHONY_HARD_IRQ: u32 = u32::MAX;

#[derive(Debug, Clone)]
pub struct IntCtrl {
    instance: u32,
    /// External line level as last driven by a peripheral (level IRQs only).
    lines: u64,
    /// Pended-before-mask.
    premask: u64,
    /// `premask & mask`: what the CPU actually sees as pending.
    status: u64,
    /// Per-line enable mask.
    mask: u64,
    /// Per-line priority, 0 = highest. Defaults to 255 (lowest).
    prio: [u8; 64],
    currently_running_prio: i32,
    locked: bool,
    lock_ignore: bool,
    /// Set for one delta cycle when this instance wants to wake the CPU.
    awaking_cpu: bool,
}

impl IntCtrl {
    pub fn new(instance: u32) -> Self {
        IntCtrl {
            instance,
            lines: 0,
            premask: 0,
            status: 0,
            mask: 0,
            prio: [255; 64],
            currently_running_prio: 256,
            locked: false,
            lock_ignore: false,
            awaking_cpu: false,
        }
    }

    fn bit(line: u32) -> u64 {
        debug_assert!(line < 64);
        1u64 << line
    }

    pub fn prio_set(&mut self, line: u32, prio: u8) {
        self.prio[line as usize] = prio;
    }

    pub fn get_prio(&self, line: u32) -> u8 {
        self.prio[line as usize]
    }

    pub fn set_cur_prio(&mut self, prio: i32) {
        self.currently_running_prio = prio;
    }

    pub fn get_cur_prio(&self) -> i32 {
        self.currently_running_prio
    }

    /// Take and clear the "wants to wake the CPU this delta cycle" flag.
    pub fn take_awaking_cpu(&mut self) -> bool {
        std::mem::take(&mut self.awaking_cpu)
    }

    fn maybe_wake(&mut self) {
        if !self.locked || self.lock_ignore {
            self.lock_ignore = false;
            self.awaking_cpu = true;
        }
    }

    /// Edge/pulse pend: `set_pulse`/`set_irq` in the original.
    pub fn set_pulse(&mut self, line: u32) {
        if line == PHONY_HARD_IRQ {
            self.lock_ignore = true;
            self.maybe_wake();
            return;
        }
        let bit = Self::bit(line);
        self.premask |= bit;
        if self.mask & bit != 0 {
            self.status |= bit;
        }
        self.maybe_wake();
    }

    /// Level IRQ raise: idempotent, toggled by `toggle_level_if`.
    pub fn raise_level(&mut self, line: u32) {
        let bit = Self::bit(line);
        if self.lines & bit == 0 {
            self.lines |= bit;
            self.set_pulse(line);
        }
    }

    /// Level IRQ lower: only clears the external line, not premask/status
    /// (§4.2 invariant: "status bits outlive the external line").
    pub fn lower_level(&mut self, line: u32) {
        self.lines &= !Self::bit(line);
    }

    /// Track a peripheral's own "driving the line high" edge and call
    /// raise/lower accordingly.
    pub fn toggle_level_if(&mut self, currently_high: &mut bool, new_level: bool, line: u32) {
        if new_level == *currently_high {
            return;
        }
        *currently_high = new_level;
        if new_level {
            self.raise_level(line);
        } else {
            self.lower_level(line);
        }
    }

    /// Called when the CPU exits the ISR for `line`: re-pend if the
    /// external line is still high.
    pub fn reeval_level(&mut self, line: u32) {
        let bit = Self::bit(line);
        if self.lines & bit != 0 {
            self.premask |= bit;
            if self.mask & bit != 0 {
                self.status |= bit;
            }
        }
    }

    pub fn enable(&mut self, line: u32) {
        let bit = Self::bit(line);
        self.mask |= bit;
        if self.premask & bit != 0 {
            self.status |= bit;
            self.maybe_wake();
        }
    }

    pub fn disable(&mut self, line: u32) {
        self.mask &= !Self::bit(line);
        self.status &= !Self::bit(line);
    }

    pub fn clear(&mut self, line: u32) {
        let bit = Self::bit(line);
        self.status &= !bit;
        self.premask &= !bit;
    }

    pub fn is_pending(&self, line: u32) -> bool {
        self.status & Self::bit(line) != 0
    }

    pub fn status_word(&self) -> u64 {
        self.status
    }

    pub fn change_lock(&mut self, new_lock: bool) -> bool {
        let old = self.locked;
        self.locked = new_lock;
        if old && !new_lock && self.status != 0 {
            self.maybe_wake();
        }
        old
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// Highest-priority pending line with priority strictly better than
    /// `currently_running_prio`, or `None`.
    pub fn highest_pending(&self) -> Option<u32> {
        if self.locked {
            return None;
        }
        let mut winner = None;
        let mut winner_prio = 256i32;
        let mut bits = self.status;
        while bits != 0 {
            let line = bits.trailing_zeros();
            bits &= !(1u64 << line);
            let p = self.prio[line as usize] as i32;
            if winner_prio > p && self.currently_running_prio > p {
                winner = Some(line);
                winner_prio = p;
            }
        }
        winner
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spec §8 S6.
    #[test]
    fn priority_and_lock_scenario() {
        let mut ic = IntCtrl::new(0);
        ic.prio_set(4, 1);
        ic.prio_set(5, 0);
        ic.enable(4);
        ic.enable(5);
        ic.set_pulse(4);
        ic.set_pulse(5);
        assert_eq!(ic.highest_pending(), Some(5));

        ic.change_lock(true);
        ic.prio_set(3, 0);
        ic.enable(3);
        ic.set_pulse(3);
        assert!(!ic.take_awaking_cpu());

        let was_locked = ic.change_lock(false);
        assert!(was_locked);
        assert!(ic.take_awaking_cpu());
    }

    #[test]
    fn status_equals_premask_and_mask() {
        let mut ic = IntCtrl::new(0);
        ic.set_pulse(2);
        assert!(!ic.is_pending(2));
        ic.enable(2);
        assert!(ic.is_pending(2));
    }

    #[test]
    fn lower_level_keeps_status_pending() {
        let mut ic = IntCtrl::new(0);
        ic.enable(1);
        ic.raise_level(1);
        assert!(ic.is_pending(1));
        ic.lower_level(1);
        assert!(ic.is_pending(1));
    }

    #[test]
    fn toggle_level_net_noop_within_same_handler() {
        let mut ic = IntCtrl::new(0);
        ic.enable(6);
        let mut driving = false;
        ic.toggle_level_if(&mut driving, true, 6);
        ic.toggle_level_if(&mut driving, false, 6);
        assert!(!driving);
    }

    #[test]
    fn phony_irq_bypasses_lock() {
        let mut ic = IntCtrl::new(0);
        ic.change_lock(true);
        ic.set_pulse(PHONY_HARD_IRQ);
        assert!(ic.take_awaking_cpu());
    }
}
