//! GPIO (§4.6): per-port pin state with layered overrides from other
//! peripherals, plus DETECT/LATCH for GPIOTE's EVENTS_PORT.

const N_PINS: usize = 32;
pub const MAX_SHORTS_PER_PIN: usize = 8;

#[derive(Debug, Clone, Copy, Default)]
struct PinOverride {
    dir: Option<bool>,
    out: Option<bool>,
    /// Forces the readable `IN` bit regardless of `IO_level` (used by
    /// peripherals that drive a pin's logical input directly, bypassing
    /// the physical level, e.g. loopback backends).
    input: Option<bool>,
    /// Cookie of the channel to notify when this pin's `IN` bit changes,
    /// routed by the owning `World` (mirrors the DPPI subscription design).
    listener: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DetectMode {
    Default,
    Ldetect,
}

pub struct GpioPort {
    instance: u32,
    dir_reg: u32,
    out_reg: u32,
    /// Bit set => pin input buffer disconnected (INPUT disable, §4.6).
    input_disconnect: u32,
    io_level: u32,
    in_reg: u32,
    overrides: [PinOverride; N_PINS],
    sense_enabled: u32,
    sense_inv: u32,
    detect_latch: u32,
    detect_mode: DetectMode,
    detect_signal: bool,
    /// Output→input short-circuits loaded from the GPIO conf file (§6):
    /// for each source pin, up to `MAX_SHORTS_PER_PIN` destination pins
    /// that mirror its output level.
    shorts: [Vec<u32>; N_PINS],
}

impl GpioPort {
    pub fn new(instance: u32) -> Self {
        GpioPort {
            instance,
            dir_reg: 0,
            out_reg: 0,
            input_disconnect: 0,
            io_level: 0,
            in_reg: 0,
            overrides: [PinOverride::default(); N_PINS],
            sense_enabled: 0,
            sense_inv: 0,
            detect_latch: 0,
            detect_mode: DetectMode::Default,
            detect_signal: false,
            shorts: std::array::from_fn(|_| Vec::new()),
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    fn effective_dir_bit(&self, pin: usize) -> bool {
        self.overrides[pin].dir.unwrap_or((self.dir_reg >> pin) & 1 != 0)
    }

    fn effective_out_bit(&self, pin: usize) -> bool {
        self.overrides[pin].out.unwrap_or((self.out_reg >> pin) & 1 != 0)
    }

    pub fn load_shorts(&mut self, source_pin: u32, dest_pins: Vec<u32>) {
        self.shorts[source_pin as usize] = dest_pins;
    }

    /// The "other peripherals drive a pin" entry point (§4.6): set any
    /// subset of the direction/output/input overrides, register a change
    /// listener cookie, and optionally force an output level immediately.
    #[allow(clippy::too_many_arguments)]
    pub fn peri_pin_control(
        &mut self,
        pin: usize,
        override_dir: Option<bool>,
        override_output: Option<bool>,
        override_input: Option<bool>,
        listener: Option<u32>,
        new_level: Option<bool>,
    ) -> Vec<u32> {
        let ov = &mut self.overrides[pin];
        if override_dir.is_some() {
            ov.dir = override_dir;
        }
        if override_output.is_some() {
            ov.out = override_output;
        }
        if override_input.is_some() {
            ov.input = override_input;
        }
        if listener.is_some() {
            ov.listener = listener;
        }
        if let Some(level) = new_level {
            self.set_out_bit(pin, level);
        }
        self.recompute_pin(pin)
    }

    fn set_out_bit(&mut self, pin: usize, level: bool) {
        if level {
            self.out_reg |= 1 << pin;
        } else {
            self.out_reg &= !(1 << pin);
        }
    }

    pub fn write_dir(&mut self, value: u32) -> Vec<u32> {
        self.dir_reg = value;
        self.recompute_all()
    }

    pub fn write_out(&mut self, value: u32) -> Vec<u32> {
        self.out_reg = value;
        self.recompute_all()
    }

    pub fn write_outset(&mut self, mask: u32) -> Vec<u32> {
        self.out_reg |= mask;
        self.recompute_all()
    }

    pub fn write_outclr(&mut self, mask: u32) -> Vec<u32> {
        self.out_reg &= !mask;
        self.recompute_all()
    }

    pub fn set_input_disconnect(&mut self, pin: usize, disconnected: bool) {
        if disconnected {
            self.input_disconnect |= 1 << pin;
        } else {
            self.input_disconnect &= !(1 << pin);
        }
    }

    pub fn set_sense(&mut self, pin: usize, enabled: bool, inverted: bool) {
        if enabled {
            self.sense_enabled |= 1 << pin;
        } else {
            self.sense_enabled &= !(1 << pin);
        }
        if inverted {
            self.sense_inv |= 1 << pin;
        } else {
            self.sense_inv &= !(1 << pin);
        }
    }

    pub fn set_detect_mode(&mut self, mode: DetectMode) {
        self.detect_mode = mode;
    }

    fn recompute_all(&mut self) -> Vec<u32> {
        let mut listeners = Vec::new();
        for pin in 0..N_PINS {
            listeners.extend(self.recompute_pin(pin));
        }
        listeners
    }

    /// Drive `IO_level` from the effective DIR/OUT, propagate any loaded
    /// conf-file shorts from an output pin into the destination pins'
    /// inputs, recompute `IN`, and collect the listener cookies for pins
    /// whose `IN` bit changed (§4.6).
    fn recompute_pin(&mut self, pin: usize) -> Vec<u32> {
        let mut changed_listeners = Vec::new();
        if self.effective_dir_bit(pin) {
            let level = self.effective_out_bit(pin);
            let was = (self.io_level >> pin) & 1 != 0;
            if level != was {
                if level {
                    self.io_level |= 1 << pin;
                } else {
                    self.io_level &= !(1 << pin);
                }
                for &dest in &self.shorts[pin].clone() {
                    changed_listeners.extend(self.apply_external_level(dest as usize, level));
                }
            }
        }
        changed_listeners.extend(self.recompute_in(pin));
        changed_listeners
    }

    /// A short-circuited destination pin, or an external stimulus backend,
    /// forces `IO_level` directly (it is not under this port's own DIR).
    pub fn apply_external_level(&mut self, pin: usize, level: bool) -> Vec<u32> {
        let was = (self.io_level >> pin) & 1 != 0;
        if level == was {
            return Vec::new();
        }
        if level {
            self.io_level |= 1 << pin;
        } else {
            self.io_level &= !(1 << pin);
        }
        self.recompute_in(pin)
    }

    fn recompute_in(&mut self, pin: usize) -> Vec<u32> {
        let bit = 1u64 << pin;
        let disconnected = self.input_disconnect & (bit as u32) != 0;
        let raw = if disconnected {
            false
        } else if let Some(forced) = self.overrides[pin].input {
            forced
        } else {
            (self.io_level >> pin) & 1 != 0
        };
        let was = (self.in_reg >> pin) & 1 != 0;
        let mut listeners = Vec::new();
        if raw != was {
            if raw {
                self.in_reg |= 1 << pin;
            } else {
                self.in_reg &= !(1 << pin);
            }
            if let Some(cookie) = self.overrides[pin].listener {
                listeners.push(cookie);
            }
            self.update_detect(pin);
        }
        listeners
    }

    fn update_detect(&mut self, pin: usize) {
        if self.sense_enabled & (1 << pin) == 0 {
            return;
        }
        let in_bit = (self.in_reg >> pin) & 1 != 0;
        let inv = self.sense_inv & (1 << pin) != 0;
        let detect_bit = in_bit ^ inv;
        if detect_bit {
            self.detect_latch |= 1 << pin;
        }
        self.reeval_detect_signal();
    }

    fn live_detect(&self) -> u32 {
        let mut live = 0u32;
        for pin in 0..N_PINS {
            if self.sense_enabled & (1 << pin) == 0 {
                continue;
            }
            let in_bit = (self.in_reg >> pin) & 1 != 0;
            let inv = self.sense_inv & (1 << pin) != 0;
            if in_bit ^ inv {
                live |= 1 << pin;
            }
        }
        live
    }

    /// Returns true if this recomputation produced a rising edge on the
    /// single per-port DETECT signal (which raises GPIOTE EVENTS_PORT).
    fn reeval_detect_signal(&mut self) -> bool {
        let selected = match self.detect_mode {
            DetectMode::Default => self.live_detect() != 0,
            DetectMode::Ldetect => self.detect_latch != 0,
        };
        let rose = selected && !self.detect_signal;
        self.detect_signal = selected;
        rose
    }

    /// Write-one-to-clear LATCH; while in LDETECT mode, if LATCH is
    /// written with any bit set and remains non-zero, EVENTS_PORT raises
    /// again (§4.6).
    pub fn write_latch_clear(&mut self, mask: u32) -> bool {
        self.detect_latch &= !mask;
        self.reeval_detect_signal()
    }

    pub fn in_reg(&self) -> u32 {
        self.in_reg
    }

    pub fn latch(&self) -> u32 {
        self.detect_latch
    }

    pub fn detect_signal(&self) -> bool {
        self.detect_signal
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn output_mode_drives_io_level_and_in() {
        let mut p = GpioPort::new(0);
        p.write_dir(1);
        let listeners = p.write_outset(1);
        assert!(listeners.is_empty());
        assert_eq!(p.in_reg() & 1, 1);
    }

    #[test]
    fn conf_file_short_propagates_output_to_input() {
        let mut p = GpioPort::new(0);
        p.load_shorts(0, vec![5]);
        p.write_dir(1);
        p.write_outset(1);
        assert_eq!((p.in_reg() >> 5) & 1, 1);
    }

    #[test]
    fn override_forces_direction_regardless_of_dir_reg() {
        let mut p = GpioPort::new(0);
        p.peri_pin_control(3, Some(true), Some(true), None, None, None);
        assert_eq!((p.in_reg() >> 3) & 1, 1);
    }

    #[test]
    fn input_disconnect_forces_in_low() {
        let mut p = GpioPort::new(0);
        p.write_dir(1);
        p.write_outset(1);
        p.set_input_disconnect(0, true);
        p.recompute_pin(0);
        assert_eq!(p.in_reg() & 1, 0);
    }

    #[test]
    fn latch_accumulates_and_clears() {
        let mut p = GpioPort::new(0);
        p.set_sense(2, true, false);
        p.peri_pin_control(2, Some(false), None, Some(true), None, None);
        assert_eq!(p.latch() & (1 << 2), 1 << 2);
        p.write_latch_clear(1 << 2);
        assert_eq!(p.latch() & (1 << 2), 0);
    }
}
