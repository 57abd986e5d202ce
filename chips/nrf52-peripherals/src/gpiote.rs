//! GPIOTE (§4.6): per-channel Event/Task state machines wired to a GPIO
//! port's pin-change listener and output ownership.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Disabled,
    Event,
    Task,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    None,
    LoToHi,
    HiToLo,
    Toggle,
}

#[derive(Debug, Clone, Copy, Default)]
struct Channel {
    mode_is_task: bool,
    enabled: bool,
    port: u32,
    pin: u32,
    polarity: Polarity2,
    last_level: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Polarity2 {
    #[default]
    None,
    LoToHi,
    HiToLo,
    Toggle,
}

impl From<Polarity> for Polarity2 {
    fn from(p: Polarity) -> Self {
        match p {
            Polarity::None => Polarity2::None,
            Polarity::LoToHi => Polarity2::LoToHi,
            Polarity::HiToLo => Polarity2::HiToLo,
            Polarity::Toggle => Polarity2::Toggle,
        }
    }
}

pub struct Gpiote {
    instance: u32,
    channels: Vec<Channel>,
}

impl Gpiote {
    pub fn new(instance: u32, n_channels: usize) -> Self {
        Gpiote {
            instance,
            channels: vec![Channel::default(); n_channels],
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// Configure channel `n` as an input-change listener on `(port, pin)`.
    /// Returns the cookie the GPIO port should record as this pin's
    /// listener (§4.6 Event mode).
    pub fn configure_event(&mut self, n: usize, port: u32, pin: u32, polarity: Polarity, initial_level: bool) -> u32 {
        self.channels[n] = Channel {
            mode_is_task: false,
            enabled: true,
            port,
            pin,
            polarity: polarity.into(),
            last_level: initial_level,
        };
        Self::cookie(n)
    }

    /// Configure channel `n` as a task output on `(port, pin)`; the caller
    /// is expected to take pin ownership via `peri_pin_control` and set
    /// the initial level from OUTINIT.
    pub fn configure_task(&mut self, n: usize, port: u32, pin: u32, polarity: Polarity, outinit: bool) {
        self.channels[n] = Channel {
            mode_is_task: true,
            enabled: true,
            port,
            pin,
            polarity: polarity.into(),
            last_level: outinit,
        };
    }

    pub fn disable(&mut self, n: usize) {
        self.channels[n] = Channel::default();
    }

    pub fn mode(&self, n: usize) -> Mode {
        let c = &self.channels[n];
        if !c.enabled {
            Mode::Disabled
        } else if c.mode_is_task {
            Mode::Task
        } else {
            Mode::Event
        }
    }

    fn cookie(n: usize) -> u32 {
        n as u32
    }

    /// Called by the `World` when the GPIO port this channel listens on
    /// reports a pin change. Returns `true` if EVENTS_IN\[n\] should fire.
    pub fn on_pin_change(&mut self, n: usize, new_level: bool) -> bool {
        let c = &mut self.channels[n];
        if !c.enabled || c.mode_is_task {
            return false;
        }
        let was = c.last_level;
        c.last_level = new_level;
        match c.polarity {
            Polarity2::None => false,
            Polarity2::LoToHi => !was && new_level,
            Polarity2::HiToLo => was && !new_level,
            Polarity2::Toggle => was != new_level,
        }
    }

    /// TASKS_OUT\[n\]: applies `polarity` (toggle, or to-high/to-low for
    /// the non-toggle polarities) and returns the new level to drive.
    pub fn task_out(&mut self, n: usize) -> bool {
        let c = &mut self.channels[n];
        let new_level = match c.polarity {
            Polarity2::LoToHi => true,
            Polarity2::HiToLo => false,
            Polarity2::Toggle | Polarity2::None => !c.last_level,
        };
        c.last_level = new_level;
        new_level
    }

    pub fn task_set(&mut self, n: usize) -> bool {
        self.channels[n].last_level = true;
        true
    }

    pub fn task_clr(&mut self, n: usize) -> bool {
        self.channels[n].last_level = false;
        false
    }

    pub fn channel_pin(&self, n: usize) -> (u32, u32) {
        (self.channels[n].port, self.channels[n].pin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lo_to_hi_polarity_fires_only_on_rising_edge() {
        let mut g = Gpiote::new(0, 8);
        g.configure_event(0, 0, 3, Polarity::LoToHi, false);
        assert!(g.on_pin_change(0, true));
        assert!(!g.on_pin_change(0, true));
        assert!(!g.on_pin_change(0, false));
    }

    #[test]
    fn toggle_polarity_fires_on_change() {
        let mut g = Gpiote::new(0, 8);
        g.configure_event(0, 0, 3, Polarity::Toggle, false);
        assert!(g.on_pin_change(0, true));
        assert!(g.on_pin_change(0, false));
    }

    #[test]
    fn task_out_toggles_from_last_level() {
        let mut g = Gpiote::new(0, 8);
        g.configure_task(0, 0, 1, Polarity::Toggle, false);
        assert!(g.task_out(0));
        assert!(!g.task_out(0));
    }

    #[test]
    fn disabling_resets_mode() {
        let mut g = Gpiote::new(0, 8);
        g.configure_task(0, 0, 1, Polarity::Toggle, false);
        g.disable(0);
        assert_eq!(g.mode(0), Mode::Disabled);
    }
}
