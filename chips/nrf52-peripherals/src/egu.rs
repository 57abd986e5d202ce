//! EGU (§4.9): N task/event pairs; TASK_TRIGGER\[i\] directly pends
//! EVENTS_TRIGGERED\[i\] and routes to DPPI.

pub struct Egu {
    instance: u32,
    n: usize,
    triggered: Vec<bool>,
}

impl Egu {
    pub fn new(instance: u32, n: usize) -> Self {
        Egu { instance, n, triggered: vec![false; n] }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn task_trigger(&mut self, i: usize) {
        self.triggered[i] = true;
    }

    pub fn events_triggered(&self, i: usize) -> bool {
        self.triggered[i]
    }

    pub fn clear_event(&mut self, i: usize) {
        self.triggered[i] = false;
    }

    pub fn n(&self) -> usize {
        self.n
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trigger_sets_event_immediately() {
        let mut e = Egu::new(0, 16);
        e.task_trigger(3);
        assert!(e.events_triggered(3));
        e.clear_event(3);
        assert!(!e.events_triggered(3));
    }
}
