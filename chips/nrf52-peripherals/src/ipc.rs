//! IPC (§4.9): cross-domain signalling via SEND_CNF/RECEIVE_CNF channel
//! bitmasks, independent of DPPI.

pub struct Ipc {
    instance: u32,
    n_channels: usize,
    send_cnf: Vec<u32>,
    receive_cnf: Vec<u32>,
    receive_event: Vec<bool>,
}

impl Ipc {
    pub fn new(instance: u32, n_channels: usize) -> Self {
        Ipc {
            instance,
            n_channels,
            send_cnf: vec![0; n_channels],
            receive_cnf: vec![0; n_channels],
            receive_event: vec![false; n_channels],
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn set_send_cnf(&mut self, i: usize, mask: u32) {
        self.send_cnf[i] = mask;
    }

    pub fn set_receive_cnf(&mut self, j: usize, mask: u32) {
        self.receive_cnf[j] = mask;
    }

    /// TASK_SEND\[i\]: every RECEIVE_CNF\[j\] whose bitmask intersects
    /// SEND_CNF\[i\] raises EVENTS_RECEIVE\[j\] (§4.9).
    pub fn task_send(&mut self, i: usize) -> Vec<usize> {
        let bits = self.send_cnf[i];
        let mut fired = Vec::new();
        for j in 0..self.n_channels {
            if self.receive_cnf[j] & bits != 0 {
                self.receive_event[j] = true;
                fired.push(j);
            }
        }
        fired
    }

    pub fn events_receive(&self, j: usize) -> bool {
        self.receive_event[j]
    }

    pub fn clear_receive(&mut self, j: usize) {
        self.receive_event[j] = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn send_fans_out_to_every_matching_receiver() {
        let mut ipc = Ipc::new(0, 4);
        ipc.set_send_cnf(0, 0b0001);
        ipc.set_receive_cnf(1, 0b0001);
        ipc.set_receive_cnf(2, 0b0010);
        let fired = ipc.task_send(0);
        assert_eq!(fired, vec![1]);
        assert!(ipc.events_receive(1));
        assert!(!ipc.events_receive(2));
    }
}
