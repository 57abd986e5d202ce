//! Tx-to-Rx loopback backend (§4.7): every transmitted byte is delivered
//! straight back to the same instance's Rx path.

use nrf52_peripherals::uart::{Uart, UartBackend, UartEvent};
use sim_engine::SimTime;

pub struct LoopbackBackend {
    /// Byte queued by `tx_byte`, delivered into Rx on the next `deliver`
    /// call (the core decides the timing; this backend only decides the
    /// wiring).
    pending: Option<u8>,
}

impl LoopbackBackend {
    pub fn new() -> Self {
        LoopbackBackend { pending: None }
    }

    pub fn take_pending(&mut self) -> Option<u8> {
        self.pending.take()
    }

    pub fn deliver_into(&mut self, uart: &mut Uart, now: SimTime) -> Vec<UartEvent> {
        match self.pending.take() {
            Some(byte) => uart.backend_deliver_byte(byte, now).unwrap_or_default(),
            None => Vec::new(),
        }
    }
}

impl Default for LoopbackBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl UartBackend for LoopbackBackend {
    fn tx_byte(&mut self, _instance: u32, byte: u8) {
        self.pending = Some(byte);
    }

    fn rts_pin_toggle(&mut self, _instance: u32, _level: bool) {}

    fn uart_enable_notify(&mut self, _instance: u32, _tx_on: bool, _rx_on: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    // Spec §8 S3.
    #[test]
    fn byte_sent_on_tx_arrives_on_rx() {
        let mut be = LoopbackBackend::new();
        let mut u = Uart::new(0);
        u.set_baudrate(0x0100_0000);
        u.task_starttx(0, &mut be);
        u.task_startrx(0, &mut be);
        u.write_txd(0xA5, 0, &mut be);
        let tx_events = u.fire(40);
        assert!(tx_events.contains(&UartEvent::TxDrdy));
        let rx_events = be.deliver_into(&mut u, 40);
        assert!(rx_events.contains(&UartEvent::RxDrdy));
        assert_eq!(u.read_rxd(), Some(0xA5));
    }
}
