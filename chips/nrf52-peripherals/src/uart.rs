//! UART / UART-E (§4.7): Standard and EasyDMA UART share one instance type.
//! Backends (FIFO wire protocol, loopback, §6) plug in through the
//! [`UartBackend`] trait; the core never talks to a pipe or socket itself.

use sim_engine::{FatalError, SimTime, TIME_NEVER};
use std::collections::VecDeque;

pub const RX_FIFO_DEPTH: usize = 6;
const RTS_ASSERT_THRESHOLD: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxState {
    Off,
    Idle,
    Pend,
    Txing,
    Stopping,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RxState {
    Off,
    TurningOff,
    On,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DmaState {
    Off,
    Dmaing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parity {
    None,
    Even,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopBits {
    One,
    Two,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HwFlowControl {
    Disabled,
    Enabled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UartEvent {
    TxDrdy,
    RxDrdy,
    RxTo,
    CtsRaised,
    TxStopped,
    EndRx,
    EndTx,
    RxStarted,
    TxStarted,
}

/// What the core asks a backend to do. The backend is owned by the
/// `World`'s board layer, not by `Uart` itself (mirrors the DPPI cookie
/// design: the core never stores a `Box<dyn Backend>` alongside the data
/// it would need `&mut World` to act on).
pub trait UartBackend {
    fn tx_byte(&mut self, instance: u32, byte: u8);
    fn rts_pin_toggle(&mut self, instance: u32, level: bool);
    fn uart_enable_notify(&mut self, instance: u32, tx_on: bool, rx_on: bool);
}

pub struct Uart {
    instance: u32,
    pub tx: TxState,
    pub rx: RxState,
    pub tx_dma: DmaState,
    pub rx_dma: DmaState,
    baudrate_reg: u32,
    parity: Parity,
    stop_bits: StopBits,
    hwfc: HwFlowControl,
    rx_fifo: VecDeque<u8>,
    rts_high: bool,
    cts_high: bool,
    pending_tx_byte: Option<u8>,
    tx_deadline: SimTime,
    rxto_deadline: SimTime,
    /// Window during which a backend-delivered byte is accepted; a byte
    /// arriving when Rx has been off for longer than one byte-time is
    /// dropped with a warning (§4.7 framing-error simulation).
    rx_enabled_since: Option<SimTime>,
}

impl Uart {
    pub fn new(instance: u32) -> Self {
        Uart {
            instance,
            tx: TxState::Off,
            rx: RxState::Off,
            tx_dma: DmaState::Off,
            rx_dma: DmaState::Off,
            baudrate_reg: 0x0100_0000,
            parity: Parity::None,
            stop_bits: StopBits::One,
            hwfc: HwFlowControl::Disabled,
            rx_fifo: VecDeque::new(),
            rts_high: false,
            cts_high: false,
            pending_tx_byte: None,
            tx_deadline: TIME_NEVER,
            rxto_deadline: TIME_NEVER,
            rx_enabled_since: None,
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn set_baudrate(&mut self, reg: u32) {
        self.baudrate_reg = reg;
    }

    pub fn set_config(&mut self, parity: Parity, stop_bits: StopBits, hwfc: HwFlowControl) {
        self.parity = parity;
        self.stop_bits = stop_bits;
        self.hwfc = hwfc;
    }

    /// Baud-rate register values are Q16.16 fixed-point "ticks per second at
    /// 16 MHz"; 0x0100_0000 is the documented encoding for 250 000 baud.
    fn baud(&self) -> u64 {
        match self.baudrate_reg {
            0x0004_0000 => 1200,
            0x0008_0000 => 2400,
            0x0010_0000 => 4800,
            0x0020_0000 => 9600,
            0x0075_0000 => 31250,
            0x009D_5000 => 38400,
            0x00EB_0000 => 57600,
            0x0100_0000 => 250_000,
            0x01D6_0000 => 115200,
            0x1000_0000 => 1_000_000,
            other => (other as u64 * 16_000_000) >> 32,
        }
    }

    fn bits_per_frame(&self) -> u64 {
        let data = 8;
        let parity = if self.parity == Parity::Even { 1 } else { 0 };
        let stop = if self.stop_bits == StopBits::Two { 2 } else { 1 };
        1 + data + parity + stop
    }

    /// One byte-time in microseconds.
    pub fn byte_time_us(&self) -> u64 {
        (self.bits_per_frame() * 1_000_000).div_ceil(self.baud().max(1))
    }

    pub fn task_starttx(&mut self, now: SimTime, backend: &mut dyn UartBackend) {
        self.tx = if self.cts_blocked() { TxState::Pend } else { TxState::Idle };
        backend.uart_enable_notify(self.instance, true, self.rx != RxState::Off);
        let _ = now;
    }

    pub fn task_startrx(&mut self, now: SimTime, backend: &mut dyn UartBackend) {
        self.rx = RxState::On;
        self.rx_enabled_since = Some(now);
        self.rxto_deadline = TIME_NEVER;
        backend.uart_enable_notify(self.instance, self.tx != TxState::Off, true);
    }

    pub fn task_stoptx(&mut self, now: SimTime) -> Vec<UartEvent> {
        match self.tx {
            TxState::Txing => {
                self.tx = TxState::Stopping;
                Vec::new()
            }
            _ => {
                self.tx = TxState::Off;
                self.pending_tx_byte = None;
                let _ = now;
                vec![UartEvent::TxStopped]
            }
        }
    }

    /// Schedules EVENTS_RXTO after 5 byte-times of real-HW hysteresis
    /// (§4.7).
    pub fn task_stoprx(&mut self, now: SimTime) {
        self.rx = RxState::TurningOff;
        self.rxto_deadline = now + 5 * self.byte_time_us();
    }

    fn cts_blocked(&self) -> bool {
        self.hwfc == HwFlowControl::Enabled && !self.cts_high
    }

    /// Write to TXD: begins transmitting a byte unless Tx is blocked by
    /// CTS, in which case it is queued as `Pend`.
    pub fn write_txd(&mut self, byte: u8, now: SimTime, backend: &mut dyn UartBackend) {
        if self.tx == TxState::Off {
            return;
        }
        if self.cts_blocked() {
            self.tx = TxState::Pend;
            self.pending_tx_byte = Some(byte);
            return;
        }
        self.start_tx_byte(byte, now, backend);
    }

    fn start_tx_byte(&mut self, byte: u8, now: SimTime, backend: &mut dyn UartBackend) {
        self.tx = TxState::Txing;
        self.pending_tx_byte = Some(byte);
        self.tx_deadline = now + self.byte_time_us();
        backend.tx_byte(self.instance, byte);
    }

    pub fn deadline(&self) -> SimTime {
        [self.tx_deadline, self.rxto_deadline].into_iter().min().unwrap_or(TIME_NEVER)
    }

    pub fn fire(&mut self, now: SimTime) -> Vec<UartEvent> {
        let mut events = Vec::new();
        if self.tx_deadline == now {
            self.tx_deadline = TIME_NEVER;
            events.push(UartEvent::TxDrdy);
            self.pending_tx_byte = None;
            self.tx = if self.tx == TxState::Stopping { TxState::Off } else { TxState::Idle };
            if self.tx == TxState::Off {
                events.push(UartEvent::TxStopped);
            }
        }
        if self.rxto_deadline == now {
            self.rxto_deadline = TIME_NEVER;
            self.rx = RxState::Off;
            self.rx_enabled_since = None;
            events.push(UartEvent::RxTo);
        }
        events
    }

    /// Backend pushes a received byte. Dropped (with a warning logged by
    /// the caller) if Rx has not been continuously enabled for at least
    /// one byte-time before `now`.
    pub fn backend_deliver_byte(&mut self, byte: u8, now: SimTime) -> Result<Vec<UartEvent>, FatalError> {
        let window_ok = matches!(self.rx_enabled_since, Some(since) if now >= since + self.byte_time_us());
        if !window_ok {
            return Ok(Vec::new());
        }
        if self.rx_fifo.len() >= RX_FIFO_DEPTH {
            return Err(FatalError::new(
                "uart",
                Some(self.instance),
                "rx fifo overrun".to_string(),
            ));
        }
        self.rx_fifo.push_back(byte);
        let mut events = vec![UartEvent::RxDrdy];
        if self.hwfc == HwFlowControl::Enabled && self.rx_fifo.len() >= RTS_ASSERT_THRESHOLD && !self.rts_high {
            self.rts_high = true;
            events.push(UartEvent::CtsRaised);
        }
        Ok(events)
    }

    pub fn read_rxd(&mut self) -> Option<u8> {
        let byte = self.rx_fifo.pop_front();
        if self.rx_fifo.is_empty() {
            self.rts_high = false;
        }
        byte
    }

    pub fn rx_fifo_len(&self) -> usize {
        self.rx_fifo.len()
    }

    pub fn rts_asserted(&self) -> bool {
        self.rts_high
    }

    /// Backend notifies a CTS edge. Lowering CTS while Tx is `Pend`
    /// immediately starts the queued byte and publishes EVENTS_CTS.
    pub fn backend_cts_edge(&mut self, raised: bool, now: SimTime, backend: &mut dyn UartBackend) -> Vec<UartEvent> {
        self.cts_high = raised;
        if !raised && self.tx == TxState::Pend {
            if let Some(byte) = self.pending_tx_byte.take() {
                self.start_tx_byte(byte, now, backend);
                return vec![UartEvent::CtsRaised];
            }
        }
        Vec::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct NullBackend;
    impl UartBackend for NullBackend {
        fn tx_byte(&mut self, _instance: u32, _byte: u8) {}
        fn rts_pin_toggle(&mut self, _instance: u32, _level: bool) {}
        fn uart_enable_notify(&mut self, _instance: u32, _tx_on: bool, _rx_on: bool) {}
    }

    // Spec §8 S3: 250000 baud, no parity, 1 stop bit -> 40us byte-time.
    #[test]
    fn byte_time_matches_250000_baud() {
        let mut u = Uart::new(0);
        u.set_baudrate(0x0100_0000);
        assert_eq!(u.byte_time_us(), 40);
    }

    #[test]
    fn tx_completes_after_one_byte_time() {
        let mut u = Uart::new(0);
        let mut be = NullBackend;
        u.set_baudrate(0x0100_0000);
        u.task_starttx(0, &mut be);
        u.task_startrx(0, &mut be);
        u.write_txd(0xA5, 0, &mut be);
        assert_eq!(u.deadline(), 40);
        let ev = u.fire(40);
        assert!(ev.contains(&UartEvent::TxDrdy));
    }

    #[test]
    fn rx_byte_outside_enable_window_is_dropped() {
        let mut u = Uart::new(0);
        let ev = u.backend_deliver_byte(0x10, 0).unwrap();
        assert!(ev.is_empty());
    }

    #[test]
    fn rts_asserts_at_two_bytes_in_fifo() {
        let mut u = Uart::new(0);
        let mut be = NullBackend;
        u.set_config(Parity::None, StopBits::One, HwFlowControl::Enabled);
        u.task_startrx(0, &mut be);
        u.backend_deliver_byte(1, 100).unwrap();
        assert!(!u.rts_asserted());
        u.backend_deliver_byte(2, 100).unwrap();
        assert!(u.rts_asserted());
    }

    #[test]
    fn cts_lowered_while_pend_starts_queued_byte() {
        let mut u = Uart::new(0);
        let mut be = NullBackend;
        u.set_config(Parity::None, StopBits::One, HwFlowControl::Enabled);
        u.task_starttx(0, &mut be);
        assert_eq!(u.tx, TxState::Pend);
        u.write_txd(0x42, 0, &mut be);
        assert_eq!(u.tx, TxState::Pend);
        u.backend_cts_edge(false, 0, &mut be);
        assert_eq!(u.tx, TxState::Txing);
    }
}
