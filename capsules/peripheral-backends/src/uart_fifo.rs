//! Inter-process UART backend (§6): a binary wire protocol over a pair of
//! host pipes/FIFOs, framed by a fixed `{ time: u64, msg_type: u32, size: u16 }`
//! header.

use nrf52_peripherals::uart::UartBackend;
use sim_engine::{FatalError, SimTime};
use std::io::{Read, Write};

const HEADER_LEN: usize = 8 + 4 + 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum MsgType {
    Nop = 0,
    ModeChange = 1,
    TxByte = 2,
    RtsCtsToggle = 3,
    Disconnect = 4,
}

impl MsgType {
    fn from_u32(v: u32) -> Option<Self> {
        match v {
            0 => Some(MsgType::Nop),
            1 => Some(MsgType::ModeChange),
            2 => Some(MsgType::TxByte),
            3 => Some(MsgType::RtsCtsToggle),
            4 => Some(MsgType::Disconnect),
            _ => None,
        }
    }
}

pub enum FifoEvent {
    TxByte(u8),
    RtsCtsToggle(bool),
    ModeChange { baudrate: u32, config: u32 },
    Disconnect,
}

/// `--uart_fifob_mdt`: NOP cadence bound (§6), default 10_000us. Keeps the
/// pipe flowing at no more than one-byte-time granularity.
pub struct FifoBackend<R, W> {
    instance: u32,
    rx: R,
    tx: W,
    /// `--uart_fifob_no_terminate`: a disconnect or short read becomes a
    /// self-disable instead of fatal (§C.4).
    no_terminate_on_disconnect: bool,
    disabled: bool,
}

impl<R: Read, W: Write> FifoBackend<R, W> {
    pub fn new(instance: u32, rx: R, tx: W, no_terminate_on_disconnect: bool) -> Self {
        FifoBackend { instance, rx, tx, no_terminate_on_disconnect, disabled: false }
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    fn write_header(&mut self, time: SimTime, msg_type: MsgType, size: u16) -> std::io::Result<()> {
        self.tx.write_all(&time.to_le_bytes())?;
        self.tx.write_all(&(msg_type as u32).to_le_bytes())?;
        self.tx.write_all(&size.to_le_bytes())
    }

    pub fn send_nop(&mut self, now: SimTime) -> Result<(), FatalError> {
        self.write_header(now, MsgType::Nop, 0).map_err(|e| self.io_error(e))
    }

    pub fn send_mode_change(&mut self, now: SimTime, baudrate: u32, config: u32) -> Result<(), FatalError> {
        self.write_header(now, MsgType::ModeChange, 8).map_err(|e| self.io_error(e))?;
        self.tx.write_all(&baudrate.to_le_bytes()).map_err(|e| self.io_error(e))?;
        self.tx.write_all(&config.to_le_bytes()).map_err(|e| self.io_error(e))
    }

    /// `time` is the instant the byte frame *ends* on the wire (§6).
    pub fn send_tx_byte(&mut self, frame_end: SimTime, byte: u8) -> Result<(), FatalError> {
        self.write_header(frame_end, MsgType::TxByte, 1).map_err(|e| self.io_error(e))?;
        self.tx.write_all(&[byte]).map_err(|e| self.io_error(e))
    }

    pub fn send_rts_cts_toggle(&mut self, now: SimTime, level: bool) -> Result<(), FatalError> {
        self.write_header(now, MsgType::RtsCtsToggle, 1).map_err(|e| self.io_error(e))?;
        self.tx.write_all(&[level as u8]).map_err(|e| self.io_error(e))
    }

    fn io_error(&mut self, e: std::io::Error) -> FatalError {
        if self.no_terminate_on_disconnect {
            self.disabled = true;
            log::warn!("uart{}: fifo backend self-disabled: {e}", self.instance);
        }
        FatalError::from(e)
    }

    /// Blocking read of one framed message. The peer is responsible for
    /// servicing the pipe in time (§5): this call may block.
    pub fn recv(&mut self) -> Result<FifoEvent, FatalError> {
        let mut header = [0u8; HEADER_LEN];
        if let Err(e) = self.rx.read_exact(&mut header) {
            if self.no_terminate_on_disconnect {
                self.disabled = true;
                return Ok(FifoEvent::Disconnect);
            }
            return Err(FatalError::from(e));
        }
        let msg_type_raw = u32::from_le_bytes(header[8..12].try_into().unwrap());
        let size = u16::from_le_bytes(header[12..14].try_into().unwrap()) as usize;
        let msg_type = MsgType::from_u32(msg_type_raw).ok_or_else(|| {
            FatalError::new("uart_fifo", Some(self.instance), format!("unknown msg_type {msg_type_raw}"))
        })?;
        let mut body = vec![0u8; size];
        if size > 0 {
            self.rx.read_exact(&mut body).map_err(|e| self.io_error(e))?;
        }
        match msg_type {
            MsgType::Nop => self.recv(),
            MsgType::Disconnect => Ok(FifoEvent::Disconnect),
            MsgType::TxByte => Ok(FifoEvent::TxByte(body[0])),
            MsgType::RtsCtsToggle => Ok(FifoEvent::RtsCtsToggle(body[0] != 0)),
            MsgType::ModeChange => {
                let baudrate = u32::from_le_bytes(body[0..4].try_into().unwrap());
                let config = u32::from_le_bytes(body[4..8].try_into().unwrap());
                Ok(FifoEvent::ModeChange { baudrate, config })
            }
        }
    }
}

impl<R: Read, W: Write> UartBackend for FifoBackend<R, W> {
    fn tx_byte(&mut self, _instance: u32, byte: u8) {
        if self.disabled {
            return;
        }
        if let Err(e) = self.send_tx_byte(0, byte) {
            log::warn!("uart{}: fifo tx_byte failed: {e}", self.instance);
        }
    }

    fn rts_pin_toggle(&mut self, _instance: u32, level: bool) {
        if self.disabled {
            return;
        }
        if let Err(e) = self.send_rts_cts_toggle(0, level) {
            log::warn!("uart{}: fifo rts toggle failed: {e}", self.instance);
        }
    }

    fn uart_enable_notify(&mut self, _instance: u32, _tx_on: bool, _rx_on: bool) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn tx_byte_frame_round_trips() {
        let mut buf = Vec::new();
        {
            let mut be = FifoBackend::new(0, Cursor::new(Vec::<u8>::new()), &mut buf, false);
            be.send_tx_byte(1234, 0xA5).unwrap();
        }
        assert_eq!(buf.len(), HEADER_LEN + 1);
        let time = u64::from_le_bytes(buf[0..8].try_into().unwrap());
        let msg_type = u32::from_le_bytes(buf[8..12].try_into().unwrap());
        let size = u16::from_le_bytes(buf[12..14].try_into().unwrap());
        assert_eq!(time, 1234);
        assert_eq!(msg_type, MsgType::TxByte as u32);
        assert_eq!(size, 1);
        assert_eq!(buf[14], 0xA5);
    }

    #[test]
    fn recv_skips_nops_transparently() {
        let mut wire = Vec::new();
        wire.extend_from_slice(&0u64.to_le_bytes());
        wire.extend_from_slice(&(MsgType::Nop as u32).to_le_bytes());
        wire.extend_from_slice(&0u16.to_le_bytes());
        wire.extend_from_slice(&5u64.to_le_bytes());
        wire.extend_from_slice(&(MsgType::TxByte as u32).to_le_bytes());
        wire.extend_from_slice(&1u16.to_le_bytes());
        wire.push(0x42);
        let mut be = FifoBackend::new(0, Cursor::new(wire), Vec::new(), false);
        match be.recv().unwrap() {
            FifoEvent::TxByte(b) => assert_eq!(b, 0x42),
            _ => panic!("expected TxByte"),
        }
    }

    #[test]
    fn disconnect_self_disables_in_no_terminate_mode() {
        let mut be = FifoBackend::new(0, Cursor::new(Vec::<u8>::new()), Vec::new(), true);
        let ev = be.recv().unwrap();
        assert!(matches!(ev, FifoEvent::Disconnect));
        assert!(be.is_disabled());
    }
}
