//! NVMC (§4.8): flash controller with bit-clearing writes and multi-cycle
//! erase timing, covering both the main flash array and UICR as a second
//! page-like region in the same backing store.

use sim_engine::{FatalError, SimTime, TIME_NEVER};
use std::collections::HashMap;

pub const PAGE_SIZE: usize = 4096;
const T_WRITE_US: u64 = 41;
const T_ERASEPAGE_US: u64 = 89_700;
const T_ERASEALL_US: u64 = 89_700;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FlashOp {
    Idle,
    Write,
    ErasePage(usize),
    EraseAll,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wen {
    Ren,
    Wen,
    Een,
}

pub struct Nvmc {
    instance: u32,
    flash: Vec<u8>,
    uicr: Vec<u8>,
    wen: Wen,
    op: FlashOp,
    deadline: SimTime,
    /// Accumulated partial-erase time per flash page, for
    /// ERASEPAGEPARTIAL (§4.8): a page only reads as erased once this
    /// crosses `T_ERASEPAGE_US`.
    partial_erase_us: HashMap<usize, u64>,
    pub flash_erase_warnings: bool,
}

impl Nvmc {
    pub fn new(instance: u32, flash_size: usize, uicr_size: usize) -> Self {
        Nvmc {
            instance,
            flash: vec![0xFF; flash_size],
            uicr: vec![0xFF; uicr_size],
            wen: Wen::Ren,
            op: FlashOp::Idle,
            deadline: TIME_NEVER,
            partial_erase_us: HashMap::new(),
            flash_erase_warnings: false,
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    pub fn set_config(&mut self, wen: Wen) {
        self.wen = wen;
    }

    pub fn ready(&self) -> bool {
        self.op == FlashOp::Idle
    }

    fn page_of(addr: usize) -> usize {
        addr / PAGE_SIZE
    }

    /// Word write: bit-ANDs into storage (flash can only clear bits),
    /// ignored with a warning unless `CONFIG.WEN == Wen` (§4.8, §7).
    pub fn word_write(&mut self, addr: usize, value: u32, now: SimTime) -> Result<(), FatalError> {
        if addr % 4 != 0 {
            return Err(FatalError::new(
                "nvmc",
                Some(self.instance),
                format!("unaligned flash write at {addr:#x}"),
            ));
        }
        if self.wen != Wen::Wen {
            return Ok(());
        }
        if addr + 4 > self.flash.len() {
            return Err(FatalError::new(
                "nvmc",
                Some(self.instance),
                format!("write out of bounds at {addr:#x}"),
            ));
        }
        let bytes = value.to_le_bytes();
        for i in 0..4 {
            self.flash[addr + i] &= bytes[i];
        }
        self.op = FlashOp::Write;
        self.deadline = now + T_WRITE_US;
        Ok(())
    }

    pub fn read_word(&self, addr: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.flash[addr..addr + 4]);
        u32::from_le_bytes(bytes)
    }

    pub fn task_erasepage(&mut self, page_addr: usize, now: SimTime) {
        self.op = FlashOp::ErasePage(Self::page_of(page_addr));
        self.deadline = now + T_ERASEPAGE_US;
    }

    /// Accumulates time-under-erase for the page; only flips to all-0xFF
    /// once the accumulated time crosses `T_ERASEPAGE_US` (§4.8).
    pub fn task_erasepagepartial(&mut self, page_addr: usize, dt_us: u64) {
        let page = Self::page_of(page_addr);
        let acc = self.partial_erase_us.entry(page).or_insert(0);
        *acc += dt_us;
        if *acc >= T_ERASEPAGE_US {
            let start = page * PAGE_SIZE;
            self.flash[start..start + PAGE_SIZE].fill(0xFF);
        }
    }

    pub fn task_eraseall(&mut self, now: SimTime) {
        self.op = FlashOp::EraseAll;
        self.deadline = now + T_ERASEALL_US;
    }

    pub fn task_erase_uicr(&mut self, now: SimTime) {
        self.uicr.fill(0xFF);
        self.op = FlashOp::Write;
        self.deadline = now + T_WRITE_US;
    }

    pub fn deadline(&self) -> SimTime {
        self.deadline
    }

    pub fn fire(&mut self, now: SimTime) {
        if self.deadline != now {
            return;
        }
        match self.op {
            FlashOp::ErasePage(page) => {
                let start = page * PAGE_SIZE;
                self.flash[start..start + PAGE_SIZE].fill(0xFF);
                self.partial_erase_us.remove(&page);
            }
            FlashOp::EraseAll => {
                self.flash.fill(0xFF);
                self.uicr.fill(0xFF);
                self.partial_erase_us.clear();
            }
            FlashOp::Write | FlashOp::Idle => {}
        }
        self.op = FlashOp::Idle;
        self.deadline = TIME_NEVER;
    }

    /// Is `addr`'s enclosing page mid-partial-erase but not yet flipped?
    /// Used by the reader to emit a `flash_erase_warnings`-gated advisory.
    pub fn partially_erased(&self, addr: usize) -> bool {
        let page = Self::page_of(addr);
        matches!(self.partial_erase_us.get(&page), Some(&t) if t > 0 && t < T_ERASEPAGE_US)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn erasepage_completion_yields_all_ff() {
        let mut n = Nvmc::new(0, PAGE_SIZE * 2, 4096);
        n.set_config(Wen::Wen);
        n.word_write(0, 0x00, 0).unwrap();
        n.task_erasepage(0, 0);
        n.fire(T_ERASEPAGE_US);
        assert_eq!(n.read_word(0), 0xFFFF_FFFF);
    }

    #[test]
    fn write_bit_ands_into_existing_value() {
        let mut n = Nvmc::new(0, PAGE_SIZE, 4096);
        n.set_config(Wen::Wen);
        n.word_write(0, 0b1010, 0).unwrap();
        n.word_write(0, 0b1100, 0).unwrap();
        assert_eq!(n.read_word(0), 0b1000);
    }

    #[test]
    fn write_ignored_when_not_wen() {
        let mut n = Nvmc::new(0, PAGE_SIZE, 4096);
        n.word_write(0, 0, 0).unwrap();
        assert_eq!(n.read_word(0), 0xFFFF_FFFF);
    }

    #[test]
    fn eraseall_clears_flash_and_uicr() {
        let mut n = Nvmc::new(0, PAGE_SIZE, 4096);
        n.set_config(Wen::Wen);
        n.word_write(0, 0, 0).unwrap();
        n.task_eraseall(0);
        n.fire(T_ERASEALL_US);
        assert_eq!(n.read_word(0), 0xFFFF_FFFF);
    }

    #[test]
    fn partial_erase_only_counts_once_threshold_crossed() {
        let mut n = Nvmc::new(0, PAGE_SIZE, 4096);
        n.set_config(Wen::Wen);
        n.word_write(0, 0, 0).unwrap();
        n.task_erasepagepartial(0, T_ERASEPAGE_US / 2);
        assert!(n.partially_erased(0));
        assert_eq!(n.read_word(0), 0);
        n.task_erasepagepartial(0, T_ERASEPAGE_US);
        assert_eq!(n.read_word(0), 0xFFFF_FFFF);
    }
}
