//! RRAMC (§4.8): resistive RAM controller. Every operation is
//! instantaneous; writes overwrite directly rather than bit-ANDing.

use sim_engine::FatalError;

pub struct Rramc {
    instance: u32,
    rram: Vec<u8>,
    uicr: Vec<u8>,
}

impl Rramc {
    pub fn new(instance: u32, rram_size: usize, uicr_size: usize) -> Self {
        Rramc {
            instance,
            rram: vec![0xFF; rram_size],
            uicr: vec![0xFF; uicr_size],
        }
    }

    pub fn instance(&self) -> u32 {
        self.instance
    }

    /// READY/READYNEXT are wired to 1 permanently (§4.8).
    pub fn ready(&self) -> bool {
        true
    }

    pub fn word_write(&mut self, addr: usize, value: u32) -> Result<(), FatalError> {
        if addr % 4 != 0 || addr + 4 > self.rram.len() {
            return Err(FatalError::new(
                "rramc",
                Some(self.instance),
                format!("invalid rram write at {addr:#x}"),
            ));
        }
        self.rram[addr..addr + 4].copy_from_slice(&value.to_le_bytes());
        Ok(())
    }

    pub fn read_word(&self, addr: usize) -> u32 {
        let mut bytes = [0u8; 4];
        bytes.copy_from_slice(&self.rram[addr..addr + 4]);
        u32::from_le_bytes(bytes)
    }

    pub fn task_eraseall(&mut self) {
        self.rram.fill(0xFF);
        self.uicr.fill(0xFF);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn write_overwrites_directly_not_bit_and() {
        let mut r = Rramc::new(0, 4096, 512);
        r.word_write(0, 0b1010).unwrap();
        r.word_write(0, 0b1100).unwrap();
        assert_eq!(r.read_word(0), 0b1100);
    }

    #[test]
    fn ready_is_always_true() {
        let r = Rramc::new(0, 4096, 512);
        assert!(r.ready());
    }

    #[test]
    fn eraseall_zeroes_to_ff() {
        let mut r = Rramc::new(0, 4096, 512);
        r.word_write(0, 0).unwrap();
        r.task_eraseall();
        assert_eq!(r.read_word(0), 0xFFFF_FFFF);
    }
}
