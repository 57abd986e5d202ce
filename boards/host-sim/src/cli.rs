//! Command-line surface (§6), parsed at `PreBoot1`. Generalizes the
//! teacher's builder-API `emulation_config.rs` to `clap`'s derive API,
//! since this simulator's flag surface is wide and mostly optional.

use clap::Parser;
use sim_engine::FatalError;
use std::path::PathBuf;

/// A `<i>=<path>`-style per-instance argument, as used for UART logging
/// and FIFO backend paths.
#[derive(Debug, Clone)]
pub struct IndexedPath {
    pub index: u32,
    pub path: PathBuf,
}

impl std::str::FromStr for IndexedPath {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (idx, path) = s.split_once('=').ok_or_else(|| format!("expected <i>=<path>, got {s:?}"))?;
        let index = idx.parse().map_err(|_| format!("bad instance index {idx:?}"))?;
        Ok(IndexedPath { index, path: PathBuf::from(path) })
    }
}

#[derive(Parser, Debug)]
#[command(name = "host-sim", about = "nRF52/53/54 peripheral behavioral simulator")]
pub struct Args {
    /// Path to the firmware image to load.
    pub firmware: Option<PathBuf>,

    /// CSV byte log of transmitted bytes per UART instance.
    #[arg(long = "uart-log-txfile", value_name = "i=path")]
    pub uart_log_txfile: Vec<IndexedPath>,

    /// CSV byte log of received bytes per UART instance.
    #[arg(long = "uart-log-rxfile", value_name = "i=path")]
    pub uart_log_rxfile: Vec<IndexedPath>,

    /// FIFO backend tx pipe path, paired with `--uart-fifob-rxfile`.
    #[arg(long = "uart-fifob-txfile", value_name = "i=path")]
    pub uart_fifob_txfile: Vec<IndexedPath>,

    /// FIFO backend rx pipe path.
    #[arg(long = "uart-fifob-rxfile", value_name = "i=path")]
    pub uart_fifob_rxfile: Vec<IndexedPath>,

    /// Instances (by index) to wire with the loopback backend.
    #[arg(long = "uart-loopback", value_name = "i")]
    pub uart_loopback: Vec<u32>,

    #[arg(long = "uart-fifob-no-terminate")]
    pub uart_fifob_no_terminate: bool,

    /// NOP cadence bound in microseconds, 1..=1_000_000.
    #[arg(long = "uart-fifob-mdt", default_value_t = 10_000)]
    pub uart_fifob_mdt: u64,

    #[arg(long = "gpio-in-file")]
    pub gpio_in_file: Option<PathBuf>,

    #[arg(long = "gpio-out-file")]
    pub gpio_out_file: Option<PathBuf>,

    #[arg(long = "gpio-conf-file")]
    pub gpio_conf_file: Option<PathBuf>,

    #[arg(long = "flash-file")]
    pub flash_file: Option<PathBuf>,

    #[arg(long = "flash-erase")]
    pub flash_erase: bool,

    #[arg(long = "flash-rm")]
    pub flash_rm: bool,

    #[arg(long = "flash-in-ram")]
    pub flash_in_ram: bool,

    #[arg(long = "uicr-file")]
    pub uicr_file: Option<PathBuf>,

    #[arg(long = "uicr-erase")]
    pub uicr_erase: bool,

    #[arg(long = "uicr-rm")]
    pub uicr_rm: bool,

    #[arg(long = "rram-file")]
    pub rram_file: Option<PathBuf>,

    #[arg(long = "rram-erase")]
    pub rram_erase: bool,

    #[arg(long = "rram-rm")]
    pub rram_rm: bool,

    /// Fractional drift of device time relative to phy time; warns above
    /// 3e-4, errors above 1e-2 (§C.1).
    #[arg(long = "xo-drift", default_value_t = 0.0)]
    pub xo_drift: f64,

    #[arg(long = "flash-erase-warnings")]
    pub flash_erase_warnings: bool,

    #[arg(short = 'v', long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

pub const XO_DRIFT_WARN_THRESHOLD: f64 = 3e-4;
pub const XO_DRIFT_FATAL_THRESHOLD: f64 = 1e-2;

impl Args {
    pub fn parse_and_validate() -> Result<Args, FatalError> {
        let args = Args::parse();
        args.validate()?;
        Ok(args)
    }

    fn validate(&self) -> Result<(), FatalError> {
        if !(1..=1_000_000).contains(&self.uart_fifob_mdt) {
            return Err(FatalError::new(
                "cli",
                None,
                format!("--uart-fifob-mdt must be in 1..=1_000_000, got {}", self.uart_fifob_mdt),
            ));
        }
        if self.xo_drift.abs() > XO_DRIFT_FATAL_THRESHOLD {
            return Err(FatalError::new(
                "cli",
                None,
                format!("--xo-drift {} exceeds fatal threshold {XO_DRIFT_FATAL_THRESHOLD}", self.xo_drift),
            ));
        }
        if self.xo_drift.abs() > XO_DRIFT_WARN_THRESHOLD {
            log::warn!("--xo-drift {} exceeds recommended threshold {XO_DRIFT_WARN_THRESHOLD}", self.xo_drift);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexed_path_parses_key_equals_value() {
        let p: IndexedPath = "2=/tmp/uart2.csv".parse().unwrap();
        assert_eq!(p.index, 2);
        assert_eq!(p.path, PathBuf::from("/tmp/uart2.csv"));
    }

    #[test]
    fn indexed_path_rejects_missing_equals() {
        assert!("no-equals-here".parse::<IndexedPath>().is_err());
    }
}
