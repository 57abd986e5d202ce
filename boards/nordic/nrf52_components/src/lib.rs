#![no_std]

pub mod ble;
pub mod lmic_spi;
pub mod startup;

pub use self::ble::BLEComponent;
pub use self::lmic_spi::LMICSpiComponent;
pub use self::lmic_spi::LoraSyscallComponent;
pub use self::startup::{
    NrfClockComponent, NrfStartupComponent, UartChannel, UartChannelComponent, UartPins,
};
