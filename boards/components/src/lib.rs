#![no_std]

#[macro_use]
pub mod gpio;
#[macro_use]
pub mod led;
#[macro_use]
pub mod button;

pub mod alarm;
pub mod console;
pub mod crc;
pub mod debug_queue;
pub mod debug_writer;
pub mod hd44780;
pub mod isl29035;
pub mod lldb;
pub mod nrf51822;
pub mod panic_button;
pub mod process_console;
pub mod rng;
pub mod segger_rtt;
pub mod si7021;
pub mod spi;
