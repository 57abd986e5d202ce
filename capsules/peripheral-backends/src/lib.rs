// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Pluggable backends for the UART and GPIO peripheral models: the core
//! in `nrf52-peripherals` never touches a pipe, socket or file directly,
//! it only calls through the `UartBackend` trait or accepts parsed
//! stimulus/conf data from here.

pub mod gpio_files;
pub mod uart_fifo;
pub mod uart_loopback;
