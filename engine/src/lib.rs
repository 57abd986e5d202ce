// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Time base, scheduler and lifecycle registry shared by every peripheral
//! in the simulator. Analogous to the teacher's `kernel` crate: this crate
//! owns no peripheral-specific state, only the primitives every peripheral
//! is built on top of.

pub mod error;
pub mod lifecycle;
pub mod logging;
pub mod scheduler;
pub mod time;

pub use error::FatalError;
pub use lifecycle::{LifecycleRegistry, Phase};
pub use scheduler::Scheduler;
pub use time::{SimTime, TIME_NEVER};
