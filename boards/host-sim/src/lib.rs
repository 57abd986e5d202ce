// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Library half of the `host-sim` crate, split out from the `main.rs`
//! binary purely so integration tests under `tests/` can drive `World`
//! directly instead of spawning the process.

pub mod cli;
pub mod world;
