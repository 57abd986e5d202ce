// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright Western Digital 2023.

#![forbid(unsafe_code)]
#![no_std]

pub mod aes_gcm;
