// Licensed under the Apache License, Version 2.0 or the MIT License.
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Host-process driver: parses the CLI, wires peripheral backends, runs
//! lifecycle hooks, then alternates firmware execution with
//! `World::advance_and_dispatch` until no peripheral has a pending
//! deadline. Generalizes the teacher's `host_emulation::main` reset/run
//! split without its process/syscall machinery, which this simulator has
//! no use for.

use host_sim::{cli, world};
use sim_engine::Phase;
use std::process::ExitCode;
use world::World;

fn main() -> ExitCode {
    env_logger::init();

    let args = match cli::Args::parse_and_validate() {
        Ok(args) => args,
        Err(e) => {
            eprintln!("fatal: {e}");
            return ExitCode::FAILURE;
        }
    };

    let mut world = World::new();
    world.run_lifecycle(Phase::PreBoot1);
    world.run_lifecycle(Phase::PreBoot2);
    world.run_lifecycle(Phase::HwInit);

    run_loop(&mut world);

    world.run_lifecycle(Phase::OnExitPre);
    let _ = args.firmware;
    ExitCode::SUCCESS
}

/// Cooperative scheduling loop (§5): advance to the next deadline and
/// dispatch it to completion; repeat until nothing is armed. There is no
/// OS-thread concurrency here — one deadline is handled at a time.
fn run_loop(world: &mut World) {
    loop {
        let t = world.advance_and_dispatch();
        if t == sim_engine::TIME_NEVER {
            break;
        }
    }
}
