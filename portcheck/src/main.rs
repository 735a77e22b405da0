// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

#![deny(clippy::all, clippy::pedantic)]
#![deny(rustdoc::all)]
#![allow(rustdoc::missing_crate_level_docs)]

mod devices;
mod runner;

use args::{CmdArgs, Parser};
use color_eyre::eyre::{WrapErr, eyre};
use std::process::ExitCode;
use topology::Topology;
use tracectl::{TracingControl, trace_target};
use tracing::{error, info};

trace_target!("portcheck", LevelFilter::INFO, &["scenario"]);

fn main() -> color_eyre::Result<ExitCode> {
    let args = CmdArgs::parse();
    let tctl = TracingControl::init_with_reports()?;
    if let Some(tracing) = args.tracing() {
        tctl.setup_from_string(tracing)
            .wrap_err("Invalid tracing configuration")?;
    }
    if args.show_tracing_tags() {
        tctl.dump_targets_by_tag();
        return Ok(ExitCode::SUCCESS);
    }
    if args.show_tracing_targets() {
        tctl.dump();
        return Ok(ExitCode::SUCCESS);
    }
    if args.list_scenarios() {
        for decl in scenarios::all() {
            println!("{:<28} {}", decl.name, decl.about);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let selected = runner::select(args.scenarios()).map_err(|e| eyre!(e))?;
    let (topology, engines) = if args.simulate() {
        devices::simulated(args.topology())?
    } else {
        let path = args
            .topology()
            .ok_or_else(|| eyre!("A topology is needed unless simulating"))?;
        let topology = Topology::from_file(path)
            .wrap_err_with(|| format!("Failed to load {}", path.display()))?;
        let engines = devices::ssh_engines(&topology)?;
        (topology, engines)
    };
    let seed = args.seed().unwrap_or_else(rand::random);
    info!("Running {} scenario(s) with seed {seed}", selected.len());

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let summary = runtime.block_on(async {
        let summary = runner::run(&selected, &topology, &engines, seed).await;
        devices::disconnect_all(&engines).await;
        summary
    });

    println!("{summary}");
    if summary.failed() > 0 {
        error!("{} scenario(s) failed, replay with --seed {seed}", summary.failed());
        return Ok(ExitCode::FAILURE);
    }
    Ok(ExitCode::SUCCESS)
}
