// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Typed wrappers of the command lines of the devices of a setup: SONiC
//! switches, NVUE devices and Linux hosts. Every operation issues one or a
//! few commands over an [`engine::Engine`] and parses what comes back.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod errors;
mod exec;
pub mod linux;
pub mod nvue;
#[cfg(test)]
mod recorder;
pub mod sonic;

pub use errors::CommandError;
pub use linux::LinuxCli;
pub use nvue::{NvueCli, OutputFormat, nvue_path};
pub use sonic::{BREAKOUT_SUCCESS, DOCKERS, PortState, RebootKind, SonicCli, VlanMode};

use tracectl::trace_target;
trace_target!("commands", LevelFilter::INFO, &["devices"]);
