// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Device engines: run commands on switches and hosts.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod engine;
pub mod errors;
pub mod retry;
pub mod ssh;

pub use engine::{DEFAULT_CMD_TIMEOUT, Engine, SharedEngine};
pub use errors::EngineError;
pub use retry::{Exhausted, retry};
pub use ssh::{SshEngine, SshParams, SshParamsBuilder};

/// Target of the raw output of the device commands, off unless asked for.
pub const DEVICE_OUTPUT: &str = "device-output";

use tracectl::{custom_target, trace_target};
trace_target!("engine", LevelFilter::INFO, &["devices"]);
custom_target!(DEVICE_OUTPUT, LevelFilter::OFF, &["devices"]);
