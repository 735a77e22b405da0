// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Crate to control tracing dynamically at runtime.
//!
//! Every crate of the workspace declares its tracing target with
//! [`trace_target!`]. Targets are collected at link time and can be grouped
//! under tags, so that the verbosity of, say, everything talking to devices
//! can be changed with a single `engine=debug`.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod control;
pub mod display;
pub mod errors;
pub mod targets;

// re-exports
pub use control::TracingControl;
pub use control::get_trace_ctl;
pub use errors::TraceCtlError;
pub use tracing_subscriber::filter::LevelFilter;
