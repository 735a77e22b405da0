// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port validation scenarios: auto-negotiation, FEC, dynamic port breakout
//! and MTU. Each registers itself in [`registry`] and runs against a
//! [`harness::Context`].

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(
    clippy::doc_markdown,
    clippy::missing_errors_doc,
    clippy::must_use_candidate
)]

pub mod autoneg;
pub mod capabilities;
pub mod dependencies;
pub mod dpb;
pub mod errors;
pub mod fec;
pub mod nvue_mtu;
pub mod observe;
pub mod reboot;
pub mod registry;

pub use errors::ScenarioError;
pub use registry::{ScenarioDecl, all, find};

use tracectl::trace_target;
trace_target!("scenarios", LevelFilter::INFO, &["scenario"]);
