// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The setup a run works on: which devices there are, how to reach them,
//! which ports they have and how those ports are cabled.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod errors;
pub mod player;
pub mod topology;

pub use errors::TopologyError;
pub use player::{ChipType, ConnectionInfo, Player, PlayerKind};
pub use topology::{DUT, PortRef, Topology};

use tracectl::trace_target;
trace_target!("topology", LevelFilter::INFO, &[]);
