// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port capability model: speeds, interface types, FEC and auto-negotiation
//! modes, breakout modes and the capability tables used to derive mutually
//! supported settings across the two ends of a link.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod autoneg;
pub mod breakout;
pub mod capability;
pub mod errors;
pub mod fec;
pub mod iftype;
pub mod mtu;
pub mod port;
pub mod speed;

pub use autoneg::AutoNeg;
pub use breakout::{BreakoutMode, PortBreakoutInfo};
pub use capability::{FecTable, TypeTable};
pub use errors::ModelError;
pub use fec::FecMode;
pub use iftype::InterfaceType;
pub use mtu::Mtu;
pub use speed::{Speed, SpeedSet};
