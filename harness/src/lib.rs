// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The scaffolding scenarios run on: bounded retries, comparisons, teardown
//! bookkeeping and the context holding the devices of the setup.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::missing_errors_doc, clippy::must_use_candidate)]

pub mod cleanup;
pub mod context;
pub mod errors;
pub mod observe;
pub mod outcome;
pub mod retry;

pub use cleanup::CleanupList;
pub use context::Context;
pub use errors::{CleanupFailure, HarnessError};
pub use observe::Observe;
pub use outcome::Outcome;
pub use retry::{Exhausted, compare_actual_and_expected, retry};

use tracectl::trace_target;
trace_target!("harness", LevelFilter::INFO, &["scenario"]);
