// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use model::ModelError;
use thiserror::Error;
use topology::TopologyError;

/// Errors building a simulated lab.
#[derive(Debug, Error)]
pub enum SimError {
    #[error("No port description for switch '{0}'")]
    MissingSwitch(String),
    #[error("Port {port} cannot start in mode {mode}: not one of its modes")]
    DefaultMode { port: String, mode: String },
    #[error("Port {0} is described twice")]
    DuplicatePort(String),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
