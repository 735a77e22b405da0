// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::fmt::{Display, Formatter};
use thiserror::Error;
use topology::TopologyError;

/// A teardown action that did not complete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CleanupFailure {
    pub label: String,
    pub error: String,
}

impl Display for CleanupFailure {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.label, self.error)
    }
}

fn join_failures(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("Unexpected {key}: expected '{expected}', got '{actual}'")]
    Mismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("{} cleanup action(s) failed: {}", .0.len(), join_failures(.0))]
    Cleanup(Vec<CleanupFailure>),
    #[error("{0}")]
    Failed(String),
    #[error("No engine for player '{0}'")]
    MissingEngine(String),
    #[error(transparent)]
    Topology(#[from] TopologyError),
}
