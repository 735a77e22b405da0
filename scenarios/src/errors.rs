// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use commands::CommandError;
use engine::EngineError;
use harness::{CleanupFailure, Exhausted, HarnessError};
use model::ModelError;
use parse::ParseError;
use thiserror::Error;
use topology::TopologyError;

fn join_failures(failures: &[CleanupFailure]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

#[derive(Debug, Error)]
pub enum ScenarioError {
    #[error("Unexpected {key}: expected '{expected}', got '{actual}'")]
    Mismatch {
        key: String,
        expected: String,
        actual: String,
    },
    #[error("{label} still failing after {tries} tries: {last}")]
    Timeout {
        label: String,
        tries: u32,
        last: Box<ScenarioError>,
    },
    #[error(transparent)]
    Command(#[from] CommandError),
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Topology(#[from] TopologyError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error("Skipped: {0}")]
    Skipped(String),
    #[error("{0}")]
    Failed(String),
    #[error("{} cleanup action(s) failed: {}", .0.len(), join_failures(.0))]
    Cleanup(Vec<CleanupFailure>),
    #[error(transparent)]
    Harness(HarnessError),
}

impl ScenarioError {
    pub fn mismatch(key: &str, expected: impl ToString, actual: impl ToString) -> Self {
        ScenarioError::Mismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Whether the scenario did not run because the setup lacks something.
    pub fn is_skip(&self) -> bool {
        matches!(self, ScenarioError::Skipped(_))
    }
}

impl From<HarnessError> for ScenarioError {
    fn from(e: HarnessError) -> Self {
        match e {
            HarnessError::Mismatch {
                key,
                expected,
                actual,
            } => ScenarioError::Mismatch {
                key,
                expected,
                actual,
            },
            HarnessError::Cleanup(failures) => ScenarioError::Cleanup(failures),
            other => ScenarioError::Harness(other),
        }
    }
}

impl From<Exhausted<ScenarioError>> for ScenarioError {
    fn from(e: Exhausted<ScenarioError>) -> Self {
        ScenarioError::Timeout {
            label: e.label,
            tries: e.tries,
            last: Box::new(e.last),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conversions() {
        let e: ScenarioError = harness::compare_actual_and_expected("Speed", "25G", "10G")
            .unwrap_err()
            .into();
        assert!(matches!(&e, ScenarioError::Mismatch { key, .. } if key == "Speed"));

        let timeout: ScenarioError = Exhausted {
            label: "Ethernet0 up".to_string(),
            tries: 3,
            last: e,
        }
        .into();
        assert_eq!(
            timeout.to_string(),
            "Ethernet0 up still failing after 3 tries: Unexpected Speed: expected '25G', got '10G'"
        );

        let cleanup: ScenarioError = HarnessError::Cleanup(vec![CleanupFailure {
            label: "vlan 10".to_string(),
            error: "busy".to_string(),
        }])
        .into();
        assert_eq!(cleanup.to_string(), "1 cleanup action(s) failed: vlan 10: busy");
        assert!(ScenarioError::Skipped("no split 2 loopback".to_string()).is_skip());
    }
}
