// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use engine::EngineError;
use model::ModelError;
use parse::ParseError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error(transparent)]
    Engine(#[from] EngineError),
    #[error(transparent)]
    Parse(#[from] ParseError),
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error("`{cmd}` was rejected: {output}")]
    Rejected { cmd: String, output: String },
    #[error("Unexpected output of `{cmd}`: {output}")]
    Unexpected { cmd: String, output: String },
    #[error("{port} is not listed by `{cmd}`")]
    MissingPort { cmd: String, port: String },
    #[error("{port} is {actual}, expected {expected}")]
    PortState {
        port: String,
        expected: String,
        actual: String,
    },
}

impl CommandError {
    /// What the device printed, when the failure comes with an output.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            CommandError::Engine(e) => e.output(),
            CommandError::Rejected { output, .. } | CommandError::Unexpected { output, .. } => {
                Some(output)
            }
            _ => None,
        }
    }
}
