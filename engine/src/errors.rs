// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to run `{cmd}`")]
    Spawn {
        cmd: String,
        #[source]
        err: io::Error,
    },
    #[error("`{cmd}` exited with status {status}: {output}")]
    Exit {
        cmd: String,
        status: i32,
        output: String,
    },
    #[error("`{cmd}` did not complete within {timeout:?}")]
    Timeout { cmd: String, timeout: Duration },
    #[error("{host} did not answer after {tries} attempts")]
    Unreachable { host: String, tries: u32 },
    #[error("Password variable '{0}' is not set")]
    MissingPassword(String),
    #[error("Invalid engine parameters: {0}")]
    Params(String),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl EngineError {
    /// The output the device printed before failing, if any.
    #[must_use]
    pub fn output(&self) -> Option<&str> {
        match self {
            EngineError::Exit { output, .. } => Some(output),
            _ => None,
        }
    }
}
