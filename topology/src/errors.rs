// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TopologyError {
    #[error("Failed to read topology file {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("Invalid topology: {0}")]
    Yaml(#[from] serde_yaml_ng::Error),
    #[error("Alias '{0}' is declared more than once")]
    DuplicateAlias(String),
    #[error("Unknown port alias '{0}'")]
    UnknownAlias(String),
    #[error("Unknown player '{0}'")]
    UnknownPlayer(String),
    #[error("Port alias '{0}' is cabled more than once")]
    DuplicateInterconnect(String),
    #[error("Alias '{0}' cannot be cabled to itself")]
    SelfInterconnect(String),
    #[error("The topology has no 'dut' player")]
    MissingDut,
}
