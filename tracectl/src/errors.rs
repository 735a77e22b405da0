// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TraceCtlError {
    #[error("Invalid tracing directive '{0}': it should be tag=level")]
    InvalidSyntax(String),
    #[error("Invalid level '{level}' for tag '{tag}'")]
    InvalidLevel { tag: String, level: String },
    #[error("Unknown tag '{0}'")]
    UnknownTag(String),
    #[error("Failed to install error report hooks: {0}")]
    ReportHooks(String),
}
