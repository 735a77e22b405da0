// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors produced while parsing device output

use model::ModelError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ParseError {
    #[error("No column separator line found in table output")]
    NoSeparator,
    #[error("No header line above the column separator")]
    NoHeader,
    #[error("Table has no column '{0}'")]
    MissingColumn(String),
    #[error("Continuation line without a preceding row: '{0}'")]
    OrphanContinuation(String),
    #[error("Malformed {what}: '{line}'")]
    Malformed { what: &'static str, line: String },
    #[error("Missing field '{0}'")]
    MissingField(String),
    #[error("Expected pattern '{pattern}' to be {}", if *.present { "present" } else { "absent" })]
    Expectation { pattern: String, present: bool },
    #[error("Invalid pattern: {0}")]
    Pattern(#[from] regex::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Model(#[from] ModelError),
}
