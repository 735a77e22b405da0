// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Errors produced when parsing or combining model values

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ModelError {
    #[error("Invalid speed '{0}'")]
    InvalidSpeed(String),
    #[error("Invalid interface type '{0}'")]
    InvalidInterfaceType(String),
    #[error("Invalid FEC mode '{0}'")]
    InvalidFecMode(String),
    #[error("Invalid auto-negotiation mode '{0}'")]
    InvalidAutoNeg(String),
    #[error("Invalid breakout mode '{0}'")]
    InvalidBreakoutMode(String),
    #[error("Invalid port name '{0}'")]
    InvalidPortName(String),
    #[error("MTU out of range [{min}, {max}]: {value}")]
    InvalidMtu { value: u32, min: u32, max: u32 },
    #[error("No capability information for port '{0}'")]
    UnknownPort(String),
    #[error("Breakout mode {mode} does not fit the {lanes} lanes of port {port}")]
    LaneMismatch {
        port: String,
        mode: String,
        lanes: usize,
    },
}
