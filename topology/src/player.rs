// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The devices of a setup.

use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use strum::{Display as StrumDisplay, EnumString};

#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize, StrumDisplay, EnumString)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum PlayerKind {
    Sonic,
    Nvue,
    Linux,
}

/// Generation of the switch ASIC.
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, Ord, PartialOrd, Serialize, Deserialize, StrumDisplay, EnumString,
)]
#[serde(rename_all = "UPPERCASE")]
#[strum(serialize_all = "UPPERCASE")]
pub enum ChipType {
    Spc,
    Spc2,
    Spc3,
    Spc4,
    Spc5,
}

fn default_ssh_port() -> u16 {
    22
}

fn default_user() -> String {
    "admin".to_string()
}

/// How a player is reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    pub host: String,
    #[serde(default = "default_ssh_port")]
    pub port: u16,
    #[serde(default = "default_user")]
    pub user: String,
    /// Environment variable holding the password, when keys are not set up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_env: Option<String>,
}

impl Display for ConnectionInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    pub kind: PlayerKind,
    pub connection: ConnectionInfo,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chip_type: Option<ChipType>,
    /// Platform string, e.g. `x86_64-mlnx_msn3700-r0`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub platform: Option<String>,
    /// Port alias to port name.
    #[serde(default)]
    pub ports: OrderMap<String, String>,
}

impl Player {
    /// The alias of a port, from its name.
    pub fn alias_of(&self, port: &str) -> Option<&str> {
        self.ports
            .iter()
            .find(|(_, p)| p.as_str() == port)
            .map(|(a, _)| a.as_str())
    }
}
