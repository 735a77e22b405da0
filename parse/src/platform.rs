// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `platform.json` and `config_db.json`: the port capability data a switch
//! ships with and its running port configuration.

use crate::errors::ParseError;
use model::port::port_number;
use model::{BreakoutMode, PortBreakoutInfo, Speed};
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::str::FromStr;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformPort {
    pub index: String,
    pub lanes: String,
    #[serde(default)]
    pub breakout_modes: BTreeMap<String, Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlatformJson {
    pub interfaces: BTreeMap<String, PlatformPort>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakoutCfg {
    pub brkout_mode: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortCfg {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alias: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lanes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mtu: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fec: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub admin_status: Option<String>,
}

/// The tables of the running configuration database this crate looks at.
/// Other tables are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigDb {
    #[serde(rename = "BREAKOUT_CFG", default)]
    pub breakout_cfg: BTreeMap<String, BreakoutCfg>,
    #[serde(rename = "PORT", default)]
    pub port: BTreeMap<String, PortCfg>,
}

impl ConfigDb {
    /// The breakout mode a port currently runs with.
    pub fn breakout_mode(&self, port: &str) -> Result<Option<BreakoutMode>, ParseError> {
        self.breakout_cfg
            .get(port)
            .map(|c| BreakoutMode::from_str(&c.brkout_mode))
            .transpose()
            .map_err(ParseError::from)
    }

    pub fn port_speed(&self, port: &str) -> Result<Option<Speed>, ParseError> {
        self.port
            .get(port)
            .and_then(|p| p.speed.as_deref())
            .map(Speed::from_str)
            .transpose()
            .map_err(ParseError::from)
    }
}

pub fn parse_config_db(output: &str) -> Result<ConfigDb, ParseError> {
    Ok(serde_json::from_str(output)?)
}

fn numbers(port: &str, what: &'static str, list: &str) -> Result<Vec<u32>, ParseError> {
    list.split(',')
        .map(|n| {
            n.trim().parse::<u32>().map_err(|_| ParseError::Malformed {
                what,
                line: format!("{port}: {list}"),
            })
        })
        .collect()
}

/// Ports ordered by their number, anything else last.
fn port_order(name: &str) -> (u32, String) {
    (port_number(name).unwrap_or(u32::MAX), name.to_string())
}

/// Breakout capabilities of every port of the platform, ordered by port
/// number. The default mode of a port is the one it runs in the given
/// configuration database.
pub fn parse_platform_json(
    platform: &str,
    config_db: &ConfigDb,
) -> Result<OrderMap<String, PortBreakoutInfo>, ParseError> {
    let platform: PlatformJson = serde_json::from_str(platform)?;
    let mut infos = Vec::with_capacity(platform.interfaces.len());
    for (port, def) in platform.interfaces {
        let breakout_modes = def
            .breakout_modes
            .keys()
            .map(|m| BreakoutMode::from_str(m))
            .collect::<Result<Vec<_>, _>>()?;
        let info = PortBreakoutInfo {
            index: numbers(&port, "port index", &def.index)?,
            lanes: numbers(&port, "port lanes", &def.lanes)?,
            breakout_modes,
            default_breakout_mode: config_db.breakout_mode(&port)?,
            port: port.clone(),
        };
        infos.push(info);
    }
    infos.sort_by_key(|i| port_order(&i.port));
    Ok(infos.into_iter().map(|i| (i.port.clone(), i)).collect())
}
