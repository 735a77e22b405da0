// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `ethtool` outputs of the Linux peers.

use crate::errors::ParseError;
use model::{AutoNeg, FecMode, InterfaceType, Speed, SpeedSet};
use regex::Regex;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::LazyLock;

static LINK_MODE_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)base(\w+)/Full").unwrap_or_else(|_| unreachable!()));

/// What `ethtool <if>` reports about a host interface.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EthtoolInfo {
    pub speed: Option<Speed>,
    pub autoneg: AutoNeg,
    pub link_detected: bool,
    pub supported_speeds: SpeedSet,
    pub supported_types: BTreeSet<InterfaceType>,
    pub advertised_speeds: SpeedSet,
    pub advertised_types: BTreeSet<InterfaceType>,
    pub supported_fec: BTreeSet<FecMode>,
}

#[derive(Copy, Clone, PartialEq)]
enum Section {
    Supported,
    Advertised,
    Other,
}

fn fec_modes(value: &str) -> BTreeSet<FecMode> {
    value
        .split_whitespace()
        .filter_map(|m| FecMode::from_ethtool(m).ok())
        .collect()
}

/// Parse the output of `ethtool <if>`. Link modes are listed one per line
/// under their heading, e.g. `25000baseCR/Full`.
pub fn parse_ethtool(output: &str) -> Result<EthtoolInfo, ParseError> {
    let mut info = EthtoolInfo::default();
    let mut section = Section::Other;
    for line in output.lines() {
        let (key, value) = match line.split_once(':') {
            Some((k, v)) => {
                let key = k.trim();
                section = match key {
                    "Supported link modes" => Section::Supported,
                    "Advertised link modes" => Section::Advertised,
                    _ => Section::Other,
                };
                (Some(key), v.trim())
            }
            None => (None, line.trim()),
        };
        for caps in LINK_MODE_RE.captures_iter(value) {
            let speed = Speed::from_str(&caps[1])?;
            let iftype = InterfaceType::from_str(&caps[2])?;
            match section {
                Section::Supported => {
                    info.supported_speeds.insert(speed);
                    info.supported_types.insert(iftype);
                }
                Section::Advertised => {
                    info.advertised_speeds.insert(speed);
                    info.advertised_types.insert(iftype);
                }
                Section::Other => {}
            }
        }
        match key {
            Some("Speed") => {
                info.speed = value
                    .strip_suffix("Mb/s")
                    .and_then(|s| Speed::from_str(s).ok());
            }
            Some("Auto-negotiation") => info.autoneg = AutoNeg::from_str(value)?,
            Some("Link detected") => info.link_detected = value == "yes",
            Some("Supported FEC modes") => info.supported_fec = fec_modes(value),
            _ => {}
        }
    }
    Ok(info)
}

/// The active encoding reported by `ethtool --show-fec <if>`.
pub fn parse_ethtool_fec(output: &str) -> Result<FecMode, ParseError> {
    let line = output
        .lines()
        .find_map(|l| l.trim().strip_prefix("Active FEC encoding:"))
        .ok_or_else(|| ParseError::MissingField("Active FEC encoding".to_string()))?;
    let mode = line
        .split_whitespace()
        .next()
        .ok_or_else(|| ParseError::MissingField("Active FEC encoding".to_string()))?;
    Ok(FecMode::from_ethtool(mode)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ETHTOOL: &str = "Settings for enp131s0f1:
	Supported ports: [ FIBRE ]
	Supported link modes:   1000baseKX/Full
	                        10000baseCR/Full
	                        25000baseCR/Full
	                        100000baseCR4/Full
	Supported pause frame use: Symmetric
	Supports auto-negotiation: Yes
	Supported FEC modes: None	 BaseR	 RS
	Advertised link modes:  25000baseCR/Full
	                        100000baseCR4/Full
	Advertised pause frame use: Symmetric
	Advertised auto-negotiation: Yes
	Speed: 100000Mb/s
	Duplex: Full
	Auto-negotiation: on
	Link detected: yes
";

    #[test]
    fn test_parse_ethtool() {
        let info = parse_ethtool(ETHTOOL).unwrap();
        assert_eq!(info.speed, Some(Speed::from_gbps(100)));
        assert_eq!(info.autoneg, AutoNeg::Enabled);
        assert!(info.link_detected);
        assert_eq!(info.supported_speeds.len(), 4);
        assert_eq!(info.advertised_speeds.len(), 2);
        assert!(info.supported_types.contains(&InterfaceType::cr(4)));
        assert!(info.advertised_types.contains(&InterfaceType::cr(1)));
        assert_eq!(info.supported_fec.len(), 3);
    }

    #[test]
    fn test_unknown_speed() {
        let info = parse_ethtool("\tSpeed: Unknown!\n\tAuto-negotiation: off\n\tLink detected: no\n").unwrap();
        assert_eq!(info.speed, None);
        assert_eq!(info.autoneg, AutoNeg::Disabled);
        assert!(!info.link_detected);
    }

    #[test]
    fn test_show_fec() {
        let output = "FEC parameters for enp131s0f1:\nConfigured FEC encodings: Auto RS\nActive FEC encoding: RS\n";
        assert_eq!(parse_ethtool_fec(output).unwrap(), FecMode::Rs);
        assert!(parse_ethtool_fec("FEC parameters for eth0:\n").is_err());
    }
}
