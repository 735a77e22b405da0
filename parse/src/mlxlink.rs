// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `mlxlink` outputs: `Key : value` lines grouped under dashed headings.

use model::{AutoNeg, FecMode, Speed, SpeedSet};
use ordermap::OrderMap;
use regex::Regex;
use std::str::FromStr;
use std::sync::LazyLock;

static ANSI_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\x1b\[[0-9;]*m").unwrap_or_else(|_| unreachable!()));
static CABLE_SPEED_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)G_\d+X").unwrap_or_else(|_| unreachable!()));

pub const STATE: &str = "State";
pub const SPEED: &str = "Speed";
pub const WIDTH: &str = "Width";
pub const FEC: &str = "FEC";
pub const AUTO_NEGOTIATION: &str = "Auto Negotiation";
pub const CABLE_SPEEDS: &str = "Supported Cable Speed (Ext.)";

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MlxlinkInfo(OrderMap<String, String>);

impl MlxlinkInfo {
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }
    #[must_use]
    pub fn fields(&self) -> &OrderMap<String, String> {
        &self.0
    }
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.get(STATE) == Some("Active")
    }
    #[must_use]
    pub fn speed(&self) -> Option<Speed> {
        self.get(SPEED).and_then(|s| Speed::from_str(s).ok())
    }
    /// The lane width of the link, printed as `4x`.
    #[must_use]
    pub fn width(&self) -> Option<u8> {
        self.get(WIDTH)
            .and_then(|w| w.trim_end_matches('x').parse::<u8>().ok())
    }
    #[must_use]
    pub fn fec(&self) -> Option<FecMode> {
        self.get(FEC).and_then(|f| FecMode::from_mlxlink(f).ok())
    }
    #[must_use]
    pub fn autoneg(&self) -> Option<AutoNeg> {
        self.get(AUTO_NEGOTIATION)
            .and_then(|a| AutoNeg::from_str(&a.to_ascii_lowercase()).ok())
    }
    /// Speeds the plugged cable supports, from `0x.. (100G_4X,50G_2X,...)`.
    #[must_use]
    pub fn cable_speeds(&self) -> SpeedSet {
        self.get(CABLE_SPEEDS)
            .map(|v| {
                CABLE_SPEED_RE
                    .captures_iter(v)
                    .filter_map(|c| c[1].parse::<u32>().ok())
                    .map(Speed::from_gbps)
                    .collect()
            })
            .unwrap_or_default()
    }
}

/// Parse `mlxlink -d <dev> -p <port>` output. Color escapes are removed and
/// the first occurrence of a key wins.
#[must_use]
pub fn parse_mlxlink(output: &str) -> MlxlinkInfo {
    let clean = ANSI_RE.replace_all(output, "");
    let mut fields = OrderMap::new();
    for line in clean.lines() {
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            if key.is_empty() {
                continue;
            }
            fields
                .entry(key.to_string())
                .or_insert_with(|| value.trim().to_string());
        }
    }
    MlxlinkInfo(fields)
}

#[cfg(test)]
mod tests {
    use super::*;

    const MLXLINK: &str = "
Operational Info
----------------
State                           : \x1b[1;32mActive\x1b[0m
Physical state                  : LinkUp
Speed                           : 100G
Width                           : 4x
FEC                             : Standard RS-FEC - RS(528,514)
Loopback Mode                   : No Loopback
Auto Negotiation                : ON

Supported Info
--------------
Enabled Link Speed (Ext.)       : 0x000007f2 (100G_4X,50G_2X,25G,10G,1G)
Supported Cable Speed (Ext.)    : 0x000007f2 (100G_4X,50G_2X,40G_4X)
";

    #[test]
    fn test_parse_mlxlink() {
        let info = parse_mlxlink(MLXLINK);
        assert!(info.is_active());
        assert_eq!(info.get("Physical state"), Some("LinkUp"));
        assert_eq!(info.speed(), Some(Speed::from_gbps(100)));
        assert_eq!(info.width(), Some(4));
        assert_eq!(info.fec(), Some(FecMode::Rs));
        assert_eq!(info.autoneg(), Some(AutoNeg::Enabled));
        let speeds: Vec<_> = info.cable_speeds().iter().map(Speed::as_gbps).collect();
        assert_eq!(speeds, vec![40, 50, 100]);
    }

    #[test]
    fn test_link_down() {
        let info = parse_mlxlink("State : Polling\nSpeed : N/A\nFEC : N/A\n");
        assert!(!info.is_active());
        assert_eq!(info.speed(), None);
        assert_eq!(info.fec(), None);
        assert!(info.cable_speeds().is_empty());
    }
}
