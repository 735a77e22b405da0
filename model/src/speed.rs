// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Port speeds

use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// The speed of a port, in megabits per second.
///
/// Devices print speeds either in gigabit notation (`25G`) or as a plain
/// number of megabits (`25000`, as used by `advertised-speeds`). Both forms
/// parse into the same value.
#[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
#[repr(transparent)]
pub struct Speed(u32);

/// Speeds are almost always handled as ordered sets.
pub type SpeedSet = BTreeSet<Speed>;

impl Speed {
    #[must_use]
    pub const fn from_gbps(gbps: u32) -> Speed {
        Speed(gbps * 1000)
    }

    /// Build a speed from a value in megabits. Zero is not a speed.
    pub fn from_mbps(mbps: u32) -> Result<Speed, ModelError> {
        if mbps == 0 {
            return Err(ModelError::InvalidSpeed(mbps.to_string()));
        }
        Ok(Speed(mbps))
    }

    #[must_use]
    pub const fn as_mbps(&self) -> u32 {
        self.0
    }

    /// Speed in whole gigabits, truncated.
    #[must_use]
    pub const fn as_gbps(&self) -> u32 {
        self.0 / 1000
    }
}

impl FromStr for Speed {
    type Err = ModelError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        let bad = || ModelError::InvalidSpeed(input.to_string());
        let (digits, factor) = if let Some(g) = s.strip_suffix(['G', 'g']) {
            (g, 1000)
        } else if let Some(m) = s.strip_suffix(['M', 'm']) {
            (m, 1)
        } else {
            (s, 1)
        };
        let value = digits.parse::<u32>().map_err(|_| bad())?;
        let mbps = value.checked_mul(factor).ok_or_else(bad)?;
        Speed::from_mbps(mbps).map_err(|_| bad())
    }
}

impl TryFrom<String> for Speed {
    type Error = ModelError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Speed::from_str(&value)
    }
}

impl From<Speed> for String {
    fn from(value: Speed) -> Self {
        value.to_string()
    }
}

impl Display for Speed {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        if self.0 % 1000 == 0 {
            write!(f, "{}G", self.0 / 1000)
        } else {
            write!(f, "{}M", self.0)
        }
    }
}

/// Parse a comma separated list of speeds in either notation.
pub fn parse_speed_list(input: &str) -> Result<SpeedSet, ModelError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(Speed::from_str)
        .collect()
}

/// Render speeds as `10G,25G`, in ascending order.
#[must_use]
pub fn join_speeds<'a>(speeds: impl IntoIterator<Item = &'a Speed>) -> String {
    speeds
        .into_iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

/// Render speeds in megabits, the notation the switch expects for
/// advertised speeds (`10000,25000`).
#[must_use]
pub fn join_speeds_mbps<'a>(speeds: impl IntoIterator<Item = &'a Speed>) -> String {
    speeds
        .into_iter()
        .map(|s| s.as_mbps().to_string())
        .collect::<Vec<_>>()
        .join(",")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_speed_notations() {
        assert_eq!(Speed::from_str("25G").unwrap(), Speed::from_gbps(25));
        assert_eq!(Speed::from_str("25000").unwrap(), Speed::from_gbps(25));
        assert_eq!(Speed::from_str(" 100M ").unwrap().as_mbps(), 100);
        assert!(Speed::from_str("N/A").is_err());
        assert!(Speed::from_str("0").is_err());
        assert!(Speed::from_str("30X").is_err());
    }

    #[test]
    fn test_display_speed() {
        assert_eq!(Speed::from_gbps(400).to_string(), "400G");
        assert_eq!(Speed::from_mbps(100).unwrap().to_string(), "100M");
    }

    #[test]
    fn test_speed_lists() {
        let set = parse_speed_list("100000,10000, 25G").unwrap();
        assert_eq!(join_speeds(&set), "10G,25G,100G");
        assert_eq!(join_speeds_mbps(&set), "10000,25000,100000");
        assert!(parse_speed_list("10G,bad").is_err());
    }
}
