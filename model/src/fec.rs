// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forward error correction modes

use crate::errors::ModelError;
use crate::speed::Speed;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString, IntoStaticStr};

#[derive(
    Copy,
    Clone,
    Debug,
    Hash,
    Ord,
    PartialOrd,
    Eq,
    PartialEq,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
    Serialize,
    Deserialize,
)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
#[serde(rename_all = "lowercase")]
pub enum FecMode {
    Rs,
    Fc,
    None,
    Auto,
}

impl FecMode {
    /// The modes a link is tested with. `auto` resolves to one of these.
    pub const TESTED: [FecMode; 3] = [FecMode::Rs, FecMode::Fc, FecMode::None];

    /// Encoding name used by `ethtool --set-fec`.
    #[must_use]
    pub fn ethtool_encoding(self) -> &'static str {
        match self {
            FecMode::Rs => "rs",
            FecMode::Fc => "baser",
            FecMode::None => "off",
            FecMode::Auto => "auto",
        }
    }

    /// Parse a mode as the switch prints it; `N/A` is a port without FEC.
    pub fn from_sonic(input: &str) -> Result<FecMode, ModelError> {
        match input.trim() {
            "N/A" => Ok(FecMode::None),
            other => other
                .parse::<FecMode>()
                .map_err(|_| ModelError::InvalidFecMode(other.to_string())),
        }
    }

    /// Parse the encodings printed by ethtool (`RS`, `BaseR`, `Off`, `None`, `Auto`).
    pub fn from_ethtool(input: &str) -> Result<FecMode, ModelError> {
        match input.trim().to_ascii_lowercase().as_str() {
            "rs" => Ok(FecMode::Rs),
            "baser" | "fc" => Ok(FecMode::Fc),
            "off" | "none" => Ok(FecMode::None),
            "auto" => Ok(FecMode::Auto),
            _ => Err(ModelError::InvalidFecMode(input.to_string())),
        }
    }

    /// Parse the FEC description printed by mlxlink.
    pub fn from_mlxlink(input: &str) -> Result<FecMode, ModelError> {
        let lower = input.trim().to_ascii_lowercase();
        if lower.starts_with("no fec") || lower == "none" {
            Ok(FecMode::None)
        } else if lower.contains("firecode") || lower == "fc" {
            Ok(FecMode::Fc)
        } else if lower.contains("rs-fec") || lower.contains("rs(") || lower == "rs" {
            Ok(FecMode::Rs)
        } else {
            Err(ModelError::InvalidFecMode(input.to_string()))
        }
    }

    /// Description mlxlink prints for an operational mode.
    #[must_use]
    pub fn mlxlink_description(self) -> &'static str {
        match self {
            FecMode::Rs => "Standard RS-FEC - RS(528,514)",
            FecMode::Fc => "Firecode FEC",
            FecMode::None | FecMode::Auto => "No FEC",
        }
    }

    /// The mode `auto` settles on for a given link speed.
    #[must_use]
    pub fn resolve_auto(speed: Speed) -> FecMode {
        if speed >= Speed::from_gbps(25) && speed != Speed::from_gbps(40) {
            FecMode::Rs
        } else {
            FecMode::None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_fec_spellings() {
        assert_eq!(FecMode::from_str("RS").unwrap(), FecMode::Rs);
        assert_eq!(FecMode::from_str("none").unwrap(), FecMode::None);
        assert_eq!(FecMode::Fc.to_string(), "fc");
        assert_eq!(FecMode::from_ethtool("BaseR").unwrap(), FecMode::Fc);
        assert_eq!(FecMode::from_ethtool("Off").unwrap(), FecMode::None);
        assert_eq!(
            FecMode::from_mlxlink("Standard RS-FEC - RS(528,514)").unwrap(),
            FecMode::Rs
        );
        assert_eq!(FecMode::from_mlxlink("No FEC").unwrap(), FecMode::None);
        assert!(FecMode::from_ethtool("bogus").is_err());
        assert_eq!(FecMode::from_sonic("N/A").unwrap(), FecMode::None);
        assert_eq!(FecMode::from_sonic("auto").unwrap(), FecMode::Auto);
        assert!(FecMode::from_sonic("enable").is_err());
    }

    #[test]
    fn test_resolve_auto() {
        assert_eq!(FecMode::resolve_auto(Speed::from_gbps(100)), FecMode::Rs);
        assert_eq!(FecMode::resolve_auto(Speed::from_gbps(40)), FecMode::None);
        assert_eq!(FecMode::resolve_auto(Speed::from_gbps(10)), FecMode::None);
    }
}
