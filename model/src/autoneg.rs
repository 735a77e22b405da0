// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Auto-negotiation mode of a port.
///
/// The switch spells it `enabled`/`disabled`, ethtool spells it `on`/`off`.
/// Both spellings parse; display uses the switch spelling.
#[derive(Copy, Clone, Debug, Default, Hash, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AutoNeg {
    Enabled,
    #[default]
    Disabled,
}

impl AutoNeg {
    #[must_use]
    pub fn is_enabled(self) -> bool {
        self == AutoNeg::Enabled
    }

    #[must_use]
    pub fn ethtool_str(self) -> &'static str {
        match self {
            AutoNeg::Enabled => "on",
            AutoNeg::Disabled => "off",
        }
    }

    #[must_use]
    pub fn sonic_str(self) -> &'static str {
        match self {
            AutoNeg::Enabled => "enabled",
            AutoNeg::Disabled => "disabled",
        }
    }
}

impl FromStr for AutoNeg {
    type Err = ModelError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "enabled" | "on" => Ok(AutoNeg::Enabled),
            "disabled" | "off" | "N/A" => Ok(AutoNeg::Disabled),
            other => Err(ModelError::InvalidAutoNeg(other.to_string())),
        }
    }
}

impl Display for AutoNeg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.sonic_str())
    }
}
