// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::num::NonZero;
use std::str::FromStr;

/// The MTU a switch interface accepts.
#[derive(Copy, Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
#[repr(transparent)]
pub struct Mtu(NonZero<u32>);

impl Mtu {
    pub const MIN_U32: u32 = 552;
    pub const MAX_U32: u32 = 9216;
    pub const DEFAULT_U32: u32 = 1500;

    #[allow(clippy::unwrap_used)] // const eval
    pub const MIN: Mtu = Mtu(NonZero::new(Self::MIN_U32).unwrap());
    #[allow(clippy::unwrap_used)] // const eval
    pub const MAX: Mtu = Mtu(NonZero::new(Self::MAX_U32).unwrap());
    /// What an interface runs with until configured otherwise.
    #[allow(clippy::unwrap_used)] // const eval
    pub const DEFAULT: Mtu = Mtu(NonZero::new(Self::DEFAULT_U32).unwrap());

    #[must_use]
    pub fn to_u32(&self) -> u32 {
        self.0.get()
    }
}

impl Default for Mtu {
    fn default() -> Self {
        Self::DEFAULT
    }
}

impl TryFrom<u32> for Mtu {
    type Error = ModelError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        if !(Self::MIN_U32..=Self::MAX_U32).contains(&value) {
            return Err(ModelError::InvalidMtu {
                value,
                min: Self::MIN_U32,
                max: Self::MAX_U32,
            });
        }
        Ok(Mtu(NonZero::new(value).unwrap_or_else(|| unreachable!())))
    }
}

impl FromStr for Mtu {
    type Err = ModelError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let value = input.trim().parse::<u32>().map_err(|_| ModelError::InvalidMtu {
            value: 0,
            min: Self::MIN_U32,
            max: Self::MAX_U32,
        })?;
        Mtu::try_from(value)
    }
}

impl From<Mtu> for u32 {
    fn from(value: Mtu) -> Self {
        value.0.get()
    }
}

impl Display for Mtu {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.get())
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mtu_oob_rejects() {
        assert!(Mtu::try_from(Mtu::MIN_U32 - 1).is_err());
        assert!(Mtu::try_from(Mtu::MAX_U32 + 1).is_err());
        assert!(Mtu::try_from(256).is_err());
        assert!(Mtu::try_from(9218).is_err());
        assert_eq!(Mtu::try_from(9200).unwrap().to_u32(), 9200);
    }

    #[test]
    fn mtu_default_and_parse() {
        assert_eq!(Mtu::default().to_u32(), 1500);
        assert_eq!(Mtu::from_str(" 9100 ").unwrap().to_string(), "9100");
        assert!(Mtu::from_str("jumbo").is_err());
    }
}
