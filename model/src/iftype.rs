// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Interface (cable) types such as `CR`, `CR4` or `SR2`

use crate::errors::ModelError;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InterfaceType(String);

impl InterfaceType {
    /// Copper type for a lane width: `CR`, `CR2`, `CR4`, `CR8`.
    #[must_use]
    pub fn cr(width: u8) -> InterfaceType {
        if width <= 1 {
            InterfaceType("CR".to_string())
        } else {
            InterfaceType(format!("CR{width}"))
        }
    }

    /// The number of lanes the type runs over, taken from its trailing digit.
    #[must_use]
    pub fn width(&self) -> u8 {
        self.0
            .chars()
            .last()
            .and_then(|c| c.to_digit(10))
            .and_then(|d| u8::try_from(d).ok())
            .filter(|d| *d > 0)
            .unwrap_or(1)
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for InterfaceType {
    type Err = ModelError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let s = input.trim();
        if s.is_empty() || !s.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(ModelError::InvalidInterfaceType(input.to_string()));
        }
        Ok(InterfaceType(s.to_ascii_uppercase()))
    }
}

impl TryFrom<String> for InterfaceType {
    type Error = ModelError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        InterfaceType::from_str(&value)
    }
}

impl From<InterfaceType> for String {
    fn from(value: InterfaceType) -> Self {
        value.0
    }
}

impl Display for InterfaceType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parse `CR,CR4` into types. `all` is not a list and is rejected.
pub fn parse_type_list(input: &str) -> Result<Vec<InterfaceType>, ModelError> {
    input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(InterfaceType::from_str)
        .collect()
}

#[must_use]
pub fn join_types<'a>(types: impl IntoIterator<Item = &'a InterfaceType>) -> String {
    types
        .into_iter()
        .map(InterfaceType::as_str)
        .collect::<Vec<_>>()
        .join(",")
}

/// The widest of the given types. Ties keep the first one seen.
pub fn widest_type<'a>(
    types: impl IntoIterator<Item = &'a InterfaceType>,
) -> Option<&'a InterfaceType> {
    types.into_iter().fold(None, |best, t| match best {
        Some(b) if b.width() >= t.width() => Some(b),
        _ => Some(t),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_width() {
        assert_eq!(InterfaceType::cr(1).width(), 1);
        assert_eq!(InterfaceType::cr(1).as_str(), "CR");
        assert_eq!(InterfaceType::cr(4).as_str(), "CR4");
        assert_eq!(InterfaceType::from_str("sr2").unwrap().width(), 2);
        assert_eq!(InterfaceType::from_str("25GBASE-CR").unwrap().width(), 1);
        assert!(InterfaceType::from_str("C R").is_err());
    }

    #[test]
    fn test_widest() {
        let types = parse_type_list("CR,CR4,CR2").unwrap();
        assert_eq!(widest_type(&types).unwrap().as_str(), "CR4");
        assert!(widest_type(&Vec::<InterfaceType>::new()).is_none());
    }
}
