// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use crate::errors::HarnessError;
use std::fmt::{Display, Formatter};

/// The result of a check, with a message and an optional value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Outcome<T = ()> {
    pub result: bool,
    pub info: String,
    pub returned_value: Option<T>,
}

impl<T> Outcome<T> {
    pub fn ok(value: T) -> Self {
        Outcome {
            result: true,
            info: String::new(),
            returned_value: Some(value),
        }
    }

    pub fn fail(info: impl Into<String>) -> Self {
        Outcome {
            result: false,
            info: info.into(),
            returned_value: None,
        }
    }

    #[must_use]
    pub fn with_info(mut self, info: impl Into<String>) -> Self {
        self.info = info.into();
        self
    }

    /// Turn a failed outcome into an error.
    pub fn verify(self) -> Result<Option<T>, HarnessError> {
        if self.result {
            Ok(self.returned_value)
        } else {
            Err(HarnessError::Failed(self.info))
        }
    }
}

impl<T, E: Display> From<Result<T, E>> for Outcome<T> {
    fn from(result: Result<T, E>) -> Self {
        match result {
            Ok(value) => Outcome::ok(value),
            Err(e) => Outcome::fail(e.to_string()),
        }
    }
}

impl<T> Display for Outcome<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let status = if self.result { "PASS" } else { "FAIL" };
        if self.info.is_empty() {
            write!(f, "{status}")
        } else {
            write!(f, "{status}: {}", self.info)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_outcome() {
        let ok = Outcome::ok(3).with_info("3 ports up");
        assert_eq!(ok.to_string(), "PASS: 3 ports up");
        assert_eq!(ok.verify().unwrap(), Some(3));

        let failed: Outcome<u32> = Outcome::fail("Ethernet0 is down");
        assert_eq!(failed.to_string(), "FAIL: Ethernet0 is down");
        assert!(matches!(failed.verify(), Err(HarnessError::Failed(m)) if m == "Ethernet0 is down"));

        let from: Outcome<()> = Err::<(), _>(HarnessError::MissingEngine("hb".into())).into();
        assert!(!from.result);
        assert_eq!(from.info, "No engine for player 'hb'");
    }
}
