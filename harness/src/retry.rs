// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Polling of device state until it converges.

use crate::errors::HarnessError;
use std::fmt::Display;

pub use engine::{Exhausted, retry::retry};

/// Compare one observed value against the expected one.
pub fn compare_actual_and_expected<T: PartialEq + Display + ?Sized>(
    key: &str,
    expected: &T,
    actual: &T,
) -> Result<(), HarnessError> {
    if expected == actual {
        Ok(())
    } else {
        Err(HarnessError::Mismatch {
            key: key.to_string(),
            expected: expected.to_string(),
            actual: actual.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_compare() {
        assert!(compare_actual_and_expected("Speed", "25G", "25G").is_ok());
        let err = compare_actual_and_expected("Speed", "25G", "10G").unwrap_err();
        assert_eq!(
            err.to_string(),
            "Unexpected Speed: expected '25G', got '10G'"
        );
    }
}
