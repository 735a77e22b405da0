// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! JSON documents returned by `nv show ... --output json`.

use crate::errors::ParseError;
use serde_json::Value;

pub fn parse_nvue_json(output: &str) -> Result<Value, ParseError> {
    Ok(serde_json::from_str(output.trim())?)
}

/// Look a value up by its path of object keys.
#[must_use]
pub fn nvue_field<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(key))
}

/// A numeric field, whether NVUE printed it as a number or a string.
pub fn nvue_u32(value: &Value, path: &[&str]) -> Result<u32, ParseError> {
    let missing = || ParseError::MissingField(path.join("/"));
    let field = nvue_field(value, path).ok_or_else(missing)?;
    let number = match field {
        Value::Number(n) => n.as_u64(),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| u32::try_from(n).ok())
        .ok_or_else(|| ParseError::Malformed {
            what: "numeric field",
            line: field.to_string(),
        })
}
