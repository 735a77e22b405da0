// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! `show interfaces transceiver eeprom`

use crate::errors::ParseError;
use ordermap::OrderMap;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EepromValue {
    Text(String),
    Section(OrderMap<String, String>),
}

impl EepromValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            EepromValue::Text(t) => Some(t),
            EepromValue::Section(_) => None,
        }
    }
}

/// Fields of a transceiver, including its `Status`.
pub type Eeprom = OrderMap<String, EepromValue>;

const FIELD_INDENT: usize = 8;
const NESTED_INDENT: usize = 16;

/// Parse transceiver information, indented by 0 (port), 8 (field) or 16
/// (field of a section) spaces. A field without a value opens a section.
pub fn parse_transceiver_eeprom(output: &str) -> Result<OrderMap<String, Eeprom>, ParseError> {
    let mut result: OrderMap<String, Eeprom> = OrderMap::new();
    let mut port: Option<String> = None;
    let mut section: Option<String> = None;
    let malformed = |line: &str| ParseError::Malformed {
        what: "transceiver eeprom",
        line: line.to_string(),
    };

    for line in output.lines().filter(|l| !l.trim().is_empty()) {
        let indent = line.len() - line.trim_start().len();
        let trimmed = line.trim();
        let (key, value) = match trimmed.split_once(": ") {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (trimmed.trim_end_matches(':'), None),
        };
        if indent == 0 {
            let mut fields = Eeprom::new();
            fields.insert(
                "Status".to_string(),
                EepromValue::Text(value.unwrap_or_default().to_string()),
            );
            result.insert(key.to_string(), fields);
            port = Some(key.to_string());
            section = None;
            continue;
        }
        let fields = port
            .as_ref()
            .and_then(|p| result.get_mut(p))
            .ok_or_else(|| malformed(line))?;
        if indent >= NESTED_INDENT {
            let Some(EepromValue::Section(nested)) = section.as_ref().and_then(|s| fields.get_mut(s))
            else {
                return Err(malformed(line));
            };
            nested.insert(key.to_string(), value.unwrap_or_default().to_string());
        } else if indent >= FIELD_INDENT {
            match value {
                Some(v) => {
                    fields.insert(key.to_string(), EepromValue::Text(v.to_string()));
                    section = None;
                }
                None => {
                    fields.insert(key.to_string(), EepromValue::Section(OrderMap::new()));
                    section = Some(key.to_string());
                }
            }
        } else {
            return Err(malformed(line));
        }
    }
    Ok(result)
}
