// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Parsers for the outputs of SONiC, NVUE and Linux commands.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::module_name_repetitions)]

pub mod eeprom;
pub mod errors;
pub mod ethtool;
pub mod mlxlink;
pub mod nvue;
pub mod platform;
pub mod table;
pub mod text;

pub use eeprom::{Eeprom, EepromValue, parse_transceiver_eeprom};
pub use errors::ParseError;
pub use ethtool::{EthtoolInfo, parse_ethtool, parse_ethtool_fec};
pub use mlxlink::{MlxlinkInfo, parse_mlxlink};
pub use nvue::{nvue_field, nvue_u32, parse_nvue_json};
pub use platform::{ConfigDb, parse_config_db, parse_platform_json};
pub use table::{Row, Table, parse_show_table, parse_show_table_rows};
pub use text::{PingStats, alias_number, parse_ping, parse_ports_aliases, verify_show_cmd};

use tracectl::trace_target;
trace_target!("parse", LevelFilter::INFO, &[]);
