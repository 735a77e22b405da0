// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::show;
use model::iftype::join_types;
use model::speed::join_speeds_mbps;
use model::{AutoNeg, InterfaceType, SpeedSet};
use parse::{Table, parse_show_table};
use std::collections::BTreeSet;

/// Value of advertised speeds and types meaning everything the port supports.
pub const ADVERTISE_ALL: &str = "all";

impl SonicCli {
    pub async fn set_autoneg(&self, port: &str, mode: AutoNeg) -> Result<(), CommandError> {
        self.config_interface("autoneg", port, mode.sonic_str())
            .await?;
        Ok(())
    }

    /// Advertise the given speeds, or all supported speeds on `None`.
    pub async fn set_adv_speeds(
        &self,
        port: &str,
        speeds: Option<&SpeedSet>,
    ) -> Result<(), CommandError> {
        let value = speeds.map_or_else(|| ADVERTISE_ALL.to_string(), join_speeds_mbps);
        self.config_interface("advertised-speeds", port, &value)
            .await?;
        Ok(())
    }

    pub async fn set_type(&self, port: &str, iftype: &InterfaceType) -> Result<(), CommandError> {
        self.config_interface("type", port, iftype.as_str()).await?;
        Ok(())
    }

    /// Advertise the given interface types, or all supported types on `None`.
    pub async fn set_adv_types(
        &self,
        port: &str,
        types: Option<&BTreeSet<InterfaceType>>,
    ) -> Result<(), CommandError> {
        let value = types.map_or_else(|| ADVERTISE_ALL.to_string(), join_types);
        self.config_interface("advertised-types", port, &value)
            .await?;
        Ok(())
    }

    /// `show interfaces autoneg status`, for one port or all of them.
    pub async fn show_autoneg_status(&self, port: Option<&str>) -> Result<Table, CommandError> {
        let cmd = match port {
            Some(port) => format!("sudo show interfaces autoneg status {port}"),
            None => "sudo show interfaces autoneg status".to_string(),
        };
        let output = show(self.engine.as_ref(), &cmd).await?;
        Ok(parse_show_table(&output, "Interface")?)
    }
}
