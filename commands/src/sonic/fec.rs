// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::{SonicCli, cell};
use crate::errors::CommandError;
use crate::exec::show;
use model::{FecMode, FecTable, Speed, SpeedSet};
use parse::{Table, parse_show_table};
use std::collections::BTreeMap;

const SHOW_FEC_STATUS: &str = "sudo show interfaces fec status";

impl SonicCli {
    pub async fn set_fec(&self, port: &str, mode: FecMode) -> Result<(), CommandError> {
        self.config_interface("fec", port, &mode.to_string()).await?;
        Ok(())
    }

    /// `show interfaces fec status`: operational and administrative FEC.
    pub async fn show_fec_status(&self) -> Result<Table, CommandError> {
        let output = show(self.engine.as_ref(), SHOW_FEC_STATUS).await?;
        Ok(parse_show_table(&output, "Interface")?)
    }

    /// The FEC mode a port is configured with.
    pub async fn fec_admin(&self, port: &str) -> Result<FecMode, CommandError> {
        let table = self.show_fec_status().await?;
        let admin = cell(&table, SHOW_FEC_STATUS, port, "FEC Admin")?;
        Ok(FecMode::from_sonic(admin)?)
    }

    /// The FEC modes a port can run, with the speeds each of them supports.
    /// The device capability is the table of the chip intersected with what
    /// the cable of the port can do.
    pub async fn supported_fec_modes(
        &self,
        port: &str,
        alias_number: u32,
        table: &FecTable,
    ) -> Result<BTreeMap<FecMode, SpeedSet>, CommandError> {
        let link = self.mlxlink(alias_number).await?;
        let mut cable = link.cable_speeds();
        if cable.is_empty() {
            // no cable information, trust the current speed
            let speeds = self.speeds(&[port]).await?;
            cable.extend(speeds.values().copied());
        }
        Ok(table.supported_modes(&cable))
    }

    /// The speed a port runs at according to its status table row.
    pub async fn speed(&self, port: &str) -> Result<Speed, CommandError> {
        let speeds = self.speeds(&[port]).await?;
        speeds.get(port).copied().ok_or_else(|| CommandError::MissingPort {
            cmd: super::SHOW_INTERFACES_STATUS.to_string(),
            port: port.to_string(),
        })
    }
}
