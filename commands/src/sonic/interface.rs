// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::{PortState, SHOW_INTERFACES_STATUS, SonicCli, cell};
use crate::errors::CommandError;
use crate::exec::{config, show};
use model::{Mtu, Speed};
use ordermap::OrderMap;
use parse::{Table, parse_ports_aliases, parse_show_table};
use std::str::FromStr;
use tracing::info;

impl SonicCli {
    /// Run `sudo config interface {setting} {port} {value}`. The typed
    /// setters go through here; negative checks call it with values the
    /// device is expected to refuse.
    pub async fn config_interface(
        &self,
        setting: &str,
        port: &str,
        value: &str,
    ) -> Result<String, CommandError> {
        let cmd = format!("sudo config interface {setting} {port} {value}");
        config(self.engine.as_ref(), cmd.trim_end()).await
    }

    pub async fn startup(&self, port: &str) -> Result<(), CommandError> {
        self.config_interface("startup", port, "").await?;
        Ok(())
    }

    pub async fn shutdown(&self, port: &str) -> Result<(), CommandError> {
        self.config_interface("shutdown", port, "").await?;
        Ok(())
    }

    /// Speeds are given to the device in Mb.
    pub async fn set_speed(&self, port: &str, speed: Speed) -> Result<(), CommandError> {
        self.config_interface("speed", port, &speed.as_mbps().to_string())
            .await?;
        Ok(())
    }

    pub async fn set_mtu(&self, port: &str, mtu: Mtu) -> Result<(), CommandError> {
        self.config_interface("mtu", port, &mtu.to_string()).await?;
        Ok(())
    }

    /// `show interfaces status`, keyed by interface.
    pub async fn show_status(&self) -> Result<Table, CommandError> {
        let output = show(self.engine.as_ref(), SHOW_INTERFACES_STATUS).await?;
        Ok(parse_show_table(&output, "Interface")?)
    }

    /// Port name to front panel alias.
    pub async fn show_aliases(&self) -> Result<OrderMap<String, String>, CommandError> {
        let output = show(self.engine.as_ref(), "show interfaces alias").await?;
        Ok(parse_ports_aliases(&output))
    }

    /// The current speed of each of the ports.
    pub async fn speeds<S: AsRef<str>>(
        &self,
        ports: &[S],
    ) -> Result<OrderMap<String, Speed>, CommandError> {
        let table = self.show_status().await?;
        ports
            .iter()
            .map(|port| {
                let port = port.as_ref();
                let speed = cell(&table, SHOW_INTERFACES_STATUS, port, "Speed")?;
                Ok((port.to_string(), Speed::from_str(speed)?))
            })
            .collect()
    }

    pub async fn mtu(&self, port: &str) -> Result<u32, CommandError> {
        let table = self.show_status().await?;
        let mtu = cell(&table, SHOW_INTERFACES_STATUS, port, "MTU")?;
        mtu.parse::<u32>().map_err(|_| CommandError::Unexpected {
            cmd: SHOW_INTERFACES_STATUS.to_string(),
            output: format!("{port} MTU '{mtu}'"),
        })
    }

    /// Fail on the first port whose oper state is not `expected`.
    pub async fn check_ports_status<S: AsRef<str>>(
        &self,
        ports: &[S],
        expected: PortState,
    ) -> Result<(), CommandError> {
        info!(
            "Checking that {} port(s) are {expected}",
            ports.len()
        );
        let table = self.show_status().await?;
        for port in ports {
            let port = port.as_ref();
            let oper = cell(&table, SHOW_INTERFACES_STATUS, port, "Oper")?;
            if oper != expected.to_string() {
                return Err(CommandError::PortState {
                    port: port.to_string(),
                    expected: expected.to_string(),
                    actual: oper.to_string(),
                });
            }
        }
        Ok(())
    }
}
