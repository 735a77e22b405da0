// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Observers of the state of the ports a scenario checks. Verifications take
//! an observation on every attempt and compare it against what they expect.

use crate::errors::ScenarioError;
use commands::{CommandError, LinuxCli, SonicCli};
use harness::Observe;
use ordermap::OrderMap;
use parse::{EthtoolInfo, MlxlinkInfo, ParseError, Row, Table};

/// A column of a show table row.
pub(crate) fn cell<'r>(row: &'r Row, column: &str) -> Result<&'r str, ScenarioError> {
    row.get(column)
        .map(String::as_str)
        .ok_or_else(|| ParseError::MissingColumn(column.to_string()).into())
}

/// Pick the rows of `ports` out of a show table.
fn rows_of<'a>(table: &Table, cmd: &str, ports: &'a [String]) -> Result<OrderMap<&'a str, Row>, CommandError> {
    ports
        .iter()
        .map(|port| {
            let row = table.get(port).ok_or_else(|| CommandError::MissingPort {
                cmd: cmd.to_string(),
                port: port.clone(),
            })?;
            Ok((port.as_str(), row.clone()))
        })
        .collect()
}

/// Rows of `show interfaces status`.
pub struct PortStatus<'p> {
    pub dut: &'p SonicCli,
    pub ports: &'p [String],
}

impl Observe for PortStatus<'_> {
    type Observation<'a>
        = Result<OrderMap<&'a str, Row>, CommandError>
    where
        Self: 'a;

    fn observe<'a>(&'a self) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a,
    {
        async move {
            let table = self.dut.show_status().await?;
            rows_of(&table, commands::sonic::SHOW_INTERFACES_STATUS, self.ports)
        }
    }
}

/// Rows of `show interfaces autoneg status`.
pub struct AutonegStatus<'p> {
    pub dut: &'p SonicCli,
    pub ports: &'p [String],
}

impl Observe for AutonegStatus<'_> {
    type Observation<'a>
        = Result<OrderMap<&'a str, Row>, CommandError>
    where
        Self: 'a;

    fn observe<'a>(&'a self) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a,
    {
        async move {
            let table = self.dut.show_autoneg_status(None).await?;
            rows_of(&table, "sudo show interfaces autoneg status", self.ports)
        }
    }
}

/// Rows of `show interfaces fec status`.
pub struct FecStatus<'p> {
    pub dut: &'p SonicCli,
    pub ports: &'p [String],
}

impl Observe for FecStatus<'_> {
    type Observation<'a>
        = Result<OrderMap<&'a str, Row>, CommandError>
    where
        Self: 'a;

    fn observe<'a>(&'a self) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a,
    {
        async move {
            let table = self.dut.show_fec_status().await?;
            rows_of(&table, "sudo show interfaces fec status", self.ports)
        }
    }
}

/// What `mlxlink` reports for each port, the ports being looked up by their
/// alias number.
pub struct LinkInfo<'p> {
    pub dut: &'p SonicCli,
    pub ports: &'p [String],
    pub alias_numbers: &'p OrderMap<String, u32>,
}

impl Observe for LinkInfo<'_> {
    type Observation<'a>
        = Result<OrderMap<&'a str, MlxlinkInfo>, ScenarioError>
    where
        Self: 'a;

    fn observe<'a>(&'a self) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a,
    {
        async move {
            let mut infos = OrderMap::new();
            for port in self.ports {
                let number = crate::capabilities::port_alias_number(self.alias_numbers, port)?;
                infos.insert(port.as_str(), self.dut.mlxlink(number).await?);
            }
            Ok(infos)
        }
    }
}

/// `ethtool` output of host interfaces.
pub struct HostLink<'p> {
    pub host: &'p LinuxCli,
    pub ifaces: &'p [String],
}

impl Observe for HostLink<'_> {
    type Observation<'a>
        = Result<OrderMap<&'a str, EthtoolInfo>, CommandError>
    where
        Self: 'a;

    fn observe<'a>(&'a self) -> impl Future<Output = Self::Observation<'a>> + Send
    where
        Self: 'a,
    {
        async move {
            let mut infos = OrderMap::new();
            for iface in self.ifaces {
                infos.insert(iface.as_str(), self.host.ethtool(iface).await?);
            }
            Ok(infos)
        }
    }
}
