// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Commands of a SONiC switch.

mod autoneg;
mod breakout;
mod fec;
mod interface;
mod ip;
mod lag;
mod link;
mod system;
mod vlan;

pub use breakout::BREAKOUT_SUCCESS;
pub use system::{DOCKERS, RebootKind};
pub use vlan::VlanMode;

use crate::errors::CommandError;
use engine::SharedEngine;
use parse::Table;
use std::fmt::{Debug, Formatter};
use strum::{Display, EnumString};

pub const SHOW_INTERFACES_STATUS: &str = "sudo show interfaces status";

/// Operational or administrative state of an interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum PortState {
    Up,
    Down,
}

/// The command line interface of a SONiC switch.
#[derive(Clone)]
pub struct SonicCli {
    engine: SharedEngine,
}

impl Debug for SonicCli {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SonicCli")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl SonicCli {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub fn name(&self) -> &str {
        self.engine.name()
    }
}

/// The value of `column` for `port` in a parsed show table.
pub(crate) fn cell<'a>(
    table: &'a Table,
    cmd: &str,
    port: &str,
    column: &str,
) -> Result<&'a str, CommandError> {
    let row = table.get(port).ok_or_else(|| CommandError::MissingPort {
        cmd: cmd.to_string(),
        port: port.to_string(),
    })?;
    row.get(column)
        .map(String::as_str)
        .ok_or_else(|| parse::ParseError::MissingColumn(column.to_string()).into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, Reply};
    use pretty_assertions::assert_eq;

    #[tokio::test]
    async fn test_dependency_commands() {
        let engine = Recorder::replying([(
            "sudo config vlan del 100",
            Reply::Prints("Error: Vlan100 can not be removed. First remove vlan members"),
        )]);
        let cli = SonicCli::new(engine.clone());

        cli.add_vlan(100).await.unwrap();
        cli.add_vlan_member(100, "Ethernet0", VlanMode::Access).await.unwrap();
        cli.add_vlan_member(100, "Ethernet4", VlanMode::Trunk).await.unwrap();
        cli.add_portchannel("PortChannel0001").await.unwrap();
        cli.add_portchannel_member("PortChannel0001", "Ethernet8").await.unwrap();
        cli.add_ip("Ethernet12", "10.0.0.1/24").await.unwrap();
        cli.shutdown("Ethernet12").await.unwrap();
        assert!(matches!(
            cli.del_vlan(100).await,
            Err(CommandError::Rejected { .. })
        ));
        cli.del_vlan_member(100, "Ethernet0").await.unwrap();
        cli.remove_ip("Ethernet12", "10.0.0.1/24").await.unwrap();
        cli.del_portchannel_member("PortChannel0001", "Ethernet8").await.unwrap();
        cli.del_portchannel("PortChannel0001").await.unwrap();

        assert_eq!(
            engine.issued(),
            vec![
                "sudo config vlan add 100",
                "sudo config vlan member add -u 100 Ethernet0",
                "sudo config vlan member add 100 Ethernet4",
                "sudo config portchannel add PortChannel0001",
                "sudo config portchannel member add PortChannel0001 Ethernet8",
                "sudo config interface ip add Ethernet12 10.0.0.1/24",
                "sudo config interface shutdown Ethernet12",
                "sudo config vlan del 100",
                "sudo config vlan member del 100 Ethernet0",
                "sudo config interface ip remove Ethernet12 10.0.0.1/24",
                "sudo config portchannel member del PortChannel0001 Ethernet8",
                "sudo config portchannel del PortChannel0001",
            ]
        );
    }
}
