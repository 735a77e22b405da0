// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::{config, show};
use ordermap::OrderMap;
use parse::parse_show_table_rows;
use strum::{Display, EnumString};

/// How a port is a member of a VLAN.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum VlanMode {
    /// Untagged member
    Access,
    /// Tagged member
    Trunk,
}

impl VlanMode {
    pub fn tagging(self) -> &'static str {
        match self {
            VlanMode::Access => "untagged",
            VlanMode::Trunk => "tagged",
        }
    }
}

impl SonicCli {
    pub async fn add_vlan(&self, vid: u16) -> Result<(), CommandError> {
        config(self.engine.as_ref(), &format!("sudo config vlan add {vid}")).await?;
        Ok(())
    }

    pub async fn del_vlan(&self, vid: u16) -> Result<(), CommandError> {
        config(self.engine.as_ref(), &format!("sudo config vlan del {vid}")).await?;
        Ok(())
    }

    pub async fn add_vlan_member(
        &self,
        vid: u16,
        port: &str,
        mode: VlanMode,
    ) -> Result<(), CommandError> {
        let untagged = match mode {
            VlanMode::Access => "-u ",
            VlanMode::Trunk => "",
        };
        let cmd = format!("sudo config vlan member add {untagged}{vid} {port}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn del_vlan_member(&self, vid: u16, port: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo config vlan member del {vid} {port}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    /// VLAN id to its member ports, from `show vlan config`.
    pub async fn show_vlan_config(&self) -> Result<OrderMap<u16, Vec<String>>, CommandError> {
        let output = show(self.engine.as_ref(), "show vlan config").await?;
        let mut vlans: OrderMap<u16, Vec<String>> = OrderMap::new();
        for row in parse_show_table_rows(&output)? {
            let Some(vid) = row.get("VID").and_then(|v| v.parse::<u16>().ok()) else {
                continue;
            };
            let members = vlans.entry(vid).or_default();
            if let Some(member) = row.get("Member").filter(|m| !m.is_empty()) {
                members.push(member.clone());
            }
        }
        Ok(vlans)
    }
}
