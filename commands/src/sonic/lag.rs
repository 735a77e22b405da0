// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::{config, show};
use ordermap::OrderMap;
use parse::parse_show_table;
use regex::Regex;
use std::sync::LazyLock;

static MEMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(Ethernet\d+)\(").unwrap_or_else(|_| unreachable!()));

impl SonicCli {
    pub async fn add_portchannel(&self, name: &str) -> Result<(), CommandError> {
        config(
            self.engine.as_ref(),
            &format!("sudo config portchannel add {name}"),
        )
        .await?;
        Ok(())
    }

    pub async fn del_portchannel(&self, name: &str) -> Result<(), CommandError> {
        config(
            self.engine.as_ref(),
            &format!("sudo config portchannel del {name}"),
        )
        .await?;
        Ok(())
    }

    pub async fn add_portchannel_member(&self, name: &str, port: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo config portchannel member add {name} {port}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn del_portchannel_member(&self, name: &str, port: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo config portchannel member del {name} {port}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    /// Port channel to its member ports, from `show interfaces portchannel`.
    /// Members are listed as `Ethernet0(S)`.
    pub async fn show_portchannels(&self) -> Result<OrderMap<String, Vec<String>>, CommandError> {
        let output = show(self.engine.as_ref(), "show interfaces portchannel").await?;
        let table = parse_show_table(&output, "Team Dev")?;
        Ok(table
            .iter()
            .map(|(name, row)| {
                let members = row
                    .get("Ports")
                    .map(|p| {
                        MEMBER_RE
                            .captures_iter(p)
                            .map(|c| c[1].to_string())
                            .collect()
                    })
                    .unwrap_or_default();
                (name.clone(), members)
            })
            .collect())
    }
}
