// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::{config, show};
use ordermap::OrderMap;
use parse::parse_show_table_rows;

const ADDRESS_COLUMN: &str = "IPv4 address/mask";

impl SonicCli {
    pub async fn add_ip(&self, iface: &str, ip: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo config interface ip add {iface} {ip}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn remove_ip(&self, iface: &str, ip: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo config interface ip remove {iface} {ip}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    /// Interface to its addresses, from `show ip interfaces`.
    pub async fn show_ip_interfaces(&self) -> Result<OrderMap<String, Vec<String>>, CommandError> {
        let output = show(self.engine.as_ref(), "show ip interfaces").await?;
        let mut ips: OrderMap<String, Vec<String>> = OrderMap::new();
        for row in parse_show_table_rows(&output)? {
            let Some(iface) = row.get("Interface").filter(|i| !i.is_empty()) else {
                continue;
            };
            let addresses = ips.entry(iface.clone()).or_default();
            if let Some(address) = row.get(ADDRESS_COLUMN) {
                addresses.extend(address.split_whitespace().map(str::to_string));
            }
        }
        Ok(ips)
    }
}
