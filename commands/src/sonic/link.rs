// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::show;
use engine::EngineError;
use parse::{MlxlinkInfo, PingStats, parse_mlxlink, parse_ping};
use tracing::debug;

impl SonicCli {
    /// The Mellanox configuration device, e.g. `/dev/mst/mt53100_pciconf0`.
    pub async fn mst_device(&self) -> Result<String, CommandError> {
        let cmd = "ls /dev/mst";
        let output = show(self.engine.as_ref(), cmd).await?;
        output
            .split_whitespace()
            .find(|d| d.ends_with("_pciconf0"))
            .map(|d| format!("/dev/mst/{d}"))
            .ok_or_else(|| CommandError::Unexpected {
                cmd: cmd.to_string(),
                output,
            })
    }

    /// The physical view of a front panel port.
    pub async fn mlxlink(&self, alias_number: u32) -> Result<MlxlinkInfo, CommandError> {
        let device = self.mst_device().await?;
        let cmd = format!("sudo mlxlink -d {device} -p {alias_number}");
        let output = show(self.engine.as_ref(), &cmd).await?;
        Ok(parse_mlxlink(&output))
    }

    /// Ping `dst_ip` out of `src_if`. Lost replies are not an error, the
    /// statistics tell.
    pub async fn ping(
        &self,
        src_if: &str,
        dst_ip: &str,
        count: u32,
    ) -> Result<PingStats, CommandError> {
        let cmd = format!("ping -I {src_if} {dst_ip} -c {count}");
        let output = match self.engine.run_cmd(&cmd).await {
            Ok(output) | Err(EngineError::Exit { output, .. }) => output,
            Err(e) => return Err(e.into()),
        };
        let stats = parse_ping(&output)?;
        debug!("{cmd}: {}/{} received", stats.received, stats.transmitted);
        Ok(stats)
    }
}
