// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Commands of the Linux hosts cabled to the switch.

use crate::errors::CommandError;
use crate::exec::{config, show};
use engine::{EngineError, SharedEngine};
use model::{AutoNeg, FecMode, Speed};
use parse::{EthtoolInfo, PingStats, parse_ethtool, parse_ethtool_fec, parse_ping};
use std::fmt::{Debug, Formatter};

#[derive(Clone)]
pub struct LinuxCli {
    engine: SharedEngine,
}

impl Debug for LinuxCli {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LinuxCli")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl LinuxCli {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    pub async fn ethtool(&self, iface: &str) -> Result<EthtoolInfo, CommandError> {
        let output = show(self.engine.as_ref(), &format!("ethtool {iface}")).await?;
        Ok(parse_ethtool(&output)?)
    }

    pub async fn set_speed(&self, iface: &str, speed: Speed) -> Result<(), CommandError> {
        let cmd = format!("ethtool -s {iface} speed {}", speed.as_mbps());
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn set_autoneg(&self, iface: &str, mode: AutoNeg) -> Result<(), CommandError> {
        let cmd = format!("ethtool -s {iface} autoneg {}", mode.ethtool_str());
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn set_fec(&self, iface: &str, mode: FecMode) -> Result<(), CommandError> {
        let cmd = format!(
            "ethtool --set-fec {iface} encoding {}",
            mode.ethtool_encoding()
        );
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    /// The active FEC encoding of an interface.
    pub async fn show_fec(&self, iface: &str) -> Result<FecMode, CommandError> {
        let output = show(self.engine.as_ref(), &format!("ethtool --show-fec {iface}")).await?;
        Ok(parse_ethtool_fec(&output)?)
    }

    pub async fn add_ip(&self, iface: &str, ip: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo ip addr add {ip} dev {iface}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn del_ip(&self, iface: &str, ip: &str) -> Result<(), CommandError> {
        let cmd = format!("sudo ip addr del {ip} dev {iface}");
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn link_up(&self, iface: &str) -> Result<(), CommandError> {
        config(self.engine.as_ref(), &format!("sudo ip link set {iface} up")).await?;
        Ok(())
    }

    pub async fn link_down(&self, iface: &str) -> Result<(), CommandError> {
        config(self.engine.as_ref(), &format!("sudo ip link set {iface} down")).await?;
        Ok(())
    }

    /// Ping `dst_ip` out of `iface`, reporting lost replies in the statistics.
    pub async fn ping(&self, iface: &str, dst_ip: &str, count: u32) -> Result<PingStats, CommandError> {
        let cmd = format!("ping -I {iface} {dst_ip} -c {count}");
        let output = match self.engine.run_cmd(&cmd).await {
            Ok(output) | Err(EngineError::Exit { output, .. }) => output,
            Err(e) => return Err(e.into()),
        };
        Ok(parse_ping(&output)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, Reply};
    use pretty_assertions::assert_eq;

    const LOST: &str = "PING 10.0.0.2 (10.0.0.2) from 10.0.0.1 enp1s0f0: 56(84) bytes of data.

--- 10.0.0.2 ping statistics ---
3 packets transmitted, 0 received, +3 errors, 100% packet loss, time 2040ms
";

    #[tokio::test]
    async fn test_host_commands() {
        let engine = Recorder::replying([
            ("ping -I enp1s0f0", Reply::Exits(1, LOST)),
            ("ping -I enp1s0f1", Reply::TimesOut),
            ("ethtool -s enp1s0f0 speed 1234", Reply::Exits(75, "netlink error: Invalid argument")),
        ]);
        let host = LinuxCli::new(engine.clone());

        host.set_speed("enp1s0f0", Speed::from_gbps(25)).await.unwrap();
        host.set_autoneg("enp1s0f0", AutoNeg::Enabled).await.unwrap();
        host.set_fec("enp1s0f0", FecMode::Fc).await.unwrap();
        host.add_ip("enp1s0f0", "10.0.0.1/24").await.unwrap();
        host.link_up("enp1s0f0").await.unwrap();

        // a lossy ping exits non-zero and is still a result
        let stats = host.ping("enp1s0f0", "10.0.0.2", 3).await.unwrap();
        assert_eq!((stats.transmitted, stats.received), (3, 0));
        assert!(!stats.all_received());
        assert!(matches!(
            host.ping("enp1s0f1", "10.0.0.6", 3).await,
            Err(CommandError::Engine(EngineError::Timeout { .. }))
        ));

        let bad = Speed::from_mbps(1234).unwrap();
        let err = host.set_speed("enp1s0f0", bad).await.unwrap_err();
        assert_eq!(err.output(), Some("netlink error: Invalid argument"));

        assert_eq!(
            engine.issued(),
            vec![
                "ethtool -s enp1s0f0 speed 25000",
                "ethtool -s enp1s0f0 autoneg on",
                "ethtool --set-fec enp1s0f0 encoding baser",
                "sudo ip addr add 10.0.0.1/24 dev enp1s0f0",
                "sudo ip link set enp1s0f0 up",
                "ping -I enp1s0f0 10.0.0.2 -c 3",
                "ping -I enp1s0f1 10.0.0.6 -c 3",
                "ethtool -s enp1s0f0 speed 1234",
            ]
        );
    }
}
