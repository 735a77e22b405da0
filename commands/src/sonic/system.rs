// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::{config, show};
use engine::EngineError;
use model::PortBreakoutInfo;
use ordermap::OrderMap;
use parse::{ConfigDb, parse_config_db, parse_platform_json};
use std::time::Duration;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info};

/// Containers that have to run for the switch to be usable.
pub const DOCKERS: [&str; 7] = ["swss", "syncd", "bgp", "teamd", "pmon", "lldp", "dhcp_relay"];

const CONFIG_DB_PATH: &str = "/etc/sonic/config_db.json";

/// How long the switch is given to go down before it is polled.
const RELOAD_WAIT: Duration = Duration::from_secs(45);

/// Ways of restarting the switch, or only its configuration.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum RebootKind {
    /// `config reload`
    Reload,
    Reboot,
    WarmReboot,
    FastReboot,
}

impl RebootKind {
    fn command(self) -> String {
        match self {
            RebootKind::Reload => "sudo config reload -y".to_string(),
            other => format!("sudo {other}"),
        }
    }
}

impl SonicCli {
    pub async fn config_db(&self) -> Result<ConfigDb, CommandError> {
        let output = show(self.engine.as_ref(), &format!("cat {CONFIG_DB_PATH}")).await?;
        Ok(parse_config_db(&output)?)
    }

    pub async fn platform_json(&self, platform: &str) -> Result<String, CommandError> {
        let cmd = format!("cat /usr/share/sonic/device/{platform}/platform.json");
        show(self.engine.as_ref(), &cmd).await
    }

    /// Breakout capabilities of every port, with the mode each one runs in.
    pub async fn breakout_info(
        &self,
        platform: &str,
    ) -> Result<OrderMap<String, PortBreakoutInfo>, CommandError> {
        let platform_json = self.platform_json(platform).await?;
        let config_db = self.config_db().await?;
        Ok(parse_platform_json(&platform_json, &config_db)?)
    }

    pub async fn save_config(&self) -> Result<(), CommandError> {
        config(self.engine.as_ref(), "sudo config save -y").await?;
        Ok(())
    }

    pub async fn reload_config(&self) -> Result<(), CommandError> {
        self.reboot(RebootKind::Reload).await
    }

    /// Restart the switch the given way, wait for it to answer again and
    /// for its containers to run.
    pub async fn reboot(&self, kind: RebootKind) -> Result<(), CommandError> {
        info!("Restarting {}: {kind}", self.name());
        self.engine.reload(&[kind.command()], RELOAD_WAIT).await?;
        self.verify_dockers().await
    }

    /// Check that every container of [`DOCKERS`] runs.
    pub async fn verify_dockers(&self) -> Result<(), CommandError> {
        for docker in DOCKERS {
            let cmd = format!("docker ps | grep {docker}");
            match self.engine.run_cmd(&cmd).await {
                Ok(output) if output.contains(docker) => debug!("{docker} is up"),
                Ok(output) | Err(EngineError::Exit { output, .. }) => {
                    return Err(CommandError::Unexpected { cmd, output });
                }
                Err(e) => return Err(e.into()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, Reply};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_reboot_commands() {
        assert_eq!(RebootKind::Reload.command(), "sudo config reload -y");
        assert_eq!(RebootKind::WarmReboot.command(), "sudo warm-reboot");
        assert_eq!(RebootKind::FastReboot.to_string(), "fast-reboot");
        assert_eq!("reboot".parse::<RebootKind>().unwrap(), RebootKind::Reboot);
    }

    #[tokio::test]
    async fn test_reboot_checks_dockers() {
        let engine = Recorder::replying([
            ("docker ps | grep swss", Reply::Prints("1a2b  docker-orchagent  Up 2 minutes  swss")),
            ("docker ps | grep syncd", Reply::Prints("3c4d  docker-syncd-mlnx  Up 2 minutes  syncd")),
            ("docker ps | grep bgp", Reply::Exits(1, "")),
        ]);
        let cli = SonicCli::new(engine.clone());
        let err = cli.reboot(RebootKind::WarmReboot).await.unwrap_err();
        assert!(matches!(err, CommandError::Unexpected { cmd, .. } if cmd == "docker ps | grep bgp"));
        assert_eq!(
            engine.issued(),
            vec![
                "sudo warm-reboot",
                "docker ps | grep swss",
                "docker ps | grep syncd",
                "docker ps | grep bgp",
            ]
        );
    }
}
