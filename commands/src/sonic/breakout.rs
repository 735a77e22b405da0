// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

use super::SonicCli;
use crate::errors::CommandError;
use crate::exec::config_set;
use model::BreakoutMode;
use ordermap::OrderMap;
use tracing::info;

/// Printed by the device once a breakout is applied.
pub const BREAKOUT_SUCCESS: &str = "Breakout process got successfully completed";

impl SonicCli {
    /// Apply a breakout mode on a port. The confirmation prompt is answered
    /// with `y`. With `force`, the configuration depending on the port
    /// (VLAN, port channel or IP) is removed instead of blocking the breakout.
    pub async fn configure_breakout(
        &self,
        port: &str,
        mode: &BreakoutMode,
        force: bool,
    ) -> Result<String, CommandError> {
        info!("Configuring breakout mode {mode} on {port}, force: {force}");
        let mut cmd = format!("sudo config interface breakout {port} {mode} -y");
        if force {
            cmd.push_str(" -f");
        }
        let output = config_set(self.engine.as_ref(), &[cmd.clone(), "y".to_string()]).await?;
        if !output.contains(BREAKOUT_SUCCESS) {
            return Err(CommandError::Rejected { cmd, output });
        }
        Ok(output)
    }

    /// Apply breakout modes on groups of ports and return the outputs.
    ///
    /// With `expect_error`, a refused breakout is not a failure: its output is
    /// returned with the others for the caller to check which error the
    /// device reported.
    pub async fn configure_dpb_on_ports(
        &self,
        conf: &OrderMap<BreakoutMode, Vec<String>>,
        expect_error: bool,
        force: bool,
    ) -> Result<Vec<String>, CommandError> {
        let mut outputs = Vec::new();
        for (mode, ports) in conf {
            for port in ports {
                match self.configure_breakout(port, mode, force).await {
                    Ok(output) => outputs.push(output),
                    Err(CommandError::Rejected { output, .. }) if expect_error => {
                        info!("Breakout of {port} to {mode} refused as expected");
                        outputs.push(output);
                    }
                    Err(e) => return Err(e),
                }
            }
        }
        Ok(outputs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, Reply};
    use pretty_assertions::assert_eq;

    const DONE: &str = "Running Breakout Mode : 4x25G[10G]\nBreakout process got successfully completed.\n";
    const DEPENDENCIES: &str = "[ERROR] Dependecies Exist. No further action will be taken";

    #[tokio::test]
    async fn test_breakout_commands() {
        let engine = Recorder::replying([
            ("sudo config interface breakout Ethernet0 ", Reply::Prints(DONE)),
            ("sudo config interface breakout Ethernet4 ", Reply::Prints("")),
            ("sudo config interface breakout Ethernet8 ", Reply::Exits(1, DEPENDENCIES)),
        ]);
        let cli = SonicCli::new(engine.clone());
        let mode: BreakoutMode = "4x25G[10G]".parse().unwrap();

        let output = cli.configure_breakout("Ethernet0", &mode, false).await.unwrap();
        assert_eq!(output, DONE);
        cli.configure_breakout("Ethernet0", &mode, true).await.unwrap();

        // a breakout is only applied once the device says so
        let err = cli.configure_breakout("Ethernet4", &mode, false).await.unwrap_err();
        assert!(matches!(err, CommandError::Rejected { .. }));

        assert_eq!(
            engine.issued(),
            vec![
                "sudo config interface breakout Ethernet0 4x25G[10G] -y / y",
                "sudo config interface breakout Ethernet0 4x25G[10G] -y -f / y",
                "sudo config interface breakout Ethernet4 4x25G[10G] -y / y",
            ]
        );

        let conf = OrderMap::from([(mode, vec!["Ethernet0".to_string(), "Ethernet8".to_string()])]);
        let outputs = cli.configure_dpb_on_ports(&conf, true, false).await.unwrap();
        assert_eq!(outputs, vec![DONE, DEPENDENCIES]);
        let err = cli.configure_dpb_on_ports(&conf, false, false).await.unwrap_err();
        assert_eq!(err.output(), Some(DEPENDENCIES));
    }
}
