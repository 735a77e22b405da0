// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Running configuration and show commands over an engine.

use crate::errors::CommandError;
use engine::{Engine, EngineError};
use tracing::debug;

/// What devices print when they refuse a configuration command. Some of
/// them exit with status 0 all the same.
const REJECTION_MARKERS: [&str; 5] = [
    "Error",
    "ERROR",
    "Invalid",
    "Dependecies Exist",
    "not supported",
];

pub(crate) fn is_rejection(output: &str) -> bool {
    REJECTION_MARKERS.iter().any(|m| output.contains(m))
}

fn rejected(cmd: &str, result: Result<String, EngineError>) -> Result<String, CommandError> {
    match result {
        Ok(output) if is_rejection(&output) => Err(CommandError::Rejected {
            cmd: cmd.to_string(),
            output,
        }),
        Ok(output) => Ok(output),
        Err(EngineError::Exit { output, .. }) => Err(CommandError::Rejected {
            cmd: cmd.to_string(),
            output,
        }),
        Err(e) => Err(e.into()),
    }
}

/// Run a command that changes the device configuration.
pub(crate) async fn config(engine: &dyn Engine, cmd: &str) -> Result<String, CommandError> {
    let result = engine.run_cmd(cmd).await;
    let output = rejected(cmd, result)?;
    debug!("[{}] {cmd}: done", engine.name());
    Ok(output)
}

/// Run a configuration command answering its prompts.
pub(crate) async fn config_set(
    engine: &dyn Engine,
    cmds: &[String],
) -> Result<String, CommandError> {
    let cmd = cmds.first().map(String::as_str).unwrap_or_default();
    let result = engine.send_config_set(cmds).await;
    rejected(cmd, result)
}

/// Run a command that only reads state.
pub(crate) async fn show(engine: &dyn Engine, cmd: &str) -> Result<String, CommandError> {
    Ok(engine.run_cmd(cmd).await?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, Reply};
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[test]
    fn test_rejection_markers() {
        assert!(is_rejection(
            "[ERROR] Ethernet1 interface is NOT present in BREAKOUT_CFG table of CONFIG DB"
        ));
        assert!(is_rejection("Invalid speed specified: 1234"));
        assert!(is_rejection(
            "Error: Invalid value for \"<mode>\": invalid choice: enable. (choose from enabled, disabled)"
        ));
        assert!(!is_rejection("Breakout process got successfully completed."));
        assert!(!is_rejection(""));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_config_outputs() {
        let engine = Recorder::replying([
            ("sudo config vlan add 100", Reply::Prints("")),
            ("sudo config vlan del 100", Reply::Prints("Error: Dependecies Exist for Vlan100")),
            ("sudo config interface speed", Reply::Exits(2, "Invalid speed specified: 1234")),
            ("sudo config save", Reply::TimesOut),
            ("show vlan brief", Reply::Prints("Error log line kept in a table")),
        ]);

        config(engine.as_ref(), "sudo config vlan add 100").await.unwrap();
        assert!(logs_contain("[recorder] sudo config vlan add 100: done"));

        match config(engine.as_ref(), "sudo config vlan del 100").await {
            Err(CommandError::Rejected { cmd, output }) => {
                assert_eq!(cmd, "sudo config vlan del 100");
                assert_eq!(output, "Error: Dependecies Exist for Vlan100");
            }
            other => panic!("accepted despite the error: {other:?}"),
        }

        let err = config(engine.as_ref(), "sudo config interface speed Ethernet0 1234")
            .await
            .unwrap_err();
        assert!(matches!(err, CommandError::Rejected { .. }));
        assert_eq!(err.output(), Some("Invalid speed specified: 1234"));

        let err = config(engine.as_ref(), "sudo config save -y").await.unwrap_err();
        assert!(matches!(
            err,
            CommandError::Engine(EngineError::Timeout { .. })
        ));

        // show output is never checked for rejection markers
        let output = show(engine.as_ref(), "show vlan brief").await.unwrap();
        assert_eq!(output, "Error log line kept in a table");
    }

    #[tokio::test]
    async fn test_config_set() {
        let engine = Recorder::replying([(
            "sudo config interface breakout Ethernet8",
            Reply::Prints("[ERROR] Ethernet8 interface is NOT present in BREAKOUT_CFG table"),
        )]);
        let cmds = ["sudo config interface breakout Ethernet0 2x50G -y".to_string(), "y".to_string()];
        assert_eq!(config_set(engine.as_ref(), &cmds).await.unwrap(), "");

        let cmds = ["sudo config interface breakout Ethernet8 2x50G -y".to_string(), "y".to_string()];
        match config_set(engine.as_ref(), &cmds).await {
            Err(CommandError::Rejected { cmd, .. }) => assert_eq!(cmd, cmds[0]),
            other => panic!("accepted despite the error: {other:?}"),
        }
        assert_eq!(
            engine.issued(),
            vec![
                "sudo config interface breakout Ethernet0 2x50G -y / y",
                "sudo config interface breakout Ethernet8 2x50G -y / y",
            ]
        );

        assert_eq!(config_set(Recorder::new().as_ref(), &[]).await.unwrap(), "");
    }
}
