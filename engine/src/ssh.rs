// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An [`Engine`] over the system `ssh` client.
//!
//! Every command is a fresh `ssh` invocation sharing a multiplexed master
//! connection. Passwords are never put on the command line: when the
//! device needs one, `sshpass -e` reads it from the environment.

use crate::engine::{DEFAULT_CMD_TIMEOUT, Engine};
use crate::errors::EngineError;
use crate::retry::retry;
use crate::DEVICE_OUTPUT;
use async_trait::async_trait;
use derive_builder::Builder;
use std::ffi::OsStr;
use std::fmt::Display;
use std::io;
use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracectl::ttrace;
use tracing::{debug, info, warn};

/// How a device is reached.
#[derive(Builder, Debug, Clone)]
pub struct SshParams {
    #[builder(setter(into))]
    host: String,

    #[builder(default = 22)]
    port: u16,

    #[builder(setter(into), default = "admin".to_string())]
    user: String,

    /// Name of the environment variable holding the password.
    #[builder(setter(into, strip_option), default)]
    password_env: Option<String>,

    #[builder(default = DEFAULT_CMD_TIMEOUT)]
    cmd_timeout: Duration,

    #[builder(default = Duration::from_secs(10))]
    poll_interval: Duration,

    #[builder(default = 60)]
    poll_tries: u32,
}

impl Display for SshParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}:{}", self.user, self.host, self.port)
    }
}

#[derive(Debug)]
pub struct SshEngine {
    params: SshParams,
}

fn command_line(command: &Command) -> String {
    let cmd = command.as_std();
    std::iter::once(cmd.get_program())
        .chain(cmd.get_args())
        .map(OsStr::to_string_lossy)
        .collect::<Vec<_>>()
        .join(" ")
}

/// Run a local process to completion, optionally feeding its standard
/// input. Standard output and error are returned together.
pub(crate) async fn run_process(
    mut command: Command,
    label: &str,
    input: Option<String>,
    timeout: Duration,
) -> Result<String, EngineError> {
    command
        .stdin(if input.is_some() {
            Stdio::piped()
        } else {
            Stdio::null()
        })
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    let mut child = command.spawn().map_err(|err| EngineError::Spawn {
        cmd: command_line(&command),
        err,
    })?;
    let stdin = child.stdin.take();
    let feed = async move {
        if let (Some(input), Some(mut stdin)) = (input, stdin) {
            stdin.write_all(input.as_bytes()).await?;
            stdin.shutdown().await?;
        }
        Ok::<_, io::Error>(())
    };
    // the child may exit or stop reading at any time, both sides are timed
    let (fed, output) = tokio::time::timeout(timeout, async {
        tokio::join!(feed, child.wait_with_output())
    })
    .await
    .map_err(|_| EngineError::Timeout {
        cmd: label.to_string(),
        timeout,
    })?;
    let output = output?;
    match fed {
        Err(e) if e.kind() == io::ErrorKind::BrokenPipe => {
            debug!("`{label}` exited before reading its input");
        }
        fed => fed?,
    }

    let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
    text.push_str(&String::from_utf8_lossy(&output.stderr));
    ttrace!(DEVICE_OUTPUT, "`{label}` returned:\n{text}");
    if output.status.success() {
        Ok(text)
    } else {
        Err(EngineError::Exit {
            cmd: label.to_string(),
            status: output.status.code().unwrap_or(-1),
            output: text,
        })
    }
}

impl SshEngine {
    pub fn new(params: SshParams) -> Self {
        Self { params }
    }

    fn control_path(&self) -> String {
        format!(
            "/tmp/portcheck-{}@{}:{}",
            self.params.user, self.params.host, self.params.port
        )
    }

    /// The local command that runs `remote` on the device.
    pub(crate) fn command(&self, remote: &str) -> Result<Command, EngineError> {
        let mut command = match &self.params.password_env {
            Some(var) => {
                let password = std::env::var(var)
                    .map_err(|_| EngineError::MissingPassword(var.clone()))?;
                let mut c = Command::new("sshpass");
                c.arg("-e").env("SSHPASS", password).arg("ssh");
                c
            }
            None => {
                let mut c = Command::new("ssh");
                c.args(["-o", "BatchMode=yes"]);
                c
            }
        };
        command
            .args(["-o", "StrictHostKeyChecking=no"])
            .args(["-o", "UserKnownHostsFile=/dev/null"])
            .args(["-o", "LogLevel=ERROR"])
            .args(["-o", "ConnectTimeout=10"])
            .args(["-o", "ControlMaster=auto"])
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path()))
            .args(["-o", "ControlPersist=120"])
            .arg("-p")
            .arg(self.params.port.to_string())
            .arg(format!("{}@{}", self.params.user, self.params.host))
            .arg(remote);
        Ok(command)
    }

    async fn run(
        &self,
        cmd: &str,
        input: Option<String>,
        timeout: Duration,
    ) -> Result<String, EngineError> {
        debug!("[{}] {cmd}", self.params.host);
        run_process(self.command(cmd)?, cmd, input, timeout).await
    }
}

#[async_trait]
impl Engine for SshEngine {
    fn name(&self) -> &str {
        &self.params.host
    }

    async fn run_cmd_timeout(&self, cmd: &str, timeout: Duration) -> Result<String, EngineError> {
        self.run(cmd, None, timeout).await
    }

    async fn run_cmd(&self, cmd: &str) -> Result<String, EngineError> {
        self.run(cmd, None, self.params.cmd_timeout).await
    }

    async fn send_config_set(&self, cmds: &[String]) -> Result<String, EngineError> {
        let Some((first, answers)) = cmds.split_first() else {
            return Ok(String::new());
        };
        let input = answers.iter().fold(String::new(), |mut acc, a| {
            acc.push_str(a);
            acc.push('\n');
            acc
        });
        self.run(first, Some(input), self.params.cmd_timeout).await
    }

    async fn reload(&self, cmds: &[String], wait: Duration) -> Result<(), EngineError> {
        for cmd in cmds {
            // the connection usually drops while the command runs
            match self.run(cmd, None, self.params.cmd_timeout).await {
                Ok(_) | Err(EngineError::Exit { .. } | EngineError::Timeout { .. }) => {}
                Err(e) => return Err(e),
            }
        }
        tokio::time::sleep(wait).await;
        let poll = self.params.poll_interval;
        retry(
            &format!("{} readiness", self.params),
            self.params.poll_tries,
            poll,
            move || self.run("echo ready", None, poll),
        )
        .await
        .map_err(|e| EngineError::Unreachable {
            host: self.params.host.clone(),
            tries: e.tries,
        })?;
        info!("{} is back", self.params);
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EngineError> {
        let mut command = Command::new("ssh");
        command
            .arg("-o")
            .arg(format!("ControlPath={}", self.control_path()))
            .args(["-O", "exit"])
            .arg(format!("{}@{}", self.params.user, self.params.host));
        if let Err(e) = run_process(command, "ssh -O exit", None, Duration::from_secs(10)).await {
            // no master connection is not an error
            warn!("Closing connection to {} failed: {e}", self.params);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tracing_test::traced_test;

    fn sh(script: &str) -> Command {
        let mut c = Command::new("sh");
        c.arg("-c").arg(script);
        c
    }

    #[test]
    fn test_params_defaults() {
        let params = SshParamsBuilder::default()
            .host("r-leopard-01")
            .build()
            .unwrap();
        assert_eq!(params.to_string(), "admin@r-leopard-01:22");
        assert_eq!(params.cmd_timeout, DEFAULT_CMD_TIMEOUT);
        assert!(SshParamsBuilder::default().build().is_err());
    }

    #[test]
    fn test_command_line() {
        let params = SshParamsBuilder::default()
            .host("dut")
            .user("tester")
            .port(2222)
            .build()
            .unwrap();
        let engine = SshEngine::new(params);
        let line = command_line(&engine.command("show version").unwrap());
        assert!(line.starts_with("ssh -o BatchMode=yes"));
        assert!(line.contains("-p 2222 tester@dut show version"));

        let params = SshParamsBuilder::default()
            .host("dut")
            .password_env("PORTCHECK_TEST_UNSET_PASSWORD")
            .build()
            .unwrap();
        assert!(matches!(
            SshEngine::new(params).command("true"),
            Err(EngineError::MissingPassword(_))
        ));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_run_process() {
        let out = run_process(sh("echo hello"), "echo", None, Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "hello\n");

        let out = run_process(sh("cat"), "cat", Some("y\n".to_string()), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "y\n");

        let err = run_process(sh("echo nope >&2; exit 3"), "fail", None, Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Exit { status: 3, .. }));
        assert_eq!(err.output(), Some("nope\n"));

        let err = run_process(sh("sleep 5"), "sleep", None, Duration::from_millis(100))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_run_process_input_timed() {
        // the child never reads, so the input fills the pipe
        let start = std::time::Instant::now();
        let err = run_process(
            sh("sleep 3"),
            "sleep",
            Some("x".repeat(1 << 20)),
            Duration::from_millis(200),
        )
        .await
        .unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
        assert!(start.elapsed() < Duration::from_secs(2));

        let out = run_process(sh("echo done"), "echo", Some("ignored\n".repeat(1 << 16)), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(out, "done\n");
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_reload_unreachable() {
        let params = SshParamsBuilder::default()
            .host("dut")
            .password_env("PORTCHECK_TEST_UNSET_PASSWORD")
            .poll_tries(3)
            .poll_interval(Duration::from_secs(5))
            .build()
            .unwrap();
        let err = SshEngine::new(params)
            .reload(&[], Duration::from_secs(60))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Unreachable { tries: 3, .. }));
        assert!(logs_contain("admin@dut:22 readiness: attempt 2/3 failed"));
    }
}
