// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The command interface to a device.

use crate::errors::EngineError;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// How long a command may run unless told otherwise.
pub const DEFAULT_CMD_TIMEOUT: Duration = Duration::from_secs(60);

/// Something that runs commands on a device and returns what it printed.
///
/// A command that the device rejects (non-zero exit status) fails with
/// [`EngineError::Exit`], which keeps the output so that callers can check
/// which error the device reported.
#[async_trait]
pub trait Engine: Send + Sync {
    /// A name for logs, usually the host name of the device.
    fn name(&self) -> &str;

    async fn run_cmd_timeout(&self, cmd: &str, timeout: Duration) -> Result<String, EngineError>;

    async fn run_cmd(&self, cmd: &str) -> Result<String, EngineError> {
        self.run_cmd_timeout(cmd, DEFAULT_CMD_TIMEOUT).await
    }

    /// Run the first command and answer its prompts with the following lines.
    async fn send_config_set(&self, cmds: &[String]) -> Result<String, EngineError>;

    /// Issue disruptive commands (reboot, config reload) and wait until the
    /// device answers commands again. `wait` is the time the device is given
    /// to go down before it is polled.
    async fn reload(&self, cmds: &[String], wait: Duration) -> Result<(), EngineError>;

    async fn disconnect(&self) -> Result<(), EngineError>;
}

/// Engines are shared between the command wrappers and the cleanup actions.
pub type SharedEngine = Arc<dyn Engine>;
