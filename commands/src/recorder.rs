// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! An engine that keeps the commands it is given and answers them from a
//! script, for checking the exact command lines the wrappers issue.

use async_trait::async_trait;
use engine::{Engine, EngineError};
use std::sync::{Arc, Mutex};
use std::time::Duration;

#[derive(Debug, Clone, Copy)]
pub(crate) enum Reply {
    Prints(&'static str),
    Exits(i32, &'static str),
    TimesOut,
}

/// Commands are answered by the first scripted reply whose prefix they
/// start with, and print nothing otherwise. Prompt answers of a config set
/// are recorded after the command, separated with ` / `.
#[derive(Debug, Default)]
pub(crate) struct Recorder {
    script: Vec<(&'static str, Reply)>,
    issued: Mutex<Vec<String>>,
}

impl Recorder {
    pub(crate) fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub(crate) fn replying(script: impl IntoIterator<Item = (&'static str, Reply)>) -> Arc<Self> {
        Arc::new(Self {
            script: script.into_iter().collect(),
            issued: Mutex::default(),
        })
    }

    pub(crate) fn issued(&self) -> Vec<String> {
        self.issued.lock().unwrap().clone()
    }

    fn answer(&self, cmd: &str, line: String) -> Result<String, EngineError> {
        self.issued.lock().unwrap().push(line);
        let reply = self
            .script
            .iter()
            .find(|(prefix, _)| cmd.starts_with(prefix))
            .map_or(Reply::Prints(""), |(_, reply)| *reply);
        match reply {
            Reply::Prints(output) => Ok(output.to_string()),
            Reply::Exits(status, output) => Err(EngineError::Exit {
                cmd: cmd.to_string(),
                status,
                output: output.to_string(),
            }),
            Reply::TimesOut => Err(EngineError::Timeout {
                cmd: cmd.to_string(),
                timeout: Duration::from_secs(60),
            }),
        }
    }
}

#[async_trait]
impl Engine for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    async fn run_cmd_timeout(&self, cmd: &str, _timeout: Duration) -> Result<String, EngineError> {
        self.answer(cmd, cmd.to_string())
    }

    async fn send_config_set(&self, cmds: &[String]) -> Result<String, EngineError> {
        let first = cmds.first().map(String::as_str).unwrap_or_default();
        self.answer(first, cmds.join(" / "))
    }

    async fn reload(&self, cmds: &[String], _wait: Duration) -> Result<(), EngineError> {
        self.issued.lock().unwrap().extend(cmds.iter().cloned());
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
