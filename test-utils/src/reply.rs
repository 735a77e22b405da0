// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! What a simulated device answers to a command.

use engine::EngineError;

/// A command the device refused, with its exit status and what it printed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Refusal {
    pub(crate) status: i32,
    pub(crate) output: String,
}

pub(crate) type Reply = Result<String, Refusal>;

pub(crate) fn refusal(output: impl Into<String>) -> Refusal {
    Refusal {
        status: 1,
        output: output.into(),
    }
}

pub(crate) fn refuse(output: impl Into<String>) -> Reply {
    Err(refusal(output))
}

pub(crate) fn not_found(cmd: &str) -> Reply {
    let name = cmd.split_whitespace().next().unwrap_or_default();
    Err(Refusal {
        status: 127,
        output: format!("bash: {name}: command not found"),
    })
}

pub(crate) fn into_result(cmd: &str, reply: Reply) -> Result<String, EngineError> {
    reply.map_err(|r| EngineError::Exit {
        cmd: cmd.to_string(),
        status: r.status,
        output: r.output,
    })
}
