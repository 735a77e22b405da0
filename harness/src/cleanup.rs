// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Teardown actions registered while a scenario configures the devices.

use crate::errors::{CleanupFailure, HarnessError};
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{error, info};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

struct Action {
    label: String,
    run: BoxFuture<'static, Result<(), BoxError>>,
}

/// Deferred teardown actions, run in the order they were pushed.
///
/// Every action runs even when an earlier one failed; the failures are
/// reported together.
#[derive(Default)]
pub struct CleanupList {
    actions: Vec<Action>,
}

impl std::fmt::Debug for CleanupList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list()
            .entries(self.actions.iter().map(|a| &a.label))
            .finish()
    }
}

impl CleanupList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an action. Nothing runs until [`CleanupList::run`].
    pub fn push<F, E>(&mut self, label: impl Into<String>, action: F)
    where
        F: Future<Output = Result<(), E>> + Send + 'static,
        E: std::error::Error + Send + Sync + 'static,
    {
        let run = action.map(|r| r.map_err(|e| Box::new(e) as BoxError)).boxed();
        self.actions.push(Action {
            label: label.into(),
            run,
        });
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.actions.iter().map(|a| a.label.as_str())
    }

    /// Run and forget every registered action.
    pub async fn run(&mut self) -> Result<(), HarnessError> {
        let mut failures = vec![];
        let actions = std::mem::take(&mut self.actions);
        if !actions.is_empty() {
            info!("Running {} cleanup action(s)", actions.len());
        }
        for action in actions {
            if let Err(e) = action.run.await {
                error!("Cleanup '{}' failed: {e}", action.label);
                failures.push(CleanupFailure {
                    label: action.label,
                    error: e.to_string(),
                });
            }
        }
        if failures.is_empty() {
            Ok(())
        } else {
            Err(HarnessError::Cleanup(failures))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::{Arc, Mutex};
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_order_and_failures() {
        let log = Arc::new(Mutex::new(vec![]));
        let mut cleanup = CleanupList::new();
        for (label, fail) in [("vlan", false), ("portchannel", true), ("ip", false)] {
            let log = log.clone();
            cleanup.push(label, async move {
                log.lock().unwrap().push(label);
                if fail {
                    Err(HarnessError::Failed(format!("{label} is busy")))
                } else {
                    Ok(())
                }
            });
        }
        assert_eq!(cleanup.len(), 3);
        assert_eq!(
            cleanup.labels().collect::<Vec<_>>(),
            vec!["vlan", "portchannel", "ip"]
        );

        let err = cleanup.run().await.unwrap_err();
        assert_eq!(*log.lock().unwrap(), vec!["vlan", "portchannel", "ip"]);
        match err {
            HarnessError::Cleanup(failures) => {
                assert_eq!(failures.len(), 1);
                assert_eq!(failures[0].label, "portchannel");
                assert_eq!(failures[0].error, "portchannel is busy");
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(cleanup.is_empty());
        assert!(cleanup.run().await.is_ok());
    }
}
