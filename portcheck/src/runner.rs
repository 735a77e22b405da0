// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Runs scenarios one after the other and keeps their outcomes.

use engine::SharedEngine;
use harness::{Context, Outcome};
use ordermap::OrderMap;
use scenarios::{ScenarioDecl, ScenarioError};
use std::fmt::{Display, Formatter};
use std::time::{Duration, Instant};
use topology::Topology;
use tracing::{error, info, warn};

/// What became of one scenario. The outcome carries the time it took.
#[derive(Debug)]
pub struct Report {
    pub name: &'static str,
    pub skipped: bool,
    pub outcome: Outcome<Duration>,
}

impl Display for Report {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let elapsed = self
            .outcome
            .returned_value
            .map(|d| format!("{:.1}s", d.as_secs_f64()))
            .unwrap_or_default();
        if self.skipped {
            write!(f, "{:<28} SKIP {}", self.name, self.outcome.info)
        } else {
            write!(f, "{:<28} {} {elapsed}", self.name, self.outcome)
        }
    }
}

#[derive(Debug, Default)]
pub struct Summary(Vec<Report>);

impl Summary {
    pub fn reports(&self) -> &[Report] {
        &self.0
    }

    pub fn failed(&self) -> usize {
        self.0
            .iter()
            .filter(|r| !r.skipped && !r.outcome.result)
            .count()
    }

    pub fn passed(&self) -> usize {
        self.0.iter().filter(|r| !r.skipped && r.outcome.result).count()
    }

    pub fn skipped(&self) -> usize {
        self.0.iter().filter(|r| r.skipped).count()
    }
}

impl Display for Summary {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        for report in &self.0 {
            writeln!(f, "{report}")?;
        }
        write!(
            f,
            "{} passed, {} failed, {} skipped",
            self.passed(),
            self.failed(),
            self.skipped()
        )
    }
}

/// The scenarios named on the command line, or all of them.
pub fn select(names: &[String]) -> Result<Vec<&'static ScenarioDecl>, String> {
    if names.is_empty() {
        return Ok(scenarios::all());
    }
    names
        .iter()
        .map(|name| scenarios::find(name).ok_or_else(|| format!("Unknown scenario '{name}'")))
        .collect()
}

/// Run one scenario on a fresh context. Its cleanup actions run whatever
/// the scenario returned.
async fn run_one(
    decl: &'static ScenarioDecl,
    topology: &Topology,
    engines: &OrderMap<String, SharedEngine>,
    seed: u64,
) -> Report {
    info!("=== {}: {}", decl.name, decl.about);
    let start = Instant::now();
    let mut ctx = match Context::new(topology.clone(), engines.clone(), seed) {
        Ok(ctx) => ctx,
        Err(e) => {
            return Report {
                name: decl.name,
                skipped: false,
                outcome: Outcome::fail(e.to_string()),
            };
        }
    };
    let result = (decl.run)(&mut ctx).await;
    if !ctx.cleanup().is_empty() {
        info!("Running {} cleanup action(s) of {}", ctx.cleanup().len(), decl.name);
    }
    let cleanup = ctx.run_cleanup().await.map_err(ScenarioError::from);
    let elapsed = start.elapsed();

    let (skipped, outcome) = match (result, cleanup) {
        (Err(e), cleanup) if e.is_skip() => {
            warn!("{}: {e}", decl.name);
            if let Err(c) = cleanup {
                warn!("{}: {c}", decl.name);
            }
            (true, Outcome::fail(e.to_string()))
        }
        (Err(e), cleanup) => {
            error!("{} failed: {e}", decl.name);
            if let Err(c) = cleanup {
                error!("{}: {c}", decl.name);
            }
            (false, Outcome::fail(e.to_string()))
        }
        (Ok(()), Err(c)) => {
            error!("{} passed but its cleanup failed: {c}", decl.name);
            (false, Outcome::fail(c.to_string()))
        }
        (Ok(()), Ok(())) => {
            info!("{} passed", decl.name);
            (false, Outcome::ok(elapsed))
        }
    };
    Report {
        name: decl.name,
        skipped,
        outcome,
    }
}

/// Run `decls` in order. Every scenario draws its random choices from
/// `seed`, so any of them can be replayed alone.
pub async fn run(
    decls: &[&'static ScenarioDecl],
    topology: &Topology,
    engines: &OrderMap<String, SharedEngine>,
    seed: u64,
) -> Summary {
    let mut reports = Vec::with_capacity(decls.len());
    for decl in decls {
        reports.push(run_one(*decl, topology, engines, seed).await);
    }
    Summary(reports)
}
