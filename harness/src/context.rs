// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! What a scenario works with.

use crate::cleanup::CleanupList;
use crate::errors::HarnessError;
use commands::{LinuxCli, NvueCli, SonicCli};
use engine::SharedEngine;
use ordermap::OrderMap;
use rand::SeedableRng;
use rand::rngs::StdRng;
use topology::{DUT, PlayerKind, Topology};
use tracing::info;

/// The setup, a command line for each of its players, the random source of
/// the run and the teardown actions registered so far.
pub struct Context {
    topology: Topology,
    engines: OrderMap<String, SharedEngine>,
    dut: SonicCli,
    hosts: OrderMap<String, LinuxCli>,
    nvue: OrderMap<String, NvueCli>,
    seed: u64,
    rng: StdRng,
    cleanup: CleanupList,
}

impl Context {
    /// Build a context from an engine for each player of the topology.
    /// Randomized choices are drawn from a generator seeded with `seed`.
    pub fn new(
        topology: Topology,
        engines: OrderMap<String, SharedEngine>,
        seed: u64,
    ) -> Result<Self, HarnessError> {
        let mut dut = None;
        let mut hosts = OrderMap::new();
        let mut nvue = OrderMap::new();
        for (name, player) in topology.players() {
            let engine = engines
                .get(name)
                .cloned()
                .ok_or_else(|| HarnessError::MissingEngine(name.to_string()))?;
            match player.kind {
                PlayerKind::Sonic if name == DUT => dut = Some(SonicCli::new(engine)),
                PlayerKind::Sonic => {}
                PlayerKind::Linux => {
                    hosts.insert(name.to_string(), LinuxCli::new(engine));
                }
                PlayerKind::Nvue => {
                    nvue.insert(name.to_string(), NvueCli::new(engine));
                }
            }
        }
        // an NVUE switch under test has no SONiC command line, the engine
        // still answers the few SONiC show commands used to find its ports
        let dut = match dut {
            Some(dut) => dut,
            None => SonicCli::new(
                engines
                    .get(DUT)
                    .cloned()
                    .ok_or_else(|| HarnessError::MissingEngine(DUT.to_string()))?,
            ),
        };
        info!("Random seed: {seed}");
        Ok(Context {
            topology,
            engines,
            dut,
            hosts,
            nvue,
            seed,
            rng: StdRng::seed_from_u64(seed),
            cleanup: CleanupList::new(),
        })
    }

    pub fn topology(&self) -> &Topology {
        &self.topology
    }

    pub fn engine(&self, player: &str) -> Option<&SharedEngine> {
        self.engines.get(player)
    }

    pub fn engines(&self) -> impl Iterator<Item = (&str, &SharedEngine)> {
        self.engines.iter().map(|(n, e)| (n.as_str(), e))
    }

    pub fn dut(&self) -> &SonicCli {
        &self.dut
    }

    pub fn host(&self, name: &str) -> Option<&LinuxCli> {
        self.hosts.get(name)
    }

    pub fn hosts(&self) -> impl Iterator<Item = (&str, &LinuxCli)> {
        self.hosts.iter().map(|(n, c)| (n.as_str(), c))
    }

    pub fn nvue(&self, name: &str) -> Option<&NvueCli> {
        self.nvue.get(name)
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn rng(&mut self) -> &mut StdRng {
        &mut self.rng
    }

    pub fn cleanup(&mut self) -> &mut CleanupList {
        &mut self.cleanup
    }

    /// Run the teardown actions registered so far.
    pub async fn run_cleanup(&mut self) -> Result<(), HarnessError> {
        self.cleanup.run().await
    }
}
