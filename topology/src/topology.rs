// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Players, their ports and how the ports are cabled.

use crate::errors::TopologyError;
use crate::player::Player;
use ordermap::OrderMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::LazyLock;
use tracing::{debug, info};

/// The name of the switch under test.
pub const DUT: &str = "dut";

static LOOPBACK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^dut-lb\d+-\d$").unwrap_or_else(|_| unreachable!()));

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TopologyFile {
    players: OrderMap<String, Player>,
    #[serde(default)]
    interconnects: Vec<(String, String)>,
}

/// Where a port alias lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortRef {
    pub player: String,
    pub port: String,
}

#[derive(Debug, Clone)]
pub struct Topology {
    players: OrderMap<String, Player>,
    interconnects: Vec<(String, String)>,
    aliases: OrderMap<String, PortRef>,
    peers: OrderMap<String, String>,
}

impl Topology {
    fn build(file: TopologyFile) -> Result<Self, TopologyError> {
        if !file.players.contains_key(DUT) {
            return Err(TopologyError::MissingDut);
        }
        let mut aliases = OrderMap::new();
        for (name, player) in &file.players {
            for (alias, port) in &player.ports {
                let port_ref = PortRef {
                    player: name.clone(),
                    port: port.clone(),
                };
                if aliases.insert(alias.clone(), port_ref).is_some() {
                    return Err(TopologyError::DuplicateAlias(alias.clone()));
                }
            }
        }
        let mut peers = OrderMap::new();
        for (a, b) in &file.interconnects {
            if let Some(alias) = [a, b].into_iter().find(|alias| !aliases.contains_key(*alias)) {
                return Err(TopologyError::UnknownAlias(alias.clone()));
            }
            if let Some(alias) = [a, b].into_iter().find(|alias| peers.contains_key(*alias)) {
                return Err(TopologyError::DuplicateInterconnect(alias.clone()));
            }
            if a == b {
                return Err(TopologyError::SelfInterconnect(a.clone()));
            }
            peers.insert(a.clone(), b.clone());
            peers.insert(b.clone(), a.clone());
        }
        info!(
            "Topology with {} players, {} ports and {} interconnects",
            file.players.len(),
            aliases.len(),
            file.interconnects.len()
        );
        Ok(Topology {
            players: file.players,
            interconnects: file.interconnects,
            aliases,
            peers,
        })
    }

    pub fn from_yaml_str(yaml: &str) -> Result<Self, TopologyError> {
        Self::build(serde_yaml_ng::from_str(yaml)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, TopologyError> {
        debug!("Loading topology from {}", path.display());
        let yaml = std::fs::read_to_string(path).map_err(|err| TopologyError::Io {
            path: path.to_path_buf(),
            err,
        })?;
        Self::from_yaml_str(&yaml)
    }

    pub fn to_yaml_string(&self) -> Result<String, TopologyError> {
        let file = TopologyFile {
            players: self.players.clone(),
            interconnects: self.interconnects.clone(),
        };
        Ok(serde_yaml_ng::to_string(&file)?)
    }

    pub fn players(&self) -> impl Iterator<Item = (&str, &Player)> {
        self.players.iter().map(|(n, p)| (n.as_str(), p))
    }

    pub fn player(&self, name: &str) -> Result<&Player, TopologyError> {
        self.players
            .get(name)
            .ok_or_else(|| TopologyError::UnknownPlayer(name.to_string()))
    }

    pub fn dut(&self) -> &Player {
        // presence checked on build
        &self.players[DUT]
    }

    pub fn interconnects(&self) -> &[(String, String)] {
        &self.interconnects
    }

    /// The port name behind an alias.
    pub fn port(&self, alias: &str) -> Result<&str, TopologyError> {
        self.port_ref(alias).map(|r| r.port.as_str())
    }

    pub fn port_ref(&self, alias: &str) -> Result<&PortRef, TopologyError> {
        self.aliases
            .get(alias)
            .ok_or_else(|| TopologyError::UnknownAlias(alias.to_string()))
    }

    /// The port names of a player, in declaration order.
    pub fn player_ports(&self, player: &str) -> Result<Vec<&str>, TopologyError> {
        Ok(self
            .player(player)?
            .ports
            .values()
            .map(String::as_str)
            .collect())
    }

    /// The alias cabled to `alias`.
    pub fn peer(&self, alias: &str) -> Option<&str> {
        self.peers.get(alias).map(String::as_str)
    }

    /// The player and port cabled to a port of a player.
    pub fn peer_of(&self, player: &str, port: &str) -> Option<&PortRef> {
        let alias = self.players.get(player)?.alias_of(port)?;
        self.aliases.get(self.peer(alias)?)
    }

    /// Pairs of switch ports cabled to each other (aliases `dut-lbN-M`).
    /// Each port shows up in one pair only.
    pub fn dut_loopbacks(&self) -> Vec<(String, String)> {
        let mut seen = BTreeSet::new();
        let mut loopbacks = vec![];
        for (a, b) in &self.interconnects {
            if !LOOPBACK_RE.is_match(a) || !LOOPBACK_RE.is_match(b) {
                continue;
            }
            let (Some(pa), Some(pb)) = (self.aliases.get(a), self.aliases.get(b)) else {
                continue;
            };
            if pa.player != DUT || pb.player != DUT {
                continue;
            }
            if seen.insert(pa.port.clone()) && seen.insert(pb.port.clone()) {
                loopbacks.push((pa.port.clone(), pb.port.clone()));
            }
        }
        loopbacks
    }

    /// The loopback reserved for breakouts into `split` ports.
    pub fn split_loopback(&self, split: u8) -> Option<(String, String)> {
        let p1 = self.port(&format!("dut-lb-splt{split}-p1-1")).ok()?;
        let p2 = self.port(&format!("dut-lb-splt{split}-p2-1")).ok()?;
        Some((p1.to_string(), p2.to_string()))
    }

    /// The `index`th link between the switch and `host`, as
    /// (switch port, host port).
    pub fn dut_host_port(&self, host: &str, index: u32) -> Option<(String, String)> {
        let dut = self.port(&format!("dut-{host}-{index}")).ok()?;
        let peer = self.port(&format!("{host}-dut-{index}")).ok()?;
        Some((dut.to_string(), peer.to_string()))
    }

    /// Every link between the switch and `host`, in index order.
    pub fn dut_host_ports(&self, host: &str) -> Vec<(String, String)> {
        (1..)
            .map_while(|i| self.dut_host_port(host, i))
            .collect()
    }
}
