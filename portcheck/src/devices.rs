// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The engines the scenarios run their commands through.

use engine::{SharedEngine, SshEngine, SshParamsBuilder};
use ordermap::OrderMap;
use std::sync::Arc;
use test_utils::Lab;
use topology::{ConnectionInfo, Topology};
use tracing::{debug, info, warn};

fn ssh_params(conn: &ConnectionInfo) -> color_eyre::Result<engine::SshParams> {
    let mut builder = SshParamsBuilder::default();
    builder
        .host(conn.host.as_str())
        .port(conn.port)
        .user(conn.user.as_str());
    if let Some(var) = &conn.password_env {
        builder.password_env(var.as_str());
    }
    Ok(builder.build()?)
}

/// An SSH engine for every player of the topology.
pub fn ssh_engines(topology: &Topology) -> color_eyre::Result<OrderMap<String, SharedEngine>> {
    let mut engines = OrderMap::new();
    for (name, player) in topology.players() {
        let params = ssh_params(&player.connection)?;
        debug!("{name} is reached at {params}");
        let engine: SharedEngine = Arc::new(SshEngine::new(params));
        engines.insert(name.to_string(), engine);
    }
    Ok(engines)
}

/// Simulated devices wired as in the standard lab, with their topology.
pub fn simulated(topology: Option<&std::path::Path>) -> color_eyre::Result<(Topology, OrderMap<String, SharedEngine>)> {
    if let Some(path) = topology {
        warn!("Simulating the standard lab, {} is not used", path.display());
    }
    let lab: Lab = test_utils::standard_lab()?;
    info!("Running against simulated devices");
    Ok((lab.topology(), lab.engines()))
}

/// Close the connections of every engine, logging the failures.
pub async fn disconnect_all(engines: &OrderMap<String, SharedEngine>) {
    for (name, engine) in engines {
        if let Err(e) = engine.disconnect().await {
            warn!("Failed to disconnect from {name}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOPOLOGY: &str = r"
players:
  dut:
    kind: sonic
    connection: { host: 10.0.0.1 }
    platform: x86_64-mlnx_msn2700-r0
    ports: { dut-ha-1: Ethernet0 }
  ha:
    kind: linux
    connection: { host: 10.0.0.2, port: 2222, user: root, password_env: HA_PASSWORD }
    ports: { ha-dut-1: enp1s0f0 }
interconnects:
  - [dut-ha-1, ha-dut-1]
";

    #[test]
    fn test_ssh_engines() {
        let topology = Topology::from_yaml_str(TOPOLOGY).unwrap();
        let engines = ssh_engines(&topology).unwrap();
        assert_eq!(engines.keys().collect::<Vec<_>>(), ["dut", "ha"]);

        let ha = &topology.players().find(|(n, _)| *n == "ha").unwrap().1.connection;
        assert_eq!(ssh_params(ha).unwrap().to_string(), "root@10.0.0.2:2222");
    }

    #[test]
    fn test_simulated() {
        let (topology, engines) = simulated(None).unwrap();
        assert_eq!(topology.players().count(), engines.len());
        assert!(engines.contains_key("dut"));
    }
}
