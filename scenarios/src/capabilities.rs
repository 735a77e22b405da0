// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! What the scenarios learn about the ports of the switch before touching
//! them: breakout capabilities, lanes, aliases and the loopbacks worth
//! testing.

use crate::errors::ScenarioError;
use commands::SonicCli;
use harness::Context;
use model::capability::{SpeedsBySplit, lb_mutual_speeds, max_speed};
use model::{InterfaceType, PortBreakoutInfo, Speed, SpeedSet, TypeTable};
use ordermap::OrderMap;
use parse::alias_number;
use std::collections::{BTreeMap, BTreeSet};
use topology::Topology;
use tracing::{debug, info};

/// Two ports cabled to each other. The second one may belong to a host.
pub type Loopback = (String, String);

/// Loopbacks to test, per split number of their ports.
pub type LoopbacksBySplit = BTreeMap<u8, Vec<Loopback>>;

pub fn lb_ports(lb: &Loopback) -> [&str; 2] {
    [lb.0.as_str(), lb.1.as_str()]
}

/// Every port of the given loopbacks, in order.
pub fn tested_ports(lbs: &LoopbacksBySplit) -> Vec<String> {
    lbs.values()
        .flatten()
        .flat_map(|(a, b)| [a.clone(), b.clone()])
        .collect()
}

/// The platform of the switch under test.
pub fn dut_platform(topology: &Topology) -> Result<String, ScenarioError> {
    topology
        .dut()
        .platform
        .clone()
        .ok_or_else(|| ScenarioError::Skipped("the switch has no platform in the topology".to_string()))
}

/// Breakout capabilities of every physical port of a switch of `platform`.
pub async fn breakout_info(
    dut: &SonicCli,
    platform: &str,
) -> Result<OrderMap<String, PortBreakoutInfo>, ScenarioError> {
    let infos = dut.breakout_info(platform).await?;
    debug!("Breakout information of {} port(s)", infos.len());
    Ok(infos)
}

/// Speeds of every port per split number.
pub fn speeds_by_split(infos: &OrderMap<String, PortBreakoutInfo>) -> SpeedsBySplit {
    infos
        .iter()
        .map(|(port, info)| (port.clone(), info.speeds_by_split()))
        .collect()
}

/// Number of lanes of every port, from the status table.
pub async fn port_lanes(dut: &SonicCli) -> Result<OrderMap<String, usize>, ScenarioError> {
    let table = dut.show_status().await?;
    Ok(table
        .iter()
        .map(|(port, row)| {
            let lanes = row
                .get("Lanes")
                .map_or(0, |l| l.split(',').filter(|l| !l.trim().is_empty()).count());
            (port.clone(), lanes)
        })
        .collect())
}

/// The number `mlxlink` knows each port by.
pub async fn alias_numbers(dut: &SonicCli) -> Result<OrderMap<String, u32>, ScenarioError> {
    let aliases = dut.show_aliases().await?;
    Ok(aliases
        .iter()
        .filter_map(|(port, alias)| alias_number(alias).map(|n| (port.clone(), n)))
        .collect())
}

pub fn port_alias_number(numbers: &OrderMap<String, u32>, port: &str) -> Result<u32, ScenarioError> {
    numbers
        .get(port)
        .copied()
        .ok_or_else(|| ScenarioError::Failed(format!("{port} has no alias number")))
}

/// Speeds per split number and lane counts of the ports, and the interface
/// types they may run.
#[derive(Debug, Clone)]
pub struct PortCapabilities {
    pub speeds: SpeedsBySplit,
    pub lanes: OrderMap<String, usize>,
    pub types: TypeTable,
}

impl PortCapabilities {
    pub async fn discover(ctx: &mut Context) -> Result<Self, ScenarioError> {
        let dut = ctx.dut().clone();
        let platform = dut_platform(ctx.topology())?;
        let infos = breakout_info(&dut, &platform).await?;
        Ok(PortCapabilities {
            speeds: speeds_by_split(&infos),
            lanes: port_lanes(&dut).await?,
            types: TypeTable::copper(),
        })
    }

    /// Account for a host interface cabled to `dut_port`. It runs unsplit
    /// over as many lanes as the switch port.
    pub fn add_host_port(&mut self, iface: &str, dut_port: &str, supported: SpeedSet) -> Result<(), ScenarioError> {
        let lanes = self.lanes(dut_port)?;
        self.lanes.insert(iface.to_string(), lanes);
        self.speeds
            .insert(iface.to_string(), BTreeMap::from([(1, supported)]));
        Ok(())
    }

    pub fn lanes(&self, port: &str) -> Result<usize, ScenarioError> {
        self.lanes
            .get(port)
            .copied()
            .ok_or_else(|| ScenarioError::Failed(format!("{port} has no lanes")))
    }

    /// Interface types `port` can run at least one of `speeds` with.
    pub fn matched_types(&self, port: &str, speeds: &SpeedSet) -> Result<BTreeSet<InterfaceType>, ScenarioError> {
        Ok(self.types.matched_types(self.lanes(port)?, speeds))
    }

    /// The widest and the narrowest types running `port` at `speed`.
    pub fn type_range(&self, port: &str, speed: Speed) -> Result<(InterfaceType, InterfaceType), ScenarioError> {
        let matched = self.matched_types(port, &SpeedSet::from([speed]))?;
        let widest = matched.iter().max_by_key(|t| t.width());
        let narrowest = matched.iter().min_by_key(|t| t.width());
        match (widest, narrowest) {
            (Some(w), Some(n)) => Ok((w.clone(), n.clone())),
            _ => Err(ScenarioError::Failed(format!("no interface type runs {port} at {speed}"))),
        }
    }
}

/// One loopback per split number: the fastest plain loopback, and the
/// loopbacks dedicated to 2 and 4 way splits when the switch can run them.
pub fn autoneg_loopbacks(topology: &Topology, speeds: &SpeedsBySplit) -> LoopbacksBySplit {
    let mut lbs = LoopbacksBySplit::new();
    let mut best: Option<(model::Speed, Loopback)> = None;
    for lb in topology.dut_loopbacks() {
        let Some(max) = max_speed(&lb_mutual_speeds(lb_ports(&lb), 1, speeds)) else {
            continue;
        };
        if best.as_ref().is_none_or(|(b, _)| max > *b) {
            best = Some((max, lb));
        }
    }
    if let Some((_, lb)) = best {
        lbs.insert(1, vec![lb]);
    }
    if let Some(lb) = topology.split_loopback(2) {
        lbs.insert(2, vec![lb]);
    }
    if let Some(lb) = topology
        .split_loopback(4)
        .filter(|lb| !lb_mutual_speeds(lb_ports(lb), 4, speeds).is_empty())
    {
        lbs.insert(4, vec![lb]);
    }
    info!("Tested loopbacks: {lbs:?}");
    lbs
}
