// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Configuration depending on a port: a port channel the port is a member
//! of, a VLAN the port (or its port channel) is a member of, and an IP
//! address on the topmost of those.

use crate::errors::ScenarioError;
use commands::{CommandError, SonicCli, VlanMode};
use harness::Context;
use ordermap::OrderMap;
use rand::Rng;
use rand::seq::IndexedRandom;
use strum::{Display, EnumIter, EnumString};
use tracing::{debug, info};

/// VLAN ids a scenario may allocate.
const MAX_VLAN_ID: u16 = 4094;
const MIN_VLAN_ID: u16 = 2;

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum Dependency {
    PortChannel,
    Vlan,
    Ip,
}

/// What was configured on top of one port.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PortDependencies {
    pub portchannel: Option<String>,
    pub vlan: Option<(u16, VlanMode)>,
    /// Interface and address with prefix length.
    pub ip: Option<(String, String)>,
}

impl PortDependencies {
    /// The interface an IP address is bound to: the VLAN, else the port
    /// channel, else the port itself.
    fn ip_interface(&self, port: &str) -> String {
        match (&self.vlan, &self.portchannel) {
            (Some((vid, _)), _) => format!("Vlan{vid}"),
            (None, Some(pc)) => pc.clone(),
            (None, None) => port.to_string(),
        }
    }
}

/// Plan the dependencies of `ports`, drawing the VLAN ids and mode.
fn plan(
    ctx: &mut Context,
    ports: &[String],
    deps: &[Dependency],
) -> Result<OrderMap<String, PortDependencies>, ScenarioError> {
    let count = u16::try_from(ports.len())
        .ok()
        .filter(|n| *n <= MAX_VLAN_ID - MIN_VLAN_ID)
        .ok_or_else(|| ScenarioError::Failed(format!("no room for {} VLANs", ports.len())))?;
    let vlans = if deps.contains(&Dependency::Vlan) {
        let start = ctx.rng().random_range(MIN_VLAN_ID..=MAX_VLAN_ID - count);
        let mode = *[VlanMode::Access, VlanMode::Trunk]
            .choose(ctx.rng())
            .unwrap_or(&VlanMode::Access);
        Some((start, mode))
    } else {
        None
    };

    let mut planned = OrderMap::new();
    for (idx, port) in (0u16..).zip(ports) {
        let mut port_deps = PortDependencies::default();
        if deps.contains(&Dependency::PortChannel) {
            port_deps.portchannel = Some(format!("PortChannel{:04}", idx + 1));
        }
        if let Some((start, mode)) = vlans {
            port_deps.vlan = Some((start + idx, mode));
        }
        if deps.contains(&Dependency::Ip) {
            let i = idx + 1;
            port_deps.ip = Some((port_deps.ip_interface(port), format!("{i}0.0.0.{i}/24")));
        }
        planned.insert(port.clone(), port_deps);
    }
    Ok(planned)
}

pub(crate) async fn remove_ips(dut: SonicCli, ips: Vec<(String, String)>) -> Result<(), CommandError> {
    let configured = dut.show_ip_interfaces().await?;
    for (iface, ip) in &ips {
        if configured.get(iface).is_some_and(|a| a.contains(ip)) {
            dut.remove_ip(iface, ip).await?;
        }
    }
    Ok(())
}

async fn remove_vlans(dut: SonicCli, vids: Vec<u16>) -> Result<(), CommandError> {
    let configured = dut.show_vlan_config().await?;
    for vid in vids {
        let Some(members) = configured.get(&vid) else {
            continue;
        };
        for member in members {
            dut.del_vlan_member(vid, member).await?;
        }
        dut.del_vlan(vid).await?;
    }
    Ok(())
}

async fn remove_portchannels(dut: SonicCli, names: Vec<String>) -> Result<(), CommandError> {
    let configured = dut.show_portchannels().await?;
    for name in &names {
        let Some(members) = configured.get(name) else {
            continue;
        };
        for member in members {
            dut.del_portchannel_member(name, member).await?;
        }
        dut.del_portchannel(name).await?;
    }
    Ok(())
}

/// Configure `deps` on top of every port. With `push_cleanup`, removing
/// them is registered for teardown, IP addresses first and port channels
/// last. The removal only touches what is still configured by then.
pub async fn set_dependencies(
    ctx: &mut Context,
    ports: &[String],
    deps: &[Dependency],
    push_cleanup: bool,
) -> Result<OrderMap<String, PortDependencies>, ScenarioError> {
    let planned = plan(ctx, ports, deps)?;
    let dut = ctx.dut().clone();
    if push_cleanup {
        let ips: Vec<_> = planned.values().filter_map(|d| d.ip.clone()).collect();
        let vids: Vec<_> = planned.values().filter_map(|d| d.vlan.map(|(v, _)| v)).collect();
        let pcs: Vec<_> = planned.values().filter_map(|d| d.portchannel.clone()).collect();
        if !ips.is_empty() {
            ctx.cleanup().push("remove IP addresses", remove_ips(dut.clone(), ips));
        }
        if !vids.is_empty() {
            ctx.cleanup().push("remove VLANs", remove_vlans(dut.clone(), vids));
        }
        if !pcs.is_empty() {
            ctx.cleanup()
                .push("remove port channels", remove_portchannels(dut.clone(), pcs));
        }
    }

    for (port, port_deps) in &planned {
        debug!("Dependencies of {port}: {port_deps:?}");
        let mut member = port.as_str();
        if let Some(pc) = &port_deps.portchannel {
            dut.add_portchannel(pc).await?;
            dut.add_portchannel_member(pc, port).await?;
            member = pc.as_str();
        }
        if let Some((vid, mode)) = port_deps.vlan {
            dut.add_vlan(vid).await?;
            dut.add_vlan_member(vid, member, mode).await?;
        }
        if let Some((iface, ip)) = &port_deps.ip {
            dut.add_ip(iface, ip).await?;
        }
    }
    info!("Configured {deps:?} on {} port(s)", planned.len());
    Ok(planned)
}

/// Check that none of the ports is a VLAN member, a port channel member or
/// has an IP address anymore.
pub async fn verify_no_dependencies(
    dut: &SonicCli,
    ports_deps: &OrderMap<String, PortDependencies>,
) -> Result<(), ScenarioError> {
    let vlans = dut.show_vlan_config().await?;
    let pcs = dut.show_portchannels().await?;
    let ips = dut.show_ip_interfaces().await?;
    for port in ports_deps.keys() {
        if let Some((vid, _)) = vlans.iter().find(|(_, m)| m.contains(port)) {
            return Err(ScenarioError::mismatch(&format!("VLAN of {port}"), "none", vid));
        }
        if let Some((pc, _)) = pcs.iter().find(|(_, m)| m.contains(port)) {
            return Err(ScenarioError::mismatch(&format!("port channel of {port}"), "none", pc));
        }
        if let Some(addresses) = ips.get(port).filter(|a| !a.is_empty()) {
            return Err(ScenarioError::mismatch(
                &format!("IP addresses of {port}"),
                "none",
                addresses.join(","),
            ));
        }
    }
    info!("No dependency left on {} port(s)", ports_deps.len());
    Ok(())
}
