// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A simulated SONiC switch.
//!
//! The switch keeps a running configuration and a saved one. `config save`
//! copies the former into the latter, any reboot or `config reload` brings
//! the saved one back. `config_db.json` shows the saved configuration.

use crate::errors::SimError;
use crate::link::{LinkState, Side};
use crate::render::{self, MlxlinkView, TextTable};
use crate::reply::{Refusal, Reply, refusal, refuse};
use model::capability::expected_width;
use model::iftype::{join_types, parse_type_list};
use model::port::{port_name, port_number};
use model::{AutoNeg, BreakoutMode, FecMode, InterfaceType, ModelError, Mtu, Speed, SpeedSet, TypeTable};
use ordermap::OrderMap;
use parse::platform::{BreakoutCfg, ConfigDb, PlatformJson, PlatformPort, PortCfg};
use std::collections::{BTreeMap, BTreeSet};
use std::net::Ipv4Addr;
use std::str::FromStr;
use tracing::debug;

pub(crate) const CONFIG_DB_PATH: &str = "/etc/sonic/config_db.json";
pub(crate) const MST_DEVICE: &str = "mt53104_pciconf0";

/// Containers `docker ps` lists on a healthy switch.
const CONTAINERS: [&str; 10] = [
    "database",
    "swss",
    "syncd",
    "bgp",
    "teamd",
    "pmon",
    "lldp",
    "dhcp_relay",
    "snmp",
    "radv",
];

const DEFAULT_MTU: u32 = 9100;

const INVALID_AUTONEG_MODE: &str = "Error: Invalid value for \"<mode>\": invalid choice: {}. (choose from enabled, disabled)";

/// A front panel port of the switch, as the platform describes it.
#[derive(Debug, Clone)]
pub struct PhysicalSpec {
    pub name: String,
    pub lanes: usize,
    pub modes: Vec<BreakoutMode>,
    /// The mode the port starts in.
    pub mode: BreakoutMode,
    /// Speeds the cable plugged in the port supports.
    pub cable: SpeedSet,
}

impl PhysicalSpec {
    /// A four lane port cabled for every speed its modes offer.
    pub fn new(name: &str, modes: &[&str], mode: &str) -> Result<Self, SimError> {
        let modes = modes
            .iter()
            .map(|m| BreakoutMode::from_str(m))
            .collect::<Result<Vec<_>, _>>()?;
        let mode = BreakoutMode::from_str(mode)?;
        let cable = modes.iter().flat_map(BreakoutMode::speeds).collect();
        Ok(PhysicalSpec {
            name: name.to_string(),
            lanes: 4,
            modes,
            mode,
            cable,
        })
    }
}

/// What a simulated switch is made of.
#[derive(Debug, Clone)]
pub struct SwitchSpec {
    pub platform: String,
    pub ports: Vec<PhysicalSpec>,
}

#[derive(Debug, Clone)]
struct PhysicalPort {
    name: String,
    number: u32,
    /// Front panel number, `N` of `etpN`.
    index: u32,
    lanes: Vec<u32>,
    modes: Vec<BreakoutMode>,
    cable: SpeedSet,
}

/// A port as the operating system sees it: a whole physical port or one of
/// the sub-ports of a breakout.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LogicalPort {
    pub(crate) name: String,
    pub(crate) alias: String,
    pub(crate) parent: String,
    /// First lane of the sub-port within its physical port.
    pub(crate) offset: usize,
    pub(crate) lanes: Vec<u32>,
    pub(crate) supported: SpeedSet,
    pub(crate) admin_up: bool,
    pub(crate) speed: Speed,
    pub(crate) mtu: u32,
    pub(crate) fec: FecMode,
    pub(crate) autoneg: AutoNeg,
    /// `None` advertises everything supported.
    pub(crate) adv_speeds: Option<SpeedSet>,
    pub(crate) iftype: Option<InterfaceType>,
    pub(crate) adv_types: Option<BTreeSet<InterfaceType>>,
}

fn sub_port_alias(index: u32, position: usize, split: bool) -> String {
    if split {
        let suffix = ('a'..='z')
            .nth(position)
            .map_or_else(|| position.to_string(), String::from);
        format!("etp{index}{suffix}")
    } else {
        format!("etp{index}")
    }
}

fn sub_ports(physical: &PhysicalPort, mode: &BreakoutMode) -> Result<Vec<LogicalPort>, ModelError> {
    let layout = mode.layout(&physical.name, physical.lanes.len())?;
    let split = layout.len() > 1;
    let ends: Vec<usize> = layout
        .iter()
        .skip(1)
        .map(|(offset, _)| *offset)
        .chain(std::iter::once(physical.lanes.len()))
        .collect();
    layout
        .iter()
        .zip(ends)
        .enumerate()
        .map(|(position, ((offset, speed), end))| {
            let shift = u32::try_from(*offset)
                .map_err(|_| ModelError::InvalidPortName(physical.name.clone()))?;
            Ok(LogicalPort {
                name: port_name(physical.number + shift),
                alias: sub_port_alias(physical.index, position, split),
                parent: physical.name.clone(),
                offset: *offset,
                lanes: physical.lanes[*offset..end].to_vec(),
                supported: mode.speeds(),
                admin_up: true,
                speed: *speed,
                mtu: DEFAULT_MTU,
                fec: FecMode::None,
                autoneg: AutoNeg::Disabled,
                adv_speeds: None,
                iftype: None,
                adv_types: None,
            })
        })
        .collect()
}

fn join_numbers(numbers: &[u32]) -> String {
    numbers
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(",")
}

fn up_down(up: bool) -> String {
    if up { "up" } else { "down" }.to_string()
}

fn invalid_port(port: &str) -> Refusal {
    refusal(format!("Error: Invalid port {port}"))
}

fn invalid_speed(value: &str) -> Refusal {
    refusal(format!("Invalid speed specified: {value}"))
}

fn invalid_type(value: &str) -> Refusal {
    refusal(format!("Invalid interface type specified: {value}"))
}

/// Speeds given in Mb, each of which the port must support.
fn parse_supported_speeds(value: &str, supported: &SpeedSet) -> Result<SpeedSet, Refusal> {
    value
        .split(',')
        .map(|s| {
            s.trim()
                .parse::<u32>()
                .ok()
                .and_then(|mbps| Speed::from_mbps(mbps).ok())
                .filter(|speed| supported.contains(speed))
                .ok_or_else(|| invalid_speed(value))
        })
        .collect()
}

fn parse_vid(vid: &str) -> Result<u16, Refusal> {
    vid.parse::<u16>()
        .ok()
        .filter(|v| (1..=4094).contains(v))
        .ok_or_else(|| refusal(format!("Error: Invalid VLAN ID {vid} (1-4094)")))
}

fn valid_address(ip: &str) -> bool {
    let Some((address, prefix)) = ip.split_once('/') else {
        return false;
    };
    address.parse::<Ipv4Addr>().is_ok() && prefix.parse::<u8>().is_ok_and(|p| p <= 32)
}

/// The part of the configuration that is saved and reloaded.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct SwitchConfig {
    breakout: BTreeMap<String, BreakoutMode>,
    ports: BTreeMap<u32, LogicalPort>,
    /// VLAN id to its members, `true` for tagged ones.
    vlans: BTreeMap<u16, BTreeMap<String, bool>>,
    portchannels: BTreeMap<String, BTreeSet<String>>,
    ips: BTreeMap<String, BTreeSet<String>>,
}

impl SwitchConfig {
    pub(crate) fn port(&self, name: &str) -> Option<&LogicalPort> {
        self.ports.get(&port_number(name).ok()?)
    }

    fn port_mut(&mut self, name: &str) -> Option<&mut LogicalPort> {
        self.ports.get_mut(&port_number(name).ok()?)
    }

    fn vlan_member(&self, port: &str) -> Option<u16> {
        self.vlans
            .iter()
            .find(|(_, members)| members.contains_key(port))
            .map(|(vid, _)| *vid)
    }

    fn portchannel_of(&self, port: &str) -> Option<&str> {
        self.portchannels
            .iter()
            .find(|(_, members)| members.contains(port))
            .map(|(name, _)| name.as_str())
    }

    fn has_ips(&self, iface: &str) -> bool {
        self.ips.get(iface).is_some_and(|ips| !ips.is_empty())
    }

    fn has_dependencies(&self, port: &str) -> bool {
        self.vlan_member(port).is_some() || self.portchannel_of(port).is_some() || self.has_ips(port)
    }

    fn drop_dependencies(&mut self, port: &str) {
        for members in self.vlans.values_mut() {
            members.remove(port);
        }
        for members in self.portchannels.values_mut() {
            members.remove(port);
        }
        self.ips.remove(port);
    }

    fn interface_exists(&self, iface: &str) -> bool {
        if let Some(vid) = iface.strip_prefix("Vlan") {
            return vid.parse::<u16>().is_ok_and(|v| self.vlans.contains_key(&v));
        }
        self.port(iface).is_some() || self.portchannels.contains_key(iface)
    }

    /// The ports traffic of an interface goes through.
    pub(crate) fn members(&self, iface: &str) -> Option<Vec<String>> {
        if let Some(vid) = iface.strip_prefix("Vlan") {
            let members = self.vlans.get(&vid.parse::<u16>().ok()?)?;
            return Some(
                members
                    .keys()
                    .flat_map(|m| match self.portchannels.get(m) {
                        Some(ports) => ports.iter().cloned().collect(),
                        None => vec![m.clone()],
                    })
                    .collect(),
            );
        }
        if let Some(members) = self.portchannels.get(iface) {
            return Some(members.iter().cloned().collect());
        }
        self.port(iface).map(|p| vec![p.name.clone()])
    }

    /// The interface an address is configured on.
    pub(crate) fn owner_of(&self, address: &str) -> Option<&str> {
        self.ips
            .iter()
            .find(|(_, ips)| ips.iter().any(|ip| ip.split('/').next() == Some(address)))
            .map(|(iface, _)| iface.as_str())
    }

    fn add_vlan(&mut self, vid: &str) -> Reply {
        let vid = parse_vid(vid)?;
        if self.vlans.contains_key(&vid) {
            return refuse(format!("Error: Vlan{vid} already exists"));
        }
        self.vlans.insert(vid, BTreeMap::new());
        Ok(String::new())
    }

    fn del_vlan(&mut self, vid: &str) -> Reply {
        let vid = parse_vid(vid)?;
        let Some(members) = self.vlans.get(&vid) else {
            return refuse(format!("Error: Vlan{vid} does not exist"));
        };
        if !members.is_empty() {
            return refuse(format!(
                "Error: Vlan{vid} can not be removed. First remove all members assigned to this VLAN."
            ));
        }
        if self.has_ips(&format!("Vlan{vid}")) {
            return refuse(format!(
                "Error: Vlan{vid} can not be removed. First remove IP addresses assigned to this VLAN"
            ));
        }
        self.vlans.remove(&vid);
        Ok(String::new())
    }

    fn add_vlan_member(&mut self, vid: &str, port: &str, tagged: bool) -> Reply {
        let vid = parse_vid(vid)?;
        if !self.vlans.contains_key(&vid) {
            return refuse(format!("Error: Vlan{vid} does not exist"));
        }
        if self.port(port).is_none() && !self.portchannels.contains_key(port) {
            return refuse(format!("Error: {port} does not exist"));
        }
        if let Some(pc) = self.portchannel_of(port) {
            return refuse(format!("Error: {port} is part of portchannel {pc}"));
        }
        if self.has_ips(port) {
            return refuse(format!("Error: {port} is a router interface!"));
        }
        if !tagged {
            let untagged = self
                .vlans
                .iter()
                .find(|(_, members)| members.get(port) == Some(&false));
            if let Some((other, _)) = untagged {
                return refuse(format!("Error: {port} is already untagged member in Vlan{other}"));
            }
        }
        let members = self.vlans.entry(vid).or_default();
        if members.contains_key(port) {
            return refuse(format!("Error: {port} is already a member of Vlan{vid}"));
        }
        members.insert(port.to_string(), tagged);
        Ok(String::new())
    }

    fn del_vlan_member(&mut self, vid: &str, port: &str) -> Reply {
        let vid = parse_vid(vid)?;
        let Some(members) = self.vlans.get_mut(&vid) else {
            return refuse(format!("Error: Vlan{vid} does not exist"));
        };
        if members.remove(port).is_none() {
            return refuse(format!("Error: {port} is not a member of Vlan{vid}"));
        }
        Ok(String::new())
    }

    fn add_portchannel(&mut self, name: &str) -> Reply {
        let valid = name
            .strip_prefix("PortChannel")
            .is_some_and(|n| !n.is_empty() && n.len() <= 4 && n.chars().all(|c| c.is_ascii_digit()));
        if !valid {
            return refuse(format!(
                "Error: PortChannel name {name} is invalid!! Name should have prefix 'PortChannel' and suffix '<0-9999>'"
            ));
        }
        if self.portchannels.contains_key(name) {
            return refuse(format!("Error: PortChannel {name} already exists!"));
        }
        self.portchannels.insert(name.to_string(), BTreeSet::new());
        Ok(String::new())
    }

    fn del_portchannel(&mut self, name: &str) -> Reply {
        let Some(members) = self.portchannels.get(name) else {
            return refuse(format!("Error: PortChannel {name} does not exist!"));
        };
        if !members.is_empty() {
            return refuse(format!(
                "Error: Portchannel {name} contains members. Remove members before deleting Portchannel!"
            ));
        }
        if let Some(vid) = self.vlan_member(name) {
            return refuse(format!("Error: Portchannel {name} is a member of Vlan{vid}"));
        }
        self.portchannels.remove(name);
        self.ips.remove(name);
        Ok(String::new())
    }

    fn add_portchannel_member(&mut self, name: &str, port: &str) -> Reply {
        if !self.portchannels.contains_key(name) {
            return refuse(format!("Error: PortChannel {name} does not exist!"));
        }
        if self.port(port).is_none() {
            return refuse(format!("Error: {port} does not exist"));
        }
        if let Some(pc) = self.portchannel_of(port) {
            return refuse(format!("Error: {port} is already member of {pc}"));
        }
        if let Some(vid) = self.vlan_member(port) {
            return refuse(format!("Error: {port} has vlan Vlan{vid} configured"));
        }
        if self.has_ips(port) {
            return refuse(format!("Error: {port} has ip address configured"));
        }
        self.portchannels
            .entry(name.to_string())
            .or_default()
            .insert(port.to_string());
        Ok(String::new())
    }

    fn del_portchannel_member(&mut self, name: &str, port: &str) -> Reply {
        let Some(members) = self.portchannels.get_mut(name) else {
            return refuse(format!("Error: PortChannel {name} does not exist!"));
        };
        if !members.remove(port) {
            return refuse(format!("Error: {port} is not a member of portchannel {name}"));
        }
        Ok(String::new())
    }

    fn add_ip(&mut self, iface: &str, ip: &str) -> Reply {
        if !self.interface_exists(iface) {
            return refuse(format!("Error: Interface {iface} does not exist"));
        }
        if let Some(pc) = self.portchannel_of(iface) {
            return refuse(format!("Error: {iface} is configured as a member of portchannel {pc}"));
        }
        if let Some(vid) = self.vlan_member(iface) {
            return refuse(format!("Error: {iface} is configured as a member of vlan Vlan{vid}"));
        }
        if !valid_address(ip) {
            return refuse(format!("Error: '{ip}' is not a valid IP address"));
        }
        self.ips
            .entry(iface.to_string())
            .or_default()
            .insert(ip.to_string());
        Ok(String::new())
    }

    fn remove_ip(&mut self, iface: &str, ip: &str) -> Reply {
        let removed = self.ips.get_mut(iface).is_some_and(|ips| ips.remove(ip));
        if !removed {
            return refuse(format!("Error: IP address {ip} does not exist on {iface}"));
        }
        if !self.has_ips(iface) {
            self.ips.remove(iface);
        }
        Ok(String::new())
    }

    fn vlan_column(&self, port: &str) -> String {
        if let Some(pc) = self.portchannel_of(port) {
            pc.to_string()
        } else if self.vlan_member(port).is_some() {
            "trunk".to_string()
        } else {
            "routed".to_string()
        }
    }
}

/// Answers the operational state of the link of a port, `None` when down.
pub(crate) type LinkOracle<'a> = &'a dyn Fn(&str) -> Option<LinkState>;

#[derive(Debug, Clone)]
pub(crate) struct SwitchState {
    platform: String,
    physical: OrderMap<String, PhysicalPort>,
    running: SwitchConfig,
    saved: SwitchConfig,
}

impl SwitchState {
    pub(crate) fn new(spec: &SwitchSpec) -> Result<Self, SimError> {
        let mut physical = OrderMap::new();
        let mut running = SwitchConfig::default();
        for (position, port) in spec.ports.iter().enumerate() {
            if !port.modes.contains(&port.mode) {
                return Err(SimError::DefaultMode {
                    port: port.name.clone(),
                    mode: port.mode.to_string(),
                });
            }
            let number = port_number(&port.name)?;
            let lanes = (0..port.lanes)
                .map(|lane| u32::try_from(lane).map(|l| number + l))
                .collect::<Result<Vec<_>, _>>()
                .map_err(|_| ModelError::InvalidPortName(port.name.clone()))?;
            let index = u32::try_from(position + 1)
                .map_err(|_| ModelError::InvalidPortName(port.name.clone()))?;
            let phys = PhysicalPort {
                name: port.name.clone(),
                number,
                index,
                lanes,
                modes: port.modes.clone(),
                cable: port.cable.clone(),
            };
            for sub in sub_ports(&phys, &port.mode)? {
                if running.ports.insert(port_number(&sub.name)?, sub).is_some() {
                    return Err(SimError::DuplicatePort(port.name.clone()));
                }
            }
            running.breakout.insert(port.name.clone(), port.mode.clone());
            if physical.insert(port.name.clone(), phys).is_some() {
                return Err(SimError::DuplicatePort(port.name.clone()));
            }
        }
        Ok(SwitchState {
            platform: spec.platform.clone(),
            physical,
            saved: running.clone(),
            running,
        })
    }

    pub(crate) fn running(&self) -> &SwitchConfig {
        &self.running
    }

    pub(crate) fn save(&mut self) {
        self.saved = self.running.clone();
    }

    /// What a reboot or a `config reload` does to the configuration.
    pub(crate) fn restore(&mut self) {
        self.running = self.saved.clone();
    }

    /// The physical port a port is cut from and its lane offset within it.
    pub(crate) fn cabling(&self, port: &str) -> Option<(&str, usize)> {
        self.running
            .port(port)
            .map(|p| (p.parent.as_str(), p.offset))
    }

    /// The sub-port of a physical port starting at lane `offset`.
    pub(crate) fn port_at(&self, physical: &str, offset: usize) -> Option<&str> {
        let phys = self.physical.get(physical)?;
        let number = phys.number + u32::try_from(offset).ok()?;
        self.running
            .ports
            .get(&number)
            .filter(|p| p.parent == physical && p.offset == offset)
            .map(|p| p.name.as_str())
    }

    pub(crate) fn side(&self, port: &str, types: &TypeTable) -> Option<Side> {
        let p = self.running.port(port)?;
        let adv_types = p
            .adv_types
            .clone()
            .unwrap_or_else(|| types.matched_types(p.lanes.len(), &p.supported));
        Some(Side {
            admin_up: p.admin_up,
            speed: p.speed,
            autoneg: p.autoneg.is_enabled(),
            lanes: p.lanes.len(),
            adv_speeds: p.adv_speeds.clone().unwrap_or_else(|| p.supported.clone()),
            adv_types,
            iftype: p.iftype.clone(),
            fec: p.fec,
        })
    }

    /// Run a configuration command. `None` if `tokens` is not one.
    pub(crate) fn configure(&mut self, tokens: &[&str], types: &TypeTable) -> Option<Reply> {
        let reply = match tokens {
            ["sudo", "config", "interface", "breakout", port, mode, flags @ ..] => {
                self.breakout(port, mode, flags.contains(&"-f"))
            }
            ["sudo", "config", "interface", "ip", "add", iface, ip] => self.running.add_ip(iface, ip),
            ["sudo", "config", "interface", "ip", "remove", iface, ip] => {
                self.running.remove_ip(iface, ip)
            }
            ["sudo", "config", "interface", setting, port, value @ ..] => {
                self.interface(setting, port, value.first().copied(), types)
            }
            ["sudo", "config", "vlan", "add", vid] => self.running.add_vlan(vid),
            ["sudo", "config", "vlan", "del", vid] => self.running.del_vlan(vid),
            ["sudo", "config", "vlan", "member", "add", "-u", vid, port] => {
                self.running.add_vlan_member(vid, port, false)
            }
            ["sudo", "config", "vlan", "member", "add", vid, port] => {
                self.running.add_vlan_member(vid, port, true)
            }
            ["sudo", "config", "vlan", "member", "del", vid, port] => {
                self.running.del_vlan_member(vid, port)
            }
            ["sudo", "config", "portchannel", "add", name] => self.running.add_portchannel(name),
            ["sudo", "config", "portchannel", "del", name] => self.running.del_portchannel(name),
            ["sudo", "config", "portchannel", "member", "add", name, port] => {
                self.running.add_portchannel_member(name, port)
            }
            ["sudo", "config", "portchannel", "member", "del", name, port] => {
                self.running.del_portchannel_member(name, port)
            }
            ["sudo", "config", "save", "-y"] => {
                self.save();
                Ok(format!(
                    "Running command: /usr/local/bin/sonic-cfggen -d --print-data > {CONFIG_DB_PATH}\n"
                ))
            }
            _ => return None,
        };
        Some(reply)
    }

    fn interface(&mut self, setting: &str, port: &str, value: Option<&str>, types: &TypeTable) -> Reply {
        // the mode is a choice checked before the port is looked up
        if let ("autoneg", Some(mode)) = (setting, value) {
            if mode != "enabled" && mode != "disabled" {
                return refuse(INVALID_AUTONEG_MODE.replace("{}", mode));
            }
        }
        let p = self.running.port_mut(port).ok_or_else(|| invalid_port(port))?;
        let supported_types = || types.matched_types(p.lanes.len(), &p.supported);
        match (setting, value) {
            ("startup", None) => p.admin_up = true,
            ("shutdown", None) => p.admin_up = false,
            ("speed", Some(v)) => {
                let speeds = parse_supported_speeds(v, &p.supported)?;
                p.speed = speeds.first().copied().ok_or_else(|| invalid_speed(v))?;
            }
            ("mtu", Some(v)) => {
                let mtu = Mtu::from_str(v)
                    .map_err(|_| refusal(format!("Error: Invalid MTU {v}, valid range is 552-9216")))?;
                p.mtu = mtu.to_u32();
            }
            ("autoneg", Some(v)) => {
                p.autoneg = AutoNeg::from_str(v).map_err(|_| refusal(INVALID_AUTONEG_MODE.replace("{}", v)))?;
            }
            ("advertised-speeds", Some("all")) => p.adv_speeds = None,
            ("advertised-speeds", Some(v)) => {
                p.adv_speeds = Some(parse_supported_speeds(v, &p.supported)?);
            }
            ("type", Some(v)) => {
                let iftype = InterfaceType::from_str(v).map_err(|_| invalid_type(v))?;
                if !supported_types().contains(&iftype) {
                    return Err(invalid_type(v));
                }
                p.iftype = Some(iftype);
            }
            ("advertised-types", Some("all")) => p.adv_types = None,
            ("advertised-types", Some(v)) => {
                let supported = supported_types();
                let list = parse_type_list(v).map_err(|_| invalid_type(v))?;
                if list.is_empty() || list.iter().any(|t| !supported.contains(t)) {
                    return Err(invalid_type(v));
                }
                p.adv_types = Some(list.into_iter().collect());
            }
            ("fec", Some(v)) => {
                p.fec = FecMode::from_str(v).map_err(|_| {
                    refusal(format!(
                        "Error: Invalid value for \"<interface_fec>\": invalid choice: {v}. (choose from rs, fc, none, auto)"
                    ))
                })?;
            }
            _ => return refuse(format!("Error: No such command \"{setting}\".")),
        }
        Ok(String::new())
    }

    fn breakout(&mut self, port: &str, mode: &str, force: bool) -> Reply {
        let Some(physical) = self.physical.get(port) else {
            return refuse(format!(
                "[ERROR] {port} interface is NOT present in BREAKOUT_CFG table of CONFIG DB"
            ));
        };
        let unavailable = || refusal(format!("[ERROR] Target mode {mode} is not available for the port {port}"));
        let target = BreakoutMode::from_str(mode).map_err(|_| unavailable())?;
        if !physical.modes.contains(&target) {
            return Err(unavailable());
        }
        let current = self.running.breakout.get(port).cloned();
        let old: Vec<LogicalPort> = self
            .running
            .ports
            .values()
            .filter(|p| p.parent == port)
            .cloned()
            .collect();
        if current.as_ref() == Some(&target) {
            debug!("{port} already runs {target}");
            return Ok(breakout_output(current.as_ref(), &target, &[], &[]));
        }
        let blocked: Vec<&str> = old
            .iter()
            .map(|p| p.name.as_str())
            .filter(|p| self.running.has_dependencies(p))
            .collect();
        if !blocked.is_empty() {
            if !force {
                return refuse(format!(
                    "Dependecies Exist. No further action will be taken\nPorts with dependencies: {}",
                    blocked.join(", ")
                ));
            }
            for p in blocked {
                self.running.drop_dependencies(p);
            }
        }
        let new = sub_ports(physical, &target).map_err(|e| refusal(format!("[ERROR] {e}")))?;
        for p in &old {
            self.running.drop_dependencies(&p.name);
            if let Ok(number) = port_number(&p.name) {
                self.running.ports.remove(&number);
            }
        }
        for p in &new {
            if let Ok(number) = port_number(&p.name) {
                self.running.ports.insert(number, p.clone());
            }
        }
        self.running.breakout.insert(port.to_string(), target.clone());
        Ok(breakout_output(current.as_ref(), &target, &old, &new))
    }

    /// Run a command that reads state. `None` if `tokens` is not one.
    pub(crate) fn show(&self, tokens: &[&str], link: LinkOracle<'_>) -> Option<Reply> {
        let reply = match tokens {
            ["sudo", "show", "interfaces", "status"] => Ok(self.status_table(link)),
            ["show", "interfaces", "alias"] => Ok(self.alias_table()),
            ["sudo", "show", "interfaces", "autoneg", "status"] => Ok(self.autoneg_table(None, link)),
            ["sudo", "show", "interfaces", "autoneg", "status", port] => match self.running.port(port) {
                Some(_) => Ok(self.autoneg_table(Some(port), link)),
                None => Err(invalid_port(port)),
            },
            ["sudo", "show", "interfaces", "fec", "status"] => Ok(self.fec_table(link)),
            ["show", "vlan", "config"] => Ok(self.vlan_table()),
            ["show", "interfaces", "portchannel"] => Ok(self.portchannel_table(link)),
            ["show", "ip", "interfaces"] => Ok(self.ip_table(link)),
            ["cat", CONFIG_DB_PATH] => Ok(self.config_db()),
            ["cat", path] => self.platform_json(path),
            ["ls", "/dev/mst"] => Ok(format!("{MST_DEVICE}\nmt53104_pci_cr0\n")),
            ["sudo", "mlxlink", "-d", device, "-p", number] => self.mlxlink(device, number, link),
            ["docker", "ps", "|", "grep", name] => docker(name),
            _ => return None,
        };
        Some(reply)
    }

    fn status_table(&self, link: LinkOracle<'_>) -> String {
        let mut table = TextTable::new(&[
            "Interface", "Lanes", "Speed", "MTU", "FEC", "Alias", "Vlan", "Oper", "Admin", "Type", "Asym PFC",
        ]);
        for p in self.running.ports.values() {
            let state = link(&p.name);
            let speed = state.as_ref().map_or(p.speed, |l| l.speed);
            table.row(vec![
                p.name.clone(),
                join_numbers(&p.lanes),
                speed.to_string(),
                p.mtu.to_string(),
                p.fec.to_string(),
                p.alias.clone(),
                self.running.vlan_column(&p.name),
                up_down(state.is_some()),
                up_down(p.admin_up),
                "QSFP28 or later".to_string(),
                "off".to_string(),
            ]);
        }
        table.render()
    }

    fn alias_table(&self) -> String {
        let mut table = TextTable::new(&["Name", "Alias"]);
        for p in self.running.ports.values() {
            table.row(vec![p.name.clone(), p.alias.clone()]);
        }
        table.render()
    }

    fn autoneg_table(&self, only: Option<&str>, link: LinkOracle<'_>) -> String {
        let mut table = TextTable::new(&[
            "Interface", "Auto-Neg Mode", "Speed", "Adv Speeds", "Type", "Adv Types", "Oper", "Admin",
        ]);
        let ports = self
            .running
            .ports
            .values()
            .filter(|p| only.is_none_or(|o| o == p.name));
        for p in ports {
            let state = link(&p.name);
            let speed = state.as_ref().map_or(p.speed, |l| l.speed);
            let iftype = match (&state, &p.iftype) {
                (Some(l), _) => l.iftype.to_string(),
                (None, Some(t)) => t.to_string(),
                (None, None) => "N/A".to_string(),
            };
            let adv_types = p
                .adv_types
                .as_ref()
                .map_or_else(|| "all".to_string(), join_types);
            table.row(vec![
                p.name.clone(),
                p.autoneg.sonic_str().to_string(),
                speed.to_string(),
                render::adv_speeds(p.adv_speeds.as_ref()),
                iftype,
                adv_types,
                up_down(state.is_some()),
                up_down(p.admin_up),
            ]);
        }
        table.render()
    }

    fn fec_table(&self, link: LinkOracle<'_>) -> String {
        let mut table = TextTable::new(&["Interface", "FEC Oper", "FEC Admin"]);
        for p in self.running.ports.values() {
            let oper = link(&p.name).map_or_else(|| "N/A".to_string(), |l| l.fec.to_string());
            table.row(vec![p.name.clone(), oper, p.fec.to_string()]);
        }
        table.render()
    }

    fn vlan_table(&self) -> String {
        let mut table = TextTable::new(&["Name", "VID", "Member", "Mode"]);
        for (vid, members) in &self.running.vlans {
            if members.is_empty() {
                table.row(vec![format!("Vlan{vid}"), vid.to_string()]);
            }
            for (member, tagged) in members {
                let mode = if *tagged { "tagged" } else { "untagged" };
                table.row(vec![
                    format!("Vlan{vid}"),
                    vid.to_string(),
                    member.clone(),
                    mode.to_string(),
                ]);
            }
        }
        table.render()
    }

    fn portchannel_table(&self, link: LinkOracle<'_>) -> String {
        let mut table = TextTable::new(&["No.", "Team Dev", "Protocol", "Ports"]);
        for (name, members) in &self.running.portchannels {
            let number = name.trim_start_matches("PortChannel");
            let ports: Vec<String> = members
                .iter()
                .map(|m| {
                    let flag = if link(m).is_some() { "S" } else { "D" };
                    format!("{m}({flag})")
                })
                .collect();
            let up = members.iter().any(|m| link(m).is_some());
            let protocol = if up { "LACP(A)(Up)" } else { "LACP(A)(Dw)" };
            table.row(vec![
                number.to_string(),
                name.clone(),
                protocol.to_string(),
                ports.join(" "),
            ]);
        }
        format!(
            "Flags: A - active, I - inactive, Up - up, Dw - Down, N/A - not available,\n       \
             S - selected, D - deselected, * - not synced\n{}",
            table.render()
        )
    }

    fn ip_table(&self, link: LinkOracle<'_>) -> String {
        let mut table = TextTable::new(&[
            "Interface",
            "Master",
            "IPv4 address/mask",
            "Admin/Oper",
            "BGP Neighbor",
            "Neighbor IP",
        ]);
        for (iface, ips) in &self.running.ips {
            let members = self.running.members(iface).unwrap_or_default();
            let oper = members.iter().any(|m| link(m).is_some());
            let admin = self.running.port(iface).is_none_or(|p| p.admin_up);
            for (i, ip) in ips.iter().enumerate() {
                let name = if i == 0 { iface.clone() } else { String::new() };
                let state = if i == 0 {
                    format!("{}/{}", up_down(admin), up_down(oper))
                } else {
                    String::new()
                };
                table.row(vec![name, String::new(), ip.clone(), state, "N/A".into(), "N/A".into()]);
            }
        }
        table.render()
    }

    fn config_db(&self) -> String {
        let db = ConfigDb {
            breakout_cfg: self
                .saved
                .breakout
                .iter()
                .map(|(port, mode)| {
                    let cfg = BreakoutCfg {
                        brkout_mode: mode.to_string(),
                    };
                    (port.clone(), cfg)
                })
                .collect(),
            port: self
                .saved
                .ports
                .values()
                .map(|p| {
                    let cfg = PortCfg {
                        alias: Some(p.alias.clone()),
                        lanes: Some(join_numbers(&p.lanes)),
                        speed: Some(p.speed.as_mbps().to_string()),
                        mtu: Some(p.mtu.to_string()),
                        fec: Some(p.fec.to_string()),
                        admin_status: Some(up_down(p.admin_up)),
                    };
                    (p.name.clone(), cfg)
                })
                .collect(),
        };
        serde_json::to_string_pretty(&db).unwrap_or_default()
    }

    fn platform_json(&self, path: &str) -> Reply {
        if path != format!("/usr/share/sonic/device/{}/platform.json", self.platform) {
            return refuse(format!("cat: {path}: No such file or directory"));
        }
        let interfaces = self
            .physical
            .values()
            .map(|phys| {
                let breakout_modes = phys
                    .modes
                    .iter()
                    .map(|mode| {
                        let count = mode.sub_port_count();
                        let aliases = (0..count)
                            .map(|i| sub_port_alias(phys.index, i, count > 1))
                            .collect();
                        (mode.to_string(), aliases)
                    })
                    .collect();
                let index = vec![phys.index; phys.lanes.len()];
                let port = PlatformPort {
                    index: join_numbers(&index),
                    lanes: join_numbers(&phys.lanes),
                    breakout_modes,
                };
                (phys.name.clone(), port)
            })
            .collect();
        serde_json::to_string_pretty(&PlatformJson { interfaces })
            .map_err(|e| refusal(e.to_string()))
    }

    fn mlxlink(&self, device: &str, number: &str, link: LinkOracle<'_>) -> Reply {
        if device != format!("/dev/mst/{MST_DEVICE}") {
            return refuse(format!("-E- Failed to open device: \"{device}\", No such file or directory"));
        }
        let no_port = || refusal(format!("-E- Invalid port number: {number}"));
        let index = number.parse::<u32>().map_err(|_| no_port())?;
        let phys = self
            .physical
            .values()
            .find(|p| p.index == index)
            .ok_or_else(no_port)?;
        let name = self.port_at(&phys.name, 0).ok_or_else(no_port)?;
        let p = self.running.port(name).ok_or_else(no_port)?;
        let view = MlxlinkView {
            admin_up: p.admin_up,
            link: link(name).map(|l| (l.speed, expected_width(&l.iftype, l.speed), l.fec)),
            autoneg: p.autoneg,
            enabled: p.adv_speeds.clone().unwrap_or_else(|| p.supported.clone()),
            cable: phys.cable.clone(),
            lanes: p.lanes.len(),
        };
        Ok(render::mlxlink(&view))
    }
}

fn docker(name: &str) -> Reply {
    if CONTAINERS.contains(&name) {
        Ok(format!(
            "3f1e2a9c0b7d   docker-{name}:latest   \"/usr/local/bin/supervisord\"   2 hours ago   Up 2 hours   {name}\n"
        ))
    } else {
        // grep found nothing
        Err(Refusal {
            status: 1,
            output: String::new(),
        })
    }
}

fn breakout_output(
    current: Option<&BreakoutMode>,
    target: &BreakoutMode,
    deleted: &[LogicalPort],
    added: &[LogicalPort],
) -> String {
    let speeds = |ports: &[LogicalPort]| {
        let map: BTreeMap<&str, String> = ports
            .iter()
            .map(|p| (p.name.as_str(), p.speed.as_mbps().to_string()))
            .collect();
        serde_json::to_string_pretty(&map).unwrap_or_default()
    };
    let current = current.map_or_else(|| "N/A".to_string(), ToString::to_string);
    format!(
        "\nRunning Breakout Mode : {current}\nTarget Breakout Mode : {target}\n\n\
         Ports to be deleted : \n {}\nPorts to be added : \n {}\n\n\
         After running Logic to limit the impact\n\n\
         Breakout process got successfully completed.\n",
        speeds(deleted),
        speeds(added)
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use parse::{parse_config_db, parse_platform_json, parse_show_table};
    use pretty_assertions::assert_eq;

    const MODES: [&str; 3] = ["1x100G[50G,40G,25G,10G,1G]", "2x50G[25G,10G,1G]", "4x25G[10G,1G]"];

    fn switch() -> SwitchState {
        let spec = SwitchSpec {
            platform: "x86_64-mlnx_msn3700-r0".to_string(),
            ports: vec![
                PhysicalSpec::new("Ethernet0", &MODES, MODES[0]).unwrap(),
                PhysicalSpec::new("Ethernet4", &MODES, MODES[1]).unwrap(),
                PhysicalSpec::new("Ethernet8", &MODES[..1], MODES[0]).unwrap(),
            ],
        };
        SwitchState::new(&spec).unwrap()
    }

    fn run(switch: &mut SwitchState, cmd: &str) -> Reply {
        let tokens: Vec<&str> = cmd.split_whitespace().collect();
        switch
            .configure(&tokens, &TypeTable::copper())
            .or_else(|| switch.show(&tokens, &|_| None))
            .unwrap()
    }

    #[test]
    fn test_initial_ports() {
        let switch = switch();
        let names: Vec<&str> = switch.running.ports.values().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Ethernet0", "Ethernet4", "Ethernet6", "Ethernet8"]);
        let sub = switch.running.port("Ethernet6").unwrap();
        assert_eq!(sub.alias, "etp2b");
        assert_eq!(sub.lanes, [6, 7]);
        assert_eq!(sub.speed, Speed::from_gbps(50));
        assert_eq!(switch.port_at("Ethernet4", 2), Some("Ethernet6"));
        assert_eq!(switch.port_at("Ethernet4", 1), None);
    }

    #[test]
    fn test_interface_settings() {
        let mut switch = switch();
        run(&mut switch, "sudo config interface speed Ethernet0 50000").unwrap();
        run(&mut switch, "sudo config interface advertised-speeds Ethernet0 10000,100000").unwrap();
        run(&mut switch, "sudo config interface type Ethernet0 CR4").unwrap();
        run(&mut switch, "sudo config interface shutdown Ethernet0").unwrap();
        let p = switch.running.port("Ethernet0").unwrap();
        assert_eq!(p.speed, Speed::from_gbps(50));
        assert_eq!(p.adv_speeds.as_ref().unwrap().len(), 2);
        assert!(!p.admin_up);

        let err = run(&mut switch, "sudo config interface advertised-speeds Ethernet0 30G").unwrap_err();
        assert!(err.output.starts_with("Invalid speed specified"));
        let err = run(&mut switch, "sudo config interface autoneg EthernetX enabled").unwrap_err();
        assert!(err.output.contains("Invalid port"));
        let err = run(&mut switch, "sudo config interface autoneg Ethernet0 enable").unwrap_err();
        assert!(err.output.contains("invalid choice: enable. (choose from enabled, disabled)"));
        // CR4 needs four lanes
        let err = run(&mut switch, "sudo config interface type Ethernet6 CR4").unwrap_err();
        assert!(err.output.contains("Invalid interface type"));
    }

    #[test]
    fn test_breakout() {
        let mut switch = switch();
        let out = run(&mut switch, "sudo config interface breakout Ethernet0 4x25G[10G,1G] -y").unwrap();
        assert!(out.contains("Breakout process got successfully completed"));
        assert!(switch.running.port("Ethernet3").is_some());

        let err = run(&mut switch, "sudo config interface breakout Ethernet8 2x50G[25G,10G,1G] -y")
            .unwrap_err();
        assert!(err.output.contains("Target mode 2x50G[25G,10G,1G] is not available"));
        let err = run(&mut switch, "sudo config interface breakout Ethernet2 1x100G[50G,40G,25G,10G,1G] -y")
            .unwrap_err();
        assert!(err.output.contains("NOT present in BREAKOUT_CFG"));

        run(&mut switch, "sudo config vlan add 10").unwrap();
        run(&mut switch, "sudo config vlan member add 10 Ethernet1").unwrap();
        run(&mut switch, "sudo config interface ip add Ethernet2 10.0.0.1/24").unwrap();
        let err = run(&mut switch, "sudo config interface breakout Ethernet0 1x100G[50G,40G,25G,10G,1G] -y")
            .unwrap_err();
        assert!(err.output.starts_with("Dependecies Exist"));
        run(&mut switch, "sudo config interface breakout Ethernet0 1x100G[50G,40G,25G,10G,1G] -y -f").unwrap();
        assert!(switch.running.vlans[&10].is_empty());
        assert!(switch.running.ips.is_empty());
        assert!(switch.running.port("Ethernet1").is_none());
    }

    #[test]
    fn test_dependencies() {
        let mut switch = switch();
        run(&mut switch, "sudo config portchannel add PortChannel0001").unwrap();
        run(&mut switch, "sudo config portchannel member add PortChannel0001 Ethernet0").unwrap();
        assert!(run(&mut switch, "sudo config interface ip add Ethernet0 1.1.1.1/24").is_err());
        assert!(run(&mut switch, "sudo config portchannel del PortChannel0001").is_err());
        run(&mut switch, "sudo config interface ip add PortChannel0001 1.1.1.1/24").unwrap();
        assert_eq!(switch.running.members("PortChannel0001").unwrap(), ["Ethernet0"]);
        assert_eq!(switch.running.owner_of("1.1.1.1"), Some("PortChannel0001"));

        let pcs = run(&mut switch, "show interfaces portchannel").unwrap();
        let table = parse_show_table(&pcs, "Team Dev").unwrap();
        assert_eq!(table["PortChannel0001"]["Ports"], "Ethernet0(D)");

        run(&mut switch, "sudo config vlan add 20").unwrap();
        run(&mut switch, "sudo config vlan member add -u 20 Ethernet4").unwrap();
        assert!(run(&mut switch, "sudo config vlan del 20").is_err());
        assert!(run(&mut switch, "sudo config vlan member add 20 Ethernet0").is_err());
        run(&mut switch, "sudo config vlan member del 20 Ethernet4").unwrap();
        run(&mut switch, "sudo config vlan del 20").unwrap();
    }

    #[test]
    fn test_portchannel_in_vlan() {
        let mut switch = switch();
        run(&mut switch, "sudo config portchannel add PortChannel0002").unwrap();
        run(&mut switch, "sudo config portchannel member add PortChannel0002 Ethernet8").unwrap();
        run(&mut switch, "sudo config vlan add 30").unwrap();
        run(&mut switch, "sudo config vlan member add 30 PortChannel0002").unwrap();
        run(&mut switch, "sudo config interface ip add Vlan30 30.0.0.3/24").unwrap();
        assert_eq!(switch.running.members("Vlan30").unwrap(), ["Ethernet8"]);
        assert!(run(&mut switch, "sudo config vlan member add 30 PortChannel0009").is_err());

        run(&mut switch, "sudo config portchannel member del PortChannel0002 Ethernet8").unwrap();
        assert!(run(&mut switch, "sudo config portchannel del PortChannel0002").is_err());
        run(&mut switch, "sudo config vlan member del 30 PortChannel0002").unwrap();
        run(&mut switch, "sudo config portchannel del PortChannel0002").unwrap();
    }

    #[test]
    fn test_saved_config() {
        let mut switch = switch();
        run(&mut switch, "sudo config interface breakout Ethernet0 2x50G[25G,10G,1G] -y").unwrap();
        let db = parse_config_db(&run(&mut switch, "cat /etc/sonic/config_db.json").unwrap()).unwrap();
        assert_eq!(db.breakout_mode("Ethernet0").unwrap().unwrap().as_str(), MODES[0]);

        run(&mut switch, "sudo config save -y").unwrap();
        run(&mut switch, "sudo config interface shutdown Ethernet0").unwrap();
        switch.restore();
        assert!(switch.running.port("Ethernet0").unwrap().admin_up);
        let db = parse_config_db(&run(&mut switch, "cat /etc/sonic/config_db.json").unwrap()).unwrap();
        assert_eq!(db.breakout_mode("Ethernet0").unwrap().unwrap().as_str(), MODES[1]);
        assert_eq!(db.port_speed("Ethernet2").unwrap(), Some(Speed::from_gbps(50)));

        let platform = run(&mut switch, "cat /usr/share/sonic/device/x86_64-mlnx_msn3700-r0/platform.json").unwrap();
        let infos = parse_platform_json(&platform, &db).unwrap();
        assert_eq!(infos["Ethernet4"].lanes, [4, 5, 6, 7]);
        assert_eq!(infos["Ethernet4"].index, [2, 2, 2, 2]);
        assert!(!infos["Ethernet8"].is_splittable());
    }

    #[test]
    fn test_show_tables() {
        let mut switch = switch();
        let status = run(&mut switch, "sudo show interfaces status").unwrap();
        let table = parse_show_table(&status, "Interface").unwrap();
        assert_eq!(table["Ethernet6"]["Lanes"], "6,7");
        assert_eq!(table["Ethernet6"]["Oper"], "down");
        assert_eq!(table["Ethernet0"]["Asym PFC"], "off");

        let autoneg = run(&mut switch, "sudo show interfaces autoneg status Ethernet0").unwrap();
        let table = parse_show_table(&autoneg, "Interface").unwrap();
        assert_eq!(table.len(), 1);
        assert_eq!(table["Ethernet0"]["Adv Speeds"], "all");
        assert_eq!(table["Ethernet0"]["Auto-Neg Mode"], "disabled");

        let fec = run(&mut switch, "sudo show interfaces fec status").unwrap();
        let table = parse_show_table(&fec, "Interface").unwrap();
        assert_eq!(table["Ethernet8"]["FEC Oper"], "N/A");
        assert!(run(&mut switch, "docker ps | grep swss").unwrap().contains("swss"));
        assert!(run(&mut switch, "docker ps | grep nothing").is_err());
    }
}
