// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A lab of simulated devices cabled as a topology says, and the engines
//! that reach them.
//!
//! The state of every device lives behind one lock so that the link state
//! of a port can be computed from both of its ends.

use crate::errors::SimError;
use crate::host::HostState;
use crate::link::{LinkState, Side, resolve};
use crate::nvue::NvueState;
use crate::render;
use crate::reply::{Refusal, Reply, into_result, not_found, refusal};
use crate::switch::{SwitchSpec, SwitchState};
use async_trait::async_trait;
use engine::{Engine, EngineError, SharedEngine};
use model::TypeTable;
use ordermap::OrderMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use topology::{PlayerKind, Topology};
use tracing::{debug, info};

#[derive(Debug)]
enum Device {
    Switch(SwitchState),
    Host(HostState),
    Nvue(NvueState),
}

#[derive(Debug)]
struct LabState {
    topology: Topology,
    types: TypeTable,
    devices: OrderMap<String, Device>,
    /// Every command run, with the player it ran on.
    history: Vec<(String, String)>,
}

impl LabState {
    /// The player and port at the other end of the cable of a port.
    fn peer(&self, player: &str, port: &str) -> Option<(String, String)> {
        let (cabled, offset) = match self.devices.get(player)? {
            Device::Switch(switch) => switch.cabling(port)?,
            Device::Host(_) => (port, 0),
            Device::Nvue(_) => return None,
        };
        let remote = self.topology.peer_of(player, cabled)?;
        let port = match self.devices.get(&remote.player)? {
            Device::Switch(switch) => switch.port_at(&remote.port, offset)?.to_string(),
            Device::Host(_) if offset == 0 => remote.port.clone(),
            Device::Host(_) | Device::Nvue(_) => return None,
        };
        Some((remote.player.clone(), port))
    }

    fn side(&self, player: &str, port: &str) -> Option<Side> {
        match self.devices.get(player)? {
            Device::Switch(switch) => switch.side(port, &self.types),
            Device::Host(host) => host.side(port, &self.types),
            Device::Nvue(_) => None,
        }
    }

    fn link(&self, player: &str, port: &str) -> Option<LinkState> {
        let local = self.side(player, port)?;
        let (peer_player, peer_port) = self.peer(player, port)?;
        let remote = self.side(&peer_player, &peer_port)?;
        resolve(&local, &remote, &self.types)
    }

    /// Whether traffic to `address` arriving on `port` is answered.
    fn answers(&self, player: &str, port: &str, address: &str) -> bool {
        match self.devices.get(player) {
            Some(Device::Switch(switch)) => {
                let config = switch.running();
                config
                    .owner_of(address)
                    .and_then(|iface| config.members(iface))
                    .is_some_and(|members| members.iter().any(|m| m == port))
            }
            Some(Device::Host(host)) => host.owner_of(address) == Some(port),
            Some(Device::Nvue(_)) | None => false,
        }
    }

    fn ping(&self, player: &str, src: &str, dst: &str, count: &str) -> Reply {
        let count = count
            .parse::<u32>()
            .map_err(|_| refusal(format!("ping: invalid count of packets to transmit: `{count}'")))?;
        let members = match self.devices.get(player) {
            Some(Device::Switch(switch)) => switch.running().members(src),
            Some(Device::Host(host)) => host.owns(src).then(|| vec![src.to_string()]),
            Some(Device::Nvue(_)) | None => None,
        };
        let members = members.ok_or_else(|| Refusal {
            status: 2,
            output: format!("ping: SO_BINDTODEVICE {src}: No such device"),
        })?;
        let reached = members.iter().any(|member| {
            self.link(player, member).is_some()
                && self
                    .peer(player, member)
                    .is_some_and(|(p, port)| self.answers(&p, &port, dst))
        });
        let received = if reached { count } else { 0 };
        let output = render::ping(dst, src, count, received);
        if reached {
            Ok(output)
        } else {
            Err(Refusal { status: 1, output })
        }
    }

    fn run(&mut self, player: &str, cmd: &str) -> Reply {
        debug!("[{player}] {cmd}");
        self.history.push((player.to_string(), cmd.to_string()));
        let tokens: Vec<&str> = cmd.split_whitespace().collect();
        if let ["ping", "-I", src, dst, "-c", count] = tokens.as_slice() {
            return self.ping(player, src, dst, count);
        }
        let configured = match self.devices.get_mut(player) {
            Some(Device::Switch(switch)) => switch.configure(&tokens, &self.types),
            Some(Device::Host(host)) => host.configure(&tokens),
            Some(Device::Nvue(nvue)) => nvue.run(&tokens),
            None => None,
        };
        if let Some(reply) = configured {
            return reply;
        }
        let link = |port: &str| self.link(player, port);
        let shown = match self.devices.get(player) {
            Some(Device::Switch(switch)) => switch.show(&tokens, &link),
            Some(Device::Host(host)) => host.show(&tokens, &link, &self.types),
            Some(Device::Nvue(_)) | None => None,
        };
        shown.unwrap_or_else(|| not_found(cmd))
    }

    /// Restart a device, or reload its configuration.
    fn reload(&mut self, player: &str, cmd: &str) -> Reply {
        self.history.push((player.to_string(), cmd.to_string()));
        let tokens: Vec<&str> = cmd.split_whitespace().collect();
        let restart = matches!(
            tokens.as_slice(),
            ["sudo", "config", "reload", "-y"] | ["sudo", "reboot" | "warm-reboot" | "fast-reboot"]
        );
        match self.devices.get_mut(player) {
            Some(Device::Switch(switch)) if restart => {
                info!("[{player}] {cmd}: back to the saved configuration");
                switch.restore();
                Ok(String::new())
            }
            _ => not_found(cmd),
        }
    }
}

/// Simulated devices sharing one state. Clones refer to the same lab.
#[derive(Debug, Clone)]
pub struct Lab(Arc<Mutex<LabState>>);

impl Lab {
    /// Build the devices of a topology. SONiC players are described by
    /// `switches`; hosts and NVUE devices get one interface per port.
    pub fn new(topology: Topology, switches: &OrderMap<String, SwitchSpec>) -> Result<Lab, SimError> {
        let mut devices = OrderMap::new();
        for (name, player) in topology.players() {
            let ports = player.ports.values().map(String::as_str);
            let device = match player.kind {
                PlayerKind::Sonic => {
                    let spec = switches
                        .get(name)
                        .ok_or_else(|| SimError::MissingSwitch(name.to_string()))?;
                    Device::Switch(SwitchState::new(spec)?)
                }
                PlayerKind::Linux => Device::Host(HostState::new(ports)),
                PlayerKind::Nvue => Device::Nvue(NvueState::new(ports)),
            };
            devices.insert(name.to_string(), device);
        }
        info!("Simulated lab with {} devices", devices.len());
        Ok(Lab(Arc::new(Mutex::new(LabState {
            topology,
            types: TypeTable::copper(),
            devices,
            history: vec![],
        }))))
    }

    fn lock(&self) -> MutexGuard<'_, LabState> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// One engine per player, keyed by player name.
    pub fn engines(&self) -> OrderMap<String, SharedEngine> {
        let state = self.lock();
        state
            .topology
            .players()
            .map(|(name, player)| {
                let attachment = Attachment {
                    lab: self.clone(),
                    player: name.to_string(),
                    host: player.connection.host.clone(),
                };
                let engine: SharedEngine = match player.kind {
                    PlayerKind::Sonic => Arc::new(SimSwitch(attachment)),
                    PlayerKind::Linux => Arc::new(SimHost(attachment)),
                    PlayerKind::Nvue => Arc::new(SimNvue(attachment)),
                };
                (name.to_string(), engine)
            })
            .collect()
    }

    pub fn topology(&self) -> Topology {
        self.lock().topology.clone()
    }

    /// The commands run so far, with the player each ran on.
    pub fn history(&self) -> Vec<(String, String)> {
        self.lock().history.clone()
    }

    /// Whether the link of a port is up.
    pub fn oper_up(&self, player: &str, port: &str) -> bool {
        self.lock().link(player, port).is_some()
    }

    fn run(&self, player: &str, cmd: &str) -> Reply {
        self.lock().run(player, cmd)
    }

    fn reload(&self, player: &str, cmd: &str) -> Reply {
        self.lock().reload(player, cmd)
    }
}

/// What an engine needs to reach its device in the lab.
#[derive(Debug)]
struct Attachment {
    lab: Lab,
    player: String,
    host: String,
}

impl Attachment {
    fn run(&self, cmd: &str) -> Result<String, EngineError> {
        into_result(cmd, self.lab.run(&self.player, cmd))
    }

    fn first(cmds: &[String]) -> Result<(&String, &[String]), EngineError> {
        cmds.split_first()
            .ok_or_else(|| EngineError::Params("no command to send".to_string()))
    }
}

/// A simulated SONiC switch.
#[derive(Debug)]
pub struct SimSwitch(Attachment);

/// A simulated Linux host.
#[derive(Debug)]
pub struct SimHost(Attachment);

/// A simulated NVUE device.
#[derive(Debug)]
pub struct SimNvue(Attachment);

const CONFIRM_PROMPT: &str = "Do you want to Continue? [y/N]: ";

#[async_trait]
impl Engine for SimSwitch {
    fn name(&self) -> &str {
        &self.0.host
    }

    async fn run_cmd_timeout(&self, cmd: &str, _timeout: Duration) -> Result<String, EngineError> {
        self.0.run(cmd)
    }

    async fn send_config_set(&self, cmds: &[String]) -> Result<String, EngineError> {
        let (cmd, answers) = Attachment::first(cmds)?;
        if cmd.contains(" breakout ") && !answers.iter().any(|a| a.trim() == "y") {
            return Err(EngineError::Exit {
                cmd: cmd.clone(),
                status: 1,
                output: format!("{CONFIRM_PROMPT}\nAborted!"),
            });
        }
        let output = self.0.run(cmd)?;
        Ok(format!("{CONFIRM_PROMPT}y\n{output}"))
    }

    async fn reload(&self, cmds: &[String], _wait: Duration) -> Result<(), EngineError> {
        for cmd in cmds {
            into_result(cmd, self.0.lab.reload(&self.0.player, cmd))?;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[async_trait]
impl Engine for SimHost {
    fn name(&self) -> &str {
        &self.0.host
    }

    async fn run_cmd_timeout(&self, cmd: &str, _timeout: Duration) -> Result<String, EngineError> {
        self.0.run(cmd)
    }

    async fn send_config_set(&self, cmds: &[String]) -> Result<String, EngineError> {
        let (cmd, _) = Attachment::first(cmds)?;
        self.0.run(cmd)
    }

    async fn reload(&self, cmds: &[String], _wait: Duration) -> Result<(), EngineError> {
        for cmd in cmds {
            into_result(cmd, self.0.lab.reload(&self.0.player, cmd))?;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EngineError> {
        Ok(())
    }
}

#[async_trait]
impl Engine for SimNvue {
    fn name(&self) -> &str {
        &self.0.host
    }

    async fn run_cmd_timeout(&self, cmd: &str, _timeout: Duration) -> Result<String, EngineError> {
        self.0.run(cmd)
    }

    async fn send_config_set(&self, cmds: &[String]) -> Result<String, EngineError> {
        let (cmd, _) = Attachment::first(cmds)?;
        self.0.run(cmd)
    }

    async fn reload(&self, cmds: &[String], _wait: Duration) -> Result<(), EngineError> {
        for cmd in cmds {
            into_result(cmd, self.0.lab.reload(&self.0.player, cmd))?;
        }
        Ok(())
    }

    async fn disconnect(&self) -> Result<(), EngineError> {
        Ok(())
    }
}
