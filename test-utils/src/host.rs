// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A simulated Linux host: `ethtool` and `ip` on its switch-facing NICs.

use crate::link::Side;
use crate::render::{self, EthtoolView};
use crate::reply::{Refusal, Reply, refusal, refuse};
use crate::switch::LinkOracle;
use model::{AutoNeg, FecMode, Speed, SpeedSet, TypeTable};
use ordermap::OrderMap;
use std::collections::BTreeSet;
use std::str::FromStr;

const NIC_SPEEDS_GBPS: [u32; 6] = [1, 10, 25, 40, 50, 100];

#[derive(Debug, Clone)]
pub(crate) struct HostIface {
    admin_up: bool,
    speed: Speed,
    autoneg: AutoNeg,
    fec: FecMode,
    supported: SpeedSet,
    /// What autoneg offers; a forced speed narrows it down to that speed.
    advertised: SpeedSet,
    lanes: usize,
    ips: BTreeSet<String>,
}

impl HostIface {
    fn new() -> Self {
        let supported: SpeedSet = NIC_SPEEDS_GBPS.into_iter().map(Speed::from_gbps).collect();
        HostIface {
            admin_up: true,
            speed: Speed::from_gbps(100),
            autoneg: AutoNeg::Enabled,
            fec: FecMode::Auto,
            advertised: supported.clone(),
            supported,
            lanes: 4,
            ips: BTreeSet::new(),
        }
    }

    /// `ethtool` link modes, e.g. `25000baseCR`, for the given speeds.
    fn link_modes(&self, speeds: &SpeedSet, types: &TypeTable) -> Vec<String> {
        speeds
            .iter()
            .flat_map(|speed| {
                types
                    .matched_types(self.lanes, [speed])
                    .into_iter()
                    .map(move |t| format!("{}base{t}", speed.as_mbps()))
            })
            .collect()
    }
}

#[derive(Debug, Clone)]
pub(crate) struct HostState {
    ifaces: OrderMap<String, HostIface>,
}

fn no_device(iface: &str) -> Refusal {
    refusal(format!("Cannot find device \"{iface}\""))
}

impl HostState {
    pub(crate) fn new<'a>(ifaces: impl IntoIterator<Item = &'a str>) -> Self {
        HostState {
            ifaces: ifaces
                .into_iter()
                .map(|i| (i.to_string(), HostIface::new()))
                .collect(),
        }
    }

    pub(crate) fn owns(&self, iface: &str) -> bool {
        self.ifaces.contains_key(iface)
    }

    /// The interface an address is configured on.
    pub(crate) fn owner_of(&self, address: &str) -> Option<&str> {
        self.ifaces
            .iter()
            .find(|(_, i)| i.ips.iter().any(|ip| ip.split('/').next() == Some(address)))
            .map(|(name, _)| name.as_str())
    }

    pub(crate) fn side(&self, iface: &str, types: &TypeTable) -> Option<Side> {
        let i = self.ifaces.get(iface)?;
        Some(Side {
            admin_up: i.admin_up,
            speed: i.speed,
            autoneg: i.autoneg.is_enabled(),
            lanes: i.lanes,
            adv_speeds: i.advertised.clone(),
            adv_types: types.matched_types(i.lanes, &i.advertised),
            iftype: None,
            fec: i.fec,
        })
    }

    pub(crate) fn configure(&mut self, tokens: &[&str]) -> Option<Reply> {
        let reply = match tokens {
            ["ethtool", "-s", iface, "speed", mbps] => self.set_speed(iface, mbps),
            ["ethtool", "-s", iface, "autoneg", mode] => self.set_autoneg(iface, mode),
            ["ethtool", "--set-fec", iface, "encoding", encoding] => self.set_fec(iface, encoding),
            ["sudo", "ip", "addr", "add", ip, "dev", iface] => self.add_ip(iface, ip),
            ["sudo", "ip", "addr", "del", ip, "dev", iface] => self.del_ip(iface, ip),
            ["sudo", "ip", "link", "set", iface, state @ ("up" | "down")] => {
                self.ifaces.get_mut(*iface).ok_or_else(|| no_device(iface)).map(|i| {
                    i.admin_up = *state == "up";
                    String::new()
                })
            }
            _ => return None,
        };
        Some(reply)
    }

    fn set_speed(&mut self, iface: &str, mbps: &str) -> Reply {
        let i = self
            .ifaces
            .get_mut(iface)
            .ok_or_else(|| refusal("Cannot get current device settings: No such device"))?;
        let speed = mbps
            .parse::<u32>()
            .ok()
            .and_then(|m| Speed::from_mbps(m).ok())
            .filter(|s| i.supported.contains(s))
            .ok_or_else(|| refusal("Cannot advertise speed: Invalid argument"))?;
        i.speed = speed;
        i.advertised = SpeedSet::from([speed]);
        Ok(String::new())
    }

    fn set_autoneg(&mut self, iface: &str, mode: &str) -> Reply {
        let i = self
            .ifaces
            .get_mut(iface)
            .ok_or_else(|| refusal("Cannot get current device settings: No such device"))?;
        let mode = match mode {
            "on" | "off" => AutoNeg::from_str(mode),
            _ => return refuse(format!("ethtool: bad command line argument(s)\nautoneg: {mode}")),
        };
        i.autoneg = mode.map_err(|e| refusal(e.to_string()))?;
        if i.autoneg.is_enabled() {
            i.advertised = i.supported.clone();
        }
        Ok(String::new())
    }

    fn set_fec(&mut self, iface: &str, encoding: &str) -> Reply {
        let i = self
            .ifaces
            .get_mut(iface)
            .ok_or_else(|| refusal("Cannot set FEC settings: No such device"))?;
        i.fec = FecMode::from_ethtool(encoding)
            .map_err(|_| refusal(format!("ethtool: invalid FEC encoding {encoding}")))?;
        Ok(String::new())
    }

    fn add_ip(&mut self, iface: &str, ip: &str) -> Reply {
        let i = self.ifaces.get_mut(iface).ok_or_else(|| no_device(iface))?;
        if !i.ips.insert(ip.to_string()) {
            return Err(Refusal {
                status: 2,
                output: "RTNETLINK answers: File exists".to_string(),
            });
        }
        Ok(String::new())
    }

    fn del_ip(&mut self, iface: &str, ip: &str) -> Reply {
        let i = self.ifaces.get_mut(iface).ok_or_else(|| no_device(iface))?;
        if !i.ips.remove(ip) {
            return Err(Refusal {
                status: 2,
                output: "RTNETLINK answers: Cannot assign requested address".to_string(),
            });
        }
        Ok(String::new())
    }

    pub(crate) fn show(&self, tokens: &[&str], link: LinkOracle<'_>, types: &TypeTable) -> Option<Reply> {
        let reply = match tokens {
            ["ethtool", "--show-fec", iface] => {
                let Some(i) = self.ifaces.get(*iface) else {
                    return Some(refuse("Cannot get FEC settings: No such device"));
                };
                let active = match link(iface) {
                    Some(state) => state.fec,
                    None if i.fec == FecMode::Auto => FecMode::None,
                    None => i.fec,
                };
                Ok(render::ethtool_fec(iface, i.fec, active))
            }
            ["ethtool", iface] => {
                let Some(i) = self.ifaces.get(*iface) else {
                    return Some(refuse("Cannot get device settings: No such device"));
                };
                let view = EthtoolView {
                    name: iface,
                    modes: i.link_modes(&i.supported, types),
                    speed: link(iface).map(|l| l.speed),
                    autoneg: i.autoneg,
                };
                Ok(render::ethtool(&view))
            }
            _ => return None,
        };
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::link::LinkState;
    use model::InterfaceType;
    use parse::{parse_ethtool, parse_ethtool_fec};
    use pretty_assertions::assert_eq;

    fn run(host: &mut HostState, cmd: &str, link: Option<LinkState>) -> Reply {
        let tokens: Vec<&str> = cmd.split_whitespace().collect();
        let types = TypeTable::copper();
        host.configure(&tokens)
            .or_else(|| host.show(&tokens, &|_| link.clone(), &types))
            .unwrap()
    }

    #[test]
    fn test_ethtool() {
        let mut host = HostState::new(["enp1s0f0"]);
        let up = LinkState {
            speed: Speed::from_gbps(25),
            iftype: InterfaceType::cr(1),
            fec: FecMode::Rs,
            negotiated: true,
        };
        let info = parse_ethtool(&run(&mut host, "ethtool enp1s0f0", Some(up.clone())).unwrap()).unwrap();
        assert_eq!(info.speed, Some(Speed::from_gbps(25)));
        assert!(info.link_detected);
        assert!(info.autoneg.is_enabled());
        assert!(info.supported_types.contains(&InterfaceType::cr(4)));

        run(&mut host, "ethtool --set-fec enp1s0f0 encoding rs", None).unwrap();
        let fec = run(&mut host, "ethtool --show-fec enp1s0f0", Some(up)).unwrap();
        assert_eq!(parse_ethtool_fec(&fec).unwrap(), FecMode::Rs);

        run(&mut host, "ethtool -s enp1s0f0 autoneg off", None).unwrap();
        run(&mut host, "ethtool -s enp1s0f0 speed 50000", None).unwrap();
        let side = host.side("enp1s0f0", &TypeTable::copper()).unwrap();
        assert!(!side.autoneg);
        assert_eq!(side.speed, Speed::from_gbps(50));
        assert!(run(&mut host, "ethtool -s enp1s0f0 speed 30000", None).is_err());
        assert!(run(&mut host, "ethtool eth9", None).is_err());
    }

    #[test]
    fn test_addresses() {
        let mut host = HostState::new(["enp1s0f0", "enp1s0f1"]);
        run(&mut host, "sudo ip addr add 20.20.20.1/24 dev enp1s0f1", None).unwrap();
        assert_eq!(host.owner_of("20.20.20.1"), Some("enp1s0f1"));
        let err = run(&mut host, "sudo ip addr add 20.20.20.1/24 dev enp1s0f1", None).unwrap_err();
        assert_eq!(err.status, 2);
        run(&mut host, "sudo ip addr del 20.20.20.1/24 dev enp1s0f1", None).unwrap();
        assert_eq!(host.owner_of("20.20.20.1"), None);
        run(&mut host, "sudo ip link set enp1s0f0 down", None).unwrap();
        assert!(!host.side("enp1s0f0", &TypeTable::copper()).unwrap().admin_up);
    }
}
