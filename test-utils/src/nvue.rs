// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! A simulated NVUE device. `nv set` and `nv unset` stage changes that
//! `nv config apply` commits and `nv config detach` drops.

use crate::reply::{Reply, refusal, refuse};
use model::Mtu;
use ordermap::OrderMap;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct NvuePort {
    applied: u32,
    pending: u32,
}

impl Default for NvuePort {
    fn default() -> Self {
        NvuePort {
            applied: Mtu::DEFAULT_U32,
            pending: Mtu::DEFAULT_U32,
        }
    }
}

#[derive(Debug, Clone)]
pub(crate) struct NvueState {
    ports: OrderMap<String, NvuePort>,
}

fn no_item() -> Reply {
    refuse("Error: The requested item does not exist.")
}

impl NvueState {
    pub(crate) fn new<'a>(ports: impl IntoIterator<Item = &'a str>) -> Self {
        NvueState {
            ports: ports
                .into_iter()
                .map(|p| (p.to_string(), NvuePort::default()))
                .collect(),
        }
    }

    pub(crate) fn run(&mut self, tokens: &[&str]) -> Option<Reply> {
        let reply = match tokens {
            ["nv", "show", "interface", port, "link", "--output", "json"] => {
                let Some(p) = self.ports.get(*port) else {
                    return Some(no_item());
                };
                let link = json!({
                    "mtu": p.applied,
                    "state": { "up": {} },
                    "auto-negotiate": "on",
                });
                serde_json::to_string_pretty(&link).map_err(|e| refusal(e.to_string()))
            }
            ["nv", "set", "interface", port, "link", "mtu", value] => {
                let Some(p) = self.ports.get_mut(*port) else {
                    return Some(no_item());
                };
                match value.parse::<u32>().ok().and_then(|v| Mtu::try_from(v).ok()) {
                    Some(mtu) => {
                        p.pending = mtu.to_u32();
                        Ok(String::new())
                    }
                    None => refuse(format!(
                        "Error: Valid range is {}-{}",
                        Mtu::MIN_U32,
                        Mtu::MAX_U32
                    )),
                }
            }
            ["nv", "unset", "interface", port, "link", "mtu"] => {
                let Some(p) = self.ports.get_mut(*port) else {
                    return Some(no_item());
                };
                p.pending = Mtu::DEFAULT_U32;
                Ok(String::new())
            }
            ["nv", "config", "apply", "-y"] => {
                for p in self.ports.values_mut() {
                    p.applied = p.pending;
                }
                Ok("applied\n".to_string())
            }
            ["nv", "config", "detach"] => {
                for p in self.ports.values_mut() {
                    p.pending = p.applied;
                }
                Ok(String::new())
            }
            ["nv", "action", ..] => Ok("Action succeeded\n".to_string()),
            ["nv", ..] => no_item(),
            _ => return None,
        };
        Some(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parse::{nvue_u32, parse_nvue_json};

    fn run(nvue: &mut NvueState, cmd: &str) -> Reply {
        let tokens: Vec<&str> = cmd.split_whitespace().collect();
        nvue.run(&tokens).unwrap()
    }

    fn mtu(nvue: &mut NvueState) -> u32 {
        let out = run(nvue, "nv show interface swp1 link --output json").unwrap();
        nvue_u32(&parse_nvue_json(&out).unwrap(), &["mtu"]).unwrap()
    }

    #[test]
    fn test_staged_mtu() {
        let mut nvue = NvueState::new(["swp1"]);
        assert_eq!(mtu(&mut nvue), 1500);
        let err = run(&mut nvue, "nv set interface swp1 link mtu 9218").unwrap_err();
        assert_eq!(err.output, "Error: Valid range is 552-9216");
        run(&mut nvue, "nv set interface swp1 link mtu 9200").unwrap();
        assert_eq!(mtu(&mut nvue), 1500);
        run(&mut nvue, "nv config apply -y").unwrap();
        assert_eq!(mtu(&mut nvue), 9200);
        run(&mut nvue, "nv unset interface swp1 link mtu").unwrap();
        run(&mut nvue, "nv config detach").unwrap();
        assert_eq!(mtu(&mut nvue), 9200);
        assert!(run(&mut nvue, "nv show interface swp9 link --output json").is_err());
    }
}
