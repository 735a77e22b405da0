// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link bring-up between two cabled ports.
//!
//! A link is up when both ends are administratively up and agree on a speed
//! and on a FEC mode. With auto-negotiation enabled on both ends, the speed
//! is the fastest advertised by both ends for which a commonly advertised
//! interface type exists, and that type is the widest such one. An end that
//! advertises no usable speed and type pair negotiates nothing, and both
//! ends then run at their configured speed. A FEC mode of `auto` follows the
//! other end.

use model::capability::{mutual_speeds, mutual_types};
use model::iftype::widest_type;
use model::{FecMode, InterfaceType, Speed, SpeedSet, TypeTable};
use std::collections::BTreeSet;

/// One end of a link, as far as bring-up is concerned.
#[derive(Debug, Clone)]
pub(crate) struct Side {
    pub(crate) admin_up: bool,
    pub(crate) speed: Speed,
    pub(crate) autoneg: bool,
    pub(crate) lanes: usize,
    pub(crate) adv_speeds: SpeedSet,
    pub(crate) adv_types: BTreeSet<InterfaceType>,
    pub(crate) iftype: Option<InterfaceType>,
    pub(crate) fec: FecMode,
}

/// How an end of an up link runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct LinkState {
    pub(crate) speed: Speed,
    pub(crate) iftype: InterfaceType,
    pub(crate) fec: FecMode,
    pub(crate) negotiated: bool,
}

fn fits(iftype: &InterfaceType, speed: Speed, lanes: usize, table: &TypeTable) -> bool {
    usize::from(iftype.width()) <= lanes && table.type_speeds(iftype).contains(&speed)
}

impl Side {
    /// Whether anything this end advertises can actually be run.
    fn advertises_anything(&self, table: &TypeTable) -> bool {
        self.adv_speeds.iter().any(|s| {
            self.adv_types
                .iter()
                .any(|t| fits(t, *s, self.lanes, table))
        })
    }

    /// The type this end reports for a speed it was not negotiated to.
    fn forced_type(&self, speed: Speed, table: &TypeTable) -> Option<InterfaceType> {
        if let Some(iftype) = &self.iftype {
            return Some(iftype.clone());
        }
        let matched = table.matched_types(self.lanes, [&speed]);
        let fitting: Vec<&InterfaceType> = matched
            .iter()
            .filter(|t| fits(t, speed, self.lanes, table))
            .collect();
        widest_type(fitting).cloned()
    }
}

fn negotiate(local: &Side, remote: &Side, table: &TypeTable) -> Option<(Speed, InterfaceType)> {
    let lanes = local.lanes.min(remote.lanes);
    let speeds = mutual_speeds(&local.adv_speeds, &remote.adv_speeds);
    let types = mutual_types(&local.adv_types, &remote.adv_types);
    speeds.iter().rev().find_map(|speed| {
        let candidates = types.iter().filter(|t| fits(t, *speed, lanes, table));
        widest_type(candidates).map(|t| (*speed, t.clone()))
    })
}

fn resolve_fec(local: FecMode, remote: FecMode, speed: Speed) -> Option<FecMode> {
    match (local, remote) {
        (FecMode::Auto, FecMode::Auto) => Some(FecMode::resolve_auto(speed)),
        (FecMode::Auto, mode) | (mode, FecMode::Auto) => Some(mode),
        (a, b) if a == b => Some(a),
        _ => None,
    }
}

/// The state of `local` when cabled to `remote`, `None` when the link is down.
pub(crate) fn resolve(local: &Side, remote: &Side, table: &TypeTable) -> Option<LinkState> {
    if !local.admin_up || !remote.admin_up {
        return None;
    }
    let negotiating = local.autoneg
        && remote.autoneg
        && local.advertises_anything(table)
        && remote.advertises_anything(table);
    let (speed, iftype, negotiated) = if negotiating {
        let (speed, iftype) = negotiate(local, remote, table)?;
        (speed, iftype, true)
    } else {
        if local.speed != remote.speed {
            return None;
        }
        (local.speed, local.forced_type(local.speed, table)?, false)
    };
    let fec = resolve_fec(local.fec, remote.fec, speed)?;
    Some(LinkState {
        speed,
        iftype,
        fec,
        negotiated,
    })
}
