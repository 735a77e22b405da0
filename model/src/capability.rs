// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Capability tables and the helpers that intersect them across both ends
//! of a link.

use crate::fec::FecMode;
use crate::iftype::InterfaceType;
use crate::speed::{Speed, SpeedSet};
use ordermap::OrderMap;
use std::collections::{BTreeMap, BTreeSet};

/// Lane groups an interface type may run over.
pub const LANE_OPTIONS: [u8; 4] = [1, 2, 4, 8];

/// Interface types per lane count and the speeds each type supports.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TypeTable(BTreeMap<u8, OrderMap<InterfaceType, SpeedSet>>);

impl TypeTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lanes: u8, iftype: InterfaceType, speeds: impl IntoIterator<Item = Speed>) {
        self.0
            .entry(lanes)
            .or_default()
            .entry(iftype)
            .or_default()
            .extend(speeds);
    }

    /// Copper types as reported by the switch platforms.
    #[must_use]
    pub fn copper() -> Self {
        let g = Speed::from_gbps;
        let mut table = TypeTable::new();
        table.insert(1, InterfaceType::cr(1), [g(1), g(10), g(25), g(50)]);
        table.insert(2, InterfaceType::cr(2), [g(50), g(100)]);
        table.insert(4, InterfaceType::cr(4), [g(40), g(100), g(200), g(400)]);
        table.insert(8, InterfaceType::cr(8), [g(400), g(800)]);
        table
    }

    pub fn types_for_lanes(&self, lanes: u8) -> impl Iterator<Item = (&InterfaceType, &SpeedSet)> {
        self.0.get(&lanes).into_iter().flat_map(|m| m.iter())
    }

    /// Types usable on a port with `lane_count` lanes that support at least
    /// one of the given speeds.
    #[must_use]
    pub fn matched_types<'a>(
        &self,
        lane_count: usize,
        speeds: impl IntoIterator<Item = &'a Speed>,
    ) -> BTreeSet<InterfaceType> {
        let speeds: Vec<&Speed> = speeds.into_iter().collect();
        LANE_OPTIONS
            .iter()
            .filter(|lanes| usize::from(**lanes) <= lane_count)
            .flat_map(|lanes| self.types_for_lanes(*lanes))
            .filter(|(_, supported)| speeds.iter().any(|s| supported.contains(s)))
            .map(|(t, _)| t.clone())
            .collect()
    }

    /// Speeds supported by a type, regardless of the lane group it sits in.
    #[must_use]
    pub fn type_speeds(&self, iftype: &InterfaceType) -> SpeedSet {
        self.0
            .values()
            .filter_map(|m| m.get(iftype))
            .flatten()
            .copied()
            .collect()
    }
}

/// The width of a link as reported in port status. 400G links always report
/// eight lanes even when the negotiated type is a four lane one.
#[must_use]
pub fn expected_width(iftype: &InterfaceType, speed: Speed) -> u8 {
    if speed == Speed::from_gbps(400) {
        8
    } else {
        iftype.width()
    }
}

/// Speeds each FEC mode can be configured with.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FecTable(BTreeMap<FecMode, SpeedSet>);

impl FecTable {
    #[must_use]
    pub fn from_entries(entries: impl IntoIterator<Item = (FecMode, SpeedSet)>) -> Self {
        FecTable(entries.into_iter().collect())
    }

    /// FEC modes and the speeds they are exercised with.
    #[must_use]
    pub fn standard() -> Self {
        let g = Speed::from_gbps;
        FecTable::from_entries([
            (FecMode::Rs, SpeedSet::from([g(25), g(50), g(100), g(200), g(400)])),
            (FecMode::Fc, SpeedSet::from([g(10), g(25), g(50)])),
            (FecMode::None, SpeedSet::from([g(10), g(25), g(40), g(50), g(100)])),
        ])
    }

    /// The reduced table exercised across warm reboots.
    #[must_use]
    pub fn warm_reboot() -> Self {
        let g = Speed::from_gbps;
        FecTable::from_entries([
            (FecMode::Rs, SpeedSet::from([g(100)])),
            (FecMode::None, SpeedSet::from([g(50), g(100)])),
        ])
    }

    #[must_use]
    pub fn speeds(&self, mode: FecMode) -> Option<&SpeedSet> {
        self.0.get(&mode)
    }

    pub fn modes(&self) -> impl Iterator<Item = FecMode> + '_ {
        self.0.keys().copied()
    }

    /// Modes usable with at least one of the given speeds, and the
    /// speeds each mode may be tested with.
    #[must_use]
    pub fn supported_modes(&self, speeds: &SpeedSet) -> BTreeMap<FecMode, SpeedSet> {
        self.0
            .iter()
            .filter_map(|(mode, fec_speeds)| {
                let common: SpeedSet = fec_speeds.intersection(speeds).copied().collect();
                (!common.is_empty()).then_some((*mode, common))
            })
            .collect()
    }
}

/// Speeds both ends of a link support.
#[must_use]
pub fn mutual_speeds(a: &SpeedSet, b: &SpeedSet) -> SpeedSet {
    a.intersection(b).copied().collect()
}

/// Types both ends of a link support.
#[must_use]
pub fn mutual_types(
    a: &BTreeSet<InterfaceType>,
    b: &BTreeSet<InterfaceType>,
) -> BTreeSet<InterfaceType> {
    a.intersection(b).cloned().collect()
}

/// FEC modes both ends of a link can run, with the speeds common to both.
#[must_use]
pub fn mutual_fec_modes(
    a: &BTreeMap<FecMode, SpeedSet>,
    b: &BTreeMap<FecMode, SpeedSet>,
) -> BTreeMap<FecMode, SpeedSet> {
    a.iter()
        .filter_map(|(mode, speeds)| {
            let other = b.get(mode)?;
            let common = mutual_speeds(speeds, other);
            (!common.is_empty()).then_some((*mode, common))
        })
        .collect()
}

/// Supported speeds of every port, per split number.
pub type SpeedsBySplit = BTreeMap<String, BTreeMap<u8, SpeedSet>>;

/// Speeds all the given ports support when split by `split`. A port
/// missing from the table contributes nothing, so the result is empty.
#[must_use]
pub fn lb_mutual_speeds<'a>(
    ports: impl IntoIterator<Item = &'a str>,
    split: u8,
    supported: &SpeedsBySplit,
) -> SpeedSet {
    let mut ports = ports.into_iter();
    let lookup = |port: &str| {
        supported
            .get(port)
            .and_then(|by_split| by_split.get(&split))
            .cloned()
            .unwrap_or_default()
    };
    let Some(first) = ports.next() else {
        return SpeedSet::new();
    };
    ports.fold(lookup(first), |acc, port| mutual_speeds(&acc, &lookup(port)))
}

/// FEC modes all the given ports can run, from their own capabilities.
#[must_use]
pub fn lb_mutual_fec_modes<'a>(
    ports: impl IntoIterator<Item = &'a str>,
    capabilities: &BTreeMap<String, BTreeMap<FecMode, SpeedSet>>,
) -> BTreeMap<FecMode, SpeedSet> {
    let mut ports = ports.into_iter();
    let lookup = |port: &str| capabilities.get(port).cloned().unwrap_or_default();
    let Some(first) = ports.next() else {
        return BTreeMap::new();
    };
    ports.fold(lookup(first), |acc, port| mutual_fec_modes(&acc, &lookup(port)))
}

#[must_use]
pub fn min_speed(speeds: &SpeedSet) -> Option<Speed> {
    speeds.first().copied()
}

#[must_use]
pub fn max_speed(speeds: &SpeedSet) -> Option<Speed> {
    speeds.last().copied()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_lb_mutual_speeds() {
        let mut supported = SpeedsBySplit::new();
        supported
            .entry("Ethernet0".to_string())
            .or_default()
            .insert(1, speeds(&[10, 25, 40, 100]));
        supported
            .entry("Ethernet4".to_string())
            .or_default()
            .insert(1, speeds(&[25, 100]));
        let mutual = lb_mutual_speeds(["Ethernet0", "Ethernet4"], 1, &supported);
        assert_eq!(mutual, speeds(&[25, 100]));
        assert_eq!(min_speed(&mutual), Some(Speed::from_gbps(25)));
        assert_eq!(max_speed(&mutual), Some(Speed::from_gbps(100)));
        assert!(lb_mutual_speeds(["Ethernet0", "Ethernet4"], 2, &supported).is_empty());
        assert!(lb_mutual_speeds(["Ethernet0", "Ethernet8"], 1, &supported).is_empty());
    }

    fn speeds(gbps: &[u32]) -> SpeedSet {
        gbps.iter().map(|g| Speed::from_gbps(*g)).collect()
    }

    #[test]
    fn test_matched_types() {
        let table = TypeTable::copper();
        let types = table.matched_types(4, &speeds(&[10, 40]));
        let names: Vec<_> = types.iter().map(InterfaceType::as_str).collect();
        assert_eq!(names, vec!["CR", "CR4"]);

        let types = table.matched_types(2, &speeds(&[40, 100]));
        let names: Vec<_> = types.iter().map(InterfaceType::as_str).collect();
        assert_eq!(names, vec!["CR2"]);

        assert!(table.matched_types(1, &speeds(&[100])).is_empty());
        assert_eq!(table.type_speeds(&InterfaceType::cr(2)), speeds(&[50, 100]));
    }

    #[test]
    fn test_expected_width() {
        assert_eq!(expected_width(&InterfaceType::cr(4), Speed::from_gbps(400)), 8);
        assert_eq!(expected_width(&InterfaceType::cr(4), Speed::from_gbps(100)), 4);
        assert_eq!(expected_width(&InterfaceType::cr(1), Speed::from_gbps(25)), 1);
    }

    #[test]
    fn test_fec_modes() {
        let table = FecTable::standard();
        let port = speeds(&[10, 25, 40, 100]);
        let modes = table.supported_modes(&port);
        assert_eq!(modes[&FecMode::Rs], speeds(&[25, 100]));
        assert_eq!(modes[&FecMode::Fc], speeds(&[10, 25]));
        assert_eq!(modes[&FecMode::None], speeds(&[10, 25, 40, 100]));

        let peer = table.supported_modes(&speeds(&[40, 100]));
        let mutual = mutual_fec_modes(&modes, &peer);
        assert!(!mutual.contains_key(&FecMode::Fc));
        assert_eq!(mutual[&FecMode::Rs], speeds(&[100]));

        let warm = FecTable::warm_reboot();
        assert_eq!(warm.modes().count(), 2);
    }
}
