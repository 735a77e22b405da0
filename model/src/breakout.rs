// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Dynamic port breakout modes and per-port breakout capabilities.
//!
//! A breakout mode names how the lanes of a physical port are split into
//! logical sub-ports. Three shapes exist:
//!
//! * `2x50G`: two sub-ports at 50G each,
//! * `4x25G[10G,1G]`: four sub-ports at 25G, which may also run at 10G or 1G,
//! * `2x25G(2)+1x50G(2)`: two 25G sub-ports over two lanes, then one 50G
//!   sub-port over the remaining two lanes.

use crate::errors::ModelError;
use crate::port::{port_name, port_number};
use crate::speed::{Speed, SpeedSet};
use ordermap::OrderMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};
use std::str::FromStr;

#[derive(Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq)]
struct Segment {
    count: u8,
    speed: Speed,
    lanes: Option<u8>,
}

#[derive(Clone, Debug, Hash, Ord, PartialOrd, Eq, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct BreakoutMode {
    raw: String,
    #[serde(skip)]
    segments: Vec<Segment>,
    #[serde(skip)]
    extra_speeds: Vec<Speed>,
}

fn parse_segment(raw: &str, part: &str, mixed: bool) -> Result<(Segment, Vec<Speed>), ModelError> {
    let bad = || ModelError::InvalidBreakoutMode(raw.to_string());
    let (count, rest) = part.split_once('x').ok_or_else(bad)?;
    let count = count.parse::<u8>().map_err(|_| bad())?;
    if count == 0 {
        return Err(bad());
    }
    let speed_end = rest.find(['[', '(']).unwrap_or(rest.len());
    let (speed, suffix) = rest.split_at(speed_end);
    if !speed.ends_with('G') {
        return Err(bad());
    }
    let speed = Speed::from_str(speed).map_err(|_| bad())?;

    let mut lanes = None;
    let mut extra = vec![];
    if let Some(inner) = suffix.strip_prefix('(') {
        let inner = inner.strip_suffix(')').ok_or_else(bad)?;
        lanes = Some(inner.parse::<u8>().map_err(|_| bad())?);
    } else if let Some(inner) = suffix.strip_prefix('[') {
        let inner = inner.strip_suffix(']').ok_or_else(bad)?;
        for s in inner.split(',').filter(|s| !s.is_empty()) {
            extra.push(Speed::from_str(s).map_err(|_| bad())?);
        }
    } else if !suffix.is_empty() {
        return Err(bad());
    }
    if mixed != lanes.is_some() {
        return Err(bad());
    }
    Ok((
        Segment {
            count,
            speed,
            lanes,
        },
        extra,
    ))
}

impl BreakoutMode {
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The number of sub-ports of the first segment, i.e. the digit before the `x`.
    #[must_use]
    pub fn split_number(&self) -> u8 {
        self.segments.first().map_or(1, |s| s.count)
    }

    /// Total number of sub-ports created by this mode.
    #[must_use]
    pub fn sub_port_count(&self) -> usize {
        self.segments.iter().map(|s| usize::from(s.count)).sum()
    }

    #[must_use]
    pub fn is_mixed(&self) -> bool {
        self.segments.len() > 1
    }

    /// A mode breaks the port out if it mixes lane groups or splits it at all.
    #[must_use]
    pub fn is_breakout(&self) -> bool {
        self.is_mixed() || self.split_number() != 1
    }

    /// The speed sub-ports get when this mode is applied.
    #[must_use]
    pub fn configured_speed(&self) -> Speed {
        self.segments
            .first()
            .map_or(Speed::from_gbps(1), |s| s.speed)
    }

    /// All speeds sub-ports may run at under this mode.
    #[must_use]
    pub fn speeds(&self) -> SpeedSet {
        self.segments
            .iter()
            .map(|s| s.speed)
            .chain(self.extra_speeds.iter().copied())
            .collect()
    }

    /// Lane offset and speed of every sub-port, for a port with `lanes` lanes.
    pub fn layout(&self, port: &str, lanes: usize) -> Result<Vec<(usize, Speed)>, ModelError> {
        let mismatch = || ModelError::LaneMismatch {
            port: port.to_string(),
            mode: self.raw.clone(),
            lanes,
        };
        let mut out = Vec::with_capacity(self.sub_port_count());
        let mut offset = 0;
        for segment in &self.segments {
            let seg_lanes = segment.lanes.map_or(lanes, usize::from);
            let count = usize::from(segment.count);
            if seg_lanes == 0 || seg_lanes % count != 0 {
                return Err(mismatch());
            }
            let step = seg_lanes / count;
            for i in 0..count {
                out.push((offset + i * step, segment.speed));
            }
            offset += seg_lanes;
        }
        if offset != lanes {
            return Err(mismatch());
        }
        Ok(out)
    }
}

impl FromStr for BreakoutMode {
    type Err = ModelError;
    fn from_str(input: &str) -> Result<Self, Self::Err> {
        let raw = input.trim();
        let parts: Vec<&str> = raw.split('+').collect();
        let mixed = parts.len() > 1;
        if parts.len() > 2 {
            return Err(ModelError::InvalidBreakoutMode(raw.to_string()));
        }
        let mut segments = Vec::with_capacity(parts.len());
        let mut extra_speeds = vec![];
        for part in parts {
            let (segment, extra) = parse_segment(raw, part, mixed)?;
            segments.push(segment);
            extra_speeds.extend(extra);
        }
        Ok(BreakoutMode {
            raw: raw.to_string(),
            segments,
            extra_speeds,
        })
    }
}

impl TryFrom<String> for BreakoutMode {
    type Error = ModelError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        BreakoutMode::from_str(&value)
    }
}

impl From<BreakoutMode> for String {
    fn from(value: BreakoutMode) -> Self {
        value.raw
    }
}

impl Display for BreakoutMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.raw)
    }
}

/// Breakout modes offered by the platforms under test. Negative tests pick
/// from those a port does not support.
pub const ALL_BREAKOUT_OPTIONS: [&str; 20] = [
    "1x100G[40G]",
    "2x50G",
    "4x25G[10G]",
    "1x400G",
    "2x200G",
    "4x100G",
    "8x50G",
    "1x200G[100G,50G,40G,25G,10G,1G]",
    "2x100G[50G,40G,25G,10G,1G]",
    "4x50G[40G,25G,10G,1G]",
    "1x25G[10G]",
    "1x100G[50G,40G,25G,10G]",
    "2x50G[40G,25G,10G]",
    "1x25G[10G,1G]",
    "1x100G[50G,40G,25G,10G,1G]",
    "2x50G[40G,25G,10G,1G]",
    "4x25G[10G,1G]",
    "1x400G[200G,100G,50G,40G,25G,10G,1G]",
    "2x200G[100G,50G,40G,25G,10G,1G]",
    "4x100G[50G,40G,25G,10G,1G]",
];

#[must_use]
pub fn all_breakout_options() -> Vec<BreakoutMode> {
    ALL_BREAKOUT_OPTIONS
        .iter()
        .filter_map(|m| BreakoutMode::from_str(m).ok())
        .collect()
}

/// Largest split among the non-mixed modes.
pub fn max_breakout_split<'a>(modes: impl IntoIterator<Item = &'a BreakoutMode>) -> Option<u8> {
    modes
        .into_iter()
        .filter(|m| !m.is_mixed())
        .map(BreakoutMode::split_number)
        .max()
}

/// Breakout capabilities of one physical port, as described by the platform
/// definition and the running configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortBreakoutInfo {
    pub port: String,
    pub index: Vec<u32>,
    pub lanes: Vec<u32>,
    pub breakout_modes: Vec<BreakoutMode>,
    pub default_breakout_mode: Option<BreakoutMode>,
}

impl PortBreakoutInfo {
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lanes.len()
    }

    #[must_use]
    pub fn supports(&self, mode: &BreakoutMode) -> bool {
        self.breakout_modes.contains(mode)
    }

    /// Modes that actually split the port.
    pub fn breakout_only_modes(&self) -> impl Iterator<Item = &BreakoutMode> {
        self.breakout_modes.iter().filter(|m| m.is_breakout())
    }

    #[must_use]
    pub fn is_splittable(&self) -> bool {
        self.breakout_only_modes().next().is_some()
    }

    /// The sub-ports created by applying `mode` and the speed each gets.
    pub fn sub_ports(&self, mode: &BreakoutMode) -> Result<OrderMap<String, Speed>, ModelError> {
        let base = port_number(&self.port)?;
        let mut out = OrderMap::new();
        for (offset, speed) in mode.layout(&self.port, self.lane_count())? {
            let offset = u32::try_from(offset)
                .map_err(|_| ModelError::InvalidPortName(self.port.clone()))?;
            out.insert(port_name(base + offset), speed);
        }
        Ok(out)
    }

    #[must_use]
    pub fn speeds_by_modes(&self) -> OrderMap<BreakoutMode, SpeedSet> {
        self.breakout_modes
            .iter()
            .map(|m| (m.clone(), m.speeds()))
            .collect()
    }

    /// Supported speeds per split number, merging modes of the same split.
    #[must_use]
    pub fn speeds_by_split(&self) -> BTreeMap<u8, SpeedSet> {
        let mut out: BTreeMap<u8, SpeedSet> = BTreeMap::new();
        for mode in self.breakout_modes.iter().filter(|m| !m.is_mixed()) {
            out.entry(mode.split_number())
                .or_default()
                .extend(mode.speeds());
        }
        out
    }
}

/// Merge the sub-ports of every (mode, ports) pair into one map of
/// sub-port to expected speed.
pub fn breakout_port_by_modes(
    conf: &OrderMap<BreakoutMode, Vec<String>>,
    infos: &OrderMap<String, PortBreakoutInfo>,
) -> Result<OrderMap<String, Speed>, ModelError> {
    let mut out = OrderMap::new();
    for (mode, ports) in conf {
        for port in ports {
            let info = infos
                .get(port)
                .ok_or_else(|| ModelError::UnknownPort(port.clone()))?;
            out.extend(info.sub_ports(mode)?);
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn mode(s: &str) -> BreakoutMode {
        BreakoutMode::from_str(s).unwrap()
    }

    fn info() -> PortBreakoutInfo {
        PortBreakoutInfo {
            port: "Ethernet8".to_string(),
            index: vec![3, 3, 3, 3],
            lanes: vec![8, 9, 10, 11],
            breakout_modes: vec![
                mode("1x100G[50G,40G,25G,10G,1G]"),
                mode("2x50G[40G,25G,10G,1G]"),
                mode("4x25G[10G,1G]"),
            ],
            default_breakout_mode: Some(mode("1x100G[50G,40G,25G,10G,1G]")),
        }
    }

    #[test]
    fn test_parse_modes() {
        let m = mode("4x25G[10G,1G]");
        assert_eq!(m.split_number(), 4);
        assert!(m.is_breakout());
        assert_eq!(m.configured_speed(), Speed::from_gbps(25));
        assert_eq!(m.speeds().len(), 3);

        let m = mode("1x100G[50G,40G,25G,10G,1G]");
        assert!(!m.is_breakout());

        let m = mode("2x25G(2)+1x50G(2)");
        assert!(m.is_mixed());
        assert!(m.is_breakout());
        assert_eq!(m.sub_port_count(), 3);

        assert!(BreakoutMode::from_str("4x25").is_err());
        assert!(BreakoutMode::from_str("x25G").is_err());
        assert!(BreakoutMode::from_str("2x25G(2)").is_err());
        assert!(BreakoutMode::from_str("4x25G[10G").is_err());
        assert_eq!(all_breakout_options().len(), ALL_BREAKOUT_OPTIONS.len());
    }

    #[test]
    fn test_sub_ports() {
        let info = info();
        let subs = info.sub_ports(&mode("2x50G[40G,25G,10G,1G]")).unwrap();
        let names: Vec<_> = subs.keys().cloned().collect();
        assert_eq!(names, vec!["Ethernet8", "Ethernet10"]);
        assert!(subs.values().all(|s| *s == Speed::from_gbps(50)));

        let subs = info.sub_ports(&mode("2x25G(2)+1x50G(2)")).unwrap();
        let got: Vec<_> = subs.iter().map(|(p, s)| (p.as_str(), s.to_string())).collect();
        assert_eq!(
            got,
            vec![
                ("Ethernet8", "25G".to_string()),
                ("Ethernet9", "25G".to_string()),
                ("Ethernet10", "50G".to_string()),
            ]
        );
        assert!(info.sub_ports(&mode("8x50G")).is_err());
    }

    #[test]
    fn test_speeds_by_split() {
        let info = info();
        let by_split = info.speeds_by_split();
        assert_eq!(by_split.len(), 3);
        assert!(by_split[&1].contains(&Speed::from_gbps(100)));
        assert!(!by_split[&4].contains(&Speed::from_gbps(50)));
        assert!(info.is_splittable());
        assert_eq!(max_breakout_split(&info.breakout_modes), Some(4));
    }

    #[test]
    fn test_serde_mode_as_string() {
        let info = info();
        let json = serde_json::to_string(&info).unwrap();
        assert!(json.contains("\"2x50G[40G,25G,10G,1G]\""));
        let back: PortBreakoutInfo = serde_json::from_str(&json).unwrap();
        assert_eq!(back, info);
        assert_eq!(back.breakout_modes[2].split_number(), 4);
        assert!(serde_json::from_str::<BreakoutMode>("\"4xfast\"").is_err());
    }

    #[test]
    fn test_breakout_port_by_modes() {
        let mut infos = OrderMap::new();
        infos.insert("Ethernet8".to_string(), info());
        let mut conf = OrderMap::new();
        conf.insert(mode("4x25G[10G,1G]"), vec!["Ethernet8".to_string()]);
        let merged = breakout_port_by_modes(&conf, &infos).unwrap();
        assert_eq!(merged.len(), 4);
        assert_eq!(merged["Ethernet11"], Speed::from_gbps(25));

        conf.insert(mode("2x50G"), vec!["Ethernet0".to_string()]);
        assert_eq!(
            breakout_port_by_modes(&conf, &infos),
            Err(ModelError::UnknownPort("Ethernet0".to_string()))
        );
    }
}
