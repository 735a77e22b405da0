// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Text the simulated devices print.

use model::speed::join_speeds;
use model::{AutoNeg, FecMode, Speed, SpeedSet};
use std::fmt::Write;

/// A column table the way SONiC `show` commands print them: a header line,
/// a line of dashes per column and the rows, columns two spaces apart.
pub(crate) struct TextTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TextTable {
    pub(crate) fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(ToString::to_string).collect(),
            rows: vec![],
        }
    }

    pub(crate) fn row(&mut self, cells: Vec<String>) {
        self.rows.push(cells);
    }

    fn widths(&self) -> Vec<usize> {
        self.headers
            .iter()
            .enumerate()
            .map(|(i, h)| {
                self.rows
                    .iter()
                    .filter_map(|r| r.get(i))
                    .map(|c| c.chars().count())
                    .fold(h.chars().count(), usize::max)
            })
            .collect()
    }

    pub(crate) fn render(&self) -> String {
        let widths = self.widths();
        let line = |cells: &[String]| {
            let padded: Vec<String> = widths
                .iter()
                .enumerate()
                .map(|(i, w)| format!("{:<w$}", cells.get(i).map_or("", String::as_str)))
                .collect();
            padded.join("  ").trim_end().to_string()
        };
        let mut out = String::new();
        let _ = writeln!(out, "{}", line(&self.headers));
        let dashes: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        let _ = writeln!(out, "{}", dashes.join("  "));
        for row in &self.rows {
            let _ = writeln!(out, "{}", line(row));
        }
        out
    }
}

pub(crate) fn ping(dst: &str, src_if: &str, count: u32, received: u32) -> String {
    let loss = if count == 0 {
        100
    } else {
        count.saturating_sub(received) * 100 / count
    };
    format!(
        "PING {dst} ({dst}) from {src_if}: 56(84) bytes of data.\n\n\
         --- {dst} ping statistics ---\n\
         {count} packets transmitted, {received} received, {loss}% packet loss, time {}ms\n",
        count.saturating_sub(1) * 1001
    )
}

/// The mlxlink capability field: `0x... (100G_4X,50G_2X,25G_1X)`.
fn mlxlink_speeds(speeds: &SpeedSet, lanes: usize) -> String {
    let list: Vec<String> = speeds
        .iter()
        .rev()
        .map(|s| {
            let width = match s.as_gbps() {
                g if g >= 400 => 8.min(lanes),
                g if g >= 100 || g == 40 => 4.min(lanes),
                50 => 2.min(lanes),
                _ => 1,
            };
            format!("{}G_{width}X", s.as_gbps())
        })
        .collect();
    let mask = speeds.iter().fold(0u32, |m, s| m | s.as_gbps());
    format!("0x{mask:08x} ({})", list.join(","))
}

/// What `mlxlink` reports about a port, up or not.
pub(crate) struct MlxlinkView {
    pub(crate) admin_up: bool,
    /// Speed, width and FEC of the link, when it is up.
    pub(crate) link: Option<(Speed, u8, FecMode)>,
    pub(crate) autoneg: AutoNeg,
    pub(crate) enabled: SpeedSet,
    pub(crate) cable: SpeedSet,
    pub(crate) lanes: usize,
}

pub(crate) fn mlxlink(view: &MlxlinkView) -> String {
    let (state, physical) = match (view.admin_up, view.link) {
        (false, _) => ("\x1b[1;31mDisable\x1b[0m", "Disabled"),
        (true, Some(_)) => ("\x1b[1;32mActive\x1b[0m", "LinkUp"),
        (true, None) => ("\x1b[1;31mPolling\x1b[0m", "N/A"),
    };
    let (speed, width, fec) = match view.link {
        Some((speed, width, fec)) => (
            speed.to_string(),
            format!("{width}x"),
            fec.mlxlink_description().to_string(),
        ),
        None => ("N/A".to_string(), "N/A".to_string(), "N/A".to_string()),
    };
    let autoneg = if view.autoneg.is_enabled() { "ON" } else { "OFF" };
    let fields = [
        ("State", state.to_string()),
        ("Physical state", physical.to_string()),
        ("Speed", speed),
        ("Width", width),
        ("FEC", fec),
        ("Loopback Mode", "No Loopback".to_string()),
        ("Auto Negotiation", autoneg.to_string()),
    ];
    let supported = [
        (
            "Enabled Link Speed (Ext.)",
            mlxlink_speeds(&view.enabled, view.lanes),
        ),
        (
            "Supported Cable Speed (Ext.)",
            mlxlink_speeds(&view.cable, view.lanes),
        ),
    ];
    let mut out = String::from("\nOperational Info\n----------------\n");
    for (key, value) in fields {
        let _ = writeln!(out, "{key:<32}: {value}");
    }
    out.push_str("\nSupported Info\n--------------\n");
    for (key, value) in supported {
        let _ = writeln!(out, "{key:<32}: {value}");
    }
    out
}

/// What `ethtool` reports about a host interface.
pub(crate) struct EthtoolView<'a> {
    pub(crate) name: &'a str,
    /// Supported link modes, e.g. `100000baseCR4`.
    pub(crate) modes: Vec<String>,
    pub(crate) speed: Option<Speed>,
    pub(crate) autoneg: AutoNeg,
}

pub(crate) fn ethtool(view: &EthtoolView<'_>) -> String {
    let modes = |out: &mut String, heading: &str| {
        for (i, mode) in view.modes.iter().enumerate() {
            if i == 0 {
                let _ = writeln!(out, "\t{heading:<24}{mode}/Full");
            } else {
                let _ = writeln!(out, "\t{:<24}{mode}/Full", "");
            }
        }
    };
    let mut out = format!("Settings for {}:\n\tSupported ports: [ FIBRE ]\n", view.name);
    modes(&mut out, "Supported link modes:");
    out.push_str("\tSupported pause frame use: Symmetric\n");
    out.push_str("\tSupports auto-negotiation: Yes\n");
    out.push_str("\tSupported FEC modes: None\t BaseR\t RS\n");
    modes(&mut out, "Advertised link modes:");
    out.push_str("\tAdvertised auto-negotiation: Yes\n");
    let speed = view
        .speed
        .map_or_else(|| "Unknown!".to_string(), |s| format!("{}Mb/s", s.as_mbps()));
    let _ = writeln!(out, "\tSpeed: {speed}");
    out.push_str("\tDuplex: Full\n");
    let _ = writeln!(out, "\tAuto-negotiation: {}", view.autoneg.ethtool_str());
    let detected = if view.speed.is_some() { "yes" } else { "no" };
    let _ = writeln!(out, "\tLink detected: {detected}");
    out
}

fn ethtool_fec_name(mode: FecMode) -> &'static str {
    match mode {
        FecMode::Rs => "RS",
        FecMode::Fc => "BaseR",
        FecMode::None => "None",
        FecMode::Auto => "Auto",
    }
}

pub(crate) fn ethtool_fec(name: &str, configured: FecMode, active: FecMode) -> String {
    format!(
        "FEC parameters for {name}:\nConfigured FEC encodings: {}\nActive FEC encoding: {}\n",
        ethtool_fec_name(configured),
        ethtool_fec_name(active)
    )
}

/// Advertised speeds as the autoneg status table prints them.
pub(crate) fn adv_speeds(speeds: Option<&SpeedSet>) -> String {
    speeds.map_or_else(|| "all".to_string(), join_speeds)
}

#[cfg(test)]
mod tests {
    use super::*;
    use parse::{parse_ethtool, parse_mlxlink, parse_ping, parse_show_table};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_table_parses_back() {
        let mut table = TextTable::new(&["Interface", "Master", "IPv4 address/mask", "Admin/Oper"]);
        table.row(vec![
            "Ethernet0".into(),
            String::new(),
            "10.0.0.1/24".into(),
            "up/up".into(),
        ]);
        table.row(vec!["Vlan1000".into(), String::new(), "1.1.1.1/24".into()]);
        let text = table.render();
        let parsed = parse_show_table(&text, "Interface").unwrap();
        assert_eq!(parsed["Ethernet0"]["IPv4 address/mask"], "10.0.0.1/24");
        assert_eq!(parsed["Ethernet0"]["Master"], "");
        assert_eq!(parsed["Vlan1000"]["Admin/Oper"], "");
    }

    #[test]
    fn test_device_outputs_parse_back() {
        let g = Speed::from_gbps;
        let view = MlxlinkView {
            admin_up: true,
            link: Some((g(50), 2, FecMode::Fc)),
            autoneg: AutoNeg::Enabled,
            enabled: SpeedSet::from([g(25), g(50)]),
            cable: SpeedSet::from([g(10), g(25), g(50), g(100)]),
            lanes: 4,
        };
        let info = parse_mlxlink(&mlxlink(&view));
        assert!(info.is_active());
        assert_eq!(info.speed(), Some(g(50)));
        assert_eq!(info.width(), Some(2));
        assert_eq!(info.fec(), Some(FecMode::Fc));
        assert_eq!(info.cable_speeds().len(), 4);

        let eth = EthtoolView {
            name: "enp1s0f0",
            modes: vec!["25000baseCR".into(), "100000baseCR4".into()],
            speed: Some(g(100)),
            autoneg: AutoNeg::Disabled,
        };
        let info = parse_ethtool(&ethtool(&eth)).unwrap();
        assert_eq!(info.speed, Some(g(100)));
        assert_eq!(info.supported_speeds, SpeedSet::from([g(25), g(100)]));
        assert_eq!(info.advertised_speeds.len(), 2);
        assert!(info.link_detected);

        let stats = parse_ping(&ping("10.0.0.2", "Ethernet0", 3, 0)).unwrap();
        assert_eq!((stats.transmitted, stats.received), (3, 0));
    }
}
