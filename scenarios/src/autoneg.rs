// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Auto-negotiation of speed and interface type.
//!
//! A configuration holds, for every tested port, what gets configured on it
//! and how the port is expected to run once both ends of its link
//! negotiate. Ports are first forced to the lowest speed both ends support;
//! enabling auto-negotiation on one end only keeps the link at that speed,
//! enabling it on both moves the link to the fastest speed both ends
//! advertise, over the widest type matching that speed.

use crate::capabilities::{
    Loopback, LoopbacksBySplit, PortCapabilities, alias_numbers, autoneg_loopbacks, lb_ports,
};
use crate::dependencies::remove_ips;
use crate::errors::ScenarioError;
use crate::observe::{AutonegStatus, FecStatus, LinkInfo, PortStatus, cell};
use crate::reboot::{reboot_reload_random, wait_ports_down, wait_ports_up};
use crate::registry::scenario;
use commands::{CommandError, LinuxCli, PortState, SonicCli};
use harness::{Context, Observe, compare_actual_and_expected, retry};
use model::capability::{expected_width, lb_mutual_speeds, max_speed, min_speed, mutual_speeds};
use model::iftype::{join_types, parse_type_list};
use model::speed::join_speeds;
use model::{AutoNeg, FecMode, InterfaceType, Speed, SpeedSet};
use ordermap::OrderMap;
use parse::{MlxlinkInfo, Row, verify_show_cmd};
use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{debug, info, warn};

/// What the switch shows for advertised speeds and types left to default.
const ADVERTISE_ALL: &str = "all";

const INVALID_SPEED: &str = "30G";
const INVALID_INTERFACE: &str = "EthernetX";
const INVALID_AUTONEG_MODE: &str = "enable";
const INVALID_PORT_ERR: &str = r"Invalid\s+port";
const INVALID_SPEED_ERR: &str = r"Invalid\s+speed\s+specified";
const INVALID_AUTONEG_MODE_ERR: &str = r#"Error:\s+Invalid\s+value\s+for\s+"<mode>":\s+invalid choice:\s+enable.\s\(choose\s+from\s+enabled,\s+disabled\)"#;

const DUT_PEER_IP: &str = "20.20.20.1/24";
const HOST_PEER_IP: &str = "20.20.20.2/24";

/// Auto-negotiation settings of one port, and how the port runs once
/// negotiated.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortAutoNegConf {
    pub mode: AutoNeg,
    pub speed: Speed,
    /// `None` advertises every supported speed.
    pub adv_speeds: Option<SpeedSet>,
    pub iftype: InterfaceType,
    pub width: u8,
    /// `None` advertises every supported type.
    pub adv_types: Option<BTreeSet<InterfaceType>>,
    pub oper: PortState,
    pub admin: PortState,
    pub expected_speed: Speed,
    pub expected_type: InterfaceType,
    pub expected_width: u8,
}

impl PortAutoNegConf {
    /// Force `port` to `speed` over the narrowest type running it, the
    /// link not being expected to change.
    fn forced(
        caps: &PortCapabilities,
        port: &str,
        speed: Speed,
        adv_speeds: Option<SpeedSet>,
        adv_types: Option<BTreeSet<InterfaceType>>,
    ) -> Result<Self, ScenarioError> {
        let (_, iftype) = caps.type_range(port, speed)?;
        let width = expected_width(&iftype, speed);
        Ok(PortAutoNegConf {
            mode: AutoNeg::Disabled,
            speed,
            adv_speeds,
            iftype: iftype.clone(),
            width,
            adv_types,
            oper: PortState::Up,
            admin: PortState::Up,
            expected_speed: speed,
            expected_type: iftype,
            expected_width: width,
        })
    }

    fn expect(&mut self, speed: Speed, iftype: InterfaceType) {
        self.expected_width = expected_width(&iftype, speed);
        self.expected_speed = speed;
        self.expected_type = iftype;
    }
}

/// Per port auto-negotiation configuration, in loopback order.
pub type AutoNegConf = OrderMap<String, PortAutoNegConf>;

fn no_mutual_speed(lb: &Loopback) -> ScenarioError {
    ScenarioError::Failed(format!("{} and {} have no speed in common", lb.0, lb.1))
}

/// Both ends of every loopback advertise everything: they negotiate the
/// fastest speed they have in common.
pub fn generate_default_conf(
    caps: &PortCapabilities,
    lbs: &LoopbacksBySplit,
) -> Result<AutoNegConf, ScenarioError> {
    let mut conf = AutoNegConf::new();
    for (split, lbs) in lbs {
        for lb in lbs {
            let mutual = lb_mutual_speeds(lb_ports(lb), *split, &caps.speeds);
            let (Some(min), Some(max)) = (min_speed(&mutual), max_speed(&mutual)) else {
                return Err(no_mutual_speed(lb));
            };
            let (expected_type, _) = caps.type_range(&lb.0, max)?;
            for port in lb_ports(lb) {
                let mut port_conf = PortAutoNegConf::forced(caps, port, min, None, None)?;
                port_conf.expect(max, expected_type.clone());
                conf.insert(port.to_string(), port_conf);
            }
        }
    }
    Ok(conf)
}

/// Each end of every loopback advertises a random subset of the speeds both
/// ends support, always including the lowest one, and the types matching
/// them. They negotiate the fastest speed both subsets share.
pub fn generate_subset_conf<R: Rng>(
    rng: &mut R,
    caps: &PortCapabilities,
    lbs: &LoopbacksBySplit,
) -> Result<AutoNegConf, ScenarioError> {
    let mut conf = AutoNegConf::new();
    for (split, lbs) in lbs {
        for lb in lbs {
            let mutual = lb_mutual_speeds(lb_ports(lb), *split, &caps.speeds);
            let Some(min) = min_speed(&mutual) else {
                return Err(no_mutual_speed(lb));
            };
            let mut common: Option<SpeedSet> = None;
            let mut lb_conf = vec![];
            for port in lb_ports(lb) {
                let count = rng.random_range(1..=mutual.len());
                let mut adv: SpeedSet = mutual
                    .iter()
                    .copied()
                    .choose_multiple(rng, count)
                    .into_iter()
                    .collect();
                adv.insert(min);
                let adv_types = caps.matched_types(port, &adv)?;
                common = Some(common.map_or_else(|| adv.clone(), |c| mutual_speeds(&c, &adv)));
                lb_conf.push((port, PortAutoNegConf::forced(caps, port, min, Some(adv), Some(adv_types))?));
            }
            let expected = common.as_ref().and_then(max_speed).unwrap_or(min);
            let (expected_type, _) = caps.type_range(&lb.0, expected)?;
            for (port, mut port_conf) in lb_conf {
                port_conf.expect(expected, expected_type.clone());
                conf.insert(port.to_string(), port_conf);
            }
        }
    }
    Ok(conf)
}

/// From now on, the ports are expected to run as negotiated.
pub fn update_port_conf(conf: &mut AutoNegConf) {
    for port_conf in conf.values_mut() {
        port_conf.speed = port_conf.expected_speed;
        port_conf.iftype = port_conf.expected_type.clone();
        port_conf.width = port_conf.expected_width;
        port_conf.oper = PortState::Up;
        port_conf.admin = PortState::Up;
    }
}

/// Apply the speed, type and advertisements of the configuration. With
/// `set_cleanup`, every port gets back its `base` speed, the widest type
/// running it and full advertisements at teardown.
pub async fn configure_ports(
    ctx: &mut Context,
    caps: &PortCapabilities,
    conf: &AutoNegConf,
    base: &OrderMap<String, Speed>,
    set_cleanup: bool,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    for (port, port_conf) in conf {
        if set_cleanup {
            let base_speed = *base
                .get(port)
                .ok_or_else(|| ScenarioError::Failed(format!("no base speed for {port}")))?;
            let (base_type, _) = caps.type_range(port, base_speed)?;
            let restorer = dut.clone();
            let label = format!("restore the speed and type of {port}");
            let port = port.clone();
            ctx.cleanup().push(label, async move {
                restorer.set_speed(&port, base_speed).await?;
                restorer.set_type(&port, &base_type).await?;
                restorer.set_adv_speeds(&port, None).await?;
                restorer.set_adv_types(&port, None).await
            });
        }
        debug!("Configuring {port}: {port_conf:?}");
        dut.set_speed(port, port_conf.speed).await?;
        dut.set_type(port, &port_conf.iftype).await?;
        dut.set_adv_speeds(port, port_conf.adv_speeds.as_ref()).await?;
        dut.set_adv_types(port, port_conf.adv_types.as_ref()).await?;
    }
    Ok(())
}

/// Set the auto-negotiation mode of `ports`. Enabling registers disabling
/// it again for teardown.
pub async fn configure_port_auto_neg(
    ctx: &mut Context,
    conf: &mut AutoNegConf,
    ports: &[String],
    mode: AutoNeg,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    if mode.is_enabled() {
        let restorer = dut.clone();
        let disabled = ports.to_vec();
        ctx.cleanup()
            .push(format!("disable auto-negotiation on {ports:?}"), async move {
                for port in &disabled {
                    restorer.set_autoneg(port, AutoNeg::Disabled).await?;
                }
                Ok::<_, CommandError>(())
            });
    }
    for port in ports {
        dut.set_autoneg(port, mode).await?;
        if let Some(port_conf) = conf.get_mut(port) {
            port_conf.mode = mode;
        }
    }
    info!("Auto-negotiation {mode} on {ports:?}");
    Ok(())
}

fn advertised_types(types: Option<&BTreeSet<InterfaceType>>) -> String {
    types.map_or_else(|| ADVERTISE_ALL.to_string(), join_types)
}

/// Compare a row of `show interfaces autoneg status` with the
/// configuration. The type column is not compared: it shows what the
/// link runs, which mlxlink reports through the width.
fn verify_autoneg_row(
    port: &str,
    row: &Row,
    port_conf: &PortAutoNegConf,
    check_adv: bool,
) -> Result<(), ScenarioError> {
    let mut expected = vec![
        ("Auto-Neg Mode", port_conf.mode.sonic_str().to_string()),
        ("Speed", port_conf.speed.to_string()),
        ("Oper", port_conf.oper.to_string()),
        ("Admin", port_conf.admin.to_string()),
    ];
    if check_adv {
        let adv_speeds = port_conf
            .adv_speeds
            .as_ref()
            .map_or_else(|| ADVERTISE_ALL.to_string(), join_speeds);
        expected.push(("Adv Speeds", adv_speeds));
    }
    for (column, value) in &expected {
        compare_actual_and_expected(&format!("{column} of {port}"), value.as_str(), cell(row, column)?)?;
    }
    if check_adv {
        let actual = match cell(row, "Adv Types")? {
            ADVERTISE_ALL => ADVERTISE_ALL.to_string(),
            listed => advertised_types(Some(&parse_type_list(listed)?.into_iter().collect())),
        };
        let expected = advertised_types(port_conf.adv_types.as_ref());
        compare_actual_and_expected(&format!("Adv Types of {port}"), expected.as_str(), actual.as_str())?;
    }
    Ok(())
}

fn verify_link(port: &str, link: &MlxlinkInfo, port_conf: &PortAutoNegConf) -> Result<(), ScenarioError> {
    let speed = link.speed().map_or_else(|| "N/A".to_string(), |s| s.to_string());
    compare_actual_and_expected(
        &format!("link speed of {port}"),
        port_conf.speed.to_string().as_str(),
        speed.as_str(),
    )?;
    let width = link.width().map_or_else(|| "N/A".to_string(), |w| w.to_string());
    compare_actual_and_expected(
        &format!("link width of {port}"),
        port_conf.width.to_string().as_str(),
        width.as_str(),
    )?;
    Ok(())
}

/// Wait for the switch to show the configuration, and for the links to run
/// at the configured speed and width. Advertisements are only compared
/// with `check_adv`.
pub async fn verify_auto_neg_configuration(
    dut: &SonicCli,
    conf: &AutoNegConf,
    check_adv: bool,
) -> Result<(), ScenarioError> {
    let ports: Vec<String> = conf.keys().cloned().collect();
    let numbers = alias_numbers(dut).await?;
    let (ports, numbers) = (&ports, &numbers);
    retry("auto-negotiation configuration", 12, Duration::from_secs(10), || async move {
        let observer = AutonegStatus { dut, ports };
        let rows = observer.observe().await?;
        for ((port, row), port_conf) in rows.iter().zip(conf.values()) {
            verify_autoneg_row(port, row, port_conf, check_adv)?;
        }
        let observer = LinkInfo {
            dut,
            ports,
            alias_numbers: numbers,
        };
        let links = observer.observe().await?;
        for ((port, link), port_conf) in links.iter().zip(conf.values()) {
            verify_link(port, link, port_conf)?;
        }
        Ok::<_, ScenarioError>(())
    })
    .await?;
    info!("Auto-negotiation configuration of {} port(s) verified", conf.len());
    Ok(())
}

/// Configure the ports, then enable auto-negotiation on the first port of
/// every loopback, which must not change the links, and on the second
/// port, after which the links must run as negotiated.
pub async fn auto_neg_checker(
    ctx: &mut Context,
    caps: &PortCapabilities,
    lbs: &LoopbacksBySplit,
    conf: &mut AutoNegConf,
    set_cleanup: bool,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    let ports: Vec<String> = conf.keys().cloned().collect();
    let base = dut.speeds(&ports).await?;
    configure_ports(ctx, caps, conf, &base, set_cleanup).await?;

    let first: Vec<String> = lbs.values().flatten().map(|lb| lb.0.clone()).collect();
    configure_port_auto_neg(ctx, conf, &first, AutoNeg::Enabled).await?;
    verify_auto_neg_configuration(&dut, conf, false).await?;

    let second: Vec<String> = lbs.values().flatten().map(|lb| lb.1.clone()).collect();
    configure_port_auto_neg(ctx, conf, &second, AutoNeg::Enabled).await?;
    update_port_conf(conf);
    verify_auto_neg_configuration(&dut, conf, true).await
}

/// The loopbacks auto-negotiation is tested on, and what their ports can do.
async fn discover(ctx: &mut Context) -> Result<(PortCapabilities, LoopbacksBySplit), ScenarioError> {
    let caps = PortCapabilities::discover(ctx).await?;
    let lbs = autoneg_loopbacks(ctx.topology(), &caps.speeds);
    if lbs.is_empty() {
        return Err(ScenarioError::Skipped("no loopback to negotiate over".to_string()));
    }
    Ok((caps, lbs))
}

/// Negotiate with full then partial advertisements, across a restart, and
/// check that disabling auto-negotiation brings the forced speed back.
async fn autoneg_conf(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (caps, lbs) = discover(ctx).await?;
    let dut = ctx.dut().clone();

    let mut conf = generate_default_conf(&caps, &lbs)?;
    let ports: Vec<String> = conf.keys().cloned().collect();
    info!("Checking the default configuration of {} port(s)", ports.len());
    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Disabled).await?;
    auto_neg_checker(ctx, &caps, &lbs, &mut conf, true).await?;
    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Disabled).await?;

    let mut conf = generate_subset_conf(ctx.rng(), &caps, &lbs)?;
    info!("Checking the custom configuration of {} port(s)", ports.len());
    let backup = conf.clone();
    auto_neg_checker(ctx, &caps, &lbs, &mut conf, false).await?;

    reboot_reload_random(ctx, &ports).await?;
    verify_auto_neg_configuration(&dut, &conf, true).await?;

    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Disabled).await?;
    verify_auto_neg_configuration(&dut, &backup, true).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(autoneg_conf, "Negotiate speed and type over loopbacks, across a restart");

/// The host advertises everything it supports, so the link negotiates the
/// fastest speed the switch port advertises.
fn modify_conf_for_toggle_peer(
    caps: &PortCapabilities,
    dut_port: &str,
    conf: &mut AutoNegConf,
) -> Result<(), ScenarioError> {
    let peer_speed = conf
        .get(dut_port)
        .and_then(|c| c.adv_speeds.as_ref())
        .and_then(max_speed)
        .ok_or_else(|| ScenarioError::Failed(format!("{dut_port} advertises nothing")))?;
    let (iftype, _) = caps.type_range(dut_port, peer_speed)?;
    for port_conf in conf.values_mut() {
        port_conf.expect(peer_speed, iftype.clone());
    }
    Ok(())
}

async fn set_peer_port_ip_conf(
    ctx: &mut Context,
    host: &LinuxCli,
    link: &Loopback,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    let ips = vec![(link.0.clone(), DUT_PEER_IP.to_string())];
    ctx.cleanup()
        .push("remove the switch peer address", remove_ips(dut.clone(), ips));
    dut.add_ip(&link.0, DUT_PEER_IP).await?;
    host.add_ip(&link.1, HOST_PEER_IP).await?;
    let (remover, iface) = (host.clone(), link.1.clone());
    ctx.cleanup().push("remove the host peer address", async move {
        remover.del_ip(&iface, HOST_PEER_IP).await
    });
    Ok(())
}

/// Ping `dst` out of a host interface until every packet comes back.
pub(crate) async fn ping_from_host(host: &LinuxCli, iface: &str, dst: &str) -> Result<(), ScenarioError> {
    retry(&format!("ping from {iface}"), 3, Duration::from_secs(5), || async move {
        let stats = host.ping(iface, dst, 3).await?;
        if stats.all_received() {
            Ok(())
        } else {
            Err(ScenarioError::mismatch(
                &format!("packets received by {dst} from {iface}"),
                stats.transmitted,
                stats.received,
            ))
        }
    })
    .await?;
    Ok(())
}

/// Force both ends of a switch to host link, toggle the switch port, then
/// enable auto-negotiation on the switch side, which must not change the
/// link, and on the host side, after which the link must run as negotiated
/// and pass traffic.
async fn auto_neg_toggle_peer_checker(
    ctx: &mut Context,
    caps: &PortCapabilities,
    host: &LinuxCli,
    link: &Loopback,
    mut conf: AutoNegConf,
) -> Result<(), ScenarioError> {
    let (dut_port, host_iface) = (link.0.as_str(), link.1.as_str());
    let dut = ctx.dut().clone();
    let ports = vec![dut_port.to_string()];
    wait_ports_up(&dut, &ports, 18, Duration::from_secs(10)).await?;
    let base_speed = dut.speed(dut_port).await?;
    let base = OrderMap::from([(dut_port.to_string(), base_speed)]);
    conf.retain(|port, _| port == dut_port);
    let speed = conf
        .get(dut_port)
        .map(|c| c.speed)
        .ok_or_else(|| ScenarioError::Failed(format!("{dut_port} is not configured")))?;

    let (restorer, iface) = (host.clone(), host_iface.to_string());
    ctx.cleanup().push(format!("restore {host_iface}"), async move {
        restorer.set_speed(&iface, base_speed).await?;
        restorer.set_autoneg(&iface, AutoNeg::Enabled).await
    });
    host.set_autoneg(host_iface, AutoNeg::Disabled).await?;
    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Disabled).await?;
    configure_ports(ctx, caps, &conf, &base, true).await?;
    host.set_speed(host_iface, speed).await?;

    info!("Toggling {dut_port}");
    let starter = dut.clone();
    let port = dut_port.to_string();
    ctx.cleanup()
        .push(format!("startup {dut_port}"), async move { starter.startup(&port).await });
    dut.shutdown(dut_port).await?;
    dut.startup(dut_port).await?;

    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Enabled).await?;
    verify_auto_neg_configuration(&dut, &conf, false).await?;

    info!("Enabling auto-negotiation on {host_iface} and toggling it");
    host.set_autoneg(host_iface, AutoNeg::Enabled).await?;
    host.link_down(host_iface).await?;
    host.link_up(host_iface).await?;
    update_port_conf(&mut conf);
    verify_auto_neg_configuration(&dut, &conf, true).await?;
    let dst = DUT_PEER_IP.split('/').next().unwrap_or(DUT_PEER_IP);
    ping_from_host(host, host_iface, dst).await
}

/// Negotiate with a host peer whose link gets toggled in between.
async fn autoneg_toggle_peer(ctx: &mut Context) -> Result<(), ScenarioError> {
    let skip = || ScenarioError::Skipped("the switch is not cabled to host ha".to_string());
    let link = ctx.topology().dut_host_port("ha", 1).ok_or_else(skip)?;
    let host = ctx.host("ha").cloned().ok_or_else(skip)?;
    let mut caps = PortCapabilities::discover(ctx).await?;
    let nic = host.ethtool(&link.1).await?;
    caps.add_host_port(&link.1, &link.0, nic.supported_speeds)?;

    let lbs = LoopbacksBySplit::from([(1, vec![link.clone()])]);
    let default_conf = generate_default_conf(&caps, &lbs)?;
    let mut subset_conf = generate_subset_conf(ctx.rng(), &caps, &lbs)?;
    modify_conf_for_toggle_peer(&caps, &link.0, &mut subset_conf)?;
    set_peer_port_ip_conf(ctx, &host, &link).await?;

    info!("Checking the default configuration of {}", link.0);
    auto_neg_toggle_peer_checker(ctx, &caps, &host, &link, default_conf).await?;
    info!("Checking the custom configuration of {}", link.0);
    auto_neg_toggle_peer_checker(ctx, &caps, &host, &link, subset_conf).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(autoneg_toggle_peer, "Negotiate with a host while toggling the link");

/// Run a configuration command expecting the switch to refuse it with an
/// output matching `pattern`.
async fn verify_config_refused(
    dut: &SonicCli,
    setting: &str,
    port: &str,
    value: &str,
    pattern: &str,
) -> Result<(), ScenarioError> {
    match dut.config_interface(setting, port, value).await {
        Ok(output) => Err(ScenarioError::Failed(format!(
            "`config interface {setting} {port} {value}` was accepted: {output}"
        ))),
        Err(e) => {
            let Some(output) = e.output() else {
                return Err(e.into());
            };
            verify_show_cmd(output, &[(pattern, true)])?;
            info!("`config interface {setting} {port} {value}` refused: {}", output.trim());
            Ok(())
        }
    }
}

/// Configure mismatching advertisements on a loopback: the link must stay
/// up while forced, go down once both ends negotiate, and come back once
/// the configuration is undone.
async fn verify_auto_neg_failure_scenario(
    ctx: &mut Context,
    caps: &PortCapabilities,
    lb: &Loopback,
    conf: &mut AutoNegConf,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    let ports = vec![lb.0.clone(), lb.1.clone()];
    let base = dut.speeds(&ports).await?;
    configure_port_auto_neg(ctx, conf, &ports, AutoNeg::Disabled).await?;
    configure_ports(ctx, caps, conf, &base, true).await?;
    wait_ports_up(&dut, &ports, 3, Duration::from_secs(10)).await?;

    configure_port_auto_neg(ctx, conf, &ports, AutoNeg::Enabled).await?;
    wait_ports_down(&dut, &ports, 6, Duration::from_secs(10)).await?;
    info!("{} and {} did not negotiate", lb.0, lb.1);

    ctx.run_cleanup().await?;
    wait_ports_up(&dut, &ports, 6, Duration::from_secs(10)).await
}

/// The ends of `lb` split the speeds both support between them.
fn get_mismatch_speed_conf<R: Rng>(
    rng: &mut R,
    caps: &PortCapabilities,
    split: u8,
    lb: &Loopback,
) -> Result<AutoNegConf, ScenarioError> {
    let mutual: Vec<Speed> = lb_mutual_speeds(lb_ports(lb), split, &caps.speeds)
        .into_iter()
        .collect();
    if mutual.len() < 2 {
        return Err(ScenarioError::Skipped(format!("{lb:?} supports a single speed")));
    }
    let idx = rng.random_range(1..mutual.len());
    let mut conf = generate_default_conf(caps, &LoopbacksBySplit::from([(split, vec![lb.clone()])]))?;
    for (port, adv) in [(&lb.0, &mutual[..idx]), (&lb.1, &mutual[idx..])] {
        if let Some(port_conf) = conf.get_mut(port) {
            port_conf.adv_speeds = Some(adv.iter().copied().collect());
        }
    }
    Ok(conf)
}

/// The ends of `lb` split the types both support between them.
fn get_mismatch_type_conf<R: Rng>(
    rng: &mut R,
    caps: &PortCapabilities,
    split: u8,
    lb: &Loopback,
) -> Result<AutoNegConf, ScenarioError> {
    let mutual = lb_mutual_speeds(lb_ports(lb), split, &caps.speeds);
    let types: Vec<InterfaceType> = caps.matched_types(&lb.0, &mutual)?.into_iter().collect();
    if types.len() < 2 {
        return Err(ScenarioError::Skipped(format!(
            "{lb:?} supports a single interface type: {}",
            join_types(&types)
        )));
    }
    let idx = rng.random_range(1..types.len());
    let mut conf = generate_default_conf(caps, &LoopbacksBySplit::from([(split, vec![lb.clone()])]))?;
    for (port, adv) in [(&lb.0, &types[..idx]), (&lb.1, &types[idx..])] {
        if let Some(port_conf) = conf.get_mut(port) {
            port_conf.adv_types = Some(adv.iter().cloned().collect());
        }
    }
    Ok(conf)
}

/// The first end of `lb` advertises its forced speed along with a type
/// that cannot run it. The switch ignores such an advertisement, so the
/// link keeps its forced speed and type.
fn get_mismatch_speed_type_conf(caps: &PortCapabilities, lb: &Loopback) -> Result<AutoNegConf, ScenarioError> {
    let mut conf = generate_default_conf(caps, &LoopbacksBySplit::from([(1, vec![lb.clone()])]))?;
    let mutual = lb_mutual_speeds(lb_ports(lb), 1, &caps.speeds);
    let max_type = caps
        .matched_types(&lb.0, &mutual)?
        .into_iter()
        .max_by_key(InterfaceType::width)
        .ok_or_else(|| no_mutual_speed(lb))?;
    let Some(first) = conf.get_mut(&lb.0) else {
        return Err(ScenarioError::Failed(format!("{} is not configured", lb.0)));
    };
    if first.iftype == max_type {
        return Err(ScenarioError::Skipped(format!("{} runs its lowest speed over {max_type}", lb.0)));
    }
    first.adv_speeds = Some(SpeedSet::from([first.speed]));
    first.adv_types = Some(BTreeSet::from([max_type]));
    for port_conf in conf.values_mut() {
        port_conf.expect(port_conf.speed, port_conf.iftype.clone());
    }
    Ok(conf)
}

/// Keep going when a check cannot run on this setup.
fn tolerate_skip(result: Result<(), ScenarioError>) -> Result<(), ScenarioError> {
    match result {
        Err(e) if e.is_skip() => {
            warn!("{e}");
            Ok(())
        }
        other => other,
    }
}

async fn negative_advertised_speeds(
    ctx: &mut Context,
    caps: &PortCapabilities,
    lbs: &LoopbacksBySplit,
) -> Result<(), ScenarioError> {
    let Some(lb) = lbs.get(&2).and_then(|lbs| lbs.first()) else {
        return Err(ScenarioError::Skipped("no split loopback to mismatch speeds on".to_string()));
    };
    let dut = ctx.dut().clone();
    verify_config_refused(&dut, "advertised-speeds", &lb.0, INVALID_SPEED, INVALID_SPEED_ERR).await?;
    verify_config_refused(&dut, "advertised-speeds", INVALID_INTERFACE, ADVERTISE_ALL, INVALID_PORT_ERR).await?;
    let mut conf = get_mismatch_speed_conf(ctx.rng(), caps, 2, lb)?;
    verify_auto_neg_failure_scenario(ctx, caps, lb, &mut conf).await
}

async fn negative_advertised_types(
    ctx: &mut Context,
    caps: &PortCapabilities,
    lbs: &LoopbacksBySplit,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    verify_config_refused(&dut, "advertised-types", INVALID_INTERFACE, ADVERTISE_ALL, INVALID_PORT_ERR).await?;
    let splits: Vec<u8> = [1, 2].into_iter().filter(|s| lbs.contains_key(s)).collect();
    let Some(split) = splits.choose(ctx.rng()).copied() else {
        return Err(ScenarioError::Skipped("no loopback to mismatch types on".to_string()));
    };
    let Some(lb) = lbs.get(&split).and_then(|lbs| lbs.first()) else {
        return Err(ScenarioError::Skipped(format!("no loopback split by {split}")));
    };
    let mut conf = get_mismatch_type_conf(ctx.rng(), caps, split, lb)?;
    verify_auto_neg_failure_scenario(ctx, caps, lb, &mut conf).await
}

async fn negative_speed_type_mismatch(
    ctx: &mut Context,
    caps: &PortCapabilities,
    lb: &Loopback,
) -> Result<(), ScenarioError> {
    let mut conf = get_mismatch_speed_type_conf(caps, lb)?;
    let ports: Vec<String> = conf.keys().cloned().collect();
    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Disabled).await?;
    let lbs = LoopbacksBySplit::from([(1, vec![lb.clone()])]);
    auto_neg_checker(ctx, caps, &lbs, &mut conf, true).await?;
    ctx.run_cleanup().await?;
    Ok(())
}

/// Invalid modes, ports, speeds and types are refused, and mismatching
/// advertisements keep links from negotiating.
async fn autoneg_negative(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (caps, lbs) = discover(ctx).await?;
    let Some(lb) = lbs.get(&1).and_then(|lbs| lbs.first()).cloned() else {
        return Err(ScenarioError::Skipped("no unsplit loopback".to_string()));
    };
    let dut = ctx.dut().clone();
    verify_config_refused(&dut, "autoneg", &lb.0, INVALID_AUTONEG_MODE, INVALID_AUTONEG_MODE_ERR).await?;
    verify_config_refused(&dut, "autoneg", INVALID_INTERFACE, "enabled", INVALID_PORT_ERR).await?;

    tolerate_skip(negative_advertised_speeds(ctx, &caps, &lbs).await)?;

    let supported = lb_mutual_speeds([lb.0.as_str()], 1, &caps.speeds);
    let types: Vec<InterfaceType> = caps.matched_types(&lb.0, &supported)?.into_iter().collect();
    if let Some(iftype) = types.choose(ctx.rng()) {
        verify_config_refused(&dut, "type", INVALID_INTERFACE, iftype.as_str(), INVALID_PORT_ERR).await?;
    }

    tolerate_skip(negative_advertised_types(ctx, &caps, &lbs).await)?;
    tolerate_skip(negative_speed_type_mismatch(ctx, &caps, &lb).await)?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(autoneg_negative, "Invalid auto-negotiation settings are refused, mismatches keep links down");

/// Set FEC to auto on `ports`, registering the current modes for teardown.
pub async fn configure_auto_fec(ctx: &mut Context, ports: &[String]) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    let mut previous = vec![];
    for port in ports {
        previous.push((port.clone(), dut.fec_admin(port).await?));
    }
    let restorer = dut.clone();
    ctx.cleanup().push("restore FEC modes", async move {
        for (port, mode) in &previous {
            restorer.set_fec(port, *mode).await?;
        }
        Ok::<_, CommandError>(())
    });
    for port in ports {
        dut.set_fec(port, FecMode::Auto).await?;
    }
    Ok(())
}

/// The ports are up with FEC set to auto and running one of the FEC modes.
pub async fn auto_fec_checker(dut: &SonicCli, ports: &[String]) -> Result<(), ScenarioError> {
    retry("auto FEC", 6, Duration::from_secs(10), || async move {
        let status_observer = PortStatus { dut, ports };
        let status_rows = status_observer.observe().await?;
        let fec_observer = FecStatus { dut, ports };
        let fec_rows = fec_observer.observe().await?;
        for ((port, status), (_, fec)) in status_rows.iter().zip(fec_rows.iter()) {
            compare_actual_and_expected(&format!("Oper of {port}"), "up", cell(status, "Oper")?)?;
            compare_actual_and_expected(&format!("FEC Admin of {port}"), "auto", cell(fec, "FEC Admin")?)?;
            let oper = cell(fec, "FEC Oper")?;
            if !FecMode::TESTED.iter().any(|m| m.to_string() == oper) {
                return Err(ScenarioError::mismatch(&format!("FEC Oper of {port}"), "rs, fc or none", oper));
            }
        }
        Ok::<_, ScenarioError>(())
    })
    .await?;
    info!("Auto FEC verified on {} port(s)", ports.len());
    Ok(())
}

/// Negotiate with FEC set to auto on both ends of the loopbacks.
async fn autoneg_auto_fec(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (caps, lbs) = discover(ctx).await?;
    let dut = ctx.dut().clone();
    let mut conf = generate_default_conf(&caps, &lbs)?;
    let ports: Vec<String> = conf.keys().cloned().collect();
    configure_port_auto_neg(ctx, &mut conf, &ports, AutoNeg::Disabled).await?;
    configure_auto_fec(ctx, &ports).await?;
    auto_neg_checker(ctx, &caps, &lbs, &mut conf, true).await?;
    auto_fec_checker(&dut, &ports).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(autoneg_auto_fec, "Negotiate with FEC set to auto");

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use tracing_test::traced_test;

    fn g(gbps: u32) -> Speed {
        Speed::from_gbps(gbps)
    }

    fn lb(a: &str, b: &str) -> Loopback {
        (a.to_string(), b.to_string())
    }

    async fn lab_caps() -> (test_utils::Lab, Context, PortCapabilities) {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 21).unwrap();
        let caps = PortCapabilities::discover(&mut ctx).await.unwrap();
        (lab, ctx, caps)
    }

    #[tokio::test]
    async fn test_default_conf() {
        let (_lab, _ctx, caps) = lab_caps().await;
        let lbs = LoopbacksBySplit::from([
            (1, vec![lb("Ethernet0", "Ethernet4")]),
            (2, vec![lb("Ethernet32", "Ethernet36")]),
            (4, vec![lb("Ethernet40", "Ethernet44")]),
        ]);
        let conf = generate_default_conf(&caps, &lbs).unwrap();
        assert_eq!(conf.len(), 6);

        let unsplit = &conf["Ethernet4"];
        assert_eq!(unsplit.speed, g(1));
        assert_eq!(unsplit.iftype, InterfaceType::cr(1));
        assert_eq!(unsplit.width, 1);
        assert_eq!(unsplit.adv_speeds, None);
        assert_eq!(unsplit.expected_speed, g(100));
        assert_eq!(unsplit.expected_type, InterfaceType::cr(4));
        assert_eq!(unsplit.expected_width, 4);

        let split2 = &conf["Ethernet32"];
        assert_eq!(split2.expected_speed, g(50));
        assert_eq!(split2.expected_type, InterfaceType::cr(2));
        let split4 = &conf["Ethernet44"];
        assert_eq!(split4.expected_speed, g(25));
        assert_eq!(split4.expected_width, 1);

        let mut updated = conf.clone();
        update_port_conf(&mut updated);
        assert_eq!(updated["Ethernet0"].speed, g(100));
        assert_eq!(updated["Ethernet0"].width, 4);
    }

    #[tokio::test]
    async fn test_subset_conf() {
        let (_lab, _ctx, caps) = lab_caps().await;
        let lbs = LoopbacksBySplit::from([(1, vec![lb("Ethernet0", "Ethernet4")])]);
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let conf = generate_subset_conf(&mut rng, &caps, &lbs).unwrap();
            let a = conf["Ethernet0"].adv_speeds.clone().unwrap();
            let b = conf["Ethernet4"].adv_speeds.clone().unwrap();
            assert!(a.contains(&g(1)) && b.contains(&g(1)));
            let expected = *a.intersection(&b).max().unwrap();
            assert_eq!(conf["Ethernet0"].expected_speed, expected);
            assert_eq!(conf["Ethernet4"].expected_speed, expected);
            assert_eq!(
                conf["Ethernet0"].adv_types,
                Some(caps.matched_types("Ethernet0", &a).unwrap())
            );
        }
    }

    #[tokio::test]
    async fn test_mismatch_confs() {
        let (_lab, _ctx, caps) = lab_caps().await;
        let mut rng = StdRng::seed_from_u64(3);
        let split2 = lb("Ethernet32", "Ethernet36");
        let conf = get_mismatch_speed_conf(&mut rng, &caps, 2, &split2).unwrap();
        let a = conf["Ethernet32"].adv_speeds.clone().unwrap();
        let b = conf["Ethernet36"].adv_speeds.clone().unwrap();
        assert!(a.is_disjoint(&b));
        assert_eq!(a.len() + b.len(), 4);

        let unsplit = lb("Ethernet0", "Ethernet4");
        let conf = get_mismatch_type_conf(&mut rng, &caps, 1, &unsplit).unwrap();
        let a = conf["Ethernet0"].adv_types.clone().unwrap();
        let b = conf["Ethernet4"].adv_types.clone().unwrap();
        assert!(a.is_disjoint(&b));

        let conf = get_mismatch_speed_type_conf(&caps, &unsplit).unwrap();
        assert_eq!(conf["Ethernet0"].adv_speeds, Some(SpeedSet::from([g(1)])));
        assert_eq!(conf["Ethernet0"].adv_types, Some(BTreeSet::from([InterfaceType::cr(4)])));
        assert_eq!(conf["Ethernet4"].expected_speed, g(1));

        let split4 = lb("Ethernet40", "Ethernet44");
        let err = get_mismatch_type_conf(&mut rng, &caps, 4, &split4).unwrap_err();
        assert!(err.is_skip());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_autoneg_conf() {
        let (lab, mut ctx, _) = lab_caps().await;
        autoneg_conf(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(lab.oper_up("dut", "Ethernet0"));
        assert!(lab.oper_up("dut", "Ethernet44"));
        let dut = ctx.dut().clone();
        let table = dut.show_autoneg_status(Some("Ethernet0")).await.unwrap();
        assert_eq!(table["Ethernet0"]["Auto-Neg Mode"], "disabled");
        assert_eq!(table["Ethernet0"]["Adv Speeds"], "all");
        assert_eq!(dut.speed("Ethernet0").await.unwrap(), g(100));
        assert!(logs_contain("Auto-negotiation configuration of 6 port(s) verified"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_autoneg_toggle_peer() {
        let (lab, mut ctx, _) = lab_caps().await;
        autoneg_toggle_peer(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(lab.oper_up("dut", "Ethernet48"));
        let host = ctx.host("ha").unwrap().clone();
        let nic = host.ethtool("enp1s0f0").await.unwrap();
        assert_eq!(nic.autoneg, AutoNeg::Enabled);
        let ips = ctx.dut().show_ip_interfaces().await.unwrap();
        assert!(ips.get("Ethernet48").is_none_or(|a| a.is_empty()));
        assert!(logs_contain("Toggling Ethernet48"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_autoneg_negative() {
        let (lab, mut ctx, _) = lab_caps().await;
        autoneg_negative(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(logs_contain("30G` refused: Invalid speed specified: 30G"));
        assert!(logs_contain(
            "`config interface advertised-types EthernetX all` refused: Error: Invalid port EthernetX"
        ));
        assert!(logs_contain("enable` refused: Error: Invalid value for"));
        assert!(logs_contain("Ethernet32 and Ethernet36 did not negotiate"));
        for port in ["Ethernet0", "Ethernet4", "Ethernet32", "Ethernet36"] {
            assert!(lab.oper_up("dut", port), "{port} is down");
        }

        let dut = ctx.dut().clone();
        let err = verify_config_refused(&dut, "autoneg", "Ethernet0", "enabled", INVALID_PORT_ERR)
            .await
            .unwrap_err();
        assert!(matches!(err, ScenarioError::Failed(_)));
        dut.set_autoneg("Ethernet0", AutoNeg::Disabled).await.unwrap();
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_autoneg_auto_fec() {
        let (lab, mut ctx, _) = lab_caps().await;
        autoneg_auto_fec(&mut ctx).await.unwrap();
        assert!(logs_contain("Auto FEC verified on 6 port(s)"));
        assert!(lab.oper_up("dut", "Ethernet40"));
        let dut = ctx.dut().clone();
        assert_eq!(dut.fec_admin("Ethernet0").await.unwrap(), FecMode::None);
    }
}
