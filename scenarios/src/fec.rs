// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Forward error correction.
//!
//! Both ends of every tested link are forced to the same FEC mode and to a
//! random speed the mode runs at, as far as the chip table and the cable
//! allow. Loopbacks have both ends on the switch; on a link to a host, the
//! host interface is forced to the speed of the switch port and set to
//! the mode with ethtool.

use crate::autoneg::ping_from_host;
use crate::capabilities::{Loopback, PortCapabilities, alias_numbers, lb_ports, port_alias_number};
use crate::dependencies::remove_ips;
use crate::errors::ScenarioError;
use crate::observe::{FecStatus, HostLink, LinkInfo, PortStatus, cell};
use crate::reboot::{reboot_reload_random, save_configuration, wait_ports_up};
use crate::registry::scenario;
use commands::{CommandError, LinuxCli, PortState, RebootKind, SonicCli};
use harness::{Context, Observe, compare_actual_and_expected, retry};
use model::capability::{lb_mutual_fec_modes, lb_mutual_speeds, mutual_speeds};
use model::{AutoNeg, FecMode, FecTable, Speed, SpeedSet};
use ordermap::OrderMap;
use parse::{MlxlinkInfo, Row};
use rand::Rng;
use rand::seq::{IndexedRandom, IteratorRandom};
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::{debug, info, warn};

/// FEC modes of every port, with the speeds each mode runs at.
pub type FecCapabilities = BTreeMap<String, BTreeMap<FecMode, SpeedSet>>;

/// Loopbacks to test per split number and FEC mode.
pub type FecLoopbacks = BTreeMap<u8, BTreeMap<FecMode, Vec<Loopback>>>;

/// Speed and FEC mode of one port, and the state it is expected in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortFecConf {
    pub speed: Speed,
    pub fec: FecMode,
    pub admin: PortState,
    pub oper: PortState,
}

impl PortFecConf {
    fn up(speed: Speed, fec: FecMode) -> Self {
        PortFecConf {
            speed,
            fec,
            admin: PortState::Up,
            oper: PortState::Up,
        }
    }

    /// The mode the link runs once up.
    #[must_use]
    pub fn oper_fec(&self) -> FecMode {
        match self.fec {
            FecMode::Auto => FecMode::resolve_auto(self.speed),
            mode => mode,
        }
    }
}

/// Per port FEC configuration, in configuration order.
pub type FecConf = OrderMap<String, PortFecConf>;

/// Speed and FEC mode of ports before a scenario touches them.
#[derive(Debug, Clone, Default)]
pub struct BaseConf(OrderMap<String, PortFecConf>);

impl BaseConf {
    pub async fn read(dut: &SonicCli, ports: &[String]) -> Result<Self, ScenarioError> {
        let speeds = dut.speeds(ports).await?;
        let observer = FecStatus { dut, ports };
        let rows = observer.observe().await?;
        let mut base = OrderMap::new();
        for ((port, row), speed) in rows.iter().zip(speeds.values()) {
            let fec = FecMode::from_sonic(cell(row, "FEC Admin")?)?;
            base.insert((*port).to_string(), PortFecConf::up(*speed, fec));
        }
        Ok(BaseConf(base))
    }

    pub fn get(&self, port: &str) -> Result<&PortFecConf, ScenarioError> {
        self.0
            .get(port)
            .ok_or_else(|| ScenarioError::Failed(format!("no base configuration for {port}")))
    }

    /// From now on, the ports of `conf` are expected back at their base
    /// configuration.
    pub fn restore(&self, conf: &mut FecConf) -> Result<(), ScenarioError> {
        for (port, port_conf) in conf.iter_mut() {
            *port_conf = self.get(port)?.clone();
        }
        Ok(())
    }
}

/// A switch port cabled to a host interface.
#[derive(Debug, Clone)]
pub struct HostConnection {
    pub host: String,
    pub cli: LinuxCli,
    pub dut_port: String,
    pub host_port: String,
}

fn host_connection(ctx: &Context, host: &str, index: u32) -> Option<HostConnection> {
    let (dut_port, host_port) = ctx.topology().dut_host_port(host, index)?;
    Some(HostConnection {
        host: host.to_string(),
        cli: ctx.host(host)?.clone(),
        dut_port,
        host_port,
    })
}

/// The host links each FEC mode is tested over: `none` and `fc` over the
/// links of host `ha`, `rs` over the first link of host `hb`.
pub fn tested_host_connections(ctx: &Context) -> BTreeMap<FecMode, HostConnection> {
    let mut conns = BTreeMap::new();
    for (mode, host, index) in [(FecMode::None, "ha", 1), (FecMode::Fc, "ha", 2), (FecMode::Rs, "hb", 1)] {
        match host_connection(ctx, host, index) {
            Some(conn) => {
                conns.insert(mode, conn);
            }
            None => warn!("No link {index} to host {host}, FEC {mode} is not tested with a host"),
        }
    }
    conns
}

/// The FEC modes each of `ports` can run according to `table` and to the
/// speeds of its cable.
pub async fn port_fec_capabilities(
    dut: &SonicCli,
    ports: &[String],
    table: &FecTable,
) -> Result<FecCapabilities, ScenarioError> {
    let numbers = alias_numbers(dut).await?;
    let mut caps = FecCapabilities::new();
    for port in ports {
        let number = port_alias_number(&numbers, port)?;
        caps.insert(port.clone(), dut.supported_fec_modes(port, number, table).await?);
    }
    debug!("FEC capabilities: {caps:?}");
    Ok(caps)
}

/// What the FEC scenarios learn before touching the ports.
struct FecSetup {
    caps: PortCapabilities,
    fec: FecCapabilities,
    base: BaseConf,
    plain: Vec<Loopback>,
    split: Vec<(u8, Loopback)>,
    hosts: BTreeMap<FecMode, HostConnection>,
}

impl FecSetup {
    async fn discover(ctx: &mut Context, table: &FecTable) -> Result<Self, ScenarioError> {
        let caps = PortCapabilities::discover(ctx).await?;
        let plain = ctx.topology().dut_loopbacks();
        let split: Vec<(u8, Loopback)> = [2, 4]
            .into_iter()
            .filter_map(|s| ctx.topology().split_loopback(s).map(|lb| (s, lb)))
            .collect();
        let hosts = tested_host_connections(ctx);

        let mut ports: Vec<String> = plain
            .iter()
            .chain(split.iter().map(|(_, lb)| lb))
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect();
        ports.extend(hosts.values().map(|c| c.dut_port.clone()));
        let dut = ctx.dut().clone();
        let fec = port_fec_capabilities(&dut, &ports, table).await?;
        let base = BaseConf::read(&dut, &ports).await?;
        Ok(FecSetup {
            caps,
            fec,
            base,
            plain,
            split,
            hosts,
        })
    }

    /// Speeds all of `ports` can run `mode` at when split by `split`.
    fn speed_options(&self, ports: &[&str], split: u8, mode: FecMode) -> SpeedSet {
        let mutual = lb_mutual_speeds(ports.iter().copied(), split, &self.caps.speeds);
        lb_mutual_fec_modes(ports.iter().copied(), &self.fec)
            .get(&mode)
            .map(|speeds| mutual_speeds(speeds, &mutual))
            .unwrap_or_default()
    }

    /// Speeds each FEC mode runs at over a host link, the host being
    /// forced to them too. Modes without such a speed are left out.
    async fn host_speed_options(&self, conn: &HostConnection) -> Result<BTreeMap<FecMode, SpeedSet>, ScenarioError> {
        let nic = conn.cli.ethtool(&conn.host_port).await?;
        Ok(FecMode::TESTED
            .into_iter()
            .filter_map(|mode| {
                let options = mutual_speeds(
                    &self.speed_options(&[conn.dut_port.as_str()], 1, mode),
                    &nic.supported_speeds,
                );
                (!options.is_empty()).then_some((mode, options))
            })
            .collect())
    }
}

/// Loopbacks to test per split number and FEC mode. Plain loopbacks are
/// drawn at random, `plain` telling how many each mode gets. Each split
/// loopback runs a random mode of `split_modes` it has a speed for.
fn tested_loopbacks<R: Rng>(
    rng: &mut R,
    setup: &FecSetup,
    plain: &[(FecMode, usize)],
    split_modes: &[FecMode],
) -> Result<FecLoopbacks, ScenarioError> {
    let wanted: usize = plain.iter().map(|(_, count)| count).sum();
    if setup.plain.len() < wanted {
        return Err(ScenarioError::Skipped(format!(
            "{wanted} loopbacks needed, the switch has {}",
            setup.plain.len()
        )));
    }
    let mut drawn = setup.plain.iter().cloned().choose_multiple(rng, wanted).into_iter();
    let mut lbs = FecLoopbacks::new();
    for (mode, count) in plain {
        lbs.entry(1)
            .or_default()
            .insert(*mode, drawn.by_ref().take(*count).collect());
    }
    for (split, lb) in &setup.split {
        let runnable: Vec<FecMode> = split_modes
            .iter()
            .copied()
            .filter(|mode| !setup.speed_options(&lb_ports(lb), *split, *mode).is_empty())
            .collect();
        match runnable.choose(rng) {
            Some(mode) => {
                lbs.entry(*split).or_default().insert(*mode, vec![lb.clone()]);
            }
            None => warn!("{lb:?} split by {split} runs none of {split_modes:?}"),
        }
    }
    info!("FEC tested loopbacks: {lbs:?}");
    Ok(lbs)
}

fn choose_speed<R: Rng>(rng: &mut R, options: &SpeedSet, mode: FecMode, what: &str) -> Result<Speed, ScenarioError> {
    options
        .iter()
        .copied()
        .choose(rng)
        .ok_or_else(|| ScenarioError::Failed(format!("no speed of {what} runs FEC {mode}")))
}

/// Force `port` to `speed` and `mode`. The first time a port is
/// configured, restoring its base configuration is registered for
/// teardown.
async fn update_port_fec_conf(
    ctx: &mut Context,
    base: &BaseConf,
    conf: &mut FecConf,
    port: &str,
    speed: Speed,
    mode: FecMode,
) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    if !conf.contains_key(port) {
        let PortFecConf {
            speed: base_speed,
            fec: base_fec,
            ..
        } = *base.get(port)?;
        let (restorer, name) = (dut.clone(), port.to_string());
        ctx.cleanup()
            .push(format!("restore the speed and FEC of {port}"), async move {
                restorer.set_speed(&name, base_speed).await?;
                restorer.set_fec(&name, base_fec).await
            });
    }
    debug!("Configuring {port}: {speed}, FEC {mode}");
    dut.set_speed(port, speed).await?;
    dut.set_fec(port, mode).await?;
    conf.insert(port.to_string(), PortFecConf::up(speed, mode));
    Ok(())
}

/// Configure both ends of every loopback with its FEC mode and a random
/// speed the mode runs at.
async fn configure_fec(ctx: &mut Context, setup: &FecSetup, lbs: &FecLoopbacks) -> Result<FecConf, ScenarioError> {
    let mut conf = FecConf::new();
    for (split, by_mode) in lbs {
        for (mode, lbs) in by_mode {
            for lb in lbs {
                let options = setup.speed_options(&lb_ports(lb), *split, *mode);
                let speed = choose_speed(ctx.rng(), &options, *mode, &format!("{lb:?}"))?;
                for port in lb_ports(lb) {
                    update_port_fec_conf(ctx, &setup.base, &mut conf, port, speed, *mode).await?;
                }
            }
        }
    }
    Ok(conf)
}

/// Set the FEC mode of a host interface. Teardown gives it back FEC auto,
/// the base speed of the switch port and auto-negotiation.
async fn configure_fec_mode_on_host_port(
    ctx: &mut Context,
    base: &BaseConf,
    conn: &HostConnection,
    mode: FecMode,
) -> Result<(), ScenarioError> {
    info!("Configure FEC mode {mode} on {} of {}", conn.host_port, conn.host);
    let base_speed = base.get(&conn.dut_port)?.speed;
    let (restorer, iface) = (conn.cli.clone(), conn.host_port.clone());
    ctx.cleanup()
        .push(format!("restore {} of {}", conn.host_port, conn.host), async move {
            restorer.set_fec(&iface, FecMode::Auto).await?;
            restorer.set_speed(&iface, base_speed).await?;
            restorer.set_autoneg(&iface, AutoNeg::Enabled).await
        });
    conn.cli.set_fec(&conn.host_port, mode).await?;
    Ok(())
}

/// Force the switch end of a host link to `mode` at a random speed of
/// `options`, and the host end to the same speed.
async fn configure_fec_on_dut_host_port(
    ctx: &mut Context,
    base: &BaseConf,
    conf: &mut FecConf,
    conn: &HostConnection,
    mode: FecMode,
    options: &SpeedSet,
) -> Result<(), ScenarioError> {
    let speed = choose_speed(ctx.rng(), options, mode, &conn.dut_port)?;
    update_port_fec_conf(ctx, base, conf, &conn.dut_port, speed, mode).await?;
    conn.cli.set_speed(&conn.host_port, speed).await?;
    Ok(())
}

/// Configure every tested host link with its FEC mode on both ends.
async fn configure_fec_on_host_links(ctx: &mut Context, setup: &FecSetup) -> Result<FecConf, ScenarioError> {
    let mut conf = FecConf::new();
    for (mode, conn) in &setup.hosts {
        let options = setup.host_speed_options(conn).await?;
        let options = options.get(mode).cloned().unwrap_or_default();
        configure_fec_mode_on_host_port(ctx, &setup.base, conn, *mode).await?;
        configure_fec_on_dut_host_port(ctx, &setup.base, &mut conf, conn, *mode, &options).await?;
    }
    Ok(conf)
}

/// A ping from a host interface to the address of the switch port it is
/// cabled to.
#[derive(Debug, Clone)]
struct TrafficCheck {
    conn: HostConnection,
    dst_ip: String,
}

/// Give both ends of every host link an address, `{p}.{p}.{p}.{i}/24` with
/// `p` starting at 20 and stepping by 10, the switch taking the odd `i`.
async fn set_peer_port_ip_conf(
    ctx: &mut Context,
    conns: &BTreeMap<FecMode, HostConnection>,
) -> Result<Vec<TrafficCheck>, ScenarioError> {
    let dut = ctx.dut().clone();
    let mut checks = vec![];
    for (n, conn) in (0u32..).zip(conns.values()) {
        let prefix = 20 + 10 * n;
        let dst_ip = format!("{prefix}.{prefix}.{prefix}.{}", 2 * n + 1);
        let dut_ip = format!("{dst_ip}/24");
        let host_ip = format!("{prefix}.{prefix}.{prefix}.{}/24", 2 * n + 2);

        let ips = vec![(conn.dut_port.clone(), dut_ip.clone())];
        ctx.cleanup()
            .push(format!("remove the address of {}", conn.dut_port), remove_ips(dut.clone(), ips));
        dut.add_ip(&conn.dut_port, &dut_ip).await?;
        let (remover, iface, ip) = (conn.cli.clone(), conn.host_port.clone(), host_ip.clone());
        ctx.cleanup()
            .push(format!("remove the address of {} of {}", conn.host_port, conn.host), async move {
                remover.del_ip(&iface, &ip).await
            });
        conn.cli.add_ip(&conn.host_port, &host_ip).await?;
        checks.push(TrafficCheck {
            conn: conn.clone(),
            dst_ip,
        });
    }
    Ok(checks)
}

async fn validate_traffic(checks: &[TrafficCheck]) -> Result<(), ScenarioError> {
    for check in checks {
        info!(
            "Sending 3 packets from {} of {} to {}",
            check.conn.host_port, check.conn.host, check.conn.dut_port
        );
        ping_from_host(&check.conn.cli, &check.conn.host_port, &check.dst_ip).await?;
    }
    Ok(())
}

fn verify_status_row(port: &str, row: &Row, port_conf: &PortFecConf) -> Result<(), ScenarioError> {
    let expected = [
        ("Speed", port_conf.speed.to_string()),
        ("FEC", port_conf.fec.to_string()),
        ("Admin", port_conf.admin.to_string()),
        ("Oper", port_conf.oper.to_string()),
    ];
    for (column, value) in &expected {
        compare_actual_and_expected(&format!("{column} of {port}"), value.as_str(), cell(row, column)?)?;
    }
    Ok(())
}

fn verify_link(port: &str, link: &MlxlinkInfo, port_conf: &PortFecConf) -> Result<(), ScenarioError> {
    let speed = link.speed().map_or_else(|| "N/A".to_string(), |s| s.to_string());
    compare_actual_and_expected(
        &format!("link speed of {port}"),
        port_conf.speed.to_string().as_str(),
        speed.as_str(),
    )?;
    let fec = link.fec().map_or_else(|| "N/A".to_string(), |f| f.to_string());
    compare_actual_and_expected(
        &format!("link FEC of {port}"),
        port_conf.oper_fec().to_string().as_str(),
        fec.as_str(),
    )?;
    Ok(())
}

/// Wait for the status table to show the configuration of the ports.
async fn verify_interfaces_status(
    dut: &SonicCli,
    conf: &FecConf,
    tries: u32,
    delay: Duration,
) -> Result<(), ScenarioError> {
    let ports: Vec<String> = conf.keys().cloned().collect();
    let ports = &ports;
    retry("interfaces status", tries, delay, || async move {
        let observer = PortStatus { dut, ports };
        let rows = observer.observe().await?;
        for ((port, row), port_conf) in rows.iter().zip(conf.values()) {
            verify_status_row(port, row, port_conf)?;
        }
        Ok::<_, ScenarioError>(())
    })
    .await?;
    Ok(())
}

/// Wait for the switch to show the configured speed and FEC mode of every
/// port, and for mlxlink to report the links that are up running them.
pub async fn verify_fec_configuration(dut: &SonicCli, conf: &FecConf) -> Result<(), ScenarioError> {
    let ports: Vec<String> = conf.keys().cloned().collect();
    let up: Vec<String> = conf
        .iter()
        .filter(|(_, c)| c.oper == PortState::Up)
        .map(|(port, _)| port.clone())
        .collect();
    let numbers = alias_numbers(dut).await?;
    let (ports, up, numbers) = (&ports, &up, &numbers);
    retry("FEC configuration", 6, Duration::from_secs(10), || async move {
        let observer = PortStatus { dut, ports };
        let rows = observer.observe().await?;
        for ((port, row), port_conf) in rows.iter().zip(conf.values()) {
            verify_status_row(port, row, port_conf)?;
        }
        let observer = LinkInfo {
            dut,
            ports: up,
            alias_numbers: numbers,
        };
        let links = observer.observe().await?;
        let up_confs = conf.values().filter(|c| c.oper == PortState::Up);
        for ((port, link), port_conf) in links.iter().zip(up_confs) {
            verify_link(port, link, port_conf)?;
        }
        Ok::<_, ScenarioError>(())
    })
    .await?;
    info!("FEC configuration of {} port(s) verified", conf.len());
    Ok(())
}

/// Wait for a host interface to run at the speed and FEC mode of the
/// switch port it is cabled to.
async fn verify_fec_configuration_on_host_port(
    conn: &HostConnection,
    expected: &PortFecConf,
) -> Result<(), ScenarioError> {
    let ifaces = vec![conn.host_port.clone()];
    let ifaces = &ifaces;
    let label = format!("FEC of {} of {}", conn.host_port, conn.host);
    retry(&label, 6, Duration::from_secs(10), || async move {
        let observer = HostLink { host: &conn.cli, ifaces };
        let infos = observer.observe().await?;
        for (iface, info) in &infos {
            let speed = info.speed.map_or_else(|| "N/A".to_string(), |s| s.to_string());
            compare_actual_and_expected(
                &format!("speed of {iface}"),
                expected.speed.to_string().as_str(),
                speed.as_str(),
            )?;
            let active = conn.cli.show_fec(iface).await?;
            compare_actual_and_expected(
                &format!("active FEC of {iface}"),
                expected.oper_fec().to_string().as_str(),
                active.to_string().as_str(),
            )?;
        }
        Ok::<_, ScenarioError>(())
    })
    .await?;
    Ok(())
}

async fn verify_fec_configuration_on_host(
    conns: &BTreeMap<FecMode, HostConnection>,
    conf: &FecConf,
) -> Result<(), ScenarioError> {
    for conn in conns.values() {
        let expected = conf
            .get(&conn.dut_port)
            .ok_or_else(|| ScenarioError::Failed(format!("{} is not configured", conn.dut_port)))?;
        verify_fec_configuration_on_host_port(conn, expected).await?;
    }
    Ok(())
}

async fn verify_all(
    dut: &SonicCli,
    hosts: &BTreeMap<FecMode, HostConnection>,
    lb_conf: &FecConf,
    host_conf: &FecConf,
) -> Result<(), ScenarioError> {
    info!("Verifying FEC on loopbacks");
    verify_fec_configuration(dut, lb_conf).await?;
    info!("Verifying FEC on host links");
    verify_fec_configuration(dut, host_conf).await?;
    verify_fec_configuration_on_host(hosts, host_conf).await
}

/// Every FEC mode over loopbacks of every split number and over host
/// links, passing traffic, across a restart. Teardown brings the base
/// configuration back.
async fn fec_capabilities(ctx: &mut Context) -> Result<(), ScenarioError> {
    let setup = FecSetup::discover(ctx, &FecTable::standard()).await?;
    let plain = [(FecMode::Rs, 1), (FecMode::Fc, 1), (FecMode::None, 1)];
    let lbs = tested_loopbacks(ctx.rng(), &setup, &plain, &FecMode::TESTED)?;
    let dut = ctx.dut().clone();

    info!("Configure FEC on loopbacks");
    let mut lb_conf = configure_fec(ctx, &setup, &lbs).await?;
    info!("Configure FEC on host links");
    let mut host_conf = configure_fec_on_host_links(ctx, &setup).await?;
    let checks = set_peer_port_ip_conf(ctx, &setup.hosts).await?;

    verify_all(&dut, &setup.hosts, &lb_conf, &host_conf).await?;
    validate_traffic(&checks).await?;

    let ports: Vec<String> = lb_conf.keys().chain(host_conf.keys()).cloned().collect();
    reboot_reload_random(ctx, &ports).await?;
    verify_all(&dut, &setup.hosts, &lb_conf, &host_conf).await?;
    validate_traffic(&checks).await?;

    info!("Restoring the base configuration");
    ctx.run_cleanup().await?;
    setup.base.restore(&mut lb_conf)?;
    setup.base.restore(&mut host_conf)?;
    verify_all(&dut, &setup.hosts, &lb_conf, &host_conf).await
}
scenario!(fec_capabilities, "Every FEC mode over loopbacks and host links, across a restart");

/// A host and a switch port with different FEC modes keep their link down,
/// the same mode brings it up.
async fn fec_negative(ctx: &mut Context) -> Result<(), ScenarioError> {
    let setup = FecSetup::discover(ctx, &FecTable::standard()).await?;
    let conn = host_connection(ctx, "ha", 1)
        .ok_or_else(|| ScenarioError::Skipped("the switch is not cabled to host ha".to_string()))?;
    let options = setup.host_speed_options(&conn).await?;
    let modes: Vec<FecMode> = options.keys().copied().collect();
    let host_mode = *modes
        .choose(ctx.rng())
        .ok_or_else(|| ScenarioError::Skipped(format!("{} runs no FEC mode", conn.dut_port)))?;
    let dut = ctx.dut().clone();
    configure_fec_mode_on_host_port(ctx, &setup.base, &conn, host_mode).await?;

    let mut conf = FecConf::new();
    for (mode, speeds) in options.iter().filter(|(mode, _)| **mode != host_mode) {
        info!("Configure mismatching FEC mode {mode} on {}", conn.dut_port);
        configure_fec_on_dut_host_port(ctx, &setup.base, &mut conf, &conn, *mode, speeds).await?;
        if let Some(port_conf) = conf.get_mut(&conn.dut_port) {
            port_conf.oper = PortState::Down;
        }
        verify_interfaces_status(&dut, &conf, 3, Duration::from_secs(5)).await?;
    }

    info!("Configure matching FEC mode {host_mode} on {}", conn.dut_port);
    let speeds = options.get(&host_mode).cloned().unwrap_or_default();
    configure_fec_on_dut_host_port(ctx, &setup.base, &mut conf, &conn, host_mode, &speeds).await?;
    verify_fec_configuration(&dut, &conf).await?;
    let expected = conf
        .get(&conn.dut_port)
        .ok_or_else(|| ScenarioError::Failed(format!("{} is not configured", conn.dut_port)))?;
    verify_fec_configuration_on_host_port(&conn, expected).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(fec_negative, "Mismatching FEC modes keep a host link down");

/// Split the ports of the loopbacks between those toggled after the
/// restart and those disabled across it. A mode with several loopbacks
/// gives its first one to the toggled ports and its second one to the
/// disabled ports; a single loopback goes to either at random.
fn ports_for_test_flow<R: Rng>(rng: &mut R, lbs: &FecLoopbacks) -> (Vec<String>, Vec<String>) {
    let (mut toggled, mut disabled) = (vec![], vec![]);
    for by_mode in lbs.values() {
        for lbs in by_mode.values() {
            match lbs.as_slice() {
                [] => {}
                [lb] => {
                    let ports = lb_ports(lb).map(String::from);
                    if rng.random_bool(0.5) {
                        toggled.extend(ports);
                    } else {
                        disabled.extend(ports);
                    }
                }
                [first, second, ..] => {
                    toggled.extend(lb_ports(first).map(String::from));
                    disabled.extend(lb_ports(second).map(String::from));
                }
            }
        }
    }
    (toggled, disabled)
}

fn push_startup(ctx: &mut Context, ports: &[String]) {
    let (starter, ports) = (ctx.dut().clone(), ports.to_vec());
    ctx.cleanup().push(format!("startup {ports:?}"), async move {
        for port in &ports {
            starter.startup(port).await?;
        }
        Ok::<_, CommandError>(())
    });
}

async fn disable_ports(ctx: &mut Context, ports: &[String]) -> Result<(), ScenarioError> {
    info!("Disable ports: {ports:?}");
    push_startup(ctx, ports);
    let dut = ctx.dut().clone();
    for port in ports {
        dut.shutdown(port).await?;
    }
    Ok(())
}

async fn toggle_ports(ctx: &mut Context, ports: &[String]) -> Result<(), ScenarioError> {
    info!("Toggle ports: {ports:?}");
    push_startup(ctx, ports);
    let dut = ctx.dut().clone();
    for port in ports {
        dut.shutdown(port).await?;
        dut.startup(port).await?;
    }
    Ok(())
}

async fn enable_ports(dut: &SonicCli, ports: &[String]) -> Result<(), ScenarioError> {
    info!("Enable ports: {ports:?}");
    for port in ports {
        dut.startup(port).await?;
    }
    Ok(())
}

/// Ports forced to a FEC mode come back up with it after a warm reboot,
/// whether they were toggled after the reboot or disabled across it.
async fn fec_warm_reboot_link_state(ctx: &mut Context) -> Result<(), ScenarioError> {
    let setup = FecSetup::discover(ctx, &FecTable::warm_reboot()).await?;
    let modes = [FecMode::Rs, FecMode::None];
    let lbs = tested_loopbacks(ctx.rng(), &setup, &[(FecMode::Rs, 2), (FecMode::None, 2)], &modes)?;
    let (toggled, disabled) = ports_for_test_flow(ctx.rng(), &lbs);
    info!("Ports disabled across the warm reboot: {disabled:?}");
    info!("Ports toggled after the warm reboot: {toggled:?}");
    let dut = ctx.dut().clone();

    let conf = configure_fec(ctx, &setup, &lbs).await?;
    verify_fec_configuration(&dut, &conf).await?;
    disable_ports(ctx, &disabled).await?;
    save_configuration(ctx).await?;
    dut.reboot(RebootKind::WarmReboot).await?;

    toggle_ports(ctx, &toggled).await?;
    enable_ports(&dut, &disabled).await?;
    let ports: Vec<String> = conf.keys().cloned().collect();
    wait_ports_up(&dut, &ports, 6, Duration::from_secs(10)).await?;
    verify_fec_configuration(&dut, &conf).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(fec_warm_reboot_link_state, "FEC links recover from toggles and disables around a warm reboot");

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

    async fn lab_setup(table: &FecTable) -> (test_utils::Lab, Context, FecSetup) {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 17).unwrap();
        let setup = FecSetup::discover(&mut ctx, table).await.unwrap();
        (lab, ctx, setup)
    }

    #[test]
    fn test_oper_fec() {
        assert_eq!(PortFecConf::up(g(100), FecMode::Auto).oper_fec(), FecMode::Rs);
        assert_eq!(PortFecConf::up(g(40), FecMode::Auto).oper_fec(), FecMode::None);
        assert_eq!(PortFecConf::up(g(10), FecMode::Fc).oper_fec(), FecMode::Fc);
    }

    #[tokio::test]
    async fn test_setup() {
        let (_lab, _ctx, setup) = lab_setup(&FecTable::standard()).await;
        assert_eq!(setup.plain.len(), 5);
        assert_eq!(setup.hosts.len(), 3);
        assert_eq!(setup.hosts[&FecMode::Rs].dut_port, "Ethernet56");
        assert_eq!(setup.base.get("Ethernet0").unwrap(), &PortFecConf::up(g(100), FecMode::None));
        assert!(setup.base.get("Ethernet1").is_err());

        assert_eq!(
            setup.speed_options(&["Ethernet40", "Ethernet44"], 4, FecMode::Rs),
            SpeedSet::from([g(25)])
        );
        assert_eq!(
            setup.speed_options(&["Ethernet32", "Ethernet36"], 2, FecMode::Fc),
            SpeedSet::from([g(10), g(25), g(50)])
        );
        let options = setup.host_speed_options(&setup.hosts[&FecMode::Fc]).await.unwrap();
        assert_eq!(options[&FecMode::Rs], SpeedSet::from([g(25), g(50), g(100)]));
    }

    #[tokio::test]
    async fn test_tested_loopbacks() {
        let (_lab, _ctx, setup) = lab_setup(&FecTable::standard()).await;
        let mut rng = StdRng::seed_from_u64(5);
        let plain = [(FecMode::Rs, 1), (FecMode::Fc, 1), (FecMode::None, 1)];
        let lbs = tested_loopbacks(&mut rng, &setup, &plain, &FecMode::TESTED).unwrap();
        let unsplit: Vec<&Loopback> = lbs[&1].values().flatten().collect();
        assert_eq!(unsplit.len(), 3);
        assert!(unsplit.iter().all(|lb| setup.plain.contains(*lb)));
        assert_ne!(unsplit[0], unsplit[1]);
        assert_eq!(lbs[&2].len(), 1);
        assert_eq!(lbs[&4].len(), 1);

        let err = tested_loopbacks(&mut rng, &setup, &[(FecMode::Rs, 6)], &[]).unwrap_err();
        assert!(err.is_skip());
    }

    #[tokio::test]
    async fn test_warm_reboot_loopbacks() {
        let (_lab, _ctx, setup) = lab_setup(&FecTable::warm_reboot()).await;
        let mut rng = StdRng::seed_from_u64(8);
        let modes = [FecMode::Rs, FecMode::None];
        let lbs = tested_loopbacks(&mut rng, &setup, &[(FecMode::Rs, 2), (FecMode::None, 2)], &modes).unwrap();
        assert_eq!(lbs[&1][&FecMode::Rs].len(), 2);
        assert_eq!(lbs[&1][&FecMode::None].len(), 2);
        // nothing but none runs at a split speed, and nothing at all split by 4
        assert_eq!(lbs[&2].keys().copied().collect::<Vec<_>>(), vec![FecMode::None]);
        assert!(!lbs.contains_key(&4));
    }

    #[test]
    fn test_ports_for_test_flow() {
        let lbs = FecLoopbacks::from([
            (
                1,
                BTreeMap::from([(
                    FecMode::Rs,
                    vec![lb("Ethernet0", "Ethernet4"), lb("Ethernet8", "Ethernet12")],
                )]),
            ),
            (2, BTreeMap::from([(FecMode::None, vec![lb("Ethernet32", "Ethernet36")])])),
        ]);
        let mut rng = StdRng::seed_from_u64(1);
        let (toggled, disabled) = ports_for_test_flow(&mut rng, &lbs);
        assert_eq!(toggled.len() + disabled.len(), 6);
        assert_eq!(&toggled[..2], ["Ethernet0", "Ethernet4"]);
        assert_eq!(&disabled[..2], ["Ethernet8", "Ethernet12"]);
        assert!(toggled.contains(&"Ethernet32".to_string()) != disabled.contains(&"Ethernet32".to_string()));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_fec_capabilities() {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 31).unwrap();
        fec_capabilities(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(logs_contain("FEC configuration of 3 port(s) verified"));
        assert!(logs_contain("Sending 3 packets from enp1s0f0 of hb to Ethernet56"));
        for port in ["Ethernet32", "Ethernet40", "Ethernet48", "Ethernet52", "Ethernet56"] {
            assert!(lab.oper_up("dut", port), "{port} is down");
        }
        let dut = ctx.dut().clone();
        assert_eq!(dut.fec_admin("Ethernet56").await.unwrap(), FecMode::None);
        assert_eq!(dut.speed("Ethernet32").await.unwrap(), g(50));
        let ips = dut.show_ip_interfaces().await.unwrap();
        for port in ["Ethernet48", "Ethernet52", "Ethernet56"] {
            assert!(ips.get(port).is_none_or(|a| a.is_empty()), "{port} kept an address");
        }
        let host = ctx.host("hb").unwrap().clone();
        let nic = host.ethtool("enp1s0f0").await.unwrap();
        assert_eq!(nic.autoneg, AutoNeg::Enabled);
        assert_eq!(nic.speed, Some(g(100)));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_fec_negative() {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 4).unwrap();
        fec_negative(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(logs_contain("Configure mismatching FEC mode"));
        assert!(logs_contain("FEC configuration of 1 port(s) verified"));
        assert!(lab.oper_up("dut", "Ethernet48"));
        let host = ctx.host("ha").unwrap().clone();
        assert_eq!(host.show_fec("enp1s0f0").await.unwrap(), FecMode::None);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_fec_warm_reboot_link_state() {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 9).unwrap();
        fec_warm_reboot_link_state(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(logs_contain("Ports disabled across the warm reboot"));
        assert!(logs_contain("FEC configuration of 10 port(s) verified"));
        let dut = ctx.dut().clone();
        for port in ["Ethernet0", "Ethernet4", "Ethernet32", "Ethernet36", "Ethernet64"] {
            assert!(lab.oper_up("dut", port), "{port} is down");
            assert_eq!(dut.fec_admin(port).await.unwrap(), FecMode::None);
        }
    }
}
