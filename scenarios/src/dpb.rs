// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Dynamic port breakout: splitting ports into sub-ports, and back.
//!
//! Most scenarios work on one loopback per breakout mode, drawn at random
//! among the loopbacks whose two ports support the mode. Every breakout a
//! scenario applies is undone at teardown by applying the default mode of
//! the ports again, with force.

use crate::capabilities::{Loopback, alias_numbers, breakout_info, dut_platform, port_alias_number};
use crate::dependencies::{Dependency, remove_ips, set_dependencies, verify_no_dependencies};
use crate::errors::ScenarioError;
use crate::reboot::{reboot_reload_random, wait_ports_up};
use crate::registry::scenario;
use commands::SonicCli;
use commands::sonic::SHOW_INTERFACES_STATUS;
use harness::{Context, compare_actual_and_expected};
use model::breakout::{all_breakout_options, breakout_port_by_modes};
use model::{BreakoutMode, ModelError, PortBreakoutInfo, Speed, SpeedSet};
use ordermap::OrderMap;
use parse::verify_show_cmd;
use rand::seq::IndexedRandom;
use std::collections::BTreeMap;
use std::time::Duration;
use topology::Topology;
use tracing::{info, warn};

/// Ports to apply each breakout mode on.
pub type BreakoutConf = OrderMap<BreakoutMode, Vec<String>>;

const DEPENDENCIES_EXIST: &str = r"(?i)Dependecies\s+Exist\.\s+No\s+further\s+action\s+will\s+be\s+taken";

fn mode_unavailable(port: &str) -> String {
    format!(r"(?i)\[ERROR\]\s+Target\s+mode\s+.*is\s+not\s+available\s+for\s+the\s+port\s+{port}\b")
}

fn not_in_breakout_cfg(port: &str) -> String {
    format!(r"(?i)\[ERROR\] {port} interface is NOT present in BREAKOUT_CFG table of CONFIG DB")
}

fn info_of<'a>(
    infos: &'a OrderMap<String, PortBreakoutInfo>,
    port: &str,
) -> Result<&'a PortBreakoutInfo, ScenarioError> {
    infos
        .get(port)
        .ok_or_else(|| ModelError::UnknownPort(port.to_string()).into())
}

/// Modes every one of the ports supports, in the order of the first port.
pub fn mutual_breakout_modes<S: AsRef<str>>(
    infos: &OrderMap<String, PortBreakoutInfo>,
    ports: &[S],
) -> Result<Vec<BreakoutMode>, ScenarioError> {
    let Some((first, rest)) = ports.split_first() else {
        return Ok(vec![]);
    };
    let rest = rest
        .iter()
        .map(|p| info_of(infos, p.as_ref()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(info_of(infos, first.as_ref())?
        .breakout_modes
        .iter()
        .filter(|m| rest.iter().all(|info| info.supports(m)))
        .cloned()
        .collect())
}

fn loopbacks_of(ports: &[String]) -> impl Iterator<Item = Loopback> + '_ {
    ports
        .chunks_exact(2)
        .map(|pair| (pair[0].clone(), pair[1].clone()))
}

/// The loopbacks of a breakout configuration.
pub fn conf_loopbacks(conf: &BreakoutConf) -> Vec<Loopback> {
    conf.values().flat_map(|ports| loopbacks_of(ports)).collect()
}

fn conf_ports(conf: &BreakoutConf) -> Vec<String> {
    conf.values().flatten().cloned().collect()
}

/// Switch ports cabled to something, leaving out the loopbacks reserved for
/// split tests.
fn dut_ports(topology: &Topology) -> Vec<String> {
    topology
        .dut()
        .ports
        .iter()
        .filter(|(alias, _)| alias.starts_with("dut") && !alias.contains("splt"))
        .map(|(_, port)| port.clone())
        .collect()
}

/// One loopback per breakout mode, each loopback used once at most.
pub fn get_random_lb_breakout_conf(
    ctx: &mut Context,
    infos: &OrderMap<String, PortBreakoutInfo>,
) -> Result<BreakoutConf, ScenarioError> {
    let mut candidates: BTreeMap<BreakoutMode, Vec<Loopback>> = BTreeMap::new();
    for lb in ctx.topology().dut_loopbacks() {
        for mode in mutual_breakout_modes(infos, &[&lb.0, &lb.1])? {
            if mode.is_breakout() {
                candidates.entry(mode).or_default().push(lb.clone());
            }
        }
    }

    let mut conf = BreakoutConf::new();
    let mut used: Vec<Loopback> = vec![];
    for (mode, lbs) in &candidates {
        let unused: Vec<&Loopback> = lbs.iter().filter(|lb| !used.contains(lb)).collect();
        if let Some(lb) = unused.choose(ctx.rng()) {
            conf.insert(mode.clone(), vec![lb.0.clone(), lb.1.clone()]);
            used.push((*lb).clone());
        }
    }
    if conf.len() < candidates.len() {
        let missing: Vec<_> = candidates.keys().filter(|m| !conf.contains_key(*m)).collect();
        warn!("Not enough loopbacks to test breakout modes {missing:?}");
    }
    if conf.is_empty() {
        return Err(ScenarioError::Skipped("no loopback can be broken out".to_string()));
    }
    info!("Tested breakout configuration: {conf:?}");
    Ok(conf)
}

/// The default mode of each of the ports, which removes their breakout.
pub fn build_remove_dpb_conf<'a>(
    ports: impl IntoIterator<Item = &'a String>,
    infos: &OrderMap<String, PortBreakoutInfo>,
) -> Result<BreakoutConf, ScenarioError> {
    let mut conf = BreakoutConf::new();
    for port in ports {
        let mode = info_of(infos, port)?
            .default_breakout_mode
            .clone()
            .ok_or_else(|| ScenarioError::Failed(format!("{port} has no default breakout mode")))?;
        conf.entry(mode).or_default().push(port.clone());
    }
    Ok(conf)
}

/// Apply a breakout configuration and return the speed each resulting
/// sub-port is expected to run at. Restoring the default modes is
/// registered for teardown.
pub async fn set_dpb_conf(
    ctx: &mut Context,
    infos: &OrderMap<String, PortBreakoutInfo>,
    conf: &BreakoutConf,
    force: bool,
) -> Result<OrderMap<String, Speed>, ScenarioError> {
    let expected = breakout_port_by_modes(conf, infos)?;
    let remove = build_remove_dpb_conf(conf.values().flatten(), infos)?;
    let dut = ctx.dut().clone();
    let restorer = dut.clone();
    ctx.cleanup().push("remove breakout", async move {
        restorer.configure_dpb_on_ports(&remove, false, true).await.map(|_| ())
    });
    dut.configure_dpb_on_ports(conf, false, force).await?;
    Ok(expected)
}

/// Wait for the ports to come up and check their speed.
pub async fn verify_port_speed_and_status(
    dut: &SonicCli,
    expected: &OrderMap<String, Speed>,
) -> Result<(), ScenarioError> {
    let ports: Vec<String> = expected.keys().cloned().collect();
    wait_ports_up(dut, &ports, 2, Duration::from_secs(2)).await?;
    let actual = dut.speeds(&ports).await?;
    for (port, speed) in expected {
        let Some(actual) = actual.get(port) else {
            return Err(ScenarioError::mismatch(&format!("speed of {port}"), speed, "nothing"));
        };
        compare_actual_and_expected(&format!("speed of {port}"), speed, actual)?;
    }
    Ok(())
}

/// Check that the ports of `conf` are up and run none of the sub-ports the
/// breakout created.
pub async fn verify_no_breakout(
    dut: &SonicCli,
    infos: &OrderMap<String, PortBreakoutInfo>,
    conf: &BreakoutConf,
) -> Result<(), ScenarioError> {
    let mut sub_ports = vec![];
    for (mode, ports) in conf {
        for port in ports {
            sub_ports.extend(
                info_of(infos, port)?
                    .sub_ports(mode)?
                    .into_keys()
                    .filter(|p| p != port),
            );
        }
    }
    wait_ports_up(dut, &conf_ports(conf), 2, Duration::from_secs(2)).await?;
    let output = dut.engine().run_cmd(SHOW_INTERFACES_STATUS).await?;
    let patterns: Vec<String> = sub_ports.iter().map(|p| format!(r"\b{p}\s+")).collect();
    let expectations: Vec<(&str, bool)> = patterns.iter().map(|p| (p.as_str(), false)).collect();
    verify_show_cmd(&output, &expectations)?;
    Ok(())
}

/// Apply `mode` on `port` expecting the switch to refuse with an output
/// matching `pattern`.
async fn verify_breakout_refused(
    dut: &SonicCli,
    port: &str,
    mode: &BreakoutMode,
    force: bool,
    pattern: &str,
) -> Result<(), ScenarioError> {
    let conf = BreakoutConf::from([(mode.clone(), vec![port.to_string()])]);
    let output = dut.configure_dpb_on_ports(&conf, true, force).await?.join("\n");
    verify_show_cmd(&output, &[(pattern, true)])?;
    info!("Breakout of {port} to {mode} refused");
    Ok(())
}

/// Check that `mode` is not available on any of the ports and that their
/// speed did not change.
async fn verify_negative_breakout(
    dut: &SonicCli,
    ports: &[String],
    mode: &BreakoutMode,
) -> Result<(), ScenarioError> {
    let before = dut.speeds(ports).await?;
    for port in ports {
        verify_breakout_refused(dut, port, mode, false, &mode_unavailable(port)).await?;
    }
    let after = dut.speeds(ports).await?;
    for (port, speed) in &before {
        let actual = after.get(port).map_or_else(|| "nothing".to_string(), ToString::to_string);
        compare_actual_and_expected(&format!("speed of {port}"), &speed.to_string(), &actual)?;
    }
    Ok(())
}

/// Put an address on every port of the loopbacks, `10.0.0.{i}/24` with `i`
/// counting from 1. Removing them is registered for teardown.
pub async fn set_ip_conf_for_ping(
    ctx: &mut Context,
    lbs: &[Loopback],
) -> Result<OrderMap<String, String>, ScenarioError> {
    let ips: OrderMap<String, String> = lbs
        .iter()
        .flat_map(|(a, b)| [a.clone(), b.clone()])
        .zip(1..)
        .map(|(port, i)| (port, format!("10.0.0.{i}/24")))
        .collect();
    let dut = ctx.dut().clone();
    let pairs = ips.iter().map(|(p, ip)| (p.clone(), ip.clone())).collect();
    ctx.cleanup().push("remove ping addresses", remove_ips(dut.clone(), pairs));
    for (port, ip) in &ips {
        dut.add_ip(port, ip).await?;
    }
    Ok(ips)
}

/// Ping from the first port of each loopback to the address of the second.
pub async fn ping_loopbacks(
    dut: &SonicCli,
    lbs: &[Loopback],
    ips: &OrderMap<String, String>,
) -> Result<(), ScenarioError> {
    for (src, dst) in lbs {
        let dst_ip = ips
            .get(dst)
            .and_then(|ip| ip.split('/').next())
            .ok_or_else(|| ScenarioError::Failed(format!("{dst} has no address to ping")))?;
        info!("Sending 3 packets from {src} to {dst} ({dst_ip})");
        let stats = dut.ping(src, dst_ip, 3).await?;
        if !stats.all_received() {
            return Err(ScenarioError::mismatch(
                &format!("packets received from {src} by {dst}"),
                stats.transmitted,
                stats.received,
            ));
        }
    }
    Ok(())
}

pub async fn send_ping_and_verify(ctx: &mut Context, lbs: &[Loopback]) -> Result<(), ScenarioError> {
    let ips = set_ip_conf_for_ping(ctx, lbs).await?;
    let dut = ctx.dut().clone();
    ping_loopbacks(&dut, lbs, &ips).await
}

/// The switch and the breakout capabilities of its ports.
async fn discover(
    ctx: &mut Context,
) -> Result<(SonicCli, OrderMap<String, PortBreakoutInfo>), ScenarioError> {
    let dut = ctx.dut().clone();
    let platform = dut_platform(ctx.topology())?;
    let infos = breakout_info(&dut, &platform).await?;
    Ok((dut, infos))
}

/// Break out one loopback per mode, check the sub-ports and pass traffic.
async fn dpb_conf(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    let expected = set_dpb_conf(ctx, &infos, &conf, false).await?;
    verify_port_speed_and_status(&dut, &expected).await?;
    send_ping_and_verify(ctx, &conf_loopbacks(&conf)).await?;
    ctx.run_cleanup().await?;
    verify_no_breakout(&dut, &infos, &conf).await
}
scenario!(dpb_conf, "Break out loopbacks in every mode, check the sub-ports and ping");

/// Speeds both ports of a loopback can run in `mode`, as far as the cables
/// tell.
async fn mutual_speed_options(
    dut: &SonicCli,
    mode: &BreakoutMode,
    lb: &Loopback,
) -> Result<SpeedSet, ScenarioError> {
    let numbers = alias_numbers(dut).await?;
    let mut speeds = mode.speeds();
    for port in [&lb.0, &lb.1] {
        let cable = dut.mlxlink(port_alias_number(&numbers, port)?).await?.cable_speeds();
        speeds.retain(|s| cable.contains(s));
    }
    Ok(speeds)
}

/// Run each speed the sub-ports can run at after a breakout.
async fn dpb_speeds(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    for (mode, ports) in &conf {
        let single = BreakoutConf::from([(mode.clone(), ports.clone())]);
        let mut expected = set_dpb_conf(ctx, &infos, &single, false).await?;
        let lbs = conf_loopbacks(&single);
        let ips = set_ip_conf_for_ping(ctx, &lbs).await?;
        for lb in &lbs {
            for speed in mutual_speed_options(&dut, mode, lb).await? {
                info!("Running the sub-ports of {lb:?} at {speed}");
                for (port, expected_speed) in &mut expected {
                    dut.set_speed(port, speed).await?;
                    *expected_speed = speed;
                }
                verify_port_speed_and_status(&dut, &expected).await?;
                ping_loopbacks(&dut, &lbs, &ips).await?;
            }
        }
        ctx.run_cleanup().await?;
        wait_ports_up(&dut, ports, 3, Duration::from_secs(10)).await?;
    }
    Ok(())
}
scenario!(dpb_speeds, "Run every speed the sub-ports support after a breakout");

/// A port that cannot split refuses every breakout mode.
async fn dpb_unsplittable(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    let unsplittable: Vec<String> = dut_ports(ctx.topology())
        .into_iter()
        .filter(|p| infos.get(p).is_some_and(|i| !i.is_splittable()))
        .collect();
    let modes: Vec<&BreakoutMode> = conf.keys().collect();
    let (Some(mode), Some(port)) = (
        modes.choose(ctx.rng()).copied().cloned(),
        unsplittable.choose(ctx.rng()).cloned(),
    ) else {
        return Err(ScenarioError::Skipped("the setup has no unsplittable port".to_string()));
    };
    verify_negative_breakout(&dut, &[port], &mode).await
}
scenario!(dpb_unsplittable, "Breaking out a port that cannot split fails");

/// A loopback refuses a mode its ports do not support and keeps passing
/// traffic.
async fn dpb_unsupported_mode(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    let pairs: Vec<(&BreakoutMode, &Vec<String>)> = conf.iter().collect();
    let Some((_, ports)) = pairs.choose(ctx.rng()).copied() else {
        return Err(ScenarioError::Skipped("no loopback can be broken out".to_string()));
    };
    let supported = mutual_breakout_modes(&infos, ports)?;
    let unsupported: Vec<BreakoutMode> = all_breakout_options()
        .into_iter()
        .filter(|m| !supported.contains(m))
        .collect();
    let Some(mode) = unsupported.choose(ctx.rng()).cloned() else {
        return Err(ScenarioError::Skipped(format!("{ports:?} support every breakout mode")));
    };
    verify_negative_breakout(&dut, ports, &mode).await?;
    let lbs: Vec<Loopback> = loopbacks_of(ports).collect();
    send_ping_and_verify(ctx, &lbs).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(dpb_unsupported_mode, "Applying a mode the ports do not support fails");

/// Removing a breakout through a sub-port fails and leaves the sub-ports up.
async fn dpb_wrong_removal(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    let pairs: Vec<(&BreakoutMode, &Vec<String>)> = conf.iter().collect();
    let Some((mode, ports)) = pairs.choose(ctx.rng()).copied() else {
        return Err(ScenarioError::Skipped("no loopback can be broken out".to_string()));
    };
    let single = BreakoutConf::from([(mode.clone(), ports.clone())]);
    let expected = set_dpb_conf(ctx, &infos, &single, false).await?;
    verify_port_speed_and_status(&dut, &expected).await?;

    for port in ports {
        let info = info_of(&infos, port)?;
        let default = info
            .default_breakout_mode
            .clone()
            .ok_or_else(|| ScenarioError::Failed(format!("{port} has no default breakout mode")))?;
        let subs: Vec<String> = info.sub_ports(mode)?.into_keys().filter(|p| p != port).collect();
        let Some(sub) = subs.choose(ctx.rng()).cloned() else {
            return Err(ScenarioError::Failed(format!("{mode} creates no sub-port on {port}")));
        };
        verify_breakout_refused(&dut, &sub, &default, false, &not_in_breakout_cfg(&sub)).await?;
    }
    let sub_ports: Vec<String> = expected.keys().cloned().collect();
    wait_ports_up(&dut, &sub_ports, 2, Duration::from_secs(2)).await?;
    ctx.run_cleanup().await?;
    verify_no_breakout(&dut, &infos, &single).await
}
scenario!(dpb_wrong_removal, "Removing a breakout through a sub-port fails");

/// Split every splittable port in its largest split at once.
async fn dpb_all_ports(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let ports: Vec<String> = dut_ports(ctx.topology())
        .into_iter()
        .filter(|p| infos.get(p).is_some_and(PortBreakoutInfo::is_splittable))
        .collect();
    let mode = mutual_breakout_modes(&infos, &ports)?
        .into_iter()
        .filter(|m| m.is_breakout() && !m.is_mixed())
        .max_by_key(BreakoutMode::split_number)
        .ok_or_else(|| ScenarioError::Skipped("the splittable ports share no breakout mode".to_string()))?;
    info!("Breaking out {} port(s) to {mode}", ports.len());
    let conf = BreakoutConf::from([(mode, ports.clone())]);
    let expected = set_dpb_conf(ctx, &infos, &conf, false).await?;
    let sub_ports: Vec<String> = expected.keys().cloned().collect();
    wait_ports_up(&dut, &sub_ports, 3, Duration::from_secs(10)).await?;
    verify_port_speed_and_status(&dut, &expected).await?;
    ctx.run_cleanup().await?;
    wait_ports_up(&dut, &ports, 3, Duration::from_secs(10)).await
}
scenario!(dpb_all_ports, "Break out every splittable port in its largest split");

const ALL_DEPENDENCIES: [Dependency; 3] = [Dependency::PortChannel, Dependency::Vlan, Dependency::Ip];

/// Dependencies block a breakout unless forced, and forcing removes them.
async fn dpb_interop(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    let ports = conf_ports(&conf);
    let deps = set_dependencies(ctx, &ports, &ALL_DEPENDENCIES, true).await?;

    for (mode, ports) in &conf {
        for port in ports {
            verify_breakout_refused(&dut, port, mode, false, DEPENDENCIES_EXIST).await?;
        }
    }
    verify_no_breakout(&dut, &infos, &conf).await?;

    let expected = set_dpb_conf(ctx, &infos, &conf, true).await?;
    verify_port_speed_and_status(&dut, &expected).await?;
    verify_no_dependencies(&dut, &deps).await?;

    let sub_ports: Vec<String> = expected.keys().cloned().collect();
    reboot_reload_random(ctx, &sub_ports).await?;
    send_ping_and_verify(ctx, &conf_loopbacks(&conf)).await?;

    ctx.run_cleanup().await?;
    wait_ports_up(&dut, &ports, 3, Duration::from_secs(10)).await
}
scenario!(dpb_interop, "Breakout with VLAN, port channel and IP dependencies, across a restart");

/// Dependencies on sub-ports block removing the breakout unless forced.
async fn dpb_remove_interop(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (dut, infos) = discover(ctx).await?;
    let conf = get_random_lb_breakout_conf(ctx, &infos)?;
    let expected = set_dpb_conf(ctx, &infos, &conf, false).await?;
    let sub_ports: Vec<String> = expected.keys().cloned().collect();
    let deps = set_dependencies(ctx, &sub_ports, &ALL_DEPENDENCIES, true).await?;

    for (mode, ports) in &conf {
        for port in ports {
            let info = info_of(&infos, port)?;
            let default = info
                .default_breakout_mode
                .clone()
                .ok_or_else(|| ScenarioError::Failed(format!("{port} has no default breakout mode")))?;
            verify_breakout_refused(&dut, port, &default, false, DEPENDENCIES_EXIST).await?;
            let subs: Vec<String> = info.sub_ports(mode)?.into_keys().collect();
            dut.check_ports_status(&subs, commands::PortState::Up).await?;
        }
    }

    let remove = build_remove_dpb_conf(conf.values().flatten(), &infos)?;
    let restored = set_dpb_conf(ctx, &infos, &remove, true).await?;
    verify_no_breakout(&dut, &infos, &conf).await?;
    verify_port_speed_and_status(&dut, &restored).await?;
    verify_no_dependencies(&dut, &deps).await?;
    send_ping_and_verify(ctx, &conf_loopbacks(&conf)).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(dpb_remove_interop, "Removing a breakout with dependencies on the sub-ports");

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    fn mode(s: &str) -> BreakoutMode {
        s.parse().unwrap()
    }

    fn lab_context(seed: u64) -> (test_utils::Lab, Context) {
        let lab = test_utils::standard_lab().unwrap();
        let ctx = Context::new(lab.topology(), lab.engines(), seed).unwrap();
        (lab, ctx)
    }

    #[tokio::test]
    #[traced_test]
    async fn test_breakout_conf() {
        let (_lab, mut ctx) = lab_context(21);
        let (_, infos) = discover(&mut ctx).await.unwrap();

        let conf = get_random_lb_breakout_conf(&mut ctx, &infos).unwrap();
        assert_eq!(
            conf.keys().cloned().collect::<Vec<_>>(),
            vec![mode("2x50G[25G,10G,1G]"), mode("4x25G[10G,1G]")]
        );
        let lbs = conf_loopbacks(&conf);
        assert_eq!(lbs.len(), 2);
        assert_ne!(lbs[0], lbs[1]);

        let remove = build_remove_dpb_conf(conf.values().flatten(), &infos).unwrap();
        assert_eq!(remove.len(), 1);
        assert_eq!(remove[&mode("1x100G[50G,40G,25G,10G,1G]")].len(), 4);

        let modes = mutual_breakout_modes(&infos, &["Ethernet0", "Ethernet64"]).unwrap();
        assert_eq!(modes, vec![mode("1x100G[50G,40G,25G,10G,1G]")]);
        assert!(mutual_breakout_modes(&infos, &["Ethernet1"]).is_err());
        assert_eq!(dut_ports(ctx.topology()).len(), 14);
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_dpb_conf() {
        let (lab, mut ctx) = lab_context(1);
        dpb_conf(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert!(lab.oper_up("dut", "Ethernet0"));
        assert!(logs_contain("Tested breakout configuration"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_dpb_speeds() {
        let (_lab, mut ctx) = lab_context(2);
        dpb_speeds(&mut ctx).await.unwrap();
        assert!(logs_contain("at 1G"));
        assert!(ctx.cleanup().is_empty());
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_negative_breakouts() {
        let (_lab, mut ctx) = lab_context(3);
        dpb_unsplittable(&mut ctx).await.unwrap();
        dpb_unsupported_mode(&mut ctx).await.unwrap();
        dpb_wrong_removal(&mut ctx).await.unwrap();
        assert!(logs_contain("refused"));
        assert!(ctx.cleanup().is_empty());

        let dut = ctx.dut().clone();
        let err = verify_breakout_refused(
            &dut,
            "Ethernet0",
            &mode("1x100G[50G,40G,25G,10G,1G]"),
            false,
            DEPENDENCIES_EXIST,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, ScenarioError::Parse(_)));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_dpb_all_ports() {
        let (lab, mut ctx) = lab_context(4);
        dpb_all_ports(&mut ctx).await.unwrap();
        assert!(logs_contain("Breaking out 8 port(s) to 4x25G[10G,1G]"));
        assert!(lab.oper_up("dut", "Ethernet28"));
    }

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_dpb_interop() {
        let (_lab, mut ctx) = lab_context(5);
        let dut = ctx.dut().clone();
        dpb_interop(&mut ctx).await.unwrap();
        assert!(dut.show_portchannels().await.unwrap().is_empty());
        dpb_remove_interop(&mut ctx).await.unwrap();
        assert!(dut.show_portchannels().await.unwrap().is_empty());
        assert!(ctx.cleanup().is_empty());
    }
}
