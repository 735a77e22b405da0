// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Saving the configuration and restarting the switch.

use crate::errors::ScenarioError;
use commands::{PortState, RebootKind, SonicCli};
use harness::{Context, retry};
use rand::seq::IndexedRandom;
use std::time::Duration;
use topology::ChipType;
use tracing::info;

/// Ways of restarting a switch built on `chip`.
pub fn reboot_kinds(chip: Option<ChipType>) -> Vec<RebootKind> {
    let mut kinds = vec![
        RebootKind::Reload,
        RebootKind::WarmReboot,
        RebootKind::FastReboot,
        RebootKind::Reboot,
    ];
    if chip == Some(ChipType::Spc2) {
        kinds.retain(|k| *k != RebootKind::FastReboot);
    }
    kinds
}

/// Save the running configuration. A save is registered for teardown too,
/// so that what the other teardown actions restore survives the next
/// restart.
pub async fn save_configuration(ctx: &mut Context) -> Result<(), ScenarioError> {
    let dut = ctx.dut().clone();
    let saver = dut.clone();
    ctx.cleanup()
        .push("config save", async move { saver.save_config().await });
    dut.save_config().await?;
    Ok(())
}

/// Wait for ports to come up.
pub async fn wait_ports_up(
    dut: &SonicCli,
    ports: &[String],
    tries: u32,
    delay: Duration,
) -> Result<(), ScenarioError> {
    retry("ports up", tries, delay, || async move {
        dut.check_ports_status(ports, PortState::Up).await?;
        Ok::<_, ScenarioError>(())
    })
    .await?;
    Ok(())
}

/// Wait for ports to go down.
pub async fn wait_ports_down(
    dut: &SonicCli,
    ports: &[String],
    tries: u32,
    delay: Duration,
) -> Result<(), ScenarioError> {
    retry("ports down", tries, delay, || async move {
        dut.check_ports_status(ports, PortState::Down).await?;
        Ok::<_, ScenarioError>(())
    })
    .await?;
    Ok(())
}

/// Save the configuration, restart the switch a randomly chosen way and
/// wait for `ports` to come back up.
pub async fn reboot_reload_random(ctx: &mut Context, ports: &[String]) -> Result<RebootKind, ScenarioError> {
    let kinds = reboot_kinds(ctx.topology().dut().chip_type);
    let kind = *kinds
        .choose(ctx.rng())
        .ok_or_else(|| ScenarioError::Failed("no way to restart the switch".to_string()))?;
    info!("Restarting the switch with {kind}");
    save_configuration(ctx).await?;
    let dut = ctx.dut().clone();
    dut.reboot(kind).await?;
    wait_ports_up(&dut, ports, 8, Duration::from_secs(15)).await?;
    Ok(kind)
}
