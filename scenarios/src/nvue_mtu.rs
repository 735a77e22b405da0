// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! MTU of the ports of NVUE devices. `nv set` stages a value that only
//! `nv config apply` commits.

use crate::errors::ScenarioError;
use crate::registry::scenario;
use commands::{CommandError, NvueCli};
use harness::{Context, compare_actual_and_expected, retry};
use model::Mtu;
use parse::nvue_u32;
use std::time::Duration;
use topology::PlayerKind;
use tracing::info;

const OUT_OF_RANGE: [u32; 2] = [256, 9218];
const JUMBO: u32 = 9200;

fn link_path(port: &str) -> String {
    format!("interface/{port}/link")
}

/// The applied MTU of a port.
pub async fn link_mtu(nvue: &NvueCli, port: &str) -> Result<u32, ScenarioError> {
    let link = nvue.show_json(&link_path(port)).await?;
    Ok(nvue_u32(&link, &["mtu"])?)
}

/// Wait for the applied MTU of `port` to be `expected`.
pub async fn verify_mtu(nvue: &NvueCli, port: &str, expected: u32) -> Result<(), ScenarioError> {
    let key = format!("MTU of {port}");
    let key = key.as_str();
    retry(key, 6, Duration::from_secs(5), || async move {
        let mtu = link_mtu(nvue, port).await?;
        compare_actual_and_expected(key, &expected, &mtu)?;
        Ok::<_, ScenarioError>(())
    })
    .await?;
    info!("{key} is {expected}");
    Ok(())
}

async fn verify_mtu_refused(nvue: &NvueCli, port: &str, value: u32) -> Result<(), ScenarioError> {
    let Err(e) = nvue.set(&link_path(port), "mtu", &value.to_string()).await else {
        return Err(ScenarioError::Failed(format!("MTU {value} was accepted on {port}")));
    };
    let Some(output) = e.output() else {
        return Err(e.into());
    };
    info!("MTU {value} refused on {port}: {}", output.trim());
    Ok(())
}

/// The first port of the first NVUE device of the topology, with the
/// device name.
fn nvue_port(ctx: &Context) -> Option<(String, NvueCli, String)> {
    ctx.topology()
        .players()
        .filter(|(_, player)| player.kind == PlayerKind::Nvue)
        .find_map(|(name, player)| {
            let port = player.ports.values().next()?;
            Some((name.to_string(), ctx.nvue(name)?.clone(), port.clone()))
        })
}

/// Put back the MTU a port had before the scenario.
async fn restore_mtu(nvue: NvueCli, port: String, origin: u32) -> Result<(), CommandError> {
    nvue.detach().await?;
    if origin == Mtu::DEFAULT_U32 {
        nvue.unset(&link_path(&port), "mtu").await?;
    } else {
        nvue.set(&link_path(&port), "mtu", &origin.to_string()).await?;
    }
    nvue.apply().await
}

/// The default MTU is 1500, values out of range are refused and a jumbo
/// MTU applies until unset.
async fn nvue_mtu(ctx: &mut Context) -> Result<(), ScenarioError> {
    let (device, nvue, port) =
        nvue_port(ctx).ok_or_else(|| ScenarioError::Skipped("no NVUE device in the topology".to_string()))?;
    let path = link_path(&port);
    let origin = link_mtu(&nvue, &port).await?;
    info!("MTU of {port} on {device} is {origin}");
    ctx.cleanup()
        .push(format!("restore the MTU of {port} on {device}"), restore_mtu(nvue.clone(), port.clone(), origin));

    nvue.unset(&path, "mtu").await?;
    nvue.apply().await?;
    verify_mtu(&nvue, &port, Mtu::DEFAULT_U32).await?;

    for value in OUT_OF_RANGE {
        verify_mtu_refused(&nvue, &port, value).await?;
    }
    nvue.detach().await?;

    nvue.set(&path, "mtu", &JUMBO.to_string()).await?;
    nvue.apply().await?;
    verify_mtu(&nvue, &port, JUMBO).await?;

    nvue.unset(&path, "mtu").await?;
    nvue.apply().await?;
    verify_mtu(&nvue, &port, Mtu::DEFAULT_U32).await?;
    ctx.run_cleanup().await?;
    Ok(())
}
scenario!(nvue_mtu, "MTU of an NVUE port: default, range and unset");

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[tokio::test(start_paused = true)]
    #[traced_test]
    async fn test_nvue_mtu() {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 2).unwrap();
        let (device, nvue, port) = nvue_port(&ctx).unwrap();
        assert_eq!((device.as_str(), port.as_str()), ("nv", "swp1"));

        nvue_mtu(&mut ctx).await.unwrap();
        assert!(ctx.cleanup().is_empty());
        assert_eq!(link_mtu(&nvue, "swp1").await.unwrap(), 1500);
        assert!(logs_contain("MTU 9218 refused on swp1"));
        assert!(logs_contain("MTU of swp1 is 9200"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_origin_restored() {
        let lab = test_utils::standard_lab().unwrap();
        let mut ctx = Context::new(lab.topology(), lab.engines(), 2).unwrap();
        let nvue = ctx.nvue("nv").unwrap().clone();
        nvue.set("interface/swp1/link", "mtu", "9000").await.unwrap();
        nvue.apply().await.unwrap();

        nvue_mtu(&mut ctx).await.unwrap();
        assert_eq!(link_mtu(&nvue, "swp1").await.unwrap(), 9000);
        let err = verify_mtu(&nvue, "swp1", 1500).await.unwrap_err();
        assert!(matches!(err, ScenarioError::Timeout { tries: 6, .. }));
    }
}
