// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Simulated devices for testing: a SONiC switch, Linux hosts and NVUE
//! devices cabled as a topology says, each reachable through an
//! [`engine::Engine`]. The devices answer the commands the command wrappers
//! issue, with the output and the errors of real devices, and compute the
//! state of every link from the configuration of both of its ends.

#![deny(
    unsafe_code,
    clippy::all,
    clippy::pedantic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic
)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::must_use_candidate)]

mod errors;
mod fixture;
mod host;
mod lab;
mod link;
mod nvue;
mod render;
mod reply;
mod switch;

pub use errors::SimError;
pub use fixture::{PLATFORM, STANDARD_TOPOLOGY, standard_lab, standard_switch};
pub use lab::{Lab, SimHost, SimNvue, SimSwitch};
pub use switch::{PhysicalSpec, SwitchSpec};

use tracectl::trace_target;
trace_target!("test-utils", LevelFilter::INFO, &["devices"]);

#[cfg(test)]
mod tests {
    use super::*;
    use engine::{Engine, EngineError};
    use parse::{parse_ethtool, parse_ping, parse_show_table};
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    #[tokio::test]
    #[traced_test]
    async fn test_loopback_link() {
        let lab = standard_lab().unwrap();
        let engines = lab.engines();
        let dut = &engines["dut"];
        assert_eq!(dut.name(), "sim-switch-01");
        assert!(lab.oper_up("dut", "Ethernet0"));

        dut.run_cmd("sudo config interface speed Ethernet0 50000").await.unwrap();
        assert!(!lab.oper_up("dut", "Ethernet0"));
        let status = dut.run_cmd("sudo show interfaces status").await.unwrap();
        let table = parse_show_table(&status, "Interface").unwrap();
        assert_eq!(table["Ethernet0"]["Oper"], "down");
        assert_eq!(table["Ethernet4"]["Speed"], "100G");

        dut.run_cmd("sudo config interface speed Ethernet4 50000").await.unwrap();
        assert!(lab.oper_up("dut", "Ethernet4"));
        let status = dut.run_cmd("sudo show interfaces status").await.unwrap();
        let table = parse_show_table(&status, "Interface").unwrap();
        assert_eq!(table["Ethernet0"]["Oper"], "up");
        assert_eq!(table["Ethernet0"]["Speed"], "50G");
    }

    #[tokio::test]
    #[traced_test]
    async fn test_split_loopback() {
        let lab = standard_lab().unwrap();
        assert!(lab.oper_up("dut", "Ethernet34"));
        assert!(lab.oper_up("dut", "Ethernet47"));
        let engines = lab.engines();
        let cmds = [
            "sudo config interface breakout Ethernet32 1x100G[50G,40G,25G,10G,1G] -y -f".to_string(),
            "y".to_string(),
        ];
        let out = engines["dut"].send_config_set(&cmds).await.unwrap();
        assert!(out.contains("Breakout process got successfully completed"));
        // the peer still runs two sub-ports
        assert!(!lab.oper_up("dut", "Ethernet32"));
        assert!(!lab.oper_up("dut", "Ethernet38"));

        let err = engines["dut"].send_config_set(&cmds[..1]).await.unwrap_err();
        assert!(err.output().unwrap().contains("Aborted!"));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_ping_and_reload() {
        let lab = standard_lab().unwrap();
        let engines = lab.engines();
        let dut = &engines["dut"];
        let ha = &engines["ha"];
        dut.run_cmd("sudo config interface ip add Ethernet48 30.30.30.1/24").await.unwrap();
        ha.run_cmd("sudo ip addr add 30.30.30.2/24 dev enp1s0f0").await.unwrap();
        let out = dut.run_cmd("ping -I Ethernet48 30.30.30.2 -c 3").await.unwrap();
        assert!(parse_ping(&out).unwrap().all_received());

        ha.run_cmd("sudo ip link set enp1s0f0 down").await.unwrap();
        let err = dut.run_cmd("ping -I Ethernet48 30.30.30.2 -c 3").await.unwrap_err();
        assert!(matches!(err, EngineError::Exit { status: 1, .. }));
        assert_eq!(parse_ping(err.output().unwrap()).unwrap().received, 0);

        // the address was never saved
        dut.reload(&["sudo config reload -y".to_string()], std::time::Duration::ZERO)
            .await
            .unwrap();
        let ips = dut.run_cmd("show ip interfaces").await.unwrap();
        assert!(!ips.contains("30.30.30.1"));
        assert!(logs_contain("back to the saved configuration"));
        assert!(dut.run_cmd("sudo frobnicate").await.is_err());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_host_autoneg() {
        let lab = standard_lab().unwrap();
        let engines = lab.engines();
        let dut = &engines["dut"];
        let hb = &engines["hb"];
        dut.run_cmd("sudo config interface autoneg Ethernet56 enabled").await.unwrap();
        dut.run_cmd("sudo config interface advertised-speeds Ethernet56 10000,25000")
            .await
            .unwrap();
        let info = parse_ethtool(&hb.run_cmd("ethtool enp1s0f0").await.unwrap()).unwrap();
        assert_eq!(info.speed, Some(model::Speed::from_gbps(25)));

        let autoneg = dut.run_cmd("sudo show interfaces autoneg status Ethernet56").await.unwrap();
        let table = parse_show_table(&autoneg, "Interface").unwrap();
        assert_eq!(table["Ethernet56"]["Type"], "CR");
        assert_eq!(table["Ethernet56"]["Adv Speeds"], "10G,25G");
        assert!(lab.history().iter().any(|(p, c)| p == "hb" && c == "ethtool enp1s0f0"));
    }

    #[tokio::test]
    async fn test_nvue_device() {
        let lab = standard_lab().unwrap();
        let engines = lab.engines();
        let nv = &engines["nv"];
        nv.run_cmd("nv set interface swp1 link mtu 9200").await.unwrap();
        nv.run_cmd("nv config apply -y").await.unwrap();
        let out = nv.run_cmd("nv show interface swp1 link --output json").await.unwrap();
        assert!(out.contains("9200"));
        assert!(nv.reload(&["sudo reboot".to_string()], std::time::Duration::ZERO).await.is_err());
    }
}
