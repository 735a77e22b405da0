// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The setup most tests run against: a 3700-class switch with five plain
//! loopbacks, one loopback per split number, two hosts cabled twice each
//! and an NVUE device.

use crate::errors::SimError;
use crate::lab::Lab;
use crate::switch::{PhysicalSpec, SwitchSpec};
use ordermap::OrderMap;
use topology::{DUT, Topology};

pub const STANDARD_TOPOLOGY: &str = "
players:
  dut:
    kind: sonic
    connection:
      host: sim-switch-01
    chip_type: SPC3
    platform: x86_64-mlnx_msn3700-r0
    ports:
      dut-lb1-1: Ethernet0
      dut-lb1-2: Ethernet4
      dut-lb2-1: Ethernet8
      dut-lb2-2: Ethernet12
      dut-lb3-1: Ethernet16
      dut-lb3-2: Ethernet20
      dut-lb4-1: Ethernet24
      dut-lb4-2: Ethernet28
      dut-lb-splt2-p1-1: Ethernet32
      dut-lb-splt2-p2-1: Ethernet36
      dut-lb-splt4-p1-1: Ethernet40
      dut-lb-splt4-p2-1: Ethernet44
      dut-ha-1: Ethernet48
      dut-ha-2: Ethernet52
      dut-hb-1: Ethernet56
      dut-hb-2: Ethernet60
      dut-lb5-1: Ethernet64
      dut-lb5-2: Ethernet68
  ha:
    kind: linux
    connection:
      host: sim-host-a
      user: root
    ports:
      ha-dut-1: enp1s0f0
      ha-dut-2: enp1s0f1
  hb:
    kind: linux
    connection:
      host: sim-host-b
      user: root
    ports:
      hb-dut-1: enp1s0f0
      hb-dut-2: enp1s0f1
  nv:
    kind: nvue
    connection:
      host: sim-nvue-01
    ports:
      nv-swp1: swp1
      nv-swp2: swp2
interconnects:
  - [dut-lb1-1, dut-lb1-2]
  - [dut-lb2-1, dut-lb2-2]
  - [dut-lb3-1, dut-lb3-2]
  - [dut-lb4-1, dut-lb4-2]
  - [dut-lb-splt2-p1-1, dut-lb-splt2-p2-1]
  - [dut-lb-splt4-p1-1, dut-lb-splt4-p2-1]
  - [dut-ha-1, ha-dut-1]
  - [dut-ha-2, ha-dut-2]
  - [dut-hb-1, hb-dut-1]
  - [dut-hb-2, hb-dut-2]
  - [dut-lb5-1, dut-lb5-2]
";

pub const PLATFORM: &str = "x86_64-mlnx_msn3700-r0";

const FULL: &str = "1x100G[50G,40G,25G,10G,1G]";
const SPLIT2: &str = "2x50G[25G,10G,1G]";
const SPLIT4: &str = "4x25G[10G,1G]";

/// The switch of [`STANDARD_TOPOLOGY`]: ports up to Ethernet44 split, the
/// others do not.
pub fn standard_switch() -> Result<SwitchSpec, SimError> {
    let splittable = [FULL, SPLIT2, SPLIT4];
    let ports = (0..18u32)
        .map(|i| {
            let name = format!("Ethernet{}", i * 4);
            match i {
                0..=7 => PhysicalSpec::new(&name, &splittable, FULL),
                8 | 9 => PhysicalSpec::new(&name, &splittable, SPLIT2),
                10 | 11 => PhysicalSpec::new(&name, &splittable, SPLIT4),
                _ => PhysicalSpec::new(&name, &[FULL], FULL),
            }
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(SwitchSpec {
        platform: PLATFORM.to_string(),
        ports,
    })
}

pub fn standard_lab() -> Result<Lab, SimError> {
    let topology = Topology::from_yaml_str(STANDARD_TOPOLOGY)?;
    let switches = OrderMap::from([(DUT.to_string(), standard_switch()?)]);
    Lab::new(topology, &switches)
}
