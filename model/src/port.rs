// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Switch port names (`Ethernet52`)

use crate::errors::ModelError;

pub const PORT_PREFIX: &str = "Ethernet";

/// The numeric part of a switch port name.
pub fn port_number(name: &str) -> Result<u32, ModelError> {
    name.strip_prefix(PORT_PREFIX)
        .and_then(|n| n.parse::<u32>().ok())
        .ok_or_else(|| ModelError::InvalidPortName(name.to_string()))
}

#[must_use]
pub fn port_name(number: u32) -> String {
    format!("{PORT_PREFIX}{number}")
}

/// Whether a name designates a front panel port of the switch, as opposed to
/// a host interface, a VLAN or a port channel.
#[must_use]
pub fn is_switch_port(name: &str) -> bool {
    port_number(name).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_port_numbers() {
        assert_eq!(port_number("Ethernet52").unwrap(), 52);
        assert_eq!(port_name(4), "Ethernet4");
        assert!(port_number("EthernetX").is_err());
        assert!(port_number("enp131s0f1").is_err());
        assert!(!is_switch_port("PortChannel0001"));
    }
}
