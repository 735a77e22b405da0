// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Free text outputs: port aliases, ping statistics and pattern checks.

use crate::errors::ParseError;
use ordermap::OrderMap;
use regex::Regex;
use std::sync::LazyLock;

static ALIAS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(Ethernet\d+)\s*(etp\d+\w*)").unwrap_or_else(|_| unreachable!())
});
static ALIAS_NUMBER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"etp(\d+)").unwrap_or_else(|_| unreachable!()));
static PING_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(\d+) packets transmitted, (\d+) received").unwrap_or_else(|_| unreachable!())
});

/// Port name to front panel alias, from `show interfaces alias`.
#[must_use]
pub fn parse_ports_aliases(output: &str) -> OrderMap<String, String> {
    ALIAS_RE
        .captures_iter(output)
        .map(|c| (c[1].to_string(), c[2].to_string()))
        .collect()
}

/// The front panel number of an alias: `etp3b` is port 3.
#[must_use]
pub fn alias_number(alias: &str) -> Option<u32> {
    ALIAS_NUMBER_RE
        .captures(alias)
        .and_then(|c| c[1].parse::<u32>().ok())
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct PingStats {
    pub transmitted: u32,
    pub received: u32,
}

impl PingStats {
    #[must_use]
    pub fn all_received(&self) -> bool {
        self.transmitted > 0 && self.received == self.transmitted
    }
}

pub fn parse_ping(output: &str) -> Result<PingStats, ParseError> {
    let caps = PING_RE.captures(output).ok_or_else(|| ParseError::Malformed {
        what: "ping statistics",
        line: output.lines().next_back().unwrap_or_default().to_string(),
    })?;
    let number = |i: usize| {
        caps[i].parse::<u32>().map_err(|_| ParseError::Malformed {
            what: "ping statistics",
            line: caps[0].to_string(),
        })
    };
    Ok(PingStats {
        transmitted: number(1)?,
        received: number(2)?,
    })
}

/// Check that each pattern is present in (or absent from) the output, and
/// report the first expectation that does not hold.
pub fn verify_show_cmd(output: &str, expectations: &[(&str, bool)]) -> Result<(), ParseError> {
    for (pattern, present) in expectations {
        let re = Regex::new(pattern)?;
        if re.is_match(output) != *present {
            return Err(ParseError::Expectation {
                pattern: (*pattern).to_string(),
                present: *present,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_aliases() {
        let output = "  Name    Alias
---------  -------
Ethernet0    etp1
Ethernet2    etp1b
Ethernet4    etp2
";
        let aliases = parse_ports_aliases(output);
        assert_eq!(aliases.len(), 3);
        assert_eq!(aliases["Ethernet2"], "etp1b");
        assert_eq!(alias_number("etp1b"), Some(1));
        assert_eq!(alias_number("etp16"), Some(16));
        assert_eq!(alias_number("sfp"), None);
    }

    #[test]
    fn test_ping() {
        let ok = "PING 10.0.0.2 (10.0.0.2) from 10.0.0.1 Ethernet0: 56(84) bytes of data.

--- 10.0.0.2 ping statistics ---
3 packets transmitted, 3 received, 0% packet loss, time 2003ms
";
        assert!(parse_ping(ok).unwrap().all_received());
        let lost = "3 packets transmitted, 0 received, +3 errors, 100% packet loss, time 2040ms";
        assert_eq!(
            parse_ping(lost).unwrap(),
            PingStats {
                transmitted: 3,
                received: 0
            }
        );
        assert!(parse_ping("connect: Network is unreachable").is_err());
    }

    #[test]
    fn test_verify_show_cmd() {
        let output = "Vlan100  100  Ethernet0  untagged";
        assert!(verify_show_cmd(output, &[(r"Ethernet0\s+untagged", true), ("Ethernet4", false)]).is_ok());
        let err = verify_show_cmd(output, &[("Ethernet0", false)]).unwrap_err();
        assert_eq!(err.to_string(), "Expected pattern 'Ethernet0' to be absent");
        assert!(matches!(
            verify_show_cmd(output, &[("(", true)]),
            Err(ParseError::Pattern(_))
        ));
    }
}
