// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

pub use clap::Parser;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "portcheck")]
#[command(version)]
#[command(about = "Port validation scenarios for SONiC switches", long_about = None)]
#[allow(clippy::struct_excessive_bools)]
pub struct CmdArgs {
    #[arg(
        long,
        value_name = "PATH",
        required_unless_present_any = ["simulate", "list_scenarios", "show_tracing_tags", "show_tracing_targets"],
        help = "YAML file describing the devices of the setup and their wiring"
    )]
    topology: Option<PathBuf>,

    #[arg(
        long,
        value_name = "NAME",
        value_delimiter = ',',
        help = "Scenario to run. May be repeated or comma-separated. All scenarios run when none is given"
    )]
    scenario: Vec<String>,

    #[arg(
        long,
        value_name = "N",
        help = "Seed of the random choices of the scenarios. A random seed is drawn and logged when absent"
    )]
    seed: Option<u64>,

    #[arg(
        long,
        default_value_t = false,
        help = "Run against simulated devices instead of the topology"
    )]
    simulate: bool,

    #[arg(long, default_value_t = false, help = "List the scenarios and exit")]
    list_scenarios: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Show the available tracing tags and exit"
    )]
    show_tracing_tags: bool,

    #[arg(
        long,
        default_value_t = false,
        help = "Show configurable tracing targets and exit"
    )]
    show_tracing_targets: bool,

    #[arg(
        long,
        value_name = "tracing configuration",
        help = "Tracing config string as comma-separated sequence of tag=level, with level one in [off,error,warn,info,debug,trace].
Passing default=level sets the default log-level.
Passing all=level allows setting the log-level of all targets to level.
E.g. default=error,all=info,devices=debug will set the default target to error, and all the registered targets to info, but enable debug for the device commands"
    )]
    tracing: Option<String>,
}

impl CmdArgs {
    pub fn topology(&self) -> Option<&Path> {
        self.topology.as_deref()
    }
    /// The scenarios asked for, empty meaning all of them.
    pub fn scenarios(&self) -> &[String] {
        &self.scenario
    }
    pub fn seed(&self) -> Option<u64> {
        self.seed
    }
    pub fn simulate(&self) -> bool {
        self.simulate
    }
    pub fn list_scenarios(&self) -> bool {
        self.list_scenarios
    }
    pub fn show_tracing_tags(&self) -> bool {
        self.show_tracing_tags
    }
    pub fn show_tracing_targets(&self) -> bool {
        self.show_tracing_targets
    }
    pub fn tracing(&self) -> Option<&String> {
        self.tracing.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_args() {
        let args = CmdArgs::try_parse_from([
            "portcheck",
            "--topology",
            "lab.yaml",
            "--scenario",
            "fec_negative,nvue_mtu",
            "--scenario",
            "dpb_conf",
            "--seed",
            "42",
        ])
        .unwrap();
        assert_eq!(args.topology(), Some(Path::new("lab.yaml")));
        assert_eq!(
            args.scenarios(),
            ["fec_negative", "nvue_mtu", "dpb_conf"]
        );
        assert_eq!(args.seed(), Some(42));
        assert!(!args.simulate());
        assert!(args.tracing().is_none());

        // simulated devices need no topology file
        let args = CmdArgs::try_parse_from(["portcheck", "--simulate"]).unwrap();
        assert!(args.simulate());
        assert!(args.topology().is_none());
        assert!(args.scenarios().is_empty());

        let args = CmdArgs::try_parse_from(["portcheck", "--list-scenarios"]).unwrap();
        assert!(args.list_scenarios());

        // nothing to run against
        assert!(CmdArgs::try_parse_from(["portcheck"]).is_err());
        assert!(CmdArgs::try_parse_from(["portcheck", "--simulate", "--seed", "x"]).is_err());
    }
}
