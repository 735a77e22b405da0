// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Display implementations

use crate::control::{TargetCfg, TargetCfgDb};
use std::fmt::{Display, Formatter};

macro_rules! TARGET_FMT {
    () => {
        "{:>44} │ {:>8} │ {}"
    };
}

fn fmt_heading(f: &mut Formatter<'_>, title: &str) -> std::fmt::Result {
    writeln!(f)?;
    writeln!(f, "{:^80}", format!("──────── {title} ────────"))
}

impl Display for TargetCfg {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let kind = if self.custom { " (custom)" } else { "" };
        write!(
            f,
            "{}{kind}",
            format_args!(TARGET_FMT!(), self.target, self.level, self.tags.join(","))
        )
    }
}

impl Display for TargetCfgDb {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        fmt_heading(f, "Tracing targets")?;
        writeln!(f, "{}", format_args!(TARGET_FMT!(), "TARGET", "LEVEL", "TAGS"))?;
        for target in self.targets.values() {
            writeln!(f, "{target}")?;
        }
        write!(
            f,
            "{}",
            format_args!(TARGET_FMT!(), "(default)", self.level, "--")
        )
    }
}

pub(crate) struct TargetCfgDbByTag<'a>(pub(crate) &'a TargetCfgDb);
impl Display for TargetCfgDbByTag<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let db = self.0;
        fmt_heading(f, "Tracing targets by tag")?;
        for tag in db.tags.values() {
            writeln!(f, " {}:", tag.tag)?;
            for target in db
                .targets
                .values()
                .filter(|target| tag.targets.contains(target.target))
            {
                write!(f, "      {:<44} : {}", target.target, target.level)?;
                let others: Vec<_> = target.tags.iter().filter(|t| **t != tag.tag).collect();
                if !others.is_empty() {
                    write!(f, " (also:")?;
                    for other in others {
                        write!(f, " {other}")?;
                    }
                    write!(f, ")")?;
                }
                writeln!(f)?;
            }
        }
        writeln!(f, " untagged:")?;
        for target in db.targets.values().filter(|t| t.tags.is_empty()) {
            writeln!(f, "      {:<44} : {}", target.target, target.level)?;
        }
        Ok(())
    }
}
