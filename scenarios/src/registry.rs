// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of the scenarios of all modules.

use crate::errors::ScenarioError;
use futures::future::BoxFuture;
use harness::Context;
use linkme::distributed_slice;

pub type ScenarioFn = for<'a> fn(&'a mut Context) -> BoxFuture<'a, Result<(), ScenarioError>>;

/// A scenario as declared next to its implementation.
pub struct ScenarioDecl {
    pub name: &'static str,
    pub about: &'static str,
    pub run: ScenarioFn,
}

impl std::fmt::Debug for ScenarioDecl {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScenarioDecl")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[allow(unsafe_code)]
#[distributed_slice]
pub static SCENARIOS: [ScenarioDecl];

/// Register an `async fn(&mut Context) -> Result<(), ScenarioError>` under
/// its own name.
macro_rules! scenario {
    ($func:ident, $about:expr) => {
        const _: () = {
            use linkme::distributed_slice;
            use $crate::registry::{SCENARIOS, ScenarioDecl};

            #[allow(unsafe_code)]
            #[distributed_slice(SCENARIOS)]
            static SCENARIO: ScenarioDecl = ScenarioDecl {
                name: stringify!($func),
                about: $about,
                run: |ctx| Box::pin($func(ctx)),
            };
        };
    };
}
pub(crate) use scenario;

/// Every registered scenario, sorted by name.
pub fn all() -> Vec<&'static ScenarioDecl> {
    let mut all: Vec<_> = SCENARIOS.iter().collect();
    all.sort_by_key(|s| s.name);
    all
}

pub fn find(name: &str) -> Option<&'static ScenarioDecl> {
    SCENARIOS.iter().find(|s| s.name == name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry() {
        let names: Vec<&str> = all().iter().map(|s| s.name).collect();
        for name in [
            "dpb_conf",
            "dpb_speeds",
            "dpb_unsplittable",
            "dpb_unsupported_mode",
            "dpb_wrong_removal",
            "dpb_all_ports",
            "dpb_interop",
            "dpb_remove_interop",
            "autoneg_conf",
            "autoneg_toggle_peer",
            "autoneg_negative",
            "autoneg_auto_fec",
            "fec_capabilities",
            "fec_negative",
            "fec_warm_reboot_link_state",
            "nvue_mtu",
        ] {
            assert!(names.contains(&name), "{name} is not registered");
        }
        assert_eq!(names.len(), 16);
        assert!(names.windows(2).all(|w| w[0] < w[1]));
        assert!(find("nvue_mtu").is_some_and(|s| !s.about.is_empty()));
        assert!(find("dpb").is_none());
    }
}
