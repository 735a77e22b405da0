// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Link-time registry of tracing targets across all linked crates

use crate::LevelFilter;
use linkme::distributed_slice;

/// A target as declared in the code, before it is loaded in the control.
/// `custom` targets are plain names rather than module paths, e.g. the raw
/// output of the devices.
pub struct TargetDecl {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: &'static [&'static str],
    pub(crate) custom: bool,
}

impl TargetDecl {
    pub const fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) -> Self {
        Self {
            target,
            name,
            level,
            tags,
            custom,
        }
    }
}

#[allow(unsafe_code)]
#[distributed_slice]
pub static TRACING_TARGETS: [TargetDecl];

#[macro_export]
macro_rules! trace_target_deps {
    () => {
        use linkme::distributed_slice;
        use $crate::LevelFilter;
        use $crate::targets::{TRACING_TARGETS, TargetDecl};
    };
}

/// Declare the tracing target of the calling module, its name, default level and tags.
///
/// The declaration lives in its own const scope, so the macro may be invoked
/// in several modules without the statics clashing.
#[macro_export]
macro_rules! trace_target {
    ($name:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[allow(unsafe_code)]
            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: TargetDecl =
                TargetDecl::new(module_path!(), $name, $level, $tags, false);
        };
    };
}

/// Declare a target that is not a module path, to be used with the `t*!` macros.
#[macro_export]
macro_rules! custom_target {
    ($target:expr, $level:expr, $tags:expr) => {
        const _: () = {
            use $crate::trace_target_deps;
            trace_target_deps!();

            #[allow(unsafe_code)]
            #[distributed_slice(TRACING_TARGETS)]
            static TRACE_TGT: TargetDecl = TargetDecl::new($target, $target, $level, $tags, true);
        };
    };
}

/// Log at trace level to a target declared with [`custom_target!`].
#[macro_export]
macro_rules! ttrace {
    ($target:expr, $($args:tt)*) => {
        tracing::trace!(target: $target, $($args)*)
    };
}
