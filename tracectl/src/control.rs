// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Tracing runtime control.

use ordermap::OrderMap;
use std::collections::BTreeSet;
use std::str::FromStr;
use std::sync::{Mutex, MutexGuard, OnceLock, PoisonError};
use tracing::{debug, info, warn};
use tracing_error::ErrorLayer;
use tracing_subscriber::{EnvFilter, Registry, filter::LevelFilter, prelude::*, reload};

use crate::display::TargetCfgDbByTag;
use crate::errors::TraceCtlError;
use crate::{targets::TRACING_TARGETS, trace_target};

trace_target!("tracectl", LevelFilter::INFO, &[]);

#[derive(Debug, Clone)]
pub struct TargetCfg {
    pub(crate) target: &'static str,
    pub(crate) name: &'static str,
    pub(crate) level: LevelFilter,
    pub(crate) tags: Vec<&'static str>,
    pub(crate) custom: bool,
}
impl TargetCfg {
    fn new(
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) -> Self {
        // a target can always be addressed by its name
        let mut tags = tags.to_vec();
        if !tags.contains(&name) {
            tags.push(name);
        }
        Self {
            target,
            name,
            level,
            tags,
            custom,
        }
    }
    pub fn target(&self) -> &'static str {
        self.target
    }
    pub fn level(&self) -> LevelFilter {
        self.level
    }
    pub fn is_custom(&self) -> bool {
        self.custom
    }
}

#[derive(Debug, Clone)]
pub struct Tag {
    pub(crate) tag: &'static str,
    pub(crate) targets: BTreeSet<&'static str>,
}
impl Tag {
    fn new(tag: &'static str, target: &'static str) -> Self {
        Self {
            tag,
            targets: BTreeSet::from([target]),
        }
    }
    pub fn name(&self) -> &'static str {
        self.tag
    }
}

#[derive(Debug)]
pub(crate) struct TargetCfgDb {
    pub(crate) level: LevelFilter,
    pub(crate) targets: OrderMap<&'static str, TargetCfg>,
    pub(crate) tags: OrderMap<&'static str, Tag>,
}

impl TargetCfgDb {
    fn new(level: LevelFilter) -> Self {
        let mut db = Self {
            level,
            targets: OrderMap::new(),
            tags: OrderMap::new(),
        };
        for decl in TRACING_TARGETS {
            db.register(decl.target, decl.name, decl.level, decl.tags, decl.custom);
        }
        db
    }
    fn register(
        &mut self,
        target: &'static str,
        name: &'static str,
        level: LevelFilter,
        tags: &'static [&'static str],
        custom: bool,
    ) {
        let tconfig = TargetCfg::new(target, name, level, tags, custom);
        let tags = tconfig.tags.clone();

        if let Some(exist) = self.targets.insert(target, tconfig) {
            warn!("Target {} has been multiply defined!", exist.target);
        }
        for tag in tags {
            self.tags
                .entry(tag)
                .and_modify(|t| {
                    t.targets.insert(target);
                })
                .or_insert_with(|| Tag::new(tag, target));
        }
    }
    fn env_filter(&self) -> EnvFilter {
        let mut filter = EnvFilter::new(self.level.to_string());
        for target in self.targets.values() {
            match format!("{}={}", target.target, target.level).parse() {
                Ok(directive) => filter = filter.add_directive(directive),
                Err(e) => warn!("Skipping target {}: {e}", target.target),
            }
        }
        filter
    }
    /// A config string that reproduces the current configuration. Targets are
    /// listed one by one, without grouping them by tag.
    pub(crate) fn as_config_string(&self) -> String {
        let mut out = format!("default={}", self.level);
        for target in self.targets.values() {
            out += &format!(",{}={}", target.name, target.level);
        }
        out
    }
    fn tag_targets_mut(&mut self, tag: &str) -> impl Iterator<Item = &mut TargetCfg> {
        let members = self.tags.get(tag).map(|t| t.targets.clone()).unwrap_or_default();
        self.targets
            .values_mut()
            .filter(move |target| members.contains(target.target))
    }
    fn tag_targets(&self, tag: &str) -> impl Iterator<Item = &TargetCfg> {
        let members = self.tags.get(tag).map(|t| &t.targets);
        self.targets
            .values()
            .filter(move |target| members.is_some_and(|m| m.contains(target.target)))
    }
}

#[derive(Debug)]
pub struct TracingControl {
    db: Mutex<TargetCfgDb>,
    reload_filter: reload::Handle<EnvFilter, Registry>,
}
impl TracingControl {
    fn new() -> Self {
        let db = TargetCfgDb::new(LevelFilter::INFO);
        let (filter, reload_filter) = reload::Layer::new(db.env_filter());

        let fmt_layer = tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_level(true)
            .with_thread_names(false)
            .with_line_number(false);

        // Tests may have installed their own subscriber already. The control
        // still works on its own database in that case.
        if let Err(e) = tracing_subscriber::registry()
            .with(filter)
            .with(fmt_layer)
            .with(ErrorLayer::default())
            .try_init()
        {
            debug!("Tracing subscriber not installed: {e}");
        }

        Self {
            db: Mutex::new(db),
            reload_filter,
        }
    }
    fn lock(&self) -> MutexGuard<'_, TargetCfgDb> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
    fn reload(&self, db: &TargetCfgDb) {
        if let Err(e) = self.reload_filter.reload(db.env_filter()) {
            debug!("Failed to reload tracing filter: {e}");
        }
    }
}

static TRACING_CTL: OnceLock<TracingControl> = OnceLock::new();

/// Get a reference to the static [`TracingControl`], initializing it if needed
pub fn get_trace_ctl() -> &'static TracingControl {
    TRACING_CTL.get_or_init(TracingControl::new)
}

// public methods for TracingControl
impl TracingControl {
    pub fn init() {
        get_trace_ctl();
    }

    /// Initialize tracing and install the `color-eyre` panic and error report
    /// hooks, which capture span traces through the error layer.
    pub fn init_with_reports() -> Result<&'static TracingControl, TraceCtlError> {
        let tctl = get_trace_ctl();
        color_eyre::install().map_err(|e| TraceCtlError::ReportHooks(e.to_string()))?;
        Ok(tctl)
    }

    /// Set the level of all the targets with the given tag and return how many changed.
    pub fn set_tag_level(&self, tag: &str, level: LevelFilter) -> Result<usize, TraceCtlError> {
        let mut db = self.lock();
        if !db.tags.contains_key(tag) {
            return Err(TraceCtlError::UnknownTag(tag.to_string()));
        }
        let mut changed = 0;
        for target in db.tag_targets_mut(tag) {
            if target.level != level {
                target.level = level;
                changed += 1;
            }
        }
        if changed > 0 {
            self.reload(&db);
        }
        info!("Changed log level for tag '{tag}' to {level}. Targets changed: {changed}");
        Ok(changed)
    }
    pub fn set_level_all(&self, level: LevelFilter) {
        let mut db = self.lock();
        for target in db.targets.values_mut() {
            target.level = level;
        }
        self.reload(&db);
    }
    pub fn set_default_level(&self, level: LevelFilter) {
        let mut db = self.lock();
        if db.level != level {
            db.level = level;
            info!("Set default log level to {level}");
            self.reload(&db);
        }
    }
    pub fn default_level(&self) -> LevelFilter {
        self.lock().level
    }

    /// Parse comma-separated `tag=level` items, where level is one of
    /// off, error, warn, info, debug or trace.
    fn parse_tracing_config(input: &str) -> Result<OrderMap<String, LevelFilter>, TraceCtlError> {
        let mut result = OrderMap::new();
        for item in input.split(',').map(str::trim).filter(|i| !i.is_empty()) {
            let (tag, level) = item
                .split_once('=')
                .ok_or_else(|| TraceCtlError::InvalidSyntax(item.to_string()))?;
            let (tag, level) = (tag.trim(), level.trim());
            let level = LevelFilter::from_str(level).map_err(|_| TraceCtlError::InvalidLevel {
                tag: tag.to_string(),
                level: level.to_string(),
            })?;
            result.insert(tag.to_string(), level);
        }
        Ok(result)
    }

    /// Apply a configuration such as `default=error,all=info,engine=debug`.
    /// `default` and `all` are applied first so that tags may override them.
    pub fn setup_from_string(&self, input: &str) -> Result<(), TraceCtlError> {
        let config = Self::parse_tracing_config(input)?;
        if let Some(level) = config.get("default") {
            self.set_default_level(*level);
        }
        if let Some(level) = config.get("all") {
            self.set_level_all(*level);
        }
        for (tag, level) in config.iter().filter(|(t, _)| *t != "default" && *t != "all") {
            self.set_tag_level(tag, *level)?;
        }
        Ok(())
    }

    pub fn tags(&self) -> Vec<Tag> {
        self.lock().tags.values().cloned().collect()
    }
    pub fn tag(&self, tag: &str) -> Option<Tag> {
        self.lock().tags.get(tag).cloned()
    }
    pub fn target(&self, target: &str) -> Option<TargetCfg> {
        self.lock().targets.get(target).cloned()
    }
    pub fn targets(&self) -> Vec<TargetCfg> {
        self.lock().targets.values().cloned().collect()
    }
    pub fn targets_by_tag(&self, tag: &str) -> Vec<TargetCfg> {
        self.lock().tag_targets(tag).cloned().collect()
    }
    /// The table of targets, as printed by `dump`.
    pub fn targets_report(&self) -> String {
        self.lock().to_string()
    }
    /// The targets grouped by tag, as printed by `dump_targets_by_tag`.
    pub fn tags_report(&self) -> String {
        TargetCfgDbByTag(&self.lock()).to_string()
    }
    pub fn dump_targets_by_tag(&self) {
        info!("{}", self.tags_report());
    }
    pub fn dump(&self) {
        info!("{}", self.targets_report());
    }
    pub fn as_config_string(&self) -> String {
        self.lock().as_config_string()
    }
}

#[cfg(test)]
mod tests {
    use crate::control::{TracingControl, get_trace_ctl};
    use crate::errors::TraceCtlError;
    use crate::targets::TRACING_TARGETS;
    use crate::{LevelFilter, custom_target, trace_target, ttrace};
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_init() {
        TracingControl::init();
        let tctl = get_trace_ctl();
        assert!(tctl.target("portcheck_tracectl::control").is_some());
        assert!(tctl.as_config_string().starts_with("default="));
    }

    #[test]
    #[serial]
    fn test_registered_at_link_time() {
        custom_target!("device-a", LevelFilter::ERROR, &["devices"]);
        custom_target!("device-b", LevelFilter::WARN, &["devices"]);

        let declared: Vec<&str> = TRACING_TARGETS.iter().map(|c| c.target).collect();
        assert!(declared.contains(&"device-a"));
        assert!(declared.contains(&"device-c")); // declared below

        let tctl = get_trace_ctl();
        let mut members: Vec<_> = tctl
            .targets_by_tag("devices")
            .iter()
            .map(|t| t.target())
            .collect();
        members.sort_unstable();
        assert_eq!(members, vec!["device-a", "device-b", "device-c"]);

        custom_target!("device-c", LevelFilter::OFF, &["devices"]);
    }

    #[test]
    #[serial]
    fn test_change_tag_level() {
        const TAG: &str = "links";
        custom_target!("link-a", LevelFilter::DEBUG, &[TAG]);
        custom_target!("link-b", LevelFilter::ERROR, &[TAG]);

        let tctl = get_trace_ctl();
        assert_eq!(tctl.target("link-a").map(|t| t.level()), Some(LevelFilter::DEBUG));
        assert_eq!(tctl.set_tag_level(TAG, LevelFilter::OFF), Ok(2));
        assert_eq!(tctl.set_tag_level(TAG, LevelFilter::OFF), Ok(0));
        for target in tctl.targets_by_tag(TAG) {
            assert_eq!(target.level(), LevelFilter::OFF);
        }
        assert_eq!(
            tctl.set_tag_level("no-such-tag", LevelFilter::OFF),
            Err(TraceCtlError::UnknownTag("no-such-tag".to_string()))
        );
    }

    #[test]
    #[serial]
    fn test_setup_from_string() {
        custom_target!("probe", LevelFilter::TRACE, &["probes"]);
        custom_target!("probe-2", LevelFilter::TRACE, &["probes"]);
        let tctl = get_trace_ctl();

        tctl.setup_from_string("default=warn, all=info, probes=error, probe-2=debug")
            .unwrap();
        assert_eq!(tctl.default_level(), LevelFilter::WARN);
        assert_eq!(tctl.target("probe").unwrap().level(), LevelFilter::ERROR);
        assert_eq!(tctl.target("probe-2").unwrap().level(), LevelFilter::DEBUG);
        assert_eq!(
            tctl.target("portcheck_tracectl::control").unwrap().level(),
            LevelFilter::INFO
        );
        ttrace!("probe", "probe level is now {}", LevelFilter::ERROR);

        assert!(matches!(
            tctl.setup_from_string("probes=loud"),
            Err(TraceCtlError::InvalidLevel { .. })
        ));
        assert!(matches!(
            tctl.setup_from_string("probes=error, probe"),
            Err(TraceCtlError::InvalidSyntax(_))
        ));
        tctl.set_default_level(LevelFilter::INFO);
    }

    #[test]
    #[serial]
    fn test_reports() {
        trace_target!("reports", LevelFilter::INFO, &["report-tag"]);
        let tctl = get_trace_ctl();
        let targets = tctl.targets_report();
        assert!(targets.contains("(default)"));
        assert!(targets.contains("portcheck_tracectl::control"));
        let tags = tctl.tags_report();
        assert!(tags.contains(" report-tag:"));
        assert!(tags.contains(" untagged:"));
    }
}
