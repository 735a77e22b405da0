// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! The declarative `nv` command line of NVUE devices.

use crate::errors::CommandError;
use crate::exec::{config, show};
use engine::SharedEngine;
use parse::parse_nvue_json;
use serde_json::Value;
use std::fmt::{Debug, Formatter};
use strum::{Display, EnumString};

#[derive(Debug, Copy, Clone, Default, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub enum OutputFormat {
    #[default]
    Json,
    Yaml,
    Auto,
}

/// NVUE paths are given either as `interface/swp1/link` or with spaces;
/// the command line wants single spaces.
pub fn nvue_path(path: &str) -> String {
    path.replace('/', " ")
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Only the path has its slashes replaced; values such as addresses keep them.
fn command(verb: &str, path: &str, rest: &[&str]) -> String {
    std::iter::once(verb.to_string())
        .chain(std::iter::once(nvue_path(path)))
        .chain(rest.iter().map(|r| r.trim().to_string()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}

#[derive(Clone)]
pub struct NvueCli {
    engine: SharedEngine,
}

impl Debug for NvueCli {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NvueCli")
            .field("engine", &self.engine.name())
            .finish()
    }
}

impl NvueCli {
    pub fn new(engine: SharedEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &SharedEngine {
        &self.engine
    }

    /// `nv show {path} {params} --output {format}`
    pub async fn show(
        &self,
        path: &str,
        params: &str,
        format: OutputFormat,
    ) -> Result<String, CommandError> {
        let cmd = format!("{} --output {format}", command("nv show", path, &[params]));
        show(self.engine.as_ref(), &cmd).await
    }

    pub async fn show_json(&self, path: &str) -> Result<Value, CommandError> {
        let output = self.show(path, "", OutputFormat::Json).await?;
        Ok(parse_nvue_json(&output)?)
    }

    /// `nv set {path} {name} {value}`; takes effect on [`NvueCli::apply`].
    pub async fn set(&self, path: &str, name: &str, value: &str) -> Result<(), CommandError> {
        let cmd = command("nv set", path, &[name, value]);
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    pub async fn unset(&self, path: &str, params: &str) -> Result<(), CommandError> {
        let cmd = command("nv unset", path, &[params]);
        config(self.engine.as_ref(), &cmd).await?;
        Ok(())
    }

    /// `nv action {verb} {path} {params}`
    pub async fn action(&self, verb: &str, path: &str, params: &str) -> Result<String, CommandError> {
        let cmd = command(&format!("nv action {verb}"), path, &[params]);
        config(self.engine.as_ref(), &cmd).await
    }

    pub async fn apply(&self) -> Result<(), CommandError> {
        config(self.engine.as_ref(), "nv config apply -y").await?;
        Ok(())
    }

    /// Drop the pending configuration.
    pub async fn detach(&self) -> Result<(), CommandError> {
        config(self.engine.as_ref(), "nv config detach").await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::{Recorder, Reply};
    use pretty_assertions::assert_eq;

    #[test]
    fn test_nvue_path() {
        assert_eq!(nvue_path("interface/swp1/link"), "interface swp1 link");
        assert_eq!(nvue_path(" interface  swp1 /link "), "interface swp1 link");
        assert_eq!(
            command("nv set", "interface/swp1/link", &["mtu", "9200"]),
            "nv set interface swp1 link mtu 9200"
        );
        assert_eq!(
            command("nv unset", "interface/swp1/link/mtu", &[""]),
            "nv unset interface swp1 link mtu"
        );
        assert_eq!(
            command("nv set", "interface swp1 ip", &["address", "10.0.0.1/24"]),
            "nv set interface swp1 ip address 10.0.0.1/24"
        );
    }

    #[tokio::test]
    async fn test_staged_configuration() {
        let engine = Recorder::replying([
            ("nv show interface swp1 link", Reply::Prints("{\"mtu\": 9216, \"state\": {\"up\": {}}}\n")),
            ("nv set interface swp1 link mtu 256", Reply::Prints("Error: Valid range is 552-9216")),
            ("nv config apply", Reply::Prints("applied [rev_id: 2]")),
        ]);
        let nvue = NvueCli::new(engine.clone());

        let link = nvue.show_json("interface/swp1/link").await.unwrap();
        assert_eq!(link["mtu"], 9216);
        nvue.set("interface/swp1/link", "mtu", "9200").await.unwrap();
        nvue.apply().await.unwrap();
        let err = nvue.set("interface/swp1/link", "mtu", "256").await.unwrap_err();
        assert_eq!(err.output(), Some("Error: Valid range is 552-9216"));
        nvue.detach().await.unwrap();
        nvue.unset("interface/swp1/link", "mtu").await.unwrap();
        nvue.apply().await.unwrap();

        assert_eq!(
            engine.issued(),
            vec![
                "nv show interface swp1 link --output json",
                "nv set interface swp1 link mtu 9200",
                "nv config apply -y",
                "nv set interface swp1 link mtu 256",
                "nv config detach",
                "nv unset interface swp1 link mtu",
                "nv config apply -y",
            ]
        );
    }
}
