use std::{fs, path::Path};

use anyhow::{Context, Result};
use halite_fleet_core::Tuning;
use halite_fleet_world::Rules;
use serde::Deserialize;

/// Settings read from the optional TOML configuration file.
///
/// Both tables and every field inside them may be omitted.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default)]
pub(crate) struct Settings {
    /// Decision constants shared by every agent.
    pub(crate) tuning: Tuning,
    /// Rules of simulated episodes.
    pub(crate) rules: Rules,
}

impl Settings {
    /// Loads settings from `path`, or defaults when no path is given.
    pub(crate) fn load(path: Option<&Path>) -> Result<Self> {
        let Some(path) = path else {
            return Ok(Self::default());
        };
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration at {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse configuration at {}", path.display()))
    }

    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("invalid configuration toml")
    }
}
