//! Host-side configuration.
//!
//! [`HostConfig`] embeds the engine's [`EngineConfig`] (same TOML tables) and
//! adds a `[host]` table of scheduling limits. [`ConfigSource`] owns the
//! shared [`ConfigSnapshot`] and bumps its generation on every reload; engines
//! pick the new snapshot up lazily on their next refresh.

use std::path::Path;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use emotive_core::error::Result;
use emotive_core::{ConfigSnapshot, EmotiveError, EngineConfig};

/// Full host configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HostConfig {
    /// Scheduling limits.
    #[serde(default)]
    pub host: HostTuning,
    /// Engine configuration (flattened: `[engine]`, `[contagion]`, …).
    #[serde(flatten)]
    pub engine: EngineConfig,
}

impl HostConfig {
    /// Parse from a TOML string.
    ///
    /// # Errors
    /// Returns `EmotiveError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> Result<Self> {
        toml::from_str(toml_str).map_err(|e| EmotiveError::Config(e.to_string()))
    }

    /// Load from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

/// Scheduling limits for the host systems.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HostTuning {
    /// Most engines refreshed in one tick; the rest roll over.
    #[serde(default = "default_max_refreshes")]
    pub max_refreshes_per_tick: usize,
    /// Budget for one refresh pass over all due entities (microseconds).
    #[serde(default = "default_refresh_budget")]
    pub refresh_budget_us: f64,
    /// Ticks between contagion spreads.
    #[serde(default = "default_contagion_interval")]
    pub contagion_interval_ticks: u64,
    /// Share of the source's dominant weight passed along a link.
    #[serde(default = "default_contagion_fraction")]
    pub contagion_fraction: f32,
}

fn default_max_refreshes() -> usize {
    64
}
fn default_refresh_budget() -> f64 {
    500.0
}
fn default_contagion_interval() -> u64 {
    20
}
fn default_contagion_fraction() -> f32 {
    0.1
}

impl Default for HostTuning {
    fn default() -> Self {
        Self {
            max_refreshes_per_tick: default_max_refreshes(),
            refresh_budget_us: default_refresh_budget(),
            contagion_interval_ticks: default_contagion_interval(),
            contagion_fraction: default_contagion_fraction(),
        }
    }
}

/// Owner of the live config snapshot.
#[derive(Debug, Clone)]
pub struct ConfigSource {
    current: Arc<ConfigSnapshot>,
}

impl ConfigSource {
    /// Start at generation 0.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            current: Arc::new(ConfigSnapshot::new(config, 0)),
        }
    }

    /// Shared handle to the current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<ConfigSnapshot> {
        Arc::clone(&self.current)
    }

    /// Current generation.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.current.generation
    }

    /// Install a new config under the next generation.
    pub fn reload(&mut self, config: EngineConfig) -> u64 {
        let generation = self.current.generation + 1;
        self.current = Arc::new(ConfigSnapshot::new(config, generation));
        info!(generation, "Engine config reloaded");
        generation
    }

    /// Reload from a TOML file holding a [`HostConfig`]; only the engine part
    /// is applied.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed. The current
    /// snapshot is kept in that case.
    pub fn reload_from_file(&mut self, path: &Path) -> Result<u64> {
        let config = HostConfig::from_file(path)?;
        Ok(self.reload(config.engine))
    }
}

impl Default for ConfigSource {
    fn default() -> Self {
        Self::new(EngineConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn host_and_engine_tables_share_one_file() {
        let config = HostConfig::from_toml(
            r"
            [host]
            max_refreshes_per_tick = 8

            [engine]
            refresh_interval_ticks = 10
            ",
        )
        .expect("parse");
        assert_eq!(config.host.max_refreshes_per_tick, 8);
        assert!((config.host.contagion_fraction - 0.1).abs() < f32::EPSILON);
        assert_eq!(config.engine.engine.refresh_interval_ticks, 10);
    }

    #[test]
    fn empty_file_gives_defaults() {
        let config = HostConfig::from_toml("").expect("parse");
        assert_eq!(config, HostConfig::default());
    }

    #[test]
    fn invalid_toml_is_config_error() {
        assert!(matches!(
            HostConfig::from_toml("[host\nbroken"),
            Err(EmotiveError::Config(_))
        ));
    }

    #[test]
    fn reload_bumps_generation() {
        let mut source = ConfigSource::default();
        let before = source.snapshot();
        assert_eq!(source.reload(EngineConfig::default()), 1);
        assert_eq!(source.generation(), 1);
        assert_eq!(before.generation, 0);
    }

    #[test]
    fn failed_file_reload_keeps_snapshot() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("broken.toml");
        std::fs::write(&path, "not = [valid").expect("write");
        let mut source = ConfigSource::default();
        assert!(source.reload_from_file(&path).is_err());
        assert_eq!(source.generation(), 0);
    }
}
