//! Configuration for the emotive engine.
//!
//! Maps directly to `emotive.toml`. Every field has an embedded default so
//! the engine works with zero configuration; tables (opponent pairs, mood
//! weights, thresholds, conditions) are overrides layered on top of the
//! authored defaults and compiled once into an [`EngineTables`] snapshot.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::blend::MoodWeightTable;
use crate::context::ConditionTable;
use crate::emotion::{Emotion, TriggerCondition};
use crate::level::ThresholdTable;
use crate::mood::Mood;
use crate::opponent::OpponentTable;
use crate::persistence::SnapshotFormat;

/// Top-level engine configuration, loadable from TOML.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Core tuning knobs.
    #[serde(default)]
    pub engine: EngineTuning,
    /// Contagion channel limits.
    #[serde(default)]
    pub contagion: ContagionConfig,
    /// How host context signals are normalized.
    #[serde(default)]
    pub context: ContextConfig,
    /// Snapshot store settings.
    #[serde(default)]
    pub persistence: PersistenceConfig,
    /// Opponent pairs. `None` keeps the authored defaults; a list replaces them.
    #[serde(default)]
    pub opponents: Option<Vec<OpponentPairConfig>>,
    /// Per-emotion mood weight overrides, e.g. `[mood_weights.joy] happy = 0.9`.
    /// An empty table removes the mapping (the emotion then spreads uniformly).
    #[serde(default)]
    pub mood_weights: BTreeMap<String, BTreeMap<String, f32>>,
    /// Per-mood level thresholds, e.g. `happy = [0.3, 0.6, 0.85]`.
    #[serde(default)]
    pub thresholds: BTreeMap<String, [f32; 3]>,
    /// Per-emotion ongoing-condition overrides.
    #[serde(default)]
    pub conditions: BTreeMap<String, TriggerCondition>,
}

impl EngineConfig {
    /// Load configuration from a TOML string.
    ///
    /// # Errors
    /// Returns `EmotiveError::Config` if the TOML is invalid.
    pub fn from_toml(toml_str: &str) -> crate::error::Result<Self> {
        toml::from_str(toml_str).map_err(|e| crate::EmotiveError::Config(e.to_string()))
    }

    /// Load configuration from a TOML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml(&content)
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// Core tuning knobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineTuning {
    /// Minimum ticks between two full refreshes (unless dirty).
    #[serde(default = "default_20_u64")]
    pub refresh_interval_ticks: u64,
    /// Base fraction of the previous blend retained each refresh.
    #[serde(default = "default_0_35")]
    pub momentum: f32,
    /// Minimum lead a challenger needs to take over the dominant mood.
    #[serde(default = "default_0_06")]
    pub switch_margin: f32,
    /// Total weight at which mood strength saturates.
    #[serde(default = "default_3_0")]
    pub level_strength_scale: f32,
    /// Hard ceiling for any record's impact budget.
    #[serde(default = "default_12_0")]
    pub max_impact_budget: f32,
    /// Records at or under this intensity and impact are pruned.
    #[serde(default = "default_epsilon")]
    pub prune_epsilon: f32,
    /// Dominant-strength samples used to size the hysteresis band.
    #[serde(default = "default_10_usize")]
    pub strength_history: usize,
    /// Level snapshots kept for habituation drag.
    #[serde(default = "default_30_usize")]
    pub level_history: usize,
    /// Ticks between level snapshots when the level is unchanged.
    #[serde(default = "default_100_u64")]
    pub level_snapshot_interval_ticks: u64,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            refresh_interval_ticks: 20,
            momentum: 0.35,
            switch_margin: 0.06,
            level_strength_scale: 3.0,
            max_impact_budget: 12.0,
            prune_epsilon: 1e-3,
            strength_history: 10,
            level_history: 30,
            level_snapshot_interval_ticks: 100,
        }
    }
}

/// Contagion channel limits.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContagionConfig {
    /// Fraction of the impact cap a fully-bonded source may push.
    #[serde(default = "default_0_1")]
    pub impact_fraction: f32,
    /// Lower bound of the per-record contagion cap.
    #[serde(default = "default_0_05")]
    pub min_cap: f32,
    /// Upper bound of the per-record contagion cap.
    #[serde(default = "default_0_6")]
    pub max_cap: f32,
    /// Half-life of the contagion channel in ticks.
    #[serde(default = "default_400_u64")]
    pub half_life_ticks: u64,
}

impl Default for ContagionConfig {
    fn default() -> Self {
        Self {
            impact_fraction: 0.1,
            min_cap: 0.05,
            max_cap: 0.6,
            half_life_ticks: 400,
        }
    }
}

/// How host context signals are normalized.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Bond strength treated as "fully bonded".
    #[serde(default = "default_bond_full")]
    pub bond_full_strength: i64,
    /// Ticks a danger event keeps danger-class conditions ongoing.
    #[serde(default = "default_600_u64")]
    pub danger_window_ticks: u64,
    /// Ticks a care event keeps care-class conditions ongoing.
    #[serde(default = "default_1200_u64")]
    pub care_window_ticks: u64,
    /// Health fraction under which low-health conditions hold.
    #[serde(default = "default_0_35")]
    pub low_health_fraction: f32,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            bond_full_strength: 5_000,
            danger_window_ticks: 600,
            care_window_ticks: 1_200,
            low_health_fraction: 0.35,
        }
    }
}

/// Snapshot store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Use WAL mode for concurrent reads.
    #[serde(default = "default_true")]
    pub wal_mode: bool,
    /// Store and verify a checksum next to each blob.
    #[serde(default = "default_true")]
    pub checksum_enabled: bool,
    /// Blob encoding for new saves.
    #[serde(default)]
    pub format: SnapshotFormat,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            wal_mode: true,
            checksum_enabled: true,
            format: SnapshotFormat::default(),
        }
    }
}

/// One opponent pair as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpponentPairConfig {
    /// One side.
    pub a: String,
    /// The other side.
    pub b: String,
}

// ---------------------------------------------------------------------------
// Compiled tables
// ---------------------------------------------------------------------------

/// Lookup tables compiled from an [`EngineConfig`].
#[derive(Debug, Clone, PartialEq)]
pub struct EngineTables {
    /// Opponent pairs.
    pub opponents: OpponentTable,
    /// Emotion → mood spread.
    pub mood_weights: MoodWeightTable,
    /// Per-mood level thresholds.
    pub thresholds: ThresholdTable,
    /// Per-emotion triggering conditions.
    pub conditions: ConditionTable,
}

impl Default for EngineTables {
    fn default() -> Self {
        Self {
            opponents: OpponentTable::default(),
            mood_weights: MoodWeightTable::default(),
            thresholds: ThresholdTable::default(),
            conditions: ConditionTable::default(),
        }
    }
}

impl EngineTables {
    /// Layer the configured overrides on top of the authored defaults.
    ///
    /// Unknown emotion or mood names are skipped with a warning.
    #[must_use]
    pub fn from_config(config: &EngineConfig) -> Self {
        let mut tables = Self::default();

        if let Some(pairs) = &config.opponents {
            let parsed = pairs.iter().filter_map(|p| {
                match (p.a.parse::<Emotion>(), p.b.parse::<Emotion>()) {
                    (Ok(a), Ok(b)) if a != b => Some((a, b)),
                    _ => {
                        warn!(a = %p.a, b = %p.b, "Ignoring invalid opponent pair");
                        None
                    }
                }
            });
            tables.opponents = OpponentTable::new(parsed);
        }

        for (emotion_name, row) in &config.mood_weights {
            let Ok(emotion) = emotion_name.parse::<Emotion>() else {
                warn!(emotion = %emotion_name, "Ignoring mood weights for unknown emotion");
                continue;
            };
            let entries = row.iter().filter_map(|(mood_name, &w)| match mood_name.parse::<Mood>() {
                Ok(mood) => Some((mood, w)),
                Err(_) => {
                    warn!(emotion = %emotion, mood = %mood_name, "Ignoring unknown mood");
                    None
                }
            });
            tables.mood_weights.apply_override(emotion, entries);
        }

        for (mood_name, levels) in &config.thresholds {
            let Ok(mood) = mood_name.parse::<Mood>() else {
                warn!(mood = %mood_name, "Ignoring thresholds for unknown mood");
                continue;
            };
            if !tables.thresholds.set(mood, *levels) {
                warn!(mood = %mood, ?levels, "Ignoring non-ascending thresholds");
            }
        }

        for (emotion_name, condition) in &config.conditions {
            match emotion_name.parse::<Emotion>() {
                Ok(emotion) => tables.conditions.set(emotion, *condition),
                Err(_) => warn!(emotion = %emotion_name, "Ignoring condition for unknown emotion"),
            }
        }

        tables
    }
}

/// An immutable configuration snapshot tagged with a generation number.
///
/// Hosts share one snapshot (behind an `Arc`) across all engines and bump the
/// generation on reload; each engine adopts the new snapshot lazily.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigSnapshot {
    /// Monotonic generation; engines re-sync when it changes.
    pub generation: u64,
    /// Raw configuration.
    pub config: EngineConfig,
    /// Compiled lookup tables.
    pub tables: EngineTables,
}

impl ConfigSnapshot {
    /// Compile a configuration into a snapshot.
    #[must_use]
    pub fn new(config: EngineConfig, generation: u64) -> Self {
        let tables = EngineTables::from_config(&config);
        Self {
            generation,
            config,
            tables,
        }
    }
}

impl Default for ConfigSnapshot {
    fn default() -> Self {
        Self::new(EngineConfig::default(), 0)
    }
}

// ---------------------------------------------------------------------------
// Serde default helpers
// ---------------------------------------------------------------------------

fn default_true() -> bool { true }
fn default_epsilon() -> f32 { 1e-3 }
fn default_0_05() -> f32 { 0.05 }
fn default_0_06() -> f32 { 0.06 }
fn default_0_1() -> f32 { 0.1 }
fn default_0_35() -> f32 { 0.35 }
fn default_0_6() -> f32 { 0.6 }
fn default_3_0() -> f32 { 3.0 }
fn default_12_0() -> f32 { 12.0 }
fn default_10_usize() -> usize { 10 }
fn default_30_usize() -> usize { 30 }
fn default_20_u64() -> u64 { 20 }
fn default_100_u64() -> u64 { 100 }
fn default_400_u64() -> u64 { 400 }
fn default_600_u64() -> u64 { 600 }
fn default_1200_u64() -> u64 { 1_200 }
fn default_bond_full() -> i64 { 5_000 }
