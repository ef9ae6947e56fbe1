//! Engine state persistence — opaque snapshots and an SQLite store.
//!
//! [`EngineState`] captures every record field, the blend vector and the
//! level state (including both history rings). Every field is defaulted, so
//! partial or older saves still load. Three codecs are available:
//!
//! - structured (`serde_json::Value`) for hosts with their own save format
//! - MessagePack (`rmp-serde`, named fields) — the default blob format
//! - `bincode` for compact fixed-layout blobs
//!
//! [`StateStore`] keeps one blob per entity:
//!
//! ```sql
//! CREATE TABLE IF NOT EXISTS mood_states (
//!     entity_id  TEXT PRIMARY KEY,
//!     format     TEXT NOT NULL,
//!     data       BLOB NOT NULL,
//!     updated_at TEXT NOT NULL,
//!     checksum   TEXT
//! );
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use rusqlite::{Connection, OpenFlags, OptionalExtension, params};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::config::{ConfigSnapshot, PersistenceConfig};
use crate::context::EmotionSet;
use crate::engine::MoodEngine;
use crate::error::{EmotiveError, Result};
use crate::level::LevelState;
use crate::mood::Mood;
use crate::record::EmotionRecord;
use crate::types::{EntityId, Tick};
use crate::weight::{MIN_IMPACT_CAP, NatureProfile};

// ---------------------------------------------------------------------------
// Engine state
// ---------------------------------------------------------------------------

/// Everything a [`MoodEngine`] needs to resume exactly where it left off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EngineState {
    /// Live records.
    #[serde(default)]
    pub records: Vec<EmotionRecord>,
    /// Persistent blend vector (non-zero entries).
    #[serde(default = "baseline_blend")]
    pub blend: BTreeMap<Mood, f32>,
    /// Dominant mood, level and history rings.
    #[serde(default)]
    pub level: LevelState,
    /// Temperament.
    #[serde(default)]
    pub nature: NatureProfile,
    /// Impact cap from the last refresh.
    #[serde(default = "default_impact_cap")]
    pub impact_cap: f32,
    /// Tick of the last refresh pass.
    #[serde(default)]
    pub last_refresh: Option<Tick>,
    /// Whether the last refresh saw any live record.
    #[serde(default)]
    pub had_live_records: bool,
    /// Emotions whose triggering condition held at the last refresh.
    #[serde(default)]
    pub ongoing: EmotionSet,
}

fn baseline_blend() -> BTreeMap<Mood, f32> {
    BTreeMap::from([(Mood::BASELINE, 1.0)])
}
fn default_impact_cap() -> f32 {
    MIN_IMPACT_CAP
}

impl Default for EngineState {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            blend: baseline_blend(),
            level: LevelState::default(),
            nature: NatureProfile::default(),
            impact_cap: MIN_IMPACT_CAP,
            last_refresh: None,
            had_live_records: false,
            ongoing: EmotionSet::EMPTY,
        }
    }
}

impl EngineState {
    /// Generic structured form.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Serialization`] if a value can't be represented.
    pub fn to_value(&self) -> Result<serde_json::Value> {
        serde_json::to_value(self).map_err(|e| EmotiveError::Serialization(e.to_string()))
    }

    /// Rebuild from the structured form; missing fields take defaults.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Serialization`] on a shape mismatch.
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        serde_json::from_value(value).map_err(|e| EmotiveError::Serialization(e.to_string()))
    }

    /// Encode as a blob.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Serialization`] if encoding fails.
    pub fn encode(&self, format: SnapshotFormat) -> Result<Vec<u8>> {
        let ser = |e: &dyn fmt::Display| EmotiveError::Serialization(e.to_string());
        match format {
            SnapshotFormat::Json => serde_json::to_vec(self).map_err(|e| ser(&e)),
            SnapshotFormat::MessagePack => rmp_serde::to_vec_named(self).map_err(|e| ser(&e)),
            SnapshotFormat::Bincode => bincode::serialize(self).map_err(|e| ser(&e)),
        }
    }

    /// Decode a blob written by [`EngineState::encode`].
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Serialization`] if the bytes don't decode.
    pub fn decode(bytes: &[u8], format: SnapshotFormat) -> Result<Self> {
        let ser = |e: &dyn fmt::Display| EmotiveError::Serialization(e.to_string());
        match format {
            SnapshotFormat::Json => serde_json::from_slice(bytes).map_err(|e| ser(&e)),
            SnapshotFormat::MessagePack => rmp_serde::from_slice(bytes).map_err(|e| ser(&e)),
            SnapshotFormat::Bincode => bincode::deserialize(bytes).map_err(|e| ser(&e)),
        }
    }
}

/// Blob encoding.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SnapshotFormat {
    /// Human-readable JSON.
    Json,
    /// MessagePack with named fields.
    #[default]
    MessagePack,
    /// Fixed-layout bincode.
    Bincode,
}

impl SnapshotFormat {
    /// Name stored in the `format` column.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::MessagePack => "message_pack",
            Self::Bincode => "bincode",
        }
    }
}

impl fmt::Display for SnapshotFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SnapshotFormat {
    type Err = EmotiveError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "json" => Ok(Self::Json),
            "message_pack" => Ok(Self::MessagePack),
            "bincode" => Ok(Self::Bincode),
            other => Err(EmotiveError::Serialization(format!(
                "unknown snapshot format: {other}"
            ))),
        }
    }
}

// ---------------------------------------------------------------------------
// CRC-32 checksum helper
// ---------------------------------------------------------------------------

fn crc32_hex(data: &[u8]) -> String {
    format!("{:08x}", crc32_compute(data))
}

/// CRC-32 (ISO 3309).
fn crc32_compute(data: &[u8]) -> u32 {
    const POLY: u32 = 0xEDB8_8320;
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            if crc & 1 == 1 {
                crc = (crc >> 1) ^ POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    !crc
}

// ---------------------------------------------------------------------------
// StateStore
// ---------------------------------------------------------------------------

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS mood_states (
    entity_id  TEXT PRIMARY KEY,
    format     TEXT NOT NULL,
    data       BLOB NOT NULL,
    updated_at TEXT NOT NULL,
    checksum   TEXT
);";

/// SQLite-backed store of per-entity engine snapshots.
pub struct StateStore {
    conn: Connection,
    config: PersistenceConfig,
    db_path: PathBuf,
}

impl fmt::Debug for StateStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StateStore")
            .field("db_path", &self.db_path)
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl StateStore {
    /// Open (or create) a store at `path`.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] on SQLite failures.
    pub fn open<P: AsRef<Path>>(path: P, config: &PersistenceConfig) -> Result<Self> {
        let db_path = path.as_ref().to_path_buf();
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let conn = Connection::open_with_flags(&db_path, flags)?;

        if config.wal_mode {
            conn.execute_batch("PRAGMA journal_mode = WAL;")?;
        }
        conn.execute_batch("PRAGMA synchronous = NORMAL;")?;
        conn.execute_batch("PRAGMA busy_timeout = 5000;")?;
        conn.execute_batch(SCHEMA)?;

        info!(
            path = %db_path.display(),
            wal = config.wal_mode,
            format = %config.format,
            "Mood state store opened"
        );

        Ok(Self {
            conn,
            config: config.clone(),
            db_path,
        })
    }

    /// Open an in-memory store.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] on SQLite failures.
    pub fn open_in_memory(config: &PersistenceConfig) -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn,
            config: config.clone(),
            db_path: PathBuf::from(":memory:"),
        })
    }

    /// Save (upsert) one entity's state in the configured format.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Serialization`] or [`EmotiveError::Database`].
    pub fn save_state(&self, entity: &EntityId, state: &EngineState) -> Result<()> {
        let start = Instant::now();
        let format = self.config.format;
        let data = state.encode(format)?;
        let checksum = self.config.checksum_enabled.then(|| crc32_hex(&data));

        self.conn.execute(
            "INSERT INTO mood_states (entity_id, format, data, updated_at, checksum)
             VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(entity_id) DO UPDATE SET
                format = excluded.format,
                data = excluded.data,
                updated_at = excluded.updated_at,
                checksum = excluded.checksum",
            params![
                entity.0.to_string(),
                format.as_str(),
                data,
                Utc::now().to_rfc3339(),
                checksum
            ],
        )?;

        debug!(
            entity = %entity,
            records = state.records.len(),
            bytes = data.len(),
            %format,
            elapsed_us = start.elapsed().as_micros(),
            "Saved mood state"
        );
        Ok(())
    }

    /// Load one entity's state. `None` if nothing was saved.
    ///
    /// A checksum mismatch is logged; the data is still decoded.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Serialization`] or [`EmotiveError::Database`].
    pub fn load_state(&self, entity: &EntityId) -> Result<Option<EngineState>> {
        let row: Option<(String, Vec<u8>, Option<String>)> = self
            .conn
            .prepare_cached("SELECT format, data, checksum FROM mood_states WHERE entity_id = ?1")?
            .query_row(params![entity.0.to_string()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let Some((format, data, stored_checksum)) = row else {
            return Ok(None);
        };

        if self.config.checksum_enabled {
            if let Some(expected) = stored_checksum {
                let actual = crc32_hex(&data);
                if expected != actual {
                    warn!(
                        entity = %entity,
                        %expected,
                        %actual,
                        "Checksum mismatch, possible save corruption"
                    );
                }
            }
        }

        let state = EngineState::decode(&data, format.parse()?)?;
        debug!(entity = %entity, records = state.records.len(), "Loaded mood state");
        Ok(Some(state))
    }

    /// Load an engine, or a fresh calm one when nothing was saved.
    ///
    /// # Errors
    ///
    /// Same as [`StateStore::load_state`].
    pub fn load_engine(&self, entity: &EntityId, config: Arc<ConfigSnapshot>) -> Result<MoodEngine> {
        Ok(match self.load_state(entity)? {
            Some(state) => MoodEngine::from_state(state, config),
            None => MoodEngine::new(config),
        })
    }

    /// Delete one entity's state. `true` if a row was removed.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] on SQLite failures.
    pub fn delete_state(&self, entity: &EntityId) -> Result<bool> {
        let deleted = self.conn.execute(
            "DELETE FROM mood_states WHERE entity_id = ?1",
            params![entity.0.to_string()],
        )?;
        Ok(deleted > 0)
    }

    /// Every entity with a saved state.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] on SQLite failures.
    pub fn list_entities(&self) -> Result<Vec<EntityId>> {
        let mut stmt = self.conn.prepare_cached("SELECT entity_id FROM mood_states")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;

        let mut entities = Vec::new();
        for row in rows {
            let id = row?;
            match uuid::Uuid::parse_str(&id) {
                Ok(uuid) => entities.push(EntityId(uuid)),
                Err(_) => warn!(%id, "Skipping row with invalid UUID"),
            }
        }
        Ok(entities)
    }

    /// Number of stored entities.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] on SQLite failures.
    pub fn entity_count(&self) -> Result<usize> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM mood_states", [], |row| row.get(0))?;
        Ok(usize::try_from(count).unwrap_or(0))
    }

    /// Copy the database to `dest_path` with SQLite's online-backup API.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] on SQLite failures.
    pub fn backup<P: AsRef<Path>>(&self, dest_path: P) -> Result<()> {
        let start = Instant::now();
        let mut dest = Connection::open(dest_path.as_ref())?;
        let backup = rusqlite::backup::Backup::new(&self.conn, &mut dest)?;
        backup.run_to_completion(256, std::time::Duration::from_millis(50), None)?;
        info!(
            dest = %dest_path.as_ref().display(),
            elapsed_ms = start.elapsed().as_millis(),
            "Mood state backup completed"
        );
        Ok(())
    }

    /// `PRAGMA integrity_check`.
    ///
    /// # Errors
    ///
    /// Returns [`EmotiveError::Database`] if the check itself fails.
    pub fn integrity_check(&self) -> Result<bool> {
        let result: String = self
            .conn
            .query_row("PRAGMA integrity_check", [], |row| row.get(0))?;
        Ok(result == "ok")
    }

    /// Path to the database file (`:memory:` for in-memory stores).
    #[must_use]
    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}
