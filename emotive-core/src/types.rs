//! Core type definitions shared across the engine.

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// Unique identifier for any entity (pet, NPC, creature) that owns an engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntityId(pub Uuid);

impl EntityId {
    /// Create a new random entity ID.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for EntityId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Time
// ---------------------------------------------------------------------------

/// Game tick, monotonically increasing (20 ticks ≈ one second of game time).
pub type Tick = u64;

/// Ticks elapsed from `earlier` to `now`, saturating at zero on clock skew.
#[must_use]
pub fn ticks_since(now: Tick, earlier: Tick) -> f32 {
    now.saturating_sub(earlier) as f32
}

// ---------------------------------------------------------------------------
// Presentation
// ---------------------------------------------------------------------------

/// An sRGB colour stop used by the (external) mood label renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    /// Red channel.
    pub r: u8,
    /// Green channel.
    pub g: u8,
    /// Blue channel.
    pub b: u8,
}

impl Rgb {
    /// Build a colour from a packed `0xRRGGBB` value.
    #[must_use]
    pub const fn hex(packed: u32) -> Self {
        Self {
            r: ((packed >> 16) & 0xFF) as u8,
            g: ((packed >> 8) & 0xFF) as u8,
            b: (packed & 0xFF) as u8,
        }
    }
}

impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// Runtime statistics for a single entity's engine.
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineStats {
    /// Number of live emotion records.
    pub live_records: u32,
    /// Number of records that survived the last active-set selection.
    pub survivors: u32,
    /// Tick of the last full refresh.
    pub last_refresh_tick: Tick,
    /// Current impact cap (95th percentile of impact budgets, floor 4.0).
    pub impact_cap: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rgb_from_hex() {
        let c = Rgb::hex(0x12_34_56);
        assert_eq!((c.r, c.g, c.b), (0x12, 0x34, 0x56));
        assert_eq!(c.to_string(), "#123456");
    }

    #[test]
    fn ticks_since_saturates() {
        assert!((ticks_since(100, 40) - 60.0).abs() < f32::EPSILON);
        assert!(ticks_since(10, 40).abs() < f32::EPSILON);
    }
}
