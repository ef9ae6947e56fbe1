//! Level controller — discrete mood intensity with buildup and hysteresis.
//!
//! Level = number of the dominant mood's thresholds the effective strength
//! clears, where
//!   effective = strength × buildup − drag
//!   buildup   = 1.2 rising (> +0.05), 0.85 falling (< −0.05), else 1.0
//!   drag      = min(0.10 · (share_at_level_2+ − 0.5), 0.05) when share > 0.5
//!
//! Moving up to level L needs `threshold[L] + 0.03 + 0.02·L`; moving down
//! needs falling `0.02` below the current level's threshold. Otherwise the
//! level holds.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::mood::Mood;
use crate::stats::RingBuffer;
use crate::types::Tick;

/// Highest reachable level.
pub const MAX_LEVEL: u8 = 3;
/// Strength change that counts as a trend.
pub const TREND_THRESHOLD: f32 = 0.05;
/// Buildup multiplier while rising.
pub const RISING_BUILDUP: f32 = 1.2;
/// Buildup multiplier while falling.
pub const FALLING_BUILDUP: f32 = 0.85;
/// Flat margin for leveling down.
pub const DOWN_MARGIN: f32 = 0.02;
/// Level at or above which time counts toward habituation drag.
pub const DRAG_LEVEL: u8 = 2;
/// Largest habituation drag.
pub const MAX_DRAG: f32 = 0.05;

/// Margin needed to reach `target` from below.
#[must_use]
pub fn up_margin(target: u8) -> f32 {
    0.03 + 0.02 * f32::from(target)
}

// ---------------------------------------------------------------------------
// Thresholds
// ---------------------------------------------------------------------------

/// Per-mood ascending thresholds for levels 1, 2 and 3.
#[derive(Debug, Clone, PartialEq)]
pub struct ThresholdTable([[f32; 3]; Mood::COUNT]);

impl Default for ThresholdTable {
    fn default() -> Self {
        Self(Mood::ALL.map(|m| m.tier().thresholds()))
    }
}

impl ThresholdTable {
    /// Thresholds for one mood.
    #[must_use]
    pub fn get(&self, mood: Mood) -> [f32; 3] {
        self.0[mood.index()]
    }

    /// Override one mood. Rejects values that aren't finite, strictly
    /// ascending and inside `(0, 1]`.
    pub fn set(&mut self, mood: Mood, levels: [f32; 3]) -> bool {
        let valid = levels.iter().all(|t| t.is_finite() && *t > 0.0 && *t <= 1.0)
            && levels[0] < levels[1]
            && levels[1] < levels[2];
        if valid {
            self.0[mood.index()] = levels;
        }
        valid
    }
}

// ---------------------------------------------------------------------------
// Level state
// ---------------------------------------------------------------------------

/// A `(level, tick)` sample used for habituation drag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelSnapshot {
    /// Level at the time.
    pub level: u8,
    /// When it was recorded.
    pub tick: Tick,
}

/// Outcome of one controller step.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelUpdate {
    /// Level before the step.
    pub previous: u8,
    /// Level after the step.
    pub level: u8,
    /// Strength the thresholds were compared against.
    pub effective_strength: f32,
    /// Trend multiplier applied.
    pub buildup: f32,
    /// Habituation drag subtracted.
    pub drag: f32,
}

/// Persistent level state: current mood, level, and both history rings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LevelState {
    /// Reported dominant mood.
    #[serde(default = "default_mood")]
    pub current_mood: Mood,
    /// Reported level, `0..=3`.
    #[serde(default)]
    pub level: u8,
    /// Dominant strength from the previous cycle.
    #[serde(default)]
    pub last_strength: f32,
    /// Recent dominant strengths; sizes the momentum band.
    #[serde(default = "default_strength_history")]
    pub strength_history: RingBuffer<f32>,
    /// Recent level snapshots; drives habituation drag.
    #[serde(default = "default_level_history")]
    pub level_history: RingBuffer<LevelSnapshot>,
}

fn default_mood() -> Mood {
    Mood::BASELINE
}
fn default_strength_history() -> RingBuffer<f32> {
    RingBuffer::new(10)
}
fn default_level_history() -> RingBuffer<LevelSnapshot> {
    RingBuffer::new(30)
}

impl Default for LevelState {
    fn default() -> Self {
        Self::new(10, 30)
    }
}

impl LevelState {
    /// Baseline state with the given history capacities.
    #[must_use]
    pub fn new(strength_history: usize, level_history: usize) -> Self {
        Self {
            current_mood: Mood::BASELINE,
            level: 0,
            last_strength: 0.0,
            strength_history: RingBuffer::new(strength_history),
            level_history: RingBuffer::new(level_history),
        }
    }

    /// Time-weighted share of the recorded window spent at level ≥ 2.
    ///
    /// `0.0` with fewer than two snapshots.
    #[must_use]
    pub fn high_level_share(&self, now: Tick) -> f32 {
        if self.level_history.len() < 2 {
            return 0.0;
        }
        let snaps: Vec<LevelSnapshot> = self.level_history.iter().copied().collect();
        let mut total = 0_u64;
        let mut high = 0_u64;
        for (i, snap) in snaps.iter().enumerate() {
            let end = snaps.get(i + 1).map_or(now, |next| next.tick);
            let span = end.saturating_sub(snap.tick);
            total += span;
            if snap.level >= DRAG_LEVEL {
                high += span;
            }
        }
        if total == 0 {
            0.0
        } else {
            high as f32 / total as f32
        }
    }

    /// Habituation drag for the current history.
    #[must_use]
    pub fn drag(&self, now: Tick) -> f32 {
        let share = self.high_level_share(now);
        if share > 0.5 {
            (0.10 * (share - 0.5)).min(MAX_DRAG)
        } else {
            0.0
        }
    }

    /// Advance one cycle with the dominant `mood` at blend `strength`.
    ///
    /// A mood switch climbs from level 0 with no trend buildup, so the
    /// level-up margins apply to the new mood as well.
    pub fn update(
        &mut self,
        mood: Mood,
        strength: f32,
        now: Tick,
        thresholds: &ThresholdTable,
        snapshot_interval: Tick,
    ) -> LevelUpdate {
        let strength = if strength.is_finite() {
            strength.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let previous = self.level;
        let switched = mood != self.current_mood;
        let delta = strength - self.last_strength;
        let buildup = if switched || delta.abs() <= TREND_THRESHOLD {
            1.0
        } else if delta > 0.0 {
            RISING_BUILDUP
        } else {
            FALLING_BUILDUP
        };
        let drag = self.drag(now);
        let effective = (strength * buildup - drag).max(0.0);

        let start = if switched { 0 } else { previous };
        let level = step_level(thresholds.get(mood), start, effective);

        if level != previous {
            debug!(%mood, from = previous, to = level, effective, "Mood level changed");
        }

        let snapshot_due = self
            .level_history
            .last()
            .is_none_or(|last| now.saturating_sub(last.tick) >= snapshot_interval);
        if level != previous || snapshot_due {
            self.level_history.push(LevelSnapshot { level, tick: now });
        }

        self.current_mood = mood;
        self.level = level;
        self.last_strength = strength;
        self.strength_history.push(strength);

        LevelUpdate {
            previous,
            level,
            effective_strength: effective,
            buildup,
            drag,
        }
    }
}

/// Apply the asymmetric margins starting from `current`.
fn step_level(thresholds: [f32; 3], current: u8, effective: f32) -> u8 {
    let mut level = current.min(MAX_LEVEL);
    let mut raised = false;
    while level < MAX_LEVEL {
        let target = level + 1;
        if effective >= thresholds[usize::from(level)] + up_margin(target) {
            level = target;
            raised = true;
        } else {
            break;
        }
    }
    if raised {
        return level;
    }
    while level > 0 && effective < thresholds[usize::from(level - 1)] - DOWN_MARGIN {
        level -= 1;
    }
    level
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn thresholds_follow_tiers() {
        let table = ThresholdTable::default();
        assert_eq!(table.get(Mood::Happy), [0.35, 0.65, 0.88]);
        assert_eq!(table.get(Mood::Yugen), [0.50, 0.80, 0.95]);
    }

    #[test]
    fn threshold_override_must_ascend() {
        let mut table = ThresholdTable::default();
        assert!(!table.set(Mood::Calm, [0.9, 0.5, 0.8]));
        assert!(!table.set(Mood::Calm, [0.2, f32::NAN, 0.8]));
        assert!(table.set(Mood::Calm, [0.2, 0.5, 0.8]));
        assert_eq!(table.get(Mood::Calm), [0.2, 0.5, 0.8]);
    }

    #[test]
    fn level_up_needs_margin_and_level_down_is_easier() {
        let table = ThresholdTable::default();
        let mut state = LevelState::default();
        let mut levels = Vec::new();
        for (i, s) in [0.30, 0.30, 0.33, 0.37, 0.41, 0.38, 0.35, 0.325]
            .into_iter()
            .enumerate()
        {
            let tick = i as Tick * 20;
            levels.push(state.update(Mood::Happy, s, tick, &table, 100).level);
        }
        // 0.37 clears 0.35 but not 0.35 + 0.05; 0.41 does.
        // 0.35 is within the 0.02 down margin; 0.325 falls through it.
        assert_eq!(levels, vec![0, 0, 0, 0, 1, 1, 1, 0]);
    }

    #[test]
    fn buildup_tracks_trend() {
        let table = ThresholdTable::default();
        let mut state = LevelState::default();
        state.update(Mood::Happy, 0.3, 0, &table, 100);
        let up = state.update(Mood::Happy, 0.5, 20, &table, 100);
        assert!((up.buildup - RISING_BUILDUP).abs() < f32::EPSILON);
        let flat = state.update(Mood::Happy, 0.52, 40, &table, 100);
        assert!((flat.buildup - 1.0).abs() < f32::EPSILON);
        let down = state.update(Mood::Happy, 0.3, 60, &table, 100);
        assert!((down.buildup - FALLING_BUILDUP).abs() < f32::EPSILON);
    }

    #[test]
    fn mood_switch_climbs_from_zero_with_margins() {
        let table = ThresholdTable::default();
        let mut state = LevelState::default();
        // Calm at 0 → Happy at 0.38: no rising buildup, and 0.38 < 0.35 + 0.05.
        let first = state.update(Mood::Happy, 0.38, 0, &table, 100);
        assert!((first.buildup - 1.0).abs() < f32::EPSILON);
        assert_eq!(first.level, 0);

        state.update(Mood::Happy, 0.41, 20, &table, 100);
        assert_eq!(state.level, 1);

        // Afraid needs 0.40 + 0.05 to reach level 1, even right after a switch.
        assert_eq!(state.update(Mood::Afraid, 0.43, 40, &table, 100).level, 0);
        assert_eq!(state.update(Mood::Happy, 0.66, 60, &table, 100).level, 1);
        assert_eq!(state.update(Mood::Happy, 0.66, 80, &table, 100).level, 1);
        assert_eq!(state.update(Mood::Happy, 0.72, 100, &table, 100).level, 2);
    }

    #[test]
    fn camping_at_high_levels_adds_drag() {
        let mut state = LevelState::default();
        state.level_history.push(LevelSnapshot { level: 0, tick: 0 });
        state.level_history.push(LevelSnapshot { level: 3, tick: 100 });
        // 100 ticks at 0, 900 at 3 → share 0.9 → min(0.04, 0.05).
        assert!((state.high_level_share(1_000) - 0.9).abs() < 1e-6);
        assert!((state.drag(1_000) - 0.04).abs() < 1e-6);

        let mut calm = LevelState::default();
        calm.level_history.push(LevelSnapshot { level: 3, tick: 0 });
        assert!(calm.drag(1_000).abs() < f32::EPSILON);
    }

    #[test]
    fn snapshots_on_change_or_interval() {
        let table = ThresholdTable::default();
        let mut state = LevelState::default();
        state.update(Mood::Happy, 0.1, 0, &table, 100);
        state.update(Mood::Happy, 0.1, 20, &table, 100);
        assert_eq!(state.level_history.len(), 1);
        state.update(Mood::Happy, 0.1, 100, &table, 100);
        assert_eq!(state.level_history.len(), 2);
        state.update(Mood::Happy, 0.9, 120, &table, 100);
        assert_eq!(state.level_history.len(), 3);
    }
}
