//! Contextual signals the engine queries from its host on every refresh.
//!
//! The host answers simple questions (how strong is the bond, when was the
//! last danger, is the owner around); the engine turns the answers into
//! normalized [`ContextFactors`] once per refresh and decides which emotions
//! still have their triggering condition ongoing via the [`ConditionTable`].

use serde::{Deserialize, Serialize};

use crate::config::ContextConfig;
use crate::emotion::{Emotion, TriggerCondition};
use crate::types::{Tick, ticks_since};

/// Read-only view of an entity's surroundings, supplied by the host.
pub trait EmotionContext {
    /// Current bond strength with the owner/companion (host units).
    fn bond_strength(&self) -> i64;
    /// Tick of the last care event (feeding, petting, healing).
    fn last_care_tick(&self) -> Option<Tick>;
    /// Tick of the last danger event (took damage, hostile nearby).
    fn last_danger_tick(&self) -> Option<Tick>;
    /// Consecutive danger events without a calm gap.
    fn danger_streak(&self) -> u32;
    /// Current health as a fraction of maximum.
    fn health_fraction(&self) -> f32;
    /// Whether the owner/companion is nearby.
    fn owner_present(&self) -> bool;
    /// Host-defined predicate for emotions whose condition is [`TriggerCondition::Host`].
    fn custom_condition(&self, _emotion: Emotion) -> bool {
        false
    }
}

/// Plain-data [`EmotionContext`], convenient for hosts and tests.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextSnapshot {
    /// Bond strength (host units).
    #[serde(default)]
    pub bond_strength: i64,
    /// Last care tick.
    #[serde(default)]
    pub last_care_tick: Option<Tick>,
    /// Last danger tick.
    #[serde(default)]
    pub last_danger_tick: Option<Tick>,
    /// Danger streak counter.
    #[serde(default)]
    pub danger_streak: u32,
    /// Health fraction in `[0, 1]`.
    #[serde(default = "default_health")]
    pub health_fraction: f32,
    /// Whether the owner is nearby.
    #[serde(default = "default_owner_present")]
    pub owner_present: bool,
    /// Emotions whose host-defined condition currently holds.
    #[serde(default)]
    pub custom: EmotionSet,
}

impl Default for ContextSnapshot {
    fn default() -> Self {
        Self {
            bond_strength: 0,
            last_care_tick: None,
            last_danger_tick: None,
            danger_streak: 0,
            health_fraction: 1.0,
            owner_present: true,
            custom: EmotionSet::EMPTY,
        }
    }
}

impl EmotionContext for ContextSnapshot {
    fn bond_strength(&self) -> i64 {
        self.bond_strength
    }
    fn last_care_tick(&self) -> Option<Tick> {
        self.last_care_tick
    }
    fn last_danger_tick(&self) -> Option<Tick> {
        self.last_danger_tick
    }
    fn danger_streak(&self) -> u32 {
        self.danger_streak
    }
    fn health_fraction(&self) -> f32 {
        self.health_fraction
    }
    fn owner_present(&self) -> bool {
        self.owner_present
    }
    fn custom_condition(&self, emotion: Emotion) -> bool {
        self.custom.contains(emotion)
    }
}

fn default_health() -> f32 {
    1.0
}
fn default_owner_present() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Emotion bitset
// ---------------------------------------------------------------------------

/// Compact set of emotions (one bit per ordinal).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct EmotionSet(u32);

impl EmotionSet {
    /// The empty set.
    pub const EMPTY: Self = Self(0);

    /// Insert an emotion.
    pub fn insert(&mut self, emotion: Emotion) {
        self.0 |= 1 << emotion.index();
    }

    /// Remove an emotion.
    pub fn remove(&mut self, emotion: Emotion) {
        self.0 &= !(1 << emotion.index());
    }

    /// Membership test.
    #[must_use]
    pub const fn contains(self, emotion: Emotion) -> bool {
        self.0 & (1 << emotion.index()) != 0
    }

    /// Whether no emotion is set.
    #[must_use]
    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }
}

impl FromIterator<Emotion> for EmotionSet {
    fn from_iter<I: IntoIterator<Item = Emotion>>(iter: I) -> Self {
        let mut set = Self::EMPTY;
        for emotion in iter {
            set.insert(emotion);
        }
        set
    }
}

// ---------------------------------------------------------------------------
// Derived factors
// ---------------------------------------------------------------------------

/// Normalized context, derived once per refresh.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContextFactors {
    /// Bond strength in `[0, 1]`.
    pub bond: f32,
    /// Danger recency in `[0, 1]` (1 = right now), streak-boosted.
    pub danger: f32,
    /// Care recency in `[0, 1]`.
    pub care: f32,
    /// Health fraction in `[0, 1]`.
    pub health: f32,
    /// Whether the last danger falls inside the danger window.
    pub danger_active: bool,
    /// Whether the last care falls inside the care window.
    pub care_active: bool,
    /// Whether health is under the low-health line.
    pub low_health: bool,
    /// Whether the owner is nearby.
    pub owner_present: bool,
}

impl ContextFactors {
    /// Neutral factors: no bond, no danger, no care, full health, owner present.
    pub const NEUTRAL: Self = Self {
        bond: 0.0,
        danger: 0.0,
        care: 0.0,
        health: 1.0,
        danger_active: false,
        care_active: false,
        low_health: false,
        owner_present: true,
    };

    /// Sample and normalize a host context at `now`.
    #[must_use]
    pub fn derive(ctx: &dyn EmotionContext, now: Tick, config: &ContextConfig) -> Self {
        let full = config.bond_full_strength.max(1) as f32;
        let bond = (ctx.bond_strength() as f32 / full).clamp(0.0, 1.0);

        let danger_window = config.danger_window_ticks.max(1) as f32;
        let (danger, danger_active) = match ctx.last_danger_tick() {
            Some(at) => {
                let age = ticks_since(now, at);
                let streak = ctx.danger_streak().min(5) as f32;
                let recency = (-age / danger_window).exp() * (1.0 + 0.1 * streak);
                (recency.clamp(0.0, 1.0), age <= danger_window)
            }
            None => (0.0, false),
        };

        let care_window = config.care_window_ticks.max(1) as f32;
        let (care, care_active) = match ctx.last_care_tick() {
            Some(at) => {
                let age = ticks_since(now, at);
                ((-age / care_window).exp().clamp(0.0, 1.0), age <= care_window)
            }
            None => (0.0, false),
        };

        let health = if ctx.health_fraction().is_finite() {
            ctx.health_fraction().clamp(0.0, 1.0)
        } else {
            1.0
        };

        Self {
            bond,
            danger,
            care,
            health,
            danger_active,
            care_active,
            low_health: health < config.low_health_fraction,
            owner_present: ctx.owner_present(),
        }
    }
}

// ---------------------------------------------------------------------------
// Ongoing-condition table
// ---------------------------------------------------------------------------

/// Per-emotion triggering condition, one explicit entry per emotion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConditionTable([TriggerCondition; Emotion::COUNT]);

impl Default for ConditionTable {
    fn default() -> Self {
        Self(Emotion::ALL.map(Emotion::default_condition))
    }
}

impl ConditionTable {
    /// Condition for one emotion.
    #[must_use]
    pub fn condition(&self, emotion: Emotion) -> TriggerCondition {
        self.0[emotion.index()]
    }

    /// Replace the condition for one emotion.
    pub fn set(&mut self, emotion: Emotion, condition: TriggerCondition) {
        self.0[emotion.index()] = condition;
    }

    /// Whether `emotion`'s triggering condition is still going on.
    #[must_use]
    pub fn is_ongoing(
        &self,
        emotion: Emotion,
        factors: &ContextFactors,
        ctx: &dyn EmotionContext,
    ) -> bool {
        match self.condition(emotion) {
            TriggerCondition::OwnerAbsent => !factors.owner_present,
            TriggerCondition::DangerRecent => factors.danger_active,
            TriggerCondition::LowHealth => factors.low_health,
            TriggerCondition::CareRecent => factors.care_active,
            TriggerCondition::Host => ctx.custom_condition(emotion),
        }
    }

    /// Evaluate every emotion at once.
    #[must_use]
    pub fn evaluate(&self, factors: &ContextFactors, ctx: &dyn EmotionContext) -> EmotionSet {
        Emotion::ALL
            .into_iter()
            .filter(|&e| self.is_ongoing(e, factors, ctx))
            .collect()
    }
}
