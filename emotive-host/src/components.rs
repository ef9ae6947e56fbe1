//! Per-entity mood component.
//!
//! Attached to every entity (pet, NPC, creature) that has feelings. Holds the
//! engine plus the context snapshot the host keeps up to date through
//! [`EmotionEvent`]s.

use std::sync::Arc;

use emotive_core::context::ContextSnapshot;
use emotive_core::engine::RefreshReport;
use emotive_core::weight::NatureProfile;
use emotive_core::{ConfigSnapshot, EngineStats, MoodEngine};

use crate::events::EmotionEvent;

/// The mood component. In a full ECS integration this would derive the
/// ECS's component trait; here it is a plain struct.
#[derive(Debug, Clone)]
pub struct MoodComponent {
    /// The entity's engine.
    pub engine: MoodEngine,
    /// Context the engine reads on refresh.
    pub context: ContextSnapshot,
    /// Inactive components are skipped by every system.
    pub active: bool,
    /// Outcome of the most recent recomputing refresh.
    pub last_report: Option<RefreshReport>,
}

impl MoodComponent {
    /// A calm component sharing `config`.
    #[must_use]
    pub fn new(config: Arc<ConfigSnapshot>) -> Self {
        Self::with_engine(MoodEngine::new(config))
    }

    /// A calm component with a temperament.
    #[must_use]
    pub fn with_nature(config: Arc<ConfigSnapshot>, nature: NatureProfile) -> Self {
        Self::with_engine(MoodEngine::with_nature(config, nature))
    }

    /// Wrap an existing (e.g. restored) engine.
    #[must_use]
    pub fn with_engine(engine: MoodEngine) -> Self {
        Self {
            engine,
            context: ContextSnapshot::default(),
            active: true,
            last_report: None,
        }
    }

    /// Apply one event to this component.
    ///
    /// Context changes mark the engine dirty so the next refresh sees them.
    pub fn apply(&mut self, event: &EmotionEvent) {
        match *event {
            EmotionEvent::Stimulus {
                emotion,
                amount,
                tick,
                ..
            } => self.engine.apply_stimulus(emotion, amount, tick),
            EmotionEvent::Contagion {
                packet,
                bond_factor,
                tick,
                ..
            } => {
                self.engine.receive_packet(packet, tick, bond_factor);
            }
            EmotionEvent::Danger { tick, .. } => {
                self.context.last_danger_tick = Some(tick);
                self.context.danger_streak = self.context.danger_streak.saturating_add(1);
            }
            EmotionEvent::DangerCleared { .. } => self.context.danger_streak = 0,
            EmotionEvent::Care { tick, .. } => self.context.last_care_tick = Some(tick),
            EmotionEvent::Health { fraction, .. } => {
                self.context.health_fraction = if fraction.is_finite() {
                    fraction.clamp(0.0, 1.0)
                } else {
                    1.0
                };
            }
            EmotionEvent::Bond { strength, .. } => self.context.bond_strength = strength,
            EmotionEvent::OwnerPresence { present, .. } => self.context.owner_present = present,
            EmotionEvent::Condition {
                emotion, active, ..
            } => {
                if active {
                    self.context.custom.insert(emotion);
                } else {
                    self.context.custom.remove(emotion);
                }
            }
        }
        if event.is_context() {
            self.engine.mark_dirty();
        }
    }

    /// Runtime statistics.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        self.engine.stats()
    }
}

impl Default for MoodComponent {
    fn default() -> Self {
        Self::with_engine(MoodEngine::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use emotive_core::{Emotion, EntityId, Mood};

    #[test]
    fn context_events_update_snapshot() {
        let id = EntityId::new();
        let mut comp = MoodComponent::default();
        comp.apply(&EmotionEvent::Danger { entity: id, tick: 10 });
        comp.apply(&EmotionEvent::Danger { entity: id, tick: 12 });
        assert_eq!(comp.context.last_danger_tick, Some(12));
        assert_eq!(comp.context.danger_streak, 2);

        comp.apply(&EmotionEvent::DangerCleared { entity: id, tick: 20 });
        assert_eq!(comp.context.danger_streak, 0);

        comp.apply(&EmotionEvent::Health {
            entity: id,
            fraction: 3.0,
            tick: 20,
        });
        assert!((comp.context.health_fraction - 1.0).abs() < f32::EPSILON);

        comp.apply(&EmotionEvent::Condition {
            entity: id,
            emotion: Emotion::Pride,
            active: true,
            tick: 20,
        });
        assert!(comp.context.custom.contains(Emotion::Pride));
        assert!(comp.engine.needs_refresh(20));
    }

    #[test]
    fn stimulus_reaches_engine() {
        let id = EntityId::new();
        let mut comp = MoodComponent::default();
        comp.apply(&crate::events::stimulus(id, Emotion::Joy, 0.4, 0));
        comp.engine.ensure_fresh(1, &comp.context);
        assert_eq!(comp.engine.dominant_mood(), Mood::Happy);
        assert_eq!(comp.stats().live_records, 1);
    }
}
