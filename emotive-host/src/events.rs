//! Host events that feed the mood engines.
//!
//! The host's combat, care, health and movement code emits these; the
//! [`MoodWorld`](crate::systems::MoodWorld) drains them once per tick.
//! Stimulus and contagion events write into the engine; the rest update the
//! entity's context snapshot.

use serde::{Deserialize, Serialize};

use emotive_core::contagion::ContagionPacket;
use emotive_core::{Emotion, EntityId, Tick};

/// A host event addressed to one entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EmotionEvent {
    /// Something made the entity feel `emotion`. Negative amounts suppress.
    Stimulus {
        /// Receiving entity.
        entity: EntityId,
        /// Emotion felt.
        emotion: Emotion,
        /// Signed amount.
        amount: f32,
        /// When it happened.
        tick: Tick,
    },

    /// Another entity's feeling rubbed off.
    Contagion {
        /// Receiving entity.
        entity: EntityId,
        /// Packet built by the source engine.
        packet: ContagionPacket,
        /// Bond between source and receiver in `[0, 1]`.
        bond_factor: f32,
        /// When it happened.
        tick: Tick,
    },

    /// The entity was threatened.
    Danger {
        /// Threatened entity.
        entity: EntityId,
        /// When it happened.
        tick: Tick,
    },

    /// The threat is gone; resets the danger streak.
    DangerCleared {
        /// Entity.
        entity: EntityId,
        /// When it happened.
        tick: Tick,
    },

    /// The entity was fed, healed or petted.
    Care {
        /// Cared-for entity.
        entity: EntityId,
        /// When it happened.
        tick: Tick,
    },

    /// Health changed.
    Health {
        /// Entity.
        entity: EntityId,
        /// New health fraction in `[0, 1]`.
        fraction: f32,
        /// When it happened.
        tick: Tick,
    },

    /// Bond strength changed.
    Bond {
        /// Entity.
        entity: EntityId,
        /// New bond strength in host units.
        strength: i64,
        /// When it happened.
        tick: Tick,
    },

    /// The owner came or went.
    OwnerPresence {
        /// Entity.
        entity: EntityId,
        /// Whether the owner is now nearby.
        present: bool,
        /// When it happened.
        tick: Tick,
    },

    /// A host-defined ongoing condition started or stopped.
    Condition {
        /// Entity.
        entity: EntityId,
        /// Emotion whose condition changed.
        emotion: Emotion,
        /// Whether it now holds.
        active: bool,
        /// When it happened.
        tick: Tick,
    },
}

impl EmotionEvent {
    /// The entity this event is addressed to.
    #[must_use]
    pub fn entity(&self) -> EntityId {
        match self {
            Self::Stimulus { entity, .. }
            | Self::Contagion { entity, .. }
            | Self::Danger { entity, .. }
            | Self::DangerCleared { entity, .. }
            | Self::Care { entity, .. }
            | Self::Health { entity, .. }
            | Self::Bond { entity, .. }
            | Self::OwnerPresence { entity, .. }
            | Self::Condition { entity, .. } => *entity,
        }
    }

    /// When the event happened.
    #[must_use]
    pub fn tick(&self) -> Tick {
        match self {
            Self::Stimulus { tick, .. }
            | Self::Contagion { tick, .. }
            | Self::Danger { tick, .. }
            | Self::DangerCleared { tick, .. }
            | Self::Care { tick, .. }
            | Self::Health { tick, .. }
            | Self::Bond { tick, .. }
            | Self::OwnerPresence { tick, .. }
            | Self::Condition { tick, .. } => *tick,
        }
    }

    /// Whether this event only changes the context snapshot.
    #[must_use]
    pub fn is_context(&self) -> bool {
        !matches!(self, Self::Stimulus { .. } | Self::Contagion { .. })
    }
}

/// Stimulus event helper for host hooks.
#[must_use]
pub fn stimulus(entity: EntityId, emotion: Emotion, amount: f32, tick: Tick) -> EmotionEvent {
    EmotionEvent::Stimulus {
        entity,
        emotion,
        amount,
        tick,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accessors_cover_every_variant() {
        let id = EntityId::new();
        let events = [
            stimulus(id, Emotion::Joy, 0.3, 5),
            EmotionEvent::Danger { entity: id, tick: 5 },
            EmotionEvent::OwnerPresence {
                entity: id,
                present: false,
                tick: 5,
            },
        ];
        for event in &events {
            assert_eq!(event.entity(), id);
            assert_eq!(event.tick(), 5);
        }
        assert!(!events[0].is_context());
        assert!(events[1].is_context());
    }

    #[test]
    fn events_serialize_with_kind_tag() {
        let id = EntityId::new();
        let json = serde_json::to_value(stimulus(id, Emotion::Fear, 0.5, 10)).expect("serialize");
        assert_eq!(json["kind"], "stimulus");
        assert_eq!(json["emotion"], "fear");
        let back: EmotionEvent = serde_json::from_value(json).expect("deserialize");
        assert_eq!(back.entity(), id);
    }
}
