//! Emotional contagion — value-only transfer between engines.
//!
//! A sender builds a [`ContagionPacket`] from its own state; the host
//! delivers it to a receiver together with a bond factor. The receiver
//! only ever touches its own contagion channel, bounded by
//!   cap = clamp(impact_cap · impact_fraction · bond, min_cap, max_cap)

use serde::{Deserialize, Serialize};

use crate::config::ContagionConfig;
use crate::emotion::Emotion;

/// A packet of emotional weight in flight between two entities.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ContagionPacket {
    /// Emotion being passed on.
    pub emotion: Emotion,
    /// Signed amount; the receiver clamps it.
    pub amount: f32,
}

impl ContagionPacket {
    /// Packet with its amount scaled by `factor`.
    #[must_use]
    pub fn scaled(self, factor: f32) -> Self {
        Self {
            amount: self.amount * factor,
            ..self
        }
    }

    /// Whether the packet carries anything worth delivering.
    #[must_use]
    pub fn is_negligible(&self) -> bool {
        !self.amount.is_finite() || self.amount.abs() <= crate::record::CONTAGION_EPSILON
    }
}

/// Bound on a record's contagion share for the given bond.
#[must_use]
pub fn contagion_cap(impact_cap: f32, bond_factor: f32, config: &ContagionConfig) -> f32 {
    let bond = if bond_factor.is_finite() {
        bond_factor.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let (lo, hi) = (config.min_cap.min(config.max_cap), config.max_cap.max(config.min_cap));
    (impact_cap * config.impact_fraction * bond).clamp(lo, hi)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cap_scales_with_bond_and_is_bounded() {
        let config = ContagionConfig::default();
        assert!((contagion_cap(4.0, 1.0, &config) - 0.4).abs() < 1e-6);
        assert!((contagion_cap(4.0, 0.0, &config) - config.min_cap).abs() < 1e-6);
        assert!((contagion_cap(100.0, 1.0, &config) - config.max_cap).abs() < 1e-6);
        assert!((contagion_cap(4.0, f32::NAN, &config) - config.min_cap).abs() < 1e-6);
    }

    #[test]
    fn packets_scale() {
        let packet = ContagionPacket {
            emotion: Emotion::Fear,
            amount: 0.5,
        };
        assert!((packet.scaled(0.5).amount - 0.25).abs() < f32::EPSILON);
        assert!(packet.scaled(0.0).is_negligible());
    }
}
