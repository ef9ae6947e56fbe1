//! Adaptive Exponential Decay — how fast feelings fade.
//!
//! Every record decays as:
//!   I(t + Δt) = I(t) · e^(−ln2 / H · Δt)
//!
//! Where the half-life H adapts to the record's own rhythm:
//!   H = clamp(cadence · 1.35, 400, 3600)
//!       × linger multiplier      (fleeting 0.6, normal 1.0, lingering 1.5)
//!       × negativity bias        (2.0 for negative valence)
//!       × condition multiplier   (3.5 while the trigger is still ongoing)
//!       ÷ (homeostasis / 1.1)    (neutral homeostasis leaves H unchanged)
//!
//! Emotions that fire rarely therefore linger longer than emotions that
//! chatter; bad feelings outlast good ones; and nothing fades while its
//! cause is still around.

use std::f64::consts::LN_2;

use crate::emotion::Emotion;

/// Ratio applied to the cadence EMA to get the base half-life.
pub const CADENCE_HALF_LIFE_RATIO: f32 = 1.35;
/// Shortest base half-life in ticks.
pub const MIN_HALF_LIFE: f32 = 400.0;
/// Longest base half-life in ticks.
pub const MAX_HALF_LIFE: f32 = 3_600.0;
/// Half-life multiplier for negative-valence emotions.
pub const NEGATIVITY_BIAS: f32 = 2.0;
/// Half-life multiplier while the triggering condition is ongoing.
pub const ONGOING_CONDITION_BIAS: f32 = 3.5;
/// Neutral homeostasis bias; the value homeostasis relaxes toward.
pub const HOMEOSTASIS_NEUTRAL: f32 = 1.1;
/// Half-life of homeostasis relaxation in ticks.
pub const HOMEOSTASIS_HALF_LIFE: f32 = 2_400.0;

/// Base half-life from the cadence EMA alone.
#[must_use]
pub fn base_half_life(cadence_ema: f32) -> f32 {
    let cadence = if cadence_ema.is_finite() { cadence_ema } else { MAX_HALF_LIFE };
    (cadence * CADENCE_HALF_LIFE_RATIO).clamp(MIN_HALF_LIFE, MAX_HALF_LIFE)
}

/// Full adaptive half-life for a record in ticks.
#[must_use]
pub fn adaptive_half_life(
    emotion: Emotion,
    cadence_ema: f32,
    homeostasis_bias: f32,
    condition_ongoing: bool,
) -> f32 {
    let mut half_life = base_half_life(cadence_ema) * emotion.linger().half_life_multiplier();
    if emotion.is_negative() {
        half_life *= NEGATIVITY_BIAS;
    }
    if condition_ongoing {
        half_life *= ONGOING_CONDITION_BIAS;
    }
    let homeostasis = (homeostasis_bias / HOMEOSTASIS_NEUTRAL).clamp(0.5, 1.5);
    half_life / homeostasis
}

/// Retention factor after `elapsed` ticks at the given half-life: e^(−ln2/H·Δt).
///
/// Returns `1.0` for no elapsed time and `0.0` for a non-positive half-life.
#[must_use]
pub fn retention(elapsed: f32, half_life: f32) -> f32 {
    if elapsed <= 0.0 {
        return 1.0;
    }
    if half_life <= 0.0 || !half_life.is_finite() {
        return 0.0;
    }
    let factor = (-LN_2 / f64::from(half_life) * f64::from(elapsed)).exp();
    #[allow(clippy::cast_possible_truncation)]
    let factor = factor as f32;
    factor
}

/// Move `value` toward `target` as if it decayed toward it with the given half-life.
#[must_use]
pub fn relax_toward(value: f32, target: f32, elapsed: f32, half_life: f32) -> f32 {
    target + (value - target) * retention(elapsed, half_life)
}

/// Ticks until a value at the given half-life has lost `fraction` of itself.
#[must_use]
pub fn ticks_to_lose(fraction: f32, half_life: f32) -> f32 {
    let keep = (1.0 - fraction).clamp(1e-6, 1.0 - 1e-6);
    half_life * (1.0 / keep).log2()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retention_immediate_is_one() {
        assert!((retention(0.0, 800.0) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn retention_halves_at_half_life() {
        assert!((retention(800.0, 800.0) - 0.5).abs() < 1e-5);
        assert!((retention(1_600.0, 800.0) - 0.25).abs() < 1e-5);
    }

    #[test]
    fn base_half_life_is_clamped() {
        assert!((base_half_life(10.0) - MIN_HALF_LIFE).abs() < f32::EPSILON);
        assert!((base_half_life(100_000.0) - MAX_HALF_LIFE).abs() < f32::EPSILON);
        assert!((base_half_life(600.0) - 810.0).abs() < 1e-3);
    }

    #[test]
    fn negative_emotions_decay_slower() {
        let joy = adaptive_half_life(Emotion::Joy, 600.0, HOMEOSTASIS_NEUTRAL, false);
        let fear = adaptive_half_life(Emotion::Fear, 600.0, HOMEOSTASIS_NEUTRAL, false);
        assert!((fear / joy - NEGATIVITY_BIAS).abs() < 1e-4);
    }

    #[test]
    fn ongoing_condition_stretches_half_life() {
        let idle = adaptive_half_life(Emotion::Loneliness, 600.0, HOMEOSTASIS_NEUTRAL, false);
        let ongoing = adaptive_half_life(Emotion::Loneliness, 600.0, HOMEOSTASIS_NEUTRAL, true);
        assert!((ongoing / idle - ONGOING_CONDITION_BIAS).abs() < 1e-4);
    }

    #[test]
    fn linger_classes_apply() {
        let fleeting = adaptive_half_life(Emotion::Cheer, 600.0, HOMEOSTASIS_NEUTRAL, false);
        let normal = adaptive_half_life(Emotion::Joy, 600.0, HOMEOSTASIS_NEUTRAL, false);
        let lingering = adaptive_half_life(Emotion::Affection, 600.0, HOMEOSTASIS_NEUTRAL, false);
        assert!(fleeting < normal && normal < lingering);
    }

    #[test]
    fn high_homeostasis_shortens_half_life() {
        let neutral = adaptive_half_life(Emotion::Joy, 600.0, HOMEOSTASIS_NEUTRAL, false);
        let pulled = adaptive_half_life(Emotion::Joy, 600.0, 1.35, false);
        assert!(pulled < neutral);
    }

    #[test]
    fn relax_toward_converges() {
        let v = relax_toward(1.35, HOMEOSTASIS_NEUTRAL, 2_400.0, HOMEOSTASIS_HALF_LIFE);
        assert!((v - (1.1 + 0.125)).abs() < 1e-4);
    }

    #[test]
    fn ticks_to_lose_matches_retention() {
        let dt = ticks_to_lose(0.1, 800.0);
        assert!((retention(dt, 800.0) - 0.9).abs() < 1e-4);
    }
}
