//! Emotion records — one decaying state per live emotion per entity.
//!
//! A record is created on the first stimulus (or contagion share) for its
//! emotion and pruned once intensity, impact and contagion have all faded.
//! All mutation goes through [`EmotionRecord::apply_stimulus`],
//! [`EmotionRecord::apply_decay`], [`EmotionRecord::update_guards`] and
//! [`EmotionRecord::add_contagion`]; every input is clamped so that no
//! sequence of calls can produce a negative or non-finite state.

use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::context::ContextFactors;
use crate::decay;
use crate::emotion::Emotion;
use crate::stats::lerp;
use crate::types::{Tick, ticks_since};

/// Cadence assumed for a record that has seen a single stimulus.
pub const DEFAULT_CADENCE: f32 = 600.0;
/// Largest positive stimulus accepted before biasing.
pub const MAX_STIMULUS: f32 = 0.5;
/// Contagion shares at or under this magnitude count as gone.
pub const CONTAGION_EPSILON: f32 = 0.01;

const CADENCE_ALPHA: f32 = 0.3;
const VOLATILITY_ALPHA: f32 = 0.25;
const PEAK_ALPHA: f32 = 0.2;
const REINFORCE_RATE: f32 = 0.35;
const GAIN_MIN: f32 = 0.5;
const GAIN_MAX: f32 = 1.4;
const HOMEOSTASIS_MIN: f32 = 0.75;
const HOMEOSTASIS_MAX: f32 = 1.35;

/// Per-emotion decaying state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmotionRecord {
    /// Which emotion this record tracks.
    pub emotion: Emotion,
    /// Current felt strength in `[0, 1]`.
    #[serde(default)]
    pub intensity: f32,
    /// Accumulated importance in `[0, dynamic cap]`.
    #[serde(default)]
    pub impact_budget: f32,
    /// EMA of inter-stimulus gaps (ticks).
    #[serde(default = "default_cadence")]
    pub cadence_ema: f32,
    /// EMA of relative gap deviation from the cadence.
    #[serde(default)]
    pub volatility_ema: f32,
    /// EMA of stimulus magnitudes.
    #[serde(default)]
    pub peak_ema: f32,
    /// How quickly fast repeats wear the gain down, in `[0.5, 1.4]`.
    #[serde(default = "default_one")]
    pub habituation_slope: f32,
    /// Responsiveness multiplier on intake, in `[0.5, 1.4]`.
    #[serde(default = "default_one")]
    pub sensitisation_gain: f32,
    /// Slow bias scaling decay speed, in `[0.75, 1.35]`.
    #[serde(default = "default_homeostasis")]
    pub homeostasis_bias: f32,
    /// Signed share injected by other entities; decays on its own schedule.
    #[serde(default)]
    pub contagion_share: f32,
    /// Bond-derived guard in `[0.85, 1.15]`.
    #[serde(default = "default_one")]
    pub relationship_guard: f32,
    /// Danger recency in `[0, 1]`.
    #[serde(default)]
    pub danger_window: f32,
    /// Confidence in the appraisal in `[0.4, 1.0]`.
    #[serde(default = "default_appraisal")]
    pub appraisal_confidence: f32,
    /// Last synthesized weight (introspection only).
    #[serde(default)]
    pub weight: f32,
    /// Number of stimuli applied since creation.
    #[serde(default)]
    pub stimulus_count: u32,
    /// Tick the record was created.
    #[serde(default)]
    pub start_time: Tick,
    /// Tick of the last stimulus.
    #[serde(default)]
    pub last_event_time: Tick,
    /// Tick the record was last decayed or touched.
    #[serde(default)]
    pub last_update_time: Tick,
}

fn default_cadence() -> f32 {
    DEFAULT_CADENCE
}
fn default_one() -> f32 {
    1.0
}
fn default_homeostasis() -> f32 {
    decay::HOMEOSTASIS_NEUTRAL
}
fn default_appraisal() -> f32 {
    0.8
}

/// What the engine knows at intake time that the record doesn't.
#[derive(Debug, Clone, Copy)]
pub struct Intake {
    /// Nature-profile bias for this emotion.
    pub bias: f32,
    /// Current upper bound for the impact budget.
    pub dynamic_cap: f32,
}

impl EmotionRecord {
    /// A blank record created at `now`.
    #[must_use]
    pub fn new(emotion: Emotion, now: Tick) -> Self {
        Self {
            emotion,
            intensity: 0.0,
            impact_budget: 0.0,
            cadence_ema: DEFAULT_CADENCE,
            volatility_ema: 0.0,
            peak_ema: 0.0,
            habituation_slope: 1.0,
            sensitisation_gain: 1.0,
            homeostasis_bias: decay::HOMEOSTASIS_NEUTRAL,
            contagion_share: 0.0,
            relationship_guard: 1.0,
            danger_window: 0.0,
            appraisal_confidence: default_appraisal(),
            weight: 0.0,
            stimulus_count: 0,
            start_time: now,
            last_event_time: now,
            last_update_time: now,
        }
    }

    /// Apply a signed stimulus at `now`. The record must already be decayed to `now`.
    ///
    /// Positive amounts are clamped to `[0, 0.5]`, biased, scaled by the
    /// sensitisation gain, and then either blended toward or reinforced,
    /// whichever responds more strongly. Negative amounts suppress directly.
    pub fn apply_stimulus(&mut self, amount: f32, now: Tick, intake: Intake) {
        let amount = if amount.is_finite() { amount } else { 0.0 };
        let prev_intensity = self.intensity;
        let gap = (self.stimulus_count > 0).then(|| ticks_since(now, self.last_event_time));
        let cadence_before = self.cadence_ema.max(1.0);

        if let Some(gap) = gap {
            self.update_rhythm(gap);
        }

        let magnitude = if amount >= 0.0 {
            let bias = intake.bias.clamp(0.5, 1.6);
            let sample = (amount.clamp(0.0, MAX_STIMULUS) * bias * self.sensitisation_gain)
                .clamp(0.0, 1.0);
            self.intensity = match gap {
                None => self.intensity.max(sample),
                Some(gap) => rekindle(self.intensity, sample, gap, cadence_before),
            };
            self.impact_budget = (self.impact_budget + sample).clamp(0.0, intake.dynamic_cap.max(0.0));
            sample
        } else {
            let suppression = (-amount).min(1.0);
            self.intensity = (self.intensity - suppression).max(0.0);
            self.impact_budget = (self.impact_budget - suppression).max(0.0);
            suppression
        };

        self.peak_ema = lerp(self.peak_ema, magnitude, PEAK_ALPHA);
        self.homeostasis_bias = if self.intensity < prev_intensity {
            self.homeostasis_bias - 0.05
        } else {
            self.homeostasis_bias + 0.02
        }
        .clamp(HOMEOSTASIS_MIN, HOMEOSTASIS_MAX);

        self.stimulus_count = self.stimulus_count.saturating_add(1);
        self.last_event_time = now;
        self.last_update_time = self.last_update_time.max(now);

        trace!(
            emotion = %self.emotion,
            amount,
            intensity = self.intensity,
            impact = self.impact_budget,
            gain = self.sensitisation_gain,
            "Stimulus applied"
        );
    }

    /// Update cadence, volatility and the habituation/sensitisation pair
    /// from the real gap since the previous stimulus.
    fn update_rhythm(&mut self, gap: f32) {
        let cadence = self.cadence_ema.max(1.0);
        let ratio = gap / cadence;

        self.cadence_ema = lerp(self.cadence_ema, gap, CADENCE_ALPHA).max(1.0);
        let deviation = ((gap - cadence).abs() / cadence).min(3.0);
        self.volatility_ema = lerp(self.volatility_ema, deviation, VOLATILITY_ALPHA);

        if ratio < 1.0 {
            // Faster than expected: habituate, and habituate faster next time.
            let shortfall = 1.0 - ratio;
            self.sensitisation_gain *= 1.0 - 0.12 * shortfall * self.habituation_slope;
            self.habituation_slope += 0.05 * shortfall;
        } else {
            // A long silence sensitizes.
            self.sensitisation_gain *= 1.0 + 0.08 * (ratio - 1.0).min(2.0);
            self.habituation_slope = lerp(self.habituation_slope, 1.0, 0.25);
        }
        self.sensitisation_gain = self.sensitisation_gain.clamp(GAIN_MIN, GAIN_MAX);
        self.habituation_slope = self.habituation_slope.clamp(GAIN_MIN, GAIN_MAX);
    }

    /// Decay the record from its last update to `now`.
    pub fn apply_decay(&mut self, now: Tick, condition_ongoing: bool, contagion_half_life: f32) {
        let elapsed = ticks_since(now, self.last_update_time);
        if elapsed <= 0.0 {
            return;
        }
        let half_life = self.half_life(condition_ongoing);
        let keep = decay::retention(elapsed, half_life);
        self.intensity = (self.intensity * keep).max(0.0);
        self.impact_budget = (self.impact_budget * keep).max(0.0);
        self.contagion_share *= decay::retention(elapsed, contagion_half_life);
        self.homeostasis_bias = decay::relax_toward(
            self.homeostasis_bias,
            decay::HOMEOSTASIS_NEUTRAL,
            elapsed,
            decay::HOMEOSTASIS_HALF_LIFE,
        );
        self.last_update_time = now;
    }

    /// Current adaptive half-life in ticks.
    #[must_use]
    pub fn half_life(&self, condition_ongoing: bool) -> f32 {
        decay::adaptive_half_life(
            self.emotion,
            self.cadence_ema,
            self.homeostasis_bias,
            condition_ongoing,
        )
    }

    /// Recompute the contextual guards from this cycle's factors.
    pub fn update_guards(&mut self, factors: &ContextFactors) {
        self.relationship_guard = 0.85 + 0.3 * factors.bond;
        self.danger_window = factors.danger;
        self.appraisal_confidence = (0.6 + 0.25 * factors.care + 0.15 * factors.bond
            - 0.2 * factors.danger
            - 0.1 * self.volatility_ema.min(1.0))
        .clamp(0.4, 1.0);
    }

    /// Add to the contagion channel, keeping it within `±cap`.
    pub fn add_contagion(&mut self, amount: f32, cap: f32) {
        if !amount.is_finite() {
            return;
        }
        let cap = cap.abs();
        self.contagion_share = (self.contagion_share + amount).clamp(-cap, cap);
    }

    /// Whether the record has faded enough to be pruned.
    #[must_use]
    pub fn is_negligible(&self, epsilon: f32) -> bool {
        self.intensity <= epsilon
            && self.impact_budget <= epsilon
            && self.contagion_share.abs() <= CONTAGION_EPSILON
    }

    /// Ticks since the last stimulus.
    #[must_use]
    pub fn age(&self, now: Tick) -> f32 {
        ticks_since(now, self.last_event_time)
    }

    /// `exp(-age / cadence)`: 1 right after a stimulus, falling toward 0.
    #[must_use]
    pub fn freshness(&self, now: Tick) -> f32 {
        (-self.age(now) / self.cadence_ema.max(1.0)).exp()
    }
}

/// Blend toward the sample or reinforce, whichever responds more.
///
/// Blending wins on a sudden spike or after a long silence; reinforcement
/// wins when small stimuli keep arriving on an already-raised record.
fn rekindle(intensity: f32, sample: f32, gap: f32, cadence: f32) -> f32 {
    let recency_weight = 0.35 + 0.4 * (1.0 - (-gap / cadence).exp());
    let spike_weight = ((sample - intensity) / intensity.max(0.1)).clamp(0.0, 1.0) * 0.8;
    let w = recency_weight.max(spike_weight).clamp(0.2, 0.95);
    let blended = intensity + w * (sample - intensity);
    let reinforced = intensity + REINFORCE_RATE * sample * (1.0 - intensity);
    blended.max(reinforced).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    const INTAKE: Intake = Intake {
        bias: 1.0,
        dynamic_cap: 6.0,
    };

    #[test]
    fn first_stimulus_sets_intensity() {
        let mut rec = EmotionRecord::new(Emotion::Joy, 0);
        rec.apply_stimulus(0.4, 0, INTAKE);
        assert!((rec.intensity - 0.4).abs() < 1e-6);
        assert!((rec.impact_budget - 0.4).abs() < 1e-6);
        assert_eq!(rec.stimulus_count, 1);
        assert!((rec.cadence_ema - DEFAULT_CADENCE).abs() < f32::EPSILON);
    }

    #[test]
    fn stimulus_is_clamped() {
        let mut rec = EmotionRecord::new(Emotion::Joy, 0);
        rec.apply_stimulus(50.0, 0, INTAKE);
        assert!((rec.intensity - MAX_STIMULUS).abs() < 1e-6);
        rec.apply_stimulus(f32::NAN, 1, INTAKE);
        assert!(rec.intensity.is_finite());
    }

    #[test]
    fn suppression_subtracts_and_floors() {
        let mut rec = EmotionRecord::new(Emotion::Anger, 0);
        rec.apply_stimulus(0.5, 0, INTAKE);
        rec.apply_stimulus(-0.2, 10, INTAKE);
        assert!((rec.intensity - 0.3).abs() < 1e-5);
        rec.apply_stimulus(-5.0, 20, INTAKE);
        assert!(rec.intensity.abs() < f32::EPSILON);
        assert!(rec.impact_budget.abs() < f32::EPSILON);
    }

    #[test]
    fn fast_repeats_habituate() {
        let mut rec = EmotionRecord::new(Emotion::Fear, 0);
        for i in 0..10 {
            rec.apply_stimulus(0.5, i * 20, INTAKE);
        }
        assert!(rec.sensitisation_gain < 1.0);
        assert!(rec.habituation_slope > 1.0);
        assert!(rec.cadence_ema < DEFAULT_CADENCE);
    }

    #[test]
    fn long_gaps_sensitize() {
        let mut rec = EmotionRecord::new(Emotion::Curiosity, 0);
        rec.apply_stimulus(0.3, 0, INTAKE);
        rec.apply_stimulus(0.3, 3_000, INTAKE);
        assert!(rec.sensitisation_gain > 1.0);
        assert!(rec.sensitisation_gain <= GAIN_MAX);
    }

    #[test]
    fn impact_respects_dynamic_cap() {
        let mut rec = EmotionRecord::new(Emotion::Joy, 0);
        let intake = Intake {
            bias: 1.6,
            dynamic_cap: 1.0,
        };
        for i in 0..20 {
            rec.apply_stimulus(0.5, i * 1_000, intake);
        }
        assert!(rec.impact_budget <= 1.0 + f32::EPSILON);
        assert!(rec.intensity <= 1.0);
    }

    #[test]
    fn decay_halves_at_half_life() {
        let mut rec = EmotionRecord::new(Emotion::Joy, 0);
        rec.apply_stimulus(0.4, 0, INTAKE);
        rec.homeostasis_bias = decay::HOMEOSTASIS_NEUTRAL;
        let half_life = rec.half_life(false);
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let at = half_life.round() as u64;
        rec.apply_decay(at, false, 400.0);
        assert!((rec.intensity - 0.2).abs() < 1e-3);
        assert!((rec.impact_budget - 0.2).abs() < 1e-3);
    }

    #[test]
    fn decay_is_noop_without_elapsed_time() {
        let mut rec = EmotionRecord::new(Emotion::Joy, 100);
        rec.apply_stimulus(0.4, 100, INTAKE);
        let before = rec.clone();
        rec.apply_decay(100, false, 400.0);
        rec.apply_decay(50, false, 400.0);
        assert_eq!(rec, before);
    }

    #[test]
    fn contagion_is_capped_both_ways() {
        let mut rec = EmotionRecord::new(Emotion::Joy, 0);
        for _ in 0..10 {
            rec.add_contagion(0.3, 0.4);
        }
        assert!((rec.contagion_share - 0.4).abs() < 1e-6);
        for _ in 0..10 {
            rec.add_contagion(-0.3, 0.4);
        }
        assert!((rec.contagion_share + 0.4).abs() < 1e-6);
    }

    #[test]
    fn negligible_after_full_decay() {
        let mut rec = EmotionRecord::new(Emotion::Cheer, 0);
        rec.apply_stimulus(0.2, 0, INTAKE);
        rec.apply_decay(50_000, false, 400.0);
        assert!(rec.is_negligible(1e-3));
    }

    #[test]
    fn guards_follow_context() {
        let mut rec = EmotionRecord::new(Emotion::Fear, 0);
        let factors = ContextFactors {
            bond: 1.0,
            danger: 1.0,
            ..ContextFactors::NEUTRAL
        };
        rec.update_guards(&factors);
        assert!((rec.relationship_guard - 1.15).abs() < 1e-6);
        assert!((rec.danger_window - 1.0).abs() < f32::EPSILON);
        assert!((0.4..=1.0).contains(&rec.appraisal_confidence));
    }
}
