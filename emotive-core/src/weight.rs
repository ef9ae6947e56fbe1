//! Weight synthesis — how much each surviving emotion counts this cycle.
//!
//! weight = profile_bias · (base + recency + persistence + habituation
//!                          + context + guard + contagion)
//!
//! Where:
//!   base        = intensity · (1 + clamp(impact / impact_cap, 0, 1.5))
//!   recency     = up to +0.4, fading linearly over 60 ticks after a stimulus
//!   persistence = +0.3 · intensity while the triggering condition holds
//!   habituation = up to −0.2 when the cadence is under 100 ticks
//!   context     = explicit per-emotion table over bond, danger and health
//!   guard       = attachment emotions: (relationship_guard − 1) · intensity;
//!                 fear class: +0.2 · danger_window · intensity
//!   contagion   = the record's contagion share
//!
//! The result is clamped to `[0, weight_cap]` with
//! `weight_cap = max(1.5 · impact_cap, 6)` and
//! `impact_cap = max(4, p95(impact))`.

use serde::{Deserialize, Serialize};

use crate::context::ContextFactors;
use crate::emotion::Emotion;
use crate::record::EmotionRecord;
use crate::stats::percentile_of;
use crate::types::Tick;

/// Floor of the impact cap.
pub const MIN_IMPACT_CAP: f32 = 4.0;
/// Floor of the weight cap.
pub const MIN_WEIGHT_CAP: f32 = 6.0;
/// Largest recency boost, right at the stimulus.
pub const RECENCY_BOOST: f32 = 0.4;
/// Ticks over which the recency boost fades out.
pub const RECENCY_WINDOW: f32 = 60.0;
/// Persistence bonus per unit of intensity.
pub const PERSISTENCE_BONUS: f32 = 0.3;
/// Largest habituation penalty.
pub const HABITUATION_PENALTY: f32 = 0.2;
/// Cadence under which stimuli count as arriving unusually fast.
pub const FAST_CADENCE: f32 = 100.0;
/// Fear-class bonus per unit of intensity at full danger.
pub const DANGER_WINDOW_BONUS: f32 = 0.2;

// ---------------------------------------------------------------------------
// Caps
// ---------------------------------------------------------------------------

/// `max(4, p95 impact)` over the live records.
pub fn impact_cap<'a, I>(records: I, scratch: &mut Vec<f32>) -> f32
where
    I: IntoIterator<Item = &'a EmotionRecord>,
{
    percentile_of(records.into_iter().map(|r| r.impact_budget), 0.95, scratch).max(MIN_IMPACT_CAP)
}

/// `max(1.5 · impact_cap, 6)`.
#[must_use]
pub fn weight_cap(impact_cap: f32) -> f32 {
    (1.5 * impact_cap).max(MIN_WEIGHT_CAP)
}

// ---------------------------------------------------------------------------
// Nature profile
// ---------------------------------------------------------------------------

/// One nominated emotion in a nature profile.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct NatureSlot {
    /// The favored (or disfavored) emotion.
    pub emotion: Emotion,
    /// Signed strength in `[-1, 1]`.
    pub strength: f32,
}

/// Per-entity temperament: up to three emotions with their own bias bounds.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct NatureProfile {
    /// Strongest slot: scale 0.35, bias in `[0.7, 1.4]`.
    #[serde(default)]
    pub major: Option<NatureSlot>,
    /// Scale 0.2, bias in `[0.8, 1.25]`.
    #[serde(default)]
    pub minor: Option<NatureSlot>,
    /// Scale 0.15, bias in `[0.8, 1.15]`.
    #[serde(default)]
    pub quirk: Option<NatureSlot>,
}

impl NatureProfile {
    /// Bias for `emotion`; `1.0` when the profile doesn't mention it.
    ///
    /// If the same emotion fills several slots, the most significant wins.
    #[must_use]
    pub fn bias(&self, emotion: Emotion) -> f32 {
        let slots = [
            (self.major, 0.35, 0.7, 1.4),
            (self.minor, 0.2, 0.8, 1.25),
            (self.quirk, 0.15, 0.8, 1.15),
        ];
        slots
            .into_iter()
            .find_map(|(slot, scale, lo, hi)| {
                slot.filter(|s| s.emotion == emotion).map(|s| {
                    let strength = if s.strength.is_finite() {
                        s.strength.clamp(-1.0, 1.0)
                    } else {
                        0.0
                    };
                    (1.0 + strength * scale).clamp(lo, hi)
                })
            })
            .unwrap_or(1.0)
    }
}

// ---------------------------------------------------------------------------
// Synthesis
// ---------------------------------------------------------------------------

/// Per-term breakdown of one synthesized weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightBreakdown {
    /// Intensity scaled by relative impact.
    pub base: f32,
    /// Freshness reward.
    pub recency: f32,
    /// Ongoing-condition bonus.
    pub persistence: f32,
    /// Fast-cadence penalty (≤ 0).
    pub habituation: f32,
    /// Context table term.
    pub context: f32,
    /// Record guard term (relationship guard or danger window).
    pub guard: f32,
    /// Contagion share.
    pub contagion: f32,
    /// Nature-profile bias.
    pub bias: f32,
    /// Final clamped weight.
    pub total: f32,
}

/// Cycle-wide inputs shared by every record.
#[derive(Debug, Clone, Copy)]
pub struct WeightInputs<'a> {
    /// Derived context.
    pub factors: &'a ContextFactors,
    /// Current impact cap.
    pub impact_cap: f32,
    /// Current weight cap.
    pub weight_cap: f32,
    /// Evaluation tick.
    pub now: Tick,
}

/// Synthesize the weight of one survivor.
#[must_use]
pub fn synthesize(
    record: &EmotionRecord,
    condition_ongoing: bool,
    bias: f32,
    inputs: &WeightInputs<'_>,
) -> WeightBreakdown {
    let impact_ratio = (record.impact_budget / inputs.impact_cap.max(f32::EPSILON)).clamp(0.0, 1.5);
    let base = record.intensity * (1.0 + impact_ratio);

    let age = record.age(inputs.now);
    let recency = if record.stimulus_count > 0 && age < RECENCY_WINDOW {
        RECENCY_BOOST * (1.0 - age / RECENCY_WINDOW)
    } else {
        0.0
    };

    let persistence = if condition_ongoing {
        PERSISTENCE_BONUS * record.intensity
    } else {
        0.0
    };

    let habituation = if record.cadence_ema < FAST_CADENCE {
        -HABITUATION_PENALTY * (FAST_CADENCE - record.cadence_ema.max(0.0)) / FAST_CADENCE
    } else {
        0.0
    };

    let context = context_modulation(record.emotion, inputs.factors);
    let guard = guard_term(record);
    let contagion = record.contagion_share;

    let raw = base + recency + persistence + habituation + context + guard + contagion;
    let total = (bias * raw).clamp(0.0, inputs.weight_cap);

    WeightBreakdown {
        base,
        recency,
        persistence,
        habituation,
        context,
        guard,
        contagion,
        bias,
        total: if total.is_finite() { total } else { 0.0 },
    }
}

/// Term from the guards `EmotionRecord::update_guards` left on the record.
///
/// Zero for a record whose guards were never updated.
#[must_use]
pub fn guard_term(record: &EmotionRecord) -> f32 {
    if record.emotion.is_attachment() {
        (record.relationship_guard - 1.0) * record.intensity
    } else if record.emotion.is_fear_class() {
        DANGER_WINDOW_BONUS * record.danger_window.clamp(0.0, 1.0) * record.intensity
    } else {
        0.0
    }
}

/// Additive context term for one emotion.
///
/// Danger amplifies fear-class emotions by up to +0.4 and suppresses
/// calm-class emotions by up to −0.3. Hurt (missing health) amplifies
/// distress and drags down high-energy positive emotions. Bond feeds the
/// attachment emotions, mostly while the owner is away.
#[must_use]
pub fn context_modulation(emotion: Emotion, f: &ContextFactors) -> f32 {
    let danger = f.danger;
    let bond = f.bond;
    let hurt = 1.0 - f.health;
    let missing = if f.owner_present { 0.0 } else { bond };

    match emotion {
        Emotion::Joy => 0.05 * bond - 0.15 * hurt - 0.1 * danger,
        Emotion::Cheer => -0.2 * danger - 0.2 * hurt,
        Emotion::Contentment => 0.1 * f.care - 0.3 * danger,
        Emotion::Relief => 0.1 * f.care,
        Emotion::Gratitude => 0.15 * f.care * bond,
        Emotion::Affection => 0.2 * bond - 0.1 * danger,
        Emotion::Pride => 0.0,
        Emotion::Playfulness => -0.2 * danger - 0.25 * hurt,
        Emotion::Curiosity => -0.15 * danger,
        Emotion::Wonder => -0.1 * danger,
        Emotion::Serenity => -0.3 * danger,
        Emotion::Excitement => -0.2 * hurt,
        Emotion::Determination => 0.1 * danger,
        Emotion::Protectiveness => 0.1 * danger + 0.2 * danger * bond,
        Emotion::Nostalgia => 0.1 * missing,
        Emotion::Fear => 0.4 * danger + 0.1 * hurt,
        Emotion::Dread => 0.35 * danger,
        Emotion::Anxiety => 0.3 * danger + 0.1 * hurt,
        Emotion::Anger => 0.25 * danger,
        Emotion::Frustration => 0.2 * hurt,
        Emotion::Sadness => 0.2 * hurt + 0.1 * missing,
        Emotion::Loneliness => 0.25 * missing,
        Emotion::Longing => 0.2 * missing,
        Emotion::Boredom => -0.1 * danger,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Intake;

    fn record(emotion: Emotion, amount: f32) -> EmotionRecord {
        let mut rec = EmotionRecord::new(emotion, 0);
        rec.apply_stimulus(
            amount,
            0,
            Intake {
                bias: 1.0,
                dynamic_cap: 6.0,
            },
        );
        rec
    }

    fn inputs(factors: &ContextFactors, now: Tick) -> WeightInputs<'_> {
        WeightInputs {
            factors,
            impact_cap: MIN_IMPACT_CAP,
            weight_cap: weight_cap(MIN_IMPACT_CAP),
            now,
        }
    }

    #[test]
    fn caps_have_floors() {
        let rec = record(Emotion::Joy, 0.5);
        let mut scratch = Vec::new();
        assert!((impact_cap([&rec], &mut scratch) - MIN_IMPACT_CAP).abs() < f32::EPSILON);
        assert!((weight_cap(1.0) - MIN_WEIGHT_CAP).abs() < f32::EPSILON);
        assert!((weight_cap(10.0) - 15.0).abs() < f32::EPSILON);
    }

    #[test]
    fn recency_boost_fades_over_window() {
        let rec = record(Emotion::Joy, 0.4);
        let f = ContextFactors::NEUTRAL;
        let fresh = synthesize(&rec, false, 1.0, &inputs(&f, 0));
        let half = synthesize(&rec, false, 1.0, &inputs(&f, 30));
        let gone = synthesize(&rec, false, 1.0, &inputs(&f, 60));
        assert!((fresh.recency - RECENCY_BOOST).abs() < 1e-6);
        assert!((half.recency - RECENCY_BOOST / 2.0).abs() < 1e-6);
        assert!(gone.recency.abs() < f32::EPSILON);
    }

    #[test]
    fn ongoing_condition_adds_persistence() {
        let rec = record(Emotion::Loneliness, 0.4);
        let f = ContextFactors::NEUTRAL;
        let on = synthesize(&rec, true, 1.0, &inputs(&f, 100));
        let off = synthesize(&rec, false, 1.0, &inputs(&f, 100));
        assert!((on.total - off.total - PERSISTENCE_BONUS * rec.intensity).abs() < 1e-6);
    }

    #[test]
    fn fast_cadence_is_penalized() {
        let mut rec = record(Emotion::Fear, 0.4);
        rec.cadence_ema = 20.0;
        let f = ContextFactors::NEUTRAL;
        let w = synthesize(&rec, false, 1.0, &inputs(&f, 100));
        assert!((w.habituation + 0.16).abs() < 1e-6);
    }

    #[test]
    fn danger_amplifies_fear_and_suppresses_calm() {
        let danger = ContextFactors {
            danger: 1.0,
            ..ContextFactors::NEUTRAL
        };
        assert!((context_modulation(Emotion::Fear, &danger) - 0.4).abs() < 1e-6);
        assert!((context_modulation(Emotion::Serenity, &danger) + 0.3).abs() < 1e-6);
        for emotion in Emotion::ALL {
            assert!(context_modulation(emotion, &ContextFactors::NEUTRAL).abs() < 1e-6);
        }
    }

    #[test]
    fn bond_guard_scales_attachment_weight() {
        let f = ContextFactors::NEUTRAL;
        let mut distant = record(Emotion::Affection, 0.5);
        let mut bonded = distant.clone();
        distant.update_guards(&f);
        bonded.update_guards(&ContextFactors { bond: 1.0, ..f });

        let low = synthesize(&distant, false, 1.0, &inputs(&f, 100));
        let high = synthesize(&bonded, false, 1.0, &inputs(&f, 100));
        assert!(low.guard < 0.0);
        assert!(high.guard > 0.0);
        assert!(high.total > low.total);

        // Joy carries no guard term whatever the bond.
        let mut joy = record(Emotion::Joy, 0.5);
        joy.update_guards(&ContextFactors { bond: 1.0, ..f });
        assert!(synthesize(&joy, false, 1.0, &inputs(&f, 100)).guard.abs() < f32::EPSILON);
    }

    #[test]
    fn danger_window_amplifies_fear_class_only() {
        let f = ContextFactors::NEUTRAL;
        let danger = ContextFactors { danger: 1.0, ..f };
        for emotion in [Emotion::Fear, Emotion::Dread, Emotion::Anxiety] {
            let mut rec = record(emotion, 0.5);
            rec.update_guards(&danger);
            let w = synthesize(&rec, false, 1.0, &inputs(&f, 100));
            assert!(w.guard > 0.0);
            assert!((w.guard - DANGER_WINDOW_BONUS * rec.intensity).abs() < 1e-6);
        }
        let mut anger = record(Emotion::Anger, 0.5);
        anger.update_guards(&danger);
        assert!(guard_term(&anger).abs() < f32::EPSILON);
    }

    #[test]
    fn weight_is_clamped() {
        let mut rec = record(Emotion::Joy, 0.5);
        rec.contagion_share = -5.0;
        let f = ContextFactors::NEUTRAL;
        assert!(synthesize(&rec, false, 1.0, &inputs(&f, 100)).total.abs() < f32::EPSILON);
        rec.contagion_share = 50.0;
        let capped = synthesize(&rec, false, 1.4, &inputs(&f, 100));
        assert!((capped.total - weight_cap(MIN_IMPACT_CAP)).abs() < f32::EPSILON);
    }

    #[test]
    fn nature_bias_respects_slot_bounds() {
        let profile = NatureProfile {
            major: Some(NatureSlot {
                emotion: Emotion::Curiosity,
                strength: 1.0,
            }),
            minor: Some(NatureSlot {
                emotion: Emotion::Fear,
                strength: -1.0,
            }),
            quirk: Some(NatureSlot {
                emotion: Emotion::Wonder,
                strength: 9.0,
            }),
        };
        assert!((profile.bias(Emotion::Curiosity) - 1.35).abs() < 1e-6);
        assert!((profile.bias(Emotion::Fear) - 0.8).abs() < 1e-6);
        assert!((profile.bias(Emotion::Wonder) - 1.15).abs() < 1e-6);
        assert!((profile.bias(Emotion::Joy) - 1.0).abs() < f32::EPSILON);
    }
}
