//! Mood blend aggregation — from weighted emotions to a mood vector.
//!
//! Each survivor spreads its post-transfer weight over moods through the
//! emotion → mood table; the sums are normalized into a target vector, and
//! the persistent blend moves toward it with adaptive momentum:
//!
//!   blend' = normalize(retained · blend + (1 − retained) · target)
//!
//!   retained = momentum × 0.5   strongest contributor fresh (>0.7) and heavy (>2.0)
//!            = momentum × 1.3   strongest contributor stale (<0.3)
//!            = momentum         otherwise
//!
//! The dominant mood only changes when a challenger beats the incumbent by
//! the momentum band.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::emotion::Emotion;
use crate::mood::Mood;

/// Momentum scale when the strongest contributor is a fresh spike.
pub const SPIKE_MOMENTUM_SCALE: f32 = 0.5;
/// Momentum scale when the strongest contributor is stale.
pub const DRIFT_MOMENTUM_SCALE: f32 = 1.3;
/// Bounds on the retained fraction.
pub const MOMENTUM_BOUNDS: (f32, f32) = (0.05, 0.95);

// ---------------------------------------------------------------------------
// Emotion → mood table
// ---------------------------------------------------------------------------

/// Per-emotion spread over moods. `None` rows spread uniformly.
#[derive(Debug, Clone, PartialEq)]
pub struct MoodWeightTable {
    rows: [Option<[f32; Mood::COUNT]>; Emotion::COUNT],
}

impl Default for MoodWeightTable {
    fn default() -> Self {
        Self {
            rows: Emotion::ALL.map(|e| normalized_row(e.default_moods().iter().copied())),
        }
    }
}

impl MoodWeightTable {
    /// Replace one emotion's row. Weights are renormalized to sum to 1;
    /// an empty or all-zero override leaves the emotion unmapped.
    pub fn apply_override<I>(&mut self, emotion: Emotion, entries: I)
    where
        I: IntoIterator<Item = (Mood, f32)>,
    {
        self.rows[emotion.index()] = normalized_row(entries);
    }

    /// Remove one emotion's mapping.
    pub fn clear(&mut self, emotion: Emotion) {
        self.rows[emotion.index()] = None;
    }

    /// Spread of `emotion` over every mood; sums to 1.
    #[must_use]
    pub fn distribution(&self, emotion: Emotion) -> [f32; Mood::COUNT] {
        self.rows[emotion.index()].unwrap_or([1.0 / Mood::COUNT as f32; Mood::COUNT])
    }

    /// The mood `emotion` leans toward most.
    #[must_use]
    pub fn primary_mood(&self, emotion: Emotion) -> Mood {
        argmax(&self.distribution(emotion)).unwrap_or(Mood::BASELINE)
    }
}

fn normalized_row<I>(entries: I) -> Option<[f32; Mood::COUNT]>
where
    I: IntoIterator<Item = (Mood, f32)>,
{
    let mut row = [0.0_f32; Mood::COUNT];
    for (mood, w) in entries {
        if w.is_finite() && w > 0.0 {
            row[mood.index()] += w;
        }
    }
    let total: f32 = row.iter().sum();
    if total <= f32::EPSILON {
        return None;
    }
    for w in &mut row {
        *w /= total;
    }
    Some(row)
}

fn argmax(values: &[f32; Mood::COUNT]) -> Option<Mood> {
    Mood::ALL
        .into_iter()
        .zip(values.iter().copied())
        .fold(None, |best: Option<(Mood, f32)>, (mood, v)| match best {
            Some((_, b)) if b >= v => best,
            _ => Some((mood, v)),
        })
        .map(|(mood, _)| mood)
}

// ---------------------------------------------------------------------------
// Blend vector
// ---------------------------------------------------------------------------

/// Normalized mood vector; entries in `[0, 1]` summing to 1.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MoodBlend([f32; Mood::COUNT]);

impl Default for MoodBlend {
    fn default() -> Self {
        Self::baseline()
    }
}

impl MoodBlend {
    /// `{calm: 1}`.
    #[must_use]
    pub fn baseline() -> Self {
        let mut v = [0.0; Mood::COUNT];
        v[Mood::BASELINE.index()] = 1.0;
        Self(v)
    }

    /// Normalize raw non-negative sums. `None` when nothing is positive.
    #[must_use]
    pub fn from_raw(raw: [f32; Mood::COUNT]) -> Option<Self> {
        let mut v = raw.map(|w| if w.is_finite() { w.max(0.0) } else { 0.0 });
        let total: f32 = v.iter().sum();
        if total <= f32::EPSILON {
            return None;
        }
        for w in &mut v {
            *w = (*w / total).clamp(0.0, 1.0);
        }
        Some(Self(v))
    }

    /// Rebuild from a sparse map, falling back to the baseline.
    ///
    /// A map that already sums to one is taken as-is so saved blends
    /// restore bit-for-bit.
    #[must_use]
    pub fn from_map(map: &BTreeMap<Mood, f32>) -> Self {
        let mut raw = [0.0; Mood::COUNT];
        for (&mood, &w) in map {
            raw[mood.index()] = w;
        }
        let valid = raw.iter().all(|w| w.is_finite() && (0.0..=1.0).contains(w));
        let total: f32 = raw.iter().sum();
        if valid && (total - 1.0).abs() <= 1e-4 {
            return Self(raw);
        }
        Self::from_raw(raw).unwrap_or_default()
    }

    /// Share of one mood.
    #[must_use]
    pub fn get(&self, mood: Mood) -> f32 {
        self.0[mood.index()]
    }

    /// Dense view indexed by [`Mood::index`].
    #[must_use]
    pub fn as_array(&self) -> &[f32; Mood::COUNT] {
        &self.0
    }

    /// Non-zero entries as a map.
    #[must_use]
    pub fn to_map(&self) -> BTreeMap<Mood, f32> {
        Mood::ALL
            .into_iter()
            .filter(|m| self.0[m.index()] > 0.0)
            .map(|m| (m, self.0[m.index()]))
            .collect()
    }

    /// Whether this is exactly the baseline vector.
    #[must_use]
    pub fn is_baseline(&self) -> bool {
        *self == Self::baseline()
    }

    /// Strongest mood; ties go to the lower ordinal.
    #[must_use]
    pub fn strongest(&self) -> Mood {
        argmax(&self.0).unwrap_or(Mood::BASELINE)
    }

    /// Move toward `target`, keeping `retained` of the current vector.
    pub fn merge_toward(&mut self, target: &MoodBlend, retained: f32) {
        let keep = retained.clamp(0.0, 1.0);
        let mut raw = [0.0; Mood::COUNT];
        for (i, w) in raw.iter_mut().enumerate() {
            *w = keep * self.0[i] + (1.0 - keep) * target.0[i];
        }
        if let Some(next) = Self::from_raw(raw) {
            *self = next;
        }
    }
}

/// Sum each emotion's weight over its mood spread into a target blend.
///
/// `None` when the total weight is zero.
#[must_use]
pub fn target_blend(weights: &[(Emotion, f32)], table: &MoodWeightTable) -> Option<MoodBlend> {
    let mut raw = [0.0_f32; Mood::COUNT];
    for &(emotion, weight) in weights {
        if weight <= 0.0 || !weight.is_finite() {
            continue;
        }
        let row = table.distribution(emotion);
        for (acc, share) in raw.iter_mut().zip(row) {
            *acc += weight * share;
        }
    }
    MoodBlend::from_raw(raw)
}

/// Retained fraction of the previous blend for this cycle.
#[must_use]
pub fn adaptive_momentum(base: f32, strongest_freshness: f32, strongest_weight: f32) -> f32 {
    let scale = if strongest_freshness > 0.7 && strongest_weight > 2.0 {
        SPIKE_MOMENTUM_SCALE
    } else if strongest_freshness < 0.3 {
        DRIFT_MOMENTUM_SCALE
    } else {
        1.0
    };
    (base * scale).clamp(MOMENTUM_BOUNDS.0, MOMENTUM_BOUNDS.1)
}

/// Pick the dominant mood with hysteresis.
///
/// The incumbent stays unless the strongest challenger beats it by `band`.
#[must_use]
pub fn select_dominant(blend: &MoodBlend, incumbent: Mood, band: f32) -> Mood {
    let challenger = blend.strongest();
    if challenger == incumbent {
        return incumbent;
    }
    if blend.get(challenger) - blend.get(incumbent) >= band {
        challenger
    } else {
        incumbent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_rows_sum_to_one() {
        let table = MoodWeightTable::default();
        for emotion in Emotion::ALL {
            let sum: f32 = table.distribution(emotion).iter().sum();
            assert!((sum - 1.0).abs() < 1e-5, "{emotion}");
        }
        assert_eq!(table.primary_mood(Emotion::Joy), Mood::Happy);
        assert_eq!(table.primary_mood(Emotion::Fear), Mood::Afraid);
    }

    #[test]
    fn unmapped_emotion_spreads_uniformly() {
        let mut table = MoodWeightTable::default();
        table.apply_override(Emotion::Pride, [(Mood::Happy, 0.0)]);
        let row = table.distribution(Emotion::Pride);
        assert!(row.iter().all(|&w| (w - 1.0 / Mood::COUNT as f32).abs() < 1e-6));
    }

    #[test]
    fn target_blend_normalizes() {
        let table = MoodWeightTable::default();
        let blend = target_blend(&[(Emotion::Joy, 2.0), (Emotion::Fear, 2.0)], &table)
            .expect("non-empty");
        let sum: f32 = blend.as_array().iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert!((blend.get(Mood::Happy) - 0.425).abs() < 1e-5);
        assert!((blend.get(Mood::Afraid) - 0.35).abs() < 1e-5);
        assert!(target_blend(&[(Emotion::Joy, 0.0)], &table).is_none());
    }

    #[test]
    fn baseline_is_exact() {
        let blend = MoodBlend::baseline();
        assert!(blend.is_baseline());
        let map = blend.to_map();
        assert_eq!(map.len(), 1);
        assert_eq!(map.get(&Mood::Calm).copied(), Some(1.0));
    }

    #[test]
    fn merge_keeps_retained_share() {
        let mut blend = MoodBlend::baseline();
        let target = MoodBlend::from_map(&BTreeMap::from([(Mood::Happy, 1.0)]));
        blend.merge_toward(&target, 0.35);
        assert!((blend.get(Mood::Calm) - 0.35).abs() < 1e-6);
        assert!((blend.get(Mood::Happy) - 0.65).abs() < 1e-6);
    }

    #[test]
    fn momentum_adapts_to_strongest_contributor() {
        assert!((adaptive_momentum(0.35, 0.9, 3.0) - 0.175).abs() < 1e-6);
        assert!((adaptive_momentum(0.35, 0.1, 3.0) - 0.455).abs() < 1e-6);
        assert!((adaptive_momentum(0.35, 0.5, 3.0) - 0.35).abs() < 1e-6);
        assert!((adaptive_momentum(0.9, 0.1, 1.0) - 0.95).abs() < 1e-6);
    }

    #[test]
    fn dominant_needs_to_clear_band() {
        let mut raw = [0.0; Mood::COUNT];
        raw[Mood::Happy.index()] = 0.52;
        raw[Mood::Afraid.index()] = 0.48;
        let blend = MoodBlend::from_raw(raw).expect("non-empty");
        assert_eq!(select_dominant(&blend, Mood::Afraid, 0.06), Mood::Afraid);
        assert_eq!(select_dominant(&blend, Mood::Afraid, 0.03), Mood::Happy);
        assert_eq!(select_dominant(&blend, Mood::Calm, 0.06), Mood::Happy);
    }
}
