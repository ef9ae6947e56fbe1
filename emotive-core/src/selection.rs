//! Active-set selection — which live emotions are loud enough to count.
//!
//! For every record surviving decay:
//!   freshness = exp(−age / cadence)
//!   frequency = clamp(median_cadence / cadence, 0, 3.5)
//!   signal    = intensity · (0.35 + 0.65 · freshness)
//!             + 0.3 · √max(0, frequency · impact)
//!
//! Records whose signal reaches 60% of the median signal survive. The
//! survivor set is never empty while at least one record exists.

use crate::emotion::Emotion;
use crate::record::EmotionRecord;
use crate::stats::{median_of, percentile_of};
use crate::types::Tick;

/// Share of the median signal a record needs to survive.
pub const SURVIVAL_FRACTION: f32 = 0.6;
/// Upper bound on the frequency ratio.
pub const MAX_FREQUENCY_RATIO: f32 = 3.5;

/// Per-record scores computed by the selector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Candidate {
    /// Emotion of the scored record.
    pub emotion: Emotion,
    /// `exp(−age / cadence)`.
    pub freshness: f32,
    /// Cadence relative to the median cadence.
    pub frequency: f32,
    /// Combined loudness score.
    pub signal: f32,
}

/// Result of one selection pass.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    /// Records that made the cut, in emotion order.
    pub survivors: Vec<Candidate>,
    /// Median cadence across the live records.
    pub median_cadence: f32,
    /// 20th percentile intensity.
    pub quiet_floor: f32,
    /// 65th percentile intensity.
    pub quiet_ceiling: f32,
    /// Median signal across the live records.
    pub median_signal: f32,
}

impl Selection {
    /// Survivor entry for `emotion`, if it made the cut.
    #[must_use]
    pub fn get(&self, emotion: Emotion) -> Option<&Candidate> {
        self.survivors.iter().find(|c| c.emotion == emotion)
    }
}

/// Score one record against the median cadence.
#[must_use]
pub fn score(record: &EmotionRecord, now: Tick, median_cadence: f32) -> Candidate {
    let cadence = record.cadence_ema.max(1.0);
    let freshness = record.freshness(now);
    let frequency = (median_cadence / cadence).clamp(0.0, MAX_FREQUENCY_RATIO);
    let signal = record.intensity * (0.35 + 0.65 * freshness)
        + 0.3 * (frequency * record.impact_budget).max(0.0).sqrt();
    Candidate {
        emotion: record.emotion,
        freshness,
        frequency,
        signal,
    }
}

/// Select the active set from the live records.
///
/// `scratch` is reused across calls for the percentile work.
pub fn select(records: &[&EmotionRecord], now: Tick, scratch: &mut Vec<f32>) -> Selection {
    if records.is_empty() {
        return Selection::default();
    }

    let median_cadence = median_of(records.iter().map(|r| r.cadence_ema.max(1.0)), scratch);
    let quiet_floor = percentile_of(records.iter().map(|r| r.intensity), 0.20, scratch);
    let quiet_ceiling = percentile_of(records.iter().map(|r| r.intensity), 0.65, scratch);

    let scored: Vec<Candidate> = records
        .iter()
        .map(|r| score(r, now, median_cadence))
        .collect();
    let median_signal = median_of(scored.iter().map(|c| c.signal), scratch);
    let cutoff = SURVIVAL_FRACTION * median_signal;

    let mut survivors: Vec<Candidate> = scored
        .iter()
        .copied()
        .filter(|c| c.signal >= cutoff)
        .collect();
    if survivors.is_empty() {
        if let Some(best) = scored
            .iter()
            .copied()
            .max_by(|a, b| a.signal.total_cmp(&b.signal))
        {
            survivors.push(best);
        }
    }

    Selection {
        survivors,
        median_cadence,
        quiet_floor,
        quiet_ceiling,
        median_signal,
    }
}
