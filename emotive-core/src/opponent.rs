//! Opponent transfer — mixed feelings resolve toward the stronger side.
//!
//! For each configured pair where both sides survived selection, strongest
//! combined weight first, the weaker side donates
//!   fraction = min(0.30, 0.15 + 0.1 · |difference|)
//! of its weight. 85% of the donation reaches the stronger side; the other
//! 15% partially rebounds to the donor, scaled by both sides' appraisal
//! confidence.

use tracing::trace;

use crate::context::EmotionSet;
use crate::emotion::Emotion;

/// Cap on the donated fraction.
pub const MAX_DONATION: f32 = 0.30;
/// Donated fraction at zero difference.
pub const BASE_DONATION: f32 = 0.15;
/// Extra donated fraction per unit of weight difference.
pub const DONATION_SLOPE: f32 = 0.1;
/// Share of the donation the stronger side receives.
pub const TRANSFER_EFFICIENCY: f32 = 0.85;

/// Symmetric opponent pairs, in configuration order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpponentTable {
    pairs: Vec<(Emotion, Emotion)>,
}

impl Default for OpponentTable {
    fn default() -> Self {
        Self::new([
            (Emotion::Cheer, Emotion::Dread),
            (Emotion::Joy, Emotion::Sadness),
            (Emotion::Serenity, Emotion::Anxiety),
            (Emotion::Affection, Emotion::Anger),
            (Emotion::Curiosity, Emotion::Boredom),
            (Emotion::Contentment, Emotion::Frustration),
            (Emotion::Relief, Emotion::Fear),
            (Emotion::Playfulness, Emotion::Loneliness),
        ])
    }
}

impl OpponentTable {
    /// Build a table, dropping self-pairs and duplicates in either orientation.
    pub fn new<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Emotion, Emotion)>,
    {
        let mut out: Vec<(Emotion, Emotion)> = Vec::new();
        for (a, b) in pairs {
            if a == b {
                continue;
            }
            if out
                .iter()
                .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
            {
                continue;
            }
            out.push((a, b));
        }
        Self { pairs: out }
    }

    /// An empty table: nothing opposes anything.
    #[must_use]
    pub fn empty() -> Self {
        Self { pairs: Vec::new() }
    }

    /// Configured pairs.
    #[must_use]
    pub fn pairs(&self) -> &[(Emotion, Emotion)] {
        &self.pairs
    }

    /// Whether `a` and `b` oppose each other.
    #[must_use]
    pub fn opposes(&self, a: Emotion, b: Emotion) -> bool {
        self.pairs
            .iter()
            .any(|&(x, y)| (x == a && y == b) || (x == b && y == a))
    }

    /// Resolve every pair whose sides both survived.
    ///
    /// `weights` and `confidence` are indexed by [`Emotion::index`]. Weights
    /// are updated in place and kept within `[0, weight_cap]`.
    pub fn resolve(
        &self,
        weights: &mut [f32; Emotion::COUNT],
        confidence: &[f32; Emotion::COUNT],
        survivors: EmotionSet,
        weight_cap: f32,
    ) -> Vec<Transfer> {
        let mut active: Vec<(Emotion, Emotion)> = self
            .pairs
            .iter()
            .copied()
            .filter(|&(a, b)| survivors.contains(a) && survivors.contains(b))
            .collect();
        active.sort_by(|&(a1, b1), &(a2, b2)| {
            let c1 = weights[a1.index()] + weights[b1.index()];
            let c2 = weights[a2.index()] + weights[b2.index()];
            c2.total_cmp(&c1)
        });

        let mut transfers = Vec::with_capacity(active.len());
        for (a, b) in active {
            let (wa, wb) = (weights[a.index()], weights[b.index()]);
            let (strong, weak) = if wa > wb {
                (a, b)
            } else if wb > wa {
                (b, a)
            } else {
                continue;
            };
            let w_strong = weights[strong.index()];
            let w_weak = weights[weak.index()];
            let diff = w_strong - w_weak;

            let fraction = (BASE_DONATION + DONATION_SLOPE * diff).min(MAX_DONATION);
            let donated = w_weak * fraction;
            let received = donated * TRANSFER_EFFICIENCY;
            let conf = confidence[strong.index()].clamp(0.0, 1.0) * confidence[weak.index()].clamp(0.0, 1.0);
            let rebound = donated * (1.0 - TRANSFER_EFFICIENCY) * conf;

            weights[strong.index()] = (w_strong + received).clamp(0.0, weight_cap);
            weights[weak.index()] = (w_weak - donated + rebound).clamp(0.0, weight_cap);

            trace!(%strong, %weak, donated, rebound, "Opponent transfer");
            transfers.push(Transfer {
                donor: weak,
                recipient: strong,
                donated,
                received,
                rebound,
            });
        }
        transfers
    }
}

/// One resolved opponent transfer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Transfer {
    /// Weaker side.
    pub donor: Emotion,
    /// Stronger side.
    pub recipient: Emotion,
    /// Weight taken from the donor.
    pub donated: f32,
    /// Weight added to the recipient.
    pub received: f32,
    /// Weight handed back to the donor.
    pub rebound: f32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn weights(entries: &[(Emotion, f32)]) -> [f32; Emotion::COUNT] {
        let mut w = [0.0; Emotion::COUNT];
        for &(e, v) in entries {
            w[e.index()] = v;
        }
        w
    }

    #[test]
    fn default_pairs_are_symmetric() {
        let table = OpponentTable::default();
        assert_eq!(table.pairs().len(), 8);
        assert!(table.opposes(Emotion::Dread, Emotion::Cheer));
        assert!(table.opposes(Emotion::Cheer, Emotion::Dread));
        assert!(!table.opposes(Emotion::Joy, Emotion::Fear));
    }

    #[test]
    fn duplicates_and_self_pairs_are_dropped() {
        let table = OpponentTable::new([
            (Emotion::Joy, Emotion::Joy),
            (Emotion::Joy, Emotion::Fear),
            (Emotion::Fear, Emotion::Joy),
        ]);
        assert_eq!(table.pairs(), &[(Emotion::Joy, Emotion::Fear)]);
    }

    #[test]
    fn weaker_side_donates() {
        let table = OpponentTable::default();
        let mut w = weights(&[(Emotion::Cheer, 2.0), (Emotion::Dread, 1.0)]);
        let conf = [1.0; Emotion::COUNT];
        let survivors: EmotionSet = [Emotion::Cheer, Emotion::Dread].into_iter().collect();
        let transfers = table.resolve(&mut w, &conf, survivors, 6.0);

        assert_eq!(transfers.len(), 1);
        let t = transfers[0];
        assert_eq!(t.donor, Emotion::Dread);
        // fraction = min(0.30, 0.15 + 0.1) = 0.25
        assert!((t.donated - 0.25).abs() < 1e-6);
        assert!((w[Emotion::Cheer.index()] - (2.0 + 0.25 * 0.85)).abs() < 1e-6);
        assert!((w[Emotion::Dread.index()] - (0.75 + 0.25 * 0.15)).abs() < 1e-6);
    }

    #[test]
    fn rebound_scales_with_confidence() {
        let table = OpponentTable::default();
        let survivors: EmotionSet = [Emotion::Joy, Emotion::Sadness].into_iter().collect();
        let mut sure = weights(&[(Emotion::Joy, 3.0), (Emotion::Sadness, 1.0)]);
        let mut unsure = sure;
        table.resolve(&mut sure, &[1.0; Emotion::COUNT], survivors, 6.0);
        table.resolve(&mut unsure, &[0.5; Emotion::COUNT], survivors, 6.0);
        assert!(sure[Emotion::Sadness.index()] > unsure[Emotion::Sadness.index()]);
        assert!((sure[Emotion::Joy.index()] - unsure[Emotion::Joy.index()]).abs() < 1e-6);
    }

    #[test]
    fn pairs_need_both_survivors_and_a_winner() {
        let table = OpponentTable::default();
        let conf = [1.0; Emotion::COUNT];

        let mut w = weights(&[(Emotion::Cheer, 2.0), (Emotion::Dread, 1.0)]);
        let only_cheer: EmotionSet = [Emotion::Cheer].into_iter().collect();
        assert!(table.resolve(&mut w, &conf, only_cheer, 6.0).is_empty());

        let mut tied = weights(&[(Emotion::Cheer, 1.0), (Emotion::Dread, 1.0)]);
        let both: EmotionSet = [Emotion::Cheer, Emotion::Dread].into_iter().collect();
        assert!(table.resolve(&mut tied, &conf, both, 6.0).is_empty());
    }
}
