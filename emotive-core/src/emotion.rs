//! Emotion kinds — the input vocabulary of the engine.
//!
//! The set is closed: every emotion has an authored valence, a linger
//! class, an ongoing-condition entry, and a default spread over moods.
//! Hosts may override the mood spread and the condition table through
//! configuration, but never add new kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::mood::Mood;

/// A discrete emotion a character can feel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Emotion {
    /// Plain happiness.
    Joy,
    /// Bright, outward good spirits.
    Cheer,
    /// Quiet satisfaction.
    Contentment,
    /// Tension released.
    Relief,
    /// Thankfulness toward a carer.
    Gratitude,
    /// Warmth toward a companion.
    Affection,
    /// Satisfaction in an accomplishment.
    Pride,
    /// Urge to play.
    Playfulness,
    /// Urge to explore.
    Curiosity,
    /// Awe at something vast or strange.
    Wonder,
    /// Deep stillness.
    Serenity,
    /// High-energy anticipation.
    Excitement,
    /// Resolve to see something through.
    Determination,
    /// Urge to guard a companion.
    Protectiveness,
    /// Fond memory of the past.
    Nostalgia,
    /// Immediate fright.
    Fear,
    /// Slow, looming fear.
    Dread,
    /// Diffuse worry.
    Anxiety,
    /// Hostility.
    Anger,
    /// Blocked intent.
    Frustration,
    /// Sorrow.
    Sadness,
    /// Missing company.
    Loneliness,
    /// Missing a specific companion.
    Longing,
    /// Nothing to do.
    Boredom,
}

/// Emotional valence of a kind; negative emotions linger longer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Valence {
    /// Pleasant.
    Positive,
    /// Neither.
    Neutral,
    /// Unpleasant.
    Negative,
}

/// How long an emotion tends to hang around relative to its cadence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Linger {
    /// Fades quickly once stimuli stop.
    Fleeting,
    /// Default behaviour.
    Normal,
    /// Stays long after the trigger.
    Lingering,
}

impl Linger {
    /// Half-life multiplier for this class.
    #[must_use]
    pub const fn half_life_multiplier(self) -> f32 {
        match self {
            Self::Fleeting => 0.6,
            Self::Normal => 1.0,
            Self::Lingering => 1.5,
        }
    }
}

/// The external situation that keeps an emotion "live" while it lasts.
///
/// While the condition holds, the emotion decays far slower and earns a
/// persistence bonus in weight synthesis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerCondition {
    /// The owner/companion is away.
    OwnerAbsent,
    /// A danger event happened inside the danger window.
    DangerRecent,
    /// Health is below the configured low-health fraction.
    LowHealth,
    /// A care event happened inside the care window.
    CareRecent,
    /// Ask the host's custom predicate.
    Host,
}

impl Emotion {
    /// Number of emotion kinds.
    pub const COUNT: usize = 24;

    /// All emotions in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Joy,
        Self::Cheer,
        Self::Contentment,
        Self::Relief,
        Self::Gratitude,
        Self::Affection,
        Self::Pride,
        Self::Playfulness,
        Self::Curiosity,
        Self::Wonder,
        Self::Serenity,
        Self::Excitement,
        Self::Determination,
        Self::Protectiveness,
        Self::Nostalgia,
        Self::Fear,
        Self::Dread,
        Self::Anxiety,
        Self::Anger,
        Self::Frustration,
        Self::Sadness,
        Self::Loneliness,
        Self::Longing,
        Self::Boredom,
    ];

    /// Dense ordinal, usable as an array index.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Lower-case identifier as used in configuration files.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Joy => "joy",
            Self::Cheer => "cheer",
            Self::Contentment => "contentment",
            Self::Relief => "relief",
            Self::Gratitude => "gratitude",
            Self::Affection => "affection",
            Self::Pride => "pride",
            Self::Playfulness => "playfulness",
            Self::Curiosity => "curiosity",
            Self::Wonder => "wonder",
            Self::Serenity => "serenity",
            Self::Excitement => "excitement",
            Self::Determination => "determination",
            Self::Protectiveness => "protectiveness",
            Self::Nostalgia => "nostalgia",
            Self::Fear => "fear",
            Self::Dread => "dread",
            Self::Anxiety => "anxiety",
            Self::Anger => "anger",
            Self::Frustration => "frustration",
            Self::Sadness => "sadness",
            Self::Loneliness => "loneliness",
            Self::Longing => "longing",
            Self::Boredom => "boredom",
        }
    }

    /// Authored valence.
    #[must_use]
    pub const fn valence(self) -> Valence {
        match self {
            Self::Fear
            | Self::Dread
            | Self::Anxiety
            | Self::Anger
            | Self::Frustration
            | Self::Sadness
            | Self::Loneliness
            | Self::Longing
            | Self::Boredom => Valence::Negative,
            Self::Protectiveness | Self::Nostalgia => Valence::Neutral,
            _ => Valence::Positive,
        }
    }

    /// Whether the negativity bias applies.
    #[must_use]
    pub const fn is_negative(self) -> bool {
        matches!(self.valence(), Valence::Negative)
    }

    /// Emotions tied to a specific bond, scaled by the record's
    /// relationship guard.
    #[must_use]
    pub const fn is_attachment(self) -> bool {
        matches!(
            self,
            Self::Affection
                | Self::Gratitude
                | Self::Loneliness
                | Self::Longing
                | Self::Nostalgia
                | Self::Protectiveness
        )
    }

    /// Threat responses, amplified inside the record's danger window.
    #[must_use]
    pub const fn is_fear_class(self) -> bool {
        matches!(self, Self::Fear | Self::Dread | Self::Anxiety)
    }

    /// Authored linger class.
    #[must_use]
    pub const fn linger(self) -> Linger {
        match self {
            Self::Affection
            | Self::Gratitude
            | Self::Longing
            | Self::Nostalgia
            | Self::Sadness
            | Self::Loneliness => Linger::Lingering,
            Self::Cheer | Self::Playfulness | Self::Excitement | Self::Boredom => Linger::Fleeting,
            _ => Linger::Normal,
        }
    }

    /// Default ongoing-condition entry.
    #[must_use]
    pub const fn default_condition(self) -> TriggerCondition {
        match self {
            Self::Loneliness | Self::Longing => TriggerCondition::OwnerAbsent,
            Self::Fear | Self::Dread | Self::Anxiety | Self::Anger | Self::Protectiveness => {
                TriggerCondition::DangerRecent
            }
            Self::Frustration | Self::Sadness => TriggerCondition::LowHealth,
            Self::Gratitude | Self::Affection | Self::Relief | Self::Contentment => {
                TriggerCondition::CareRecent
            }
            _ => TriggerCondition::Host,
        }
    }

    /// Authored spread over moods. Each row sums to 1.
    #[must_use]
    pub const fn default_moods(self) -> &'static [(Mood, f32)] {
        use Mood::{
            Afraid, Angry, Bonded, Calm, Curious, Focused, Happy, Passionate, Playful, Protective,
            Restless, Sad, Saudade, Yugen,
        };
        match self {
            Self::Joy => &[(Happy, 0.85), (Playful, 0.15)],
            Self::Cheer => &[(Happy, 0.5), (Playful, 0.5)],
            Self::Contentment => &[(Calm, 0.6), (Happy, 0.4)],
            Self::Relief => &[(Calm, 0.5), (Happy, 0.3), (Bonded, 0.2)],
            Self::Gratitude => &[(Bonded, 0.6), (Happy, 0.4)],
            Self::Affection => &[(Bonded, 0.7), (Happy, 0.3)],
            Self::Pride => &[(Focused, 0.4), (Happy, 0.3), (Passionate, 0.3)],
            Self::Playfulness => &[(Playful, 0.7), (Happy, 0.3)],
            Self::Curiosity => &[(Curious, 0.75), (Playful, 0.25)],
            Self::Wonder => &[(Curious, 0.4), (Yugen, 0.4), (Calm, 0.2)],
            Self::Serenity => &[(Calm, 0.7), (Yugen, 0.3)],
            Self::Excitement => &[(Passionate, 0.5), (Playful, 0.3), (Happy, 0.2)],
            Self::Determination => &[(Focused, 0.7), (Passionate, 0.3)],
            Self::Protectiveness => &[(Protective, 0.7), (Focused, 0.3)],
            Self::Nostalgia => &[(Saudade, 0.5), (Calm, 0.3), (Bonded, 0.2)],
            Self::Fear => &[(Afraid, 0.7), (Restless, 0.3)],
            Self::Dread => &[(Afraid, 0.5), (Restless, 0.3), (Sad, 0.2)],
            Self::Anxiety => &[(Restless, 0.6), (Afraid, 0.4)],
            Self::Anger => &[(Angry, 0.75), (Protective, 0.25)],
            Self::Frustration => &[(Angry, 0.5), (Restless, 0.5)],
            Self::Sadness => &[(Sad, 0.8), (Calm, 0.2)],
            Self::Loneliness => &[(Sad, 0.5), (Saudade, 0.3), (Restless, 0.2)],
            Self::Longing => &[(Saudade, 0.6), (Sad, 0.2), (Bonded, 0.2)],
            Self::Boredom => &[(Restless, 0.6), (Sad, 0.4)],
        }
    }
}

impl fmt::Display for Emotion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Emotion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|e| e.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown emotion: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_dense() {
        for (i, emotion) in Emotion::ALL.iter().enumerate() {
            assert_eq!(emotion.index(), i);
        }
    }

    #[test]
    fn default_rows_sum_to_one() {
        for emotion in Emotion::ALL {
            let row = emotion.default_moods();
            assert!((2..=4).contains(&row.len()), "{emotion} spreads over {} moods", row.len());
            let sum: f32 = row.iter().map(|(_, w)| w).sum();
            assert!((sum - 1.0).abs() < 1e-5, "{emotion} row sums to {sum}");
        }
    }

    #[test]
    fn parse_round_trips_names() {
        for emotion in Emotion::ALL {
            assert_eq!(emotion.name().parse::<Emotion>(), Ok(emotion));
        }
        assert_eq!("FEAR".parse::<Emotion>(), Ok(Emotion::Fear));
        assert!("ennui".parse::<Emotion>().is_err());
    }

    #[test]
    fn negative_emotions_are_tagged() {
        assert!(Emotion::Fear.is_negative());
        assert!(Emotion::Loneliness.is_negative());
        assert!(!Emotion::Joy.is_negative());
        assert!(!Emotion::Protectiveness.is_negative());
    }
}
