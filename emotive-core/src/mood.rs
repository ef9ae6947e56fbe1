//! Mood categories — the output vocabulary of the engine.
//!
//! Emotions are what a character *feels*; moods are what the outside world
//! *sees*. Every emotion spreads its weight over two to four moods, and the
//! normalized sum of those contributions is the mood blend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::types::Rgb;

/// Struct literal so palette slices promote to `'static`.
macro_rules! rgb {
    ($r:expr, $g:expr, $b:expr) => {
        Rgb { r: $r, g: $g, b: $b }
    };
}

/// A mood category. `Calm` is the baseline reported when nothing is felt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mood {
    /// Light, positive.
    Happy,
    /// Peaceful, at ease (baseline).
    Calm,
    /// Bouncy, wants to play.
    Playful,
    /// Inquisitive, exploring.
    Curious,
    /// Close to its companion.
    Bonded,
    /// Locked in on a task.
    Focused,
    /// Fired up.
    Passionate,
    /// Jittery, can't settle.
    Restless,
    /// Scared.
    Afraid,
    /// Hostile.
    Angry,
    /// Low, withdrawn.
    Sad,
    /// Guarding someone.
    Protective,
    /// Bittersweet longing for an absent companion.
    Saudade,
    /// Quiet awe at something vast.
    Yugen,
}

/// How rare a mood is; rarer moods need more strength to level up.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoodTier {
    /// Everyday moods.
    Common,
    /// Seen regularly but not constantly.
    Uncommon,
    /// Needs a real situation to show up.
    Rare,
    /// Hardest to reach.
    UltraRare,
}

impl MoodTier {
    /// Default ascending strength thresholds for levels 1, 2 and 3.
    #[must_use]
    pub const fn thresholds(self) -> [f32; 3] {
        match self {
            Self::Common => [0.35, 0.65, 0.88],
            Self::Uncommon => [0.40, 0.70, 0.90],
            Self::Rare => [0.45, 0.75, 0.93],
            Self::UltraRare => [0.50, 0.80, 0.95],
        }
    }
}

impl Mood {
    /// Number of mood categories.
    pub const COUNT: usize = 14;

    /// The mood reported when no emotion is live.
    pub const BASELINE: Self = Self::Calm;

    /// All moods in ordinal order.
    pub const ALL: [Self; Self::COUNT] = [
        Self::Happy,
        Self::Calm,
        Self::Playful,
        Self::Curious,
        Self::Bonded,
        Self::Focused,
        Self::Passionate,
        Self::Restless,
        Self::Afraid,
        Self::Angry,
        Self::Sad,
        Self::Protective,
        Self::Saudade,
        Self::Yugen,
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
            Self::Happy => "happy",
            Self::Calm => "calm",
            Self::Playful => "playful",
            Self::Curious => "curious",
            Self::Bonded => "bonded",
            Self::Focused => "focused",
            Self::Passionate => "passionate",
            Self::Restless => "restless",
            Self::Afraid => "afraid",
            Self::Angry => "angry",
            Self::Sad => "sad",
            Self::Protective => "protective",
            Self::Saudade => "saudade",
            Self::Yugen => "yugen",
        }
    }

    /// Rarity tier.
    #[must_use]
    pub const fn tier(self) -> MoodTier {
        match self {
            Self::Happy | Self::Calm | Self::Playful | Self::Curious | Self::Restless => {
                MoodTier::Common
            }
            Self::Bonded | Self::Focused | Self::Afraid | Self::Sad => MoodTier::Uncommon,
            Self::Angry | Self::Protective | Self::Passionate => MoodTier::Rare,
            Self::Saudade | Self::Yugen => MoodTier::UltraRare,
        }
    }

    /// Colour stops for the mood label, calm-to-intense.
    #[must_use]
    pub const fn palette(self) -> &'static [Rgb] {
        match self {
            Self::Happy => &[rgb!(0xFF, 0xD7, 0x00), rgb!(0xFF, 0xB3, 0x47)],
            Self::Calm => &[rgb!(0x7F, 0xC8, 0xA9), rgb!(0x5A, 0xAF, 0x9E)],
            Self::Playful => &[rgb!(0xFF, 0x8C, 0xC6), rgb!(0xFF, 0xB8, 0x6C), rgb!(0xFF, 0xE0, 0x66)],
            Self::Curious => &[rgb!(0x66, 0xCC, 0xFF), rgb!(0x33, 0x99, 0xFF)],
            Self::Bonded => &[rgb!(0xFF, 0xA0, 0xB4), rgb!(0xE0, 0x6C, 0x8C)],
            Self::Focused => &[rgb!(0xB0, 0xB8, 0xFF), rgb!(0x70, 0x7C, 0xE0)],
            Self::Passionate => &[rgb!(0xFF, 0x6A, 0x3D), rgb!(0xE0, 0x30, 0x30)],
            Self::Restless => &[rgb!(0xD8, 0xC0, 0x6A), rgb!(0xB0, 0x90, 0x40)],
            Self::Afraid => &[rgb!(0xA8, 0x9C, 0xC8), rgb!(0x6E, 0x5F, 0xA0)],
            Self::Angry => &[rgb!(0xE0, 0x40, 0x30), rgb!(0x9C, 0x1C, 0x14)],
            Self::Sad => &[rgb!(0x70, 0x88, 0xB0), rgb!(0x4A, 0x5C, 0x80)],
            Self::Protective => &[rgb!(0xC0, 0xA0, 0x60), rgb!(0x8C, 0x6C, 0x30)],
            Self::Saudade => &[rgb!(0x9E, 0x8C, 0xC8), rgb!(0xC8, 0xA0, 0xB8), rgb!(0x70, 0x6C, 0xA0)],
            Self::Yugen => &[rgb!(0x2E, 0x3A, 0x6E), rgb!(0x6A, 0x5A, 0xC8), rgb!(0xC8, 0xC0, 0xF0)],
        }
    }
}

impl fmt::Display for Mood {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Mood {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Self::ALL
            .into_iter()
            .find(|m| m.name().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| format!("unknown mood: {s}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ordinals_are_dense() {
        for (i, mood) in Mood::ALL.iter().enumerate() {
            assert_eq!(mood.index(), i);
        }
    }

    #[test]
    fn parse_is_case_insensitive() {
        assert_eq!("HAPPY".parse::<Mood>(), Ok(Mood::Happy));
        assert_eq!(" yugen ".parse::<Mood>(), Ok(Mood::Yugen));
        assert!("grumpy".parse::<Mood>().is_err());
    }

    #[test]
    fn rarer_tiers_need_more_strength() {
        let tiers = [MoodTier::Common, MoodTier::Uncommon, MoodTier::Rare, MoodTier::UltraRare];
        for pair in tiers.windows(2) {
            let (lo, hi) = (pair[0].thresholds(), pair[1].thresholds());
            for level in 0..3 {
                assert!(hi[level] > lo[level]);
            }
        }
    }

    #[test]
    fn every_mood_has_a_palette() {
        for mood in Mood::ALL {
            assert!(mood.palette().len() >= 2, "{mood} needs at least two stops");
        }
    }
}
