//! # Emotive Core Library
//!
//! Game-agnostic emotional state for game characters.
//!
//! Every character (pet, NPC, creature) owns a [`MoodEngine`] that turns
//! discrete stimuli ("a little fear", "a burst of joy") into a continuously
//! evolving blend of moods plus a discrete intensity level:
//!
//! - **Records** — one decaying [`EmotionRecord`] per live emotion
//! - **Decay** — adaptive half-lives with negativity bias and ongoing conditions
//! - **Selection** — quantile-based filtering of the live set
//! - **Weights** — additive weight model (recency, persistence, habituation, context)
//! - **Opponents** — weaker side of an opposing pair donates to the stronger
//! - **Blend** — momentum-smoothed mood vector with a hysteretic dominant mood
//! - **Levels** — thresholds with buildup, asymmetric margins and habituation drag
//! - **Contagion** — value-only transfer between engines
//!
//! ## Performance Contract
//!
//! Everything here is synchronous, allocation-light numeric work meant for a
//! per-tick game loop:
//! - Stimulus intake: < 2μs
//! - Refresh pass (24 live emotions): < 20μs
//! - Refresh is gated to at most once per refresh window per entity

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]

pub mod blend;
pub mod config;
pub mod contagion;
pub mod context;
pub mod decay;
pub mod emotion;
pub mod engine;
pub mod error;
pub mod level;
pub mod metrics;
pub mod mood;
pub mod opponent;
pub mod persistence;
pub mod record;
pub mod selection;
pub mod stats;
pub mod types;
pub mod weight;

pub use config::{ConfigSnapshot, EngineConfig};
pub use context::{ContextSnapshot, EmotionContext};
pub use emotion::Emotion;
pub use engine::MoodEngine;
pub use error::EmotiveError;
pub use mood::Mood;
pub use record::EmotionRecord;
pub use types::*;
