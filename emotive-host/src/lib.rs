//! # emotive-host — Game Integration for Emotive
//!
//! Glue between the game-agnostic `emotive-core` engine and a tick-driven
//! host game loop.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │               Host game                 │
//! │  ┌───────────────────────────────────┐  │
//! │  │          emotive-host             │  │
//! │  │  ┌─────────────┐ ┌─────────────┐  │  │
//! │  │  │   Events    │ │  Scheduler  │  │  │
//! │  │  └──────┬──────┘ └──────┬──────┘  │  │
//! │  │         ▼               ▼         │  │
//! │  │  ┌─────────────┐ ┌─────────────┐  │  │
//! │  │  │ Components  │◄┤   Systems   │  │  │
//! │  │  └──────┬──────┘ └─────────────┘  │  │
//! │  │         ▼                         │  │
//! │  │    ┌─────────────────────────┐    │  │
//! │  │    │      emotive-core       │    │  │
//! │  │    └─────────────────────────┘    │  │
//! │  └───────────────────────────────────┘  │
//! └─────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `components` — per-entity component (engine + context snapshot)
//! - `events` — host events: stimuli, contagion, context changes
//! - `systems` — the mood world: drain events, spread contagion, refresh due entities
//! - `scheduler` — wake-up queue driven by `estimate_next_wake_up`
//! - `config` — host config and the generation-counted config source

#![deny(clippy::unwrap_used)]
#![deny(missing_docs)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod components;
pub mod config;
pub mod events;
pub mod scheduler;
pub mod systems;

pub use components::MoodComponent;
pub use config::{ConfigSource, HostConfig};
pub use events::EmotionEvent;
pub use scheduler::WakeScheduler;
pub use systems::{ContagionLink, MoodWorld, TickSummary};
