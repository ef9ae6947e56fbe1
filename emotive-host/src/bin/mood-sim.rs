//! `mood-sim` — replay a TOML scenario through a [`MoodWorld`] and print how
//! each entity's mood evolves.
//!
//! ```text
//! mood-sim scenario.toml [--json]
//! ```
//!
//! A scenario holds the usual host/engine config tables plus:
//!
//! ```toml
//! until = 600          # last tick simulated
//! report_every = 20    # print interval
//! store = "moods.db"   # optional: save final states here
//!
//! [[entity]]
//! name = "pip"
//! nature = { major = { emotion = "joy", strength = 0.8 } }
//!
//! [[link]]
//! source = "pip"
//! target = "rex"
//! bond = 0.8
//!
//! [[event]]
//! at = 0
//! entity = "pip"
//! kind = "stimulus"
//! emotion = "joy"
//! amount = 0.4
//! ```
//!
//! Set `RUST_LOG=emotive_core=debug` to watch refresh passes.

use std::collections::BTreeMap;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Parser;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use emotive_core::persistence::StateStore;
use emotive_core::weight::NatureProfile;
use emotive_core::{Emotion, EntityId, Mood, Tick};
use emotive_host::{ContagionLink, EmotionEvent, HostConfig, MoodWorld};

/// Replay a mood scenario and report each entity's mood over time.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Scenario file (TOML)
    scenario: PathBuf,

    /// Emit one JSON object per report line
    #[arg(long)]
    json: bool,
}

#[derive(Debug, Deserialize)]
struct Scenario {
    #[serde(flatten)]
    config: HostConfig,
    #[serde(default = "default_until")]
    until: Tick,
    #[serde(default = "default_report_every")]
    report_every: Tick,
    #[serde(default)]
    store: Option<PathBuf>,
    #[serde(default, rename = "entity")]
    entities: Vec<EntitySpec>,
    #[serde(default, rename = "link")]
    links: Vec<LinkSpec>,
    #[serde(default, rename = "event")]
    events: Vec<EventSpec>,
}

fn default_until() -> Tick {
    600
}
fn default_report_every() -> Tick {
    20
}

#[derive(Debug, Deserialize)]
struct EntitySpec {
    name: String,
    #[serde(default)]
    nature: NatureProfile,
}

#[derive(Debug, Deserialize)]
struct LinkSpec {
    source: String,
    target: String,
    #[serde(default = "default_bond")]
    bond: f32,
}

fn default_bond() -> f32 {
    1.0
}

#[derive(Debug, Deserialize)]
struct EventSpec {
    at: Tick,
    entity: String,
    #[serde(flatten)]
    action: Action,
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
enum Action {
    Stimulus { emotion: Emotion, amount: f32 },
    Danger,
    DangerCleared,
    Care,
    Health { fraction: f32 },
    Bond { strength: i64 },
    OwnerPresence { present: bool },
    Condition { emotion: Emotion, active: bool },
}

impl Action {
    fn into_event(self, entity: EntityId, tick: Tick) -> EmotionEvent {
        match self {
            Self::Stimulus { emotion, amount } => EmotionEvent::Stimulus {
                entity,
                emotion,
                amount,
                tick,
            },
            Self::Danger => EmotionEvent::Danger { entity, tick },
            Self::DangerCleared => EmotionEvent::DangerCleared { entity, tick },
            Self::Care => EmotionEvent::Care { entity, tick },
            Self::Health { fraction } => EmotionEvent::Health {
                entity,
                fraction,
                tick,
            },
            Self::Bond { strength } => EmotionEvent::Bond {
                entity,
                strength,
                tick,
            },
            Self::OwnerPresence { present } => EmotionEvent::OwnerPresence {
                entity,
                present,
                tick,
            },
            Self::Condition { emotion, active } => EmotionEvent::Condition {
                entity,
                emotion,
                active,
                tick,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct ReportLine<'a> {
    tick: Tick,
    entity: &'a str,
    mood: Mood,
    level: u8,
    strength: f32,
    dominant_emotion: Option<Emotion>,
    blend: BTreeMap<Mood, f32>,
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let Args {
        scenario: path,
        json,
    } = Args::parse();

    let text = std::fs::read_to_string(&path)
        .with_context(|| format!("reading scenario {}", path.display()))?;
    let mut scenario: Scenario =
        toml::from_str(&text).with_context(|| format!("parsing scenario {}", path.display()))?;
    if scenario.report_every == 0 {
        bail!("report_every must be positive");
    }

    let mut world = MoodWorld::new(scenario.config.clone());
    let mut ids: BTreeMap<String, EntityId> = BTreeMap::new();
    for spec in &scenario.entities {
        let id = EntityId::new();
        world.spawn_with_nature(id, spec.nature);
        ids.insert(spec.name.clone(), id);
    }
    let lookup = |name: &str| -> Result<EntityId> {
        ids.get(name)
            .copied()
            .with_context(|| format!("unknown entity `{name}`"))
    };

    for link in &scenario.links {
        world.link(ContagionLink {
            source: lookup(&link.source)?,
            target: lookup(&link.target)?,
            bond_factor: link.bond,
        })?;
    }

    scenario.events.sort_by_key(|e| e.at);
    let mut pending = scenario.events.iter().peekable();

    for now in 0..=scenario.until {
        while let Some(spec) = pending.next_if(|e| e.at <= now) {
            let entity = lookup(&spec.entity)?;
            world.push_event(spec.action.into_event(entity, now));
        }
        world.tick(now);

        if now % scenario.report_every == 0 {
            for spec in &scenario.entities {
                let id = lookup(&spec.name)?;
                let Some(component) = world.component_mut(&id) else {
                    continue;
                };
                component.engine.ensure_fresh(now, &component.context);
                let view = component.engine.presentation();
                let line = ReportLine {
                    tick: now,
                    entity: &spec.name,
                    mood: view.mood,
                    level: view.level,
                    strength: view.strength,
                    dominant_emotion: component.engine.dominant_emotion(),
                    blend: component.engine.mood_blend(),
                };
                if json {
                    println!("{}", serde_json::to_string(&line)?);
                } else {
                    println!(
                        "t={:>6} {:<12} {:<10} L{} strength {:.3} via {}",
                        line.tick,
                        line.entity,
                        line.mood.name(),
                        line.level,
                        line.strength,
                        line.dominant_emotion.map_or("-", Emotion::name),
                    );
                }
            }
        }
    }

    if let Some(at) = world.next_due() {
        eprintln!("next wake-up at t={at}");
    }
    let counters = world.counters().snapshot();
    eprintln!("{}", world.budget().percentiles().summary(world.budget().budget_us()));
    eprint!("{}", counters.to_prometheus());

    if let Some(store_path) = &scenario.store {
        let store = StateStore::open(store_path, &scenario.config.engine.persistence)
            .with_context(|| format!("opening store {}", store_path.display()))?;
        let saved = world.save_all(&store)?;
        eprintln!("saved {saved} entities to {}", store_path.display());
    }
    Ok(())
}
