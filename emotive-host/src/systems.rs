//! Host systems for the mood layer.
//!
//! In a full ECS integration these would be system impls; here they are
//! methods on [`MoodWorld`], which owns every entity's component, the event
//! queue, the wake-up scheduler and the contagion links.
//!
//! ## Per-tick order
//!
//! | System             | Frequency                     |
//! |--------------------|-------------------------------|
//! | `process_events`   | Every tick                    |
//! | `spread_contagion` | Every `contagion_interval`    |
//! | `refresh_due`      | Every tick, due entities only |

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::Ordering;

use tracing::{debug, warn};

use emotive_core::engine::RefreshReport;
use emotive_core::error::Result;
use emotive_core::metrics::{EngineCounters, RefreshBudgetMonitor, spans};
use emotive_core::persistence::StateStore;
use emotive_core::weight::NatureProfile;
use emotive_core::{EmotiveError, EngineConfig, EntityId, Tick};

use crate::components::MoodComponent;
use crate::config::{ConfigSource, HostConfig, HostTuning};
use crate::events::EmotionEvent;
use crate::scheduler::WakeScheduler;

/// A directed contagion channel between two entities.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContagionLink {
    /// Entity whose dominant feeling spreads.
    pub source: EntityId,
    /// Entity that catches it.
    pub target: EntityId,
    /// Bond between them in `[0, 1]`; scales the receiver's cap.
    pub bond_factor: f32,
}

/// What one [`MoodWorld::tick`] did.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickSummary {
    /// Events applied.
    pub events: usize,
    /// Contagion packets delivered.
    pub contagion: usize,
    /// Refresh outcomes for every entity refreshed this tick.
    pub refreshed: Vec<(EntityId, RefreshReport)>,
}

/// Every mood-bearing entity plus the systems that drive them.
#[derive(Debug)]
pub struct MoodWorld {
    tuning: HostTuning,
    config: ConfigSource,
    entities: HashMap<EntityId, MoodComponent>,
    links: Vec<ContagionLink>,
    events: VecDeque<EmotionEvent>,
    scheduler: WakeScheduler,
    counters: EngineCounters,
    budget: RefreshBudgetMonitor,
    last_spread: Option<Tick>,
}

impl MoodWorld {
    /// Empty world.
    #[must_use]
    pub fn new(config: HostConfig) -> Self {
        Self {
            budget: RefreshBudgetMonitor::new(config.host.refresh_budget_us),
            tuning: config.host,
            config: ConfigSource::new(config.engine),
            entities: HashMap::new(),
            links: Vec::new(),
            events: VecDeque::new(),
            scheduler: WakeScheduler::new(),
            counters: EngineCounters::new(),
            last_spread: None,
        }
    }

    // ------------------------------------------------------------------
    // Entities
    // ------------------------------------------------------------------

    /// Give `entity` a calm component.
    pub fn spawn(&mut self, entity: EntityId) -> &mut MoodComponent {
        self.insert(entity, MoodComponent::new(self.config.snapshot()))
    }

    /// Give `entity` a calm component with a temperament.
    pub fn spawn_with_nature(&mut self, entity: EntityId, nature: NatureProfile) -> &mut MoodComponent {
        self.insert(entity, MoodComponent::with_nature(self.config.snapshot(), nature))
    }

    /// Attach an existing component, replacing any previous one.
    pub fn insert(&mut self, entity: EntityId, component: MoodComponent) -> &mut MoodComponent {
        self.entities.entry(entity).insert_entry(component).into_mut()
    }

    /// Remove `entity` and everything pointing at it.
    pub fn despawn(&mut self, entity: EntityId) -> Option<MoodComponent> {
        self.scheduler.cancel(entity);
        self.links.retain(|l| l.source != entity && l.target != entity);
        self.entities.remove(&entity)
    }

    /// Component for `entity`.
    #[must_use]
    pub fn component(&self, entity: &EntityId) -> Option<&MoodComponent> {
        self.entities.get(entity)
    }

    /// Mutable component for `entity`.
    pub fn component_mut(&mut self, entity: &EntityId) -> Option<&mut MoodComponent> {
        self.entities.get_mut(entity)
    }

    /// Number of entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Add a contagion link.
    ///
    /// # Errors
    /// Returns `EmotiveError::EntityNotFound` if either end is unknown.
    pub fn link(&mut self, link: ContagionLink) -> Result<()> {
        for end in [link.source, link.target] {
            if !self.entities.contains_key(&end) {
                return Err(EmotiveError::EntityNotFound(end));
            }
        }
        self.links.push(link);
        Ok(())
    }

    /// Queue an event for the next [`MoodWorld::process_events`].
    pub fn push_event(&mut self, event: EmotionEvent) {
        self.events.push_back(event);
    }

    /// Install a new engine config; every entity adopts it on its next refresh.
    pub fn reload_config(&mut self, config: EngineConfig, now: Tick) -> u64 {
        let generation = self.config.reload(config);
        for entity in self.entities.keys() {
            self.scheduler.schedule(*entity, now);
        }
        generation
    }

    /// Config source.
    #[must_use]
    pub fn config(&self) -> &ConfigSource {
        &self.config
    }

    /// Counters across every entity.
    #[must_use]
    pub fn counters(&self) -> &EngineCounters {
        &self.counters
    }

    /// Refresh pass timings.
    #[must_use]
    pub fn budget(&self) -> &RefreshBudgetMonitor {
        &self.budget
    }

    /// Scheduled wake-up for `entity`.
    #[must_use]
    pub fn next_wake_up(&self, entity: &EntityId) -> Option<Tick> {
        self.scheduler.pending(entity)
    }

    /// Earliest scheduled wake-up across all entities.
    pub fn next_due(&mut self) -> Option<Tick> {
        self.scheduler.next_due()
    }

    // ------------------------------------------------------------------
    // Systems
    // ------------------------------------------------------------------

    /// Drain the event queue into components. Returns the number applied.
    ///
    /// Events for unknown or inactive entities are dropped.
    pub fn process_events(&mut self, now: Tick) -> usize {
        let _span = tracing::debug_span!(spans::EVENTS).entered();
        let mut applied = 0;
        while let Some(event) = self.events.pop_front() {
            let entity = event.entity();
            let Some(component) = self.entities.get_mut(&entity).filter(|c| c.active) else {
                warn!(%entity, "Dropping event for unknown or inactive entity");
                continue;
            };
            component.apply(&event);
            match event {
                EmotionEvent::Stimulus { .. } => {
                    self.counters.stimuli_applied.fetch_add(1, Ordering::Relaxed);
                }
                EmotionEvent::Contagion { .. } => {
                    self.counters.contagion_received.fetch_add(1, Ordering::Relaxed);
                }
                _ => {}
            }
            self.scheduler.schedule(entity, now);
            applied += 1;
        }
        applied
    }

    /// Pass each link source's dominant feeling to its target.
    ///
    /// Packets are built from the sources' last refresh, then delivered, so
    /// the order of links doesn't matter. Returns the number delivered.
    pub fn spread_contagion(&mut self, now: Tick) -> usize {
        let _span = tracing::debug_span!(spans::CONTAGION).entered();
        let fraction = self.tuning.contagion_fraction;
        let packets: Vec<_> = self
            .links
            .iter()
            .filter_map(|link| {
                let source = self.entities.get(&link.source).filter(|c| c.active)?;
                let emotion = source.engine.dominant_emotion()?;
                let packet = source.engine.contagion_packet(emotion, fraction)?;
                Some((link.target, packet, link.bond_factor))
            })
            .collect();

        let mut delivered = 0;
        for (target, packet, bond_factor) in packets {
            let Some(component) = self.entities.get_mut(&target).filter(|c| c.active) else {
                continue;
            };
            component.engine.receive_packet(packet, now, bond_factor);
            self.counters.contagion_received.fetch_add(1, Ordering::Relaxed);
            self.scheduler.schedule(target, now);
            delivered += 1;
        }
        self.last_spread = Some(now);
        delivered
    }

    /// Refresh every entity whose wake-up is due, up to the per-tick limit.
    ///
    /// Each refreshed engine is rescheduled at its next predicted wake-up;
    /// an engine with nothing live sleeps until an event arrives.
    pub fn refresh_due(&mut self, now: Tick) -> Vec<(EntityId, RefreshReport)> {
        let due = self.scheduler.pop_due(now, self.tuning.max_refreshes_per_tick);
        if due.is_empty() {
            return Vec::new();
        }
        let pass = self.budget.begin_pass();
        let snapshot = self.config.snapshot();
        let mut reports = Vec::with_capacity(due.len());

        for entity in due {
            let Some(component) = self.entities.get_mut(&entity).filter(|c| c.active) else {
                continue;
            };
            component.engine.sync_config(&snapshot);
            let report = component.engine.ensure_fresh(now, &component.context);
            self.counters.record_refresh(&report);
            if report.recomputed {
                component.last_report = Some(report);
            }
            if let Some(at) = component.engine.estimate_next_wake_up(now) {
                self.scheduler.reschedule(entity, at.max(now + 1));
            }
            reports.push((entity, report));
        }
        drop(pass);

        if self.budget.is_over_budget() {
            debug!(
                last_us = self.budget.last_pass_us(),
                budget_us = self.budget.budget_us(),
                "Refresh pass over budget"
            );
        }
        reports
    }

    /// Run one host tick: events, contagion (when due), refreshes.
    pub fn tick(&mut self, now: Tick) -> TickSummary {
        let events = self.process_events(now);
        let spread_due = self.last_spread.is_none_or(|last| {
            now.saturating_sub(last) >= self.tuning.contagion_interval_ticks
        });
        let contagion = if spread_due && !self.links.is_empty() {
            self.spread_contagion(now)
        } else {
            0
        };
        let refreshed = self.refresh_due(now);
        TickSummary {
            events,
            contagion,
            refreshed,
        }
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Save every entity's state. Returns the number saved.
    ///
    /// # Errors
    /// Stops at the first failed save.
    pub fn save_all(&self, store: &StateStore) -> Result<usize> {
        let _span = tracing::debug_span!(spans::PERSIST_SAVE).entered();
        for (entity, component) in &self.entities {
            store.save_state(entity, &component.engine.save_state())?;
            self.counters.saves_completed.fetch_add(1, Ordering::Relaxed);
        }
        Ok(self.entities.len())
    }

    /// Load `entity` from `store` (a fresh calm engine if nothing is saved).
    ///
    /// # Errors
    /// Returns an error if the stored blob can't be read or decoded.
    pub fn load(&mut self, store: &StateStore, entity: EntityId, now: Tick) -> Result<&mut MoodComponent> {
        let _span = tracing::debug_span!(spans::PERSIST_LOAD).entered();
        let engine = store.load_engine(&entity, self.config.snapshot())?;
        self.scheduler.schedule(entity, now);
        Ok(self.insert(entity, MoodComponent::with_engine(engine)))
    }
}

impl Default for MoodWorld {
    fn default() -> Self {
        Self::new(HostConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::stimulus;
    use emotive_core::config::PersistenceConfig;
    use emotive_core::{Emotion, Mood};

    #[test]
    fn events_wake_and_refresh_entities() {
        let mut world = MoodWorld::default();
        let pet = EntityId::new();
        world.spawn(pet);
        world.push_event(stimulus(pet, Emotion::Joy, 0.4, 0));

        let summary = world.tick(0);
        assert_eq!(summary.events, 1);
        assert_eq!(summary.refreshed.len(), 1);
        assert!(summary.refreshed[0].1.recomputed);

        let comp = world.component(&pet).expect("component");
        assert_eq!(comp.engine.dominant_mood(), Mood::Happy);
        assert!(world.next_wake_up(&pet).is_some_and(|at| at > 0));
        assert_eq!(world.next_due(), world.next_wake_up(&pet));
        assert_eq!(world.counters().snapshot().stimuli_applied, 1);
    }

    #[test]
    fn idle_entities_are_not_refreshed() {
        let mut world = MoodWorld::default();
        let pet = EntityId::new();
        world.spawn(pet);
        assert!(world.tick(0).refreshed.is_empty());
        assert!(world.next_wake_up(&pet).is_none());
        assert_eq!(world.next_due(), None);
    }

    #[test]
    fn events_for_unknown_entities_are_dropped() {
        let mut world = MoodWorld::default();
        world.push_event(stimulus(EntityId::new(), Emotion::Fear, 0.5, 0));
        assert_eq!(world.process_events(0), 0);
    }

    #[test]
    fn contagion_flows_along_links() {
        let mut world = MoodWorld::default();
        let (scared, friend) = (EntityId::new(), EntityId::new());
        world.spawn(scared);
        world.spawn(friend);
        world
            .link(ContagionLink {
                source: scared,
                target: friend,
                bond_factor: 1.0,
            })
            .expect("link");

        world.push_event(stimulus(scared, Emotion::Fear, 0.5, 0));
        world.tick(0);
        let summary = world.tick(20);
        assert_eq!(summary.contagion, 1);

        let rec = world
            .component(&friend)
            .and_then(|c| c.engine.record(Emotion::Fear))
            .expect("caught fear");
        assert!(rec.contagion_share > 0.0);
        assert!(world.component(&friend).expect("friend").engine.weight_of(Emotion::Fear) > 0.0);
    }

    #[test]
    fn linking_unknown_entity_fails() {
        let mut world = MoodWorld::default();
        let known = EntityId::new();
        world.spawn(known);
        let err = world.link(ContagionLink {
            source: known,
            target: EntityId::new(),
            bond_factor: 0.5,
        });
        assert!(matches!(err, Err(EmotiveError::EntityNotFound(_))));
    }

    #[test]
    fn reload_reaches_every_engine() {
        let mut world = MoodWorld::default();
        let pet = EntityId::new();
        world.spawn(pet);
        world.push_event(stimulus(pet, Emotion::Joy, 0.4, 0));
        world.tick(0);

        let generation = world.reload_config(EngineConfig::default(), 1);
        let summary = world.tick(1);
        assert_eq!(summary.refreshed.len(), 1);
        assert!(summary.refreshed[0].1.recomputed);
        let comp = world.component(&pet).expect("component");
        assert_eq!(comp.engine.config_generation(), generation);
    }

    #[test]
    fn refresh_limit_rolls_over() {
        let mut config = HostConfig::default();
        config.host.max_refreshes_per_tick = 2;
        let mut world = MoodWorld::new(config);
        for _ in 0..5 {
            let id = EntityId::new();
            world.spawn(id);
            world.push_event(stimulus(id, Emotion::Cheer, 0.3, 0));
        }
        assert_eq!(world.tick(0).refreshed.len(), 2);
        assert_eq!(world.tick(0).refreshed.len(), 2);
        assert_eq!(world.tick(0).refreshed.len(), 1);
    }

    #[test]
    fn save_and_load_through_store() {
        let store = StateStore::open_in_memory(&PersistenceConfig::default()).expect("store");
        let mut world = MoodWorld::default();
        let pet = EntityId::new();
        world.spawn(pet);
        world.push_event(stimulus(pet, Emotion::Curiosity, 0.5, 0));
        world.tick(0);
        assert_eq!(world.save_all(&store).expect("save"), 1);
        assert_eq!(world.counters().snapshot().saves_completed, 1);

        let mut restored = MoodWorld::default();
        let comp = restored.load(&store, pet, 0).expect("load");
        assert_eq!(comp.engine.dominant_mood(), Mood::Curious);
        assert_eq!(restored.next_wake_up(&pet), Some(0));
    }
}
