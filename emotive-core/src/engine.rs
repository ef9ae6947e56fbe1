//! The per-entity mood engine.
//!
//! One [`MoodEngine`] per character. Stimuli and contagion shares are cheap
//! writes that mark the engine dirty; [`MoodEngine::ensure_fresh`] runs the
//! full pipeline at most once per refresh window (or when dirty):
//!
//! ```text
//! decay → guards → prune → select → weigh → opponents → blend → dominant → level
//! ```
//!
//! Every read accessor returns the state of the last refresh, so the host
//! calls `ensure_fresh(now, ctx)` before reading.

use std::cmp::Reverse;
use std::collections::BTreeMap;
use std::sync::Arc;

use ordered_float::OrderedFloat;
use serde::Serialize;
use tracing::{debug, trace};

use crate::blend::{self, MoodBlend};
use crate::config::{ConfigSnapshot, EngineTuning};
use crate::contagion::{self, ContagionPacket};
use crate::context::{ContextFactors, EmotionContext, EmotionSet};
use crate::decay;
use crate::emotion::Emotion;
use crate::level::LevelState;
use crate::metrics::spans;
use crate::mood::Mood;
use crate::persistence::EngineState;
use crate::record::{CONTAGION_EPSILON, EmotionRecord, Intake};
use crate::selection;
use crate::stats::std_dev;
use crate::types::{EngineStats, Rgb, Tick};
use crate::weight::{self, MIN_IMPACT_CAP, NatureProfile, WeightInputs};

/// Share of intensity whose loss counts as a meaningful change for wake-ups.
const WAKE_UP_LOSS: f32 = 0.1;

/// `start` plus a fractional tick span, rounded up. Non-finite spans never arrive.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn ticks_after(start: Tick, span: f32) -> Tick {
    if span.is_nan() {
        return Tick::MAX;
    }
    start.saturating_add(span.max(0.0).ceil() as Tick)
}

/// Outcome of one [`MoodEngine::ensure_fresh`] call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshReport {
    /// Whether the pipeline ran (false when served from cache).
    pub recomputed: bool,
    /// Live records after pruning.
    pub live_records: u32,
    /// Records that survived selection.
    pub survivors: u32,
    /// Records pruned this pass.
    pub pruned: u32,
    /// Whether the dominant mood changed.
    pub mood_changed: bool,
    /// Whether the level changed.
    pub level_changed: bool,
    /// Dominant mood after the pass.
    pub mood: Mood,
    /// Level after the pass.
    pub level: u8,
}

/// One row of the ranked debug snapshot.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EmotionDebug {
    /// Emotion.
    pub emotion: Emotion,
    /// Current intensity.
    pub intensity: f32,
    /// Current impact budget.
    pub impact_budget: f32,
    /// Post-transfer weight from the last refresh.
    pub weight: f32,
    /// Contagion share.
    pub contagion_share: f32,
    /// Cadence EMA.
    pub cadence_ema: f32,
    /// Sensitisation gain.
    pub sensitisation_gain: f32,
    /// Current adaptive half-life.
    pub half_life: f32,
    /// Whether the triggering condition held at the last refresh.
    pub condition_ongoing: bool,
    /// Whether it survived the last selection.
    pub survivor: bool,
}

/// Data a renderer needs to draw the mood label. No animation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MoodPresentation {
    /// Dominant mood.
    pub mood: Mood,
    /// Level, `0..=3`.
    pub level: u8,
    /// Dominant strength from the last refresh.
    pub strength: f32,
    /// Palette stops for the mood.
    pub palette: &'static [Rgb],
}

/// Emotional state of one entity.
#[derive(Debug, Clone)]
pub struct MoodEngine {
    config: Arc<ConfigSnapshot>,
    records: [Option<EmotionRecord>; Emotion::COUNT],
    weights: [f32; Emotion::COUNT],
    survivors: EmotionSet,
    ongoing: EmotionSet,
    blend: MoodBlend,
    level: LevelState,
    nature: NatureProfile,
    impact_cap: f32,
    total_weight: f32,
    last_refresh: Option<Tick>,
    had_live_records: bool,
    dirty: bool,
    scratch: Vec<f32>,
}

impl Default for MoodEngine {
    fn default() -> Self {
        Self::new(Arc::new(ConfigSnapshot::default()))
    }
}

impl MoodEngine {
    /// A calm engine with no records.
    #[must_use]
    pub fn new(config: Arc<ConfigSnapshot>) -> Self {
        let tuning = &config.config.engine;
        let level = LevelState::new(tuning.strength_history, tuning.level_history);
        Self {
            records: std::array::from_fn(|_| None),
            weights: [0.0; Emotion::COUNT],
            survivors: EmotionSet::EMPTY,
            ongoing: EmotionSet::EMPTY,
            blend: MoodBlend::baseline(),
            level,
            nature: NatureProfile::default(),
            impact_cap: MIN_IMPACT_CAP,
            total_weight: 0.0,
            last_refresh: None,
            had_live_records: false,
            dirty: false,
            scratch: Vec::with_capacity(Emotion::COUNT),
            config,
        }
    }

    /// A calm engine with a temperament.
    #[must_use]
    pub fn with_nature(config: Arc<ConfigSnapshot>, nature: NatureProfile) -> Self {
        Self {
            nature,
            ..Self::new(config)
        }
    }

    fn tuning(&self) -> &EngineTuning {
        &self.config.config.engine
    }

    fn contagion_half_life(&self) -> f32 {
        self.config.config.contagion.half_life_ticks as f32
    }

    // ------------------------------------------------------------------
    // Writes
    // ------------------------------------------------------------------

    /// Apply a signed stimulus at `now`.
    ///
    /// Positive amounts create the record if needed. Negative amounts only
    /// suppress an existing record.
    pub fn apply_stimulus(&mut self, emotion: Emotion, amount: f32, now: Tick) {
        let _span = tracing::trace_span!(spans::STIMULUS, %emotion).entered();
        let slot = emotion.index();
        if self.records[slot].is_none() && (amount.is_nan() || amount <= 0.0) {
            return;
        }
        let intake = Intake {
            bias: self.nature.bias(emotion),
            dynamic_cap: (1.5 * self.impact_cap).min(self.tuning().max_impact_budget),
        };
        let ongoing = self.ongoing.contains(emotion);
        let contagion_half_life = self.contagion_half_life();

        let record = self.records[slot].get_or_insert_with(|| EmotionRecord::new(emotion, now));
        record.apply_decay(now, ongoing, contagion_half_life);
        record.apply_stimulus(amount, now, intake);
        self.dirty = true;
    }

    /// Receive a contagion share from another entity.
    ///
    /// The amount is biased by this engine's nature and clamped to
    /// `±cap(bond_factor)`. Returns the cap used.
    pub fn add_contagion_share(
        &mut self,
        emotion: Emotion,
        amount: f32,
        now: Tick,
        bond_factor: f32,
    ) -> f32 {
        let cap = self.contagion_cap(bond_factor);
        let amount = amount * self.nature.bias(emotion);
        if !amount.is_finite() {
            return cap;
        }
        let slot = emotion.index();
        if self.records[slot].is_none() && amount.abs() <= CONTAGION_EPSILON {
            return cap;
        }
        let ongoing = self.ongoing.contains(emotion);
        let contagion_half_life = self.contagion_half_life();

        let record = self.records[slot].get_or_insert_with(|| EmotionRecord::new(emotion, now));
        record.apply_decay(now, ongoing, contagion_half_life);
        record.add_contagion(amount, cap);
        trace!(%emotion, amount, cap, share = record.contagion_share, "Contagion received");
        self.dirty = true;
        cap
    }

    /// Deliver a packet built by another engine.
    pub fn receive_packet(&mut self, packet: ContagionPacket, now: Tick, bond_factor: f32) -> f32 {
        self.add_contagion_share(packet.emotion, packet.amount, now, bond_factor)
    }

    /// Replace the temperament.
    pub fn set_nature(&mut self, nature: NatureProfile) {
        if self.nature != nature {
            self.nature = nature;
            self.dirty = true;
        }
    }

    /// Adopt `snapshot` if its generation differs from the current one.
    ///
    /// Returns whether anything changed.
    pub fn sync_config(&mut self, snapshot: &Arc<ConfigSnapshot>) -> bool {
        if self.config.generation == snapshot.generation {
            return false;
        }
        debug!(
            from = self.config.generation,
            to = snapshot.generation,
            "Adopting new config generation"
        );
        self.config = Arc::clone(snapshot);
        let tuning = &self.config.config.engine;
        self.level.strength_history.set_capacity(tuning.strength_history);
        self.level.level_history.set_capacity(tuning.level_history);
        self.dirty = true;
        true
    }

    /// Force the next [`MoodEngine::ensure_fresh`] to recompute.
    pub fn mark_dirty(&mut self) {
        self.dirty = true;
    }

    // ------------------------------------------------------------------
    // Refresh
    // ------------------------------------------------------------------

    /// Whether a refresh at `now` would recompute.
    #[must_use]
    pub fn needs_refresh(&self, now: Tick) -> bool {
        self.dirty
            || self.last_refresh.is_none_or(|last| {
                now.saturating_sub(last) >= self.tuning().refresh_interval_ticks
            })
    }

    /// Recompute if dirty or if the refresh window has passed.
    ///
    /// Calling this twice at the same tick without new input changes nothing.
    pub fn ensure_fresh(&mut self, now: Tick, ctx: &dyn EmotionContext) -> RefreshReport {
        if !self.needs_refresh(now) {
            return RefreshReport {
                recomputed: false,
                live_records: self.live_count(),
                survivors: count(self.survivors),
                pruned: 0,
                mood_changed: false,
                level_changed: false,
                mood: self.level.current_mood,
                level: self.level.level,
            };
        }
        self.refresh(now, ctx)
    }

    fn refresh(&mut self, now: Tick, ctx: &dyn EmotionContext) -> RefreshReport {
        let _span = tracing::debug_span!(spans::REFRESH).entered();
        let config = Arc::clone(&self.config);
        let tuning = &config.config.engine;
        let tables = &config.tables;

        let factors = ContextFactors::derive(ctx, now, &config.config.context);
        let ongoing = tables.conditions.evaluate(&factors, ctx);
        self.ongoing = ongoing;
        let contagion_half_life = self.contagion_half_life();

        let mut pruned = 0_u32;
        for slot in &mut self.records {
            let prune = match slot {
                Some(rec) => {
                    rec.apply_decay(now, ongoing.contains(rec.emotion), contagion_half_life);
                    rec.update_guards(&factors);
                    rec.is_negligible(tuning.prune_epsilon)
                }
                None => false,
            };
            if prune {
                *slot = None;
                pruned += 1;
            }
        }

        let previous_mood = self.level.current_mood;
        self.weights = [0.0; Emotion::COUNT];
        self.survivors = EmotionSet::EMPTY;

        let live: Vec<&EmotionRecord> = self.records.iter().flatten().collect();
        let live_records = u32::try_from(live.len()).unwrap_or(u32::MAX);

        let mood = if live.is_empty() {
            self.blend = MoodBlend::baseline();
            self.total_weight = 0.0;
            self.had_live_records = false;
            Mood::BASELINE
        } else {
            self.impact_cap = weight::impact_cap(live.iter().copied(), &mut self.scratch);
            let inputs = WeightInputs {
                factors: &factors,
                impact_cap: self.impact_cap,
                weight_cap: weight::weight_cap(self.impact_cap),
                now,
            };
            let selection = selection::select(&live, now, &mut self.scratch);

            let mut confidence = [1.0_f32; Emotion::COUNT];
            for candidate in &selection.survivors {
                let i = candidate.emotion.index();
                if let Some(rec) = self.records[i].as_ref() {
                    let breakdown = weight::synthesize(
                        rec,
                        ongoing.contains(rec.emotion),
                        self.nature.bias(rec.emotion),
                        &inputs,
                    );
                    self.weights[i] = breakdown.total;
                    confidence[i] = rec.appraisal_confidence;
                    self.survivors.insert(rec.emotion);
                }
            }
            tables
                .opponents
                .resolve(&mut self.weights, &confidence, self.survivors, inputs.weight_cap);

            for rec in self.records.iter_mut().flatten() {
                rec.weight = self.weights[rec.emotion.index()];
            }
            self.total_weight = self.weights.iter().sum();

            let strongest = selection
                .survivors
                .iter()
                .max_by(|a, b| self.weights[a.emotion.index()].total_cmp(&self.weights[b.emotion.index()]));
            let contributions: Vec<(Emotion, f32)> = selection
                .survivors
                .iter()
                .map(|c| (c.emotion, self.weights[c.emotion.index()]))
                .collect();

            let snapped = !self.had_live_records;
            if let Some(target) = blend::target_blend(&contributions, &tables.mood_weights) {
                if snapped {
                    self.blend = target;
                } else {
                    let (freshness, heaviest) = strongest.map_or((0.0, 0.0), |c| {
                        (c.freshness, self.weights[c.emotion.index()])
                    });
                    let retained = blend::adaptive_momentum(tuning.momentum, freshness, heaviest);
                    self.blend.merge_toward(&target, retained);
                }
            }
            self.had_live_records = true;

            if snapped {
                self.blend.strongest()
            } else {
                let band = tuning
                    .switch_margin
                    .max(std_dev(self.level.strength_history.iter()));
                blend::select_dominant(&self.blend, previous_mood, band)
            }
        };

        let scale = tuning.level_strength_scale.max(f32::EPSILON);
        let strength = self.blend.get(mood) * (self.total_weight / scale).clamp(0.0, 1.0);
        let update = self.level.update(
            mood,
            strength,
            now,
            &tables.thresholds,
            tuning.level_snapshot_interval_ticks,
        );

        let mood_changed = mood != previous_mood;
        if mood_changed {
            debug!(from = %previous_mood, to = %mood, strength, "Dominant mood switched");
        }

        self.last_refresh = Some(now);
        self.dirty = false;

        let report = RefreshReport {
            recomputed: true,
            live_records,
            survivors: count(self.survivors),
            pruned,
            mood_changed,
            level_changed: update.level != update.previous,
            mood,
            level: update.level,
        };
        debug!(
            now,
            live = report.live_records,
            survivors = report.survivors,
            pruned,
            %mood,
            level = update.level,
            total_weight = self.total_weight,
            "Mood refresh pass"
        );
        report
    }

    // ------------------------------------------------------------------
    // Reads (state as of the last refresh)
    // ------------------------------------------------------------------

    /// Dominant mood.
    #[must_use]
    pub fn dominant_mood(&self) -> Mood {
        self.level.current_mood
    }

    /// Mood level, `0..=3`.
    #[must_use]
    pub fn mood_level(&self) -> u8 {
        self.level.level
    }

    /// Non-zero entries of the blend vector.
    #[must_use]
    pub fn mood_blend(&self) -> BTreeMap<Mood, f32> {
        self.blend.to_map()
    }

    /// Dense blend vector.
    #[must_use]
    pub fn blend(&self) -> &MoodBlend {
        &self.blend
    }

    /// Heaviest live emotion after opponent transfer.
    #[must_use]
    pub fn dominant_emotion(&self) -> Option<Emotion> {
        Emotion::ALL
            .into_iter()
            .filter(|e| self.weights[e.index()] > 0.0)
            .max_by(|a, b| self.weights[a.index()].total_cmp(&self.weights[b.index()]))
    }

    /// Whether `mood`'s blend share exceeds `threshold`.
    #[must_use]
    pub fn has_mood_above(&self, mood: Mood, threshold: f32) -> bool {
        self.blend.get(mood) > threshold
    }

    /// Post-transfer weight of one emotion.
    #[must_use]
    pub fn weight_of(&self, emotion: Emotion) -> f32 {
        self.weights[emotion.index()]
    }

    /// Live record for `emotion`.
    #[must_use]
    pub fn record(&self, emotion: Emotion) -> Option<&EmotionRecord> {
        self.records[emotion.index()].as_ref()
    }

    /// Every live record in emotion order.
    pub fn records(&self) -> impl Iterator<Item = &EmotionRecord> + '_ {
        self.records.iter().flatten()
    }

    /// Temperament.
    #[must_use]
    pub fn nature(&self) -> &NatureProfile {
        &self.nature
    }

    /// Active config generation.
    #[must_use]
    pub fn config_generation(&self) -> u64 {
        self.config.generation
    }

    /// Live records ranked by weight, heaviest first.
    #[must_use]
    pub fn debug_snapshot(&self) -> Vec<EmotionDebug> {
        let mut rows: Vec<EmotionDebug> = self
            .records()
            .map(|rec| {
                let ongoing = self.ongoing.contains(rec.emotion);
                EmotionDebug {
                    emotion: rec.emotion,
                    intensity: rec.intensity,
                    impact_budget: rec.impact_budget,
                    weight: self.weights[rec.emotion.index()],
                    contagion_share: rec.contagion_share,
                    cadence_ema: rec.cadence_ema,
                    sensitisation_gain: rec.sensitisation_gain,
                    half_life: rec.half_life(ongoing),
                    condition_ongoing: ongoing,
                    survivor: self.survivors.contains(rec.emotion),
                }
            })
            .collect();
        rows.sort_by_key(|row| (Reverse(OrderedFloat(row.weight)), Reverse(OrderedFloat(row.intensity))));
        rows
    }

    /// Soonest tick at which decay would meaningfully change the state.
    ///
    /// Per record: the time to lose 10% of intensity at its current
    /// half-life, or of a live contagion share at the contagion half-life,
    /// or the end of a running recency window. Never earlier than the next
    /// refresh slot. `None` when nothing is live.
    #[must_use]
    pub fn estimate_next_wake_up(&self, now: Tick) -> Option<Tick> {
        let contagion_loss = decay::ticks_to_lose(WAKE_UP_LOSS, self.contagion_half_life());
        let mut soonest: Option<Tick> = None;
        for rec in self.records() {
            let half_life = rec.half_life(self.ongoing.contains(rec.emotion));
            let mut at = ticks_after(rec.last_update_time, decay::ticks_to_lose(WAKE_UP_LOSS, half_life));
            if rec.contagion_share.abs() > CONTAGION_EPSILON {
                at = at.min(ticks_after(rec.last_update_time, contagion_loss));
            }
            if rec.stimulus_count > 0 && rec.age(now) < weight::RECENCY_WINDOW {
                at = at.min(ticks_after(rec.last_event_time, weight::RECENCY_WINDOW));
            }
            soonest = Some(soonest.map_or(at, |s| s.min(at)));
        }
        let next_slot = self
            .last_refresh
            .map_or(now, |last| last.saturating_add(self.tuning().refresh_interval_ticks))
            .max(now);
        Some(soonest?.max(next_slot))
    }

    /// Renderer-facing data for the current mood.
    #[must_use]
    pub fn presentation(&self) -> MoodPresentation {
        let mood = self.level.current_mood;
        MoodPresentation {
            mood,
            level: self.level.level,
            strength: self.level.last_strength,
            palette: mood.palette(),
        }
    }

    /// Build a packet passing on `fraction` of this engine's weight for `emotion`.
    ///
    /// `None` when the emotion carries no weight.
    #[must_use]
    pub fn contagion_packet(&self, emotion: Emotion, fraction: f32) -> Option<ContagionPacket> {
        let weight = self.weights[emotion.index()];
        if weight <= 0.0 || !fraction.is_finite() {
            return None;
        }
        let packet = ContagionPacket {
            emotion,
            amount: weight,
        }
        .scaled(fraction.clamp(0.0, 1.0));
        (!packet.is_negligible()).then_some(packet)
    }

    /// Contagion cap for a given bond factor at the current impact cap.
    #[must_use]
    pub fn contagion_cap(&self, bond_factor: f32) -> f32 {
        contagion::contagion_cap(self.impact_cap, bond_factor, &self.config.config.contagion)
    }

    /// Current impact cap.
    #[must_use]
    pub fn impact_cap(&self) -> f32 {
        self.impact_cap
    }

    /// Counts and caps for dashboards.
    #[must_use]
    pub fn stats(&self) -> EngineStats {
        EngineStats {
            live_records: self.live_count(),
            survivors: count(self.survivors),
            last_refresh_tick: self.last_refresh.unwrap_or(0),
            impact_cap: self.impact_cap,
        }
    }

    fn live_count(&self) -> u32 {
        u32::try_from(self.records().count()).unwrap_or(u32::MAX)
    }

    // ------------------------------------------------------------------
    // Persistence
    // ------------------------------------------------------------------

    /// Capture the full state.
    #[must_use]
    pub fn save_state(&self) -> EngineState {
        EngineState {
            records: self.records().cloned().collect(),
            blend: self.blend.to_map(),
            level: self.level.clone(),
            nature: self.nature,
            impact_cap: self.impact_cap,
            last_refresh: self.last_refresh,
            had_live_records: self.had_live_records,
            ongoing: self.ongoing,
        }
    }

    /// Resume from a saved state. Reads match the engine that was saved.
    #[must_use]
    pub fn from_state(state: EngineState, config: Arc<ConfigSnapshot>) -> Self {
        let mut engine = Self::new(config);
        for rec in state.records {
            let i = rec.emotion.index();
            let weight = if rec.weight.is_finite() { rec.weight.max(0.0) } else { 0.0 };
            engine.weights[i] = weight;
            if weight > 0.0 {
                engine.survivors.insert(rec.emotion);
            }
            engine.records[i] = Some(rec);
        }
        engine.total_weight = engine.weights.iter().sum();
        engine.blend = MoodBlend::from_map(&state.blend);
        engine.level = state.level;
        let tuning = &engine.config.config.engine;
        engine.level.strength_history.set_capacity(tuning.strength_history);
        engine.level.level_history.set_capacity(tuning.level_history);
        engine.nature = state.nature;
        engine.impact_cap = if state.impact_cap.is_finite() {
            state.impact_cap.max(MIN_IMPACT_CAP)
        } else {
            MIN_IMPACT_CAP
        };
        engine.last_refresh = state.last_refresh;
        engine.had_live_records = state.had_live_records;
        engine.ongoing = state.ongoing;
        engine.dirty = engine.last_refresh.is_none() && engine.live_count() > 0;
        engine
    }
}

fn count(set: EmotionSet) -> u32 {
    u32::try_from(Emotion::ALL.into_iter().filter(|&e| set.contains(e)).count()).unwrap_or(0)
}
