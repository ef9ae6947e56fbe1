//! Emotive Benchmark Suite
//!
//! Per-tick performance targets:
//!   stimulus_intake_single ............ < 2μs
//!   refresh_pass_24_live .............. < 20μs
//!   refresh_pass_50_entities .......... < 500μs
//!   state_encode_msgpack .............. < 20μs
//!   world_tick_50_entities ............ < 1ms

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use emotive_core::context::ContextSnapshot;
use emotive_core::persistence::SnapshotFormat;
use emotive_core::{Emotion, EntityId, MoodEngine, Tick};
use emotive_host::events::stimulus;
use emotive_host::{ContagionLink, MoodWorld};

/// An engine fed a deterministic stream of `n` stimuli over every emotion.
fn busy_engine(rng: &mut StdRng, n: usize) -> (MoodEngine, Tick) {
    let mut engine = MoodEngine::default();
    let mut now = 0;
    for _ in 0..n {
        now += rng.gen_range(1..40);
        let emotion = Emotion::ALL[rng.gen_range(0..Emotion::COUNT)];
        engine.apply_stimulus(emotion, rng.gen_range(0.05..0.5), now);
    }
    (engine, now)
}

/// Benchmark: Single stimulus on an existing record (target: < 2μs).
fn bench_stimulus(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(7);
    let (mut engine, now) = busy_engine(&mut rng, 48);

    c.bench_function("stimulus_intake_single", |b| {
        b.iter(|| {
            engine.apply_stimulus(black_box(Emotion::Joy), black_box(0.3), black_box(now));
        });
    });
}

/// Benchmark: Full refresh with all 24 emotions live (target: < 20μs).
fn bench_refresh(c: &mut Criterion) {
    let mut engine = MoodEngine::default();
    for (i, emotion) in Emotion::ALL.into_iter().enumerate() {
        engine.apply_stimulus(emotion, 0.1 + 0.015 * i as f32, i as Tick);
    }
    let ctx = ContextSnapshot {
        bond_strength: 600,
        last_danger_tick: Some(10),
        ..ContextSnapshot::default()
    };
    let now = 40;

    c.bench_function("refresh_pass_24_live", |b| {
        b.iter(|| {
            engine.mark_dirty();
            black_box(engine.ensure_fresh(black_box(now), &ctx));
        });
    });
}

/// Benchmark: Refresh pass over 50 entities (target: < 500μs).
fn bench_refresh_many(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(42);
    let ctx = ContextSnapshot::default();
    let mut engines: Vec<(MoodEngine, Tick)> = (0..50).map(|_| busy_engine(&mut rng, 30)).collect();

    c.bench_function("refresh_pass_50_entities", |b| {
        b.iter(|| {
            for (engine, now) in &mut engines {
                engine.mark_dirty();
                black_box(engine.ensure_fresh(*now, &ctx));
            }
        });
    });
}

/// Benchmark: Snapshot encoding (target: < 20μs).
fn bench_encode(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(3);
    let (mut engine, now) = busy_engine(&mut rng, 60);
    engine.ensure_fresh(now, &ContextSnapshot::default());
    let state = engine.save_state();

    c.bench_function("state_encode_msgpack", |b| {
        b.iter(|| black_box(state.encode(SnapshotFormat::MessagePack)));
    });
    c.bench_function("state_encode_bincode", |b| {
        b.iter(|| black_box(state.encode(SnapshotFormat::Bincode)));
    });
}

/// Benchmark: Host tick with 50 entities, events and contagion (target: < 1ms).
fn bench_world_tick(c: &mut Criterion) {
    let mut rng = StdRng::seed_from_u64(99);
    let mut world = MoodWorld::default();
    let ids: Vec<EntityId> = (0..50).map(|_| EntityId::new()).collect();
    for id in &ids {
        world.spawn(*id);
    }
    for pair in ids.windows(2) {
        world
            .link(ContagionLink {
                source: pair[0],
                target: pair[1],
                bond_factor: 0.7,
            })
            .expect("both ends exist");
    }

    let mut now: Tick = 0;
    c.bench_function("world_tick_50_entities", |b| {
        b.iter(|| {
            now += 1;
            for _ in 0..5 {
                let id = ids[rng.gen_range(0..ids.len())];
                let emotion = Emotion::ALL[rng.gen_range(0..Emotion::COUNT)];
                world.push_event(stimulus(id, emotion, rng.gen_range(0.05..0.5), now));
            }
            black_box(world.tick(now));
        });
    });
}

criterion_group!(
    benches,
    bench_stimulus,
    bench_refresh,
    bench_refresh_many,
    bench_encode,
    bench_world_tick,
);
criterion_main!(benches);
