//! Runtime metrics for mood engines.
//!
//! Lock-free `AtomicU64` counters for the hot path, plus a refresh-budget
//! monitor whose timing ring sits behind a `parking_lot::Mutex` (written
//! once per pass, read rarely for dashboards).

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use parking_lot::Mutex;

use crate::stats::RingBuffer;

// ---------------------------------------------------------------------------
// Counters
// ---------------------------------------------------------------------------

/// Atomic counters for high-frequency engine events.
#[derive(Debug)]
pub struct EngineCounters {
    /// Stimuli applied.
    pub stimuli_applied: AtomicU64,
    /// Contagion shares received.
    pub contagion_received: AtomicU64,
    /// Refresh passes that recomputed.
    pub refresh_passes: AtomicU64,
    /// Refresh calls answered from cache.
    pub refresh_skipped: AtomicU64,
    /// Records pruned after decaying away.
    pub records_pruned: AtomicU64,
    /// Dominant-mood switches.
    pub mood_switches: AtomicU64,
    /// Mood level changes.
    pub level_changes: AtomicU64,
    /// Snapshots saved.
    pub saves_completed: AtomicU64,
}

impl EngineCounters {
    /// Zeroed counters.
    #[must_use]
    pub const fn new() -> Self {
        Self {
            stimuli_applied: AtomicU64::new(0),
            contagion_received: AtomicU64::new(0),
            refresh_passes: AtomicU64::new(0),
            refresh_skipped: AtomicU64::new(0),
            records_pruned: AtomicU64::new(0),
            mood_switches: AtomicU64::new(0),
            level_changes: AtomicU64::new(0),
            saves_completed: AtomicU64::new(0),
        }
    }

    /// Fold one refresh outcome into the counters.
    pub fn record_refresh(&self, report: &crate::engine::RefreshReport) {
        if !report.recomputed {
            self.refresh_skipped.fetch_add(1, Ordering::Relaxed);
            return;
        }
        self.refresh_passes.fetch_add(1, Ordering::Relaxed);
        self.records_pruned
            .fetch_add(u64::from(report.pruned), Ordering::Relaxed);
        if report.mood_changed {
            self.mood_switches.fetch_add(1, Ordering::Relaxed);
        }
        if report.level_changed {
            self.level_changes.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Read every counter.
    #[must_use]
    pub fn snapshot(&self) -> CounterSnapshot {
        CounterSnapshot {
            stimuli_applied: self.stimuli_applied.load(Ordering::Relaxed),
            contagion_received: self.contagion_received.load(Ordering::Relaxed),
            refresh_passes: self.refresh_passes.load(Ordering::Relaxed),
            refresh_skipped: self.refresh_skipped.load(Ordering::Relaxed),
            records_pruned: self.records_pruned.load(Ordering::Relaxed),
            mood_switches: self.mood_switches.load(Ordering::Relaxed),
            level_changes: self.level_changes.load(Ordering::Relaxed),
            saves_completed: self.saves_completed.load(Ordering::Relaxed),
        }
    }
}

impl Default for EngineCounters {
    fn default() -> Self {
        Self::new()
    }
}

/// Counter values at a point in time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CounterSnapshot {
    /// Stimuli applied.
    pub stimuli_applied: u64,
    /// Contagion shares received.
    pub contagion_received: u64,
    /// Refresh passes that recomputed.
    pub refresh_passes: u64,
    /// Refresh calls answered from cache.
    pub refresh_skipped: u64,
    /// Records pruned.
    pub records_pruned: u64,
    /// Dominant-mood switches.
    pub mood_switches: u64,
    /// Level changes.
    pub level_changes: u64,
    /// Snapshots saved.
    pub saves_completed: u64,
}

impl CounterSnapshot {
    /// Prometheus text exposition.
    #[must_use]
    pub fn to_prometheus(&self) -> String {
        let rows = [
            ("stimuli_applied", "Stimuli applied", self.stimuli_applied),
            ("contagion_received", "Contagion shares received", self.contagion_received),
            ("refresh_passes", "Refresh passes recomputed", self.refresh_passes),
            ("refresh_skipped", "Refresh calls served from cache", self.refresh_skipped),
            ("records_pruned", "Emotion records pruned", self.records_pruned),
            ("mood_switches", "Dominant mood switches", self.mood_switches),
            ("level_changes", "Mood level changes", self.level_changes),
            ("saves_completed", "Snapshots saved", self.saves_completed),
        ];
        let mut out = String::new();
        for (name, help, value) in rows {
            out.push_str(&format!(
                "# HELP emotive_{name}_total {help}\n\
                 # TYPE emotive_{name}_total counter\n\
                 emotive_{name}_total {value}\n"
            ));
        }
        out
    }
}

// ---------------------------------------------------------------------------
// Refresh budget monitor
// ---------------------------------------------------------------------------

/// Tracks how long refresh passes take against a per-pass budget.
#[derive(Debug)]
pub struct RefreshBudgetMonitor {
    budget_us: f64,
    history: Mutex<PassHistory>,
}

#[derive(Debug)]
struct PassHistory {
    timings: RingBuffer<f64>,
    count: u64,
    last_over_budget: bool,
}

impl RefreshBudgetMonitor {
    /// Monitor with a budget in microseconds, keeping the last 256 passes.
    #[must_use]
    pub fn new(budget_us: f64) -> Self {
        Self {
            budget_us,
            history: Mutex::new(PassHistory {
                timings: RingBuffer::new(256),
                count: 0,
                last_over_budget: false,
            }),
        }
    }

    /// Start timing a pass; the guard records on drop.
    pub fn begin_pass(&self) -> PassGuard<'_> {
        PassGuard {
            monitor: self,
            start: Instant::now(),
        }
    }

    /// Record one pass timing in microseconds.
    pub fn record(&self, us: f64) {
        let mut h = self.history.lock();
        h.timings.push(us);
        h.count += 1;
        h.last_over_budget = us > self.budget_us;
    }

    /// Most recent pass timing.
    #[must_use]
    pub fn last_pass_us(&self) -> f64 {
        self.history.lock().timings.last().copied().unwrap_or(0.0)
    }

    /// Whether the last pass went over budget.
    #[must_use]
    pub fn is_over_budget(&self) -> bool {
        self.history.lock().last_over_budget
    }

    /// Total passes recorded.
    #[must_use]
    pub fn pass_count(&self) -> u64 {
        self.history.lock().count
    }

    /// The configured budget.
    #[must_use]
    pub fn budget_us(&self) -> f64 {
        self.budget_us
    }

    /// P50/P95/P99/max over the retained history.
    #[must_use]
    pub fn percentiles(&self) -> PassPercentiles {
        let mut sorted: Vec<f64> = self.history.lock().timings.iter().copied().collect();
        if sorted.is_empty() {
            return PassPercentiles::default();
        }
        sorted.sort_by(f64::total_cmp);
        let n = sorted.len();
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let rank = |p: f64| sorted[((n as f64 * p) as usize).min(n - 1)];
        let over = sorted.iter().filter(|&&t| t > self.budget_us).count();
        PassPercentiles {
            p50: rank(0.50),
            p95: rank(0.95),
            p99: rank(0.99),
            max: sorted[n - 1],
            over_budget_ratio: over as f64 / n as f64,
        }
    }
}

/// RAII guard that records elapsed time when dropped.
#[derive(Debug)]
pub struct PassGuard<'a> {
    monitor: &'a RefreshBudgetMonitor,
    start: Instant,
}

impl Drop for PassGuard<'_> {
    fn drop(&mut self) {
        self.monitor
            .record(self.start.elapsed().as_secs_f64() * 1_000_000.0);
    }
}

/// Pass timing percentiles in microseconds.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct PassPercentiles {
    /// Median.
    pub p50: f64,
    /// 95th percentile.
    pub p95: f64,
    /// 99th percentile.
    pub p99: f64,
    /// Slowest retained pass.
    pub max: f64,
    /// Share of passes over budget.
    pub over_budget_ratio: f64,
}

impl PassPercentiles {
    /// One-line summary.
    #[must_use]
    pub fn summary(&self, budget_us: f64) -> String {
        format!(
            "P50={:.1}us  P95={:.1}us  P99={:.1}us  Max={:.1}us  Budget={budget_us:.0}us  \
             Over-budget={:.1}%",
            self.p50,
            self.p95,
            self.p99,
            self.max,
            self.over_budget_ratio * 100.0,
        )
    }
}

// ---------------------------------------------------------------------------
// Span names
// ---------------------------------------------------------------------------

/// Span names for `tracing::span!`.
pub mod spans {
    /// Whole refresh pass.
    pub const REFRESH: &str = "emotive::refresh";
    /// Stimulus intake.
    pub const STIMULUS: &str = "emotive::stimulus";
    /// Contagion delivery.
    pub const CONTAGION: &str = "emotive::contagion";
    /// Host event drain.
    pub const EVENTS: &str = "emotive::events";
    /// Snapshot save.
    pub const PERSIST_SAVE: &str = "emotive::persist::save";
    /// Snapshot load.
    pub const PERSIST_LOAD: &str = "emotive::persist::load";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_start_at_zero() {
        assert_eq!(EngineCounters::new().snapshot(), CounterSnapshot::default());
    }

    #[test]
    fn prometheus_export_lists_every_counter() {
        let c = EngineCounters::new();
        c.stimuli_applied.fetch_add(7, Ordering::Relaxed);
        c.mood_switches.fetch_add(2, Ordering::Relaxed);
        let text = c.snapshot().to_prometheus();
        assert!(text.contains("emotive_stimuli_applied_total 7"));
        assert!(text.contains("emotive_mood_switches_total 2"));
        assert_eq!(text.matches("# TYPE").count(), 8);
    }

    #[test]
    fn monitor_tracks_budget() {
        let monitor = RefreshBudgetMonitor::new(20.0);
        monitor.record(5.0);
        assert!(!monitor.is_over_budget());
        monitor.record(50.0);
        assert!(monitor.is_over_budget());
        assert!((monitor.last_pass_us() - 50.0).abs() < f64::EPSILON);
        assert_eq!(monitor.pass_count(), 2);
        let p = monitor.percentiles();
        assert!((p.max - 50.0).abs() < f64::EPSILON);
        assert!((p.over_budget_ratio - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn guard_records_on_drop() {
        let monitor = RefreshBudgetMonitor::new(1_000_000.0);
        {
            let _guard = monitor.begin_pass();
        }
        assert_eq!(monitor.pass_count(), 1);
        assert!(!monitor.is_over_budget());
    }
}
