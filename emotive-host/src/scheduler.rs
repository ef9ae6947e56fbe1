//! Wake-up scheduler.
//!
//! Engines only need refreshing when something happened (an event marked
//! them dirty) or when decay will have changed them meaningfully, which
//! `MoodEngine::estimate_next_wake_up` predicts. The scheduler keeps one
//! pending wake-up per entity in a min-heap; rescheduling earlier leaves a
//! stale heap entry behind that is skipped on pop.

use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

use emotive_core::{EntityId, Tick};

/// Min-heap of `(tick, entity)` wake-ups.
#[derive(Debug, Default, Clone)]
pub struct WakeScheduler {
    heap: BinaryHeap<Reverse<(Tick, EntityId)>>,
    pending: HashMap<EntityId, Tick>,
}

impl WakeScheduler {
    /// Empty scheduler.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Wake `entity` at `at`, unless it is already due no later than that.
    pub fn schedule(&mut self, entity: EntityId, at: Tick) {
        if self.pending.get(&entity).is_some_and(|&due| due <= at) {
            return;
        }
        self.pending.insert(entity, at);
        self.heap.push(Reverse((at, entity)));
    }

    /// Replace any pending wake-up for `entity` with `at`.
    pub fn reschedule(&mut self, entity: EntityId, at: Tick) {
        self.pending.remove(&entity);
        self.schedule(entity, at);
    }

    /// Forget `entity`.
    pub fn cancel(&mut self, entity: EntityId) {
        self.pending.remove(&entity);
    }

    /// Pop up to `limit` entities due at or before `now`, earliest first.
    pub fn pop_due(&mut self, now: Tick, limit: usize) -> Vec<EntityId> {
        let mut due = Vec::new();
        while due.len() < limit {
            let Some(&Reverse((at, entity))) = self.heap.peek() else {
                break;
            };
            if at > now {
                break;
            }
            self.heap.pop();
            if self.pending.get(&entity) == Some(&at) {
                self.pending.remove(&entity);
                due.push(entity);
            }
        }
        due
    }

    /// Earliest pending wake-up.
    #[must_use]
    pub fn next_due(&mut self) -> Option<Tick> {
        while let Some(&Reverse((at, entity))) = self.heap.peek() {
            if self.pending.get(&entity) == Some(&at) {
                return Some(at);
            }
            self.heap.pop();
        }
        None
    }

    /// Wake-up pending for `entity`.
    #[must_use]
    pub fn pending(&self, entity: &EntityId) -> Option<Tick> {
        self.pending.get(entity).copied()
    }

    /// Number of entities with a pending wake-up.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pending.len()
    }

    /// Whether nothing is pending.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pops_in_tick_order() {
        let (a, b, c) = (EntityId::new(), EntityId::new(), EntityId::new());
        let mut s = WakeScheduler::new();
        s.schedule(a, 30);
        s.schedule(b, 10);
        s.schedule(c, 20);
        assert_eq!(s.pop_due(25, 10), vec![b, c]);
        assert_eq!(s.next_due(), Some(30));
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn earlier_schedule_wins_and_stale_entries_are_skipped() {
        let a = EntityId::new();
        let mut s = WakeScheduler::new();
        s.schedule(a, 50);
        s.schedule(a, 70);
        assert_eq!(s.pending(&a), Some(50));
        s.schedule(a, 10);
        assert_eq!(s.pop_due(100, 10), vec![a]);
        assert!(s.pop_due(100, 10).is_empty());
        assert!(s.is_empty());
    }

    #[test]
    fn limit_leaves_the_rest_queued() {
        let ids: Vec<EntityId> = (0..5).map(|_| EntityId::new()).collect();
        let mut s = WakeScheduler::new();
        for (i, id) in ids.iter().enumerate() {
            s.schedule(*id, i as Tick);
        }
        assert_eq!(s.pop_due(10, 2).len(), 2);
        assert_eq!(s.len(), 3);
    }

    #[test]
    fn reschedule_and_cancel() {
        let a = EntityId::new();
        let mut s = WakeScheduler::new();
        s.schedule(a, 10);
        s.reschedule(a, 40);
        assert!(s.pop_due(20, 10).is_empty());
        s.cancel(a);
        assert!(s.pop_due(50, 10).is_empty());
        assert_eq!(s.next_due(), None);
    }
}
