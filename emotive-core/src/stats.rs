//! Small numeric helpers used on every refresh pass.
//!
//! Percentiles run in expected-linear time via `select_nth_unstable_by`
//! (introselect) on a scratch buffer, since the selector and the weight
//! synthesizer each take several percentiles per entity per refresh.

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

/// Linearly-interpolated percentile of `values` (`p` in `[0, 1]`).
///
/// Reorders `values` in place. Returns `0.0` for an empty slice.
#[must_use]
pub fn percentile_in_place(values: &mut [f32], p: f32) -> f32 {
    let n = values.len();
    if n == 0 {
        return 0.0;
    }
    if n == 1 {
        return values[0];
    }

    let pos = p.clamp(0.0, 1.0) * (n - 1) as f32;
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    let lo = pos.floor() as usize;
    let frac = pos - lo as f32;

    let (_, lo_val, upper) = values.select_nth_unstable_by(lo, f32::total_cmp);
    let lo_val = *lo_val;
    if frac <= f32::EPSILON || upper.is_empty() {
        return lo_val;
    }
    // Everything right of the pivot is >= it; its minimum is the next rank.
    let hi_val = upper.iter().copied().fold(f32::INFINITY, f32::min);
    lo_val + (hi_val - lo_val) * frac
}

/// Percentile over an iterator, using `scratch` as the working buffer.
pub fn percentile_of<I>(values: I, p: f32, scratch: &mut Vec<f32>) -> f32
where
    I: IntoIterator<Item = f32>,
{
    scratch.clear();
    scratch.extend(values);
    percentile_in_place(scratch, p)
}

/// Median over an iterator, using `scratch` as the working buffer.
pub fn median_of<I>(values: I, scratch: &mut Vec<f32>) -> f32
where
    I: IntoIterator<Item = f32>,
{
    percentile_of(values, 0.5, scratch)
}

/// Population standard deviation. `0.0` for fewer than two samples.
#[must_use]
pub fn std_dev<'a, I>(values: I) -> f32
where
    I: IntoIterator<Item = &'a f32>,
{
    let (mut n, mut sum, mut sum_sq) = (0_u32, 0.0_f64, 0.0_f64);
    for &v in values {
        n += 1;
        sum += f64::from(v);
        sum_sq += f64::from(v) * f64::from(v);
    }
    if n < 2 {
        return 0.0;
    }
    let mean = sum / f64::from(n);
    let var = (sum_sq / f64::from(n) - mean * mean).max(0.0);
    #[allow(clippy::cast_possible_truncation)]
    let sd = var.sqrt() as f32;
    sd
}

/// Linear interpolation from `a` to `b`.
#[must_use]
pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
    a + (b - a) * t
}

// ---------------------------------------------------------------------------
// Bounded ring buffer
// ---------------------------------------------------------------------------

/// Fixed-capacity FIFO; pushing into a full buffer drops the oldest entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RingBuffer<T> {
    capacity: usize,
    items: VecDeque<T>,
}

impl<T> RingBuffer<T> {
    /// Create an empty buffer holding at most `capacity` items (minimum 1).
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            items: VecDeque::with_capacity(capacity),
        }
    }

    /// Append, evicting the oldest item when full.
    pub fn push(&mut self, item: T) {
        if self.items.len() == self.capacity {
            self.items.pop_front();
        }
        self.items.push_back(item);
    }

    /// Items oldest-first.
    pub fn iter(&self) -> impl Iterator<Item = &T> + '_ {
        self.items.iter()
    }

    /// Most recent item.
    #[must_use]
    pub fn last(&self) -> Option<&T> {
        self.items.back()
    }

    /// Number of stored items.
    #[must_use]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether nothing has been pushed yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Maximum number of items retained.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Re-apply a capacity, e.g. after deserializing an older save.
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity.max(1);
        while self.items.len() > self.capacity {
            self.items.pop_front();
        }
    }

    /// Drop all items.
    pub fn clear(&mut self) {
        self.items.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn percentile_matches_sorted_interpolation() {
        let mut v = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((percentile_in_place(&mut v, 0.5) - 3.0).abs() < 1e-6);
        let mut v = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((percentile_in_place(&mut v, 0.0) - 1.0).abs() < 1e-6);
        let mut v = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((percentile_in_place(&mut v, 1.0) - 5.0).abs() < 1e-6);
        // 0.2 * 4 = 0.8 → between 1 and 2.
        let mut v = vec![5.0, 1.0, 4.0, 2.0, 3.0];
        assert!((percentile_in_place(&mut v, 0.2) - 1.8).abs() < 1e-5);
    }

    #[test]
    fn median_of_even_count_averages_middle() {
        let mut scratch = Vec::new();
        let m = median_of([4.0, 1.0, 3.0, 2.0], &mut scratch);
        assert!((m - 2.5).abs() < 1e-6);
    }

    #[test]
    fn percentile_of_empty_is_zero() {
        let mut scratch = Vec::new();
        assert!(percentile_of(std::iter::empty(), 0.95, &mut scratch).abs() < f32::EPSILON);
    }

    #[test]
    fn std_dev_basics() {
        assert!(std_dev(&[1.0]).abs() < f32::EPSILON);
        let sd = std_dev(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert!((sd - 2.0).abs() < 1e-5);
    }

    #[test]
    fn ring_buffer_evicts_oldest() {
        let mut ring = RingBuffer::new(3);
        for i in 0..5 {
            ring.push(i);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![2, 3, 4]);
        assert_eq!(ring.last(), Some(&4));
    }

    #[test]
    fn ring_buffer_shrinks_on_set_capacity() {
        let mut ring = RingBuffer::new(10);
        for i in 0..10 {
            ring.push(i);
        }
        ring.set_capacity(4);
        assert_eq!(ring.iter().copied().collect::<Vec<_>>(), vec![6, 7, 8, 9]);
    }
}
