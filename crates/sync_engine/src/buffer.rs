//! Per-stream measurement buffer with bound enforcement.
//!
//! Backed by a `VecDeque` so insert and front-eviction stay O(1) amortized;
//! the buffer sits on the sample callback path and must never scan-and-shift.
//! Entries are non-decreasing by timestamp under normal delivery; arrivals
//! that break the order are counted but stored anyway.

use std::collections::VecDeque;
use std::fmt;

use contracts::{BufferBound, Measurement, SensorKind};

/// What `insert` did to honor the bound.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Stored without hitting the capacity bound.
    Stored,
    /// Capacity bound hit: the oldest entry was dropped to make room.
    Overflowed,
}

/// Three neighbors of a target timestamp, borrowed from the buffer.
///
/// `older` is the last entry at or before the target, `newer` the first at or
/// after it (the same entry on an exact hit). `earlier` precedes `older` and
/// feeds quadratic fits.
#[derive(Debug, Default)]
pub struct Bracket<'a> {
    pub earlier: Option<&'a Measurement>,
    pub older: Option<&'a Measurement>,
    pub newer: Option<&'a Measurement>,
}

/// Bounded per-kind sample buffer.
pub struct StreamBuffer {
    kind: SensorKind,
    entries: VecDeque<Measurement>,
    bound: BufferBound,
    dropped_count: u64,
    out_of_order_count: u64,
    last_timestamp: Option<i64>,
}

impl fmt::Debug for StreamBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamBuffer")
            .field("kind", &self.kind)
            .field("len", &self.entries.len())
            .field("bound", &self.bound)
            .field("dropped", &self.dropped_count)
            .finish()
    }
}

impl StreamBuffer {
    /// Create a buffer for `kind` with the given retention bound.
    pub fn new(kind: SensorKind, bound: BufferBound) -> Self {
        let entries = match bound {
            BufferBound::Capacity { max_len } => VecDeque::with_capacity(max_len + 1),
            BufferBound::Window { .. } => VecDeque::new(),
        };
        Self {
            kind,
            entries,
            bound,
            dropped_count: 0,
            out_of_order_count: 0,
            last_timestamp: None,
        }
    }

    /// Append a measurement, then apply the retention bound.
    ///
    /// Under `Window(w)` entries older than `newest - w` are trimmed
    /// silently. Under `Capacity(n)` the oldest entry is dropped on overflow
    /// and the caller is told, once per overflowing insert.
    #[inline]
    pub fn insert(&mut self, measurement: Measurement) -> InsertOutcome {
        if let Some(last) = self.last_timestamp {
            if measurement.timestamp < last {
                self.out_of_order_count += 1;
            }
        }
        self.last_timestamp = Some(measurement.timestamp);

        self.entries.push_back(measurement);

        match self.bound {
            BufferBound::Window { window_ns } => {
                let newest = self
                    .entries
                    .back()
                    .map(|m| m.timestamp)
                    .unwrap_or_default();
                self.dropped_count += self.trim_front_before(newest - window_ns) as u64;
                InsertOutcome::Stored
            }
            BufferBound::Capacity { max_len } => {
                if self.entries.len() > max_len {
                    self.entries.pop_front();
                    self.dropped_count += 1;
                    InsertOutcome::Overflowed
                } else {
                    InsertOutcome::Stored
                }
            }
        }
    }

    /// Newest entry, if any.
    #[inline]
    pub fn peek_newest(&self) -> Option<&Measurement> {
        self.entries.back()
    }

    /// Oldest entry, if any.
    #[inline]
    pub fn peek_oldest(&self) -> Option<&Measurement> {
        self.entries.front()
    }

    /// Remove and return, oldest first, every entry strictly before
    /// `timestamp`.
    pub fn take_all_before(&mut self, timestamp: i64) -> Vec<Measurement> {
        let mut taken = Vec::new();
        while let Some(front) = self.entries.front() {
            if front.timestamp >= timestamp {
                break;
            }
            if let Some(m) = self.entries.pop_front() {
                taken.push(m);
            }
        }
        taken
    }

    /// Remove and return every entry, oldest first.
    pub fn take_all(&mut self) -> Vec<Measurement> {
        self.entries.drain(..).collect()
    }

    /// Drop entries strictly before `cutoff` without returning them.
    ///
    /// Returns how many were dropped; used for window aging, where evictions
    /// are silent.
    #[inline]
    pub fn evict_older_than(&mut self, cutoff: i64) -> usize {
        let evicted = self.trim_front_before(cutoff);
        self.dropped_count += evicted as u64;
        evicted
    }

    /// Neighboring entries around `target`, for bracket interpolation.
    pub fn bracket_around(&self, target: i64) -> Bracket<'_> {
        let mut bracket = Bracket::default();

        let older_idx = self.entries.iter().rposition(|m| m.timestamp <= target);
        if let Some(idx) = older_idx {
            bracket.older = self.entries.get(idx);
            if idx > 0 {
                bracket.earlier = self.entries.get(idx - 1);
            }
        }
        bracket.newer = self.entries.iter().find(|m| m.timestamp >= target);

        bracket
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop every entry and reset the ordering watermark. Counters survive a
    /// clear; they describe the stream, not the current run of entries.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.last_timestamp = None;
    }

    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Entries evicted by bound enforcement so far.
    #[inline]
    pub fn dropped_count(&self) -> u64 {
        self.dropped_count
    }

    /// Arrivals that broke the non-decreasing timestamp order.
    #[inline]
    pub fn out_of_order_count(&self) -> u64 {
        self.out_of_order_count
    }

    fn trim_front_before(&mut self, cutoff: i64) -> usize {
        let mut trimmed = 0;
        while let Some(front) = self.entries.front() {
            if front.timestamp >= cutoff {
                break;
            }
            self.entries.pop_front();
            trimmed += 1;
        }
        trimmed
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Accuracy;

    fn sample(timestamp: i64) -> Measurement {
        Measurement::vector(1.0, 2.0, 3.0, timestamp, Accuracy::High)
    }

    fn window_buffer(window_ns: i64) -> StreamBuffer {
        StreamBuffer::new(SensorKind::Gyroscope, BufferBound::Window { window_ns })
    }

    fn capacity_buffer(max_len: usize) -> StreamBuffer {
        StreamBuffer::new(SensorKind::Gyroscope, BufferBound::Capacity { max_len })
    }

    #[test]
    fn window_bound_trims_aged_entries() {
        let mut buffer = window_buffer(100);

        buffer.insert(sample(0));
        buffer.insert(sample(50));
        buffer.insert(sample(200));

        // 0 and 50 are older than 200 - 100
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.peek_oldest().unwrap().timestamp, 200);
        assert_eq!(buffer.dropped_count(), 2);
    }

    #[test]
    fn window_bound_keeps_entries_on_the_edge() {
        let mut buffer = window_buffer(100);

        buffer.insert(sample(100));
        buffer.insert(sample(200));

        // 100 == 200 - 100 stays
        assert_eq!(buffer.len(), 2);
    }

    #[test]
    fn capacity_bound_drops_oldest_and_reports() {
        let mut buffer = capacity_buffer(2);

        assert_eq!(buffer.insert(sample(1)), InsertOutcome::Stored);
        assert_eq!(buffer.insert(sample(2)), InsertOutcome::Stored);
        assert_eq!(buffer.insert(sample(3)), InsertOutcome::Overflowed);

        assert_eq!(buffer.len(), 2);
        assert_eq!(buffer.peek_oldest().unwrap().timestamp, 2);
        assert_eq!(buffer.peek_newest().unwrap().timestamp, 3);
        assert_eq!(buffer.dropped_count(), 1);
    }

    #[test]
    fn take_all_before_is_strict_and_ordered() {
        let mut buffer = capacity_buffer(8);
        for t in [10, 20, 30, 40] {
            buffer.insert(sample(t));
        }

        let taken = buffer.take_all_before(30);
        let timestamps: Vec<i64> = taken.iter().map(|m| m.timestamp).collect();
        assert_eq!(timestamps, vec![10, 20]);
        assert_eq!(buffer.peek_oldest().unwrap().timestamp, 30);
    }

    #[test]
    fn bracket_around_finds_neighbors() {
        let mut buffer = capacity_buffer(8);
        for t in [10, 20, 30] {
            buffer.insert(sample(t));
        }

        let bracket = buffer.bracket_around(25);
        assert_eq!(bracket.earlier.unwrap().timestamp, 10);
        assert_eq!(bracket.older.unwrap().timestamp, 20);
        assert_eq!(bracket.newer.unwrap().timestamp, 30);
    }

    #[test]
    fn bracket_around_exact_hit_uses_one_entry() {
        let mut buffer = capacity_buffer(8);
        buffer.insert(sample(10));
        buffer.insert(sample(20));

        let bracket = buffer.bracket_around(20);
        assert_eq!(bracket.older.unwrap().timestamp, 20);
        assert_eq!(bracket.newer.unwrap().timestamp, 20);
    }

    #[test]
    fn out_of_order_arrivals_are_counted() {
        let mut buffer = capacity_buffer(8);
        buffer.insert(sample(10));
        buffer.insert(sample(30));
        buffer.insert(sample(20));

        assert_eq!(buffer.out_of_order_count(), 1);
    }

    #[test]
    fn clear_keeps_counters() {
        let mut buffer = capacity_buffer(1);
        buffer.insert(sample(1));
        buffer.insert(sample(2));
        buffer.clear();

        assert!(buffer.is_empty());
        assert_eq!(buffer.dropped_count(), 1);
    }
}
