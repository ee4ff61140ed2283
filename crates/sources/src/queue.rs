//! Shared sample queue backing the pull accessors of a source.

use std::collections::VecDeque;

use contracts::Measurement;

/// Bounded queue of produced samples, tagged with the source's cursor.
///
/// The producing thread pushes, the engine drains through the
/// `samples_before_*` accessors. Oldest entries are evicted when the
/// bound is hit so a slow consumer never blocks the producer.
#[derive(Debug)]
pub(crate) struct SampleQueue {
    entries: VecDeque<(u64, Measurement)>,
    capacity: usize,
}

impl SampleQueue {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Append a sample produced at `position`, evicting the oldest entry
    /// when full.
    pub(crate) fn push(&mut self, position: u64, measurement: Measurement) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back((position, measurement));
    }

    /// Remove and return samples with cursor strictly before `position`,
    /// oldest first.
    pub(crate) fn take_before_position(&mut self, position: u64) -> Vec<Measurement> {
        let mut drained = Vec::new();
        while let Some((cursor, _)) = self.entries.front() {
            if *cursor >= position {
                break;
            }
            if let Some((_, measurement)) = self.entries.pop_front() {
                drained.push(measurement);
            }
        }
        drained
    }

    /// Remove and return samples with timestamp strictly before
    /// `timestamp`, oldest first.
    pub(crate) fn take_before_timestamp(&mut self, timestamp: i64) -> Vec<Measurement> {
        let mut drained = Vec::new();
        while let Some((_, measurement)) = self.entries.front() {
            if measurement.timestamp >= timestamp {
                break;
            }
            if let Some((_, measurement)) = self.entries.pop_front() {
                drained.push(measurement);
            }
        }
        drained
    }

    pub(crate) fn clear(&mut self) {
        self.entries.clear();
    }

    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use contracts::Accuracy;

    fn sample(ts: i64) -> Measurement {
        Measurement::vector(1.0, 0.0, 0.0, ts, Accuracy::High)
    }

    #[test]
    fn push_evicts_oldest_when_full() {
        let mut queue = SampleQueue::new(2);
        queue.push(1, sample(10));
        queue.push(2, sample(20));
        queue.push(3, sample(30));

        assert_eq!(queue.len(), 2);
        let drained = queue.take_before_position(u64::MAX);
        assert_eq!(drained.len(), 2);
        assert_eq!(drained[0].timestamp, 20);
        assert_eq!(drained[1].timestamp, 30);
    }

    #[test]
    fn take_before_position_is_strict() {
        let mut queue = SampleQueue::new(8);
        queue.push(1, sample(10));
        queue.push(2, sample(20));
        queue.push(3, sample(30));

        let drained = queue.take_before_position(3);
        assert_eq!(drained.len(), 2);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn take_before_timestamp_is_strict() {
        let mut queue = SampleQueue::new(8);
        queue.push(1, sample(10));
        queue.push(2, sample(20));
        queue.push(3, sample(30));

        let drained = queue.take_before_timestamp(20);
        assert_eq!(drained.len(), 1);
        assert_eq!(drained[0].timestamp, 10);
        assert_eq!(queue.len(), 2);
    }
}
