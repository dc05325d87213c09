//! Bounded sample history with FIFO eviction.

use std::collections::VecDeque;
use std::time::Instant;

/// One accepted reading.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    pub timestamp: Instant,
    /// Current in µA.
    pub value: f64,
}

/// Oldest-first ring of the most recent `capacity` samples.
#[derive(Debug, Clone)]
pub struct History {
    samples: VecDeque<Sample>,
    capacity: usize,
}

impl History {
    /// `capacity` is clamped to at least 1.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    /// Append a sample, returning the evicted oldest one when full.
    pub fn push(&mut self, sample: Sample) -> Option<Sample> {
        let evicted = if self.samples.len() >= self.capacity {
            self.samples.pop_front()
        } else {
            None
        };
        self.samples.push_back(sample);
        evicted
    }

    /// Change the bound, keeping the newest samples.  Returns how many
    /// were dropped.
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        let excess = self.samples.len().saturating_sub(self.capacity);
        self.samples.drain(..excess);
        excess
    }

    pub fn clear(&mut self) {
        self.samples.clear();
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> impl DoubleEndedIterator<Item = &Sample> + ExactSizeIterator {
        self.samples.iter()
    }

    /// Smallest and largest retained value.
    pub fn value_range(&self) -> Option<(f64, f64)> {
        self.samples.iter().fold(None, |acc, s| match acc {
            None => Some((s.value, s.value)),
            Some((lo, hi)) => Some((lo.min(s.value), hi.max(s.value))),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(value: f64) -> Sample {
        Sample {
            timestamp: Instant::now(),
            value,
        }
    }

    fn values(h: &History) -> Vec<f64> {
        h.iter().map(|s| s.value).collect()
    }

    #[test]
    fn evicts_oldest_at_capacity() {
        let mut h = History::new(3);
        for v in 0..3 {
            assert!(h.push(sample(v as f64)).is_none());
        }
        let evicted = h.push(sample(3.0));
        assert_eq!(evicted.map(|s| s.value), Some(0.0));
        assert_eq!(values(&h), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn shrinking_keeps_newest() {
        let mut h = History::new(10);
        for v in 0..8 {
            h.push(sample(v as f64));
        }
        assert_eq!(h.set_capacity(3), 5);
        assert_eq!(values(&h), vec![5.0, 6.0, 7.0]);

        assert_eq!(h.set_capacity(20), 0);
        assert_eq!(h.len(), 3);
    }

    #[test]
    fn zero_capacity_clamps_to_one() {
        let mut h = History::new(0);
        h.push(sample(1.0));
        h.push(sample(2.0));
        assert_eq!(values(&h), vec![2.0]);
    }

    #[test]
    fn value_range_over_retained() {
        let mut h = History::new(4);
        assert_eq!(h.value_range(), None);
        for v in [2.0, -1.0, 5.0] {
            h.push(sample(v));
        }
        assert_eq!(h.value_range(), Some((-1.0, 5.0)));
    }
}
