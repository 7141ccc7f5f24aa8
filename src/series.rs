use std::collections::VecDeque;

use crate::protocol::SERIES_CAPACITY;

/// Bounded, ordered history of readings for one channel.
///
/// Appending beyond the capacity evicts the oldest value, so the series
/// always holds the most recent `capacity` readings in arrival order.
#[derive(Debug, Clone)]
pub struct Series {
    values: VecDeque<f32>,
    capacity: usize,
}

impl Series {
    /// An empty series holding up to [`SERIES_CAPACITY`] values.
    pub fn new() -> Self {
        Self::with_capacity(SERIES_CAPACITY)
    }

    /// An empty series holding up to `capacity` values (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            values: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append `value`, dropping the oldest value if the series is full.
    pub fn append(&mut self, value: f32) {
        self.values.push_back(value);
        while self.values.len() > self.capacity {
            self.values.pop_front();
        }
    }

    /// Remove every value.
    pub fn reset(&mut self) {
        self.values.clear();
    }

    /// `(index, value)` pairs for plotting, index 0 being the oldest value.
    pub fn snapshot(&self) -> Vec<(f64, f64)> {
        self.values
            .iter()
            .enumerate()
            .map(|(i, &v)| (i as f64, v as f64))
            .collect()
    }

    /// Most recent value, if any.
    pub fn last(&self) -> Option<f32> {
        self.values.back().copied()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values from oldest to newest.
    pub fn iter(&self) -> impl Iterator<Item = f32> + '_ {
        self.values.iter().copied()
    }
}

impl Default for Series {
    fn default() -> Self {
        Self::new()
    }
}
