//! Bounded rolling window of recent readings

use std::collections::VecDeque;

use chrono::Duration;

use crate::reading::Reading;

/// Readings kept when no capacity is configured
pub const DEFAULT_CAPACITY: usize = 10;

/// Fixed-capacity FIFO of readings, oldest first.
///
/// Order is arrival order. A reading delivered late is appended at the tail
/// like any other; the window never re-sorts on insert.
#[derive(Debug, Clone)]
pub struct HistoryWindow {
    readings: VecDeque<Reading>,
    capacity: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

impl HistoryWindow {
    /// Create an empty window. A capacity of zero is treated as one.
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            readings: VecDeque::with_capacity(capacity + 1),
            capacity,
        }
    }

    /// Append at the tail, evicting from the head once full.
    /// Returns how many readings were evicted.
    pub fn insert(&mut self, reading: Reading) -> usize {
        self.readings.push_back(reading);
        self.evict()
    }

    /// Insert unless a reading with the same timestamp is already held.
    ///
    /// Successive fetches overlap, so the same entry usually arrives several
    /// cycles in a row. Returns whether the reading was inserted.
    pub fn insert_new(&mut self, reading: Reading) -> bool {
        if self.contains_timestamp(&reading) {
            return false;
        }
        self.insert(reading);
        true
    }

    /// Replace the contents with `readings`, sorted by measurement time once.
    /// Only the newest `capacity` readings survive.
    pub fn load(&mut self, mut readings: Vec<Reading>) {
        readings.sort_by_key(|r| r.timestamp());
        self.readings.clear();
        for reading in readings {
            self.insert(reading);
        }
    }

    /// Read-only ordered view, oldest to newest
    pub fn snapshot(&self) -> Vec<&Reading> {
        self.readings.iter().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Reading> + '_ {
        self.readings.iter()
    }

    /// Most recently inserted reading
    pub fn latest(&self) -> Option<&Reading> {
        self.readings.back()
    }

    pub fn clear(&mut self) {
        self.readings.clear();
    }

    pub fn count(&self) -> usize {
        self.readings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.readings.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Change the capacity; shrinking evicts the oldest readings
    pub fn set_capacity(&mut self, capacity: usize) -> usize {
        self.capacity = capacity.max(1);
        self.evict()
    }

    fn contains_timestamp(&self, reading: &Reading) -> bool {
        self.readings.iter().any(|r| r.timestamp() == reading.timestamp())
    }

    fn evict(&mut self) -> usize {
        let mut evicted = 0;
        while self.readings.len() > self.capacity {
            self.readings.pop_front();
            evicted += 1;
        }
        evicted
    }
}

/// Opt-in pre-filter that only lets through readings worth showing.
///
/// A candidate passes when nothing has been shown yet, when it moved more
/// than `min_change` mg/dL from the last shown reading, or when at least
/// `min_interval` has passed since it. The window never applies this itself;
/// callers that want it check `admits` before `insert`.
#[derive(Debug, Clone, Copy)]
pub struct SignificantChangeFilter {
    pub min_change: f64,
    pub min_interval: Duration,
}

impl Default for SignificantChangeFilter {
    fn default() -> Self {
        Self {
            min_change: 5.0,
            min_interval: Duration::minutes(5),
        }
    }
}

impl SignificantChangeFilter {
    pub fn admits(&self, last: Option<&Reading>, candidate: &Reading) -> bool {
        let Some(last) = last else {
            return true;
        };
        (candidate.value() - last.value()).abs() > self.min_change
            || candidate.timestamp() - last.timestamp() >= self.min_interval
    }
}
