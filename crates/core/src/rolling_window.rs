//! Rolling window buffers backing the trend views

use crate::constants::DEFAULT_WINDOW_CAPACITY;
use serde::Serialize;
use std::collections::{BTreeMap, VecDeque};
use tidewatch_types::{Record, TrackedField};

/// Fixed-capacity FIFO of the most recent values of one field.
///
/// Values are kept oldest first. Each value is paired with a synthetic
/// position label (a running sample index) for the chart axis.
#[derive(Debug, Clone)]
pub struct RollingWindow {
    capacity: usize,
    values: VecDeque<f64>,
    labels: VecDeque<u64>,
    next_label: u64,
}

impl RollingWindow {
    /// Create a window holding at most `capacity` values (minimum 1)
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            values: VecDeque::with_capacity(capacity + 1),
            labels: VecDeque::with_capacity(capacity + 1),
            next_label: 0,
        }
    }

    /// Push to the tail, then evict from the head until within capacity
    pub fn append(&mut self, value: f64) {
        self.values.push_back(value);
        self.labels.push_back(self.next_label);
        self.next_label += 1;

        while self.values.len() > self.capacity {
            self.values.pop_front();
            self.labels.pop_front();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Values in chronological order
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.values.iter().copied()
    }

    pub fn labels(&self) -> impl Iterator<Item = u64> + '_ {
        self.labels.iter().copied()
    }

    pub fn latest(&self) -> Option<f64> {
        self.values.back().copied()
    }

    pub fn mean(&self) -> Option<f64> {
        if self.values.is_empty() {
            return None;
        }
        Some(self.values.iter().sum::<f64>() / self.values.len() as f64)
    }

    pub fn min(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::min)
    }

    pub fn max(&self) -> Option<f64> {
        self.values.iter().copied().reduce(f64::max)
    }

    /// Owned copy for consumers outside the delivery path
    pub fn snapshot(&self) -> WindowSnapshot {
        WindowSnapshot {
            capacity: self.capacity,
            labels: self.labels.iter().copied().collect(),
            values: self.values.iter().copied().collect(),
        }
    }
}

impl Default for RollingWindow {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

/// Read-only copy of a window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WindowSnapshot {
    pub capacity: usize,
    pub labels: Vec<u64>,
    pub values: Vec<f64>,
}

/// One rolling window per tracked field, plus the leak flag history.
///
/// Fed by exactly one delivery path; every window receives one value per
/// folded record, so all windows always have the same length.
#[derive(Debug, Clone)]
pub struct TrendSet {
    windows: BTreeMap<TrackedField, RollingWindow>,
    leaks: RollingWindow,
    records_seen: u64,
}

impl TrendSet {
    pub fn new(capacity: usize) -> Self {
        Self::with_fields(capacity, &TrackedField::ALL)
    }

    /// Track only the given fields
    pub fn with_fields(capacity: usize, fields: &[TrackedField]) -> Self {
        Self {
            windows: fields
                .iter()
                .map(|field| (*field, RollingWindow::new(capacity)))
                .collect(),
            leaks: RollingWindow::new(capacity),
            records_seen: 0,
        }
    }

    /// Fold one record into every window
    pub fn record(&mut self, record: &Record) {
        for (field, window) in self.windows.iter_mut() {
            window.append(record.value(*field));
        }
        self.leaks.append(if record.leak { 1.0 } else { 0.0 });
        self.records_seen += 1;
    }

    pub fn window(&self, field: TrackedField) -> Option<&RollingWindow> {
        self.windows.get(&field)
    }

    pub fn fields(&self) -> impl Iterator<Item = TrackedField> + '_ {
        self.windows.keys().copied()
    }

    /// Number of leak flags set within the window
    pub fn leak_events(&self) -> usize {
        self.leaks.values().filter(|v| *v != 0.0).count()
    }

    /// Number of records currently held (identical across windows)
    pub fn len(&self) -> usize {
        self.leaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leaks.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.leaks.capacity()
    }

    /// Records folded in since creation, including evicted ones
    pub fn records_seen(&self) -> u64 {
        self.records_seen
    }

    pub fn snapshot(&self) -> BTreeMap<TrackedField, WindowSnapshot> {
        self.windows
            .iter()
            .map(|(field, window)| (*field, window.snapshot()))
            .collect()
    }
}

impl Default for TrendSet {
    fn default() -> Self {
        Self::new(DEFAULT_WINDOW_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_length_is_min_of_appends_and_capacity() {
        for capacity in [1usize, 3, 50] {
            let mut window = RollingWindow::new(capacity);
            for n in 1..=120usize {
                window.append(n as f64);
                assert_eq!(window.len(), n.min(capacity));

                let expected: Vec<f64> =
                    ((n - n.min(capacity) + 1)..=n).map(|v| v as f64).collect();
                assert_eq!(window.values().collect::<Vec<_>>(), expected);
            }
        }
    }

    #[test]
    fn test_labels_follow_values() {
        let mut window = RollingWindow::new(3);
        for v in [10.0, 20.0, 30.0, 40.0] {
            window.append(v);
        }
        assert_eq!(window.labels().collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(window.latest(), Some(40.0));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let mut window = RollingWindow::new(0);
        window.append(1.0);
        window.append(2.0);
        assert_eq!(window.capacity(), 1);
        assert_eq!(window.values().collect::<Vec<_>>(), vec![2.0]);
    }

    #[test]
    fn test_statistics() {
        let mut window = RollingWindow::new(4);
        assert_eq!(window.mean(), None);
        assert_eq!(window.min(), None);

        for v in [104.0, 110.0, 101.0] {
            window.append(v);
        }
        assert_eq!(window.min(), Some(101.0));
        assert_eq!(window.max(), Some(110.0));
        assert!((window.mean().unwrap() - 105.0).abs() < 1e-9);
    }

    #[test]
    fn test_trend_set_folds_every_field() {
        let mut trends = TrendSet::new(2);
        for (i, leak) in [false, true, true].into_iter().enumerate() {
            let record = Record {
                pressure: 100.0 + i as f64,
                ext_temp: 20.0 + i as f64,
                leak,
                ..Record::default()
            };
            trends.record(&record);
        }

        let pressure = trends.window(TrackedField::Pressure).unwrap();
        assert_eq!(pressure.values().collect::<Vec<_>>(), vec![101.0, 102.0]);
        let ext = trends.window(TrackedField::ExternalTemp).unwrap();
        assert_eq!(ext.values().collect::<Vec<_>>(), vec![21.0, 22.0]);

        assert_eq!(trends.len(), 2);
        assert_eq!(trends.leak_events(), 2);
        assert_eq!(trends.records_seen(), 3);
        assert_eq!(trends.snapshot().len(), TrackedField::ALL.len());
    }
}
