// Time-series domain models
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// One reading of a channel at an instant.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Sample<T> {
    pub time: DateTime<Utc>,
    pub value: T,
}

impl<T> Sample<T> {
    pub fn new(time: DateTime<Utc>, value: T) -> Self {
        Self { time, value }
    }
}

pub type NumericSample = Sample<f64>;
pub type ModeSample = Sample<String>;

/// Chronologically ordered samples of one channel.
///
/// Construction always sorts by time (stable, so ties keep ingestion order);
/// the series is never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct Series<T> {
    samples: Vec<Sample<T>>,
}

pub type TimeSeries = Series<f64>;
pub type CategoricalSeries = Series<String>;

impl<T> Default for Series<T> {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl<T> Series<T> {
    pub const EMPTY: Self = Self {
        samples: Vec::new(),
    };

    pub fn new(mut samples: Vec<Sample<T>>) -> Self {
        samples.sort_by_key(|s| s.time);
        Self { samples }
    }

    pub fn samples(&self) -> &[Sample<T>] {
        &self.samples
    }

    pub fn into_samples(self) -> Vec<Sample<T>> {
        self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn first(&self) -> Option<&Sample<T>> {
        self.samples.first()
    }

    pub fn last(&self) -> Option<&Sample<T>> {
        self.samples.last()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Sample<T>> {
        self.samples.iter()
    }

    /// The most recent sample at or before `time`.
    pub fn as_of(&self, time: DateTime<Utc>) -> Option<&Sample<T>> {
        let idx = self.samples.partition_point(|s| s.time <= time);
        idx.checked_sub(1).map(|i| &self.samples[i])
    }
}

impl TimeSeries {
    pub fn values(&self) -> impl Iterator<Item = f64> + '_ {
        self.samples.iter().map(|s| s.value)
    }
}

impl<'a, T> IntoIterator for &'a Series<T> {
    type Item = &'a Sample<T>;
    type IntoIter = std::slice::Iter<'a, Sample<T>>;

    fn into_iter(self) -> Self::IntoIter {
        self.samples.iter()
    }
}

/// A closed span of time; `end >= start` always holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Interval {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Interval {
    pub fn new(start: DateTime<Utc>, end: DateTime<Utc>) -> Self {
        if end < start {
            Self { start: end, end: start }
        } else {
            Self { start, end }
        }
    }

    pub fn duration(&self) -> Duration {
        self.end - self.start
    }
}
