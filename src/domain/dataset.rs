// Window dataset - every channel series for one fetched window
use super::channel::{ChannelRole, HiddenSet};
use super::sample::{CategoricalSeries, Interval, TimeSeries};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

/// All channel series for one fetch. Replaced as a whole on every
/// navigation step, never patched.
#[derive(Debug, Clone, PartialEq)]
pub struct WindowDataset {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    numeric: BTreeMap<ChannelRole, TimeSeries>,
    mode: CategoricalSeries,
}

impl WindowDataset {
    pub fn new(
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
        numeric: BTreeMap<ChannelRole, TimeSeries>,
        mode: CategoricalSeries,
    ) -> Self {
        Self {
            start_time,
            end_time,
            numeric,
            mode,
        }
    }

    pub fn window(&self) -> Interval {
        Interval::new(self.start_time, self.end_time)
    }

    pub fn series(&self, role: ChannelRole) -> Option<&TimeSeries> {
        self.numeric.get(&role)
    }

    /// The series for `role`, or an empty one if the channel is not configured.
    pub fn series_or_empty(&self, role: ChannelRole) -> &TimeSeries {
        static EMPTY: TimeSeries = TimeSeries::EMPTY;
        self.numeric.get(&role).unwrap_or(&EMPTY)
    }

    pub fn mode(&self) -> &CategoricalSeries {
        &self.mode
    }

    pub fn numeric(&self) -> impl Iterator<Item = (ChannelRole, &TimeSeries)> {
        self.numeric.iter().map(|(role, series)| (*role, series))
    }

    /// Borrow the dataset with a presentation filter applied.
    pub fn view<'a>(&'a self, hidden: &'a HiddenSet) -> DatasetView<'a> {
        DatasetView {
            dataset: self,
            hidden,
        }
    }
}

/// A dataset seen through a [`HiddenSet`]: hidden channels look absent.
#[derive(Debug, Clone, Copy)]
pub struct DatasetView<'a> {
    dataset: &'a WindowDataset,
    hidden: &'a HiddenSet,
}

impl<'a> DatasetView<'a> {
    pub fn dataset(&self) -> &'a WindowDataset {
        self.dataset
    }

    pub fn series(&self, role: ChannelRole) -> Option<&'a TimeSeries> {
        if self.hidden.contains(role) {
            return None;
        }
        self.dataset.series(role)
    }

    /// The operating mode series, unless the mode channel is hidden.
    pub fn mode(&self) -> Option<&'a CategoricalSeries> {
        if self.hidden.contains(ChannelRole::Mode) {
            return None;
        }
        Some(&self.dataset.mode)
    }

    pub fn numeric(&self) -> impl Iterator<Item = (ChannelRole, &'a TimeSeries)> + 'a {
        let hidden = self.hidden;
        self.dataset
            .numeric
            .iter()
            .filter(move |(role, _)| !hidden.contains(**role))
            .map(|(role, series)| (*role, series))
    }
}
