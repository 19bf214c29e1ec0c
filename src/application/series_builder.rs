// Series builder - turns raw history records into sorted series
use crate::application::history_provider::HistoryRecord;
use crate::domain::sample::{CategoricalSeries, Sample, Series, TimeSeries};
use chrono::{DateTime, Utc};

const SENTINEL_STATES: [&str; 2] = ["unknown", "unavailable"];

fn usable_state(record: &HistoryRecord) -> Option<(DateTime<Utc>, &str)> {
    let state = record.state.as_deref()?;
    if state.is_empty() || SENTINEL_STATES.contains(&state) {
        return None;
    }
    Some((record.timestamp()?, state))
}

/// Numeric series scaled by `factor`; sentinel and unparseable states are dropped.
pub fn build(records: &[HistoryRecord], factor: f64) -> TimeSeries {
    let samples = records
        .iter()
        .filter_map(|record| {
            let (time, state) = usable_state(record)?;
            let value = state.trim().parse::<f64>().ok().filter(|v| v.is_finite())?;
            Some(Sample::new(time, value * factor))
        })
        .collect();
    Series::new(samples)
}

/// Label series for the operating mode channel; only sentinel states are dropped.
pub fn build_categorical(records: &[HistoryRecord]) -> CategoricalSeries {
    let samples = records
        .iter()
        .filter_map(|record| {
            let (time, state) = usable_state(record)?;
            Some(Sample::new(time, state.to_string()))
        })
        .collect();
    Series::new(samples)
}

/// Repeat the last value at `end_time` so the series reaches the window edge.
///
/// Does nothing for an empty series or one that already reaches `end_time`.
pub fn extend<T: Clone>(series: Series<T>, end_time: DateTime<Utc>) -> Series<T> {
    let tail = match series.last() {
        Some(last) if last.time < end_time => Sample::new(end_time, last.value.clone()),
        _ => return series,
    };
    let mut samples = series.into_samples();
    samples.push(tail);
    Series::new(samples)
}
