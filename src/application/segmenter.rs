// Mode segmenter - contiguous intervals where the operating mode matches
use crate::domain::sample::{CategoricalSeries, Interval};
use serde::Serialize;

/// Intervals over which `predicate` holds for the mode label.
///
/// An interval opens at the first matching sample and closes at the next
/// non-matching one. One still open at the end closes at the last sample.
pub fn segments(modes: &CategoricalSeries, predicate: impl Fn(&str) -> bool) -> Vec<Interval> {
    let mut intervals = Vec::new();
    let mut open = None;

    for sample in modes {
        match (predicate(&sample.value), open) {
            (true, None) => open = Some(sample.time),
            (false, Some(start)) => {
                intervals.push(Interval::new(start, sample.time));
                open = None;
            }
            _ => {}
        }
    }

    if let (Some(start), Some(last)) = (open, modes.last()) {
        intervals.push(Interval::new(start, last.time));
    }

    intervals
}

/// Case-insensitive substring match; mode labels differ in casing and prefix
/// between integrations.
pub fn label_contains(needle: &str) -> impl Fn(&str) -> bool {
    let needle = needle.to_lowercase();
    move |label| label.to_lowercase().contains(&needle)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModePeriod {
    #[serde(flatten)]
    pub interval: Interval,
    pub duration_ms: i64,
    pub duration_label: String,
}

impl ModePeriod {
    pub fn new(interval: Interval) -> Self {
        let duration_ms = interval.duration().num_milliseconds();
        Self {
            interval,
            duration_ms,
            duration_label: format_duration(duration_ms),
        }
    }
}

/// Hot-water periods of the mode channel.
pub fn hot_water_periods(modes: &CategoricalSeries) -> Vec<ModePeriod> {
    segments(modes, label_contains("dhw"))
        .into_iter()
        .map(ModePeriod::new)
        .collect()
}

fn format_duration(ms: i64) -> String {
    let minutes = ms / 60_000;
    let hours = minutes / 60;
    if hours > 0 {
        format!("{}h {}m", hours, minutes % 60)
    } else {
        format!("{}m", minutes)
    }
}
