// Render-ready view of the current window: series, derived metrics and scales
use crate::application::energy::PerformanceSummary;
use crate::application::segmenter::{hot_water_periods, ModePeriod};
use crate::domain::channel::{ChannelKind, ChannelRole, HiddenSet};
use crate::domain::dataset::WindowDataset;
use crate::domain::sample::{CategoricalSeries, TimeSeries};
use crate::domain::scale::{
    power_axis, temperature_axis, time_labels, ChartGeometry, TimeLabel, TimeScale, ValueAxis,
};
use crate::domain::viewport::Viewport;
use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub struct ChannelSeries {
    pub role: ChannelRole,
    pub label: &'static str,
    pub samples: TimeSeries,
}

/// Everything the rendering layer needs to draw one window.
#[derive(Debug, Clone, Serialize)]
pub struct ChartFrame {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub series: Vec<ChannelSeries>,
    pub mode: CategoricalSeries,
    pub hot_water_periods: Vec<ModePeriod>,
    pub performance: PerformanceSummary,
    pub temperature_axis: ValueAxis,
    pub power_axis: ValueAxis,
    pub time_labels: Vec<TimeLabel>,
    pub time_scale: TimeScale,
}

impl ChartFrame {
    pub fn build(
        dataset: &WindowDataset,
        hidden: &HiddenSet,
        geometry: &ChartGeometry,
        rendered_width: Option<f64>,
    ) -> Self {
        let series = dataset
            .view(hidden)
            .numeric()
            .map(|(role, samples)| ChannelSeries {
                role,
                label: role.label(),
                samples: samples.clone(),
            })
            .collect();

        // Axes cover hidden channels too so toggling a line does not rescale the chart.
        let temperatures = dataset
            .numeric()
            .filter(|(role, _)| role.kind() == ChannelKind::SlowlyVarying)
            .flat_map(|(_, s)| s.values());
        let powers = [ChannelRole::PowerIn, ChannelRole::PowerOut]
            .into_iter()
            .flat_map(|role| dataset.series_or_empty(role).values());

        Self {
            start_time: dataset.start_time,
            end_time: dataset.end_time,
            series,
            mode: dataset.mode().clone(),
            hot_water_periods: hot_water_periods(dataset.mode()),
            performance: PerformanceSummary::for_dataset(dataset),
            temperature_axis: temperature_axis(temperatures),
            power_axis: power_axis(powers),
            time_labels: time_labels(dataset.window()),
            time_scale: geometry.time_scale(dataset.window(), rendered_width),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct TimelineSnapshot {
    pub viewport: Viewport,
    pub loading: bool,
    pub last_error: Option<String>,
    pub frame: Option<ChartFrame>,
}
