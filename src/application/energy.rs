// Energy integrator - left-hold integration of power series and COP ratios
use crate::domain::channel::ChannelRole;
use crate::domain::dataset::WindowDataset;
use crate::domain::sample::{CategoricalSeries, TimeSeries};
use chrono::{DateTime, Utc};
use serde::Serialize;

pub const CENTRAL_HEATING: &str = "CH";
pub const HOT_WATER: &str = "DHW";

const MS_PER_HOUR: f64 = 3_600_000.0;

/// Energy in kWh of a power series in watts.
///
/// Each reading holds until the next one; the last reading contributes nothing.
pub fn energy(series: &TimeSeries) -> f64 {
    integrate(series, |_| true)
}

/// Energy restricted to intervals that start while the mode is `target`.
///
/// The mode at an interval start is the most recent mode sample at or before
/// it; intervals before the first mode sample are excluded. `None` counts
/// every interval.
pub fn energy_by_mode(series: &TimeSeries, modes: &CategoricalSeries, target: Option<&str>) -> f64 {
    let Some(target) = target else {
        return energy(series);
    };
    integrate(series, |start| {
        modes
            .as_of(start)
            .is_some_and(|mode| mode.value == target)
    })
}

fn integrate(series: &TimeSeries, include: impl Fn(DateTime<Utc>) -> bool) -> f64 {
    series
        .samples()
        .windows(2)
        .filter(|pair| include(pair[0].time))
        .map(|pair| {
            let hours = (pair[1].time - pair[0].time).num_milliseconds() as f64 / MS_PER_HOUR;
            pair[0].value * hours / 1000.0
        })
        .sum()
}

/// `numerator / denominator`, or 0 when the denominator is not positive.
pub fn ratio(numerator: f64, denominator: f64) -> f64 {
    if denominator > 0.0 {
        numerator / denominator
    } else {
        0.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct PerformanceSummary {
    pub energy_in_kwh: f64,
    pub energy_out_kwh: f64,
    pub window_cop: f64,
    pub ch_scop: f64,
    pub dhw_scop: f64,
}

impl PerformanceSummary {
    pub fn for_dataset(dataset: &WindowDataset) -> Self {
        let power_in = dataset.series_or_empty(ChannelRole::PowerIn);
        let power_out = dataset.series_or_empty(ChannelRole::PowerOut);
        let modes = dataset.mode();

        let energy_in_kwh = energy(power_in);
        let energy_out_kwh = energy(power_out);

        let mode_scop = |label: &str| {
            if modes.is_empty() {
                return 0.0;
            }
            ratio(
                energy_by_mode(power_out, modes, Some(label)),
                energy_by_mode(power_in, modes, Some(label)),
            )
        };

        Self {
            energy_in_kwh,
            energy_out_kwh,
            window_cop: ratio(energy_out_kwh, energy_in_kwh),
            ch_scop: mode_scop(CENTRAL_HEATING),
            dhw_scop: mode_scop(HOT_WATER),
        }
    }
}
