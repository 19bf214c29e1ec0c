// Chart geometry, pixel <-> time mapping and value axes
use super::error::TimelineError;
use super::sample::Interval;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

const TEMPERATURE_FLOOR: f64 = 0.0;
const TEMPERATURE_CEILING: f64 = 45.0;
const POWER_CEILING: f64 = 7000.0;
const MAX_TIME_LABELS: i64 = 12;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

impl Default for Padding {
    fn default() -> Self {
        Self {
            top: 40.0,
            right: 60.0,
            bottom: 60.0,
            left: 60.0,
        }
    }
}

/// Configured chart size. The plotting area is what remains after padding.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ChartGeometry {
    pub width: f64,
    pub height: f64,
    pub padding: Padding,
}

impl ChartGeometry {
    pub fn new(width: f64, height: f64, padding: Padding) -> Result<Self, TimelineError> {
        let geometry = Self {
            width,
            height,
            padding,
        };
        if !(geometry.plot_width() > 0.0) || !(geometry.plot_height() > 0.0) {
            return Err(TimelineError::InvalidGeometry(format!(
                "{}x{} leaves no plotting area",
                width, height
            )));
        }
        Ok(geometry)
    }

    pub fn plot_width(&self) -> f64 {
        self.width - self.padding.left - self.padding.right
    }

    pub fn plot_height(&self) -> f64 {
        self.height - self.padding.top - self.padding.bottom
    }

    /// Time scale for the chart as drawn at `rendered_width` pixels.
    ///
    /// The chart may be displayed scaled, so padding shrinks or grows with it.
    pub fn time_scale(&self, window: Interval, rendered_width: Option<f64>) -> TimeScale {
        let rendered = rendered_width
            .filter(|w| w.is_finite() && *w > 0.0)
            .unwrap_or(self.width);
        let scale = rendered / self.width;
        let plot_left = self.padding.left * scale;
        let plot_width = rendered - plot_left - self.padding.right * scale;

        TimeScale {
            start_time: window.start,
            end_time: window.end,
            plot_left,
            plot_width,
        }
    }
}

/// Affine mapping between a horizontal pixel and an instant.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TimeScale {
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub plot_left: f64,
    pub plot_width: f64,
}

impl TimeScale {
    fn span_ms(&self) -> f64 {
        (self.end_time - self.start_time).num_milliseconds() as f64
    }

    /// Clamp a pixel into the plotting area.
    pub fn clamp_pixel(&self, x: f64) -> f64 {
        x.clamp(self.plot_left, self.plot_left + self.plot_width)
    }

    pub fn pixel_to_time(&self, x: f64) -> DateTime<Utc> {
        let ratio = (self.clamp_pixel(x) - self.plot_left) / self.plot_width;
        let offset = (ratio * self.span_ms()).round() as i64;
        self.start_time + Duration::milliseconds(offset)
    }

    pub fn time_to_pixel(&self, time: DateTime<Utc>) -> f64 {
        let span = self.span_ms();
        if span <= 0.0 {
            return self.plot_left;
        }
        let offset = (time - self.start_time).num_milliseconds() as f64;
        self.plot_left + offset / span * self.plot_width
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueAxis {
    pub min: f64,
    pub max: f64,
    pub ticks: Vec<f64>,
}

/// Shared axis for temperatures and flow rate; always spans at least 0..45.
pub fn temperature_axis(values: impl IntoIterator<Item = f64>) -> ValueAxis {
    let (min, max) = values.into_iter().filter(|v| v.is_finite()).fold(
        (TEMPERATURE_FLOOR, TEMPERATURE_CEILING),
        |(lo, hi), v| (lo.min(v), hi.max(v)),
    );
    let (min, max) = (min.floor(), max.ceil());
    ValueAxis {
        min,
        max,
        ticks: ticks(min, max, 8),
    }
}

/// Power axis from zero; always spans at least 7 kW.
pub fn power_axis(values: impl IntoIterator<Item = f64>) -> ValueAxis {
    let max = values
        .into_iter()
        .filter(|v| v.is_finite())
        .fold(POWER_CEILING, f64::max)
        .ceil();
    ValueAxis {
        min: 0.0,
        max,
        ticks: ticks(0.0, max, 8),
    }
}

/// `count` evenly spaced ticks from `min` to `max` inclusive.
pub fn ticks(min: f64, max: f64, count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![min],
        _ => {
            let step = (max - min) / (count - 1) as f64;
            (0..count).map(|i| min + step * i as f64).collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimeLabel {
    pub time: DateTime<Utc>,
    pub label: String,
}

/// Evenly spaced labels along the time axis, formatted for the window size.
pub fn time_labels(window: Interval) -> Vec<TimeLabel> {
    let duration = window.duration();
    let hours = (duration.num_milliseconds() as f64 / 3_600_000.0).ceil().max(1.0) as i64;
    let divisions = (hours * 2).min(MAX_TIME_LABELS);
    let format = if hours <= 1 {
        "%H:%M"
    } else if hours <= 24 {
        "%H:00"
    } else {
        "%-d/%-m"
    };

    (0..=divisions)
        .map(|i| {
            let time = window.start + duration * i as i32 / divisions as i32;
            TimeLabel {
                time,
                label: time.format(format).to_string(),
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn hour_window() -> Interval {
        Interval::new(
            Utc.with_ymd_and_hms(2025, 1, 10, 12, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 10, 13, 0, 0).unwrap(),
        )
    }

    #[test]
    fn test_geometry_rejects_empty_plot() {
        assert!(ChartGeometry::new(100.0, 400.0, Padding::default()).is_err());
        assert!(ChartGeometry::new(1000.0, 400.0, Padding::default()).is_ok());
    }

    #[test]
    fn test_pixel_time_mapping() {
        let geometry = ChartGeometry::new(1000.0, 400.0, Padding::default()).unwrap();
        let scale = geometry.time_scale(hour_window(), None);

        assert_eq!(scale.plot_left, 60.0);
        assert_eq!(scale.plot_width, 880.0);
        assert_eq!(scale.pixel_to_time(60.0), hour_window().start);
        assert_eq!(scale.pixel_to_time(940.0), hour_window().end);
        assert_eq!(
            scale.pixel_to_time(500.0),
            Utc.with_ymd_and_hms(2025, 1, 10, 12, 30, 0).unwrap()
        );
        // Padding pixels clamp to the plot edges.
        assert_eq!(scale.pixel_to_time(0.0), hour_window().start);
        assert_eq!(scale.pixel_to_time(999.0), hour_window().end);
        assert_eq!(scale.time_to_pixel(hour_window().end), 940.0);
    }

    #[test]
    fn test_rendered_width_scales_padding() {
        let geometry = ChartGeometry::new(1000.0, 400.0, Padding::default()).unwrap();
        let scale = geometry.time_scale(hour_window(), Some(500.0));

        assert_eq!(scale.plot_left, 30.0);
        assert_eq!(scale.plot_width, 440.0);
        assert_eq!(
            scale.pixel_to_time(250.0),
            Utc.with_ymd_and_hms(2025, 1, 10, 12, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_axes_have_minimum_extent() {
        let axis = temperature_axis(vec![21.4, 38.2]);
        assert_eq!((axis.min, axis.max), (0.0, 45.0));

        let axis = temperature_axis(vec![-3.2, 52.1]);
        assert_eq!((axis.min, axis.max), (-4.0, 53.0));
        assert_eq!(axis.ticks.len(), 8);

        let axis = power_axis(vec![1200.0, 8400.5]);
        assert_eq!((axis.min, axis.max), (0.0, 8401.0));
        assert_eq!(power_axis(Vec::new()).max, 7000.0);
    }

    #[test]
    fn test_ticks() {
        assert_eq!(ticks(0.0, 10.0, 3), vec![0.0, 5.0, 10.0]);
        assert!(ticks(0.0, 10.0, 0).is_empty());
    }

    #[test]
    fn test_time_labels_format_by_window() {
        let labels = time_labels(hour_window());
        assert_eq!(labels.len(), 3);
        assert_eq!(labels[0].label, "12:00");
        assert_eq!(labels[1].label, "12:30");
        assert_eq!(labels[2].label, "13:00");

        let day = Interval::new(
            Utc.with_ymd_and_hms(2025, 1, 10, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2025, 1, 13, 0, 0, 0).unwrap(),
        );
        let labels = time_labels(day);
        assert_eq!(labels.len(), 13);
        assert_eq!(labels[0].label, "10/1");
        assert_eq!(labels[12].label, "13/1");
    }
}
