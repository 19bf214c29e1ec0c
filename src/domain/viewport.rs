// Viewport state machine - which window of history is on screen
use super::error::TimelineError;
use super::sample::Interval;
use super::scale::TimeScale;
use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

/// Narrowest window any navigation step may produce.
pub const MIN_WINDOW: Duration = Duration::seconds(60);

/// Drags shorter than this many pixels are treated as clicks.
pub const MIN_DRAG_PIXELS: f64 = 10.0;

/// Widest "last N hours" preset, a century.
pub const MAX_PRESET_HOURS: f64 = 24.0 * 366.0 * 100.0;

const MS_PER_HOUR: f64 = 3_600_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Viewport {
    /// The last `hours` hours, ending at "now" whenever it is resolved.
    Relative { hours: f64 },
    Absolute {
        start_time: DateTime<Utc>,
        end_time: DateTime<Utc>,
    },
}

impl Viewport {
    pub fn resolve(&self, now: DateTime<Utc>) -> Interval {
        match *self {
            Viewport::Relative { hours } => {
                let start = Duration::try_milliseconds((hours * MS_PER_HOUR).round() as i64)
                    .and_then(|width| now.checked_sub_signed(width.max(MIN_WINDOW)))
                    .unwrap_or(DateTime::<Utc>::MIN_UTC);
                Interval::new(start, now)
            }
            Viewport::Absolute {
                start_time,
                end_time,
            } => Interval::new(start_time, end_time),
        }
    }
}

/// Holds the active [`Viewport`] and applies navigation steps to it.
///
/// Every successful step leaves an absolute or relative window whose start is
/// strictly before its end. Rejected steps leave the state untouched.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewportController {
    viewport: Viewport,
}

impl ViewportController {
    pub fn new(default_hours: f64) -> Result<Self, TimelineError> {
        validate_hours(default_hours)?;
        Ok(Self {
            viewport: Viewport::Relative {
                hours: default_hours,
            },
        })
    }

    pub fn viewport(&self) -> Viewport {
        self.viewport
    }

    pub fn window(&self, now: DateTime<Utc>) -> Interval {
        self.viewport.resolve(now)
    }

    /// Switch back to "last N hours", dropping any absolute override.
    pub fn select_preset(&mut self, hours: f64) -> Result<(), TimelineError> {
        validate_hours(hours)?;
        self.viewport = Viewport::Relative { hours };
        Ok(())
    }

    /// Move the window by `fraction` of its own width (negative is back in time).
    pub fn shift(&mut self, fraction: f64, now: DateTime<Utc>) -> Result<(), TimelineError> {
        if !fraction.is_finite() {
            return Err(TimelineError::InvalidShiftFraction(fraction));
        }
        let current = self.window(now);
        let width = millis(current.duration());
        let delta = Duration::try_milliseconds((width * fraction).round() as i64)
            .ok_or(TimelineError::WindowOutOfRange)?;

        let start = checked_add(current.start, delta)?;
        let end = checked_add(current.end, delta)?;
        self.set_absolute(start, end);
        Ok(())
    }

    /// Scale the window width around its centre; `factor < 1` zooms in.
    pub fn zoom(&mut self, factor: f64, now: DateTime<Utc>) -> Result<(), TimelineError> {
        if !factor.is_finite() || factor <= 0.0 {
            return Err(TimelineError::InvalidZoomFactor(factor));
        }
        let current = self.window(now);
        let width = millis(current.duration()) * factor;
        let center = current.start.timestamp_millis() as f64 + millis(current.duration()) / 2.0;

        let (start, end) = centered(center, width)?;
        self.set_absolute(start, end);
        Ok(())
    }

    /// Select the window between two pixels of a drag gesture.
    ///
    /// Returns `false` without changing state when the drag is too short to be
    /// a selection.
    pub fn drag_select(
        &mut self,
        start_px: f64,
        end_px: f64,
        scale: &TimeScale,
    ) -> Result<bool, TimelineError> {
        let (a, b) = (scale.clamp_pixel(start_px), scale.clamp_pixel(end_px));
        if !a.is_finite() || !b.is_finite() || (b - a).abs() < MIN_DRAG_PIXELS {
            return Ok(false);
        }

        let (t1, t2) = (scale.pixel_to_time(a), scale.pixel_to_time(b));
        let selected = Interval::new(t1, t2);
        if selected.duration() < MIN_WINDOW {
            let center = selected.start.timestamp_millis() as f64
                + millis(selected.duration()) / 2.0;
            let (start, end) = centered(center, 0.0)?;
            self.set_absolute(start, end);
        } else {
            self.set_absolute(selected.start, selected.end);
        }
        Ok(true)
    }

    fn set_absolute(&mut self, start_time: DateTime<Utc>, end_time: DateTime<Utc>) {
        self.viewport = Viewport::Absolute {
            start_time,
            end_time,
        };
    }
}

fn validate_hours(hours: f64) -> Result<(), TimelineError> {
    if !hours.is_finite() || hours <= 0.0 || hours > MAX_PRESET_HOURS {
        return Err(TimelineError::InvalidPreset(hours));
    }
    Ok(())
}

fn millis(duration: Duration) -> f64 {
    duration.num_milliseconds() as f64
}

fn checked_add(time: DateTime<Utc>, delta: Duration) -> Result<DateTime<Utc>, TimelineError> {
    time.checked_add_signed(delta)
        .ok_or(TimelineError::WindowOutOfRange)
}

/// Bounds of a window of `width_ms` (at least [`MIN_WINDOW`]) around `center_ms`.
fn centered(center_ms: f64, width_ms: f64) -> Result<(DateTime<Utc>, DateTime<Utc>), TimelineError> {
    let half = width_ms.max(millis(MIN_WINDOW)) / 2.0;
    let to_time = |ms: f64| {
        if !ms.is_finite() || ms.abs() > i64::MAX as f64 {
            return Err(TimelineError::WindowOutOfRange);
        }
        DateTime::<Utc>::from_timestamp_millis(ms.round() as i64)
            .ok_or(TimelineError::WindowOutOfRange)
    };
    Ok((to_time(center_ms - half)?, to_time(center_ms + half)?))
}
