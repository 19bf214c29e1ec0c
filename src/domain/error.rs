// Domain-level errors for the timeline engine
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum TimelineError {
    #[error("You need to define the {0} channel")]
    MissingChannel(&'static str),

    #[error("Unknown channel '{0}'")]
    UnknownChannel(String),

    #[error("Preset window must be a positive number of hours, got {0}")]
    InvalidPreset(f64),

    #[error("Zoom factor must be a positive finite number, got {0}")]
    InvalidZoomFactor(f64),

    #[error("Shift fraction must be finite, got {0}")]
    InvalidShiftFraction(f64),

    #[error("Window bound is outside the representable time range")]
    WindowOutOfRange,

    #[error("Invalid chart geometry: {0}")]
    InvalidGeometry(String),

    #[error("Nearest-sample lookup on an empty series")]
    EmptySeries,

    #[error("No dataset has been loaded yet")]
    NoDataset,

    #[error("History fetch failed: {0}")]
    FetchFailed(String),

    #[error("History fetch timed out after {0}s")]
    FetchTimeout(u64),
}
