// HTTP request handlers
use crate::application::locator::Readout;
use crate::application::snapshot::TimelineSnapshot;
use crate::application::timeline_service::{FetchOutcome, PointerPosition};
use crate::domain::channel::{ChannelRole, HiddenSet};
use crate::domain::error::TimelineError;
use crate::presentation::app_state::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Maps engine errors onto HTTP status codes.
#[derive(Debug)]
pub struct ApiError(TimelineError);

impl From<TimelineError> for ApiError {
    fn from(e: TimelineError) -> Self {
        Self(e)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self.0 {
            TimelineError::NoDataset => StatusCode::CONFLICT,
            TimelineError::FetchFailed(_) => StatusCode::BAD_GATEWAY,
            TimelineError::FetchTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            TimelineError::MissingChannel(_) | TimelineError::EmptySeries => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            TimelineError::UnknownChannel(_)
            | TimelineError::InvalidPreset(_)
            | TimelineError::InvalidZoomFactor(_)
            | TimelineError::InvalidShiftFraction(_)
            | TimelineError::WindowOutOfRange
            | TimelineError::InvalidGeometry(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("Request failed: {}", self.0);
        }
        (status, Json(serde_json::json!({ "error": self.0.to_string() }))).into_response()
    }
}

#[derive(Deserialize, Default)]
pub struct SnapshotQuery {
    pub hidden: Option<String>,
    pub width: Option<f64>,
}

#[derive(Deserialize)]
pub struct PresetRequest {
    pub hours: f64,
}

#[derive(Deserialize)]
pub struct ShiftRequest {
    pub fraction: f64,
}

#[derive(Deserialize)]
pub struct ZoomRequest {
    pub factor: f64,
}

#[derive(Deserialize)]
pub struct SelectRequest {
    pub start_px: f64,
    pub end_px: f64,
    pub rendered_width: Option<f64>,
}

#[derive(Deserialize)]
pub struct ReadoutQuery {
    pub role: String,
    pub x: Option<f64>,
    pub time: Option<DateTime<Utc>>,
    pub width: Option<f64>,
    pub hidden: Option<String>,
}

#[derive(Serialize, Debug, PartialEq)]
pub struct NavigationResponse {
    pub outcome: FetchOutcome,
    pub loading: bool,
}

fn hidden_set(list: Option<&str>) -> HiddenSet {
    list.map(HiddenSet::parse).unwrap_or_default()
}

fn navigation_response(state: &AppState, outcome: FetchOutcome) -> Json<NavigationResponse> {
    Json(NavigationResponse {
        outcome,
        loading: state.timeline_service.is_loading(),
    })
}

/// Health check endpoint
pub async fn health_check() -> &'static str {
    "ok"
}

/// Current window with derived metrics and scales
pub async fn get_timeline(
    State(state): State<Arc<AppState>>,
    Query(query): Query<SnapshotQuery>,
) -> Json<TimelineSnapshot> {
    let hidden = hidden_set(query.hidden.as_deref());
    Json(state.timeline_service.snapshot(&hidden, query.width))
}

pub async fn select_preset(
    State(state): State<Arc<AppState>>,
    Json(request): Json<PresetRequest>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let outcome = state.timeline_service.select_preset(request.hours).await?;
    Ok(navigation_response(&state, outcome))
}

pub async fn shift(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ShiftRequest>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let outcome = state.timeline_service.shift(request.fraction).await?;
    Ok(navigation_response(&state, outcome))
}

pub async fn zoom(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ZoomRequest>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let outcome = state.timeline_service.zoom(request.factor).await?;
    Ok(navigation_response(&state, outcome))
}

pub async fn drag_select(
    State(state): State<Arc<AppState>>,
    Json(request): Json<SelectRequest>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let outcome = state
        .timeline_service
        .drag_select(request.start_px, request.end_px, request.rendered_width)
        .await?;
    Ok(navigation_response(&state, outcome))
}

pub async fn refresh(
    State(state): State<Arc<AppState>>,
) -> Result<Json<NavigationResponse>, ApiError> {
    let outcome = state.timeline_service.refresh().await?;
    Ok(navigation_response(&state, outcome))
}

/// Values under the pointer, by pixel (`x`) or by instant (`time`)
pub async fn readout(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ReadoutQuery>,
) -> Result<Json<Readout>, ApiError> {
    let role: ChannelRole = query.role.parse()?;
    let position = match (query.time, query.x) {
        (Some(time), _) => PointerPosition::Time(time),
        (None, Some(x)) => PointerPosition::Pixel {
            x,
            rendered_width: query.width,
        },
        (None, None) => {
            return Err(ApiError(TimelineError::InvalidGeometry(
                "readout needs either x or time".to_string(),
            )));
        }
    };

    let hidden = hidden_set(query.hidden.as_deref());
    Ok(Json(state.timeline_service.readout(role, position, &hidden)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock_provider::MockProvider;
    use crate::application::timeline_service::TimelineService;
    use crate::domain::scale::{ChartGeometry, Padding};
    use std::time::Duration;

    fn state() -> Arc<AppState> {
        let timeline_service = TimelineService::new(
            Arc::new(MockProvider::heat_pump()),
            MockProvider::heat_pump_channels(),
            ChartGeometry::new(1000.0, 400.0, Padding::default()).unwrap(),
            1.0,
            Duration::from_secs(5),
        )
        .unwrap();
        Arc::new(AppState { timeline_service })
    }

    #[tokio::test]
    async fn test_timeline_before_and_after_refresh() {
        let state = state();
        let Json(snapshot) = get_timeline(State(state.clone()), Query(SnapshotQuery::default())).await;
        assert!(snapshot.frame.is_none());

        let Json(response) = refresh(State(state.clone())).await.unwrap();
        assert_eq!(
            response,
            NavigationResponse {
                outcome: FetchOutcome::Applied,
                loading: false
            }
        );

        let query = SnapshotQuery {
            hidden: Some("flow_temp".to_string()),
            width: Some(500.0),
        };
        let Json(snapshot) = get_timeline(State(state), Query(query)).await;
        let frame = snapshot.frame.unwrap();
        assert!(frame.series.iter().all(|s| s.role != ChannelRole::FlowTemp));
        assert_eq!(frame.time_scale.plot_left, 30.0);
    }

    #[tokio::test]
    async fn test_invalid_zoom_is_bad_request() {
        let err = zoom(State(state()), Json(ZoomRequest { factor: 0.0 }))
            .await
            .unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_readout() {
        let state = state();
        let query = || ReadoutQuery {
            role: "power_in".to_string(),
            x: Some(60.0),
            time: None,
            width: None,
            hidden: None,
        };

        let err = readout(State(state.clone()), Query(query())).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::CONFLICT);

        refresh(State(state.clone())).await.unwrap();
        let Json(value) = readout(State(state.clone()), Query(query())).await.unwrap();
        assert!(matches!(value, Readout::Power { cop: Some(c), .. } if c == 4.0));

        let mut bad = query();
        bad.role = "boiler".to_string();
        let err = readout(State(state), Query(bad)).await.unwrap_err();
        assert_eq!(err.status(), StatusCode::BAD_REQUEST);
    }
}
