// Main entry point - Dependency injection and server setup
use std::{net::SocketAddr, sync::Arc};

use anyhow::Context;
use axum::{
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use heatpump_timeline::application::timeline_service::TimelineService;
use heatpump_timeline::infrastructure::config::load_config;
use heatpump_timeline::infrastructure::home_assistant::HomeAssistantHistoryProvider;
use heatpump_timeline::presentation::app_state::AppState;
use heatpump_timeline::presentation::handlers::{
    drag_select, get_timeline, health_check, readout, refresh, select_preset, shift, zoom,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = load_config()?;
    let channels = config.channels.channel_set()?;
    let geometry = config.chart.geometry()?;
    let fetch_timeout = config.home_assistant.request_timeout();

    // History source (infrastructure layer)
    let provider = Arc::new(HomeAssistantHistoryProvider::new(
        config.home_assistant.base_url.clone(),
        config.home_assistant.token.clone(),
        fetch_timeout,
    )?);

    // Timeline engine (application layer)
    let timeline_service = TimelineService::new(
        provider,
        channels,
        geometry,
        config.chart.hours,
        fetch_timeout,
    )?;
    let state = Arc::new(AppState { timeline_service });

    // Initial window load; the server stays up if Home Assistant is unreachable
    let initial = state.clone();
    tokio::spawn(async move {
        if let Err(e) = initial.timeline_service.refresh().await {
            tracing::warn!("Initial load failed: {}", e);
        }
    });

    // Build router (presentation layer)
    let router = Router::new()
        .route("/healthz", get(health_check))
        .route("/timeline", get(get_timeline))
        .route("/timeline/preset", post(select_preset))
        .route("/timeline/shift", post(shift))
        .route("/timeline/zoom", post(zoom))
        .route("/timeline/select", post(drag_select))
        .route("/timeline/refresh", post(refresh))
        .route("/timeline/readout", get(readout))
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Start server
    let addr: SocketAddr = config
        .server
        .bind
        .parse()
        .with_context(|| format!("Invalid bind address {}", config.server.bind))?;
    tracing::info!("Starting heatpump-timeline service on {}", addr);

    axum::serve(tokio::net::TcpListener::bind(addr).await?, router).await?;

    Ok(())
}
