// Timeline service - Navigation, batch fetching and last-write-wins dataset replacement
use crate::application::history_provider::HistoryProvider;
use crate::application::locator::Readout;
use crate::application::series_builder::{build, build_categorical, extend};
use crate::application::snapshot::{ChartFrame, TimelineSnapshot};
use crate::application::units::watts_factor;
use crate::domain::channel::{ChannelKind, ChannelRole, ChannelSet, HiddenSet};
use crate::domain::dataset::WindowDataset;
use crate::domain::error::TimelineError;
use crate::domain::sample::{CategoricalSeries, Interval};
use crate::domain::scale::ChartGeometry;
use crate::domain::viewport::ViewportController;
use anyhow::Context;
use chrono::{DateTime, Utc};
use futures::future::{join_all, try_join_all};
use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// A navigation step requested by the user.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Navigation {
    Preset { hours: f64 },
    Shift { fraction: f64 },
    Zoom { factor: f64 },
    Select {
        start_px: f64,
        end_px: f64,
        rendered_width: Option<f64>,
    },
    Refresh,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchOutcome {
    /// The fetched window replaced the current dataset.
    Applied,
    /// A newer navigation step was issued before this fetch completed.
    Superseded,
    /// The step did not change the viewport, nothing was fetched.
    Ignored,
}

/// Where the pointer is, for readout queries.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PointerPosition {
    Pixel { x: f64, rendered_width: Option<f64> },
    Time(DateTime<Utc>),
}

struct TimelineState {
    viewport: ViewportController,
    dataset: Option<Arc<WindowDataset>>,
    completed: u64,
    last_error: Option<String>,
}

/// Everything a spawned fetch needs to build a dataset and apply it.
struct WindowFetch {
    provider: Arc<dyn HistoryProvider>,
    channels: Arc<ChannelSet>,
    fetch_timeout: Duration,
    issued: Arc<AtomicU64>,
    state: Arc<Mutex<TimelineState>>,
}

pub struct TimelineService {
    provider: Arc<dyn HistoryProvider>,
    channels: Arc<ChannelSet>,
    geometry: ChartGeometry,
    fetch_timeout: Duration,
    issued: Arc<AtomicU64>,
    state: Arc<Mutex<TimelineState>>,
}

impl TimelineService {
    pub fn new(
        provider: Arc<dyn HistoryProvider>,
        channels: ChannelSet,
        geometry: ChartGeometry,
        default_hours: f64,
        fetch_timeout: Duration,
    ) -> Result<Self, TimelineError> {
        Ok(Self {
            provider,
            channels: Arc::new(channels),
            geometry,
            fetch_timeout,
            issued: Arc::new(AtomicU64::new(0)),
            state: Arc::new(Mutex::new(TimelineState {
                viewport: ViewportController::new(default_hours)?,
                dataset: None,
                completed: 0,
                last_error: None,
            })),
        })
    }

    fn lock(&self) -> MutexGuard<'_, TimelineState> {
        lock_state(&self.state)
    }

    pub fn geometry(&self) -> &ChartGeometry {
        &self.geometry
    }

    /// The dataset currently on display, if any fetch has succeeded.
    pub fn dataset(&self) -> Option<Arc<WindowDataset>> {
        self.lock().dataset.clone()
    }

    pub fn is_loading(&self) -> bool {
        self.lock().completed < self.issued.load(Ordering::SeqCst)
    }

    pub async fn select_preset(&self, hours: f64) -> Result<FetchOutcome, TimelineError> {
        self.navigate(Navigation::Preset { hours }).await
    }

    pub async fn shift(&self, fraction: f64) -> Result<FetchOutcome, TimelineError> {
        self.navigate(Navigation::Shift { fraction }).await
    }

    pub async fn zoom(&self, factor: f64) -> Result<FetchOutcome, TimelineError> {
        self.navigate(Navigation::Zoom { factor }).await
    }

    pub async fn drag_select(
        &self,
        start_px: f64,
        end_px: f64,
        rendered_width: Option<f64>,
    ) -> Result<FetchOutcome, TimelineError> {
        self.navigate(Navigation::Select {
            start_px,
            end_px,
            rendered_width,
        })
        .await
    }

    pub async fn refresh(&self) -> Result<FetchOutcome, TimelineError> {
        self.navigate(Navigation::Refresh).await
    }

    /// Apply a navigation step and fetch the resulting window.
    ///
    /// Only the most recently issued fetch may replace the dataset; results of
    /// older fetches are dropped when they complete.
    pub async fn navigate(&self, navigation: Navigation) -> Result<FetchOutcome, TimelineError> {
        let now = Utc::now();
        let (seq, window) = {
            let mut state = self.lock();
            let changed = match navigation {
                Navigation::Preset { hours } => state.viewport.select_preset(hours).map(|_| true)?,
                Navigation::Shift { fraction } => state.viewport.shift(fraction, now).map(|_| true)?,
                Navigation::Zoom { factor } => state.viewport.zoom(factor, now).map(|_| true)?,
                Navigation::Select {
                    start_px,
                    end_px,
                    rendered_width,
                } => {
                    let displayed = match &state.dataset {
                        Some(dataset) => dataset.window(),
                        None => state.viewport.window(now),
                    };
                    let scale = self.geometry.time_scale(displayed, rendered_width);
                    state.viewport.drag_select(start_px, end_px, &scale)?
                }
                Navigation::Refresh => true,
            };
            if !changed {
                tracing::debug!("Drag too short, keeping current window");
                return Ok(FetchOutcome::Ignored);
            }
            let seq = self.issued.fetch_add(1, Ordering::SeqCst) + 1;
            (seq, state.viewport.window(now))
        };

        tracing::debug!(
            "Fetch #{} for {} .. {} ({:?})",
            seq,
            window.start,
            window.end,
            navigation
        );

        // The fetch runs on its own task so a dropped caller cannot strand it.
        let fetch = WindowFetch {
            provider: self.provider.clone(),
            channels: self.channels.clone(),
            fetch_timeout: self.fetch_timeout,
            issued: self.issued.clone(),
            state: self.state.clone(),
        };
        tokio::spawn(async move { fetch.run(seq, window).await })
            .await
            .map_err(|e| TimelineError::FetchFailed(format!("fetch task failed: {}", e)))?
    }
}

fn lock_state(state: &Mutex<TimelineState>) -> MutexGuard<'_, TimelineState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

impl WindowFetch {
    async fn run(&self, seq: u64, window: Interval) -> Result<FetchOutcome, TimelineError> {
        let result = match tokio::time::timeout(self.fetch_timeout, self.fetch_window(window)).await {
            Ok(result) => result,
            Err(_) => Err(TimelineError::FetchTimeout(self.fetch_timeout.as_secs())),
        };

        self.apply(seq, result)
    }

    fn apply(
        &self,
        seq: u64,
        result: Result<WindowDataset, TimelineError>,
    ) -> Result<FetchOutcome, TimelineError> {
        let mut state = lock_state(&self.state);
        let latest = self.issued.load(Ordering::SeqCst);
        if seq != latest {
            tracing::warn!("Discarding fetch #{}, superseded by #{}", seq, latest);
            return Ok(FetchOutcome::Superseded);
        }

        state.completed = seq;
        match result {
            Ok(dataset) => {
                tracing::info!(
                    "Applied window {} .. {} ({} channels)",
                    dataset.start_time,
                    dataset.end_time,
                    dataset.numeric().count()
                );
                state.dataset = Some(Arc::new(dataset));
                state.last_error = None;
                Ok(FetchOutcome::Applied)
            }
            Err(e) => {
                tracing::warn!("Failed to fetch history data: {}", e);
                state.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Fetch every configured channel for `window`; all channels or nothing.
    async fn fetch_window(&self, window: Interval) -> Result<WindowDataset, TimelineError> {
        let factors = self.power_factors().await;

        let fetches = self.channels.iter().map(|(role, entity_id)| {
            let provider = self.provider.clone();
            async move {
                let records = provider
                    .fetch_history(entity_id, window.start, window.end)
                    .await
                    .with_context(|| format!("Failed to fetch history for {}", entity_id))?;
                anyhow::Ok((role, records))
            }
        });
        let histories = try_join_all(fetches)
            .await
            .map_err(|e| TimelineError::FetchFailed(format!("{:#}", e)))?;

        let mut numeric = BTreeMap::new();
        let mut mode = CategoricalSeries::default();
        for (role, records) in histories {
            match role.kind() {
                ChannelKind::Power => {
                    let factor = factors.get(&role).copied().unwrap_or(1.0);
                    numeric.insert(role, build(&records, factor));
                }
                ChannelKind::SlowlyVarying => {
                    numeric.insert(role, extend(build(&records, 1.0), window.end));
                }
                ChannelKind::Mode => mode = build_categorical(&records),
            }
        }

        Ok(WindowDataset::new(window.start, window.end, numeric, mode))
    }

    /// Watts factor for every power channel, from the unit it reports now.
    async fn power_factors(&self) -> HashMap<ChannelRole, f64> {
        let lookups = self
            .channels
            .iter()
            .filter(|(role, _)| role.kind() == ChannelKind::Power)
            .map(|(role, entity_id)| async move {
                let unit = match self.provider.current_unit(entity_id).await {
                    Ok(unit) => unit,
                    Err(e) => {
                        tracing::warn!("Unit lookup failed for {}: {:#}", entity_id, e);
                        None
                    }
                };
                (role, watts_factor(entity_id, unit.as_deref()))
            });
        join_all(lookups).await.into_iter().collect()
    }
}

impl TimelineService {
    pub fn snapshot(&self, hidden: &HiddenSet, rendered_width: Option<f64>) -> TimelineSnapshot {
        let (viewport, loading, last_error, dataset) = {
            let state = self.lock();
            (
                state.viewport.viewport(),
                state.completed < self.issued.load(Ordering::SeqCst),
                state.last_error.clone(),
                state.dataset.clone(),
            )
        };

        TimelineSnapshot {
            viewport,
            loading,
            last_error,
            frame: dataset
                .map(|dataset| ChartFrame::build(&dataset, hidden, &self.geometry, rendered_width)),
        }
    }

    /// Values under the pointer for `hovered` and its companion channels.
    pub fn readout(
        &self,
        hovered: ChannelRole,
        position: PointerPosition,
        hidden: &HiddenSet,
    ) -> Result<Readout, TimelineError> {
        let dataset = self.dataset().ok_or(TimelineError::NoDataset)?;
        let query = match position {
            PointerPosition::Time(time) => time,
            PointerPosition::Pixel { x, rendered_width } => self
                .geometry
                .time_scale(dataset.window(), rendered_width)
                .pixel_to_time(x),
        };
        Ok(Readout::at(&dataset.view(hidden), hovered, query))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::mock_provider::MockProvider;
    use crate::domain::scale::Padding;
    use crate::domain::viewport::Viewport;
    use tokio::sync::Notify;

    fn provider() -> MockProvider {
        MockProvider::heat_pump()
    }

    fn channels() -> ChannelSet {
        MockProvider::heat_pump_channels()
    }

    fn service(provider: MockProvider) -> TimelineService {
        TimelineService::new(
            Arc::new(provider),
            channels(),
            ChartGeometry::new(1000.0, 400.0, Padding::default()).unwrap(),
            1.0,
            Duration::from_secs(5),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_refresh_builds_dataset() {
        let service = service(provider());
        assert_eq!(service.refresh().await.unwrap(), FetchOutcome::Applied);

        let dataset = service.dataset().unwrap();
        let power_in = dataset.series(ChannelRole::PowerIn).unwrap();
        assert_eq!(power_in.first().map(|s| s.value), Some(1000.0));
        assert_eq!(dataset.series(ChannelRole::PowerOut).unwrap().len(), 2);

        // Slowly varying channels reach the window end; power channels do not.
        let flow = dataset.series(ChannelRole::FlowTemp).unwrap();
        assert_eq!(flow.last().map(|s| s.time), Some(dataset.end_time));
        assert_eq!(dataset.mode().len(), 2);

        let snapshot = service.snapshot(&HiddenSet::new(), None);
        assert!(!snapshot.loading);
        let frame = snapshot.frame.unwrap();
        assert_eq!(frame.performance.energy_in_kwh, 0.5);
        assert_eq!(frame.performance.window_cop, 4.0);
        assert_eq!(frame.performance.ch_scop, 4.0);
    }

    #[tokio::test]
    async fn test_navigation_replaces_window() {
        let service = service(provider());
        service.refresh().await.unwrap();
        let first = service.dataset().unwrap();

        assert_eq!(service.zoom(0.5).await.unwrap(), FetchOutcome::Applied);
        let zoomed = service.dataset().unwrap();
        assert_eq!(zoomed.window().duration(), chrono::Duration::minutes(30));
        assert!(!Arc::ptr_eq(&first, &zoomed));

        service.shift(-1.0).await.unwrap();
        let shifted = service.dataset().unwrap();
        assert_eq!(shifted.end_time, zoomed.start_time);

        service.select_preset(3.0).await.unwrap();
        assert_eq!(
            service.snapshot(&HiddenSet::new(), None).viewport,
            Viewport::Relative { hours: 3.0 }
        );
    }

    #[tokio::test]
    async fn test_short_drag_is_ignored() {
        let service = service(provider());
        service.refresh().await.unwrap();
        assert_eq!(
            service.drag_select(400.0, 404.0, None).await.unwrap(),
            FetchOutcome::Ignored
        );

        let dataset = service.dataset().unwrap();
        assert_eq!(
            service.drag_select(60.0, 500.0, None).await.unwrap(),
            FetchOutcome::Applied
        );
        let selected = service.dataset().unwrap();
        assert_eq!(selected.start_time, dataset.start_time);
        assert_eq!(selected.window().duration(), chrono::Duration::minutes(30));
    }

    #[tokio::test]
    async fn test_invalid_zoom_keeps_state() {
        let service = service(provider());
        assert_eq!(
            service.zoom(-1.0).await.unwrap_err(),
            TimelineError::InvalidZoomFactor(-1.0)
        );
        assert!(service.dataset().is_none());
        assert!(!service.is_loading());
    }

    #[tokio::test]
    async fn test_failed_batch_keeps_previous_dataset() {
        let service = service(provider());
        service.refresh().await.unwrap();
        let before = service.dataset().unwrap();

        let mut failing = provider();
        failing.failing = Some("sensor.flow".to_string());
        let failing_service = TimelineService {
            provider: Arc::new(failing),
            ..service
        };

        let err = failing_service.shift(1.0).await.unwrap_err();
        assert!(matches!(err, TimelineError::FetchFailed(ref msg) if msg.contains("sensor.flow")));
        assert!(Arc::ptr_eq(&before, &failing_service.dataset().unwrap()));

        let snapshot = failing_service.snapshot(&HiddenSet::new(), None);
        assert!(snapshot.last_error.is_some());
        assert!(snapshot.frame.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fetch_times_out() {
        let mut slow = provider();
        slow.delay = Some(Duration::from_secs(60));
        let service = service(slow);

        assert_eq!(
            service.refresh().await.unwrap_err(),
            TimelineError::FetchTimeout(5)
        );
        assert!(service.dataset().is_none());
    }

    #[tokio::test]
    async fn test_newer_navigation_supersedes_pending_fetch() {
        let gate = Arc::new(Notify::new());
        let mut gated = provider();
        gated.gate = Some(gate.clone());
        let service = Arc::new(service(gated));

        let older = tokio::spawn({
            let service = service.clone();
            async move { service.refresh().await }
        });
        while service.issued.load(Ordering::SeqCst) < 1 {
            tokio::task::yield_now().await;
        }
        let newer = tokio::spawn({
            let service = service.clone();
            async move { service.zoom(0.5).await }
        });
        while service.issued.load(Ordering::SeqCst) < 2 {
            tokio::task::yield_now().await;
        }
        assert!(service.is_loading());

        // Release every pending channel fetch of both batches.
        for _ in 0..64 {
            gate.notify_waiters();
            tokio::task::yield_now().await;
            if older.is_finished() && newer.is_finished() {
                break;
            }
        }

        assert_eq!(older.await.unwrap().unwrap(), FetchOutcome::Superseded);
        assert_eq!(newer.await.unwrap().unwrap(), FetchOutcome::Applied);
        let dataset = service.dataset().unwrap();
        assert_eq!(dataset.window().duration(), chrono::Duration::minutes(30));
        assert!(!service.is_loading());
    }

    #[tokio::test]
    async fn test_dropped_caller_still_completes_fetch() {
        let gate = Arc::new(Notify::new());
        let mut gated = provider();
        gated.gate = Some(gate.clone());
        let service = service(gated);

        let abandoned = tokio::time::timeout(Duration::from_millis(20), service.refresh()).await;
        assert!(abandoned.is_err());
        assert!(service.is_loading());

        for _ in 0..64 {
            gate.notify_waiters();
            tokio::time::sleep(Duration::from_millis(1)).await;
            if !service.is_loading() {
                break;
            }
        }

        assert!(!service.is_loading());
        assert!(service.dataset().is_some());
        assert!(!service.snapshot(&HiddenSet::new(), None).loading);
    }

    #[tokio::test]
    async fn test_readout_needs_dataset() {
        let service = service(provider());
        let hidden = HiddenSet::new();
        assert_eq!(
            service
                .readout(ChannelRole::PowerIn, PointerPosition::Pixel { x: 100.0, rendered_width: None }, &hidden)
                .unwrap_err(),
            TimelineError::NoDataset
        );

        service.refresh().await.unwrap();
        let start = service.dataset().unwrap().start_time;
        match service
            .readout(ChannelRole::PowerIn, PointerPosition::Time(start), &hidden)
            .unwrap()
        {
            Readout::Power { cop, .. } => assert_eq!(cop, Some(4.0)),
            other => panic!("unexpected readout {:?}", other),
        }
    }
}
