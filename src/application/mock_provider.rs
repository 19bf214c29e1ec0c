//! In-memory history provider for tests

use crate::application::history_provider::{HistoryProvider, HistoryRecord};
use crate::domain::channel::{ChannelRole, ChannelSet};
use async_trait::async_trait;
use chrono::{DateTime, Duration as TimeDelta, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;

/// Returns canned records for every window.
///
/// Record timestamps are offsets from the Unix epoch and get re-anchored to
/// the start of whatever window is requested.
#[derive(Default)]
pub struct MockProvider {
    records: HashMap<String, Vec<HistoryRecord>>,
    units: HashMap<String, String>,
    pub failing: Option<String>,
    pub gate: Option<Arc<Notify>>,
    pub delay: Option<Duration>,
}

/// Instant `mins` minutes after the start of the requested window.
pub fn offset(mins: i64) -> DateTime<Utc> {
    DateTime::<Utc>::UNIX_EPOCH + TimeDelta::minutes(mins)
}

impl MockProvider {
    pub fn with_records(mut self, entity: &str, records: Vec<HistoryRecord>) -> Self {
        self.records.insert(entity.to_string(), records);
        self
    }

    pub fn with_unit(mut self, entity: &str, unit: &str) -> Self {
        self.units.insert(entity.to_string(), unit.to_string());
        self
    }

    /// Half an hour of a heat pump at COP 4, switching from heating to hot water.
    pub fn heat_pump() -> Self {
        Self::default()
            .with_records(
                "sensor.hp_in",
                vec![HistoryRecord::new("1.0", offset(0)), HistoryRecord::new("0", offset(30))],
            )
            .with_unit("sensor.hp_in", "kW")
            .with_records(
                "sensor.hp_out",
                vec![
                    HistoryRecord::new("4000", offset(0)),
                    HistoryRecord::new("unavailable", offset(10)),
                    HistoryRecord::new("0", offset(30)),
                ],
            )
            .with_unit("sensor.hp_out", "W")
            .with_records("sensor.flow", vec![HistoryRecord::new("41.5", offset(5))])
            .with_records(
                "sensor.mode",
                vec![HistoryRecord::new("CH", offset(0)), HistoryRecord::new("DHW", offset(20))],
            )
    }

    pub fn heat_pump_channels() -> ChannelSet {
        ChannelSet::new(vec![
            (ChannelRole::PowerIn, Some("sensor.hp_in".to_string())),
            (ChannelRole::PowerOut, Some("sensor.hp_out".to_string())),
            (ChannelRole::FlowTemp, Some("sensor.flow".to_string())),
            (ChannelRole::Mode, Some("sensor.mode".to_string())),
        ])
        .expect("both power channels are configured")
    }
}

#[async_trait]
impl HistoryProvider for MockProvider {
    async fn fetch_history(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        _end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HistoryRecord>> {
        if let Some(gate) = &self.gate {
            gate.notified().await;
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if self.failing.as_deref() == Some(entity_id) {
            anyhow::bail!("connection reset");
        }

        let records = self.records.get(entity_id).cloned().unwrap_or_default();
        Ok(records
            .into_iter()
            .map(|mut r| {
                r.last_updated = r
                    .last_updated
                    .map(|t| start + (t - DateTime::<Utc>::UNIX_EPOCH));
                r
            })
            .collect())
    }

    async fn current_unit(&self, entity_id: &str) -> anyhow::Result<Option<String>> {
        Ok(self.units.get(entity_id).cloned())
    }
}
