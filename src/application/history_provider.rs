// Port for retrieving raw channel history from the host data store
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// One raw state change as reported by the data store.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryRecord {
    pub state: Option<String>,
    pub last_updated: Option<DateTime<Utc>>,
    pub last_changed: Option<DateTime<Utc>>,
}

impl HistoryRecord {
    pub fn new(state: impl Into<String>, last_updated: DateTime<Utc>) -> Self {
        Self {
            state: Some(state.into()),
            last_updated: Some(last_updated),
            last_changed: None,
        }
    }

    /// `last_updated` moves even when the value repeats, so it is preferred
    /// over `last_changed` to keep samples across flat stretches.
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.last_updated.or(self.last_changed)
    }
}

#[async_trait]
pub trait HistoryProvider: Send + Sync {
    /// Raw history of one entity between `start` and `end`
    async fn fetch_history(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> anyhow::Result<Vec<HistoryRecord>>;

    /// Unit of measurement the entity currently reports, if any
    async fn current_unit(&self, entity_id: &str) -> anyhow::Result<Option<String>>;
}
