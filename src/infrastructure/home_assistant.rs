// Home Assistant REST history provider
use crate::application::history_provider::{HistoryProvider, HistoryRecord};
use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Clone)]
pub struct HomeAssistantHistoryProvider {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct EntityState {
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    last_updated: Option<DateTime<Utc>>,
    #[serde(default)]
    last_changed: Option<DateTime<Utc>>,
    #[serde(default)]
    attributes: EntityAttributes,
}

#[derive(Debug, Deserialize, Default)]
struct EntityAttributes {
    #[serde(default)]
    unit_of_measurement: Option<String>,
}

impl From<EntityState> for HistoryRecord {
    fn from(state: EntityState) -> Self {
        HistoryRecord {
            state: state.state,
            last_updated: state.last_updated,
            last_changed: state.last_changed,
        }
    }
}

impl HomeAssistantHistoryProvider {
    pub fn new(base_url: String, token: String, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token,
            client,
        })
    }

    fn history_url(&self, entity_id: &str, start: DateTime<Utc>, end: DateTime<Utc>) -> String {
        format!(
            "{}/api/history/period/{}?filter_entity_id={}&end_time={}",
            self.base_url,
            urlencoding::encode(&start.to_rfc3339_opts(SecondsFormat::Millis, true)),
            urlencoding::encode(entity_id),
            urlencoding::encode(&end.to_rfc3339_opts(SecondsFormat::Millis, true)),
        )
    }

    fn state_url(&self, entity_id: &str) -> String {
        format!("{}/api/states/{}", self.base_url, urlencoding::encode(entity_id))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        let response = self
            .client
            .get(url)
            .bearer_auth(&self.token)
            .header("Accept", "application/json")
            .send()
            .await
            .context("Failed to send request to Home Assistant")?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("Home Assistant request failed with status {}: {}", status, body);
        }

        response
            .json::<T>()
            .await
            .context("Failed to parse Home Assistant response")
    }
}

/// The history endpoint answers with one list per requested entity.
fn first_entity_records(response: Vec<Vec<EntityState>>) -> Vec<HistoryRecord> {
    response
        .into_iter()
        .next()
        .unwrap_or_default()
        .into_iter()
        .map(HistoryRecord::from)
        .collect()
}

#[async_trait]
impl HistoryProvider for HomeAssistantHistoryProvider {
    async fn fetch_history(
        &self,
        entity_id: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Result<Vec<HistoryRecord>> {
        let url = self.history_url(entity_id, start, end);
        tracing::debug!("Fetching history for {}", entity_id);

        let response: Vec<Vec<EntityState>> = self.get_json(&url).await?;
        let records = first_entity_records(response);

        tracing::debug!("Got {} history records for {}", records.len(), entity_id);
        Ok(records)
    }

    async fn current_unit(&self, entity_id: &str) -> Result<Option<String>> {
        let state: EntityState = self.get_json(&self.state_url(entity_id)).await?;
        Ok(state.attributes.unit_of_measurement)
    }
}
