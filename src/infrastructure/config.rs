use crate::domain::channel::{ChannelRole, ChannelSet};
use crate::domain::error::TimelineError;
use crate::domain::scale::{ChartGeometry, Padding};
use serde::Deserialize;
use std::time::Duration;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerSettings,
    pub home_assistant: HomeAssistantSettings,
    pub channels: ChannelsConfig,
    #[serde(default)]
    pub chart: ChartSettings,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    #[serde(default = "default_bind")]
    pub bind: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            bind: default_bind(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct HomeAssistantSettings {
    pub base_url: String,
    pub token: String,
    #[serde(default = "default_timeout_secs")]
    pub request_timeout_secs: u64,
}

impl HomeAssistantSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Entity identifiers per channel. Only the two power channels are required.
#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChannelsConfig {
    pub power_in: Option<String>,
    pub power_out: Option<String>,
    pub flow_temp: Option<String>,
    pub return_temp: Option<String>,
    pub outside_temp: Option<String>,
    pub inside_temp: Option<String>,
    pub setpoint: Option<String>,
    pub weather_curve_setpoint: Option<String>,
    pub flow_setpoint: Option<String>,
    pub flow_rate: Option<String>,
    pub mode: Option<String>,
    pub immersion: Option<String>,
}

impl ChannelsConfig {
    pub fn channel_set(&self) -> Result<ChannelSet, TimelineError> {
        ChannelSet::new([
            (ChannelRole::PowerIn, self.power_in.clone()),
            (ChannelRole::PowerOut, self.power_out.clone()),
            (ChannelRole::FlowTemp, self.flow_temp.clone()),
            (ChannelRole::ReturnTemp, self.return_temp.clone()),
            (ChannelRole::OutsideTemp, self.outside_temp.clone()),
            (ChannelRole::InsideTemp, self.inside_temp.clone()),
            (ChannelRole::Setpoint, self.setpoint.clone()),
            (ChannelRole::WeatherCurveSetpoint, self.weather_curve_setpoint.clone()),
            (ChannelRole::FlowSetpoint, self.flow_setpoint.clone()),
            (ChannelRole::FlowRate, self.flow_rate.clone()),
            (ChannelRole::Mode, self.mode.clone()),
            (ChannelRole::Immersion, self.immersion.clone()),
        ])
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ChartSettings {
    #[serde(default = "default_hours")]
    pub hours: f64,
    #[serde(default = "default_width")]
    pub width: f64,
    #[serde(default = "default_height")]
    pub height: f64,
}

impl Default for ChartSettings {
    fn default() -> Self {
        Self {
            hours: default_hours(),
            width: default_width(),
            height: default_height(),
        }
    }
}

impl ChartSettings {
    pub fn geometry(&self) -> Result<ChartGeometry, TimelineError> {
        ChartGeometry::new(self.width, self.height, Padding::default())
    }
}

fn default_bind() -> String {
    "0.0.0.0:8080".to_string()
}

fn default_timeout_secs() -> u64 {
    30
}

fn default_hours() -> f64 {
    1.0
}

fn default_width() -> f64 {
    1000.0
}

fn default_height() -> f64 {
    400.0
}

/// Load `config/timeline.*`, overridden by `TIMELINE__SECTION__KEY` variables.
pub fn load_config() -> anyhow::Result<AppConfig> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("config/timeline").required(false))
        .add_source(
            config::Environment::with_prefix("TIMELINE")
                .prefix_separator("__")
                .separator("__"),
        )
        .build()?;

    Ok(settings.try_deserialize()?)
}
