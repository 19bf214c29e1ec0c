// Channel roles and the configured entity for each
use super::error::TimelineError;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChannelRole {
    PowerIn,
    PowerOut,
    Immersion,
    FlowTemp,
    ReturnTemp,
    OutsideTemp,
    InsideTemp,
    Setpoint,
    WeatherCurveSetpoint,
    FlowSetpoint,
    FlowRate,
    Mode,
}

/// How a channel's raw history is turned into a series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelKind {
    /// Unit-normalized to watts; never forward-extended.
    Power,
    /// Forward-extended to the end of the window.
    SlowlyVarying,
    /// Categorical operating mode.
    Mode,
}

impl ChannelRole {
    pub const ALL: [ChannelRole; 12] = [
        ChannelRole::PowerIn,
        ChannelRole::PowerOut,
        ChannelRole::Immersion,
        ChannelRole::FlowTemp,
        ChannelRole::ReturnTemp,
        ChannelRole::OutsideTemp,
        ChannelRole::InsideTemp,
        ChannelRole::Setpoint,
        ChannelRole::WeatherCurveSetpoint,
        ChannelRole::FlowSetpoint,
        ChannelRole::FlowRate,
        ChannelRole::Mode,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            ChannelRole::PowerIn => "power_in",
            ChannelRole::PowerOut => "power_out",
            ChannelRole::Immersion => "immersion",
            ChannelRole::FlowTemp => "flow_temp",
            ChannelRole::ReturnTemp => "return_temp",
            ChannelRole::OutsideTemp => "outside_temp",
            ChannelRole::InsideTemp => "inside_temp",
            ChannelRole::Setpoint => "setpoint",
            ChannelRole::WeatherCurveSetpoint => "weather_curve_setpoint",
            ChannelRole::FlowSetpoint => "flow_setpoint",
            ChannelRole::FlowRate => "flow_rate",
            ChannelRole::Mode => "mode",
        }
    }

    /// Human-readable label shown in legends and readouts.
    pub fn label(&self) -> &'static str {
        match self {
            ChannelRole::PowerIn => "Electricity In",
            ChannelRole::PowerOut => "Heat Output",
            ChannelRole::Immersion => "Immersion",
            ChannelRole::FlowTemp => "Flow Temp",
            ChannelRole::ReturnTemp => "Return Temp",
            ChannelRole::OutsideTemp => "Outside Temp",
            ChannelRole::InsideTemp => "Room Temp",
            ChannelRole::Setpoint => "Setpoint",
            ChannelRole::WeatherCurveSetpoint => "Weather Curve Setpoint",
            ChannelRole::FlowSetpoint => "Flow Setpoint",
            ChannelRole::FlowRate => "Flow Rate",
            ChannelRole::Mode => "Mode",
        }
    }

    pub fn kind(&self) -> ChannelKind {
        match self {
            ChannelRole::PowerIn | ChannelRole::PowerOut | ChannelRole::Immersion => {
                ChannelKind::Power
            }
            ChannelRole::Mode => ChannelKind::Mode,
            _ => ChannelKind::SlowlyVarying,
        }
    }
}

impl fmt::Display for ChannelRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for ChannelRole {
    type Err = TimelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim();
        ChannelRole::ALL
            .into_iter()
            .find(|role| role.key() == key)
            .ok_or_else(|| TimelineError::UnknownChannel(key.to_string()))
    }
}

/// Entity identifiers for every configured channel.
///
/// Always contains both power channels.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelSet {
    entities: BTreeMap<ChannelRole, String>,
}

impl ChannelSet {
    pub fn new<I>(entries: I) -> Result<Self, TimelineError>
    where
        I: IntoIterator<Item = (ChannelRole, Option<String>)>,
    {
        let entities: BTreeMap<ChannelRole, String> = entries
            .into_iter()
            .filter_map(|(role, entity)| {
                let entity = entity?.trim().to_string();
                (!entity.is_empty()).then_some((role, entity))
            })
            .collect();

        for required in [ChannelRole::PowerIn, ChannelRole::PowerOut] {
            if !entities.contains_key(&required) {
                return Err(TimelineError::MissingChannel(required.key()));
            }
        }

        Ok(Self { entities })
    }

    pub fn entity(&self, role: ChannelRole) -> Option<&str> {
        self.entities.get(&role).map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ChannelRole, &str)> {
        self.entities.iter().map(|(role, id)| (*role, id.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entities.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }
}

/// Channels currently suppressed from display and pointer readouts.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HiddenSet(BTreeSet<ChannelRole>);

impl HiddenSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma separated list of channel keys, skipping unknown names.
    pub fn parse(list: &str) -> Self {
        let roles = list
            .split(',')
            .filter(|part| !part.trim().is_empty())
            .filter_map(|part| match part.parse::<ChannelRole>() {
                Ok(role) => Some(role),
                Err(e) => {
                    tracing::warn!("Ignoring hidden channel: {}", e);
                    None
                }
            })
            .collect();
        Self(roles)
    }

    pub fn toggle(&mut self, role: ChannelRole) {
        if !self.0.remove(&role) {
            self.0.insert(role);
        }
    }

    pub fn contains(&self, role: ChannelRole) -> bool {
        self.0.contains(&role)
    }
}

impl FromIterator<ChannelRole> for HiddenSet {
    fn from_iter<I: IntoIterator<Item = ChannelRole>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(role: ChannelRole, id: &str) -> (ChannelRole, Option<String>) {
        (role, Some(id.to_string()))
    }

    #[test]
    fn test_channel_set_requires_power_channels() {
        let err = ChannelSet::new(vec![entry(ChannelRole::PowerIn, "sensor.hp_in")]).unwrap_err();
        assert_eq!(err, TimelineError::MissingChannel("power_out"));

        let err = ChannelSet::new(vec![
            (ChannelRole::PowerIn, Some("  ".to_string())),
            entry(ChannelRole::PowerOut, "sensor.hp_out"),
        ])
        .unwrap_err();
        assert_eq!(err, TimelineError::MissingChannel("power_in"));
    }

    #[test]
    fn test_channel_set_skips_blank_optionals() {
        let set = ChannelSet::new(vec![
            entry(ChannelRole::PowerIn, "sensor.hp_in"),
            entry(ChannelRole::PowerOut, "sensor.hp_out"),
            (ChannelRole::FlowTemp, Some(String::new())),
            (ChannelRole::Mode, None),
            entry(ChannelRole::ReturnTemp, "sensor.return"),
        ])
        .unwrap();

        assert_eq!(set.len(), 3);
        assert_eq!(set.entity(ChannelRole::ReturnTemp), Some("sensor.return"));
        assert_eq!(set.entity(ChannelRole::FlowTemp), None);
    }

    #[test]
    fn test_role_round_trips_through_key() {
        for role in ChannelRole::ALL {
            assert_eq!(role.key().parse::<ChannelRole>().unwrap(), role);
        }
        assert!("boiler".parse::<ChannelRole>().is_err());
    }

    #[test]
    fn test_hidden_set_parse_and_toggle() {
        let mut hidden = HiddenSet::parse("flow_temp, setpoint,bogus,,");
        assert!(hidden.contains(ChannelRole::FlowTemp));
        assert!(hidden.contains(ChannelRole::Setpoint));

        hidden.toggle(ChannelRole::FlowTemp);
        hidden.toggle(ChannelRole::PowerIn);
        assert!(!hidden.contains(ChannelRole::FlowTemp));
        assert!(hidden.contains(ChannelRole::PowerIn));
    }
}
