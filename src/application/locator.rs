// Nearest-sample locator and composite pointer readouts
use crate::application::energy::ratio;
use crate::domain::channel::ChannelRole;
use crate::domain::dataset::DatasetView;
use crate::domain::error::TimelineError;
use crate::domain::sample::{ModeSample, NumericSample, Sample, Series};
use chrono::{DateTime, Utc};
use serde::Serialize;

/// The sample closest in time to `query`, however far away.
///
/// Exact ties go to the earlier sample. An empty series is a caller error.
pub fn nearest<T>(series: &Series<T>, query: DateTime<Utc>) -> Result<&Sample<T>, TimelineError> {
    let samples = series.samples();
    if samples.is_empty() {
        return Err(TimelineError::EmptySeries);
    }

    let idx = samples.partition_point(|s| s.time < query);
    if idx == 0 {
        return Ok(&samples[0]);
    }
    if idx == samples.len() {
        return Ok(&samples[idx - 1]);
    }

    let (before, after) = (&samples[idx - 1], &samples[idx]);
    if after.time - query < query - before.time {
        Ok(after)
    } else {
        Ok(before)
    }
}

fn nearest_in(view: &DatasetView<'_>, role: ChannelRole, query: DateTime<Utc>) -> Option<NumericSample> {
    let series = view.series(role)?;
    nearest(series, query).ok().cloned()
}

fn difference(a: &Option<NumericSample>, b: &Option<NumericSample>) -> Option<f64> {
    match (a, b) {
        (Some(a), Some(b)) => Some(a.value - b.value),
        _ => None,
    }
}

/// Values under the pointer for the hovered channel and its companions.
///
/// Every member is looked up independently; derived values appear only when
/// all of their inputs were found.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Readout {
    Power {
        power_in: Option<NumericSample>,
        power_out: Option<NumericSample>,
        cop: Option<f64>,
    },
    FlowReturn {
        flow: Option<NumericSample>,
        #[serde(rename = "return")]
        return_temp: Option<NumericSample>,
        flow_setpoint: Option<NumericSample>,
        delta_t: Option<f64>,
        overshoot: Option<f64>,
    },
    Setpoints {
        weather_curve: Option<NumericSample>,
        flow_setpoint: Option<NumericSample>,
        modulation: Option<f64>,
    },
    Room {
        room: Option<NumericSample>,
        setpoint: Option<NumericSample>,
        overshoot: Option<f64>,
    },
    Mode {
        sample: Option<ModeSample>,
    },
    Single {
        role: ChannelRole,
        sample: Option<NumericSample>,
    },
}

impl Readout {
    pub fn at(view: &DatasetView<'_>, hovered: ChannelRole, query: DateTime<Utc>) -> Self {
        let find = |role| nearest_in(view, role, query);

        match hovered {
            ChannelRole::PowerIn | ChannelRole::PowerOut => {
                let (power_in, power_out) = (find(ChannelRole::PowerIn), find(ChannelRole::PowerOut));
                let cop = match (&power_in, &power_out) {
                    (Some(i), Some(o)) => Some(ratio(o.value, i.value)),
                    _ => None,
                };
                Readout::Power {
                    power_in,
                    power_out,
                    cop,
                }
            }
            ChannelRole::FlowTemp | ChannelRole::ReturnTemp => {
                let flow = find(ChannelRole::FlowTemp);
                let return_temp = find(ChannelRole::ReturnTemp);
                let flow_setpoint = find(ChannelRole::FlowSetpoint);
                let delta_t = difference(&flow, &return_temp);
                let overshoot = delta_t.and(difference(&flow, &flow_setpoint));
                Readout::FlowReturn {
                    flow,
                    return_temp,
                    flow_setpoint,
                    delta_t,
                    overshoot,
                }
            }
            ChannelRole::WeatherCurveSetpoint | ChannelRole::FlowSetpoint => {
                let weather_curve = find(ChannelRole::WeatherCurveSetpoint);
                let flow_setpoint = find(ChannelRole::FlowSetpoint);
                let modulation = difference(&flow_setpoint, &weather_curve);
                Readout::Setpoints {
                    weather_curve,
                    flow_setpoint,
                    modulation,
                }
            }
            ChannelRole::Setpoint | ChannelRole::InsideTemp => {
                let room = find(ChannelRole::InsideTemp);
                let setpoint = find(ChannelRole::Setpoint);
                let overshoot = difference(&room, &setpoint);
                Readout::Room {
                    room,
                    setpoint,
                    overshoot,
                }
            }
            ChannelRole::Mode => Readout::Mode {
                sample: view
                    .mode()
                    .and_then(|modes| nearest(modes, query).ok().cloned()),
            },
            role @ (ChannelRole::Immersion | ChannelRole::OutsideTemp | ChannelRole::FlowRate) => {
                Readout::Single {
                    role,
                    sample: find(role),
                }
            }
        }
    }
}
