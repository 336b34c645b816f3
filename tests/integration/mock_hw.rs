//! Mock adapters for integration tests.
//!
//! Records every device, guider and resolver call so tests can assert on
//! the full command history without an INDI server, a guider or network
//! access.  Time is virtual: `sleep` advances the clock instantly.

use std::collections::{HashMap, HashSet};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};

use observatory::app::cancel::CancelToken;
use observatory::app::events::AppEvent;
use observatory::app::ports::{Clock, DevicePort, EphemerisPort, EventSink, GuiderPort, PropertyState};
use observatory::app::service::Observatory;
use observatory::config::ObservatoryConfig;
use observatory::error::{DeviceError, GuideError, GuideStage, ResolverError};
use observatory::fsm::StateId;
use observatory::sky::{EquatorialCoords, Site};

// ── Device call record ────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum DeviceCall {
    Switch {
        device: String,
        property: String,
        element: String,
        on: bool,
    },
    Number {
        device: String,
        property: String,
        values: Vec<(String, f64)>,
    },
    Text {
        device: String,
        property: String,
        element: String,
        value: String,
    },
}

impl DeviceCall {
    pub fn property(&self) -> &str {
        match self {
            Self::Switch { property, .. } | Self::Number { property, .. } | Self::Text { property, .. } => {
                property
            }
        }
    }
}

// ── MockRig ───────────────────────────────────────────────────

/// Every INDI device on one mock.
#[derive(Default)]
pub struct MockRig {
    pub calls: Vec<DeviceCall>,
    /// Busy polls to report per property before it settles.
    pub busy_polls: HashMap<String, u32>,
    /// Properties that never leave Busy.
    pub stuck_busy: HashSet<String>,
    /// Properties that report Alert.
    pub alert: HashSet<String>,
    /// Frame saves to reject before accepting.
    pub save_failures: u32,
    /// Site reported through GEOGRAPHIC_COORD; `None` means not defined.
    pub site: Option<Site>,
    /// Trip `token` once this many frames have been saved.
    pub cancel_after_saves: Option<(usize, CancelToken)>,
    pub polls: u32,
}

#[allow(dead_code)]
impl MockRig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls_to(&self, property: &str) -> Vec<&DeviceCall> {
        self.calls.iter().filter(|c| c.property() == property).collect()
    }

    pub fn count(&self, property: &str) -> usize {
        self.calls_to(property).len()
    }

    /// Paths successfully handed to `CCD_SAVE`.
    pub fn saved_paths(&self) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Text { property, value, .. } if property == "CCD_SAVE" => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Elements switched on for `property`, in order.
    pub fn switched_on(&self, property: &str) -> Vec<String> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Switch {
                    property: p,
                    element,
                    on: true,
                    ..
                } if p == property => Some(element.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn number_values(&self, property: &str) -> Vec<Vec<(String, f64)>> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                DeviceCall::Number {
                    property: p, values, ..
                } if p == property => Some(values.clone()),
                _ => None,
            })
            .collect()
    }
}

impl DevicePort for MockRig {
    fn set_switch(&mut self, device: &str, property: &str, element: &str, on: bool) -> Result<(), DeviceError> {
        self.calls.push(DeviceCall::Switch {
            device: device.into(),
            property: property.into(),
            element: element.into(),
            on,
        });
        Ok(())
    }

    fn set_number(&mut self, device: &str, property: &str, values: &[(&str, f64)]) -> Result<(), DeviceError> {
        self.calls.push(DeviceCall::Number {
            device: device.into(),
            property: property.into(),
            values: values.iter().map(|(k, v)| ((*k).to_owned(), *v)).collect(),
        });
        Ok(())
    }

    fn set_text(&mut self, device: &str, property: &str, element: &str, value: &str) -> Result<(), DeviceError> {
        if property == "CCD_SAVE" && self.save_failures > 0 {
            self.save_failures -= 1;
            return Err(DeviceError::Io("disk busy".into()));
        }
        self.calls.push(DeviceCall::Text {
            device: device.into(),
            property: property.into(),
            element: element.into(),
            value: value.into(),
        });
        if let Some((after, token)) = &self.cancel_after_saves {
            if self.saved_paths().len() >= *after {
                token.cancel();
            }
        }
        Ok(())
    }

    fn property_state(&mut self, _device: &str, property: &str) -> Result<PropertyState, DeviceError> {
        self.polls += 1;
        if self.alert.contains(property) {
            return Ok(PropertyState::Alert);
        }
        if self.stuck_busy.contains(property) {
            return Ok(PropertyState::Busy);
        }
        if let Some(remaining) = self.busy_polls.get_mut(property) {
            if *remaining > 0 {
                *remaining -= 1;
                return Ok(PropertyState::Busy);
            }
        }
        Ok(PropertyState::Ok)
    }

    fn number(&mut self, device: &str, property: &str, element: &str) -> Result<f64, DeviceError> {
        match (property, self.site) {
            ("GEOGRAPHIC_COORD", Some(site)) => match element {
                "LAT" => Ok(site.latitude_deg),
                "LONG" => Ok(site.longitude_deg),
                "ELEV" => Ok(site.elevation_m),
                _ => Err(DeviceError::BadValue(element.into())),
            },
            _ => Err(DeviceError::UnknownProperty {
                device: device.into(),
                property: property.into(),
            }),
        }
    }
}

// ── MockEphemeris ─────────────────────────────────────────────

pub const M42: EquatorialCoords = EquatorialCoords {
    ra_deg: 83.82208,
    dec_deg: -5.39111,
};

pub struct MockEphemeris {
    pub objects: HashMap<String, EquatorialCoords>,
    /// Altitude reported for every target.
    pub altitude: f64,
    pub transport_error: bool,
    pub resolve_calls: Vec<String>,
    pub last_site: std::cell::Cell<Option<Site>>,
}

impl Default for MockEphemeris {
    fn default() -> Self {
        Self {
            objects: HashMap::from([("M42".to_owned(), M42)]),
            altitude: 45.0,
            transport_error: false,
            resolve_calls: Vec::new(),
            last_site: std::cell::Cell::new(None),
        }
    }
}

impl EphemerisPort for MockEphemeris {
    fn resolve(&mut self, name: &str) -> Result<Option<EquatorialCoords>, ResolverError> {
        self.resolve_calls.push(name.to_owned());
        if self.transport_error {
            return Err(ResolverError::Transport("connection refused".into()));
        }
        Ok(self.objects.get(name).copied())
    }

    fn altitude_deg(&self, _coords: &EquatorialCoords, site: &Site, _at: DateTime<Utc>) -> f64 {
        self.last_site.set(Some(*site));
        self.altitude
    }
}

// ── MockGuider ────────────────────────────────────────────────

#[derive(Default)]
pub struct MockGuider {
    pub calls: Vec<GuideStage>,
    pub fail_enable: u32,
    pub fail_start: u32,
    pub fail_stop: u32,
}

impl MockGuider {
    fn answer(&mut self, stage: GuideStage) -> Result<(), GuideError> {
        self.calls.push(stage);
        let remaining = match stage {
            GuideStage::EnableMultiStar => &mut self.fail_enable,
            GuideStage::Start => &mut self.fail_start,
            GuideStage::Stop => &mut self.fail_stop,
        };
        if *remaining > 0 {
            *remaining -= 1;
            return Err(GuideError::Rejected {
                stage,
                status: "ERROR".into(),
            });
        }
        Ok(())
    }

    #[allow(dead_code)]
    pub fn count(&self, stage: GuideStage) -> usize {
        self.calls.iter().filter(|s| **s == stage).count()
    }
}

impl GuiderPort for MockGuider {
    fn enable_multi_star(&mut self) -> Result<(), GuideError> {
        self.answer(GuideStage::EnableMultiStar)
    }

    fn start_guiding(&mut self) -> Result<(), GuideError> {
        self.answer(GuideStage::Start)
    }

    fn stop_guiding(&mut self) -> Result<(), GuideError> {
        self.answer(GuideStage::Stop)
    }
}

// ── VirtualClock ──────────────────────────────────────────────

pub struct VirtualClock {
    pub now: DateTime<Utc>,
    pub slept: Duration,
}

impl Default for VirtualClock {
    fn default() -> Self {
        Self {
            now: Utc.with_ymd_and_hms(2024, 8, 7, 22, 30, 0).unwrap(),
            slept: Duration::ZERO,
        }
    }
}

impl Clock for VirtualClock {
    fn now(&self) -> DateTime<Utc> {
        self.now
    }

    fn sleep(&mut self, duration: Duration) {
        self.slept += duration;
        self.now += chrono::Duration::from_std(duration).unwrap();
    }
}

// ── RecordingSink ─────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    /// States entered, in order.
    pub fn states(&self) -> Vec<StateId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                AppEvent::StateChanged { to, .. } => Some(*to),
                _ => None,
            })
            .collect()
    }

    pub fn last_state(&self) -> Option<StateId> {
        self.states().last().copied()
    }

    pub fn contains(&self, wanted: impl Fn(&AppEvent) -> bool) -> bool {
        self.events.iter().any(wanted)
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

// ── Wiring ────────────────────────────────────────────────────

pub type TestObservatory = Observatory<MockRig, MockEphemeris, MockGuider, VirtualClock, RecordingSink>;

#[allow(dead_code)]
pub fn observatory() -> TestObservatory {
    observatory_with(ObservatoryConfig::default(), MockRig::new(), MockGuider::default())
}

pub fn observatory_with(config: ObservatoryConfig, rig: MockRig, guider: MockGuider) -> TestObservatory {
    build(config, rig, MockEphemeris::default(), guider)
}

pub fn build(
    config: ObservatoryConfig,
    rig: MockRig,
    ephemeris: MockEphemeris,
    guider: MockGuider,
) -> TestObservatory {
    Observatory::new(
        config,
        rig,
        ephemeris,
        guider,
        VirtualClock::default(),
        RecordingSink::default(),
    )
}
