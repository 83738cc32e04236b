//! Per-sensor state machines.
//!
//! A [`Sensor`] pairs a [`Probe`] (the sensor-type specific measurement and
//! threshold rules) with the state it owns: the latest typed reading, the
//! time of the last good sample and the alert log. The state sits behind a
//! per-sensor mutex that is taken only to commit a finished sample or to
//! copy out a snapshot, never while the hardware is being timed.
//!
//! The five supported sensor types form the closed set [`AnySensor`].

pub mod air_quality;
pub mod alert;
pub mod humiture;
pub mod light;
pub mod motion;
pub mod registry;
pub mod ultrasonic;

use crate::error::{Result, SensorError};
use crate::gpio::PinDriver;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use tracing::{debug, warn};

pub use air_quality::{AirQuality, AirQualityReading, AirQualitySample, QualityLevel};
pub use alert::{Alert, AlertDraft, AlertLog};
pub use humiture::{HumitureReading, TemperatureHumidity};
pub use light::{Light, LightCondition, LightReading};
pub use motion::{Motion, MotionReading};
pub use registry::{RoundSummary, SensorRegistry};
pub use ultrasonic::{DistanceReading, Ultrasonic};

/// Named pin assignments, e.g. `{"trigger": 18, "echo": 24}`.
pub type PinMap = BTreeMap<String, u8>;

/// Immutable identity fixed at construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorIdentity {
    pub sensor_id: String,
    pub asset_id: String,
    pub pins: PinMap,
}

/// Whether a sensor has ever produced a good sample.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SensorStatus {
    Active,
    NoReading,
}

impl SensorStatus {
    fn from_last_reading(last_reading_time: Option<DateTime<Utc>>) -> Self {
        if last_reading_time.is_some() {
            SensorStatus::Active
        } else {
            SensorStatus::NoReading
        }
    }
}

/// Sensor-type specific values of a reading.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "sensor_type")]
pub enum ReadingValues {
    #[serde(rename = "ultrasonic")]
    Ultrasonic(DistanceReading),
    #[serde(rename = "air_quality")]
    AirQuality(AirQualityReading),
    #[serde(rename = "temperature_humidity")]
    TemperatureHumidity(HumitureReading),
    #[serde(rename = "light_sensor")]
    Light(LightReading),
    #[serde(rename = "motion_sensor")]
    Motion(MotionReading),
}

impl ReadingValues {
    pub fn sensor_type(&self) -> &'static str {
        match self {
            ReadingValues::Ultrasonic(_) => "ultrasonic",
            ReadingValues::AirQuality(_) => "air_quality",
            ReadingValues::TemperatureHumidity(_) => "temperature_humidity",
            ReadingValues::Light(_) => "light_sensor",
            ReadingValues::Motion(_) => "motion_sensor",
        }
    }
}

/// A point-in-time copy of one sensor's state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorReading {
    pub sensor_id: String,
    pub asset_id: String,
    pub pins: PinMap,
    /// Time of the last good sample
    pub timestamp: Option<DateTime<Utc>>,
    pub status: SensorStatus,
    #[serde(flatten)]
    pub values: ReadingValues,
}

/// Sensor-type specific measurement and threshold logic.
pub trait Probe: Send + Sync {
    /// Raw result of one measurement.
    type Sample: Send;
    /// Typed state kept between samples.
    type Reading: Clone + Default + Send;

    /// Pins this probe drives, by role.
    fn pins(&self) -> PinMap;

    /// Take one measurement. May block for the probe's bounded timeout.
    fn sample(&self, driver: &dyn PinDriver) -> Result<Self::Sample>;

    /// Fold a good sample into the reading and evaluate every threshold rule.
    fn apply(
        &self,
        reading: &mut Self::Reading,
        sample: Self::Sample,
        now: DateTime<Utc>,
    ) -> Vec<AlertDraft>;

    /// Wrap a reading for presentation.
    fn values(reading: &Self::Reading) -> ReadingValues;
}

struct SensorState<R> {
    reading: R,
    last_reading_time: Option<DateTime<Utc>>,
    alerts: AlertLog,
}

/// One sensor instance and the state it exclusively owns.
pub struct Sensor<P: Probe> {
    identity: SensorIdentity,
    probe: P,
    driver: Arc<dyn PinDriver>,
    /// Held for a whole sample and commit, so one sensor's pins see one
    /// exchange at a time. Snapshots never take it.
    sampling: Mutex<()>,
    state: Mutex<SensorState<P::Reading>>,
    consecutive_failures: AtomicU32,
}

impl<P: Probe> Sensor<P> {
    pub fn new(
        sensor_id: impl Into<String>,
        asset_id: impl Into<String>,
        probe: P,
        driver: Arc<dyn PinDriver>,
        alert_capacity: usize,
    ) -> Self {
        let identity = SensorIdentity {
            sensor_id: sensor_id.into(),
            asset_id: asset_id.into(),
            pins: probe.pins(),
        };
        Self {
            identity,
            probe,
            driver,
            sampling: Mutex::new(()),
            state: Mutex::new(SensorState {
                reading: P::Reading::default(),
                last_reading_time: None,
                alerts: AlertLog::with_capacity(alert_capacity),
            }),
            consecutive_failures: AtomicU32::new(0),
        }
    }

    pub fn identity(&self) -> &SensorIdentity {
        &self.identity
    }

    fn state(&self) -> MutexGuard<'_, SensorState<P::Reading>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Measure and commit. Never fails: a bad sample leaves the previous
    /// reading in place. Returns whether a sample was committed.
    pub fn update(&self) -> bool {
        let _sampling = self.sampling.lock().unwrap_or_else(PoisonError::into_inner);
        match self.probe.sample(self.driver.as_ref()) {
            Ok(sample) => {
                self.commit(sample, Utc::now());
                self.consecutive_failures.store(0, Ordering::Relaxed);
                true
            }
            Err(e) => {
                self.log_sample_failure(&e);
                false
            }
        }
    }

    fn log_sample_failure(&self, error: &SensorError) {
        let failures = self.consecutive_failures.fetch_add(1, Ordering::Relaxed) + 1;
        if failures == 1 {
            warn!("{}: no reading this round: {}", self.identity.sensor_id, error);
        } else {
            debug!(
                "{}: no reading this round ({} in a row): {}",
                self.identity.sensor_id, failures, error
            );
        }
    }

    /// Apply a sample taken at `now` and append any alerts it triggers.
    ///
    /// Returns the number of alerts appended.
    pub fn commit(&self, sample: P::Sample, now: DateTime<Utc>) -> usize {
        let mut state = self.state();
        let drafts = self.probe.apply(&mut state.reading, sample, now);
        state.last_reading_time = Some(now);

        let raised = drafts.len();
        for draft in drafts {
            debug!("{}: {} - {}", self.identity.sensor_id, draft.alert_type, draft.description);
            let sequence = state.alerts.total();
            state.alerts.push(Alert::from_draft(draft, &self.identity, now, sequence));
        }
        raised
    }

    /// Copy out the current reading.
    pub fn snapshot(&self) -> SensorReading {
        let state = self.state();
        SensorReading {
            sensor_id: self.identity.sensor_id.clone(),
            asset_id: self.identity.asset_id.clone(),
            pins: self.identity.pins.clone(),
            timestamp: state.last_reading_time,
            status: SensorStatus::from_last_reading(state.last_reading_time),
            values: P::values(&state.reading),
        }
    }

    /// The newest `n` alerts, oldest first.
    pub fn recent_alerts(&self, n: usize) -> Vec<Alert> {
        self.state().alerts.recent(n)
    }

    /// Alerts ever raised by this sensor.
    pub fn alert_total(&self) -> u64 {
        self.state().alerts.total()
    }
}

/// The closed set of supported sensors.
pub enum AnySensor {
    Ultrasonic(Sensor<Ultrasonic>),
    AirQuality(Sensor<AirQuality>),
    TemperatureHumidity(Sensor<TemperatureHumidity>),
    Light(Sensor<Light>),
    Motion(Sensor<Motion>),
}

macro_rules! with_sensor {
    ($any:expr, $sensor:ident => $body:expr) => {
        match $any {
            AnySensor::Ultrasonic($sensor) => $body,
            AnySensor::AirQuality($sensor) => $body,
            AnySensor::TemperatureHumidity($sensor) => $body,
            AnySensor::Light($sensor) => $body,
            AnySensor::Motion($sensor) => $body,
        }
    };
}

impl AnySensor {
    pub fn update(&self) -> bool {
        with_sensor!(self, s => s.update())
    }

    pub fn snapshot(&self) -> SensorReading {
        with_sensor!(self, s => s.snapshot())
    }

    pub fn recent_alerts(&self, n: usize) -> Vec<Alert> {
        with_sensor!(self, s => s.recent_alerts(n))
    }

    pub fn alert_total(&self) -> u64 {
        with_sensor!(self, s => s.alert_total())
    }

    pub fn identity(&self) -> &SensorIdentity {
        with_sensor!(self, s => s.identity())
    }

    pub fn sensor_type(&self) -> &'static str {
        match self {
            AnySensor::Ultrasonic(_) => "ultrasonic",
            AnySensor::AirQuality(_) => "air_quality",
            AnySensor::TemperatureHumidity(_) => "temperature_humidity",
            AnySensor::Light(_) => "light_sensor",
            AnySensor::Motion(_) => "motion_sensor",
        }
    }
}

impl From<Sensor<Ultrasonic>> for AnySensor {
    fn from(sensor: Sensor<Ultrasonic>) -> Self {
        AnySensor::Ultrasonic(sensor)
    }
}

impl From<Sensor<AirQuality>> for AnySensor {
    fn from(sensor: Sensor<AirQuality>) -> Self {
        AnySensor::AirQuality(sensor)
    }
}

impl From<Sensor<TemperatureHumidity>> for AnySensor {
    fn from(sensor: Sensor<TemperatureHumidity>) -> Self {
        AnySensor::TemperatureHumidity(sensor)
    }
}

impl From<Sensor<Light>> for AnySensor {
    fn from(sensor: Sensor<Light>) -> Self {
        AnySensor::Light(sensor)
    }
}

impl From<Sensor<Motion>> for AnySensor {
    fn from(sensor: Sensor<Motion>) -> Self {
        AnySensor::Motion(sensor)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::sim::{ScriptedPins, Signal};
    use crate::config::TemperatureHumidityConfig;
    use crate::gpio::{Level, NoHardware};
    use crate::measure::HumitureSample;
    use std::time::Duration;

    fn ultrasonic(driver: Arc<dyn PinDriver>) -> Sensor<Ultrasonic> {
        Sensor::new(
            "ULTRASONIC-01",
            "DIST-SENSOR-01",
            Ultrasonic::new(18, 24, Duration::from_millis(100), 10.0, 200.0),
            driver,
            100,
        )
    }

    #[test]
    fn test_new_sensor_has_no_reading() {
        let sensor = ultrasonic(Arc::new(NoHardware::new()));
        let reading = sensor.snapshot();
        assert_eq!(reading.status, SensorStatus::NoReading);
        assert!(reading.timestamp.is_none());
        assert_eq!(reading.pins.get("trigger"), Some(&18));
        assert_eq!(reading.values.sensor_type(), "ultrasonic");
    }

    #[test]
    fn test_failed_samples_keep_no_reading() {
        let sensor = ultrasonic(Arc::new(NoHardware::new()));
        for _ in 0..5 {
            assert!(!sensor.update());
        }
        assert_eq!(sensor.snapshot().status, SensorStatus::NoReading);
    }

    #[test]
    fn test_good_sample_activates() {
        let pins = Arc::new(ScriptedPins::new().with_signal(24, Signal::echo(300, 1_000)));
        let sensor = ultrasonic(pins);
        assert!(sensor.update());

        let reading = sensor.snapshot();
        assert_eq!(reading.status, SensorStatus::Active);
        match reading.values {
            ReadingValues::Ultrasonic(d) => assert!((d.distance_cm - 17.15).abs() < 0.01),
            other => panic!("unexpected values {:?}", other),
        }
    }

    #[test]
    fn test_failure_after_success_keeps_stale_value() {
        let pins = Arc::new(ScriptedPins::new().with_signal(24, Signal::echo(300, 1_000)));
        let sensor = ultrasonic(pins.clone());
        assert!(sensor.update());
        let before = sensor.snapshot();

        pins.set_signal(24, Signal::Constant(Level::Low));
        assert!(!sensor.update());
        assert_eq!(sensor.snapshot(), before);
    }

    #[test]
    fn test_reading_json_shape() {
        let sensor = ultrasonic(Arc::new(NoHardware::new()));
        let json = serde_json::to_value(sensor.snapshot()).unwrap();
        assert_eq!(json["sensor_type"], "ultrasonic");
        assert_eq!(json["status"], "no_reading");
        assert_eq!(json["sensor_id"], "ULTRASONIC-01");
        assert!(json["timestamp"].is_null());
        assert_eq!(json["distance_cm"], 0.0);

        let back: SensorReading = serde_json::from_value(json).unwrap();
        assert_eq!(back, sensor.snapshot());
    }

    #[test]
    fn test_alerts_from_one_commit_get_distinct_ids() {
        let sensor = Sensor::new(
            "DHT11-01",
            "TEMP-HUM-01",
            TemperatureHumidity::from_config(&TemperatureHumidityConfig::default()),
            Arc::new(NoHardware::new()),
            100,
        );
        let cold_and_damp = HumitureSample {
            humidity_pct: 90.0,
            temperature_c: 2.0,
        };
        let now = Utc::now();
        assert_eq!(sensor.commit(cold_and_damp, now), 2);
        assert_eq!(sensor.commit(cold_and_damp, now), 2);

        let alerts = sensor.recent_alerts(10);
        assert_eq!(alerts.len(), 4);
        let ids: std::collections::HashSet<_> = alerts.iter().map(|a| a.id.as_str()).collect();
        assert_eq!(ids.len(), 4);
        assert!(alerts[0].id.starts_with("DHT11-01_"));
        assert!(alerts[3].id.ends_with("_3"));
    }

    #[test]
    fn test_any_sensor_dispatch() {
        let any = AnySensor::from(ultrasonic(Arc::new(NoHardware::new())));
        assert_eq!(any.sensor_type(), "ultrasonic");
        assert_eq!(any.identity().asset_id, "DIST-SENSOR-01");
        assert!(!any.update());
        assert!(any.recent_alerts(10).is_empty());
        assert_eq!(any.alert_total(), 0);
    }
}
