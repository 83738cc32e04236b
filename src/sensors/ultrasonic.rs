//! HC-SR04 distance sensor.

use super::{AlertDraft, PinMap, Probe, ReadingValues};
use crate::config::UltrasonicConfig;
use crate::error::Result;
use crate::gpio::PinDriver;
use crate::measure::{round2, EchoRanger};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const CM_PER_INCH: f64 = 2.54;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct DistanceReading {
    pub distance_cm: f64,
    pub distance_in: f64,
}

/// Echo ranging plus proximity/range rules.
#[derive(Debug, Clone)]
pub struct Ultrasonic {
    ranger: EchoRanger,
    min_distance_cm: f64,
    max_distance_cm: f64,
}

impl Ultrasonic {
    pub fn new(trigger_pin: u8, echo_pin: u8, echo_timeout: Duration, min_distance_cm: f64, max_distance_cm: f64) -> Self {
        Self {
            ranger: EchoRanger::new(trigger_pin, echo_pin, echo_timeout),
            min_distance_cm,
            max_distance_cm,
        }
    }

    pub fn from_config(config: &UltrasonicConfig) -> Self {
        Self::new(
            config.trigger_pin,
            config.echo_pin,
            Duration::from_millis(config.echo_timeout_ms),
            config.min_distance_cm,
            config.max_distance_cm,
        )
    }
}

impl Probe for Ultrasonic {
    type Sample = f64;
    type Reading = DistanceReading;

    fn pins(&self) -> PinMap {
        PinMap::from([
            ("trigger".to_string(), self.ranger.trigger_pin),
            ("echo".to_string(), self.ranger.echo_pin),
        ])
    }

    fn sample(&self, driver: &dyn PinDriver) -> Result<f64> {
        self.ranger.measure(driver)
    }

    fn apply(&self, reading: &mut DistanceReading, distance: f64, _now: DateTime<Utc>) -> Vec<AlertDraft> {
        reading.distance_cm = distance;
        reading.distance_in = round2(distance / CM_PER_INCH);

        let mut alerts = Vec::new();
        if distance < self.min_distance_cm {
            alerts.push(AlertDraft::new(
                "Proximity Alert",
                "Proximity_Warning",
                format!(
                    "Object detected within {}cm. Current distance: {}cm",
                    self.min_distance_cm, distance
                ),
            ));
        }
        if distance > self.max_distance_cm {
            alerts.push(AlertDraft::new(
                "Range Alert",
                "Range_Warning",
                format!("No object detected within range. Current distance: {}cm", distance),
            ));
        }
        alerts
    }

    fn values(reading: &DistanceReading) -> ReadingValues {
        ReadingValues::Ultrasonic(*reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn probe() -> Ultrasonic {
        Ultrasonic::from_config(&UltrasonicConfig::default())
    }

    #[test]
    fn test_apply_converts_to_inches() {
        let mut reading = DistanceReading::default();
        let alerts = probe().apply(&mut reading, 100.0, Utc::now());
        assert!(alerts.is_empty());
        assert_eq!(reading.distance_in, 39.37);
    }

    #[test]
    fn test_proximity_and_range_rules() {
        let mut reading = DistanceReading::default();
        let near = probe().apply(&mut reading, 5.0, Utc::now());
        assert_eq!(near.len(), 1);
        assert_eq!(near[0].failure_class, "Proximity_Warning");

        let far = probe().apply(&mut reading, 250.0, Utc::now());
        assert_eq!(far.len(), 1);
        assert_eq!(far[0].alert_type, "Range Alert");
    }

    #[test]
    fn test_boundaries_do_not_alert() {
        let mut reading = DistanceReading::default();
        assert!(probe().apply(&mut reading, 10.0, Utc::now()).is_empty());
        assert!(probe().apply(&mut reading, 200.0, Utc::now()).is_empty());
    }
}
