//! Read access to sensor state for the network layer.

use crate::error::Result;
use crate::sensors::{Alert, PinMap, SensorReading, SensorRegistry, SensorStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Alerts returned per sensor by [`SensorQuery::recent_alerts`].
pub const RECENT_ALERTS_PER_SENSOR: usize = 10;

/// Per-sensor entry of a [`HealthReport`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorHealth {
    pub key: String,
    pub sensor_id: String,
    pub healthy: bool,
    pub last_reading: Option<DateTime<Utc>>,
}

/// Result of refreshing every sensor once.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthReport {
    pub healthy: bool,
    pub checked_at: DateTime<Utc>,
    pub sensors: Vec<SensorHealth>,
}

/// Static description of one configured sensor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SensorDescriptor {
    pub key: String,
    pub sensor_id: String,
    pub sensor_type: String,
    pub asset_id: String,
    pub pins: PinMap,
}

/// Query facade over a shared [`SensorRegistry`].
///
/// Everything except [`SensorQuery::refresh_and_get`] and
/// [`SensorQuery::health`] only copies state out. Those two take a sample
/// first and block for up to the sensor's measurement timeout, so async
/// callers should run them on a blocking thread.
#[derive(Clone)]
pub struct SensorQuery {
    registry: Arc<SensorRegistry>,
}

impl SensorQuery {
    pub fn new(registry: Arc<SensorRegistry>) -> Self {
        Self { registry }
    }

    /// Latest reading of every sensor, in registry order.
    pub fn get_all(&self) -> Vec<SensorReading> {
        self.registry.iter().map(|(_, sensor)| sensor.snapshot()).collect()
    }

    /// Latest reading of one sensor.
    pub fn get_one(&self, key: &str) -> Result<SensorReading> {
        Ok(self.registry.get(key)?.snapshot())
    }

    /// Sample one sensor now, then return its reading.
    pub fn refresh_and_get(&self, key: &str) -> Result<SensorReading> {
        let sensor = self.registry.get(key)?;
        sensor.update();
        Ok(sensor.snapshot())
    }

    /// The newest alerts of every sensor, merged newest first.
    pub fn recent_alerts(&self) -> Vec<Alert> {
        let mut alerts: Vec<Alert> = self
            .registry
            .iter()
            .flat_map(|(_, sensor)| sensor.recent_alerts(RECENT_ALERTS_PER_SENSOR))
            .collect();
        alerts.sort_by(|a, b| b.generated_at.cmp(&a.generated_at));
        alerts
    }

    /// Refresh every sensor and report which ones have a reading.
    pub fn health(&self) -> HealthReport {
        let sensors: Vec<SensorHealth> = self
            .registry
            .iter()
            .map(|(key, sensor)| {
                sensor.update();
                let reading = sensor.snapshot();
                SensorHealth {
                    key: key.to_string(),
                    sensor_id: reading.sensor_id,
                    healthy: reading.status == SensorStatus::Active,
                    last_reading: reading.timestamp,
                }
            })
            .collect();

        HealthReport {
            healthy: sensors.iter().all(|s| s.healthy),
            checked_at: Utc::now(),
            sensors,
        }
    }

    /// Identity and wiring of every sensor.
    pub fn descriptors(&self) -> Vec<SensorDescriptor> {
        self.registry
            .iter()
            .map(|(key, sensor)| {
                let identity = sensor.identity();
                SensorDescriptor {
                    key: key.to_string(),
                    sensor_id: identity.sensor_id.clone(),
                    sensor_type: sensor.sensor_type().to_string(),
                    asset_id: identity.asset_id.clone(),
                    pins: identity.pins.clone(),
                }
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::error::SensorError;
    use crate::gpio::NoHardware;

    fn query() -> SensorQuery {
        let registry =
            SensorRegistry::from_config(&AppConfig::default(), Arc::new(NoHardware::new())).unwrap();
        SensorQuery::new(Arc::new(registry))
    }

    #[test]
    fn test_get_all_without_hardware() {
        let readings = query().get_all();
        assert_eq!(readings.len(), 5);
        assert!(readings.iter().all(|r| r.status == SensorStatus::NoReading));
    }

    #[test]
    fn test_unknown_sensor() {
        let query = query();
        assert!(matches!(query.get_one("thermocouple"), Err(SensorError::NotFound { .. })));
        assert!(matches!(query.refresh_and_get("thermocouple"), Err(SensorError::NotFound { .. })));
    }

    #[test]
    fn test_health_is_degraded_without_hardware() {
        let report = query().health();
        assert!(!report.healthy);
        assert_eq!(report.sensors.len(), 5);
    }

    #[test]
    fn test_descriptors() {
        let descriptors = query().descriptors();
        assert_eq!(descriptors[0].pins.get("echo"), Some(&24));
        assert_eq!(descriptors[1].sensor_type, "air_quality");
    }
}
