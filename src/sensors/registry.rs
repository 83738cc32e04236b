//! The set of sensors owned by the process.

use super::{AirQuality, AnySensor, Light, Motion, Sensor, TemperatureHumidity, Ultrasonic};
use crate::config::AppConfig;
use crate::error::{Result, SensorError};
use crate::gpio::PinDriver;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::error;

/// Outcome of one pass over every sensor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub sampled: usize,
    pub no_reading: usize,
    pub panicked: usize,
}

struct Entry {
    key: String,
    sensor: AnySensor,
}

/// Sensors in a fixed enumeration order, addressed by key.
///
/// Built once by the composition root and shared with the poller and the
/// query facade. The registry itself is immutable after construction;
/// each sensor guards its own state.
#[derive(Default)]
pub struct SensorRegistry {
    entries: Vec<Entry>,
}

impl SensorRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The five standard sensors, keyed `ultrasonic`, `mq135`, `dht11`, `ldr`, `pir`.
    pub fn from_config(config: &AppConfig, driver: Arc<dyn PinDriver>) -> Result<Self> {
        let capacity = config.alerts.history_per_sensor;
        let mut registry = Self::new();

        let c = &config.ultrasonic;
        registry.register(
            "ultrasonic",
            Sensor::new(&c.sensor_id, &c.asset_id, Ultrasonic::from_config(c), driver.clone(), capacity),
        )?;
        let c = &config.air_quality;
        registry.register(
            "mq135",
            Sensor::new(&c.sensor_id, &c.asset_id, AirQuality::from_config(c), driver.clone(), capacity),
        )?;
        let c = &config.temperature_humidity;
        registry.register(
            "dht11",
            Sensor::new(
                &c.sensor_id,
                &c.asset_id,
                TemperatureHumidity::from_config(c),
                driver.clone(),
                capacity,
            ),
        )?;
        let c = &config.light;
        registry.register(
            "ldr",
            Sensor::new(&c.sensor_id, &c.asset_id, Light::from_config(c), driver.clone(), capacity),
        )?;
        let c = &config.motion;
        registry.register(
            "pir",
            Sensor::new(&c.sensor_id, &c.asset_id, Motion::from_config(c), driver, capacity),
        )?;

        Ok(registry)
    }

    /// Append a sensor. Keys and sensor ids must be unique.
    pub fn register(&mut self, key: impl Into<String>, sensor: impl Into<AnySensor>) -> Result<()> {
        let key = key.into();
        let sensor = sensor.into();
        let sensor_id = &sensor.identity().sensor_id;
        if let Some(existing) = self
            .entries
            .iter()
            .find(|e| e.key == key || &e.sensor.identity().sensor_id == sensor_id)
        {
            return Err(SensorError::config_error(format!(
                "sensor '{}' ({}) clashes with registered sensor '{}' ({})",
                key,
                sensor_id,
                existing.key,
                existing.sensor.identity().sensor_id
            )));
        }
        self.entries.push(Entry { key, sensor });
        Ok(())
    }

    /// Look a sensor up by key or, case-insensitively, by sensor id.
    pub fn get(&self, key: &str) -> Result<&AnySensor> {
        self.entries
            .iter()
            .find(|e| e.key == key)
            .or_else(|| {
                self.entries
                    .iter()
                    .find(|e| e.sensor.identity().sensor_id.eq_ignore_ascii_case(key))
            })
            .map(|e| &e.sensor)
            .ok_or_else(|| SensorError::NotFound {
                requested: key.to_string(),
                available: self.keys(),
            })
    }

    /// Sensors with their keys, in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &AnySensor)> {
        self.entries.iter().map(|e| (e.key.as_str(), &e.sensor))
    }

    pub fn keys(&self) -> Vec<String> {
        self.entries.iter().map(|e| e.key.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Update every sensor in order. A panicking sensor is logged and
    /// skipped; the rest of the round still runs.
    pub fn update_all(&self) -> RoundSummary {
        let mut summary = RoundSummary::default();
        for entry in &self.entries {
            match catch_unwind(AssertUnwindSafe(|| entry.sensor.update())) {
                Ok(true) => summary.sampled += 1,
                Ok(false) => summary.no_reading += 1,
                Err(_) => {
                    error!("Sensor '{}' panicked during update", entry.key);
                    summary.panicked += 1;
                }
            }
        }
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::NoHardware;

    fn registry() -> SensorRegistry {
        SensorRegistry::from_config(&AppConfig::default(), Arc::new(NoHardware::new())).unwrap()
    }

    #[test]
    fn test_standard_sensors_in_order() {
        let registry = registry();
        assert_eq!(registry.keys(), vec!["ultrasonic", "mq135", "dht11", "ldr", "pir"]);
        let types: Vec<_> = registry.iter().map(|(_, s)| s.sensor_type()).collect();
        assert_eq!(
            types,
            vec!["ultrasonic", "air_quality", "temperature_humidity", "light_sensor", "motion_sensor"]
        );
    }

    #[test]
    fn test_lookup_by_key_or_sensor_id() {
        let registry = registry();
        assert_eq!(registry.get("dht11").unwrap().identity().sensor_id, "DHT11-01");
        assert_eq!(registry.get("pir-01").unwrap().sensor_type(), "motion_sensor");
        match registry.get("sonar") {
            Err(SensorError::NotFound { available, .. }) => assert_eq!(available.len(), 5),
            other => panic!("expected NotFound, got {:?}", other.map(|s| s.sensor_type())),
        }
    }

    #[test]
    fn test_duplicate_key_rejected() {
        let mut registry = registry();
        let config = AppConfig::default();
        let sensor = Sensor::new(
            "OTHER-01",
            "OTHER",
            Motion::from_config(&config.motion),
            Arc::new(NoHardware::new()),
            10,
        );
        assert!(matches!(registry.register("pir", sensor), Err(SensorError::Config(_))));
    }

    #[test]
    fn test_round_without_hardware() {
        let summary = registry().update_all();
        assert_eq!(summary.sampled, 0);
        assert_eq!(summary.no_reading, 5);
        assert_eq!(summary.panicked, 0);
    }
}
