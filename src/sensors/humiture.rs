//! DHT11 temperature and humidity sensor.

use super::{AlertDraft, PinMap, Probe, ReadingValues};
use crate::config::TemperatureHumidityConfig;
use crate::error::Result;
use crate::gpio::PinDriver;
use crate::measure::dht::read_with_retry;
use crate::measure::{round2, Dht11, HumitureLimits, HumitureSample, RetryPolicy};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct HumitureReading {
    pub temperature_c: f64,
    pub temperature_f: f64,
    pub humidity_pct: f64,
}

/// Low/high alert bounds for one quantity.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ThresholdPair {
    pub low: f64,
    pub high: f64,
}

#[derive(Debug, Clone)]
pub struct TemperatureHumidity {
    sensor: Dht11,
    retry: RetryPolicy,
    limits: HumitureLimits,
    temperature: ThresholdPair,
    humidity: ThresholdPair,
}

impl TemperatureHumidity {
    pub fn new(
        sensor: Dht11,
        retry: RetryPolicy,
        limits: HumitureLimits,
        temperature: ThresholdPair,
        humidity: ThresholdPair,
    ) -> Self {
        Self {
            sensor,
            retry,
            limits,
            temperature,
            humidity,
        }
    }

    pub fn from_config(config: &TemperatureHumidityConfig) -> Self {
        Self::new(
            Dht11::new(config.data_pin),
            RetryPolicy {
                attempts: config.retries,
                settle: Duration::from_millis(config.settle_ms),
            },
            HumitureLimits {
                temperature_c: config.valid_temp_min_c..=config.valid_temp_max_c,
                humidity_pct: config.valid_humidity_min_pct..=config.valid_humidity_max_pct,
            },
            ThresholdPair {
                low: config.temp_low_c,
                high: config.temp_high_c,
            },
            ThresholdPair {
                low: config.humidity_low_pct,
                high: config.humidity_high_pct,
            },
        )
    }
}

pub fn celsius_to_fahrenheit(celsius: f64) -> f64 {
    round2(celsius * 9.0 / 5.0 + 32.0)
}

impl Probe for TemperatureHumidity {
    type Sample = HumitureSample;
    type Reading = HumitureReading;

    fn pins(&self) -> PinMap {
        PinMap::from([("data".to_string(), self.sensor.pin)])
    }

    fn sample(&self, driver: &dyn PinDriver) -> Result<HumitureSample> {
        read_with_retry(driver, &self.sensor, &self.retry, &self.limits)
    }

    fn apply(&self, reading: &mut HumitureReading, sample: HumitureSample, _now: DateTime<Utc>) -> Vec<AlertDraft> {
        let temperature = round2(sample.temperature_c);
        let humidity = round2(sample.humidity_pct);
        reading.temperature_c = temperature;
        reading.temperature_f = celsius_to_fahrenheit(temperature);
        reading.humidity_pct = humidity;

        let mut alerts = Vec::new();
        if temperature > self.temperature.high {
            alerts.push(AlertDraft::new(
                "Temperature Alert",
                "Temperature_High",
                format!("High temperature detected: {}°C", temperature),
            ));
        }
        if temperature < self.temperature.low {
            alerts.push(AlertDraft::new(
                "Temperature Alert",
                "Temperature_Low",
                format!("Low temperature detected: {}°C", temperature),
            ));
        }
        if humidity > self.humidity.high {
            alerts.push(AlertDraft::new(
                "Humidity Alert",
                "Humidity_High",
                format!("High humidity detected: {}%", humidity),
            ));
        }
        if humidity < self.humidity.low {
            alerts.push(AlertDraft::new(
                "Humidity Alert",
                "Humidity_Low",
                format!("Low humidity detected: {}%", humidity),
            ));
        }
        alerts
    }

    fn values(reading: &HumitureReading) -> ReadingValues {
        ReadingValues::TemperatureHumidity(*reading)
    }
}
