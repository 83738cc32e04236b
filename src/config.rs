//! Application configuration.
//!
//! Every field has a default matching the reference wiring, so an empty
//! TOML file (or none at all) yields a working setup.

use crate::error::{Result, SensorError};
use crate::gpio::Polarity;
use crate::web::WebConfig;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use std::time::Duration;

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    pub poller: PollerConfig,
    pub server: WebConfig,
    pub alerts: AlertConfig,
    pub ultrasonic: UltrasonicConfig,
    pub air_quality: AirQualityConfig,
    pub temperature_humidity: TemperatureHumidityConfig,
    pub light: LightConfig,
    pub motion: MotionConfig,
}

/// Background polling cadence.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PollerConfig {
    /// Pause between polling rounds
    pub interval_ms: u64,
    /// Pause after a round fails unexpectedly
    pub backoff_ms: u64,
}

impl Default for PollerConfig {
    fn default() -> Self {
        Self {
            interval_ms: crate::DEFAULT_POLL_INTERVAL_MS,
            backoff_ms: 5_000,
        }
    }
}

impl PollerConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }

    pub fn backoff(&self) -> Duration {
        Duration::from_millis(self.backoff_ms)
    }
}

/// Alert retention.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AlertConfig {
    /// Alerts kept per sensor before the oldest are dropped
    pub history_per_sensor: usize,
}

impl Default for AlertConfig {
    fn default() -> Self {
        Self {
            history_per_sensor: 1_000,
        }
    }
}

/// HC-SR04 ultrasonic range finder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct UltrasonicConfig {
    pub sensor_id: String,
    pub asset_id: String,
    pub trigger_pin: u8,
    pub echo_pin: u8,
    /// Closer than this raises a proximity alert
    pub min_distance_cm: f64,
    /// Further than this raises a range alert
    pub max_distance_cm: f64,
    pub echo_timeout_ms: u64,
}

impl Default for UltrasonicConfig {
    fn default() -> Self {
        Self {
            sensor_id: "ULTRASONIC-01".to_string(),
            asset_id: "DIST-SENSOR-01".to_string(),
            trigger_pin: 18,
            echo_pin: 24,
            min_distance_cm: 10.0,
            max_distance_cm: 200.0,
            echo_timeout_ms: 100,
        }
    }
}

/// MQ-135 gas sensor with digital threshold output and RC-timed analog channel.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AirQualityConfig {
    pub sensor_id: String,
    pub asset_id: String,
    pub digital_pin: u8,
    pub analog_pin: u8,
    /// The MQ-135 module pulls DO low when gas exceeds its trimmer setting
    pub digital_polarity: Polarity,
    pub warning_ppm: f64,
    pub danger_ppm: f64,
    /// PPM proxy per RC count
    pub ppm_per_count: f64,
    pub discharge_ms: u64,
    pub max_count: u32,
    pub max_count_ms: u64,
}

impl Default for AirQualityConfig {
    fn default() -> Self {
        Self {
            sensor_id: "MQ135-01".to_string(),
            asset_id: "AIR-QUALITY-01".to_string(),
            digital_pin: 25,
            analog_pin: 26,
            digital_polarity: Polarity::ActiveLow,
            warning_ppm: 500.0,
            danger_ppm: 1_000.0,
            ppm_per_count: 1.0,
            discharge_ms: 100,
            max_count: 10_000,
            max_count_ms: 1_000,
        }
    }
}

/// DHT11 temperature/humidity sensor.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TemperatureHumidityConfig {
    pub sensor_id: String,
    pub asset_id: String,
    pub data_pin: u8,
    pub temp_low_c: f64,
    pub temp_high_c: f64,
    pub humidity_low_pct: f64,
    pub humidity_high_pct: f64,
    pub retries: u32,
    pub settle_ms: u64,
    pub valid_temp_min_c: f64,
    pub valid_temp_max_c: f64,
    pub valid_humidity_min_pct: f64,
    pub valid_humidity_max_pct: f64,
}

impl Default for TemperatureHumidityConfig {
    fn default() -> Self {
        Self {
            sensor_id: "DHT11-01".to_string(),
            asset_id: "TEMP-HUM-01".to_string(),
            data_pin: 22,
            temp_low_c: 5.0,
            temp_high_c: 35.0,
            humidity_low_pct: 20.0,
            humidity_high_pct: 80.0,
            retries: 3,
            settle_ms: 1_000,
            valid_temp_min_c: -40.0,
            valid_temp_max_c: 80.0,
            valid_humidity_min_pct: 0.0,
            valid_humidity_max_pct: 100.0,
        }
    }
}

/// Photoresistor on an RC-timed pin.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LightConfig {
    pub sensor_id: String,
    pub asset_id: String,
    pub ldr_pin: u8,
    /// Below this percentage the environment is dark
    pub dark_pct: f64,
    /// Above this percentage the environment is very bright
    pub bright_pct: f64,
    /// RC count read in full light (maps to 100 %)
    pub bright_count: u32,
    /// RC count read in darkness (maps to 0 %)
    pub dark_count: u32,
    pub discharge_ms: u64,
    pub max_count: u32,
    pub max_count_ms: u64,
}

impl Default for LightConfig {
    fn default() -> Self {
        Self {
            sensor_id: "LDR-01".to_string(),
            asset_id: "LIGHT-SENSOR-01".to_string(),
            ldr_pin: 21,
            dark_pct: 20.0,
            bright_pct: 80.0,
            bright_count: 0,
            dark_count: 50_000,
            discharge_ms: 100,
            max_count: 100_000,
            max_count_ms: 2_000,
        }
    }
}

/// PIR motion detector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MotionConfig {
    pub sensor_id: String,
    pub asset_id: String,
    pub data_pin: u8,
    pub polarity: Polarity,
    /// Alert when no motion has been seen for longer than this
    pub no_motion_timeout_secs: u64,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            sensor_id: "PIR-01".to_string(),
            asset_id: "MOTION-SENSOR-01".to_string(),
            data_pin: 23,
            polarity: Polarity::ActiveHigh,
            no_motion_timeout_secs: 30,
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file, or defaults when `path` is `None`.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let config = match path {
            Some(path) => {
                let content = std::fs::read_to_string(path)?;
                Self::from_toml(&content)?
            }
            None => Self::default(),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SensorError::config_error(format!("Invalid configuration: {}", e)))
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SensorError::config_error(format!("Failed to serialize configuration: {}", e)))
    }

    /// Reject pin clashes and inverted threshold pairs.
    pub fn validate(&self) -> Result<()> {
        let claims = [
            (self.ultrasonic.trigger_pin, "ultrasonic trigger"),
            (self.ultrasonic.echo_pin, "ultrasonic echo"),
            (self.air_quality.digital_pin, "air quality digital"),
            (self.air_quality.analog_pin, "air quality analog"),
            (self.temperature_humidity.data_pin, "temperature/humidity data"),
            (self.light.ldr_pin, "light sensor"),
            (self.motion.data_pin, "motion data"),
        ];
        let mut owners: HashMap<u8, &str> = HashMap::new();
        for (pin, owner) in claims {
            if let Some(previous) = owners.insert(pin, owner) {
                return Err(SensorError::config_error(format!(
                    "GPIO {} assigned to both {} and {}",
                    pin, previous, owner
                )));
            }
        }

        ordered("ultrasonic distance thresholds", self.ultrasonic.min_distance_cm, self.ultrasonic.max_distance_cm)?;
        ordered("air quality thresholds", self.air_quality.warning_ppm, self.air_quality.danger_ppm)?;
        ordered(
            "temperature thresholds",
            self.temperature_humidity.temp_low_c,
            self.temperature_humidity.temp_high_c,
        )?;
        ordered(
            "humidity thresholds",
            self.temperature_humidity.humidity_low_pct,
            self.temperature_humidity.humidity_high_pct,
        )?;
        ordered(
            "temperature valid range",
            self.temperature_humidity.valid_temp_min_c,
            self.temperature_humidity.valid_temp_max_c,
        )?;
        ordered(
            "humidity valid range",
            self.temperature_humidity.valid_humidity_min_pct,
            self.temperature_humidity.valid_humidity_max_pct,
        )?;
        ordered("light thresholds", self.light.dark_pct, self.light.bright_pct)?;

        if self.light.bright_count >= self.light.dark_count {
            return Err(SensorError::config_error(
                "light bright_count must be below dark_count",
            ));
        }
        if self.temperature_humidity.retries == 0 {
            return Err(SensorError::config_error("temperature/humidity retries must be at least 1"));
        }
        if self.poller.interval_ms == 0 {
            return Err(SensorError::config_error("poller interval must be non-zero"));
        }
        if self.alerts.history_per_sensor == 0 {
            return Err(SensorError::config_error("alert history must keep at least one alert"));
        }
        Ok(())
    }
}

fn ordered(what: &str, low: f64, high: f64) -> Result<()> {
    if low < high {
        Ok(())
    } else {
        Err(SensorError::config_error(format!(
            "{}: low ({}) must be below high ({})",
            what, low, high
        )))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = AppConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.poller.interval(), Duration::from_secs(1));
        assert_eq!(config.poller.backoff(), Duration::from_secs(5));
        assert_eq!(config.temperature_humidity.temp_high_c, 35.0);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [poller]
            interval_ms = 250

            [motion]
            data_pin = 17
            polarity = "active_low"
            "#,
        )
        .unwrap();

        assert_eq!(config.poller.interval_ms, 250);
        assert_eq!(config.poller.backoff_ms, 5_000);
        assert_eq!(config.motion.data_pin, 17);
        assert_eq!(config.motion.polarity, Polarity::ActiveLow);
        assert_eq!(config.ultrasonic.trigger_pin, 18);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_toml_roundtrip() {
        let config = AppConfig::default();
        let text = config.to_toml().unwrap();
        assert_eq!(AppConfig::from_toml(&text).unwrap(), config);
    }

    #[test]
    fn test_pin_clash_rejected() {
        let mut config = AppConfig::default();
        config.light.ldr_pin = config.motion.data_pin;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("GPIO 23"));
    }

    #[test]
    fn test_inverted_thresholds_rejected() {
        let mut config = AppConfig::default();
        config.air_quality.warning_ppm = 2_000.0;
        assert!(matches!(config.validate(), Err(SensorError::Config(_))));
    }

    #[test]
    fn test_unknown_file_is_io_error() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/sensors.toml"))).unwrap_err();
        assert!(matches!(err, SensorError::Io(_)));
    }
}
