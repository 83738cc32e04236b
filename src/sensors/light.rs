//! Photoresistor light sensor on an RC-timed pin.

use super::{AlertDraft, PinMap, Probe, ReadingValues};
use crate::config::LightConfig;
use crate::error::Result;
use crate::gpio::PinDriver;
use crate::measure::{RcCalibration, RcDischarge};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum LightCondition {
    Dark,
    #[default]
    Normal,
    VeryBright,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct LightReading {
    pub raw_count: u32,
    pub light_pct: f64,
    pub condition: LightCondition,
}

#[derive(Debug, Clone)]
pub struct Light {
    channel: RcDischarge,
    calibration: RcCalibration,
    dark_pct: f64,
    bright_pct: f64,
}

impl Light {
    pub fn new(channel: RcDischarge, calibration: RcCalibration, dark_pct: f64, bright_pct: f64) -> Self {
        Self {
            channel,
            calibration,
            dark_pct,
            bright_pct,
        }
    }

    pub fn from_config(config: &LightConfig) -> Self {
        Self::new(
            RcDischarge {
                pin: config.ldr_pin,
                discharge: Duration::from_millis(config.discharge_ms),
                max_count: config.max_count,
                max_duration: Duration::from_millis(config.max_count_ms),
            },
            RcCalibration {
                bright_count: config.bright_count,
                dark_count: config.dark_count,
            },
            config.dark_pct,
            config.bright_pct,
        )
    }

    pub fn condition(&self, light_pct: f64) -> LightCondition {
        if light_pct < self.dark_pct {
            LightCondition::Dark
        } else if light_pct > self.bright_pct {
            LightCondition::VeryBright
        } else {
            LightCondition::Normal
        }
    }
}

impl Probe for Light {
    type Sample = u32;
    type Reading = LightReading;

    fn pins(&self) -> PinMap {
        PinMap::from([("ldr".to_string(), self.channel.pin)])
    }

    fn sample(&self, driver: &dyn PinDriver) -> Result<u32> {
        self.channel.count(driver)
    }

    fn apply(&self, reading: &mut LightReading, raw_count: u32, _now: DateTime<Utc>) -> Vec<AlertDraft> {
        let light_pct = self.calibration.percentage(raw_count);
        reading.raw_count = raw_count;
        reading.light_pct = light_pct;
        reading.condition = self.condition(light_pct);

        let mut alerts = Vec::new();
        if light_pct < self.dark_pct {
            alerts.push(AlertDraft::new(
                "Light Level Alert",
                "Light_Dark",
                format!("Dark environment detected: {}% light level", light_pct),
            ));
        }
        if light_pct > self.bright_pct {
            alerts.push(AlertDraft::new(
                "Light Level Alert",
                "Light_Bright",
                format!("Very bright environment detected: {}% light level", light_pct),
            ));
        }
        alerts
    }

    fn values(reading: &LightReading) -> ReadingValues {
        ReadingValues::Light(*reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn apply(count: u32) -> (LightReading, Vec<AlertDraft>) {
        let probe = Light::from_config(&LightConfig::default());
        let mut reading = LightReading::default();
        let alerts = probe.apply(&mut reading, count, Utc::now());
        (reading, alerts)
    }

    #[test]
    fn test_dark_room() {
        let (reading, alerts) = apply(45_000);
        assert_eq!(reading.light_pct, 10.0);
        assert_eq!(reading.condition, LightCondition::Dark);
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].failure_class, "Light_Dark");
    }

    #[test]
    fn test_bright_room() {
        let (reading, alerts) = apply(2_500);
        assert_eq!(reading.light_pct, 95.0);
        assert_eq!(reading.condition, LightCondition::VeryBright);
        assert_eq!(alerts[0].failure_class, "Light_Bright");
    }

    #[test]
    fn test_normal_room() {
        let (reading, alerts) = apply(25_000);
        assert_eq!(reading.condition, LightCondition::Normal);
        assert!(alerts.is_empty());
    }

    #[test]
    fn test_capped_count_is_still_a_reading() {
        let (reading, _) = apply(100_000);
        assert_eq!(reading.raw_count, 100_000);
        assert_eq!(reading.light_pct, 0.0);
    }
}
