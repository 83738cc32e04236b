//! MQ-135 air quality sensor.
//!
//! Gas presence comes from the module's digital comparator output. The
//! concentration proxy comes from the RC-timed analog channel, scaled
//! linearly by `ppm_per_count`. The scale is uncalibrated; it orders
//! readings, it does not measure true PPM.

use super::{AlertDraft, PinMap, Probe, ReadingValues};
use crate::config::AirQualityConfig;
use crate::error::Result;
use crate::gpio::PinDriver;
use crate::measure::{round2, DigitalLine, RcDischarge};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub enum QualityLevel {
    #[default]
    Good,
    Poor,
    Dangerous,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct AirQualityReading {
    pub ppm: f64,
    pub gas_detected: bool,
    pub quality_level: QualityLevel,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AirQualitySample {
    pub gas_detected: bool,
    pub raw_count: u32,
}

#[derive(Debug, Clone)]
pub struct AirQuality {
    detector: DigitalLine,
    channel: RcDischarge,
    ppm_per_count: f64,
    warning_ppm: f64,
    danger_ppm: f64,
}

impl AirQuality {
    pub fn new(
        detector: DigitalLine,
        channel: RcDischarge,
        ppm_per_count: f64,
        warning_ppm: f64,
        danger_ppm: f64,
    ) -> Self {
        Self {
            detector,
            channel,
            ppm_per_count,
            warning_ppm,
            danger_ppm,
        }
    }

    pub fn from_config(config: &AirQualityConfig) -> Self {
        Self::new(
            DigitalLine::new(config.digital_pin, config.digital_polarity),
            RcDischarge {
                pin: config.analog_pin,
                discharge: Duration::from_millis(config.discharge_ms),
                max_count: config.max_count,
                max_duration: Duration::from_millis(config.max_count_ms),
            },
            config.ppm_per_count,
            config.warning_ppm,
            config.danger_ppm,
        )
    }

    pub fn ppm(&self, raw_count: u32) -> f64 {
        round2(f64::from(raw_count) * self.ppm_per_count)
    }

    pub fn level(&self, ppm: f64) -> QualityLevel {
        if ppm > self.danger_ppm {
            QualityLevel::Dangerous
        } else if ppm > self.warning_ppm {
            QualityLevel::Poor
        } else {
            QualityLevel::Good
        }
    }
}

impl Probe for AirQuality {
    type Sample = AirQualitySample;
    type Reading = AirQualityReading;

    fn pins(&self) -> PinMap {
        PinMap::from([
            ("digital".to_string(), self.detector.pin),
            ("analog".to_string(), self.channel.pin),
        ])
    }

    fn sample(&self, driver: &dyn PinDriver) -> Result<AirQualitySample> {
        let gas_detected = self.detector.is_active(driver)?;
        let raw_count = self.channel.count(driver)?;
        Ok(AirQualitySample {
            gas_detected,
            raw_count,
        })
    }

    fn apply(&self, reading: &mut AirQualityReading, sample: AirQualitySample, _now: DateTime<Utc>) -> Vec<AlertDraft> {
        let ppm = self.ppm(sample.raw_count);
        reading.ppm = ppm;
        reading.gas_detected = sample.gas_detected;
        reading.quality_level = self.level(ppm);

        let mut alerts = Vec::new();
        if ppm > self.danger_ppm {
            alerts.push(AlertDraft::new(
                "Air Quality Critical",
                "Air_Quality_Critical",
                format!("Dangerous air quality detected: {} PPM. Immediate action required.", ppm),
            ));
        }
        if ppm > self.warning_ppm && ppm <= self.danger_ppm {
            alerts.push(AlertDraft::new(
                "Air Quality Warning",
                "Air_Quality_Warning",
                format!("Poor air quality detected: {} PPM. Monitor closely.", ppm),
            ));
        }
        alerts
    }

    fn values(reading: &AirQualityReading) -> ReadingValues {
        ReadingValues::AirQuality(*reading)
    }
}
