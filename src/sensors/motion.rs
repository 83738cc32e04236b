//! PIR motion sensor.
//!
//! Two rules: an edge-triggered alert on each not-detected to detected
//! transition (which also bumps the lifetime counter), and a level-triggered
//! alert on every quiet sample once the last motion is older than the
//! timeout.

use super::{AlertDraft, PinMap, Probe, ReadingValues};
use crate::config::MotionConfig;
use crate::error::Result;
use crate::gpio::PinDriver;
use crate::measure::DigitalLine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct MotionReading {
    pub motion_now: bool,
    pub motion_count: u64,
    pub last_motion_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone)]
pub struct Motion {
    line: DigitalLine,
    no_motion_timeout: Duration,
}

impl Motion {
    pub fn new(line: DigitalLine, no_motion_timeout: Duration) -> Self {
        Self {
            line,
            no_motion_timeout,
        }
    }

    pub fn from_config(config: &MotionConfig) -> Self {
        Self::new(
            DigitalLine::new(config.data_pin, config.polarity),
            Duration::from_secs(config.no_motion_timeout_secs),
        )
    }

    fn quiet_too_long(&self, last_motion_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
        match last_motion_at.map(|last| (now - last).to_std()) {
            Some(Ok(quiet)) => quiet > self.no_motion_timeout,
            _ => false,
        }
    }
}

impl Probe for Motion {
    type Sample = bool;
    type Reading = MotionReading;

    fn pins(&self) -> PinMap {
        PinMap::from([("data".to_string(), self.line.pin)])
    }

    fn sample(&self, driver: &dyn PinDriver) -> Result<bool> {
        self.line.is_active(driver)
    }

    fn apply(&self, reading: &mut MotionReading, motion: bool, now: DateTime<Utc>) -> Vec<AlertDraft> {
        let mut alerts = Vec::new();
        if motion {
            if !reading.motion_now {
                reading.motion_count += 1;
                alerts.push(AlertDraft::new(
                    "Motion Detected",
                    "Motion_Detected",
                    format!("Motion detected by sensor. Total detections: {}", reading.motion_count),
                ));
            }
            reading.motion_now = true;
            reading.last_motion_at = Some(now);
        } else {
            reading.motion_now = false;
            if self.quiet_too_long(reading.last_motion_at, now) {
                alerts.push(AlertDraft::new(
                    "No Motion Alert",
                    "Motion_Timeout",
                    format!(
                        "No motion detected for over {} seconds",
                        self.no_motion_timeout.as_secs()
                    ),
                ));
            }
        }
        alerts
    }

    fn values(reading: &MotionReading) -> ReadingValues {
        ReadingValues::Motion(*reading)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn probe() -> Motion {
        Motion::from_config(&MotionConfig::default())
    }

    fn at(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap()
    }

    #[test]
    fn test_counts_rising_edges_only() {
        let probe = probe();
        let mut reading = MotionReading::default();
        let mut detections = 0;
        for (i, motion) in [false, false, true, true, false, true].into_iter().enumerate() {
            let alerts = probe.apply(&mut reading, motion, at(i as i64));
            detections += alerts.iter().filter(|a| a.failure_class == "Motion_Detected").count();
        }
        assert_eq!(reading.motion_count, 2);
        assert_eq!(detections, 2);
        assert!(reading.motion_now);
        assert_eq!(reading.last_motion_at, Some(at(5)));
    }

    #[test]
    fn test_no_motion_timeout_is_level_triggered() {
        let probe = probe();
        let mut reading = MotionReading::default();
        probe.apply(&mut reading, true, at(0));

        assert!(probe.apply(&mut reading, false, at(10)).is_empty());
        assert!(probe.apply(&mut reading, false, at(30)).is_empty());

        let first = probe.apply(&mut reading, false, at(31));
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].failure_class, "Motion_Timeout");
        assert_eq!(probe.apply(&mut reading, false, at(32)).len(), 1);
    }

    #[test]
    fn test_no_timeout_before_first_motion() {
        let probe = probe();
        let mut reading = MotionReading::default();
        assert!(probe.apply(&mut reading, false, at(3_600)).is_empty());
        assert_eq!(reading.motion_count, 0);
    }
}
