//! RC capacitor-discharge timing, the stand-in for a missing ADC.
//!
//! The sensing pin drains the capacitor as a low output, then turns into an
//! input and counts poll iterations until the capacitor has charged through
//! the sensor's resistance far enough to read high. Larger counts mean
//! higher resistance.

use super::round2;
use crate::error::Result;
use crate::gpio::{Direction, Level, PinDriver};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// One RC-timed analog channel.
#[derive(Debug, Clone)]
pub struct RcDischarge {
    pub pin: u8,
    /// How long the pin is held low to empty the capacitor.
    pub discharge: Duration,
    /// Iteration cap. Bounds loop duration only; reaching it is still a reading.
    pub max_count: u32,
    /// Wall-clock cap on the counting loop.
    pub max_duration: Duration,
}

impl RcDischarge {
    /// Discharge, release and count until the pin reads high or a cap is hit.
    pub fn count(&self, driver: &dyn PinDriver) -> Result<u32> {
        driver.configure(self.pin, Direction::Output)?;
        driver.write(self.pin, Level::Low)?;
        driver.delay(self.discharge);

        driver.configure(self.pin, Direction::Input)?;
        let limit = self.max_duration.as_micros() as u64;
        let start = driver.now_micros();
        let mut count = 0u32;
        while driver.read(self.pin)? == Level::Low {
            count += 1;
            if count >= self.max_count || driver.now_micros().saturating_sub(start) > limit {
                break;
            }
        }
        Ok(count)
    }
}

/// Linear map from RC count to a 0-100 % scale.
///
/// `bright_count` maps to 100 % and `dark_count` to 0 %; counts beyond either
/// bound clamp instead of extrapolating. A smaller count never yields a
/// smaller percentage.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct RcCalibration {
    pub bright_count: u32,
    pub dark_count: u32,
}

impl RcCalibration {
    pub fn percentage(&self, count: u32) -> f64 {
        if self.dark_count <= self.bright_count {
            return if count <= self.bright_count { 100.0 } else { 0.0 };
        }
        let span = f64::from(self.dark_count - self.bright_count);
        let above_bright = f64::from(count.saturating_sub(self.bright_count));
        round2(((1.0 - above_bright / span) * 100.0).clamp(0.0, 100.0))
    }
}

impl Default for RcCalibration {
    fn default() -> Self {
        Self {
            bright_count: 0,
            dark_count: 50_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gpio::sim::{ScriptedPins, Signal};

    fn channel(max_count: u32) -> RcDischarge {
        RcDischarge {
            pin: 21,
            discharge: Duration::from_millis(100),
            max_count,
            max_duration: Duration::from_secs(2),
        }
    }

    #[test]
    fn test_count_tracks_charge_time() {
        let pins = ScriptedPins::new().with_signal(21, Signal::rc_charge(1_234));
        assert_eq!(channel(100_000).count(&pins).unwrap(), 1_234);
    }

    #[test]
    fn test_discharge_hold_precedes_counting() {
        let pins = ScriptedPins::new().with_signal(21, Signal::rc_charge(10));
        channel(100_000).count(&pins).unwrap();
        assert!(pins.now_micros() >= 100_000);
    }

    #[test]
    fn test_count_stops_at_cap() {
        let pins = ScriptedPins::new().with_signal(21, Signal::Constant(Level::Low));
        assert_eq!(channel(10_000).count(&pins).unwrap(), 10_000);
    }

    #[test]
    fn test_count_stops_at_time_cap() {
        let pins = ScriptedPins::new().with_signal(21, Signal::Constant(Level::Low));
        let mut rc = channel(u32::MAX);
        rc.max_duration = Duration::from_millis(5);
        let count = rc.count(&pins).unwrap();
        assert!(count <= 5_002);
    }

    #[test]
    fn test_percentage_bounds() {
        let cal = RcCalibration::default();
        assert_eq!(cal.percentage(0), 100.0);
        assert_eq!(cal.percentage(25_000), 50.0);
        assert_eq!(cal.percentage(50_000), 0.0);
        assert_eq!(cal.percentage(90_000), 0.0);

        let offset = RcCalibration {
            bright_count: 1_000,
            dark_count: 11_000,
        };
        assert_eq!(offset.percentage(500), 100.0);
        assert_eq!(offset.percentage(6_000), 50.0);
    }

    #[test]
    fn test_percentage_is_monotonic() {
        let cal = RcCalibration {
            bright_count: 300,
            dark_count: 40_000,
        };
        let mut previous = f64::INFINITY;
        for count in (0..60_000).step_by(97) {
            let pct = cal.percentage(count);
            assert!(pct <= previous, "count {} gave {} after {}", count, pct, previous);
            previous = pct;
        }
    }

    #[test]
    fn test_degenerate_calibration() {
        let cal = RcCalibration {
            bright_count: 500,
            dark_count: 500,
        };
        assert_eq!(cal.percentage(400), 100.0);
        assert_eq!(cal.percentage(600), 0.0);
    }
}
