//! Ultrasonic time-of-flight ranging (HC-SR04 style).

use super::{round2, wait_for_level};
use crate::error::{Result, SensorError};
use crate::gpio::{Direction, Level, PinDriver};
use std::ops::RangeInclusive;
use std::time::Duration;

/// Speed of sound at room temperature, 343 m/s.
pub const SPEED_OF_SOUND_CM_PER_S: f64 = 34_300.0;

/// Width of the trigger pulse.
pub const TRIGGER_PULSE_US: u64 = 10;

/// Settle time with the trigger held low before pulsing.
const TRIGGER_SETTLE_US: u64 = 2;

/// Distances the HC-SR04 can physically report.
pub const VALID_RANGE_CM: RangeInclusive<f64> = 2.0..=400.0;

/// Convert an echo round-trip time to a one-way distance in centimetres.
pub fn distance_cm(round_trip: Duration) -> f64 {
    round_trip.as_secs_f64() * SPEED_OF_SOUND_CM_PER_S / 2.0
}

/// Discard distances outside `valid`; they are never clamped.
pub fn check_range(distance_cm: f64, valid: &RangeInclusive<f64>) -> Result<f64> {
    if valid.contains(&distance_cm) {
        Ok(distance_cm)
    } else {
        Err(SensorError::out_of_range("distance_cm", distance_cm))
    }
}

/// Trigger/echo pin pair with its timing bounds.
#[derive(Debug, Clone)]
pub struct EchoRanger {
    pub trigger_pin: u8,
    pub echo_pin: u8,
    /// Bound on each of the two echo edge waits.
    pub timeout: Duration,
    pub valid_range: RangeInclusive<f64>,
}

impl EchoRanger {
    pub fn new(trigger_pin: u8, echo_pin: u8, timeout: Duration) -> Self {
        Self {
            trigger_pin,
            echo_pin,
            timeout,
            valid_range: VALID_RANGE_CM,
        }
    }

    /// Fire one pulse and time the echo.
    pub fn measure(&self, driver: &dyn PinDriver) -> Result<f64> {
        driver.configure(self.trigger_pin, Direction::Output)?;
        driver.configure(self.echo_pin, Direction::Input)?;

        driver.write(self.trigger_pin, Level::Low)?;
        driver.delay_micros(TRIGGER_SETTLE_US);
        driver.write(self.trigger_pin, Level::High)?;
        driver.delay_micros(TRIGGER_PULSE_US);
        driver.write(self.trigger_pin, Level::Low)?;

        let t_start = wait_for_level(driver, self.echo_pin, Level::High, self.timeout, "echo start")?;
        let t_end = wait_for_level(driver, self.echo_pin, Level::Low, self.timeout, "echo end")?;

        let round_trip = Duration::from_micros(t_end.saturating_sub(t_start));
        let distance = round2(distance_cm(round_trip));
        check_range(distance, &self.valid_range)
    }
}
