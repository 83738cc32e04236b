//! Measurement algorithms that turn pin activity into physical values.
//!
//! The Pi has no ADC, so analog quantities are inferred from timing:
//! ultrasonic echo width for distance and RC charge time for light and gas
//! level. Every loop here carries a hard upper bound.

pub mod dht;
pub mod digital;
pub mod echo;
pub mod rc;

use crate::error::{Result, SensorError};
use crate::gpio::{Level, PinDriver};
use std::time::Duration;

pub use dht::{Dht11, HumitureLimits, HumitureSample, RetryPolicy};
pub use digital::DigitalLine;
pub use echo::EchoRanger;
pub use rc::{RcCalibration, RcDischarge};

/// Poll `pin` until it reads `level`, returning the driver time of the transition.
///
/// Fails with [`SensorError::Timeout`] once more than `timeout` has elapsed.
pub fn wait_for_level(
    driver: &dyn PinDriver,
    pin: u8,
    level: Level,
    timeout: Duration,
    waiting_for: &'static str,
) -> Result<u64> {
    let limit = timeout.as_micros() as u64;
    let start = driver.now_micros();
    loop {
        if driver.read(pin)? == level {
            return Ok(driver.now_micros());
        }
        if driver.now_micros().saturating_sub(start) > limit {
            return Err(SensorError::timeout(waiting_for, timeout));
        }
    }
}

/// Round to two decimal places, the precision readings are reported with.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
