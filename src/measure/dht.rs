//! DHT11 temperature/humidity single-wire protocol.
//!
//! The host pulls the data line low for 18 ms, releases it, and the sensor
//! answers with an 80 µs low / 80 µs high handshake followed by 40 bits.
//! Each bit is a 50 µs low followed by a high pulse of ~26 µs (0) or ~70 µs
//! (1). The fifth byte is the low byte of the sum of the first four.
//! Reads fail often on a non-realtime host, hence [`read_with_retry`].

use super::{round2, wait_for_level};
use crate::error::{Result, SensorError};
use crate::gpio::{Direction, Level, PinDriver};
use serde::{Deserialize, Serialize};
use std::ops::RangeInclusive;
use std::time::Duration;

const START_SIGNAL: Duration = Duration::from_millis(18);
const RELEASE_US: u64 = 30;
const EDGE_TIMEOUT: Duration = Duration::from_micros(200);
/// High pulses longer than this are 1 bits.
const ONE_BIT_THRESHOLD_US: u64 = 40;

/// One decoded DHT11 frame.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct HumitureSample {
    pub humidity_pct: f64,
    pub temperature_c: f64,
}

/// Plausibility bounds; samples outside them are discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct HumitureLimits {
    pub temperature_c: RangeInclusive<f64>,
    pub humidity_pct: RangeInclusive<f64>,
}

impl Default for HumitureLimits {
    fn default() -> Self {
        Self {
            temperature_c: -40.0..=80.0,
            humidity_pct: 0.0..=100.0,
        }
    }
}

impl HumitureLimits {
    pub fn check(&self, sample: HumitureSample) -> Result<HumitureSample> {
        if !self.temperature_c.contains(&sample.temperature_c) {
            return Err(SensorError::out_of_range("temperature_c", sample.temperature_c));
        }
        if !self.humidity_pct.contains(&sample.humidity_pct) {
            return Err(SensorError::out_of_range("humidity_pct", sample.humidity_pct));
        }
        Ok(sample)
    }
}

/// How many times to attempt a read and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryPolicy {
    pub attempts: u32,
    pub settle: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            settle: Duration::from_secs(1),
        }
    }
}

/// Validate the checksum and convert raw bytes to physical units.
pub fn decode_frame(bytes: [u8; 5]) -> Result<HumitureSample> {
    let sum = bytes[..4].iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    if sum != bytes[4] {
        return Err(SensorError::protocol_error(format!(
            "DHT11 checksum mismatch: computed {:#04x}, received {:#04x}",
            sum, bytes[4]
        )));
    }

    let humidity_pct = f64::from(bytes[0]) + f64::from(bytes[1]) / 10.0;
    let magnitude = f64::from(bytes[2]) + f64::from(bytes[3] & 0x7f) / 10.0;
    let temperature_c = if bytes[3] & 0x80 != 0 {
        -magnitude
    } else {
        magnitude
    };

    Ok(HumitureSample {
        humidity_pct: round2(humidity_pct),
        temperature_c: round2(temperature_c),
    })
}

/// A DHT11 on a single data pin.
#[derive(Debug, Clone, Copy)]
pub struct Dht11 {
    pub pin: u8,
}

impl Dht11 {
    pub fn new(pin: u8) -> Self {
        Self { pin }
    }

    /// One protocol exchange, no retries.
    pub fn read_once(&self, driver: &dyn PinDriver) -> Result<HumitureSample> {
        driver.configure(self.pin, Direction::Output)?;
        driver.write(self.pin, Level::Low)?;
        driver.delay(START_SIGNAL);
        driver.write(self.pin, Level::High)?;
        driver.delay_micros(RELEASE_US);
        driver.configure(self.pin, Direction::Input)?;

        wait_for_level(driver, self.pin, Level::Low, EDGE_TIMEOUT, "DHT11 response low")?;
        wait_for_level(driver, self.pin, Level::High, EDGE_TIMEOUT, "DHT11 response high")?;
        wait_for_level(driver, self.pin, Level::Low, EDGE_TIMEOUT, "DHT11 data start")?;

        let mut bytes = [0u8; 5];
        for bit_index in 0..40 {
            let rise = wait_for_level(driver, self.pin, Level::High, EDGE_TIMEOUT, "DHT11 bit start")?;
            let fall = wait_for_level(driver, self.pin, Level::Low, EDGE_TIMEOUT, "DHT11 bit end")?;
            if fall.saturating_sub(rise) > ONE_BIT_THRESHOLD_US {
                bytes[bit_index / 8] |= 1 << (7 - bit_index % 8);
            }
        }

        decode_frame(bytes)
    }
}

/// Read with bounded retries, sleeping `policy.settle` between attempts.
///
/// Returns the last error once every attempt failed or produced an
/// implausible value.
pub fn read_with_retry(
    driver: &dyn PinDriver,
    sensor: &Dht11,
    policy: &RetryPolicy,
    limits: &HumitureLimits,
) -> Result<HumitureSample> {
    let attempts = policy.attempts.max(1);
    let mut last_error = None;
    for attempt in 1..=attempts {
        match sensor.read_once(driver).and_then(|sample| limits.check(sample)) {
            Ok(sample) => return Ok(sample),
            Err(e) => {
                tracing::debug!("DHT11 attempt {}/{} on pin {} failed: {}", attempt, attempts, sensor.pin, e);
                last_error = Some(e);
            }
        }
        if attempt < attempts {
            driver.delay(policy.settle);
        }
    }
    Err(last_error.unwrap_or_else(|| SensorError::protocol_error("DHT11 read not attempted")))
}
