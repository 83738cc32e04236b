//! GPIO pin access for sensor measurement.
//!
//! Every measurement algorithm talks to the hardware through [`PinDriver`].
//! The concrete driver is picked once at startup by [`default_driver`]:
//! the `rppal` backend when the `gpio` feature is compiled in and the
//! Raspberry Pi GPIO block can be opened, otherwise [`NoHardware`], which
//! fails every pin call so that missing hardware shows up as "no reading"
//! instead of fabricated values.

pub mod sim;

#[cfg(feature = "gpio")]
mod raspberry_pi;

use crate::error::{Result, SensorError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};

#[cfg(feature = "gpio")]
pub use raspberry_pi::RaspberryPiDriver;

/// Logic level of a GPIO line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Low,
    High,
}

impl Level {
    /// The opposite level.
    pub fn toggled(self) -> Self {
        match self {
            Level::Low => Level::High,
            Level::High => Level::Low,
        }
    }
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Direction a pin is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Input,
    Output,
}

/// Which line level a digital sensor uses to signal "detected".
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Polarity {
    ActiveHigh,
    ActiveLow,
}

impl Polarity {
    /// Interpret a raw line level under this polarity.
    pub fn is_active(self, level: Level) -> bool {
        match self {
            Polarity::ActiveHigh => level == Level::High,
            Polarity::ActiveLow => level == Level::Low,
        }
    }
}

/// Access to GPIO pins plus a monotonic microsecond clock.
///
/// Implementations must tolerate a pin being switched between input and
/// output many times within a single sample. Any call may fail with
/// [`SensorError::HardwareFault`]; callers treat that as "no sample this
/// round".
pub trait PinDriver: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Set the direction of a pin, claiming it on first use.
    fn configure(&self, pin: u8, direction: Direction) -> Result<()>;

    /// Drive an output pin.
    fn write(&self, pin: u8, level: Level) -> Result<()>;

    /// Read the current level of a pin.
    fn read(&self, pin: u8) -> Result<Level>;

    /// Monotonic clock in microseconds. Only differences are meaningful.
    fn now_micros(&self) -> u64;

    /// Block the calling thread for roughly `micros` microseconds.
    fn delay_micros(&self, micros: u64);

    /// Release every claimed pin. Called once at shutdown.
    fn release_all(&self) -> Result<()>;

    /// Whether this driver is backed by real pins.
    fn has_hardware(&self) -> bool {
        true
    }

    /// Convenience wrapper around [`PinDriver::delay_micros`].
    fn delay(&self, duration: Duration) {
        self.delay_micros(duration.as_micros() as u64);
    }
}

/// Fallback driver for hosts without GPIO.
///
/// Every pin operation fails with a hardware fault, deterministically.
pub struct NoHardware {
    epoch: Instant,
}

impl NoHardware {
    pub fn new() -> Self {
        Self {
            epoch: Instant::now(),
        }
    }

    fn unavailable(pin: u8) -> SensorError {
        SensorError::hardware_fault(format!(
            "GPIO not available on this system (attempted to access pin {})",
            pin
        ))
    }
}

impl Default for NoHardware {
    fn default() -> Self {
        Self::new()
    }
}

impl PinDriver for NoHardware {
    fn name(&self) -> &'static str {
        "none"
    }

    fn configure(&self, pin: u8, _direction: Direction) -> Result<()> {
        Err(Self::unavailable(pin))
    }

    fn write(&self, pin: u8, _level: Level) -> Result<()> {
        Err(Self::unavailable(pin))
    }

    fn read(&self, pin: u8) -> Result<Level> {
        Err(Self::unavailable(pin))
    }

    fn now_micros(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    fn delay_micros(&self, micros: u64) {
        precise_delay(micros);
    }

    fn release_all(&self) -> Result<()> {
        Ok(())
    }

    fn has_hardware(&self) -> bool {
        false
    }
}

/// Sleep for long delays, spin for sub-millisecond ones.
///
/// The scheduler cannot honour microsecond sleeps, and the echo trigger
/// pulse and DHT11 start signal need them.
pub(crate) fn precise_delay(micros: u64) {
    let duration = Duration::from_micros(micros);
    if micros >= 1_000 {
        std::thread::sleep(duration);
    } else {
        let start = Instant::now();
        while start.elapsed() < duration {
            std::hint::spin_loop();
        }
    }
}

/// Select the driver for this process.
///
/// `disable_hardware` forces the fallback even when GPIO support is compiled in.
pub fn default_driver(disable_hardware: bool) -> Arc<dyn PinDriver> {
    if disable_hardware {
        tracing::info!("GPIO access disabled, sensors will report no reading");
        return Arc::new(NoHardware::new());
    }

    #[cfg(feature = "gpio")]
    {
        match RaspberryPiDriver::new() {
            Ok(driver) => return Arc::new(driver),
            Err(e) => {
                tracing::warn!("Failed to initialize GPIO support, continuing without GPIO: {}", e);
            }
        }
    }

    #[cfg(not(feature = "gpio"))]
    tracing::warn!("GPIO support not compiled in, sensors will report no reading");

    Arc::new(NoHardware::new())
}
