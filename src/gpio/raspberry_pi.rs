//! Raspberry Pi GPIO backend using rppal.

use super::{precise_delay, Direction, Level, PinDriver};
use crate::error::{Result, SensorError};
use rppal::gpio::{Gpio, IoPin, Level as RpiLevel, Mode};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Raspberry Pi GPIO driver.
///
/// Pins are claimed lazily as [`IoPin`]s so their mode can be flipped at
/// runtime. Dropping a claimed pin resets it, which is how
/// [`PinDriver::release_all`] cleans up.
pub struct RaspberryPiDriver {
    gpio: Gpio,
    pins: Mutex<HashMap<u8, IoPin>>,
    epoch: Instant,
}

impl RaspberryPiDriver {
    /// Open the GPIO peripheral.
    pub fn new() -> Result<Self> {
        let gpio = Gpio::new().map_err(|e| {
            SensorError::hardware_fault(format!("Failed to initialize GPIO: {}", e))
        })?;

        Ok(Self {
            gpio,
            pins: Mutex::new(HashMap::new()),
            epoch: Instant::now(),
        })
    }

    fn pins(&self) -> MutexGuard<'_, HashMap<u8, IoPin>> {
        self.pins.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn with_pin<T>(&self, pin: u8, f: impl FnOnce(&mut IoPin) -> T) -> Result<T> {
        let mut pins = self.pins();
        let io_pin = match pins.entry(pin) {
            Entry::Occupied(entry) => entry.into_mut(),
            Entry::Vacant(entry) => {
                let claimed = self.gpio.get(pin).map_err(|e| {
                    SensorError::hardware_fault(format!("Failed to access pin {}: {}", pin, e))
                })?;
                entry.insert(claimed.into_io(Mode::Input))
            }
        };
        Ok(f(io_pin))
    }
}

impl PinDriver for RaspberryPiDriver {
    fn name(&self) -> &'static str {
        "rppal"
    }

    fn configure(&self, pin: u8, direction: Direction) -> Result<()> {
        let mode = match direction {
            Direction::Input => Mode::Input,
            Direction::Output => Mode::Output,
        };
        self.with_pin(pin, |io_pin| {
            if io_pin.mode() != mode {
                io_pin.set_mode(mode);
            }
        })
    }

    fn write(&self, pin: u8, level: Level) -> Result<()> {
        let level = match level {
            Level::Low => RpiLevel::Low,
            Level::High => RpiLevel::High,
        };
        self.with_pin(pin, |io_pin| io_pin.write(level))
    }

    fn read(&self, pin: u8) -> Result<Level> {
        self.with_pin(pin, |io_pin| match io_pin.read() {
            RpiLevel::Low => Level::Low,
            RpiLevel::High => Level::High,
        })
    }

    fn now_micros(&self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }

    fn delay_micros(&self, micros: u64) {
        precise_delay(micros);
    }

    fn release_all(&self) -> Result<()> {
        let mut pins = self.pins();
        let released = pins.len();
        pins.clear();
        tracing::info!("Released {} GPIO pins", released);
        Ok(())
    }
}
