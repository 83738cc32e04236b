//! Single-pin digital detectors (PIR motion, MQ-135 DO line).

use crate::error::Result;
use crate::gpio::{Direction, PinDriver, Polarity};

/// A detector output line with its declared active level.
#[derive(Debug, Clone, Copy)]
pub struct DigitalLine {
    pub pin: u8,
    pub polarity: Polarity,
}

impl DigitalLine {
    pub fn new(pin: u8, polarity: Polarity) -> Self {
        Self { pin, polarity }
    }

    /// Whether the detector is currently signalling.
    pub fn is_active(&self, driver: &dyn PinDriver) -> Result<bool> {
        driver.configure(self.pin, Direction::Input)?;
        Ok(self.polarity.is_active(driver.read(self.pin)?))
    }
}
