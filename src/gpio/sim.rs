//! Deterministic scripted pins for tests and benchmarks.
//!
//! [`ScriptedPins`] keeps a virtual microsecond clock. Every `read` advances
//! it by one microsecond (one poll iteration) and every `delay` advances it
//! by the requested amount, so timing loops run instantly and reproducibly.
//! Each pin replays a [`Signal`] whose timeline starts when the pin was last
//! configured as an input.

use super::{Direction, Level, PinDriver};
use crate::error::{Result, SensorError};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard, PoisonError};

/// What an input pin reports over time.
#[derive(Debug, Clone, PartialEq)]
pub enum Signal {
    /// Fixed level forever.
    Constant(Level),
    /// Starts at `initial` and toggles at each edge time (µs after input was configured).
    Edges { initial: Level, edges: Vec<u64> },
    /// Every access to the pin fails.
    Fault,
}

impl Signal {
    /// Echo line that goes high `delay_us` after arming and stays high for `width_us`.
    pub fn echo(delay_us: u64, width_us: u64) -> Self {
        Signal::Edges {
            initial: Level::Low,
            edges: vec![delay_us, delay_us + width_us],
        }
    }

    /// RC line that reads low for `charge_us` microseconds after discharge.
    pub fn rc_charge(charge_us: u64) -> Self {
        Signal::Edges {
            initial: Level::Low,
            edges: vec![charge_us],
        }
    }

    /// Full DHT11 response carrying the given five bytes.
    pub fn dht11_frame(bytes: [u8; 5]) -> Self {
        let mut edges = vec![20, 100, 180];
        let mut t = 180;
        for byte in bytes {
            for bit in (0..8).rev() {
                t += 50;
                edges.push(t);
                t += if byte & (1 << bit) != 0 { 70 } else { 26 };
                edges.push(t);
            }
        }
        edges.push(t + 50);
        Signal::Edges {
            initial: Level::High,
            edges,
        }
    }

    fn level_at(&self, elapsed_us: u64) -> Option<Level> {
        match self {
            Signal::Constant(level) => Some(*level),
            Signal::Edges { initial, edges } => {
                let toggles = edges.iter().filter(|&&edge| edge <= elapsed_us).count();
                Some(if toggles % 2 == 0 {
                    *initial
                } else {
                    initial.toggled()
                })
            }
            Signal::Fault => None,
        }
    }
}

/// A recorded pin operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinEvent {
    Configure { pin: u8, direction: Direction, at_us: u64 },
    Write { pin: u8, level: Level, at_us: u64 },
}

#[derive(Debug, Default)]
struct PinState {
    direction: Option<Direction>,
    output: Option<Level>,
    input_since: u64,
}

#[derive(Debug, Default)]
struct SimState {
    clock_us: u64,
    signals: HashMap<u8, Signal>,
    pins: HashMap<u8, PinState>,
    events: Vec<PinEvent>,
    reads: u64,
}

/// Scripted driver with a virtual clock.
#[derive(Debug, Default)]
pub struct ScriptedPins {
    state: Mutex<SimState>,
}

impl ScriptedPins {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style variant of [`ScriptedPins::set_signal`].
    pub fn with_signal(self, pin: u8, signal: Signal) -> Self {
        self.set_signal(pin, signal);
        self
    }

    /// Replace the signal replayed on `pin`.
    pub fn set_signal(&self, pin: u8, signal: Signal) {
        self.state().signals.insert(pin, signal);
    }

    /// Advance the virtual clock without touching any pin.
    pub fn advance(&self, micros: u64) {
        self.state().clock_us += micros;
    }

    /// Every configure and write seen so far.
    pub fn events(&self) -> Vec<PinEvent> {
        self.state().events.clone()
    }

    /// Number of `read` calls served.
    pub fn read_count(&self) -> u64 {
        self.state().reads
    }

    fn state(&self) -> MutexGuard<'_, SimState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn fault(pin: u8) -> SensorError {
        SensorError::hardware_fault(format!("scripted fault on pin {}", pin))
    }
}

impl PinDriver for ScriptedPins {
    fn name(&self) -> &'static str {
        "scripted"
    }

    fn configure(&self, pin: u8, direction: Direction) -> Result<()> {
        let mut state = self.state();
        if matches!(state.signals.get(&pin), Some(Signal::Fault)) {
            return Err(Self::fault(pin));
        }
        let now = state.clock_us;
        let pin_state = state.pins.entry(pin).or_default();
        pin_state.direction = Some(direction);
        if direction == Direction::Input {
            pin_state.input_since = now;
        }
        state.events.push(PinEvent::Configure {
            pin,
            direction,
            at_us: now,
        });
        Ok(())
    }

    fn write(&self, pin: u8, level: Level) -> Result<()> {
        let mut state = self.state();
        if matches!(state.signals.get(&pin), Some(Signal::Fault)) {
            return Err(Self::fault(pin));
        }
        let now = state.clock_us;
        state.pins.entry(pin).or_default().output = Some(level);
        state.events.push(PinEvent::Write {
            pin,
            level,
            at_us: now,
        });
        Ok(())
    }

    fn read(&self, pin: u8) -> Result<Level> {
        let mut state = self.state();
        let now = state.clock_us;
        state.clock_us += 1;
        state.reads += 1;

        let (direction, output, since) = match state.pins.get(&pin) {
            Some(p) => (p.direction, p.output, p.input_since),
            None => (None, None, 0),
        };
        if direction == Some(Direction::Output) {
            if let Some(level) = output {
                return Ok(level);
            }
        }
        match state.signals.get(&pin) {
            Some(signal) => signal
                .level_at(now.saturating_sub(since))
                .ok_or_else(|| Self::fault(pin)),
            None => Ok(Level::Low),
        }
    }

    fn now_micros(&self) -> u64 {
        self.state().clock_us
    }

    fn delay_micros(&self, micros: u64) {
        self.advance(micros);
    }

    fn release_all(&self) -> Result<()> {
        self.state().pins.clear();
        Ok(())
    }
}
