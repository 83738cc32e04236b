//! # Pi Sensor Hub
//!
//! Polls a fixed set of GPIO-attached sensors on a Raspberry Pi, keeps the
//! latest reading and an alert history per sensor, and serves both over HTTP.
//!
//! ## Features
//!
//! - **Timing-based measurements**: ultrasonic echo ranging, RC discharge
//!   counting, DHT11 single-wire protocol, polarity-aware digital lines
//! - **Per-sensor state machines** with threshold alerts
//! - **Background poller** with cancellation
//! - **HTTP API** with cached and live reads
//! - **Hardware optional**: `gpio` feature for `rppal`, no-hardware fallback
//!   and a scripted driver for tests
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use pi_sensor_hub::{default_driver, AppConfig, Poller, SensorQuery, SensorRegistry};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::default();
//!     let registry = Arc::new(SensorRegistry::from_config(&config, default_driver(false))?);
//!     let poller = Poller::new(registry.clone(), &config.poller).spawn();
//!
//!     let query = SensorQuery::new(registry);
//!     println!("{:?}", query.get_all());
//!
//!     poller.stop().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gpio;
pub mod measure;
pub mod poller;
pub mod query;
pub mod sensors;
pub mod web;

pub use config::AppConfig;
pub use error::{Result, SensorError};
pub use gpio::{default_driver, Level, NoHardware, PinDriver, Polarity};
pub use poller::{Poller, PollerHandle};
pub use query::{HealthReport, SensorQuery};
pub use sensors::{Alert, AnySensor, SensorReading, SensorRegistry, SensorStatus};
pub use web::{start_web_server, WebConfig};

/// The default polling interval in milliseconds
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 1000;

/// The default web server port
pub const DEFAULT_WEB_PORT: u16 = 8000;
