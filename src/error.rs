//! Error handling for the sensor hub crate.

use std::time::Duration;

/// A specialized `Result` type for sensor hub operations.
pub type Result<T> = std::result::Result<T, SensorError>;

/// The main error type for sensor hub operations.
#[derive(Debug, thiserror::Error)]
pub enum SensorError {
    /// GPIO driver call failed or no hardware is present
    #[error("Hardware fault: {0}")]
    HardwareFault(String),

    /// A bounded wait on a pin was exceeded
    #[error("Timed out after {after:?} waiting for {waiting_for}")]
    Timeout {
        waiting_for: &'static str,
        after: Duration,
    },

    /// A sample produced a physically implausible value
    #[error("{quantity} out of range: {value}")]
    OutOfRange { quantity: &'static str, value: f64 },

    /// Framing or checksum failure in a sensor wire protocol
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// Unknown sensor identifier
    #[error("Sensor type '{requested}' not found. Available: {available:?}")]
    NotFound {
        requested: String,
        available: Vec<String>,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Web server error
    #[error("Web server error: {0}")]
    WebServer(String),
}

impl SensorError {
    /// Create a new hardware fault
    pub fn hardware_fault(msg: impl Into<String>) -> Self {
        Self::HardwareFault(msg.into())
    }

    /// Create a new timeout error
    pub fn timeout(waiting_for: &'static str, after: Duration) -> Self {
        Self::Timeout { waiting_for, after }
    }

    /// Create a new out-of-range error
    pub fn out_of_range(quantity: &'static str, value: f64) -> Self {
        Self::OutOfRange { quantity, value }
    }

    /// Create a new protocol error
    pub fn protocol_error(msg: impl Into<String>) -> Self {
        Self::Protocol(msg.into())
    }

    /// Create a new configuration error
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create a new web server error
    pub fn web_server_error(msg: impl Into<String>) -> Self {
        Self::WebServer(msg.into())
    }

    /// Whether this error means "no sample this round" rather than a caller mistake.
    pub fn is_sample_failure(&self) -> bool {
        matches!(
            self,
            Self::HardwareFault(_) | Self::Timeout { .. } | Self::OutOfRange { .. } | Self::Protocol(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_lists_available_keys() {
        let err = SensorError::NotFound {
            requested: "sonar".to_string(),
            available: vec!["ultrasonic".to_string(), "pir".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("sonar"));
        assert!(msg.contains("ultrasonic"));
        assert!(!err.is_sample_failure());
    }

    #[test]
    fn test_sample_failures() {
        assert!(SensorError::hardware_fault("gone").is_sample_failure());
        assert!(SensorError::timeout("echo", Duration::from_millis(100)).is_sample_failure());
        assert!(SensorError::out_of_range("distance_cm", 450.0).is_sample_failure());
        assert!(SensorError::protocol_error("checksum").is_sample_failure());
        assert!(!SensorError::config_error("bad").is_sample_failure());
    }
}
