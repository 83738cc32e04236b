//! Alerts raised by threshold rules, and the per-sensor alert log.

use super::SensorIdentity;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Application tag stamped on every alert.
pub const ALERT_SOURCE_APP: &str = "IoT Sensor System";

/// A threshold rule that fired during an update.
#[derive(Debug, Clone, PartialEq)]
pub struct AlertDraft {
    pub alert_type: &'static str,
    pub failure_class: &'static str,
    pub description: String,
}

impl AlertDraft {
    pub fn new(alert_type: &'static str, failure_class: &'static str, description: impl Into<String>) -> Self {
        Self {
            alert_type,
            failure_class,
            description: description.into(),
        }
    }
}

/// A committed alert.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Alert {
    /// `<sensor_id>_<unix millis>_<sequence>`, where the sequence counts
    /// every alert the sensor has raised.
    pub id: String,
    pub alert_type: String,
    /// Severity class, e.g. `Temperature_High`
    pub failure_class: String,
    pub description: String,
    pub generated_at: DateTime<Utc>,
    pub sensor_id: String,
    pub asset_id: String,
}

impl Alert {
    /// Stamp a draft with the source sensor, generation time and the
    /// sensor's alert sequence number.
    pub fn from_draft(
        draft: AlertDraft,
        identity: &SensorIdentity,
        generated_at: DateTime<Utc>,
        sequence: u64,
    ) -> Self {
        Self {
            id: format!(
                "{}_{}_{}",
                identity.sensor_id,
                generated_at.timestamp_millis(),
                sequence
            ),
            alert_type: draft.alert_type.to_string(),
            failure_class: draft.failure_class.to_string(),
            description: draft.description,
            generated_at,
            sensor_id: identity.sensor_id.clone(),
            asset_id: identity.asset_id.clone(),
        }
    }
}

/// Append-only alert history with a retention cap.
#[derive(Debug, Clone)]
pub struct AlertLog {
    entries: VecDeque<Alert>,
    capacity: usize,
    total: u64,
}

impl AlertLog {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity: capacity.max(1),
            total: 0,
        }
    }

    pub fn push(&mut self, alert: Alert) {
        if self.entries.len() == self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(alert);
        self.total += 1;
    }

    /// The newest `n` alerts, oldest first.
    pub fn recent(&self, n: usize) -> Vec<Alert> {
        let skip = self.entries.len().saturating_sub(n);
        self.entries.iter().skip(skip).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Alerts ever appended, including ones dropped by retention.
    pub fn total(&self) -> u64 {
        self.total
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn identity() -> SensorIdentity {
        SensorIdentity {
            sensor_id: "DHT11-01".to_string(),
            asset_id: "TEMP-HUM-01".to_string(),
            pins: Default::default(),
        }
    }

    fn alert(secs: i64) -> Alert {
        let at = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Alert::from_draft(
            AlertDraft::new("Temperature Alert", "Temperature_High", "hot"),
            &identity(),
            at,
            secs as u64,
        )
    }

    #[test]
    fn test_alert_id_and_source() {
        let a = alert(0);
        assert_eq!(a.id, "DHT11-01_1700000000000_0");
        assert_eq!(a.asset_id, "TEMP-HUM-01");
        assert_eq!(a.failure_class, "Temperature_High");
    }

    #[test]
    fn test_recent_returns_newest() {
        let mut log = AlertLog::with_capacity(100);
        for i in 0..15 {
            log.push(alert(i));
        }
        let recent = log.recent(10);
        assert_eq!(recent.len(), 10);
        assert_eq!(recent[0], alert(5));
        assert_eq!(recent[9], alert(14));
        assert_eq!(log.recent(50).len(), 15);
    }

    #[test]
    fn test_capacity_drops_oldest() {
        let mut log = AlertLog::with_capacity(3);
        for i in 0..5 {
            log.push(alert(i));
        }
        assert_eq!(log.len(), 3);
        assert_eq!(log.total(), 5);
        assert_eq!(log.recent(3)[0], alert(2));
    }
}
