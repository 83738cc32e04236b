//! HTTP handlers. Every body is wrapped in the `{ data, shouldSubscribe }`
//! envelope the dashboard clients expect.

use crate::error::SensorError;
use crate::query::{HealthReport, SensorDescriptor, SensorQuery};
use crate::sensors::alert::ALERT_SOURCE_APP;
use crate::sensors::{Alert, SensorReading};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use std::collections::BTreeMap;
use tracing::error;

/// Shared state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub query: SensorQuery,
    pub poll_interval_ms: u64,
}

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub data: Vec<T>,
    #[serde(rename = "shouldSubscribe")]
    pub should_subscribe: &'static str,
}

impl<T> Envelope<T> {
    pub fn new(data: Vec<T>) -> Self {
        Self {
            data,
            should_subscribe: "true",
        }
    }
}

/// An alert in the field layout of the maintenance dashboard.
#[derive(Debug, Serialize)]
pub struct AlertView {
    #[serde(rename = "AlertType")]
    pub alert_type: String,
    #[serde(rename = "assetId")]
    pub asset_id: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "Date")]
    pub date: DateTime<Utc>,
    #[serde(rename = "Failure_x0020_Class")]
    pub failure_class: String,
    pub id: String,
    #[serde(rename = "App")]
    pub app: &'static str,
    pub anchor: String,
    pub sensor_id: String,
}

impl From<Alert> for AlertView {
    fn from(alert: Alert) -> Self {
        Self {
            alert_type: alert.alert_type,
            anchor: alert.asset_id.clone(),
            asset_id: alert.asset_id,
            description: alert.description,
            date: alert.generated_at,
            failure_class: alert.failure_class,
            id: alert.id,
            app: ALERT_SOURCE_APP,
            sensor_id: alert.sensor_id,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct SensorHealthView {
    pub healthy: bool,
    pub last_reading: Option<DateTime<Utc>>,
    pub sensor_id: String,
}

#[derive(Debug, Serialize)]
pub struct HealthView {
    pub status: &'static str,
    pub timestamp: DateTime<Utc>,
    pub sensors: BTreeMap<String, SensorHealthView>,
}

impl From<HealthReport> for HealthView {
    fn from(report: HealthReport) -> Self {
        Self {
            status: if report.healthy { "healthy" } else { "degraded" },
            timestamp: report.checked_at,
            sensors: report
                .sensors
                .into_iter()
                .map(|s| {
                    (
                        s.key,
                        SensorHealthView {
                            healthy: s.healthy,
                            last_reading: s.last_reading,
                            sensor_id: s.sensor_id,
                        },
                    )
                })
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ConfigListing {
    pub data: Vec<SensorDescriptor>,
    #[serde(rename = "shouldSubscribe")]
    pub should_subscribe: &'static str,
    pub api_version: &'static str,
    pub update_interval_ms: u64,
}

/// Error response for the HTTP layer.
#[derive(Debug)]
pub enum ApiError {
    Sensor(SensorError),
    Internal(String),
}

impl From<SensorError> for ApiError {
    fn from(err: SensorError) -> Self {
        ApiError::Sensor(err)
    }
}

impl From<tokio::task::JoinError> for ApiError {
    fn from(err: tokio::task::JoinError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, detail) = match self {
            ApiError::Sensor(err @ SensorError::NotFound { .. }) => (StatusCode::NOT_FOUND, err.to_string()),
            ApiError::Sensor(err) => {
                error!("Request failed: {}", err);
                (StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
            ApiError::Internal(detail) => {
                error!("Request failed: {}", detail);
                (StatusCode::INTERNAL_SERVER_ERROR, detail)
            }
        };
        (status, Json(json!({ "detail": detail }))).into_response()
    }
}

pub async fn get_all_sensors(State(state): State<AppState>) -> Json<Envelope<SensorReading>> {
    Json(Envelope::new(state.query.get_all()))
}

pub async fn get_sensor_alerts(State(state): State<AppState>) -> Json<Envelope<AlertView>> {
    let alerts = state.query.recent_alerts().into_iter().map(AlertView::from).collect();
    Json(Envelope::new(alerts))
}

pub async fn get_sensor(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Envelope<SensorReading>>, ApiError> {
    let reading = state.query.get_one(&key)?;
    Ok(Json(Envelope::new(vec![reading])))
}

/// Sample the sensor before answering. The measurement blocks, so it runs
/// on the blocking pool.
pub async fn get_live_sensor(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Envelope<SensorReading>>, ApiError> {
    let query = state.query.clone();
    let reading = tokio::task::spawn_blocking(move || query.refresh_and_get(&key)).await??;
    Ok(Json(Envelope::new(vec![reading])))
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Envelope<HealthView>>, ApiError> {
    let query = state.query.clone();
    let report = tokio::task::spawn_blocking(move || query.health()).await?;
    Ok(Json(Envelope::new(vec![HealthView::from(report)])))
}

pub async fn get_config(State(state): State<AppState>) -> Json<ConfigListing> {
    Json(ConfigListing {
        data: state.query.descriptors(),
        should_subscribe: "true",
        api_version: env!("CARGO_PKG_VERSION"),
        update_interval_ms: state.poll_interval_ms,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sensors::{AlertDraft, SensorIdentity};

    #[test]
    fn test_alert_view_field_names() {
        let identity = SensorIdentity {
            sensor_id: "DHT11-01".to_string(),
            asset_id: "TEMP-HUM-01".to_string(),
            pins: Default::default(),
        };
        let alert = Alert::from_draft(
            AlertDraft::new("Temperature Alert", "Temperature_High", "High temperature detected: 36°C"),
            &identity,
            Utc::now(),
            0,
        );
        let value = serde_json::to_value(AlertView::from(alert)).unwrap();
        assert_eq!(value["AlertType"], "Temperature Alert");
        assert_eq!(value["Failure_x0020_Class"], "Temperature_High");
        assert_eq!(value["anchor"], "TEMP-HUM-01");
        assert_eq!(value["App"], "IoT Sensor System");
        assert!(value["id"].as_str().unwrap().starts_with("DHT11-01_"));
    }

    #[test]
    fn test_envelope_shape() {
        let value = serde_json::to_value(Envelope::new(vec![1, 2])).unwrap();
        assert_eq!(value, json!({ "data": [1, 2], "shouldSubscribe": "true" }));
    }
}
