//! Route table and middleware.

use crate::web::config::WebConfig;
use crate::web::handlers::{self, AppState};
use axum::{routing::get, Router};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

/// Build the axum application over the query facade.
pub fn create_app(config: &WebConfig, state: AppState) -> Router {
    let mut app = Router::new()
        .route("/sensors", get(handlers::get_all_sensors))
        .route("/sensors/alerts", get(handlers::get_sensor_alerts))
        .route("/sensors/:key", get(handlers::get_sensor))
        .route("/sensors/:key/live", get(handlers::get_live_sensor))
        .route("/health", get(handlers::health_check))
        .route("/config", get(handlers::get_config))
        .with_state(state);

    if config.enable_cors {
        app = app.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }

    app.layer(ServiceBuilder::new().layer(TraceLayer::new_for_http()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::gpio::NoHardware;
    use crate::query::SensorQuery;
    use crate::sensors::SensorRegistry;
    use axum::body::{to_bytes, Body};
    use axum::http::{Request, StatusCode};
    use serde_json::Value;
    use std::sync::Arc;
    use tower::ServiceExt;

    fn app() -> Router {
        let registry =
            SensorRegistry::from_config(&AppConfig::default(), Arc::new(NoHardware::new())).unwrap();
        let state = AppState {
            query: SensorQuery::new(Arc::new(registry)),
            poll_interval_ms: 1000,
        };
        create_app(&WebConfig::default(), state)
    }

    async fn get(uri: &str) -> (StatusCode, Value) {
        let response = app()
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn test_all_sensors() {
        let (status, body) = get("/sensors").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["shouldSubscribe"], "true");
        assert_eq!(body["data"].as_array().unwrap().len(), 5);
        assert_eq!(body["data"][0]["sensor_type"], "ultrasonic");
        assert_eq!(body["data"][0]["status"], "no_reading");
    }

    #[tokio::test]
    async fn test_single_sensor_by_key() {
        let (status, body) = get("/sensors/dht11").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["sensor_id"], "DHT11-01");
        assert_eq!(body["data"][0]["pins"]["data"], 22);
    }

    #[tokio::test]
    async fn test_unknown_sensor_is_404() {
        let (status, body) = get("/sensors/thermometer").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let detail = body["detail"].as_str().unwrap();
        assert!(detail.contains("thermometer"));
        assert!(detail.contains("ultrasonic"));

        let (status, _) = get("/sensors/thermometer/live").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_live_read_without_hardware() {
        let (status, body) = get("/sensors/pir/live").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["status"], "no_reading");
    }

    #[tokio::test]
    async fn test_alerts_route_is_not_a_sensor_key() {
        let (status, body) = get("/sensors/alerts").await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["data"].as_array().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_health_and_config() {
        let (status, body) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["status"], "degraded");
        assert_eq!(body["data"][0]["sensors"]["ldr"]["healthy"], false);

        let (status, body) = get("/config").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["update_interval_ms"], 1000);
        assert_eq!(body["data"][1]["sensor_id"], "MQ135-01");
    }
}
