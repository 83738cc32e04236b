//! HTTP surface over the query facade.
//!
//! Handlers never touch pins directly: cached routes copy state out, live
//! routes and the health check sample on the blocking pool.

pub mod config;
pub mod handlers;
pub mod router;

pub use config::WebConfig;
pub use handlers::AppState;
pub use router::create_app;

use crate::error::{Result, SensorError};
use crate::query::SensorQuery;
use std::future::Future;
use std::net::SocketAddr;
use tracing::info;

/// Serve the API until `shutdown` resolves.
pub async fn start_web_server<F>(
    config: WebConfig,
    query: SensorQuery,
    poll_interval_ms: u64,
    shutdown: F,
) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let state = AppState {
        query,
        poll_interval_ms,
    };
    let app = create_app(&config, state);

    let addr = config
        .bind_address()
        .parse::<SocketAddr>()
        .map_err(|e| SensorError::config_error(format!("Invalid bind address: {}", e)))?;

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| SensorError::web_server_error(format!("Failed to bind to address: {}", e)))?;

    info!("Sensor API listening on http://{}", addr);
    info!("Readings: http://{}/sensors", addr);
    info!("Alerts: http://{}/sensors/alerts", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await
        .map_err(|e| SensorError::web_server_error(format!("Server error: {}", e)))?;

    info!("Web server stopped");
    Ok(())
}
