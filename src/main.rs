// SPDX-License-Identifier: MIT

//! Tuya Scale Bridge daemon
//!
//! Runs the refresh coordinator on a timer and exposes the latest per-user
//! snapshot over HTTP for the host automation platform.

use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use tuya_scale_bridge::{
    config::Config,
    services::{spawn_poller, LogNotifier, ScaleCoordinator, TuyaCloudClient},
    AppState,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    let config = Config::from_env().expect("Failed to load configuration");
    tracing::info!(
        region = ?config.region,
        users = config.users.len(),
        poll_interval_secs = config.poll_interval_secs,
        "Starting Tuya Scale Bridge"
    );

    let client = TuyaCloudClient::new(&config);
    let coordinator = Arc::new(ScaleCoordinator::new(
        Box::new(client),
        config.users.clone(),
        config.notify_on_error,
        Box::new(LogNotifier),
    ));

    // First refresh before serving; a failure here is not fatal, the
    // poller keeps trying on its interval.
    match coordinator.refresh().await {
        Ok(snapshot) => {
            tracing::info!(users = snapshot.readings.len(), "Initial refresh complete")
        }
        Err(err) => tracing::error!(error = %err, "Initial refresh failed"),
    }

    spawn_poller(
        coordinator.clone(),
        Duration::from_secs(config.poll_interval_secs),
    );

    let state = Arc::new(AppState {
        config: config.clone(),
        coordinator,
    });
    let app = tuya_scale_bridge::routes::create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured JSON logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("tuya_scale_bridge=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
