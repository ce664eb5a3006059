// SPDX-License-Identifier: MIT

//! Reading-layer routes: the bridge's outbound surface toward the host
//! automation platform.

use crate::error::{Result, ScaleError};
use crate::models::{Snapshot, UserReading};
use crate::services::DiscoveredUser;
use crate::AppState;
use axum::{
    extract::{Path, State},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::Arc;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/users", get(get_users))
        .route("/api/users/{user_id}", get(get_user))
        .route("/api/refresh", post(trigger_refresh))
        .route("/api/discover", get(discover_users))
}

/// Snapshot as served to the host platform.
#[derive(Serialize)]
pub struct SnapshotResponse {
    pub refreshed_at: DateTime<Utc>,
    /// True when this data came from the cache after a failed cycle
    pub stale: bool,
    pub users: Vec<UserReading>,
}

impl From<Snapshot> for SnapshotResponse {
    fn from(snapshot: Snapshot) -> Self {
        Self {
            refreshed_at: snapshot.refreshed_at,
            stale: snapshot.stale,
            users: snapshot.readings.into_values().collect(),
        }
    }
}

/// All user readings from the current snapshot.
async fn get_users(State(state): State<Arc<AppState>>) -> Result<Json<SnapshotResponse>> {
    let snapshot = state
        .coordinator
        .latest_snapshot()
        .await
        .ok_or_else(|| ScaleError::UpdateFailed("No successful refresh yet".to_string()))?;
    Ok(Json(snapshot.into()))
}

/// One user's reading from the current snapshot.
async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<String>,
) -> Result<Json<UserReading>> {
    let snapshot = state
        .coordinator
        .latest_snapshot()
        .await
        .ok_or_else(|| ScaleError::UpdateFailed("No successful refresh yet".to_string()))?;
    snapshot
        .readings
        .get(&user_id)
        .cloned()
        .map(Json)
        .ok_or_else(|| ScaleError::NotFound(format!("No reading for user {}", user_id)))
}

/// Manual refresh: runs one full cycle for all users, like the original
/// device's refresh button.
async fn trigger_refresh(State(state): State<Arc<AppState>>) -> Result<Json<SnapshotResponse>> {
    tracing::info!("Manual refresh requested");
    let snapshot = state.coordinator.refresh().await?;
    Ok(Json(snapshot.into()))
}

/// Live discovery of device users, for the setup flow.
async fn discover_users(State(state): State<Arc<AppState>>) -> Result<Json<Vec<DiscoveredUser>>> {
    let users = state.coordinator.discover().await?;
    Ok(Json(users))
}
