// SPDX-License-Identifier: MIT

//! Tuya Scale Bridge
//!
//! Polls the Tuya cloud API for smart body-fat scale readings shared by
//! multiple household members, reconciles the latest measurement per
//! registered user, enriches it with the vendor's body-composition
//! analysis, and serves the per-user snapshot to a host automation
//! platform.

pub mod config;
pub mod error;
pub mod models;
pub mod routes;
pub mod services;
pub mod time_utils;

use config::Config;
use services::ScaleCoordinator;
use std::sync::Arc;

/// Shared application state.
pub struct AppState {
    pub config: Config,
    pub coordinator: Arc<ScaleCoordinator>,
}
