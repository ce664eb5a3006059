// SPDX-License-Identifier: MIT

//! Services module - the polling/reconciliation core.

pub mod api;
pub mod coordinator;
pub mod notify;
pub mod rate_limit;
pub mod sign;

pub use api::{fetch_history, DiscoveredUser, ScaleApi, TuyaCloudClient};
pub use coordinator::{reconcile, spawn_poller, ScaleCoordinator};
pub use notify::{LogNotifier, Notifier};
pub use rate_limit::RateLimiter;
pub use sign::sign_request;
