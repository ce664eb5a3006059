// SPDX-License-Identifier: MIT

//! Operator notification seam.
//!
//! The host platform owns the real notification mechanism; the bridge only
//! needs somewhere to hand the raw error text when a cycle degrades to
//! cached data. The default implementation writes a structured warning.

/// Receives operator-facing messages when a refresh cycle degrades.
pub trait Notifier: Send + Sync {
    fn notify(&self, title: &str, message: &str);
}

/// Notifier that logs through `tracing`.
#[derive(Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, title: &str, message: &str) {
        tracing::warn!(title, message, "Operator notification");
    }
}
