// SPDX-License-Identifier: MIT

//! Data models for the bridge.

pub mod record;
pub mod report;
pub mod user;

pub use record::{normalize_resistance, ApiEnvelope, HistoryPage, RawRecord, TokenGrant};
pub use report::{body_type_label, AnalysisReport, AnalysisRequest, Snapshot, UserReading};
pub use user::{Gender, RegisteredUser};
