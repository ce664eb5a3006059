// SPDX-License-Identifier: MIT

//! Registered household members sharing the physical scale.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ScaleError;

/// Format the setup flow collects birth dates in.
pub const BIRTH_DATE_FORMAT: &str = "%d.%m.%Y";

/// Gender as the vendor analysis endpoint encodes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Male,
    Female,
}

impl Gender {
    /// Wire encoding for the analysis-report call (1 = male, 2 = female).
    pub fn sex_code(self) -> u8 {
        match self {
            Gender::Male => 1,
            Gender::Female => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Gender::Male => "male",
            Gender::Female => "female",
        }
    }
}

/// One household member, supplied once at setup time and read-only for the
/// life of the coordinator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisteredUser {
    /// Vendor-assigned user id on the device
    pub user_id: String,
    /// Display name
    pub name: String,
    /// Birth date as `DD.MM.YYYY`
    pub birth_date: String,
    pub gender: Gender,
}

impl RegisteredUser {
    /// Parse the configured birth date.
    pub fn parsed_birth_date(&self) -> Result<NaiveDate, ScaleError> {
        NaiveDate::parse_from_str(&self.birth_date, BIRTH_DATE_FORMAT).map_err(|e| {
            ScaleError::Api(format!(
                "Invalid birth_date {:?} for user {}: {}",
                self.birth_date, self.user_id, e
            ))
        })
    }
}
