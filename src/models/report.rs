// SPDX-License-Identifier: MIT

//! Body-composition analysis types and the per-user merged reading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Request body for `POST /v1.0/scales/{device_id}/analysis-reports`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisRequest {
    pub height: i64,
    pub weight: f64,
    /// Already normalized to whole ohms
    pub resistance: i64,
    pub age: i64,
    /// 1 = male, 2 = female
    pub sex: u8,
}

/// Body-composition metrics returned by the analysis endpoint.
///
/// Every metric defaults to zero; the vendor omits fields it cannot derive
/// from the given impedance.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalysisReport {
    /// 0–4 ordinal, see [`body_type_label`]
    #[serde(default)]
    pub body_type: i64,
    /// Fat-free mass, kg
    #[serde(default, rename = "ffm")]
    pub fat_free_mass: f64,
    /// Body water, %
    #[serde(default, rename = "water")]
    pub body_water: f64,
    #[serde(default)]
    pub body_score: f64,
    /// Bone mass, kg
    #[serde(default, rename = "bones")]
    pub bone_mass: f64,
    /// Muscle mass, kg
    #[serde(default, rename = "muscle")]
    pub muscle_mass: f64,
    /// Protein, %
    #[serde(default)]
    pub protein: f64,
    /// Body fat, %
    #[serde(default, rename = "fat")]
    pub body_fat: f64,
    /// Basal metabolism, kcal
    #[serde(default, rename = "metabolism")]
    pub basal_metabolism: f64,
    #[serde(default)]
    pub visceral_fat: f64,
    /// Metabolic age, years
    #[serde(default)]
    pub body_age: f64,
    #[serde(default)]
    pub bmi: f64,
}

/// Human-readable label for the body-type ordinal. Unknown ordinals render
/// as their number.
pub fn body_type_label(body_type: i64) -> String {
    match body_type {
        0 => "Underweight".to_string(),
        1 => "Normal".to_string(),
        2 => "Overweight".to_string(),
        3 => "Obese".to_string(),
        4 => "Severely Obese".to_string(),
        other => other.to_string(),
    }
}

/// Merged view of one user's registration, latest measurement, and analysis
/// report. One of these per user per refresh cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserReading {
    pub user_id: String,
    pub name: String,
    pub birth_date: String,
    pub age: i64,
    pub gender: String,
    pub height: f64,
    pub weight: f64,
    pub resistance: i64,
    /// Measurement time formatted `YYYY-MM-DD HH:MM:SS`
    pub last_measurement: String,
    pub body_type: String,
    pub fat_free_mass: f64,
    pub body_water: f64,
    pub body_score: f64,
    pub bone_mass: f64,
    pub muscle_mass: f64,
    pub protein: f64,
    pub body_fat: f64,
    pub basal_metabolism: f64,
    pub visceral_fat: f64,
    pub body_age: f64,
    pub bmi: f64,
}

/// Complete result of one refresh cycle: the unit of caching.
///
/// The coordinator retains the last snapshot that completed fully as
/// `last_good`, replaced only by another fully successful cycle. A degraded
/// cycle hands out a copy with `stale` set; the cached value itself is
/// never mutated on failure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub readings: BTreeMap<String, UserReading>,
    pub refreshed_at: DateTime<Utc>,
    pub stale: bool,
}
