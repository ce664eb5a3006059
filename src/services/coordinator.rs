// SPDX-License-Identifier: MIT

//! Refresh coordinator: the fetch → reconcile → enrich pipeline.
//!
//! One cycle:
//! 1. Fetch paginated measurement history
//! 2. Reconcile to the latest record per registered user
//! 3. Enrich each user with a body-composition analysis report
//! 4. Publish the snapshot; cache it as `last_good`
//!
//! Systemic failures fall back to the cached snapshot (degraded cycle)
//! unless they are auth-shaped, which must surface for re-authentication.
//! Per-user enrichment failures only shrink the snapshot.

use crate::error::{Result, ScaleError};
use crate::models::{
    body_type_label, AnalysisRequest, RawRecord, RegisteredUser, Snapshot, UserReading,
};
use crate::services::api::{
    distinct_users, fetch_history, DiscoveredUser, ScaleApi, MAX_HISTORY_PAGES,
};
use crate::services::notify::Notifier;
use crate::time_utils::{age_years, format_timestamp_ms};
use chrono::{NaiveDate, Utc};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

/// Deadline for one full refresh cycle.
const CYCLE_TIMEOUT: Duration = Duration::from_secs(30);

/// Select the latest record per registered user.
///
/// At most one record per user_id, chosen by maximum `create_time` (first
/// seen wins ties). Users with no matching record are absent from the
/// output, never defaulted; unregistered user_ids are ignored.
pub fn reconcile<'a>(
    records: &'a [RawRecord],
    users: &BTreeMap<String, RegisteredUser>,
) -> BTreeMap<String, &'a RawRecord> {
    let mut latest: BTreeMap<String, &RawRecord> = BTreeMap::new();
    for record in records {
        let Some(user_id) = &record.user_id else {
            continue;
        };
        if !users.contains_key(user_id) {
            continue;
        }
        match latest.get(user_id) {
            Some(existing) if existing.create_time >= record.create_time => {}
            _ => {
                latest.insert(user_id.clone(), record);
            }
        }
    }
    latest
}

/// Drives periodic refresh cycles against the vendor API and caches the
/// last fully successful snapshot.
///
/// Cycles are serialized by the api mutex (single-flight); token and
/// rate-limiter state live inside the client it guards, so they need no
/// further locking.
pub struct ScaleCoordinator {
    api: Mutex<Box<dyn ScaleApi>>,
    users: BTreeMap<String, RegisteredUser>,
    notify_on_error: bool,
    notifier: Box<dyn Notifier>,
    last_good: RwLock<Option<Snapshot>>,
}

impl ScaleCoordinator {
    pub fn new(
        api: Box<dyn ScaleApi>,
        users: Vec<RegisteredUser>,
        notify_on_error: bool,
        notifier: Box<dyn Notifier>,
    ) -> Self {
        let users = users
            .into_iter()
            .map(|user| (user.user_id.clone(), user))
            .collect();
        Self {
            api: Mutex::new(api),
            users,
            notify_on_error,
            notifier,
            last_good: RwLock::new(None),
        }
    }

    /// The cached snapshot from the most recent successful cycle, if any.
    pub async fn latest_snapshot(&self) -> Option<Snapshot> {
        self.last_good.read().await.clone()
    }

    /// Run one refresh cycle under the cycle deadline.
    ///
    /// Full success replaces `last_good` and returns the fresh snapshot.
    /// Auth failures propagate. Other systemic failures return the cached
    /// snapshot flagged stale (with an optional operator notification), or
    /// `UpdateFailed` when no cache exists.
    pub async fn refresh(&self) -> Result<Snapshot> {
        let mut api = self.api.lock().await;

        let outcome = match tokio::time::timeout(CYCLE_TIMEOUT, self.run_cycle(api.as_mut())).await
        {
            Ok(result) => result,
            Err(_) => Err(ScaleError::Network(format!(
                "Refresh cycle exceeded {}s deadline",
                CYCLE_TIMEOUT.as_secs()
            ))),
        };

        match outcome {
            Ok(snapshot) => {
                tracing::info!(users = snapshot.readings.len(), "Refresh cycle complete");
                *self.last_good.write().await = Some(snapshot.clone());
                Ok(snapshot)
            }
            Err(err) if err.is_auth() => {
                tracing::error!(error = %err, "Refresh cycle hit an auth failure");
                Err(err)
            }
            Err(err) => {
                let cached = self.last_good.read().await.clone();
                match cached {
                    Some(snapshot) => {
                        tracing::warn!(
                            error = %err,
                            refreshed_at = %snapshot.refreshed_at,
                            "Refresh failed, serving cached snapshot"
                        );
                        if self.notify_on_error {
                            self.notifier.notify("Scale update failed", &err.to_string());
                        }
                        Ok(Snapshot {
                            stale: true,
                            ..snapshot
                        })
                    }
                    None => Err(ScaleError::UpdateFailed(err.to_string())),
                }
            }
        }
    }

    /// List the distinct device users seen in measurement history (setup
    /// aid for registering household members).
    pub async fn discover(&self) -> Result<Vec<DiscoveredUser>> {
        let mut api = self.api.lock().await;
        let records = fetch_history(api.as_mut(), MAX_HISTORY_PAGES).await?;
        Ok(distinct_users(&records))
    }

    async fn run_cycle(&self, api: &mut dyn ScaleApi) -> Result<Snapshot> {
        tracing::debug!("Starting refresh cycle");
        let records = fetch_history(api, MAX_HISTORY_PAGES).await?;
        let latest = reconcile(&records, &self.users);
        tracing::debug!(
            fetched = records.len(),
            reconciled = latest.len(),
            "Reconciled records"
        );

        let today = Utc::now().date_naive();
        let mut readings = BTreeMap::new();
        for (user_id, record) in latest {
            // One user's failure must not abort the others.
            let user = &self.users[&user_id];
            match self.enrich_user(api, user, record, today).await {
                Ok(reading) => {
                    readings.insert(user_id, reading);
                }
                Err(err) => {
                    tracing::error!(
                        user_id = %user_id,
                        error = %err,
                        "Skipping user after enrichment failure"
                    );
                }
            }
        }

        Ok(Snapshot {
            readings,
            refreshed_at: Utc::now(),
            stale: false,
        })
    }

    /// Build the analysis request for one reconciled record and merge the
    /// returned metrics into a reading.
    async fn enrich_user(
        &self,
        api: &mut dyn ScaleApi,
        user: &RegisteredUser,
        record: &RawRecord,
        today: NaiveDate,
    ) -> Result<UserReading> {
        let birth_date = user.parsed_birth_date()?;
        let age = age_years(birth_date, today);
        let weight = record.weight_kg();
        let height = record.height_cm();
        let resistance = record.resistance_ohms();

        let request = AnalysisRequest {
            height: height as i64,
            weight,
            resistance,
            age,
            sex: user.gender.sex_code(),
        };
        tracing::debug!(user_id = %user.user_id, ?request, "Requesting analysis report");
        let report = api.analysis_report(&request).await?;

        Ok(UserReading {
            user_id: user.user_id.clone(),
            name: user.name.clone(),
            birth_date: user.birth_date.clone(),
            age,
            gender: user.gender.label().to_string(),
            height,
            weight,
            resistance,
            last_measurement: format_timestamp_ms(record.create_time),
            body_type: body_type_label(report.body_type),
            fat_free_mass: report.fat_free_mass,
            body_water: report.body_water,
            body_score: report.body_score,
            bone_mass: report.bone_mass,
            muscle_mass: report.muscle_mass,
            protein: report.protein,
            body_fat: report.body_fat,
            basal_metabolism: report.basal_metabolism,
            visceral_fat: report.visceral_fat,
            body_age: report.body_age,
            bmi: report.bmi,
        })
    }
}

/// Spawn the background poller driving `refresh` every `poll_interval`.
///
/// Ticks that land while a cycle is still running wait on the coordinator's
/// single-flight lock rather than running concurrently; missed ticks are
/// delayed, not bursted.
pub fn spawn_poller(
    coordinator: Arc<ScaleCoordinator>,
    poll_interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick fires immediately; startup already did a refresh.
        ticker.tick().await;
        loop {
            ticker.tick().await;
            match coordinator.refresh().await {
                Ok(snapshot) if snapshot.stale => {
                    tracing::warn!("Scheduled refresh degraded to cached snapshot");
                }
                Ok(_) => {}
                Err(err) => {
                    tracing::error!(error = %err, "Scheduled refresh failed");
                }
            }
        }
    })
}
