// SPDX-License-Identifier: MIT

//! Shared test fixtures: a scripted fake of the vendor API and builders
//! for records, users, and the app.

use async_trait::async_trait;
use serde_json::json;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tuya_scale_bridge::config::Config;
use tuya_scale_bridge::error::{Result, ScaleError};
use tuya_scale_bridge::models::{
    AnalysisReport, AnalysisRequest, Gender, RawRecord, RegisteredUser,
};
use tuya_scale_bridge::services::{Notifier, ScaleApi, ScaleCoordinator};
use tuya_scale_bridge::AppState;

/// One scripted refresh cycle of history responses.
pub struct FakeCycle {
    /// Pages served in order; page N beyond the script is empty.
    pub pages: Vec<Vec<RawRecord>>,
    /// Fail this page instead of serving it (consumed once).
    pub fail_at_page: Option<(u32, ScaleError)>,
}

impl FakeCycle {
    pub fn pages(pages: Vec<Vec<RawRecord>>) -> Self {
        Self {
            pages,
            fail_at_page: None,
        }
    }

    pub fn failing(page_no: u32, err: ScaleError) -> Self {
        Self {
            pages: Vec::new(),
            fail_at_page: Some((page_no, err)),
        }
    }
}

type AnalysisFn = Box<dyn FnMut(&AnalysisRequest) -> Result<AnalysisReport> + Send>;

#[derive(Default)]
struct FakeState {
    cycles: VecDeque<FakeCycle>,
    current: Option<FakeCycle>,
    requested_pages: Vec<u32>,
    analysis_requests: Vec<AnalysisRequest>,
    analysis_fn: Option<AnalysisFn>,
    history_delay: Option<Duration>,
}

/// Scripted vendor API. Clone it before boxing into the coordinator to
/// keep a handle for assertions.
#[derive(Clone, Default)]
pub struct FakeScaleApi {
    state: Arc<Mutex<FakeState>>,
}

impl FakeScaleApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_cycle(&self, cycle: FakeCycle) {
        self.state.lock().unwrap().cycles.push_back(cycle);
    }

    /// Delay every history page, for exercising the cycle deadline.
    #[allow(dead_code)]
    pub fn set_history_delay(&self, delay: Duration) {
        self.state.lock().unwrap().history_delay = Some(delay);
    }

    pub fn set_analysis(
        &self,
        f: impl FnMut(&AnalysisRequest) -> Result<AnalysisReport> + Send + 'static,
    ) {
        self.state.lock().unwrap().analysis_fn = Some(Box::new(f));
    }

    pub fn requested_pages(&self) -> Vec<u32> {
        self.state.lock().unwrap().requested_pages.clone()
    }

    pub fn analysis_requests(&self) -> Vec<AnalysisRequest> {
        self.state.lock().unwrap().analysis_requests.clone()
    }
}

#[async_trait]
impl ScaleApi for FakeScaleApi {
    async fn history_page(&mut self, page_no: u32, _page_size: u32) -> Result<Vec<RawRecord>> {
        let delay = self.state.lock().unwrap().history_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        let mut state = self.state.lock().unwrap();
        if page_no == 1 {
            state.current = state.cycles.pop_front();
        }
        state.requested_pages.push(page_no);

        let Some(cycle) = state.current.as_mut() else {
            return Ok(Vec::new());
        };
        if let Some((fail_page, _)) = &cycle.fail_at_page {
            if *fail_page == page_no {
                let (_, err) = cycle.fail_at_page.take().unwrap();
                return Err(err);
            }
        }
        Ok(cycle
            .pages
            .get(page_no as usize - 1)
            .cloned()
            .unwrap_or_default())
    }

    async fn analysis_report(&mut self, request: &AnalysisRequest) -> Result<AnalysisReport> {
        let mut state = self.state.lock().unwrap();
        state.analysis_requests.push(request.clone());
        match state.analysis_fn.as_mut() {
            Some(f) => f(request),
            None => Ok(report_with_body_type(1)),
        }
    }
}

/// Notifier that records every message it receives.
#[derive(Clone, Default)]
pub struct CapturingNotifier {
    pub messages: Arc<Mutex<Vec<String>>>,
}

impl Notifier for CapturingNotifier {
    fn notify(&self, _title: &str, message: &str) {
        self.messages.lock().unwrap().push(message.to_string());
    }
}

#[allow(dead_code)]
pub fn report_with_body_type(body_type: i64) -> AnalysisReport {
    serde_json::from_value(json!({
        "body_type": body_type,
        "ffm": 55.0,
        "water": 53.0,
        "body_score": 80.0,
        "bones": 3.2,
        "muscle": 50.0,
        "protein": 17.0,
        "fat": 22.0,
        "metabolism": 1500.0,
        "visceral_fat": 6.0,
        "body_age": 30.0,
        "bmi": 22.5
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn scale_record(user_id: &str, create_time: i64, weight: f64, resistance: &str) -> RawRecord {
    serde_json::from_value(json!({
        "user_id": user_id,
        "nick_name": user_id.to_uppercase(),
        "create_time": create_time,
        "weight": weight,
        "height": 175,
        "resistance": resistance
    }))
    .unwrap()
}

#[allow(dead_code)]
pub fn registered_user(user_id: &str, birth_date: &str, gender: Gender) -> RegisteredUser {
    RegisteredUser {
        user_id: user_id.to_string(),
        name: user_id.to_uppercase(),
        birth_date: birth_date.to_string(),
        gender,
    }
}

/// Coordinator wired to the fake API, with notifications enabled.
#[allow(dead_code)]
pub fn make_coordinator(
    api: &FakeScaleApi,
    users: Vec<RegisteredUser>,
    notifier: CapturingNotifier,
) -> Arc<ScaleCoordinator> {
    Arc::new(ScaleCoordinator::new(
        Box::new(api.clone()),
        users,
        true,
        Box::new(notifier),
    ))
}

/// Test app backed by the fake API.
#[allow(dead_code)]
pub fn create_test_app(
    api: &FakeScaleApi,
    users: Vec<RegisteredUser>,
) -> (axum::Router, Arc<AppState>) {
    let coordinator = make_coordinator(api, users, CapturingNotifier::default());
    let state = Arc::new(AppState {
        config: Config::test_default(),
        coordinator,
    });
    (
        tuya_scale_bridge::routes::create_router(state.clone()),
        state,
    )
}
