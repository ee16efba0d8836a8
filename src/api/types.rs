//! Shared state for the HTTP layer.

use std::sync::{Arc, Mutex, MutexGuard};

use crate::api::error::ApiError;
use crate::config::AppConfig;
use crate::pipeline::orchestrator::Orchestrator;
use crate::storage::{HistoryLog, PatientStore, ReportStore};

// ═══════════════════════════════════════════════════════════
// API context: shared state for every route
// ═══════════════════════════════════════════════════════════

/// Cloned into each handler via `State<ApiContext>`. Everything inside is
/// behind an `Arc`, so cloning is cheap.
#[derive(Clone)]
pub struct ApiContext {
    pub orchestrator: Arc<Orchestrator>,
    pub reports: Arc<ReportStore>,
    pub patients: Arc<PatientStore>,
    pub history: Arc<Mutex<HistoryLog>>,
    pub config: Arc<AppConfig>,
}

impl ApiContext {
    pub fn new(
        orchestrator: Arc<Orchestrator>,
        reports: ReportStore,
        patients: PatientStore,
        config: Arc<AppConfig>,
    ) -> Self {
        Self {
            orchestrator,
            reports: Arc::new(reports),
            patients: Arc::new(patients),
            history: Arc::new(Mutex::new(HistoryLog::new(config.history_limit))),
            config,
        }
    }

    pub fn lock_history(&self) -> Result<MutexGuard<'_, HistoryLog>, ApiError> {
        self.history
            .lock()
            .map_err(|_| ApiError::Internal("history lock poisoned".into()))
    }
}
