use axum::extract::State;
use axum::Json;
use serde::Serialize;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::config::ReasoningBackend;
use crate::pipeline::classifier::ClassifierStatus;

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub ml_loaded: bool,
    pub classifier: ClassifierStatus,
    pub reasoning_backend: ReasoningBackend,
    pub reasoning_model: Option<String>,
    /// Kept under its historical name; true for any configured backend.
    pub gemini_available: bool,
    pub api_key_loaded: bool,
    pub reports_dir: String,
    pub patients_dir: String,
    pub reports_count: usize,
    pub patients_count: usize,
    pub history_count: usize,
}

/// `GET /api/status`: liveness plus what is loaded.
pub async fn status(State(ctx): State<ApiContext>) -> Result<Json<StatusResponse>, ApiError> {
    let classifier = ctx.orchestrator.classifier().status();
    let reasoning = ctx.orchestrator.reasoning();
    let history_count = ctx.lock_history()?.len();
    let stores = ctx.clone();
    let (reports_count, patients_count) =
        blocking(move || Ok((stores.reports.count(), stores.patients.count()))).await?;

    Ok(Json(StatusResponse {
        status: "online",
        version: crate::config::APP_VERSION,
        ml_loaded: classifier.available,
        classifier,
        reasoning_backend: ctx.config.reasoning.backend,
        reasoning_model: reasoning.map(|r| r.model().to_string()),
        gemini_available: reasoning.is_some(),
        api_key_loaded: ctx.config.reasoning.gemini.api_key.is_some(),
        reports_dir: ctx.reports.dir().display().to_string(),
        patients_dir: ctx.patients.dir().display().to_string(),
        reports_count,
        patients_count,
        history_count,
    }))
}
