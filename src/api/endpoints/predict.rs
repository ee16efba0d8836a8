//! `POST /api/predict`: validate, assess, render, persist.

use axum::body::Bytes;
use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;
use uuid::Uuid;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::api::validation::PredictRequest;
use crate::models::{
    ClinicalVerdict, ConfidenceLevel, HistoryEntry, MlValidation, PatientRecord, Provenance,
    Severity, TreatmentPlan, Urgency,
};
use crate::report::{self, ReportBundle};
use crate::storage::report_store::download_url;

#[derive(Debug, Serialize)]
pub struct PredictResponse {
    pub status: &'static str,
    pub request_id: Uuid,
    pub patient_id: Option<String>,
    pub primary_diagnosis: String,
    pub confidence: f64,
    pub confidence_level: ConfidenceLevel,
    pub severity: Severity,
    pub severity_score: f64,
    pub urgency: Urgency,
    pub reasoning: String,
    pub treatment_plan: TreatmentPlan,
    pub ml_validation: Option<MlValidation>,
    pub override_reason: Option<String>,
    pub pdf_report_url: Option<String>,
    pub pdf_generated: bool,
    pub source: Provenance,
    pub report: ReportBundle,
}

pub async fn predict(
    State(ctx): State<ApiContext>,
    body: Bytes,
) -> Result<Json<PredictResponse>, ApiError> {
    let request = PredictRequest::from_slice(&body).map_err(ApiError::Validation)?;
    let record = request
        .into_record(Utc::now())
        .map_err(ApiError::Validation)?;

    tracing::info!(age = record.age, gender = %record.gender, "Processing patient");

    let response = blocking(move || run(&ctx, record)).await?;
    Ok(Json(response))
}

/// Blocking part of the request. Persistence failures degrade the response
/// instead of discarding the verdict.
fn run(ctx: &ApiContext, record: PatientRecord) -> Result<PredictResponse, ApiError> {
    let assessment = ctx.orchestrator.assess(&record)?;
    let bundle = report::render(&assessment.verdict, &record);

    let verdict = match save_pdf(ctx, &bundle, &record) {
        Some(file) => assessment.verdict.with_report(file),
        None => assessment.verdict,
    };

    let patient_id = match ctx.patients.save(&record, &verdict) {
        Ok(id) => {
            if let Err(e) = ctx.patients.enforce_retention(ctx.config.retention_limit) {
                tracing::warn!(error = %e, "Patient retention failed");
            }
            Some(id)
        }
        Err(e) => {
            tracing::error!(
                request_id = %assessment.request_id,
                error = %e,
                "Failed to save patient data"
            );
            None
        }
    };

    match ctx.lock_history() {
        Ok(mut history) => history.push(HistoryEntry {
            patient_id: patient_id.clone(),
            record,
            verdict: verdict.clone(),
            recorded_at: Utc::now(),
        }),
        Err(e) => tracing::error!(error = %e, "History not updated"),
    }

    tracing::info!(
        request_id = %assessment.request_id,
        diagnosis = %verdict.primary_diagnosis,
        severity = %verdict.severity,
        "Diagnosis complete"
    );

    Ok(response(assessment.request_id, patient_id, verdict, bundle))
}

fn save_pdf(ctx: &ApiContext, bundle: &ReportBundle, record: &PatientRecord) -> Option<String> {
    let bytes = match report::render_pdf(bundle) {
        Ok(bytes) => bytes,
        Err(e) => {
            tracing::error!(error = %e, "PDF generation failed");
            return None;
        }
    };
    match ctx.reports.save(&bytes, record.created_at) {
        Ok(file) => {
            if let Err(e) = ctx.reports.enforce_retention(ctx.config.retention_limit) {
                tracing::warn!(error = %e, "Report retention failed");
            }
            Some(file)
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to save PDF report");
            None
        }
    }
}

fn response(
    request_id: Uuid,
    patient_id: Option<String>,
    verdict: ClinicalVerdict,
    report: ReportBundle,
) -> PredictResponse {
    PredictResponse {
        status: "success",
        request_id,
        patient_id,
        pdf_report_url: verdict.report_file.as_deref().map(download_url),
        pdf_generated: verdict.report_file.is_some(),
        primary_diagnosis: verdict.primary_diagnosis,
        confidence: verdict.model_probability,
        confidence_level: verdict.confidence_level,
        severity: verdict.severity,
        severity_score: verdict.severity_score,
        urgency: verdict.urgency,
        reasoning: verdict.reasoning,
        treatment_plan: verdict.treatment_plan,
        ml_validation: verdict.ml_validation,
        override_reason: verdict.override_reason,
        source: verdict.provenance,
        report,
    }
}
