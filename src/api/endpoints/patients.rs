//! Saved patient assessments.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use super::blocking;
use super::reports::Deleted;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::storage::{PatientFile, PatientListing, LIST_LIMIT};

#[derive(Debug, Serialize)]
pub struct PatientEntry {
    #[serde(flatten)]
    pub listing: PatientListing,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct PatientList {
    pub status: &'static str,
    pub count: usize,
    pub patients: Vec<PatientEntry>,
}

/// `GET /api/patients`, newest first, with each file's diagnosis.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<PatientList>, ApiError> {
    let listings = blocking(move || Ok(ctx.patients.list(LIST_LIMIT)?)).await?;
    let patients: Vec<PatientEntry> = listings
        .into_iter()
        .map(|listing| PatientEntry {
            download_url: format!("/api/patients/{}", listing.file.filename),
            listing,
        })
        .collect();
    Ok(Json(PatientList {
        status: "success",
        count: patients.len(),
        patients,
    }))
}

/// `GET /api/patients/:filename`
pub async fn get(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Json<PatientFile>, ApiError> {
    let file = blocking(move || Ok(ctx.patients.load(&filename)?)).await?;
    Ok(Json(file))
}

/// `DELETE /api/patients/:filename`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let name = filename.clone();
    blocking(move || Ok(ctx.patients.delete(&name)?)).await?;
    Ok(Json(Deleted::new(&filename)))
}
