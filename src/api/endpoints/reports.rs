//! PDF report listing, download and deletion.

use axum::extract::{Path, State};
use axum::http::header;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

use super::blocking;
use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::storage::report_store::download_url;
use crate::storage::{StoredFile, LIST_LIMIT};

#[derive(Debug, Serialize)]
pub struct ReportEntry {
    #[serde(flatten)]
    pub file: StoredFile,
    pub download_url: String,
}

#[derive(Debug, Serialize)]
pub struct ReportList {
    pub status: &'static str,
    pub count: usize,
    pub reports: Vec<ReportEntry>,
}

#[derive(Debug, Serialize)]
pub struct Deleted {
    pub status: &'static str,
    pub message: String,
}

impl Deleted {
    pub fn new(filename: &str) -> Self {
        Self {
            status: "success",
            message: format!("{filename} deleted"),
        }
    }
}

/// `GET /api/reports`, newest first.
pub async fn list(State(ctx): State<ApiContext>) -> Result<Json<ReportList>, ApiError> {
    let files = blocking(move || Ok(ctx.reports.list(LIST_LIMIT)?)).await?;
    let reports: Vec<ReportEntry> = files
        .into_iter()
        .map(|file| ReportEntry {
            download_url: download_url(&file.filename),
            file,
        })
        .collect();
    Ok(Json(ReportList {
        status: "success",
        count: reports.len(),
        reports,
    }))
}

/// `GET /download/:filename`
pub async fn download(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Response, ApiError> {
    let name = filename.clone();
    let bytes = blocking(move || Ok(ctx.reports.read(&name)?)).await?;
    let disposition = format!("attachment; filename=\"{filename}\"");
    Ok((
        [
            (header::CONTENT_TYPE, "application/pdf".to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}

/// `DELETE /api/reports/:filename`
pub async fn delete(
    State(ctx): State<ApiContext>,
    Path(filename): Path<String>,
) -> Result<Json<Deleted>, ApiError> {
    let name = filename.clone();
    blocking(move || Ok(ctx.reports.delete(&name)?)).await?;
    Ok(Json(Deleted::new(&filename)))
}
