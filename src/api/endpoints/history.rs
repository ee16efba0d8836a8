use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::api::error::ApiError;
use crate::api::types::ApiContext;
use crate::models::HistoryEntry;

#[derive(Debug, Deserialize)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct HistoryResponse {
    pub status: &'static str,
    pub count: usize,
    pub entries: Vec<HistoryEntry>,
}

/// `GET /api/history`: recent assessments held in memory, newest first.
pub async fn recent(
    State(ctx): State<ApiContext>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let entries = {
        let history = ctx.lock_history()?;
        history.recent(query.limit.unwrap_or(history.capacity()))
    };
    Ok(Json(HistoryResponse {
        status: "success",
        count: entries.len(),
        entries,
    }))
}
