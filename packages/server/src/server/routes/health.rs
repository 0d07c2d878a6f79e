use axum::{extract::Extension, http::StatusCode, Json};
use portfolio_sync::{ContentSource, RecordStore, Summarizer};
use serde::Serialize;

use crate::server::app::AppState;

#[derive(Serialize)]
pub struct HealthResponse {
    status: String,
    source: String,
    summarizer: String,
    sheet_configured: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    records: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Health check endpoint
///
/// Returns 200 OK when the record store answers, 503 Service Unavailable otherwise.
pub async fn health_handler(
    Extension(state): Extension<AppState>,
) -> (StatusCode, Json<HealthResponse>) {
    let count = state.syncer.store().count().await;
    let (status, records, error) = match count {
        Ok(n) => (StatusCode::OK, Some(n), None),
        Err(e) => (StatusCode::SERVICE_UNAVAILABLE, None, Some(e.to_string())),
    };

    (
        status,
        Json(HealthResponse {
            status: if status == StatusCode::OK { "healthy" } else { "unhealthy" }.to_string(),
            source: state.syncer.source().name().to_string(),
            summarizer: state.syncer.summarizer().name().to_string(),
            sheet_configured: state.sheet.is_some(),
            records,
            error,
        }),
    )
}
