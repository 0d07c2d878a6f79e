//! Holdings sheet sync endpoint.

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    Json,
};
use portfolio_sync::Deadline;
use serde::Deserialize;
use tracing::info;

use super::ApiResponse;
use crate::server::{app::AppState, error::ApiError};

/// Optional overrides of the configured sheet.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetParams {
    pub spreadsheet_id: Option<String>,
    pub gid: Option<i64>,
    pub range: Option<String>,
}

/// `GET /api/sheets/sync`
pub async fn sheets_get_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<SheetParams>,
) -> Result<Response, ApiError> {
    run_sheet_sync(&state, params).await
}

/// `POST /api/sheets/sync`
pub async fn sheets_post_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<SheetParams>,
    body: Option<Json<SheetParams>>,
) -> Result<Response, ApiError> {
    let params = match body {
        Some(Json(body)) => SheetParams {
            spreadsheet_id: body.spreadsheet_id.or(query.spreadsheet_id),
            gid: body.gid.or(query.gid),
            range: body.range.or(query.range),
        },
        None => query,
    };
    run_sheet_sync(&state, params).await
}

async fn run_sheet_sync(state: &AppState, params: SheetParams) -> Result<Response, ApiError> {
    let (Some(sheets), Some(configured)) = (&state.sheets, &state.sheet) else {
        return Err(ApiError::NotConfigured("SPREADSHEET_ID is not configured".into()));
    };

    let mut sheet = configured.clone();
    if let Some(id) = params.spreadsheet_id.filter(|id| !id.trim().is_empty()) {
        sheet.spreadsheet_id = id;
    }
    if let Some(gid) = params.gid {
        sheet.gid = Some(gid);
    }
    if let Some(range) = params.range {
        sheet.range = range;
    }

    info!(spreadsheet_id = %sheet.spreadsheet_id, gid = ?sheet.gid, "Syncing holdings sheet");
    let token = state.shutdown.child_token();
    let report = state
        .syncer
        .sync_sheet(
            sheets.as_ref(),
            &sheet,
            Deadline::after(state.sync_deadline),
            &token,
        )
        .await?;
    Ok(ApiResponse::new(report).into_response())
}
