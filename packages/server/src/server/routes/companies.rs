use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
};
use portfolio_sync::{OrderBy, RecordStore};
use serde::Deserialize;

use super::ApiResponse;
use crate::server::{app::AppState, error::ApiError};

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompaniesParams {
    pub order_by: Option<OrderBy>,
}

/// List stored company records, ordered by name unless asked otherwise.
pub async fn companies_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<CompaniesParams>,
) -> Result<Response, ApiError> {
    let records = state
        .syncer
        .store()
        .query(params.order_by.unwrap_or_default())
        .await?;
    Ok(ApiResponse::new(records).into_response())
}
