//! Company folder endpoints: list, analyze and sync.

use axum::{
    extract::{Extension, Query},
    response::{IntoResponse, Response},
    Json,
};
use portfolio_sync::{Deadline, Page};
use serde::Deserialize;
use tracing::info;

use super::ApiResponse;
use crate::server::{app::AppState, error::ApiError};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DriveAction {
    #[default]
    List,
    Analyze,
    Sync,
}

/// Parameters accepted as query string or JSON body.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveParams {
    pub action: Option<DriveAction>,
    pub folder_id: Option<String>,
    pub folder_name: Option<String>,
    pub offset: Option<usize>,
    pub limit: Option<usize>,
}

impl DriveParams {
    /// Fill fields missing here from `fallback`.
    pub fn or(self, fallback: DriveParams) -> Self {
        Self {
            action: self.action.or(fallback.action),
            folder_id: self.folder_id.or(fallback.folder_id),
            folder_name: self.folder_name.or(fallback.folder_name),
            offset: self.offset.or(fallback.offset),
            limit: self.limit.or(fallback.limit),
        }
    }

    fn page(&self) -> Page {
        let default = Page::default();
        Page::new(
            self.offset.unwrap_or(default.offset),
            self.limit.unwrap_or(default.limit).max(1),
        )
    }

    fn folder_id(&self) -> Result<&str, ApiError> {
        self.folder_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| ApiError::BadRequest("folderId is required".into()))
    }
}

/// `GET /api/drive?action=list|analyze|sync`
pub async fn drive_get_handler(
    Extension(state): Extension<AppState>,
    Query(params): Query<DriveParams>,
) -> Result<Response, ApiError> {
    run_drive(&state, params).await
}

/// `POST /api/drive` with the same parameters in a JSON body.
pub async fn drive_post_handler(
    Extension(state): Extension<AppState>,
    Query(query): Query<DriveParams>,
    body: Option<Json<DriveParams>>,
) -> Result<Response, ApiError> {
    let params = match body {
        Some(Json(body)) => body.or(query),
        None => query,
    };
    run_drive(&state, params).await
}

async fn run_drive(state: &AppState, params: DriveParams) -> Result<Response, ApiError> {
    let syncer = &state.syncer;

    match params.action.unwrap_or_default() {
        DriveAction::List => {
            let page = syncer.list_company_folders(params.page()).await?;
            Ok(ApiResponse::new(page).into_response())
        }
        DriveAction::Analyze => {
            let folder_id = params.folder_id()?;
            let name = params.folder_name.as_deref().unwrap_or(folder_id);
            info!(folder_id, name, "Analyzing company folder");
            let analysis = syncer.analyze_folder(folder_id, name).await?;
            Ok(ApiResponse::new(analysis).into_response())
        }
        DriveAction::Sync => match params.folder_id.as_deref() {
            Some(_) => {
                let folder_id = params.folder_id()?;
                let name = params
                    .folder_name
                    .as_deref()
                    .filter(|n| !n.trim().is_empty())
                    .ok_or_else(|| ApiError::BadRequest("folderName is required with folderId".into()))?;
                info!(folder_id, name, "Syncing company folder");
                let sync = syncer.sync_folder_by_id(folder_id, name).await?;
                Ok(ApiResponse::new(serde_json::json!({
                    "record": sync.outcome.record,
                    "created": sync.outcome.created,
                    "analysis": sync.analysis,
                }))
                .into_response())
            }
            None => {
                let page = params.page();
                info!(offset = page.offset, limit = page.limit, "Syncing company folders");
                let token = state.shutdown.child_token();
                let report = syncer
                    .sync_folders(page, Deadline::after(state.sync_deadline), &token)
                    .await?;
                Ok(ApiResponse::new(report).into_response())
            }
        },
    }
}
