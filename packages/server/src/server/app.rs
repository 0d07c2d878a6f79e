//! Application setup and server configuration.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::Extension,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::get,
    Router,
};
use portfolio_sync::{ContentSource, RecordStore, SheetRef, SheetSource, Summarizer, Syncer};
use tokio_util::sync::CancellationToken;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::server::routes::{
    companies_handler, drive_get_handler, drive_post_handler, health_handler, sheets_get_handler,
    sheets_post_handler,
};

/// Syncer over type-erased collaborators, so tests can swap in mocks.
pub type AppSyncer = Syncer<Arc<dyn ContentSource>, Arc<dyn RecordStore>, Arc<dyn Summarizer>>;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub syncer: Arc<AppSyncer>,
    pub sheets: Option<Arc<dyn SheetSource>>,
    pub sheet: Option<SheetRef>,

    /// Budget for one sync request
    pub sync_deadline: Duration,

    /// Cancelled on shutdown; every request works on a child token
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(syncer: AppSyncer) -> Self {
        Self {
            syncer: Arc::new(syncer),
            sheets: None,
            sheet: None,
            sync_deadline: Duration::from_secs(55),
            shutdown: CancellationToken::new(),
        }
    }

    /// Enable the holdings sheet endpoint.
    pub fn with_sheets(mut self, sheets: Arc<dyn SheetSource>, sheet: SheetRef) -> Self {
        self.sheets = Some(sheets);
        self.sheet = Some(sheet);
        self
    }

    pub fn with_sync_deadline(mut self, deadline: Duration) -> Self {
        self.sync_deadline = deadline;
        self
    }

    pub fn with_shutdown(mut self, shutdown: CancellationToken) -> Self {
        self.shutdown = shutdown;
        self
    }
}

/// Build the Axum application router
pub fn build_app(state: AppState) -> Router {
    // CORS configuration - any origin, the endpoints carry no user session
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE]);

    Router::new()
        .route("/health", get(health_handler))
        .route("/api/drive", get(drive_get_handler).post(drive_post_handler))
        .route(
            "/api/sheets/sync",
            get(sheets_get_handler).post(sheets_post_handler),
        )
        .route("/api/companies", get(companies_handler))
        // Middleware layers (applied in reverse order - last added runs first)
        .layer(Extension(state))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
