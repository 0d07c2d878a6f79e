// Main entry point for the portfolio sync API server

use std::sync::Arc;

use anyhow::{Context, Result};
use portfolio_sync::ai::OpenAiSummarizer;
use portfolio_sync::pipeline::analysis_schema;
use portfolio_sync::sources::GoogleDriveSource;
use portfolio_sync::{
    ContentSource, MemoryStore, RecordStore, SheetRef, SheetSource, SourceExt, Summarizer, Syncer,
};
use server_core::{
    server::{build_app, AppState},
    Config,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,server_core=debug,portfolio_sync=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting portfolio sync API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // One rate limiter shared by folder and sheet reads
    let drive = Arc::new(
        GoogleDriveSource::new(config.google_access_token.clone())
            .context("Failed to build Drive client")?
            .rate_limited(config.source_requests_per_second),
    );
    let source: Arc<dyn ContentSource> = drive.clone();
    let sheets: Arc<dyn SheetSource> = drive;

    let summarizer: Arc<dyn Summarizer> = Arc::new(
        OpenAiSummarizer::from_credentials(config.summarizer_credentials())
            .with_response_schema(analysis_schema()),
    );
    let store: Arc<dyn RecordStore> = Arc::new(MemoryStore::new());

    let shutdown = CancellationToken::new();
    let syncer = Syncer::new(source, store, summarizer, config.drive_folder_id.clone());
    let mut state = AppState::new(syncer)
        .with_sync_deadline(config.sync_deadline)
        .with_shutdown(shutdown.clone());

    if let Some(spreadsheet_id) = &config.spreadsheet_id {
        let mut sheet = SheetRef::new(spreadsheet_id);
        if let Some(gid) = config.sheet_gid {
            sheet = sheet.with_gid(gid);
        }
        state = state.with_sheets(sheets, sheet);
        tracing::info!("Holdings sheet sync enabled");
    }

    let app = build_app(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Shutdown requested, cancelling in-flight syncs");
            shutdown.cancel();
        })
        .await
        .context("Server error")?;

    Ok(())
}
