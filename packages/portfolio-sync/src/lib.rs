//! Portfolio Ingestion Library
//!
//! Keeps one canonical record per portfolio company, built from two kinds of
//! input: a holdings spreadsheet with loosely labelled columns, and a
//! per-company folder of data-room documents summarized by an LLM.
//!
//! # Design Philosophy
//!
//! - Degrade, don't fail: an unreadable file, folder or row is an entry in
//!   the scan's error list, never the end of the batch
//! - Idempotent: re-running a sync converges on the same records
//! - Partial updates: fields a source did not produce are left untouched
//! - Library handles mechanics, app handles transport and storage
//!
//! # Usage
//!
//! ```rust,ignore
//! use portfolio_sync::{Deadline, MemoryStore, Page, SheetRef, Syncer};
//! use portfolio_sync::testing::{MockSheet, MockSource, MockSummarizer};
//! use tokio_util::sync::CancellationToken;
//!
//! let syncer = Syncer::new(MockSource::new(), MemoryStore::new(), MockSummarizer::default(), "root");
//! let token = CancellationToken::new();
//!
//! // One page of company folders
//! let report = syncer.sync_folders(Page::default(), Deadline::none(), &token).await?;
//!
//! // The holdings sheet
//! let sheet = syncer.sync_sheet(&MockSheet::default(), &SheetRef::new("id"), Deadline::none(), &token).await?;
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Core trait abstractions (ContentSource, SheetSource, RecordStore, Summarizer)
//! - [`types`] - Records, content items, configuration and scan results
//! - [`pipeline`] - Normalization, schema discovery, traversal, reading, reconciliation
//! - [`stores`] - Storage implementations (MemoryStore)
//! - [`sources`] - Source implementations (RateLimitedSource, GoogleDriveSource)
//! - [`security`] - Credential handling
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod pipeline;
pub mod security;
pub mod sources;
pub mod stores;
pub mod testing;
pub mod traits;
pub mod types;

#[cfg(feature = "openai")]
pub mod ai;

// Re-export core types at crate root
pub use error::{Result, SourceError, SourceResult, SyncError};
pub use pipeline::{
    CompanyAnalysis, CompanyFolder, ColumnMap, Deadline, FolderAnalysis, FolderPage,
    FolderSyncReport, SheetSyncReport, Syncer,
};
pub use security::SecretString;
pub use sources::{RateLimitedSource, SourceExt};
pub use stores::MemoryStore;
pub use traits::{
    source::{ContentSource, SheetSource, SheetValues},
    store::{OrderBy, RecordFilter, RecordStore},
    summarizer::Summarizer,
};
pub use types::{
    config::{Page, ReaderConfig, SheetRef, SyncConfig, TraversalConfig},
    item::{ContentItem, MediaKind, Provenance, SourceEntry},
    record::{CanonicalRecord, CompanyName, CompanyStatus, Financials, RecordPatch},
    scan::{ErrorStage, ItemError, ScanResult},
};
