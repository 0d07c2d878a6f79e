//! Sync pipeline - the core of the library.
//!
//! The pipeline orchestrates:
//! - Traversal of a company folder under per-group budgets
//! - Reading each selected item into bounded text
//! - Context assembly with priority documents first
//! - Summarizer output decoding
//! - Holdings sheet column discovery and row extraction
//! - Reconciliation into the record store (find by folder, then by name)

pub mod analysis;
pub mod context;
pub mod normalize;
pub mod prompts;
pub mod reader;
pub mod reconcile;
pub mod rows;
pub mod schema;
pub mod sync;
pub mod traverse;

pub use analysis::{
    analysis_schema, decode_analysis, fallback_summary, AbsentReason, CompanyAnalysis, Decoded,
};
pub use context::assemble;
pub use normalize::{apply_scale, is_millions_header, to_multiplier, to_number, to_ownership_percent, NumberMode};
pub use prompts::{analyze_prompt_hash, format_analyze_prompt, ANALYZE_PROMPT};
pub use reader::{read_all, read_content, ReadBatch, ReadContent};
pub use reconcile::{reconcile, MatchedBy, ReconcileOutcome, RecordKey};
pub use rows::extract_rows;
pub use schema::{resolve_columns, ColumnMap, DatedColumn, Field, ScaleHints};
pub use sync::{
    Deadline, FileSummary, FolderAnalysis, FolderSync, FolderSyncReport, SheetSyncReport, Syncer,
};
pub use traverse::{list_company_folders, traverse, CompanyFolder, FolderPage, Traversal};
