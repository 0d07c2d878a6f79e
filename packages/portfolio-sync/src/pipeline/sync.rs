//! The Syncer - main entry point for the sync library.
//!
//! Ties the pipeline together for both paths:
//!
//! - data room: traverse -> read -> assemble -> summarize -> reconcile
//! - holdings sheet: resolve columns -> extract rows -> reconcile
//!
//! Every batch entry point returns whatever it managed to do. Failures of a
//! single folder, file or row end up in [`ScanResult::errors`].

use chrono::Utc;
use serde::Serialize;
use std::future::Future;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::{Result, SourceError, SourceResult, SyncError};
use crate::pipeline::{
    analysis::{decode_analysis, fallback_summary, AbsentReason, CompanyAnalysis, Decoded},
    context::assemble,
    prompts::{analyze_prompt_hash, format_analyze_prompt},
    reader::read_all,
    reconcile::{reconcile, ReconcileOutcome, RecordKey},
    rows::extract_rows,
    schema::{resolve_columns, ColumnMap, ScaleHints},
    traverse::{list_company_folders, traverse, CompanyFolder, FolderPage},
};
use crate::traits::{
    source::{ContentSource, SheetSource},
    store::RecordStore,
    summarizer::Summarizer,
};
use crate::types::{
    config::{Page, SheetRef, SyncConfig},
    record::{CompanyName, RecordPatch},
    scan::{ErrorStage, ItemError, ScanResult},
};

/// Point in time after which no new work is started.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Deadline(Option<Instant>);

impl Deadline {
    /// No deadline.
    pub fn none() -> Self {
        Self(None)
    }

    pub fn at(instant: Instant) -> Self {
        Self(Some(instant))
    }

    /// Deadline `duration` from now.
    pub fn after(duration: std::time::Duration) -> Self {
        Self(Some(Instant::now() + duration))
    }

    pub fn is_expired(&self) -> bool {
        self.0.is_some_and(|at| Instant::now() >= at)
    }

    /// Resolves when the deadline passes; never resolves without one.
    pub async fn expired(&self) {
        match self.0 {
            Some(at) => tokio::time::sleep_until(at).await,
            None => std::future::pending().await,
        }
    }
}

/// How a batch step ended.
enum Step<T> {
    Done(T),
    DeadlineHit,
    Cancelled,
}

async fn run_step<T>(
    work: impl Future<Output = T>,
    deadline: Deadline,
    cancel: &CancellationToken,
) -> Step<T> {
    if cancel.is_cancelled() {
        return Step::Cancelled;
    }
    if deadline.is_expired() {
        return Step::DeadlineHit;
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Step::Cancelled,
        _ = deadline.expired() => Step::DeadlineHit,
        out = work => Step::Done(out),
    }
}

/// One file as seen by the analysis.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileSummary {
    pub name: String,
    pub kind: String,
    pub provenance: String,
    pub has_content: bool,
}

/// Analysis of one company folder, before anything is stored.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderAnalysis {
    pub folder_id: String,
    pub company_name: String,

    /// Structured data from the summarizer, when it produced any
    pub analysis: Option<CompanyAnalysis>,

    /// Why `analysis` is missing although the summarizer ran
    pub absent_reason: Option<AbsentReason>,

    /// Reported when no file had readable text; never stored
    pub fallback_summary: Option<String>,

    pub files_found: usize,
    pub files_read: usize,
    pub has_readable_content: bool,
    pub file_types: Vec<FileSummary>,
    pub errors: Vec<ItemError>,
}

impl FolderAnalysis {
    fn empty(folder_id: &str, company_name: &str) -> Self {
        Self {
            folder_id: folder_id.to_string(),
            company_name: company_name.to_string(),
            analysis: None,
            absent_reason: None,
            fallback_summary: None,
            files_found: 0,
            files_read: 0,
            has_readable_content: false,
            file_types: Vec::new(),
            errors: Vec::new(),
        }
    }
}

/// Outcome of syncing one company folder.
#[derive(Debug, Clone)]
pub struct FolderSync {
    pub analysis: FolderAnalysis,
    pub outcome: ReconcileOutcome,
}

/// Outcome of syncing a page of company folders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderSyncReport {
    pub page: FolderPage,

    #[serde(flatten)]
    pub scan: ScanResult,
}

/// Outcome of syncing the holdings sheet.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetSyncReport {
    pub sheet_name: String,

    /// Data rows, header excluded
    pub total_rows: usize,

    pub companies_found: usize,
    pub headers: Vec<String>,

    #[serde(rename = "colMap")]
    pub column_map: ColumnMap,

    #[serde(flatten)]
    pub scan: ScanResult,
}

/// The main entry point for syncing a portfolio.
///
/// # Example
///
/// ```rust,ignore
/// let syncer = Syncer::new(source, MemoryStore::new(), summarizer, "root-folder-id");
///
/// // First page of company folders
/// let report = syncer
///     .sync_folders(Page::default(), Deadline::after(Duration::from_secs(55)), &CancellationToken::new())
///     .await?;
///
/// // Holdings sheet
/// let sheet = syncer.sync_sheet(&sheets, &SheetRef::new("spreadsheet-id"), Deadline::none(), &token).await?;
/// ```
pub struct Syncer<C: ContentSource, S: RecordStore, A: Summarizer> {
    source: C,
    store: S,
    summarizer: A,
    root_id: String,
    config: SyncConfig,
}

impl<C: ContentSource, S: RecordStore, A: Summarizer> Syncer<C, S, A> {
    /// Create a syncer for the portfolio folder `root_id`.
    pub fn new(source: C, store: S, summarizer: A, root_id: impl Into<String>) -> Self {
        Self {
            source,
            store,
            summarizer,
            root_id: root_id.into(),
            config: SyncConfig::default(),
        }
    }

    /// Set the configuration.
    pub fn with_config(mut self, config: SyncConfig) -> Self {
        self.config = config;
        self
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Get a reference to the record store.
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get a reference to the content source.
    pub fn source(&self) -> &C {
        &self.source
    }

    /// Get a reference to the summarizer.
    pub fn summarizer(&self) -> &A {
        &self.summarizer
    }

    pub fn root_id(&self) -> &str {
        &self.root_id
    }

    /// Bound a remote call by the configured timeout.
    async fn bounded<T>(&self, id: &str, call: impl Future<Output = SourceResult<T>>) -> SourceResult<T> {
        tokio::time::timeout(self.config.call_timeout, call)
            .await
            .map_err(|_| SourceError::Timeout { id: id.to_string() })?
    }

    /// List one page of company folders under the root.
    pub async fn list_company_folders(&self, page: Page) -> Result<FolderPage> {
        if self.root_id.trim().is_empty() {
            return Err(SyncError::Config("portfolio root folder id is not set".into()));
        }
        let folders = self
            .bounded(&self.root_id, list_company_folders(&self.source, &self.root_id, page))
            .await?;
        Ok(folders)
    }

    /// Read a company folder and ask the summarizer about it.
    ///
    /// Nothing is written to the store. Fails only when the folder itself
    /// cannot be listed; unreadable files and summarizer failures are
    /// reported in the result.
    pub async fn analyze_folder(&self, folder_id: &str, company_name: &str) -> Result<FolderAnalysis> {
        // One listing round per level, plus the sibling round
        let rounds = self.config.traversal.max_depth as u32 + 1;
        let traversal = tokio::time::timeout(
            self.config.call_timeout * rounds,
            traverse(&self.source, folder_id, &self.config.traversal),
        )
        .await
        .map_err(|_| SourceError::Timeout { id: folder_id.to_string() })??;

        let mut result = FolderAnalysis::empty(folder_id, company_name);
        result.files_found = traversal.total_found;
        result.errors = traversal.errors;

        if traversal.items.is_empty() {
            debug!(company = company_name, "No files to read");
            return Ok(result);
        }

        let batch = read_all(
            &self.source,
            traversal.items,
            &self.config.reader,
            self.config.call_timeout,
        )
        .await;

        result.files_read = batch.read_count();
        result.has_readable_content = batch.has_readable_content(self.config.min_readable_chars);
        result.errors.extend(batch.errors.iter().cloned());
        result.file_types = batch
            .items
            .iter()
            .map(|item| FileSummary {
                name: item.name.clone(),
                kind: item.kind.label(),
                provenance: item.provenance.to_string(),
                has_content: item.text.is_some(),
            })
            .collect();

        if !result.has_readable_content {
            let names: Vec<&str> = batch.items.iter().map(|i| i.name.as_str()).collect();
            result.fallback_summary = Some(fallback_summary(result.files_found, &names));
            debug!(company = company_name, "No readable text, using fallback summary");
            return Ok(result);
        }

        let prompt = format_analyze_prompt(&assemble(company_name, &batch.items));
        let answer = tokio::time::timeout(
            self.config.call_timeout,
            self.summarizer.complete(&prompt, self.config.max_tokens),
        )
        .await;

        match answer {
            Ok(Ok(raw)) => match decode_analysis(&raw) {
                Decoded::Parsed(analysis) => result.analysis = Some(analysis),
                Decoded::Absent(reason) => {
                    debug!(company = company_name, %reason, "Summarizer returned no structured data");
                    result.absent_reason = Some(reason);
                }
            },
            Ok(Err(e)) => {
                warn!(company = company_name, error = %e, "Summarizer failed");
                result
                    .errors
                    .push(ItemError::new(company_name, ErrorStage::Summarize, e).with_item_id(folder_id));
            }
            Err(_) => {
                warn!(company = company_name, "Summarizer timed out");
                result.errors.push(
                    ItemError::new(company_name, ErrorStage::Summarize, "summarizer timed out")
                        .with_item_id(folder_id),
                );
            }
        }

        Ok(result)
    }

    /// Analyze one company folder and reconcile it into the store.
    pub async fn sync_folder(&self, folder: &CompanyFolder) -> Result<FolderSync> {
        let analysis = self.analyze_folder(&folder.id, &folder.name).await?;

        let name = CompanyName {
            name: folder.name.clone(),
            display_name: folder.display_name.clone(),
        };
        let mut patch = RecordPatch::new()
            .with_name(&name)
            .with_source_id(&folder.id)
            .with_source_item_count(analysis.files_found);
        if let Some(parsed) = &analysis.analysis {
            patch = patch.merge(parsed.to_patch(&analyze_prompt_hash()));
        }

        let key = RecordKey::new(&folder.id, &folder.name);
        let outcome = reconcile(&self.store, &key, patch, Utc::now()).await?;
        info!(
            company = %folder.name,
            created = outcome.created,
            files = analysis.files_found,
            "Synced company folder"
        );

        Ok(FolderSync { analysis, outcome })
    }

    /// Sync one company folder given its id and raw folder name.
    pub async fn sync_folder_by_id(&self, folder_id: &str, folder_name: &str) -> Result<FolderSync> {
        let cleaned = CompanyName::parse(folder_name);
        let folder = CompanyFolder {
            id: folder_id.to_string(),
            raw_name: folder_name.to_string(),
            name: cleaned.name,
            display_name: cleaned.display_name,
        };
        self.sync_folder(&folder).await
    }

    /// Sync one page of company folders.
    ///
    /// Stops starting new folders once `deadline` passes or `cancel` fires;
    /// every folder left unprocessed gets an error entry.
    pub async fn sync_folders(
        &self,
        page: Page,
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<FolderSyncReport> {
        let page = self.list_company_folders(page).await?;
        let mut scan = ScanResult::new();
        info!(folders = page.folders.len(), total = page.total, "Syncing company folders");

        for (idx, folder) in page.folders.iter().enumerate() {
            match run_step(self.sync_folder(folder), deadline, cancel).await {
                Step::Done(Ok(sync)) => {
                    scan.errors.extend(sync.analysis.errors);
                    scan.push_record(sync.outcome.record, sync.outcome.created);
                }
                Step::Done(Err(e)) => {
                    warn!(company = %folder.name, error = %e, "Folder sync failed, continuing");
                    let stage = match &e {
                        SyncError::Source(_) => ErrorStage::List,
                        _ => ErrorStage::Reconcile,
                    };
                    scan.push_error(ItemError::new(&folder.name, stage, e).with_item_id(&folder.id));
                }
                stopped => {
                    let (stage, reason) = mark_stopped(&mut scan, &stopped);
                    for skipped in &page.folders[idx..] {
                        scan.push_error(
                            ItemError::new(&skipped.name, stage, reason).with_item_id(&skipped.id),
                        );
                    }
                    break;
                }
            }
        }

        info!(
            created = scan.created,
            updated = scan.updated,
            errors = scan.errors.len(),
            partial = scan.is_partial(),
            "Folder sync finished"
        );
        Ok(FolderSyncReport { page, scan })
    }

    /// Read the holdings sheet and reconcile one record per company row.
    ///
    /// A sheet with fewer than two rows yields an empty report.
    pub async fn sync_sheet<T>(
        &self,
        sheets: &T,
        sheet: &SheetRef,
        deadline: Deadline,
        cancel: &CancellationToken,
    ) -> Result<SheetSyncReport>
    where
        T: SheetSource + ?Sized,
    {
        if sheet.spreadsheet_id.trim().is_empty() {
            return Err(SyncError::Config("spreadsheet id is not set".into()));
        }
        let values = self
            .bounded(&sheet.spreadsheet_id, sheets.read_sheet(sheet))
            .await?;

        let headers = values.headers();
        let column_map = resolve_columns(&headers);
        let mut report = SheetSyncReport {
            sheet_name: values.title.clone(),
            total_rows: values.data_rows().len(),
            companies_found: 0,
            headers,
            column_map,
            scan: ScanResult::new(),
        };

        if values.rows.len() < 2 {
            info!(sheet = %report.sheet_name, "No data rows in sheet");
            return Ok(report);
        }

        for field in report.column_map.unresolved() {
            debug!(?field, "Sheet column unresolved");
        }

        let hints = ScaleHints::from_headers(&report.headers);
        let patches = extract_rows(values.data_rows(), &report.column_map, &hints);
        report.companies_found = patches.len();

        for (idx, patch) in patches.iter().enumerate() {
            let name = patch.name.clone().unwrap_or_default();
            let key = RecordKey::by_name(&name);
            match run_step(reconcile(&self.store, &key, patch.clone(), Utc::now()), deadline, cancel).await {
                Step::Done(Ok(outcome)) => report.scan.push_record(outcome.record, outcome.created),
                Step::Done(Err(e)) => {
                    warn!(company = %name, error = %e, "Row reconcile failed, continuing");
                    report
                        .scan
                        .push_error(ItemError::new(&name, ErrorStage::Reconcile, e));
                }
                stopped => {
                    let (stage, reason) = mark_stopped(&mut report.scan, &stopped);
                    for skipped in &patches[idx..] {
                        let skipped_name = skipped.name.clone().unwrap_or_default();
                        report.scan.push_error(ItemError::new(skipped_name, stage, reason));
                    }
                    break;
                }
            }
        }

        info!(
            sheet = %report.sheet_name,
            rows = report.total_rows,
            companies = report.companies_found,
            created = report.scan.created,
            updated = report.scan.updated,
            "Sheet sync finished"
        );
        Ok(report)
    }
}

/// Flag the scan as stopped and describe why.
fn mark_stopped<T>(scan: &mut ScanResult, step: &Step<T>) -> (ErrorStage, &'static str) {
    match step {
        Step::Cancelled => {
            scan.cancelled = true;
            (ErrorStage::Cancelled, "cancelled before processing")
        }
        _ => {
            scan.deadline_hit = true;
            (ErrorStage::Deadline, "deadline exceeded before processing")
        }
    }
}
