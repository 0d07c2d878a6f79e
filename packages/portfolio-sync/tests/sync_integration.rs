//! Integration tests for the portfolio sync flow.
//!
//! These tests drive the public API end to end:
//! 1. List company folders under the portfolio root
//! 2. Traverse, read and summarize each folder
//! 3. Reconcile into the record store
//! 4. Merge holdings sheet rows into the same records

use chrono::{TimeZone, Utc};
use portfolio_sync::{
    testing::{MockSheet, MockSource, MockSummarizer},
    CompanyName, Deadline, ErrorStage, MediaKind, MemoryStore, OrderBy, Page, RecordStore,
    SheetRef, SourceEntry, SyncConfig, Syncer, TraversalConfig,
};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const ANALYSIS: &str = r#"{
  "description": "Acme builds payment rails for small businesses.",
  "latestUpdates": ["Closed Series A", "Launched in Germany"],
  "sector": "FinTech",
  "stage": "Series A",
  "highlights": ["120% NRR"],
  "founders": ["Jane Doe"],
  "location": "Berlin",
  "keyMetrics": {"revenue": "$1M ARR"}
}"#;

/// Helper to build a portfolio with two readable companies and one empty one.
fn portfolio() -> MockSource {
    MockSource::new()
        .with_folder("root", "acme", "1. Acme Corp (FKA Paystack Lite)")
        .with_folder("acme", "acme-updates", "Investor Updates")
        .with_text_file("acme-updates", "q2", "Q2 2025 letter.txt", "Revenue doubled quarter over quarter.")
        .with_text_file("acme", "deck", "Deck.txt", "Acme builds payment rails for small businesses.")
        .with_folder("root", "globex", "2. Globex")
        .with_text_file("globex", "memo", "Memo.txt", "Globex sells industrial robots to car makers.")
        .with_folder("root", "ghost", "3. Ghost Co")
}

/// Helper to set up a syncer over the given source.
fn syncer(source: MockSource, summarizer: MockSummarizer) -> Syncer<MockSource, MemoryStore, MockSummarizer> {
    Syncer::new(source, MemoryStore::new(), summarizer, "root")
}

#[tokio::test]
async fn test_second_run_only_moves_sync_timestamps() {
    let syncer = syncer(portfolio(), MockSummarizer::new(ANALYSIS));
    let token = CancellationToken::new();

    syncer
        .sync_folders(Page::default(), Deadline::none(), &token)
        .await
        .unwrap();
    let first = syncer.store().query(OrderBy::Name).await.unwrap();

    let report = syncer
        .sync_folders(Page::default(), Deadline::none(), &token)
        .await
        .unwrap();
    let second = syncer.store().query(OrderBy::Name).await.unwrap();

    assert_eq!(report.scan.created, 0);
    assert_eq!(report.scan.updated, 3);
    assert_eq!(first.len(), second.len());
    for (before, after) in first.iter().zip(&second) {
        let mut expected = before.clone();
        expected.synced_at = after.synced_at;
        assert_eq!(&expected, after);
        assert!(after.synced_at >= before.synced_at);
    }
}

#[tokio::test]
async fn test_folder_that_cannot_be_listed_does_not_stop_the_batch() {
    let source = portfolio().fail_list("globex");
    let syncer = syncer(source, MockSummarizer::new(ANALYSIS));

    let report = syncer
        .sync_folders(Page::default(), Deadline::none(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.scan.records.len(), 2);
    assert_eq!(report.scan.errors.len(), 1);
    let error = &report.scan.errors[0];
    assert_eq!(error.item, "Globex");
    assert_eq!(error.item_id.as_deref(), Some("globex"));
    assert_eq!(error.stage, ErrorStage::List);
    assert!(!report.scan.is_partial());
}

#[tokio::test]
async fn test_unreadable_file_is_reported_and_the_rest_is_summarized() {
    let source = portfolio().fail_fetch("deck");
    let summarizer = MockSummarizer::new(ANALYSIS);
    let syncer = syncer(source, summarizer.clone());

    let analysis = syncer
        .analyze_folder("acme", "Acme Corp (FKA Paystack Lite)")
        .await
        .unwrap();

    assert_eq!(analysis.files_found, 2);
    assert_eq!(analysis.files_read, 1);
    assert!(analysis.has_readable_content);
    assert_eq!(analysis.errors.len(), 1);
    assert_eq!(analysis.errors[0].stage, ErrorStage::Read);

    let prompt = &summarizer.prompts()[0];
    assert!(prompt.contains("[unreadable:"));
    assert!(prompt.contains("Revenue doubled"));
}

#[tokio::test]
async fn test_priority_documents_lead_the_prompt() {
    let summarizer = MockSummarizer::new(ANALYSIS);
    let syncer = syncer(portfolio(), summarizer.clone());

    syncer.analyze_folder("acme", "Acme Corp").await.unwrap();

    let prompt = &summarizer.prompts()[0];
    let letter = prompt.find("Revenue doubled").unwrap();
    let deck = prompt.find("--- Deck.txt").unwrap();
    assert!(letter < deck);
    assert!(prompt.contains("--- Q2 2025 letter.txt (Text, priority-subfolder) ---"));
}

#[tokio::test]
async fn test_large_folder_is_capped() {
    let mut source = MockSource::new()
        .with_folder("root", "big", "Big Co")
        .with_folder("big", "updates", "Quarterly Updates");
    for i in 0..10 {
        let modified = Utc.with_ymd_and_hms(2025, 1, 1 + i, 0, 0, 0).unwrap();
        source = source.with_file(
            "updates",
            SourceEntry::new(format!("upd-{}", i), format!("Update {}.txt", i), MediaKind::Text("text/plain".into()))
                .with_modified_at(modified),
            format!("Update number {} with enough text to count.", i),
        );
    }
    for i in 0..40 {
        source = source.with_text_file("big", &format!("doc-{}", i), &format!("Doc {}.txt", i), "Some background text here.");
    }

    let syncer = syncer(source, MockSummarizer::new(ANALYSIS));
    let analysis = syncer.analyze_folder("big", "Big Co").await.unwrap();

    assert_eq!(analysis.files_found, 50);
    assert_eq!(analysis.file_types.len(), 10);
    assert_eq!(analysis.file_types[0].name, "Update 9.txt");
    assert_eq!(analysis.file_types[0].provenance, "priority-subfolder");
    assert_eq!(
        analysis.file_types.iter().filter(|f| f.provenance == "root").count(),
        5
    );
}

#[tokio::test]
async fn test_tighter_budget_from_config() {
    let config = SyncConfig::default()
        .with_traversal(TraversalConfig::default().with_total_limit(1));
    let syncer = syncer(portfolio(), MockSummarizer::new(ANALYSIS)).with_config(config);

    let analysis = syncer.analyze_folder("acme", "Acme").await.unwrap();
    assert_eq!(analysis.files_found, 2);
    assert_eq!(analysis.file_types.len(), 1);
    assert_eq!(analysis.file_types[0].name, "Q2 2025 letter.txt");
}

#[tokio::test]
async fn test_sheet_rows_and_folders_merge_into_one_record() {
    let sheet = MockSheet::new(
        "Holdings",
        &[
            &["Portfolio", "Investors", "Total Invested ($M)", "Ownership", "Net ROI", "Valuation 30.6.2025"],
            &["Acme Corp (FKA Paystack Lite)", " Seedcamp ", "1.5", "12%", "2.5x", "40,000,000"],
            &["Globex", "", "0.75", "0.08", "", ""],
        ],
    );
    let syncer = syncer(portfolio(), MockSummarizer::new(ANALYSIS));
    let token = CancellationToken::new();

    let sheet_report = syncer
        .sync_sheet(&sheet, &SheetRef::new("holdings"), Deadline::none(), &token)
        .await
        .unwrap();
    assert_eq!(sheet_report.scan.created, 2);

    let folder_report = syncer
        .sync_folders(Page::default(), Deadline::none(), &token)
        .await
        .unwrap();
    // Acme and Globex matched by name, Ghost Co is new
    assert_eq!(folder_report.scan.updated, 2);
    assert_eq!(folder_report.scan.created, 1);

    let records = syncer.store().query(OrderBy::Name).await.unwrap();
    assert_eq!(records.len(), 3);

    let acme = &records[0];
    assert_eq!(acme.source_id.as_deref(), Some("acme"));
    assert_eq!(acme.display_name, "Acme Corp");
    assert_eq!(acme.investors.as_deref(), Some("Seedcamp"));
    assert_eq!(acme.financials.investment_amount, Some(1_500_000.0));
    assert_eq!(acme.financials.ownership_percent, Some(12.0));
    assert_eq!(acme.financials.moic, Some(2.5));
    assert_eq!(acme.financials.dated_valuations["valuation_30_6_2025"], 40_000_000.0);
    assert_eq!(acme.sector.as_deref(), Some("FinTech"));
    assert_eq!(acme.source_item_count, Some(2));

    let globex = &records[2];
    assert_eq!(globex.name, "Globex");
    assert_eq!(globex.financials.ownership_percent, Some(8.0));
    assert_eq!(globex.financials.moic, None);
}

#[tokio::test]
async fn test_fallback_summary_keeps_stored_description() {
    let source = MockSource::new()
        .with_folder("root", "scans", "Scans Ltd")
        .with_entry("scans", SourceEntry::new("p1", "Deck.pdf", MediaKind::from_mime("application/pdf")))
        .with_entry("scans", SourceEntry::new("p2", "Photo.png", MediaKind::from_mime("image/png")));
    let summarizer = MockSummarizer::new(ANALYSIS);
    let syncer = syncer(source, summarizer.clone());

    syncer
        .store()
        .upsert(
            None,
            &portfolio_sync::RecordPatch::new()
                .with_name(&CompanyName::parse("Scans Ltd"))
                .with_source_id("scans")
                .with_description("Edited by the team"),
        )
        .await
        .unwrap();

    let sync = syncer.sync_folder_by_id("scans", "Scans Ltd").await.unwrap();

    assert_eq!(summarizer.call_count(), 0);
    assert_eq!(
        sync.analysis.fallback_summary.as_deref(),
        Some("Portfolio company with 2 files in data room. Documents include: Deck.pdf, Photo.png.")
    );
    assert_eq!(sync.analysis.file_types[1].kind, "Image");
    assert_eq!(sync.outcome.record.description.as_deref(), Some("Edited by the team"));
}

#[tokio::test(start_paused = true)]
async fn test_cancel_mid_batch_returns_what_was_done() {
    let source = portfolio().with_delay(Duration::from_secs(1));
    let syncer = syncer(source, MockSummarizer::new(ANALYSIS));
    let token = CancellationToken::new();

    // Every call takes 1s: the root listing ends at 1s, Acme at 4s, Globex would end at 6s
    let canceller = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(5500)).await;
        canceller.cancel();
    });

    let report = syncer
        .sync_folders(Page::default(), Deadline::none(), &token)
        .await
        .unwrap();

    assert!(report.scan.cancelled);
    assert!(!report.scan.deadline_hit);
    assert_eq!(report.scan.records.len(), 1);
    assert_eq!(report.scan.records[0].source_id.as_deref(), Some("acme"));
    let stages: Vec<_> = report.scan.errors.iter().map(|e| e.stage).collect();
    assert_eq!(stages, vec![ErrorStage::Cancelled, ErrorStage::Cancelled]);
}

#[tokio::test]
async fn test_folder_pages() {
    let syncer = syncer(portfolio(), MockSummarizer::new(ANALYSIS));

    let first = syncer.list_company_folders(Page::new(0, 2)).await.unwrap();
    assert_eq!(first.total, 3);
    assert!(first.has_more);
    assert_eq!(first.next_offset, Some(2));
    assert_eq!(first.folders[0].raw_name, "1. Acme Corp (FKA Paystack Lite)");
    assert_eq!(first.folders[0].display_name, "Acme Corp");

    let report = syncer
        .sync_folders(Page::new(2, 2), Deadline::none(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(report.page.folders.len(), 1);
    assert!(!report.page.has_more);
    assert_eq!(report.scan.records[0].name, "Ghost Co");
}
