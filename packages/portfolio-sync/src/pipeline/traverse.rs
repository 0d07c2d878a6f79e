//! Folder traversal and prioritization.
//!
//! Walks one company folder under depth and breadth budgets and decides
//! which files get read. The priority subfolder (performance or investor
//! updates) comes first, newest first; then files in the company folder
//! itself; then a few files from other subfolders.

use futures::future::{join_all, BoxFuture, FutureExt};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::error::SourceResult;
use crate::traits::source::ContentSource;
use crate::types::{
    config::{Page, TraversalConfig},
    item::{ContentItem, Provenance, SourceEntry},
    record::CompanyName,
    scan::{ErrorStage, ItemError},
};

/// Items selected from one company folder.
#[derive(Debug, Clone, Default)]
pub struct Traversal {
    /// Selected items: priority, then root, then other
    pub items: Vec<ContentItem>,

    /// Subfolders that could not be listed
    pub errors: Vec<ItemError>,

    /// Files seen while walking, before any limit
    pub total_found: usize,
}

/// Files listed under one folder.
#[derive(Debug, Default)]
struct Listing {
    leaves: Vec<SourceEntry>,
    found: usize,
    errors: Vec<ItemError>,
}

/// Walk a company folder and select the items to read.
///
/// Fails only when the company folder itself cannot be listed. A subfolder
/// that cannot be listed is recorded in [`Traversal::errors`] and skipped.
pub async fn traverse<C>(source: &C, root_id: &str, config: &TraversalConfig) -> SourceResult<Traversal>
where
    C: ContentSource + ?Sized,
{
    let entries = source.list_children(root_id).await?;
    let (mut folders, root_leaves): (Vec<_>, Vec<_>) =
        entries.into_iter().partition(|e| e.kind.is_folder());

    let mut traversal = Traversal {
        total_found: root_leaves.len(),
        ..Default::default()
    };

    if config.max_depth < 2 {
        folders.clear();
    }

    let priority_folder = folders
        .iter()
        .position(|f| config.is_priority_folder(&f.name))
        .map(|idx| folders.remove(idx));

    // Priority: everything in the folder, newest first, then capped
    let mut priority = Vec::new();
    if let Some(folder) = &priority_folder {
        debug!(folder = %folder.name, "Selected priority subfolder");
        match collect_leaves(source, folder, 2, config.max_depth, usize::MAX).await {
            Ok(listing) => {
                traversal.total_found += listing.found;
                traversal.errors.extend(listing.errors);
                priority = listing.leaves;
            }
            Err(e) => {
                warn!(folder = %folder.name, error = %e, "Failed to list priority subfolder");
                traversal.errors.push(list_error(folder, e));
            }
        }
    }
    sort_most_recent_first(&mut priority);
    priority.truncate(config.priority_limit);

    // Other subfolders fan out concurrently, each with its own budget
    let visits = folders
        .iter()
        .take(config.max_other_subfolders)
        .map(|folder| async move {
            let listing = collect_leaves(source, folder, 2, config.max_depth, config.other_limit).await;
            (folder, listing)
        });

    let mut other = Vec::new();
    for (folder, listing) in join_all(visits).await {
        match listing {
            Ok(listing) => {
                traversal.total_found += listing.found;
                traversal.errors.extend(listing.errors);
                other.extend(
                    listing
                        .leaves
                        .into_iter()
                        .map(|e| (e, Provenance::OtherSubfolder(folder.name.clone()))),
                );
            }
            Err(e) => {
                warn!(folder = %folder.name, error = %e, "Failed to list subfolder, skipping");
                traversal.errors.push(list_error(folder, e));
            }
        }
    }
    other.truncate(config.other_limit);

    let selected = priority
        .into_iter()
        .map(|e| (e, Provenance::PrioritySubfolder))
        .chain(
            root_leaves
                .into_iter()
                .take(config.root_limit)
                .map(|e| (e, Provenance::Root)),
        )
        .chain(other)
        .take(config.total_limit);

    traversal.items = selected
        .map(|(entry, provenance)| ContentItem::from_entry(entry, provenance))
        .collect();

    info!(
        root_id,
        found = traversal.total_found,
        selected = traversal.items.len(),
        failed_folders = traversal.errors.len(),
        "Traversed company folder"
    );

    Ok(traversal)
}

/// List the files under `folder`, descending while `depth < max_depth`.
///
/// Keeps at most `budget` files but counts every file seen. Nested folders
/// that fail to list are recorded and skipped.
fn collect_leaves<'a, C>(
    source: &'a C,
    folder: &'a SourceEntry,
    depth: usize,
    max_depth: usize,
    budget: usize,
) -> BoxFuture<'a, SourceResult<Listing>>
where
    C: ContentSource + ?Sized,
{
    async move {
        let entries = source.list_children(&folder.id).await?;
        let (subfolders, files): (Vec<_>, Vec<_>) =
            entries.into_iter().partition(|e| e.kind.is_folder());

        let mut listing = Listing {
            found: files.len(),
            leaves: files,
            errors: Vec::new(),
        };
        listing.leaves.truncate(budget);

        if depth < max_depth {
            for sub in &subfolders {
                let remaining = budget.saturating_sub(listing.leaves.len());
                match collect_leaves(source, sub, depth + 1, max_depth, remaining).await {
                    Ok(nested) => {
                        listing.found += nested.found;
                        listing.leaves.extend(nested.leaves);
                        listing.errors.extend(nested.errors);
                    }
                    Err(e) => {
                        warn!(folder = %sub.name, error = %e, "Failed to list nested folder");
                        listing.errors.push(list_error(sub, e));
                    }
                }
            }
        }

        Ok(listing)
    }
    .boxed()
}

fn list_error(folder: &SourceEntry, error: impl ToString) -> ItemError {
    ItemError::new(&folder.name, ErrorStage::List, error).with_item_id(&folder.id)
}

/// Newest first; entries without a timestamp go last.
fn sort_most_recent_first(entries: &mut [SourceEntry]) {
    entries.sort_by(|a, b| b.modified_at.cmp(&a.modified_at));
}

/// A company folder directly under the portfolio root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyFolder {
    pub id: String,

    /// Folder name as stored, including any enumeration
    pub raw_name: String,

    pub name: String,
    pub display_name: String,
}

impl From<SourceEntry> for CompanyFolder {
    fn from(entry: SourceEntry) -> Self {
        let name = CompanyName::parse(&entry.name);
        Self {
            id: entry.id,
            raw_name: entry.name,
            name: name.name,
            display_name: name.display_name,
        }
    }
}

/// One page of company folders.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FolderPage {
    pub folders: Vec<CompanyFolder>,

    /// Company folders under the root
    pub total: usize,

    pub offset: usize,
    pub limit: usize,
    pub has_more: bool,
    pub next_offset: Option<usize>,
}

/// List the company folders under the portfolio root, one page at a time.
pub async fn list_company_folders<C>(source: &C, root_id: &str, page: Page) -> SourceResult<FolderPage>
where
    C: ContentSource + ?Sized,
{
    let folders = source.list_folders(root_id).await?;
    let total = folders.len();
    let end = page.offset.saturating_add(page.limit);
    let has_more = end < total;

    Ok(FolderPage {
        folders: folders
            .into_iter()
            .skip(page.offset)
            .take(page.limit)
            .map(CompanyFolder::from)
            .collect(),
        total,
        offset: page.offset,
        limit: page.limit,
        has_more,
        next_offset: has_more.then_some(end),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockSource, MockSourceCall};
    use crate::types::item::MediaKind;
    use chrono::{Duration, TimeZone, Utc};

    fn dated_file(id: &str, days_ago: i64) -> SourceEntry {
        let base = Utc.with_ymd_and_hms(2025, 6, 30, 12, 0, 0).unwrap();
        SourceEntry::new(id, format!("{}.txt", id), MediaKind::Text("text/plain".into()))
            .with_modified_at(base - Duration::days(days_ago))
    }

    /// One priority folder with 10 files, six other folders with 10 each.
    fn crowded_source() -> MockSource {
        let mut source = MockSource::new().with_folder("co", "upd", "Quarterly Updates");
        for i in 0..10 {
            // Oldest listed first so the sort has work to do
            source = source.with_file("upd", dated_file(&format!("upd-{}", i), 10 - i), "update");
        }
        for f in 0..6 {
            let folder_id = format!("other-{}", f);
            source = source.with_folder("co", &folder_id, &format!("Folder {}", f));
            for i in 0..10 {
                source = source.with_text_file(&folder_id, &format!("{}-{}", folder_id, i), "doc.txt", "doc");
            }
        }
        source
    }

    #[tokio::test]
    async fn test_traversal_respects_caps_and_priority_order() {
        let source = crowded_source();
        let traversal = traverse(&source, "co", &TraversalConfig::default()).await.unwrap();

        assert!(traversal.items.len() <= 12);
        assert_eq!(traversal.items.len(), 8);

        let priority: Vec<_> = traversal
            .items
            .iter()
            .take_while(|i| i.provenance.is_priority())
            .collect();
        assert_eq!(priority.len(), 5);
        assert_eq!(priority[0].id, "upd-9");
        assert!(priority
            .windows(2)
            .all(|w| w[0].modified_at >= w[1].modified_at));
        assert!(traversal.items[5..].iter().all(|i| !i.provenance.is_priority()));

        // Priority folder plus four of six other folders
        assert_eq!(traversal.total_found, 10 + 4 * 10);
    }

    #[tokio::test]
    async fn test_root_items_follow_priority_items() {
        let source = MockSource::new()
            .with_text_file("co", "r1", "deck.txt", "root file")
            .with_folder("co", "upd", "Investor Update")
            .with_file("upd", dated_file("u1", 1), "update")
            .with_folder("co", "legal", "Legal")
            .with_text_file("legal", "l1", "sha.txt", "legal file");

        let traversal = traverse(&source, "co", &TraversalConfig::default()).await.unwrap();
        let tags: Vec<_> = traversal.items.iter().map(|i| i.provenance.to_string()).collect();
        assert_eq!(tags, vec!["priority-subfolder", "root", "other-subfolder:Legal"]);
    }

    #[tokio::test]
    async fn test_failed_subfolder_does_not_stop_siblings() {
        let source = MockSource::new()
            .with_folder("co", "a", "Finance")
            .with_folder("co", "b", "Legal")
            .with_text_file("b", "b1", "sha.txt", "legal")
            .fail_list("a");

        let traversal = traverse(&source, "co", &TraversalConfig::default()).await.unwrap();
        assert_eq!(traversal.items.len(), 1);
        assert_eq!(traversal.items[0].id, "b1");
        assert_eq!(traversal.errors.len(), 1);
        assert_eq!(traversal.errors[0].item, "Finance");
        assert_eq!(traversal.errors[0].stage, ErrorStage::List);
    }

    #[tokio::test]
    async fn test_root_listing_failure_is_an_error() {
        let source = MockSource::new().fail_list("co");
        assert!(traverse(&source, "co", &TraversalConfig::default()).await.is_err());
    }

    #[tokio::test]
    async fn test_depth_bound_limits_recursion() {
        let source = MockSource::new()
            .with_folder("co", "a", "Docs")
            .with_folder("a", "a2", "Nested")
            .with_text_file("a2", "deep", "deep.txt", "deep");

        let shallow = traverse(&source, "co", &TraversalConfig::default()).await.unwrap();
        assert!(shallow.items.is_empty());

        let deeper = traverse(&source, "co", &TraversalConfig::default().with_max_depth(3))
            .await
            .unwrap();
        assert_eq!(deeper.items.len(), 1);

        let root_only = traverse(&source, "co", &TraversalConfig::default().with_max_depth(1))
            .await
            .unwrap();
        assert!(root_only.items.is_empty());
        let nested_lists = source
            .calls()
            .into_iter()
            .filter(|c| matches!(c, MockSourceCall::List { folder_id } if folder_id == "a2"))
            .count();
        assert_eq!(nested_lists, 1);
    }

    #[tokio::test]
    async fn test_list_company_folders_paginates() {
        let mut source = MockSource::new().with_text_file("root", "readme", "README.txt", "x");
        for i in 0..12 {
            source = source.with_folder("root", &format!("f{}", i), &format!("{}. Company {}", i + 1, i));
        }

        let first = list_company_folders(&source, "root", Page::default()).await.unwrap();
        assert_eq!(first.total, 12);
        assert_eq!(first.folders.len(), 10);
        assert!(first.has_more);
        assert_eq!(first.next_offset, Some(10));
        assert_eq!(first.folders[0].name, "Company 0");
        assert_eq!(first.folders[0].raw_name, "1. Company 0");

        let last = list_company_folders(&source, "root", Page::new(10, 10)).await.unwrap();
        assert_eq!(last.folders.len(), 2);
        assert!(!last.has_more);
        assert_eq!(last.next_offset, None);
    }
}
