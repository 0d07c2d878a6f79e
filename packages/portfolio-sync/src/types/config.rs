//! Configuration types for traversal, reading and sync.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Budgets and patterns for walking one company folder.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraversalConfig {
    /// Folder levels listed, counting the company folder itself.
    ///
    /// Default: 2 (the company folder and its direct subfolders).
    pub max_depth: usize,

    /// Non-priority subfolders visited. Default: 4.
    pub max_other_subfolders: usize,

    /// Items kept from the priority subfolder. Default: 5.
    pub priority_limit: usize,

    /// Items kept from the company folder itself. Default: 5.
    pub root_limit: usize,

    /// Items kept across all other subfolders. Default: 3.
    pub other_limit: usize,

    /// Items handed to the reader in total. Default: 12.
    pub total_limit: usize,

    /// Case-insensitive substrings that mark the priority subfolder.
    #[serde(default = "default_priority_patterns")]
    pub priority_patterns: Vec<String>,
}

fn default_priority_patterns() -> Vec<String> {
    ["performance update", "quarterly update", "investor update"]
        .into_iter()
        .map(String::from)
        .collect()
}

impl Default for TraversalConfig {
    fn default() -> Self {
        Self {
            max_depth: 2,
            max_other_subfolders: 4,
            priority_limit: 5,
            root_limit: 5,
            other_limit: 3,
            total_limit: 12,
            priority_patterns: default_priority_patterns(),
        }
    }
}

impl TraversalConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the depth bound.
    pub fn with_max_depth(mut self, depth: usize) -> Self {
        self.max_depth = depth;
        self
    }

    /// Set the overall item budget.
    pub fn with_total_limit(mut self, limit: usize) -> Self {
        self.total_limit = limit;
        self
    }

    /// Set per-group limits (priority, root, other).
    pub fn with_group_limits(mut self, priority: usize, root: usize, other: usize) -> Self {
        self.priority_limit = priority;
        self.root_limit = root;
        self.other_limit = other;
        self
    }

    /// Add a priority folder pattern.
    pub fn with_priority_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.priority_patterns.push(pattern.into().to_lowercase());
        self
    }

    /// Check whether a folder name marks the priority subfolder.
    pub fn is_priority_folder(&self, name: &str) -> bool {
        let name = name.to_lowercase();
        self.priority_patterns
            .iter()
            .any(|p| name.contains(&p.to_lowercase()))
    }
}

/// Limits for decoding one item.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReaderConfig {
    /// Characters kept from each decoded item. Default: 4000.
    pub max_chars: usize,
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self { max_chars: 4000 }
    }
}

impl ReaderConfig {
    pub fn with_max_chars(mut self, max_chars: usize) -> Self {
        self.max_chars = max_chars;
        self
    }
}

/// Configuration for a full sync run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    pub traversal: TraversalConfig,
    pub reader: ReaderConfig,

    /// Completion budget for the summarizer. Default: 1200.
    pub max_tokens: u32,

    /// Text an item must exceed before the summarizer is called.
    ///
    /// Default: 20 characters, whitespace included.
    pub min_readable_chars: usize,

    /// Upper bound on any single remote call. Default: 30s.
    #[serde(with = "duration_secs")]
    pub call_timeout: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            traversal: TraversalConfig::default(),
            reader: ReaderConfig::default(),
            max_tokens: 1200,
            min_readable_chars: 20,
            call_timeout: Duration::from_secs(30),
        }
    }
}

impl SyncConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_traversal(mut self, traversal: TraversalConfig) -> Self {
        self.traversal = traversal;
        self
    }

    pub fn with_reader(mut self, reader: ReaderConfig) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }
}

/// Location of the holdings sheet.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetRef {
    pub spreadsheet_id: String,

    /// Numeric tab id; the first tab is used when absent or unknown
    pub gid: Option<i64>,

    /// A1 range read from the tab
    pub range: String,
}

impl SheetRef {
    pub fn new(spreadsheet_id: impl Into<String>) -> Self {
        Self {
            spreadsheet_id: spreadsheet_id.into(),
            gid: None,
            range: "A1:Z200".to_string(),
        }
    }

    pub fn with_gid(mut self, gid: i64) -> Self {
        self.gid = Some(gid);
        self
    }

    pub fn with_range(mut self, range: impl Into<String>) -> Self {
        self.range = range.into();
        self
    }
}

/// Offset/limit window over the company folder list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    pub offset: usize,
    pub limit: usize,
}

impl Default for Page {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: 10,
        }
    }
}

impl Page {
    pub fn new(offset: usize, limit: usize) -> Self {
        Self { offset, limit }
    }

    /// Everything, in one page.
    pub fn all() -> Self {
        Self {
            offset: 0,
            limit: usize::MAX,
        }
    }
}

mod duration_secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_secs)
    }
}
