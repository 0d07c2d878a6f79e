//! Column discovery for holdings sheets with free-text headers.
//!
//! Each logical field has an ordered list of keyword sets, most specific
//! first. The first header containing every keyword of a set wins. The rules
//! live in [`FIELD_RULES`] so they can be inspected and tested on their own.

use indexmap::IndexMap;
use regex::Regex;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::HashSet;
use std::sync::LazyLock;
use tracing::debug;

use super::normalize::is_millions_header;

/// Point-in-time column date, e.g. "30.6.2025".
static RE_DATED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\.(\d{1,2})\.(\d{4})").unwrap());

/// Sentinel reported for an unresolved column.
pub const UNRESOLVED: i64 = -1;

/// Logical fields of a holdings row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Name,
    Investors,
    InvestmentDate,
    InvestmentAmount,
    EntryValuation,
    Ownership,
    LatestValuation,
    NetValue,
    Moic,
}

impl Field {
    /// Key used in API responses.
    pub fn key(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Investors => "investors",
            Self::InvestmentDate => "investmentDate",
            Self::InvestmentAmount => "totalInvested",
            Self::EntryValuation => "entryValuation",
            Self::Ownership => "ownership",
            Self::LatestValuation => "latestValuation",
            Self::NetValue => "netValue",
            Self::Moic => "netROI",
        }
    }
}

/// How one field is located in the header row.
#[derive(Debug, Clone, Copy)]
pub struct FieldRule {
    pub field: Field,

    /// Keyword sets tried in order; all keywords of a set must appear.
    pub candidates: &'static [&'static [&'static str]],

    /// Column used when no candidate matches.
    pub fallback_index: Option<usize>,

    /// Skip headers that carry a date (point-in-time columns).
    pub skip_dated: bool,
}

/// Resolution order matters: a column claimed by an earlier rule is not
/// offered to later ones.
pub const FIELD_RULES: &[FieldRule] = &[
    FieldRule {
        field: Field::Name,
        candidates: &[&["portfolio"], &["company"]],
        fallback_index: Some(1),
        skip_dated: false,
    },
    FieldRule {
        field: Field::Investors,
        candidates: &[&["investors"]],
        fallback_index: None,
        skip_dated: false,
    },
    FieldRule {
        field: Field::InvestmentDate,
        candidates: &[&["investment", "date"], &["investment", "made"]],
        fallback_index: None,
        skip_dated: false,
    },
    FieldRule {
        field: Field::InvestmentAmount,
        candidates: &[&["total", "invested"], &["amount", "invested"], &["investment", "amount"]],
        fallback_index: None,
        skip_dated: false,
    },
    FieldRule {
        field: Field::EntryValuation,
        candidates: &[&["valuation", "investment"], &["entry", "valuation"]],
        fallback_index: None,
        skip_dated: true,
    },
    FieldRule {
        field: Field::Ownership,
        candidates: &[&["ownership"], &["stake"]],
        fallback_index: None,
        skip_dated: false,
    },
    FieldRule {
        field: Field::LatestValuation,
        candidates: &[&["latest", "valuation"], &["current", "valuation"], &["valuation"]],
        fallback_index: None,
        skip_dated: true,
    },
    FieldRule {
        field: Field::NetValue,
        candidates: &[&["net", "value"]],
        fallback_index: None,
        skip_dated: false,
    },
    FieldRule {
        field: Field::Moic,
        candidates: &[&["net", "roi"], &["moic"], &["multiple"]],
        fallback_index: None,
        skip_dated: false,
    },
];

/// A point-in-time valuation column.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct DatedColumn {
    pub index: usize,
    pub header: String,

    /// Attribute key, e.g. `valuation_30_6_2025`
    pub key: String,
}

/// Logical field to column index, built once per sheet.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    columns: IndexMap<Field, Option<usize>>,
    pub dated_valuations: Vec<DatedColumn>,
}

impl ColumnMap {
    /// Column of a field, `None` when unresolved.
    pub fn get(&self, field: Field) -> Option<usize> {
        self.columns.get(&field).copied().flatten()
    }

    pub fn is_resolved(&self, field: Field) -> bool {
        self.get(field).is_some()
    }

    /// Fields with no matching column.
    pub fn unresolved(&self) -> Vec<Field> {
        self.columns
            .iter()
            .filter(|(_, idx)| idx.is_none())
            .map(|(field, _)| *field)
            .collect()
    }

    /// Index per field with [`UNRESOLVED`] for missing columns.
    pub fn to_sentinels(&self) -> IndexMap<&'static str, i64> {
        self.columns
            .iter()
            .map(|(field, idx)| (field.key(), idx.map_or(UNRESOLVED, |i| i as i64)))
            .collect()
    }
}

impl Serialize for ColumnMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let sentinels = self.to_sentinels();
        let mut map = serializer.serialize_map(Some(sentinels.len() + 1))?;
        for (key, idx) in &sentinels {
            map.serialize_entry(key, idx)?;
        }
        map.serialize_entry("datedValuations", &self.dated_valuations)?;
        map.end()
    }
}

/// Per-column "stated in millions" flags, read from the header text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScaleHints {
    in_millions: Vec<bool>,
}

impl ScaleHints {
    pub fn from_headers(headers: &[String]) -> Self {
        Self {
            in_millions: headers.iter().map(|h| is_millions_header(h)).collect(),
        }
    }

    pub fn in_millions(&self, column: usize) -> bool {
        self.in_millions.get(column).copied().unwrap_or(false)
    }
}

/// Resolve every logical field against a header row.
///
/// Never fails: a field with no match resolves to `None`, except the name,
/// which falls back to column 1.
pub fn resolve_columns(headers: &[String]) -> ColumnMap {
    let lowered: Vec<String> = headers.iter().map(|h| h.trim().to_lowercase()).collect();
    let mut claimed = HashSet::new();
    let mut columns = IndexMap::new();

    for rule in FIELD_RULES {
        let found = rule
            .candidates
            .iter()
            .find_map(|keywords| find_column(&lowered, keywords, rule.skip_dated, &claimed));

        let resolved = match (found, rule.fallback_index) {
            (Some(idx), _) => Some(idx),
            (None, Some(fallback)) => {
                debug!(field = ?rule.field, column = fallback, "No header match, using fallback column");
                Some(fallback)
            }
            (None, None) => {
                debug!(field = ?rule.field, "Column unresolved");
                None
            }
        };

        if let Some(idx) = resolved {
            claimed.insert(idx);
        }
        columns.insert(rule.field, resolved);
    }

    let dated_valuations = lowered
        .iter()
        .enumerate()
        .filter(|(idx, h)| !claimed.contains(idx) && h.contains("valuation"))
        .filter_map(|(idx, h)| {
            let caps = RE_DATED.captures(h)?;
            Some(DatedColumn {
                index: idx,
                header: headers[idx].trim().to_string(),
                key: format!("valuation_{}_{}_{}", &caps[1], &caps[2], &caps[3]),
            })
        })
        .collect();

    ColumnMap {
        columns,
        dated_valuations,
    }
}

fn find_column(
    lowered: &[String],
    keywords: &[&str],
    skip_dated: bool,
    claimed: &HashSet<usize>,
) -> Option<usize> {
    lowered.iter().enumerate().find_map(|(idx, header)| {
        let usable = !claimed.contains(&idx) && !(skip_dated && RE_DATED.is_match(header));
        (usable && keywords.iter().all(|k| header.contains(k))).then_some(idx)
    })
}
