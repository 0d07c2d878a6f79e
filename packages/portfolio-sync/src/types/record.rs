//! Canonical portfolio records and partial updates.

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

use crate::error::{Result, SyncError};

/// Leading enumeration such as "5.6. " or "12 " in front of a folder name.
static RE_ENUMERATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d+(?:\.\d+)*(?:\.\s*|\s+)").unwrap());

/// Investment status of a portfolio company.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum CompanyStatus {
    Active,
    Exited,
    PartiallyExited,
    WrittenOff,
    Other(String),
}

impl CompanyStatus {
    /// Parse a free-text status, case-insensitively.
    pub fn parse(raw: &str) -> Self {
        let normalized = raw.trim().to_lowercase().replace(['-', '_'], " ");
        match normalized.as_str() {
            "active" => Self::Active,
            "exited" | "exit" => Self::Exited,
            "partially exited" | "partial exit" => Self::PartiallyExited,
            "written off" | "write off" => Self::WrittenOff,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Active => "Active",
            Self::Exited => "Exited",
            Self::PartiallyExited => "Partially Exited",
            Self::WrittenOff => "Written Off",
            Self::Other(s) => s,
        }
    }
}

impl From<String> for CompanyStatus {
    fn from(s: String) -> Self {
        Self::parse(&s)
    }
}

impl From<CompanyStatus> for String {
    fn from(status: CompanyStatus) -> Self {
        status.as_str().to_string()
    }
}

/// A company name split into its stored and display forms.
///
/// Folder names carry an enumeration prefix and sometimes a former name:
/// `"5.6. Acme Corp (FKA Old Name)"` cleans to `"Acme Corp (FKA Old Name)"`
/// and displays as `"Acme Corp"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanyName {
    /// Name with the leading enumeration stripped
    pub name: String,

    /// Name up to the first parenthesis
    pub display_name: String,
}

impl CompanyName {
    /// Clean a raw folder name, stripping any leading enumeration.
    pub fn parse(raw: &str) -> Self {
        Self::cleaned(&RE_ENUMERATION.replace(raw.trim(), ""))
    }

    /// Wrap a name that carries no enumeration, such as a sheet cell.
    ///
    /// Leading digits are kept: `"99 Designs"` stays `"99 Designs"`.
    pub fn cleaned(name: &str) -> Self {
        let name = name.trim().to_string();
        let display_name = display_form(&name);
        Self { name, display_name }
    }

    /// Key used for the fallback name match.
    pub fn key(&self) -> String {
        name_key(&self.name)
    }

    pub fn is_empty(&self) -> bool {
        self.name.is_empty()
    }
}

fn display_form(name: &str) -> String {
    let display = name.split('(').next().unwrap_or_default().trim();
    if display.is_empty() {
        name.to_string()
    } else {
        display.to_string()
    }
}

/// Lower-cased, whitespace-collapsed form of a cleaned name.
pub fn name_key(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Keep an amount only if it is finite and non-negative.
pub fn amount(value: f64) -> Option<f64> {
    (value.is_finite() && value >= 0.0).then_some(value)
}

/// Financial fields, all in one currency unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Financials {
    pub investment_amount: Option<f64>,
    pub entry_valuation: Option<f64>,
    pub current_valuation: Option<f64>,
    pub ownership_percent: Option<f64>,
    pub net_value: Option<f64>,
    pub moic: Option<f64>,

    /// Point-in-time valuations keyed like `valuation_30_6_2025`
    #[serde(default)]
    pub dated_valuations: IndexMap<String, f64>,
}

impl Financials {
    /// Drop any value that is not a finite, non-negative number.
    pub fn sanitize(&mut self) {
        for field in [
            &mut self.investment_amount,
            &mut self.entry_valuation,
            &mut self.current_valuation,
            &mut self.ownership_percent,
            &mut self.net_value,
            &mut self.moic,
        ] {
            *field = field.and_then(amount);
        }
        self.dated_valuations.retain(|_, v| amount(*v).is_some());
    }
}

/// One portfolio company as persisted in the record store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CanonicalRecord {
    /// Store-assigned identifier
    pub id: String,

    /// Stable external key (the company's source folder id)
    pub source_id: Option<String>,

    pub name: String,
    pub display_name: String,

    /// Normalized name used for fallback matching
    pub name_key: String,

    pub sector: Option<String>,
    pub stage: Option<String>,
    pub status: Option<CompanyStatus>,

    pub investors: Option<String>,
    pub investment_date: Option<String>,

    #[serde(flatten)]
    pub financials: Financials,

    pub description: Option<String>,
    #[serde(default)]
    pub founders: Vec<String>,
    pub location: Option<String>,
    #[serde(default)]
    pub latest_updates: Vec<String>,
    #[serde(default)]
    pub highlights: Vec<String>,
    #[serde(default)]
    pub key_metrics: IndexMap<String, String>,

    /// Number of items found in the source folder at the last scan
    pub source_item_count: Option<usize>,

    /// Hash of the analysis prompt that produced the narrative fields
    pub analysis_prompt_hash: Option<String>,

    /// Set once on first insert
    pub created_at: DateTime<Utc>,

    /// Updated on every successful reconcile
    pub synced_at: DateTime<Utc>,
}

/// A partial update: only `Some` fields are written.
///
/// Fields left as `None` (for example a description edited by hand) are never
/// touched when the patch is applied to an existing record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPatch {
    pub source_id: Option<String>,
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub sector: Option<String>,
    pub stage: Option<String>,
    pub status: Option<CompanyStatus>,
    pub investors: Option<String>,
    pub investment_date: Option<String>,
    pub investment_amount: Option<f64>,
    pub entry_valuation: Option<f64>,
    pub current_valuation: Option<f64>,
    pub ownership_percent: Option<f64>,
    pub net_value: Option<f64>,
    pub moic: Option<f64>,

    /// Merged key by key into the stored map
    #[serde(default)]
    pub dated_valuations: IndexMap<String, f64>,

    pub description: Option<String>,
    pub founders: Option<Vec<String>>,
    pub location: Option<String>,
    pub latest_updates: Option<Vec<String>>,
    pub highlights: Option<Vec<String>>,
    pub key_metrics: Option<IndexMap<String, String>>,
    pub source_item_count: Option<usize>,
    pub analysis_prompt_hash: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    pub synced_at: Option<DateTime<Utc>>,
}

macro_rules! set_if_some {
    ($target:expr, $patch:expr, $($field:ident),+ $(,)?) => {
        $(
            if let Some(value) = &$patch.$field {
                $target.$field = Some(value.clone());
            }
        )+
    };
}

impl RecordPatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set both name forms.
    pub fn with_name(mut self, name: &CompanyName) -> Self {
        self.name = Some(name.name.clone());
        self.display_name = Some(name.display_name.clone());
        self
    }

    pub fn with_source_id(mut self, source_id: impl Into<String>) -> Self {
        self.source_id = Some(source_id.into());
        self
    }

    pub fn with_status(mut self, status: CompanyStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_source_item_count(mut self, count: usize) -> Self {
        self.source_item_count = Some(count);
        self
    }

    pub fn with_financials(mut self, financials: Financials) -> Self {
        self.investment_amount = financials.investment_amount;
        self.entry_valuation = financials.entry_valuation;
        self.current_valuation = financials.current_valuation;
        self.ownership_percent = financials.ownership_percent;
        self.net_value = financials.net_value;
        self.moic = financials.moic;
        self.dated_valuations = financials.dated_valuations;
        self
    }

    /// Copy every field set in `other` over this patch.
    pub fn merge(mut self, other: RecordPatch) -> Self {
        set_if_some!(
            self,
            other,
            source_id,
            name,
            display_name,
            sector,
            stage,
            status,
            investors,
            investment_date,
            investment_amount,
            entry_valuation,
            current_valuation,
            ownership_percent,
            net_value,
            moic,
            description,
            founders,
            location,
            latest_updates,
            highlights,
            key_metrics,
            source_item_count,
            analysis_prompt_hash,
            created_at,
            synced_at,
        );
        self.dated_valuations.extend(other.dated_valuations);
        self
    }

    /// Apply the present fields to an existing record.
    pub fn apply_to(&self, record: &mut CanonicalRecord) {
        if let Some(name) = &self.name {
            record.name = name.clone();
            record.name_key = name_key(name);
            record.display_name = self
                .display_name
                .clone()
                .unwrap_or_else(|| display_form(name));
        } else if let Some(display_name) = &self.display_name {
            record.display_name = display_name.clone();
        }

        set_if_some!(
            record,
            self,
            source_id,
            sector,
            stage,
            status,
            investors,
            investment_date,
            description,
            location,
            source_item_count,
            analysis_prompt_hash,
        );
        set_if_some!(
            record.financials,
            self,
            investment_amount,
            entry_valuation,
            current_valuation,
            ownership_percent,
            net_value,
            moic,
        );
        record
            .financials
            .dated_valuations
            .extend(self.dated_valuations.iter().map(|(k, v)| (k.clone(), *v)));
        record.financials.sanitize();

        if let Some(founders) = &self.founders {
            record.founders = founders.clone();
        }
        if let Some(updates) = &self.latest_updates {
            record.latest_updates = updates.clone();
        }
        if let Some(highlights) = &self.highlights {
            record.highlights = highlights.clone();
        }
        if let Some(metrics) = &self.key_metrics {
            record.key_metrics = metrics.clone();
        }
        if let Some(synced_at) = self.synced_at {
            record.synced_at = synced_at;
        }
    }

    /// Build a fresh record from this patch.
    ///
    /// `created_at` falls back to `synced_at`, then to `now`.
    pub fn into_record(self, id: impl Into<String>, now: DateTime<Utc>) -> Result<CanonicalRecord> {
        let name = self
            .name
            .clone()
            .filter(|n| !n.trim().is_empty())
            .ok_or(SyncError::MissingName)?;
        let created_at = self.created_at.or(self.synced_at).unwrap_or(now);

        let mut record = CanonicalRecord {
            id: id.into(),
            source_id: None,
            display_name: display_form(&name),
            name_key: name_key(&name),
            name,
            sector: None,
            stage: None,
            status: None,
            investors: None,
            investment_date: None,
            financials: Financials::default(),
            description: None,
            founders: Vec::new(),
            location: None,
            latest_updates: Vec::new(),
            highlights: Vec::new(),
            key_metrics: IndexMap::new(),
            source_item_count: None,
            analysis_prompt_hash: None,
            created_at,
            synced_at: self.synced_at.unwrap_or(created_at),
        };
        self.apply_to(&mut record);
        Ok(record)
    }
}
