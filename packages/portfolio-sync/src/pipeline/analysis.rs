//! Decoding and sanitizing the summarizer's answer.
//!
//! The model is asked for a JSON object but may wrap it in code fences,
//! surround it with prose, or return something that is not JSON at all.
//! [`decode_analysis`] never fails: anything unusable is
//! [`Decoded::Absent`] with a reason.

use indexmap::IndexMap;
use regex::Regex;
use schemars::{schema::RootSchema, schema_for, JsonSchema};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::sync::LazyLock;

use crate::types::record::RecordPatch;

/// Longest list kept from any list field.
pub const MAX_LIST_ITEMS: usize = 5;

static RE_CODE_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)```(?:json)?[ \t]*\r?\n?").unwrap());

static NULL: Value = Value::Null;

/// Structured analysis of one company.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct CompanyAnalysis {
    /// What the company does, in two or three sentences
    pub description: Option<String>,

    /// Most recent first
    #[serde(default)]
    pub latest_updates: Vec<String>,

    pub sector: Option<String>,
    pub stage: Option<String>,

    #[serde(default)]
    pub highlights: Vec<String>,

    #[serde(default)]
    pub founders: Vec<String>,

    pub location: Option<String>,

    #[serde(default)]
    pub key_metrics: IndexMap<String, String>,
}

/// JSON schema of [`CompanyAnalysis`], for providers with structured output.
pub fn analysis_schema() -> RootSchema {
    schema_for!(CompanyAnalysis)
}

/// Why no structured data came out of a summarizer answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", content = "detail", rename_all = "snake_case")]
pub enum AbsentReason {
    /// Blank answer
    Empty,
    /// No `{ ... }` object anywhere in the answer
    NoJsonObject,
    /// Looked like JSON but did not parse
    Malformed(String),
}

impl fmt::Display for AbsentReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => f.write_str("empty response"),
            Self::NoJsonObject => f.write_str("no JSON object in response"),
            Self::Malformed(msg) => write!(f, "malformed JSON: {}", msg),
        }
    }
}

/// Result of a best-effort structured decode.
#[derive(Debug, Clone, PartialEq)]
pub enum Decoded<T> {
    Parsed(T),
    Absent(AbsentReason),
}

impl<T> Decoded<T> {
    pub fn is_parsed(&self) -> bool {
        matches!(self, Self::Parsed(_))
    }

    pub fn parsed(self) -> Option<T> {
        match self {
            Self::Parsed(value) => Some(value),
            Self::Absent(_) => None,
        }
    }

    pub fn absent_reason(&self) -> Option<&AbsentReason> {
        match self {
            Self::Parsed(_) => None,
            Self::Absent(reason) => Some(reason),
        }
    }
}

/// Decode a summarizer answer into a sanitized analysis.
pub fn decode_analysis(raw: &str) -> Decoded<CompanyAnalysis> {
    let unfenced = RE_CODE_FENCE.replace_all(raw, "");
    let text = unfenced.trim();
    if text.is_empty() {
        return Decoded::Absent(AbsentReason::Empty);
    }

    let candidate = match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => &text[start..=end],
        _ => return Decoded::Absent(AbsentReason::NoJsonObject),
    };

    match serde_json::from_str::<Value>(candidate) {
        Ok(Value::Object(object)) => Decoded::Parsed(CompanyAnalysis::from_object(&object)),
        Ok(_) => Decoded::Absent(AbsentReason::NoJsonObject),
        Err(e) => Decoded::Absent(AbsentReason::Malformed(e.to_string())),
    }
}

impl CompanyAnalysis {
    /// Read fields leniently from a JSON object.
    ///
    /// Strings are trimmed and placeholder values ("", "null", "N/A") dropped;
    /// lists are capped at [`MAX_LIST_ITEMS`]; metric values are stringified.
    pub fn from_object(object: &Map<String, Value>) -> Self {
        let field = |key: &str| object.get(key).unwrap_or(&NULL);
        Self {
            description: text(field("description")),
            latest_updates: list(field("latestUpdates")),
            sector: text(field("sector")),
            stage: text(field("stage")),
            highlights: list(field("highlights")),
            founders: list(field("founders")),
            location: text(field("location")),
            key_metrics: metrics(field("keyMetrics")),
        }
    }

    /// Check whether the model found anything at all.
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Patch carrying only the fields the model actually filled.
    ///
    /// Empty lists and maps stay absent so they never clear stored values.
    pub fn to_patch(&self, prompt_hash: &str) -> RecordPatch {
        let non_empty = |v: &Vec<String>| (!v.is_empty()).then(|| v.clone());
        RecordPatch {
            description: self.description.clone(),
            sector: self.sector.clone(),
            stage: self.stage.clone(),
            location: self.location.clone(),
            latest_updates: non_empty(&self.latest_updates),
            highlights: non_empty(&self.highlights),
            founders: non_empty(&self.founders),
            key_metrics: (!self.key_metrics.is_empty()).then(|| self.key_metrics.clone()),
            analysis_prompt_hash: Some(prompt_hash.to_string()),
            ..Default::default()
        }
    }
}

fn text(value: &Value) -> Option<String> {
    let s = match value {
        Value::String(s) => s.trim().to_string(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        _ => return None,
    };
    let placeholder = matches!(
        s.to_lowercase().as_str(),
        "" | "null" | "none" | "n/a" | "na" | "unknown" | "not mentioned"
    );
    (!placeholder).then_some(s)
}

fn list(value: &Value) -> Vec<String> {
    match value {
        Value::Array(items) => items.iter().filter_map(text).take(MAX_LIST_ITEMS).collect(),
        other => text(other).into_iter().collect(),
    }
}

fn metrics(value: &Value) -> IndexMap<String, String> {
    match value {
        Value::Object(map) => map
            .iter()
            .filter_map(|(k, v)| {
                let key = k.trim();
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), text(v)?))
            })
            .collect(),
        _ => IndexMap::new(),
    }
}

/// Summary used when no document had readable text.
pub fn fallback_summary<S: AsRef<str>>(file_count: usize, names: &[S]) -> String {
    let listed = names
        .iter()
        .take(MAX_LIST_ITEMS)
        .map(|n| n.as_ref())
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Portfolio company with {} files in data room. Documents include: {}.",
        file_count, listed
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decodes_fenced_json() {
        let raw = "```json\n{\"description\": \"Makes widgets.\", \"sector\": \"SaaS\"}\n```";
        let analysis = decode_analysis(raw).parsed().unwrap();
        assert_eq!(analysis.description.as_deref(), Some("Makes widgets."));
        assert_eq!(analysis.sector.as_deref(), Some("SaaS"));
    }

    #[test]
    fn test_decodes_object_inside_prose() {
        let raw = "Sure! Here is the analysis:\n{\"stage\": \"Seed\"}\nLet me know if you need more.";
        let analysis = decode_analysis(raw).parsed().unwrap();
        assert_eq!(analysis.stage.as_deref(), Some("Seed"));
    }

    #[test]
    fn test_absent_reasons() {
        assert_eq!(decode_analysis("   ").absent_reason(), Some(&AbsentReason::Empty));
        assert_eq!(
            decode_analysis("I could not find anything.").absent_reason(),
            Some(&AbsentReason::NoJsonObject)
        );
        assert!(matches!(
            decode_analysis("{\"description\": \"cut off").absent_reason(),
            Some(AbsentReason::NoJsonObject)
        ));
        assert!(matches!(
            decode_analysis("{\"description\": }").absent_reason(),
            Some(AbsentReason::Malformed(_))
        ));
    }

    #[test]
    fn test_sanitizes_fields() {
        let raw = serde_json::json!({
            "description": "  Payments for SMEs.  ",
            "sector": "N/A",
            "stage": null,
            "location": "",
            "highlights": ["a", "b", "", "c", "d", "e", "f", "g"],
            "founders": "Jane Doe",
            "latestUpdates": [],
            "keyMetrics": {"revenue": "$1M ARR", "users": 50000, "churn": null, " ": "x"}
        })
        .to_string();
        let analysis = decode_analysis(&raw).parsed().unwrap();

        assert_eq!(analysis.description.as_deref(), Some("Payments for SMEs."));
        assert_eq!(analysis.sector, None);
        assert_eq!(analysis.stage, None);
        assert_eq!(analysis.location, None);
        assert_eq!(analysis.highlights, vec!["a", "b", "c", "d", "e"]);
        assert_eq!(analysis.founders, vec!["Jane Doe"]);
        assert_eq!(analysis.key_metrics.len(), 2);
        assert_eq!(analysis.key_metrics["users"], "50000");
    }

    #[test]
    fn test_patch_leaves_missing_fields_absent() {
        let analysis = CompanyAnalysis {
            sector: Some("FinTech".into()),
            highlights: vec!["Profitable".into()],
            ..Default::default()
        };
        let patch = analysis.to_patch("hash");

        assert_eq!(patch.sector.as_deref(), Some("FinTech"));
        assert_eq!(patch.highlights, Some(vec!["Profitable".to_string()]));
        assert_eq!(patch.description, None);
        assert_eq!(patch.latest_updates, None);
        assert_eq!(patch.key_metrics, None);
        assert_eq!(patch.analysis_prompt_hash.as_deref(), Some("hash"));
    }

    #[test]
    fn test_fallback_summary_lists_five_names() {
        let names = ["a.pdf", "b.pdf", "c.pdf", "d.pdf", "e.pdf", "f.pdf"];
        assert_eq!(
            fallback_summary(9, &names),
            "Portfolio company with 9 files in data room. Documents include: a.pdf, b.pdf, c.pdf, d.pdf, e.pdf."
        );
    }

    #[test]
    fn test_schema_names_camel_case_fields() {
        let schema = serde_json::to_value(analysis_schema()).unwrap();
        let properties = schema["properties"].as_object().unwrap();
        assert!(properties.contains_key("latestUpdates"));
        assert!(properties.contains_key("keyMetrics"));
    }
}
