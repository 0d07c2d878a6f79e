//! Source entries and content items.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

pub const FOLDER_MIME: &str = "application/vnd.google-apps.folder";
pub const DOCUMENT_MIME: &str = "application/vnd.google-apps.document";
pub const SPREADSHEET_MIME: &str = "application/vnd.google-apps.spreadsheet";
pub const PRESENTATION_MIME: &str = "application/vnd.google-apps.presentation";

/// How an item's bytes can be turned into text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "mime", rename_all = "snake_case")]
pub enum MediaKind {
    Folder,
    /// Native document, exported as plain text
    Document,
    /// Native spreadsheet, exported as CSV
    Spreadsheet,
    /// Native presentation, exported as plain text
    Presentation,
    /// Already textual (`text/*`), fetched verbatim
    Text(String),
    /// Anything else; only the name is used
    Binary(String),
}

/// Export format requested from the source for native documents.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    PlainText,
    Csv,
}

impl ExportFormat {
    pub fn mime(&self) -> &'static str {
        match self {
            Self::PlainText => "text/plain",
            Self::Csv => "text/csv",
        }
    }
}

impl MediaKind {
    /// Classify a MIME type.
    pub fn from_mime(mime: &str) -> Self {
        match mime {
            FOLDER_MIME => Self::Folder,
            DOCUMENT_MIME => Self::Document,
            SPREADSHEET_MIME => Self::Spreadsheet,
            PRESENTATION_MIME => Self::Presentation,
            m if m.starts_with("text/") => Self::Text(m.to_string()),
            m => Self::Binary(m.to_string()),
        }
    }

    pub fn is_folder(&self) -> bool {
        matches!(self, Self::Folder)
    }

    /// Export format for native documents, `None` otherwise.
    pub fn export_format(&self) -> Option<ExportFormat> {
        match self {
            Self::Document | Self::Presentation => Some(ExportFormat::PlainText),
            Self::Spreadsheet => Some(ExportFormat::Csv),
            _ => None,
        }
    }

    /// Human label used in prompts and API responses.
    pub fn label(&self) -> String {
        match self {
            Self::Folder => "Folder".into(),
            Self::Document => "Google Doc".into(),
            Self::Spreadsheet => "Google Sheet".into(),
            Self::Presentation => "Google Slides".into(),
            Self::Text(_) => "Text".into(),
            Self::Binary(mime) => binary_label(mime)
                .map(str::to_string)
                .unwrap_or_else(|| mime.clone()),
        }
    }
}

fn binary_label(mime: &str) -> Option<&'static str> {
    let label = match mime {
        "application/pdf" => "PDF",
        "application/msword"
        | "application/vnd.openxmlformats-officedocument.wordprocessingml.document" => "Word",
        "application/vnd.ms-excel"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => "Excel",
        "application/vnd.openxmlformats-officedocument.presentationml.presentation" => {
            "PowerPoint"
        }
        m if m.starts_with("image/") => "Image",
        _ => return None,
    };
    Some(label)
}

/// One child of a folder, as listed by the content source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceEntry {
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
    pub modified_at: Option<DateTime<Utc>>,
}

impl SourceEntry {
    pub fn new(id: impl Into<String>, name: impl Into<String>, kind: MediaKind) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            kind,
            modified_at: None,
        }
    }

    pub fn folder(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self::new(id, name, MediaKind::Folder)
    }

    pub fn with_modified_at(mut self, modified_at: DateTime<Utc>) -> Self {
        self.modified_at = Some(modified_at);
        self
    }
}

/// Where in the company folder an item was found.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "String")]
pub enum Provenance {
    /// The subfolder matching a performance/investor update pattern
    PrioritySubfolder,
    /// Directly inside the company folder
    Root,
    /// Any other subfolder, by name
    OtherSubfolder(String),
}

impl Provenance {
    pub fn is_priority(&self) -> bool {
        matches!(self, Self::PrioritySubfolder)
    }
}

impl fmt::Display for Provenance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PrioritySubfolder => f.write_str("priority-subfolder"),
            Self::Root => f.write_str("root"),
            Self::OtherSubfolder(name) => write!(f, "other-subfolder:{}", name),
        }
    }
}

impl From<Provenance> for String {
    fn from(p: Provenance) -> Self {
        p.to_string()
    }
}

/// An item selected for reading, with its decoded text once read.
///
/// Lives for one traversal; never persisted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContentItem {
    pub id: String,
    pub name: String,
    pub kind: MediaKind,
    pub provenance: Provenance,
    pub modified_at: Option<DateTime<Utc>>,

    /// Decoded text, bounded in length
    pub text: Option<String>,

    /// Why `text` is absent for a readable kind
    pub unreadable_reason: Option<String>,
}

impl ContentItem {
    pub fn from_entry(entry: SourceEntry, provenance: Provenance) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            kind: entry.kind,
            provenance,
            modified_at: entry.modified_at,
            text: None,
            unreadable_reason: None,
        }
    }

    /// Has more than `min_chars` characters of text, whitespace included.
    pub fn has_readable_text(&self, min_chars: usize) -> bool {
        self.text
            .as_deref()
            .is_some_and(|t| t.chars().count() > min_chars)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_readable_text_needs_more_than_the_minimum() {
        let mut item = ContentItem::from_entry(
            SourceEntry::new("t", "notes.txt", MediaKind::from_mime("text/plain")),
            Provenance::Root,
        );
        assert!(!item.has_readable_text(20));

        item.text = Some("x".repeat(20));
        assert!(!item.has_readable_text(20));

        item.text = Some("x".repeat(21));
        assert!(item.has_readable_text(20));
    }

    #[test]
    fn test_media_kind_classification() {
        assert_eq!(MediaKind::from_mime(DOCUMENT_MIME), MediaKind::Document);
        assert_eq!(
            MediaKind::from_mime("text/csv"),
            MediaKind::Text("text/csv".into())
        );
        assert!(MediaKind::from_mime(FOLDER_MIME).is_folder());
        assert_eq!(
            MediaKind::from_mime(SPREADSHEET_MIME).export_format(),
            Some(ExportFormat::Csv)
        );
        assert_eq!(MediaKind::from_mime("application/pdf").export_format(), None);
    }

    #[test]
    fn test_media_kind_labels() {
        assert_eq!(MediaKind::from_mime("application/pdf").label(), "PDF");
        assert_eq!(MediaKind::from_mime("image/png").label(), "Image");
        assert_eq!(MediaKind::from_mime(PRESENTATION_MIME).label(), "Google Slides");
        assert_eq!(
            MediaKind::from_mime("application/zip").label(),
            "application/zip"
        );
    }

    #[test]
    fn test_provenance_tags() {
        assert_eq!(Provenance::Root.to_string(), "root");
        assert_eq!(Provenance::PrioritySubfolder.to_string(), "priority-subfolder");
        assert_eq!(
            Provenance::OtherSubfolder("Legal".into()).to_string(),
            "other-subfolder:Legal"
        );
    }
}
