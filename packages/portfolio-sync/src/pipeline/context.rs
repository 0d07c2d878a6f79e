//! Context assembly for the summarizer.
//!
//! Priority items are rendered first inside their own markers, which tell
//! the model to weight them over the generic documents that follow.

use crate::types::item::ContentItem;

pub const PRIORITY_START: &str =
    "=== PRIORITY DOCUMENTS: LATEST PERFORMANCE AND INVESTOR UPDATES (most recent and most important information) ===";
pub const PRIORITY_END: &str = "=== END PRIORITY DOCUMENTS ===";
pub const OTHER_START: &str = "=== OTHER DOCUMENTS (background) ===";
pub const OTHER_END: &str = "=== END OTHER DOCUMENTS ===";

/// Placeholder for items with no decodable text.
pub const BINARY_PLACEHOLDER: &str = "[binary — filename only]";

/// Build the prompt payload for one company.
pub fn assemble(company_label: &str, items: &[ContentItem]) -> String {
    let (priority, other): (Vec<&ContentItem>, Vec<&ContentItem>) =
        items.iter().partition(|i| i.provenance.is_priority());

    let mut out = format!("Company folder name: \"{}\"\n", company_label);

    if items.is_empty() {
        out.push_str("\nNo documents found.\n");
        return out;
    }

    if !priority.is_empty() {
        render_section(&mut out, PRIORITY_START, PRIORITY_END, &priority);
    }
    if !other.is_empty() {
        render_section(&mut out, OTHER_START, OTHER_END, &other);
    }
    out
}

fn render_section(out: &mut String, start: &str, end: &str, items: &[&ContentItem]) {
    out.push('\n');
    out.push_str(start);
    out.push('\n');
    for item in items {
        render_item(out, item);
    }
    out.push_str(end);
    out.push('\n');
}

fn render_item(out: &mut String, item: &ContentItem) {
    let modified = item
        .modified_at
        .map(|t| format!(", modified {}", t.format("%Y-%m-%d")))
        .unwrap_or_default();
    out.push_str(&format!(
        "\n--- {} ({}, {}{}) ---\n",
        item.name,
        item.kind.label(),
        item.provenance,
        modified
    ));

    match &item.text {
        Some(text) => {
            out.push_str(text.trim_end());
            out.push('\n');
        }
        None => match &item.unreadable_reason {
            Some(reason) => out.push_str(&format!("[unreadable: {}]\n", reason)),
            None => {
                out.push_str(BINARY_PLACEHOLDER);
                out.push('\n');
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::item::{MediaKind, Provenance, SourceEntry};
    use chrono::{TimeZone, Utc};

    fn item(name: &str, provenance: Provenance, text: Option<&str>) -> ContentItem {
        let mut item = ContentItem::from_entry(
            SourceEntry::new(name, name, MediaKind::from_mime("text/plain")),
            provenance,
        );
        item.text = text.map(String::from);
        item
    }

    #[test]
    fn test_priority_section_comes_first() {
        let items = vec![
            item("Pitch deck", Provenance::Root, Some("We sell widgets")),
            item("Q2 letter", Provenance::PrioritySubfolder, Some("Revenue doubled")),
            item("SHA", Provenance::OtherSubfolder("Legal".into()), None),
        ];
        let context = assemble("Acme", &items);

        let priority_at = context.find(PRIORITY_START).unwrap();
        let other_at = context.find(OTHER_START).unwrap();
        let letter_at = context.find("Revenue doubled").unwrap();
        let deck_at = context.find("We sell widgets").unwrap();

        assert!(context.starts_with("Company folder name: \"Acme\""));
        assert!(priority_at < letter_at && letter_at < other_at);
        assert!(other_at < deck_at);
        assert!(context.contains("--- SHA (Text, other-subfolder:Legal) ---\n[binary — filename only]"));
    }

    #[test]
    fn test_sections_are_omitted_when_empty() {
        let context = assemble("Acme", &[item("Deck", Provenance::Root, Some("text"))]);
        assert!(!context.contains(PRIORITY_START));
        assert!(context.contains(OTHER_START));
        assert!(context.contains(OTHER_END));

        let empty = assemble("Acme", &[]);
        assert!(empty.contains("No documents found."));
    }

    #[test]
    fn test_item_header_includes_modification_date() {
        let mut update = item("Update", Provenance::PrioritySubfolder, Some("news"));
        update.modified_at = Some(Utc.with_ymd_and_hms(2025, 7, 1, 9, 0, 0).unwrap());
        let context = assemble("Acme", &[update]);
        assert!(context.contains("--- Update (Text, priority-subfolder, modified 2025-07-01) ---"));
    }

    #[test]
    fn test_failed_read_shows_reason() {
        let mut failed = item("Board pack", Provenance::Root, None);
        failed.unreadable_reason = Some("timeout fetching: x".into());
        let context = assemble("Acme", &[failed]);
        assert!(context.contains("[unreadable: timeout fetching: x]"));
        assert!(!context.contains(BINARY_PLACEHOLDER));
    }
}
