//! Row extraction: sheet rows to record patches.

use tracing::debug;

use super::normalize::{apply_scale, NumberMode};
use super::schema::{ColumnMap, Field, ScaleHints};
use crate::types::record::{amount, CompanyName, Financials, RecordPatch};

/// Extract one patch per valid data row, in row order.
///
/// Rows with fewer than two non-empty cells, or whose name cell is empty or
/// `"0"`, are skipped. Blank numeric cells and unresolved columns leave the
/// field absent so they never overwrite a stored value.
pub fn extract_rows(rows: &[Vec<String>], columns: &ColumnMap, hints: &ScaleHints) -> Vec<RecordPatch> {
    let mut patches = Vec::with_capacity(rows.len());

    for (offset, row) in rows.iter().enumerate() {
        let non_empty = row.iter().filter(|c| !c.trim().is_empty()).count();
        if non_empty < 2 {
            debug!(row = offset + 1, "Skipping sparse row");
            continue;
        }

        let name = CompanyName::cleaned(cell(row, columns.get(Field::Name)).unwrap_or_default());
        if name.is_empty() || name.name == "0" {
            debug!(row = offset + 1, "Skipping row without a company name");
            continue;
        }

        let reader = RowReader { row, columns, hints };
        let mut financials = Financials {
            investment_amount: reader.money(Field::InvestmentAmount),
            entry_valuation: reader.money(Field::EntryValuation),
            current_valuation: reader.money(Field::LatestValuation),
            ownership_percent: reader.number(Field::Ownership, NumberMode::Percentage),
            net_value: reader.money(Field::NetValue),
            moic: reader.number(Field::Moic, NumberMode::Multiplier),
            ..Default::default()
        };

        for dated in &columns.dated_valuations {
            if let Some(raw) = cell(row, Some(dated.index)) {
                let value = apply_scale(NumberMode::Plain.parse(raw), hints.in_millions(dated.index));
                if let Some(value) = amount(value) {
                    financials.dated_valuations.insert(dated.key.clone(), value);
                }
            }
        }
        financials.sanitize();

        let mut patch = RecordPatch::new().with_name(&name).with_financials(financials);
        patch.investors = reader.text(Field::Investors);
        patch.investment_date = reader.text(Field::InvestmentDate);
        patches.push(patch);
    }

    patches
}

/// Trimmed, non-empty cell at `index`.
fn cell(row: &[String], index: Option<usize>) -> Option<&str> {
    index
        .and_then(|i| row.get(i))
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
}

struct RowReader<'a> {
    row: &'a [String],
    columns: &'a ColumnMap,
    hints: &'a ScaleHints,
}

impl RowReader<'_> {
    fn text(&self, field: Field) -> Option<String> {
        cell(self.row, self.columns.get(field)).map(String::from)
    }

    fn number(&self, field: Field, mode: NumberMode) -> Option<f64> {
        cell(self.row, self.columns.get(field)).map(|raw| mode.parse(raw))
    }

    /// Currency amount with the column's millions correction applied.
    fn money(&self, field: Field) -> Option<f64> {
        let column = self.columns.get(field)?;
        let raw = cell(self.row, Some(column))?;
        let parsed = NumberMode::Plain.parse(raw);
        let scaled = apply_scale(parsed, self.hints.in_millions(column));
        if scaled != parsed {
            debug!(?field, raw, scaled, "Applied millions scale");
        }
        Some(scaled)
    }
}
