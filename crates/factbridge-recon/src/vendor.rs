//! Vendor-side inputs: scraped financial statements with free-text labels.
//!
//! The vendor source reports the same companies and periods as the filings,
//! but with its own metric names ("Total Revenue", "Net Profit"), heavy
//! rounding ("1.86B") and occasional mistakes. Nothing here is trusted as a
//! label->concept mapping; these rows are only comparison input for the
//! evidence accumulator.
//!
//! The JSON shape mirrors what the scraping collaborator stores per entity:
//!
//! ```json
//! {
//!   "periods": ["Oct 2025 (FQ4)", "Jul 2025 (FQ3)"],
//!   "income_statement": { "metrics": { "Revenue": { "Jul 2025 (FQ3)": "1.86B" } } },
//!   "balance_sheet":    { "metrics": { ... } },
//!   "cash_flow":        { "metrics": { ... } }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One vendor-reported figure for one entity and period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorLabelRow {
    pub entity: String,
    /// Vendor period label, e.g. "Jul 2025 (FQ3)".
    pub period: String,
    /// Free-text metric label, not a canonical concept.
    pub label: String,
    /// Value in dollars, already de-suffixed.
    pub value: f64,
}

/// label -> period label -> raw cell text.
pub type MetricTable = BTreeMap<String, BTreeMap<String, String>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatementTable {
    #[serde(default)]
    pub metrics: MetricTable,
}

/// Per-entity vendor statements as stored by the scraper.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VendorStatements {
    #[serde(default)]
    pub periods: Vec<String>,
    #[serde(default)]
    pub income_statement: StatementTable,
    #[serde(default)]
    pub balance_sheet: StatementTable,
    #[serde(default)]
    pub cash_flow: StatementTable,
}

impl VendorStatements {
    /// Merge the three statements into one label -> period -> cell table.
    ///
    /// Labels repeating across statements get a `" (statement)"` suffix so
    /// no column is silently dropped (e.g. a balance-sheet "Revenue" next to
    /// the income-statement one).
    pub fn merged_metrics(&self) -> MetricTable {
        let mut merged = MetricTable::new();
        for (stmt_name, table) in [
            ("income_statement", &self.income_statement),
            ("balance_sheet", &self.balance_sheet),
            ("cash_flow", &self.cash_flow),
        ] {
            for (label, cells) in &table.metrics {
                let mut name = label.clone();
                if merged.contains_key(&name) {
                    name = format!("{label} ({stmt_name})");
                    let mut n = 2;
                    while merged.contains_key(&name) {
                        name = format!("{label} ({stmt_name}) #{n}");
                        n += 1;
                    }
                }
                merged.insert(name, cells.clone());
            }
        }
        merged
    }

    /// Find the period column for a filing's fiscal focus.
    ///
    /// Vendor labels look like "Jul 2025 (FQ3)"; the filing provides
    /// `DocumentFiscalYearFocus = "2025"` and `DocumentFiscalPeriodFocus =
    /// "Q3"`, so we match on the `"2025 (FQ3)"` suffix.
    pub fn period_for_fiscal_focus(&self, fiscal_year: &str, fiscal_period: &str) -> Option<&str> {
        if fiscal_year.is_empty() || fiscal_period.is_empty() {
            return None;
        }
        let suffix = format!("{fiscal_year} (F{fiscal_period})");
        self.periods
            .iter()
            .find(|label| label.ends_with(&suffix))
            .map(String::as_str)
    }

    /// Materialize all parseable rows for one period column.
    pub fn rows_for_period(&self, entity: &str, period: &str) -> Vec<VendorLabelRow> {
        let mut rows = Vec::new();
        for (label, cells) in self.merged_metrics() {
            let Some(raw) = cells.get(period) else {
                continue;
            };
            let Some(value) = parse_vendor_amount(raw) else {
                continue;
            };
            rows.push(VendorLabelRow {
                entity: entity.to_string(),
                period: period.to_string(),
                label,
                value,
            });
        }
        rows
    }
}

/// Convert vendor cells like "1.86B", "782.00M", "294.00K", "1234" to
/// dollars. `-` and `—` are empty cells; anything unparseable is `None`.
pub fn parse_vendor_amount(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let s = cleaned.trim();
    if s.is_empty() || s == "-" || s == "—" {
        return None;
    }

    let (num_part, multiplier) = match s.as_bytes().last().copied() {
        Some(b'B') => (&s[..s.len() - 1], 1_000_000_000.0),
        Some(b'M') => (&s[..s.len() - 1], 1_000_000.0),
        Some(b'K') => (&s[..s.len() - 1], 1_000.0),
        _ => (s, 1.0),
    };

    num_part.trim().parse::<f64>().ok().map(|v| v * multiplier)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn vendor_amount_suffixes() {
        assert_relative_eq!(parse_vendor_amount("1.86B").unwrap(), 1_860_000_000.0);
        assert_relative_eq!(parse_vendor_amount("782.00M").unwrap(), 782_000_000.0);
        assert_relative_eq!(parse_vendor_amount("294.00K").unwrap(), 294_000.0);
        assert_relative_eq!(parse_vendor_amount("1234").unwrap(), 1234.0);
        assert_relative_eq!(parse_vendor_amount("-1.5M").unwrap(), -1_500_000.0);
        assert_relative_eq!(parse_vendor_amount("1,234.5").unwrap(), 1234.5);
        assert_eq!(parse_vendor_amount("-"), None);
        assert_eq!(parse_vendor_amount("—"), None);
        assert_eq!(parse_vendor_amount(""), None);
        assert_eq!(parse_vendor_amount("N/A"), None);
    }

    fn statements() -> VendorStatements {
        let mut income = StatementTable::default();
        income.metrics.insert(
            "Revenue".into(),
            BTreeMap::from([("Jul 2025 (FQ3)".into(), "1.86B".into())]),
        );
        let mut balance = StatementTable::default();
        balance.metrics.insert(
            "Revenue".into(),
            BTreeMap::from([("Jul 2025 (FQ3)".into(), "2.00B".into())]),
        );
        balance.metrics.insert(
            "Current Assets".into(),
            BTreeMap::from([("Jul 2025 (FQ3)".into(), "-".into())]),
        );
        VendorStatements {
            periods: vec!["Oct 2025 (FQ4)".into(), "Jul 2025 (FQ3)".into()],
            income_statement: income,
            balance_sheet: balance,
            cash_flow: StatementTable::default(),
        }
    }

    #[test]
    fn merged_metrics_suffixes_colliding_labels() {
        let merged = statements().merged_metrics();
        assert!(merged.contains_key("Revenue"));
        assert!(merged.contains_key("Revenue (balance_sheet)"));
        assert!(merged.contains_key("Current Assets"));
    }

    #[test]
    fn fiscal_focus_matches_period_label_suffix() {
        let stmts = statements();
        assert_eq!(
            stmts.period_for_fiscal_focus("2025", "Q3"),
            Some("Jul 2025 (FQ3)")
        );
        assert_eq!(stmts.period_for_fiscal_focus("2025", "Q1"), None);
        assert_eq!(stmts.period_for_fiscal_focus("", "Q3"), None);
    }

    #[test]
    fn rows_for_period_skips_empty_cells() {
        let rows = statements().rows_for_period("CRM", "Jul 2025 (FQ3)");
        let labels: Vec<&str> = rows.iter().map(|r| r.label.as_str()).collect();
        // "Current Assets" cell is "-", dropped.
        assert_eq!(labels, vec!["Revenue", "Revenue (balance_sheet)"]);
        assert_relative_eq!(rows[0].value, 1_860_000_000.0);
    }
}
