//! Main-period resolution and document-level DEI metadata.
//!
//! Every filing carries exactly one `dei:DocumentPeriodEndDate` fact naming
//! the reporting period the document is primarily about. That date is the
//! anchor for selecting consolidated facts among the many historical and
//! comparison periods present in the same document.
//!
//! Resolution is strict: zero or multiple period-end facts make the document
//! unusable and the caller must skip it. Guessing here would silently mix
//! periods downstream.

use crate::instance::RawFact;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Local name of the designated period-end concept (`dei` namespace).
pub const DOCUMENT_PERIOD_END_LOCAL: &str = "DocumentPeriodEndDate";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PeriodResolutionError {
    #[error("no DocumentPeriodEndDate fact in document")]
    Missing,
    #[error("{count} DocumentPeriodEndDate facts in document, expected exactly one")]
    Ambiguous { count: usize },
    #[error("unparseable DocumentPeriodEndDate value {value:?}")]
    BadDate { value: String },
}

/// "us-gaap:Revenues" -> "Revenues". DEI concepts are matched by local name
/// so taxonomy-year prefixes never matter.
fn local_name(concept: &str) -> &str {
    concept.rsplit(':').next().unwrap_or(concept)
}

/// Resolve the document's main reporting period end date.
///
/// Exactly one `DocumentPeriodEndDate` fact must exist; ambiguity is
/// surfaced, not resolved.
pub fn resolve_period_end(facts: &[RawFact]) -> Result<NaiveDate, PeriodResolutionError> {
    let mut found: Vec<&RawFact> = facts
        .iter()
        .filter(|f| local_name(&f.concept) == DOCUMENT_PERIOD_END_LOCAL)
        .collect();

    match found.len() {
        0 => Err(PeriodResolutionError::Missing),
        1 => {
            let fact = found.remove(0);
            let raw = fact.value.trim();
            raw.parse::<NaiveDate>()
                .map_err(|_| PeriodResolutionError::BadDate {
                    value: raw.to_string(),
                })
        }
        count => Err(PeriodResolutionError::Ambiguous { count }),
    }
}

/// DEI metadata used to align a filing with vendor reporting periods.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentMeta {
    /// DocumentFiscalYearFocus, e.g. "2025".
    pub fiscal_year: Option<String>,
    /// DocumentFiscalPeriodFocus, e.g. "Q3" or "FY".
    pub fiscal_period: Option<String>,
    /// DocumentType, e.g. "10-Q".
    pub document_type: Option<String>,
    /// AmendmentFlag, "true"/"false".
    pub amendment_flag: Option<String>,
}

/// Extract DEI metadata from the fact list. Each field takes the first
/// non-empty value; these facts are informational, so unlike the period end
/// they are not required to be unique.
pub fn document_meta(facts: &[RawFact]) -> DocumentMeta {
    let first = |local: &str| -> Option<String> {
        facts
            .iter()
            .find(|f| local_name(&f.concept) == local && !f.value.is_empty())
            .map(|f| f.value.clone())
    };

    DocumentMeta {
        fiscal_year: first("DocumentFiscalYearFocus"),
        fiscal_period: first("DocumentFiscalPeriodFocus"),
        document_type: first("DocumentType"),
        amendment_flag: first("AmendmentFlag"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fact(concept: &str, value: &str) -> RawFact {
        RawFact {
            concept: concept.to_string(),
            context_ref: "c-1".to_string(),
            value: value.to_string(),
            unit_ref: None,
            decimals: None,
        }
    }

    #[test]
    fn resolves_a_single_period_end_fact() {
        let facts = vec![
            fact("us-gaap:Revenues", "100"),
            fact("dei:DocumentPeriodEndDate", "2024-09-30"),
        ];
        let end = resolve_period_end(&facts).expect("resolution");
        assert_eq!(end, "2024-09-30".parse().unwrap());
    }

    #[test]
    fn zero_period_end_facts_is_an_error() {
        let facts = vec![fact("us-gaap:Revenues", "100")];
        assert_eq!(
            resolve_period_end(&facts),
            Err(PeriodResolutionError::Missing)
        );
    }

    #[test]
    fn multiple_period_end_facts_are_ambiguous_even_when_equal() {
        let facts = vec![
            fact("dei:DocumentPeriodEndDate", "2024-09-30"),
            fact("dei:DocumentPeriodEndDate", "2024-09-30"),
        ];
        assert_eq!(
            resolve_period_end(&facts),
            Err(PeriodResolutionError::Ambiguous { count: 2 })
        );
    }

    #[test]
    fn unparseable_period_end_value_is_an_error() {
        let facts = vec![fact("dei:DocumentPeriodEndDate", "Q3 2024")];
        assert_eq!(
            resolve_period_end(&facts),
            Err(PeriodResolutionError::BadDate {
                value: "Q3 2024".to_string()
            })
        );
    }

    #[test]
    fn document_meta_takes_first_non_empty_values() {
        let facts = vec![
            fact("dei:DocumentFiscalYearFocus", ""),
            fact("dei:DocumentFiscalYearFocus", "2025"),
            fact("dei:DocumentFiscalPeriodFocus", "Q3"),
            fact("dei:DocumentType", "10-Q"),
        ];
        let meta = document_meta(&facts);
        assert_eq!(meta.fiscal_year.as_deref(), Some("2025"));
        assert_eq!(meta.fiscal_period.as_deref(), Some("Q3"));
        assert_eq!(meta.document_type.as_deref(), Some("10-Q"));
        assert_eq!(meta.amendment_flag, None);
    }
}
