//! Fact selection: raw tagged values -> consolidated company totals.
//!
//! Selection criteria, applied in order per fact:
//!
//! 1. the `contextRef` resolves against the context map,
//! 2. the context has no dimension qualifiers (company-total test),
//! 3. the context's end date (durations) or instant date matches the
//!    resolved main period end exactly,
//! 4. the value parses as a number.
//!
//! Facts failing 1 or 4 are dropped and counted; 2 and 3 are expected
//! exclusions (segment rows, comparison periods) and counted separately.
//! The function is pure so it can be exercised against inline fixtures.

use crate::context::ContextMap;
use crate::instance::RawFact;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// One consolidated company-wide figure for the document's main period.
///
/// Invariants, guaranteed by [`select_company_totals`]:
/// - the referenced context has zero dimension qualifiers, and
/// - the context period's end (or instant) equals the resolved main-period
///   end date.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanonicalFactRow {
    /// Entity identifier (ticker in SEC usage).
    pub entity: String,
    pub filing_date: NaiveDate,
    pub context_id: String,
    /// Aliased concept name, e.g. "us-gaap:Revenues".
    pub concept: String,
    pub value: f64,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
    pub instant: Option<NaiveDate>,
}

/// Per-fact anomaly counters. Observability only; none of these abort
/// extraction.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionSkips {
    /// Fact referenced a context id absent from the context map.
    pub unresolved_context: usize,
    /// Context carried dimension qualifiers (segment/product/geography).
    pub dimensional: usize,
    /// Context period did not end on the main period end date.
    pub off_period: usize,
    /// Value was empty or not numeric.
    pub value_parse_errors: usize,
}

#[derive(Debug, Clone, Default)]
pub struct SelectionOutcome {
    pub rows: Vec<CanonicalFactRow>,
    pub skips: SelectionSkips,
}

/// Parse a reported numeric value: plain decimal, optional sign, commas
/// tolerated. Returns `None` for empty or non-numeric text.
pub fn parse_reported_value(raw: &str) -> Option<f64> {
    let cleaned = raw.replace(',', "");
    let cleaned = cleaned.trim();
    if cleaned.is_empty() {
        return None;
    }
    cleaned.parse::<f64>().ok()
}

/// Select consolidated company totals for the resolved main period.
///
/// `limit` caps the number of accepted rows, in document order. It is a
/// relevance/performance knob inherited from interactive use and can
/// truncate legitimate facts; pass `None` for complete output.
pub fn select_company_totals(
    facts: &[RawFact],
    contexts: &ContextMap,
    entity: &str,
    filing_date: NaiveDate,
    period_end: NaiveDate,
    limit: Option<usize>,
) -> SelectionOutcome {
    let mut outcome = SelectionOutcome::default();

    for fact in facts {
        if limit.is_some_and(|cap| outcome.rows.len() >= cap) {
            break;
        }

        let Some(ctx) = contexts.get(&fact.context_ref) else {
            outcome.skips.unresolved_context += 1;
            continue;
        };

        if !ctx.is_company_total() {
            outcome.skips.dimensional += 1;
            continue;
        }

        let Some(period) = ctx.period.filter(|p| p.end_or_instant() == Some(period_end)) else {
            outcome.skips.off_period += 1;
            continue;
        };

        let Some(value) = parse_reported_value(&fact.value) else {
            outcome.skips.value_parse_errors += 1;
            continue;
        };
        outcome.rows.push(CanonicalFactRow {
            entity: entity.to_string(),
            filing_date,
            context_id: ctx.id.clone(),
            concept: fact.concept.clone(),
            value,
            period_start: period.start(),
            period_end: period.end(),
            instant: period.instant(),
        });
    }

    if outcome.skips != SelectionSkips::default() {
        tracing::debug!(
            entity,
            unresolved = outcome.skips.unresolved_context,
            dimensional = outcome.skips.dimensional,
            off_period = outcome.skips.off_period,
            value_errors = outcome.skips.value_parse_errors,
            "fact selection skips"
        );
    }

    outcome
}
