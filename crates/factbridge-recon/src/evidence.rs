//! Numeric-agreement evidence between canonical concepts and vendor labels.
//!
//! The correct label->concept correspondence is unknown a priori, so every
//! document contributes an exhaustive comparison: each canonical figure
//! against each vendor figure, all-pairs. The relative error of each pair is
//! appended under an explicit composite key. No error-magnitude filtering
//! happens here; the mapping synthesizer judges the whole record.
//!
//! Evidence sets are append-only and mergeable, so parallel workers can each
//! fill a partial set over their documents and a reducer concatenates the
//! per-key sequences afterwards. Deduplication of repeated (entity,
//! document) pairs is the scheduler's responsibility, not this module's.

use crate::vendor::VendorLabelRow;
use factbridge_xbrl::CanonicalFactRow;
use std::collections::BTreeMap;

/// Guard against division by values rounding to zero.
pub const RELATIVE_ERROR_EPSILON: f64 = 1e-9;

/// Composite evidence key: which entity's vendor label is being compared to
/// which canonical concept.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct EvidenceKey {
    pub entity: String,
    pub label: String,
    pub concept: String,
}

/// Accumulated relative-error samples, keyed by (entity, label, concept).
/// Owned by one reconciliation run; never persisted incrementally.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceSet {
    samples: BTreeMap<EvidenceKey, Vec<f64>>,
}

impl EvidenceSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append one relative-error sample.
    pub fn record(&mut self, key: EvidenceKey, relative_error: f64) {
        self.samples.entry(key).or_default().push(relative_error);
    }

    /// Concatenate another set's per-key sequences into this one. Sample
    /// order within a key follows merge order, which the synthesizer does
    /// not depend on.
    pub fn merge(&mut self, other: EvidenceSet) {
        for (key, mut errs) in other.samples {
            self.samples.entry(key).or_default().append(&mut errs);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn get(&self, key: &EvidenceKey) -> Option<&[f64]> {
        self.samples.get(key).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&EvidenceKey, &[f64])> {
        self.samples.iter().map(|(k, v)| (k, v.as_slice()))
    }
}

/// Relative error of a vendor figure against a canonical one.
pub fn relative_error(canonical: f64, vendor: f64) -> f64 {
    (canonical - vendor).abs() / canonical.abs().max(RELATIVE_ERROR_EPSILON)
}

/// Accumulate one document's evidence: all canonical concepts against all
/// vendor labels for the same entity and period. Zero values on either side
/// carry no agreement signal and are skipped.
///
/// Duplicate concepts in the canonical rows collapse to the last value, so
/// each concept contributes at most one sample per label per document.
pub fn accumulate_document(
    evidence: &mut EvidenceSet,
    entity: &str,
    canonical: &[CanonicalFactRow],
    vendor: &[VendorLabelRow],
) {
    let mut by_concept: BTreeMap<&str, f64> = BTreeMap::new();
    for row in canonical {
        by_concept.insert(row.concept.as_str(), row.value);
    }

    for (concept, sec_value) in &by_concept {
        if *sec_value == 0.0 {
            continue;
        }
        for v in vendor {
            if v.value == 0.0 {
                continue;
            }
            evidence.record(
                EvidenceKey {
                    entity: entity.to_string(),
                    label: v.label.clone(),
                    concept: concept.to_string(),
                },
                relative_error(*sec_value, v.value),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn canonical(concept: &str, value: f64) -> CanonicalFactRow {
        CanonicalFactRow {
            entity: "T".into(),
            filing_date: NaiveDate::from_ymd_opt(2024, 11, 1).unwrap(),
            context_id: "c-1".into(),
            concept: concept.into(),
            value,
            period_start: None,
            period_end: NaiveDate::from_ymd_opt(2024, 9, 30),
            instant: None,
        }
    }

    fn vendor(label: &str, value: f64) -> VendorLabelRow {
        VendorLabelRow {
            entity: "T".into(),
            period: "Jul 2024 (FQ3)".into(),
            label: label.into(),
            value,
        }
    }

    #[test]
    fn relative_error_is_normalized_by_canonical_magnitude() {
        assert_relative_eq!(relative_error(100.0, 101.0), 0.01);
        assert_relative_eq!(relative_error(-100.0, -90.0), 0.10);
        // Epsilon guard keeps tiny canonical values finite.
        assert!(relative_error(0.0_f64.max(1e-30), 1.0).is_finite());
    }

    #[test]
    fn accumulates_all_pairs_skipping_zeros() {
        let mut evidence = EvidenceSet::new();
        let canonical_rows = vec![
            canonical("us-gaap:Revenues", 100.0),
            canonical("us-gaap:NetIncomeLoss", 0.0),
        ];
        let vendor_rows = vec![vendor("Total Revenue", 101.0), vendor("Net Profit", 0.0)];

        accumulate_document(&mut evidence, "T", &canonical_rows, &vendor_rows);

        // 1 non-zero concept x 1 non-zero label.
        assert_eq!(evidence.len(), 1);
        let errs = evidence
            .get(&EvidenceKey {
                entity: "T".into(),
                label: "Total Revenue".into(),
                concept: "us-gaap:Revenues".into(),
            })
            .expect("sample recorded");
        assert_eq!(errs.len(), 1);
        assert_relative_eq!(errs[0], 0.01);
    }

    #[test]
    fn duplicate_concepts_collapse_to_last_value() {
        let mut evidence = EvidenceSet::new();
        let canonical_rows = vec![
            canonical("us-gaap:Revenues", 90.0),
            canonical("us-gaap:Revenues", 100.0),
        ];
        let vendor_rows = vec![vendor("Total Revenue", 100.0)];
        accumulate_document(&mut evidence, "T", &canonical_rows, &vendor_rows);

        let errs = evidence
            .get(&EvidenceKey {
                entity: "T".into(),
                label: "Total Revenue".into(),
                concept: "us-gaap:Revenues".into(),
            })
            .expect("sample recorded");
        assert_relative_eq!(errs[0], 0.0);
    }

    #[test]
    fn merge_concatenates_per_key_sequences() {
        let key = EvidenceKey {
            entity: "T".into(),
            label: "Total Revenue".into(),
            concept: "us-gaap:Revenues".into(),
        };

        let mut a = EvidenceSet::new();
        a.record(key.clone(), 0.01);
        let mut b = EvidenceSet::new();
        b.record(key.clone(), 0.02);
        b.record(
            EvidenceKey {
                entity: "T".into(),
                label: "Net Profit".into(),
                concept: "us-gaap:NetIncomeLoss".into(),
            },
            0.3,
        );

        a.merge(b);
        assert_eq!(a.len(), 2);
        assert_eq!(a.get(&key), Some(&[0.01, 0.02][..]));
    }

    #[test]
    fn parallel_partials_match_sequential_accumulation() {
        let docs = [
            (vec![canonical("us-gaap:Revenues", 100.0)], vec![vendor("Total Revenue", 101.0)]),
            (vec![canonical("us-gaap:Revenues", 200.0)], vec![vendor("Total Revenue", 204.0)]),
        ];

        let mut sequential = EvidenceSet::new();
        for (c, v) in &docs {
            accumulate_document(&mut sequential, "T", c, v);
        }

        let mut merged = EvidenceSet::new();
        for (c, v) in &docs {
            let mut partial = EvidenceSet::new();
            accumulate_document(&mut partial, "T", c, v);
            merged.merge(partial);
        }

        assert_eq!(sequential, merged);
    }
}
