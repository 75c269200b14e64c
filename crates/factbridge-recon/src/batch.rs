//! Batch reconciliation driver.
//!
//! Per-document extraction (parse, resolve period, select totals, compare
//! against vendor rows) is pure and runs one task per document on the rayon
//! pool. Each task returns a *partial* evidence set; a sequential reducer
//! merges the partials, so no evidence state is shared between workers.
//! Synthesis runs once, after the merge, on the frozen evidence — the
//! collect acts as the barrier between accumulation and synthesis.
//!
//! One document's failure never aborts the batch: the document is reported
//! (entity, document id, reason) and processing continues. Duplicate
//! (entity, document id) pairs are dropped before scheduling so re-listed
//! filings cannot double-count evidence.

use crate::evidence::{accumulate_document, EvidenceSet};
use crate::mapping::{synthesize_mappings, MappingOutcome, MappingPolicy};
use crate::vendor::VendorStatements;
use chrono::NaiveDate;
use factbridge_xbrl::{
    document_meta, parse_instance, resolve_period_end, select_company_totals,
};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// One filing scheduled for extraction: identity plus raw instance XML.
/// Fetching the XML is the caller's job; nothing here touches the network.
#[derive(Debug, Clone)]
pub struct FilingDocument {
    pub entity: String,
    /// Stable per-filing id (accession number in SEC usage). Dedup key
    /// together with `entity`.
    pub document_id: String,
    /// Form type, e.g. "10-Q", if known.
    pub form: Option<String>,
    pub filing_date: NaiveDate,
    pub xml: String,
}

#[derive(Debug, Clone, Default)]
pub struct BatchOptions {
    pub policy: MappingPolicy,
    /// Cap on canonical rows per document (document order). `None` = all.
    pub fact_limit: Option<usize>,
    /// Keep only filings whose form starts with this prefix, e.g. "10-Q".
    pub form_prefix: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum DocumentStatus {
    /// Extraction succeeded. `vendor_rows == 0` means no vendor column could
    /// be aligned, so the document contributed no evidence.
    Extracted {
        rows: usize,
        vendor_rows: usize,
        vendor_period: Option<String>,
    },
    /// Document unusable or filtered; no partial output was produced.
    Skipped { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentReport {
    pub entity: String,
    pub document_id: String,
    pub status: DocumentStatus,
}

#[derive(Debug)]
pub struct BatchOutcome {
    pub mapping: MappingOutcome,
    /// One report per input document, in input order.
    pub reports: Vec<DocumentReport>,
    /// The merged evidence the mapping was synthesized from.
    pub evidence: EvidenceSet,
}

/// Run the full two-stage pipeline over a batch of filings.
pub fn run_batch(
    documents: Vec<FilingDocument>,
    vendor: &BTreeMap<String, VendorStatements>,
    options: &BatchOptions,
) -> BatchOutcome {
    // Sequential pre-pass: dedup and form filtering must see the whole list.
    let mut seen: BTreeSet<(String, String)> = BTreeSet::new();
    let tasks: Vec<Task> = documents
        .into_iter()
        .map(|doc| {
            if let Some(prefix) = &options.form_prefix {
                if !doc.form.as_deref().unwrap_or("").starts_with(prefix.as_str()) {
                    return Task::Skip {
                        entity: doc.entity,
                        document_id: doc.document_id,
                        reason: format!("form does not match filter {prefix:?}"),
                    };
                }
            }
            if !seen.insert((doc.entity.clone(), doc.document_id.clone())) {
                return Task::Skip {
                    entity: doc.entity,
                    document_id: doc.document_id,
                    reason: "duplicate (entity, document) pair".to_string(),
                };
            }
            Task::Process(Box::new(doc))
        })
        .collect();

    let results: Vec<(DocumentReport, EvidenceSet)> = tasks
        .into_par_iter()
        .map(|task| match task {
            Task::Skip {
                entity,
                document_id,
                reason,
            } => (
                DocumentReport {
                    entity,
                    document_id,
                    status: DocumentStatus::Skipped { reason },
                },
                EvidenceSet::new(),
            ),
            Task::Process(doc) => process_document(*doc, vendor, options),
        })
        .collect();

    let mut evidence = EvidenceSet::new();
    let mut reports = Vec::with_capacity(results.len());
    for (report, partial) in results {
        evidence.merge(partial);
        reports.push(report);
    }

    let mapping = synthesize_mappings(&evidence, &options.policy);
    BatchOutcome {
        mapping,
        reports,
        evidence,
    }
}

enum Task {
    Process(Box<FilingDocument>),
    Skip {
        entity: String,
        document_id: String,
        reason: String,
    },
}

/// Pure per-document task: extract canonical rows, align the vendor column,
/// and return this document's partial evidence.
fn process_document(
    doc: FilingDocument,
    vendor: &BTreeMap<String, VendorStatements>,
    options: &BatchOptions,
) -> (DocumentReport, EvidenceSet) {
    let skip = |reason: String| {
        tracing::warn!(
            entity = doc.entity.as_str(),
            document = doc.document_id.as_str(),
            reason = reason.as_str(),
            "skipping document"
        );
        (
            DocumentReport {
                entity: doc.entity.clone(),
                document_id: doc.document_id.clone(),
                status: DocumentStatus::Skipped { reason },
            },
            EvidenceSet::new(),
        )
    };

    let instance = match parse_instance(&doc.xml) {
        Ok(instance) => instance,
        Err(err) => return skip(err.to_string()),
    };

    let period_end = match resolve_period_end(&instance.facts) {
        Ok(period_end) => period_end,
        Err(err) => return skip(err.to_string()),
    };

    let outcome = select_company_totals(
        &instance.facts,
        &instance.contexts,
        &doc.entity,
        doc.filing_date,
        period_end,
        options.fact_limit,
    );

    // Vendor alignment: no vendor data is not a failure, just no evidence.
    let meta = document_meta(&instance.facts);
    let vendor_period = match (
        vendor.get(&doc.entity),
        meta.fiscal_year.as_deref(),
        meta.fiscal_period.as_deref(),
    ) {
        (Some(stmts), Some(fy), Some(fp)) => stmts
            .period_for_fiscal_focus(fy, fp)
            .map(|p| p.to_string()),
        _ => None,
    };

    let vendor_rows = match (&vendor_period, vendor.get(&doc.entity)) {
        (Some(period), Some(stmts)) => stmts.rows_for_period(&doc.entity, period),
        _ => Vec::new(),
    };

    let mut partial = EvidenceSet::new();
    accumulate_document(&mut partial, &doc.entity, &outcome.rows, &vendor_rows);

    tracing::info!(
        entity = doc.entity.as_str(),
        document = doc.document_id.as_str(),
        rows = outcome.rows.len(),
        vendor_rows = vendor_rows.len(),
        "extracted document"
    );

    (
        DocumentReport {
            entity: doc.entity,
            document_id: doc.document_id,
            status: DocumentStatus::Extracted {
                rows: outcome.rows.len(),
                vendor_rows: vendor_rows.len(),
                vendor_period,
            },
        },
        partial,
    )
}
