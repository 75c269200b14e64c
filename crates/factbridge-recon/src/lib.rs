//! Cross-source metric reconciliation for Factbridge.
//!
//! Given many filings for one entity (extracted into canonical figures by
//! `factbridge-xbrl`) and the matching vendor-scraped statements, this crate
//! learns which free-text vendor label corresponds to which canonical
//! concept. The inference is data-driven, not semantic: two figures that
//! keep agreeing numerically across quarters are probably the same metric.
//!
//! ```text
//! filings ──► canonical figures ─┐
//!                                ├──► evidence (all-pairs rel. errors)
//! vendor json ──► label rows ────┘          │
//!                                           ▼  (frozen snapshot)
//!                               mapping synthesis ──► table + audit
//! ```
//!
//! Vendor data is rounded ("1.86B") and occasionally wrong, so single-pair
//! agreement means little; the mapping synthesizer demands repeated
//! agreement before committing, and leaves a label unmapped rather than
//! guessing.

pub mod audit;
pub mod batch;
pub mod evidence;
pub mod mapping;
pub mod vendor;

pub use audit::render_audit;
pub use batch::{
    run_batch, BatchOptions, BatchOutcome, DocumentReport, DocumentStatus, FilingDocument,
};
pub use evidence::{
    accumulate_document, relative_error, EvidenceKey, EvidenceSet, RELATIVE_ERROR_EPSILON,
};
pub use mapping::{
    synthesize_mappings, CandidateStats, LabelAudit, MappingChoice, MappingOutcome, MappingPolicy,
    MappingTable,
};
pub use vendor::{parse_vendor_amount, StatementTable, VendorLabelRow, VendorStatements};
