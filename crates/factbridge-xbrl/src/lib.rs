//! XBRL instance ingestion for Factbridge (boundary adapter).
//!
//! This crate sits at the **interop boundary**:
//!
//! - It parses XBRL instance documents (untrusted) from SEC 10-Q/10-K filings.
//! - It emits clean, company-wide consolidated figures (`CanonicalFactRow`).
//! - It does *not* fetch anything: network, filing-directory discovery and
//!   vendor scraping live in external callers.
//!
//! An instance document carries hundreds to thousands of tagged "facts". Each
//! fact references a **context** that determines:
//!
//! - the reporting period (startDate/endDate or instant), and
//! - dimensional qualifiers ("segments"), e.g.
//!   `us-gaap:StatementBusinessSegmentsAxis`, `srt:ProductOrServiceAxis`.
//!
//! Consolidated company totals are the facts whose context has **no**
//! dimensions and whose period end matches `dei:DocumentPeriodEndDate`, the
//! primary period of the filing. The pipeline is:
//!
//! ```text
//! xml text ──► parse_instance ──► InstanceDocument { contexts, facts }
//!                                        │
//!                 resolve_period_end ◄───┤
//!                                        ▼
//!                             select_company_totals ──► Vec<CanonicalFactRow>
//! ```
//!
//! Everything here is pure (no I/O) so it can be unit-tested against inline
//! document fixtures.

pub mod context;
pub mod inspect;
pub mod instance;
pub mod period;
pub mod select;

pub use context::{Context, ContextMap, PeriodShape};
pub use inspect::render_by_context;
pub use instance::{parse_instance, InstanceDocument, RawFact};
pub use period::{document_meta, resolve_period_end, DocumentMeta, PeriodResolutionError};
pub use select::{select_company_totals, CanonicalFactRow, SelectionOutcome, SelectionSkips};

use thiserror::Error;

/// Per-document failure: the document is unusable and must be skipped whole,
/// never partially extracted.
#[derive(Debug, Error)]
pub enum DocumentError {
    /// Structurally invalid context or fact data.
    #[error("malformed document: {0}")]
    Malformed(String),

    /// Low-level XML reader failure (also a malformed-document condition,
    /// kept separate to preserve the reader's diagnostics).
    #[error("xml error: {0}")]
    Xml(#[from] quick_xml::Error),

    /// Zero or multiple `dei:DocumentPeriodEndDate` facts.
    #[error(transparent)]
    PeriodResolution(#[from] PeriodResolutionError),
}
