//! Context records: the per-document metadata graph that gives facts meaning.
//!
//! A context couples a reporting period with zero or more dimension
//! qualifiers. The absence of qualifiers is what marks a context as a
//! company-wide total; any qualifier scopes it to a segment, product line,
//! geography or consolidation adjustment, and such contexts are excluded
//! from consolidated output.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Period shape of a context: a point in time or a date range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PeriodShape {
    Instant(NaiveDate),
    Duration {
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    },
}

impl PeriodShape {
    /// The date that identifies the period for main-period matching:
    /// the end date for durations, the instant date otherwise.
    pub fn end_or_instant(&self) -> Option<NaiveDate> {
        match self {
            PeriodShape::Instant(d) => Some(*d),
            PeriodShape::Duration { end, .. } => *end,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            PeriodShape::Instant(_) => None,
            PeriodShape::Duration { start, .. } => *start,
        }
    }

    pub fn end(&self) -> Option<NaiveDate> {
        match self {
            PeriodShape::Instant(_) => None,
            PeriodShape::Duration { end, .. } => *end,
        }
    }

    pub fn instant(&self) -> Option<NaiveDate> {
        match self {
            PeriodShape::Instant(d) => Some(*d),
            PeriodShape::Duration { .. } => None,
        }
    }
}

/// One `<xbrli:context>` from the instance document.
///
/// Example source:
///
/// ```text
/// <context id="c-3">
///   <entity>
///     <identifier>0001234567</identifier>
///     <segment>
///       <xbrldi:explicitMember dimension="srt:ProductOrServiceAxis">
///         us-gaap:ProductMember
///       </xbrldi:explicitMember>
///     </segment>
///   </entity>
///   <period>
///     <startDate>2025-05-01</startDate>
///     <endDate>2025-07-31</endDate>
///   </period>
/// </context>
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Context {
    pub id: String,
    pub period: Option<PeriodShape>,
    /// axis -> member, e.g. "srt:ProductOrServiceAxis" -> "us-gaap:ProductMember".
    /// BTreeMap so iteration (and serialized output) is deterministic.
    pub dimensions: BTreeMap<String, String>,
}

impl Context {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            period: None,
            dimensions: BTreeMap::new(),
        }
    }

    /// A context represents company-wide consolidated totals iff it has no
    /// dimension qualifiers. Qualifiers split figures into segments.
    pub fn is_company_total(&self) -> bool {
        self.dimensions.is_empty()
    }

    pub fn end_or_instant(&self) -> Option<NaiveDate> {
        self.period.and_then(|p| p.end_or_instant())
    }
}

/// context id -> Context. BTreeMap keeps lookups and iteration deterministic.
pub type ContextMap = BTreeMap<String, Context>;
