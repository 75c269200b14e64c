//! Streaming parser for XBRL instance documents.
//!
//! Built on `quick_xml`'s namespace-resolving reader. One pass over the
//! document collects two things:
//!
//! - every `<xbrli:context>` as a [`Context`] (the context graph), and
//! - every element carrying a `contextRef` attribute as a [`RawFact`].
//!
//! Raw namespace URIs are folded into short, stable prefixes
//! (`us-gaap:Revenues`, `dei:DocumentPeriodEndDate`) so downstream code and
//! humans read the same concept names regardless of taxonomy year.
//!
//! Policy: a duplicate context id fails the whole document with
//! [`DocumentError::Malformed`]. Context ids key the fact graph; a collision
//! means any later filtering is unreliable, so the document is rejected
//! rather than repaired.

use crate::context::{Context, ContextMap, PeriodShape};
use crate::DocumentError;
use chrono::NaiveDate;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use serde::{Deserialize, Serialize};

/// XBRL base namespaces.
pub const XBRLI_NS: &str = "http://www.xbrl.org/2003/instance";
pub const XBRLDI_NS: &str = "http://xbrl.org/2006/xbrldi";

/// One tagged value, as found in the document. Not yet filtered or
/// normalized; the value may be empty or non-numeric.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawFact {
    /// Aliased concept name, e.g. "us-gaap:Revenues".
    pub concept: String,
    /// Context id this fact references. May be dangling; the fact selector
    /// counts unresolvable references instead of failing.
    pub context_ref: String,
    /// Trimmed raw text value. Empty for nil facts.
    pub value: String,
    pub unit_ref: Option<String>,
    pub decimals: Option<String>,
}

/// The parse result for one document: the context graph plus all raw facts,
/// in document order.
#[derive(Debug, Clone, Default)]
pub struct InstanceDocument {
    pub contexts: ContextMap,
    pub facts: Vec<RawFact>,
}

/// Parse an XBRL instance document into its context graph and raw fact list.
///
/// Fails only on structural problems (unreadable XML, duplicate or nested
/// contexts, unparseable context dates). Dangling context references and
/// empty values are *not* errors here; they are counted later by the fact
/// selector.
pub fn parse_instance(xml: &str) -> Result<InstanceDocument, DocumentError> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);

    let mut contexts = ContextMap::new();
    let mut facts: Vec<RawFact> = Vec::new();

    let mut depth = 0usize;
    let mut ctx_builder: Option<ContextBuilder> = None;
    let mut fact_stack: Vec<FactBuilder> = Vec::new();

    loop {
        let (resolve, event) = reader.read_resolved_event()?;
        match event {
            Event::Start(e) => {
                depth += 1;
                let ns = resolved_ns(&resolve);
                let local = local_name_str(e.local_name().as_ref())?.to_string();

                if let Some(builder) = ctx_builder.as_mut() {
                    if ns == Some(XBRLI_NS) && local == "context" {
                        return Err(DocumentError::Malformed(format!(
                            "nested context inside context {:?}",
                            builder.ctx.id
                        )));
                    }
                    builder.child_start(ns, &local, &e)?;
                } else if ns == Some(XBRLI_NS) && local == "context" {
                    match attr(&e, "id")? {
                        Some(id) => ctx_builder = Some(ContextBuilder::new(id, depth)),
                        None => {
                            // No id means no fact can reference it; nothing to index.
                            tracing::warn!("skipping context element without id");
                        }
                    }
                } else if ns != Some(XBRLDI_NS) {
                    if let Some(context_ref) = attr(&e, "contextRef")? {
                        fact_stack.push(FactBuilder {
                            concept: concept_name(ns, &local),
                            context_ref,
                            unit_ref: attr(&e, "unitRef")?,
                            decimals: attr(&e, "decimals")?,
                            depth,
                            value: String::new(),
                        });
                    }
                }
            }
            Event::Empty(e) => {
                let ns = resolved_ns(&resolve);
                let local = local_name_str(e.local_name().as_ref())?.to_string();
                if ctx_builder.is_none() && ns != Some(XBRLDI_NS) {
                    if let Some(context_ref) = attr(&e, "contextRef")? {
                        // Self-closing facts (xsi:nil etc.) surface as empty
                        // values so the selector can count them.
                        facts.push(RawFact {
                            concept: concept_name(ns, &local),
                            context_ref,
                            value: String::new(),
                            unit_ref: attr(&e, "unitRef")?,
                            decimals: attr(&e, "decimals")?,
                        });
                    }
                }
            }
            Event::Text(t) => {
                let text = t.unescape()?;
                append_text(&mut ctx_builder, &mut fact_stack, &text);
            }
            Event::CData(t) => {
                let text = String::from_utf8_lossy(t.as_ref()).into_owned();
                append_text(&mut ctx_builder, &mut fact_stack, &text);
            }
            Event::End(_) => {
                match ctx_builder.take() {
                    Some(builder) if depth == builder.depth => {
                        let ctx = builder.finish()?;
                        if contexts.contains_key(&ctx.id) {
                            return Err(DocumentError::Malformed(format!(
                                "duplicate context id {:?}",
                                ctx.id
                            )));
                        }
                        contexts.insert(ctx.id.clone(), ctx);
                    }
                    Some(mut builder) => {
                        builder.child_end()?;
                        ctx_builder = Some(builder);
                    }
                    None => {
                        if fact_stack.last().is_some_and(|f| f.depth == depth) {
                            let f = fact_stack.pop().expect("fact builder present");
                            facts.push(RawFact {
                                concept: f.concept,
                                context_ref: f.context_ref,
                                value: f.value.trim().to_string(),
                                unit_ref: f.unit_ref,
                                decimals: f.decimals,
                            });
                        }
                    }
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(InstanceDocument { contexts, facts })
}

// ============================================================================
// Concept naming
// ============================================================================

/// Known taxonomy URI families -> short prefixes (any taxonomy year).
fn ns_alias(uri: &str) -> Option<&'static str> {
    if uri.starts_with("http://fasb.org/us-gaap/") {
        Some("us-gaap")
    } else if uri.starts_with("http://fasb.org/srt/") {
        Some("srt")
    } else if uri.starts_with("http://xbrl.sec.gov/dei/") {
        Some("dei")
    } else if uri.starts_with("http://xbrl.sec.gov/country/") {
        Some("country")
    } else if uri == XBRLDI_NS {
        Some("xbrldi")
    } else if uri == XBRLI_NS {
        Some("xbrli")
    } else {
        None
    }
}

/// "{http://fasb.org/us-gaap/2025}Revenues" -> "us-gaap:Revenues".
/// Unknown namespaces fall back to their last URI segment.
fn concept_name(ns: Option<&str>, local: &str) -> String {
    let Some(uri) = ns else {
        return local.to_string();
    };
    let prefix = ns_alias(uri)
        .map(str::to_string)
        .unwrap_or_else(|| {
            uri.rsplit(['/', '#'])
                .find(|seg| !seg.is_empty())
                .unwrap_or(uri)
                .to_string()
        });
    if prefix.is_empty() {
        local.to_string()
    } else {
        format!("{prefix}:{local}")
    }
}

// ============================================================================
// Builders
// ============================================================================

#[derive(Debug)]
struct FactBuilder {
    concept: String,
    context_ref: String,
    unit_ref: Option<String>,
    decimals: Option<String>,
    depth: usize,
    value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateField {
    Start,
    End,
    Instant,
}

#[derive(Debug)]
enum Pending {
    Date(DateField, String),
    Dimension { axis: String, member: String },
}

#[derive(Debug)]
struct ContextBuilder {
    ctx: Context,
    depth: usize,
    start_date: Option<String>,
    end_date: Option<String>,
    instant: Option<String>,
    pending: Option<Pending>,
}

impl ContextBuilder {
    fn new(id: String, depth: usize) -> Self {
        Self {
            ctx: Context::new(id),
            depth,
            start_date: None,
            end_date: None,
            instant: None,
            pending: None,
        }
    }

    fn child_start(
        &mut self,
        ns: Option<&str>,
        local: &str,
        e: &BytesStart<'_>,
    ) -> Result<(), DocumentError> {
        if ns == Some(XBRLI_NS) {
            let field = match local {
                "startDate" => Some(DateField::Start),
                "endDate" => Some(DateField::End),
                "instant" => Some(DateField::Instant),
                _ => None,
            };
            if let Some(field) = field {
                self.pending = Some(Pending::Date(field, String::new()));
            }
        } else if ns == Some(XBRLDI_NS) && local == "explicitMember" {
            if let Some(axis) = attr(e, "dimension")? {
                self.pending = Some(Pending::Dimension {
                    axis,
                    member: String::new(),
                });
            }
        }
        Ok(())
    }

    fn text(&mut self, text: &str) {
        match self.pending.as_mut() {
            Some(Pending::Date(_, buf)) => buf.push_str(text.trim()),
            Some(Pending::Dimension { member, .. }) => member.push_str(text.trim()),
            None => {}
        }
    }

    fn child_end(&mut self) -> Result<(), DocumentError> {
        match self.pending.take() {
            Some(Pending::Date(field, buf)) => {
                let slot = match field {
                    DateField::Start => &mut self.start_date,
                    DateField::End => &mut self.end_date,
                    DateField::Instant => &mut self.instant,
                };
                *slot = Some(buf);
            }
            Some(Pending::Dimension { axis, member }) => {
                if !member.is_empty() {
                    // Later members win on a repeated axis, like the last
                    // assignment in a flat key/value walk.
                    self.ctx.dimensions.insert(axis, member);
                }
            }
            None => {}
        }
        Ok(())
    }

    fn finish(self) -> Result<Context, DocumentError> {
        let id = self.ctx.id.clone();
        let parse = |raw: &str| -> Result<NaiveDate, DocumentError> {
            NaiveDate::parse_from_str(raw.trim(), "%Y-%m-%d").map_err(|_| {
                DocumentError::Malformed(format!(
                    "unparseable date {raw:?} in context {id:?}"
                ))
            })
        };

        let mut ctx = self.ctx;
        // An instant wins over stray duration dates; a context should carry
        // exactly one shape.
        ctx.period = if let Some(raw) = &self.instant {
            Some(PeriodShape::Instant(parse(raw)?))
        } else if self.start_date.is_some() || self.end_date.is_some() {
            Some(PeriodShape::Duration {
                start: self.start_date.as_deref().map(&parse).transpose()?,
                end: self.end_date.as_deref().map(&parse).transpose()?,
            })
        } else {
            None
        };
        Ok(ctx)
    }
}

fn append_text(
    ctx_builder: &mut Option<ContextBuilder>,
    fact_stack: &mut [FactBuilder],
    text: &str,
) {
    if let Some(builder) = ctx_builder.as_mut() {
        builder.text(text);
    } else if let Some(fact) = fact_stack.last_mut() {
        fact.value.push_str(text.trim());
    }
}

// ============================================================================
// Low-level helpers
// ============================================================================

fn resolved_ns<'a>(resolve: &'a ResolveResult<'_>) -> Option<&'a str> {
    match resolve {
        ResolveResult::Bound(Namespace(ns)) => std::str::from_utf8(ns).ok(),
        _ => None,
    }
}

fn local_name_str(bytes: &[u8]) -> Result<&str, DocumentError> {
    std::str::from_utf8(bytes)
        .map_err(|_| DocumentError::Malformed("non-utf8 element name".to_string()))
}

fn attr(e: &BytesStart<'_>, name: &str) -> Result<Option<String>, DocumentError> {
    let found = e.try_get_attribute(name).map_err(|err| {
        DocumentError::Malformed(format!(
            "bad attribute on <{}>: {err}",
            String::from_utf8_lossy(e.name().as_ref())
        ))
    })?;
    match found {
        Some(a) => Ok(Some(a.unescape_value()?.into_owned())),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="utf-8"?>
<xbrl xmlns="http://www.xbrl.org/2003/instance"
      xmlns:xbrldi="http://xbrl.org/2006/xbrldi"
      xmlns:dei="http://xbrl.sec.gov/dei/2024"
      xmlns:us-gaap="http://fasb.org/us-gaap/2024"
      xmlns:srt="http://fasb.org/srt/2024">
  <context id="c-1">
    <entity><identifier scheme="http://www.sec.gov/CIK">0000320193</identifier></entity>
    <period><startDate>2024-07-01</startDate><endDate>2024-09-30</endDate></period>
  </context>
  <context id="c-2">
    <entity>
      <identifier scheme="http://www.sec.gov/CIK">0000320193</identifier>
      <segment>
        <xbrldi:explicitMember dimension="srt:StatementGeographicalAxis">country:US</xbrldi:explicitMember>
      </segment>
    </entity>
    <period><startDate>2024-07-01</startDate><endDate>2024-09-30</endDate></period>
  </context>
  <context id="c-3">
    <entity><identifier scheme="http://www.sec.gov/CIK">0000320193</identifier></entity>
    <period><instant>2024-09-30</instant></period>
  </context>
  <dei:DocumentPeriodEndDate contextRef="c-1">2024-09-30</dei:DocumentPeriodEndDate>
  <us-gaap:Revenues contextRef="c-1" unitRef="usd" decimals="-6">100</us-gaap:Revenues>
  <us-gaap:Revenues contextRef="c-2" unitRef="usd" decimals="-6">60</us-gaap:Revenues>
  <us-gaap:Assets contextRef="c-3" unitRef="usd">500</us-gaap:Assets>
</xbrl>"#;

    fn d(s: &str) -> chrono::NaiveDate {
        s.parse().expect("date literal")
    }

    #[test]
    fn parses_contexts_with_periods_and_dimensions() {
        let doc = parse_instance(SAMPLE).expect("parse");
        assert_eq!(doc.contexts.len(), 3);

        let c1 = &doc.contexts["c-1"];
        assert!(c1.is_company_total());
        assert_eq!(c1.end_or_instant(), Some(d("2024-09-30")));

        let c2 = &doc.contexts["c-2"];
        assert!(!c2.is_company_total());
        assert_eq!(
            c2.dimensions.get("srt:StatementGeographicalAxis"),
            Some(&"country:US".to_string())
        );

        let c3 = &doc.contexts["c-3"];
        assert_eq!(
            c3.period,
            Some(PeriodShape::Instant(d("2024-09-30")))
        );
    }

    #[test]
    fn collects_facts_with_aliased_concepts_in_document_order() {
        let doc = parse_instance(SAMPLE).expect("parse");
        let concepts: Vec<&str> = doc.facts.iter().map(|f| f.concept.as_str()).collect();
        assert_eq!(
            concepts,
            vec![
                "dei:DocumentPeriodEndDate",
                "us-gaap:Revenues",
                "us-gaap:Revenues",
                "us-gaap:Assets",
            ]
        );

        let revenue = &doc.facts[1];
        assert_eq!(revenue.context_ref, "c-1");
        assert_eq!(revenue.value, "100");
        assert_eq!(revenue.unit_ref.as_deref(), Some("usd"));
        assert_eq!(revenue.decimals.as_deref(), Some("-6"));
    }

    #[test]
    fn duplicate_context_id_is_malformed() {
        let xml = r#"<xbrl xmlns="http://www.xbrl.org/2003/instance">
  <context id="c-1"><period><instant>2024-09-30</instant></period></context>
  <context id="c-1"><period><instant>2024-06-30</instant></period></context>
</xbrl>"#;
        let err = parse_instance(xml).expect_err("duplicate id must fail");
        assert!(matches!(err, DocumentError::Malformed(_)), "{err}");
        assert!(err.to_string().contains("duplicate context id"));
    }

    #[test]
    fn nested_context_is_malformed() {
        let nested = r#"<xbrl xmlns="http://www.xbrl.org/2003/instance">
  <context id="outer"><context id="inner"><period><instant>2024-09-30</instant></period></context></context>
</xbrl>"#;
        let err = parse_instance(nested).expect_err("nested context must fail");
        assert!(err.to_string().contains("nested context"));
    }

    #[test]
    fn unparseable_context_date_is_malformed() {
        let xml = r#"<xbrl xmlns="http://www.xbrl.org/2003/instance">
  <context id="c-1"><period><instant>Sept 30, 2024</instant></period></context>
</xbrl>"#;
        let err = parse_instance(xml).expect_err("bad date must fail");
        assert!(err.to_string().contains("unparseable date"));
    }

    #[test]
    fn nil_fact_surfaces_with_empty_value() {
        let xml = r#"<xbrl xmlns="http://www.xbrl.org/2003/instance"
      xmlns:us-gaap="http://fasb.org/us-gaap/2024">
  <context id="c-1"><period><instant>2024-09-30</instant></period></context>
  <us-gaap:Goodwill contextRef="c-1"/>
</xbrl>"#;
        let doc = parse_instance(xml).expect("parse");
        assert_eq!(doc.facts.len(), 1);
        assert_eq!(doc.facts[0].concept, "us-gaap:Goodwill");
        assert_eq!(doc.facts[0].value, "");
    }

    #[test]
    fn unknown_namespace_falls_back_to_last_uri_segment() {
        assert_eq!(
            concept_name(Some("http://www.example.com/20240930"), "CustomTag"),
            "20240930:CustomTag"
        );
        assert_eq!(concept_name(None, "Bare"), "Bare");
    }
}
