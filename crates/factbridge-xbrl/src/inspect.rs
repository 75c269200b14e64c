//! Human-readable inspection of extracted rows, grouped by context.
//!
//! Diagnostic output for manual review of a single document; not part of the
//! batch artifacts. Returns a string so callers decide where it goes.

use crate::context::ContextMap;
use crate::select::CanonicalFactRow;
use std::collections::BTreeMap;
use std::fmt::Write;

/// Render extracted rows grouped by context id, with each context's period,
/// dimensions and up to `max_facts_per_ctx` fact lines.
pub fn render_by_context(
    rows: &[CanonicalFactRow],
    contexts: &ContextMap,
    max_facts_per_ctx: usize,
) -> String {
    let mut grouped: BTreeMap<&str, Vec<&CanonicalFactRow>> = BTreeMap::new();
    for row in rows {
        grouped.entry(row.context_id.as_str()).or_default().push(row);
    }

    let mut out = String::new();
    for (ctx_id, facts) in grouped {
        let _ = writeln!(out, "\n=== CONTEXT {ctx_id} ===");
        match contexts.get(ctx_id) {
            Some(ctx) => {
                let _ = writeln!(
                    out,
                    "  start={:?}  end={:?}  instant={:?}",
                    ctx.period.and_then(|p| p.start()),
                    ctx.period.and_then(|p| p.end()),
                    ctx.period.and_then(|p| p.instant()),
                );
                if ctx.dimensions.is_empty() {
                    let _ = writeln!(out, "  dims: (no dimensions)");
                } else {
                    let dims = ctx
                        .dimensions
                        .iter()
                        .map(|(axis, member)| format!("{axis}={member}"))
                        .collect::<Vec<_>>()
                        .join("; ");
                    let _ = writeln!(out, "  dims: {dims}");
                }
            }
            None => {
                let _ = writeln!(out, "  (context not in map)");
            }
        }

        let _ = writeln!(out, "  facts:");
        for row in facts.iter().take(max_facts_per_ctx) {
            let _ = writeln!(out, "    {:80} {:>15.2}", row.concept, row.value);
        }
        if facts.len() > max_facts_per_ctx {
            let _ = writeln!(out, "    ... ({} more)", facts.len() - max_facts_per_ctx);
        }
    }
    out
}
