//! Text rendering of mapping audit records.
//!
//! One block per (entity, label), listing the chosen concept and every
//! competing candidate with its sample count and mean error. Meant for
//! manual review of the inferred mapping, alongside the JSON table.

use crate::mapping::LabelAudit;
use std::fmt::Write;

/// Render audit records as a reviewable text report, one block per label.
pub fn render_audit(audits: &[LabelAudit]) -> String {
    let mut out = String::new();
    for audit in audits {
        let _ = writeln!(out, "===========================================");
        let _ = writeln!(out, " ENTITY: {} | LABEL: {}", audit.entity, audit.label);
        let _ = writeln!(out, "===========================================");

        match &audit.chosen {
            Some(choice) => {
                let _ = writeln!(
                    out,
                    " chosen: {}  (mean_err={:.2}%, samples={})",
                    choice.concept,
                    choice.confidence_mean_error * 100.0,
                    choice.sample_count,
                );
            }
            None => {
                let _ = writeln!(out, " chosen: (unmapped - no candidate met the policy)");
            }
        }

        let _ = writeln!(out, " candidates:");
        for c in &audit.candidates {
            let _ = writeln!(
                out,
                "   {:60} mean_err={:6.2}%  samples={}",
                c.concept,
                c.mean_error * 100.0,
                c.sample_count,
            );
        }
        let _ = writeln!(out);
    }
    out
}
