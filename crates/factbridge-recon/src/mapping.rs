//! Mapping synthesis: reduce accumulated evidence into one best-guess
//! label->concept mapping per entity.
//!
//! A full reduction over a frozen evidence snapshot, recomputed per run.
//! For each (entity, label) the candidate concepts are ranked by mean
//! relative error; a candidate qualifies only if it has enough samples and
//! its mean error is under the policy ceiling. No qualifying candidate means
//! the label stays unmapped — an expected output, never defaulted to a
//! guess.
//!
//! Tie-break: candidate means within `tie_epsilon` of the best qualifying
//! mean are considered equal and the lexically smallest concept name wins.
//! The rule is deliberate; silent non-determinism here would make runs
//! irreproducible.

use crate::evidence::EvidenceSet;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Confidence policy for accepting a label->concept mapping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MappingPolicy {
    /// Minimum number of relative-error samples (documents) for a candidate.
    pub min_samples: usize,
    /// Maximum acceptable mean relative error, e.g. 0.02 for 2%.
    pub max_mean_error: f64,
    /// Mean errors closer than this are treated as tied.
    pub tie_epsilon: f64,
}

impl Default for MappingPolicy {
    fn default() -> Self {
        Self {
            min_samples: 3,
            max_mean_error: 0.02,
            tie_epsilon: 1e-9,
        }
    }
}

/// Aggregate evidence for one candidate concept under one label.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateStats {
    pub concept: String,
    pub sample_count: usize,
    pub mean_error: f64,
}

/// An accepted mapping and the evidence that justified it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingChoice {
    pub concept: String,
    pub confidence_mean_error: f64,
    pub sample_count: usize,
}

/// Human-inspectable record of one label's resolution: the choice (if any)
/// plus every competing candidate and its errors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LabelAudit {
    pub entity: String,
    pub label: String,
    /// `None` when no candidate met the policy (insufficient evidence).
    pub chosen: Option<MappingChoice>,
    /// All candidates, best mean error first.
    pub candidates: Vec<CandidateStats>,
}

/// entity -> vendor label -> chosen concept. The terminal artifact,
/// serializable as nested JSON.
pub type MappingTable = BTreeMap<String, BTreeMap<String, MappingChoice>>;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MappingOutcome {
    pub table: MappingTable,
    /// One audit entry per (entity, label) seen in evidence, including
    /// unmapped labels.
    pub audits: Vec<LabelAudit>,
}

/// Reduce a frozen evidence set into per-entity mappings plus audit records.
/// Deterministic: same evidence, same output, tie-breaks included.
pub fn synthesize_mappings(evidence: &EvidenceSet, policy: &MappingPolicy) -> MappingOutcome {
    // Evidence iterates ordered by (entity, label, concept), so labels form
    // contiguous runs.
    let mut groups: BTreeMap<(String, String), Vec<CandidateStats>> = BTreeMap::new();
    for (key, errors) in evidence.iter() {
        if errors.is_empty() {
            continue;
        }
        let mean = errors.iter().sum::<f64>() / errors.len() as f64;
        groups
            .entry((key.entity.clone(), key.label.clone()))
            .or_default()
            .push(CandidateStats {
                concept: key.concept.clone(),
                sample_count: errors.len(),
                mean_error: mean,
            });
    }

    let mut outcome = MappingOutcome::default();
    for ((entity, label), mut candidates) in groups {
        candidates.sort_by(|a, b| {
            a.mean_error
                .total_cmp(&b.mean_error)
                .then_with(|| a.concept.cmp(&b.concept))
        });

        let chosen = choose(&candidates, policy);
        if let Some(choice) = &chosen {
            outcome
                .table
                .entry(entity.clone())
                .or_default()
                .insert(label.clone(), choice.clone());
        } else {
            tracing::debug!(
                entity = entity.as_str(),
                label = label.as_str(),
                "no candidate met the confidence policy"
            );
        }

        outcome.audits.push(LabelAudit {
            entity,
            label,
            chosen,
            candidates,
        });
    }
    outcome
}

/// Pick the best qualifying candidate from a mean-error-sorted slice.
fn choose(candidates: &[CandidateStats], policy: &MappingPolicy) -> Option<MappingChoice> {
    let qualifying: Vec<&CandidateStats> = candidates
        .iter()
        .filter(|c| c.sample_count >= policy.min_samples && c.mean_error <= policy.max_mean_error)
        .collect();

    let best_mean = qualifying.first()?.mean_error;
    qualifying
        .iter()
        .filter(|c| c.mean_error <= best_mean + policy.tie_epsilon)
        .min_by(|a, b| a.concept.cmp(&b.concept))
        .map(|c| MappingChoice {
            concept: c.concept.clone(),
            confidence_mean_error: c.mean_error,
            sample_count: c.sample_count,
        })
}
