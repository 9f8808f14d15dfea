//! Graph extraction plumbing: lenient model output → edge specs, and the
//! outcome types the summarize operation reports.
//!
//! The transactional halves of the merge engine (skip-duplicate insert,
//! confidence boost + re-attribution on merge, soft delete on node delete)
//! live in `fractal_store::WorkspaceStore`; this module owns the shapes that
//! cross the agent boundary.

use fractal_core::summary::GraphExtraction;
use fractal_store::store::EdgeSpec;

/// Convert parsed graph-builder relations into storable edge specs.
pub fn edge_specs(extraction: &GraphExtraction) -> Vec<EdgeSpec> {
    extraction
        .relations
        .iter()
        .map(|r| EdgeSpec {
            from_entity: r.from_entity.clone(),
            to_entity: r.to_entity.clone(),
            relation_type: r.relation_type.clone(),
            confidence: r.confidence,
        })
        .collect()
}

/// Counts from a successful graph extraction pass.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GraphUpdate {
    /// Entities the model mentioned.
    pub entities: usize,
    /// New edges inserted.
    pub relations_added: usize,
    /// Relations skipped as already-known duplicates.
    pub skipped: usize,
}

/// How the graph-extraction sub-step of summarize ended.
///
/// A `Failed` outcome never implies anything about the summary — the summary
/// is committed before extraction starts.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GraphOutcome {
    /// Extraction ran and edges were stored.
    Success(GraphUpdate),
    /// Extraction failed after the summary was committed.
    Failed {
        /// What went wrong, suitable for surfacing to the caller.
        error: String,
    },
}

impl GraphOutcome {
    /// True when the enclosing summarize succeeded only partially.
    pub fn is_degraded(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}
