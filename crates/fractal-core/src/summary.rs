//! Structured agent payloads: summaries, graph extractions, merge verdicts.
//!
//! These types parse model output, so they are deliberately lenient: the
//! summarizer emits upper-case section keys (`FACTS`, `OPEN QUESTIONS`), the
//! graph-builder sometimes says `source`/`target` instead of
//! `from_entity`/`to_entity`, and confidence scores default to 1.0. Anything
//! that still fails to parse is a `MalformedAgentOutput` at the call site.

use serde::{Deserialize, Serialize};
use serde_json::Value;

fn default_confidence() -> f64 {
    1.0
}

/// A single distilled fact, tagged with the node that produced it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    /// The fact itself.
    pub fact: String,
    /// Node ID the fact originated from.
    #[serde(default)]
    pub source_node: Option<String>,
    /// Model confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    /// When the fact was established, if the model reported it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// A distilled decision with optional rationale.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    /// The decision itself.
    pub decision: String,
    /// Node ID the decision originated from.
    #[serde(default)]
    pub source_node: Option<String>,
    /// Why the decision was taken, if captured.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,
    /// Model confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

/// Versioned structured distillation of a node's content.
///
/// Wire form accepts both snake_case and the upper-case section keys the
/// summarizer prompt asks for.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SummaryPayload {
    /// Established facts.
    #[serde(default, alias = "FACTS")]
    pub facts: Vec<Fact>,
    /// Decisions taken.
    #[serde(default, alias = "DECISIONS")]
    pub decisions: Vec<Decision>,
    /// Unresolved questions, free-form.
    #[serde(default, alias = "OPEN QUESTIONS", alias = "OPEN_QUESTIONS")]
    pub open_questions: Vec<String>,
    /// Generation metadata (message counts, key topics, generating model).
    #[serde(default, alias = "METADATA", skip_serializing_if = "Value::is_null")]
    pub metadata: Value,
}

impl SummaryPayload {
    /// Parse summarizer output. The text must be a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// True when the summary carries no facts, decisions, or questions.
    pub fn is_empty(&self) -> bool {
        self.facts.is_empty() && self.decisions.is_empty() && self.open_questions.is_empty()
    }
}

/// One extracted relation from the graph-builder.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ExtractedRelation {
    /// Source entity name.
    #[serde(alias = "source", alias = "from")]
    pub from_entity: String,
    /// Target entity name.
    #[serde(alias = "target", alias = "to")]
    pub to_entity: String,
    /// Relation type (e.g. USES, REQUIRES). Defaults to RELATED.
    #[serde(default = "default_relation", alias = "type")]
    pub relation_type: String,
    /// Model confidence in [0, 1].
    #[serde(default = "default_confidence")]
    pub confidence: f64,
}

fn default_relation() -> String {
    "RELATED".to_string()
}

/// Parsed graph-builder output.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphExtraction {
    /// Entity names mentioned (informational; edges are what get stored).
    #[serde(default)]
    pub entities: Vec<String>,
    /// Relations to store as edges.
    #[serde(default)]
    pub relations: Vec<ExtractedRelation>,
}

impl GraphExtraction {
    /// Parse graph-builder output. Relations missing either endpoint are
    /// dropped rather than failing the whole extraction.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        let raw: Value = serde_json::from_str(text)?;
        let entities = raw
            .get("entities")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|e| match e {
                        Value::String(s) => Some(s.clone()),
                        Value::Object(o) => {
                            o.get("name").and_then(Value::as_str).map(String::from)
                        }
                        _ => None,
                    })
                    .collect()
            })
            .unwrap_or_default();
        let relations = raw
            .get("relations")
            .and_then(Value::as_array)
            .map(|arr| {
                arr.iter()
                    .filter_map(|r| serde_json::from_value::<ExtractedRelation>(r.clone()).ok())
                    .filter(|r| !r.from_entity.is_empty() && !r.to_entity.is_empty())
                    .collect()
            })
            .unwrap_or_default();
        Ok(Self { entities, relations })
    }
}

/// Parsed merge-arbiter output.
///
/// Conflicts are opaque JSON: the contract is "flag, don't resolve", and the
/// arbiter's conflict shape is model-dependent.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeVerdict {
    /// The new summary for the merge target.
    #[serde(default)]
    pub updated_target_summary: SummaryPayload,
    /// Unresolved contradictions, returned to the caller untouched.
    #[serde(default)]
    pub conflicts: Vec<Value>,
}

impl MergeVerdict {
    /// Parse merge-arbiter output. The text must be a JSON object.
    pub fn parse(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}
