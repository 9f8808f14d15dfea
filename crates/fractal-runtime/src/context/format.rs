//! Prompt-injection formatting helpers.
//!
//! Everything here is pure string building over stored state. The one
//! interesting function is [`extract_key_points`]: it reduces a full summary
//! to facts and decisions only, which is what bounds chat prompt growth as
//! trees get deep — ancestors contribute key points, never whole summaries.

use serde_json::Value;

use fractal_store::row_types::{EdgeRow, MessageRow};

/// Pretty-print a summary payload for prompt injection.
pub fn format_summary(summary: &Value) -> String {
    serde_json::to_string_pretty(summary).unwrap_or_else(|_| summary.to_string())
}

/// Render edges as readable triples: `A --[USES]--> B (conf: 0.9)`.
pub fn format_graph(edges: &[EdgeRow]) -> String {
    edges
        .iter()
        .map(|e| {
            format!(
                "{} --[{}]--> {} (conf: {})",
                e.from_entity, e.relation_type, e.to_entity, e.confidence
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render messages as `[role]: content` lines.
pub fn format_messages(messages: &[MessageRow]) -> String {
    messages
        .iter()
        .map(|m| format!("[{}]: {}", m.role, m.content))
        .collect::<Vec<_>>()
        .join("\n")
}

fn section_items<'a>(summary: &'a Value, keys: &[&str]) -> Option<&'a Vec<Value>> {
    keys.iter().find_map(|k| summary.get(k).and_then(Value::as_array))
}

/// Reduce a summary to facts and decisions as a short compressed string.
///
/// Open questions and metadata are deliberately dropped. Falls back to the
/// raw JSON when the summary has neither section.
pub fn extract_key_points(summary: &Value) -> String {
    let mut lines = Vec::new();

    if let Some(facts) = section_items(summary, &["facts", "FACTS"]) {
        for fact in facts {
            let text = fact
                .get("fact")
                .and_then(Value::as_str)
                .map_or_else(|| fact.to_string(), String::from);
            lines.push(format!("- {text}"));
        }
    }
    if let Some(decisions) = section_items(summary, &["decisions", "DECISIONS"]) {
        for decision in decisions {
            let text = decision
                .get("decision")
                .and_then(Value::as_str)
                .map_or_else(|| decision.to_string(), String::from);
            lines.push(format!("- [DECISION] {text}"));
        }
    }

    if lines.is_empty() {
        return summary.to_string();
    }
    lines.join("\n")
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
