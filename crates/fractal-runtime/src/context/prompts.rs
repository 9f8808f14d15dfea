//! Role-specific system prompt templates.
//!
//! Templates use `{placeholder}` sections filled by the assembler. The
//! wording is part of the engine's behavior contract with the local models:
//! the summarizer and graph-builder are told to answer in bare JSON, and the
//! arbiter is told to flag conflicts rather than resolve them.

/// Chat (reasoner/explorer) system prompt.
pub const CHAT_SYSTEM_PROMPT: &str = "\
You are an AI assistant helping with project exploration in a branching conversation system.

CONTEXT HIERARCHY:
1. Inherited Context (compressed ancestor summaries): {inherited_summary}
2. Current Node Summary: {node_summary}
3. Current Node Knowledge Graph: {node_graph}
4. Recent Conversation: {last_n_messages}

GUIDELINES:
- Build on established decisions and facts
- Flag conflicts with inherited context if found
- Suggest creating a new branch when exploring alternatives
- Reference knowledge graph entities when relevant
- Maintain awareness of open questions

CURRENT NODE: {node_title}
NODE TYPE: {node_type}";

/// Summarizer system prompt.
pub const SUMMARIZER_SYSTEM_PROMPT: &str = "\
You are a semantic compression engine. Extract ONLY essential information.

INPUT:
- Parent Context: {parent_summary}
- Conversation Messages: {all_messages}
- Existing Knowledge Graph: {existing_graph}

Extract and structure into valid JSON:
1. FACTS: [ { \"fact\", \"source_node\", \"confidence\", \"timestamp\" } ]
2. DECISIONS: [ { \"decision\", \"source_node\", \"rationale\", \"confidence\" } ]
3. OPEN QUESTIONS: [ \"...\" ]
4. METADATA: { \"total_messages\", \"token_count\", \"generated_by\", \"key_topics\" }

EXCLUDE: chitchat, abandoned ideas, redundant statements, off-topic.
OUTPUT: Valid JSON only. No explanation. No markdown.";

/// Graph-builder system prompt.
pub const GRAPH_BUILDER_SYSTEM_PROMPT: &str = "\
You are a knowledge graph extraction engine.

INPUT:
- Current Node Summary: {node_summary}
- Current Node Existing Graph: {current_graph}
- Parent Graph: {parent_graph}

ENTITY TYPES: concept, decision, person, technology, dataset
RELATION TYPES: USES, ALTERNATIVE_TO, REQUIRES, INFLUENCES, PART_OF, FINALIZED_AS

RULES:
- Extract 3-10 entities
- Meaningful relations only
- Do NOT duplicate edges already in current_graph
- Include confidence scores

OUTPUT: Valid JSON only. No explanation. No markdown.
{ \"entities\": [...], \"relations\": [...] }";

/// Merge-arbiter system prompt.
pub const MERGE_SYSTEM_PROMPT: &str = "\
You are merging a branch's findings into the main thread.

STRICT RULES:
1. NEVER delete confirmed decisions from target
2. Prefer specific over vague
3. Flag conflicts — do NOT auto-resolve
4. Maintain all source_node IDs
5. Combine compatible facts. Flag contradictions.

INPUT:
- Target Summary: {target_summary}
- Target Graph: {target_graph}
- Source Summary: {source_summary}
- Source Graph: {source_graph}
- Source Recent Chats: {source_recent_chats}

CONFLICT TYPES: decision conflicts, contradicting facts, incompatible assumptions.

OUTPUT: Valid JSON only.
{ \"updated_target_summary\": {...}, \"conflicts\": [...] }";

/// Fill `{name}` placeholders in a template.
pub fn fill(template: &str, values: &[(&str, &str)]) -> String {
    let mut out = template.to_string();
    for (name, value) in values {
        out = out.replace(&format!("{{{name}}}"), value);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fill_replaces_named_sections() {
        let filled = fill(
            CHAT_SYSTEM_PROMPT,
            &[
                ("inherited_summary", "none"),
                ("node_summary", "S"),
                ("node_graph", "G"),
                ("last_n_messages", "M"),
                ("node_title", "Root"),
                ("node_type", "root"),
            ],
        );
        assert!(filled.contains("CURRENT NODE: Root"));
        assert!(filled.contains("NODE TYPE: root"));
        assert!(!filled.contains("{node_title}"));
    }

    #[test]
    fn fill_leaves_literal_braces_in_json_examples() {
        let filled = fill(MERGE_SYSTEM_PROMPT, &[("target_summary", "T")]);
        // The JSON shape example is part of the prompt, not a placeholder.
        assert!(filled.contains("\"updated_target_summary\": {...}"));
    }
}
