//! The Context Assembler — pure reads, no mutations, no network.
//!
//! Each `build_*` method snapshots entity-store state into one role-specific
//! prompt:
//!
//! - **chat**: compressed ancestor key points + own summary + own graph +
//!   the last N messages. Ancestors are *compressed* (facts/decisions only),
//!   so prompt size grows with the number of established facts, not with
//!   tree depth times summary size.
//! - **summarize**: parent summary uncompressed + full history + own graph.
//! - **graph**: the just-produced summary + own graph + parent graph.
//! - **merge**: both summaries, both graphs, source's recent messages.

use std::sync::Arc;

use serde_json::Value;

use fractal_store::WorkspaceStore;

use crate::context::format::{extract_key_points, format_graph, format_messages, format_summary};
use crate::context::prompts::{
    fill, CHAT_SYSTEM_PROMPT, GRAPH_BUILDER_SYSTEM_PROMPT, MERGE_SYSTEM_PROMPT,
    SUMMARIZER_SYSTEM_PROMPT,
};
use crate::errors::Result;

/// A ready-to-send prompt. `user` is empty for roles whose entire input is
/// assembled into the system prompt.
#[derive(Clone, Debug)]
pub struct Prompt {
    /// System instruction with context sections filled in.
    pub system: String,
    /// User turn content.
    pub user: String,
}

/// Assembles role-specific prompts from entity-store state.
pub struct ContextAssembler {
    store: Arc<WorkspaceStore>,
    recent_messages: usize,
}

impl ContextAssembler {
    /// Create an assembler over a store with a recent-message window.
    pub fn new(store: Arc<WorkspaceStore>, recent_messages: usize) -> Self {
        Self {
            store,
            recent_messages,
        }
    }

    fn latest_summary_value(&self, node_id: &str) -> Result<Option<Value>> {
        let Some(row) = self.store.latest_summary(node_id)? else {
            return Ok(None);
        };
        let value = serde_json::from_str(&row.payload)
            .map_err(fractal_store::StoreError::from)?;
        Ok(Some(value))
    }

    /// Build the chat prompt for a node. The user's new message is passed
    /// separately as the user turn.
    pub fn build_chat(&self, node_id: &str, user_content: &str) -> Result<Prompt> {
        let lineage = self.store.lineage(node_id)?;
        let node = &lineage[0];

        // Ancestors root → parent, each reduced to key points.
        let mut inherited = String::new();
        for ancestor in lineage[1..].iter().rev() {
            if let Some(summary) = self.latest_summary_value(&ancestor.id)? {
                inherited.push_str(&extract_key_points(&summary));
                inherited.push('\n');
            }
        }

        let node_summary = self.latest_summary_value(node_id)?;
        let node_graph = self.store.node_graph(node_id)?;
        let recent = self.store.last_messages(node_id, self.recent_messages)?;

        let system = fill(
            CHAT_SYSTEM_PROMPT,
            &[
                (
                    "inherited_summary",
                    if inherited.is_empty() {
                        "No ancestor context yet."
                    } else {
                        &inherited
                    },
                ),
                (
                    "node_summary",
                    &node_summary
                        .as_ref()
                        .map_or_else(|| "No summary yet.".to_string(), format_summary),
                ),
                (
                    "node_graph",
                    &if node_graph.is_empty() {
                        "No graph yet.".to_string()
                    } else {
                        format_graph(&node_graph)
                    },
                ),
                ("last_n_messages", &format_messages(&recent)),
                ("node_title", &node.title),
                ("node_type", &node.kind),
            ],
        );
        Ok(Prompt {
            system,
            user: user_content.to_string(),
        })
    }

    /// Build the summarizer prompt for a node.
    pub fn build_summarize(&self, node_id: &str) -> Result<Prompt> {
        let lineage = self.store.lineage(node_id)?;
        let parent_summary = match lineage.get(1) {
            Some(parent) => self.latest_summary_value(&parent.id)?,
            None => None,
        };

        let all_messages = self.store.messages(node_id)?;
        let existing_graph = self.store.node_graph(node_id)?;

        let system = fill(
            SUMMARIZER_SYSTEM_PROMPT,
            &[
                (
                    "parent_summary",
                    &parent_summary
                        .as_ref()
                        .map_or_else(|| "No parent context.".to_string(), format_summary),
                ),
                ("all_messages", &format_messages(&all_messages)),
                (
                    "existing_graph",
                    &if existing_graph.is_empty() {
                        "No existing graph.".to_string()
                    } else {
                        format_graph(&existing_graph)
                    },
                ),
            ],
        );
        Ok(Prompt {
            system,
            user: String::new(),
        })
    }

    /// Build the graph-builder prompt from a just-produced summary.
    pub fn build_graph(&self, node_id: &str, new_summary: &Value) -> Result<Prompt> {
        let current_graph = self.store.node_graph(node_id)?;
        let parent_graph = match self.store.node(node_id)?.parent_id {
            Some(parent_id) => self.store.node_graph(&parent_id)?,
            None => Vec::new(),
        };

        let system = fill(
            GRAPH_BUILDER_SYSTEM_PROMPT,
            &[
                ("node_summary", &format_summary(new_summary)),
                (
                    "current_graph",
                    &if current_graph.is_empty() {
                        "No existing graph.".to_string()
                    } else {
                        format_graph(&current_graph)
                    },
                ),
                (
                    "parent_graph",
                    &if parent_graph.is_empty() {
                        "No parent graph.".to_string()
                    } else {
                        format_graph(&parent_graph)
                    },
                ),
            ],
        );
        Ok(Prompt {
            system,
            user: String::new(),
        })
    }

    /// Build the merge-arbiter prompt for a source/target pair.
    pub fn build_merge(&self, source_id: &str, target_id: &str) -> Result<Prompt> {
        let target_summary = self.latest_summary_value(target_id)?;
        let target_graph = self.store.node_graph(target_id)?;
        let source_summary = self.latest_summary_value(source_id)?;
        let source_graph = self.store.node_graph(source_id)?;
        let source_recent = self.store.last_messages(source_id, self.recent_messages)?;

        let system = fill(
            MERGE_SYSTEM_PROMPT,
            &[
                (
                    "target_summary",
                    &target_summary
                        .as_ref()
                        .map_or_else(|| "No target summary.".to_string(), format_summary),
                ),
                (
                    "target_graph",
                    &if target_graph.is_empty() {
                        "No target graph.".to_string()
                    } else {
                        format_graph(&target_graph)
                    },
                ),
                (
                    "source_summary",
                    &source_summary
                        .as_ref()
                        .map_or_else(|| "No source summary.".to_string(), format_summary),
                ),
                (
                    "source_graph",
                    &if source_graph.is_empty() {
                        "No source graph.".to_string()
                    } else {
                        format_graph(&source_graph)
                    },
                ),
                (
                    "source_recent_chats",
                    &if source_recent.is_empty() {
                        "No recent chats.".to_string()
                    } else {
                        format_messages(&source_recent)
                    },
                ),
            ],
        );
        Ok(Prompt {
            system,
            user: String::new(),
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
