//! Core enums shared across the workspace engine.
//!
//! All wire forms are kebab-case strings so ledger payloads and API
//! responses read the same as the stored column values.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// What kind of conversational context a node is.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeKind {
    /// The single parentless node of a tree. Never user-creatable.
    Root,
    /// Ordinary branch.
    #[default]
    Standard,
    /// Lightweight what-if branch; chat prefers the `explorer` role.
    Exploration,
}

impl NodeKind {
    /// Stored/wire string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Root => "root",
            Self::Standard => "standard",
            Self::Exploration => "exploration",
        }
    }
}

impl fmt::Display for NodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "root" => Ok(Self::Root),
            "standard" => Ok(Self::Standard),
            "exploration" => Ok(Self::Exploration),
            other => Err(format!("unknown node kind '{other}'")),
        }
    }
}

/// Lifecycle status of a node.
///
/// Transitions: `active → frozen` (merge-as-source), `active → deleted`
/// (delete). Both terminal states remain queryable; rows are never removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NodeStatus {
    /// Accepting mutations.
    #[default]
    Active,
    /// Merged into an ancestor; read-only.
    Frozen,
    /// Soft-deleted; read-only, excluded from tree reads.
    Deleted,
}

impl NodeStatus {
    /// Stored/wire string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Frozen => "frozen",
            Self::Deleted => "deleted",
        }
    }
}

impl fmt::Display for NodeStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for NodeStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(Self::Active),
            "frozen" => Ok(Self::Frozen),
            "deleted" => Ok(Self::Deleted),
            other => Err(format!("unknown node status '{other}'")),
        }
    }
}

/// Role of a message within a node's conversation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageRole {
    /// Human input.
    User,
    /// Model output.
    Assistant,
    /// Injected instruction.
    System,
    /// Synthetic narration inserted by merge.
    Summary,
}

impl MessageRole {
    /// Stored/wire string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::User => "user",
            Self::Assistant => "assistant",
            Self::System => "system",
            Self::Summary => "summary",
        }
    }
}

impl fmt::Display for MessageRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MessageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            "system" => Ok(Self::System),
            "summary" => Ok(Self::Summary),
            other => Err(format!("unknown message role '{other}'")),
        }
    }
}

/// Kind of ledger event.
///
/// INVARIANT: every entity-store write is preceded by exactly one event of
/// one of these kinds, in the same transaction.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EventKind {
    /// Node row inserted.
    Created,
    /// Message row inserted (user, assistant, or synthetic).
    MessageAdded,
    /// New latest summary written (previous latest demoted).
    Summarized,
    /// Merge committed on the target; source frozen.
    Merged,
    /// Node transitioned to `deleted`.
    Deleted,
    /// Node duplicated with a summary reference.
    Copied,
    /// Graph edges inserted, re-attributed, or soft-deleted.
    GraphUpdated,
}

impl EventKind {
    /// Stored/wire string form.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::MessageAdded => "message-added",
            Self::Summarized => "summarized",
            Self::Merged => "merged",
            Self::Deleted => "deleted",
            Self::Copied => "copied",
            Self::GraphUpdated => "graph-updated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created" => Ok(Self::Created),
            "message-added" => Ok(Self::MessageAdded),
            "summarized" => Ok(Self::Summarized),
            "merged" => Ok(Self::Merged),
            "deleted" => Ok(Self::Deleted),
            "copied" => Ok(Self::Copied),
            "graph-updated" => Ok(Self::GraphUpdated),
            other => Err(format!("unknown event kind '{other}'")),
        }
    }
}

/// Logical agent role, resolved to a model endpoint by configuration.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AgentRole {
    /// Chat responses inside a node.
    Reasoner,
    /// Structured distillation of a node's history.
    Summarizer,
    /// Combines two nodes' knowledge during merge.
    MergeArbiter,
    /// Entity/relation extraction from a fresh summary.
    GraphBuilder,
    /// Rollout seam for exploration-kind chat; may be unconfigured.
    Explorer,
}

impl AgentRole {
    /// Configuration/wire key for this role.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Reasoner => "reasoner",
            Self::Summarizer => "summarizer",
            Self::MergeArbiter => "merge-arbiter",
            Self::GraphBuilder => "graph-builder",
            Self::Explorer => "explorer",
        }
    }
}

impl fmt::Display for AgentRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_kind_round_trips() {
        for kind in [NodeKind::Root, NodeKind::Standard, NodeKind::Exploration] {
            assert_eq!(kind.as_str().parse::<NodeKind>().unwrap(), kind);
        }
    }

    #[test]
    fn node_status_round_trips() {
        for status in [NodeStatus::Active, NodeStatus::Frozen, NodeStatus::Deleted] {
            assert_eq!(status.as_str().parse::<NodeStatus>().unwrap(), status);
        }
    }

    #[test]
    fn event_kind_wire_form_is_kebab() {
        assert_eq!(EventKind::MessageAdded.as_str(), "message-added");
        assert_eq!(EventKind::GraphUpdated.as_str(), "graph-updated");
        assert_eq!(
            serde_json::to_value(EventKind::MessageAdded).unwrap(),
            serde_json::json!("message-added")
        );
    }

    #[test]
    fn event_kind_round_trips() {
        for kind in [
            EventKind::Created,
            EventKind::MessageAdded,
            EventKind::Summarized,
            EventKind::Merged,
            EventKind::Deleted,
            EventKind::Copied,
            EventKind::GraphUpdated,
        ] {
            assert_eq!(kind.as_str().parse::<EventKind>().unwrap(), kind);
        }
    }

    #[test]
    fn unknown_strings_rejected() {
        assert!("banana".parse::<NodeKind>().is_err());
        assert!("banana".parse::<NodeStatus>().is_err());
        assert!("banana".parse::<EventKind>().is_err());
        assert!("banana".parse::<MessageRole>().is_err());
    }

    #[test]
    fn agent_role_key_matches_config() {
        assert_eq!(AgentRole::MergeArbiter.as_str(), "merge-arbiter");
        assert_eq!(AgentRole::GraphBuilder.as_str(), "graph-builder");
    }

    #[test]
    fn defaults_match_schema_defaults() {
        assert_eq!(NodeKind::default(), NodeKind::Standard);
        assert_eq!(NodeStatus::default(), NodeStatus::Active);
    }
}
