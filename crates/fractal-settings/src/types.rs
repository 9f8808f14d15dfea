//! Settings type definitions.
//!
//! All types use `#[serde(rename_all = "camelCase")]` to match the JSON wire
//! format. Each type implements [`Default`] with production default values.
//! `#[serde(default)]` allows partial JSON — missing fields get their default
//! value during deserialization.

use serde::{Deserialize, Serialize};

use fractal_core::types::AgentRole;

/// Root settings type for the Fractal engine.
///
/// Loaded from an optional JSON file with defaults applied for missing
/// fields. Environment variables (`FRACTAL_*`) can override specific values.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct FractalSettings {
    /// Settings schema version.
    pub version: String,
    /// Application name.
    pub name: String,
    /// SQLite database settings.
    pub database: DatabaseSettings,
    /// HTTP server settings.
    pub server: ServerSettings,
    /// Agent device routing and role bindings.
    pub agents: AgentSettings,
    /// Context assembly settings.
    pub context: ContextSettings,
    /// Logging configuration.
    pub logging: LoggingSettings,
}

impl Default for FractalSettings {
    fn default() -> Self {
        Self {
            version: "0.1.0".to_string(),
            name: "fractal".to_string(),
            database: DatabaseSettings::default(),
            server: ServerSettings::default(),
            agents: AgentSettings::default(),
            context: ContextSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

/// SQLite database settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DatabaseSettings {
    /// Path to the database file.
    pub path: String,
}

impl Default for DatabaseSettings {
    fn default() -> Self {
        Self {
            path: "fractal.db".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind host.
    pub host: String,
    /// Bind port.
    pub port: u16,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8400,
        }
    }
}

/// Which inference device serves a role.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DeviceSlot {
    /// Primary device (heavier models).
    DeviceA,
    /// Secondary device (lighter models).
    DeviceB,
}

/// One role's binding: which model on which device.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoleBinding {
    /// Model name as served by the device.
    pub model: String,
    /// Device serving the model.
    pub device: DeviceSlot,
}

/// Role → binding table. Unbound roles (`None`) are unavailable — callers
/// decide whether to fall back to another role.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RoleBindings {
    /// Main conversational agent.
    pub reasoner: Option<RoleBinding>,
    /// Summary generation.
    pub summarizer: Option<RoleBinding>,
    /// Merge conflict resolution.
    pub merge_arbiter: Option<RoleBinding>,
    /// Knowledge triple extraction.
    pub graph_builder: Option<RoleBinding>,
    /// Speculative branch exploration. Unbound by default.
    pub explorer: Option<RoleBinding>,
}

impl Default for RoleBindings {
    fn default() -> Self {
        let main = RoleBinding {
            model: "main-reasoner".to_string(),
            device: DeviceSlot::DeviceA,
        };
        Self {
            reasoner: Some(main.clone()),
            summarizer: Some(main.clone()),
            merge_arbiter: Some(main),
            graph_builder: Some(RoleBinding {
                model: "graph-builder".to_string(),
                device: DeviceSlot::DeviceB,
            }),
            explorer: None,
        }
    }
}

impl RoleBindings {
    /// The binding for a role, if configured.
    pub fn get(&self, role: AgentRole) -> Option<&RoleBinding> {
        match role {
            AgentRole::Reasoner => self.reasoner.as_ref(),
            AgentRole::Summarizer => self.summarizer.as_ref(),
            AgentRole::MergeArbiter => self.merge_arbiter.as_ref(),
            AgentRole::GraphBuilder => self.graph_builder.as_ref(),
            AgentRole::Explorer => self.explorer.as_ref(),
        }
    }
}

/// Agent device routing and role bindings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct AgentSettings {
    /// Base URL for device A.
    pub device_a_url: String,
    /// Base URL for device B.
    pub device_b_url: String,
    /// Per-request timeout in milliseconds.
    pub request_timeout_ms: u64,
    /// Role → binding table.
    pub roles: RoleBindings,
}

impl Default for AgentSettings {
    fn default() -> Self {
        Self {
            device_a_url: "http://localhost:11434".to_string(),
            device_b_url: "http://localhost:11434".to_string(),
            request_timeout_ms: 120_000,
            roles: RoleBindings::default(),
        }
    }
}

impl AgentSettings {
    /// Resolve a role to `(base_url, model)`, or `None` if unbound.
    pub fn resolve(&self, role: AgentRole) -> Option<(&str, &str)> {
        let binding = self.roles.get(role)?;
        let url = match binding.device {
            DeviceSlot::DeviceA => self.device_a_url.as_str(),
            DeviceSlot::DeviceB => self.device_b_url.as_str(),
        };
        Some((url, binding.model.as_str()))
    }
}

/// Context assembly settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ContextSettings {
    /// How many recent messages the conversational agent sees.
    pub recent_messages: usize,
    /// Context window of the reasoner model (tokens).
    pub reasoner_ctx_tokens: i64,
    /// Context window of the graph builder model (tokens).
    pub graph_builder_ctx_tokens: i64,
}

impl Default for ContextSettings {
    fn default() -> Self {
        Self {
            recent_messages: 10,
            reasoner_ctx_tokens: 8192,
            graph_builder_ctx_tokens: 4096,
        }
    }
}

/// Logging configuration.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default log level filter (`error`..`trace`).
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_bind_core_roles_but_not_explorer() {
        let agents = AgentSettings::default();
        assert!(agents.resolve(AgentRole::Reasoner).is_some());
        assert!(agents.resolve(AgentRole::Summarizer).is_some());
        assert!(agents.resolve(AgentRole::MergeArbiter).is_some());
        assert!(agents.resolve(AgentRole::GraphBuilder).is_some());
        assert!(agents.resolve(AgentRole::Explorer).is_none());
    }

    #[test]
    fn resolve_routes_by_device() {
        let mut agents = AgentSettings::default();
        agents.device_a_url = "http://device-a:11434".to_string();
        agents.device_b_url = "http://device-b:11434".to_string();

        let (url, model) = agents.resolve(AgentRole::Reasoner).unwrap();
        assert_eq!(url, "http://device-a:11434");
        assert_eq!(model, "main-reasoner");

        let (url, model) = agents.resolve(AgentRole::GraphBuilder).unwrap();
        assert_eq!(url, "http://device-b:11434");
        assert_eq!(model, "graph-builder");
    }

    #[test]
    fn partial_json_gets_defaults() {
        let settings: FractalSettings =
            serde_json::from_str(r#"{"server": {"port": 9000}}"#).unwrap();
        assert_eq!(settings.server.port, 9000);
        assert_eq!(settings.server.host, "127.0.0.1");
        assert_eq!(settings.context.recent_messages, 10);
    }

    #[test]
    fn role_binding_json_round_trip() {
        let json = r#"{"roles": {"explorer": {"model": "explorer-7b", "device": "device-b"}}}"#;
        let agents: AgentSettings = serde_json::from_str(json).unwrap();
        let (url, model) = agents.resolve(AgentRole::Explorer).unwrap();
        assert_eq!(model, "explorer-7b");
        assert_eq!(url, agents.device_b_url);
    }
}
