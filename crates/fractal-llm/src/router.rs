//! [`AgentRouter`] — resolves roles through settings and speaks the Ollama
//! chat protocol.
//!
//! Routing is a pure table lookup: role → (device URL, model). The router
//! holds one shared `reqwest::Client` with the configured request timeout,
//! so concurrent agent calls reuse connections.

use std::time::Duration;

use async_trait::async_trait;
use metrics::counter;
use tracing::{debug, error, instrument};

use fractal_core::types::AgentRole;
use fractal_settings::AgentSettings;

use crate::client::AgentClient;
use crate::errors::{Result, RouterError};
use crate::types::{ChatMessage, ChatRequest, ChatResponse};

/// How much of an error body to keep in [`RouterError::Api`].
const ERROR_BODY_LIMIT: usize = 512;

/// HTTP router over the configured inference devices.
pub struct AgentRouter {
    agents: AgentSettings,
    client: reqwest::Client,
}

impl AgentRouter {
    /// Create a router from agent settings.
    pub fn new(agents: AgentSettings) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(agents.request_timeout_ms))
            .build()?;
        Ok(Self { agents, client })
    }

    /// Create a router with a caller-supplied HTTP client (tests).
    pub fn with_client(agents: AgentSettings, client: reqwest::Client) -> Self {
        Self { agents, client }
    }

    async fn chat(&self, base_url: &str, model: &str, messages: Vec<ChatMessage>) -> Result<String> {
        let url = format!("{}/api/chat", base_url.trim_end_matches('/'));
        let request = ChatRequest {
            model: model.to_string(),
            messages,
            stream: false,
        };

        let response = self.client.post(&url).json(&request).send().await?;
        let status = response.status();
        if !status.is_success() {
            let mut message = response.text().await.unwrap_or_default();
            message.truncate(ERROR_BODY_LIMIT);
            return Err(RouterError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: ChatResponse = response
            .json()
            .await
            .map_err(|e| RouterError::Malformed(e.to_string()))?;
        Ok(body.message.content)
    }
}

#[async_trait]
impl AgentClient for AgentRouter {
    #[instrument(skip(self, system_prompt, user_content), fields(role = %role))]
    async fn complete(
        &self,
        role: AgentRole,
        system_prompt: &str,
        user_content: &str,
    ) -> Result<String> {
        let Some((base_url, model)) = self.agents.resolve(role) else {
            counter!("fractal_agent_unavailable_total", "role" => role.as_str()).increment(1);
            return Err(RouterError::RoleUnavailable(role));
        };

        let messages = vec![
            ChatMessage {
                role: "system".to_string(),
                content: system_prompt.to_string(),
            },
            ChatMessage {
                role: "user".to_string(),
                content: user_content.to_string(),
            },
        ];

        debug!(model, base_url, "dispatching agent call");
        counter!("fractal_agent_requests_total", "role" => role.as_str()).increment(1);
        match self.chat(base_url, model, messages).await {
            Ok(content) => Ok(content),
            Err(err) => {
                error!(model, error = %err, "agent call failed");
                counter!("fractal_agent_errors_total", "role" => role.as_str()).increment(1);
                Err(err)
            }
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
