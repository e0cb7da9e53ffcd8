//! Chat-completion client for OpenAI-compatible `/v1/chat/completions`
//! endpoints.
//!
//! Non-streaming: the answer generator consumes whole responses, so there is
//! no SSE plumbing here.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::LlmConfig;
use crate::error::{LlmError, LlmResult};
use crate::retry::send_with_retry;

// ============================================================================
// ChatBackend Trait
// ============================================================================

/// Trait for chat-completion backends.
pub trait ChatBackend: Send + Sync {
    /// The model identifier this backend completes with.
    fn model_id(&self) -> &str;

    /// Run a single-turn completion with a system and a user message.
    ///
    /// Returns the assistant message content.
    fn complete(&self, system: &str, user: &str) -> LlmResult<String>;
}

// ============================================================================
// Wire Types
// ============================================================================

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

// ============================================================================
// HTTP Client
// ============================================================================

/// Chat-completion client for an OpenAI-compatible API.
///
/// Completions run at temperature 0 so repeated asks over the same index are
/// reproducible.
pub struct HttpChatClient {
    client: reqwest::blocking::Client,
    config: LlmConfig,
}

impl HttpChatClient {
    /// Create a new client from configuration.
    ///
    /// # Errors
    ///
    /// Fails if no API key is configured or the HTTP client cannot be built.
    pub fn new(config: LlmConfig) -> LlmResult<Self> {
        config.require_api_key()?;
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }
}

impl ChatBackend for HttpChatClient {
    fn model_id(&self) -> &str {
        &self.config.chat_model
    }

    fn complete(&self, system: &str, user: &str) -> LlmResult<String> {
        let url = format!("{}/v1/chat/completions", self.config.base_url);
        let api_key = self.config.require_api_key()?.to_string();

        debug!(
            "Chat completion with model {} ({} prompt chars)",
            self.config.chat_model,
            system.len() + user.len()
        );

        let request = ChatRequest {
            model: &self.config.chat_model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: user,
                },
            ],
            temperature: 0.0,
        };

        let response = send_with_retry("chat", self.config.max_retries, || {
            self.client
                .post(&url)
                .bearer_auth(&api_key)
                .json(&request)
                .send()
        })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().unwrap_or_default();
            return Err(LlmError::api("chat", status, body));
        }

        let body: ChatResponse = response.json()?;
        let content = body
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(LlmError::EmptyResponse)?;

        Ok(content)
    }
}

// ============================================================================
// Tests
// ============================================================================
