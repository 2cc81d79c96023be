//! OpenAI-compatible chat completions provider
//!
//! Talks to Groq's hosted endpoint by default, but any server that speaks the
//! `/chat/completions` wire format works when configured via `api.endpoint`.

use crate::config::ApiConfig;
use crate::error::{QuantumError, Result};
use crate::providers::{Message, ProbeResult, Provider};

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Completion length used when probing a model
const PROBE_MAX_TOKENS: u32 = 10;

/// Chat completions provider
///
/// One POST per call, bearer-authenticated, no retries. A request timeout is
/// only applied when `api.timeout_seconds` is configured.
///
/// # Examples
///
/// ```no_run
/// use quantum_chat::config::ApiConfig;
/// use quantum_chat::providers::{GroqProvider, Message, Provider};
///
/// # async fn example() -> quantum_chat::error::Result<()> {
/// let provider = GroqProvider::new(&ApiConfig::default())?;
/// let reply = provider
///     .complete(&[Message::user("Hello!")], "llama-3.3-70b-versatile", "gsk_...")
///     .await?;
/// # Ok(())
/// # }
/// ```
pub struct GroqProvider {
    client: Client,
    endpoint: String,
    temperature: f32,
    max_tokens: u32,
}

/// Request body for the completions endpoint
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error envelope: `{ "error": { "message": "..." } }`
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: Option<String>,
}

impl GroqProvider {
    /// Create a new provider from the API section of the configuration
    ///
    /// # Errors
    ///
    /// Returns error if HTTP client initialization fails
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent("quantum-chat/0.1.0");
        if let Some(seconds) = config.timeout_seconds {
            builder = builder.timeout(Duration::from_secs(seconds));
        }
        let client = builder.build().map_err(QuantumError::Http)?;

        tracing::debug!(
            endpoint = %config.endpoint,
            timeout = ?config.timeout_seconds,
            "Initialized completion provider"
        );

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        })
    }

    /// Endpoint requests are sent to
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn post(&self, request: &ChatRequest<'_>, api_key: &str) -> Result<String> {
        tracing::debug!(
            model = request.model,
            messages = request.messages.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("Bearer {}", api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await
            .map_err(|e| {
                tracing::error!("Completion request failed: {}", e);
                QuantumError::Transport(e.to_string())
            })?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| QuantumError::Transport(format!("Failed to read response: {}", e)))?;

        if !status.is_success() {
            let message =
                api_error_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
            tracing::error!(
                status = status.as_u16(),
                "Completion endpoint error: {}",
                message
            );
            return Err(QuantumError::Api {
                status: status.as_u16(),
                message,
            }
            .into());
        }

        extract_content(&body)
    }
}

/// Pull `error.message` out of an error body, if there is one
fn api_error_message(body: &str) -> Option<String> {
    serde_json::from_str::<ErrorEnvelope>(body)
        .ok()?
        .error?
        .message
        .filter(|m| !m.trim().is_empty())
}

/// Pull `choices[0].message.content` out of a success body
fn extract_content(body: &str) -> Result<String> {
    let parsed: ChatResponse = serde_json::from_str(body)
        .map_err(|e| QuantumError::MalformedResponse(format!("invalid JSON: {}", e)))?;

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or_else(|| {
            QuantumError::MalformedResponse("response has no choices[0].message.content".into())
                .into()
        })
}

#[async_trait]
impl Provider for GroqProvider {
    async fn complete(&self, messages: &[Message], model: &str, api_key: &str) -> Result<String> {
        let request = ChatRequest {
            model,
            messages,
            temperature: Some(self.temperature),
            max_tokens: self.max_tokens,
        };
        self.post(&request, api_key).await
    }

    async fn probe(&self, model: &str, api_key: &str) -> ProbeResult {
        let messages = [Message::user("Hi")];
        let request = ChatRequest {
            model,
            messages: &messages,
            temperature: None,
            max_tokens: PROBE_MAX_TOKENS,
        };
        match self.post(&request, api_key).await {
            Ok(_) => ProbeResult::Pass,
            Err(e) => match e.downcast_ref::<QuantumError>() {
                Some(QuantumError::Api { message, .. }) => ProbeResult::Fail(message.clone()),
                _ => ProbeResult::Unreachable(e.to_string()),
            },
        }
    }
}
