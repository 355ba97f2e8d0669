//! Reasoning engine boundary
//!
//! Analytical steps hand a role, a system prompt and a user prompt to a
//! [`ReasoningEngine`] and get text back. Retries and transport concerns live
//! entirely behind this trait.

use crate::config::ReasoningConfig;
use crate::error::{ErrorCode, PipelineError, Result};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, warn};

/// Which analyst persona a request is addressed to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Analyst,
    Quant,
    Cio,
    Risk,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Analyst => "analyst",
            Role::Quant => "quant",
            Role::Cio => "cio",
            Role::Risk => "risk",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReasoningRequest {
    pub role: Role,
    pub system: String,
    pub prompt: String,
    /// Ask for a JSON object rather than free text
    pub json: bool,
}

impl ReasoningRequest {
    pub fn structured(role: Role, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            role,
            system: system.into(),
            prompt: prompt.into(),
            json: true,
        }
    }

    pub fn text(role: Role, system: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self {
            role,
            system: system.into(),
            prompt: prompt.into(),
            json: false,
        }
    }
}

#[async_trait]
pub trait ReasoningEngine: Send + Sync {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// Failed attempt, tagged with whether another attempt could succeed
enum Attempt {
    Transient(PipelineError),
    Permanent(PipelineError),
}

/// OpenAI-compatible chat-completions client
pub struct OpenAiEngine {
    client: Client,
    config: ReasoningConfig,
    api_key: String,
    retry_delay: Duration,
}

impl OpenAiEngine {
    pub fn new(config: ReasoningConfig) -> Result<Self> {
        let api_key = config
            .api_key
            .clone()
            .ok_or_else(|| PipelineError::config("reasoning.api_key is not set (OPENAI_API_KEY)"))?;
        let client = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| {
                PipelineError::config("failed to create HTTP client").with_source(e)
            })?;

        Ok(Self {
            client,
            config,
            api_key,
            retry_delay: Duration::from_millis(500),
        })
    }

    /// Exponential backoff: base, 2x base, 4x base, capped at 8x
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_delay * 2u32.pow(attempt.saturating_sub(1).min(3))
    }

    async fn attempt(&self, request: &ReasoningRequest) -> std::result::Result<String, Attempt> {
        let body = ChatRequest {
            model: &self.config.model,
            temperature: self.config.temperature,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &request.system,
                },
                ChatMessage {
                    role: "user",
                    content: &request.prompt,
                },
            ],
            response_format: request.json.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let response = self
            .client
            .post(&self.config.base_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                let error = PipelineError::external("reasoning", format!("request failed: {e}"))
                    .with_source(e);
                Attempt::Transient(error)
            })?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Attempt::Permanent(PipelineError::config(
                "reasoning API rejected the credentials",
            )));
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = PipelineError::external("reasoning", format!("API error {status}: {text}"));
            return Err(if is_retryable_status(status) {
                Attempt::Transient(error)
            } else {
                Attempt::Permanent(error)
            });
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            Attempt::Permanent(
                PipelineError::malformed("reasoning", format!("unreadable response: {e}"))
                    .with_source(e),
            )
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                Attempt::Permanent(PipelineError::malformed(
                    "reasoning",
                    "response contained no message content",
                ))
            })
    }
}

#[async_trait]
impl ReasoningEngine for OpenAiEngine {
    async fn complete(&self, request: &ReasoningRequest) -> Result<String> {
        debug!(role = %request.role, prompt = %request.prompt, "reasoning request");

        let mut attempt = 0;
        loop {
            match self.attempt(request).await {
                Ok(content) => return Ok(content),
                Err(Attempt::Permanent(e)) => return Err(e),
                Err(Attempt::Transient(e)) => {
                    if attempt >= self.config.max_retries {
                        return Err(e);
                    }
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    warn!(
                        role = %request.role,
                        attempt,
                        max_retries = self.config.max_retries,
                        "reasoning call failed, retrying in {delay:?}: {e}"
                    );
                    sleep(delay).await;
                }
            }
        }
    }
}

fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS
        || status == StatusCode::REQUEST_TIMEOUT
        || status.is_server_error()
}

/// Pull the JSON object out of a reply, tolerating code fences and prose
/// around it
pub fn extract_json(reply: &str) -> Result<serde_json::Value> {
    let trimmed = reply.trim();
    let candidate = match (trimmed.find('{'), trimmed.rfind('}')) {
        (Some(start), Some(end)) if start < end => &trimmed[start..=end],
        _ => trimmed,
    };
    serde_json::from_str(candidate).map_err(|e| PipelineError::ExternalService {
        code: ErrorCode::EXTERNAL_MALFORMED,
        service: "reasoning".to_string(),
        message: format!("reply is not a JSON object: {e}"),
        source: Some(Box::new(e)),
    })
}
