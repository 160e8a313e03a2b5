//! Anthropic Messages API client
//!
//! Requests and replies go through typed wire structs; the content-block
//! message model already matches the API's shape, so it is sent as-is.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::LlmConfig;
use crate::error::{Result, TriloopError};
use crate::llm::client::LlmClient;
use crate::llm::types::{CompletionRequest, CompletionResponse, ContentBlock, Message, StopReason, ToolDefinition, Usage};

const MESSAGES_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";
const API_KEY_VAR: &str = "ANTHROPIC_API_KEY";

/// Model, output budget and HTTP timeout for one client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for AnthropicConfig {
    fn default() -> Self {
        Self::from(&LlmConfig::default())
    }
}

impl From<&LlmConfig> for AnthropicConfig {
    fn from(config: &LlmConfig) -> Self {
        Self {
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            timeout: Duration::from_millis(config.timeout_ms),
        }
    }
}

#[derive(Serialize)]
struct MessagesBody<'a> {
    model: &'a str,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    messages: &'a [Message],
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<&'a [ToolDefinition]>,
}

#[derive(Deserialize)]
struct MessagesReply {
    content: Vec<ReplyBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
    #[serde(default)]
    usage: Usage,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ReplyBlock {
    Text {
        text: String,
    },
    ToolUse {
        id: String,
        name: String,
        input: Value,
    },
    /// thinking, redacted_thinking, server tool blocks
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct ErrorReply {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(rename = "type")]
    kind: String,
    message: String,
}

pub struct AnthropicClient {
    http: Client,
    api_key: String,
    config: AnthropicConfig,
    input_tokens: AtomicU64,
    output_tokens: AtomicU64,
}

impl AnthropicClient {
    /// Client using the key in `ANTHROPIC_API_KEY`
    pub fn new(config: AnthropicConfig) -> Result<Self> {
        let api_key = std::env::var(API_KEY_VAR).map_err(|_| TriloopError::Llm(format!("{} is not set", API_KEY_VAR)))?;
        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: impl Into<String>, config: AnthropicConfig) -> Result<Self> {
        let http = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| TriloopError::Llm(format!("HTTP client setup failed: {}", e)))?;

        Ok(Self {
            http,
            api_key: api_key.into(),
            config,
            input_tokens: AtomicU64::new(0),
            output_tokens: AtomicU64::new(0),
        })
    }

    fn body<'a>(&'a self, request: &'a CompletionRequest) -> MessagesBody<'a> {
        MessagesBody {
            model: request.model.as_deref().unwrap_or(&self.config.model),
            max_tokens: request.max_tokens.unwrap_or(self.config.max_tokens),
            system: (!request.system.is_empty()).then_some(request.system.as_str()),
            messages: &request.messages,
            tools: (!request.tools.is_empty()).then_some(request.tools.as_slice()),
        }
    }

    /// Decode a successful reply body and add its usage to the running totals
    fn decode_reply(&self, raw: &str) -> Result<CompletionResponse> {
        let reply: MessagesReply =
            serde_json::from_str(raw).map_err(|e| TriloopError::Llm(format!("unexpected reply shape: {}", e)))?;

        self.input_tokens.fetch_add(reply.usage.input_tokens, Ordering::Relaxed);
        self.output_tokens.fetch_add(reply.usage.output_tokens, Ordering::Relaxed);

        let stop_reason = match reply.stop_reason.as_deref() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        let content = reply
            .content
            .into_iter()
            .filter_map(|block| match block {
                ReplyBlock::Text { text } => Some(ContentBlock::Text { text }),
                ReplyBlock::ToolUse { id, name, input } => Some(ContentBlock::ToolUse { id, name, input }),
                ReplyBlock::Other => None,
            })
            .collect();

        Ok(CompletionResponse {
            content,
            stop_reason,
            usage: reply.usage,
        })
    }

    /// Tokens used by every call made through this client
    pub fn total_usage(&self) -> Usage {
        Usage::new(
            self.input_tokens.load(Ordering::Relaxed),
            self.output_tokens.load(Ordering::Relaxed),
        )
    }
}

/// Error text for a non-2xx reply
fn describe_failure(status: StatusCode, retry_after: Option<u64>, raw: &str) -> String {
    let detail = match serde_json::from_str::<ErrorReply>(raw) {
        Ok(reply) => format!("{}: {}", reply.error.kind, reply.error.message),
        Err(_) => raw.trim().to_string(),
    };
    match (status, retry_after) {
        (StatusCode::TOO_MANY_REQUESTS, Some(secs)) => format!("rate limited, retry after {}s ({})", secs, detail),
        (StatusCode::TOO_MANY_REQUESTS, None) => format!("rate limited ({})", detail),
        _ => format!("API returned {}: {}", status, detail),
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        debug!(
            "Calling {} with {} message(s), {} tool(s)",
            self.config.model,
            request.messages.len(),
            request.tools.len()
        );

        let response = self
            .http
            .post(MESSAGES_URL)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", API_VERSION)
            .json(&self.body(&request))
            .send()
            .await
            .map_err(|e| TriloopError::Llm(format!("request failed: {}", e)))?;

        let status = response.status();
        let retry_after = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.parse().ok());
        let raw = response
            .text()
            .await
            .map_err(|e| TriloopError::Llm(format!("reading reply failed: {}", e)))?;

        if !status.is_success() {
            return Err(TriloopError::Llm(describe_failure(status, retry_after, &raw)));
        }
        self.decode_reply(&raw)
    }

    fn model(&self) -> &str {
        &self.config.model
    }

    fn is_ready(&self) -> bool {
        !self.api_key.is_empty()
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient").field("config", &self.config).finish_non_exhaustive()
    }
}
