//! Anthropic API client implementation
//!
//! Implements the LlmClient trait for the Anthropic Messages API.

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{Result, SleuthError};
use crate::llm::client::LlmClient;
use crate::llm::types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, Usage};

/// Anthropic API base URL
const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";

/// Anthropic API version
const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Environment variable read when the config names none
pub const DEFAULT_API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

/// Configuration for the Anthropic client
#[derive(Debug, Clone)]
pub struct AnthropicConfig {
    pub model: String,
    pub max_tokens: u32,
    pub timeout: Duration,
    pub url: String,
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
            timeout: config.timeout(),
            url: config.base_url.clone().unwrap_or_else(|| ANTHROPIC_API_URL.to_string()),
        }
    }
}

/// Anthropic API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    config: AnthropicConfig,
}

impl AnthropicClient {
    /// Create a client, reading the API key from the configured environment variable
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let env_var = config.api_key_env.as_deref().unwrap_or(DEFAULT_API_KEY_ENV);
        let api_key =
            std::env::var(env_var).map_err(|_| SleuthError::Backend(format!("{} not set", env_var)))?;
        Self::with_api_key(api_key, AnthropicConfig::from(config))
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: AnthropicConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| SleuthError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            config,
        })
    }

    /// Map transcript messages onto Messages API turns.
    ///
    /// System messages are lifted out by the caller. Consecutive tool messages
    /// are folded into one user turn of `tool_result` blocks.
    fn convert_messages(messages: &[Message]) -> Vec<Value> {
        let mut out: Vec<Value> = Vec::new();
        let mut folding_results = false;

        for message in messages {
            match message.role {
                Role::System => continue,
                Role::User => {
                    out.push(json!({ "role": "user", "content": message.content }));
                    folding_results = false;
                }
                Role::Assistant => {
                    if message.tool_calls.is_empty() {
                        out.push(json!({ "role": "assistant", "content": message.content }));
                    } else {
                        let mut blocks = Vec::new();
                        if !message.content.is_empty() {
                            blocks.push(json!({ "type": "text", "text": message.content }));
                        }
                        for call in &message.tool_calls {
                            blocks.push(json!({
                                "type": "tool_use",
                                "id": call.id,
                                "name": call.name,
                                "input": call.input
                            }));
                        }
                        out.push(json!({ "role": "assistant", "content": blocks }));
                    }
                    folding_results = false;
                }
                Role::Tool => {
                    let block = json!({
                        "type": "tool_result",
                        "tool_use_id": message.tool_call_id.clone().unwrap_or_default(),
                        "content": message.content
                    });
                    let appended = folding_results
                        && out
                            .last_mut()
                            .and_then(|turn| turn["content"].as_array_mut())
                            .map(|blocks| blocks.push(block.clone()))
                            .is_some();
                    if !appended {
                        out.push(json!({ "role": "user", "content": [block] }));
                    }
                    folding_results = true;
                }
            }
        }
        out
    }

    /// Build the request body for the Anthropic API
    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.clone().unwrap_or_else(|| self.config.model.clone());
        let max_tokens = request.max_tokens.unwrap_or(self.config.max_tokens);

        let mut body = json!({
            "model": model,
            "max_tokens": max_tokens,
            "messages": Self::convert_messages(&request.messages)
        });

        if let Some(system) = request.system_prompt() {
            body["system"] = json!(system);
        }

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_anthropic_schema()).collect();
            body["tools"] = json!(tools);
        }

        body
    }

    /// Parse the API response into a CompletionResponse
    fn parse_response(body: Value) -> Result<CompletionResponse> {
        let stop_reason = match body["stop_reason"].as_str() {
            Some("tool_use") => StopReason::ToolUse,
            Some("max_tokens") => StopReason::MaxTokens,
            Some("stop_sequence") => StopReason::StopSequence,
            _ => StopReason::EndTurn,
        };

        let usage = body
            .get("usage")
            .map(|u| {
                Usage::new(
                    u["input_tokens"].as_u64().unwrap_or(0),
                    u["output_tokens"].as_u64().unwrap_or(0),
                )
            })
            .unwrap_or_default();

        let blocks = body["content"]
            .as_array()
            .ok_or_else(|| SleuthError::Backend("Response has no content blocks".to_string()))?;

        let mut content = String::new();
        let mut tool_calls = Vec::new();
        for block in blocks {
            match block["type"].as_str() {
                Some("text") => {
                    if let Some(text) = block["text"].as_str() {
                        if !content.is_empty() {
                            content.push('\n');
                        }
                        content.push_str(text);
                    }
                }
                Some("tool_use") => {
                    let id = block["id"].as_str().unwrap_or_default();
                    let name = block["name"].as_str().unwrap_or_default();
                    tool_calls.push(ToolCall::new(id, name, block["input"].clone()));
                }
                _ => {}
            }
        }

        Ok(CompletionResponse {
            content,
            tool_calls,
            stop_reason,
            usage,
        })
    }

    /// Send a request to the Anthropic API
    async fn send_request(&self, body: Value) -> Result<Value> {
        let response = self
            .client
            .post(&self.config.url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| SleuthError::Backend(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_else(|_| "Unknown error".to_string());
            return Err(SleuthError::Backend(format!("API error {}: {}", status, error_body)));
        }

        response
            .json()
            .await
            .map_err(|e| SleuthError::Backend(format!("Failed to parse response: {}", e)))
    }
}

#[async_trait]
impl LlmClient for AnthropicClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let body = self.build_request(&request);
        debug!("Anthropic request with {} messages", request.messages.len());
        let response = self.send_request(body).await?;
        Self::parse_response(response)
    }

    fn model(&self) -> &str {
        &self.config.model
    }
}

impl std::fmt::Debug for AnthropicClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnthropicClient")
            .field("model", &self.config.model)
            .field("max_tokens", &self.config.max_tokens)
            .finish()
    }
}
