//! OpenAI Chat Completions client, including Azure OpenAI deployments
//!
//! Azure mode is selected by setting `api_version`; `base_url` is then the
//! resource endpoint and `model` the deployment name.

use async_trait::async_trait;
use log::{debug, warn};
use reqwest::Client;
use serde_json::{Value, json};

use crate::config::LlmConfig;
use crate::error::{Result, SleuthError};
use crate::llm::client::LlmClient;
use crate::llm::types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, Usage};

const OPENAI_API_URL: &str = "https://api.openai.com/v1";
const OPENAI_KEY_ENV: &str = "OPENAI_API_KEY";
const AZURE_KEY_ENV: &str = "AZURE_OPENAI_API_KEY";

#[derive(Debug, Clone, PartialEq, Eq)]
enum Endpoint {
    OpenAi { base_url: String },
    Azure { endpoint: String, api_version: String },
}

impl Endpoint {
    fn url(&self, model: &str) -> String {
        match self {
            Endpoint::OpenAi { base_url } => format!("{}/chat/completions", base_url.trim_end_matches('/')),
            Endpoint::Azure { endpoint, api_version } => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint.trim_end_matches('/'),
                model,
                api_version
            ),
        }
    }
}

pub struct OpenAiClient {
    client: Client,
    api_key: String,
    endpoint: Endpoint,
    model: String,
    max_tokens: u32,
}

impl OpenAiClient {
    /// Create a client, reading the API key from the configured environment variable
    pub fn from_config(config: &LlmConfig) -> Result<Self> {
        let default_env = if config.api_version.is_some() { AZURE_KEY_ENV } else { OPENAI_KEY_ENV };
        let env_var = config.api_key_env.as_deref().unwrap_or(default_env);
        let api_key =
            std::env::var(env_var).map_err(|_| SleuthError::Backend(format!("{} not set", env_var)))?;
        Self::with_api_key(api_key, config)
    }

    pub fn with_api_key(api_key: String, config: &LlmConfig) -> Result<Self> {
        let endpoint = match &config.api_version {
            Some(api_version) => Endpoint::Azure {
                endpoint: config
                    .base_url
                    .clone()
                    .ok_or_else(|| SleuthError::Config("Azure OpenAI needs llm.base_url".to_string()))?,
                api_version: api_version.clone(),
            },
            None => Endpoint::OpenAi {
                base_url: config.base_url.clone().unwrap_or_else(|| OPENAI_API_URL.to_string()),
            },
        };

        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| SleuthError::Backend(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            api_key,
            endpoint,
            model: config.model.clone(),
            max_tokens: config.max_tokens,
        })
    }

    /// Messages map one to one; tool call arguments travel as JSON strings
    fn convert_message(message: &Message) -> Value {
        match message.role {
            Role::System => json!({ "role": "system", "content": message.content }),
            Role::User => json!({ "role": "user", "content": message.content }),
            Role::Assistant if message.tool_calls.is_empty() => {
                json!({ "role": "assistant", "content": message.content })
            }
            Role::Assistant => {
                let calls: Vec<Value> = message
                    .tool_calls
                    .iter()
                    .map(|call| {
                        json!({
                            "id": call.id,
                            "type": "function",
                            "function": { "name": call.name, "arguments": call.input.to_string() }
                        })
                    })
                    .collect();
                let content = if message.content.is_empty() { Value::Null } else { json!(message.content) };
                json!({ "role": "assistant", "content": content, "tool_calls": calls })
            }
            Role::Tool => json!({
                "role": "tool",
                "content": message.content,
                "tool_call_id": message.tool_call_id
            }),
        }
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        let model = request.model.as_deref().unwrap_or(&self.model);
        let messages: Vec<Value> = request.messages.iter().map(Self::convert_message).collect();

        let mut body = json!({
            "model": model,
            "messages": messages,
            "max_completion_tokens": request.max_tokens.unwrap_or(self.max_tokens),
            "stream": false
        });

        if !request.tools.is_empty() {
            let tools: Vec<Value> = request.tools.iter().map(|t| t.to_openai_schema()).collect();
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }

    fn parse_response(body: Value) -> Result<CompletionResponse> {
        let choice = body["choices"]
            .get(0)
            .ok_or_else(|| SleuthError::Backend("Response has no choices".to_string()))?;
        let message = &choice["message"];

        let content = message["content"].as_str().unwrap_or_default().to_string();

        let mut tool_calls = Vec::new();
        for call in message["tool_calls"].as_array().into_iter().flatten() {
            let arguments = call["function"]["arguments"].as_str().unwrap_or("{}");
            let input = serde_json::from_str(arguments).unwrap_or_else(|e| {
                warn!("Tool call arguments are not valid JSON ({}): {}", e, arguments);
                json!({})
            });
            tool_calls.push(ToolCall::new(
                call["id"].as_str().unwrap_or_default(),
                call["function"]["name"].as_str().unwrap_or_default(),
                input,
            ));
        }

        let stop_reason = match choice["finish_reason"].as_str() {
            Some("tool_calls") => StopReason::ToolUse,
            Some("length") => StopReason::MaxTokens,
            _ => StopReason::EndTurn,
        };

        let usage = Usage::new(
            body["usage"]["prompt_tokens"].as_u64().unwrap_or(0),
            body["usage"]["completion_tokens"].as_u64().unwrap_or(0),
        );

        Ok(CompletionResponse {
            content,
            tool_calls,
            stop_reason,
            usage,
        })
    }

    async fn send_request(&self, url: &str, body: Value) -> Result<Value> {
        let builder = self.client.post(url).json(&body);
        let builder = match self.endpoint {
            Endpoint::Azure { .. } => builder.header("api-key", &self.api_key),
            Endpoint::OpenAi { .. } => builder.bearer_auth(&self.api_key),
        };

        let response = builder
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
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse> {
        let model = request.model.clone().unwrap_or_else(|| self.model.clone());
        let url = self.endpoint.url(&model);
        let body = self.build_request(&request);
        debug!("Chat completion request to {} with {} messages", url, request.messages.len());
        let response = self.send_request(&url, body).await?;
        Self::parse_response(response)
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl std::fmt::Debug for OpenAiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiClient")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .finish()
    }
}
