//! Reasoning backend layer
//!
//! This module provides:
//! - Provider-neutral message types
//! - LlmClient trait for backend abstraction
//! - Anthropic and OpenAI/Azure implementations
//! - A scripted client for tests

pub mod anthropic;
pub mod client;
pub mod openai;
pub mod types;

pub use anthropic::{AnthropicClient, AnthropicConfig};
pub use client::{LlmClient, MockLlmClient};
pub use openai::OpenAiClient;
pub use types::{CompletionRequest, CompletionResponse, Message, Role, StopReason, ToolCall, ToolDefinition, Usage};

use crate::config::{LlmConfig, Provider};
use crate::error::Result;

/// Build the client for the configured provider
pub fn build_client(config: &LlmConfig) -> Result<Box<dyn LlmClient>> {
    log::info!("Using {:?} backend with model {}", config.provider, config.model);
    Ok(match config.provider {
        Provider::Anthropic => Box::new(AnthropicClient::from_config(config)?),
        Provider::OpenAi => Box::new(OpenAiClient::from_config(config)?),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SleuthError;

    #[test]
    fn test_build_client_requires_key() {
        for provider in [Provider::Anthropic, Provider::OpenAi] {
            let config = LlmConfig {
                provider,
                api_key_env: Some("RRSLEUTH_TEST_UNSET_KEY".to_string()),
                ..Default::default()
            };
            assert!(matches!(build_client(&config), Err(SleuthError::Backend(_))));
        }
    }
}
