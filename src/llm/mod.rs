//! LLM client module for interacting with language models.
//!
//! This module provides a trait-based abstraction over chat-completion
//! providers, with OpenRouter as the primary implementation. Clients are
//! stateless; turn-taking and the busy flag live in
//! [`crate::transform::GenerativeSession`].

mod error;
mod openrouter;
#[cfg(test)]
pub(crate) mod testing;

pub use error::{classify_http_status, LlmError, LlmErrorKind};
pub use openrouter::OpenRouterClient;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use std::pin::Pin;

/// Role in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in a chat conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    /// Create a simple text message.
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        ChatMessage {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }
}

/// Response from a chat completion.
#[derive(Debug, Clone)]
pub struct ChatResponse {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
    pub model: Option<String>,
}

/// Token usage information (if provided by the upstream provider).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl TokenUsage {
    /// Create a usage object ensuring `total_tokens` is consistent.
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens.saturating_add(completion_tokens),
        }
    }
}

/// Optional parameters for chat completions.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    /// Sampling temperature (0 = deterministic).
    pub temperature: Option<f64>,
    /// Maximum output tokens to generate.
    pub max_tokens: Option<u64>,
    /// Ask the provider for a JSON object instead of free text.
    pub json_object: bool,
}

/// Incremental text chunks from a streaming completion.
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String, LlmError>> + Send>>;

/// Trait for LLM clients.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a chat completion request.
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError>;

    /// Stream a chat completion as text chunks.
    ///
    /// Default implementation yields the whole `chat_completion` content as a
    /// single chunk.
    async fn chat_completion_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<TextStream, LlmError> {
        let response = self.chat_completion(model, messages, options).await?;
        let content = response.content.unwrap_or_default();
        Ok(Box::pin(futures::stream::once(async move {
            Ok::<_, LlmError>(content)
        })))
    }
}

/// Offline client that answers every prompt with its own final non-empty line.
///
/// Used when no API key is configured. Prompts put their payload last, so
/// corrections come back unchanged and briefings repeat the newest task.
pub struct EchoClient;

#[async_trait]
impl LlmClient for EchoClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();
        let content = prompt
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .map(|line| line.trim().to_string())
            .unwrap_or_default();
        Ok(ChatResponse {
            content: Some(content),
            finish_reason: Some("stop".to_string()),
            usage: None,
            model: Some(model.to_string()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn echo_client_returns_last_prompt_line() {
        let messages = vec![
            ChatMessage::system("be helpful"),
            ChatMessage::user("Please fix this.\n\nText to correct:\nhello wrld\n"),
        ];
        let response = EchoClient
            .chat_completion("offline", &messages, ChatOptions::default())
            .await
            .expect("echo");
        assert_eq!(response.content.as_deref(), Some("hello wrld"));
    }

    #[tokio::test]
    async fn default_stream_yields_single_chunk() {
        let messages = vec![ChatMessage::user("one\ntwo")];
        let chunks: Vec<String> = EchoClient
            .chat_completion_stream("offline", &messages, ChatOptions::default())
            .await
            .expect("stream")
            .map(|chunk| chunk.expect("chunk"))
            .collect()
            .await;
        assert_eq!(chunks, vec!["two".to_string()]);
    }

    #[test]
    fn token_usage_total_is_consistent() {
        let usage = TokenUsage::new(12, 30);
        assert_eq!(usage.total_tokens, 42);
    }
}
