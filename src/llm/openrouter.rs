//! OpenRouter API client implementation.

use async_trait::async_trait;
use futures::{Stream, StreamExt};
use reqwest::Client;
use reqwest_eventsource::{Event, EventSource};
use serde::{Deserialize, Serialize};

use super::error::LlmError;
use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, TextStream, TokenUsage};

const OPENROUTER_API_URL: &str = "https://openrouter.ai/api/v1/chat/completions";

/// OpenRouter API client.
pub struct OpenRouterClient {
    client: Client,
    api_key: String,
    api_url: String,
}

impl OpenRouterClient {
    pub fn new(api_key: String) -> Self {
        Self::with_api_url(api_key, OPENROUTER_API_URL.to_string())
    }

    /// Point the client at another OpenAI-compatible endpoint.
    pub fn with_api_url(api_key: String, api_url: String) -> Self {
        Self {
            client: Client::new(),
            api_key,
            api_url,
        }
    }

    fn build_request(
        model: &str,
        messages: &[ChatMessage],
        options: &ChatOptions,
        stream: bool,
    ) -> OpenRouterRequest {
        OpenRouterRequest {
            model: model.to_string(),
            messages: messages.to_vec(),
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_object.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            stream: stream.then_some(true),
        }
    }

    fn request_builder(&self, request: &OpenRouterRequest) -> reqwest::RequestBuilder {
        self.client
            .post(&self.api_url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .header("X-Title", "taskbrief")
            .json(request)
    }

    fn parse_response(body: &str, requested_model: &str) -> Result<ChatResponse, LlmError> {
        let parsed: OpenRouterResponse = serde_json::from_str(body).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse response: {}, body: {}", e, body))
        })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::parse_error("No choices in response".to_string()))?;

        Ok(ChatResponse {
            content: choice.message.content,
            finish_reason: choice.finish_reason,
            usage: parsed
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
            model: parsed.model.or_else(|| Some(requested_model.to_string())),
        })
    }

    /// Extract the text delta from one SSE `data:` payload.
    ///
    /// Returns `Ok(None)` for the `[DONE]` sentinel.
    fn parse_stream_chunk(data: &str) -> Result<Option<String>, LlmError> {
        let data = data.trim();
        if data == "[DONE]" {
            return Ok(None);
        }
        let chunk: OpenRouterStreamChunk = serde_json::from_str(data).map_err(|e| {
            LlmError::parse_error(format!("Failed to parse stream chunk: {}, data: {}", e, data))
        })?;
        let text = chunk
            .choices
            .into_iter()
            .filter_map(|c| c.delta.content)
            .collect::<String>();
        Ok(Some(text))
    }
}

#[async_trait]
impl LlmClient for OpenRouterClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let request = Self::build_request(model, messages, &options, false);

        tracing::debug!("Sending request to OpenRouter: model={}", model);

        let response = self
            .request_builder(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    LlmError::network_error(format!("Request timeout: {}", e))
                } else if e.is_connect() {
                    LlmError::network_error(format!("Connection failed: {}", e))
                } else {
                    LlmError::network_error(format!("Request failed: {}", e))
                }
            })?;

        let status = response.status();
        let body = response.text().await.unwrap_or_default();

        if !status.is_success() {
            return Err(LlmError::from_status(status.as_u16(), &body));
        }

        Self::parse_response(&body, model)
    }

    async fn chat_completion_stream(
        &self,
        model: &str,
        messages: &[ChatMessage],
        options: ChatOptions,
    ) -> Result<TextStream, LlmError> {
        let request = Self::build_request(model, messages, &options, true);

        tracing::debug!("Opening OpenRouter stream: model={}", model);

        let source = EventSource::new(self.request_builder(&request))
            .map_err(|e| LlmError::network_error(format!("Failed to open stream: {}", e)))?;

        Ok(Box::pin(sse_text_stream(source)))
    }
}

/// Turn an OpenAI-style SSE completion into text deltas.
fn sse_text_stream(
    mut source: EventSource,
) -> impl Stream<Item = Result<String, LlmError>> + Send {
    async_stream::try_stream! {
        while let Some(event) = source.next().await {
            match event {
                Ok(Event::Open) => {}
                Ok(Event::Message(message)) => {
                    match OpenRouterClient::parse_stream_chunk(&message.data)? {
                        Some(text) if !text.is_empty() => {
                            yield text;
                        }
                        Some(_) => {}
                        None => break,
                    }
                }
                Err(reqwest_eventsource::Error::StreamEnded) => break,
                Err(reqwest_eventsource::Error::InvalidStatusCode(status, response)) => {
                    source.close();
                    let body = response.text().await.unwrap_or_default();
                    Err::<(), LlmError>(LlmError::from_status(status.as_u16(), &body))?;
                }
                Err(e) => {
                    source.close();
                    let err = LlmError::network_error(format!("Stream failed: {}", e));
                    Err::<(), LlmError>(err)?;
                }
            }
        }
        source.close();
    }
}

/// OpenRouter API request format.
#[derive(Debug, Serialize)]
struct OpenRouterRequest {
    model: String,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "Option::is_none")]
    stream: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

/// OpenRouter API response format.
#[derive(Debug, Deserialize)]
struct OpenRouterResponse {
    choices: Vec<OpenRouterChoice>,
    #[serde(default)]
    usage: Option<OpenRouterUsage>,
    #[serde(default)]
    model: Option<String>,
}

/// A choice in the OpenRouter response.
#[derive(Debug, Deserialize)]
struct OpenRouterChoice {
    message: OpenRouterMessage,
    finish_reason: Option<String>,
}

/// Message in OpenRouter response.
#[derive(Debug, Deserialize)]
struct OpenRouterMessage {
    content: Option<String>,
}

/// Usage data (OpenAI-compatible).
#[derive(Debug, Deserialize)]
struct OpenRouterUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

/// One server-sent event of a streaming completion.
#[derive(Debug, Deserialize)]
struct OpenRouterStreamChunk {
    #[serde(default)]
    choices: Vec<OpenRouterStreamChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenRouterStreamChoice {
    #[serde(default)]
    delta: OpenRouterDelta,
}

#[derive(Debug, Default, Deserialize)]
struct OpenRouterDelta {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmErrorKind;

    #[test]
    fn request_serializes_json_mode_and_stream_flag() {
        let options = ChatOptions {
            temperature: Some(0.0),
            json_object: true,
            ..Default::default()
        };
        let request = OpenRouterClient::build_request(
            "openai/gpt-4o-mini",
            &[ChatMessage::user("hi")],
            &options,
            true,
        );
        let value = serde_json::to_value(&request).expect("serialize");
        assert_eq!(value["response_format"]["type"], "json_object");
        assert_eq!(value["stream"], true);
        assert_eq!(value["messages"][0]["role"], "user");
        assert!(value.get("max_tokens").is_none());
    }

    #[test]
    fn parse_response_takes_first_choice() {
        let body = r#"{
            "choices": [{"message": {"content": "Go to the store"}, "finish_reason": "stop"}],
            "usage": {"prompt_tokens": 10, "completion_tokens": 4, "total_tokens": 14}
        }"#;
        let response = OpenRouterClient::parse_response(body, "m").expect("parse");
        assert_eq!(response.content.as_deref(), Some("Go to the store"));
        assert_eq!(response.model.as_deref(), Some("m"));
        assert_eq!(response.usage.map(|u| u.total_tokens), Some(14));
    }

    #[test]
    fn parse_response_without_choices_is_parse_error() {
        let err = OpenRouterClient::parse_response(r#"{"choices": []}"#, "m").unwrap_err();
        assert_eq!(err.kind, LlmErrorKind::ParseError);
    }

    #[test]
    fn parse_stream_chunks() {
        let chunk = r#"{"choices":[{"delta":{"content":"Go to"}}]}"#;
        assert_eq!(
            OpenRouterClient::parse_stream_chunk(chunk).expect("chunk"),
            Some("Go to".to_string())
        );
        let role_only = r#"{"choices":[{"delta":{"role":"assistant"}}]}"#;
        assert_eq!(
            OpenRouterClient::parse_stream_chunk(role_only).expect("chunk"),
            Some(String::new())
        );
        assert_eq!(
            OpenRouterClient::parse_stream_chunk(" [DONE] ").expect("done"),
            None
        );
        assert!(OpenRouterClient::parse_stream_chunk("{oops").is_err());
    }
}
