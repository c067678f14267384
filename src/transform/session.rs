//! Single-turn generative session with a one-request-at-a-time busy flag.

use super::TransformError;
use crate::llm::{ChatMessage, ChatOptions, LlmClient, LlmError, TextStream};
use futures::{Stream, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// A fixed set of instructions bound to a model and a client.
///
/// Each request is independent (no transcript is kept). While one request is
/// in flight, further requests fail with [`TransformError::ModelBusy`] instead
/// of queueing.
pub struct GenerativeSession {
    client: Arc<dyn LlmClient>,
    model: String,
    instructions: String,
    busy: Arc<AtomicBool>,
}

/// Clears the busy flag when dropped, including on error and cancellation.
struct BusyGuard {
    busy: Arc<AtomicBool>,
}

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

impl GenerativeSession {
    pub fn new(
        client: Arc<dyn LlmClient>,
        model: impl Into<String>,
        instructions: impl Into<String>,
    ) -> Self {
        Self {
            client,
            model: model.into(),
            instructions: instructions.into(),
            busy: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether a request on this session is still outstanding.
    pub fn is_responding(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    fn begin(&self) -> Result<BusyGuard, TransformError> {
        self.busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| TransformError::ModelBusy)?;
        Ok(BusyGuard {
            busy: self.busy.clone(),
        })
    }

    fn messages(&self, prompt: &str) -> Vec<ChatMessage> {
        vec![
            ChatMessage::system(self.instructions.clone()),
            ChatMessage::user(prompt),
        ]
    }

    /// Single-shot response.
    pub async fn respond(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<String, TransformError> {
        let _guard = self.begin()?;
        let response = self
            .client
            .chat_completion(&self.model, &self.messages(prompt), options)
            .await?;
        if let Some(usage) = &response.usage {
            tracing::debug!(
                "Response from {} used {} tokens ({} prompt, {} completion)",
                response.model.as_deref().unwrap_or(&self.model),
                usage.total_tokens,
                usage.prompt_tokens,
                usage.completion_tokens
            );
        }
        if response.finish_reason.as_deref() == Some("length") {
            tracing::warn!("Response hit the token limit and may be truncated");
        }
        response.content.ok_or(TransformError::EmptyResponse)
    }

    /// Streaming response. The session stays busy until the stream is
    /// exhausted or dropped.
    pub async fn stream_response(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<TextStream, TransformError> {
        let guard = self.begin()?;
        let inner = self
            .client
            .chat_completion_stream(&self.model, &self.messages(prompt), options)
            .await?;
        Ok(Box::pin(hold_while_streaming(guard, inner)))
    }

    /// Stream a response and concatenate its chunks.
    pub async fn collect_response(
        &self,
        prompt: &str,
        options: ChatOptions,
    ) -> Result<String, TransformError> {
        let mut stream = self.stream_response(prompt, options).await?;
        let mut text = String::new();
        while let Some(chunk) = stream.next().await {
            text.push_str(&chunk?);
        }
        Ok(text)
    }
}

fn hold_while_streaming(
    guard: BusyGuard,
    mut inner: TextStream,
) -> impl Stream<Item = Result<String, LlmError>> + Send {
    async_stream::try_stream! {
        let _guard = guard;
        while let Some(chunk) = inner.next().await {
            yield chunk?;
        }
    }
}
