//! Scripted LLM client for unit tests.

use super::{ChatMessage, ChatOptions, ChatResponse, LlmClient, LlmError, Role, TextStream};
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::Semaphore;

type Responder = Box<dyn Fn(&str) -> Result<String, LlmError> + Send + Sync>;
type GateFilter = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// Answers each prompt through a closure, optionally held behind a gate.
pub(crate) struct ScriptedClient {
    responder: Responder,
    gate: Option<Arc<Semaphore>>,
    gate_filter: Option<GateFilter>,
    calls: AtomicUsize,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedClient {
    pub(crate) fn new(
        responder: impl Fn(&str) -> Result<String, LlmError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            responder: Box::new(responder),
            gate: None,
            gate_filter: None,
            calls: AtomicUsize::new(0),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// Always answer with `text`.
    pub(crate) fn fixed(text: &str) -> Self {
        let text = text.to_string();
        Self::new(move |_| Ok(text.clone()))
    }

    /// Every call waits for a permit on the returned semaphore.
    pub(crate) fn gated(mut self) -> (Self, Arc<Semaphore>) {
        let gate = Arc::new(Semaphore::new(0));
        self.gate = Some(gate.clone());
        (self, gate)
    }

    /// Only prompts matching `filter` wait on the gate.
    pub(crate) fn gated_on(
        self,
        filter: impl Fn(&str) -> bool + Send + Sync + 'static,
    ) -> (Self, Arc<Semaphore>) {
        let (mut client, gate) = self.gated();
        client.gate_filter = Some(Box::new(filter));
        (client, gate)
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn prompts(&self) -> Vec<String> {
        self.prompts.lock().expect("prompts lock").clone()
    }

    /// Wait until at least `n` calls have reached the client.
    pub(crate) async fn wait_for_calls(&self, n: usize) {
        for _ in 0..500 {
            if self.calls() >= n {
                return;
            }
            tokio::time::sleep(Duration::from_millis(2)).await;
        }
        panic!("expected {} calls, saw {}", n, self.calls());
    }

    async fn answer(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let prompt = messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.clone())
            .unwrap_or_default();
        self.prompts.lock().expect("prompts lock").push(prompt.clone());
        self.calls.fetch_add(1, Ordering::SeqCst);
        let gated = self.gate_filter.as_ref().map_or(true, |f| f(&prompt));
        if let Some(gate) = self.gate.as_ref().filter(|_| gated) {
            gate.acquire().await.expect("gate closed").forget();
        }
        (self.responder)(&prompt)
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn chat_completion(
        &self,
        model: &str,
        messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<ChatResponse, LlmError> {
        let content = self.answer(messages).await?;
        Ok(ChatResponse {
            content: Some(content),
            finish_reason: Some("stop".to_string()),
            usage: None,
            model: Some(model.to_string()),
        })
    }

    async fn chat_completion_stream(
        &self,
        _model: &str,
        messages: &[ChatMessage],
        _options: ChatOptions,
    ) -> Result<TextStream, LlmError> {
        let content = self.answer(messages).await?;
        let chunks: Vec<Result<String, LlmError>> = content
            .split_inclusive(' ')
            .map(|part| Ok(part.to_string()))
            .collect();
        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}
