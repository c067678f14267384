//! Text transforms backed by a generative session: title correction and the
//! daily briefing.
//!
//! Both operations return `Result` and leave the fallback policy to the
//! caller; `correct_or_original` is the identity-fallback convenience used by
//! the list controller.

mod session;

pub use session::GenerativeSession;

use crate::llm::{ChatOptions, LlmClient, LlmError};
use crate::todo::DailyBriefing;
use serde::Deserialize;
use std::sync::Arc;
use thiserror::Error;

const CORRECTION_INSTRUCTIONS: &str = "You are a highly accurate text correction AI. \
Your task is to correct any grammatical errors, spelling mistakes, and awkward phrasing in the provided text.
Maintain the original language of the input text.
Return only the corrected text. Do NOT include any quotes, delimiters, or extra explanations.";

const BRIEFING_INSTRUCTIONS: &str = "You write short daily briefings for a personal to-do list. \
Reply with a JSON object of the form {\"summary\": \"...\"} where summary is a single, concise, \
actionable sentence summarizing today's tasks. Highlight key tasks, deadlines, and important notes.";

/// Titles are short; anything longer than this is not a correction.
const CORRECTION_MAX_TOKENS: u64 = 256;
const BRIEFING_MAX_TOKENS: u64 = 200;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("The model is busy with another request")]
    ModelBusy,

    #[error("Model request failed: {0}")]
    Model(#[from] LlmError),

    #[error("The model returned an empty response")]
    EmptyResponse,
}

/// Correction prompt. The text to correct is always the last line.
pub fn correction_prompt(text: &str) -> String {
    format!(
        "Please correct the following text for any grammatical errors, spelling mistakes, and awkward phrasing.
Maintain the original language of the input text.
Only return the corrected text, without any quotes or delimiters around it.

Text to correct:
{}",
        text
    )
}

/// Summarization prompt over pre-formatted task lines. The task list comes last.
pub fn briefing_prompt(task_lines: &[String]) -> String {
    format!(
        "Summarize the following list of tasks into a single, concise, actionable sentence for today's briefing.
Highlight key tasks, deadlines, and important notes.
Maintain the original language of the input text.
Example summary: \"Today you need to finish the AI app and write the review; the AI app deadline is close.\"

Tasks:
{}",
        task_lines.join("\n")
    )
}

/// Strip whitespace and a single pair of wrapping quotes.
fn clean_model_text(raw: &str) -> String {
    let trimmed = raw.trim();
    for (open, close) in [('"', '"'), ('\'', '\''), ('“', '”')] {
        if let Some(inner) = trimmed
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner.trim().to_string();
        }
    }
    trimmed.to_string()
}

#[derive(Deserialize)]
struct BriefingPayload {
    summary: String,
}

/// Read `{"summary": ...}`; models that ignore JSON mode get their raw text used.
fn parse_briefing(raw: &str) -> Result<DailyBriefing, TransformError> {
    let summary = match serde_json::from_str::<BriefingPayload>(raw.trim()) {
        Ok(payload) => clean_model_text(&payload.summary),
        Err(_) => clean_model_text(raw),
    };
    if summary.is_empty() {
        return Err(TransformError::EmptyResponse);
    }
    Ok(DailyBriefing::new(summary))
}

/// Correction and summarization over two independent sessions, so a running
/// briefing never blocks a title correction (and vice versa).
pub struct TextTransformService {
    corrector: GenerativeSession,
    summarizer: GenerativeSession,
}

impl TextTransformService {
    pub fn new(client: Arc<dyn LlmClient>, model: &str) -> Self {
        Self {
            corrector: GenerativeSession::new(client.clone(), model, CORRECTION_INSTRUCTIONS),
            summarizer: GenerativeSession::new(client, model, BRIEFING_INSTRUCTIONS),
        }
    }

    pub fn is_correcting(&self) -> bool {
        self.corrector.is_responding()
    }

    pub fn is_summarizing(&self) -> bool {
        self.summarizer.is_responding()
    }

    /// Grammar/spelling-corrected `text`, in its original language.
    pub async fn correct(&self, text: &str) -> Result<String, TransformError> {
        tracing::debug!("Correcting text: {:?}", text);
        let options = ChatOptions {
            temperature: Some(0.0),
            max_tokens: Some(CORRECTION_MAX_TOKENS),
            ..Default::default()
        };
        let raw = self
            .corrector
            .collect_response(&correction_prompt(text), options)
            .await?;
        let corrected = clean_model_text(&raw);
        if corrected.is_empty() {
            return Err(TransformError::EmptyResponse);
        }
        tracing::debug!("Corrected text: {:?}", corrected);
        Ok(corrected)
    }

    /// `correct`, falling back to the original text on any failure.
    pub async fn correct_or_original(&self, text: &str) -> String {
        match self.correct(text).await {
            Ok(corrected) => corrected,
            Err(TransformError::ModelBusy) => {
                tracing::info!("Correction session busy, keeping original: {:?}", text);
                text.to_string()
            }
            Err(TransformError::Model(e)) => {
                tracing::warn!(
                    "Correction failed (transient: {}), keeping original: {}",
                    e.is_transient(),
                    e
                );
                text.to_string()
            }
            Err(e) => {
                tracing::warn!("Correction failed, keeping original: {}", e);
                text.to_string()
            }
        }
    }

    /// One-sentence briefing for the given task lines.
    pub async fn summarize(&self, task_lines: &[String]) -> Result<DailyBriefing, TransformError> {
        tracing::debug!("Summarizing {} tasks", task_lines.len());
        let options = ChatOptions {
            temperature: Some(0.3),
            max_tokens: Some(BRIEFING_MAX_TOKENS),
            json_object: true,
        };
        let raw = self
            .summarizer
            .respond(&briefing_prompt(task_lines), options)
            .await?;
        parse_briefing(&raw)
    }
}
