//! Rolling summary compression

use std::sync::Arc;

use tira_runtime::{ChatMessage, ChatRequest, CompletionProvider};

use crate::config::ContextConfig;
use crate::error::ContextResult;
use crate::history::{HistoryStore, Turn};
use crate::upstream;

/// Folds one turn at a time into a conversation's rolling summary by asking
/// the completion endpoint to merge it with the previous summary.
#[derive(Clone)]
pub struct SummaryCompressor {
    provider: Arc<dyn CompletionProvider>,
    store: Arc<HistoryStore>,
    config: Arc<ContextConfig>,
}

impl SummaryCompressor {
    pub fn new(
        provider: Arc<dyn CompletionProvider>,
        store: Arc<HistoryStore>,
        config: Arc<ContextConfig>,
    ) -> Self {
        Self {
            provider,
            store,
            config,
        }
    }

    /// Merge `turn` into the summary, store the result and return it wrapped
    /// as a system message. On failure the stored summary is untouched.
    ///
    /// Not serialised per conversation; concurrent callers for the same id
    /// must coordinate themselves.
    pub async fn compress(&self, conversation_id: &str, turn: &Turn) -> ContextResult<ChatMessage> {
        let summary = self.summarize(conversation_id, turn).await?;
        self.store.set_summary(conversation_id, summary.clone()).await;
        Ok(self.summary_message(&summary))
    }

    /// Produce the merged summary without storing it.
    pub async fn summarize(&self, conversation_id: &str, turn: &Turn) -> ContextResult<String> {
        let previous = self.store.get_summary(conversation_id).await;
        let request = self.request(previous.as_deref(), turn);

        tracing::debug!(
            conversation_id,
            has_previous = previous.is_some(),
            "compressing turn into rolling summary"
        );

        let response = upstream::complete(
            self.provider.as_ref(),
            request,
            self.config.request_timeout(),
        )
        .await
        .inspect_err(|err| {
            tracing::warn!(conversation_id, error = %err, "summary compression failed");
        })?;

        Ok(response.first_text().to_string())
    }

    /// The summarization request for `turn` on top of `previous`.
    pub fn request(&self, previous: Option<&str>, turn: &Turn) -> ChatRequest {
        let mut messages = vec![ChatMessage::system(self.config.summary_instruction.clone())];
        if let Some(previous) = previous {
            messages.push(ChatMessage::system(format!(
                "{}{}",
                self.config.previous_summary_prefix, previous
            )));
        }
        messages.extend(turn.to_messages());

        ChatRequest::new(self.config.model.clone(), messages)
    }

    pub fn summary_message(&self, summary: &str) -> ChatMessage {
        ChatMessage::system(format!("{}{}", self.config.summary_prefix, summary))
    }
}
