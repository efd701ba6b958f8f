//! Context manager implementation

use std::sync::Arc;

use tira_runtime::{ChatRequest, CompletionProvider};

use crate::config::ContextConfig;
use crate::error::ContextResult;
use crate::history::{HistoryStore, Turn};
use crate::prompt::PromptBuilder;
use crate::summary::SummaryCompressor;
use crate::upstream;

/// Context manager for long-lived conversations against a stateless
/// completion endpoint.
///
/// Calls for the same conversation id are serialised; distinct ids run
/// concurrently.
pub struct ContextManager {
    store: Arc<HistoryStore>,
    builder: PromptBuilder,
    provider: Arc<dyn CompletionProvider>,
    config: Arc<ContextConfig>,
}

impl ContextManager {
    pub fn new(provider: Arc<dyn CompletionProvider>, config: ContextConfig) -> Self {
        Self::with_store(provider, config, Arc::new(HistoryStore::new()))
    }

    /// Build a manager on top of an existing store.
    pub fn with_store(
        provider: Arc<dyn CompletionProvider>,
        config: ContextConfig,
        store: Arc<HistoryStore>,
    ) -> Self {
        let config = Arc::new(config);
        let compressor = SummaryCompressor::new(provider.clone(), store.clone(), config.clone());
        let builder = PromptBuilder::new(store.clone(), compressor, config.clone());

        Self {
            store,
            builder,
            provider,
            config,
        }
    }

    pub fn store(&self) -> &Arc<HistoryStore> {
        &self.store
    }

    pub fn config(&self) -> &ContextConfig {
        &self.config
    }

    /// Answer `question` within the conversation `conversation_id`.
    ///
    /// The turn, and any summary computed on the way, are only recorded once
    /// the endpoint has answered. A failed or cancelled call leaves the
    /// conversation exactly as it was.
    pub async fn ask(&self, conversation_id: &str, question: &str) -> ContextResult<String> {
        let conversation = self.store.conversation(conversation_id).await;
        let _turn = conversation.turn_lock.lock().await;

        let staged = self.builder.build_staged(conversation_id, question).await?;
        let request = ChatRequest::new(self.config.model.clone(), staged.messages);

        let response = upstream::complete(
            self.provider.as_ref(),
            request,
            self.config.request_timeout(),
        )
        .await
        .inspect_err(|err| {
            tracing::warn!(conversation_id, error = %err, "completion request failed");
        })?;

        let answer = response.first_text().to_string();
        self.store
            .commit(conversation_id, Turn::new(question, answer.clone()), staged.summary)
            .await;

        tracing::info!(
            conversation_id,
            provider = self.provider.name(),
            answer_len = answer.len(),
            "recorded turn"
        );

        Ok(answer)
    }
}
