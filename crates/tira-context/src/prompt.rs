//! Prompt assembly for a new question

use std::sync::Arc;

use tira_runtime::ChatMessage;

use crate::config::ContextConfig;
use crate::error::ContextResult;
use crate::history::{HistoryStore, Turn};
use crate::summary::SummaryCompressor;

/// Messages for the answer call plus a summary that still has to be stored.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct StagedPrompt {
    pub(crate) messages: Vec<ChatMessage>,
    pub(crate) summary: Option<String>,
}

/// Builds the ordered message list sent for each new question.
///
/// Layout: persona, rolling summary (once two or more turns exist), the most
/// recent turn verbatim, then the new question. The summary is recomputed on
/// every build from the turn two back, so the latest turn never gets folded
/// in before it has been shown verbatim once.
#[derive(Clone)]
pub struct PromptBuilder {
    store: Arc<HistoryStore>,
    compressor: SummaryCompressor,
    config: Arc<ContextConfig>,
}

impl PromptBuilder {
    pub fn new(
        store: Arc<HistoryStore>,
        compressor: SummaryCompressor,
        config: Arc<ContextConfig>,
    ) -> Self {
        Self {
            store,
            compressor,
            config,
        }
    }

    /// Assemble the prompt for `question`, compressing (and storing) the
    /// second-to-last turn into the summary when there is one.
    ///
    /// Takes no per-conversation lock. Callers combining this with
    /// [`HistoryStore::append`] must serialise calls for one id themselves;
    /// [`ContextManager::ask`](crate::ContextManager::ask) already does.
    pub async fn build(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> ContextResult<Vec<ChatMessage>> {
        let turns = self.store.get_turns(conversation_id).await;

        let summary_message = match second_last(&turns) {
            Some(turn) => Some(self.compressor.compress(conversation_id, turn).await?),
            None => None,
        };

        Ok(self.assemble(summary_message, turns.last(), question))
    }

    /// Same layout as [`build`](Self::build), but the new summary is handed
    /// back instead of stored.
    pub(crate) async fn build_staged(
        &self,
        conversation_id: &str,
        question: &str,
    ) -> ContextResult<StagedPrompt> {
        let turns = self.store.get_turns(conversation_id).await;

        let summary = match second_last(&turns) {
            Some(turn) => Some(self.compressor.summarize(conversation_id, turn).await?),
            None => None,
        };
        let summary_message = summary
            .as_deref()
            .map(|text| self.compressor.summary_message(text));

        Ok(StagedPrompt {
            messages: self.assemble(summary_message, turns.last(), question),
            summary,
        })
    }

    fn assemble(
        &self,
        summary_message: Option<ChatMessage>,
        last_turn: Option<&Turn>,
        question: &str,
    ) -> Vec<ChatMessage> {
        let mut messages = vec![ChatMessage::system(self.config.persona_prompt.clone())];
        messages.extend(summary_message);
        if let Some(turn) = last_turn {
            messages.extend(turn.to_messages());
        }
        messages.push(ChatMessage::user(question));

        tracing::debug!(messages = messages.len(), "assembled prompt");
        messages
    }
}

fn second_last(turns: &[Turn]) -> Option<&Turn> {
    turns.len().checked_sub(2).map(|index| &turns[index])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tira_runtime::MockProvider;

    struct Fixture {
        provider: Arc<MockProvider>,
        store: Arc<HistoryStore>,
        builder: PromptBuilder,
        config: ContextConfig,
    }

    fn fixture() -> Fixture {
        let provider = Arc::new(MockProvider::new());
        let store = Arc::new(HistoryStore::new());
        let config = Arc::new(ContextConfig::default());
        let compressor = SummaryCompressor::new(provider.clone(), store.clone(), config.clone());
        let builder = PromptBuilder::new(store.clone(), compressor, config.clone());
        Fixture {
            provider,
            store,
            builder,
            config: (*config).clone(),
        }
    }

    #[test]
    fn second_last_needs_two_turns() {
        assert_eq!(second_last(&[]), None);
        assert_eq!(second_last(&[Turn::new("q1", "a1")]), None);

        let turns = [Turn::new("q1", "a1"), Turn::new("q2", "a2"), Turn::new("q3", "a3")];
        assert_eq!(second_last(&turns), Some(&turns[1]));
    }

    #[tokio::test]
    async fn empty_history_gives_persona_and_question() {
        let fx = fixture();

        let prompt = fx.builder.build("chat", "hi").await.unwrap();

        assert_eq!(
            prompt,
            vec![
                ChatMessage::system(fx.config.persona_prompt.clone()),
                ChatMessage::user("hi"),
            ]
        );
        assert!(fx.provider.requests().is_empty());
    }

    #[tokio::test]
    async fn single_turn_is_replayed_without_summary() {
        let fx = fixture();
        fx.store.append("chat", Turn::new("hi", "hello")).await;

        let prompt = fx.builder.build("chat", "q2").await.unwrap();

        assert_eq!(
            prompt,
            vec![
                ChatMessage::system(fx.config.persona_prompt.clone()),
                ChatMessage::user("hi"),
                ChatMessage::assistant("hello"),
                ChatMessage::user("q2"),
            ]
        );
        assert!(fx.provider.requests().is_empty());
        assert_eq!(fx.store.get_summary("chat").await, None);
    }

    #[tokio::test]
    async fn two_turns_compress_the_older_one() {
        let fx = fixture();
        fx.store.append("chat", Turn::new("q1", "a1")).await;
        fx.store.append("chat", Turn::new("q2", "a2")).await;
        fx.provider.enqueue_text("summary one");

        let prompt = fx.builder.build("chat", "q3").await.unwrap();

        assert_eq!(
            prompt,
            vec![
                ChatMessage::system(fx.config.persona_prompt.clone()),
                ChatMessage::system(format!("{}summary one", fx.config.summary_prefix)),
                ChatMessage::user("q2"),
                ChatMessage::assistant("a2"),
                ChatMessage::user("q3"),
            ]
        );

        let sent = fx.provider.requests();
        assert_eq!(sent.len(), 1);
        assert_eq!(&sent[0].messages[1..], &Turn::new("q1", "a1").to_messages());
        assert_eq!(fx.store.get_summary("chat").await.as_deref(), Some("summary one"));
    }

    #[tokio::test]
    async fn staged_build_does_not_store_summary() {
        let fx = fixture();
        fx.store.append("chat", Turn::new("q1", "a1")).await;
        fx.store.append("chat", Turn::new("q2", "a2")).await;
        fx.provider.enqueue_text("pending");

        let staged = fx.builder.build_staged("chat", "q3").await.unwrap();

        assert_eq!(staged.summary.as_deref(), Some("pending"));
        assert_eq!(staged.messages.len(), 5);
        assert_eq!(fx.store.get_summary("chat").await, None);
        assert_eq!(fx.store.get_turns("chat").await.len(), 2);
    }
}
