//! Per-conversation turn log and rolling summary slot

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, RwLock};
use tira_runtime::ChatMessage;

/// One completed question/answer exchange.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
    pub asked_at: DateTime<Utc>,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
            asked_at: Utc::now(),
        }
    }

    /// The turn as a user message followed by an assistant message.
    pub fn to_messages(&self) -> [ChatMessage; 2] {
        [
            ChatMessage::user(self.question.clone()),
            ChatMessage::assistant(self.answer.clone()),
        ]
    }
}

impl PartialEq for Turn {
    fn eq(&self, other: &Self) -> bool {
        self.question == other.question && self.answer == other.answer
    }
}

impl Eq for Turn {}

/// Everything remembered about one conversation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConversationState {
    pub turns: Vec<Turn>,
    pub summary: Option<String>,
}

/// A conversation slot. `turn_lock` serialises whole ask cycles for one id.
#[derive(Debug, Default)]
pub(crate) struct Conversation {
    pub(crate) turn_lock: Mutex<()>,
    state: RwLock<ConversationState>,
}

/// History store keyed by conversation identifier.
///
/// Conversations are created lazily on first write and live as long as the
/// store. Turns are append-only; the summary is replaced wholesale.
#[derive(Debug, Default)]
pub struct HistoryStore {
    conversations: RwLock<HashMap<String, Arc<Conversation>>>,
}

impl HistoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or lazily create the slot for `conversation_id`.
    pub(crate) async fn conversation(&self, conversation_id: &str) -> Arc<Conversation> {
        if let Some(conversation) = self.conversations.read().await.get(conversation_id) {
            return Arc::clone(conversation);
        }

        let mut conversations = self.conversations.write().await;
        Arc::clone(
            conversations
                .entry(conversation_id.to_string())
                .or_default(),
        )
    }

    async fn existing(&self, conversation_id: &str) -> Option<Arc<Conversation>> {
        self.conversations
            .read()
            .await
            .get(conversation_id)
            .cloned()
    }

    /// Turns recorded so far, oldest first. Empty for unknown ids.
    pub async fn get_turns(&self, conversation_id: &str) -> Vec<Turn> {
        let Some(conversation) = self.existing(conversation_id).await else {
            return Vec::new();
        };
        let turns = conversation.state.read().await.turns.clone();
        turns
    }

    /// Each call is atomic on its own, but nothing here orders a read-build-append
    /// cycle. Callers driving the store directly must serialise per id;
    /// [`ContextManager::ask`](crate::ContextManager::ask) does.
    pub async fn append(&self, conversation_id: &str, turn: Turn) {
        let conversation = self.conversation(conversation_id).await;
        conversation.state.write().await.turns.push(turn);
    }

    pub async fn get_summary(&self, conversation_id: &str) -> Option<String> {
        let conversation = self.existing(conversation_id).await?;
        let summary = conversation.state.read().await.summary.clone();
        summary
    }

    /// Replace the rolling summary unconditionally.
    pub async fn set_summary(&self, conversation_id: &str, summary: impl Into<String>) {
        let conversation = self.conversation(conversation_id).await;
        conversation.state.write().await.summary = Some(summary.into());
    }

    /// Record a turn and, when given, its new summary under one write lock.
    pub(crate) async fn commit(&self, conversation_id: &str, turn: Turn, summary: Option<String>) {
        let conversation = self.conversation(conversation_id).await;
        let mut state = conversation.state.write().await;
        if let Some(summary) = summary {
            state.summary = Some(summary);
        }
        state.turns.push(turn);
    }

    pub async fn snapshot(&self, conversation_id: &str) -> ConversationState {
        let Some(conversation) = self.existing(conversation_id).await else {
            return ConversationState::default();
        };
        let state = conversation.state.read().await.clone();
        state
    }

    /// Identifiers with state, sorted.
    pub async fn conversation_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.conversations.read().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}
