//! Runtime abstractions for chat completion endpoints.
//!
//! The conversation core only ever talks to a [`CompletionProvider`]: it
//! sends an ordered list of role-tagged messages and reads back the first
//! candidate. Concrete providers live in [`providers`].

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod providers;

pub use providers::OpenAIProvider;

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
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

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
    /// Number of candidates to generate.
    pub candidates: u32,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
}

impl ChatRequest {
    /// Request a single candidate for `messages`.
    pub fn new(model: Option<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model,
            messages,
            candidates: 1,
            max_tokens: None,
            temperature: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Candidate {
    pub content: Option<String>,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ChatResponse {
    pub model: Option<String>,
    pub candidates: Vec<Candidate>,
}

impl ChatResponse {
    /// Response carrying a single candidate with `content`.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            model: None,
            candidates: vec![Candidate {
                content: Some(content.into()),
                finish_reason: Some("stop".to_string()),
            }],
        }
    }

    /// Content of the first candidate, empty when missing.
    pub fn first_text(&self) -> &str {
        self.candidates
            .first()
            .and_then(|candidate| candidate.content.as_deref())
            .unwrap_or_default()
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    #[error("transport error: {0}")]
    Transport(String),
    #[error("upstream returned {status}: {body}")]
    HttpStatus { status: u16, body: String },
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("request timed out after {0:?}")]
    Timeout(Duration),
    #[error("mock provider has no queued response")]
    MockQueueEmpty,
    #[error("provider error: {0}")]
    Message(String),
}

#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn name(&self) -> &'static str;

    async fn complete(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError>;
}

/// Scripted provider for tests. Responses are served in FIFO order and every
/// request is kept for later inspection.
#[derive(Debug, Default)]
pub struct MockProvider {
    queue: Mutex<VecDeque<Result<ChatResponse, ProviderError>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enqueue(&self, result: Result<ChatResponse, ProviderError>) {
        self.queue
            .lock()
            .expect("mock queue poisoned")
            .push_back(result);
    }

    pub fn enqueue_text(&self, content: impl Into<String>) {
        self.enqueue(Ok(ChatResponse::text(content)));
    }

    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().expect("mock requests poisoned").clone()
    }
}

#[async_trait]
impl CompletionProvider for MockProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn complete(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        self.requests
            .lock()
            .expect("mock requests poisoned")
            .push(req);
        self.queue
            .lock()
            .expect("mock queue poisoned")
            .pop_front()
            .unwrap_or(Err(ProviderError::MockQueueEmpty))
    }
}
