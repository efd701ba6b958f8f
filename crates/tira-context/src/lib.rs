//! Tira Context Management - rolling conversation context
//!
//! This crate provides:
//! - A per-conversation history store of question/answer turns
//! - Rolling summary compression through a completion endpoint
//! - Prompt assembly for each new question
//! - The [`ContextManager::ask`] entry point tying them together

pub mod config;
pub mod error;
pub mod history;
pub mod manager;
pub mod prompt;
pub mod summary;
mod upstream;

pub use config::ContextConfig;
pub use error::{ContextError, ContextResult};
pub use history::{ConversationState, HistoryStore, Turn};
pub use manager::ContextManager;
pub use prompt::PromptBuilder;
pub use summary::SummaryCompressor;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::ContextConfig;
    pub use crate::error::{ContextError, ContextResult};
    pub use crate::history::{ConversationState, HistoryStore, Turn};
    pub use crate::manager::ContextManager;
    pub use crate::prompt::PromptBuilder;
    pub use crate::summary::SummaryCompressor;
}
