//! Completion provider implementations
//!
//! Concrete implementations of the [`CompletionProvider`](crate::CompletionProvider)
//! trait for hosted chat completion services.

pub mod openai;

pub use openai::OpenAIProvider;
