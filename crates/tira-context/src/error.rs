//! Error types for context management

use thiserror::Error;
use tira_runtime::ProviderError;

/// Context management error type
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ContextError {
    /// The completion endpoint call failed. Carries the upstream diagnostic.
    #[error("completion endpoint error: {0}")]
    UpstreamCompletion(#[from] ProviderError),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Result type for context operations
pub type ContextResult<T> = Result<T, ContextError>;
