use std::time::Duration;

use tira_runtime::{ChatRequest, ChatResponse, CompletionProvider, ProviderError};

/// Single completion call, bounded by `timeout` when one is configured.
pub(crate) async fn complete(
    provider: &dyn CompletionProvider,
    req: ChatRequest,
    timeout: Option<Duration>,
) -> Result<ChatResponse, ProviderError> {
    match timeout {
        Some(limit) => tokio::time::timeout(limit, provider.complete(req))
            .await
            .map_err(|_| ProviderError::Timeout(limit))?,
        None => provider.complete(req).await,
    }
}
