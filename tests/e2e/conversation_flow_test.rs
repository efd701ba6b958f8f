use std::sync::Arc;

use httpmock::prelude::*;
use tira_context::{ContextConfig, ContextError, ContextManager, Turn};
use tira_runtime::OpenAIProvider;

fn config() -> ContextConfig {
    ContextConfig {
        persona_prompt: "PERSONA".to_string(),
        summary_instruction: "SUMMARIZE".to_string(),
        previous_summary_prefix: "BEFORE:".to_string(),
        summary_prefix: "SO FAR:".to_string(),
        ..ContextConfig::default()
    }
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-mock",
        "object": "chat.completion",
        "created": 1700000000,
        "model": "gpt-3.5-turbo",
        "choices": [
            {
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }
        ]
    })
}

#[tokio::test]
#[ignore = "e2e-ish integration using httpmock"]
async fn third_question_triggers_compression_against_mock_api() {
    let server = MockServer::start_async().await;

    let summary_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .header("authorization", "Bearer test-api-key")
                .body_includes("SUMMARIZE");
            then.status(200).json_body(completion("they greeted each other"));
        })
        .await;
    let answer_mock = server
        .mock_async(|when, then| {
            when.method(POST)
                .path("/v1/chat/completions")
                .body_includes("PERSONA");
            then.status(200).json_body(completion("mocked answer"));
        })
        .await;
    let provider = Arc::new(OpenAIProvider::new(
        "test-api-key",
        format!("{}/v1", server.base_url()),
        "gpt-3.5-turbo",
    ));
    let manager = ContextManager::new(provider, config());

    for question in ["hi", "how are you", "what did we talk about"] {
        let answer = manager.ask("user-42", question).await.unwrap();
        assert_eq!(answer, "mocked answer");
    }

    summary_mock.assert_hits_async(1).await;
    answer_mock.assert_hits_async(3).await;
    assert_eq!(manager.store().get_turns("user-42").await.len(), 3);
    assert_eq!(
        manager.store().get_summary("user-42").await.as_deref(),
        Some("they greeted each other")
    );
}

#[tokio::test]
#[ignore = "e2e-ish integration using httpmock"]
async fn upstream_error_is_reported_and_nothing_is_recorded() {
    let server = MockServer::start_async().await;
    server
        .mock_async(|when, then| {
            when.method(POST).path("/v1/chat/completions");
            then.status(500).json_body(serde_json::json!({
                "error": {"message": "The server had an error", "type": "server_error"}
            }));
        })
        .await;

    let provider = Arc::new(OpenAIProvider::new(
        "test-api-key",
        format!("{}/v1", server.base_url()),
        "gpt-3.5-turbo",
    ));
    let manager = ContextManager::new(provider, config());

    let err = manager.ask("user-42", "hi").await.unwrap_err();

    assert!(matches!(err, ContextError::UpstreamCompletion(_)));
    assert!(err.to_string().contains("The server had an error"));
    assert_eq!(manager.store().get_turns("user-42").await, Vec::<Turn>::new());
}
