//! OpenAI API Provider
//!
//! Implements the CompletionProvider trait for OpenAI's Chat Completions API
//! and any endpoint speaking the same wire format.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;

use crate::{
    Candidate, ChatMessage, ChatRequest, ChatResponse, CompletionProvider, ProviderError,
};

const OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const CHAT_COMPLETIONS_PATH: &str = "/chat/completions";
const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

#[derive(Debug, Clone)]
pub struct OpenAIProvider {
    client: Client,
    api_key: String,
    base_url: String,
    pub default_model: String,
}

impl OpenAIProvider {
    /// Build a provider from `OPENAI_API_KEY`, `OPENAI_API_BASE` and
    /// `OPENAI_DEFAULT_MODEL`. A `.env` file is honoured when present.
    pub fn from_env() -> Result<Self, ProviderError> {
        let _ = dotenvy::dotenv();

        let api_key = env::var("OPENAI_API_KEY").map_err(|_| {
            ProviderError::Message("OPENAI_API_KEY environment variable must be set".to_string())
        })?;

        let base_url = env::var("OPENAI_API_BASE").unwrap_or_else(|_| OPENAI_API_BASE.to_string());

        let default_model =
            env::var("OPENAI_DEFAULT_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string());

        Ok(Self::new(api_key, base_url, default_model))
    }

    pub fn new(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            api_key: api_key.into(),
            base_url: base_url.into(),
            default_model: default_model.into(),
        }
    }

    pub fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url.trim_end_matches('/'), path)
    }

    pub fn get_model(&self, req: &ChatRequest) -> String {
        req.model.clone().unwrap_or_else(|| self.default_model.clone())
    }

    fn payload(&self, req: ChatRequest) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.get_model(&req),
            messages: req.messages.into_iter().map(WireMessage::from).collect(),
            n: req.candidates,
            max_tokens: req.max_tokens,
            temperature: req.temperature,
        }
    }

    async fn parse_error_response(status: StatusCode, response: reqwest::Response) -> ProviderError {
        let body = response
            .text()
            .await
            .unwrap_or_else(|_| "<unable to read body>".to_string());

        let parsed = serde_json::from_str::<ErrorEnvelope>(&body)
            .ok()
            .map(|err| err.error.message)
            .unwrap_or(body);

        ProviderError::HttpStatus {
            status: status.as_u16(),
            body: parsed,
        }
    }
}

#[async_trait]
impl CompletionProvider for OpenAIProvider {
    fn name(&self) -> &'static str {
        "openai"
    }

    async fn complete(&self, req: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let payload = self.payload(req);
        tracing::debug!(
            model = %payload.model,
            messages = payload.messages.len(),
            "sending chat completion"
        );

        let response = self
            .client
            .post(self.endpoint(CHAT_COMPLETIONS_PATH))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|err| ProviderError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Self::parse_error_response(status, response).await);
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|err| ProviderError::Decode(err.to_string()))?;

        Ok(ChatResponse {
            model: body.model,
            candidates: body
                .choices
                .into_iter()
                .map(|choice| Candidate {
                    content: choice.message.and_then(|message| message.content),
                    finish_reason: choice.finish_reason,
                })
                .collect(),
        })
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    n: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct WireMessage {
    role: &'static str,
    content: String,
}

impl From<ChatMessage> for WireMessage {
    fn from(message: ChatMessage) -> Self {
        Self {
            role: message.role.as_str(),
            content: message.content,
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    message: String,
}
