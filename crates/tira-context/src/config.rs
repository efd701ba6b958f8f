//! Persona and summarization configuration

use std::env;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{ContextError, ContextResult};

const DEFAULT_MODEL: &str = "gpt-3.5-turbo";

const DEFAULT_PERSONA_PROMPT: &str = "You are Tira Bot, a helpful AI assistant that answers any \
question usefully and factually. You can reply to voice messages and text messages in every \
widely spoken language.";

const DEFAULT_SUMMARY_INSTRUCTION: &str = "Your only task is to summarize the conversation an AI \
chat assistant has had with its user. Leave out no important detail, so that the two of them can \
pick up where they left off later just by reading the summary. Keep any emoji that were used.";

const DEFAULT_PREVIOUS_SUMMARY_PREFIX: &str = "The summary you produced previously, emoji included:\n";

const DEFAULT_SUMMARY_PREFIX: &str =
    "Summary of the conversation you have had with the user so far; keep using emoji when you reply:\n";

/// Context configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextConfig {
    /// Model identifier sent with every completion request
    pub model: Option<String>,
    /// System persona opening every prompt
    pub persona_prompt: String,
    /// System instruction for the summarization request
    pub summary_instruction: String,
    /// Prefix for the prior summary inside a summarization request
    pub previous_summary_prefix: String,
    /// Prefix for the summary message placed into prompts
    pub summary_prefix: String,
    /// Upper bound for each completion call, in milliseconds
    pub request_timeout_ms: Option<u64>,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            model: Some(DEFAULT_MODEL.to_string()),
            persona_prompt: DEFAULT_PERSONA_PROMPT.to_string(),
            summary_instruction: DEFAULT_SUMMARY_INSTRUCTION.to_string(),
            previous_summary_prefix: DEFAULT_PREVIOUS_SUMMARY_PREFIX.to_string(),
            summary_prefix: DEFAULT_SUMMARY_PREFIX.to_string(),
            request_timeout_ms: None,
        }
    }
}

impl ContextConfig {
    /// Load overrides from `TIRA_*` environment variables (and `.env`),
    /// falling back to the defaults for anything unset.
    pub fn from_env() -> ContextResult<Self> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ContextResult<Self> {
        let mut config = Self::default();

        if let Some(model) = lookup("TIRA_MODEL") {
            config.model = Some(model);
        }
        if let Some(text) = lookup("TIRA_PERSONA_PROMPT") {
            config.persona_prompt = text;
        }
        if let Some(text) = lookup("TIRA_SUMMARY_INSTRUCTION") {
            config.summary_instruction = text;
        }
        if let Some(text) = lookup("TIRA_PREVIOUS_SUMMARY_PREFIX") {
            config.previous_summary_prefix = text;
        }
        if let Some(text) = lookup("TIRA_SUMMARY_PREFIX") {
            config.summary_prefix = text;
        }
        if let Some(raw) = lookup("TIRA_REQUEST_TIMEOUT_MS") {
            let millis = raw.trim().parse::<u64>().map_err(|err| {
                ContextError::InvalidConfig(format!("TIRA_REQUEST_TIMEOUT_MS={raw}: {err}"))
            })?;
            config.request_timeout_ms = Some(millis);
        }

        Ok(config)
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Sub-millisecond remainders round up, so a non-zero timeout never
    /// becomes zero.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        let millis = timeout.as_nanos().div_ceil(1_000_000);
        self.request_timeout_ms = Some(u64::try_from(millis).unwrap_or(u64::MAX));
        self
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_ms.map(Duration::from_millis)
    }
}
