//! Completion backend: the seam between the bot and the remote model.
//!
//! [`ChatBackend`] takes a fully assembled request (system prompt, prior
//! turns, the new user turn) and returns the reply text. [`LlmBackend`] is
//! the production implementation on top of `edgequake_llm`; tests plug in
//! scripted backends instead.

use crate::attachment::Attachment;
use crate::config::{BotConfig, DEFAULT_MODEL, DEFAULT_PROVIDER};
use crate::error::BotError;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use edgequake_llm::{ChatMessage, CompletionOptions, ImageData, LLMProvider, ProviderFactory};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::debug;

/// Who produced a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

/// One message of a conversation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub text: String,
    /// Only user turns carry attachments.
    pub attachment: Option<Attachment>,
}

impl Turn {
    pub fn user(text: impl Into<String>, attachment: Option<Attachment>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
            attachment,
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
            attachment: None,
        }
    }
}

/// Everything one remote call needs. `turns` ends with the new user turn.
#[derive(Debug, Clone)]
pub struct CompletionRequest<'a> {
    pub system_prompt: &'a str,
    pub turns: &'a [Turn],
    pub temperature: f32,
    pub max_tokens: usize,
}

/// A service that answers a conversation.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &str;

    /// Produce the assistant reply for `request`.
    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, BotError>;
}

/// [`ChatBackend`] backed by an `edgequake_llm` provider.
pub struct LlmBackend {
    provider: Arc<dyn LLMProvider>,
}

impl fmt::Debug for LlmBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LlmBackend").finish_non_exhaustive()
    }
}

impl LlmBackend {
    pub fn new(provider: Arc<dyn LLMProvider>) -> Self {
        Self { provider }
    }

    /// Resolve the provider described by `config`.
    pub fn from_config(config: &BotConfig) -> Result<Self, BotError> {
        resolve_provider(config).map(Self::new)
    }
}

#[async_trait]
impl ChatBackend for LlmBackend {
    fn name(&self) -> &str {
        "edgequake-llm"
    }

    async fn complete(&self, request: &CompletionRequest<'_>) -> Result<String, BotError> {
        let start = Instant::now();
        let messages = build_messages(request);
        let options = build_options(request);

        let response = self
            .provider
            .chat(&messages, Some(&options))
            .await
            .map_err(|e| BotError::CompletionFailed {
                message: e.to_string(),
            })?;

        debug!(
            "Completion: {} turns, {} input tokens, {} output tokens, {:?}",
            request.turns.len(),
            response.prompt_tokens,
            response.completion_tokens,
            start.elapsed()
        );
        Ok(response.content)
    }
}

/// System prompt first, then every turn in order.
///
/// Attachments travel as base64 inline data on their user turn; the
/// `ImageData` type also carries PDFs for providers that accept them.
fn build_messages(request: &CompletionRequest<'_>) -> Vec<ChatMessage> {
    let mut messages = Vec::with_capacity(request.turns.len() + 1);
    messages.push(ChatMessage::system(request.system_prompt));
    for turn in request.turns {
        let message = match (turn.role, &turn.attachment) {
            (Role::User, Some(att)) => ChatMessage::user_with_images(
                turn.text.as_str(),
                vec![ImageData::new(STANDARD.encode(&att.bytes), att.mime_type.as_str())],
            ),
            (Role::User, None) => ChatMessage::user(turn.text.as_str()),
            (Role::Assistant, _) => ChatMessage::assistant(turn.text.as_str()),
        };
        messages.push(message);
    }
    messages
}

fn build_options(request: &CompletionRequest<'_>) -> CompletionOptions {
    CompletionOptions {
        temperature: Some(request.temperature),
        max_tokens: Some(request.max_tokens),
        ..Default::default()
    }
}

fn create_provider(provider_name: &str, model: &str) -> Result<Arc<dyn LLMProvider>, BotError> {
    ProviderFactory::create_llm_provider(provider_name, model).map_err(|e| {
        BotError::ProviderNotConfigured {
            provider: provider_name.to_string(),
            hint: format!("{e}"),
        }
    })
}

/// Resolve the LLM provider, from most-specific to least-specific.
///
/// 1. **Pre-built provider** (`config.provider`), used as-is.
/// 2. **Named provider + model** (`config.provider_name`); the factory reads
///    the matching API key from the environment.
/// 3. **Environment pair** `EDGEQUAKE_LLM_PROVIDER` + `EDGEQUAKE_MODEL`.
/// 4. **`GEMINI_API_KEY` present**: the default Gemini model.
/// 5. **Auto-detection** via [`ProviderFactory::from_env`].
fn resolve_provider(config: &BotConfig) -> Result<Arc<dyn LLMProvider>, BotError> {
    if let Some(ref provider) = config.provider {
        return Ok(Arc::clone(provider));
    }

    let model = config.model.as_deref().unwrap_or(DEFAULT_MODEL);

    if let Some(ref name) = config.provider_name {
        return create_provider(name, model);
    }

    if let (Ok(prov), Ok(env_model)) = (
        std::env::var("EDGEQUAKE_LLM_PROVIDER"),
        std::env::var("EDGEQUAKE_MODEL"),
    ) {
        if !prov.is_empty() && !env_model.is_empty() {
            return create_provider(&prov, &env_model);
        }
    }

    if std::env::var("GEMINI_API_KEY").is_ok_and(|k| !k.is_empty()) {
        return create_provider(DEFAULT_PROVIDER, model);
    }

    let (llm_provider, _embedding) =
        ProviderFactory::from_env().map_err(|e| BotError::ProviderNotConfigured {
            provider: "auto".to_string(),
            hint: format!(
                "No LLM provider could be auto-detected from environment.\n\
                Set GEMINI_API_KEY, or pass --provider and --model.\n\
                Error: {}",
                e
            ),
        })?;

    Ok(llm_provider)
}
