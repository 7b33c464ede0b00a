//! Completion client: single-turn asks and session-based chats.
//!
//! Every request carries the same system prompt and temperature. A chat
//! exchange is recorded in its session only when the remote call succeeds,
//! so a failed or timed-out call leaves the history exactly as it was.

use crate::attachment::Attachment;
use crate::backend::{ChatBackend, CompletionRequest, LlmBackend, Turn};
use crate::config::BotConfig;
use crate::error::BotError;
use crate::session::SessionRegistry;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Sends prompts to a [`ChatBackend`] and owns the session registry.
pub struct CompletionClient {
    backend: Arc<dyn ChatBackend>,
    sessions: SessionRegistry,
    system_prompt: String,
    temperature: f32,
    max_tokens: usize,
    api_timeout_secs: u64,
}

impl std::fmt::Debug for CompletionClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CompletionClient")
            .field("backend", &self.backend.name())
            .field("sessions", &self.sessions.len())
            .field("temperature", &self.temperature)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .finish()
    }
}

impl CompletionClient {
    /// Client over an explicit backend, taking request settings from `config`.
    pub fn new(backend: Arc<dyn ChatBackend>, config: &BotConfig) -> Self {
        Self {
            backend,
            sessions: SessionRegistry::new(),
            system_prompt: config.system_prompt().to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            api_timeout_secs: config.api_timeout_secs,
        }
    }

    /// Client over the `edgequake_llm` provider resolved from `config`.
    pub fn from_config(config: &BotConfig) -> Result<Self, BotError> {
        let backend = LlmBackend::from_config(config)?;
        Ok(Self::new(Arc::new(backend), config))
    }

    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// One-shot request; nothing is remembered.
    pub async fn ask(&self, prompt: &str, attachment: Option<Attachment>) -> Result<String, BotError> {
        let turns = [Turn::user(prompt, attachment)];
        self.complete(&turns).await
    }

    /// Continue the conversation `session_id`, creating it on first use.
    ///
    /// Holds the session lock across the remote call.
    pub async fn send_message(
        &self,
        session_id: &str,
        prompt: &str,
        attachment: Option<Attachment>,
    ) -> Result<String, BotError> {
        let session = self.sessions.get_or_create(session_id);
        let mut history = session.lock().await;

        history.push(Turn::user(prompt, attachment));
        match self.complete(&history).await {
            Ok(reply) => {
                history.push(Turn::assistant(reply.as_str()));
                debug!("Session {} now has {} turns", session_id, history.len());
                Ok(reply)
            }
            Err(e) => {
                history.pop();
                Err(e)
            }
        }
    }

    /// Forget the conversation `session_id`. `false` if there was none.
    pub fn clear_session(&self, session_id: &str) -> bool {
        self.sessions.clear(session_id)
    }

    async fn complete(&self, turns: &[Turn]) -> Result<String, BotError> {
        let request = CompletionRequest {
            system_prompt: &self.system_prompt,
            turns,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let call = self.backend.complete(&request);
        if self.api_timeout_secs == 0 {
            return call.await;
        }
        match tokio::time::timeout(Duration::from_secs(self.api_timeout_secs), call).await {
            Ok(result) => result,
            Err(_) => {
                warn!(
                    "{} did not answer within {}s",
                    self.backend.name(),
                    self.api_timeout_secs
                );
                Err(BotError::CompletionTimeout {
                    secs: self.api_timeout_secs,
                })
            }
        }
    }
}
