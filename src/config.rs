//! Configuration types for the problem-set bot.
//!
//! All behaviour is controlled through [`BotConfig`], built via its
//! [`BotConfigBuilder`]. Equation rendering has its own [`RenderConfig`]
//! because the compositor is usable on its own, without any provider.

use crate::error::BotError;
use edgequake_llm::LLMProvider;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// Default model identifier used when none is configured.
pub const DEFAULT_MODEL: &str = "gemini-2.5-flash";

/// Default provider name used when none is configured.
pub const DEFAULT_PROVIDER: &str = "gemini";

/// MIME types accepted for `*_with_file` commands.
pub const DEFAULT_ALLOWED_MIME_TYPES: &[&str] =
    &["image/png", "application/pdf", "image/jpeg", "image/jpg"];

/// Configuration for the bot front-end and its completion client.
///
/// # Example
/// ```rust
/// use edgequake_stembot::BotConfig;
///
/// let config = BotConfig::builder()
///     .model("gemini-2.5-flash")
///     .chunk_limit(2000)
///     .build()
///     .unwrap();
/// assert_eq!(config.temperature, 0.5);
/// ```
#[derive(Clone)]
pub struct BotConfig {
    /// LLM model identifier. If None, uses [`DEFAULT_MODEL`].
    pub model: Option<String>,

    /// LLM provider name (e.g. "gemini", "openai", "anthropic").
    /// If None along with `provider`, the environment is consulted.
    pub provider_name: Option<String>,

    /// Pre-constructed LLM provider. Takes precedence over `provider_name`.
    pub provider: Option<Arc<dyn LLMProvider>>,

    /// Sampling temperature, applied uniformly to every request. Default: 0.5.
    pub temperature: f32,

    /// Maximum tokens the model may generate per reply. Default: 8192.
    ///
    /// A ten-problem set with an answer sheet runs to roughly 2–4k tokens.
    pub max_tokens: usize,

    /// Custom system prompt. If None, uses [`crate::prompts::DEFAULT_SYSTEM_PROMPT`].
    pub system_prompt: Option<String>,

    /// Command prefix. Default: `!`.
    pub command_prefix: String,

    /// Maximum characters per outgoing message. Default: 2000.
    pub chunk_limit: usize,

    /// Which id keys a conversation session. Default: [`SessionScope::Channel`].
    pub session_scope: SessionScope,

    /// Accepted attachment MIME types.
    pub allowed_mime_types: Vec<String>,

    /// Attachment download timeout in seconds. Default: 60.
    pub download_timeout_secs: u64,

    /// Per-completion-call timeout in seconds. Default: 120.
    ///
    /// `0` disables the timeout.
    pub api_timeout_secs: u64,

    /// Render `$$…$$` spans of every reply into an attached PNG. Default: true.
    pub render_equations: bool,

    /// Equation image layout.
    pub render: RenderConfig,
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            model: None,
            provider_name: None,
            provider: None,
            temperature: 0.5,
            max_tokens: 8192,
            system_prompt: None,
            command_prefix: "!".to_string(),
            chunk_limit: 2000,
            session_scope: SessionScope::default(),
            allowed_mime_types: DEFAULT_ALLOWED_MIME_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            download_timeout_secs: 60,
            api_timeout_secs: 120,
            render_equations: true,
            render: RenderConfig::default(),
        }
    }
}

impl fmt::Debug for BotConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BotConfig")
            .field("model", &self.model)
            .field("provider_name", &self.provider_name)
            .field("provider", &self.provider.as_ref().map(|_| "<dyn LLMProvider>"))
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("command_prefix", &self.command_prefix)
            .field("chunk_limit", &self.chunk_limit)
            .field("session_scope", &self.session_scope)
            .field("allowed_mime_types", &self.allowed_mime_types)
            .field("api_timeout_secs", &self.api_timeout_secs)
            .field("render_equations", &self.render_equations)
            .finish()
    }
}

impl BotConfig {
    /// Create a new builder for `BotConfig`.
    pub fn builder() -> BotConfigBuilder {
        BotConfigBuilder {
            config: Self::default(),
        }
    }

    /// The system instruction applied to every request.
    pub fn system_prompt(&self) -> &str {
        self.system_prompt
            .as_deref()
            .unwrap_or(crate::prompts::DEFAULT_SYSTEM_PROMPT)
    }

    /// Whether `mime` is on the attachment allow-list (case-insensitive).
    pub fn is_mime_allowed(&self, mime: &str) -> bool {
        self.allowed_mime_types
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime.trim()))
    }
}

/// Builder for [`BotConfig`].
#[derive(Debug)]
pub struct BotConfigBuilder {
    config: BotConfig,
}

impl BotConfigBuilder {
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = Some(model.into());
        self
    }

    pub fn provider_name(mut self, name: impl Into<String>) -> Self {
        self.config.provider_name = Some(name.into());
        self
    }

    pub fn provider(mut self, provider: Arc<dyn LLMProvider>) -> Self {
        self.config.provider = Some(provider);
        self
    }

    pub fn temperature(mut self, t: f32) -> Self {
        self.config.temperature = t.clamp(0.0, 2.0);
        self
    }

    pub fn max_tokens(mut self, n: usize) -> Self {
        self.config.max_tokens = n;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = Some(prompt.into());
        self
    }

    pub fn command_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.config.command_prefix = prefix.into();
        self
    }

    pub fn chunk_limit(mut self, n: usize) -> Self {
        self.config.chunk_limit = n;
        self
    }

    pub fn session_scope(mut self, scope: SessionScope) -> Self {
        self.config.session_scope = scope;
        self
    }

    pub fn allowed_mime_types<I, S>(mut self, types: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.allowed_mime_types = types.into_iter().map(Into::into).collect();
        self
    }

    pub fn download_timeout_secs(mut self, secs: u64) -> Self {
        self.config.download_timeout_secs = secs;
        self
    }

    pub fn api_timeout_secs(mut self, secs: u64) -> Self {
        self.config.api_timeout_secs = secs;
        self
    }

    pub fn render_equations(mut self, v: bool) -> Self {
        self.config.render_equations = v;
        self
    }

    pub fn render(mut self, render: RenderConfig) -> Self {
        self.config.render = render;
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(self) -> Result<BotConfig, BotError> {
        let c = &self.config;
        if c.chunk_limit == 0 {
            return Err(BotError::InvalidConfig(
                "chunk_limit must be ≥ 1".into(),
            ));
        }
        if c.command_prefix.trim().is_empty() {
            return Err(BotError::InvalidConfig(
                "command_prefix must not be empty".into(),
            ));
        }
        if c.allowed_mime_types.is_empty() {
            return Err(BotError::InvalidConfig(
                "at least one attachment MIME type must be allowed".into(),
            ));
        }
        c.render.validate()?;
        Ok(self.config)
    }
}

// ── Enums ────────────────────────────────────────────────────────────────

/// Which identifier keys a conversation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionScope {
    /// One shared conversation per channel (default).
    #[default]
    Channel,
    /// One private conversation per user, across channels.
    User,
}

impl SessionScope {
    /// Pick the session id for a message from `channel_id` / `author_id`.
    pub fn session_id<'a>(&self, channel_id: &'a str, author_id: &'a str) -> &'a str {
        match self {
            SessionScope::Channel => channel_id,
            SessionScope::User => author_id,
        }
    }
}

// ── Rendering ────────────────────────────────────────────────────────────

/// Layout of the equation image.
///
/// Lengths are in inches and converted to pixels with `dpi`, so the image
/// keeps its proportions when the resolution changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenderConfig {
    /// Output resolution. Default: 150.
    pub dpi: u32,
    /// Height reserved per equation row. Default: 1.5 in.
    pub row_height_in: f32,
    /// Minimum canvas height. Default: 2 in.
    pub min_height_in: f32,
    /// Equation font size in points. Default: 18.
    pub font_size_pt: f32,
    /// Blank margin kept around the tight bounding box. Default: 0.2 in.
    pub padding_in: f32,
    /// Attachment filename. Default: `equations.png`.
    pub filename: String,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            dpi: 150,
            row_height_in: 1.5,
            min_height_in: 2.0,
            font_size_pt: 18.0,
            padding_in: 0.2,
            filename: "equations.png".to_string(),
        }
    }
}

impl RenderConfig {
    fn validate(&self) -> Result<(), BotError> {
        if !(36..=600).contains(&self.dpi) {
            return Err(BotError::InvalidConfig(format!(
                "render DPI must be 36–600, got {}",
                self.dpi
            )));
        }
        let lengths = [
            ("row_height_in", self.row_height_in),
            ("font_size_pt", self.font_size_pt),
        ];
        for (name, v) in lengths {
            if !(v.is_finite() && v > 0.0) {
                return Err(BotError::InvalidConfig(format!(
                    "{name} must be positive, got {v}"
                )));
            }
        }
        if !(self.padding_in.is_finite() && self.padding_in >= 0.0) {
            return Err(BotError::InvalidConfig(format!(
                "padding_in must be ≥ 0, got {}",
                self.padding_in
            )));
        }
        Ok(())
    }

    /// Convert a length in inches to whole pixels.
    pub fn px(&self, inches: f32) -> u32 {
        (inches * self.dpi as f32).round().max(0.0) as u32
    }

    /// Integer scale applied to the 8×8 glyph cell for top-level symbols.
    ///
    /// A glyph cell is one em tall, so an 18 pt font at 150 DPI (37.5 px)
    /// maps to scale 4 (32 px cells).
    pub fn glyph_scale(&self) -> u32 {
        let em_px = self.font_size_pt / 72.0 * self.dpi as f32;
        ((em_px / 8.0).floor() as u32).max(1)
    }
}
