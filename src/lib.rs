//! # edgequake-stembot
//!
//! A chat bridge that turns a topic, a photo of a worksheet or a PDF into a
//! STEM problem set with an answer sheet, using any provider supported by
//! `edgequake-llm` (Gemini by default).
//!
//! ## Why this crate?
//!
//! Chat platforms cap message length and do not render LaTeX. The model is
//! asked to write every equation as `$$ … $$`; this crate relays the reply in
//! platform-sized chunks and draws the equations into one PNG that is posted
//! next to the text.
//!
//! ## Pipeline Overview
//!
//! ```text
//! chat message
//!  │
//!  ├─ 1. Dispatch  parse `!command`, pick the session id
//!  ├─ 2. Attach    check MIME type, download the first attachment
//!  ├─ 3. Complete  system prompt + history + new turn → provider
//!  ├─ 4. Chunk     split the reply into ≤ 2000-character messages
//!  └─ 5. Render    $$…$$ → sanitise → mathtext rows → equations.png
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use edgequake_stembot::{BotConfig, Dispatcher, IncomingMessage, Outgoing};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     // Provider auto-detected from GEMINI_API_KEY / EDGEQUAKE_LLM_PROVIDER / …
//!     let bot = Dispatcher::from_config(BotConfig::default())?;
//!     let msg = IncomingMessage {
//!         channel_id: "42".into(),
//!         author_id: "7".into(),
//!         author_name: "ada".into(),
//!         content: "!chat quadratic equations".into(),
//!         attachments: vec![],
//!     };
//!     for reply in bot.handle(&msg).await {
//!         match reply {
//!             Outgoing::Text(t) => println!("{t}"),
//!             Outgoing::File { filename, bytes } => std::fs::write(filename, bytes)?,
//!         }
//!     }
//!     Ok(())
//! }
//! ```
//!
//! Rendering works without any provider:
//!
//! ```rust
//! use edgequake_stembot::{render_response, RenderConfig};
//!
//! let img = render_response(r"Solve $$x^2+1=0$$", &RenderConfig::default()).unwrap();
//! assert_eq!(img.rendered_count(), 1);
//! ```
//!
//! ## Feature Flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `stembot` binary (clap + anyhow + tracing-subscriber + indicatif) |

// ── Modules ──────────────────────────────────────────────────────────────

pub mod attachment;
pub mod backend;
pub mod bot;
pub mod client;
pub mod config;
pub mod error;
pub mod latex;
pub mod prompts;
pub mod session;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use attachment::{fetch_attachment, Attachment, AttachmentRef};
pub use backend::{ChatBackend, CompletionRequest, LlmBackend, Role, Turn};
pub use bot::{split_into_chunks, Command, Dispatcher, IncomingMessage, Outgoing};
pub use client::CompletionClient;
pub use config::{BotConfig, BotConfigBuilder, RenderConfig, SessionScope};
pub use error::{BotError, MathError};
pub use latex::{
    compose_equations, extract_math_spans, render_response, render_response_async,
    sanitize_span, EquationImage, RowOutcome,
};
pub use session::{Session, SessionRegistry};
