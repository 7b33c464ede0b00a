//! Error types for the edgequake-stembot library.
//!
//! Two distinct error types reflect two distinct failure modes:
//!
//! * [`BotError`]: **fatal for one command.** The request cannot be served
//!   (unsupported attachment, download failed, provider unreachable). The
//!   dispatcher turns it into a user-facing message; it never crashes the
//!   process.
//!
//! * [`MathError`]: **non-fatal.** A single equation could not be parsed by
//!   the simplified math renderer. Stored inside
//!   [`crate::latex::RowOutcome::Skipped`] so the remaining equations still
//!   make it into the image.

use thiserror::Error;

/// All command-level errors returned by the edgequake-stembot library.
///
/// Equation-level failures use [`MathError`] and are recorded per row rather
/// than propagated here.
#[derive(Debug, Error)]
pub enum BotError {
    // ── Attachment errors ─────────────────────────────────────────────────
    /// The command needs an attachment but the message carried none.
    #[error("Please attach an image or PDF file.")]
    MissingAttachment,

    /// The attachment MIME type is not on the allow-list.
    #[error("Unsupported file type: `{mime}`. Only PNG, JPG, and PDF are allowed.")]
    UnsupportedAttachment { mime: String },

    /// The attachment could not be fetched (non-2xx status, I/O error…).
    #[error("Failed to download '{url}': {reason}")]
    DownloadFailed { url: String, reason: String },

    /// The attachment fetch exceeded the configured timeout.
    #[error("Download timed out after {secs}s for '{url}'")]
    DownloadTimeout { url: String, secs: u64 },

    // ── Completion errors ─────────────────────────────────────────────────
    /// The configured provider is not initialised (missing API key etc.).
    #[error("LLM provider '{provider}' is not configured.\n{hint}")]
    ProviderNotConfigured { provider: String, hint: String },

    /// The completion service returned an error.
    #[error("Completion failed: {message}")]
    CompletionFailed { message: String },

    /// The completion call did not answer within `api_timeout_secs`.
    #[error("Completion timed out after {secs}s")]
    CompletionTimeout { secs: u64 },

    // ── Config errors ─────────────────────────────────────────────────────
    /// Builder validation failed.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Reply sent when a failure's detail should stay in the log.
pub const GENERIC_USER_ERROR: &str = "An error occurred while processing your request.";

impl BotError {
    /// The message shown to the chat user for this error.
    ///
    /// Attachment problems are the user's to fix, so they get a specific
    /// message. Everything else is reported generically; the detail goes to
    /// the log only.
    pub fn user_message(&self) -> String {
        match self {
            BotError::MissingAttachment | BotError::UnsupportedAttachment { .. } => self.to_string(),
            BotError::DownloadFailed { .. } | BotError::DownloadTimeout { .. } => {
                "Could not download the file.".to_string()
            }
            _ => GENERIC_USER_ERROR.to_string(),
        }
    }
}

/// A non-fatal parse failure for a single equation.
#[derive(Debug, Clone, PartialEq, Eq, Error, serde::Serialize)]
pub enum MathError {
    /// Input was not wrapped in `$…$`.
    #[error("expected math mode delimited by '$'")]
    NotMathMode,

    /// Nothing to draw after parsing.
    #[error("empty expression")]
    Empty,

    /// `\foo` is not part of the supported subset.
    #[error("unknown command '\\{0}'")]
    UnknownCommand(String),

    /// A `{` without `}` or vice versa.
    #[error("unbalanced braces at offset {0}")]
    UnbalancedBraces(usize),

    /// `^`, `_`, `\frac`… without an operand.
    #[error("missing argument for '{0}'")]
    MissingArgument(String),

    /// A character the renderer refuses in math mode (`&`, stray `$`, …).
    #[error("unexpected '{token}' at offset {offset}")]
    UnexpectedToken { token: String, offset: usize },

    /// Two superscripts (or subscripts) on the same base.
    #[error("double {0}")]
    DoubleScript(&'static str),

    /// Groups and commands nested deeper than the renderer allows.
    #[error("nesting deeper than {0} levels")]
    TooDeep(usize),

    /// The reply carried more spans than one image holds.
    #[error("more than {0} equations in one reply")]
    TooManyRows(usize),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unsupported_attachment_names_type() {
        let e = BotError::UnsupportedAttachment {
            mime: "text/plain".into(),
        };
        let msg = e.to_string();
        assert!(msg.contains("`text/plain`"), "got: {msg}");
        assert_eq!(e.user_message(), msg);
    }

    #[test]
    fn completion_errors_get_generic_reply() {
        let e = BotError::CompletionFailed {
            message: "quota exceeded".into(),
        };
        assert_eq!(e.user_message(), GENERIC_USER_ERROR);
        assert!(e.to_string().contains("quota exceeded"));
    }

    #[test]
    fn download_errors_hide_url() {
        let e = BotError::DownloadFailed {
            url: "https://cdn.example/secret?sig=abc".into(),
            reason: "HTTP 403".into(),
        };
        assert_eq!(e.user_message(), "Could not download the file.");
    }

    #[test]
    fn completion_timeout_display() {
        let e = BotError::CompletionTimeout { secs: 30 };
        assert!(e.to_string().contains("30s"));
    }

    #[test]
    fn unknown_command_display() {
        let e = MathError::UnknownCommand("begin".into());
        assert_eq!(e.to_string(), "unknown command '\\begin'");
    }
}
