//! Platform-agnostic command dispatcher.
//!
//! A chat gateway converts each platform message into an
//! [`IncomingMessage`], calls [`Dispatcher::handle`], and posts the returned
//! [`Outgoing`] items in order. The dispatcher never fails: every error is
//! logged and turned into a reply.
//!
//! ## Commands
//!
//! | Command | Session | Attachment |
//! |---------|---------|------------|
//! | `!ask <prompt>` | none | – |
//! | `!ask_with_file [prompt]` | none | first attachment |
//! | `!chat <prompt>` | caller's | – |
//! | `!chat_with_file [prompt]` | caller's | first attachment |
//! | `!clear_chat` | caller's | – |
//! | `!help` | – | – |
//!
//! The caller's session id comes from [`crate::SessionScope`] and is the same
//! for every command, so `!clear_chat` clears the conversation `!chat` built.

use crate::attachment::{fetch_attachment, Attachment, AttachmentRef};
use crate::client::CompletionClient;
use crate::config::BotConfig;
use crate::error::BotError;
use crate::latex::render_response_async;
use crate::prompts::ATTACHMENT_ONLY_PROMPT;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// A chat message as seen by the dispatcher.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IncomingMessage {
    pub channel_id: String,
    pub author_id: String,
    /// Display name, used in logs only.
    pub author_name: String,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<AttachmentRef>,
}

/// One item to post back to the channel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Outgoing {
    Text(String),
    File {
        filename: String,
        #[serde(skip)]
        bytes: Vec<u8>,
    },
}

/// A parsed bot command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Ask(String),
    AskWithFile(String),
    Chat(String),
    ChatWithFile(String),
    ClearChat,
    Help,
}

impl Command {
    /// Parse `content` as a command. `None` for ordinary chatter and
    /// unknown command names.
    pub fn parse(content: &str, prefix: &str) -> Option<Self> {
        let rest = content.trim_start().strip_prefix(prefix)?;
        let (name, args) = match rest.find(char::is_whitespace) {
            Some(i) => (&rest[..i], rest[i..].trim()),
            None => (rest, ""),
        };
        let args = args.to_string();
        match name {
            "ask" => Some(Command::Ask(args)),
            "ask_with_file" => Some(Command::AskWithFile(args)),
            "chat" => Some(Command::Chat(args)),
            "chat_with_file" => Some(Command::ChatWithFile(args)),
            "clear_chat" => Some(Command::ClearChat),
            "help" => Some(Command::Help),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Command::Ask(_) => "ask",
            Command::AskWithFile(_) => "ask_with_file",
            Command::Chat(_) => "chat",
            Command::ChatWithFile(_) => "chat_with_file",
            Command::ClearChat => "clear_chat",
            Command::Help => "help",
        }
    }
}

/// Split `text` into pieces of at most `limit` characters.
///
/// Splits on character boundaries, never inside a code point. The pieces
/// concatenate back to `text`; empty text yields no pieces.
pub fn split_into_chunks(text: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut count = 0;
    for c in text.chars() {
        if count == limit {
            chunks.push(std::mem::take(&mut current));
            count = 0;
        }
        current.push(c);
        count += 1;
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

/// Routes commands to the completion client and formats the replies.
#[derive(Debug)]
pub struct Dispatcher {
    client: CompletionClient,
    config: BotConfig,
}

impl Dispatcher {
    pub fn new(client: CompletionClient, config: BotConfig) -> Self {
        Self { client, config }
    }

    /// Dispatcher over the provider resolved from `config`.
    pub fn from_config(config: BotConfig) -> Result<Self, BotError> {
        let client = CompletionClient::from_config(&config)?;
        Ok(Self::new(client, config))
    }

    pub fn client(&self) -> &CompletionClient {
        &self.client
    }

    pub fn config(&self) -> &BotConfig {
        &self.config
    }

    /// Handle one message. Non-commands produce no output.
    pub async fn handle(&self, msg: &IncomingMessage) -> Vec<Outgoing> {
        let Some(command) = Command::parse(&msg.content, &self.config.command_prefix) else {
            return Vec::new();
        };
        debug!("{} issued !{}", msg.author_name, command.name());

        match self.run(&command, msg).await {
            Ok(out) => out,
            Err(e) => {
                warn!("An error occurred in {}: {}", command.name(), e);
                vec![Outgoing::Text(e.user_message())]
            }
        }
    }

    async fn run(&self, command: &Command, msg: &IncomingMessage) -> Result<Vec<Outgoing>, BotError> {
        let session_id = self
            .config
            .session_scope
            .session_id(&msg.channel_id, &msg.author_id);

        let reply = match command {
            Command::Help => return Ok(vec![Outgoing::Text(self.help_text())]),
            Command::ClearChat => {
                let text = if self.client.clear_session(session_id) {
                    info!("Cleared session {} for {}", session_id, msg.author_name);
                    "✅ Your conversation history has been cleared!"
                } else {
                    "You don't have an active conversation."
                };
                return Ok(vec![Outgoing::Text(text.to_string())]);
            }
            Command::Ask(prompt) | Command::Chat(prompt) if prompt.is_empty() => {
                return Ok(vec![Outgoing::Text(format!(
                    "Usage: `{}{} <prompt>`",
                    self.config.command_prefix,
                    command.name()
                ))]);
            }
            Command::Ask(prompt) => self.client.ask(prompt, None).await?,
            Command::Chat(prompt) => self.client.send_message(session_id, prompt, None).await?,
            Command::AskWithFile(prompt) => {
                let attachment = self.first_attachment(msg).await?;
                self.client.ask(file_prompt(prompt), Some(attachment)).await?
            }
            Command::ChatWithFile(prompt) => {
                let attachment = self.first_attachment(msg).await?;
                self.client
                    .send_message(session_id, file_prompt(prompt), Some(attachment))
                    .await?
            }
        };

        let out = self.format_reply(reply).await;
        info!(
            "Successfully responded to !{} for user {}: {}",
            command.name(),
            msg.author_name,
            msg.content
        );
        Ok(out)
    }

    async fn first_attachment(&self, msg: &IncomingMessage) -> Result<Attachment, BotError> {
        let first = msg.attachments.first().ok_or(BotError::MissingAttachment)?;
        fetch_attachment(first, &self.config).await
    }

    /// Text chunks first, then the equation image if any span rendered.
    async fn format_reply(&self, reply: String) -> Vec<Outgoing> {
        let mut out: Vec<Outgoing> = split_into_chunks(&reply, self.config.chunk_limit)
            .into_iter()
            .map(Outgoing::Text)
            .collect();

        if self.config.render_equations {
            if let Some(image) = render_response_async(reply, self.config.render.clone()).await {
                debug!(
                    "Attaching {} ({} rendered, {} skipped)",
                    self.config.render.filename,
                    image.rendered_count(),
                    image.skipped_count()
                );
                out.push(Outgoing::File {
                    filename: self.config.render.filename.clone(),
                    bytes: image.png,
                });
            }
        }
        out
    }

    fn help_text(&self) -> String {
        let p = &self.config.command_prefix;
        format!(
            "**Commands**\n\
             `{p}ask <prompt>`: one-off problem set\n\
             `{p}ask_with_file [prompt]`: one-off problem set from an attached PNG, JPG or PDF\n\
             `{p}chat <prompt>`: continue your conversation\n\
             `{p}chat_with_file [prompt]`: continue your conversation with an attachment\n\
             `{p}clear_chat`: forget your conversation\n\
             `{p}help`: this message"
        )
    }
}

fn file_prompt(prompt: &str) -> &str {
    if prompt.is_empty() {
        ATTACHMENT_ONLY_PROMPT
    } else {
        prompt
    }
}
