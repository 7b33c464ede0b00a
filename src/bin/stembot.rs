//! Terminal front-end for edgequake-stembot.
//!
//! Reads one message per line from stdin and feeds it to the dispatcher as
//! if it came from a chat channel. `@path` tokens become attachments.
//! Replies are printed; equation images are written to `--out-dir`.

use anyhow::{Context, Result};
use clap::Parser;
use edgequake_stembot::{
    AttachmentRef, BotConfig, Dispatcher, IncomingMessage, Outgoing, RenderConfig, SessionScope,
};
use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing_subscriber::EnvFilter;

// ── ANSI colour helpers (no extra deps) ──────────────────────────────────────

fn green(s: &str) -> String {
    format!("\x1b[32m{s}\x1b[0m")
}
fn dim(s: &str) -> String {
    format!("\x1b[2m{s}\x1b[0m")
}

const AFTER_HELP: &str = r#"EXAMPLES:
  # Interactive session (type commands, Ctrl-D to quit)
  stembot

  # One message and exit
  stembot --once '!ask integration by parts'

  # Problem set from a worksheet photo
  stembot --once '!ask_with_file @worksheet.jpg'

  # Private sessions, log to a file like the chat bot does
  stembot --session-scope user --log-file discord.log

COMMANDS:
  !ask <prompt>              one-off problem set
  !ask_with_file [prompt]    one-off, with an @file attachment
  !chat <prompt>             continue the conversation
  !chat_with_file [prompt]   continue, with an @file attachment
  !clear_chat                forget the conversation
  !help                      list commands

ENVIRONMENT VARIABLES:
  GEMINI_API_KEY          Google Gemini API key (default provider)
  OPENAI_API_KEY          OpenAI API key
  ANTHROPIC_API_KEY       Anthropic API key
  EDGEQUAKE_LLM_PROVIDER  Override provider (gemini, openai, anthropic, ollama)
  EDGEQUAKE_MODEL         Override model ID
"#;

/// Generate STEM problem sets from a terminal, with rendered equations.
#[derive(Parser, Debug)]
#[command(
    name = "stembot",
    version,
    about = "Generate STEM problem sets from topics, images and PDFs",
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    /// LLM model ID. Default: gemini-2.5-flash.
    #[arg(long, env = "EDGEQUAKE_MODEL")]
    model: Option<String>,

    /// LLM provider: gemini, openai, anthropic, ollama.
    #[arg(long, env = "EDGEQUAKE_LLM_PROVIDER")]
    provider: Option<String>,

    /// LLM temperature (0.0–2.0).
    #[arg(long, env = "STEMBOT_TEMPERATURE", default_value_t = 0.5)]
    temperature: f32,

    /// Max LLM output tokens per reply.
    #[arg(long, env = "STEMBOT_MAX_TOKENS", default_value_t = 8192)]
    max_tokens: usize,

    /// Path to a text file containing a custom system prompt.
    #[arg(long, env = "STEMBOT_SYSTEM_PROMPT")]
    system_prompt: Option<PathBuf>,

    /// Maximum characters per printed message.
    #[arg(long, env = "STEMBOT_CHUNK_LIMIT", default_value_t = 2000)]
    chunk_limit: usize,

    /// Key conversations by channel or by user.
    #[arg(long, env = "STEMBOT_SESSION_SCOPE", value_enum, default_value = "channel")]
    session_scope: ScopeArg,

    /// Channel id used for every message.
    #[arg(long, default_value = "terminal")]
    channel: String,

    /// User id and display name used for every message.
    #[arg(long, env = "USER", default_value = "local")]
    user: String,

    /// Per-completion timeout in seconds (0 disables).
    #[arg(long, env = "STEMBOT_API_TIMEOUT", default_value_t = 120)]
    api_timeout: u64,

    /// HTTP download timeout in seconds.
    #[arg(long, env = "STEMBOT_DOWNLOAD_TIMEOUT", default_value_t = 60)]
    download_timeout: u64,

    /// Equation image DPI (36–600).
    #[arg(long, env = "STEMBOT_DPI", default_value_t = 150)]
    dpi: u32,

    /// Do not render `$$…$$` spans.
    #[arg(long)]
    no_equations: bool,

    /// Directory for equation images.
    #[arg(long, default_value = ".")]
    out_dir: PathBuf,

    /// Process this single message and exit.
    #[arg(long)]
    once: Option<String>,

    /// Print replies as JSON lines.
    #[arg(long)]
    json: bool,

    /// Write logs to this file instead of stderr.
    #[arg(long, env = "STEMBOT_LOG_FILE")]
    log_file: Option<PathBuf>,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "STEMBOT_VERBOSE")]
    verbose: bool,
}

#[derive(clap::ValueEnum, Clone, Copy, Debug)]
enum ScopeArg {
    Channel,
    User,
}

impl From<ScopeArg> for SessionScope {
    fn from(v: ScopeArg) -> Self {
        match v {
            ScopeArg::Channel => SessionScope::Channel,
            ScopeArg::User => SessionScope::User,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    match cli.log_file {
        Some(ref path) => {
            let file = File::create(path)
                .with_context(|| format!("Failed to create log file {}", path.display()))?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .init();
        }
        None => {
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(io::stderr)
                .init();
        }
    }

    let config = build_config(&cli).await?;
    let dispatcher = Dispatcher::from_config(config).context("Failed to initialise LLM provider")?;
    tokio::fs::create_dir_all(&cli.out_dir)
        .await
        .with_context(|| format!("Failed to create {}", cli.out_dir.display()))?;

    if let Some(ref line) = cli.once {
        return process_line(&cli, &dispatcher, line).await;
    }

    if !cli.json {
        eprintln!(
            "{}",
            dim("Type !help for commands, Ctrl-D to quit. Use @path to attach a file.")
        );
    }
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read stdin")? {
        if line.trim().is_empty() {
            continue;
        }
        process_line(&cli, &dispatcher, &line).await?;
    }
    Ok(())
}

async fn build_config(cli: &Cli) -> Result<BotConfig> {
    let mut builder = BotConfig::builder()
        .temperature(cli.temperature)
        .max_tokens(cli.max_tokens)
        .chunk_limit(cli.chunk_limit)
        .session_scope(cli.session_scope.into())
        .api_timeout_secs(cli.api_timeout)
        .download_timeout_secs(cli.download_timeout)
        .render_equations(!cli.no_equations)
        .render(RenderConfig {
            dpi: cli.dpi,
            ..RenderConfig::default()
        });

    if let Some(ref model) = cli.model {
        builder = builder.model(model);
    }
    if let Some(ref provider) = cli.provider {
        builder = builder.provider_name(provider);
    }
    if let Some(ref path) = cli.system_prompt {
        let prompt = tokio::fs::read_to_string(path)
            .await
            .with_context(|| format!("Failed to read system prompt from {}", path.display()))?;
        builder = builder.system_prompt(prompt);
    }

    builder.build().context("Invalid configuration")
}

/// Split `@path` tokens out of a line: the rest is the message text.
fn parse_line(line: &str) -> (String, Vec<AttachmentRef>) {
    let mut words = Vec::new();
    let mut attachments = Vec::new();
    for token in line.split(' ') {
        match token.strip_prefix('@') {
            Some(path) if !path.is_empty() => attachments.push(AttachmentRef::from_path(path)),
            _ => words.push(token),
        }
    }
    (words.join(" "), attachments)
}

async fn process_line(cli: &Cli, dispatcher: &Dispatcher, line: &str) -> Result<()> {
    let (content, attachments) = parse_line(line);
    let msg = IncomingMessage {
        channel_id: cli.channel.clone(),
        author_id: cli.user.clone(),
        author_name: cli.user.clone(),
        content,
        attachments,
    };

    let spinner = (!cli.json).then(typing_indicator);
    let replies = dispatcher.handle(&msg).await;
    if let Some(bar) = spinner {
        bar.finish_and_clear();
    }

    if replies.is_empty() && !cli.json {
        eprintln!("{}", dim("(not a command; try !help)"));
    }

    for reply in replies {
        match reply {
            Outgoing::Text(text) => {
                if cli.json {
                    println!("{}", serde_json::json!({ "text": text }));
                } else {
                    println!("{text}");
                }
            }
            Outgoing::File { filename, bytes } => {
                let path = save_file(&cli.out_dir, &filename, &bytes).await?;
                if cli.json {
                    println!(
                        "{}",
                        serde_json::json!({ "file": path.display().to_string(), "bytes": bytes.len() })
                    );
                } else {
                    eprintln!("{} {}", green("✔ saved"), path.display());
                }
            }
        }
    }
    Ok(())
}

async fn save_file(dir: &Path, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
    let path = dir.join(filename);
    tokio::fs::write(&path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", path.display()))?;
    Ok(path)
}

/// Spinner shown while the bot is "typing".
fn typing_indicator() -> ProgressBar {
    let bar = ProgressBar::new_spinner();
    bar.set_style(
        ProgressStyle::with_template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner())
            .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏", "⠿"]),
    );
    bar.set_message("typing…");
    bar.enable_steady_tick(Duration::from_millis(80));
    bar
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn at_tokens_become_attachments() {
        let (content, atts) = parse_line("!chat_with_file @notes.pdf explain this");
        assert_eq!(content, "!chat_with_file explain this");
        assert_eq!(atts.len(), 1);
        assert_eq!(atts[0].content_type.as_deref(), Some("application/pdf"));
    }

    #[test]
    fn lone_at_sign_is_text() {
        let (content, atts) = parse_line("!ask email me @ home");
        assert_eq!(content, "!ask email me @ home");
        assert!(atts.is_empty());
    }

    #[test]
    fn cli_parses_defaults() {
        let cli = Cli::try_parse_from(["stembot"]).unwrap();
        assert_eq!(cli.chunk_limit, 2000);
        assert_eq!(cli.temperature, 0.5);
        assert!(matches!(cli.session_scope, ScopeArg::Channel));
    }
}
