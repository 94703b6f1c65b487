//! CLI argument definitions and REPL command parsing.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use clap::Parser;
use std::path::PathBuf;

/// pdfchat: ask questions about a document from the terminal, by text or
/// by voice.
#[derive(Parser, Debug)]
#[command(name = "pdfchat", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config")]
    pub config: Option<PathBuf>,

    /// Base URL of the query service (e.g. http://127.0.0.1:5001).
    #[arg(short = 'u', long = "base-url")]
    pub base_url: Option<String>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level")]
    pub log_level: Option<String>,
}

impl CliArgs {
    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > PDFCHAT_CONFIG env var > ~/.pdfchat/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("PDFCHAT_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the query service base URL.
    ///
    /// Priority: --base-url flag > PDFCHAT_BASE_URL env var > config file value.
    pub fn resolve_base_url(&self, config_base_url: &str) -> String {
        self.resolve_base_url_with(std::env::var("PDFCHAT_BASE_URL").ok(), config_base_url)
    }

    fn resolve_base_url_with(&self, env_value: Option<String>, config_base_url: &str) -> String {
        if let Some(ref url) = self.base_url {
            return url.clone();
        }
        match env_value {
            Some(url) if !url.trim().is_empty() => url,
            _ => config_base_url.to_string(),
        }
    }

    /// Resolve the log level.
    ///
    /// Priority: --log-level flag > config file value.
    pub fn resolve_log_level(&self, config_level: &str) -> String {
        self.log_level
            .clone()
            .unwrap_or_else(|| config_level.to_string())
    }
}

/// Default config file path for the current platform.
fn default_config_path() -> PathBuf {
    #[cfg(target_os = "windows")]
    if let Ok(home) = std::env::var("USERPROFILE") {
        return PathBuf::from(home).join(".pdfchat").join("config.toml");
    }
    #[cfg(not(target_os = "windows"))]
    if let Ok(home) = std::env::var("HOME") {
        return PathBuf::from(home).join(".pdfchat").join("config.toml");
    }
    PathBuf::from("config.toml")
}

/// One line of terminal input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Toggle the microphone.
    Mic,
    /// Stop speaking.
    Stop,
    /// Show the conversation size and current activity.
    Status,
    Quit,
    Help,
    /// Unknown slash command.
    Unknown(String),
    /// Anything else: typed input, or a transcript while listening.
    Text(String),
}

impl Command {
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        if !trimmed.starts_with('/') {
            return Command::Text(line.trim_end_matches(['\r', '\n']).to_string());
        }
        match trimmed {
            "/mic" => Command::Mic,
            "/stop" => Command::Stop,
            "/status" => Command::Status,
            "/quit" | "/exit" => Command::Quit,
            "/help" => Command::Help,
            other => Command::Unknown(other.to_string()),
        }
    }
}

pub const HELP: &str = "\
Type a question and press Enter to send it.
  /mic     start or stop listening (the next line is taken as speech)
  /stop    stop speaking
  /status  show the conversation size and current activity
  /help    show this help
  /quit    exit";
