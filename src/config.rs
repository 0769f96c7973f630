//! Configuration types.

use std::net::SocketAddr;
use std::path::PathBuf;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default chat-completions endpoint base.
const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";

/// Bot configuration, read once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Telegram Bot API token.
    pub telegram_token: SecretString,
    /// Shared secret expected in `X-Telegram-Bot-Api-Secret-Token`.
    /// None disables the check.
    pub webhook_secret: Option<String>,
    /// Public base URL of this service; when set, the webhook is
    /// registered with Telegram on startup.
    pub public_base_url: Option<String>,
    /// API key for the chat-completions service.
    pub llm_api_key: SecretString,
    /// Base URL of the chat-completions service.
    pub llm_base_url: String,
    /// Model identifier passed to the generator.
    pub llm_model: String,
    /// Interviews may not finish before this many user answers.
    pub min_answers: usize,
    /// Root directory for flat-file storage, reports and logs.
    pub data_dir: PathBuf,
    /// Optional libSQL database file; when set, flags/feedback/results
    /// live in the relational backend instead of JSON files.
    pub database_path: Option<PathBuf>,
    /// Address the HTTP server binds to.
    pub bind_addr: SocketAddr,
}

impl Config {
    /// Build a configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let telegram_token = require("TELEGRAM_BOT_TOKEN")?;
        let llm_api_key = require("LLM_API_KEY")?;

        let min_answers = match std::env::var("MIN_ANSWERS") {
            Ok(v) => v.parse().map_err(|_| ConfigError::InvalidValue {
                key: "MIN_ANSWERS".to_string(),
                message: format!("expected a non-negative integer, got {v:?}"),
            })?,
            Err(_) => 4,
        };

        let bind_addr_raw =
            std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
        let bind_addr = bind_addr_raw
            .parse()
            .map_err(|_| ConfigError::InvalidValue {
                key: "BIND_ADDR".to_string(),
                message: format!("expected host:port, got {bind_addr_raw:?}"),
            })?;

        Ok(Self {
            telegram_token: SecretString::from(telegram_token),
            webhook_secret: std::env::var("WEBHOOK_SECRET").ok().filter(|s| !s.is_empty()),
            public_base_url: std::env::var("PUBLIC_BASE_URL")
                .ok()
                .map(|s| s.trim_end_matches('/').to_string())
                .filter(|s| !s.is_empty()),
            llm_api_key: SecretString::from(llm_api_key),
            llm_base_url: std::env::var("LLM_BASE_URL")
                .ok()
                .map(|s| s.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_LLM_BASE_URL.to_string()),
            llm_model: std::env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4.1".to_string()),
            min_answers,
            data_dir: std::env::var("DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| PathBuf::from("./data")),
            database_path: std::env::var("DATABASE_PATH").ok().map(PathBuf::from),
            bind_addr,
        })
    }

    /// Directory rendered PDF reports are written to.
    pub fn reports_dir(&self) -> PathBuf {
        self.data_dir.join("reports")
    }
}

fn require(key: &str) -> Result<String, ConfigError> {
    std::env::var(key)
        .ok()
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
}
