use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};

/// Application configuration loaded from environment variables.
/// Missing required variables abort startup before any pipeline work begins.
#[derive(Debug, Clone)]
pub struct Config {
    pub groq_api_key: String,
    pub model: String,
    /// Token budget per scoring batch, enforced by the packer.
    pub batch_token_budget: usize,
    /// Total attempts per batch (first call + retries).
    pub max_retries: u32,
    pub retry_delay: Duration,
    pub results_dir: PathBuf,
    pub port: u16,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing

        Ok(Config {
            groq_api_key: require_env("GROQ_API_KEY")?,
            model: std::env::var("GROQ_MODEL")
                .unwrap_or_else(|_| "llama-3.1-8b-instant".to_string()),
            batch_token_budget: std::env::var("BATCH_TOKEN_BUDGET")
                .unwrap_or_else(|_| "3000".to_string())
                .parse::<usize>()
                .context("BATCH_TOKEN_BUDGET must be a positive integer")?,
            max_retries: std::env::var("MAX_RETRIES")
                .unwrap_or_else(|_| "3".to_string())
                .parse::<u32>()
                .context("MAX_RETRIES must be a non-negative integer")?,
            retry_delay: Duration::from_millis(
                std::env::var("RETRY_DELAY_MS")
                    .unwrap_or_else(|_| "2000".to_string())
                    .parse::<u64>()
                    .context("RETRY_DELAY_MS must be a duration in milliseconds")?,
            ),
            results_dir: PathBuf::from(
                std::env::var("RESULTS_DIR").unwrap_or_else(|_| "./results".to_string()),
            ),
            port: std::env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .context("PORT must be a valid port number")?,
            rust_log: std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string()),
        })
    }
}

fn require_env(key: &str) -> Result<String> {
    std::env::var(key).with_context(|| format!("Required environment variable '{key}' is not set"))
}
