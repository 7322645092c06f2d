use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, anyhow};
use board_client::{ClientConfig, DEFAULT_BASE_URL, DEFAULT_PAGE_SIZE};

const DEFAULT_SESSION_FILE: &str = ".board_session.json";

#[derive(Debug, Clone)]
pub struct Settings {
    pub base_url: String,
    pub request_timeout_secs: u64,
    pub page_size: u32,
    pub session_file: PathBuf,
    pub log_level: String,
}

impl Settings {
    pub fn from_env() -> Result<Self> {
        let base_url = normalize_server(
            std::env::var("BOARD_API_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
        );
        let request_timeout_secs = parse_u64_env("BOARD_REQUEST_TIMEOUT_SECS", 10)?;
        let page_size = parse_u32_env("BOARD_PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        let session_file = std::env::var("BOARD_SESSION_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(DEFAULT_SESSION_FILE));
        let log_level = std::env::var("LOG_LEVEL")
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or_else(|_| "warn".to_string());

        Ok(Self {
            base_url,
            request_timeout_secs,
            page_size,
            session_file,
            log_level,
        })
    }

    /// `--server` из командной строки перекрывает `BOARD_API_URL`.
    pub fn with_server(mut self, server: Option<String>) -> Self {
        if let Some(server) = server {
            self.base_url = normalize_server(server);
        }
        self
    }

    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::new(self.base_url.clone())
            .with_request_timeout(Duration::from_secs(self.request_timeout_secs))
            .with_page_size(self.page_size)
    }
}

pub fn normalize_server(server: String) -> String {
    if server.starts_with("http://") || server.starts_with("https://") {
        return server;
    }

    format!("http://{server}")
}

fn parse_u64_env(key: &str, default: u64) -> Result<u64> {
    let value = std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u64>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}

fn parse_u32_env(key: &str, default: u32) -> Result<u32> {
    let value = std::env::var(key)
        .unwrap_or_else(|_| default.to_string())
        .parse::<u32>()
        .with_context(|| format!("Failed to parse {key}, expecting positive integer"))?;

    if value == 0 {
        return Err(anyhow!("{key} must be > 0"));
    }
    Ok(value)
}
