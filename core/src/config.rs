/// Configuration management
use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

const DEFAULT_PAGE_SIZE: u32 = 20;
const DEFAULT_ROSTER_REFRESH_SECS: u64 = 30;

/// Chat client configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatConfig {
    /// Base URL of the backend REST API (e.g. http://127.0.0.1:8000)
    pub api_base_url: String,

    /// Base URL of the push channel endpoint (e.g. ws://127.0.0.1:8000)
    pub ws_base_url: String,

    /// Bearer credential for the API and the channel URI
    pub access_token: Option<String>,

    /// History page size
    pub page_size: u32,

    /// Roster polling interval (fallback against missed pushes)
    pub roster_refresh_interval: Duration,

    /// HTTP connect timeout
    pub connect_timeout: Duration,

    /// HTTP request timeout
    pub request_timeout: Duration,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            api_base_url: "http://127.0.0.1:8000".to_string(),
            ws_base_url: "ws://127.0.0.1:8000".to_string(),
            access_token: None,
            page_size: DEFAULT_PAGE_SIZE,
            roster_refresh_interval: Duration::from_secs(DEFAULT_ROSTER_REFRESH_SECS),
            connect_timeout: Duration::from_secs(2),
            request_timeout: Duration::from_secs(10),
        }
    }
}

impl ChatConfig {
    /// Create config from command line arguments
    pub fn from_args(args: &[String]) -> Result<Self> {
        let mut config = Self::default();

        let mut i = 1;
        while i < args.len() {
            match args[i].as_str() {
                "--api-url" => {
                    let url = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--api-url requires a URL argument".to_string())
                    })?;
                    config.api_base_url = url.clone();
                    i += 2;
                }
                "--ws-url" => {
                    let url = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--ws-url requires a URL argument".to_string())
                    })?;
                    config.ws_base_url = url.clone();
                    i += 2;
                }
                "--token" => {
                    let token = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--token requires a token argument".to_string())
                    })?;
                    config.access_token = Some(token.clone());
                    i += 2;
                }
                "--page-size" => {
                    let n = args.get(i + 1).ok_or_else(|| {
                        ChatError::Config("--page-size requires a number argument".to_string())
                    })?;
                    config.page_size = n.parse::<u32>().map_err(|_| {
                        ChatError::Config("--page-size must be a positive number".to_string())
                    })?;
                    i += 2;
                }
                other => {
                    return Err(ChatError::Config(format!(
                        "Unknown argument: {} (usage: marketlink [--api-url <url>] [--ws-url <url>] [--token <token>] [--page-size <n>])",
                        other
                    )));
                }
            }
        }

        // Env overrides (nice for scripts)
        if let Ok(url) = std::env::var("MARKETLINK_API_URL") {
            config.api_base_url = url;
        }
        if let Ok(url) = std::env::var("MARKETLINK_WS_URL") {
            config.ws_base_url = url;
        }
        if let Ok(token) = std::env::var("MARKETLINK_TOKEN") {
            config.access_token = Some(token);
        }

        if config.page_size == 0 {
            return Err(ChatError::Config("Page size must be at least 1".to_string()));
        }

        Ok(config)
    }
}
