//! Process configuration.
//!
//! Everything the pipeline is allowed to vary on lives in [`AppConfig`],
//! built once in `main` and handed to handlers through the actix app
//! state. There is no module-global client or setting; two requests share
//! nothing but this read-only struct.

use std::env;
use std::time::Duration;

/// Dialect label used when the request does not name one.
pub const DEFAULT_DIALECT: &str = "SQL";

/// How much of the decoded text the delimiter sniffer looks at.
const DEFAULT_SNIFF_WINDOW: usize = 2048;

const DEFAULT_MODEL: &str = "gemini-1.5-flash";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const COMPLETION_TIMEOUT_SECONDS: u64 = 60;

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    /// API key for the completion provider.
    pub gemini_api_key: String,
    /// Model name as it appears in the REST path, e.g. `gemini-1.5-flash`.
    pub gemini_model: String,
    /// Provider base URL, overridable for local stubs.
    pub gemini_base_url: String,
    /// Upper bound on each of the two completion round trips.
    pub completion_timeout: Duration,
    /// Prefix length inspected during delimiter detection.
    pub sniff_window: usize,
}

impl AppConfig {
    /// Reads configuration from the process environment.
    ///
    /// Only `GEMINI_API_KEY` is required; everything else has a default.
    pub fn from_env() -> Result<Self, String> {
        let gemini_api_key = env::var("GEMINI_API_KEY")
            .map_err(|_| "GEMINI_API_KEY is not set".to_string())?;

        let port = match env::var("PORT") {
            Ok(raw) => raw
                .parse::<u16>()
                .map_err(|_| format!("PORT is not a valid port number: {}", raw))?,
            Err(_) => 8080,
        };

        Ok(Self {
            host: env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
            port,
            gemini_api_key,
            gemini_model: env::var("GEMINI_MODEL").unwrap_or_else(|_| DEFAULT_MODEL.to_string()),
            gemini_base_url: env::var("GEMINI_BASE_URL")
                .unwrap_or_else(|_| DEFAULT_BASE_URL.to_string()),
            completion_timeout: Duration::from_secs(COMPLETION_TIMEOUT_SECONDS),
            sniff_window: DEFAULT_SNIFF_WINDOW,
        })
    }
}

#[cfg(test)]
impl Default for AppConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            gemini_api_key: String::new(),
            gemini_model: DEFAULT_MODEL.to_string(),
            gemini_base_url: DEFAULT_BASE_URL.to_string(),
            completion_timeout: Duration::from_secs(COMPLETION_TIMEOUT_SECONDS),
            sniff_window: DEFAULT_SNIFF_WINDOW,
        }
    }
}
