use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::util::{is_local_endpoint_url, parse_bool_flag};

const DEFAULT_API_URL: &str = "http://localhost:5000";
const DEFAULT_TIMEOUT_SECS: u64 = 60;
const MIN_TIMEOUT_SECS: u64 = 5;
const MAX_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub api_url: String,
    pub session_id: Option<String>,
    pub request_timeout_secs: u64,
    pub streaming: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_id: None,
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            streaming: true,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        let api_url =
            std::env::var("BURGERBOT_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.to_string());
        let session_id = std::env::var("BURGERBOT_SESSION_ID")
            .ok()
            .filter(|v| !v.trim().is_empty());
        let request_timeout_secs = match std::env::var("BURGERBOT_REQUEST_TIMEOUT_SECS") {
            Ok(raw) => raw
                .trim()
                .parse::<u64>()
                .with_context(|| format!("BURGERBOT_REQUEST_TIMEOUT_SECS is not a number: '{raw}'"))?
                .clamp(MIN_TIMEOUT_SECS, MAX_TIMEOUT_SECS),
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        let streaming = std::env::var("BURGERBOT_STREAMING")
            .ok()
            .and_then(parse_bool_flag)
            .unwrap_or(true);

        Ok(Self {
            api_url,
            session_id,
            request_timeout_secs,
            streaming,
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.api_url.starts_with("http://") && !self.api_url.starts_with("https://") {
            bail!(
                "Invalid BURGERBOT_API_URL '{}': expected http:// or https:// URL",
                self.api_url
            );
        }

        if let Some(session_id) = &self.session_id {
            if session_id.trim().is_empty() || session_id.contains('/') {
                bail!("Invalid session id '{session_id}': must be non-empty and contain no '/'");
            }
        }

        if !(MIN_TIMEOUT_SECS..=MAX_TIMEOUT_SECS).contains(&self.request_timeout_secs) {
            bail!(
                "Request timeout {}s out of range ({MIN_TIMEOUT_SECS}..={MAX_TIMEOUT_SECS})",
                self.request_timeout_secs
            );
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn is_local_endpoint(&self) -> bool {
        is_local_endpoint_url(&self.api_url)
    }
}
