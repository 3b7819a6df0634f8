//! HTTP retrieval of the dataset and its metadata.
//!
//! One attempt per request, bounded by the configured timeout. Any
//! transport failure or non-2xx status is surfaced as a transport error.

use crate::error::BuildError;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;
use tracing::{debug, info};

/// Fetches remote text content.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: reqwest::Client,
    timeout_seconds: u64,
    show_progress: bool,
}

impl Fetcher {
    /// Create a fetcher whose requests time out after `timeout_seconds`.
    pub fn new(timeout_seconds: u64, show_progress: bool) -> Result<Self, BuildError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(timeout_seconds))
            .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BuildError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            timeout_seconds,
            show_progress,
        })
    }

    #[allow(dead_code)] // Accessor kept for diagnostics
    pub fn timeout_seconds(&self) -> u64 {
        self.timeout_seconds
    }

    /// Fetch `url` and return the response body as text.
    pub async fn fetch_text(&self, url: &str) -> Result<String, BuildError> {
        info!("Fetching {}", url);

        let spinner = self.spinner(url);
        let result = self.request(url).await;
        if let Some(pb) = spinner {
            pb.finish_and_clear();
        }

        let body = result?;
        info!("Downloaded {} bytes", body.len());
        Ok(body)
    }

    async fn request(&self, url: &str) -> Result<String, BuildError> {
        let transport = |reason: String| BuildError::Transport {
            url: url.to_string(),
            reason,
        };

        let response = self.client.get(url).send().await.map_err(|e| {
            if e.is_timeout() {
                transport(format!("request timed out after {}s", self.timeout_seconds))
            } else if e.is_connect() {
                transport(format!("connection failed: {e}"))
            } else {
                transport(format!("request failed: {e}"))
            }
        })?;

        let status = response.status();
        debug!("HTTP {} from {}", status, url);
        if !status.is_success() {
            return Err(transport(format!("HTTP status {status}")));
        }

        response.text().await.map_err(|e| {
            if e.is_timeout() {
                transport(format!("body timed out after {}s", self.timeout_seconds))
            } else {
                transport(format!("failed to read body: {e}"))
            }
        })
    }

    fn spinner(&self, url: &str) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} [{elapsed}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(format!("Downloading {url}"));
        pb.enable_steady_tick(Duration::from_millis(100));
        Some(pb)
    }
}
