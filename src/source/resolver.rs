//! Source URL resolution strategies.
//!
//! The dataset is either downloaded from a fixed CSV URL or from whatever
//! URL the metadata service currently advertises. The orchestrator only
//! sees a [`SourceResolver`].

use crate::error::BuildError;
use crate::source::fetcher::Fetcher;
use async_trait::async_trait;
use serde_json::Value;
use tracing::info;

/// JSON pointer to the current download link in a metadata document.
const DOWNLOAD_URL_POINTER: &str = "/distribution/0/data/downloadURL";

/// Produces the URL of the CSV to download.
#[async_trait]
pub trait SourceResolver: Send + Sync {
    /// Resolve the CSV location, fetching metadata if needed.
    async fn resolve(&self, fetcher: &Fetcher) -> Result<String, BuildError>;

    /// Short human-readable description for progress output.
    fn describe(&self) -> String;
}

/// A fixed, configured CSV URL.
#[derive(Debug, Clone)]
pub struct DirectSource {
    url: String,
}

impl DirectSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl SourceResolver for DirectSource {
    async fn resolve(&self, _fetcher: &Fetcher) -> Result<String, BuildError> {
        Ok(self.url.clone())
    }

    fn describe(&self) -> String {
        format!("CSV URL {}", self.url)
    }
}

/// CSV URL looked up from a dataset metadata document.
#[derive(Debug, Clone)]
pub struct MetadataSource {
    metadata_url: String,
}

impl MetadataSource {
    pub fn new(metadata_url: impl Into<String>) -> Self {
        Self {
            metadata_url: metadata_url.into(),
        }
    }
}

#[async_trait]
impl SourceResolver for MetadataSource {
    async fn resolve(&self, fetcher: &Fetcher) -> Result<String, BuildError> {
        let body = fetcher.fetch_text(&self.metadata_url).await?;
        let url = extract_download_url(&body)?;
        info!("Resolved download URL: {}", url);
        Ok(url)
    }

    fn describe(&self) -> String {
        format!("metadata at {}", self.metadata_url)
    }
}

/// Pull `distribution[0].data.downloadURL` out of a metadata document.
pub fn extract_download_url(body: &str) -> Result<String, BuildError> {
    let doc: Value = serde_json::from_str(body)
        .map_err(|e| BuildError::resolution(format!("metadata is not valid JSON ({e})"), body))?;

    match doc.pointer(DOWNLOAD_URL_POINTER) {
        Some(Value::String(url)) => Ok(url.clone()),
        Some(other) => Err(BuildError::resolution(
            format!("distribution[0].data.downloadURL is not a string: {other}"),
            body,
        )),
        None => Err(BuildError::resolution(
            "metadata has no distribution[0].data.downloadURL",
            body,
        )),
    }
}
