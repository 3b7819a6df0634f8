//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.exparte-dash.toml` files.

use crate::error::BuildError;
use crate::source::{DirectSource, MetadataSource, SourceResolver};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default configuration file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".exparte-dash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Where the CSV comes from.
    #[serde(default)]
    pub source: SourceConfig,

    /// Template and output locations.
    #[serde(default)]
    pub paths: PathsConfig,
}

/// How the CSV location is obtained.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SourceMode {
    /// Download a fixed CSV URL
    #[default]
    Direct,
    /// Look the CSV URL up in a dataset metadata document
    Metadata,
}

/// Dataset source settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Which resolution strategy to use.
    #[serde(default)]
    pub mode: SourceMode,

    /// CSV URL for direct mode.
    #[serde(default)]
    pub csv_url: Option<String>,

    /// Metadata document URL for metadata mode.
    #[serde(default)]
    pub metadata_url: Option<String>,

    /// Timeout for each network request, in seconds.
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            mode: SourceMode::default(),
            csv_url: None,
            metadata_url: None,
            timeout_seconds: default_timeout(),
        }
    }
}

fn default_timeout() -> u64 {
    60
}

/// File locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Dashboard template containing the injection markers.
    #[serde(default = "default_template")]
    pub template: PathBuf,

    /// Rendered dashboard page.
    #[serde(default = "default_output")]
    pub output: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            template: default_template(),
            output: default_output(),
        }
    }
}

fn default_template() -> PathBuf {
    PathBuf::from("scripts/dashboard_template.html")
}

fn default_output() -> PathBuf {
    PathBuf::from("docs/index.html")
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments (and their environment variables) take precedence
    /// over config file settings, but only when explicitly provided.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(mode) = args.source {
            self.source.mode = mode;
        }
        if let Some(ref url) = args.csv_url {
            self.source.csv_url = Some(url.clone());
        }
        if let Some(ref url) = args.metadata_url {
            self.source.metadata_url = Some(url.clone());
        }
        if let Some(timeout) = args.timeout {
            self.source.timeout_seconds = timeout;
        }
        if let Some(ref template) = args.template {
            self.paths.template = template.clone();
        }
        if let Some(ref output) = args.output {
            self.paths.output = output.clone();
        }
    }

    /// Check that the merged configuration can drive a run.
    pub fn validate(&self) -> Result<(), BuildError> {
        if self.source.timeout_seconds == 0 {
            return Err(BuildError::Config(
                "timeout must be at least 1 second".to_string(),
            ));
        }

        let (name, url) = match self.source.mode {
            SourceMode::Direct => ("CSV_URL", self.source.csv_url.as_deref()),
            SourceMode::Metadata => ("METADATA_URL", self.source.metadata_url.as_deref()),
        };

        match url.map(str::trim) {
            None | Some("") => Err(BuildError::Config(format!(
                "{name} is not set (use --{} or the {name} environment variable)",
                name.to_lowercase().replace('_', "-")
            ))),
            Some(url) if !url.starts_with("http://") && !url.starts_with("https://") => Err(
                BuildError::Config(format!("{name} must start with 'http://' or 'https://'")),
            ),
            Some(_) => Ok(()),
        }
    }

    /// Build the resolver for the configured source mode.
    pub fn source_resolver(&self) -> Result<Box<dyn SourceResolver>, BuildError> {
        self.validate()?;

        let resolver: Box<dyn SourceResolver> = match self.source.mode {
            SourceMode::Direct => Box::new(DirectSource::new(
                self.source.csv_url.as_deref().unwrap_or_default().trim(),
            )),
            SourceMode::Metadata => Box::new(MetadataSource::new(
                self.source.metadata_url.as_deref().unwrap_or_default().trim(),
            )),
        };
        Ok(resolver)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn direct(url: Option<&str>) -> Config {
        let mut config = Config::default();
        config.source.csv_url = url.map(String::from);
        config
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.source.mode, SourceMode::Direct);
        assert_eq!(config.source.timeout_seconds, 60);
        assert_eq!(
            config.paths.template,
            PathBuf::from("scripts/dashboard_template.html")
        );
        assert_eq!(config.paths.output, PathBuf::from("docs/index.html"));
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[source]
mode = "metadata"
metadata_url = "https://data.example.gov/api/dataset/items/abc"
timeout_seconds = 120

[paths]
output = "public/index.html"
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.source.mode, SourceMode::Metadata);
        assert_eq!(
            config.source.metadata_url.as_deref(),
            Some("https://data.example.gov/api/dataset/items/abc")
        );
        assert_eq!(config.source.timeout_seconds, 120);
        assert_eq!(config.paths.output, PathBuf::from("public/index.html"));
        assert_eq!(
            config.paths.template,
            PathBuf::from("scripts/dashboard_template.html")
        );
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.toml");
        std::fs::write(&path, "[source]\ncsv_url = \"https://example.org/a.csv\"\n").unwrap();

        let config = Config::load(&path).unwrap();
        assert_eq!(
            config.source.csv_url.as_deref(),
            Some("https://example.org/a.csv")
        );
    }

    #[test]
    fn test_load_invalid_file_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dash.toml");
        std::fs::write(&path, "[source\nmode = 3").unwrap();
        assert!(Config::load(&path).is_err());
    }

    #[test]
    fn test_missing_csv_url_is_config_error() {
        let err = direct(None).validate().unwrap_err();
        assert!(matches!(err, BuildError::Config(_)));
        assert!(err.to_string().contains("CSV_URL"));

        assert!(direct(Some("   ")).validate().is_err());
    }

    #[test]
    fn test_non_http_url_rejected() {
        assert!(direct(Some("ftp://example.org/a.csv")).validate().is_err());
        assert!(direct(Some("https://example.org/a.csv")).validate().is_ok());
    }

    #[test]
    fn test_metadata_mode_requires_metadata_url() {
        let mut config = direct(Some("https://example.org/a.csv"));
        config.source.mode = SourceMode::Metadata;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("METADATA_URL"));

        config.source.metadata_url = Some("https://example.org/meta.json".to_string());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut config = direct(Some("https://example.org/a.csv"));
        config.source.timeout_seconds = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_source_resolver_describes_mode() {
        let config = direct(Some("https://example.org/a.csv"));
        let resolver = config.source_resolver().unwrap();
        assert!(resolver.describe().contains("https://example.org/a.csv"));

        let mut config = Config::default();
        config.source.mode = SourceMode::Metadata;
        config.source.metadata_url = Some("https://example.org/meta.json".to_string());
        let resolver = config.source_resolver().unwrap();
        assert!(resolver.describe().starts_with("metadata"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[source]"));
        assert!(toml_str.contains("[paths]"));
        assert!(toml_str.contains("mode = \"direct\""));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.source.timeout_seconds, 60);
    }
}
