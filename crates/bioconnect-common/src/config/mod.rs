//! Configuration loading for bioconnect.
//! Reads bioconnect.toml from the current directory or the path in the
//! BIOCONNECT_CONFIG env var.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

use crate::error::{BioconnectError, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub registry: RegistryConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub connectors: ConnectorsConfig,
    /// Per-source credentials and overrides, keyed by connector name.
    #[serde(default)]
    pub sources: BTreeMap<String, SourceConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    #[serde(default = "default_registry_path")]
    pub path: String,
}

fn default_registry_path() -> String { "config/connectors.yaml".to_string() }

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { path: default_registry_path() }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpConfig {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Hosts added to the sandbox allowlist on top of the built-in ones.
    #[serde(default)]
    pub allowed_domains: Vec<String>,
}

fn default_timeout_secs() -> u64 { 30 }

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            allowed_domains: vec![],
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ConnectorsConfig {
    /// Directory with extra connector specification files (`*.yaml`, `*.json`).
    pub spec_dir: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceConfig {
    pub api_key: Option<String>,
    /// Contact address for polite-pool APIs (OpenAlex `mailto`).
    pub email: Option<String>,
    /// Overrides the specification's unauthenticated rate.
    pub requests_per_second: Option<f64>,
}

mod tests;

impl Config {
    /// Load configuration from bioconnect.toml.
    /// Checks BIOCONNECT_CONFIG env var first, then current directory.
    pub fn load() -> Result<Self> {
        let path = std::env::var("BIOCONNECT_CONFIG")
            .unwrap_or_else(|_| "bioconnect.toml".to_string());
        Self::load_from(&path)
    }

    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(BioconnectError::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)?;
        info!(path = %path.display(), sources = config.sources.len(), "Configuration loaded");
        Ok(config)
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        for (name, source) in &config.sources {
            if let Some(rps) = source.requests_per_second {
                if !(rps > 0.0) {
                    return Err(BioconnectError::Config(format!(
                        "sources.{name}.requests_per_second must be > 0, got {rps}"
                    )));
                }
            }
        }
        Ok(config)
    }

    pub fn source(&self, name: &str) -> Option<&SourceConfig> {
        self.sources.get(name)
    }
}
