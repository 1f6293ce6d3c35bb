use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum BioconnectError {
    #[error("Specification error: {0}")]
    Specification(String),

    #[error("Extraction error: {0}")]
    Extraction(String),

    #[error("Transform error: {0}")]
    Transform(String),

    #[error("Transport error{}: {message}", .status.map(|s| format!(" (HTTP {s})")).unwrap_or_default())]
    Transport { status: Option<u16>, message: String },

    #[error("Authentication error: {0}")]
    Authentication(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Failed to fetch document: {0}")]
    Fetch(String),

    #[error("Failed to parse document: {0}")]
    Parse(String),

    #[error("Registry error: {0}")]
    Registry(String),

    #[error("Rate limit misconfiguration: requests_per_second must be > 0, got {0}")]
    RateLimitMisconfiguration(f64),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Security error: {0}")]
    Security(String),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, BioconnectError>;

impl BioconnectError {
    /// HTTP status carried by a transport failure, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            BioconnectError::Transport { status, .. } => *status,
            _ => None,
        }
    }
}

/// Error kinds a specification's `error_mappings` table may name.
///
/// Accepts both the snake_case form (`rate_limit_exceeded`) and the
/// exception-style form (`RateLimitExceeded`) used by older spec files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    #[serde(alias = "ConnectorError")]
    ConnectorError,
    #[serde(alias = "AuthenticationError")]
    AuthenticationError,
    #[serde(alias = "RateLimitExceeded")]
    RateLimitExceeded,
    #[serde(alias = "FetchError")]
    FetchError,
    #[serde(alias = "ParseError")]
    ParseError,
}

impl ErrorKind {
    /// Build the error this kind stands for, keeping the upstream message.
    pub fn into_error(self, status: Option<u16>, message: String) -> BioconnectError {
        match self {
            ErrorKind::ConnectorError      => BioconnectError::Transport { status, message },
            ErrorKind::AuthenticationError => BioconnectError::Authentication(message),
            ErrorKind::RateLimitExceeded   => BioconnectError::RateLimited(message),
            ErrorKind::FetchError          => BioconnectError::Fetch(message),
            ErrorKind::ParseError          => BioconnectError::Parse(message),
        }
    }
}
