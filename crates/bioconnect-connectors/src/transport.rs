//! Transport seam between connectors and the network.

use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, instrument};

use crate::payload::Payload;
use bioconnect_common::config::HttpConfig;
use bioconnect_common::{BioconnectError, Result, SandboxClient};

/// Executes one GET request and hands back the parsed body.
///
/// Failures with an HTTP status are reported as
/// [`BioconnectError::Transport`] so connectors can remap them through the
/// specification's error table.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Payload>;
}

/// `reqwest` transport restricted to the sandbox allowlist.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: SandboxClient,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        Ok(Self { client: SandboxClient::new()? })
    }

    pub fn from_config(config: &HttpConfig) -> Result<Self> {
        let mut client = SandboxClient::with_timeout(Duration::from_secs(config.timeout_secs))?;
        for domain in &config.allowed_domains {
            client.allow_domain(domain);
        }
        Ok(Self { client })
    }

    pub fn with_client(client: SandboxClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self, params), fields(params = params.len()))]
    async fn get(&self, url: &str, params: &[(String, String)]) -> Result<Payload> {
        let resp = self
            .client
            .get(url)?
            .query(params)
            .send()
            .await
            .map_err(|e| BioconnectError::Transport {
                status: e.status().map(|s| s.as_u16()),
                message: e.to_string(),
            })?;

        let status = resp.status();
        let content_type = resp
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = resp.text().await?;
        debug!(%status, bytes = body.len(), "Response received");

        if !status.is_success() {
            let snippet: String = body.chars().take(200).collect();
            return Err(BioconnectError::Transport {
                status: Some(status.as_u16()),
                message: format!("{url} returned {status}: {snippet}"),
            });
        }

        Payload::parse(&body, content_type.as_deref()).map_err(|e| {
            BioconnectError::Parse(format!("{url}: {e}"))
        })
    }
}
