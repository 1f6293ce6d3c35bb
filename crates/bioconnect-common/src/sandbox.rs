use reqwest::{Client, ClientBuilder};
use std::collections::HashSet;
use std::time::Duration;
use tracing::warn;
use url::Url;
use crate::error::BioconnectError;

/// Literature APIs reachable without extra configuration.
const DEFAULT_ALLOWLIST: &[&str] = &[
    "eutils.ncbi.nlm.nih.gov", // PubMed
    "api.openalex.org",        // OpenAlex
    "www.ebi.ac.uk",           // Europe PMC
    "localhost",               // Local mocks
    "127.0.0.1",               // Localhost alt
];

/// An HTTP client that only issues requests to approved domains.
///
/// Connector specifications carry their own `base_url`, so a typo or a
/// tampered spec file must not be able to point the ingestion at arbitrary
/// hosts. Extra hosts are added through `[http] allowed_domains`.
#[derive(Debug, Clone)]
pub struct SandboxClient {
    client: Client,
    allowlist: HashSet<String>,
}

impl SandboxClient {
    /// Creates a new SandboxClient with the default literature allowlist.
    pub fn new() -> Result<Self, BioconnectError> {
        Self::with_timeout(Duration::from_secs(30))
    }

    pub fn with_timeout(timeout: Duration) -> Result<Self, BioconnectError> {
        let allowlist = DEFAULT_ALLOWLIST.iter().map(|d| d.to_string()).collect();

        let client = ClientBuilder::new()
            .timeout(timeout)
            .user_agent(concat!("bioconnect/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BioconnectError::Config(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self { client, allowlist })
    }

    /// Appends an exact hostname to the allowlist.
    pub fn allow_domain(&mut self, domain: &str) {
        self.allowlist.insert(domain.to_string());
    }

    /// Whether `url` targets an allowlisted host or one of its subdomains.
    pub fn is_allowed(&self, url: &str) -> bool {
        let Ok(parsed) = Url::parse(url) else {
            return false;
        };
        let Some(host) = parsed.host_str() else {
            return false;
        };
        self.allowlist.iter().any(|allowed| {
            host == allowed
                || host
                    .strip_suffix(allowed.as_str())
                    .is_some_and(|prefix| prefix.ends_with('.'))
        })
    }

    /// GET request builder for an allowlisted URL.
    pub fn get(&self, url: &str) -> Result<reqwest::RequestBuilder, BioconnectError> {
        if !self.is_allowed(url) {
            warn!(url, "Blocked request to host outside the allowlist");
            return Err(BioconnectError::Security(format!("host not in allowlist: {url}")));
        }
        Ok(self.client.get(url))
    }
}
