//! The `Connector` trait and its specification-driven implementation.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use futures::future::join_all;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::capabilities::{Capability, CapabilitySet};
use crate::mapper::{Record, ResponseMapper};
use crate::pagination::{PageResponse, PaginationStrategy};
use crate::payload::Payload;
use crate::rate_limit::RateLimiter;
use crate::spec::{EndpointSpec, Specification, DOCUMENT_ENDPOINT, SEARCH_ENDPOINT};
use crate::transform::TransformRegistry;
use crate::transport::Transport;
use bioconnect_common::{BioconnectError, Result, SourceConfig};

/// Record keys a search mapping is expected to produce.
pub const TOTAL_RESULTS_FIELD: &str = "total_results";
pub const DOCUMENT_IDS_FIELD: &str = "document_ids";
pub const NEXT_CURSOR_FIELD: &str = "next_cursor";

/// Caller-supplied credentials. They are only stored and forwarded as
/// request template values (`{api_key}`, `{email}`, any `extra` key).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Credentials {
    pub api_key: Option<String>,
    pub email: Option<String>,
    #[serde(default)]
    pub extra: BTreeMap<String, String>,
}

impl Credentials {
    pub fn api_key(key: impl Into<String>) -> Self {
        Self { api_key: Some(key.into()), ..Default::default() }
    }

    pub fn is_empty(&self) -> bool {
        self.api_key.as_deref().map_or(true, str::is_empty)
            && self.email.as_deref().map_or(true, str::is_empty)
            && self.extra.values().all(|v| v.is_empty())
    }

    fn template_values(&self) -> impl Iterator<Item = (String, String)> + '_ {
        let named = [("api_key", &self.api_key), ("email", &self.email)]
            .into_iter()
            .filter_map(|(k, v)| v.as_ref().map(|v| (k.to_string(), v.clone())));
        named.chain(self.extra.iter().map(|(k, v)| (k.clone(), v.clone())))
    }
}

impl From<&SourceConfig> for Credentials {
    fn from(source: &SourceConfig) -> Self {
        Self {
            api_key: source.api_key.clone(),
            email: source.email.clone(),
            extra: BTreeMap::new(),
        }
    }
}

/// Normalized search outcome.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    pub query: String,
    pub total_results: u64,
    pub document_ids: Vec<String>,
    /// Every other field the search mapping produced.
    pub metadata: Record,
}

impl SearchResult {
    /// Split a mapped search record into the well-known fields and the rest.
    pub fn from_record(query: &str, mut record: Record) -> Self {
        let document_ids: Vec<String> = match record.remove(DOCUMENT_IDS_FIELD) {
            Some(Value::Array(items)) => items.iter().filter_map(id_string).collect(),
            Some(other) => id_string(&other).into_iter().collect(),
            None => vec![],
        };
        let total_results = match record.remove(TOTAL_RESULTS_FIELD) {
            Some(Value::Number(n)) => n.as_u64(),
            Some(Value::String(s)) => s.trim().parse().ok(),
            _ => None,
        }
        .unwrap_or(document_ids.len() as u64);

        Self { query: query.to_string(), total_results, document_ids, metadata: record }
    }

    pub fn next_cursor(&self) -> Option<&str> {
        self.metadata.get(NEXT_CURSOR_FIELD).and_then(Value::as_str)
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// A literature source.
#[async_trait]
pub trait Connector: Send + Sync {
    fn name(&self) -> &str;

    fn capabilities(&self) -> CapabilitySet;

    /// Store credentials for subsequent calls.
    async fn authenticate(&self, credentials: Credentials) -> Result<()>;

    /// One page of search results, at most `limit` ids.
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult>;

    /// Metadata for one document.
    async fn get_by_id(&self, id: &str) -> Result<Record>;
}

/// Generic connector driven entirely by a [`Specification`].
pub struct SpecConnector {
    spec: Arc<Specification>,
    transport: Arc<dyn Transport>,
    mapper: ResponseMapper,
    limiter: RateLimiter,
    credentials: RwLock<Option<Credentials>>,
}

impl std::fmt::Debug for SpecConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpecConnector")
            .field("name", &self.spec.name)
            .field("version", &self.spec.version)
            .field("limiter", &self.limiter)
            .finish()
    }
}

impl SpecConnector {
    pub fn new(
        spec: Arc<Specification>,
        transport: Arc<dyn Transport>,
        transforms: TransformRegistry,
    ) -> Self {
        let limiter = RateLimiter::new(spec.api.rate_limit.requests_per_second);
        Self {
            spec,
            transport,
            mapper: ResponseMapper::new(transforms),
            limiter,
            credentials: RwLock::new(None),
        }
    }

    /// Apply a `[sources.<name>]` block: rate override and credentials.
    pub async fn configure(&self, source: &SourceConfig) -> Result<()> {
        if let Some(rps) = source.requests_per_second {
            self.limiter.set_requests_per_second(rps);
        }
        let credentials = Credentials::from(source);
        if !credentials.is_empty() {
            self.authenticate(credentials).await?;
        }
        Ok(())
    }

    pub fn spec(&self) -> &Specification {
        &self.spec
    }

    pub fn rate_limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn transforms(&self) -> &TransformRegistry {
        self.mapper.transforms()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.credentials.read().await.is_some()
    }

    /// Search across pages until the caller's `limit`, the source or the
    /// endpoint's page cap runs out. Without a `pagination` block this is a
    /// single [`search`](Connector::search).
    #[instrument(skip(self), fields(connector = %self.spec.name))]
    pub async fn search_all(&self, query: &str, limit: usize) -> Result<SearchResult> {
        let endpoint = self.spec.endpoint(SEARCH_ENDPOINT)?;
        let Some(pagination) = &endpoint.pagination else {
            return self.search(query, limit).await;
        };

        let strategy = PaginationStrategy::from(pagination);
        let mut state = strategy.initialize(query, limit);
        let mut combined = SearchResult { query: query.to_string(), ..Default::default() };

        while let Some(request) = strategy.next_page(&mut state) {
            let mut values = self.base_values(query, request.page_size).await;
            values.insert("page".into(), request.page.to_string());
            values.insert("offset".into(), request.offset.to_string());
            values.insert("page_size".into(), request.page_size.to_string());
            if let Some(cursor) = &request.cursor {
                values.insert("cursor".into(), cursor.clone());
            }

            let payload = self.fetch(endpoint, &values).await?;
            let page = SearchResult::from_record(query, self.mapper.map(&payload, &endpoint.response));
            let remaining = limit.saturating_sub(combined.document_ids.len());
            debug!(page = request.page, returned = page.document_ids.len(), "Search page fetched");

            strategy.update_state(
                &mut state,
                PageResponse {
                    returned: page.document_ids.len(),
                    total_results: Some(page.total_results),
                    total_pages: None,
                    next_cursor: page.next_cursor().map(str::to_string),
                },
            );
            combined.total_results = page.total_results;
            combined
                .document_ids
                .extend(page.document_ids.into_iter().take(remaining));
            combined.metadata = page.metadata;
        }

        combined.metadata.insert("pages_fetched".into(), Value::from(state.page - 1));
        combined.metadata.insert("pagination".into(), serde_json::to_value(state.phase)?);
        info!(
            query,
            ids = combined.document_ids.len(),
            total = combined.total_results,
            "Paginated search finished"
        );
        Ok(combined)
    }

    /// Fetch several documents. One failure does not affect the others;
    /// results come back in input order.
    pub async fn get_many(&self, ids: &[String]) -> Vec<(String, Result<Record>)> {
        let results = join_all(ids.iter().map(|id| self.get_by_id(id))).await;
        ids.iter().cloned().zip(results).collect()
    }

    async fn base_values(&self, query: &str, limit: usize) -> HashMap<String, String> {
        let mut values = HashMap::new();
        if let Some(credentials) = self.credentials.read().await.as_ref() {
            values.extend(credentials.template_values());
        }
        values.insert("query".into(), query.to_string());
        values.insert("limit".into(), limit.to_string());
        values
    }

    async fn fetch(&self, endpoint: &EndpointSpec, values: &HashMap<String, String>) -> Result<Payload> {
        if self.capabilities().contains(Capability::RequiresAuthentication)
            && !self.is_authenticated().await
        {
            return Err(BioconnectError::Authentication(format!(
                "{} requires credentials, call authenticate() first",
                self.spec.name
            )));
        }

        let url = self.spec.endpoint_url(endpoint, values)?;
        let params = endpoint.build_params(values);

        self.limiter.acquire().await?;
        debug!(url = url.as_str(), "Requesting");
        self.transport
            .get(&url, &params)
            .await
            .map_err(|e| self.spec.error_handling.map_error(e))
    }
}

#[async_trait]
impl Connector for SpecConnector {
    fn name(&self) -> &str {
        &self.spec.name
    }

    fn capabilities(&self) -> CapabilitySet {
        self.spec.capability_set()
    }

    #[instrument(skip(self, credentials), fields(connector = %self.spec.name))]
    async fn authenticate(&self, credentials: Credentials) -> Result<()> {
        if credentials.is_empty() {
            return Err(BioconnectError::Authentication(format!(
                "{}: empty credentials",
                self.spec.name
            )));
        }
        if credentials.api_key.is_some() {
            if let Some(rps) = self.spec.api.rate_limit.with_api_key {
                self.limiter.set_requests_per_second(rps);
            }
        }
        *self.credentials.write().await = Some(credentials);
        info!(rps = self.limiter.requests_per_second(), "Authenticated");
        Ok(())
    }

    #[instrument(skip(self), fields(connector = %self.spec.name))]
    async fn search(&self, query: &str, limit: usize) -> Result<SearchResult> {
        let endpoint = self.spec.endpoint(SEARCH_ENDPOINT)?;
        if limit == 0 {
            return Ok(SearchResult { query: query.to_string(), ..Default::default() });
        }
        let mut values = self.base_values(query, limit).await;
        if let Some(pagination) = &endpoint.pagination {
            values.insert("page".into(), "1".into());
            values.insert("offset".into(), "0".into());
            values.insert("page_size".into(), pagination.page_size.min(limit).to_string());
            if let Some(cursor) = &pagination.initial_cursor {
                values.insert("cursor".into(), cursor.clone());
            }
        }

        let payload = self.fetch(endpoint, &values).await?;
        let mut result = SearchResult::from_record(query, self.mapper.map(&payload, &endpoint.response));
        if result.document_ids.len() > limit {
            result.document_ids.truncate(limit);
        }
        debug!(ids = result.document_ids.len(), total = result.total_results, "Search complete");
        Ok(result)
    }

    #[instrument(skip(self), fields(connector = %self.spec.name))]
    async fn get_by_id(&self, id: &str) -> Result<Record> {
        let endpoint = self.spec.endpoint(DOCUMENT_ENDPOINT)?;
        let mut values = self.base_values("", 1).await;
        values.remove("query");
        values.insert("id".into(), id.to_string());

        let payload = self.fetch(endpoint, &values).await?;
        let record = self.mapper.map(&payload, &endpoint.response);
        if record.values().all(Value::is_null) {
            warn!(id, "No document fields mapped");
            return Err(BioconnectError::Fetch(format!(
                "{}: no document found for id {id}",
                self.spec.name
            )));
        }
        Ok(record)
    }
}
