//! bioconnect-connectors — Specification-driven literature connectors.
//!
//! A connector is a [`Specification`] (YAML/JSON) plus an optional table of
//! override transforms. The engine around it:
//! - path resolution over JSON and XML payloads
//! - named value transforms
//! - response mapping into normalized records
//! - per-connector rate limiting
//! - page / offset / cursor pagination
//! - a persisted registry of capabilities and enable state

pub mod capabilities;
pub mod connector;
pub mod mapper;
pub mod models;
pub mod pagination;
pub mod path;
pub mod payload;
pub mod rate_limit;
pub mod registry;
pub mod sources;
pub mod spec;
pub mod transform;
pub mod transport;
pub mod xml;

pub use capabilities::{Capability, CapabilitySet};
pub use connector::{Connector, Credentials, SearchResult, SpecConnector};
pub use mapper::{Record, ResponseMapper};
pub use models::{Author, Document};
pub use pagination::{PaginationPhase, PaginationState, PaginationStrategy};
pub use payload::Payload;
pub use rate_limit::RateLimiter;
pub use registry::{ConnectorRegistry, RegistryStore, YamlFileStore};
pub use spec::{lint, LintReport, Specification};
pub use transform::TransformRegistry;
pub use transport::{HttpTransport, Transport};
