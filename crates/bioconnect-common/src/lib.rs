//! bioconnect-common — Shared errors, configuration and the sandboxed HTTP
//! client used across all bioconnect crates.

pub mod config;
pub mod error;
pub mod sandbox;

// Re-export commonly used types
pub use config::{Config, SourceConfig};
pub use error::{BioconnectError, ErrorKind, Result};
pub use sandbox::SandboxClient;
