//! Bundled literature sources.
//!
//! Each source is a specification file under `specs/` plus a small table of
//! transforms the generic mapper cannot express.

pub mod europepmc;
pub mod openalex;
pub mod pubmed;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::connector::SpecConnector;
use crate::spec::Specification;
use crate::transform::TransformRegistry;
use crate::transport::Transport;
use bioconnect_common::{BioconnectError, Config, Result};

/// A specification shipped with the crate.
#[derive(Debug, Clone, Copy)]
pub struct BundledSource {
    pub name: &'static str,
    pub spec: &'static str,
    pub transforms: fn() -> TransformRegistry,
}

pub static BUNDLED: [BundledSource; 3] = [
    BundledSource { name: pubmed::NAME, spec: pubmed::SPEC, transforms: pubmed::transforms },
    BundledSource { name: openalex::NAME, spec: openalex::SPEC, transforms: openalex::transforms },
    BundledSource { name: europepmc::NAME, spec: europepmc::SPEC, transforms: europepmc::transforms },
];

pub fn bundled(name: &str) -> Option<&'static BundledSource> {
    BUNDLED.iter().find(|s| s.name == name)
}

/// Override transforms for `name`; empty for sources without a module.
pub fn transforms_for(name: &str) -> TransformRegistry {
    bundled(name).map(|s| (s.transforms)()).unwrap_or_default()
}

impl BundledSource {
    pub fn specification(&self) -> Result<Specification> {
        Specification::from_yaml_str(self.spec)
    }

    pub fn connector(&self, transport: Arc<dyn Transport>) -> Result<SpecConnector> {
        Ok(SpecConnector::new(
            Arc::new(self.specification()?),
            transport,
            (self.transforms)(),
        ))
    }
}

/// Specification files (`.yaml`, `.yml`, `.json`) directly inside `dir`,
/// sorted by path.
pub fn spec_files(dir: impl AsRef<Path>) -> Result<Vec<PathBuf>> {
    let dir = dir.as_ref();
    let mut files: Vec<PathBuf> = std::fs::read_dir(dir)
        .map_err(|e| BioconnectError::Config(format!("cannot read spec dir {}: {e}", dir.display())))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|p| {
            p.is_file()
                && p.extension()
                    .and_then(|e| e.to_str())
                    .map(|e| matches!(e.to_ascii_lowercase().as_str(), "yaml" | "yml" | "json"))
                    .unwrap_or(false)
        })
        .collect();
    files.sort();
    Ok(files)
}

/// Build every connector the configuration knows about: the bundled ones
/// plus any specification in `[connectors] spec_dir`. A spec file whose
/// name matches a bundled source replaces it. `[sources.<name>]` blocks are
/// applied to the matching connector.
pub async fn load_connectors(config: &Config, transport: Arc<dyn Transport>) -> Result<Vec<SpecConnector>> {
    let mut specs: Vec<(Specification, TransformRegistry)> = Vec::new();
    for source in &BUNDLED {
        specs.push((source.specification()?, (source.transforms)()));
    }

    if let Some(dir) = &config.connectors.spec_dir {
        for path in spec_files(dir)? {
            match Specification::from_path(&path) {
                Ok(spec) => {
                    let transforms = transforms_for(&spec.name);
                    specs.retain(|(s, _)| s.name != spec.name);
                    specs.push((spec, transforms));
                }
                Err(e) => warn!(path = %path.display(), error = %e, "Skipping invalid specification"),
            }
        }
    }

    let mut connectors = Vec::with_capacity(specs.len());
    for (spec, transforms) in specs {
        let name = spec.name.clone();
        let connector = SpecConnector::new(Arc::new(spec), Arc::clone(&transport), transforms);
        if let Some(source) = config.source(&name) {
            connector.configure(source).await?;
        }
        connectors.push(connector);
    }
    info!(count = connectors.len(), "Connectors loaded");
    Ok(connectors)
}
