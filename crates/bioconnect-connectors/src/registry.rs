//! Connector registry: declared capabilities plus persisted enable/disable
//! state.
//!
//! A connector is registered in the `disabled` state whatever its `enabled`
//! flag says, and only becomes `enabled` through [`ConnectorRegistry::enable`],
//! which validates its configuration first.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::capabilities::{Capability, CapabilitySet};
use bioconnect_common::{BioconnectError, Result};

pub const REGISTRY_FORMAT_VERSION: &str = "1.0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
    Enabled,
    Disabled,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryEntry {
    pub name: String,
    /// Every known capability with an explicit flag.
    pub capabilities: BTreeMap<String, bool>,
    pub config_path: String,
    /// Whether the connector should be enabled by default.
    pub enabled: bool,
    pub state: ConnectorState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auth: Option<BTreeMap<String, String>>,
}

impl RegistryEntry {
    pub fn capability_set(&self) -> CapabilitySet {
        CapabilitySet::from_map(&self.capabilities)
    }

    pub fn is_enabled(&self) -> bool {
        self.state == ConnectorState::Enabled
    }
}

/// The persisted registry document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegistryDocument {
    #[serde(default = "default_version")]
    pub version: String,
    #[serde(default)]
    pub connectors: BTreeMap<String, RegistryEntry>,
}

fn default_version() -> String {
    REGISTRY_FORMAT_VERSION.to_string()
}

impl Default for RegistryDocument {
    fn default() -> Self {
        Self { version: default_version(), connectors: BTreeMap::new() }
    }
}

/// Load-all / save-all persistence for the registry.
pub trait RegistryStore: Send + Sync {
    fn load(&self) -> Result<RegistryDocument>;
    fn save(&self, doc: &RegistryDocument) -> Result<()>;
}

/// YAML file store. A missing file is created with an empty document.
#[derive(Debug, Clone)]
pub struct YamlFileStore {
    path: PathBuf,
}

impl YamlFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl RegistryStore for YamlFileStore {
    fn load(&self) -> Result<RegistryDocument> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "Registry file absent, initializing");
            let doc = RegistryDocument::default();
            self.save(&doc)?;
            return Ok(doc);
        }
        let content = std::fs::read_to_string(&self.path)?;
        if content.trim().is_empty() {
            return Ok(RegistryDocument::default());
        }
        serde_yaml::from_str(&content).map_err(|e| {
            BioconnectError::Registry(format!(
                "failed to load connector registry {}: {e}",
                self.path.display()
            ))
        })
    }

    fn save(&self, doc: &RegistryDocument) -> Result<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, serde_yaml::to_string(doc)?)?;
        Ok(())
    }
}

/// Store that keeps the document in memory only.
#[derive(Debug, Default)]
pub struct MemoryStore {
    doc: Mutex<RegistryDocument>,
}

impl RegistryStore for MemoryStore {
    fn load(&self) -> Result<RegistryDocument> {
        self.doc
            .lock()
            .map(|d| d.clone())
            .map_err(|e| BioconnectError::Registry(e.to_string()))
    }

    fn save(&self, doc: &RegistryDocument) -> Result<()> {
        let mut guard = self.doc.lock().map_err(|e| BioconnectError::Registry(e.to_string()))?;
        *guard = doc.clone();
        Ok(())
    }
}

pub struct ConnectorRegistry {
    store: Box<dyn RegistryStore>,
    doc: RegistryDocument,
}

impl std::fmt::Debug for ConnectorRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectorRegistry").field("doc", &self.doc).finish()
    }
}

impl ConnectorRegistry {
    pub fn open(store: impl RegistryStore + 'static) -> Result<Self> {
        let doc = store.load()?;
        info!(connectors = doc.connectors.len(), "Connector registry loaded");
        Ok(Self { store: Box::new(store), doc })
    }

    /// Registry backed by a YAML file, created on first use.
    pub fn open_file(path: impl Into<PathBuf>) -> Result<Self> {
        Self::open(YamlFileStore::new(path))
    }

    pub fn in_memory() -> Self {
        Self { store: Box::new(MemoryStore::default()), doc: RegistryDocument::default() }
    }

    /// Register (or re-register) a connector. Re-registration overwrites the
    /// entry, including any stored auth block, and resets it to disabled.
    pub fn register_connector(
        &mut self,
        name: &str,
        capabilities: &CapabilitySet,
        config_path: &str,
        enabled: bool,
    ) -> Result<()> {
        if self.doc.connectors.contains_key(name) {
            warn!(connector = name, "Connector already registered, updating configuration");
        }
        let entry = RegistryEntry {
            name: name.to_string(),
            capabilities: capabilities.to_map(),
            config_path: config_path.to_string(),
            enabled,
            state: ConnectorState::Disabled,
            auth: None,
        };
        self.commit(|doc| {
            doc.connectors.insert(name.to_string(), entry);
            Ok(())
        })?;
        info!(connector = name, "Registered connector");
        Ok(())
    }

    pub fn unregister(&mut self, name: &str) -> Result<()> {
        self.commit(|doc| doc.connectors.remove(name).map(drop).ok_or_else(|| not_found(name)))?;
        info!(connector = name, "Unregistered connector");
        Ok(())
    }

    /// Store the credentials block `enable` checks for authenticated sources.
    pub fn set_auth_config(&mut self, name: &str, auth: BTreeMap<String, String>) -> Result<()> {
        self.commit(|doc| {
            entry_mut(doc, name)?.auth = Some(auth);
            Ok(())
        })
    }

    /// Validate the connector's configuration and mark it enabled. On
    /// failure the connector stays disabled.
    pub fn enable(&mut self, name: &str) -> Result<()> {
        let entry = self.entry(name)?;
        if entry.config_path.trim().is_empty() {
            return Err(BioconnectError::Registry(format!(
                "connector {name} has no config_path"
            )));
        }
        if entry.capability_set().contains(Capability::RequiresAuthentication) {
            let has_auth = entry
                .auth
                .as_ref()
                .map(|a| a.values().any(|v| !v.trim().is_empty()))
                .unwrap_or(false);
            if !has_auth {
                return Err(BioconnectError::Registry(format!(
                    "connector {name} requires authentication but no auth config is set"
                )));
            }
        }

        self.set_state(name, ConnectorState::Enabled)?;
        info!(connector = name, "Connector enabled");
        Ok(())
    }

    pub fn disable(&mut self, name: &str) -> Result<()> {
        self.set_state(name, ConnectorState::Disabled)?;
        info!(connector = name, "Connector disabled");
        Ok(())
    }

    pub fn is_enabled(&self, name: &str) -> Result<bool> {
        Ok(self.entry(name)?.is_enabled())
    }

    pub fn list_connectors(&self, only_enabled: bool) -> Vec<&RegistryEntry> {
        self.doc
            .connectors
            .values()
            .filter(|e| !only_enabled || e.is_enabled())
            .collect()
    }

    pub fn get_connector_config(&self, name: &str) -> Result<RegistryEntry> {
        self.entry(name).cloned()
    }

    fn entry(&self, name: &str) -> Result<&RegistryEntry> {
        self.doc.connectors.get(name).ok_or_else(|| not_found(name))
    }

    fn set_state(&mut self, name: &str, state: ConnectorState) -> Result<()> {
        self.commit(|doc| {
            entry_mut(doc, name)?.state = state;
            Ok(())
        })
    }

    /// Apply `change` to a copy of the document and keep it only once the
    /// store has saved it.
    fn commit<F>(&mut self, change: F) -> Result<()>
    where
        F: FnOnce(&mut RegistryDocument) -> Result<()>,
    {
        let mut next = self.doc.clone();
        change(&mut next)?;
        self.store.save(&next)?;
        self.doc = next;
        Ok(())
    }
}

fn entry_mut<'a>(doc: &'a mut RegistryDocument, name: &str) -> Result<&'a mut RegistryEntry> {
    doc.connectors.get_mut(name).ok_or_else(|| not_found(name))
}

fn not_found(name: &str) -> BioconnectError {
    BioconnectError::Registry(format!("connector not found: {name}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn caps(list: &[Capability]) -> CapabilitySet {
        list.iter().copied().collect()
    }

    #[test]
    fn test_register_starts_disabled() {
        let mut registry = ConnectorRegistry::in_memory();
        registry
            .register_connector("pubmed", &caps(&[Capability::SupportsFulltext]), "specs/pubmed.yaml", true)
            .unwrap();

        let entry = registry.get_connector_config("pubmed").unwrap();
        assert!(entry.enabled);
        assert_eq!(entry.state, ConnectorState::Disabled);
        assert_eq!(entry.capabilities.len(), Capability::ALL.len());
        assert!(!registry.is_enabled("pubmed").unwrap());
    }

    #[test]
    fn test_enable_requires_auth_when_declared() {
        let mut registry = ConnectorRegistry::in_memory();
        registry
            .register_connector("secure", &caps(&[Capability::RequiresAuthentication]), "secure.yaml", true)
            .unwrap();

        let err = registry.enable("secure").unwrap_err();
        assert!(matches!(err, BioconnectError::Registry(_)));
        assert!(!registry.is_enabled("secure").unwrap());

        let auth = BTreeMap::from([("api_key".to_string(), "k".to_string())]);
        registry.set_auth_config("secure", auth).unwrap();
        registry.enable("secure").unwrap();
        assert!(registry.is_enabled("secure").unwrap());
    }

    #[test]
    fn test_enable_requires_config_path() {
        let mut registry = ConnectorRegistry::in_memory();
        registry.register_connector("bare", &CapabilitySet::new(), "  ", true).unwrap();
        assert!(registry.enable("bare").is_err());
        assert!(!registry.is_enabled("bare").unwrap());
    }

    #[test]
    fn test_list_and_disable() {
        let mut registry = ConnectorRegistry::in_memory();
        for name in ["a", "b", "c"] {
            registry.register_connector(name, &CapabilitySet::new(), "x.yaml", true).unwrap();
        }
        registry.enable("a").unwrap();
        registry.enable("c").unwrap();
        registry.disable("c").unwrap();

        let enabled: Vec<&str> = registry.list_connectors(true).iter().map(|e| e.name.as_str()).collect();
        assert_eq!(enabled, vec!["a"]);
        assert_eq!(registry.list_connectors(false).len(), 3);
    }

    #[test]
    fn test_unknown_names_fail() {
        let mut registry = ConnectorRegistry::in_memory();
        assert!(registry.is_enabled("ghost").is_err());
        assert!(registry.enable("ghost").is_err());
        assert!(registry.disable("ghost").is_err());
        assert!(registry.unregister("ghost").is_err());
        assert!(registry.get_connector_config("ghost").is_err());
    }

    #[test]
    fn test_reregister_overwrites_and_resets_state() {
        let mut registry = ConnectorRegistry::in_memory();
        registry.register_connector("a", &CapabilitySet::new(), "one.yaml", true).unwrap();
        registry.enable("a").unwrap();
        registry.register_connector("a", &CapabilitySet::new(), "two.yaml", false).unwrap();

        let entry = registry.get_connector_config("a").unwrap();
        assert_eq!(entry.config_path, "two.yaml");
        assert_eq!(entry.state, ConnectorState::Disabled);
        assert_eq!(registry.list_connectors(false).len(), 1);
    }

    #[test]
    fn test_yaml_store_initializes_and_persists() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config").join("connectors.yaml");

        let mut registry = ConnectorRegistry::open_file(&path).unwrap();
        let initial = std::fs::read_to_string(&path).unwrap();
        assert!(initial.contains("version: '1.0'") || initial.contains("version: \"1.0\""), "{initial}");

        registry.register_connector("openalex", &CapabilitySet::new(), "openalex.yaml", true).unwrap();
        registry.enable("openalex").unwrap();
        drop(registry);

        let reopened = ConnectorRegistry::open_file(&path).unwrap();
        assert!(reopened.is_enabled("openalex").unwrap());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("state: enabled"), "{text}");
    }

    #[test]
    fn test_corrupt_registry_is_registry_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("connectors.yaml");
        std::fs::write(&path, "connectors: [not, a, map]").unwrap();
        let err = ConnectorRegistry::open_file(&path).unwrap_err();
        assert!(matches!(err, BioconnectError::Registry(_)));
    }

    /// Accepts a fixed number of saves, then fails every one after.
    struct FlakyStore {
        saves_left: Mutex<usize>,
    }

    impl RegistryStore for FlakyStore {
        fn load(&self) -> Result<RegistryDocument> {
            Ok(RegistryDocument::default())
        }

        fn save(&self, _doc: &RegistryDocument) -> Result<()> {
            let mut left = self.saves_left.lock().unwrap();
            if *left == 0 {
                return Err(BioconnectError::Registry("disk full".into()));
            }
            *left -= 1;
            Ok(())
        }
    }

    #[test]
    fn test_failed_save_leaves_registry_unchanged() {
        let mut registry = ConnectorRegistry::open(FlakyStore { saves_left: Mutex::new(1) }).unwrap();
        registry.register_connector("a", &CapabilitySet::new(), "a.yaml", true).unwrap();

        assert!(registry.enable("a").is_err());
        assert!(!registry.is_enabled("a").unwrap());

        let auth = BTreeMap::from([("api_key".to_string(), "k".to_string())]);
        assert!(registry.set_auth_config("a", auth).is_err());
        assert_eq!(registry.get_connector_config("a").unwrap().auth, None);

        assert!(registry.register_connector("b", &CapabilitySet::new(), "b.yaml", true).is_err());
        assert!(registry.get_connector_config("b").is_err());

        assert!(registry.unregister("a").is_err());
        assert_eq!(registry.list_connectors(false).len(), 1);
    }

    #[test]
    fn test_unregister() {
        let mut registry = ConnectorRegistry::in_memory();
        registry.register_connector("a", &CapabilitySet::new(), "a.yaml", true).unwrap();
        registry.unregister("a").unwrap();
        assert!(registry.list_connectors(false).is_empty());
    }
}
