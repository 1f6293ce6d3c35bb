//! Connector capability flags.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tracing::warn;

/// The fixed set of features a connector may declare.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Capability {
    /// Full text beyond metadata can be retrieved.
    SupportsFulltext,
    /// Boolean operators, field tags, wildcards.
    SupportsAdvancedSearch,
    SupportsDateFiltering,
    /// Credentials must be supplied before the connector is usable.
    RequiresAuthentication,
    SupportsBatchDownload,
    SupportsMetadataOnly,
    SupportsPdfDownload,
    SupportsCitationNetwork,
    SupportsAuthorSearch,
    SupportsIncrementalUpdates,
    /// The upstream API pages results itself (page, offset or cursor).
    SupportsNativePagination,
}

impl Capability {
    pub const ALL: [Capability; 11] = [
        Capability::SupportsFulltext,
        Capability::SupportsAdvancedSearch,
        Capability::SupportsDateFiltering,
        Capability::RequiresAuthentication,
        Capability::SupportsBatchDownload,
        Capability::SupportsMetadataOnly,
        Capability::SupportsPdfDownload,
        Capability::SupportsCitationNetwork,
        Capability::SupportsAuthorSearch,
        Capability::SupportsIncrementalUpdates,
        Capability::SupportsNativePagination,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Capability::SupportsFulltext           => "supports_fulltext",
            Capability::SupportsAdvancedSearch     => "supports_advanced_search",
            Capability::SupportsDateFiltering      => "supports_date_filtering",
            Capability::RequiresAuthentication     => "requires_authentication",
            Capability::SupportsBatchDownload      => "supports_batch_download",
            Capability::SupportsMetadataOnly       => "supports_metadata_only",
            Capability::SupportsPdfDownload        => "supports_pdf_download",
            Capability::SupportsCitationNetwork    => "supports_citation_network",
            Capability::SupportsAuthorSearch       => "supports_author_search",
            Capability::SupportsIncrementalUpdates => "supports_incremental_updates",
            Capability::SupportsNativePagination   => "supports_native_pagination",
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Capability {
    type Err = String;

    /// Case-insensitive, so `REQUIRES_AUTHENTICATION` from older spec files
    /// is accepted too.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Capability::ALL
            .iter()
            .copied()
            .find(|c| c.as_str() == key)
            .ok_or_else(|| format!("unknown capability: {s}"))
    }
}

/// The capabilities a connector actually supports.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CapabilitySet(BTreeSet<Capability>);

impl CapabilitySet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, cap: Capability) -> bool {
        self.0.insert(cap)
    }

    pub fn contains(&self, cap: Capability) -> bool {
        self.0.contains(&cap)
    }

    pub fn iter(&self) -> impl Iterator<Item = Capability> + '_ {
        self.0.iter().copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every known capability with an explicit flag; absent ones are `false`.
    pub fn to_map(&self) -> BTreeMap<String, bool> {
        Capability::ALL
            .iter()
            .map(|c| (c.as_str().to_string(), self.contains(*c)))
            .collect()
    }

    /// Read a `name → bool` table. Unknown names are logged and skipped.
    pub fn from_map(map: &BTreeMap<String, bool>) -> Self {
        let mut set = Self::new();
        for (name, enabled) in map {
            match name.parse::<Capability>() {
                Ok(cap) if *enabled => {
                    set.insert(cap);
                }
                Ok(_) => {}
                Err(e) => warn!("{e}, ignoring"),
            }
        }
        set
    }
}

impl FromIterator<Capability> for CapabilitySet {
    fn from_iter<I: IntoIterator<Item = Capability>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_map_lists_every_capability() {
        let caps: CapabilitySet = [Capability::SupportsFulltext, Capability::RequiresAuthentication]
            .into_iter()
            .collect();
        let map = caps.to_map();
        assert_eq!(map.len(), Capability::ALL.len());
        assert_eq!(map["supports_fulltext"], true);
        assert_eq!(map["requires_authentication"], true);
        assert_eq!(map["supports_pdf_download"], false);
    }

    #[test]
    fn test_from_map_ignores_false_and_unknown() {
        let mut map = BTreeMap::new();
        map.insert("supports_fulltext".to_string(), true);
        map.insert("SUPPORTS_DATE_FILTERING".to_string(), true);
        map.insert("supports_pdf_download".to_string(), false);
        map.insert("supports_teleportation".to_string(), true);

        let caps = CapabilitySet::from_map(&map);
        assert_eq!(caps.len(), 2);
        assert!(caps.contains(Capability::SupportsFulltext));
        assert!(caps.contains(Capability::SupportsDateFiltering));
        assert!(!caps.contains(Capability::SupportsPdfDownload));
    }

    #[test]
    fn test_round_trip_through_map() {
        let caps: CapabilitySet = Capability::ALL.iter().copied().step_by(2).collect();
        assert_eq!(CapabilitySet::from_map(&caps.to_map()), caps);
    }

    #[test]
    fn test_serde_names_match_as_str() {
        for cap in Capability::ALL {
            let yaml = serde_yaml::to_string(&cap).unwrap();
            assert_eq!(yaml.trim(), cap.as_str());
        }
    }
}
