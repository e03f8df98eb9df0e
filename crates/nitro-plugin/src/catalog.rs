//! In-memory plugin catalog.
//!
//! Holds definitions keyed by plugin name, each filed under a directory
//! path. It serves as both a [`DiscoveryProvider`] and a [`ReloadSource`]
//! for applications that build their plugins in-process: replacing an
//! entry and calling `reload` swaps in the new definition.

use std::path::{Path, PathBuf};

use parking_lot::RwLock;
use tracing::debug;

use nitro_core::error::AppError;
use nitro_core::result::AppResult;

use crate::api::sources::{DiscoveryProvider, ReloadSource};
use crate::traits::PluginDefinition;

#[derive(Debug, Clone)]
struct CatalogEntry {
    location: PathBuf,
    definition: PluginDefinition,
}

/// Mutable collection of plugin definitions.
#[derive(Debug, Default)]
pub struct PluginCatalog {
    /// Entries in insertion order.
    entries: RwLock<Vec<CatalogEntry>>,
}

impl PluginCatalog {
    /// Creates an empty catalog.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a definition filed at the root location.
    pub fn insert(&self, definition: PluginDefinition) {
        self.insert_at(PathBuf::new(), definition);
    }

    /// Adds or replaces a definition filed under `location`.
    ///
    /// A replaced entry keeps its position.
    pub fn insert_at(&self, location: impl Into<PathBuf>, definition: PluginDefinition) {
        let entry = CatalogEntry {
            location: location.into(),
            definition,
        };
        let mut entries = self.entries.write();
        match entries
            .iter_mut()
            .find(|e| e.definition.name() == entry.definition.name())
        {
            Some(existing) => {
                debug!(plugin = %entry.definition.name(), "Catalog entry replaced");
                *existing = entry;
            }
            None => {
                debug!(plugin = %entry.definition.name(), "Catalog entry added");
                entries.push(entry);
            }
        }
    }

    /// Removes a definition. Returns whether it was present.
    pub fn remove(&self, name: &str) -> bool {
        let mut entries = self.entries.write();
        let before = entries.len();
        entries.retain(|e| e.definition.name() != name);
        entries.len() < before
    }

    /// Returns a definition by name.
    pub fn get(&self, name: &str) -> Option<PluginDefinition> {
        self.entries
            .read()
            .iter()
            .find(|e| e.definition.name() == name)
            .map(|e| e.definition.clone())
    }

    /// Names of all entries, in insertion order.
    pub fn names(&self) -> Vec<String> {
        self.entries
            .read()
            .iter()
            .map(|e| e.definition.name().to_string())
            .collect()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl DiscoveryProvider for PluginCatalog {
    fn discover(
        &self,
        directory: &Path,
        pattern: &str,
        recursive: bool,
    ) -> AppResult<Vec<PluginDefinition>> {
        let matcher = glob::Pattern::new(pattern).map_err(|e| {
            AppError::validation(format!("Invalid discovery pattern '{pattern}': {e}"))
        })?;

        let found: Vec<PluginDefinition> = self
            .entries
            .read()
            .iter()
            .filter(|e| {
                if recursive {
                    e.location.starts_with(directory)
                } else {
                    e.location == directory
                }
            })
            .filter(|e| matcher.matches(e.definition.name()))
            .map(|e| e.definition.clone())
            .collect();

        debug!(
            directory = %directory.display(),
            pattern = %pattern,
            recursive,
            found = found.len(),
            "Catalog discovery"
        );
        Ok(found)
    }
}

impl ReloadSource for PluginCatalog {
    fn fetch(&self, name: &str) -> AppResult<PluginDefinition> {
        self.get(name).ok_or_else(|| {
            AppError::plugin_not_found(format!("Plugin '{name}' is not in the catalog"))
        })
    }
}
