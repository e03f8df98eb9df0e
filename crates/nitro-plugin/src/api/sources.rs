//! Collaborators that supply plugin definitions to the manager.

use std::path::Path;

use nitro_core::result::AppResult;

use crate::traits::PluginDefinition;

/// Finds plugin definitions under a directory.
///
/// The manager only consumes the returned list, registering each entry.
pub trait DiscoveryProvider: Send + Sync {
    /// Returns the definitions found under `directory` whose file or plugin
    /// name matches `pattern`, descending into subdirectories if `recursive`.
    fn discover(
        &self,
        directory: &Path,
        pattern: &str,
        recursive: bool,
    ) -> AppResult<Vec<PluginDefinition>>;
}

/// Supplies a fresh definition for a plugin being reloaded.
pub trait ReloadSource: Send + Sync {
    /// Returns the current definition registered under `name`.
    fn fetch(&self, name: &str) -> AppResult<PluginDefinition>;
}
