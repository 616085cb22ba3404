//! ConfigStore - persisted enabled flags and per-plugin configuration

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use attention_plugin_api::ConfigMap;

use super::error::StoreError;

/// What is remembered about one plugin between runs
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PluginRecord {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub config: ConfigMap,
}

/// Persisted plugin state, keyed by plugin name.
///
/// Stored as JSON in `$XDG_DATA_HOME/attention/plugin_configs.json`:
///
/// ```json
/// { "csv-exporter": { "enabled": true, "config": { "path": "~/export.csv" } } }
/// ```
#[derive(Debug)]
pub struct ConfigStore {
    path: PathBuf,
    records: BTreeMap<String, PluginRecord>,
}

impl ConfigStore {
    /// Load the store from `path`.
    ///
    /// A missing file gives an empty store. An unreadable or corrupt file is
    /// logged and also gives an empty store; the next save overwrites it.
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let records = match Self::read(&path) {
            Ok(records) => records,
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to read plugin config store, starting empty"
                );
                BTreeMap::new()
            }
        };
        Self { path, records }
    }

    fn read(path: &Path) -> Result<BTreeMap<String, PluginRecord>, StoreError> {
        if !path.exists() {
            return Ok(BTreeMap::new());
        }
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Rewrite the whole document: write a sibling temp file, then rename it
    /// over the target.
    pub fn save(&self) -> Result<(), StoreError> {
        let content = serde_json::to_string_pretty(&self.records)?;

        // Create parent directory if it doesn't exist
        if let Some(parent) = self
            .path
            .parent()
            .filter(|p| !p.as_os_str().is_empty() && !p.exists())
        {
            std::fs::create_dir_all(parent)?;
        }

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, content)?;
        std::fs::rename(&tmp, &self.path)?;
        Ok(())
    }

    /// Path of the backing file
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn record(&self, name: &str) -> Option<&PluginRecord> {
        self.records.get(name)
    }

    /// Check if a plugin was left enabled
    pub fn is_enabled(&self, name: &str) -> bool {
        self.records.get(name).is_some_and(|r| r.enabled)
    }

    pub fn set_enabled(&mut self, name: &str, enabled: bool) {
        self.records.entry(name.to_string()).or_default().enabled = enabled;
    }

    /// Persisted configuration values (empty if none)
    pub fn config_for(&self, name: &str) -> ConfigMap {
        self.records
            .get(name)
            .map(|r| r.config.clone())
            .unwrap_or_default()
    }

    pub fn set_config(&mut self, name: &str, config: ConfigMap) {
        self.records.entry(name.to_string()).or_default().config = config;
    }

    /// Names with a persisted record, sorted
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.records.keys().map(String::as_str)
    }
}
