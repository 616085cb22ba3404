//! Plugin system for attention
//!
//! This module provides the infrastructure for loading and managing plugins:
//!
//! - [`PluginLoader`]: Finds plugin units and instantiates their plugin
//! - [`PluginManager`]: Registers plugins and drives activate/deactivate/config
//! - [`ConfigStore`]: Persists enabled flags and plugin configuration
//!
//! # Plugin Discovery
//!
//! Plugins are discovered from the configured directories, in order
//! (default: `~/.config/attention/plugins/`). Each immediate subdirectory not
//! starting with `_` or `.` is a unit.
//!
//! # Plugin Structure
//!
//! Each unit directory contains exactly one of:
//! - `plugin.so` / `libplugin.so` (or `.dylib`/`.dll`) - built with `export_plugin!`
//! - `plugin.toml` - `factory = "<name>"`, for plugins compiled into the host
//!
//! # Example
//!
//! ```ignore
//! use attention_core::plugins::{PluginLoader, PluginManager, PluginManagerConfig};
//!
//! let bus = Arc::new(EventBus::new());
//! let mut manager = PluginManager::new(bus, PluginManagerConfig::default())
//!     .with_loader(PluginLoader::new().with_builtin("csv-exporter", csv_exporter));
//!
//! // Register everything; previously enabled plugins activate immediately
//! manager.discover();
//!
//! // Manage plugins
//! manager.activate("csv-exporter")?;
//! manager.deactivate("webhook-nudge")?;
//!
//! // Shutdown
//! manager.deactivate_all();
//! ```

mod error;
mod loader;
mod manager;
mod store;

pub use error::{LoaderError, PluginManagerError, StoreError};
pub use loader::{Candidate, LoadedUnit, MANIFEST_FILE, PluginLoader};
pub use manager::{PluginInfo, PluginManager, PluginManagerConfig, PluginState};
pub use store::{ConfigStore, PluginRecord};
