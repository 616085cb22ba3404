//! attention-core: plugin runtime for the attention monitor
//!
//! This crate hosts the plugins that extend attention:
//!
//! - **Discovery** - [`PluginLoader`] finds plugin units on disk and creates their plugin
//! - **Lifecycle** - [`PluginManager`] registers, activates, deactivates and configures plugins
//! - **Persistence** - [`ConfigStore`] remembers enabled plugins and their settings
//!
//! Plugins talk to the rest of the application only through the shared
//! [`EventBus`] handed to the manager.
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────────── PluginManager ─────────────────────────┐
//! │  PluginLoader ──► LoadedUnit ──► register ──► activate          │
//! │                                      │            │             │
//! │                               ConfigStore   PluginContext       │
//! └─────────────────────────────────────────────────┼───────────────┘
//!                                                   ▼
//!                                               EventBus
//! ```

pub mod plugins;

// Re-export key types for convenience
pub use attention_plugin_api::EventBus;
pub use plugins::{
    ConfigStore, LoaderError, PluginInfo, PluginLoader, PluginManager, PluginManagerConfig,
    PluginManagerError, PluginState, StoreError,
};
