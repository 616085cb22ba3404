//! PluginContext - a plugin's handle to the event bus and its configuration

use std::fmt;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use attention_bus::{
    DispatchReport, EventBus, EventData, HandlerResult, ListenerId, SubscribeOptions,
};
use parking_lot::RwLock;
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::PluginError;
use crate::types::ConfigMap;

/// Plugin's interface to the rest of attention.
///
/// The plugin manager creates one context per plugin, right after the plugin
/// is instantiated and before any lifecycle method runs, and passes it to
/// every lifecycle call. It provides:
/// - The shared [`EventBus`], with subscriptions tagged by plugin name
/// - The merged plugin configuration (defaults overlaid by persisted values)
/// - Detached background execution for slow work
/// - Logging prefixed with the plugin name
///
/// Contexts are cheap to clone; clones share the bus and the configuration,
/// so a clone captured by an event handler sees later config updates.
#[derive(Clone)]
pub struct PluginContext {
    plugin_name: String,
    plugin_dir: PathBuf,
    bus: Arc<EventBus>,
    config: Arc<RwLock<ConfigMap>>,
}

impl PluginContext {
    /// Create a new plugin context
    pub fn new(
        plugin_name: impl Into<String>,
        plugin_dir: impl Into<PathBuf>,
        bus: Arc<EventBus>,
        config: ConfigMap,
    ) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            plugin_dir: plugin_dir.into(),
            bus,
            config: Arc::new(RwLock::new(config)),
        }
    }

    /// Get the plugin's name (also its subscription source tag)
    pub fn plugin_name(&self) -> &str {
        &self.plugin_name
    }

    /// Get the directory the plugin was loaded from
    pub fn plugin_dir(&self) -> &Path {
        &self.plugin_dir
    }

    /// Get the shared event bus
    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    // ─── Configuration ───────────────────────────────────────────────

    /// Snapshot of the current configuration
    pub fn config(&self) -> ConfigMap {
        self.config.read().clone()
    }

    /// Read a raw configuration value
    pub fn config_value(&self, key: &str) -> Option<Value> {
        self.config.read().get(key).cloned()
    }

    /// Read and deserialize a configuration value
    ///
    /// # Example
    /// ```ignore
    /// let webhook: Option<String> = ctx.config_get("webhook_url");
    /// ```
    pub fn config_get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        self.config_value(key)
            .and_then(|value| serde_json::from_value(value).ok())
    }

    /// Replace the configuration (used by the plugin manager)
    pub fn set_config(&self, config: ConfigMap) {
        *self.config.write() = config;
    }

    // ─── Event Bus ───────────────────────────────────────────────────

    /// Subscribe to `event` with the default priority.
    ///
    /// The subscription is tagged with the plugin name, so the manager removes
    /// it automatically when the plugin is deactivated.
    pub fn subscribe<F>(&self, event: &str, handler: F) -> ListenerId
    where
        F: Fn(&str, &EventData) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_with(event, handler, SubscribeOptions::default())
    }

    /// Subscribe with explicit priority/once options.
    ///
    /// `options.source` is always overwritten with the plugin name.
    pub fn subscribe_with<F>(
        &self,
        event: &str,
        handler: F,
        options: SubscribeOptions,
    ) -> ListenerId
    where
        F: Fn(&str, &EventData) -> HandlerResult + Send + Sync + 'static,
    {
        self.bus
            .subscribe(event, handler, options.source(self.plugin_name.as_str()))
    }

    /// Publish an event on the shared bus
    pub fn publish(&self, event: &str, data: EventData) -> DispatchReport {
        self.bus.publish(event, data)
    }

    // ─── Background work ─────────────────────────────────────────────

    /// Run `task` on a detached thread.
    ///
    /// Fire-and-forget: nothing flows back to the publisher, and the thread is
    /// not joined at shutdown. A panic inside `task` is logged and contained.
    pub fn spawn_detached<F>(&self, task_name: &str, task: F) -> Result<(), PluginError>
    where
        F: FnOnce() + Send + 'static,
    {
        let plugin = self.plugin_name.clone();
        let task_name = task_name.to_string();
        let thread_name = format!("{plugin}:{task_name}");

        std::thread::Builder::new()
            .name(thread_name)
            .spawn(move || {
                if catch_unwind(AssertUnwindSafe(task)).is_err() {
                    tracing::error!(
                        plugin = %plugin,
                        task = %task_name,
                        "Background task panicked"
                    );
                }
            })?;
        Ok(())
    }

    // ─── Logging ─────────────────────────────────────────────────────

    /// Log an info message (automatically prefixed with plugin name)
    pub fn log_info(&self, message: &str) {
        tracing::info!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a warning message
    pub fn log_warn(&self, message: &str) {
        tracing::warn!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log an error message
    pub fn log_error(&self, message: &str) {
        tracing::error!(plugin = %self.plugin_name, "{}", message);
    }

    /// Log a debug message
    pub fn log_debug(&self, message: &str) {
        tracing::debug!(plugin = %self.plugin_name, "{}", message);
    }
}

impl fmt::Debug for PluginContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginContext")
            .field("plugin_name", &self.plugin_name)
            .field("plugin_dir", &self.plugin_dir)
            .finish_non_exhaustive()
    }
}
