//! PluginManager - registers plugins and drives their lifecycle

use serde::Serialize;
use serde_json::json;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::path::PathBuf;
use std::sync::Arc;

use attention_plugin_api::{
    ConfigField, ConfigMap, EventBus, PluginContext, PluginMetadata, events, merge_config,
    to_event_data,
};

use super::error::PluginManagerError;
use super::loader::{LoadedUnit, PluginLoader, panic_message};
use super::store::ConfigStore;

/// Configuration for PluginManager
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginManagerConfig {
    /// Directories scanned by [`PluginManager::discover`], in order
    pub plugin_dirs: Vec<PathBuf>,
    /// Persisted enabled flags and plugin configuration
    pub config_path: PathBuf,
}

impl Default for PluginManagerConfig {
    fn default() -> Self {
        Self {
            plugin_dirs: vec![attention_paths::plugin_dir()],
            config_path: attention_paths::plugin_config_file(),
        }
    }
}

/// Lifecycle state of a registered plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PluginState {
    /// Registered, not running
    Registered,
    /// `activate` succeeded
    Active,
    /// `activate` failed; the plugin stays inactive until activated again
    Error { message: String },
}

/// Information about a plugin
#[derive(Debug, Clone, Serialize)]
pub struct PluginInfo {
    pub metadata: PluginMetadata,
    pub active: bool,
    pub state: PluginState,
    pub last_error: Option<String>,
    pub config: ConfigMap,
    pub config_schema: Vec<ConfigField>,
    pub dir: PathBuf,
}

/// A registered plugin with its runtime state
struct ManagedPlugin {
    metadata: PluginMetadata,
    context: PluginContext,
    state: PluginState,
    last_error: Option<String>,
    /// Last field: the instance and its library drop after everything else
    unit: LoadedUnit,
}

impl ManagedPlugin {
    fn is_active(&self) -> bool {
        self.state == PluginState::Active
    }

    fn info(&self) -> PluginInfo {
        let config_schema = guarded(&self.metadata.name, "config_schema", || {
            self.unit.plugin().config_schema()
        })
        .unwrap_or_default();

        PluginInfo {
            metadata: self.metadata.clone(),
            active: self.is_active(),
            state: self.state.clone(),
            last_error: self.last_error.clone(),
            config: self.context.config(),
            config_schema,
            dir: self.unit.dir.clone(),
        }
    }
}

/// The plugin manager owns every plugin instance and is the only code that
/// registers plugin listeners on the bus (through each plugin's context).
///
/// Invariants:
/// - names are unique; the first plugin registered under a name wins
/// - an inactive plugin has no listeners tagged with its name
/// - enable/disable/config changes are written to the store before returning
pub struct PluginManager {
    bus: Arc<EventBus>,
    store: ConfigStore,
    loader: PluginLoader,
    plugin_dirs: Vec<PathBuf>,
    /// Registration order
    plugins: Vec<ManagedPlugin>,
}

impl PluginManager {
    /// Create a manager and read the persisted plugin configuration.
    pub fn new(bus: Arc<EventBus>, config: PluginManagerConfig) -> Self {
        Self {
            bus,
            store: ConfigStore::load(config.config_path),
            loader: PluginLoader::new(),
            plugin_dirs: config.plugin_dirs,
            plugins: Vec::new(),
        }
    }

    /// Use `loader` (e.g. with built-in factories) for discovery
    pub fn with_loader(mut self, loader: PluginLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Discover plugins in the configured directories.
    pub fn discover(&mut self) -> usize {
        let dirs = self.plugin_dirs.clone();
        self.discover_in(&dirs)
    }

    /// Load and register every unit under `directories`, one at a time.
    /// Returns how many plugins were registered.
    pub fn discover_in(&mut self, directories: &[PathBuf]) -> usize {
        let mut registered = 0;
        for candidate in self.loader.candidates(directories) {
            let Some(unit) = self.loader.load_logged(&candidate) else {
                continue;
            };
            if self.register(unit).is_ok() {
                registered += 1;
            }
        }
        tracing::info!(count = registered, total = self.plugins.len(), "Plugin discovery finished");
        registered
    }

    /// Register a loaded plugin.
    ///
    /// The plugin's configuration is its defaults overlaid by persisted
    /// values. A plugin persisted as enabled is activated right away; an
    /// activation failure leaves it registered in the error state.
    pub fn register(&mut self, unit: LoadedUnit) -> Result<(), PluginManagerError> {
        let described = guarded(&unit.namespace, "metadata", || {
            (unit.plugin().metadata(), unit.plugin().default_config())
        });
        let (metadata, defaults) = described.map_err(|message| {
            tracing::error!(
                plugin = %unit.namespace,
                error = %message,
                "Failed to describe plugin"
            );
            PluginManagerError::RegistrationFailed {
                name: unit.namespace.clone(),
                message,
            }
        })?;
        let name = metadata.name.clone();

        if self.find(&name).is_some() {
            tracing::warn!(
                plugin = %name,
                dir = %unit.dir.display(),
                "Plugin name already registered, skipping"
            );
            return Err(PluginManagerError::NameCollision { name });
        }

        let config = merge_config(&defaults, &self.store.config_for(&name));
        let context = PluginContext::new(&name, &unit.dir, Arc::clone(&self.bus), config);

        tracing::info!(
            plugin = %name,
            version = %metadata.version,
            plugin_type = %metadata.plugin_type,
            "Plugin registered"
        );

        let meta = serde_json::to_value(&metadata).unwrap_or_default();
        self.plugins.push(ManagedPlugin {
            metadata,
            context,
            state: PluginState::Registered,
            last_error: None,
            unit,
        });
        self.bus.publish(
            events::PLUGIN_LOADED,
            to_event_data(json!({"name": name, "meta": meta})),
        );

        if self.store.is_enabled(&name) {
            // Failure is recorded in the plugin state and already logged.
            let _ = self.activate(&name);
        }
        Ok(())
    }

    /// Activate a plugin. Activating an active plugin is a no-op.
    ///
    /// On failure every listener the plugin managed to install is removed,
    /// the plugin enters [`PluginState::Error`] and `plugin.error` is
    /// published. There is no automatic retry.
    pub fn activate(&mut self, name: &str) -> Result<(), PluginManagerError> {
        let index = self.index_of(name)?;
        let plugin = &mut self.plugins[index];

        if plugin.is_active() {
            tracing::debug!(plugin = %name, "Plugin already active");
            return Ok(());
        }

        let result = guarded(name, "activate", || {
            plugin.unit.instance.activate(&plugin.context)
        })
        .and_then(|r| r.map_err(|e| e.to_string()));

        match result {
            Ok(()) => {
                plugin.state = PluginState::Active;
                plugin.last_error = None;
                tracing::info!(plugin = %name, "Plugin activated");

                self.store.set_enabled(name, true);
                self.persist();
                self.bus
                    .publish(events::PLUGIN_ACTIVATED, to_event_data(json!({"name": name})));
                Ok(())
            }
            Err(message) => {
                plugin.state = PluginState::Error {
                    message: message.clone(),
                };
                plugin.last_error = Some(message.clone());
                let removed = self.bus.unsubscribe_all(name);
                tracing::error!(
                    plugin = %name,
                    error = %message,
                    removed = removed,
                    "Plugin activation failed"
                );

                self.bus.publish(
                    events::PLUGIN_ERROR,
                    to_event_data(json!({"name": name, "error": message})),
                );
                Err(PluginManagerError::ActivationFailed {
                    name: name.to_string(),
                    message,
                })
            }
        }
    }

    /// Deactivate a plugin. Deactivating an inactive plugin is a no-op.
    ///
    /// The plugin's `deactivate` may fail or panic; its listeners are removed
    /// regardless and it returns to [`PluginState::Registered`].
    pub fn deactivate(&mut self, name: &str) -> Result<(), PluginManagerError> {
        let index = self.index_of(name)?;
        if !self.plugins[index].is_active() {
            return Ok(());
        }

        self.teardown(index);
        self.store.set_enabled(name, false);
        self.persist();
        self.bus
            .publish(events::PLUGIN_DEACTIVATED, to_event_data(json!({"name": name})));
        Ok(())
    }

    /// Turn a plugin off and keep it off on the next start.
    ///
    /// Unlike [`deactivate`](Self::deactivate) this also clears the enabled
    /// flag of a plugin that is not active, such as one whose activation
    /// failed at startup. Returns whether anything changed.
    pub fn disable(&mut self, name: &str) -> Result<bool, PluginManagerError> {
        let was_active = self.is_active(name);
        self.deactivate(name)?;

        if !self.store.is_enabled(name) {
            return Ok(was_active);
        }
        self.store.set_enabled(name, false);
        self.persist();
        tracing::info!(plugin = %name, "Plugin disabled");
        Ok(true)
    }

    /// Deactivate every active plugin for shutdown.
    ///
    /// Enabled flags are left untouched so the same plugins come back on the
    /// next start.
    pub fn deactivate_all(&mut self) {
        for index in 0..self.plugins.len() {
            if self.plugins[index].is_active() {
                self.teardown(index);
                let name = self.plugins[index].metadata.name.clone();
                self.bus
                    .publish(events::PLUGIN_DEACTIVATED, to_event_data(json!({"name": name})));
            }
        }
    }

    /// Merge `partial` into a plugin's configuration (partial wins), notify
    /// the plugin and persist the result. Returns the merged configuration.
    pub fn update_config(
        &mut self,
        name: &str,
        partial: ConfigMap,
    ) -> Result<ConfigMap, PluginManagerError> {
        let index = self.index_of(name)?;
        let plugin = &mut self.plugins[index];

        let merged = merge_config(&plugin.context.config(), &partial);
        plugin.context.set_config(merged.clone());

        let notified = guarded(name, "on_config_changed", || {
            plugin.unit.instance.on_config_changed(&plugin.context, &merged)
        })
        .and_then(|r| r.map_err(|e| e.to_string()));
        if let Err(message) = notified {
            tracing::warn!(
                plugin = %name,
                error = %message,
                "Plugin config change callback failed"
            );
        }

        self.store.set_config(name, merged.clone());
        self.persist();
        tracing::info!(plugin = %name, keys = partial.len(), "Plugin config updated");
        Ok(merged)
    }

    /// All registered plugins, in registration order
    pub fn list_plugins(&self) -> Vec<PluginInfo> {
        self.plugins.iter().map(ManagedPlugin::info).collect()
    }

    pub fn plugin_info(&self, name: &str) -> Option<PluginInfo> {
        self.find(name).map(ManagedPlugin::info)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.find(name).is_some_and(ManagedPlugin::is_active)
    }

    pub fn plugin_count(&self) -> usize {
        self.plugins.len()
    }

    /// Write the persisted configuration now, surfacing any error.
    pub fn save_config(&self) -> Result<(), PluginManagerError> {
        Ok(self.store.save()?)
    }

    fn find(&self, name: &str) -> Option<&ManagedPlugin> {
        self.plugins.iter().find(|p| p.metadata.name == name)
    }

    fn index_of(&self, name: &str) -> Result<usize, PluginManagerError> {
        self.plugins
            .iter()
            .position(|p| p.metadata.name == name)
            .ok_or_else(|| {
                tracing::warn!(plugin = %name, "Plugin not found");
                PluginManagerError::NotFound {
                    name: name.to_string(),
                }
            })
    }

    /// Run `deactivate`, then remove every listener tagged with the plugin.
    fn teardown(&mut self, index: usize) {
        let plugin = &mut self.plugins[index];
        let name = plugin.metadata.name.clone();

        let result = guarded(&name, "deactivate", || {
            plugin.unit.instance.deactivate(&plugin.context)
        })
        .and_then(|r| r.map_err(|e| e.to_string()));
        if let Err(message) = result {
            tracing::warn!(plugin = %name, error = %message, "Plugin deactivate callback failed");
        }

        let removed = self.bus.unsubscribe_all(&name);
        plugin.state = PluginState::Registered;
        plugin.last_error = None;
        tracing::info!(plugin = %name, removed = removed, "Plugin deactivated");
    }

    fn persist(&self) {
        if let Err(e) = self.store.save() {
            tracing::error!(
                path = %self.store.path().display(),
                error = %e,
                "Failed to save plugin config"
            );
        }
    }
}

impl Drop for PluginManager {
    fn drop(&mut self) {
        // Plugin listeners must be gone before plugin code is unloaded.
        for index in 0..self.plugins.len() {
            if self.plugins[index].is_active() {
                self.teardown(index);
            }
        }
    }
}

impl std::fmt::Debug for PluginManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let names: Vec<&str> = self.plugins.iter().map(|p| p.metadata.name.as_str()).collect();
        f.debug_struct("PluginManager")
            .field("plugins", &names)
            .field("plugin_dirs", &self.plugin_dirs)
            .field("store", &self.store.path())
            .finish_non_exhaustive()
    }
}

/// Call into plugin code, turning a panic into an error message.
fn guarded<T>(plugin: &str, hook: &str, f: impl FnOnce() -> T) -> Result<T, String> {
    catch_unwind(AssertUnwindSafe(f)).map_err(|payload| {
        let message = panic_message(payload.as_ref());
        tracing::error!(plugin = %plugin, hook = %hook, panic = %message, "Plugin panicked");
        format!("panicked in {hook}: {message}")
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use attention_plugin_api::{EventData, Plugin, PluginError, WILDCARD};
    use parking_lot::Mutex;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Calls {
        activate: usize,
        deactivate: usize,
        config_changed: Vec<ConfigMap>,
    }

    struct Recorder {
        name: &'static str,
        calls: Arc<Mutex<Calls>>,
        fail_activate: bool,
        subscribe_on_activate: bool,
    }

    impl Recorder {
        fn new(name: &'static str) -> (Self, Arc<Mutex<Calls>>) {
            let calls = Arc::new(Mutex::new(Calls::default()));
            (
                Self {
                    name,
                    calls: Arc::clone(&calls),
                    fail_activate: false,
                    subscribe_on_activate: true,
                },
                calls,
            )
        }
    }

    impl Plugin for Recorder {
        fn metadata(&self) -> PluginMetadata {
            PluginMetadata::new(self.name, self.name).version("1.0.0")
        }

        fn activate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
            self.calls.lock().activate += 1;
            if self.subscribe_on_activate {
                ctx.subscribe(events::CYCLE_COMPLETE, |_, _| Ok(()));
                ctx.subscribe(WILDCARD, |_, _| Ok(()));
            }
            if self.fail_activate {
                return Err(PluginError::config("webhook_url is required"));
            }
            Ok(())
        }

        fn deactivate(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
            self.calls.lock().deactivate += 1;
            Ok(())
        }

        fn default_config(&self) -> ConfigMap {
            to_event_data(json!({"a": 1, "b": 2}))
        }

        fn on_config_changed(
            &mut self,
            _ctx: &PluginContext,
            config: &ConfigMap,
        ) -> Result<(), PluginError> {
            self.calls.lock().config_changed.push(config.clone());
            Ok(())
        }
    }

    fn manager(dir: &TempDir) -> PluginManager {
        PluginManager::new(
            Arc::new(EventBus::new()),
            PluginManagerConfig {
                plugin_dirs: Vec::new(),
                config_path: dir.path().join("plugin_configs.json"),
            },
        )
    }

    fn unit(plugin: impl Plugin + 'static) -> LoadedUnit {
        LoadedUnit::in_process("unit", "/plugins/unit", Box::new(plugin))
    }

    fn lifecycle_events(bus: &EventBus) -> Vec<String> {
        bus.history(100)
            .into_iter()
            .map(|r| r.event)
            .filter(|e| e.starts_with("plugin."))
            .collect()
    }

    #[test]
    fn test_register_publishes_loaded_and_stays_registered() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");

        manager.register(unit(recorder)).unwrap();

        assert_eq!(manager.plugin_count(), 1);
        assert!(!manager.is_active("recorder"));
        assert_eq!(calls.lock().activate, 0);
        assert_eq!(lifecycle_events(manager.bus()), vec![events::PLUGIN_LOADED]);

        let info = manager.plugin_info("recorder").unwrap();
        assert_eq!(info.state, PluginState::Registered);
        assert_eq!(info.config, to_event_data(json!({"a": 1, "b": 2})));
        assert_eq!(info.dir, PathBuf::from("/plugins/unit"));
    }

    #[test]
    fn test_activation_is_idempotent() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();

        manager.activate("recorder").unwrap();
        manager.activate("recorder").unwrap();

        assert_eq!(calls.lock().activate, 1);
        assert!(manager.is_active("recorder"));
        assert_eq!(manager.bus().listeners(Some(events::CYCLE_COMPLETE)).len(), 1);
        assert_eq!(manager.bus().listeners(Some(WILDCARD)).len(), 1);
    }

    #[test]
    fn test_deactivate_removes_listeners_plugin_left_behind() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();
        manager.activate("recorder").unwrap();

        assert_eq!(manager.bus().listener_count(), 2);

        // Recorder::deactivate does not unsubscribe anything itself.
        manager.deactivate("recorder").unwrap();

        assert_eq!(calls.lock().deactivate, 1);
        assert_eq!(manager.bus().listener_count(), 0);
        assert!(manager.bus().listeners(Some(WILDCARD)).is_empty());
        assert!(!manager.is_active("recorder"));
        assert!(
            manager
                .bus()
                .listeners(None)
                .iter()
                .all(|l| l.source != "recorder")
        );
        assert_eq!(
            lifecycle_events(manager.bus()),
            vec![
                events::PLUGIN_LOADED,
                events::PLUGIN_ACTIVATED,
                events::PLUGIN_DEACTIVATED
            ]
        );
    }

    #[test]
    fn test_deactivate_inactive_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();

        manager.deactivate("recorder").unwrap();

        assert_eq!(calls.lock().deactivate, 0);
        assert_eq!(lifecycle_events(manager.bus()), vec![events::PLUGIN_LOADED]);
    }

    #[test]
    fn test_disable_clears_enabled_flag_of_failed_plugin() {
        let dir = TempDir::new().unwrap();
        {
            let mut store = ConfigStore::load(dir.path().join("plugin_configs.json"));
            store.set_enabled("webhook", true);
            store.save().unwrap();
        }

        let mut manager = manager(&dir);
        let (mut recorder, _) = Recorder::new("webhook");
        recorder.fail_activate = true;
        manager.register(unit(recorder)).unwrap();
        assert!(matches!(
            manager.plugin_info("webhook").unwrap().state,
            PluginState::Error { .. }
        ));

        // deactivate leaves a failed plugin enabled; disable does not
        manager.deactivate("webhook").unwrap();
        assert!(manager.store.is_enabled("webhook"));

        assert!(manager.disable("webhook").unwrap());
        assert!(!manager.disable("webhook").unwrap());

        let reloaded = ConfigStore::load(dir.path().join("plugin_configs.json"));
        assert!(!reloaded.is_enabled("webhook"));
    }

    #[test]
    fn test_disable_active_plugin() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();
        manager.activate("recorder").unwrap();

        assert!(manager.disable("recorder").unwrap());

        assert!(!manager.is_active("recorder"));
        assert_eq!(calls.lock().deactivate, 1);
        assert_eq!(manager.bus().listener_count(), 0);
        assert!(!manager.store.is_enabled("recorder"));
        assert!(matches!(
            manager.disable("ghost"),
            Err(PluginManagerError::NotFound { .. })
        ));
    }

    #[test]
    fn test_unknown_plugin_is_not_found() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);

        assert!(matches!(
            manager.activate("ghost"),
            Err(PluginManagerError::NotFound { .. })
        ));
        assert!(matches!(
            manager.deactivate("ghost"),
            Err(PluginManagerError::NotFound { .. })
        ));
        assert!(matches!(
            manager.update_config("ghost", ConfigMap::new()),
            Err(PluginManagerError::NotFound { .. })
        ));
        assert!(!manager.is_active("ghost"));
        assert!(manager.plugin_info("ghost").is_none());
    }

    #[test]
    fn test_activation_failure_enters_error_state_without_listeners() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (mut recorder, _) = Recorder::new("webhook");
        recorder.fail_activate = true;
        manager.register(unit(recorder)).unwrap();

        let (tx, rx) = std::sync::mpsc::channel::<EventData>();
        manager.bus().on(events::PLUGIN_ERROR, move |_, data| {
            tx.send(data.clone())?;
            Ok(())
        });

        let err = manager.activate("webhook").unwrap_err();

        assert!(matches!(err, PluginManagerError::ActivationFailed { .. }));
        let info = manager.plugin_info("webhook").unwrap();
        assert!(!info.active);
        assert!(matches!(info.state, PluginState::Error { .. }));
        assert!(info.last_error.unwrap().contains("webhook_url is required"));
        assert!(
            manager
                .bus()
                .listeners(None)
                .iter()
                .all(|l| l.source != "webhook")
        );

        let data = rx.try_recv().unwrap();
        assert_eq!(data["name"], "webhook");
        assert!(data["error"].as_str().unwrap().contains("webhook_url"));
        assert!(!manager.store.is_enabled("webhook"));
    }

    #[test]
    fn test_name_collision_keeps_first() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (first, first_calls) = Recorder::new("dup");
        let (second, second_calls) = Recorder::new("dup");

        manager.register(unit(first)).unwrap();
        let err = manager
            .register(LoadedUnit::in_process("other", "/plugins/other", Box::new(second)))
            .unwrap_err();

        assert!(matches!(err, PluginManagerError::NameCollision { .. }));
        assert_eq!(manager.plugin_count(), 1);
        assert_eq!(manager.plugin_info("dup").unwrap().dir, PathBuf::from("/plugins/unit"));

        manager.activate("dup").unwrap();
        assert_eq!(first_calls.lock().activate, 1);
        assert_eq!(second_calls.lock().activate, 0);
    }

    #[test]
    fn test_update_config_merges_notifies_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();

        let merged = manager
            .update_config("recorder", to_event_data(json!({"b": 7, "c": true})))
            .unwrap();

        assert_eq!(merged, to_event_data(json!({"a": 1, "b": 7, "c": true})));
        assert_eq!(calls.lock().config_changed, vec![merged.clone()]);
        assert_eq!(manager.plugin_info("recorder").unwrap().config, merged);

        let reloaded = ConfigStore::load(dir.path().join("plugin_configs.json"));
        assert_eq!(reloaded.config_for("recorder"), merged);
    }

    #[test]
    fn test_enabled_flag_persisted_and_restored() {
        let dir = TempDir::new().unwrap();
        {
            let mut manager = manager(&dir);
            let (recorder, _) = Recorder::new("recorder");
            manager.register(unit(recorder)).unwrap();
            manager.activate("recorder").unwrap();
        }

        let mut manager = manager(&dir);
        let (recorder, calls) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();

        assert!(manager.is_active("recorder"));
        assert_eq!(calls.lock().activate, 1);
        assert_eq!(
            lifecycle_events(manager.bus()),
            vec![events::PLUGIN_LOADED, events::PLUGIN_ACTIVATED]
        );
    }

    #[test]
    fn test_deactivate_all_keeps_enabled_flags() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (a, _) = Recorder::new("a");
        let (b, b_calls) = Recorder::new("b");
        manager.register(unit(a)).unwrap();
        manager.register(unit(b)).unwrap();
        manager.activate("a").unwrap();
        manager.activate("b").unwrap();

        manager.deactivate_all();

        assert!(!manager.is_active("a"));
        assert!(!manager.is_active("b"));
        assert_eq!(b_calls.lock().deactivate, 1);
        assert_eq!(manager.bus().listener_count(), 0);
        assert!(manager.store.is_enabled("a"));
        assert!(manager.store.is_enabled("b"));
    }

    #[test]
    fn test_drop_removes_plugin_listeners() {
        let dir = TempDir::new().unwrap();
        let bus = Arc::new(EventBus::new());
        {
            let mut manager = PluginManager::new(
                Arc::clone(&bus),
                PluginManagerConfig {
                    plugin_dirs: Vec::new(),
                    config_path: dir.path().join("plugin_configs.json"),
                },
            );
            let (recorder, _) = Recorder::new("recorder");
            manager.register(unit(recorder)).unwrap();
            manager.activate("recorder").unwrap();
            assert_eq!(bus.listener_count(), 2);
        }
        assert_eq!(bus.listener_count(), 0);
    }

    #[test]
    fn test_list_plugins_in_registration_order() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        for name in ["zulu", "alpha", "mike"] {
            let (recorder, _) = Recorder::new(name);
            manager.register(unit(recorder)).unwrap();
        }

        let names: Vec<String> = manager
            .list_plugins()
            .into_iter()
            .map(|info| info.metadata.name)
            .collect();
        assert_eq!(names, vec!["zulu", "alpha", "mike"]);
    }

    #[test]
    fn test_plugin_info_serializes_state_tag() {
        let dir = TempDir::new().unwrap();
        let mut manager = manager(&dir);
        let (recorder, _) = Recorder::new("recorder");
        manager.register(unit(recorder)).unwrap();

        let json = serde_json::to_value(manager.plugin_info("recorder").unwrap()).unwrap();
        assert_eq!(json["state"]["state"], "registered");
        assert_eq!(json["metadata"]["version"], "1.0.0");
    }
}
