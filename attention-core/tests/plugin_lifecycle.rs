//! End-to-end plugin lifecycle tests
//!
//! Plugins are compiled in and discovered through `plugin.toml` units in a
//! temporary directory, the same path dynamic plugins take minus the library.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::mpsc;

use serde_json::json;
use tempfile::TempDir;

use attention_core::plugins::{
    ConfigStore, MANIFEST_FILE, PluginLoader, PluginManager, PluginManagerConfig, PluginState,
};
use attention_plugin_api::{
    Analyzer, AnalyzerPlugin, ConfigMap, Configurable, EventBus, EventData, Nudge, NudgePlugin,
    Plugin, PluginContext, PluginError, PluginMetadata, PluginType, events, to_event_data,
};

/// Scores every monitoring cycle and republishes the score.
#[derive(Default)]
struct FocusScorer;

impl Configurable for FocusScorer {
    fn default_config(&self) -> ConfigMap {
        to_event_data(json!({"a": 1, "b": 2}))
    }
}

impl AnalyzerPlugin for FocusScorer {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("focus-scorer", "Focus Scorer").version("0.2.0")
    }

    fn analyze(
        &self,
        ctx: &PluginContext,
        _event: &str,
        data: &EventData,
    ) -> Result<(), PluginError> {
        let state = data
            .get("fused_state")
            .and_then(|v| v.as_str())
            .ok_or_else(|| PluginError::invalid_input("fused_state missing"))?;
        let weight = ctx.config_get::<i64>("b").unwrap_or_default();
        ctx.publish(
            "focus.scored",
            to_event_data(json!({"state": state, "weight": weight})),
        );
        Ok(())
    }
}

/// Requires a webhook URL before it can activate.
#[derive(Default)]
struct WebhookNudge;

impl Configurable for WebhookNudge {}

impl NudgePlugin for WebhookNudge {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("webhook-nudge", "Webhook Nudge")
    }

    fn handle_nudge(
        &self,
        _ctx: &PluginContext,
        _event: &str,
        _data: &EventData,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

struct StrictWebhook(Nudge<WebhookNudge>);

impl Plugin for StrictWebhook {
    fn metadata(&self) -> PluginMetadata {
        self.0.metadata()
    }

    fn activate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        self.0.activate(ctx)?;
        if ctx.config_get::<String>("url").is_none() {
            return Err(PluginError::config("url is required"));
        }
        Ok(())
    }
}

fn focus_scorer() -> Box<dyn Plugin> {
    Box::new(Analyzer::<FocusScorer>::default())
}

fn strict_webhook() -> Box<dyn Plugin> {
    Box::new(StrictWebhook(Nudge::default()))
}

fn shadow_scorer() -> Box<dyn Plugin> {
    Box::new(Analyzer::<FocusScorer>::default())
}

fn write_unit(root: &Path, dir: &str, factory: &str) {
    let unit = root.join(dir);
    std::fs::create_dir_all(&unit).unwrap();
    std::fs::write(unit.join(MANIFEST_FILE), format!("factory = \"{factory}\"\n")).unwrap();
}

struct Fixture {
    _dir: TempDir,
    plugins: PathBuf,
    config_path: PathBuf,
}

impl Fixture {
    fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let plugins = dir.path().join("plugins");
        write_unit(&plugins, "focus", "focus-scorer");
        write_unit(&plugins, "webhook", "strict-webhook");
        write_unit(&plugins, "_template", "focus-scorer");
        Self {
            config_path: dir.path().join("data/plugin_configs.json"),
            plugins,
            _dir: dir,
        }
    }

    fn manager(&self, bus: Arc<EventBus>) -> PluginManager {
        let loader = PluginLoader::new()
            .with_builtin("focus-scorer", focus_scorer)
            .with_builtin("strict-webhook", strict_webhook)
            .with_builtin("shadow-scorer", shadow_scorer);
        let mut manager = PluginManager::new(
            bus,
            PluginManagerConfig {
                plugin_dirs: vec![self.plugins.clone()],
                config_path: self.config_path.clone(),
            },
        )
        .with_loader(loader);
        manager.discover();
        manager
    }

    fn store(&self) -> ConfigStore {
        ConfigStore::load(&self.config_path)
    }
}

#[test]
fn discovery_registers_units_without_activating() {
    let fixture = Fixture::new();
    let manager = fixture.manager(Arc::new(EventBus::new()));

    let infos = manager.list_plugins();
    let names: Vec<&str> = infos.iter().map(|i| i.metadata.name.as_str()).collect();
    assert_eq!(names, vec!["focus-scorer", "webhook-nudge"]);
    assert!(infos.iter().all(|i| i.state == PluginState::Registered));
    assert_eq!(infos[0].metadata.plugin_type, PluginType::Analyzer);
    assert_eq!(infos[1].metadata.plugin_type, PluginType::Nudge);
    assert_eq!(infos[0].dir, fixture.plugins.join("focus"));
    assert_eq!(manager.bus().listener_count(), 0);
}

#[test]
fn activated_analyzer_reacts_to_cycles() {
    let fixture = Fixture::new();
    let bus = Arc::new(EventBus::new());
    let mut manager = fixture.manager(Arc::clone(&bus));

    let (tx, rx) = mpsc::channel::<EventData>();
    bus.on("focus.scored", move |_, data| {
        tx.send(data.clone())?;
        Ok(())
    });

    manager.activate("focus-scorer").unwrap();
    let report = bus.publish(
        events::CYCLE_COMPLETE,
        to_event_data(json!({"fused_state": "deep_work"})),
    );

    assert!(report.is_clean());
    let scored = rx.try_recv().unwrap();
    assert_eq!(scored["state"], "deep_work");
    assert_eq!(scored["weight"], 2);

    // A malformed payload is reported as a failure, not raised
    let report = bus.publish(events::CYCLE_COMPLETE, EventData::new());
    assert_eq!(report.failures().count(), 1);

    manager.deactivate("focus-scorer").unwrap();
    bus.publish(
        events::CYCLE_COMPLETE,
        to_event_data(json!({"fused_state": "idle"})),
    );
    assert!(rx.try_recv().is_err());
}

#[test]
fn config_merge_update_and_persistence() {
    let fixture = Fixture::new();
    {
        let mut store = fixture.store();
        store.set_config("focus-scorer", to_event_data(json!({"a": 9})));
        store.save().unwrap();
    }

    let mut manager = fixture.manager(Arc::new(EventBus::new()));
    assert_eq!(
        manager.plugin_info("focus-scorer").unwrap().config,
        to_event_data(json!({"a": 9, "b": 2}))
    );

    manager
        .update_config("focus-scorer", to_event_data(json!({"b": 7})))
        .unwrap();

    assert_eq!(
        fixture.store().config_for("focus-scorer"),
        to_event_data(json!({"a": 9, "b": 7}))
    );
}

#[test]
fn enabled_plugins_activate_on_next_start() {
    let fixture = Fixture::new();
    {
        let mut manager = fixture.manager(Arc::new(EventBus::new()));
        manager.activate("focus-scorer").unwrap();
    }
    assert!(fixture.store().is_enabled("focus-scorer"));

    let bus = Arc::new(EventBus::new());
    let manager = fixture.manager(Arc::clone(&bus));

    assert!(manager.is_active("focus-scorer"));
    assert!(!manager.is_active("webhook-nudge"));
    let listeners = bus.listeners(Some(events::CYCLE_COMPLETE));
    assert_eq!(listeners.len(), 1);
    assert_eq!(listeners[0].source, "focus-scorer");
    assert_eq!(listeners[0].priority, 50);
}

#[test]
fn failed_activation_leaves_no_partial_subscriptions() {
    let fixture = Fixture::new();
    let bus = Arc::new(EventBus::new());
    let mut manager = fixture.manager(Arc::clone(&bus));

    assert!(manager.activate("webhook-nudge").is_err());

    let info = manager.plugin_info("webhook-nudge").unwrap();
    assert!(!info.active);
    assert_eq!(info.last_error.as_deref(), Some("Configuration error: url is required"));
    assert!(bus.listeners(Some(events::NUDGE_TRIGGERED)).is_empty());

    // Fixing the config and retrying succeeds
    manager
        .update_config("webhook-nudge", to_event_data(json!({"url": "https://hook"})))
        .unwrap();
    manager.activate("webhook-nudge").unwrap();
    assert_eq!(bus.listeners(Some(events::NUDGE_TRIGGERED)).len(), 1);
    assert_eq!(manager.plugin_info("webhook-nudge").unwrap().last_error, None);
}

#[test]
fn duplicate_name_in_later_unit_is_discarded() {
    let fixture = Fixture::new();
    write_unit(&fixture.plugins, "zz-shadow", "shadow-scorer");

    let manager = fixture.manager(Arc::new(EventBus::new()));

    assert_eq!(manager.plugin_count(), 2);
    assert_eq!(
        manager.plugin_info("focus-scorer").unwrap().dir,
        fixture.plugins.join("focus")
    );
}

#[test]
fn lifecycle_events_are_published_in_order() {
    let fixture = Fixture::new();
    let bus = Arc::new(EventBus::new());
    let mut manager = fixture.manager(Arc::clone(&bus));

    manager.activate("focus-scorer").unwrap();
    let _ = manager.activate("webhook-nudge");
    manager.deactivate_all();

    let lifecycle: Vec<String> = bus
        .history(100)
        .into_iter()
        .map(|r| r.event)
        .collect();
    assert_eq!(
        lifecycle,
        vec![
            events::PLUGIN_LOADED,
            events::PLUGIN_LOADED,
            events::PLUGIN_ACTIVATED,
            events::PLUGIN_ERROR,
            events::PLUGIN_DEACTIVATED,
        ]
    );
    assert_eq!(bus.listener_count(), 0);
}
