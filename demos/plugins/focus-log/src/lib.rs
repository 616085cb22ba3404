//! Focus Log Plugin - A simple example analyzer for attention
//!
//! This plugin demonstrates:
//! - The `AnalyzerPlugin` specialization and the `export_plugin!` macro
//! - Reading configuration with defaults and a schema
//! - Publishing derived events back onto the bus
//!
//! ## Building
//!
//! ```bash
//! cargo build --release
//! ```
//!
//! ## Installing
//!
//! ```bash
//! mkdir -p ~/.config/attention/plugins/focus-log
//! cp target/release/libfocus_log_plugin.so ~/.config/attention/plugins/focus-log/libplugin.so
//! attention plugin enable focus-log
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

use attention_plugin_api::{
    Analyzer, AnalyzerPlugin, ConfigField, ConfigMap, Configurable, EventData, FieldType,
    PluginContext, PluginError, PluginMetadata, export_plugin, to_event_data,
};
use serde_json::json;

/// Counts monitoring cycles and reports how many were spent distracted.
#[derive(Default)]
pub struct FocusLog {
    cycles: AtomicU64,
    distracted: AtomicU64,
}

impl Configurable for FocusLog {
    fn default_config(&self) -> ConfigMap {
        to_event_data(json!({"report_every": 10}))
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        vec![
            ConfigField::new("report_every", "Report every N cycles", FieldType::Number)
                .default_value(10)
                .help("Publish focus_log.summary after this many cycles"),
        ]
    }

    fn on_deactivate(&self, ctx: &PluginContext) -> Result<(), PluginError> {
        ctx.log_info(&format!(
            "Focus log stopped after {} cycles",
            self.cycles.load(Ordering::Relaxed)
        ));
        Ok(())
    }
}

impl AnalyzerPlugin for FocusLog {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("focus-log", "Focus Log")
            .description("Counts distracted monitoring cycles")
            .author("attention")
            .tags(["example"])
    }

    fn analyze(
        &self,
        ctx: &PluginContext,
        _event: &str,
        data: &EventData,
    ) -> Result<(), PluginError> {
        let cycles = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        if data.get("fused_state").and_then(|v| v.as_str()) == Some("distracted") {
            self.distracted.fetch_add(1, Ordering::Relaxed);
        }

        let every = ctx.config_get::<u64>("report_every").unwrap_or(10).max(1);
        if cycles % every == 0 {
            ctx.publish(
                "focus_log.summary",
                to_event_data(json!({
                    "cycles": cycles,
                    "distracted": self.distracted.load(Ordering::Relaxed),
                })),
            );
        }
        Ok(())
    }
}

export_plugin!(Analyzer<FocusLog>);
