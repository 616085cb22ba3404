//! Republishes every monitoring cycle as `echo.cycle`, tagged with the
//! configured label. Loaded by the attention-core dynamic loading tests.

use attention_plugin_api::{
    Analyzer, AnalyzerPlugin, ConfigMap, Configurable, EventData, PluginContext, PluginError,
    PluginMetadata, export_plugin, to_event_data,
};
use serde_json::json;

#[derive(Default)]
pub struct Echo;

impl Configurable for Echo {
    fn default_config(&self) -> ConfigMap {
        to_event_data(json!({"label": "echo"}))
    }
}

impl AnalyzerPlugin for Echo {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("echo", "Echo").version("0.3.0")
    }

    fn analyze(
        &self,
        ctx: &PluginContext,
        _event: &str,
        data: &EventData,
    ) -> Result<(), PluginError> {
        let label = ctx.config_get::<String>("label").unwrap_or_default();
        ctx.publish(
            "echo.cycle",
            to_event_data(json!({
                "label": label,
                "fused_state": data.get("fused_state").cloned(),
            })),
        );
        Ok(())
    }
}

export_plugin!(Analyzer<Echo>);
