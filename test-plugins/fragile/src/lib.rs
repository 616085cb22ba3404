//! A plugin that panics while being constructed.

use attention_plugin_api::{Plugin, PluginContext, PluginError, PluginMetadata, export_plugin};

pub struct Fragile;

impl Default for Fragile {
    fn default() -> Self {
        panic!("fragile plugin refused to start")
    }
}

impl Plugin for Fragile {
    fn metadata(&self) -> PluginMetadata {
        PluginMetadata::new("fragile", "Fragile")
    }

    fn activate(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }
}

export_plugin!(Fragile);
