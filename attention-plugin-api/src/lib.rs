//! attention-plugin-api - Plugin API for the attention monitor
//!
//! This crate provides the traits and types needed to write attention plugins.
//! A plugin is a self-contained unit (a native dynamic library, or a built-in
//! factory) that reacts to events on the shared [`EventBus`] and owns its own
//! configuration.
//!
//! # Example
//!
//! ```ignore
//! use attention_plugin_api::{
//!     Plugin, PluginContext, PluginError, PluginMetadata, events, export_plugin,
//! };
//!
//! #[derive(Default)]
//! pub struct PomodoroLogger;
//!
//! impl Plugin for PomodoroLogger {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("pomodoro-logger", "Pomodoro Logger")
//!             .description("Logs every finished pomodoro")
//!     }
//!
//!     fn activate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
//!         let log = ctx.clone();
//!         ctx.subscribe(events::POMODORO_COMPLETED, move |_, data| {
//!             log.log_info(&format!("pomodoro done: {data:?}"));
//!             Ok(())
//!         });
//!         Ok(())
//!     }
//! }
//!
//! export_plugin!(PomodoroLogger);
//! ```

pub mod context;
pub mod error;
pub mod events;
pub mod specialized;
pub mod types;

pub use attention_bus::{
    DEFAULT_PRIORITY, DispatchReport, EventBus, EventData, HandlerError, HandlerResult,
    ListenerId, SubscribeOptions, WILDCARD, to_event_data,
};
pub use context::PluginContext;
pub use error::PluginError;
pub use specialized::{
    Analyzer, AnalyzerPlugin, Configurable, ExportSubscription, Exporter, ExporterPlugin, Nudge,
    NudgePlugin, Reporter, ReporterPlugin,
};
pub use types::*;

/// Current plugin API version. Plugins must match this exactly.
/// This will be checked when loading plugins to ensure compatibility.
pub const API_VERSION: u32 = 1;

/// Symbol returning the API version a dynamic plugin was built against
pub const API_VERSION_SYMBOL: &[u8] = b"_attention_plugin_api_version";

/// Symbol creating the plugin instance of a dynamic plugin
pub const CREATE_SYMBOL: &[u8] = b"_attention_plugin_create";

/// The base plugin contract.
///
/// Lifecycle is driven by the plugin manager:
/// 1. The instance is created with no arguments and given its [`PluginContext`]
/// 2. [`activate`](Plugin::activate) subscribes to events and starts work
/// 3. [`deactivate`](Plugin::deactivate) releases resources
///
/// Subscriptions made through the context are removed by the manager after
/// `deactivate`, whether or not the plugin removed them itself.
pub trait Plugin: Send + Sync {
    /// Return plugin metadata
    fn metadata(&self) -> PluginMetadata;

    /// Subscribe to events and start background work.
    fn activate(&mut self, ctx: &PluginContext) -> Result<(), PluginError>;

    /// Stop background work and release resources.
    fn deactivate(&mut self, _ctx: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }

    /// Default configuration, overlaid by persisted values
    fn default_config(&self) -> ConfigMap {
        ConfigMap::new()
    }

    /// Describes configurable fields for a management surface
    fn config_schema(&self) -> Vec<ConfigField> {
        Vec::new()
    }

    /// Called after the configuration changed. `config` is the merged result.
    fn on_config_changed(
        &mut self,
        _ctx: &PluginContext,
        _config: &ConfigMap,
    ) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Factory used for plugins compiled into the host binary
pub type PluginFactory = fn() -> Box<dyn Plugin>;

/// Signature of [`CREATE_SYMBOL`]. Returns null if construction panicked.
pub type CreateFn = extern "C-unwind" fn() -> *mut dyn Plugin;

/// Signature of [`API_VERSION_SYMBOL`]
pub type ApiVersionFn = extern "C-unwind" fn() -> u32;

/// Construct `T` for export, catching a panic in its constructor.
///
/// The panic message is reported by the panic hook of the library that
/// panicked; the caller only sees a null pointer.
#[doc(hidden)]
pub fn __create_exported<T: Plugin + Default + 'static>() -> *mut dyn Plugin {
    match std::panic::catch_unwind(T::default) {
        Ok(plugin) => {
            let plugin: Box<dyn Plugin> = Box::new(plugin);
            Box::into_raw(plugin)
        }
        Err(_) => std::ptr::null_mut::<T>() as *mut dyn Plugin,
    }
}

/// Export a plugin type for dynamic loading.
///
/// The type must implement [`Plugin`] and [`Default`]. Exporting two types
/// from one library is rejected by the linker (duplicate symbols).
///
/// # Usage
///
/// ```ignore
/// attention_plugin_api::export_plugin!(MyPlugin);
/// attention_plugin_api::export_plugin!(Analyzer<FocusAnalyzer>);
/// ```
///
/// # Generated Functions
///
/// - `_attention_plugin_create()`: Creates a new plugin instance, or returns
///   null if `Default::default` panicked
/// - `_attention_plugin_api_version()`: Returns the API version
#[macro_export]
macro_rules! export_plugin {
    ($plugin_type:ty) => {
        #[unsafe(no_mangle)]
        #[allow(improper_ctypes_definitions)]
        pub extern "C-unwind" fn _attention_plugin_create() -> *mut dyn $crate::Plugin {
            $crate::__create_exported::<$plugin_type>()
        }

        #[unsafe(no_mangle)]
        pub extern "C-unwind" fn _attention_plugin_api_version() -> u32 {
            $crate::API_VERSION
        }
    };
}
