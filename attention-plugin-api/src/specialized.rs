//! Specialized plugin kinds
//!
//! Most plugins react to one well-known event. Instead of wiring the
//! subscription by hand, implement one of these traits and wrap the type in
//! its adapter, which implements [`Plugin`] and subscribes on activation:
//!
//! | Trait | Adapter | Event | Priority |
//! |---|---|---|---|
//! | [`AnalyzerPlugin`] | [`Analyzer`] | `monitor.cycle_complete` | 50 |
//! | [`NudgePlugin`] | [`Nudge`] | `nudge.triggered` | 100 |
//! | [`ReporterPlugin`] | [`Reporter`] | `review.generated` | 100 |
//! | [`ExporterPlugin`] | [`Exporter`] | chosen by the plugin | chosen |
//!
//! Callbacks take `&self` because they run on whichever thread publishes the
//! event; keep mutable state behind a lock.
//!
//! ```ignore
//! #[derive(Default)]
//! struct FocusAnalyzer;
//!
//! impl Configurable for FocusAnalyzer {}
//!
//! impl AnalyzerPlugin for FocusAnalyzer {
//!     fn metadata(&self) -> PluginMetadata {
//!         PluginMetadata::new("focus-analyzer", "Focus Analyzer")
//!     }
//!
//!     fn analyze(
//!         &self,
//!         ctx: &PluginContext,
//!         _event: &str,
//!         data: &EventData,
//!     ) -> Result<(), PluginError> {
//!         ctx.log_debug(&format!("fused state: {:?}", data.get("fused_state")));
//!         Ok(())
//!     }
//! }
//!
//! export_plugin!(Analyzer<FocusAnalyzer>);
//! ```

use std::sync::Arc;

use attention_bus::{DEFAULT_PRIORITY, EventData, SubscribeOptions};

use crate::context::PluginContext;
use crate::error::PluginError;
use crate::events;
use crate::types::{ConfigField, ConfigMap, PluginMetadata, PluginType};
use crate::Plugin;

/// Analyzers run ahead of default-priority listeners.
pub const ANALYZER_PRIORITY: i32 = 50;

/// Optional configuration and teardown hooks shared by every specialization.
pub trait Configurable: Send + Sync + 'static {
    /// Default configuration values
    fn default_config(&self) -> ConfigMap {
        ConfigMap::new()
    }

    /// Field descriptors for a management surface
    fn config_schema(&self) -> Vec<ConfigField> {
        Vec::new()
    }

    /// Called after the configuration changed; the new values are already
    /// visible through `ctx`.
    fn on_config_changed(
        &self,
        _ctx: &PluginContext,
        _config: &ConfigMap,
    ) -> Result<(), PluginError> {
        Ok(())
    }

    /// Release resources. Subscriptions are removed by the manager.
    fn on_deactivate(&self, _ctx: &PluginContext) -> Result<(), PluginError> {
        Ok(())
    }
}

/// Adds analysis on every monitoring cycle.
pub trait AnalyzerPlugin: Configurable {
    fn metadata(&self) -> PluginMetadata;

    /// `data` carries `fused_state`, `activity_state`, `analysis` and `timestamp`.
    fn analyze(
        &self,
        ctx: &PluginContext,
        event: &str,
        data: &EventData,
    ) -> Result<(), PluginError>;
}

/// Delivers nudges through a custom channel (sound, chat, webhook...).
pub trait NudgePlugin: Configurable {
    fn metadata(&self) -> PluginMetadata;

    /// `data` carries `message`, `priority` and `context`.
    fn handle_nudge(
        &self,
        ctx: &PluginContext,
        event: &str,
        data: &EventData,
    ) -> Result<(), PluginError>;
}

/// Publishes the daily review somewhere else.
pub trait ReporterPlugin: Configurable {
    fn metadata(&self) -> PluginMetadata;

    /// `data` carries the full `review` payload.
    fn handle_review(
        &self,
        ctx: &PluginContext,
        event: &str,
        data: &EventData,
    ) -> Result<(), PluginError>;
}

/// One event an exporter listens to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportSubscription {
    pub event: String,
    pub priority: i32,
}

impl ExportSubscription {
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            priority: DEFAULT_PRIORITY,
        }
    }

    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

/// Syncs data to an external platform. The exporter chooses its events.
pub trait ExporterPlugin: Configurable {
    fn metadata(&self) -> PluginMetadata;

    /// Events to export, evaluated on every activation
    fn subscriptions(&self, ctx: &PluginContext) -> Vec<ExportSubscription>;

    fn export(&self, ctx: &PluginContext, event: &str, data: &EventData) -> Result<(), PluginError>;
}

/// Generates an adapter that wires a specialization to one canonical event.
macro_rules! single_event_adapter {
    (
        $(#[$doc:meta])*
        $adapter:ident, $kind:ident, $callback:ident, $plugin_type:expr, $event:expr, $priority:expr
    ) => {
        $(#[$doc])*
        pub struct $adapter<T>(Arc<T>);

        impl<T: $kind> $adapter<T> {
            pub fn new(inner: T) -> Self {
                Self(Arc::new(inner))
            }

            pub fn inner(&self) -> &T {
                &self.0
            }
        }

        impl<T: $kind + Default> Default for $adapter<T> {
            fn default() -> Self {
                Self::new(T::default())
            }
        }

        impl<T: $kind> Plugin for $adapter<T> {
            fn metadata(&self) -> PluginMetadata {
                self.0.metadata().plugin_type($plugin_type)
            }

            fn activate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
                let inner = Arc::clone(&self.0);
                let handler_ctx = ctx.clone();
                ctx.subscribe_with(
                    $event,
                    move |event, data| {
                        inner.$callback(&handler_ctx, event, data)?;
                        Ok(())
                    },
                    SubscribeOptions::default().priority($priority),
                );
                Ok(())
            }

            fn deactivate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
                self.0.on_deactivate(ctx)
            }

            fn default_config(&self) -> ConfigMap {
                self.0.default_config()
            }

            fn config_schema(&self) -> Vec<ConfigField> {
                self.0.config_schema()
            }

            fn on_config_changed(
                &mut self,
                ctx: &PluginContext,
                config: &ConfigMap,
            ) -> Result<(), PluginError> {
                self.0.on_config_changed(ctx, config)
            }
        }
    };
}

single_event_adapter!(
    /// Runs an [`AnalyzerPlugin`] on `monitor.cycle_complete` at priority 50.
    Analyzer,
    AnalyzerPlugin,
    analyze,
    PluginType::Analyzer,
    events::CYCLE_COMPLETE,
    ANALYZER_PRIORITY
);

single_event_adapter!(
    /// Runs a [`NudgePlugin`] on `nudge.triggered`.
    Nudge, NudgePlugin, handle_nudge, PluginType::Nudge, events::NUDGE_TRIGGERED, DEFAULT_PRIORITY
);

single_event_adapter!(
    /// Runs a [`ReporterPlugin`] on `review.generated`.
    Reporter,
    ReporterPlugin,
    handle_review,
    PluginType::Reporter,
    events::REVIEW_GENERATED,
    DEFAULT_PRIORITY
);

/// Runs an [`ExporterPlugin`] on the events it picks.
pub struct Exporter<T>(Arc<T>);

impl<T: ExporterPlugin> Exporter<T> {
    pub fn new(inner: T) -> Self {
        Self(Arc::new(inner))
    }

    pub fn inner(&self) -> &T {
        &self.0
    }
}

impl<T: ExporterPlugin + Default> Default for Exporter<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}

impl<T: ExporterPlugin> Plugin for Exporter<T> {
    fn metadata(&self) -> PluginMetadata {
        self.0.metadata().plugin_type(PluginType::Exporter)
    }

    fn activate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        for subscription in self.0.subscriptions(ctx) {
            let inner = Arc::clone(&self.0);
            let handler_ctx = ctx.clone();
            ctx.subscribe_with(
                &subscription.event,
                move |event, data| {
                    inner.export(&handler_ctx, event, data)?;
                    Ok(())
                },
                SubscribeOptions::default().priority(subscription.priority),
            );
        }
        Ok(())
    }

    fn deactivate(&mut self, ctx: &PluginContext) -> Result<(), PluginError> {
        self.0.on_deactivate(ctx)
    }

    fn default_config(&self) -> ConfigMap {
        self.0.default_config()
    }

    fn config_schema(&self) -> Vec<ConfigField> {
        self.0.config_schema()
    }

    fn on_config_changed(
        &mut self,
        ctx: &PluginContext,
        config: &ConfigMap,
    ) -> Result<(), PluginError> {
        self.0.on_config_changed(ctx, config)
    }
}
