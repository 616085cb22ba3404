//! Well-known event names published on the attention event bus.
//!
//! Monitoring events are produced by the attention pipeline; `plugin.*`
//! events are lifecycle notifications published by the plugin manager.

/// A monitoring cycle finished. Carries `fused_state`, raw activity and
/// analysis payloads, and a `timestamp`.
pub const CYCLE_COMPLETE: &str = "monitor.cycle_complete";
/// A screenshot was captured
pub const SCREENSHOT: &str = "monitor.screenshot";
/// Screen analysis finished
pub const ANALYSIS: &str = "monitor.analysis";

/// A nudge fired. Carries `message`, `priority` and `context`.
pub const NUDGE_TRIGGERED: &str = "nudge.triggered";
/// The user dismissed a nudge
pub const NUDGE_DISMISSED: &str = "nudge.dismissed";

pub const POMODORO_STARTED: &str = "pomodoro.started";
pub const POMODORO_COMPLETED: &str = "pomodoro.completed";
pub const POMODORO_BREAK_STARTED: &str = "pomodoro.break_started";

pub const GOAL_ADDED: &str = "goal.added";
pub const GOAL_COMPLETED: &str = "goal.completed";

pub const BRIEFING_COMPLETED: &str = "briefing.completed";
/// The daily review was generated. Carries the full `review` payload.
pub const REVIEW_GENERATED: &str = "review.generated";

/// A plugin was registered. Carries `name` and `meta`.
pub const PLUGIN_LOADED: &str = "plugin.loaded";
/// A plugin was activated. Carries `name`.
pub const PLUGIN_ACTIVATED: &str = "plugin.activated";
/// A plugin was deactivated. Carries `name`.
pub const PLUGIN_DEACTIVATED: &str = "plugin.deactivated";
/// A plugin failed to activate. Carries `name` and `error`.
pub const PLUGIN_ERROR: &str = "plugin.error";
