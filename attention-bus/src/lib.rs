//! attention-bus - synchronous publish/subscribe for attention
//!
//! Every part of attention talks through one [`EventBus`]: the monitoring
//! loop publishes `monitor.cycle_complete`, the nudge engine publishes
//! `nudge.triggered`, and plugins subscribe to whatever they care about.
//!
//! - Listeners run in `(priority, registration order)` order, lower priority first
//! - A listener on [`WILDCARD`] receives every event
//! - `once` listeners are removed after their first invocation
//! - A failing or panicking listener never stops the rest of the dispatch
//! - The last [`HISTORY_CAPACITY`] published events are kept for introspection
//!
//! # Example
//!
//! ```
//! use attention_bus::{EventBus, SubscribeOptions, to_event_data};
//! use serde_json::json;
//!
//! let bus = EventBus::new();
//! bus.subscribe(
//!     "nudge.triggered",
//!     |_event, data| {
//!         println!("nudge: {:?}", data.get("message"));
//!         Ok(())
//!     },
//!     SubscribeOptions::default().source("sound-nudge"),
//! );
//!
//! let report = bus.publish("nudge.triggered", to_event_data(json!({"message": "Back to work"})));
//! assert_eq!(report.invoked(), 1);
//! ```

mod bus;
mod dispatch;
mod history;
mod listener;

pub use bus::EventBus;
pub use dispatch::{DispatchReport, HandlerOutcome, ListenerOutcome};
pub use history::{EventRecord, HISTORY_CAPACITY};
pub use listener::{
    DEFAULT_PRIORITY, Handler, HandlerError, HandlerResult, ListenerId, ListenerInfo,
    SubscribeOptions, WILDCARD,
};

/// Payload carried by every event: a JSON object.
pub type EventData = serde_json::Map<String, serde_json::Value>;

/// Convert a JSON value into an event payload.
///
/// Objects are used as-is, `null` becomes an empty payload, and any other
/// value is wrapped under a `"value"` key.
pub fn to_event_data(value: serde_json::Value) -> EventData {
    match value {
        serde_json::Value::Object(map) => map,
        serde_json::Value::Null => EventData::new(),
        other => {
            let mut map = EventData::new();
            map.insert("value".to_string(), other);
            map
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_to_event_data_object() {
        let data = to_event_data(json!({"a": 1, "b": "x"}));
        assert_eq!(data.len(), 2);
        assert_eq!(data["a"], json!(1));
    }

    #[test]
    fn test_to_event_data_null_is_empty() {
        assert!(to_event_data(serde_json::Value::Null).is_empty());
    }

    #[test]
    fn test_to_event_data_wraps_scalars() {
        let data = to_event_data(json!(42));
        assert_eq!(data["value"], json!(42));
    }
}
