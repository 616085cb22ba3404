//! Listener registrations and their identifiers

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};

use crate::EventData;

/// Event name that matches every published event.
pub const WILDCARD: &str = "*";

/// Priority used when a subscriber does not choose one.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Error a handler may return; it is logged and reported, never propagated.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result returned by every handler.
pub type HandlerResult = Result<(), HandlerError>;

/// A shareable event handler, called with `(event_name, data)`.
pub type Handler = Arc<dyn Fn(&str, &EventData) -> HandlerResult + Send + Sync>;

/// Box a closure as a [`Handler`].
pub(crate) fn into_handler<F>(f: F) -> Handler
where
    F: Fn(&str, &EventData) -> HandlerResult + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Unique token identifying one subscription.
///
/// Drawn from a per-bus monotonic counter, so it doubles as the registration
/// sequence used to break priority ties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ListenerId(u64);

impl ListenerId {
    pub(crate) fn new(sequence: u64) -> Self {
        Self(sequence)
    }

    /// Registration sequence number of this listener
    pub fn sequence(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener-{}", self.0)
    }
}

/// Options for [`EventBus::subscribe`](crate::EventBus::subscribe)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubscribeOptions {
    /// Lower values run first
    pub priority: i32,
    /// Remove the listener after its first invocation
    pub once: bool,
    /// Owner tag, usually a plugin name
    pub source: String,
}

impl Default for SubscribeOptions {
    fn default() -> Self {
        Self {
            priority: DEFAULT_PRIORITY,
            once: false,
            source: String::new(),
        }
    }
}

impl SubscribeOptions {
    /// Builder: set the priority
    pub fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Builder: fire only once
    pub fn once(mut self) -> Self {
        self.once = true;
        self
    }

    /// Builder: tag the listener with its owner
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }
}

/// Introspection view of a listener. Never exposes the handler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListenerInfo {
    pub id: ListenerId,
    pub event: String,
    pub source: String,
    pub priority: i32,
    pub once: bool,
}

/// A registered listener as stored in the bus.
#[derive(Clone)]
pub(crate) struct ListenerEntry {
    pub(crate) id: ListenerId,
    pub(crate) event: String,
    pub(crate) handler: Handler,
    pub(crate) priority: i32,
    pub(crate) once: bool,
    pub(crate) source: String,
    /// Shared by every snapshot of this entry so a `once` listener fires at
    /// most one time even when two publishes race.
    fired: Arc<AtomicBool>,
}

impl ListenerEntry {
    pub(crate) fn new(
        id: ListenerId,
        event: String,
        handler: Handler,
        options: SubscribeOptions,
    ) -> Self {
        Self {
            id,
            event,
            handler,
            priority: options.priority,
            once: options.once,
            source: options.source,
            fired: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Dispatch order key: priority first, registration sequence second
    pub(crate) fn sort_key(&self) -> (i32, ListenerId) {
        (self.priority, self.id)
    }

    /// Returns true if this publish may invoke the listener.
    pub(crate) fn claim(&self) -> bool {
        !self.once || !self.fired.swap(true, Ordering::AcqRel)
    }

    pub(crate) fn info(&self) -> ListenerInfo {
        ListenerInfo {
            id: self.id,
            event: self.event.clone(),
            source: self.source.clone(),
            priority: self.priority,
            once: self.once,
        }
    }
}

impl fmt::Debug for ListenerEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerEntry")
            .field("id", &self.id)
            .field("event", &self.event)
            .field("priority", &self.priority)
            .field("once", &self.once)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}
