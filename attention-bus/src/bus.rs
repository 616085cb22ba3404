//! EventBus - in-process synchronous dispatcher

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;

use crate::EventData;
use crate::dispatch::{self, DispatchReport};
use crate::history::{EventHistory, EventRecord, HISTORY_CAPACITY};
use crate::listener::{
    Handler, HandlerResult, ListenerEntry, ListenerId, ListenerInfo, SubscribeOptions, WILDCARD,
    into_handler,
};

/// Thread-safe synchronous event bus.
///
/// The listener table sits behind a single mutex that is only held to mutate
/// it or to take a snapshot. Handlers always run outside the lock, on the
/// thread that called [`publish`](Self::publish), so a handler may freely
/// subscribe, unsubscribe or publish without deadlocking.
///
/// Within one `publish` call the order is fully deterministic: ascending
/// priority, then registration order. Publishes from different threads
/// interleave arbitrarily.
pub struct EventBus {
    /// Listeners per event name, each vector kept sorted by dispatch order
    listeners: Mutex<BTreeMap<String, Vec<ListenerEntry>>>,
    history: Mutex<EventHistory>,
    next_id: AtomicU64,
}

impl EventBus {
    /// Create a bus that keeps the last [`HISTORY_CAPACITY`] events
    pub fn new() -> Self {
        Self::with_history_capacity(HISTORY_CAPACITY)
    }

    /// Create a bus with a custom history size (0 disables history)
    pub fn with_history_capacity(capacity: usize) -> Self {
        Self {
            listeners: Mutex::new(BTreeMap::new()),
            history: Mutex::new(EventHistory::new(capacity)),
            next_id: AtomicU64::new(1),
        }
    }

    /// Register a handler for `event` (any string, including [`WILDCARD`]).
    pub fn subscribe<F>(
        &self,
        event: impl Into<String>,
        handler: F,
        options: SubscribeOptions,
    ) -> ListenerId
    where
        F: Fn(&str, &EventData) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe_handler(event, into_handler(handler), options)
    }

    /// Register an already shared [`Handler`].
    pub fn subscribe_handler(
        &self,
        event: impl Into<String>,
        handler: Handler,
        options: SubscribeOptions,
    ) -> ListenerId {
        let event = event.into();
        let id = ListenerId::new(self.next_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            event = %event,
            source = %options.source,
            priority = options.priority,
            once = options.once,
            listener = %id,
            "Listener registered"
        );

        let entry = ListenerEntry::new(id, event.clone(), handler, options);
        let key = entry.sort_key();

        let mut listeners = self.listeners.lock();
        let entries = listeners.entry(event).or_default();
        let at = entries.partition_point(|e| e.sort_key() < key);
        entries.insert(at, entry);

        id
    }

    /// Register a handler with default options.
    pub fn on<F>(&self, event: impl Into<String>, handler: F) -> ListenerId
    where
        F: Fn(&str, &EventData) -> HandlerResult + Send + Sync + 'static,
    {
        self.subscribe(event, handler, SubscribeOptions::default())
    }

    /// Remove listeners registered under `event`.
    ///
    /// - `listener` given: remove that listener
    /// - else `source` given: remove every listener of `event` tagged with it
    /// - else: remove every listener of `event`
    ///
    /// When both filters are given the listener filter wins and `source` is
    /// ignored. Returns the number of listeners removed.
    pub fn unsubscribe(
        &self,
        event: &str,
        listener: Option<ListenerId>,
        source: Option<&str>,
    ) -> usize {
        let mut listeners = self.listeners.lock();
        let Some(entries) = listeners.get_mut(event) else {
            return 0;
        };

        let before = entries.len();
        match (listener, source) {
            (Some(id), _) => entries.retain(|e| e.id != id),
            (None, Some(source)) => entries.retain(|e| e.source != source),
            (None, None) => entries.clear(),
        }
        let removed = before - entries.len();

        if entries.is_empty() {
            listeners.remove(event);
        }
        drop(listeners);

        if removed > 0 {
            tracing::debug!(event = %event, removed = removed, "Listeners removed");
        }
        removed
    }

    /// Remove every listener tagged with `source`, across all events.
    pub fn unsubscribe_all(&self, source: &str) -> usize {
        let mut listeners = self.listeners.lock();
        let mut removed = 0;
        for entries in listeners.values_mut() {
            let before = entries.len();
            entries.retain(|e| e.source != source);
            removed += before - entries.len();
        }
        listeners.retain(|_, entries| !entries.is_empty());
        drop(listeners);

        if removed > 0 {
            tracing::info!(source = %source, removed = removed, "Removed all listeners for source");
        }
        removed
    }

    /// Publish `event` to its listeners and to wildcard listeners.
    ///
    /// Handler errors and panics are contained, logged with the listener's
    /// source tag, and reported in the returned [`DispatchReport`]; they never
    /// reach the caller and never stop the remaining listeners.
    pub fn publish(&self, event: &str, data: EventData) -> DispatchReport {
        self.history.lock().record(event, &data);

        let snapshot = self.snapshot(event);
        let mut report = DispatchReport::new(event);
        let mut fired = HashSet::new();

        for entry in &snapshot {
            if !entry.claim() {
                continue;
            }
            report.outcomes.push(dispatch::invoke(entry, event, &data));
            if entry.once {
                fired.insert(entry.id);
            }
        }

        if !fired.is_empty() {
            self.remove_fired(event, &fired);
        }

        report
    }

    /// Point-in-time copy of the listeners for `event` plus wildcard
    /// listeners, merged into dispatch order.
    fn snapshot(&self, event: &str) -> Vec<ListenerEntry> {
        let listeners = self.listeners.lock();
        let mut merged: Vec<ListenerEntry> = listeners
            .get(event)
            .into_iter()
            .flatten()
            .cloned()
            .collect();
        if event != WILDCARD {
            merged.extend(listeners.get(WILDCARD).into_iter().flatten().cloned());
        }
        drop(listeners);

        merged.sort_by_key(ListenerEntry::sort_key);
        merged
    }

    /// Drop fired `once` listeners by id. Idempotent.
    fn remove_fired(&self, event: &str, fired: &HashSet<ListenerId>) {
        let mut listeners = self.listeners.lock();
        for key in [event, WILDCARD] {
            if let Some(entries) = listeners.get_mut(key) {
                entries.retain(|e| !fired.contains(&e.id));
                if entries.is_empty() {
                    listeners.remove(key);
                }
            }
        }
    }

    /// The most recent `limit` events, newest last.
    pub fn history(&self, limit: usize) -> Vec<EventRecord> {
        self.history.lock().recent(limit)
    }

    /// Forget all recorded events
    pub fn clear_history(&self) {
        self.history.lock().clear();
    }

    /// Listener metadata for one event, or for all events when `None`.
    ///
    /// Entries come back in dispatch order per event, events sorted by name.
    pub fn listeners(&self, event: Option<&str>) -> Vec<ListenerInfo> {
        let listeners = self.listeners.lock();
        match event {
            Some(event) => listeners
                .get(event)
                .into_iter()
                .flatten()
                .map(ListenerEntry::info)
                .collect(),
            None => listeners
                .values()
                .flatten()
                .map(ListenerEntry::info)
                .collect(),
        }
    }

    /// Total number of registered listeners
    pub fn listener_count(&self) -> usize {
        self.listeners.lock().values().map(Vec::len).sum()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("listeners", &self.listener_count())
            .field("history", &self.history.lock().len())
            .finish()
    }
}
