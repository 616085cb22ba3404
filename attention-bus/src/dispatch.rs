//! Handler invocation with fault isolation

use std::any::Any;
use std::panic::{AssertUnwindSafe, catch_unwind};

use crate::EventData;
use crate::listener::{ListenerEntry, ListenerId};

/// What happened when a single handler was invoked
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HandlerOutcome {
    /// Handler returned `Ok`
    Completed,
    /// Handler returned an error
    Failed(String),
    /// Handler panicked; the panic was contained
    Panicked(String),
}

impl HandlerOutcome {
    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

/// Outcome of one listener within a publish call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListenerOutcome {
    pub id: ListenerId,
    pub source: String,
    pub priority: i32,
    pub outcome: HandlerOutcome,
}

/// Result of a [`EventBus::publish`](crate::EventBus::publish) call, in dispatch order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchReport {
    pub event: String,
    pub outcomes: Vec<ListenerOutcome>,
}

impl DispatchReport {
    pub(crate) fn new(event: &str) -> Self {
        Self {
            event: event.to_string(),
            outcomes: Vec::new(),
        }
    }

    /// Number of handlers that were called
    pub fn invoked(&self) -> usize {
        self.outcomes.len()
    }

    /// Listeners whose handler failed or panicked
    pub fn failures(&self) -> impl Iterator<Item = &ListenerOutcome> {
        self.outcomes.iter().filter(|o| !o.outcome.is_completed())
    }

    /// True when every invoked handler completed
    pub fn is_clean(&self) -> bool {
        self.failures().next().is_none()
    }
}

/// Call one handler, containing both returned errors and panics.
pub(crate) fn invoke(entry: &ListenerEntry, event: &str, data: &EventData) -> ListenerOutcome {
    let result = catch_unwind(AssertUnwindSafe(|| (entry.handler)(event, data)));

    let outcome = match result {
        Ok(Ok(())) => HandlerOutcome::Completed,
        Ok(Err(e)) => {
            tracing::error!(
                event = %event,
                source = %entry.source,
                listener = %entry.id,
                error = %e,
                "Event handler failed"
            );
            HandlerOutcome::Failed(e.to_string())
        }
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            tracing::error!(
                event = %event,
                source = %entry.source,
                listener = %entry.id,
                panic = %message,
                "Event handler panicked"
            );
            HandlerOutcome::Panicked(message)
        }
    };

    ListenerOutcome {
        id: entry.id,
        source: entry.source.clone(),
        priority: entry.priority,
        outcome,
    }
}

pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "handler panicked".to_string()
    }
}
