//! Bounded record of recently published events

use std::collections::VecDeque;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::EventData;

/// Number of events kept by default.
pub const HISTORY_CAPACITY: usize = 100;

/// One published event, without its payload values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Event name as published
    pub event: String,
    /// When `publish` was called
    pub timestamp: DateTime<Utc>,
    /// Field names present in the payload
    pub data_keys: Vec<String>,
}

/// FIFO ring of [`EventRecord`]s
#[derive(Debug)]
pub(crate) struct EventHistory {
    records: VecDeque<EventRecord>,
    capacity: usize,
}

impl EventHistory {
    pub(crate) fn new(capacity: usize) -> Self {
        Self {
            records: VecDeque::with_capacity(capacity),
            capacity,
        }
    }

    pub(crate) fn record(&mut self, event: &str, data: &EventData) {
        if self.capacity == 0 {
            return;
        }
        while self.records.len() >= self.capacity {
            self.records.pop_front();
        }
        self.records.push_back(EventRecord {
            event: event.to_string(),
            timestamp: Utc::now(),
            data_keys: data.keys().cloned().collect(),
        });
    }

    /// The newest `limit` records, oldest first.
    pub(crate) fn recent(&self, limit: usize) -> Vec<EventRecord> {
        let skip = self.records.len().saturating_sub(limit);
        self.records.iter().skip(skip).cloned().collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.records.len()
    }

    pub(crate) fn clear(&mut self) {
        self.records.clear();
    }
}
