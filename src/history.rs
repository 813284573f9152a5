//! Per bridge request history for diagnostics.

use std::collections::{BTreeSet, VecDeque};
use std::time::Instant;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kind of a recorded exchange step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    Request,
    Response,
    /// The exchange failed; the message is the error text.
    Error,
}

/// A recorded step of an exchange with a bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub msg_type: MessageType,
    /// Verb and path, e.g. `PUT /lights/1/state`
    pub endpoint: String,
    pub message: Value,
    /// Seconds since history creation
    pub timestamp: f64,
}

/// Bounded log of the exchanges with one bridge.
///
/// Only the newest `max_entries` steps are kept; the error count and the
/// last error survive eviction.
#[derive(Debug, Clone)]
pub struct MessageHistory {
    entries: VecDeque<HistoryEntry>,
    max_entries: usize,
    error_count: usize,
    last_error: Option<String>,
    start_time: Instant,
}

impl Default for MessageHistory {
    fn default() -> Self {
        Self::new()
    }
}

impl MessageHistory {
    pub const DEFAULT_MAX_ENTRIES: usize = 100;

    pub fn new() -> Self {
        Self::with_max_entries(Self::DEFAULT_MAX_ENTRIES)
    }

    pub fn with_max_entries(max_entries: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(max_entries.min(Self::DEFAULT_MAX_ENTRIES)),
            max_entries,
            error_count: 0,
            last_error: None,
            start_time: Instant::now(),
        }
    }

    pub fn record(&mut self, msg_type: MessageType, endpoint: &str, message: &Value) {
        self.push(msg_type, endpoint, message.clone());
    }

    pub fn record_error(&mut self, endpoint: &str, error: &str) {
        self.error_count += 1;
        self.last_error = Some(format!("{endpoint}: {error}"));
        self.push(MessageType::Error, endpoint, Value::String(error.to_string()));
    }

    fn push(&mut self, msg_type: MessageType, endpoint: &str, message: Value) {
        if self.max_entries == 0 {
            return;
        }
        if self.entries.len() == self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(HistoryEntry {
            msg_type,
            endpoint: endpoint.to_string(),
            message,
            timestamp: self.start_time.elapsed().as_secs_f64(),
        });
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    /// The newest retained step of `msg_type` on `endpoint`.
    pub fn last(&self, msg_type: MessageType, endpoint: &str) -> Option<&HistoryEntry> {
        self.entries
            .iter()
            .rev()
            .find(|entry| entry.msg_type == msg_type && entry.endpoint == endpoint)
    }

    /// Retained steps, oldest first.
    pub fn entries(&self) -> impl DoubleEndedIterator<Item = &HistoryEntry> {
        self.entries.iter()
    }

    pub fn summary(&self) -> HistorySummary {
        let endpoints: BTreeSet<&str> = self.entries.iter().map(|e| e.endpoint.as_str()).collect();
        HistorySummary {
            endpoints: endpoints.into_iter().map(String::from).collect(),
            retained: self.entries.len(),
            error_count: self.error_count,
            last_error: self.last_error.clone(),
        }
    }
}

/// Summary of message history for diagnostics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistorySummary {
    /// Distinct endpoints among the retained steps, sorted.
    pub endpoints: Vec<String>,
    pub retained: usize,
    pub error_count: usize,
    pub last_error: Option<String>,
}
