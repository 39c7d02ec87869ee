//! Typed progress events and the sinks that receive them

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Write;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// Line prefix used by [`StderrSink`] so a supervising process can pick events out of stderr
pub const EVENT_PREFIX: &str = "__FORGE_EVENT__:";

/// Status of one node in the run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProgressStatus {
    Pending,
    InProgress,
    Success,
    Error,
}

impl ProgressStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ProgressStatus::Success | ProgressStatus::Error)
    }
}

/// One entry of the append-only progress stream
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub node_id: String,
    pub status: ProgressStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    pub at: DateTime<Utc>,
}

impl ProgressEvent {
    pub fn new(node_id: impl Into<String>, status: ProgressStatus) -> Self {
        Self {
            node_id: node_id.into(),
            status,
            message: None,
            parent_id: None,
            at: Utc::now(),
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_parent(mut self, parent_id: impl Into<String>) -> Self {
        self.parent_id = Some(parent_id.into());
        self
    }

    /// Render as a single prefixed JSON line
    pub fn to_wire_line(&self) -> Option<String> {
        serde_json::to_string(self)
            .ok()
            .map(|json| format!("{}{}", EVENT_PREFIX, json))
    }

    /// Parse a line produced by [`ProgressEvent::to_wire_line`]
    pub fn from_wire_line(line: &str) -> Option<Self> {
        let json = line.strip_prefix(EVENT_PREFIX)?;
        serde_json::from_str(json).ok()
    }
}

/// Receiver of progress events.
///
/// `notify` is fire-and-forget and must never block the emitting stage.
pub trait ProgressSink: Send + Sync {
    fn notify(&self, event: ProgressEvent);
}

impl<S: ProgressSink + ?Sized> ProgressSink for std::sync::Arc<S> {
    fn notify(&self, event: ProgressEvent) {
        (**self).notify(event)
    }
}

impl<S: ProgressSink + ?Sized> ProgressSink for &S {
    fn notify(&self, event: ProgressEvent) {
        (**self).notify(event)
    }
}

/// Delivers events over a single unbounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<ProgressEvent>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<ProgressEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

impl ProgressSink for ChannelSink {
    fn notify(&self, event: ProgressEvent) {
        // A dropped receiver only means nobody is watching any more
        let _ = self.tx.send(event);
    }
}

/// Writes each event to stderr as a prefixed JSON line
#[derive(Debug, Clone, Copy, Default)]
pub struct StderrSink;

impl ProgressSink for StderrSink {
    fn notify(&self, event: ProgressEvent) {
        if let Some(line) = event.to_wire_line() {
            eprintln!("{}", line);
            let _ = std::io::stderr().flush();
        }
    }
}

/// Discards every event
#[derive(Debug, Clone, Copy, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn notify(&self, _event: ProgressEvent) {}
}

/// Keeps every event in memory
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<ProgressEvent>>,
}

impl CollectingSink {
    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Events for a single node, in emission order
    pub fn events_for(&self, node_id: &str) -> Vec<ProgressEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.node_id == node_id)
            .collect()
    }
}

impl ProgressSink for CollectingSink {
    fn notify(&self, event: ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}

/// Collapse a stream by node id: the last event of each node, in first-seen order
pub fn collapse(events: &[ProgressEvent]) -> Vec<ProgressEvent> {
    let mut order: Vec<&str> = Vec::new();
    let mut latest: HashMap<&str, &ProgressEvent> = HashMap::new();

    for event in events {
        if latest.insert(event.node_id.as_str(), event).is_none() {
            order.push(event.node_id.as_str());
        }
    }

    order
        .into_iter()
        .filter_map(|id| latest.get(id).map(|e| (*e).clone()))
        .collect()
}
