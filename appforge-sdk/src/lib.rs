//! Boundary contracts shared by the appforge engine and its consumers.
//!
//! - **progress**: typed [`ProgressEvent`]s and the sinks that receive them
//! - **provider**: the [`TextGenerationProvider`] capability and its chat message types
//! - **run ids**: [`RunId`], the primary key of a persisted run

pub mod progress;
pub mod provider;

pub use progress::{
    collapse, ChannelSink, CollectingSink, NullSink, ProgressEvent, ProgressSink, ProgressStatus,
    StderrSink,
};
pub use provider::{
    ChatMessage, ChatTurn, GenerationOptions, ProviderError, Role, TextGenerationProvider,
};

// Re-exported so implementors do not need their own copies
pub use async_trait::async_trait;
pub use tokio_util::sync::CancellationToken;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Identifier of one workflow run (and of the project it persists)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RunId(Uuid);

impl RunId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for RunId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

// ============================================================================
// Progress Macros
// ============================================================================
// Thin wrappers that build a ProgressEvent and hand it to a sink. The optional
// `parent = ...` argument attaches the event to a parent node.
// ============================================================================

/// Emits a `pending` event.
///
/// ```
/// use appforge_sdk::{progress_pending, CollectingSink};
/// let sink = CollectingSink::default();
/// progress_pending!(sink, "generate_ui");
/// progress_pending!(sink, "artifact:Card", parent = "generate_ui");
/// assert_eq!(sink.events().len(), 2);
/// ```
#[macro_export]
macro_rules! progress_pending {
    ($sink:expr, $node:expr $(, parent = $parent:expr)?) => {{
        let event = $crate::ProgressEvent::new($node, $crate::ProgressStatus::Pending);
        $( let event = event.with_parent($parent); )?
        $crate::ProgressSink::notify(&$sink, event);
    }};
}

/// Emits an `in-progress` event.
#[macro_export]
macro_rules! progress_start {
    ($sink:expr, $node:expr $(, parent = $parent:expr)?) => {{
        let event = $crate::ProgressEvent::new($node, $crate::ProgressStatus::InProgress);
        $( let event = event.with_parent($parent); )?
        $crate::ProgressSink::notify(&$sink, event);
    }};
    ($sink:expr, $node:expr, $msg:expr $(, parent = $parent:expr)?) => {{
        let event = $crate::ProgressEvent::new($node, $crate::ProgressStatus::InProgress)
            .with_message($msg);
        $( let event = event.with_parent($parent); )?
        $crate::ProgressSink::notify(&$sink, event);
    }};
}

/// Emits a `success` event with a summary message.
#[macro_export]
macro_rules! progress_success {
    ($sink:expr, $node:expr, $msg:expr $(, parent = $parent:expr)?) => {{
        let event = $crate::ProgressEvent::new($node, $crate::ProgressStatus::Success)
            .with_message($msg);
        $( let event = event.with_parent($parent); )?
        $crate::ProgressSink::notify(&$sink, event);
    }};
}

/// Emits an `error` event with the failure reason.
#[macro_export]
macro_rules! progress_error {
    ($sink:expr, $node:expr, $msg:expr $(, parent = $parent:expr)?) => {{
        let event = $crate::ProgressEvent::new($node, $crate::ProgressStatus::Error)
            .with_message($msg);
        $( let event = event.with_parent($parent); )?
        $crate::ProgressSink::notify(&$sink, event);
    }};
}
