//! Stage execution with automatic progress reporting

use appforge_sdk::{ProgressEvent, ProgressSink, ProgressStatus};
use std::fmt::Display;
use std::future::Future;

/// Execute a single node with automatic progress events
///
/// Wraps execution with:
/// - `in-progress` before execution
/// - `success` with the executor's summary on success
/// - `error` with the error text on failure
///
/// # Arguments
/// - `sink`: where events go
/// - `node_id`: identifier of this node in the progress stream
/// - `parent`: optional parent node
/// - `executor`: async function returning `(result, summary_message)`
pub async fn execute_task<F, Fut, R, E>(
    sink: &dyn ProgressSink,
    node_id: &str,
    parent: Option<&str>,
    executor: F,
) -> Result<R, E>
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<(R, String), E>>,
    E: Display,
{
    sink.notify(event(node_id, parent, ProgressStatus::InProgress, None));

    match executor().await {
        Ok((result, summary)) => {
            sink.notify(event(node_id, parent, ProgressStatus::Success, Some(summary)));
            Ok(result)
        }
        Err(e) => {
            sink.notify(event(node_id, parent, ProgressStatus::Error, Some(e.to_string())));
            Err(e)
        }
    }
}

/// Build an event with an optional parent and message
pub fn event(
    node_id: &str,
    parent: Option<&str>,
    status: ProgressStatus,
    message: Option<String>,
) -> ProgressEvent {
    let mut event = ProgressEvent::new(node_id, status);
    event.parent_id = parent.map(str::to_string);
    event.message = message;
    event
}
