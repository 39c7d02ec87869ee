//! Workflow utilities shared by the stages
//!
//! - **batch**: bounded parallel execution that waits for every item
//! - **task**: node execution with progress events
//! - **structured**: extraction and parsing of YAML/JSON model output

pub mod batch;
pub mod structured;
pub mod task;

pub use batch::{execute_batch, TaskContext};
pub use structured::{extract_block, parse_structured};
pub use task::execute_task;
