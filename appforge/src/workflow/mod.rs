//! The top-level stage graph
//!
//! - **engine**: runs one idea through every stage
//! - **state**: per-run state, stage order and merge functions
//! - **stages**: the text stages and checklist augmentation
//! - **strategy**: multi- vs single-artifact UI generation

pub mod engine;
pub mod stages;
pub mod state;
pub mod strategy;

pub use engine::{RunReport, WorkflowEngine};
pub use state::{DegradedStage, Stage, StageOutcome, WorkflowState};
pub use strategy::Strategy;
