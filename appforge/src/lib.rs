//! Idea-to-application generation engine.
//!
//! A run takes a short project idea through a stage graph (idea, requirements,
//! checklist/notes/UI plan in parallel, strategy, UI generation, checklist
//! augmentation, persistence) and produces a [`types::Bundle`] of browser
//! components that reference each other only through a runtime lookup.

pub mod artifacts;
pub mod config;
pub mod error;
pub mod logging;
pub mod provider;
pub mod store;
pub mod types;
pub mod workflow;
pub mod workflow_utils;

pub use config::{ForgeConfig, ProviderConfig};
pub use error::{FatalWorkflowError, GenerateError, ManifestError, StoreError};
pub use store::{FsStore, MemoryStore, PersistenceStore};
pub use types::Bundle;
pub use workflow::{RunReport, WorkflowEngine};
