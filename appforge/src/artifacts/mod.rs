//! UI artifact subsystem
//!
//! - **spec_resolver**: UI plan to concrete artifact specs
//! - **generator**: per-artifact generation with bounded, escalating retries
//! - **sanitize** / **validate**: the text transforms and checks applied to every attempt
//! - **references**: one-pass discovery and healing of missing pages and components
//! - **manifest**: bundle assembly and bootstrap files
//! - **pipeline**: the UI stage tying them together

pub mod generator;
pub mod manifest;
pub mod pipeline;
pub mod prompts;
pub mod references;
pub mod sanitize;
pub mod spec_resolver;
pub mod validate;

pub use generator::{BatchOutcome, ComponentGenerator, GeneratorSettings};
pub use manifest::ManifestBuilder;
pub use pipeline::{UiOutcome, UiPipeline};
pub use references::{ReferenceResolver, ScanReport};
pub use sanitize::{sanitize, SanitizeTarget};
pub use spec_resolver::resolve;
pub use validate::validate;
