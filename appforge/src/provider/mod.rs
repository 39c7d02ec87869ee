//! Text generation backends
//!
//! - **http**: OpenAI-compatible, Anthropic and local endpoints over HTTP
//! - **scripted**: answers from a closure, for offline runs and tests

pub mod http;
pub mod scripted;

pub use http::HttpProvider;
pub use scripted::{CallCounter, ScriptedProvider};
