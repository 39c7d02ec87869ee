//! Offline provider answering from a closure

use appforge_sdk::{
    async_trait, CancellationToken, ChatMessage, GenerationOptions, ProviderError,
    TextGenerationProvider,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

type Responder =
    dyn Fn(&[ChatMessage], &GenerationOptions, usize) -> Result<String, ProviderError>
        + Send
        + Sync;

/// Shared view of how many calls a provider has received
#[derive(Debug, Clone, Default)]
pub struct CallCounter(Arc<AtomicUsize>);

impl CallCounter {
    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

/// Provider whose replies come from a closure.
///
/// The closure receives the messages, the options and the zero-based index
/// of the call.
pub struct ScriptedProvider {
    responder: Box<Responder>,
    calls: CallCounter,
}

impl ScriptedProvider {
    pub fn new<F>(responder: F) -> Self
    where
        F: Fn(&[ChatMessage], &GenerationOptions, usize) -> Result<String, ProviderError>
            + Send
            + Sync
            + 'static,
    {
        Self {
            responder: Box::new(responder),
            calls: CallCounter::default(),
        }
    }

    /// Same reply to every call
    pub fn constant(reply: impl Into<String>) -> Self {
        let reply = reply.into();
        Self::new(move |_, _, _| Ok(reply.clone()))
    }

    pub fn counter(&self) -> CallCounter {
        self.calls.clone()
    }
}

#[async_trait]
impl TextGenerationProvider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn complete(
        &self,
        messages: &[ChatMessage],
        options: &GenerationOptions,
        cancel: &CancellationToken,
    ) -> Result<String, ProviderError> {
        if cancel.is_cancelled() {
            return Err(ProviderError::Cancelled);
        }
        let call = self.calls.0.fetch_add(1, Ordering::SeqCst);
        tokio::task::yield_now().await;
        (self.responder)(messages, options, call)
    }
}
