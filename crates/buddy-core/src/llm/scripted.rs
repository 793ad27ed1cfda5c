//! Deterministic model client for tests and offline runs

use super::{ModelClient, ModelError, Prompt};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

type Handler = dyn Fn(&Prompt) -> Result<String, ModelError> + Send + Sync;

/// Model client answering from a queue of scripted replies
///
/// Queued replies are consumed first; once the queue is empty the optional
/// handler answers. Without either, every call fails with `ModelError::Api`.
pub struct ScriptedModelClient {
    replies: Mutex<VecDeque<Result<String, ModelError>>>,
    handler: Option<Arc<Handler>>,
    latency: Option<Duration>,
    prompts: Mutex<Vec<Prompt>>,
    calls: AtomicUsize,
}

impl Default for ScriptedModelClient {
    fn default() -> Self {
        Self::new()
    }
}

impl ScriptedModelClient {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            handler: None,
            latency: None,
            prompts: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Answer every call by applying `handler` to the prompt
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&Prompt) -> Result<String, ModelError> + Send + Sync + 'static,
    {
        Self {
            handler: Some(Arc::new(handler)),
            ..Self::new()
        }
    }

    /// Always answer with the same text
    pub fn always(text: impl Into<String>) -> Self {
        let text = text.into();
        Self::with_handler(move |_| Ok(text.clone()))
    }

    /// Always fail with the given error
    pub fn failing(error: ModelError) -> Self {
        Self::with_handler(move |_| Err(error.clone()))
    }

    /// Sleep before answering each call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Queue a successful reply
    pub fn push_reply(&self, text: impl Into<String>) -> &Self {
        self.replies.lock().push_back(Ok(text.into()));
        self
    }

    /// Queue a failure
    pub fn push_error(&self, error: ModelError) -> &Self {
        self.replies.lock().push_back(Err(error));
        self
    }

    /// Number of `generate` calls so far
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Prompts received, in call order
    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.lock().clone()
    }
}

#[async_trait]
impl ModelClient for ScriptedModelClient {
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().push(prompt.clone());

        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }

        let queued = self.replies.lock().pop_front();
        match (queued, &self.handler) {
            (Some(reply), _) => reply,
            (None, Some(handler)) => handler(prompt),
            (None, None) => Err(ModelError::Api("no scripted reply left".to_string())),
        }
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}
