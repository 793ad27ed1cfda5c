//! Model collaborator interface
//!
//! The core only talks to language models through [`ModelClient`]. A Gemini
//! HTTP implementation is provided, plus [`ScriptedModelClient`] for
//! deterministic runs.

mod google;
mod prompt;
mod scripted;

pub use google::GeminiClient;
pub use prompt::Prompt;
pub use scripted::ScriptedModelClient;

use async_trait::async_trait;
use thiserror::Error;

/// Failure reported by a model collaborator
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModelError {
    /// No answer within the allotted seconds
    #[error("model call timed out after {0}s")]
    Timeout(u64),
    /// The model or its transport reported an error
    #[error("model error: {0}")]
    Api(String),
}

/// Text generation collaborator
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Generate text for a structured prompt
    async fn generate(&self, prompt: &Prompt) -> Result<String, ModelError>;

    /// Model name for logs and stats
    fn model_name(&self) -> &str;
}
