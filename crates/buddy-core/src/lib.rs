//! Coder Buddy core library
//!
//! Session tracking, the Plan -> Architect -> Code workflow, the cached Q&A
//! service and the update broadcaster that feeds dashboards.

pub mod cache;
pub mod config;
pub mod error;
pub mod events;
pub mod llm;
pub mod qa;
pub mod runtime;
pub mod session;
pub mod workflow;

// Re-export commonly used types
pub use cache::{CacheConfig, CacheEntry, CacheStatistics, PutOutcome, ResponseCache};
pub use config::{Config, ConfigLoader, load_config};
pub use error::{BuddyError, BuddyResult, UnifiedError};
pub use events::{Subscription, UpdateBroadcaster, UpdateFilter};
pub use llm::{GeminiClient, ModelClient, ModelError, Prompt, ScriptedModelClient};
pub use qa::{QaAnswer, QaService, QaStatistics};
pub use runtime::BuddyRuntime;
pub use session::{
    Session, SessionId, SessionKind, SessionStore, SessionSummary, SessionUpdate, Status, Step,
    StepId, UpdateKind,
};
pub use workflow::{FileWriter, ProjectFileWriter, WorkflowEngine};
