//! Runtime wiring shared by the HTTP server and CLI commands
//!
//! Every component is owned here and handed out as an `Arc`; nothing lives in
//! a global.

use crate::cache::ResponseCache;
use crate::config::Config;
use crate::error::BuddyResult;
use crate::events::UpdateBroadcaster;
use crate::llm::{GeminiClient, ModelClient};
use crate::qa::QaService;
use crate::session::SessionStore;
use crate::workflow::{ProjectFileWriter, WorkflowEngine};
use std::sync::Arc;
use tracing::info;

/// Fully wired set of services
#[derive(Clone)]
pub struct BuddyRuntime {
    config: Arc<Config>,
    broadcaster: Arc<UpdateBroadcaster>,
    store: Arc<SessionStore>,
    cache: Arc<ResponseCache>,
    writer: Arc<ProjectFileWriter>,
    qa: Arc<QaService>,
    engine: Arc<WorkflowEngine>,
}

impl BuddyRuntime {
    /// Wire every component around `model`
    pub async fn build(config: Config, model: Arc<dyn ModelClient>) -> BuddyResult<Self> {
        config.validate()?;

        let broadcaster = UpdateBroadcaster::new(config.events.subscriber_capacity);
        let store = Arc::new(SessionStore::new(broadcaster.clone()));
        let cache = Arc::new(ResponseCache::open(&config.cache).await);
        let writer = Arc::new(ProjectFileWriter::new(&config.workflow.output_dir));

        let qa = Arc::new(QaService::new(
            store.clone(),
            cache.clone(),
            model.clone(),
            config.qa.clone(),
        ));
        let engine = Arc::new(WorkflowEngine::new(
            store.clone(),
            model.clone(),
            writer.clone(),
            &config.workflow,
        ));

        info!(
            "Runtime ready: model {}, output {}, cache {}",
            model.model_name(),
            config.workflow.output_dir.display(),
            if cache.is_degraded() { "memory-only" } else { "two-tier" }
        );

        Ok(Self {
            config: Arc::new(config),
            broadcaster,
            store,
            cache,
            writer,
            qa,
            engine,
        })
    }

    /// Wire the runtime against the configured Gemini model
    pub async fn from_config(config: Config) -> BuddyResult<Self> {
        let model = Arc::new(GeminiClient::new(&config.model)?);
        Self::build(config, model).await
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn broadcaster(&self) -> &Arc<UpdateBroadcaster> {
        &self.broadcaster
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    pub fn writer(&self) -> &Arc<ProjectFileWriter> {
        &self.writer
    }

    pub fn qa(&self) -> &Arc<QaService> {
        &self.qa
    }

    pub fn engine(&self) -> &Arc<WorkflowEngine> {
        &self.engine
    }
}
