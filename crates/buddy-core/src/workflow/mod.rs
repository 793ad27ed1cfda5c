//! Plan -> Architect -> Code pipeline
//!
//! [`WorkflowEngine::run`] records one `pipeline` session and runs each stage
//! as a step, strictly in order. The first failing stage ends the step and the
//! session as `error`; later stages are never appended. Files written before a
//! failure stay in place.

pub mod plan;
mod stages;
mod writer;

pub use plan::{ImplementationTask, PlannedFile, ProjectPlan, ProjectTemplate, TaskPlan};
pub use stages::{ArchitectAgent, CoderAgent, PlannerAgent, StageAgent, StageContext};
pub use writer::{FileWriter, GeneratedFile, ProjectFileWriter};

#[cfg(test)]
pub use writer::MockFileWriter;

use crate::config::WorkflowConfig;
use crate::error::{BuddyError, BuddyResult};
use crate::llm::ModelClient;
use crate::session::{Session, SessionId, SessionKind, SessionStore, Status};
use std::sync::Arc;
use tracing::{info, warn};

/// Sequential stage runner
pub struct WorkflowEngine {
    store: Arc<SessionStore>,
    writer: Arc<dyn FileWriter>,
    stages: Vec<Arc<dyn StageAgent>>,
}

impl WorkflowEngine {
    /// Engine with the standard planner, architect and coder stages
    pub fn new(
        store: Arc<SessionStore>,
        model: Arc<dyn ModelClient>,
        writer: Arc<dyn FileWriter>,
        config: &WorkflowConfig,
    ) -> Self {
        let stages: Vec<Arc<dyn StageAgent>> = vec![
            Arc::new(PlannerAgent::new(
                model.clone(),
                config.use_templates,
                config.stage_timeout,
            )),
            Arc::new(ArchitectAgent::new(model.clone(), config.stage_timeout)),
            Arc::new(CoderAgent::new(model, writer.clone(), config.stage_timeout)),
        ];
        Self::with_stages(store, writer, stages)
    }

    /// Engine over a custom stage list
    pub fn with_stages(
        store: Arc<SessionStore>,
        writer: Arc<dyn FileWriter>,
        stages: Vec<Arc<dyn StageAgent>>,
    ) -> Self {
        Self {
            store,
            writer,
            stages,
        }
    }

    /// Names of the configured stages, in order
    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|s| s.name()).collect()
    }

    /// Create the pending session for a request
    pub fn begin(&self, input: &str) -> BuddyResult<SessionId> {
        let input = input.trim();
        if input.is_empty() {
            return Err(BuddyError::invalid_field("prompt", "prompt is empty"));
        }
        Ok(self.store.create(SessionKind::Pipeline, input))
    }

    /// Run all stages for a session created by [`begin`](Self::begin)
    ///
    /// Stage failures are recorded on the session and reflected in the
    /// returned snapshot; `Err` means the session itself could not be driven.
    pub async fn execute(&self, session_id: SessionId) -> BuddyResult<Session> {
        let input = self.store.get(&session_id)?.input;

        if let Err(e) = self.writer.prepare().await {
            warn!("Output directory unavailable for {}: {}", session_id, e);
            return self.store.transition(
                &session_id,
                None,
                Status::Error,
                Some(e.in_stage("prepare").to_string()),
            );
        }

        self.store
            .transition(&session_id, None, Status::Running, None)?;
        let mut context = StageContext::new(session_id, input);

        for stage in &self.stages {
            let step_id = self
                .store
                .append_step(&session_id, stage.name(), stage.label())?;
            self.store
                .transition(&session_id, Some(step_id), Status::Running, None)?;

            match stage.execute(&mut context).await {
                Ok(summary) => {
                    self.store
                        .complete_step(&session_id, step_id, Some(summary))?;
                }
                Err(e) => {
                    let message = e.to_string();
                    warn!("Stage {} failed for {}: {}", stage.name(), session_id, message);
                    self.store.transition(
                        &session_id,
                        Some(step_id),
                        Status::Error,
                        Some(message.clone()),
                    )?;
                    return self.store.transition(
                        &session_id,
                        None,
                        Status::Error,
                        Some(format!("{} stage failed: {}", stage.name(), message)),
                    );
                }
            }
        }

        info!(
            "Pipeline {} completed, {} files written",
            session_id,
            context.written.len()
        );
        self.store
            .transition(&session_id, None, Status::Completed, None)
    }

    /// Create a session for `input` and drive it to a terminal status
    pub async fn run(&self, input: &str) -> BuddyResult<SessionId> {
        let session_id = self.begin(input)?;
        self.execute(session_id).await?;
        Ok(session_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::UpdateBroadcaster;
    use crate::llm::{ModelError, Prompt, ScriptedModelClient};
    use mockall::predicate::*;
    use std::path::{Path, PathBuf};
    use std::time::Duration;

    fn store() -> Arc<SessionStore> {
        Arc::new(SessionStore::new(UpdateBroadcaster::new(128)))
    }

    fn config() -> WorkflowConfig {
        WorkflowConfig {
            output_dir: PathBuf::from("unused"),
            use_templates: true,
            stage_timeout: Duration::from_millis(500),
        }
    }

    /// Architect replies with JSON, coder replies with fenced code
    fn project_model() -> ScriptedModelClient {
        ScriptedModelClient::with_handler(|prompt: &Prompt| {
            if prompt.user.contains("implementation task") {
                Ok(r#"{"index.html": "Build the markup"}"#.to_string())
            } else {
                Ok("```\n// generated\n```".to_string())
            }
        })
    }

    fn accepting_writer() -> MockFileWriter {
        let mut writer = MockFileWriter::new();
        writer.expect_prepare().returning(|| Ok(()));
        writer
            .expect_write()
            .returning(|path: &Path, _| Ok(path.to_path_buf()));
        writer
    }

    #[tokio::test]
    async fn test_todo_app_runs_three_completed_steps() {
        let store = store();
        let mut writer = MockFileWriter::new();
        writer.expect_prepare().times(1).returning(|| Ok(()));
        writer
            .expect_write()
            .with(always(), eq("// generated"))
            .times(3)
            .returning(|path: &Path, _| Ok(path.to_path_buf()));

        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(project_model()),
            Arc::new(writer),
            &config(),
        );
        let id = engine.run("Build a todo app").await.unwrap();

        let session = store.get(&id).unwrap();
        assert_eq!(session.status, Status::Completed);
        let agents: Vec<_> = session.steps.iter().map(|s| s.agent_name.as_str()).collect();
        assert_eq!(agents, vec!["planner", "architect", "coder"]);
        assert!(session.steps.iter().all(|s| s.status == Status::Completed));
        assert!(session.steps.iter().all(|s| s.output.is_some()));
        assert!(session.ended_at.is_some());
    }

    #[tokio::test]
    async fn test_request_reaches_every_model_call() {
        let store = store();
        let model = Arc::new(project_model());
        let engine = WorkflowEngine::new(
            store.clone(),
            model.clone(),
            Arc::new(accepting_writer()),
            &config(),
        );

        let request = "Build a todo app with dark mode and drag-and-drop";
        let id = engine.run(request).await.unwrap();
        assert_eq!(store.get(&id).unwrap().status, Status::Completed);

        // template plan, so architect plus one call per file
        let prompts = model.prompts();
        assert_eq!(prompts.len(), 4);
        assert!(prompts[0].user.contains("implementation task"));
        for prompt in &prompts {
            assert!(
                prompt.user.contains(&format!("Request: {request}")),
                "missing request in: {}",
                prompt.user
            );
        }
    }

    #[tokio::test]
    async fn test_plan_failure_stops_pipeline() {
        let store = store();
        let model = Arc::new(ScriptedModelClient::failing(ModelError::Timeout(8)));
        let engine = WorkflowEngine::new(
            store.clone(),
            model.clone(),
            Arc::new(accepting_writer()),
            &config(),
        );

        let id = engine.run("A weather dashboard").await.unwrap();
        let session = store.get(&id).unwrap();

        assert_eq!(session.status, Status::Error);
        assert_eq!(session.steps.len(), 1);
        assert_eq!(session.steps[0].agent_name, "planner");
        assert_eq!(session.steps[0].status, Status::Error);
        assert!(session.steps[0].error.as_deref().unwrap().contains("planner"));
        assert!(session.error.as_deref().unwrap().starts_with("planner stage failed"));
        assert_eq!(model.call_count(), 1);
    }

    #[tokio::test]
    async fn test_malformed_plan_is_stage_error() {
        let store = store();
        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(ScriptedModelClient::always("I cannot help with that")),
            Arc::new(accepting_writer()),
            &config(),
        );

        let id = engine.run("Something unusual").await.unwrap();
        let session = store.get(&id).unwrap();
        assert_eq!(session.status, Status::Error);
        assert_eq!(session.steps.len(), 1);
    }

    #[tokio::test]
    async fn test_coder_failure_keeps_earlier_steps() {
        let store = store();
        let model = ScriptedModelClient::with_handler(|prompt: &Prompt| {
            if prompt.user.contains("implementation task") {
                Ok("{}".to_string())
            } else {
                Err(ModelError::Api("overloaded".into()))
            }
        });
        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(model),
            Arc::new(accepting_writer()),
            &config(),
        );

        let id = engine.run("Build a calculator").await.unwrap();
        let session = store.get(&id).unwrap();
        let statuses: Vec<_> = session.steps.iter().map(|s| s.status).collect();
        assert_eq!(
            statuses,
            vec![Status::Completed, Status::Completed, Status::Error]
        );
        assert_eq!(session.status, Status::Error);
        // architect fell back to extension-based tasks
        assert!(session.steps[1].output.as_deref().unwrap().contains("0 from model"));
    }

    #[tokio::test]
    async fn test_write_failure_fails_coder() {
        let store = store();
        let mut writer = MockFileWriter::new();
        writer.expect_prepare().returning(|| Ok(()));
        writer
            .expect_write()
            .times(1)
            .returning(|_, _| Err(BuddyError::io("disk full")));

        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(project_model()),
            Arc::new(writer),
            &config(),
        );
        let id = engine.run("Build a todo app").await.unwrap();
        let session = store.get(&id).unwrap();
        assert_eq!(session.steps.len(), 3);
        assert_eq!(session.steps[2].status, Status::Error);
        assert!(session.steps[2].error.as_deref().unwrap().contains("disk full"));
    }

    #[tokio::test]
    async fn test_escaping_planned_path_fails_coder() {
        let dir = tempfile::TempDir::new().unwrap();
        let store = store();
        let model = ScriptedModelClient::with_handler(|prompt: &Prompt| {
            if prompt.user.starts_with("Create a project plan") {
                Ok(r#"{"name": "Sneaky", "files": [{"path": "../../outside.js", "purpose": "x"}]}"#
                    .to_string())
            } else if prompt.user.contains("implementation task") {
                Ok("{}".to_string())
            } else {
                Ok("alert(1)".to_string())
            }
        });
        let config = WorkflowConfig {
            use_templates: false,
            ..config()
        };
        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(model),
            Arc::new(ProjectFileWriter::new(dir.path().join("out"))),
            &config,
        );

        let id = engine.run("Something sneaky").await.unwrap();
        let session = store.get(&id).unwrap();
        assert_eq!(session.status, Status::Error);
        let error = session.steps[2].error.as_deref().unwrap();
        assert!(error.contains("Malformed output from coder"), "{}", error);
        assert!(!dir.path().join("outside.js").exists());
    }

    #[tokio::test]
    async fn test_prepare_failure_moves_pending_to_error() {
        let store = store();
        let mut writer = MockFileWriter::new();
        writer
            .expect_prepare()
            .returning(|| Err(BuddyError::io("read-only filesystem")));
        writer.expect_write().never();

        let model = Arc::new(project_model());
        let engine =
            WorkflowEngine::new(store.clone(), model.clone(), Arc::new(writer), &config());
        let id = engine.run("Build a todo app").await.unwrap();

        let session = store.get(&id).unwrap();
        assert_eq!(session.status, Status::Error);
        assert!(session.steps.is_empty());
        assert!(session.started_at.is_none());
        assert_eq!(model.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_prompt_rejected() {
        let store = store();
        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(project_model()),
            Arc::new(accepting_writer()),
            &config(),
        );
        assert!(matches!(
            engine.run("  ").await,
            Err(BuddyError::InvalidInput { .. })
        ));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_templates_disabled_uses_model_plan() {
        let store = store();
        let model = ScriptedModelClient::with_handler(|prompt: &Prompt| {
            if prompt.user.starts_with("Create a project plan") {
                Ok(r#"{"name": "Todo", "files": [{"path": "main.py", "purpose": "app"}]}"#
                    .to_string())
            } else if prompt.user.contains("implementation task") {
                Ok("{}".to_string())
            } else {
                Ok("print('hi')".to_string())
            }
        });
        let config = WorkflowConfig {
            use_templates: false,
            ..config()
        };
        let engine = WorkflowEngine::new(
            store.clone(),
            Arc::new(model),
            Arc::new(accepting_writer()),
            &config,
        );

        let id = engine.run("Build a todo app").await.unwrap();
        let session = store.get(&id).unwrap();
        assert_eq!(session.status, Status::Completed);
        assert!(session.steps[0].output.as_deref().unwrap().contains("model plan"));
        assert!(session.steps[2].output.as_deref().unwrap().contains("main.py"));
    }

    #[tokio::test]
    async fn test_engine_publishes_terminal_snapshot() {
        let broadcaster = UpdateBroadcaster::new(128);
        let store = Arc::new(SessionStore::new(broadcaster.clone()));
        let mut sub = broadcaster.subscribe();
        let engine = WorkflowEngine::new(
            store,
            Arc::new(project_model()),
            Arc::new(accepting_writer()),
            &config(),
        );

        let id = engine.run("Build a todo app").await.unwrap();
        let updates: Vec<_> = std::iter::from_fn(|| sub.try_recv()).collect();
        assert!(updates.iter().all(|u| u.session.id == id));
        let last = updates.last().unwrap();
        assert_eq!(last.session.status, Status::Completed);
        assert_eq!(engine.stage_names(), vec!["planner", "architect", "coder"]);
    }
}
