//! Planner, architect and coder stages

use super::plan::{
    ProjectPlan, ProjectTemplate, TaskPlan, build_task_plan, parse_plan,
    parse_task_descriptions, slugify, strip_code_fences,
};
use super::writer::FileWriter;
use crate::error::{BuddyError, BuddyResult};
use crate::llm::{ModelClient, Prompt};
use crate::session::SessionId;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Accumulated state handed from stage to stage
#[derive(Debug, Clone)]
pub struct StageContext {
    pub session_id: SessionId,
    /// Caller's free-text request
    pub input: String,
    pub plan: Option<ProjectPlan>,
    pub tasks: Option<TaskPlan>,
    /// Files written so far, relative to the writer root
    pub written: Vec<PathBuf>,
}

impl StageContext {
    pub fn new(session_id: SessionId, input: impl Into<String>) -> Self {
        Self {
            session_id,
            input: input.into(),
            plan: None,
            tasks: None,
            written: Vec::new(),
        }
    }

    /// Directory the project's files go into, relative to the writer root
    pub fn project_dir(&self) -> PathBuf {
        let name = self
            .plan
            .as_ref()
            .map(|p| p.name.as_str())
            .unwrap_or("project");
        let id = self.session_id.to_string();
        PathBuf::from(format!("{}-{}", slugify(name), &id[..8]))
    }

    fn require_plan(&self, stage: &str) -> BuddyResult<&ProjectPlan> {
        self.plan
            .as_ref()
            .ok_or_else(|| BuddyError::malformed(stage, "no project plan available"))
    }
}

/// One pipeline stage
#[async_trait]
pub trait StageAgent: Send + Sync {
    /// Agent name recorded on the step
    fn name(&self) -> &'static str;

    /// Human-readable step label
    fn label(&self) -> &'static str;

    /// Run the stage, extending the context; returns a short output summary
    async fn execute(&self, context: &mut StageContext) -> BuddyResult<String>;
}

async fn generate(
    model: &dyn ModelClient,
    prompt: &Prompt,
    timeout: Duration,
    stage: &str,
) -> BuddyResult<String> {
    match tokio::time::timeout(timeout, model.generate(prompt)).await {
        Ok(Ok(text)) => Ok(text),
        Ok(Err(e)) => Err(BuddyError::from(e).in_stage(stage)),
        Err(_) => Err(BuddyError::model_timeout(stage, timeout)),
    }
}

/// Turns the request into a [`ProjectPlan`]
pub struct PlannerAgent {
    model: Arc<dyn ModelClient>,
    use_templates: bool,
    timeout: Duration,
}

impl PlannerAgent {
    pub fn new(model: Arc<dyn ModelClient>, use_templates: bool, timeout: Duration) -> Self {
        Self {
            model,
            use_templates,
            timeout,
        }
    }

    fn prompt(input: &str) -> Prompt {
        Prompt::new(format!(
            r#"Create a project plan for: {}

Respond with ONLY a JSON object:
{{
  "name": "Project Name",
  "description": "Brief description",
  "techstack": "Technologies to use",
  "features": ["feature1", "feature2", "feature3"],
  "files": [
    {{"path": "index.html", "purpose": "Main structure"}},
    {{"path": "style.css", "purpose": "Styling"}},
    {{"path": "script.js", "purpose": "Functionality"}}
  ]
}}"#,
            input
        ))
        .with_system("You are a software project planner. Reply with JSON only.")
    }
}

#[async_trait]
impl StageAgent for PlannerAgent {
    fn name(&self) -> &'static str {
        "planner"
    }

    fn label(&self) -> &'static str {
        "Plan project"
    }

    async fn execute(&self, context: &mut StageContext) -> BuddyResult<String> {
        let template = self
            .use_templates
            .then(|| ProjectTemplate::detect(&context.input))
            .flatten();

        let (plan, source) = match template {
            Some(template) => {
                debug!("Using built-in {:?} plan", template);
                (template.plan(), "template")
            }
            None => {
                let reply = generate(
                    self.model.as_ref(),
                    &Self::prompt(&context.input),
                    self.timeout,
                    self.name(),
                )
                .await?;
                (parse_plan(&reply)?, "model")
            }
        };

        let summary = format!(
            "{} ({} files, {} plan)",
            plan.name,
            plan.files.len(),
            source
        );
        info!("Planned '{}' with {} files", plan.name, plan.files.len());
        context.plan = Some(plan);
        Ok(summary)
    }
}

/// Derives one implementation task per planned file
pub struct ArchitectAgent {
    model: Arc<dyn ModelClient>,
    timeout: Duration,
}

impl ArchitectAgent {
    pub fn new(model: Arc<dyn ModelClient>, timeout: Duration) -> Self {
        Self { model, timeout }
    }

    fn prompt(request: &str, plan: &ProjectPlan) -> Prompt {
        let files = plan
            .files
            .iter()
            .map(|f| format!("- {}: {}", f.path, f.purpose))
            .collect::<Vec<_>>()
            .join("\n");
        Prompt::new(format!(
            "Request: {}\nProject: {}\nDescription: {}\nTech stack: {}\nFeatures: {}\n\nFiles:\n{}\n\n\
             For each file, write a concrete implementation task that honours the request. \
             Respond with ONLY a JSON object mapping each file path to its task description.",
            request,
            plan.name,
            plan.description,
            plan.techstack,
            plan.features.join(", "),
            files
        ))
        .with_system("You are a software architect. Reply with JSON only.")
    }
}

#[async_trait]
impl StageAgent for ArchitectAgent {
    fn name(&self) -> &'static str {
        "architect"
    }

    fn label(&self) -> &'static str {
        "Design implementation tasks"
    }

    async fn execute(&self, context: &mut StageContext) -> BuddyResult<String> {
        let plan = context.require_plan(self.name())?;
        let reply = generate(
            self.model.as_ref(),
            &Self::prompt(&context.input, plan),
            self.timeout,
            self.name(),
        )
        .await?;

        let described = parse_task_descriptions(&reply);
        if described.is_empty() {
            warn!("Architect reply had no usable task descriptions, using defaults");
        }
        let tasks = build_task_plan(plan, &described);
        let from_model = tasks
            .implementation_steps
            .iter()
            .filter(|t| described.contains_key(&t.filepath))
            .count();

        let summary = format!(
            "{} tasks ({} from model)",
            tasks.implementation_steps.len(),
            from_model
        );
        context.tasks = Some(tasks);
        Ok(summary)
    }
}

/// Generates and writes every file of the task plan, one after another
pub struct CoderAgent {
    model: Arc<dyn ModelClient>,
    writer: Arc<dyn FileWriter>,
    timeout: Duration,
}

impl CoderAgent {
    pub fn new(model: Arc<dyn ModelClient>, writer: Arc<dyn FileWriter>, timeout: Duration) -> Self {
        Self {
            model,
            writer,
            timeout,
        }
    }

    fn prompt(request: &str, plan: &ProjectPlan, filepath: &str, task: &str) -> Prompt {
        let siblings = plan
            .files
            .iter()
            .map(|f| f.path.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Prompt::new(format!(
            "Request: {}\nProject: {}\nDescription: {}\nTech stack: {}\nFeatures: {}\nProject files: {}\n\n\
             Task: {}\n\nWrite the complete content of {}. Respond with the file content only.",
            request,
            plan.name,
            plan.description,
            plan.techstack,
            plan.features.join(", "),
            siblings,
            task,
            filepath
        ))
        .with_system("You are an expert developer. Produce complete, working files.")
    }
}

#[async_trait]
impl StageAgent for CoderAgent {
    fn name(&self) -> &'static str {
        "coder"
    }

    fn label(&self) -> &'static str {
        "Write project files"
    }

    async fn execute(&self, context: &mut StageContext) -> BuddyResult<String> {
        let plan = context.require_plan(self.name())?.clone();
        let tasks = context
            .tasks
            .clone()
            .ok_or_else(|| BuddyError::malformed(self.name(), "no task plan available"))?;
        let project_dir = context.project_dir();

        for task in &tasks.implementation_steps {
            let reply = generate(
                self.model.as_ref(),
                &Self::prompt(&context.input, &plan, &task.filepath, &task.task_description),
                self.timeout,
                self.name(),
            )
            .await?;
            let content = strip_code_fences(&reply);

            let relative = project_dir.join(&task.filepath);
            self.writer
                .write(&relative, &content)
                .await
                .map_err(|e| e.in_stage(self.name()))?;
            debug!("Generated {}", relative.display());
            context.written.push(relative);
        }

        let names = tasks
            .implementation_steps
            .iter()
            .map(|t| t.filepath.as_str())
            .collect::<Vec<_>>()
            .join(", ");
        Ok(format!(
            "wrote {} files to {}: {}",
            context.written.len(),
            project_dir.display(),
            names
        ))
    }
}
