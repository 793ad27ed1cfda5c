//! One-shot pipeline run

use crate::console::{CliConsole, status_label};
use anyhow::bail;
use buddy_core::{BuddyRuntime, Config, Status};

/// Generate one project and print the step table
pub async fn run(config: Config, prompt: &str, verbose: bool) -> anyhow::Result<()> {
    let console = CliConsole::new(verbose);
    let runtime = BuddyRuntime::from_config(config).await?;

    console.print_header("Coder Buddy");
    console.field("Prompt", prompt);
    console.field("Model", &runtime.config().model.model);
    console.field(
        "Output",
        runtime.config().workflow.output_dir.display(),
    );
    println!();

    let session_id = runtime.engine().run(prompt).await?;
    let session = runtime.store().get(&session_id)?;

    console.print_steps(&session);
    println!();
    console.field("Session", session_id);
    console.field("Status", status_label(session.status));
    if let Some(ms) = session.duration_ms() {
        console.field("Duration", format!("{ms}ms"));
    }

    if session.status == Status::Completed {
        console.success("Project generated");
        Ok(())
    } else {
        let reason = session.error.unwrap_or_else(|| "unknown error".to_string());
        console.error(&reason);
        bail!("pipeline failed")
    }
}
