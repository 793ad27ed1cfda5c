//! One-shot question

use crate::console::CliConsole;
use buddy_core::{BuddyRuntime, Config};
use colored::*;

pub async fn ask(config: Config, question: &str, context: Option<&str>) -> anyhow::Result<()> {
    let console = CliConsole::new(true);
    let runtime = BuddyRuntime::from_config(config).await?;

    let answer = match runtime.qa().answer_with_context(question, context).await {
        Ok(answer) => answer,
        Err(e) => {
            console.error(&e.to_string());
            return Err(e.into());
        }
    };

    println!("{}", answer.text);
    println!();
    let source = if answer.cached {
        "cache".green()
    } else {
        "model".cyan()
    };
    println!(
        "{}",
        format!(
            "{} in {}ms · {} · session {}",
            source,
            answer.latency_ms,
            if answer.is_technical {
                "technical"
            } else {
                "general"
            },
            answer.session_id
        )
        .dimmed()
    );
    Ok(())
}
