//! CLI console utilities

use buddy_core::{Session, Status};
use colored::*;

/// CLI console for formatted output
pub struct CliConsole {
    verbose: bool,
}

impl CliConsole {
    pub const fn new(verbose: bool) -> Self {
        Self { verbose }
    }

    /// Print an info message (verbose only)
    pub fn info(&self, message: &str) {
        if self.verbose {
            println!("{} {}", "ℹ".blue().bold(), message);
        }
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", "✓".green().bold(), message.green());
    }

    pub fn warn(&self, message: &str) {
        println!("{} {}", "⚠".yellow().bold(), message.yellow());
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", "✗".red().bold(), message.red());
    }

    pub fn print_header(&self, title: &str) {
        println!();
        println!("{}", title.bold().underline());
        println!("{}", "=".repeat(title.chars().count()).dimmed());
    }

    /// Print a labelled value
    pub fn field(&self, label: &str, value: impl std::fmt::Display) {
        println!("  {:<14} {}", format!("{label}:").dimmed(), value);
    }

    /// Print one line per step with its status, duration and output
    pub fn print_steps(&self, session: &Session) {
        for step in &session.steps {
            let duration = step
                .duration_ms()
                .map(|ms| format!("{ms}ms"))
                .unwrap_or_else(|| "-".to_string());
            println!(
                "  {:>2}  {:<10} {:<10} {:>8}  {}",
                step.id.0 + 1,
                step.agent_name.bold(),
                status_label(step.status),
                duration.dimmed(),
                step.output
                    .as_deref()
                    .or(step.error.as_deref())
                    .unwrap_or_default()
            );
        }
    }
}

/// Coloured status text
pub fn status_label(status: Status) -> ColoredString {
    let text = status.to_string();
    match status {
        Status::Pending => text.dimmed(),
        Status::Running => text.cyan(),
        Status::Completed => text.green(),
        Status::Error => text.red(),
    }
}
