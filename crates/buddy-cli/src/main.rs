//! Coder Buddy CLI application
//!
//! # Commands
//!
//! ## Serve
//! Start the dashboard HTTP API: project generation, Q&A, session listings,
//! live session updates over SSE and cache statistics.
//!
//! - **Command:** `buddy serve [--host 0.0.0.0] [--port 8000]`
//!
//! ## Run (one-shot)
//! Run the Plan -> Architect -> Code pipeline for a single prompt and print
//! the step table.
//!
//! - **Command:** `buddy run "<prompt>"`
//! - **Example:** `buddy run "Build a todo app"`
//!
//! ## Ask (one-shot)
//! Answer a single question through the response cache.
//!
//! - **Command:** `buddy ask "<question>" [--context "..."]`
//!
//! ## Config
//! `buddy config show` prints the effective configuration, `buddy config init`
//! writes a starter file.

mod args;
mod commands;
mod console;
mod logging;
mod router;
mod server;

use clap::Parser;

pub use args::{Cli, Commands, ConfigAction};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // A missing .env file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();
    router::route(cli).await
}
