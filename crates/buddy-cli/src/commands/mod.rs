//! CLI command implementations

pub mod ask;
pub mod config;
pub mod run;
pub mod serve;
