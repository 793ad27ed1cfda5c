//! Coder Buddy
//!
//! Facade over [`buddy_core`]: session tracking, the Plan -> Architect -> Code
//! workflow, the cached Q&A service and the dashboard update stream. The
//! `buddy` binary lives in `crates/buddy-cli`.

pub use buddy_core::*;
