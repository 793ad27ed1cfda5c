//! Error types for Coder Buddy
//!
//! Every fallible operation in the core returns [`BuddyResult`]. Errors carry
//! the stage or step that produced them so callers can tell which part of a
//! pipeline or Q&A request failed without seeing internal identifiers.
//!
//! - `NotFound` / `InvalidTransition` are usage errors and are never retried
//! - `ModelUnavailable` ends the current stage (and its session) as `error`
//! - `Io` from the disk cache tier is absorbed by the cache, which degrades to
//!   memory-only operation

mod constructors;
mod conversions;
mod types;
mod unified_error;

pub use types::{BuddyError, BuddyResult, UnifiedError};
