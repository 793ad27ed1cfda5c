//! Session tracking for pipeline and Q&A invocations
//!
//! A [`Session`] records one caller request: its kind, input, overall status
//! and an append-only list of [`Step`]s. The [`SessionStore`] is the
//! process-wide registry; every mutation is published through the
//! [`UpdateBroadcaster`](crate::events::UpdateBroadcaster) it was built with.

mod status;
mod store;
mod types;

pub use status::Status;
pub use store::SessionStore;
pub use types::{
    Session, SessionId, SessionKind, SessionSummary, SessionUpdate, Step, StepId, UpdateKind,
};
