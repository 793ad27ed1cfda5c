//! Status state machine shared by sessions and steps

use serde::{Deserialize, Serialize};

/// Lifecycle status of a session or step
///
/// `pending -> running -> {completed, error}`, plus `pending -> error` for
/// work that fails before it starts. Terminal states have no way out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Created but not started
    Pending,
    /// Work in progress
    Running,
    /// Finished successfully
    Completed,
    /// Finished with a failure
    Error,
}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Pending => write!(f, "pending"),
            Status::Running => write!(f, "running"),
            Status::Completed => write!(f, "completed"),
            Status::Error => write!(f, "error"),
        }
    }
}

impl Status {
    /// Check if the status is terminal
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Completed | Status::Error)
    }

    /// Get the next possible statuses from this one
    pub fn possible_transitions(&self) -> Vec<Status> {
        match self {
            Status::Pending => vec![Status::Running, Status::Error],
            Status::Running => vec![Status::Completed, Status::Error],
            Status::Completed | Status::Error => vec![],
        }
    }

    /// Check if a transition to `target` is valid
    pub fn can_transition_to(&self, target: &Status) -> bool {
        matches!(
            (self, target),
            (Status::Pending, Status::Running)
                | (Status::Pending, Status::Error)
                | (Status::Running, Status::Completed)
                | (Status::Running, Status::Error)
        )
    }
}
