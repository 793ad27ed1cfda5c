//! Session and step data types

use super::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Opaque unique session identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a fresh identifier
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

/// Step identifier, stable and distinct within its session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub usize);

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What kind of request a session tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionKind {
    /// Plan -> Architect -> Code run
    Pipeline,
    /// Single question answered by the Q&A service
    Qa,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Pipeline => write!(f, "pipeline"),
            SessionKind::Qa => write!(f, "qa"),
        }
    }
}

/// One unit of work inside a session
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    pub id: StepId,
    /// "planner", "architect", "coder" or "qa"
    pub agent_name: String,
    pub label: String,
    pub status: Status,
    pub started_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Present only when `status` is `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Short summary of what the collaborator produced
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<String>,
}

impl Step {
    pub(crate) fn new(id: StepId, agent_name: String, label: String) -> Self {
        Self {
            id,
            agent_name,
            label,
            status: Status::Pending,
            started_at: None,
            ended_at: None,
            error: None,
            output: None,
        }
    }

    /// Wall-clock duration in milliseconds, once the step has ended
    pub fn duration_ms(&self) -> Option<i64> {
        duration_between(self.started_at, self.ended_at)
    }
}

/// A tracked pipeline or Q&A invocation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub kind: SessionKind,
    pub input: String,
    pub status: Status,
    pub steps: Vec<Step>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    /// Set exactly when `status` is terminal
    pub ended_at: Option<DateTime<Utc>>,
    /// Failure message for sessions that ended in `error`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Session {
    pub(crate) fn new(kind: SessionKind, input: String) -> Self {
        Self {
            id: SessionId::new(),
            kind,
            input,
            status: Status::Pending,
            steps: Vec::new(),
            created_at: Utc::now(),
            started_at: None,
            ended_at: None,
            error: None,
        }
    }

    /// Check if the session has reached a terminal status
    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Look up a step by id
    pub fn step(&self, id: StepId) -> Option<&Step> {
        self.steps.get(id.0)
    }

    /// Duration from start to end in milliseconds
    pub fn duration_ms(&self) -> Option<i64> {
        duration_between(self.started_at.or(Some(self.created_at)), self.ended_at)
    }
}

/// Compact view of a session for listings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionSummary {
    pub id: SessionId,
    pub kind: SessionKind,
    pub input: String,
    pub status: Status,
    pub step_count: usize,
    /// Agent of the most recently appended step
    pub current_agent: Option<String>,
    pub created_at: DateTime<Utc>,
    pub ended_at: Option<DateTime<Utc>>,
    pub duration_ms: Option<i64>,
}

impl From<&Session> for SessionSummary {
    fn from(session: &Session) -> Self {
        Self {
            id: session.id,
            kind: session.kind,
            input: session.input.clone(),
            status: session.status,
            step_count: session.steps.len(),
            current_agent: session.steps.last().map(|s| s.agent_name.clone()),
            created_at: session.created_at,
            ended_at: session.ended_at,
            duration_ms: session.duration_ms(),
        }
    }
}

/// What changed in a published snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UpdateKind {
    Created,
    StepAppended,
    Transitioned,
}

/// Post-mutation snapshot pushed to subscribers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionUpdate {
    pub kind: UpdateKind,
    /// Step affected by the change, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub step_id: Option<StepId>,
    pub session: Session,
}

impl SessionUpdate {
    /// Whether this snapshot shows the session in a terminal status
    pub fn is_terminal(&self) -> bool {
        self.session.is_terminal()
    }
}

fn duration_between(start: Option<DateTime<Utc>>, end: Option<DateTime<Utc>>) -> Option<i64> {
    match (start, end) {
        (Some(start), Some(end)) => Some((end - start).num_milliseconds()),
        _ => None,
    }
}
