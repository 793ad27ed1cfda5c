//! Process-wide session registry

use super::status::Status;
use super::types::{
    Session, SessionId, SessionKind, SessionSummary, SessionUpdate, Step, StepId, UpdateKind,
};
use crate::error::{BuddyError, BuddyResult};
use crate::events::UpdateBroadcaster;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, info};

#[derive(Default)]
struct Registry {
    sessions: HashMap<SessionId, Session>,
    /// Creation order, oldest first
    order: Vec<SessionId>,
}

/// Registry of every session created during the process lifetime
///
/// One coarse lock guards the whole registry. Updates are published while the
/// lock is held, so subscribers see mutations of a session in the order they
/// were applied. Publishing never blocks.
pub struct SessionStore {
    registry: RwLock<Registry>,
    broadcaster: Arc<UpdateBroadcaster>,
}

impl SessionStore {
    /// Create an empty store publishing to `broadcaster`
    pub fn new(broadcaster: Arc<UpdateBroadcaster>) -> Self {
        Self {
            registry: RwLock::new(Registry::default()),
            broadcaster,
        }
    }

    /// Broadcaster this store publishes to
    pub fn broadcaster(&self) -> &Arc<UpdateBroadcaster> {
        &self.broadcaster
    }

    /// Create a new pending session
    pub fn create(&self, kind: SessionKind, input: impl Into<String>) -> SessionId {
        let session = Session::new(kind, input.into());
        let id = session.id;

        let mut registry = self.registry.write();
        registry.order.push(id);
        registry.sessions.insert(id, session.clone());
        self.publish(UpdateKind::Created, None, session);
        drop(registry);

        info!("Created {} session {}", kind, id);
        id
    }

    /// Append a pending step to a non-terminal session
    pub fn append_step(
        &self,
        session_id: &SessionId,
        agent_name: impl Into<String>,
        label: impl Into<String>,
    ) -> BuddyResult<StepId> {
        let mut registry = self.registry.write();
        let session = registry
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| BuddyError::not_found("session", session_id))?;

        if session.is_terminal() {
            return Err(BuddyError::invalid_transition(
                format!("session {}", session_id),
                session.status,
                Status::Pending,
            ));
        }

        let step_id = StepId(session.steps.len());
        let step = Step::new(step_id, agent_name.into(), label.into());
        debug!(
            "Session {} appended step {} ({})",
            session_id, step_id, step.agent_name
        );
        session.steps.push(step);

        let snapshot = session.clone();
        self.publish(UpdateKind::StepAppended, Some(step_id), snapshot);
        Ok(step_id)
    }

    /// Move a session (`step_id == None`) or one of its steps to `new_status`
    ///
    /// `error` is recorded only when `new_status` is `error`. An invalid
    /// transition leaves the state untouched.
    pub fn transition(
        &self,
        session_id: &SessionId,
        step_id: Option<StepId>,
        new_status: Status,
        error: Option<String>,
    ) -> BuddyResult<Session> {
        self.apply(session_id, step_id, new_status, error, None)
    }

    /// Complete a running step and record its output summary in one update
    pub fn complete_step(
        &self,
        session_id: &SessionId,
        step_id: StepId,
        output: Option<String>,
    ) -> BuddyResult<Session> {
        self.apply(session_id, Some(step_id), Status::Completed, None, output)
    }

    fn apply(
        &self,
        session_id: &SessionId,
        step_id: Option<StepId>,
        new_status: Status,
        error: Option<String>,
        output: Option<String>,
    ) -> BuddyResult<Session> {
        let mut registry = self.registry.write();
        let session = registry
            .sessions
            .get_mut(session_id)
            .ok_or_else(|| BuddyError::not_found("session", session_id))?;

        let now = Utc::now();
        let error = if new_status == Status::Error {
            Some(error.unwrap_or_else(|| "unspecified error".to_string()))
        } else {
            None
        };

        match step_id {
            Some(step_id) => {
                let session_terminal = session.is_terminal();
                let step = session.steps.get_mut(step_id.0).ok_or_else(|| {
                    BuddyError::not_found("step", format!("{}/{}", session_id, step_id))
                })?;
                let target = format!("step {} ({})", step_id, step.agent_name);
                if session_terminal || !step.status.can_transition_to(&new_status) {
                    return Err(BuddyError::invalid_transition(
                        target,
                        step.status,
                        new_status,
                    ));
                }

                step.status = new_status;
                if new_status == Status::Running {
                    step.started_at = Some(now);
                }
                if new_status.is_terminal() {
                    step.ended_at = Some(now);
                }
                step.error = error;
                if output.is_some() {
                    step.output = output;
                }
                debug!(
                    "Session {} step {} -> {}",
                    session_id, step_id, new_status
                );
            }
            None => {
                if !session.status.can_transition_to(&new_status) {
                    return Err(BuddyError::invalid_transition(
                        format!("session {}", session_id),
                        session.status,
                        new_status,
                    ));
                }

                session.status = new_status;
                if new_status == Status::Running {
                    session.started_at = Some(now);
                }
                if new_status.is_terminal() {
                    session.ended_at = Some(now);
                    info!("Session {} finished as {}", session_id, new_status);
                }
                session.error = error;
            }
        }

        let snapshot = session.clone();
        self.publish(UpdateKind::Transitioned, step_id, snapshot.clone());
        Ok(snapshot)
    }

    /// Owned snapshot of a session
    pub fn get(&self, session_id: &SessionId) -> BuddyResult<Session> {
        self.registry
            .read()
            .sessions
            .get(session_id)
            .cloned()
            .ok_or_else(|| BuddyError::not_found("session", session_id))
    }

    /// Summaries of all sessions, most recently created first
    pub fn list(&self) -> Vec<SessionSummary> {
        self.list_recent(usize::MAX)
    }

    /// At most `limit` summaries, most recently created first
    pub fn list_recent(&self, limit: usize) -> Vec<SessionSummary> {
        let registry = self.registry.read();
        registry
            .order
            .iter()
            .rev()
            .take(limit)
            .filter_map(|id| registry.sessions.get(id))
            .map(SessionSummary::from)
            .collect()
    }

    /// Number of sessions held
    pub fn len(&self) -> usize {
        self.registry.read().order.len()
    }

    /// Check if no session was created yet
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Count sessions per status
    pub fn status_counts(&self) -> HashMap<Status, usize> {
        let registry = self.registry.read();
        let mut counts = HashMap::new();
        for session in registry.sessions.values() {
            *counts.entry(session.status).or_insert(0) += 1;
        }
        counts
    }

    fn publish(&self, kind: UpdateKind, step_id: Option<StepId>, session: Session) {
        self.broadcaster.publish(SessionUpdate {
            kind,
            step_id,
            session,
        });
    }
}
