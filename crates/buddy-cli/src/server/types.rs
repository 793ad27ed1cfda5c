//! Request and response bodies of the HTTP API

use buddy_core::cache::CacheStatistics;
use buddy_core::workflow::GeneratedFile;
use buddy_core::{QaStatistics, Session, SessionId, SessionSummary, Status};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    pub sessions: usize,
    pub cache_degraded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub prompt: String,
    /// Hold the response until the pipeline finishes
    #[serde(default)]
    pub wait: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateResponse {
    pub success: bool,
    pub session_id: SessionId,
    pub session: Session,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskRequest {
    pub question: String,
    #[serde(default)]
    pub context: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AskResponse {
    pub success: bool,
    pub answer: String,
    pub question: String,
    pub is_technical: bool,
    pub cached: bool,
    pub response_time_ms: u64,
    pub session_id: SessionId,
}

/// Progress of a streamed answer, sent as SSE `qa` events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AskStreamEvent {
    Start {
        message: String,
    },
    Complete {
        answer: String,
        is_technical: bool,
        cached: bool,
        response_time_ms: u64,
        session_id: SessionId,
    },
    Error {
        code: String,
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        stage: Option<String>,
    },
}

impl From<ErrorBody> for AskStreamEvent {
    fn from(body: ErrorBody) -> Self {
        Self::Error {
            code: body.code,
            message: body.message,
            stage: body.stage,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionList {
    pub sessions: Vec<SessionSummary>,
    pub total: usize,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EventsQuery {
    /// Only stream updates for this session
    pub session: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaReport {
    #[serde(flatten)]
    pub totals: QaStatistics,
    pub average_latency_ms: f64,
    pub cache_ratio: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PerformanceStats {
    pub cache: CacheStatistics,
    pub cache_hit_rate: f64,
    pub qa: QaReport,
    pub sessions: HashMap<Status, usize>,
    pub subscribers: usize,
    pub updates_published: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedProjects {
    pub files: Vec<GeneratedFile>,
    pub total: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FileQuery {
    /// Path relative to the output root, as listed by `generated-projects`
    pub path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileContent {
    pub success: bool,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFileRequest {
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveFileResponse {
    pub success: bool,
    pub path: String,
    pub size: usize,
}

/// Error body returned with every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stage: Option<String>,
}
