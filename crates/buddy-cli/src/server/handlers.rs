use super::AppState;
use super::types::*;
use async_stream::stream;
use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use buddy_core::events::UpdateFilter;
use buddy_core::{BuddyError, FileWriter, Session, SessionId, Status, UnifiedError};
use futures::Stream;
use std::convert::Infallible;
use std::path::Path as FilePath;
use tokio::task::JoinError;
use tracing::{debug, warn};

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ErrorBody>)>;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let runtime = &state.runtime;
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: "coder-buddy".to_string(),
        sessions: runtime.store().len(),
        cache_degraded: runtime.cache().is_degraded(),
    })
}

pub async fn generate_project(
    State(state): State<AppState>,
    Json(payload): Json<GenerateRequest>,
) -> ApiResult<GenerateResponse> {
    let engine = state.runtime.engine().clone();
    let session_id = engine.begin(&payload.prompt).map_err(map_api_error)?;

    let handle = tokio::spawn(async move { engine.execute(session_id).await });
    let session = if payload.wait {
        handle
            .await
            .map_err(map_join_error)?
            .map_err(map_api_error)?
    } else {
        state.runtime.store().get(&session_id).map_err(map_api_error)?
    };

    Ok(Json(GenerateResponse {
        success: session.status != Status::Error,
        session_id,
        session,
    }))
}

pub async fn ask_question(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> ApiResult<AskResponse> {
    let AskRequest { question, context } = payload;
    let qa = state.runtime.qa().clone();
    let asked = question.clone();
    let answer = tokio::spawn(async move {
        qa.answer_with_context(&asked, context.as_deref()).await
    })
    .await
    .map_err(map_join_error)?
    .map_err(map_api_error)?;

    Ok(Json(AskResponse {
        success: true,
        answer: answer.text,
        question,
        is_technical: answer.is_technical,
        cached: answer.cached,
        response_time_ms: answer.latency_ms,
        session_id: answer.session_id,
    }))
}

/// Answer over SSE: a `start` event, then `complete` or `error`
pub async fn ask_question_streaming(
    State(state): State<AppState>,
    Json(payload): Json<AskRequest>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let AskRequest { question, context } = payload;
    let qa = state.runtime.qa().clone();
    let task = tokio::spawn(async move {
        qa.answer_with_context(&question, context.as_deref()).await
    });

    let event_stream = stream! {
        yield Ok(qa_event(&AskStreamEvent::Start {
            message: "Processing your question".to_string(),
        }));
        let outcome = match task.await {
            Ok(Ok(answer)) => AskStreamEvent::Complete {
                answer: answer.text,
                is_technical: answer.is_technical,
                cached: answer.cached,
                response_time_ms: answer.latency_ms,
                session_id: answer.session_id,
            },
            Ok(Err(err)) => map_api_error(err).1.0.into(),
            Err(err) => map_join_error(err).1.0.into(),
        };
        yield Ok(qa_event(&outcome));
    };

    Sse::new(event_stream).keep_alive(
        KeepAlive::new()
            .interval(state.runtime.config().events.keep_alive)
            .text("keepalive"),
    )
}

fn qa_event(event: &AskStreamEvent) -> SseEvent {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    SseEvent::default().event("qa").data(payload)
}

pub async fn list_sessions(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Json<SessionList> {
    let store = state.runtime.store();
    let limit = query
        .limit
        .unwrap_or(state.runtime.config().server.session_list_limit);
    Json(SessionList {
        sessions: store.list_recent(limit),
        total: store.len(),
    })
}

pub async fn get_session(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> ApiResult<Session> {
    let session_id = parse_session_id(&id).map_err(map_api_error)?;
    state
        .runtime
        .store()
        .get(&session_id)
        .map(Json)
        .map_err(map_api_error)
}

pub async fn stream_events(
    State(state): State<AppState>,
    Query(query): Query<EventsQuery>,
) -> Result<Sse<impl Stream<Item = Result<SseEvent, Infallible>>>, (StatusCode, Json<ErrorBody>)>
{
    let broadcaster = state.runtime.broadcaster();
    let mut subscription = match query.session.as_deref() {
        Some(id) => {
            let session_id = parse_session_id(id).map_err(map_api_error)?;
            broadcaster.subscribe_filtered(UpdateFilter::session(session_id))
        }
        None => broadcaster.subscribe(),
    };
    debug!("SSE subscriber {} connected", subscription.id());

    let event_stream = stream! {
        while let Some(update) = subscription.recv().await {
            let payload = serde_json::to_string(&update).unwrap_or_else(|_| "{}".to_string());
            yield Ok(SseEvent::default().event("session_update").data(payload));
        }
    };

    Ok(Sse::new(event_stream).keep_alive(
        KeepAlive::new()
            .interval(state.runtime.config().events.keep_alive)
            .text("keepalive"),
    ))
}

pub async fn performance_stats(State(state): State<AppState>) -> Json<PerformanceStats> {
    let runtime = &state.runtime;
    let cache = runtime.cache().statistics().await;
    let qa = runtime.qa().statistics();
    Json(PerformanceStats {
        cache_hit_rate: cache.hit_rate(),
        cache,
        qa: QaReport {
            average_latency_ms: qa.average_latency_ms(),
            cache_ratio: qa.cache_ratio(),
            totals: qa,
        },
        sessions: runtime.store().status_counts(),
        subscribers: runtime.broadcaster().subscriber_count(),
        updates_published: runtime.broadcaster().published_count(),
    })
}

pub async fn generated_projects(State(state): State<AppState>) -> ApiResult<GeneratedProjects> {
    let files = state
        .runtime
        .writer()
        .list_generated()
        .await
        .map_err(map_api_error)?;
    Ok(Json(GeneratedProjects {
        total: files.len(),
        files,
    }))
}

pub async fn file_content(
    State(state): State<AppState>,
    Query(query): Query<FileQuery>,
) -> ApiResult<FileContent> {
    let content = state
        .runtime
        .writer()
        .read(FilePath::new(&query.path))
        .await
        .map_err(map_api_error)?;
    Ok(Json(FileContent {
        success: true,
        path: query.path,
        content,
    }))
}

pub async fn save_file(
    State(state): State<AppState>,
    Json(payload): Json<SaveFileRequest>,
) -> ApiResult<SaveFileResponse> {
    let writer = state.runtime.writer();
    writer.prepare().await.map_err(map_api_error)?;
    writer
        .write(FilePath::new(&payload.path), &payload.content)
        .await
        .map_err(map_api_error)?;
    debug!("Saved {} from the dashboard", payload.path);
    Ok(Json(SaveFileResponse {
        success: true,
        size: payload.content.len(),
        path: payload.path,
    }))
}

fn parse_session_id(id: &str) -> Result<SessionId, BuddyError> {
    id.parse()
        .map_err(|_| BuddyError::invalid_field("session_id", format!("'{id}' is not a session id")))
}

pub(super) fn map_api_error(err: BuddyError) -> (StatusCode, Json<ErrorBody>) {
    let status = match &err {
        BuddyError::NotFound { .. } => StatusCode::NOT_FOUND,
        BuddyError::InvalidInput { .. } => StatusCode::BAD_REQUEST,
        BuddyError::InvalidTransition { .. } => StatusCode::CONFLICT,
        BuddyError::ModelUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    };
    if status.is_server_error() {
        warn!("Request failed: {}", err);
    }
    (
        status,
        Json(ErrorBody {
            code: err.error_code().to_string(),
            message: err.to_string(),
            stage: err.stage().map(str::to_string),
        }),
    )
}

fn map_join_error(err: JoinError) -> (StatusCode, Json<ErrorBody>) {
    warn!("Request task failed: {}", err);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorBody {
            code: "BUDDY_INTERNAL".to_string(),
            message: "request task failed".to_string(),
            stage: None,
        }),
    )
}
