// libs/text-session-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::models::{MessageReceived, StartSessionRequest, TextSessionError};
use crate::services::lifecycle::SessionLifecycleService;

fn map_session_error(e: TextSessionError) -> AppError {
    match e {
        TextSessionError::NotFound => AppError::NotFound("Text session not found".to_string()),
        TextSessionError::InsufficientSessions => AppError::PaymentRequired(
            "You have no text sessions remaining in your subscription".to_string(),
        ),
        TextSessionError::DuplicateSession => AppError::Conflict(
            "You already have an active session with this doctor".to_string(),
        ),
        TextSessionError::InvalidStatusTransition { .. } => AppError::BadRequest(e.to_string()),
    }
}

#[axum::debug_handler]
pub async fn start_session(
    State(lifecycle): State<Arc<SessionLifecycleService>>,
    Json(request): Json<StartSessionRequest>,
) -> Result<Json<Value>, AppError> {
    let session = lifecycle.start(request).await.map_err(map_session_error)?;

    Ok(Json(json!({
        "success": true,
        "message": "Text session started successfully",
        "session_id": session.id,
        "status": session.status,
        "sessions_remaining_before_start": session.sessions_remaining_before_start
    })))
}

/// Message-received hook invoked by the chat subsystem for every stored
/// message. Only the sender's role matters here.
#[axum::debug_handler]
pub async fn message_received(
    State(lifecycle): State<Arc<SessionLifecycleService>>,
    Path(session_id): Path<Uuid>,
    Json(event): Json<MessageReceived>,
) -> Result<Json<Value>, AppError> {
    let session = lifecycle
        .on_message(session_id, event.sender)
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!({
        "success": true,
        "status": session.status,
        "doctor_response_deadline": session.doctor_response_deadline
    })))
}

#[axum::debug_handler]
pub async fn check_response(
    State(lifecycle): State<Arc<SessionLifecycleService>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let check = lifecycle
        .check_status(session_id)
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!({
        "success": true,
        "status": check.status,
        "timeRemaining": check.time_remaining,
        "remainingTimeMinutes": check.remaining_time_minutes,
        "remainingSessions": check.remaining_sessions,
        "message": check.message
    })))
}

#[axum::debug_handler]
pub async fn end_session(
    State(lifecycle): State<Arc<SessionLifecycleService>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let (session, already_ended) = lifecycle
        .end_manually(session_id)
        .await
        .map_err(map_session_error)?;

    let message = if already_ended {
        "Session was already ended"
    } else {
        "Session ended successfully"
    };

    Ok(Json(json!({
        "success": true,
        "message": message,
        "data": {
            "session": session,
            "already_ended": already_ended
        }
    })))
}

#[axum::debug_handler]
pub async fn get_session(
    State(lifecycle): State<Arc<SessionLifecycleService>>,
    Path(session_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let session = lifecycle
        .session(session_id)
        .await
        .map_err(map_session_error)?;

    Ok(Json(json!({
        "success": true,
        "data": session
    })))
}
