// libs/text-session-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::lifecycle::SessionLifecycleService;

pub fn text_session_routes(lifecycle: Arc<SessionLifecycleService>) -> Router {
    Router::new()
        .route("/start", post(handlers::start_session))
        .route("/{session_id}", get(handlers::get_session))
        .route("/{session_id}/message", post(handlers::message_received))
        .route("/{session_id}/check-response", get(handlers::check_response))
        .route("/{session_id}/end", post(handlers::end_session))
        .with_state(lifecycle)
}
