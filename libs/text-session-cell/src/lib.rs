// libs/text-session-cell/src/lib.rs
//! # Text Session Cell
//!
//! Lifecycle and billing engine for live doctor-patient text consultations.
//!
//! A session starts in `WaitingForDoctor` with a snapshot of the patient's
//! subscription credits. The first patient message arms a 90-second
//! doctor-response deadline; the first doctor message activates the session.
//! From `started_at` onward the session consumes its time allowance
//! (credits × 10 minutes), with the doctor's wallet credited for each
//! completed 10-minute interval and a final settlement at termination.
//!
//! Three independent actors can touch the same session — the polling
//! client, the chat message hook, and the background sweeper. Every
//! state-mutating operation runs under that session's own lock, interval
//! billing is idempotent through a ledger key, and all three termination
//! triggers (poll, manual end, sweep) share a single guarded `terminate`
//! path, so sessions can never be double-charged or double-terminated.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                Text Session Cell                    |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Session state machine & DTOs     |
//! |  store.rs       |  Per-session-locked registry      |
//! |  services/      |  Business logic layer             |
//! |    lifecycle.rs |  State transitions & termination  |
//! |    billing.rs   |  Interval charges & settlement    |
//! |    sweeper.rs   |  Background deadline enforcement  |
//! |    notify.rs    |  Transition events for delivery   |
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `POST /text-sessions/start` - Start a session with a doctor
//! - `POST /text-sessions/{id}/message` - Chat subsystem message hook
//! - `GET /text-sessions/{id}/check-response` - Status poll (may transition)
//! - `POST /text-sessions/{id}/end` - Manual end
//! - `GET /text-sessions/{id}` - Session detail

pub mod handlers;
pub mod models;
pub mod router;
pub mod services;
pub mod store;

// Re-export commonly used types
pub use models::{
    EndReason, MessageReceived, SenderRole, SessionStatus, SettlementResult,
    StartSessionRequest, StatusCheck, TextSession, TextSessionError,
};
pub use services::{
    BillingEngine, ExpirationSweeper, SessionEvent, SessionEventSink, SessionLifecycleService,
    SessionTimingRules, TracingEventSink,
};
pub use store::SessionStore;

pub use router::text_session_routes;
