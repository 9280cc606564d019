// libs/text-session-cell/src/services/notify.rs
use async_trait::async_trait;
use tracing::info;
use uuid::Uuid;

use crate::models::{EndReason, SessionStatus, SettlementResult};

/// State transitions surfaced to the notification subsystem.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    Started {
        session_id: Uuid,
        patient_id: Uuid,
        doctor_id: Uuid,
    },
    /// First patient message arrived; the doctor-response countdown began.
    AwaitingDoctorResponse {
        session_id: Uuid,
    },
    Activated {
        session_id: Uuid,
    },
    IntervalBilled {
        session_id: Uuid,
        interval_index: u32,
    },
    Terminated {
        session_id: Uuid,
        status: SessionStatus,
        reason: EndReason,
        settlement: SettlementResult,
    },
}

/// Delivery boundary for session events. Push/websocket delivery lives in
/// another subsystem; this cell only needs somewhere to hand the event.
#[async_trait]
pub trait SessionEventSink: Send + Sync {
    async fn publish(&self, event: SessionEvent);
}

/// Production sink: log the transition and move on.
pub struct TracingEventSink;

#[async_trait]
impl SessionEventSink for TracingEventSink {
    async fn publish(&self, event: SessionEvent) {
        match &event {
            SessionEvent::Started {
                session_id,
                patient_id,
                doctor_id,
            } => {
                info!(
                    session_id = %session_id,
                    patient_id = %patient_id,
                    doctor_id = %doctor_id,
                    "Text session started"
                );
            }
            SessionEvent::AwaitingDoctorResponse { session_id } => {
                info!(session_id = %session_id, "Doctor response countdown started");
            }
            SessionEvent::Activated { session_id } => {
                info!(session_id = %session_id, "Text session activated");
            }
            SessionEvent::IntervalBilled {
                session_id,
                interval_index,
            } => {
                info!(
                    session_id = %session_id,
                    interval_index,
                    "Session interval billed"
                );
            }
            SessionEvent::Terminated {
                session_id,
                status,
                reason,
                settlement,
            } => {
                info!(
                    session_id = %session_id,
                    status = %status,
                    reason = %reason,
                    sessions_deducted = settlement.sessions_deducted,
                    "Text session terminated"
                );
            }
        }
    }
}
