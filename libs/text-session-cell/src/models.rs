// libs/text-session-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// CORE SESSION MODELS
// ==============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    WaitingForDoctor,
    Active,
    Expired,
    Ended,
}

impl SessionStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, SessionStatus::Expired | SessionStatus::Ended)
    }
}

impl fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionStatus::WaitingForDoctor => write!(f, "waiting_for_doctor"),
            SessionStatus::Active => write!(f, "active"),
            SessionStatus::Expired => write!(f, "expired"),
            SessionStatus::Ended => write!(f, "ended"),
        }
    }
}

/// Why a session reached a terminal status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// A participant ended the session.
    Manual,
    /// The session used up its full time allowance.
    OutOfTime,
    /// The doctor did not answer the first patient message in time.
    DoctorTimeout,
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::Manual => write!(f, "manual"),
            EndReason::OutOfTime => write!(f, "out_of_time"),
            EndReason::DoctorTimeout => write!(f, "doctor_timeout"),
        }
    }
}

/// Who sent a chat message, as reported by the chat subsystem. The message
/// content itself never reaches this cell.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SenderRole {
    Patient,
    Doctor,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TextSession {
    pub id: Uuid,
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub status: SessionStatus,
    pub started_at: DateTime<Utc>,
    pub last_activity_at: DateTime<Utc>,
    /// Set once, by the first patient message while waiting for the doctor.
    pub doctor_response_deadline: Option<DateTime<Utc>>,
    pub activated_at: Option<DateTime<Utc>>,
    pub ended_at: Option<DateTime<Utc>>,
    /// Subscription units available when the session was created. Immutable;
    /// the session's whole time allowance derives from it even if the
    /// subscription changes mid-session.
    pub sessions_remaining_before_start: u32,
    pub sessions_used: u32,
    pub auto_deductions_processed: u32,
    pub reason: Option<String>,
    pub end_reason: Option<EndReason>,
}

impl TextSession {
    pub fn new(
        patient_id: Uuid,
        doctor_id: Uuid,
        sessions_remaining_before_start: u32,
        reason: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            patient_id,
            doctor_id,
            status: SessionStatus::WaitingForDoctor,
            started_at: now,
            last_activity_at: now,
            doctor_response_deadline: None,
            activated_at: None,
            ended_at: None,
            sessions_remaining_before_start,
            sessions_used: 0,
            auto_deductions_processed: 0,
            reason,
            end_reason: None,
        }
    }

    /// Minutes elapsed since the session started. Time accrues from
    /// `started_at`, not `activated_at`: waiting for the doctor still counts
    /// against the allowance. Clamped at zero against clock skew.
    pub fn elapsed_minutes(&self, now: DateTime<Utc>) -> i64 {
        let end = self.ended_at.unwrap_or(now);
        (end - self.started_at).num_minutes().max(0)
    }

    pub fn total_allowed_minutes(&self, unit_minutes: i64) -> i64 {
        self.sessions_remaining_before_start as i64 * unit_minutes
    }

    pub fn remaining_time_minutes(&self, now: DateTime<Utc>, unit_minutes: i64) -> i64 {
        (self.total_allowed_minutes(unit_minutes) - self.elapsed_minutes(now)).max(0)
    }

    /// Session units not yet consumed by elapsed time, for client display.
    pub fn remaining_sessions(&self, now: DateTime<Utc>, unit_minutes: i64) -> u32 {
        let used = (self.elapsed_minutes(now) / unit_minutes) as u32;
        self.sessions_remaining_before_start.saturating_sub(used)
    }

    /// Fully completed billing intervals, capped at the credit snapshot.
    pub fn completed_intervals(&self, now: DateTime<Utc>, unit_minutes: i64) -> u32 {
        let completed = (self.elapsed_minutes(now) / unit_minutes) as u32;
        completed.min(self.sessions_remaining_before_start)
    }

    pub fn is_out_of_time(&self, now: DateTime<Utc>, unit_minutes: i64) -> bool {
        self.elapsed_minutes(now) >= self.total_allowed_minutes(unit_minutes)
    }

    pub fn response_deadline_passed(&self, now: DateTime<Utc>) -> bool {
        match self.doctor_response_deadline {
            Some(deadline) => now >= deadline,
            None => false,
        }
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StartSessionRequest {
    pub patient_id: Uuid,
    pub doctor_id: Uuid,
    pub reason: Option<String>,
}

/// Message-received hook payload from the chat subsystem.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MessageReceived {
    pub sender: SenderRole,
}

/// Snapshot returned by a status poll. Field names follow the mobile
/// client's existing contract.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheck {
    pub status: SessionStatus,
    /// Seconds until the doctor-response deadline; `None` when no deadline
    /// applies.
    pub time_remaining: Option<i64>,
    pub remaining_time_minutes: i64,
    pub remaining_sessions: u32,
    pub message: String,
}

/// Outcome of the final billing reconciliation at termination. Sub-step
/// failures are collected here; settlement itself never fails.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementResult {
    pub doctor_payment_success: bool,
    pub patient_deduction_success: bool,
    pub sessions_deducted: u32,
    pub amount_paid: f64,
    pub errors: Vec<String>,
}

impl SettlementResult {
    pub fn empty() -> Self {
        Self {
            doctor_payment_success: true,
            patient_deduction_success: true,
            sessions_deducted: 0,
            amount_paid: 0.0,
            errors: Vec::new(),
        }
    }
}

// ==============================================================================
// ERROR TYPES
// ==============================================================================

#[derive(Debug, Clone, thiserror::Error)]
pub enum TextSessionError {
    #[error("Text session not found")]
    NotFound,

    #[error("No text sessions remaining in subscription")]
    InsufficientSessions,

    #[error("An open session already exists for this patient and doctor")]
    DuplicateSession,

    #[error("Invalid status transition from {from} to {to}")]
    InvalidStatusTransition {
        from: SessionStatus,
        to: SessionStatus,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use shared_utils::ManualClock;

    fn session_with_snapshot(snapshot: u32) -> (TextSession, DateTime<Utc>) {
        let start = ManualClock::default_start();
        let session = TextSession::new(Uuid::new_v4(), Uuid::new_v4(), snapshot, None, start);
        (session, start)
    }

    #[test]
    fn test_elapsed_counts_from_started_at() {
        let (mut session, start) = session_with_snapshot(3);
        session.status = SessionStatus::Active;
        session.activated_at = Some(start + Duration::minutes(5));

        // activation 5 minutes in does not reset the clock
        assert_eq!(session.elapsed_minutes(start + Duration::minutes(12)), 12);
    }

    #[test]
    fn test_elapsed_clamps_clock_skew_to_zero() {
        let (session, start) = session_with_snapshot(1);
        assert_eq!(session.elapsed_minutes(start - Duration::minutes(3)), 0);
    }

    #[test]
    fn test_elapsed_freezes_at_ended_at() {
        let (mut session, start) = session_with_snapshot(2);
        session.ended_at = Some(start + Duration::minutes(7));

        assert_eq!(session.elapsed_minutes(start + Duration::minutes(90)), 7);
    }

    #[test]
    fn test_allowance_derives_from_snapshot() {
        let (session, start) = session_with_snapshot(3);

        assert_eq!(session.total_allowed_minutes(10), 30);
        assert_eq!(session.remaining_time_minutes(start + Duration::minutes(12), 10), 18);
        assert_eq!(session.remaining_sessions(start + Duration::minutes(12), 10), 2);
        assert!(!session.is_out_of_time(start + Duration::minutes(29), 10));
        assert!(session.is_out_of_time(start + Duration::minutes(30), 10));
    }

    #[test]
    fn test_completed_intervals_capped_at_snapshot() {
        let (session, start) = session_with_snapshot(2);

        assert_eq!(session.completed_intervals(start + Duration::minutes(9), 10), 0);
        assert_eq!(session.completed_intervals(start + Duration::minutes(10), 10), 1);
        assert_eq!(session.completed_intervals(start + Duration::minutes(25), 10), 2);
        // elapsed past the allowance never bills beyond the snapshot
        assert_eq!(session.completed_intervals(start + Duration::minutes(55), 10), 2);
    }

    #[test]
    fn test_no_deadline_never_reads_as_passed() {
        let (session, start) = session_with_snapshot(1);
        assert!(!session.response_deadline_passed(start + Duration::days(14)));
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!SessionStatus::WaitingForDoctor.is_terminal());
        assert!(!SessionStatus::Active.is_terminal());
        assert!(SessionStatus::Expired.is_terminal());
        assert!(SessionStatus::Ended.is_terminal());
    }
}
