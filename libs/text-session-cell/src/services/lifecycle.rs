// libs/text-session-cell/src/services/lifecycle.rs
use std::sync::Arc;

use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_config::AppConfig;
use shared_utils::Clock;
use wallet_cell::services::subscription::SubscriptionAccountService;

use crate::models::{
    EndReason, SenderRole, SessionStatus, SettlementResult, StartSessionRequest, StatusCheck,
    TextSession, TextSessionError,
};
use crate::services::billing::BillingEngine;
use crate::services::notify::{SessionEvent, SessionEventSink};
use crate::store::SessionStore;

/// Timing constants a session lives under, snapshotted from config.
#[derive(Debug, Clone)]
pub struct SessionTimingRules {
    pub unit_minutes: i64,
    pub doctor_response_deadline_seconds: i64,
}

impl SessionTimingRules {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            unit_minutes: config.session_unit_minutes,
            doctor_response_deadline_seconds: config.doctor_response_deadline_seconds,
        }
    }
}

/// Owns every text-session state transition.
///
/// The poll endpoint, the chat message hook and the background sweeper all
/// come through here, and every path that ends a session funnels into the
/// one `terminate_locked` guard — there is deliberately no second place in
/// the codebase that sets a terminal status.
pub struct SessionLifecycleService {
    store: Arc<SessionStore>,
    billing: Arc<BillingEngine>,
    subscriptions: Arc<SubscriptionAccountService>,
    events: Arc<dyn SessionEventSink>,
    clock: Arc<dyn Clock>,
    rules: SessionTimingRules,
}

impl SessionLifecycleService {
    pub fn new(
        store: Arc<SessionStore>,
        billing: Arc<BillingEngine>,
        subscriptions: Arc<SubscriptionAccountService>,
        events: Arc<dyn SessionEventSink>,
        clock: Arc<dyn Clock>,
        rules: SessionTimingRules,
    ) -> Self {
        Self {
            store,
            billing,
            subscriptions,
            events,
            clock,
            rules,
        }
    }

    pub fn store(&self) -> &Arc<SessionStore> {
        &self.store
    }

    /// Get all valid next statuses for a given current status
    pub fn valid_transitions(&self, current: &SessionStatus) -> Vec<SessionStatus> {
        match current {
            SessionStatus::WaitingForDoctor => vec![
                SessionStatus::Active,
                SessionStatus::Expired,
                SessionStatus::Ended,
            ],
            SessionStatus::Active => vec![SessionStatus::Ended],
            // Terminal states - no transitions allowed
            SessionStatus::Expired => vec![],
            SessionStatus::Ended => vec![],
        }
    }

    /// Validate that a status transition is allowed
    pub fn validate_status_transition(
        &self,
        current: &SessionStatus,
        next: &SessionStatus,
    ) -> Result<(), TextSessionError> {
        if !self.valid_transitions(current).contains(next) {
            warn!("Invalid status transition attempted: {} -> {}", current, next);
            return Err(TextSessionError::InvalidStatusTransition {
                from: *current,
                to: *next,
            });
        }
        Ok(())
    }

    /// Create a session in WaitingForDoctor with a snapshot of the patient's
    /// current session credits.
    pub async fn start(
        &self,
        request: StartSessionRequest,
    ) -> Result<TextSession, TextSessionError> {
        let remaining = self
            .subscriptions
            .sessions_remaining(request.patient_id)
            .await;
        if remaining == 0 {
            return Err(TextSessionError::InsufficientSessions);
        }

        if self
            .store
            .has_open_session_for_pair(request.patient_id, request.doctor_id)
            .await
        {
            return Err(TextSessionError::DuplicateSession);
        }

        let session = TextSession::new(
            request.patient_id,
            request.doctor_id,
            remaining,
            request.reason,
            self.clock.now(),
        );
        let snapshot = session.clone();
        self.store.insert(session).await;

        self.events
            .publish(SessionEvent::Started {
                session_id: snapshot.id,
                patient_id: snapshot.patient_id,
                doctor_id: snapshot.doctor_id,
            })
            .await;

        info!(
            session_id = %snapshot.id,
            patient_id = %snapshot.patient_id,
            doctor_id = %snapshot.doctor_id,
            sessions_remaining_before_start = snapshot.sessions_remaining_before_start,
            "Text session started"
        );

        Ok(snapshot)
    }

    /// React to a chat message event, by sender role.
    pub async fn on_message(
        &self,
        session_id: Uuid,
        sender: SenderRole,
    ) -> Result<TextSession, TextSessionError> {
        let entry = self
            .store
            .get(session_id)
            .await
            .ok_or(TextSessionError::NotFound)?;
        let mut session = entry.lock().await;
        let now = self.clock.now();

        session.last_activity_at = now;

        match sender {
            SenderRole::Patient => {
                // First patient message arms the doctor-response countdown.
                // The deadline is set at most once; later messages are no-ops.
                if session.status == SessionStatus::WaitingForDoctor
                    && session.doctor_response_deadline.is_none()
                {
                    let deadline =
                        now + Duration::seconds(self.rules.doctor_response_deadline_seconds);
                    session.doctor_response_deadline = Some(deadline);

                    self.events
                        .publish(SessionEvent::AwaitingDoctorResponse {
                            session_id: session.id,
                        })
                        .await;

                    info!(
                        session_id = %session.id,
                        deadline = %deadline,
                        "Doctor response deadline set by first patient message"
                    );
                }
            }
            SenderRole::Doctor => {
                if session.status == SessionStatus::WaitingForDoctor {
                    self.validate_status_transition(&session.status, &SessionStatus::Active)?;
                    session.status = SessionStatus::Active;
                    session.activated_at = Some(now);
                    session.doctor_response_deadline = None;

                    self.events
                        .publish(SessionEvent::Activated {
                            session_id: session.id,
                        })
                        .await;

                    info!(session_id = %session.id, "Text session activated by doctor response");
                }
            }
        }

        Ok(session.clone())
    }

    /// Poll the session state, applying any transition that is due.
    ///
    /// Safe to call repeatedly from any number of clients and from the
    /// sweeper; a transition fires at most once and the returned remaining
    /// times never go negative.
    pub async fn check_status(&self, session_id: Uuid) -> Result<StatusCheck, TextSessionError> {
        let entry = self
            .store
            .get(session_id)
            .await
            .ok_or(TextSessionError::NotFound)?;
        let mut session = entry.lock().await;
        let now = self.clock.now();
        let unit = self.rules.unit_minutes;

        let check = match session.status {
            SessionStatus::WaitingForDoctor => match session.doctor_response_deadline {
                None => StatusCheck {
                    status: session.status,
                    time_remaining: None,
                    remaining_time_minutes: session.remaining_time_minutes(now, unit),
                    remaining_sessions: session.remaining_sessions(now, unit),
                    message: "Waiting for patient to send first message".to_string(),
                },
                Some(deadline) => {
                    let seconds_left = (deadline - now).num_seconds().max(0);
                    if session.response_deadline_passed(now) {
                        self.terminate_locked(
                            &mut session,
                            SessionStatus::Expired,
                            EndReason::DoctorTimeout,
                        )
                        .await;
                        StatusCheck {
                            status: session.status,
                            time_remaining: Some(0),
                            remaining_time_minutes: 0,
                            remaining_sessions: session.remaining_sessions(now, unit),
                            message: "Session expired - no session will be deducted".to_string(),
                        }
                    } else {
                        StatusCheck {
                            status: session.status,
                            time_remaining: Some(seconds_left),
                            remaining_time_minutes: session.remaining_time_minutes(now, unit),
                            remaining_sessions: session.remaining_sessions(now, unit),
                            message: "Waiting for doctor response".to_string(),
                        }
                    }
                }
            },
            SessionStatus::Active => {
                if session.is_out_of_time(now, unit) {
                    self.terminate_locked(&mut session, SessionStatus::Ended, EndReason::OutOfTime)
                        .await;
                    StatusCheck {
                        status: session.status,
                        time_remaining: None,
                        remaining_time_minutes: 0,
                        remaining_sessions: session.remaining_sessions(now, unit),
                        message: "Session has ended - time limit reached".to_string(),
                    }
                } else {
                    let charged = self.billing.charge_due_intervals(&mut session, now).await;
                    for interval_index in charged {
                        self.events
                            .publish(SessionEvent::IntervalBilled {
                                session_id: session.id,
                                interval_index,
                            })
                            .await;
                    }
                    StatusCheck {
                        status: session.status,
                        time_remaining: None,
                        remaining_time_minutes: session.remaining_time_minutes(now, unit),
                        remaining_sessions: session.remaining_sessions(now, unit),
                        message: "Session is active".to_string(),
                    }
                }
            }
            SessionStatus::Expired => StatusCheck {
                status: session.status,
                time_remaining: Some(0),
                remaining_time_minutes: session.remaining_time_minutes(now, unit),
                remaining_sessions: session.remaining_sessions(now, unit),
                message: "Session expired - no session will be deducted".to_string(),
            },
            SessionStatus::Ended => StatusCheck {
                status: session.status,
                time_remaining: None,
                remaining_time_minutes: session.remaining_time_minutes(now, unit),
                remaining_sessions: session.remaining_sessions(now, unit),
                message: "Session has ended".to_string(),
            },
        };

        Ok(check)
    }

    /// End a session at a participant's request. Ending an already-terminal
    /// session is an idempotent no-op, not an error.
    pub async fn end_manually(
        &self,
        session_id: Uuid,
    ) -> Result<(TextSession, bool), TextSessionError> {
        let entry = self
            .store
            .get(session_id)
            .await
            .ok_or(TextSessionError::NotFound)?;
        let mut session = entry.lock().await;

        if session.status.is_terminal() {
            debug!(session_id = %session.id, "Manual end on terminal session is a no-op");
            return Ok((session.clone(), true));
        }

        self.terminate_locked(&mut session, SessionStatus::Ended, EndReason::Manual)
            .await;

        Ok((session.clone(), false))
    }

    /// Read-only session snapshot.
    pub async fn session(&self, session_id: Uuid) -> Result<TextSession, TextSessionError> {
        let entry = self
            .store
            .get(session_id)
            .await
            .ok_or(TextSessionError::NotFound)?;
        let session = entry.lock().await;
        Ok(session.clone())
    }

    /// The one termination path. Caller must hold the session's lock.
    ///
    /// The `ended_at` null check makes racing terminations converge: the
    /// first caller through settles billing, every later one is a silent
    /// no-op.
    async fn terminate_locked(
        &self,
        session: &mut TextSession,
        final_status: SessionStatus,
        reason: EndReason,
    ) -> Option<SettlementResult> {
        if session.ended_at.is_some() {
            debug!(
                session_id = %session.id,
                "Termination race lost, session already ended"
            );
            return None;
        }

        if self
            .validate_status_transition(&session.status, &final_status)
            .is_err()
        {
            return None;
        }

        let now = self.clock.now();
        session.status = final_status;
        session.ended_at = Some(now);
        session.end_reason = Some(reason);

        let settlement = self.billing.settle_final(session, reason, now).await;

        info!(
            session_id = %session.id,
            status = %final_status,
            reason = %reason,
            sessions_deducted = settlement.sessions_deducted,
            amount_paid = settlement.amount_paid,
            "Text session terminated"
        );

        self.events
            .publish(SessionEvent::Terminated {
                session_id: session.id,
                status: final_status,
                reason,
                settlement: settlement.clone(),
            })
            .await;

        Some(settlement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use shared_utils::ManualClock;
    use tokio::sync::Mutex;
    use wallet_cell::services::ledger::WalletLedgerService;

    struct RecordingEventSink {
        events: Mutex<Vec<SessionEvent>>,
    }

    #[async_trait::async_trait]
    impl SessionEventSink for RecordingEventSink {
        async fn publish(&self, event: SessionEvent) {
            self.events.lock().await.push(event);
        }
    }

    struct LifecycleFixture {
        lifecycle: Arc<SessionLifecycleService>,
        ledger: Arc<WalletLedgerService>,
        subscriptions: Arc<SubscriptionAccountService>,
        clock: Arc<ManualClock>,
        sink: Arc<RecordingEventSink>,
    }

    fn create_fixture() -> LifecycleFixture {
        let config = AppConfig::default();
        let clock = Arc::new(ManualClock::default());
        let store = Arc::new(SessionStore::new());
        let ledger = Arc::new(WalletLedgerService::new(clock.clone() as Arc<dyn Clock>));
        let subscriptions = Arc::new(SubscriptionAccountService::new());
        let billing = Arc::new(BillingEngine::new(
            Arc::clone(&ledger),
            Arc::clone(&subscriptions),
            &config,
        ));
        let sink = Arc::new(RecordingEventSink {
            events: Mutex::new(Vec::new()),
        });
        let lifecycle = Arc::new(SessionLifecycleService::new(
            store,
            billing,
            Arc::clone(&subscriptions),
            sink.clone() as Arc<dyn SessionEventSink>,
            clock.clone() as Arc<dyn Clock>,
            SessionTimingRules::from_config(&config),
        ));
        LifecycleFixture {
            lifecycle,
            ledger,
            subscriptions,
            clock,
            sink,
        }
    }

    async fn start_session(fixture: &LifecycleFixture, credits: u32) -> TextSession {
        let patient_id = Uuid::new_v4();
        fixture.subscriptions.upsert_account(patient_id, credits).await;
        fixture
            .lifecycle
            .start(StartSessionRequest {
                patient_id,
                doctor_id: Uuid::new_v4(),
                reason: Some("General checkup".to_string()),
            })
            .await
            .unwrap()
    }

    async fn terminated_event_count(fixture: &LifecycleFixture) -> usize {
        fixture
            .sink
            .events
            .lock()
            .await
            .iter()
            .filter(|event| matches!(event, SessionEvent::Terminated { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_start_requires_session_credits() {
        let fixture = create_fixture();
        let patient_id = Uuid::new_v4();
        fixture.subscriptions.upsert_account(patient_id, 0).await;

        let result = fixture
            .lifecycle
            .start(StartSessionRequest {
                patient_id,
                doctor_id: Uuid::new_v4(),
                reason: None,
            })
            .await;

        assert_matches!(result, Err(TextSessionError::InsufficientSessions));
    }

    #[tokio::test]
    async fn test_start_snapshots_credits_and_waits_for_doctor() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 3).await;

        assert_eq!(session.status, SessionStatus::WaitingForDoctor);
        assert_eq!(session.sessions_remaining_before_start, 3);
        assert_eq!(session.sessions_used, 0);
        assert_eq!(session.auto_deductions_processed, 0);
        assert!(session.doctor_response_deadline.is_none());
    }

    #[tokio::test]
    async fn test_start_rejects_second_open_session_for_pair() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 3).await;

        let result = fixture
            .lifecycle
            .start(StartSessionRequest {
                patient_id: session.patient_id,
                doctor_id: session.doctor_id,
                reason: None,
            })
            .await;

        assert_matches!(result, Err(TextSessionError::DuplicateSession));
    }

    #[tokio::test]
    async fn test_first_patient_message_sets_deadline_once() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 3).await;

        let after_first = fixture
            .lifecycle
            .on_message(session.id, SenderRole::Patient)
            .await
            .unwrap();
        let deadline = after_first.doctor_response_deadline.unwrap();
        assert_eq!(deadline, fixture.clock.now() + Duration::seconds(90));

        fixture.clock.advance_seconds(30);
        let after_second = fixture
            .lifecycle
            .on_message(session.id, SenderRole::Patient)
            .await
            .unwrap();

        // deadline is set at most once
        assert_eq!(after_second.doctor_response_deadline, Some(deadline));
    }

    #[tokio::test]
    async fn test_doctor_message_activates_and_clears_deadline() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 3).await;

        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Patient)
            .await
            .unwrap();
        fixture.clock.advance_seconds(30);
        let activated = fixture
            .lifecycle
            .on_message(session.id, SenderRole::Doctor)
            .await
            .unwrap();

        assert_eq!(activated.status, SessionStatus::Active);
        assert_eq!(activated.activated_at, Some(fixture.clock.now()));
        assert!(activated.doctor_response_deadline.is_none());

        // a second doctor message changes nothing
        fixture.clock.advance_seconds(30);
        let again = fixture
            .lifecycle
            .on_message(session.id, SenderRole::Doctor)
            .await
            .unwrap();
        assert_eq!(again.activated_at, activated.activated_at);
    }

    #[tokio::test]
    async fn test_message_on_unknown_session() {
        let fixture = create_fixture();

        let result = fixture
            .lifecycle
            .on_message(Uuid::new_v4(), SenderRole::Patient)
            .await;

        assert_matches!(result, Err(TextSessionError::NotFound));
    }

    #[tokio::test]
    async fn test_session_without_patient_message_never_expires() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 3).await;

        fixture.clock.advance(Duration::days(2));
        let check = fixture.lifecycle.check_status(session.id).await.unwrap();

        assert_eq!(check.status, SessionStatus::WaitingForDoctor);
        assert!(check.time_remaining.is_none());
        assert_eq!(terminated_event_count(&fixture).await, 0);
    }

    #[tokio::test]
    async fn test_poll_expires_unanswered_session_without_billing() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 3).await;
        let patient_id = session.patient_id;

        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Patient)
            .await
            .unwrap();
        fixture.clock.advance_seconds(91);

        let check = fixture.lifecycle.check_status(session.id).await.unwrap();
        assert_eq!(check.status, SessionStatus::Expired);
        assert_eq!(check.time_remaining, Some(0));

        let snapshot = fixture.lifecycle.session(session.id).await.unwrap();
        assert!(snapshot.ended_at.is_some());
        assert_eq!(snapshot.end_reason, Some(EndReason::DoctorTimeout));
        assert_eq!(snapshot.sessions_used, 0);
        assert_eq!(fixture.subscriptions.sessions_remaining(patient_id).await, 3);
        assert!(fixture.ledger.wallet(session.doctor_id).await.is_none());

        // polling again is stable
        let again = fixture.lifecycle.check_status(session.id).await.unwrap();
        assert_eq!(again.status, SessionStatus::Expired);
        assert_eq!(terminated_event_count(&fixture).await, 1);
    }

    #[tokio::test]
    async fn test_poll_ends_session_when_time_is_exhausted() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 1).await;

        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Patient)
            .await
            .unwrap();
        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Doctor)
            .await
            .unwrap();

        fixture.clock.advance_minutes(10);
        let check = fixture.lifecycle.check_status(session.id).await.unwrap();

        assert_eq!(check.status, SessionStatus::Ended);
        assert_eq!(check.remaining_time_minutes, 0);

        let snapshot = fixture.lifecycle.session(session.id).await.unwrap();
        assert_eq!(snapshot.end_reason, Some(EndReason::OutOfTime));
        assert_eq!(snapshot.sessions_used, 1);
        assert_eq!(
            fixture.ledger.wallet(session.doctor_id).await.unwrap().balance,
            4.0
        );
    }

    #[tokio::test]
    async fn test_poll_remaining_time_is_monotonically_non_increasing() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 2).await;
        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Doctor)
            .await
            .unwrap();

        let mut last = i64::MAX;
        for _ in 0..6 {
            let check = fixture.lifecycle.check_status(session.id).await.unwrap();
            assert!(check.remaining_time_minutes <= last);
            last = check.remaining_time_minutes;
            fixture.clock.advance_minutes(3);
        }
    }

    #[tokio::test]
    async fn test_manual_end_is_idempotent() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 2).await;
        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Doctor)
            .await
            .unwrap();
        fixture.clock.advance_minutes(5);

        let (first, first_already) = fixture.lifecycle.end_manually(session.id).await.unwrap();
        assert!(!first_already);
        assert_eq!(first.status, SessionStatus::Ended);
        assert_eq!(first.sessions_used, 1); // ceil(5/10)

        let (second, second_already) = fixture.lifecycle.end_manually(session.id).await.unwrap();
        assert!(second_already);
        assert_eq!(second.ended_at, first.ended_at);

        assert_eq!(terminated_event_count(&fixture).await, 1);
        assert_eq!(
            fixture.ledger.wallet(session.doctor_id).await.unwrap().balance,
            4.0
        );
    }

    #[tokio::test]
    async fn test_concurrent_manual_ends_settle_once() {
        let fixture = create_fixture();
        let session = start_session(&fixture, 2).await;
        fixture
            .lifecycle
            .on_message(session.id, SenderRole::Doctor)
            .await
            .unwrap();
        fixture.clock.advance_minutes(12);

        let mut handles = Vec::new();
        for _ in 0..4 {
            let lifecycle = Arc::clone(&fixture.lifecycle);
            let id = session.id;
            handles.push(tokio::spawn(
                async move { lifecycle.end_manually(id).await },
            ));
        }

        let mut winners = 0;
        for handle in handles {
            let (snapshot, already) = handle.await.unwrap().unwrap();
            assert!(snapshot.ended_at.is_some());
            if !already {
                winners += 1;
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(terminated_event_count(&fixture).await, 1);
        // ceil(12/10) = 2 intervals, credited exactly once each
        assert_eq!(
            fixture.ledger.wallet(session.doctor_id).await.unwrap().balance,
            8.0
        );
    }

    #[tokio::test]
    async fn test_transition_table_rejects_terminal_moves() {
        let fixture = create_fixture();

        assert!(fixture
            .lifecycle
            .validate_status_transition(&SessionStatus::WaitingForDoctor, &SessionStatus::Active)
            .is_ok());
        assert!(fixture
            .lifecycle
            .validate_status_transition(&SessionStatus::Active, &SessionStatus::Ended)
            .is_ok());
        assert_matches!(
            fixture
                .lifecycle
                .validate_status_transition(&SessionStatus::Ended, &SessionStatus::Active),
            Err(TextSessionError::InvalidStatusTransition { .. })
        );
        assert_matches!(
            fixture
                .lifecycle
                .validate_status_transition(&SessionStatus::Active, &SessionStatus::Expired),
            Err(TextSessionError::InvalidStatusTransition { .. })
        );
        assert!(fixture.lifecycle.valid_transitions(&SessionStatus::Expired).is_empty());
    }
}
