// libs/text-session-cell/src/services/billing.rs
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tracing::{debug, error};

use shared_config::AppConfig;
use wallet_cell::models::SessionRef;
use wallet_cell::services::ledger::WalletLedgerService;
use wallet_cell::services::subscription::SubscriptionAccountService;

use crate::models::{EndReason, SettlementResult, TextSession};

/// Computes billable intervals and moves money for text sessions.
///
/// Interval credits are keyed `(session, interval_index)` in the wallet
/// ledger, so charging is at-least-once safe no matter how many callers
/// race. The patient's subscription is debited exactly once per session,
/// during final settlement.
pub struct BillingEngine {
    ledger: Arc<WalletLedgerService>,
    subscriptions: Arc<SubscriptionAccountService>,
    unit_rate: f64,
    unit_minutes: i64,
}

impl BillingEngine {
    pub fn new(
        ledger: Arc<WalletLedgerService>,
        subscriptions: Arc<SubscriptionAccountService>,
        config: &AppConfig,
    ) -> Self {
        Self {
            ledger,
            subscriptions,
            unit_rate: config.session_unit_rate,
            unit_minutes: config.session_unit_minutes,
        }
    }

    pub fn unit_minutes(&self) -> i64 {
        self.unit_minutes
    }

    /// Intervals the session owes at termination, before capping.
    ///
    /// Accrual and automatic time-exhaustion bill completed intervals only
    /// (floor); a manual end also bills the interval in progress (ceil); a
    /// doctor timeout bills nothing beyond what already went out.
    fn intervals_owed(&self, session: &TextSession, reason: EndReason, now: DateTime<Utc>) -> u32 {
        let elapsed = session.elapsed_minutes(now);
        match reason {
            EndReason::Manual => ((elapsed + self.unit_minutes - 1) / self.unit_minutes) as u32,
            EndReason::OutOfTime => (elapsed / self.unit_minutes) as u32,
            EndReason::DoctorTimeout => session.auto_deductions_processed,
        }
    }

    /// Bill every completed interval not yet charged, up to the credit
    /// snapshot. Returns the interval indices newly charged.
    ///
    /// Safe to call redundantly from the poll path and the sweeper: the
    /// session lock serializes counter updates and the ledger key suppresses
    /// duplicate credits.
    pub async fn charge_due_intervals(
        &self,
        session: &mut TextSession,
        now: DateTime<Utc>,
    ) -> Vec<u32> {
        let completed = session.completed_intervals(now, self.unit_minutes);
        let mut charged = Vec::new();

        for interval_index in (session.auto_deductions_processed + 1)..=completed {
            match self
                .ledger
                .credit(
                    session.doctor_id,
                    self.unit_rate,
                    SessionRef::text(session.id),
                    interval_index,
                    format!("Text session {} interval {}", session.id, interval_index),
                )
                .await
            {
                Ok(_) => {
                    session.auto_deductions_processed += 1;
                    session.sessions_used = session.sessions_used.max(interval_index);
                    charged.push(interval_index);
                }
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        interval_index,
                        amount = self.unit_rate,
                        "Interval credit failed, will retry on next trigger: {}",
                        e
                    );
                    break;
                }
            }
        }

        if !charged.is_empty() {
            debug!(
                session_id = %session.id,
                charged = charged.len(),
                total_processed = session.auto_deductions_processed,
                "Processed auto-deduction intervals"
            );
        }

        charged
    }

    /// Final billing reconciliation, run exactly once per session from the
    /// termination path.
    ///
    /// Never fails: wallet and subscription problems are collected in the
    /// result so a payment error can never keep a session from ending. Each
    /// failure is logged with enough context for manual reconciliation.
    pub async fn settle_final(
        &self,
        session: &mut TextSession,
        reason: EndReason,
        now: DateTime<Utc>,
    ) -> SettlementResult {
        let mut result = SettlementResult::empty();

        let owed = self.intervals_owed(session, reason, now);
        let total = owed.min(session.sessions_remaining_before_start);
        if owed > total {
            result.errors.push(format!(
                "{} billable intervals exceed the {} session credits available at start; {} left uncovered",
                owed,
                session.sessions_remaining_before_start,
                owed - total
            ));
        }

        for interval_index in (session.auto_deductions_processed + 1)..=total {
            match self
                .ledger
                .credit(
                    session.doctor_id,
                    self.unit_rate,
                    SessionRef::text(session.id),
                    interval_index,
                    format!("Text session {} interval {}", session.id, interval_index),
                )
                .await
            {
                Ok(_) => {
                    session.auto_deductions_processed += 1;
                }
                Err(e) => {
                    error!(
                        session_id = %session.id,
                        interval_index,
                        amount = self.unit_rate,
                        "Settlement credit failed: {}",
                        e
                    );
                    result.doctor_payment_success = false;
                    result
                        .errors
                        .push(format!("interval {} credit failed: {}", interval_index, e));
                    break;
                }
            }
        }

        session.sessions_used = session.sessions_used.max(total);
        result.sessions_deducted = total;
        result.amount_paid = self.unit_rate * session.auto_deductions_processed as f64;

        if total > 0 {
            let debit = self.subscriptions.debit(session.patient_id, total).await;
            result.patient_deduction_success = debit.fully_applied();
            if !debit.fully_applied() {
                error!(
                    session_id = %session.id,
                    requested = debit.requested,
                    applied = debit.applied,
                    "Subscription debit fell short at settlement"
                );
                result.errors.push(format!(
                    "subscription debit applied {} of {} sessions",
                    debit.applied, debit.requested
                ));
            }
        }

        result
    }
}
