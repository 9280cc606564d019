// libs/wallet-cell/src/models.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ==============================================================================
// LEDGER MODELS
// ==============================================================================

/// Which kind of time-boxed consultation a ledger entry settles.
///
/// The ledger does not care how a session was produced; the kind tag only
/// keeps the idempotency keys of different session tables from colliding.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SessionKind {
    Text,
    Appointment,
}

impl fmt::Display for SessionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SessionKind::Text => write!(f, "text"),
            SessionKind::Appointment => write!(f, "appointment"),
        }
    }
}

/// Reference from a ledger entry back to the session that earned it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct SessionRef {
    pub kind: SessionKind,
    pub id: Uuid,
}

impl SessionRef {
    pub fn text(id: Uuid) -> Self {
        Self {
            kind: SessionKind::Text,
            id,
        }
    }
}

impl fmt::Display for SessionRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TransactionDirection {
    Credit,
    Debit,
}

/// One immutable ledger row. Balance changes exist only as rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WalletTransaction {
    pub id: Uuid,
    pub doctor_id: Uuid,
    pub direction: TransactionDirection,
    pub amount: f64,
    /// Set for session billing credits; `None` for withdrawals.
    pub session: Option<SessionRef>,
    /// Billing interval the credit covers, 1-based. `None` for withdrawals.
    pub interval_index: Option<u32>,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorWallet {
    pub doctor_id: Uuid,
    pub balance: f64,
    pub total_earned: f64,
    pub total_withdrawn: f64,
    pub updated_at: DateTime<Utc>,
}

impl DoctorWallet {
    pub fn new(doctor_id: Uuid, now: DateTime<Utc>) -> Self {
        Self {
            doctor_id,
            balance: 0.0,
            total_earned: 0.0,
            total_withdrawn: 0.0,
            updated_at: now,
        }
    }
}

/// Result of a keyed credit attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CreditOutcome {
    /// A new ledger row was written and the balance moved.
    Applied,
    /// The `(session, interval_index)` key was already recorded; nothing
    /// changed.
    Duplicate,
}

// ==============================================================================
// SUBSCRIPTION MODELS
// ==============================================================================

/// A patient's remaining prepaid session units. Provisioned by the payments
/// system; this cell only ever decrements it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubscriptionAccount {
    pub patient_id: Uuid,
    pub text_sessions_remaining: u32,
}

/// How much of a requested subscription debit could actually be taken.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DebitOutcome {
    pub requested: u32,
    pub applied: u32,
}

impl DebitOutcome {
    pub fn shortfall(&self) -> u32 {
        self.requested - self.applied
    }

    pub fn fully_applied(&self) -> bool {
        self.applied == self.requested
    }
}

// ==============================================================================
// REQUEST/RESPONSE MODELS
// ==============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WithdrawRequest {
    pub amount: f64,
}
