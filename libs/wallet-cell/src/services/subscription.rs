// libs/wallet-cell/src/services/subscription.rs
use std::collections::HashMap;

use tokio::sync::RwLock;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::{DebitOutcome, SubscriptionAccount};

/// Patient session-credit balances.
///
/// Accounts are provisioned by the payments system; from this side the
/// balance only ever goes down, and never below zero.
pub struct SubscriptionAccountService {
    accounts: RwLock<HashMap<Uuid, SubscriptionAccount>>,
}

impl SubscriptionAccountService {
    pub fn new() -> Self {
        Self {
            accounts: RwLock::new(HashMap::new()),
        }
    }

    /// Install or replace a patient's balance. Wiring and test setup only —
    /// billing never calls this.
    pub async fn upsert_account(&self, patient_id: Uuid, text_sessions_remaining: u32) {
        let mut accounts = self.accounts.write().await;
        accounts.insert(
            patient_id,
            SubscriptionAccount {
                patient_id,
                text_sessions_remaining,
            },
        );
    }

    pub async fn sessions_remaining(&self, patient_id: Uuid) -> u32 {
        let accounts = self.accounts.read().await;
        accounts
            .get(&patient_id)
            .map(|account| account.text_sessions_remaining)
            .unwrap_or(0)
    }

    /// Take up to `sessions` units from the patient's balance, clamped at
    /// zero. The caller decides what a shortfall means; here it is not an
    /// error.
    pub async fn debit(&self, patient_id: Uuid, sessions: u32) -> DebitOutcome {
        if sessions == 0 {
            return DebitOutcome {
                requested: 0,
                applied: 0,
            };
        }

        let mut accounts = self.accounts.write().await;
        let available = accounts
            .get(&patient_id)
            .map(|account| account.text_sessions_remaining)
            .unwrap_or(0);
        let applied = sessions.min(available);

        if let Some(account) = accounts.get_mut(&patient_id) {
            account.text_sessions_remaining -= applied;
        }

        let outcome = DebitOutcome {
            requested: sessions,
            applied,
        };

        if outcome.fully_applied() {
            info!(
                patient_id = %patient_id,
                sessions,
                remaining = available - applied,
                "Debited patient subscription"
            );
        } else {
            warn!(
                patient_id = %patient_id,
                requested = sessions,
                applied,
                "Subscription debit clamped: insufficient session credits"
            );
        }

        outcome
    }
}

impl Default for SubscriptionAccountService {
    fn default() -> Self {
        Self::new()
    }
}
