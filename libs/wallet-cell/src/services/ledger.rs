// libs/wallet-cell/src/services/ledger.rs
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::RwLock;
use tracing::{debug, info, warn};
use uuid::Uuid;

use shared_utils::Clock;

use crate::error::WalletError;
use crate::models::{
    CreditOutcome, DoctorWallet, SessionRef, TransactionDirection, WalletTransaction,
};

#[derive(Default)]
struct LedgerBook {
    wallets: HashMap<Uuid, DoctorWallet>,
    transactions: Vec<WalletTransaction>,
    /// Idempotency index: one credit per (session, interval_index), ever.
    session_intervals: HashSet<(SessionRef, u32)>,
}

/// Append-only earnings ledger for doctor wallets.
///
/// All mutation happens under one write lock, so a credit (row append +
/// balance bump + key registration) is a single atomic section.
pub struct WalletLedgerService {
    book: RwLock<LedgerBook>,
    clock: Arc<dyn Clock>,
}

impl WalletLedgerService {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self {
            book: RwLock::new(LedgerBook::default()),
            clock,
        }
    }

    /// Credit a doctor's wallet for one billed session interval.
    ///
    /// A key that was already recorded is a no-op reported as
    /// `CreditOutcome::Duplicate` — callers retrying or racing each other is
    /// the expected mode of operation, not an error.
    pub async fn credit(
        &self,
        doctor_id: Uuid,
        amount: f64,
        session: SessionRef,
        interval_index: u32,
        description: impl Into<String>,
    ) -> Result<CreditOutcome, WalletError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(WalletError::InvalidAmount(format!(
                "credit amount must be positive, got {}",
                amount
            )));
        }

        let now = self.clock.now();
        let mut book = self.book.write().await;

        if !book.session_intervals.insert((session, interval_index)) {
            debug!(
                session = %session,
                interval_index,
                "Duplicate credit for interval suppressed"
            );
            return Ok(CreditOutcome::Duplicate);
        }

        let wallet = book
            .wallets
            .entry(doctor_id)
            .or_insert_with(|| DoctorWallet::new(doctor_id, now));
        wallet.balance += amount;
        wallet.total_earned += amount;
        wallet.updated_at = now;

        book.transactions.push(WalletTransaction {
            id: Uuid::new_v4(),
            doctor_id,
            direction: TransactionDirection::Credit,
            amount,
            session: Some(session),
            interval_index: Some(interval_index),
            description: description.into(),
            created_at: now,
        });

        info!(
            doctor_id = %doctor_id,
            session = %session,
            interval_index,
            amount,
            "Credited doctor wallet for session interval"
        );

        Ok(CreditOutcome::Applied)
    }

    /// Record a withdrawal against a doctor's balance.
    pub async fn withdraw(
        &self,
        doctor_id: Uuid,
        amount: f64,
    ) -> Result<WalletTransaction, WalletError> {
        if amount <= 0.0 || !amount.is_finite() {
            return Err(WalletError::InvalidAmount(format!(
                "withdrawal amount must be positive, got {}",
                amount
            )));
        }

        let now = self.clock.now();
        let mut book = self.book.write().await;

        let wallet = book
            .wallets
            .get_mut(&doctor_id)
            .ok_or(WalletError::WalletNotFound(doctor_id))?;

        if wallet.balance < amount {
            warn!(
                doctor_id = %doctor_id,
                requested = amount,
                available = wallet.balance,
                "Withdrawal rejected: insufficient balance"
            );
            return Err(WalletError::InsufficientBalance {
                requested: amount,
                available: wallet.balance,
            });
        }

        wallet.balance -= amount;
        wallet.total_withdrawn += amount;
        wallet.updated_at = now;

        let transaction = WalletTransaction {
            id: Uuid::new_v4(),
            doctor_id,
            direction: TransactionDirection::Debit,
            amount,
            session: None,
            interval_index: None,
            description: "Withdrawal".to_string(),
            created_at: now,
        };
        book.transactions.push(transaction.clone());

        info!(doctor_id = %doctor_id, amount, "Recorded wallet withdrawal");

        Ok(transaction)
    }

    pub async fn wallet(&self, doctor_id: Uuid) -> Option<DoctorWallet> {
        let book = self.book.read().await;
        book.wallets.get(&doctor_id).cloned()
    }

    /// Ledger history for one doctor, newest first.
    pub async fn transactions(&self, doctor_id: Uuid) -> Vec<WalletTransaction> {
        let book = self.book.read().await;
        let mut rows: Vec<WalletTransaction> = book
            .transactions
            .iter()
            .filter(|tx| tx.doctor_id == doctor_id)
            .cloned()
            .collect();
        rows.reverse();
        rows
    }

    /// All credits recorded for one session, in ledger order.
    pub async fn transactions_for_session(&self, session: SessionRef) -> Vec<WalletTransaction> {
        let book = self.book.read().await;
        book.transactions
            .iter()
            .filter(|tx| tx.session == Some(session))
            .cloned()
            .collect()
    }
}
