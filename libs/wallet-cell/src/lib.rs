// libs/wallet-cell/src/lib.rs
//! # Wallet Cell
//!
//! Doctor earnings ledger and patient subscription balances.
//!
//! Every change to a doctor's balance goes through a ledger entry; there is
//! no direct balance assignment anywhere. Session billing credits carry a
//! `(session, interval_index)` key, and the ledger refuses to record the
//! same key twice — that single check is what makes interval billing safe
//! to invoke from racing callers.
//!
//! ```text
//! +-----------------------------------------------------+
//! |                   Wallet Cell                       |
//! +-----------------------------------------------------+
//! |  handlers.rs    |  HTTP endpoint handlers           |
//! |  router.rs      |  Route definitions                |
//! |  models.rs      |  Wallet, transaction & DTO types  |
//! |  error.rs       |  WalletError                      |
//! |  services/      |  Business logic layer             |
//! |    ledger.rs    |  Atomic credit/withdraw ledger    |
//! |    subscription.rs | Patient session-credit balances|
//! +-----------------------------------------------------+
//! ```
//!
//! ## API Endpoints
//!
//! - `GET /wallets/doctors/{id}` - Wallet balance and totals
//! - `GET /wallets/doctors/{id}/transactions` - Ledger history for audits
//! - `POST /wallets/doctors/{id}/withdraw` - Record a withdrawal

pub mod error;
pub mod handlers;
pub mod models;
pub mod router;
pub mod services;

pub use error::WalletError;
pub use models::{
    CreditOutcome, DebitOutcome, DoctorWallet, SessionKind, SessionRef, SubscriptionAccount,
    TransactionDirection, WalletTransaction,
};
pub use services::{SubscriptionAccountService, WalletLedgerService};

pub use router::wallet_routes;
