// libs/wallet-cell/src/router.rs
use std::sync::Arc;

use axum::{
    routing::{get, post},
    Router,
};

use crate::handlers;
use crate::services::ledger::WalletLedgerService;

pub fn wallet_routes(ledger: Arc<WalletLedgerService>) -> Router {
    Router::new()
        .route("/doctors/{doctor_id}", get(handlers::get_wallet))
        .route("/doctors/{doctor_id}/transactions", get(handlers::get_transactions))
        .route("/doctors/{doctor_id}/withdraw", post(handlers::withdraw))
        .with_state(ledger)
}
