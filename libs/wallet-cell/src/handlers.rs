// libs/wallet-cell/src/handlers.rs
use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use shared_models::error::AppError;

use crate::error::WalletError;
use crate::models::WithdrawRequest;
use crate::services::ledger::WalletLedgerService;

fn map_wallet_error(e: WalletError) -> AppError {
    match e {
        WalletError::WalletNotFound(doctor_id) => {
            AppError::NotFound(format!("No wallet exists for doctor {}", doctor_id))
        }
        WalletError::InvalidAmount(msg) => AppError::BadRequest(msg),
        WalletError::InsufficientBalance { .. } => AppError::BadRequest(e.to_string()),
    }
}

#[axum::debug_handler]
pub async fn get_wallet(
    State(ledger): State<Arc<WalletLedgerService>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let wallet = ledger
        .wallet(doctor_id)
        .await
        .ok_or_else(|| AppError::NotFound(format!("No wallet exists for doctor {}", doctor_id)))?;

    Ok(Json(json!({
        "success": true,
        "wallet": wallet
    })))
}

#[axum::debug_handler]
pub async fn get_transactions(
    State(ledger): State<Arc<WalletLedgerService>>,
    Path(doctor_id): Path<Uuid>,
) -> Result<Json<Value>, AppError> {
    let transactions = ledger.transactions(doctor_id).await;
    let count = transactions.len();

    Ok(Json(json!({
        "success": true,
        "transactions": transactions,
        "count": count
    })))
}

#[axum::debug_handler]
pub async fn withdraw(
    State(ledger): State<Arc<WalletLedgerService>>,
    Path(doctor_id): Path<Uuid>,
    Json(request): Json<WithdrawRequest>,
) -> Result<Json<Value>, AppError> {
    let transaction = ledger
        .withdraw(doctor_id, request.amount)
        .await
        .map_err(map_wallet_error)?;

    Ok(Json(json!({
        "success": true,
        "transaction": transaction,
        "message": "Withdrawal recorded successfully"
    })))
}
