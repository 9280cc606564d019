use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use uuid::Uuid;

use shared_utils::{Clock, ManualClock};
use wallet_cell::handlers::{get_transactions, get_wallet, withdraw};
use wallet_cell::models::{SessionKind, SessionRef, TransactionDirection, WithdrawRequest};
use wallet_cell::services::WalletLedgerService;

fn create_test_ledger() -> Arc<WalletLedgerService> {
    let clock = Arc::new(ManualClock::default());
    Arc::new(WalletLedgerService::new(clock as Arc<dyn Clock>))
}

#[tokio::test]
async fn test_get_wallet_unknown_doctor_is_404() {
    let ledger = create_test_ledger();

    let result = get_wallet(State(ledger), Path(Uuid::new_v4())).await;

    assert!(result.is_err());
}

#[tokio::test]
async fn test_get_wallet_after_credits() {
    let ledger = create_test_ledger();
    let doctor_id = Uuid::new_v4();
    ledger
        .credit(doctor_id, 4.0, SessionRef::text(Uuid::new_v4()), 1, "interval 1")
        .await
        .unwrap();

    let response = get_wallet(State(Arc::clone(&ledger)), Path(doctor_id))
        .await
        .unwrap();

    let body = response.0;
    assert_eq!(body["success"], true);
    assert_eq!(body["wallet"]["balance"], 4.0);
    assert_eq!(body["wallet"]["total_earned"], 4.0);
}

#[tokio::test]
async fn test_transaction_history_spans_session_kinds() {
    let ledger = create_test_ledger();
    let doctor_id = Uuid::new_v4();

    ledger
        .credit(doctor_id, 4.0, SessionRef::text(Uuid::new_v4()), 1, "text interval 1")
        .await
        .unwrap();
    let appointment_ref = SessionRef {
        kind: SessionKind::Appointment,
        id: Uuid::new_v4(),
    };
    ledger
        .credit(doctor_id, 6.0, appointment_ref, 1, "appointment settlement")
        .await
        .unwrap();

    let response = get_transactions(State(Arc::clone(&ledger)), Path(doctor_id))
        .await
        .unwrap();
    let body = response.0;

    assert_eq!(body["count"], 2);
    assert_eq!(body["transactions"].as_array().unwrap().len(), 2);

    let wallet = ledger.wallet(doctor_id).await.unwrap();
    assert_eq!(wallet.total_earned, 10.0);
}

#[tokio::test]
async fn test_withdraw_happy_path_and_overdraft() {
    let ledger = create_test_ledger();
    let doctor_id = Uuid::new_v4();
    ledger
        .credit(doctor_id, 12.0, SessionRef::text(Uuid::new_v4()), 1, "interval 1")
        .await
        .unwrap();

    let response = withdraw(
        State(Arc::clone(&ledger)),
        Path(doctor_id),
        Json(WithdrawRequest { amount: 5.0 }),
    )
    .await
    .unwrap();
    let body = response.0;
    assert_eq!(body["success"], true);
    assert_eq!(body["transaction"]["direction"], "debit");

    // overdraft is rejected and the balance is untouched
    let result = withdraw(
        State(Arc::clone(&ledger)),
        Path(doctor_id),
        Json(WithdrawRequest { amount: 100.0 }),
    )
    .await;
    assert!(result.is_err());

    let wallet = ledger.wallet(doctor_id).await.unwrap();
    assert_eq!(wallet.balance, 7.0);
    assert_eq!(wallet.total_withdrawn, 5.0);

    let transactions = ledger.transactions(doctor_id).await;
    assert_eq!(transactions.len(), 2);
    assert_eq!(transactions[0].direction, TransactionDirection::Debit);
}
