use std::sync::Arc;

use axum::{routing::get, Router};

use text_session_cell::router::text_session_routes;
use text_session_cell::services::SessionLifecycleService;
use wallet_cell::router::wallet_routes;
use wallet_cell::services::WalletLedgerService;

pub fn create_router(
    lifecycle: Arc<SessionLifecycleService>,
    ledger: Arc<WalletLedgerService>,
) -> Router {
    Router::new()
        .route("/", get(|| async { "Text session API is running!" }))
        .nest("/text-sessions", text_session_routes(lifecycle))
        .nest("/wallets", wallet_routes(ledger))
}
