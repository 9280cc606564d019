use std::net::SocketAddr;
use std::sync::Arc;

use dotenv::dotenv;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::{self, TraceLayer};
use tracing::{info, Level};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod router;

use shared_config::AppConfig;
use shared_utils::{Clock, SystemClock};
use text_session_cell::services::notify::TracingEventSink;
use text_session_cell::services::{
    BillingEngine, ExpirationSweeper, SessionLifecycleService, SessionTimingRules,
};
use text_session_cell::store::SessionStore;
use wallet_cell::services::{SubscriptionAccountService, WalletLedgerService};

#[tokio::main]
async fn main() {
    // Loading Env Vars
    dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info,tower_http=debug".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting text session API server");

    // Load configuration
    let config = AppConfig::from_env();

    // Set up CORS
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // Wire up shared services
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let store = Arc::new(SessionStore::new());
    let ledger = Arc::new(WalletLedgerService::new(Arc::clone(&clock)));
    let subscriptions = Arc::new(SubscriptionAccountService::new());
    let billing = Arc::new(BillingEngine::new(
        Arc::clone(&ledger),
        Arc::clone(&subscriptions),
        &config,
    ));
    let lifecycle = Arc::new(SessionLifecycleService::new(
        store,
        billing,
        Arc::clone(&subscriptions),
        Arc::new(TracingEventSink),
        Arc::clone(&clock),
        SessionTimingRules::from_config(&config),
    ));

    // Background deadline enforcement
    let sweeper = Arc::new(ExpirationSweeper::new(
        Arc::clone(&lifecycle),
        config.sweep_interval_seconds,
    ));
    let sweeper_handle = Arc::clone(&sweeper).start();

    // Build the application router
    let app = router::create_router(lifecycle, ledger)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(trace::DefaultMakeSpan::new().level(Level::INFO))
                .on_response(trace::DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors);

    // Run the server
    let addr = SocketAddr::from(([0, 0, 0, 0], 3000));
    info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
        })
        .await
        .unwrap();

    sweeper.shutdown().await;
    sweeper_handle.abort();
}
