//! sanad HTTP server binary.
//!
//! Starts the axum server that fronts the companion chat service: quota
//! gating, engine selection, reply shaping, and deferred bookkeeping.
//!
//! # Environment Variables
//!
//! - `PORT` — HTTP port (default: 8080)
//! - `LEDGER_BACKEND` — Usage ledger: "sqlite" (default), "memory", or "postgres"
//! - `SQLITE_PATH` — SQLite ledger path (default: ./data/usage.db)
//! - `DATABASE_URL` — PostgreSQL connection string (required if LEDGER_BACKEND=postgres)
//! - `COMPLETION_API_KEY` — Completion API key (falls back to XAI_API_KEY)
//! - `COMPLETION_BASE_URL` — Completion API base URL (default: https://api.x.ai/v1)
//! - `FAST_MODEL` / `DEEP_MODEL` — Model names per engine tier
//! - `BOOKKEEPING_URL` — Internal bookkeeping API; unset runs the in-crate fallbacks
//! - `RUST_LOG` — Tracing filter (default: "info,sanad=debug")
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin server
//! # or with postgres:
//! cargo run --bin server --features postgres
//! ```

use std::sync::Arc;

use sanad::background::{BackgroundQueue, BackgroundServices};
use sanad::chat::ChatService;
use sanad::config::{AppConfig, LedgerBackend};
use sanad::ledger::{LedgerStore, MemoryLedger, SqliteLedger};
use sanad::limiter::Limiter;
use sanad::providers::http::HttpBookkeeping;
use sanad::providers::{
    CompletionProvider, ConversationTracker, EmotionClassifier, FixedTrust,
    HttpClassifier, HttpCompletion, NeutralClassifier, NullTracker, TrustService,
};
use sanad::server::{app_router, AppState};

#[tokio::main]
async fn main() {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,sanad=debug".into()),
        )
        .init();

    let config = Arc::new(AppConfig::from_env());
    let bind_addr = format!("0.0.0.0:{}", config.port);

    let store = build_store(&config).await;
    let http = config.http_client();

    let completion: Arc<dyn CompletionProvider> = Arc::new(HttpCompletion::new(
        http.clone(),
        config.completion_base_url.clone(),
        config.completion_api_key.clone(),
        config.fast_model.clone(),
        config.deep_model.clone(),
    ));
    let classifier: Arc<dyn EmotionClassifier> = if config.completion_api_key.is_empty() {
        tracing::warn!("COMPLETION_API_KEY not set; classifier reads everything as neutral");
        Arc::new(NeutralClassifier)
    } else {
        Arc::new(HttpClassifier::new(
            http.clone(),
            config.completion_base_url.clone(),
            config.completion_api_key.clone(),
            config.fast_model.clone(),
        ))
    };

    let (tracker, trust, services) = build_bookkeeping(&config, &http);

    let queue = BackgroundQueue::spawn(services);
    let service = ChatService::new(
        config.clone(),
        Limiter::new(store),
        classifier,
        completion,
        tracker,
        trust,
        queue.handle(),
    );
    let app = app_router(AppState::new(service));

    tracing::info!("sanad server starting on {}", bind_addr);
    tracing::info!("Endpoints:");
    tracing::info!("  GET  /health           — liveness probe");
    tracing::info!("  POST /chat             — handle one chat message");
    tracing::info!("  GET  /usage/{{user_id}} — quota standing");

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .expect("Failed to bind");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server failed");

    // Serving is done and the router is gone, so every queue handle is
    // dropped; closing now drains whatever bookkeeping is still pending.
    queue.close().await;
    tracing::info!("shutdown complete");
}

/// Pick and open the usage-ledger backend.
async fn build_store(config: &AppConfig) -> Arc<dyn LedgerStore> {
    match config.ledger_backend {
        LedgerBackend::Memory => {
            tracing::info!("usage ledger: in-memory (counts reset on restart)");
            Arc::new(MemoryLedger::new())
        }
        LedgerBackend::Sqlite => {
            tracing::info!(path = %config.sqlite_path, "usage ledger: sqlite");
            match SqliteLedger::new(config.sqlite_path.clone().into()) {
                Ok(ledger) => Arc::new(ledger),
                Err(e) => {
                    tracing::error!("Failed to open SQLite ledger: {}", e);
                    std::process::exit(1);
                }
            }
        }
        LedgerBackend::Postgres => postgres_store(config).await,
    }
}

#[cfg(feature = "postgres")]
async fn postgres_store(config: &AppConfig) -> Arc<dyn LedgerStore> {
    use sanad::ledger::PgLedger;

    if config.database_url.is_empty() {
        tracing::error!("LEDGER_BACKEND=postgres but DATABASE_URL not set");
        std::process::exit(1);
    }
    tracing::info!("usage ledger: postgres");
    match sqlx::PgPool::connect(&config.database_url).await {
        Ok(pool) => {
            let ledger = PgLedger::new(pool);
            if let Err(e) = ledger.migrate().await {
                tracing::error!("Failed to migrate usage ledger: {}", e);
                std::process::exit(1);
            }
            Arc::new(ledger)
        }
        Err(e) => {
            tracing::error!("Failed to connect to PostgreSQL: {}", e);
            std::process::exit(1);
        }
    }
}

#[cfg(not(feature = "postgres"))]
async fn postgres_store(_config: &AppConfig) -> Arc<dyn LedgerStore> {
    tracing::error!("LEDGER_BACKEND=postgres requires building with --features postgres");
    std::process::exit(1);
}

/// Wire the bookkeeping collaborators: the real HTTP client when an URL is
/// configured, the in-crate fallbacks otherwise.
fn build_bookkeeping(
    config: &AppConfig,
    http: &reqwest::Client,
) -> (
    Arc<dyn ConversationTracker>,
    Arc<dyn TrustService>,
    BackgroundServices,
) {
    match &config.bookkeeping_url {
        Some(url) => {
            let book = Arc::new(HttpBookkeeping::new(
                http.clone(),
                url.clone(),
                config.bookkeeping_api_key.clone(),
            ));
            (
                book.clone() as Arc<dyn ConversationTracker>,
                book.clone() as Arc<dyn TrustService>,
                BackgroundServices {
                    trust: Some(book.clone()),
                    timeline: Some(book.clone()),
                    memory: Some(book),
                },
            )
        }
        None => {
            tracing::warn!(
                "BOOKKEEPING_URL not set; trust, timeline, and memory run as no-ops"
            );
            (
                Arc::new(NullTracker) as Arc<dyn ConversationTracker>,
                Arc::new(FixedTrust::default()) as Arc<dyn TrustService>,
                BackgroundServices::default(),
            )
        }
    }
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!("shutdown signal received"),
        Err(e) => tracing::error!("Failed to listen for shutdown signal: {}", e),
    }
}
