use std::net::SocketAddr;
use std::sync::Arc;

use chrono::Duration;
use statuspage_api::auth::jwt::Hs256Keyring;
use statuspage_api::auth::password::Argon2Hasher;
use statuspage_api::auth::service::AuthService;
use statuspage_api::config::{DatabaseConfig, LogFormat, ServerConfig};
use statuspage_api::router::build_app_router;
use statuspage_api::background;
use statuspage_api::services::events::EventService;
use statuspage_api::services::subscriptions::SubscriptionService;
use statuspage_api::state::AppState;
use statuspage_db::PgStore;
use statuspage_events::{
    Dispatcher, EmailConfig, EmailSender, Sender, TelegramConfig, TelegramSender,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    let database = DatabaseConfig::from_env();

    // --- Tracing ---
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "statuspage_api=debug,tower_http=debug".into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let pool = statuspage_db::create_pool(&database.url, database.max_connections)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    statuspage_db::health_check(&pool)
        .await
        .expect("Database health check failed");
    tracing::info!("Database health check passed");

    statuspage_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    let store = Arc::new(PgStore::new(pool));

    // --- Notification senders ---
    let email = EmailSender::new(EmailConfig::from_env()).expect("Invalid SMTP configuration");
    let telegram =
        TelegramSender::new(TelegramConfig::from_env()).expect("Failed to build Telegram client");
    tracing::info!(
        email = email.is_configured(),
        telegram = telegram.is_configured(),
        "Notification senders ready (unconfigured senders only log)"
    );
    let senders: Vec<Arc<dyn Sender>> = vec![Arc::new(email), Arc::new(telegram)];
    let dispatcher = Arc::new(Dispatcher::new(store.clone(), senders));

    // --- Services ---
    let hasher = Argon2Hasher::new(config.password).expect("Invalid password hashing parameters");
    let auth = AuthService::new(
        store.clone(),
        Arc::new(Hs256Keyring::new(&config.jwt)),
        hasher,
        Duration::days(config.jwt.refresh_token_expiry_days),
    );
    let events = EventService::new(store.clone(), Some(dispatcher));
    let subscriptions = SubscriptionService::new(store.clone());

    // --- Background tasks ---
    let cleanup_cancel = CancellationToken::new();
    let cleanup_handle = tokio::spawn(background::token_cleanup::run(
        store.clone(),
        std::time::Duration::from_secs(config.token_cleanup_interval_secs),
        cleanup_cancel.clone(),
    ));

    // --- App state ---
    let state = AppState {
        auth: Arc::new(auth),
        events: Arc::new(events),
        subscriptions: Arc::new(subscriptions),
        health: store,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    cleanup_cancel.cancel();
    let _ = tokio::time::timeout(std::time::Duration::from_secs(5), cleanup_handle).await;
    tracing::info!("Background tasks stopped");

    tracing::info!("Graceful shutdown complete");
}

/// Wait for a termination signal to initiate graceful shutdown.
///
/// Handles both SIGINT (Ctrl-C) and SIGTERM (on Unix) so the server
/// shuts down cleanly whether stopped interactively or by a process manager.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
