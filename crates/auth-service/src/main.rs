//! Token Gate authentication service.
//!
//! Entry point: loads configuration, connects to Postgres, rehashes any
//! legacy plaintext passwords, starts the token expiry sweep, and serves
//! the HTTP API until a shutdown signal arrives.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use auth_service::config::Config;
use auth_service::handlers::account_handler::AppState;
use auth_service::middleware::auth::AuthFilterState;
use auth_service::routes;
use auth_service::services::account::AccountService;
use auth_service::services::authentication::Authenticator;
use auth_service::services::tokens::TokenQueryService;
use auth_service::store::postgres::{PgCredentialStore, PgTokenStore};
use auth_service::store::{CredentialStore, TokenStore};
use auth_service::tasks::token_sweep::{self, SweepConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "auth_service=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Token Gate");

    let config = Config::from_env().map_err(|e| {
        error!("Failed to load configuration: {}", e);
        e
    })?;

    info!(
        bind_address = %config.bind_address,
        token_ttl_minutes = config.token_ttl_minutes,
        sweep_interval_seconds = config.sweep_interval_seconds,
        "Configuration loaded successfully"
    );

    info!("Connecting to database...");
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .idle_timeout(Duration::from_secs(600))
        .connect(&config.database_url)
        .await
        .map_err(|e| {
            error!("Failed to connect to database: {}", e);
            e
        })?;

    sqlx::migrate!("../../migrations").run(&pool).await?;
    info!("Database connection established");

    let credentials: Arc<dyn CredentialStore> = Arc::new(PgCredentialStore::new(pool.clone()));
    let tokens: Arc<dyn TokenStore> = Arc::new(PgTokenStore::new(pool));

    let accounts = Arc::new(AccountService::new(
        Arc::clone(&credentials),
        Arc::clone(&tokens),
        config.secret_key.clone(),
        config.bcrypt_cost,
    ));

    // One-time migration of plaintext password rows to bcrypt.
    let rehashed = accounts.rehash_legacy_passwords().await?;
    if rehashed > 0 {
        info!(count = rehashed, "Migrated legacy passwords to bcrypt");
    }

    let authenticator = Arc::new(Authenticator::standard(
        Arc::clone(&credentials),
        Arc::clone(&tokens),
        config.secret_key.clone(),
    ));

    let state = AppState {
        accounts,
        tokens: Arc::new(TokenQueryService::new(Arc::clone(&tokens))),
    };
    let filter_state = AuthFilterState { authenticator };

    let app = routes::build_routes(state, filter_state);

    let cancel_token = CancellationToken::new();
    let sweep_handle = tokio::spawn(token_sweep::start_token_sweep(
        tokens,
        SweepConfig::new(config.sweep_interval_seconds, config.token_ttl_minutes),
        cancel_token.clone(),
    ));

    let addr: SocketAddr = config.bind_address.parse().map_err(|e| {
        error!("Invalid bind address: {}", e);
        e
    })?;

    info!("Token Gate listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    cancel_token.cancel();
    if let Err(e) = sweep_handle.await {
        error!("Token sweep task failed to stop cleanly: {}", e);
    }

    info!("Token Gate shutdown complete");
    Ok(())
}

/// Listens for shutdown signals (SIGTERM, SIGINT).
async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received SIGINT, starting graceful shutdown..."),
            Err(e) => error!("Failed to listen for SIGINT: {}", e),
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received SIGTERM, starting graceful shutdown...");
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
