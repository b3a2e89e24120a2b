use std::{net::SocketAddr, sync::Arc, time::Duration};

use tokio::signal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use centralauth_backend::{
    config::{mask_database_url, mask_secret, Config},
    db::{create_pool, run_migrations},
    repositories::PgStore,
    routes::build_router,
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "centralauth_backend=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // A missing signing key fails here, before anything is served.
    let config = Config::load()?;
    tracing::info!(
        server_addr = %config.server_addr,
        database_url = %mask_database_url(&config.database_url),
        jwt_secret = %mask_secret(&config.jwt_secret),
        access_token_ttl_minutes = config.access_token_ttl_minutes,
        session_ttl_days = config.session_ttl_days,
        cookie_secure = config.cookie_secure,
        trust_proxy_headers = config.trust_proxy_headers,
        "Loaded configuration from environment/.env"
    );
    if !config.cookie_secure {
        tracing::warn!("COOKIE_SECURE is disabled; cookies will be sent over plain HTTP");
    }

    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let state = AppState::from_config(&config, Arc::new(PgStore::new(pool)))?;
    let app = build_router(state, &config.cors_allow_origins);

    let addr: SocketAddr = config.server_addr.parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal(Duration::from_secs(
        config.shutdown_grace_seconds,
    )))
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM. In-flight requests then get `grace` to finish before the
/// process exits regardless.
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            tracing::error!(error = %err, "Failed to listen for Ctrl+C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(err) => {
                tracing::error!(error = %err, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!(grace_seconds = grace.as_secs(), "Shutdown signal received, draining connections");
    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        tracing::warn!("Grace period elapsed, exiting");
        std::process::exit(0);
    });
}
