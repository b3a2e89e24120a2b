use chrono::Utc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use centralauth_backend::{
    config::Config,
    db::{create_pool, run_migrations},
    repositories::{PgStore, SessionStore},
};

/// Purges sessions that have been dead for longer than the retention window. Refresh and logout
/// never rely on this having run.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "centralauth_backend=info,session_cleanup=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::load()?;
    let pool = create_pool(&config.database_url).await?;
    run_migrations(&pool).await?;

    let cutoff = Utc::now() - config.session_retention();
    let store = PgStore::new(pool);
    let purged = store.purge_sessions(cutoff).await?;
    tracing::info!(
        purged,
        retention_days = config.session_retention_days,
        %cutoff,
        "Purged stale sessions"
    );

    sqlx::query("VACUUM (ANALYZE) sessions")
        .execute(store.pool())
        .await?;

    Ok(())
}
