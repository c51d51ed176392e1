//! Innkeep server binary

use std::sync::{Arc, Mutex};
use std::time::Duration;

use innkeep_api::AppState;
use innkeep_core::{AuthPolicy, AuthService, Config, Database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Innkeep");

    if let Err(e) = run().await {
        tracing::error!("Server stopped: {}", e);
        std::process::exit(1);
    }
}

async fn run() -> innkeep_core::Result<()> {
    let config = Config::load()?;
    let policy = AuthPolicy::from(&config);

    if let Some(parent) = config.database_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let db = Database::open_with_timeout(&config.database_path, config.busy_timeout())?;
    tracing::info!(
        path = %config.database_path.display(),
        schema_version = db.schema_version(),
        "Database ready"
    );

    if let Some(admin) = &config.bootstrap_admin {
        AuthService::new(&db, policy).bootstrap_admin(admin)?;
    }

    let state = AppState::new(db, policy);
    spawn_session_cleanup(
        state.database(),
        policy,
        Duration::from_secs(config.session_cleanup_secs),
    );

    let listener = tokio::net::TcpListener::bind(config.bind_addr.as_str()).await?;
    tracing::info!(addr = %config.bind_addr, "Listening");

    axum::serve(listener, innkeep_api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Shut down cleanly");
    Ok(())
}

/// Periodically drop expired sessions
fn spawn_session_cleanup(db: Arc<Mutex<Database>>, policy: AuthPolicy, every: Duration) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        loop {
            ticker.tick().await;
            let db = Arc::clone(&db);
            let result = tokio::task::spawn_blocking(move || match db.lock() {
                Ok(db) => AuthService::new(&*db, policy).purge_expired_sessions(),
                Err(_) => {
                    tracing::warn!("Database lock poisoned, skipping session cleanup");
                    Ok(0)
                }
            })
            .await;

            match result {
                Ok(Ok(0)) => {}
                Ok(Ok(removed)) => tracing::debug!(removed, "Expired sessions purged"),
                Ok(Err(e)) => tracing::warn!("Session cleanup failed: {}", e),
                Err(e) => tracing::warn!("Session cleanup task panicked: {}", e),
            }
        }
    });
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown requested");
}
