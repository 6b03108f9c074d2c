mod auth;
mod changes;
mod config;
mod database;
mod entities;
mod ops;
mod router;
mod routes;
mod util;

use std::sync::Arc;

use axum_login::tower_sessions::ExpiredDeletion;
use config::Config;
use tokio::net::TcpListener;
use tower_sessions_sqlx_store::PostgresStore;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::util::local_store::LocalStore;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(&config.rust_log))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let (db, pool) = database::setup_database(&config.database_url).await?;
    database::seed_bootstrap_admin(
        &db,
        config.admin_username.as_deref(),
        config.admin_password.as_deref(),
    )
    .await?;

    let session_store = PostgresStore::new(pool);
    session_store.migrate().await?;

    let deletion_task = tokio::task::spawn(
        session_store
            .clone()
            .continuously_delete_expired(tokio::time::Duration::from_secs(60)),
    );

    let store = Arc::new(LocalStore::open(&config.local_store_path)?);

    let app = router::create_router(db, session_store, store).await?;

    let listener = TcpListener::bind(&config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "gramaseva listening");
    axum::serve(listener, app)
        .with_graceful_shutdown(router::shutdown_signal(deletion_task.abort_handle()))
        .await?;

    deletion_task.await??;

    Ok(())
}
