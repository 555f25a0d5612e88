use mimalloc::MiMalloc;
use tokio::net::TcpListener;
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use roster_admin::config::{Config, DEFAULT_CONFIG_FILE};
use roster_admin::db::RosterStorage;
use roster_admin::server::{RosterState, roster_router};

#[global_allocator]
static GLOBAL: MiMalloc = MiMalloc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let cfg = Config::load(DEFAULT_CONFIG_FILE)?;

    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cfg.basic.loglevel.clone()));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_level(true)
                .with_target(false),
        )
        .init();

    info!(
        database_url = %cfg.basic.database_url,
        listen_addr = %cfg.basic.listen_addr,
        loglevel = %cfg.basic.loglevel,
        insecure_cookie = cfg.basic.insecure_cookie
    );

    let storage =
        RosterStorage::connect(&cfg.basic.database_url, cfg.basic.max_connections).await?;
    storage.init_schema().await?;

    match cfg.bootstrap.admin_password.as_deref() {
        Some(password) if !password.is_empty() => {
            storage
                .ensure_admin(&cfg.bootstrap.admin_username, password)
                .await?;
        }
        _ => info!("no bootstrap admin password configured"),
    }

    let state = RosterState::new(storage, &cfg.basic)?;
    let app = roster_router(state);

    let listener = TcpListener::bind(&cfg.basic.listen_addr).await?;
    info!("HTTP server listening on {}", cfg.basic.listen_addr);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!(error = %e, "failed to listen for ctrl-c; running until killed");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
