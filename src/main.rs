//! Roster Rumble - Application Entry Point

use std::{net::SocketAddr, sync::Arc};

use tokio::{net::TcpListener, signal};
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use roster_rumble::{
    app,
    config::{Config, ServerConfig},
    db::{self, repositories::ContestRepository},
    services::{AmqpPublisher, JwtManager, RedisCache},
    state::AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::from_env()?;
    init_tracing(&config.server);

    info!("Starting Roster Rumble contest API...");

    info!("Connecting to database...");
    let pool = db::create_pool(&config.database).await?;
    db::test_connection(&pool).await?;

    info!("Running database migrations...");
    db::run_migrations(&pool).await?;

    // Redis and the broker are both dialled on first use
    let cache = RedisCache::new(config.redis.connection.clone())?;
    let events = AmqpPublisher::new(config.broker.url.clone());
    let jwt = JwtManager::new(&config.jwt.secret, config.jwt.expiry_hours);

    let state = AppState::new(
        Arc::new(ContestRepository::new(pool.clone())),
        Arc::new(cache),
        Arc::new(events),
        jwt,
    );

    let addr = SocketAddr::new(config.server.host.parse()?, config.server.port);
    let listener = TcpListener::bind(addr).await?;

    info!("Server listening on http://{}", addr);

    axum::serve(listener, app(state))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    pool.close().await;
    info!("Server stopped");

    Ok(())
}

fn init_tracing(server: &ServerConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&server.rust_log));
    let registry = tracing_subscriber::registry().with(filter);

    if server.json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to install Ctrl+C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
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
}
