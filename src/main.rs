use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lexcase_api::broker::{amqp, AmqpBroker, EventPublisher, MemoryBroker, MessageLog};
use lexcase_api::config::AppConfig;
use lexcase_api::database::{schema, Database};
use lexcase_api::{router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present so cargo run picks up DATABASE_URL, JWT_SECRET, etc.
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = AppConfig::from_env().context("failed to load configuration")?;
    info!("Starting Lexcase API in {:?} mode", config.environment);

    let database = Database::connect_lazy(&config.database).context("failed to configure database")?;
    if config.database.migrate_on_start {
        match schema::migrate(database.pool()).await {
            Ok(applied) if applied.is_empty() => info!("Database schema is up to date"),
            Ok(applied) => info!("Applied migrations: {}", applied.join(", ")),
            Err(e) => warn!("Migrations failed, continuing degraded: {}", e),
        }
    }

    let messages = Arc::new(MessageLog::new(config.broker.recent_capacity));
    let broker: Arc<dyn EventPublisher> = if config.broker.enabled {
        tokio::spawn(amqp::run_consumer(config.broker.clone(), messages.clone()));
        Arc::new(AmqpBroker::start(config.broker.clone()).await)
    } else {
        info!("RabbitMQ disabled, user events stay in process");
        Arc::new(MemoryBroker::new(&config.broker, messages.clone()))
    };

    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    let state = AppState::postgres(config, database.clone(), broker, messages)
        .context("invalid security configuration")?;
    let app = router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;
    info!("Lexcase API listening on http://{}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    database.close().await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to install Ctrl+C handler: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
