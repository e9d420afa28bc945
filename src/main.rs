use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use mandato_pro::config::AppConfig;
use mandato_pro::database::Database;
use mandato_pro::routes::build_router;
use mandato_pro::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "mandato_pro=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting MandatoPro");

    let config = AppConfig::load().context("failed to load configuration")?;
    info!("Configuration loaded");
    if config.uses_default_secret() {
        warn!("Using the built-in JWT secret; set MANDATO_JWT_SECRET in production");
    }

    let database = Database::new(&config.database_url).await?;
    info!("Database connected");

    database.run_migrations().await?;
    info!("Database migrations completed");

    tokio::fs::create_dir_all(&config.documents_dir)
        .await
        .with_context(|| format!("failed to create {}", config.documents_dir))?;

    let addr = format!("{}:{}", config.server_host, config.server_port);
    let state = AppState::new(config, database)?;
    info!("Messaging gateway: {}", state.gateway.name());

    let app = build_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!("Server listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
