// Main entry point for the lead API server

use std::sync::Arc;

use anyhow::{Context, Result};
use leadgen_core::common::LEADS_EXCHANGE;
use leadgen_core::domains::discovery::PgCursorStore;
use leadgen_core::domains::leads::PgLeadStore;
use leadgen_core::kernel::{BroadcastBus, GooglePlacesDirectory, JetStreamBus, ServerDeps};
use leadgen_core::{server::build_app, Config};
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,leadgen_core=debug,sqlx=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting lead API");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    tracing::info!("Configuration loaded");

    // Connect to database
    tracing::info!("Connecting to database...");
    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(&config.database_url)
        .await
        .context("Failed to connect to database")?;
    tracing::info!("Database connected");

    // Run migrations
    tracing::info!("Running database migrations...");
    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;
    tracing::info!("Migrations complete");

    // Broker connection is owned by this process and flushed on shutdown
    let bus = Arc::new(JetStreamBus::connect(&config.nats_url).await?);
    bus.declare_exchange(LEADS_EXCHANGE).await?;

    let deps = ServerDeps {
        lead_store: Arc::new(PgLeadStore::new(pool.clone())),
        cursor_store: Arc::new(PgCursorStore::new(pool)),
        directory: Arc::new(GooglePlacesDirectory::new(
            config.google_places_api_key,
            config.places_timeout,
        )),
        bus: bus.clone(),
        page_delay: config.page_delay,
    };

    let app = build_app(deps);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Starting server on {}", addr);
    tracing::info!("Health check: http://localhost:{}/health", config.port);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .context("Failed to bind to address")?;

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("Received shutdown signal");
        })
        .await
        .context("Server error")?;

    bus.close().await?;
    Ok(())
}
