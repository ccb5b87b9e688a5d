// API Server Binary Entry Point
//
// Purpose: Load the crop model and tables, then start the Axum API server
// Usage: cargo run --bin api_server

use crop_advisor::{create_router, AppState, Config};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Pick up a local .env before anything reads the environment
    let dotenv = dotenvy::dotenv();

    // Initialize tracing (structured logging)
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| {
                    // Default log level: info for our crate, warn for others
                    "crop_advisor=info,tower_http=debug,axum=debug,warn".into()
                }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    match dotenv {
        Ok(path) => tracing::info!("Loaded environment from {:?}", path),
        Err(e) if e.not_found() => {}
        Err(e) => tracing::warn!("Failed to read .env: {}", e),
    }

    tracing::info!("Starting API server...");

    let config = Config::from_env();

    tracing::info!("Configuration:");
    tracing::info!("  MODEL_PATH: {:?}", config.model_path);
    tracing::info!("  DATA_DIR: {:?}", config.data_dir);
    tracing::info!("  PORT: {}", config.port);
    tracing::info!("  GEMINI_MODEL: {}", config.gemini_model);
    tracing::info!("  ADVICE_TIMEOUT: {:?}", config.advice_timeout);
    tracing::info!("  CORS_ORIGINS: {}", config.cors_origins.join(","));

    let port = config.port;

    // Model and tables load before the listener binds; failure exits
    tracing::info!("Initializing application state...");
    let state = AppState::new(config)?;
    tracing::info!("Application state initialized successfully");

    // Create router with all endpoints and middleware
    let app = create_router(state);

    // Bind to address
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Starting server on {}", addr);

    // Start server
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Server listening on {}", addr);

    axum::serve(listener, app)
        .await?;

    Ok(())
}
