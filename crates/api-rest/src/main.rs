//! Standalone REST API server binary.
//!
//! ## Purpose
//! Runs the REST API server on its own.
//!
//! ## Intended use
//! Useful for development when you want the REST server (with OpenAPI/Swagger UI) without the
//! workspace's `clinica-run` wrapper. Both binaries serve the same router.

use clinica_core::{config::database_path_from_env_value, CoreConfig, Database};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Main entry point for the Clinica REST API server
///
/// # Environment Variables
/// - `CLINICA_REST_ADDR`: Server address (default: "0.0.0.0:3000")
/// - `CLINICA_DATABASE_PATH`: SQLite database file (default: "clinica.db")
///
/// # Errors
/// Returns an error if:
/// - the logging/tracing configuration cannot be initialised,
/// - the database cannot be opened,
/// - the server address cannot be bound, or
/// - the HTTP server fails while running.
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let addr = std::env::var("CLINICA_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());

    let cfg = CoreConfig::new(database_path_from_env_value(
        std::env::var("CLINICA_DATABASE_PATH").ok(),
    ))?;
    let db = Database::open(&cfg)?;

    tracing::info!(
        "-- Starting Clinica REST API on {} (database {})",
        addr,
        cfg.database_path().display()
    );

    let app = api_rest::router(api_rest::AppState::new(db));

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
