use clinica_core::{config::database_path_from_env_value, CoreConfig, Database};
use std::net::SocketAddr;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_REST_ADDR: &str = "0.0.0.0:3000";

/// Main entry point for the Clinica application
///
/// Opens the SQLite database and serves the REST API (with Swagger UI at `/swagger-ui`).
/// Callers authenticate with an `x-api-key` header; issue keys with `clinica seed` or
/// `clinica issue-key`.
///
/// # Environment Variables
/// - `CLINICA_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `CLINICA_DATABASE_PATH`: SQLite database file (default: "clinica.db")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or the server fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("clinica=info".parse()?)
                .add_directive("api_rest=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = rest_addr_from_env_value(std::env::var("CLINICA_REST_ADDR").ok())?;
    let cfg = CoreConfig::new(database_path_from_env_value(
        std::env::var("CLINICA_DATABASE_PATH").ok(),
    ))?;
    let db = Database::open(&cfg)?;

    tracing::info!("++ Using database {}", cfg.database_path().display());
    tracing::info!("++ Starting Clinica REST on {}", rest_addr);

    let app = api_rest::router(api_rest::AppState::new(db));
    let listener = tokio::net::TcpListener::bind(rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn rest_addr_from_env_value(value: Option<String>) -> anyhow::Result<SocketAddr> {
    let raw = value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_REST_ADDR.into());
    raw.parse()
        .map_err(|e| anyhow::anyhow!("invalid CLINICA_REST_ADDR {raw:?}: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rest_addr_defaults_when_unset_or_blank() {
        let expected: SocketAddr = DEFAULT_REST_ADDR.parse().unwrap();
        assert_eq!(rest_addr_from_env_value(None).unwrap(), expected);
        assert_eq!(rest_addr_from_env_value(Some("  ".into())).unwrap(), expected);
    }

    #[test]
    fn rest_addr_rejects_garbage() {
        assert!(rest_addr_from_env_value(Some("127.0.0.1:8080".into())).is_ok());
        assert!(rest_addr_from_env_value(Some("not-an-addr".into())).is_err());
    }
}
