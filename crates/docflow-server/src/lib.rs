//! Docflow Server: HTTP front end for the document approval workflow.
//!
//! Provides:
//! - a JSON REST API via axum, authenticated with bearer JWTs
//! - SQLite persistence through `docflow-core`
//!
//! The crate can be embedded (see [`start_server_with_state`]) or run through
//! the `docflow server` CLI command.

pub mod api;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

pub use docflow_core::{AppState, AppStateInner, CoreConfig, Database};

/// Configuration for the Docflow HTTP server.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub db_path: String,
    pub core: CoreConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 3210,
            db_path: "docflow.db".to_string(),
            core: CoreConfig::default(),
        }
    }
}

/// Create a shared `AppState` from a database path.
pub async fn create_app_state(db_path: &str, core: &CoreConfig) -> Result<AppState, String> {
    let db = Database::open(db_path).map_err(|e| format!("Failed to open database: {}", e))?;
    Ok(Arc::new(AppStateInner::new(db, core)))
}

/// Start the HTTP server.
///
/// Returns the actual address the server is listening on.
pub async fn start_server(config: ServerConfig) -> Result<SocketAddr, String> {
    // Ignore the error if the embedding binary already installed a subscriber.
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "docflow_server=info,docflow_core=info,tower_http=info".into()
            }),
        )
        .try_init();

    if config.core.jwt_secret.is_empty() {
        return Err("A JWT secret is required to start the server".to_string());
    }

    tracing::info!(
        "Starting Docflow server on {}:{}",
        config.host,
        config.port
    );

    let state = create_app_state(&config.db_path, &config.core).await?;

    start_server_with_state(config, state).await
}

/// Build the application router around `state`.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(api::api_router())
        .route("/api/health", axum::routing::get(health_check))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the HTTP server with a pre-built `AppState`.
pub async fn start_server_with_state(
    config: ServerConfig,
    state: AppState,
) -> Result<SocketAddr, String> {
    let app = app(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .map_err(|e| format!("Invalid address: {}", e))?;

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| format!("Failed to bind to {}: {}", addr, e))?;

    let local_addr = listener
        .local_addr()
        .map_err(|e| format!("Failed to get local address: {}", e))?;

    tracing::info!("Docflow server listening on {}", local_addr);

    // Spawn the server in a background task
    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!("Server error: {}", e);
        }
    });

    Ok(local_addr)
}

async fn health_check() -> axum::Json<serde_json::Value> {
    axum::Json(serde_json::json!({
        "status": "ok",
        "server": "docflow-server",
        "version": env!("CARGO_PKG_VERSION"),
    }))
}
