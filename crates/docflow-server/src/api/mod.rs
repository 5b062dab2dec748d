pub mod auth;
pub mod documents;

use axum::Router;

use docflow_core::AppState;

pub use auth::CurrentActor;

/// Build the complete API router with all sub-routes.
pub fn api_router() -> Router<AppState> {
    Router::new()
        .nest("/api/documents", documents::router())
        .nest("/api/auth", auth::router())
}
