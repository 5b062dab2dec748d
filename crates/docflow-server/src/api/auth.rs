//! Bearer authentication and the current-user endpoint.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
    routing::get,
    Json, Router,
};

use docflow_core::auth::Actor;
use docflow_core::{AppState, ServerError};

pub fn router() -> Router<AppState> {
    Router::new().route("/current-user", get(current_user))
}

/// The authenticated caller, resolved from the `Authorization` header.
///
/// Rejects with `401` when the token is missing, invalid or names an unknown
/// principal.
pub struct CurrentActor(pub Actor);

impl FromRequestParts<AppState> for CurrentActor {
    type Rejection = ServerError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let header = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|v| v.to_str().ok());
        let actor = state.authenticate(header).await?;
        tracing::debug!(
            "Authenticated {} as {}",
            actor.principal.username,
            actor.role
        );
        Ok(CurrentActor(actor))
    }
}

async fn current_user(CurrentActor(actor): CurrentActor) -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "id": actor.principal.id,
        "username": actor.principal.username,
        "email": actor.principal.email,
        "role": actor.role,
    }))
}
