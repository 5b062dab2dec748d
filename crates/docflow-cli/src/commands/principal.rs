//! `docflow principal`: provision users and mint tokens for local use.
//!
//! Production deployments get principals and tokens from the identity
//! service that shares the database and JWT secret.

use docflow_core::auth::Actor;
use docflow_core::models::Principal;
use docflow_core::AppState;
use serde_json::{json, Value};

fn describe(actor: &Actor) -> Value {
    json!({
        "id": actor.principal.id,
        "username": actor.principal.username,
        "email": actor.principal.email,
        "groups": actor.principal.groups,
        "role": actor.role,
        "role_name": actor.role.to_string(),
    })
}

async fn load(state: &AppState, id: &str) -> Result<Principal, String> {
    state
        .principal_store
        .get(id)
        .await
        .map_err(|e| e.to_string())?
        .ok_or_else(|| format!("Principal {} not found", id))
}

/// Create or replace a principal and its group memberships.
pub async fn add(
    state: &AppState,
    id: &str,
    username: &str,
    email: Option<&str>,
    groups: Vec<String>,
) -> Result<Value, String> {
    let mut principal = Principal::new(id.to_string(), username.to_string(), email.map(String::from));
    principal.groups = groups;
    state
        .principal_store
        .save(&principal)
        .await
        .map_err(|e| e.to_string())?;
    Ok(describe(&Actor::new(principal)))
}

/// Add one more group to an existing principal.
pub async fn join(state: &AppState, id: &str, group: &str) -> Result<Value, String> {
    load(state, id).await?;
    state
        .principal_store
        .add_to_group(id, group)
        .await
        .map_err(|e| e.to_string())?;
    Ok(describe(&Actor::new(load(state, id).await?)))
}

pub async fn show(state: &AppState, id: &str) -> Result<Value, String> {
    Ok(describe(&Actor::new(load(state, id).await?)))
}

/// Sign a bearer token for an existing principal.
pub async fn token(state: &AppState, id: &str, ttl_hours: i64) -> Result<Value, String> {
    let expires_in = ttl_hours
        .checked_mul(3600)
        .filter(|secs| *secs > 0)
        .ok_or_else(|| format!("Invalid token lifetime: {} hours", ttl_hours))?;
    let ttl = chrono::Duration::try_hours(ttl_hours)
        .ok_or_else(|| format!("Invalid token lifetime: {} hours", ttl_hours))?;
    load(state, id).await?;
    let token = state.tokens.issue(id, ttl).map_err(|e| e.to_string())?;
    Ok(json!({ "token": token, "expires_in": expires_in }))
}
