//! Shared application state for the axum server and the CLI.

use std::sync::Arc;

use crate::auth::{bearer_token, Actor, TokenVerifier};
use crate::config::CoreConfig;
use crate::db::Database;
use crate::error::ServerError;
use crate::store::{ApprovalStore, DocumentStore, PrincipalStore};
use crate::workflow::WorkflowService;

/// Shared state accessible by all API handlers.
pub struct AppStateInner {
    pub db: Database,
    pub document_store: DocumentStore,
    pub approval_store: ApprovalStore,
    pub principal_store: PrincipalStore,
    pub workflow: WorkflowService,
    pub tokens: TokenVerifier,
}

pub type AppState = Arc<AppStateInner>;

impl AppStateInner {
    pub fn new(db: Database, config: &CoreConfig) -> Self {
        Self {
            document_store: DocumentStore::new(db.clone()),
            approval_store: ApprovalStore::new(db.clone()),
            principal_store: PrincipalStore::new(db.clone()),
            workflow: WorkflowService::new(db.clone(), config.lock_timeout),
            tokens: TokenVerifier::new(&config.jwt_secret, config.jwt_issuer.clone()),
            db,
        }
    }

    /// Resolve the caller behind an `Authorization` header.
    ///
    /// The role is derived from the principal's current group memberships on
    /// every request.
    pub async fn authenticate(&self, authorization: Option<&str>) -> Result<Actor, ServerError> {
        let token = authorization
            .and_then(bearer_token)
            .ok_or_else(|| ServerError::Unauthorized("Missing bearer token".into()))?;
        let claims = self.tokens.verify(token)?;
        let principal = self
            .principal_store
            .get(&claims.sub)
            .await?
            .ok_or_else(|| ServerError::Unauthorized(format!("Unknown principal {}", claims.sub)))?;
        Ok(Actor::new(principal))
    }
}
