//! Core error types for the Docflow platform.
//!
//! `WorkflowError` is produced by the pure state machine when a request
//! violates workflow position or policy. `ServerError` is used throughout the
//! rest of the core domain (stores, service, auth). When the `axum` feature is
//! enabled, `ServerError` also implements `IntoResponse` so it can be used
//! directly as an axum handler error type.

/// Workflow and policy violations. Always surfaced to the caller with the
/// specific reason; never used for normal "not yet complete" outcomes.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WorkflowError {
    #[error("Role {role} may not modify this document")]
    Forbidden { role: String },

    #[error("Role is assigned to step {assigned} but the document is at step {current}")]
    StepMismatch { assigned: u8, current: u8 },

    #[error("Document is in {actual} stage, expected {expected}")]
    StageMismatch { expected: String, actual: String },

    #[error("You are not an approver for this document")]
    NotAnApprover,

    #[error("Invalid approval action: {0}")]
    InvalidAction(String),

    #[error("Field {field} exceeds {max} characters")]
    FieldTooLong { field: String, max: usize },
}

impl WorkflowError {
    /// Stable machine-readable code used in error bodies.
    pub fn code(&self) -> &'static str {
        match self {
            Self::Forbidden { .. } => "FORBIDDEN",
            Self::StepMismatch { .. } => "STEP_MISMATCH",
            Self::StageMismatch { .. } => "STAGE_MISMATCH",
            Self::NotAnApprover => "NOT_AN_APPROVER",
            Self::InvalidAction(_) => "INVALID_ACTION",
            Self::FieldTooLong { .. } => "FIELD_TOO_LONG",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    Workflow(#[from] WorkflowError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::Database(_) => "DATABASE",
            Self::NotFound(_) => "NOT_FOUND",
            Self::BadRequest(_) => "BAD_REQUEST",
            Self::Conflict(_) => "CONFLICT",
            Self::Unauthorized(_) => "UNAUTHORIZED",
            Self::Workflow(e) => e.code(),
            Self::Internal(_) => "INTERNAL",
        }
    }
}

impl From<rusqlite::Error> for ServerError {
    fn from(e: rusqlite::Error) -> Self {
        ServerError::Database(e.to_string())
    }
}

// ---------------------------------------------------------------------------
// axum integration (opt-in via feature flag)
// ---------------------------------------------------------------------------

#[cfg(feature = "axum")]
impl axum::response::IntoResponse for ServerError {
    fn into_response(self) -> axum::response::Response {
        use axum::http::StatusCode;

        let status = match &self {
            ServerError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::NotFound(_) => StatusCode::NOT_FOUND,
            ServerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ServerError::Conflict(_) => StatusCode::CONFLICT,
            ServerError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ServerError::Workflow(e) => match e {
                WorkflowError::Forbidden { .. }
                | WorkflowError::StepMismatch { .. }
                | WorkflowError::NotAnApprover => StatusCode::FORBIDDEN,
                WorkflowError::StageMismatch { .. }
                | WorkflowError::InvalidAction(_)
                | WorkflowError::FieldTooLong { .. } => StatusCode::BAD_REQUEST,
            },
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };

        if status.is_server_error() {
            tracing::error!("Request failed: {}", self);
        } else {
            tracing::warn!("Request rejected ({}): {}", self.code(), self);
        }

        let body = serde_json::json!({ "error": self.to_string(), "code": self.code() });
        (status, axum::Json(body)).into_response()
    }
}
