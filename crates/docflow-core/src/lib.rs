//! Docflow Core: transport-agnostic logic for the sequential document
//! approval workflow.
//!
//! This crate contains the data models, the SQLite-backed stores, role
//! resolution, the access policy and the workflow state machine. It has
//! **no HTTP framework dependency** by default, so the same logic backs:
//!
//! - the HTTP server (via `docflow-server`)
//! - the `docflow` CLI
//!
//! # Feature Flags
//!
//! - `axum`: enables the `IntoResponse` impl on `ServerError` for use in axum handlers.

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod models;
pub mod state;
pub mod store;
pub mod workflow;

// Convenience re-exports
pub use config::CoreConfig;
pub use db::Database;
pub use error::{ServerError, WorkflowError};
pub use state::{AppState, AppStateInner};
