//! CLI command implementations.
//!
//! Each submodule corresponds to a top-level CLI command and reuses
//! the docflow-core domain logic through `AppState`. Commands return the
//! JSON they would print so tests can inspect it.

pub mod document;
pub mod principal;
pub mod server;

use std::sync::Arc;

use docflow_core::{AppState, AppStateInner, CoreConfig, Database};

/// Initialize a shared `AppState` from the given SQLite database path.
///
/// This mirrors `docflow_server::create_app_state` but exits the process on
/// failure, which is what every non-server command wants.
pub async fn init_state(db_path: &str, core: &CoreConfig) -> AppState {
    let db = Database::open(db_path).unwrap_or_else(|e| {
        eprintln!("Failed to open database '{}': {}", db_path, e);
        std::process::exit(1);
    });
    Arc::new(AppStateInner::new(db, core))
}

/// Pretty-print a JSON value to stdout.
pub fn print_json(value: &serde_json::Value) {
    println!(
        "{}",
        serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
    );
}
