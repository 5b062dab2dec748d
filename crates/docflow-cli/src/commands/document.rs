//! `docflow document`: read-only inspection of stored documents.

use docflow_core::AppState;
use serde_json::{json, Value};

pub async fn list(state: &AppState) -> Result<Value, String> {
    let documents = state.document_store.list().await.map_err(|e| e.to_string())?;
    Ok(json!({ "documents": documents }))
}

pub async fn show(state: &AppState, id: &str) -> Result<Value, String> {
    let (document, approvals) = state.workflow.get(id).await.map_err(|e| e.to_string())?;
    Ok(json!({ "document": document, "approvals": approvals }))
}

pub async fn status(state: &AppState, id: &str) -> Result<Value, String> {
    let status = state.workflow.status(id).await.map_err(|e| e.to_string())?;
    serde_json::to_value(status).map_err(|e| e.to_string())
}
