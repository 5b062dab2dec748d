use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde::Serialize;

use docflow_core::workflow::{
    policy, DocumentStatus, DocumentView, FieldUpdate, FilteredDocumentView,
};
use docflow_core::{AppState, ServerError, WorkflowError};

use super::CurrentActor;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_documents).post(create_document))
        .route(
            "/{id}",
            get(get_document).patch(update_document).delete(delete_document),
        )
        .route("/{id}/approve", post(approve_document))
        .route("/{id}/status", get(document_status))
}

async fn list_documents(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
) -> Result<Json<serde_json::Value>, ServerError> {
    let documents = state.document_store.list().await?;
    Ok(Json(serde_json::json!({ "documents": documents })))
}

async fn create_document(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
) -> Result<(StatusCode, Json<DocumentView>), ServerError> {
    let doc = state.workflow.create_document(&actor).await?;
    Ok((
        StatusCode::CREATED,
        Json(DocumentView::new(doc, Vec::new(), actor.role)),
    ))
}

async fn get_document(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<DocumentView>, ServerError> {
    let (doc, approvals) = state.workflow.get(&id).await?;
    if !policy::can_read(actor.role, &doc) {
        return Err(WorkflowError::Forbidden {
            role: actor.role.to_string(),
        }
        .into());
    }
    Ok(Json(DocumentView::new(doc, approvals, actor.role)))
}

#[derive(Debug, Serialize)]
struct FieldUpdateResponse {
    #[serde(flatten)]
    document: FilteredDocumentView,
    advanced: bool,
}

async fn update_document(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<FieldUpdateResponse>, ServerError> {
    let body = json_body(body)?;
    let update = FieldUpdate::from_json(&body).map_err(ServerError::BadRequest)?;
    let result = state.workflow.apply_field_update(&id, &actor, update).await?;
    Ok(Json(FieldUpdateResponse {
        document: FilteredDocumentView::new(&result.document, actor.role),
        advanced: result.outcome.advanced(),
    }))
}

async fn delete_document(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state.workflow.delete_document(&id, &actor).await?;
    Ok(Json(serde_json::json!({ "deleted": true })))
}

/// Unwrap a JSON body, reporting unparseable input as `BAD_REQUEST`.
fn json_body(body: Result<Json<serde_json::Value>, JsonRejection>) -> Result<serde_json::Value, ServerError> {
    body.map(|Json(value)| value)
        .map_err(|e| ServerError::BadRequest(e.body_text()))
}

/// Body: `{"action": "approve" | "reject", "comments"?: string}`.
///
/// A missing or non-string `action` is passed on as empty so the workflow
/// reports it as an invalid action.
async fn approve_document(
    State(state): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<String>,
    body: Result<Json<serde_json::Value>, JsonRejection>,
) -> Result<Json<DocumentView>, ServerError> {
    let body = json_body(body)?;
    let action = body["action"].as_str().unwrap_or_default();
    let comments = body["comments"].as_str().map(str::to_string);
    let result = state
        .workflow
        .record_approval(&id, &actor, action, comments)
        .await?;
    Ok(Json(DocumentView::new(result.document, result.approvals, actor.role)))
}

async fn document_status(
    State(state): State<AppState>,
    CurrentActor(_actor): CurrentActor,
    Path(id): Path<String>,
) -> Result<Json<DocumentStatus>, ServerError> {
    Ok(Json(state.workflow.status(&id).await?))
}
