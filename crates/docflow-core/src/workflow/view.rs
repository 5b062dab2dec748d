//! Presentation of documents to a particular role.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::models::{ApprovalRecord, Document, FillerStep, Stage};

use super::policy;
use super::role::Role;

/// Approvals are only shown once a document has reached approval.
fn visible_approvals(doc: &Document, approvals: Vec<ApprovalRecord>) -> Vec<ApprovalRecord> {
    match doc.current_stage {
        Stage::Approval | Stage::Completed => approvals,
        Stage::Filling => Vec::new(),
    }
}

/// The whole document plus what the viewer may do with it.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentView {
    #[serde(flatten)]
    pub document: Document,
    pub approvals: Vec<ApprovalRecord>,
    pub can_edit: bool,
    pub can_approve: bool,
}

impl DocumentView {
    pub fn new(document: Document, approvals: Vec<ApprovalRecord>, role: Role) -> Self {
        let can_edit = policy::can_write(role, &document);
        let can_approve = policy::can_approve(role, &document);
        let approvals = visible_approvals(&document, approvals);
        Self {
            document,
            approvals,
            can_edit,
            can_approve,
        }
    }
}

/// A document narrowed to the fields visible at its current step.
#[derive(Debug, Clone, Serialize)]
pub struct FilteredDocumentView {
    pub id: String,
    #[serde(flatten)]
    pub fields: BTreeMap<&'static str, Option<String>>,
    pub current_stage: Stage,
    pub current_filler_step: FillerStep,
    pub read_only_fields: Vec<&'static str>,
    pub can_edit: bool,
    pub can_approve: bool,
    pub version: i64,
    pub updated_at: DateTime<Utc>,
}

impl FilteredDocumentView {
    pub fn new(document: &Document, role: Role) -> Self {
        let visibility = policy::visible_field_set(role, document);
        let fields = visibility
            .visible
            .iter()
            .map(|f| (f.name(), document.fields.get(*f).map(str::to_string)))
            .collect();
        let read_only_fields = visibility.read_only().iter().map(|f| f.name()).collect();

        Self {
            id: document.id.clone(),
            fields,
            current_stage: document.current_stage,
            current_filler_step: document.current_filler_step,
            read_only_fields,
            can_edit: policy::can_write(role, document),
            can_approve: policy::can_approve(role, document),
            version: document.version,
            updated_at: document.updated_at,
        }
    }
}

/// Progress summary of a document.
#[derive(Debug, Clone, Serialize)]
pub struct DocumentStatus {
    pub document_id: String,
    pub current_stage: Stage,
    pub current_filler_step: FillerStep,
    pub all_fields_filled: bool,
    pub approvals: Vec<ApprovalRecord>,
}

impl DocumentStatus {
    pub fn new(document: &Document, approvals: Vec<ApprovalRecord>) -> Self {
        Self {
            document_id: document.id.clone(),
            current_stage: document.current_stage,
            current_filler_step: document.current_filler_step,
            all_fields_filled: document.all_fields_filled(),
            approvals: visible_approvals(document, approvals),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DocumentField;

    fn doc_at_step_two() -> Document {
        let mut doc = Document::new("d1".into(), None);
        for n in 1..=4 {
            doc.fields.set(DocumentField::new(n).unwrap(), Some(format!("v{}", n)));
        }
        doc.current_filler_step = FillerStep::Two;
        doc
    }

    #[test]
    fn test_filtered_view_for_current_filler() {
        let view = FilteredDocumentView::new(&doc_at_step_two(), Role::Filler2);
        let json = serde_json::to_value(&view).unwrap();

        assert_eq!(json["field1"], "v1");
        assert!(json["field5"].is_null());
        assert!(json.get("field5").is_some());
        assert!(json.get("field9").is_none());
        assert_eq!(
            json["read_only_fields"],
            serde_json::json!(["field1", "field2", "field3", "field4"])
        );
        assert_eq!(json["can_edit"], true);
        assert_eq!(json["current_filler_step"], 2);
    }

    #[test]
    fn test_filtered_view_for_other_roles_is_read_only() {
        let view = FilteredDocumentView::new(&doc_at_step_two(), Role::Filler1);
        assert_eq!(view.fields.len(), 8);
        assert_eq!(view.read_only_fields.len(), 8);
        assert!(!view.can_edit);
    }

    #[test]
    fn test_status_hides_approvals_while_filling() {
        let doc = doc_at_step_two();
        let record = ApprovalRecord::new("r".into(), "d1".into(), "u1".into(), "user1".into());
        let status = DocumentStatus::new(&doc, vec![record.clone()]);
        assert!(status.approvals.is_empty());
        assert!(!status.all_fields_filled);

        let mut in_approval = doc;
        in_approval.current_stage = Stage::Approval;
        let status = DocumentStatus::new(&in_approval, vec![record]);
        assert_eq!(status.approvals.len(), 1);

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["document_id"], "d1");
        assert_eq!(json["current_stage"], "APPROVAL");
        assert_eq!(json["approvals"][0]["approver"], "u1");
        assert_eq!(json["approvals"][0]["status"], "PENDING");
    }

    #[test]
    fn test_full_view_flags() {
        let view = DocumentView::new(doc_at_step_two(), Vec::new(), Role::Filler2);
        let json = serde_json::to_value(&view).unwrap();
        assert_eq!(json["id"], "d1");
        assert_eq!(json["field11"], serde_json::Value::Null);
        assert_eq!(json["can_edit"], true);
        assert_eq!(json["can_approve"], false);
        assert_eq!(json["approvals"], serde_json::json!([]));
    }
}
