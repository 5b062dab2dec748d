//! Document state machine.
//!
//! ```text
//!   Filling(1) ──► Filling(2) ──► Filling(3) ──► Approval ──► Completed
//!       ▲                                          │
//!       └──────────────── reject ──────────────────┘
//! ```
//!
//! Transitions are pure: they mutate in-memory values and report what
//! happened. Persistence and locking live in [`super::service`].

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

use crate::error::WorkflowError;
use crate::models::{
    ApprovalAction, ApprovalRecord, ApprovalStatus, Document, DocumentField, FillerStep, Stage,
    MAX_FIELD_LEN,
};

use super::policy;
use super::quorum;
use super::role::Role;

/// Field values submitted in a single update. `None` clears a field.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldUpdate {
    values: BTreeMap<DocumentField, Option<String>>,
}

impl FieldUpdate {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, field: DocumentField, value: impl Into<String>) -> Self {
        self.values.insert(field, Some(value.into()));
        self
    }

    pub fn insert(&mut self, field: DocumentField, value: Option<String>) {
        self.values.insert(field, value);
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Build from a JSON object body. Keys that are not document fields are
    /// skipped; field values must be strings or `null`.
    pub fn from_json(body: &serde_json::Value) -> Result<Self, String> {
        let Some(obj) = body.as_object() else {
            return Err("Request body must be a JSON object".to_string());
        };
        let mut update = Self::new();
        for (key, value) in obj {
            let Some(field) = DocumentField::from_name(key) else {
                continue;
            };
            match value {
                serde_json::Value::Null => update.insert(field, None),
                serde_json::Value::String(s) => update.insert(field, Some(s.clone())),
                other => return Err(format!("{} must be a string or null, got {}", key, other)),
            }
        }
        Ok(update)
    }

    fn get(&self, field: DocumentField) -> Option<&Option<String>> {
        self.values.get(&field)
    }
}

/// Result of a field update that passed all checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FillOutcome {
    /// Data saved; the current step still has empty fields.
    Saved,
    StepAdvanced { from: FillerStep, to: FillerStep },
    /// The last step completed; the document is now awaiting approval.
    SubmittedForApproval,
}

impl FillOutcome {
    pub fn advanced(&self) -> bool {
        !matches!(self, Self::Saved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApprovalOutcome {
    Approved { completed: bool },
    /// Document sent back to step 1 and every vote cleared.
    Rejected { comment: Option<String> },
}

fn expect_stage(doc: &Document, expected: Stage) -> Result<(), WorkflowError> {
    if doc.current_stage == expected {
        Ok(())
    } else {
        Err(WorkflowError::StageMismatch {
            expected: expected.as_str().to_string(),
            actual: doc.current_stage.as_str().to_string(),
        })
    }
}

/// Apply a filler's submission to a document.
///
/// Only fields owned by the role are applied; anything else in `update` is
/// ignored. The step advances only once every field it owns is filled.
pub fn apply_field_update(
    doc: &mut Document,
    role: Role,
    update: &FieldUpdate,
    now: DateTime<Utc>,
) -> Result<FillOutcome, WorkflowError> {
    expect_stage(doc, Stage::Filling)?;

    let assigned = role.filler_step().ok_or_else(|| WorkflowError::Forbidden {
        role: role.to_string(),
    })?;
    if assigned != doc.current_filler_step {
        return Err(WorkflowError::StepMismatch {
            assigned: assigned.number(),
            current: doc.current_filler_step.number(),
        });
    }

    let owned = policy::step_fields(assigned);
    for &field in owned {
        if let Some(Some(value)) = update.get(field) {
            if value.chars().count() > MAX_FIELD_LEN {
                return Err(WorkflowError::FieldTooLong {
                    field: field.name().to_string(),
                    max: MAX_FIELD_LEN,
                });
            }
        }
    }

    for &field in owned {
        if let Some(value) = update.get(field) {
            doc.fields.set(field, value.clone());
        }
    }
    doc.updated_at = now;

    if !owned.iter().all(|&f| doc.fields.is_filled(f)) {
        return Ok(FillOutcome::Saved);
    }

    match assigned.next() {
        Some(next) => {
            doc.current_filler_step = next;
            Ok(FillOutcome::StepAdvanced { from: assigned, to: next })
        }
        None => {
            doc.current_stage = Stage::Approval;
            Ok(FillOutcome::SubmittedForApproval)
        }
    }
}

/// Record an approver's vote.
///
/// `records` must be the complete record set for the document; completion
/// is decided over all of them.
pub fn record_approval(
    doc: &mut Document,
    records: &mut [ApprovalRecord],
    approver_id: &str,
    action: &str,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<ApprovalOutcome, WorkflowError> {
    expect_stage(doc, Stage::Approval)?;

    let idx = records
        .iter()
        .position(|r| r.approver_id == approver_id)
        .ok_or(WorkflowError::NotAnApprover)?;

    let action = ApprovalAction::from_str(action)
        .ok_or_else(|| WorkflowError::InvalidAction(action.to_string()))?;

    let comment = comment.filter(|c| !c.is_empty());
    doc.updated_at = now;

    match action {
        ApprovalAction::Approve => {
            let record = &mut records[idx];
            record.status = ApprovalStatus::Approved;
            record.approved_at = Some(now);
            record.comments = comment;

            let completed = quorum::is_complete(records);
            if completed {
                doc.current_stage = Stage::Completed;
            }
            Ok(ApprovalOutcome::Approved { completed })
        }
        ApprovalAction::Reject => {
            let record = &mut records[idx];
            record.status = ApprovalStatus::Rejected;
            record.comments = comment.clone();

            doc.current_stage = Stage::Filling;
            doc.current_filler_step = FillerStep::One;
            quorum::reset_all(records);
            Ok(ApprovalOutcome::Rejected { comment })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Principal;
    use crate::workflow::quorum::RoleHolders;

    fn f(n: u8) -> DocumentField {
        DocumentField::new(n).unwrap()
    }

    fn fill(range: std::ops::RangeInclusive<u8>) -> FieldUpdate {
        range.fold(FieldUpdate::new(), |u, n| u.with(f(n), format!("value {}", n)))
    }

    fn filled_to_approval() -> (Document, Vec<ApprovalRecord>) {
        let mut doc = Document::new("doc".into(), Some("u1".into()));
        let now = Utc::now();
        apply_field_update(&mut doc, Role::Filler1, &fill(1..=4), now).unwrap();
        apply_field_update(&mut doc, Role::Filler2, &fill(5..=8), now).unwrap();
        let outcome = apply_field_update(&mut doc, Role::Filler3, &fill(9..=11), now).unwrap();
        assert_eq!(outcome, FillOutcome::SubmittedForApproval);

        let mut holders = RoleHolders::new();
        for (i, role) in Role::RECOGNIZED.into_iter().enumerate() {
            let id = format!("u{}", i + 1);
            holders.insert(role, vec![Principal::new(id.clone(), format!("user{}", i + 1), None)]);
        }
        let records = quorum::missing_records(&doc.id, &holders, &[]);
        (doc, records)
    }

    #[test]
    fn test_full_step_advances_once() {
        let mut doc = Document::new("doc".into(), None);
        let update = fill(1..=4);

        let first = apply_field_update(&mut doc, Role::Filler1, &update, Utc::now()).unwrap();
        assert_eq!(
            first,
            FillOutcome::StepAdvanced { from: FillerStep::One, to: FillerStep::Two }
        );
        assert_eq!(doc.current_filler_step, FillerStep::Two);

        let again = apply_field_update(&mut doc, Role::Filler1, &update, Utc::now());
        assert_eq!(again, Err(WorkflowError::StepMismatch { assigned: 1, current: 2 }));
        assert_eq!(doc.current_filler_step, FillerStep::Two);
    }

    #[test]
    fn test_partial_fill_persists_without_advancing() {
        let mut doc = Document::new("doc".into(), None);
        let outcome =
            apply_field_update(&mut doc, Role::Filler1, &fill(1..=3), Utc::now()).unwrap();
        assert_eq!(outcome, FillOutcome::Saved);
        assert!(!outcome.advanced());
        assert_eq!(doc.current_stage, Stage::Filling);
        assert_eq!(doc.current_filler_step, FillerStep::One);
        assert_eq!(doc.fields.get(f(3)), Some("value 3"));

        let outcome = apply_field_update(
            &mut doc,
            Role::Filler1,
            &FieldUpdate::new().with(f(4), "last"),
            Utc::now(),
        )
        .unwrap();
        assert!(outcome.advanced());
        assert_eq!(doc.current_filler_step, FillerStep::Two);
    }

    #[test]
    fn test_fields_outside_role_are_ignored() {
        let mut doc = Document::new("doc".into(), None);
        let update = fill(1..=2).with(f(5), "not mine").with(f(11), "nor this");
        apply_field_update(&mut doc, Role::Filler1, &update, Utc::now()).unwrap();
        assert_eq!(doc.fields.get(f(1)), Some("value 1"));
        assert_eq!(doc.fields.get(f(5)), None);
        assert_eq!(doc.fields.get(f(11)), None);
    }

    #[test]
    fn test_wrong_step_leaves_document_unchanged() {
        let mut doc = Document::new("doc".into(), None);
        let before = doc.clone();
        let err = apply_field_update(&mut doc, Role::Filler2, &fill(5..=8), Utc::now());
        assert_eq!(err, Err(WorkflowError::StepMismatch { assigned: 2, current: 1 }));
        assert_eq!(doc.fields, before.fields);
        assert_eq!(doc.current_filler_step, before.current_filler_step);
        assert_eq!(doc.updated_at, before.updated_at);
    }

    #[test]
    fn test_roles_without_step_are_forbidden() {
        let mut doc = Document::new("doc".into(), None);
        for role in [Role::Approver, Role::Unassigned] {
            let err = apply_field_update(&mut doc, role, &fill(1..=4), Utc::now()).unwrap_err();
            assert_eq!(err.code(), "FORBIDDEN");
        }
    }

    #[test]
    fn test_field_update_outside_filling_is_stage_mismatch() {
        let (mut doc, _) = filled_to_approval();
        let err = apply_field_update(&mut doc, Role::Filler1, &fill(1..=4), Utc::now());
        assert_eq!(
            err,
            Err(WorkflowError::StageMismatch {
                expected: "FILLING".into(),
                actual: "APPROVAL".into()
            })
        );
    }

    #[test]
    fn test_too_long_value_rejected_before_applying() {
        let mut doc = Document::new("doc".into(), None);
        let update = FieldUpdate::new()
            .with(f(1), "ok")
            .with(f(2), "x".repeat(MAX_FIELD_LEN + 1));
        let err = apply_field_update(&mut doc, Role::Filler1, &update, Utc::now()).unwrap_err();
        assert_eq!(err, WorkflowError::FieldTooLong { field: "field2".into(), max: 255 });
        assert_eq!(doc.fields.get(f(1)), None);
    }

    #[test]
    fn test_null_clears_owned_field() {
        let mut doc = Document::new("doc".into(), None);
        apply_field_update(&mut doc, Role::Filler1, &fill(1..=2), Utc::now()).unwrap();
        let mut update = FieldUpdate::new();
        update.insert(f(2), None);
        apply_field_update(&mut doc, Role::Filler1, &update, Utc::now()).unwrap();
        assert_eq!(doc.fields.get(f(1)), Some("value 1"));
        assert_eq!(doc.fields.get(f(2)), None);
    }

    #[test]
    fn test_from_json_skips_unknown_keys() {
        let body = serde_json::json!({
            "field1": "a",
            "field2": null,
            "current_stage": "COMPLETED",
            "title": "ignored"
        });
        let update = FieldUpdate::from_json(&body).unwrap();
        let mut expected = FieldUpdate::new().with(f(1), "a");
        expected.insert(f(2), None);
        assert_eq!(update, expected);

        assert!(FieldUpdate::from_json(&serde_json::json!({ "field3": 7 })).is_err());
        assert!(FieldUpdate::from_json(&serde_json::json!(["field1"])).is_err());
    }

    #[test]
    fn test_partial_approval_keeps_stage() {
        let (mut doc, mut records) = filled_to_approval();
        let outcome =
            record_approval(&mut doc, &mut records, "u1", "approve", Some("ok".into()), Utc::now())
                .unwrap();
        assert_eq!(outcome, ApprovalOutcome::Approved { completed: false });
        assert_eq!(doc.current_stage, Stage::Approval);
        assert_eq!(records[0].status, ApprovalStatus::Approved);
        assert_eq!(records[0].comments.as_deref(), Some("ok"));
        assert!(records[0].approved_at.is_some());
    }

    #[test]
    fn test_all_approve_completes() {
        let (mut doc, mut records) = filled_to_approval();
        for id in ["u1", "u2", "u3", "u4"] {
            record_approval(&mut doc, &mut records, id, "approve", None, Utc::now()).unwrap();
        }
        assert_eq!(doc.current_stage, Stage::Completed);

        for action in ["approve", "reject"] {
            let err = record_approval(&mut doc, &mut records, "u1", action, None, Utc::now());
            assert_eq!(err.unwrap_err().code(), "STAGE_MISMATCH");
        }
    }

    #[test]
    fn test_reject_resets_everything() {
        let (mut doc, mut records) = filled_to_approval();
        for id in ["u1", "u2", "u3"] {
            record_approval(&mut doc, &mut records, id, "approve", Some("fine".into()), Utc::now())
                .unwrap();
        }
        let outcome = record_approval(
            &mut doc,
            &mut records,
            "u4",
            "reject",
            Some("field7 is wrong".into()),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(
            outcome,
            ApprovalOutcome::Rejected { comment: Some("field7 is wrong".into()) }
        );
        assert_eq!(doc.current_stage, Stage::Filling);
        assert_eq!(doc.current_filler_step, FillerStep::One);
        assert_eq!(records.len(), 4);
        for r in &records {
            assert_eq!(r.status, ApprovalStatus::Pending);
            assert!(r.comments.is_none());
            assert!(r.approved_at.is_none());
        }
        // Filled data survives the reset.
        assert!(doc.all_fields_filled());
    }

    #[test]
    fn test_unknown_approver_and_action() {
        let (mut doc, mut records) = filled_to_approval();
        let err = record_approval(&mut doc, &mut records, "stranger", "approve", None, Utc::now());
        assert_eq!(err, Err(WorkflowError::NotAnApprover));

        let err = record_approval(&mut doc, &mut records, "u2", "maybe", None, Utc::now());
        assert_eq!(err, Err(WorkflowError::InvalidAction("maybe".into())));
        assert!(records.iter().all(|r| r.status == ApprovalStatus::Pending));
        assert_eq!(doc.current_stage, Stage::Approval);
    }

    #[test]
    fn test_approval_before_filling_done_is_stage_mismatch() {
        let mut doc = Document::new("doc".into(), None);
        let err = record_approval(&mut doc, &mut [], "u1", "approve", None, Utc::now());
        assert_eq!(err.unwrap_err().code(), "STAGE_MISMATCH");
    }
}
