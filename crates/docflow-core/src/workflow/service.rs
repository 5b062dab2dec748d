//! Workflow service: runs each state-machine operation as one serialized
//! read-modify-write against the store.
//!
//! Every mutating operation:
//!   1. takes the per-document lock (bounded wait, `Conflict` on timeout)
//!   2. opens a transaction and loads the document and its approval records
//!   3. applies the pure transition from [`super::machine`]
//!   4. writes records and the document; the document write is a
//!      compare-and-swap on `version`, so a concurrent writer from another
//!      process surfaces as `Conflict` instead of a lost update.

use std::time::Duration;

use chrono::Utc;
use rusqlite::Connection;

use crate::auth::Actor;
use crate::db::Database;
use crate::error::{ServerError, WorkflowError};
use crate::models::{ApprovalRecord, Document, Stage};
use crate::store::approval_store::{insert_record, load_records, update_record};
use crate::store::document_store::{
    delete_document, insert_document, load_document, update_document,
};
use crate::store::principal_store::load_role_holders;

use super::locks::DocumentLocks;
use super::machine::{self, ApprovalOutcome, FieldUpdate, FillOutcome};
use super::policy;
use super::quorum;
use super::view::DocumentStatus;

/// A document after a successful field update.
#[derive(Debug, Clone)]
pub struct FieldUpdateResult {
    pub document: Document,
    pub outcome: FillOutcome,
}

/// A document after a recorded vote, with its full record set.
#[derive(Debug, Clone)]
pub struct ApprovalResult {
    pub document: Document,
    pub approvals: Vec<ApprovalRecord>,
    pub outcome: ApprovalOutcome,
}

#[derive(Clone)]
pub struct WorkflowService {
    db: Database,
    locks: DocumentLocks,
    lock_timeout: Duration,
}

fn not_found(id: &str) -> ServerError {
    ServerError::NotFound(format!("Document {} not found", id))
}

fn load_existing(conn: &Connection, id: &str) -> Result<Document, ServerError> {
    load_document(conn, id)?.ok_or_else(|| not_found(id))
}

/// Persist `doc` if nobody else changed it since it was read at
/// `expected_version`.
fn write_document(conn: &Connection, doc: &mut Document, expected_version: i64) -> Result<(), ServerError> {
    if !update_document(conn, doc, expected_version)? {
        return Err(ServerError::Conflict(format!(
            "Document {} was modified concurrently, retry the request",
            doc.id
        )));
    }
    doc.version = expected_version + 1;
    Ok(())
}

/// Create a pending record for every eligible approver that lacks one.
fn materialize_approvers(conn: &Connection, doc: &Document) -> Result<Vec<ApprovalRecord>, ServerError> {
    let holders = load_role_holders(conn)?;
    let existing = load_records(conn, &doc.id)?;
    let missing = quorum::missing_records(&doc.id, &holders, &existing);
    for record in &missing {
        insert_record(conn, record)?;
    }
    let records = load_records(conn, &doc.id)?;
    if records.is_empty() {
        tracing::warn!(
            "Document {} entered approval but no principal holds an approving role",
            doc.id
        );
    } else if !missing.is_empty() {
        tracing::info!(
            "Document {}: created {} approval record(s), {} total",
            doc.id,
            missing.len(),
            records.len()
        );
    }
    Ok(records)
}

impl WorkflowService {
    pub fn new(db: Database, lock_timeout: Duration) -> Self {
        Self {
            db,
            locks: DocumentLocks::new(),
            lock_timeout,
        }
    }

    /// Start a new document at the first filling step.
    pub async fn create_document(&self, creator: &Actor) -> Result<Document, ServerError> {
        let doc = Document::new(uuid::Uuid::new_v4().to_string(), Some(creator.id().to_string()));
        let row = doc.clone();
        self.db
            .with_conn_async(move |conn| insert_document(conn, &row))
            .await?;
        tracing::info!("Document {} created by {}", doc.id, creator.principal.username);
        Ok(doc)
    }

    /// Apply a filler's field submission, advancing the step (or entering
    /// approval) once the current step is complete.
    pub async fn apply_field_update(
        &self,
        document_id: &str,
        actor: &Actor,
        update: FieldUpdate,
    ) -> Result<FieldUpdateResult, ServerError> {
        let _guard = self.locks.acquire(document_id, self.lock_timeout).await?;

        let id = document_id.to_string();
        let role = actor.role;
        let result = self
            .db
            .with_tx_async(move |tx| {
                let mut doc = load_existing(tx, &id)?;
                let expected = doc.version;
                let outcome = machine::apply_field_update(&mut doc, role, &update, Utc::now())?;
                if outcome == FillOutcome::SubmittedForApproval {
                    materialize_approvers(tx, &doc)?;
                }
                write_document(tx, &mut doc, expected)?;
                Ok(FieldUpdateResult { document: doc, outcome })
            })
            .await?;

        match result.outcome {
            FillOutcome::Saved => tracing::debug!(
                "Document {}: partial update by {} at step {}",
                document_id,
                actor.principal.username,
                result.document.current_filler_step.number()
            ),
            FillOutcome::StepAdvanced { from, to } => tracing::info!(
                "Document {}: step {} -> {} by {}",
                document_id,
                from.number(),
                to.number(),
                actor.principal.username
            ),
            FillOutcome::SubmittedForApproval => tracing::info!(
                "Document {}: filling complete, now in approval",
                document_id
            ),
        }
        Ok(result)
    }

    /// Record an approve/reject vote by `actor`.
    pub async fn record_approval(
        &self,
        document_id: &str,
        actor: &Actor,
        action: &str,
        comment: Option<String>,
    ) -> Result<ApprovalResult, ServerError> {
        let _guard = self.locks.acquire(document_id, self.lock_timeout).await?;

        let id = document_id.to_string();
        let approver_id = actor.id().to_string();
        let role = actor.role;
        let action = action.to_string();
        let result = self
            .db
            .with_tx_async(move |tx| {
                let mut doc = load_existing(tx, &id)?;
                if doc.current_stage == Stage::Approval && !policy::can_approve(role, &doc) {
                    return Err(WorkflowError::NotAnApprover.into());
                }
                let expected = doc.version;
                let mut records = load_records(tx, &id)?;
                let outcome = machine::record_approval(
                    &mut doc,
                    &mut records,
                    &approver_id,
                    &action,
                    comment,
                    Utc::now(),
                )?;
                for record in &records {
                    update_record(tx, record)?;
                }
                write_document(tx, &mut doc, expected)?;
                Ok(ApprovalResult {
                    document: doc,
                    approvals: records,
                    outcome,
                })
            })
            .await?;

        match &result.outcome {
            ApprovalOutcome::Approved { completed: true } => tracing::info!(
                "Document {}: approved by {}, quorum complete",
                document_id,
                actor.principal.username
            ),
            ApprovalOutcome::Approved { completed: false } => tracing::info!(
                "Document {}: approved by {}",
                document_id,
                actor.principal.username
            ),
            ApprovalOutcome::Rejected { comment } => tracing::info!(
                "Document {}: rejected by {} ({}), reset to step 1",
                document_id,
                actor.principal.username,
                comment.as_deref().unwrap_or("no comment")
            ),
        }
        Ok(result)
    }

    pub async fn get(&self, document_id: &str) -> Result<(Document, Vec<ApprovalRecord>), ServerError> {
        let id = document_id.to_string();
        self.db
            .with_tx_async(move |tx| {
                let doc = load_existing(tx, &id)?;
                let records = load_records(tx, &id)?;
                Ok((doc, records))
            })
            .await
    }

    pub async fn status(&self, document_id: &str) -> Result<DocumentStatus, ServerError> {
        let (doc, records) = self.get(document_id).await?;
        Ok(DocumentStatus::new(&doc, records))
    }

    /// Delete a document and its approval records, if policy allows.
    pub async fn delete_document(&self, document_id: &str, actor: &Actor) -> Result<(), ServerError> {
        let _guard = self.locks.acquire(document_id, self.lock_timeout).await?;

        let id = document_id.to_string();
        let role = actor.role;
        self.db
            .with_tx_async(move |tx| {
                let doc = load_existing(tx, &id)?;
                if !policy::can_delete(role, &doc) {
                    return Err(WorkflowError::Forbidden { role: role.to_string() }.into());
                }
                delete_document(tx, &id)?;
                Ok(())
            })
            .await?;
        tracing::info!("Document {} deleted by {}", document_id, actor.principal.username);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentField, FillerStep};

    #[test]
    fn test_write_after_concurrent_bump_conflicts() {
        let db = Database::open_in_memory().unwrap();
        let doc = Document::new("d1".into(), None);
        db.with_conn(|conn| insert_document(conn, &doc)).unwrap();

        let err = db
            .with_tx(|tx| {
                let mut doc = load_existing(tx, "d1")?;
                let expected = doc.version;
                doc.fields.set(DocumentField::new(1).unwrap(), Some("mine".into()));

                // Another writer bumps the version after this read.
                tx.execute("UPDATE documents SET version = version + 1 WHERE id = 'd1'", [])?;

                write_document(tx, &mut doc, expected)
            })
            .unwrap_err();
        assert!(matches!(err, ServerError::Conflict(_)));

        // The failed transaction rolled back, so neither write landed.
        let stored = db.with_conn(|conn| load_document(conn, "d1")).unwrap().unwrap();
        assert_eq!(stored.version, 1);
        assert_eq!(stored.current_filler_step, FillerStep::One);
        assert_eq!(stored.fields.get(DocumentField::new(1).unwrap()), None);
    }

    #[test]
    fn test_write_bumps_version() {
        let db = Database::open_in_memory().unwrap();
        let doc = Document::new("d1".into(), None);
        db.with_conn(|conn| insert_document(conn, &doc)).unwrap();

        let written = db
            .with_tx(|tx| {
                let mut doc = load_existing(tx, "d1")?;
                let expected = doc.version;
                write_document(tx, &mut doc, expected)?;
                Ok(doc)
            })
            .unwrap();
        assert_eq!(written.version, 2);
    }
}
