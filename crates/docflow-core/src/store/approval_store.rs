use chrono::{DateTime, Utc};
use rusqlite::{Connection, Row};

use crate::db::Database;
use crate::error::ServerError;
use crate::models::approval::{ApprovalRecord, ApprovalStatus};

#[derive(Clone)]
pub struct ApprovalStore {
    db: Database,
}

impl ApprovalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Every approval record of a document, in creation order.
    pub async fn list_by_document(&self, document_id: &str) -> Result<Vec<ApprovalRecord>, ServerError> {
        let document_id = document_id.to_string();
        self.db
            .with_conn_async(move |conn| load_records(conn, &document_id))
            .await
    }
}

pub(crate) fn load_records(conn: &Connection, document_id: &str) -> rusqlite::Result<Vec<ApprovalRecord>> {
    let mut stmt = conn.prepare(
        "SELECT a.id, a.document_id, a.approver_id, u.username, a.status, a.comments, \
         a.approved_at, a.created_at \
         FROM approval_records a JOIN users u ON u.id = a.approver_id \
         WHERE a.document_id = ?1 ORDER BY a.created_at, a.rowid",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![document_id], |row| Ok(row_to_record(row)))?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Insert a record; an existing (document, approver) pair is left untouched.
pub(crate) fn insert_record(conn: &Connection, record: &ApprovalRecord) -> rusqlite::Result<bool> {
    let n = conn.execute(
        "INSERT OR IGNORE INTO approval_records \
         (id, document_id, approver_id, status, comments, approved_at, created_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        rusqlite::params![
            record.id,
            record.document_id,
            record.approver_id,
            record.status.as_str(),
            record.comments,
            record.approved_at.map(|t| t.timestamp_millis()),
            record.created_at.timestamp_millis(),
        ],
    )?;
    Ok(n == 1)
}

pub(crate) fn update_record(conn: &Connection, record: &ApprovalRecord) -> rusqlite::Result<()> {
    conn.execute(
        "UPDATE approval_records SET status = ?1, comments = ?2, approved_at = ?3 WHERE id = ?4",
        rusqlite::params![
            record.status.as_str(),
            record.comments,
            record.approved_at.map(|t| t.timestamp_millis()),
            record.id,
        ],
    )?;
    Ok(())
}

fn row_to_record(row: &Row<'_>) -> ApprovalRecord {
    let to_dt = |ms: Option<i64>| ms.and_then(DateTime::from_timestamp_millis);

    ApprovalRecord {
        id: row.get(0).unwrap_or_default(),
        document_id: row.get(1).unwrap_or_default(),
        approver_id: row.get(2).unwrap_or_default(),
        approver_name: row.get(3).unwrap_or_default(),
        status: ApprovalStatus::from_str(&row.get::<_, String>(4).unwrap_or_default()),
        comments: row.get(5).unwrap_or(None),
        approved_at: to_dt(row.get(6).unwrap_or(None)),
        created_at: to_dt(row.get(7).ok()).unwrap_or_else(Utc::now),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Document, Principal};
    use crate::store::document_store::insert_document;
    use crate::store::PrincipalStore;

    async fn seeded() -> Database {
        let db = Database::open_in_memory().unwrap();
        let principals = PrincipalStore::new(db.clone());
        for (id, name) in [("u1", "user1"), ("u2", "user2")] {
            principals
                .save(&Principal::new(id.into(), name.into(), None))
                .await
                .unwrap();
        }
        db.with_conn(|conn| insert_document(conn, &Document::new("d1".into(), None)))
            .unwrap();
        db
    }

    #[tokio::test]
    async fn test_insert_is_unique_per_approver() {
        let db = seeded().await;
        let record = ApprovalRecord::new("r1".into(), "d1".into(), "u1".into(), "user1".into());
        let duplicate = ApprovalRecord::new("r2".into(), "d1".into(), "u1".into(), "user1".into());

        assert!(db.with_conn(|conn| insert_record(conn, &record)).unwrap());
        assert!(!db.with_conn(|conn| insert_record(conn, &duplicate)).unwrap());

        let records = ApprovalStore::new(db).list_by_document("d1").await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, "r1");
        assert_eq!(records[0].approver_name, "user1");
    }

    #[tokio::test]
    async fn test_update_and_cascade_delete() {
        let db = seeded().await;
        let mut record = ApprovalRecord::new("r1".into(), "d1".into(), "u2".into(), "user2".into());
        db.with_conn(|conn| insert_record(conn, &record)).unwrap();

        record.status = ApprovalStatus::Approved;
        record.comments = Some("fine".into());
        record.approved_at = Some(Utc::now());
        db.with_conn(|conn| update_record(conn, &record)).unwrap();

        let store = ApprovalStore::new(db.clone());
        let loaded = store.list_by_document("d1").await.unwrap();
        assert_eq!(loaded[0].status, ApprovalStatus::Approved);
        assert_eq!(loaded[0].comments.as_deref(), Some("fine"));
        assert!(loaded[0].approved_at.is_some());

        db.with_conn(|conn| conn.execute("DELETE FROM documents WHERE id = 'd1'", []))
            .unwrap();
        assert!(store.list_by_document("d1").await.unwrap().is_empty());
    }
}
