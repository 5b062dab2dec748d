use chrono::{DateTime, Utc};
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::Database;
use crate::error::ServerError;
use crate::models::document::{Document, DocumentField, FieldValues, FillerStep, Stage};

const SELECT_DOCUMENT: &str = "SELECT id, field1, field2, field3, field4, field5, field6, field7, \
     field8, field9, field10, field11, current_stage, current_filler_step, created_by, version, \
     created_at, updated_at FROM documents";

#[derive(Clone)]
pub struct DocumentStore {
    db: Database,
}

impl DocumentStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    pub async fn insert(&self, document: &Document) -> Result<(), ServerError> {
        let doc = document.clone();
        self.db
            .with_conn_async(move |conn| insert_document(conn, &doc))
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Document>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| load_document(conn, &id))
            .await
    }

    /// All documents, newest first.
    pub async fn list(&self) -> Result<Vec<Document>, ServerError> {
        self.db
            .with_conn_async(move |conn| {
                let mut stmt =
                    conn.prepare(&format!("{} ORDER BY created_at DESC, rowid DESC", SELECT_DOCUMENT))?;
                let rows = stmt
                    .query_map([], |row| Ok(row_to_document(row)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
    }

    /// Delete a document; its approval records go with it.
    pub async fn delete(&self, id: &str) -> Result<bool, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| delete_document(conn, &id))
            .await
    }
}

fn field_params(doc: &Document) -> Vec<Option<String>> {
    DocumentField::all()
        .map(|f| doc.fields.get(f).map(str::to_string))
        .collect()
}

pub(crate) fn insert_document(conn: &Connection, doc: &Document) -> rusqlite::Result<()> {
    let v = field_params(doc);
    conn.execute(
        "INSERT INTO documents (id, field1, field2, field3, field4, field5, field6, field7, \
         field8, field9, field10, field11, current_stage, current_filler_step, created_by, \
         version, created_at, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        rusqlite::params![
            doc.id,
            v[0],
            v[1],
            v[2],
            v[3],
            v[4],
            v[5],
            v[6],
            v[7],
            v[8],
            v[9],
            v[10],
            doc.current_stage.as_str(),
            doc.current_filler_step.number(),
            doc.created_by,
            doc.version,
            doc.created_at.timestamp_millis(),
            doc.updated_at.timestamp_millis(),
        ],
    )?;
    Ok(())
}

pub(crate) fn load_document(conn: &Connection, id: &str) -> rusqlite::Result<Option<Document>> {
    conn.query_row(
        &format!("{} WHERE id = ?1", SELECT_DOCUMENT),
        rusqlite::params![id],
        |row| Ok(row_to_document(row)),
    )
    .optional()
}

/// Write `doc` back only if the stored version is still `expected_version`.
///
/// The stored version becomes `expected_version + 1`. Returns `false` when
/// another writer got there first (or the row is gone).
pub(crate) fn update_document(
    conn: &Connection,
    doc: &Document,
    expected_version: i64,
) -> rusqlite::Result<bool> {
    let v = field_params(doc);
    let n = conn.execute(
        "UPDATE documents SET field1 = ?1, field2 = ?2, field3 = ?3, field4 = ?4, field5 = ?5, \
         field6 = ?6, field7 = ?7, field8 = ?8, field9 = ?9, field10 = ?10, field11 = ?11, \
         current_stage = ?12, current_filler_step = ?13, version = ?14, updated_at = ?15 \
         WHERE id = ?16 AND version = ?17",
        rusqlite::params![
            v[0],
            v[1],
            v[2],
            v[3],
            v[4],
            v[5],
            v[6],
            v[7],
            v[8],
            v[9],
            v[10],
            doc.current_stage.as_str(),
            doc.current_filler_step.number(),
            expected_version + 1,
            doc.updated_at.timestamp_millis(),
            doc.id,
            expected_version,
        ],
    )?;
    Ok(n == 1)
}

pub(crate) fn delete_document(conn: &Connection, id: &str) -> rusqlite::Result<bool> {
    let n = conn.execute("DELETE FROM documents WHERE id = ?1", rusqlite::params![id])?;
    Ok(n > 0)
}

fn row_to_document(row: &Row<'_>) -> Document {
    let mut fields = FieldValues::default();
    for (i, field) in DocumentField::all().enumerate() {
        fields.set(field, row.get(i + 1).unwrap_or(None));
    }
    let stage: String = row.get(12).unwrap_or_default();
    let step: i64 = row.get(13).unwrap_or(1);
    let created_ms: i64 = row.get(16).unwrap_or(0);
    let updated_ms: i64 = row.get(17).unwrap_or(0);

    Document {
        id: row.get(0).unwrap_or_default(),
        fields,
        current_stage: Stage::from_str(&stage).unwrap_or(Stage::Filling),
        current_filler_step: FillerStep::from_number(step).unwrap_or(FillerStep::One),
        created_by: row.get(14).unwrap_or(None),
        version: row.get(15).unwrap_or(1),
        created_at: DateTime::from_timestamp_millis(created_ms).unwrap_or_else(Utc::now),
        updated_at: DateTime::from_timestamp_millis(updated_ms).unwrap_or_else(Utc::now),
    }
}
