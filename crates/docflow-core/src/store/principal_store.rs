use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row};

use crate::db::Database;
use crate::error::ServerError;
use crate::models::principal::Principal;
use crate::workflow::quorum::RoleHolders;
use crate::workflow::role::Role;

/// Read access to users and their group memberships.
///
/// Provisioning happens outside this service; `save` and `add_to_group`
/// exist for tooling and tests that share the database.
#[derive(Clone)]
pub struct PrincipalStore {
    db: Database,
}

impl PrincipalStore {
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Upsert the user row and replace its group memberships, atomically.
    pub async fn save(&self, principal: &Principal) -> Result<(), ServerError> {
        let p = principal.clone();
        self.db
            .with_tx_async(move |conn| {
                conn.execute(
                    "INSERT INTO users (id, username, email, created_at)
                     VALUES (?1, ?2, ?3, ?4)
                     ON CONFLICT(id) DO UPDATE SET
                       username = excluded.username,
                       email = excluded.email",
                    rusqlite::params![p.id, p.username, p.email, p.created_at.timestamp_millis()],
                )?;
                conn.execute(
                    "DELETE FROM user_groups WHERE user_id = ?1",
                    rusqlite::params![p.id],
                )?;
                for group in &p.groups {
                    conn.execute(
                        "INSERT OR IGNORE INTO user_groups (user_id, group_name) VALUES (?1, ?2)",
                        rusqlite::params![p.id, group],
                    )?;
                }
                Ok(())
            })
            .await
    }

    pub async fn add_to_group(&self, user_id: &str, group: &str) -> Result<(), ServerError> {
        let user_id = user_id.to_string();
        let group = group.to_string();
        self.db
            .with_conn_async(move |conn| {
                conn.execute(
                    "INSERT OR IGNORE INTO user_groups (user_id, group_name) VALUES (?1, ?2)",
                    rusqlite::params![user_id, group],
                )?;
                Ok(())
            })
            .await
    }

    pub async fn get(&self, id: &str) -> Result<Option<Principal>, ServerError> {
        let id = id.to_string();
        self.db
            .with_conn_async(move |conn| load_principal(conn, &id))
            .await
    }

    /// Members of a group, ordered by username.
    pub async fn list_group(&self, group: &str) -> Result<Vec<Principal>, ServerError> {
        let group = group.to_string();
        self.db
            .with_conn_async(move |conn| list_group_members(conn, &group))
            .await
    }
}

pub(crate) fn load_principal(conn: &Connection, id: &str) -> rusqlite::Result<Option<Principal>> {
    let principal = conn
        .query_row(
            "SELECT id, username, email, created_at FROM users WHERE id = ?1",
            rusqlite::params![id],
            |row| Ok(row_to_principal(row)),
        )
        .optional()?;
    match principal {
        Some(mut p) => {
            p.groups = load_groups(conn, &p.id)?;
            Ok(Some(p))
        }
        None => Ok(None),
    }
}

fn load_groups(conn: &Connection, user_id: &str) -> rusqlite::Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT group_name FROM user_groups WHERE user_id = ?1 ORDER BY group_name",
    )?;
    let rows = stmt
        .query_map(rusqlite::params![user_id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(rows)
}

fn list_group_members(conn: &Connection, group: &str) -> rusqlite::Result<Vec<Principal>> {
    let mut stmt = conn.prepare(
        "SELECT u.id, u.username, u.email, u.created_at
         FROM users u JOIN user_groups g ON g.user_id = u.id
         WHERE g.group_name = ?1 ORDER BY u.username",
    )?;
    let mut members = stmt
        .query_map(rusqlite::params![group], |row| Ok(row_to_principal(row)))?
        .collect::<Result<Vec<_>, _>>()?;
    for p in members.iter_mut() {
        p.groups = load_groups(conn, &p.id)?;
    }
    Ok(members)
}

/// Current holders of every recognized role.
pub(crate) fn load_role_holders(conn: &Connection) -> rusqlite::Result<RoleHolders> {
    let mut holders = RoleHolders::new();
    for role in Role::RECOGNIZED {
        if let Some(group) = role.group() {
            holders.insert(role, list_group_members(conn, group)?);
        }
    }
    Ok(holders)
}

fn row_to_principal(row: &Row<'_>) -> Principal {
    let created_ms: i64 = row.get(3).unwrap_or(0);
    Principal {
        id: row.get(0).unwrap_or_default(),
        username: row.get(1).unwrap_or_default(),
        email: row.get(2).unwrap_or(None),
        groups: Vec::new(),
        created_at: chrono::DateTime::from_timestamp_millis(created_ms).unwrap_or_else(Utc::now),
    }
}
