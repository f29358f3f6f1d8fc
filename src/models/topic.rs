use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

/// Default discussion archetype. The only one the increment job touches.
pub const ARCHETYPE_REGULAR: &str = "regular";
pub const ARCHETYPE_PRIVATE_MESSAGE: &str = "private_message";

/// Timestamp layout used for every DATETIME column we write ourselves, so
/// text comparisons in SQL agree with SQLite's CURRENT_TIMESTAMP.
pub const DB_DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Topic {
    pub id: i64,
    pub title: String,
    pub category_id: Option<i64>,
    pub archetype: String,
    pub views: i64,
    pub pinned_at: Option<NaiveDateTime>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TopicForm {
    pub title: String,
    pub category_id: Option<i64>,
    pub archetype: String,
    pub views: i64,
    pub pinned_at: Option<NaiveDateTime>,
    pub created_at: Option<NaiveDateTime>,
}

impl Topic {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Topic {
            id: row.get("id")?,
            title: row.get("title")?,
            category_id: row.get("category_id")?,
            archetype: row.get("archetype")?,
            views: row.get("views")?,
            pinned_at: row.get("pinned_at")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn is_pinned(&self) -> bool {
        self.pinned_at.is_some()
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row("SELECT * FROM topics WHERE id = ?1", params![id], Self::from_row)
            .ok()
    }

    /// Listing order: pinned first, then newest.
    pub fn list(pool: &DbPool, limit: i64, offset: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };

        let mut stmt = match conn.prepare(
            "SELECT * FROM topics WHERE archetype = ?1
             ORDER BY pinned_at IS NULL, pinned_at DESC, created_at DESC, id DESC
             LIMIT ?2 OFFSET ?3",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };

        stmt.query_map(params![ARCHETYPE_REGULAR, limit, offset], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM topics WHERE archetype = ?1",
            params![ARCHETYPE_REGULAR],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    pub fn create(pool: &DbPool, form: &TopicForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let created_at = form
            .created_at
            .unwrap_or_else(|| chrono::Utc::now().naive_utc())
            .format(DB_DATETIME_FORMAT)
            .to_string();
        let pinned_at = form
            .pinned_at
            .map(|t| t.format(DB_DATETIME_FORMAT).to_string());
        conn.execute(
            "INSERT INTO topics (title, category_id, archetype, views, pinned_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                form.title,
                form.category_id,
                form.archetype,
                form.views.max(0),
                pinned_at,
                created_at
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn set_pinned(pool: &DbPool, id: i64, pinned_at: Option<NaiveDateTime>) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let pinned_at = pinned_at.map(|t| t.format(DB_DATETIME_FORMAT).to_string());
        conn.execute(
            "UPDATE topics SET pinned_at = ?1 WHERE id = ?2",
            params![pinned_at, id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    /// All pinned topics of the given archetype.
    pub fn list_pinned(pool: &DbPool, archetype: &str) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare("SELECT * FROM topics WHERE pinned_at IS NOT NULL AND archetype = ?1 ORDER BY id")
            .map_err(|e| e.to_string())?;
        let rows = stmt
            .query_map(params![archetype], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }

    /// Unpinned topics of the given archetype created strictly after `since`.
    pub fn list_unpinned_since(
        pool: &DbPool,
        archetype: &str,
        since: &NaiveDateTime,
    ) -> Result<Vec<Self>, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let mut stmt = conn
            .prepare(
                "SELECT * FROM topics
                 WHERE pinned_at IS NULL AND archetype = ?1 AND created_at > ?2
                 ORDER BY id",
            )
            .map_err(|e| e.to_string())?;
        let since = since.format(DB_DATETIME_FORMAT).to_string();
        let rows = stmt
            .query_map(params![archetype, since], Self::from_row)
            .map_err(|e| e.to_string())?;
        rows.collect::<rusqlite::Result<Vec<_>>>()
            .map_err(|e| e.to_string())
    }
}
