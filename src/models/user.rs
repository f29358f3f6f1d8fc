use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub role: String,   // admin, moderator, member
    pub status: String, // active, suspended
    #[serde(skip_serializing)]
    pub api_token_hash: Option<String>,
    pub created_at: String,
}

impl User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        Ok(User {
            id: row.get(0)?,
            username: row.get(1)?,
            role: row.get(2)?,
            status: row.get(3)?,
            api_token_hash: row.get(4)?,
            created_at: row.get(5)?,
        })
    }

    const SELECT_COLS: &'static str = "id, username, role, status, api_token_hash, created_at";

    // ── Lookups ──

    pub fn get_by_id(pool: &DbPool, id: i64) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", Self::SELECT_COLS),
            params![id],
            Self::from_row,
        )
        .ok()
    }

    pub fn get_by_token_hash(pool: &DbPool, token_hash: &str) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE api_token_hash = ?1", Self::SELECT_COLS),
            params![token_hash],
            Self::from_row,
        )
        .ok()
    }

    /// Active staff only; suspended accounts cannot edit.
    pub fn count_staff(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role IN ('admin', 'moderator') AND status = 'active'",
            [],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    // ── Mutations ──

    pub fn create(
        pool: &DbPool,
        username: &str,
        role: &str,
        api_token_hash: Option<&str>,
    ) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO users (username, role, api_token_hash) VALUES (?1, ?2, ?3)",
            params![username, role, api_token_hash],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update_status(pool: &DbPool, id: i64, status: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET status = ?1 WHERE id = ?2",
            params![status, id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    // ── Role helpers ──

    pub fn is_active(&self) -> bool {
        self.status == "active"
    }

    /// Staff may edit view counts: active admins and moderators.
    pub fn is_staff(&self) -> bool {
        self.is_active() && (self.role == "admin" || self.role == "moderator")
    }
}
