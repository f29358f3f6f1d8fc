use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::models::audit::AuditEntry;
use crate::models::category::{Category, CategoryForm};
use crate::models::custom_field::{CustomFields, FieldValue};
use crate::models::topic::{Topic, TopicForm};
use crate::models::user::User;

pub mod sqlite;

/// Unified data-access trait. Every database operation goes through here.
/// Implementation: `SqliteStore` (wraps rusqlite/r2d2).
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;
    fn seed_defaults(&self) -> Result<(), String>;

    // ── Settings ────────────────────────────────────────────────────
    fn setting_get(&self, key: &str) -> Option<String>;
    fn setting_get_or(&self, key: &str, default: &str) -> String {
        self.setting_get(key).unwrap_or_else(|| default.to_string())
    }
    fn setting_get_bool(&self, key: &str) -> bool {
        self.setting_get(key)
            .map(|v| v == "true" || v == "1")
            .unwrap_or(false)
    }
    fn setting_get_i64(&self, key: &str) -> i64 {
        self.setting_get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
    fn setting_set(&self, key: &str, value: &str) -> Result<(), String>;

    // ── Topics ──────────────────────────────────────────────────────
    fn topic_find_by_id(&self, id: i64) -> Option<Topic>;
    fn topic_list(&self, limit: i64, offset: i64) -> Vec<Topic>;
    fn topic_count(&self) -> i64;
    fn topic_create(&self, form: &TopicForm) -> Result<i64, String>;
    fn topic_set_pinned(&self, id: i64, pinned_at: Option<NaiveDateTime>) -> Result<(), String>;
    fn topic_list_pinned(&self, archetype: &str) -> Result<Vec<Topic>, String>;
    fn topic_list_unpinned_since(
        &self,
        archetype: &str,
        since: &NaiveDateTime,
    ) -> Result<Vec<Topic>, String>;

    // ── Topic custom fields ─────────────────────────────────────────
    fn topic_custom_fields(&self, topic_id: i64) -> CustomFields;
    fn topic_custom_fields_many(&self, topic_ids: &[i64]) -> HashMap<i64, CustomFields>;
    fn topic_custom_field_set(
        &self,
        topic_id: i64,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), String>;
    /// All-or-nothing write of several fields on one topic.
    fn topic_custom_fields_set(
        &self,
        topic_id: i64,
        fields: &[(&str, FieldValue)],
    ) -> Result<(), String>;

    // ── Categories ──────────────────────────────────────────────────
    fn category_list(&self) -> Vec<Category>;
    fn category_create(&self, form: &CategoryForm) -> Result<i64, String>;
    fn category_custom_fields(&self, category_id: i64) -> CustomFields;
    fn category_custom_fields_many(&self, category_ids: &[i64]) -> HashMap<i64, CustomFields>;
    fn category_custom_field_set(
        &self,
        category_id: i64,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), String>;

    // ── Users ───────────────────────────────────────────────────────
    fn user_get_by_id(&self, id: i64) -> Option<User>;
    fn user_get_by_token_hash(&self, token_hash: &str) -> Option<User>;
    fn user_count_staff(&self) -> i64;
    fn user_create(
        &self,
        username: &str,
        role: &str,
        api_token_hash: Option<&str>,
    ) -> Result<i64, String>;
    fn user_update_status(&self, id: i64, status: &str) -> Result<(), String>;

    // ── Audit Log ───────────────────────────────────────────────────
    fn audit_log(
        &self,
        user_id: Option<i64>,
        user_name: Option<&str>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    );
    fn audit_list(
        &self,
        action_filter: Option<&str>,
        entity_filter: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Vec<AuditEntry>;
    fn audit_cleanup(&self, max_age_days: i64) -> Result<usize, String>;
}
