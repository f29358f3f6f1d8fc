use std::collections::HashMap;

use chrono::NaiveDateTime;

use crate::db::DbPool;
use crate::models::audit::AuditEntry;
use crate::models::category::{Category, CategoryForm};
use crate::models::custom_field::{CustomField, CustomFields, EntityKind, FieldValue};
use crate::models::settings::Setting;
use crate::models::topic::{Topic, TopicForm};
use crate::models::user::User;

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn new_at(path: &str) -> Result<Self, String> {
        let pool = crate::db::init_pool_at(path)?;
        Ok(Self { pool })
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    fn seed_defaults(&self) -> Result<(), String> {
        crate::db::seed_defaults(&self.pool).map_err(|e| e.to_string())
    }

    // ── Settings ────────────────────────────────────────────────────

    fn setting_get(&self, key: &str) -> Option<String> {
        Setting::get(&self.pool, key)
    }

    fn setting_set(&self, key: &str, value: &str) -> Result<(), String> {
        Setting::set(&self.pool, key, value)
    }

    // ── Topics ──────────────────────────────────────────────────────

    fn topic_find_by_id(&self, id: i64) -> Option<Topic> {
        Topic::find_by_id(&self.pool, id)
    }

    fn topic_list(&self, limit: i64, offset: i64) -> Vec<Topic> {
        Topic::list(&self.pool, limit, offset)
    }

    fn topic_count(&self) -> i64 {
        Topic::count(&self.pool)
    }

    fn topic_create(&self, form: &TopicForm) -> Result<i64, String> {
        Topic::create(&self.pool, form)
    }

    fn topic_set_pinned(&self, id: i64, pinned_at: Option<NaiveDateTime>) -> Result<(), String> {
        Topic::set_pinned(&self.pool, id, pinned_at)
    }

    fn topic_list_pinned(&self, archetype: &str) -> Result<Vec<Topic>, String> {
        Topic::list_pinned(&self.pool, archetype)
    }

    fn topic_list_unpinned_since(
        &self,
        archetype: &str,
        since: &NaiveDateTime,
    ) -> Result<Vec<Topic>, String> {
        Topic::list_unpinned_since(&self.pool, archetype, since)
    }

    // ── Topic custom fields ─────────────────────────────────────────

    fn topic_custom_fields(&self, topic_id: i64) -> CustomFields {
        CustomField::for_entity(&self.pool, EntityKind::Topic, topic_id)
    }

    fn topic_custom_fields_many(&self, topic_ids: &[i64]) -> HashMap<i64, CustomFields> {
        CustomField::for_entities(&self.pool, EntityKind::Topic, topic_ids)
    }

    fn topic_custom_field_set(
        &self,
        topic_id: i64,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), String> {
        CustomField::set(&self.pool, EntityKind::Topic, topic_id, name, value)
    }

    fn topic_custom_fields_set(
        &self,
        topic_id: i64,
        fields: &[(&str, FieldValue)],
    ) -> Result<(), String> {
        CustomField::set_many(&self.pool, EntityKind::Topic, topic_id, fields)
    }

    // ── Categories ──────────────────────────────────────────────────

    fn category_list(&self) -> Vec<Category> {
        Category::list(&self.pool)
    }

    fn category_create(&self, form: &CategoryForm) -> Result<i64, String> {
        Category::create(&self.pool, form)
    }

    fn category_custom_fields(&self, category_id: i64) -> CustomFields {
        CustomField::for_entity(&self.pool, EntityKind::Category, category_id)
    }

    fn category_custom_fields_many(&self, category_ids: &[i64]) -> HashMap<i64, CustomFields> {
        CustomField::for_entities(&self.pool, EntityKind::Category, category_ids)
    }

    fn category_custom_field_set(
        &self,
        category_id: i64,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), String> {
        CustomField::set(&self.pool, EntityKind::Category, category_id, name, value)
    }

    // ── Users ───────────────────────────────────────────────────────

    fn user_get_by_id(&self, id: i64) -> Option<User> {
        User::get_by_id(&self.pool, id)
    }

    fn user_get_by_token_hash(&self, token_hash: &str) -> Option<User> {
        User::get_by_token_hash(&self.pool, token_hash)
    }

    fn user_count_staff(&self) -> i64 {
        User::count_staff(&self.pool)
    }

    fn user_create(
        &self,
        username: &str,
        role: &str,
        api_token_hash: Option<&str>,
    ) -> Result<i64, String> {
        User::create(&self.pool, username, role, api_token_hash)
    }

    fn user_update_status(&self, id: i64, status: &str) -> Result<(), String> {
        User::update_status(&self.pool, id, status)
    }

    // ── Audit Log ───────────────────────────────────────────────────

    fn audit_log(
        &self,
        user_id: Option<i64>,
        user_name: Option<&str>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        details: Option<&str>,
    ) {
        AuditEntry::log(
            &self.pool,
            user_id,
            user_name,
            action,
            entity_type,
            entity_id,
            details,
        )
    }

    fn audit_list(
        &self,
        action_filter: Option<&str>,
        entity_filter: Option<i64>,
        limit: i64,
        offset: i64,
    ) -> Vec<AuditEntry> {
        AuditEntry::list(&self.pool, action_filter, entity_filter, limit, offset)
    }

    fn audit_cleanup(&self, max_age_days: i64) -> Result<usize, String> {
        AuditEntry::cleanup(&self.pool, max_age_days)
    }
}
