use std::collections::HashMap;

use rusqlite::params;

use crate::db::DbPool;

// ── Field names ─────────────────────────────────────────────

pub const CUSTOM_VIEW_COUNT: &str = "custom_view_count";
pub const USE_CUSTOM_VIEW_COUNT: &str = "use_custom_view_count";
pub const LAST_AUTO_INCREMENT: &str = "last_auto_increment";

pub const VIEW_COUNT_CONTROL_ENABLED: &str = "view_count_control_enabled";
pub const VIEW_COUNT_CONTROL_DEFAULT: &str = "view_count_control_default";

/// Which host entity a custom field row hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityKind {
    Topic,
    Category,
}

impl EntityKind {
    fn table(self) -> &'static str {
        match self {
            EntityKind::Topic => "topic_custom_fields",
            EntityKind::Category => "category_custom_fields",
        }
    }

    fn id_column(self) -> &'static str {
        match self {
            EntityKind::Topic => "topic_id",
            EntityKind::Category => "category_id",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldType {
    Integer,
    Boolean,
    Text,
}

const TOPIC_FIELD_TYPES: &[(&str, FieldType)] = &[
    (CUSTOM_VIEW_COUNT, FieldType::Integer),
    (USE_CUSTOM_VIEW_COUNT, FieldType::Boolean),
    (LAST_AUTO_INCREMENT, FieldType::Text),
];

const CATEGORY_FIELD_TYPES: &[(&str, FieldType)] = &[
    (VIEW_COUNT_CONTROL_ENABLED, FieldType::Boolean),
    (VIEW_COUNT_CONTROL_DEFAULT, FieldType::Boolean),
];

/// Registered type of a custom field, if it has been registered.
pub fn registered_type(kind: EntityKind, name: &str) -> Option<FieldType> {
    let table = match kind {
        EntityKind::Topic => TOPIC_FIELD_TYPES,
        EntityKind::Category => CATEGORY_FIELD_TYPES,
    };
    table.iter().find(|(n, _)| *n == name).map(|(_, t)| *t)
}

#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Integer(i64),
    Boolean(bool),
    Text(String),
}

impl FieldValue {
    pub fn field_type(&self) -> FieldType {
        match self {
            FieldValue::Integer(_) => FieldType::Integer,
            FieldValue::Boolean(_) => FieldType::Boolean,
            FieldValue::Text(_) => FieldType::Text,
        }
    }

    /// Storage form. Booleans are written as `t` / `f`.
    pub fn to_db_string(&self) -> String {
        match self {
            FieldValue::Integer(n) => n.to_string(),
            FieldValue::Boolean(true) => "t".to_string(),
            FieldValue::Boolean(false) => "f".to_string(),
            FieldValue::Text(s) => s.clone(),
        }
    }
}

pub fn parse_bool(raw: &str) -> Option<bool> {
    match raw.trim() {
        "t" | "true" | "1" => Some(true),
        "f" | "false" | "0" => Some(false),
        _ => None,
    }
}

/// Raw custom field values of one entity, read through typed accessors.
/// Missing or unparsable values read as `None`.
#[derive(Debug, Clone, Default)]
pub struct CustomFields {
    values: HashMap<String, String>,
}

impl CustomFields {
    pub fn new(values: HashMap<String, String>) -> Self {
        Self { values }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(|s| s.as_str())
    }

    pub fn get_i64(&self, name: &str) -> Option<i64> {
        self.get(name).and_then(|v| v.trim().parse().ok())
    }

    pub fn get_bool(&self, name: &str) -> Option<bool> {
        self.get(name).and_then(parse_bool)
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

pub struct CustomField;

impl CustomField {
    pub fn for_entity(pool: &DbPool, kind: EntityKind, entity_id: i64) -> CustomFields {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return CustomFields::default(),
        };

        let sql = format!(
            "SELECT name, value FROM {} WHERE {} = ?1",
            kind.table(),
            kind.id_column()
        );
        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(_) => return CustomFields::default(),
        };

        let values: HashMap<String, String> = stmt
            .query_map(params![entity_id], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, Option<String>>(1)?))
            })
            .map(|rows| {
                rows.filter_map(|r| r.ok())
                    .filter_map(|(k, v)| v.map(|v| (k, v)))
                    .collect()
            })
            .unwrap_or_default();

        CustomFields::new(values)
    }

    /// Preload fields for many entities in one query (topic lists).
    pub fn for_entities(
        pool: &DbPool,
        kind: EntityKind,
        entity_ids: &[i64],
    ) -> HashMap<i64, CustomFields> {
        let mut out: HashMap<i64, CustomFields> = HashMap::new();
        if entity_ids.is_empty() {
            return out;
        }
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return out,
        };

        let placeholders = (1..=entity_ids.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "SELECT {id}, name, value FROM {table} WHERE {id} IN ({placeholders})",
            id = kind.id_column(),
            table = kind.table(),
            placeholders = placeholders
        );
        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(_) => return out,
        };

        let rows = stmt.query_map(rusqlite::params_from_iter(entity_ids.iter()), |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, Option<String>>(2)?,
            ))
        });

        if let Ok(rows) = rows {
            for (id, name, value) in rows.filter_map(|r| r.ok()) {
                if let Some(value) = value {
                    out.entry(id).or_default().values.insert(name, value);
                }
            }
        }
        out
    }

    /// Upsert one field. The value must match the field's registered type.
    pub fn set(
        pool: &DbPool,
        kind: EntityKind,
        entity_id: i64,
        name: &str,
        value: &FieldValue,
    ) -> Result<(), String> {
        Self::set_many(pool, kind, entity_id, &[(name, value.clone())])
    }

    /// Upsert several fields of one entity in a single transaction. Every
    /// value is type-checked first; either all fields are written or none.
    pub fn set_many(
        pool: &DbPool,
        kind: EntityKind,
        entity_id: i64,
        fields: &[(&str, FieldValue)],
    ) -> Result<(), String> {
        for (name, value) in fields {
            check_type(kind, name, value)?;
        }

        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        let sql = format!(
            "INSERT INTO {table} ({id}, name, value, updated_at) VALUES (?1, ?2, ?3, CURRENT_TIMESTAMP)
             ON CONFLICT({id}, name) DO UPDATE SET value = ?3, updated_at = CURRENT_TIMESTAMP",
            table = kind.table(),
            id = kind.id_column()
        );
        for (name, value) in fields {
            tx.execute(&sql, params![entity_id, name, value.to_db_string()])
                .map_err(|e| e.to_string())?;
        }
        tx.commit().map_err(|e| e.to_string())
    }
}

fn check_type(kind: EntityKind, name: &str, value: &FieldValue) -> Result<(), String> {
    match registered_type(kind, name) {
        Some(t) if t == value.field_type() => Ok(()),
        Some(t) => Err(format!(
            "custom field '{}' is registered as {:?}, got {:?}",
            name,
            t,
            value.field_type()
        )),
        None => Err(format!("custom field '{}' is not registered", name)),
    }
}
