//! Custom view count resolution for topics.
//!
//! A topic's displayed view count is its base `views` unless staff (or the
//! increment job) switched on an override with a positive custom count. The
//! override flag is tri-state: an unset flag falls back to the category
//! default when category overrides are enabled site-wide.

use std::cell::RefCell;
use std::collections::HashMap;

use serde::Serialize;

use crate::models::custom_field::{
    CustomFields, CUSTOM_VIEW_COUNT, USE_CUSTOM_VIEW_COUNT, VIEW_COUNT_CONTROL_DEFAULT,
    VIEW_COUNT_CONTROL_ENABLED,
};
use crate::models::topic::Topic;
use crate::store::Store;

pub const SETTING_ENABLED: &str = "topic_view_count_control_enabled";
pub const SETTING_CATEGORY_OVERRIDE: &str = "view_count_category_override";
pub const SETTING_COMBINATION_POLICY: &str = "view_count_combination_policy";

/// How a positive custom count combines with the base count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CombinationPolicy {
    /// Show the custom count instead of the base count.
    Replace,
    /// Show base + custom.
    Additive,
}

impl CombinationPolicy {
    /// Unknown values fall back to `Replace`.
    pub fn from_setting(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "additive" => CombinationPolicy::Additive,
            _ => CombinationPolicy::Replace,
        }
    }
}

pub fn display_view_count(base: i64, custom: i64, use_custom: bool, policy: CombinationPolicy) -> i64 {
    if use_custom && custom > 0 {
        match policy {
            CombinationPolicy::Replace => custom,
            CombinationPolicy::Additive => base.saturating_add(custom),
        }
    } else {
        base
    }
}

#[derive(Debug, Clone, Copy)]
pub struct ViewCountSettings {
    pub enabled: bool,
    pub category_override: bool,
    pub policy: CombinationPolicy,
}

impl ViewCountSettings {
    pub fn load(store: &dyn Store) -> Self {
        Self {
            enabled: store.setting_get_bool(SETTING_ENABLED),
            category_override: store.setting_get_bool(SETTING_CATEGORY_OVERRIDE),
            policy: CombinationPolicy::from_setting(
                &store.setting_get_or(SETTING_COMBINATION_POLICY, "replace"),
            ),
        }
    }
}

/// Fully resolved view count state of one topic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TopicViewCount {
    pub topic_id: i64,
    pub base: i64,
    pub custom: i64,
    /// Flag as stored on the topic, before any category fallback.
    pub explicit_flag: Option<bool>,
    pub use_custom: bool,
    pub policy: CombinationPolicy,
}

impl TopicViewCount {
    pub fn display(&self) -> i64 {
        display_view_count(self.base, self.custom, self.use_custom, self.policy)
    }
}

/// Missing custom count reads as zero.
pub fn custom_view_count(fields: &CustomFields) -> i64 {
    fields.get_i64(CUSTOM_VIEW_COUNT).unwrap_or(0).max(0)
}

/// Resolves override state for topics, caching custom fields so a topic list
/// costs one query for topics and one for categories.
pub struct OverrideResolver<'a> {
    store: &'a dyn Store,
    settings: ViewCountSettings,
    topic_fields: RefCell<HashMap<i64, CustomFields>>,
    category_fields: RefCell<HashMap<i64, CustomFields>>,
}

impl<'a> OverrideResolver<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self::with_settings(store, ViewCountSettings::load(store))
    }

    pub fn with_settings(store: &'a dyn Store, settings: ViewCountSettings) -> Self {
        Self {
            store,
            settings,
            topic_fields: RefCell::new(HashMap::new()),
            category_fields: RefCell::new(HashMap::new()),
        }
    }

    /// Load custom fields of all given topics and their categories up front.
    pub fn preload(&self, topics: &[Topic]) {
        let ids: Vec<i64> = topics.iter().map(|t| t.id).collect();
        let mut loaded = self.store.topic_custom_fields_many(&ids);
        {
            let mut cache = self.topic_fields.borrow_mut();
            for id in ids {
                cache.insert(id, loaded.remove(&id).unwrap_or_default());
            }
        }

        if self.settings.category_override {
            let mut cat_ids: Vec<i64> = topics.iter().filter_map(|t| t.category_id).collect();
            cat_ids.sort_unstable();
            cat_ids.dedup();
            let mut loaded = self.store.category_custom_fields_many(&cat_ids);
            let mut cache = self.category_fields.borrow_mut();
            for id in cat_ids {
                cache.insert(id, loaded.remove(&id).unwrap_or_default());
            }
        }
    }

    /// Drop a cached topic so the next read sees fresh values.
    pub fn invalidate(&self, topic_id: i64) {
        self.topic_fields.borrow_mut().remove(&topic_id);
    }

    pub fn topic_fields(&self, topic_id: i64) -> CustomFields {
        if let Some(fields) = self.topic_fields.borrow().get(&topic_id) {
            return fields.clone();
        }
        let fields = self.store.topic_custom_fields(topic_id);
        self.topic_fields.borrow_mut().insert(topic_id, fields.clone());
        fields
    }

    fn category_fields(&self, category_id: i64) -> CustomFields {
        if let Some(fields) = self.category_fields.borrow().get(&category_id) {
            return fields.clone();
        }
        let fields = self.store.category_custom_fields(category_id);
        self.category_fields
            .borrow_mut()
            .insert(category_id, fields.clone());
        fields
    }

    /// Category default, consulted only when the topic flag is unset.
    pub fn category_default(&self, topic: &Topic) -> bool {
        if !self.settings.category_override {
            return false;
        }
        let Some(category_id) = topic.category_id else {
            return false;
        };
        let fields = self.category_fields(category_id);
        if fields.get_bool(VIEW_COUNT_CONTROL_ENABLED).unwrap_or(false) {
            fields.get_bool(VIEW_COUNT_CONTROL_DEFAULT).unwrap_or(false)
        } else {
            false
        }
    }

    pub fn resolve(&self, topic: &Topic) -> TopicViewCount {
        self.resolve_with_base(topic, topic.views)
    }

    /// Resolve against a base count supplied by another provider.
    pub fn resolve_with_base(&self, topic: &Topic, base: i64) -> TopicViewCount {
        let fields = self.topic_fields(topic.id);
        let explicit_flag = fields.get_bool(USE_CUSTOM_VIEW_COUNT);
        let use_custom = self.settings.enabled
            && match explicit_flag {
                Some(flag) => flag,
                None => self.category_default(topic),
            };
        TopicViewCount {
            topic_id: topic.id,
            base,
            custom: custom_view_count(&fields),
            explicit_flag,
            use_custom,
            policy: self.settings.policy,
        }
    }
}

// ── View count providers ────────────────────────────────────

/// Source of the number a read model shows as a topic's `views`.
pub trait ViewCountProvider {
    fn views(&self, topic: &Topic) -> i64;
}

/// The host's own counter.
pub struct BaseViews;

impl ViewCountProvider for BaseViews {
    fn views(&self, topic: &Topic) -> i64 {
        topic.views
    }
}

/// Wraps another provider and applies the custom count override on top.
pub struct OverriddenViews<'r, 'a, P> {
    inner: P,
    resolver: &'r OverrideResolver<'a>,
}

impl<'r, 'a, P: ViewCountProvider> OverriddenViews<'r, 'a, P> {
    pub fn new(inner: P, resolver: &'r OverrideResolver<'a>) -> Self {
        Self { inner, resolver }
    }

    pub fn resolve(&self, topic: &Topic) -> TopicViewCount {
        self.resolver
            .resolve_with_base(topic, self.inner.views(topic))
    }
}

impl<P: ViewCountProvider> ViewCountProvider for OverriddenViews<'_, '_, P> {
    fn views(&self, topic: &Topic) -> i64 {
        self.resolve(topic).display()
    }
}
