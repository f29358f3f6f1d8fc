//! Staff edits of a topic's view count fields.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::events::{EventBus, ViewCountEvent};
use crate::models::custom_field::{FieldValue, CUSTOM_VIEW_COUNT, USE_CUSTOM_VIEW_COUNT};
use crate::models::user::User;
use crate::rate_limit::{RateLimitRule, RateLimiter, VIEW_COUNT_EDIT, VIEW_COUNT_TOGGLE};
use crate::store::Store;
use crate::view_count::custom_view_count;

/// Fields a staff member may change. Absent fields are left untouched.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ViewCountEdit {
    pub custom_view_count: Option<i64>,
    pub use_custom_view_count: Option<bool>,
}

impl ViewCountEdit {
    pub fn is_empty(&self) -> bool {
        self.custom_view_count.is_none() && self.use_custom_view_count.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RevisionError {
    Forbidden,
    NotFound(i64),
    Invalid(String),
    RateLimited(&'static str),
    Store(String),
}

impl fmt::Display for RevisionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RevisionError::Forbidden => write!(f, "Only staff may change view counts"),
            RevisionError::NotFound(id) => write!(f, "Topic {} not found", id),
            RevisionError::Invalid(msg) => write!(f, "{}", msg),
            RevisionError::RateLimited(bucket) => write!(
                f,
                "Too many {} requests. Please wait a minute and try again.",
                bucket.replace('_', " ")
            ),
            RevisionError::Store(msg) => write!(f, "Failed to save view count: {}", msg),
        }
    }
}

impl std::error::Error for RevisionError {}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RevisionOutcome {
    pub topic_id: i64,
    pub events: Vec<ViewCountEvent>,
}

pub struct TopicRevisor<'a> {
    store: &'a dyn Store,
    limiter: &'a RateLimiter,
    events: &'a EventBus,
}

impl<'a> TopicRevisor<'a> {
    pub fn new(store: &'a dyn Store, limiter: &'a RateLimiter, events: &'a EventBus) -> Self {
        Self { store, limiter, events }
    }

    /// Apply `edit` to the topic on behalf of `actor`.
    ///
    /// Every rate limit touched by the edit is checked before anything is
    /// written; a rejected edit changes nothing.
    pub fn revise(
        &self,
        actor: &User,
        topic_id: i64,
        edit: &ViewCountEdit,
    ) -> Result<RevisionOutcome, RevisionError> {
        if !actor.is_staff() {
            return Err(RevisionError::Forbidden);
        }
        if self.store.topic_find_by_id(topic_id).is_none() {
            return Err(RevisionError::NotFound(topic_id));
        }
        if edit.is_empty() {
            return Err(RevisionError::Invalid(
                "Edit contains no view count fields".to_string(),
            ));
        }
        if let Some(count) = edit.custom_view_count {
            if count < 0 {
                return Err(RevisionError::Invalid(
                    "Custom view count must not be negative".to_string(),
                ));
            }
        }

        let mut rules: Vec<RateLimitRule> = Vec::new();
        if edit.custom_view_count.is_some() {
            rules.push(VIEW_COUNT_EDIT);
        }
        if edit.use_custom_view_count.is_some() {
            rules.push(VIEW_COUNT_TOGGLE);
        }
        let limits: Vec<_> = rules
            .iter()
            .map(|r| (r.key(actor.id), r.max_attempts, r.window))
            .collect();
        if let Err(i) = self.limiter.check_and_record_all(&limits) {
            log::warn!(
                "[view-count] Rate limit '{}' hit by user {} editing topic {}",
                rules[i].bucket,
                actor.id,
                topic_id
            );
            return Err(RevisionError::RateLimited(rules[i].bucket));
        }

        let current = self.store.topic_custom_fields(topic_id);
        let mut writes: Vec<(&str, FieldValue)> = Vec::new();
        if let Some(new) = edit.custom_view_count {
            writes.push((CUSTOM_VIEW_COUNT, FieldValue::Integer(new)));
        }
        if let Some(new) = edit.use_custom_view_count {
            writes.push((USE_CUSTOM_VIEW_COUNT, FieldValue::Boolean(new)));
        }
        log::info!(
            "[view-count] Updating topic {}: custom count {:?}, toggle {:?}",
            topic_id,
            edit.custom_view_count,
            edit.use_custom_view_count
        );
        // Both fields land together or not at all
        self.store
            .topic_custom_fields_set(topic_id, &writes)
            .map_err(RevisionError::Store)?;

        let mut outcome = RevisionOutcome {
            topic_id,
            events: Vec::new(),
        };

        if let Some(new) = edit.custom_view_count {
            let old = custom_view_count(&current);
            self.store.audit_log(
                Some(actor.id),
                Some(&actor.username),
                "view_count_edit",
                Some("topic"),
                Some(topic_id),
                Some(&format!("{} -> {}", old, new)),
            );
            outcome.events.push(ViewCountEvent::CountChanged { topic_id, old, new });
        }

        if let Some(new) = edit.use_custom_view_count {
            let old = current.get_bool(USE_CUSTOM_VIEW_COUNT);
            self.store.audit_log(
                Some(actor.id),
                Some(&actor.username),
                "view_count_toggle",
                Some("topic"),
                Some(topic_id),
                Some(&format!("{:?} -> {}", old, new)),
            );
            outcome.events.push(ViewCountEvent::ToggleChanged { topic_id, old, new });
        }

        for event in &outcome.events {
            self.events.publish(event);
        }

        Ok(outcome)
    }
}
