//! Read models returned by the API. `views` on every topic payload is
//! produced by a `ViewCountProvider`, so the override applies wherever a
//! topic's view count is shown.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::category::Category;
use crate::models::custom_field::{LAST_AUTO_INCREMENT, VIEW_COUNT_CONTROL_DEFAULT, VIEW_COUNT_CONTROL_ENABLED};
use crate::models::topic::Topic;
use crate::store::Store;
use crate::view_count::{BaseViews, OverriddenViews, OverrideResolver, ViewCountProvider};

#[derive(Debug, Serialize)]
pub struct TopicListItem {
    pub id: i64,
    pub title: String,
    pub category_id: Option<i64>,
    pub pinned: bool,
    pub views: i64,
    pub custom_view_count: i64,
    pub use_custom_view_count: bool,
    pub display_view_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct TopicViewPayload {
    pub id: i64,
    pub title: String,
    pub category_id: Option<i64>,
    pub archetype: String,
    pub pinned_at: Option<NaiveDateTime>,
    pub views: i64,
    pub custom_view_count: i64,
    pub use_custom_view_count: bool,
    pub display_view_count: i64,
    pub last_auto_increment: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Serialize)]
pub struct BasicCategory {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub view_count_control_enabled: Option<bool>,
    pub view_count_control_default: Option<bool>,
}

pub struct TopicSerializer<'r, 'a> {
    views: OverriddenViews<'r, 'a, BaseViews>,
    resolver: &'r OverrideResolver<'a>,
}

impl<'r, 'a> TopicSerializer<'r, 'a> {
    pub fn new(resolver: &'r OverrideResolver<'a>) -> Self {
        Self {
            views: OverriddenViews::new(BaseViews, resolver),
            resolver,
        }
    }

    pub fn list_item(&self, topic: &Topic) -> TopicListItem {
        let state = self.views.resolve(topic);
        TopicListItem {
            id: topic.id,
            title: topic.title.clone(),
            category_id: topic.category_id,
            pinned: topic.is_pinned(),
            views: self.views.views(topic),
            custom_view_count: state.custom,
            use_custom_view_count: state.use_custom,
            display_view_count: state.display(),
            created_at: topic.created_at,
        }
    }

    pub fn topic_view(&self, topic: &Topic) -> TopicViewPayload {
        let state = self.views.resolve(topic);
        let last_auto_increment = self
            .resolver
            .topic_fields(topic.id)
            .get(LAST_AUTO_INCREMENT)
            .map(|s| s.to_string());
        TopicViewPayload {
            id: topic.id,
            title: topic.title.clone(),
            category_id: topic.category_id,
            archetype: topic.archetype.clone(),
            pinned_at: topic.pinned_at,
            views: state.display(),
            custom_view_count: state.custom,
            use_custom_view_count: state.use_custom,
            display_view_count: state.display(),
            last_auto_increment,
            created_at: topic.created_at,
        }
    }
}

pub fn serialize_topic_list(store: &dyn Store, topics: &[Topic]) -> Vec<TopicListItem> {
    let resolver = OverrideResolver::new(store);
    resolver.preload(topics);
    let serializer = TopicSerializer::new(&resolver);
    topics.iter().map(|t| serializer.list_item(t)).collect()
}

pub fn serialize_topic_view(store: &dyn Store, topic: &Topic) -> TopicViewPayload {
    let resolver = OverrideResolver::new(store);
    TopicSerializer::new(&resolver).topic_view(topic)
}

pub fn serialize_category(store: &dyn Store, category: &Category) -> BasicCategory {
    let fields = store.category_custom_fields(category.id);
    BasicCategory {
        id: category.id,
        name: category.name.clone(),
        slug: category.slug.clone(),
        view_count_control_enabled: fields.get_bool(VIEW_COUNT_CONTROL_ENABLED),
        view_count_control_default: fields.get_bool(VIEW_COUNT_CONTROL_DEFAULT),
    }
}
