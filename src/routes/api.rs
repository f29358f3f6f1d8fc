use std::sync::Arc;

use rocket::serde::json::Json;
use rocket::State;
use serde::Serialize;

use crate::serializers::{self, BasicCategory, TopicListItem, TopicViewPayload};
use crate::store::Store;

const DEFAULT_PAGE_SIZE: i64 = 30;
const MAX_PAGE_SIZE: i64 = 100;

// ── Topic list ─────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct TopicListResponse {
    pub topics: Vec<TopicListItem>,
    pub total: i64,
}

#[get("/topics?<limit>&<offset>")]
pub fn topic_list(
    store: &State<Arc<dyn Store>>,
    limit: Option<i64>,
    offset: Option<i64>,
) -> Json<TopicListResponse> {
    let s: &dyn Store = &**store.inner();
    let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE);
    let offset = offset.unwrap_or(0).max(0);

    let topics = s.topic_list(limit, offset);
    Json(TopicListResponse {
        topics: serializers::serialize_topic_list(s, &topics),
        total: s.topic_count(),
    })
}

// ── Single topic ───────────────────────────────────────

#[get("/t/<id>")]
pub fn topic_show(store: &State<Arc<dyn Store>>, id: i64) -> Option<Json<TopicViewPayload>> {
    let s: &dyn Store = &**store.inner();
    let topic = s.topic_find_by_id(id)?;
    Some(Json(serializers::serialize_topic_view(s, &topic)))
}

// ── Categories ─────────────────────────────────────────

#[get("/categories")]
pub fn category_list(store: &State<Arc<dyn Store>>) -> Json<Vec<BasicCategory>> {
    let s: &dyn Store = &**store.inner();
    Json(
        s.category_list()
            .iter()
            .map(|c| serializers::serialize_category(s, c))
            .collect(),
    )
}

pub fn routes() -> Vec<rocket::Route> {
    routes![topic_list, topic_show, category_list]
}
