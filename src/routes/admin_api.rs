use std::sync::Arc;

use rocket::http::Status;
use rocket::response::status;
use rocket::serde::json::Json;
use rocket::State;
use serde_json::{json, Value};

use crate::events::EventBus;
use crate::models::audit::AuditEntry;
use crate::rate_limit::RateLimiter;
use crate::revision::{RevisionError, TopicRevisor, ViewCountEdit};
use crate::security::auth::StaffUser;
use crate::serializers::{self, TopicViewPayload};
use crate::store::Store;

type ApiError = status::Custom<Json<Value>>;

fn revision_error(err: RevisionError) -> ApiError {
    let code = match err {
        RevisionError::Forbidden => Status::Forbidden,
        RevisionError::NotFound(_) => Status::NotFound,
        RevisionError::Invalid(_) => Status::UnprocessableEntity,
        RevisionError::RateLimited(_) => Status::TooManyRequests,
        RevisionError::Store(ref e) => {
            log::error!("[view-count] Edit failed: {}", e);
            Status::InternalServerError
        }
    };
    status::Custom(code, Json(json!({ "error": err.to_string() })))
}

// ── Edit custom view count ─────────────────────────────

#[put("/topics/<id>/view-count", format = "json", data = "<edit>")]
pub fn update_view_count(
    staff: StaffUser,
    store: &State<Arc<dyn Store>>,
    limiter: &State<Arc<RateLimiter>>,
    events: &State<EventBus>,
    id: i64,
    edit: Json<ViewCountEdit>,
) -> Result<Json<TopicViewPayload>, ApiError> {
    let s: &dyn Store = &**store.inner();
    let revisor = TopicRevisor::new(s, limiter.inner().as_ref(), events.inner());
    revisor
        .revise(&staff.user, id, &edit)
        .map_err(revision_error)?;

    let topic = s
        .topic_find_by_id(id)
        .ok_or_else(|| revision_error(RevisionError::NotFound(id)))?;
    Ok(Json(serializers::serialize_topic_view(s, &topic)))
}

// ── Edit history ───────────────────────────────────────

#[get("/topics/<id>/view-count/history?<limit>")]
pub fn view_count_history(
    _staff: StaffUser,
    store: &State<Arc<dyn Store>>,
    id: i64,
    limit: Option<i64>,
) -> Json<Vec<AuditEntry>> {
    let limit = limit.unwrap_or(50).clamp(1, 500);
    Json(store.audit_list(None, Some(id), limit, 0))
}

pub fn routes() -> Vec<rocket::Route> {
    routes![update_view_count, view_count_history]
}
