use rand::RngCore;
use rocket::http::Status;
use rocket::request::{FromRequest, Outcome, Request};
use sha2::{Digest, Sha256};
use std::sync::Arc;

use crate::models::user::User;
use crate::store::Store;

/// Hash an API token for storage / lookup (SHA-256, hex).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Fresh random API token (32 bytes, hex).
pub fn generate_token() -> String {
    let mut bytes = [0u8; 32];
    rand::thread_rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

fn bearer_token<'r>(request: &'r Request<'_>) -> Option<&'r str> {
    let header = request.headers().get_one("Authorization")?;
    let token = header.strip_prefix("Bearer ")?.trim();
    if token.is_empty() {
        None
    } else {
        Some(token)
    }
}

fn resolve_token_user(request: &Request<'_>) -> Option<User> {
    let token = bearer_token(request)?;
    let store = request.rocket().state::<Arc<dyn Store>>()?;
    store.user_get_by_token_hash(&hash_token(token))
}

/// Guard: active admin or moderator authenticated by `Authorization: Bearer <token>`.
pub struct StaffUser {
    pub user: User,
}

#[rocket::async_trait]
impl<'r> FromRequest<'r> for StaffUser {
    type Error = ();

    async fn from_request(request: &'r Request<'_>) -> Outcome<Self, Self::Error> {
        match resolve_token_user(request) {
            Some(user) if user.is_staff() => Outcome::Success(StaffUser { user }),
            Some(_) => Outcome::Error((Status::Forbidden, ())),
            None => Outcome::Error((Status::Unauthorized, ())),
        }
    }
}

/// Create an admin with a fresh token when no staff account exists yet.
/// Returns the plaintext token so it can be shown once.
pub fn ensure_bootstrap_admin(store: &dyn Store) -> Result<Option<String>, String> {
    if store.user_count_staff() > 0 {
        return Ok(None);
    }
    let token = generate_token();
    store.user_create("admin", "admin", Some(&hash_token(&token)))?;
    Ok(Some(token))
}
