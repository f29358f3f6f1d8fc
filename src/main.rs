#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::{Build, Rocket};

mod boot;
mod db;
mod events;
mod jobs;
mod models;
mod rate_limit;
mod revision;
mod routes;
mod security;
mod serializers;
mod store;
mod tasks;
mod view_count;


use events::EventBus;
use rate_limit::RateLimiter;
use store::sqlite::SqliteStore;
use store::Store;

/// Assemble the Rocket instance around an already-migrated store.
pub fn build_rocket(store: Arc<dyn Store>, events: EventBus) -> Rocket<Build> {
    rocket::build()
        .manage(store)
        .manage(Arc::new(RateLimiter::new()))
        .manage(events)
        .attach(tasks::BackgroundTasks)
        .mount("/api", routes::api::routes())
        .mount("/admin/api", routes::admin_api::routes())
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    let db_path = db::db_path();
    boot::run(&db_path);

    let store = match SqliteStore::new_at(&db_path) {
        Ok(s) => s,
        Err(e) => {
            log::error!("Failed to initialize database pool: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = store.run_migrations().and_then(|_| store.seed_defaults()) {
        log::error!("Failed to prepare database: {}", e);
        std::process::exit(1);
    }

    match security::auth::ensure_bootstrap_admin(&store) {
        Ok(Some(token)) => log::warn!(
            "No staff account found; created 'admin' with API token {} (shown once)",
            token
        ),
        Ok(None) => {}
        Err(e) => log::error!("Failed to create bootstrap admin: {}", e),
    }

    build_rocket(Arc::new(store), EventBus::with_logging())
}
