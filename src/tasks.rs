use rocket::fairing::{Fairing, Info, Kind};
use rocket::tokio;
use rocket::{Orbit, Rocket};
use std::sync::Arc;
use std::time::Duration;

use crate::jobs::view_count_increment::{RunSummary, ViewCountIncrementJob, INCREMENT_INTERVAL};
use crate::rate_limit::RateLimiter;
use crate::store::Store;

const RATE_LIMIT_CLEANUP_INTERVAL: Duration = Duration::from_secs(10 * 60);
const AUDIT_LOG_CLEANUP_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const AUDIT_LOG_MAX_AGE_DAYS: i64 = 90;

pub struct BackgroundTasks;

#[rocket::async_trait]
impl Fairing for BackgroundTasks {
    fn info(&self) -> Info {
        Info {
            name: "Background Tasks",
            kind: Kind::Liftoff,
        }
    }

    async fn on_liftoff(&self, rocket: &Rocket<Orbit>) {
        let Some(store) = rocket.state::<Arc<dyn Store>>().cloned() else {
            log::error!("[task] Store not found in managed state; background tasks not started");
            return;
        };

        // View count increment job
        let s = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(INCREMENT_INTERVAL).await;
                run_view_count_increment(&*s);
            }
        });

        // Rate limiter cleanup task
        if let Some(limiter) = rocket.state::<Arc<RateLimiter>>().cloned() {
            tokio::spawn(async move {
                loop {
                    tokio::time::sleep(RATE_LIMIT_CLEANUP_INTERVAL).await;
                    limiter.cleanup(RATE_LIMIT_CLEANUP_INTERVAL);
                }
            });
        }

        // Audit log cleanup task
        let s = Arc::clone(&store);
        tokio::spawn(async move {
            loop {
                tokio::time::sleep(AUDIT_LOG_CLEANUP_INTERVAL).await;
                match s.audit_cleanup(AUDIT_LOG_MAX_AGE_DAYS) {
                    Ok(count) => {
                        if count > 0 {
                            log::info!("[task] Cleaned up {} old audit log entries", count);
                        }
                    }
                    Err(e) => log::error!("[task] Audit log cleanup failed: {}", e),
                }
            }
        });

        log::info!("[task] Background tasks started");
    }
}

/// One scheduled tick of the increment job.
pub fn run_view_count_increment(store: &dyn Store) -> Option<RunSummary> {
    let mut rng = rand::thread_rng();
    let now = chrono::Utc::now().naive_utc();
    ViewCountIncrementJob::new(store).execute(&mut rng, now)
}
