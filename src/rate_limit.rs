use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// A named limit: at most `max_attempts` within `window` per actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitRule {
    pub bucket: &'static str,
    pub max_attempts: u64,
    pub window: Duration,
}

impl RateLimitRule {
    pub fn key(&self, actor_id: i64) -> String {
        format!("{}:{}", self.bucket, actor_id)
    }
}

/// Staff edits of a topic's custom view count.
pub const VIEW_COUNT_EDIT: RateLimitRule = RateLimitRule {
    bucket: "view_count_edit",
    max_attempts: 5,
    window: Duration::from_secs(60),
};

/// Staff edits of a topic's custom view count toggle.
pub const VIEW_COUNT_TOGGLE: RateLimitRule = RateLimitRule {
    bucket: "view_count_toggle",
    max_attempts: 10,
    window: Duration::from_secs(60),
};

/// In-memory rate limiter keyed by (bucket, actor).
/// Each bucket has its own max attempts and window.
pub struct RateLimiter {
    entries: Mutex<HashMap<String, Vec<Instant>>>,
}

impl Default for RateLimiter {
    fn default() -> Self {
        Self::new()
    }
}

impl RateLimiter {
    pub fn new() -> Self {
        RateLimiter {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Record an attempt and return true if the attempt is allowed (under the limit).
    pub fn check_and_record(&self, key: &str, max_attempts: u64, window: Duration) -> bool {
        self.check_and_record_all(&[(key.to_string(), max_attempts, window)])
            .is_ok()
    }

    /// Check several limits at once and record an attempt against each only
    /// if all of them allow it. On rejection returns the index of the first
    /// exhausted limit and records nothing.
    pub fn check_and_record_all(&self, limits: &[(String, u64, Duration)]) -> Result<(), usize> {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();

        for (i, (key, max_attempts, window)) in limits.iter().enumerate() {
            let attempts = map.entry(key.clone()).or_default();
            // Prune old entries outside the window
            prune(attempts, now, *window);
            if (attempts.len() as u64) >= *max_attempts {
                return Err(i);
            }
        }

        for (key, _, _) in limits {
            map.entry(key.clone()).or_default().push(now);
        }
        Ok(())
    }

    /// Check remaining attempts without recording a new one.
    pub fn remaining(&self, key: &str, max_attempts: u64, window: Duration) -> u64 {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let attempts = map.entry(key.to_string()).or_default();
        prune(attempts, Instant::now(), window);

        max_attempts.saturating_sub(attempts.len() as u64)
    }

    /// Periodically clean up stale entries (called from a background task).
    pub fn cleanup(&self, max_age: Duration) {
        let mut map = match self.entries.lock() {
            Ok(m) => m,
            Err(poisoned) => poisoned.into_inner(),
        };
        let now = Instant::now();
        map.retain(|_, attempts| {
            prune(attempts, now, max_age);
            !attempts.is_empty()
        });
    }
}

fn prune(attempts: &mut Vec<Instant>, now: Instant, window: Duration) {
    // `now - window` can predate the monotonic clock's origin right after boot
    if let Some(cutoff) = now.checked_sub(window) {
        attempts.retain(|t| *t > cutoff);
    }
}
