//! Scheduled job that nudges topic view counts upward.
//!
//! Each run picks a weighted share of pinned topics plus a random sample of
//! recent regular topics and adds a small random increment to each one's
//! custom view count. A topic's fields are written together; the first
//! topic that fails to save ends the run and earlier topics stay updated.

use std::ops::RangeInclusive;
use std::time::Duration;

use chrono::NaiveDateTime;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Serialize;

use crate::models::custom_field::{
    FieldValue, CUSTOM_VIEW_COUNT, LAST_AUTO_INCREMENT, USE_CUSTOM_VIEW_COUNT,
};
use crate::models::topic::{Topic, ARCHETYPE_REGULAR};
use crate::store::Store;
use crate::view_count::{CombinationPolicy, OverrideResolver, SETTING_ENABLED};

pub const SETTING_AUTO_INCREMENT_ENABLED: &str = "view_count_auto_increment_enabled";
pub const SETTING_REGULAR_BATCH_SIZE: &str = "view_count_regular_batch_size";

pub const INCREMENT_INTERVAL: Duration = Duration::from_secs(2 * 60 * 60);
pub const DEFAULT_REGULAR_BATCH_SIZE: usize = 30;
pub const REGULAR_TOPIC_MAX_AGE_DAYS: i64 = 90;

const LOW_VIEWS_THRESHOLD: i64 = 500;
const LOW_VIEWS_BOOST: f64 = 1.5;
const FRESH_PIN_DAYS: f64 = 7.0;
const FRESH_PIN_BOOST: f64 = 1.3;
const SELECTION_JITTER: f64 = 0.3;

/// Share of the pinned pool picked per run; shrinks as the pool grows.
pub fn pinned_selection_ratio(pool_size: usize) -> f64 {
    match pool_size {
        0..=10 => 0.7,
        11..=30 => 0.6,
        31..=100 => 0.5,
        _ => 0.4,
    }
}

pub fn pinned_selection_count(pool_size: usize) -> usize {
    if pool_size == 0 {
        return 0;
    }
    let n = (pool_size as f64 * pinned_selection_ratio(pool_size)).round() as usize;
    n.clamp(1, pool_size)
}

/// Favor pinned topics with few views and recent pins.
pub fn pinned_weight(display_views: i64, pinned_at: NaiveDateTime, now: NaiveDateTime) -> f64 {
    let days_pinned = (now - pinned_at).num_seconds() as f64 / 86_400.0;
    let views_factor = if display_views < LOW_VIEWS_THRESHOLD {
        LOW_VIEWS_BOOST
    } else {
        1.0
    };
    let age_factor = if days_pinned < FRESH_PIN_DAYS {
        FRESH_PIN_BOOST
    } else {
        1.0
    };
    views_factor * age_factor
}

/// Increment band for a topic currently showing `current_views`.
pub fn increment_range(current_views: i64) -> RangeInclusive<i64> {
    match current_views {
        i64::MIN..=100 => 1..=3,
        101..=500 => 2..=5,
        _ => 3..=8,
    }
}

pub fn calculate_increment<R: Rng + ?Sized>(current_views: i64, rng: &mut R) -> i64 {
    rng.gen_range(increment_range(current_views))
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub pinned_selected: usize,
    pub pinned_updated: usize,
    pub regular_selected: usize,
    pub regular_updated: usize,
    pub skipped: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IncrementOutcome {
    Applied { old_display: i64, new_custom: i64, increment: i64 },
    /// The new custom count would have been below the stored one, or past
    /// the largest storable count.
    Skipped,
}

pub struct ViewCountIncrementJob<'a> {
    store: &'a dyn Store,
}

impl<'a> ViewCountIncrementJob<'a> {
    pub fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    pub fn is_enabled(&self) -> bool {
        self.store.setting_get_bool(SETTING_ENABLED)
            && self.store.setting_get_bool(SETTING_AUTO_INCREMENT_ENABLED)
    }

    /// Non-positive or missing values fall back to the default.
    pub fn regular_batch_size(&self) -> usize {
        match self.store.setting_get_i64(SETTING_REGULAR_BATCH_SIZE) {
            n if n > 0 => n as usize,
            _ => DEFAULT_REGULAR_BATCH_SIZE,
        }
    }

    /// Scheduler entry point: gated by settings, never propagates errors.
    pub fn execute<R: Rng + ?Sized>(&self, rng: &mut R, now: NaiveDateTime) -> Option<RunSummary> {
        if !self.is_enabled() {
            log::debug!("[view-count] Auto increment disabled, skipping run");
            return None;
        }

        log::info!("[view-count] Starting view count auto increment job");
        match self.run(rng, now) {
            Ok(summary) => {
                log::info!(
                    "[view-count] View count increment completed: {} pinned + {} regular topics updated ({} skipped)",
                    summary.pinned_updated,
                    summary.regular_updated,
                    summary.skipped
                );
                Some(summary)
            }
            Err(e) => {
                log::error!("[view-count] View count increment job failed: {}", e);
                None
            }
        }
    }

    /// One pass over pinned then regular topics. Stops at the first failed
    /// write; topics already written stay written.
    pub fn run<R: Rng + ?Sized>(&self, rng: &mut R, now: NaiveDateTime) -> Result<RunSummary, String> {
        let resolver = OverrideResolver::new(self.store);
        let mut summary = RunSummary::default();

        let pinned = self.select_pinned(&resolver, rng, now)?;
        summary.pinned_selected = pinned.len();
        summary.pinned_updated = self.update_topics(&resolver, &pinned, "pinned", rng, now, &mut summary.skipped)?;

        let regular = self.select_regular(rng, now)?;
        summary.regular_selected = regular.len();
        summary.regular_updated =
            self.update_topics(&resolver, &regular, "regular", rng, now, &mut summary.skipped)?;

        Ok(summary)
    }

    pub fn select_pinned<R: Rng + ?Sized>(
        &self,
        resolver: &OverrideResolver<'_>,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Result<Vec<Topic>, String> {
        let all_pinned = self.store.topic_list_pinned(ARCHETYPE_REGULAR)?;
        if all_pinned.is_empty() {
            return Ok(vec![]);
        }
        resolver.preload(&all_pinned);

        let total = all_pinned.len();
        let selection = pinned_selection_count(total);
        log::info!(
            "[view-count] Found {} pinned topics, selecting {}",
            total,
            selection
        );

        // Lower key sorts first: heavier topics win, jitter breaks ties
        let mut keyed: Vec<(f64, Topic)> = all_pinned
            .into_iter()
            .map(|topic| {
                let display = resolver.resolve(&topic).display();
                let weight = topic
                    .pinned_at
                    .map(|pinned_at| pinned_weight(display, pinned_at, now))
                    .unwrap_or(1.0);
                (-weight + rng.gen_range(0.0..SELECTION_JITTER), topic)
            })
            .collect();
        keyed.sort_by(|a, b| a.0.total_cmp(&b.0));

        Ok(keyed
            .into_iter()
            .take(selection)
            .map(|(_, topic)| topic)
            .collect())
    }

    /// Unordered random sample of recent unpinned topics, at most the batch size.
    pub fn select_regular<R: Rng + ?Sized>(
        &self,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Result<Vec<Topic>, String> {
        let since = now - chrono::Duration::days(REGULAR_TOPIC_MAX_AGE_DAYS);
        let candidates = self
            .store
            .topic_list_unpinned_since(ARCHETYPE_REGULAR, &since)?;
        Ok(candidates
            .choose_multiple(rng, self.regular_batch_size())
            .cloned()
            .collect())
    }

    fn update_topics<R: Rng + ?Sized>(
        &self,
        resolver: &OverrideResolver<'_>,
        topics: &[Topic],
        kind: &str,
        rng: &mut R,
        now: NaiveDateTime,
        skipped: &mut usize,
    ) -> Result<usize, String> {
        if topics.is_empty() {
            return Ok(0);
        }
        resolver.preload(topics);

        let mut updated = 0;
        for topic in topics {
            match self.increment_topic(resolver, topic, rng, now)? {
                IncrementOutcome::Applied { .. } => updated += 1,
                IncrementOutcome::Skipped => *skipped += 1,
            }
        }

        log::info!("[view-count] Updated {} {} topics", updated, kind);
        Ok(updated)
    }

    pub fn increment_topic<R: Rng + ?Sized>(
        &self,
        resolver: &OverrideResolver<'_>,
        topic: &Topic,
        rng: &mut R,
        now: NaiveDateTime,
    ) -> Result<IncrementOutcome, String> {
        let state = resolver.resolve(topic);
        let current_display = state.display();
        let increment = calculate_increment(current_display, rng);

        // Under Replace the custom count takes over the whole display, so it
        // has to continue from what readers currently see.
        let running = match state.policy {
            CombinationPolicy::Replace => current_display,
            CombinationPolicy::Additive => state.custom,
        };
        let Some(new_custom) = running.checked_add(increment) else {
            log::warn!(
                "[view-count] Skipped topic {}: view count {} cannot grow further",
                topic.id,
                running
            );
            return Ok(IncrementOutcome::Skipped);
        };

        if new_custom < state.custom {
            log::warn!(
                "[view-count] Skipped topic {}: would decrease custom views ({} -> {})",
                topic.id,
                state.custom,
                new_custom
            );
            return Ok(IncrementOutcome::Skipped);
        }

        self.store.topic_custom_fields_set(
            topic.id,
            &[
                (CUSTOM_VIEW_COUNT, FieldValue::Integer(new_custom)),
                (USE_CUSTOM_VIEW_COUNT, FieldValue::Boolean(true)),
                (LAST_AUTO_INCREMENT, FieldValue::Text(now.and_utc().to_rfc3339())),
            ],
        )?;
        resolver.invalidate(topic.id);

        log::debug!(
            "[view-count] Topic {}: {} -> {} (+{})",
            topic.id,
            current_display,
            current_display.saturating_add(increment),
            increment
        );
        Ok(IncrementOutcome::Applied {
            old_display: current_display,
            new_custom,
            increment,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn selection_ratio_bands() {
        assert_eq!(pinned_selection_ratio(1), 0.7);
        assert_eq!(pinned_selection_ratio(10), 0.7);
        assert_eq!(pinned_selection_ratio(11), 0.6);
        assert_eq!(pinned_selection_ratio(30), 0.6);
        assert_eq!(pinned_selection_ratio(31), 0.5);
        assert_eq!(pinned_selection_ratio(100), 0.5);
        assert_eq!(pinned_selection_ratio(101), 0.4);
        assert_eq!(pinned_selection_ratio(5000), 0.4);
    }

    #[test]
    fn selection_ratio_never_increases_with_pool_size() {
        let mut prev = f64::MAX;
        for n in 1..=500 {
            let r = pinned_selection_ratio(n);
            assert!(r <= prev, "ratio grew at pool size {}", n);
            prev = r;
        }
    }

    #[test]
    fn selection_count_is_clamped() {
        assert_eq!(pinned_selection_count(0), 0);
        assert_eq!(pinned_selection_count(1), 1);
        assert_eq!(pinned_selection_count(2), 1);
        assert_eq!(pinned_selection_count(10), 7);
        assert_eq!(pinned_selection_count(20), 12);
        assert_eq!(pinned_selection_count(50), 25);
        assert_eq!(pinned_selection_count(200), 80);
    }

    #[test]
    fn weight_favors_low_views_and_fresh_pins() {
        let now = chrono::Utc::now().naive_utc();
        let fresh = now - chrono::Duration::days(1);
        let stale = now - chrono::Duration::days(30);
        assert!((pinned_weight(10, fresh, now) - 1.95).abs() < 1e-9);
        assert!((pinned_weight(10, stale, now) - 1.5).abs() < 1e-9);
        assert!((pinned_weight(900, fresh, now) - 1.3).abs() < 1e-9);
        assert!((pinned_weight(900, stale, now) - 1.0).abs() < 1e-9);
    }

    #[test]
    fn increments_stay_inside_their_band() {
        let mut rng = StdRng::seed_from_u64(7);
        for (views, lo, hi) in [(0, 1, 3), (100, 1, 3), (101, 2, 5), (500, 2, 5), (501, 3, 8), (90_000, 3, 8)] {
            assert_eq!(increment_range(views), lo..=hi);
            for _ in 0..200 {
                let inc = calculate_increment(views, &mut rng);
                assert!(inc >= lo && inc <= hi, "{} outside {}..={} for {}", inc, lo, hi, views);
            }
        }
    }
}
