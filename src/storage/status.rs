use std::sync::Arc;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use tracing::debug;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum FeedStatus {
    /// No refresh attempted since the process started.
    Pending,
    Updating,
    Active,
    Error(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct FeedHealth {
    pub status: FeedStatus,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub articles: usize,
}

/// How a served snapshot relates to the latest refresh attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    /// The most recent completed refresh wrote this snapshot.
    Fresh,
    /// Left over from an earlier run, or the last refresh failed.
    Stale,
}

impl Freshness {
    pub fn as_str(&self) -> &'static str {
        match self {
            Freshness::Fresh => "fresh",
            Freshness::Stale => "stale",
        }
    }
}

impl Default for FeedHealth {
    fn default() -> Self {
        Self {
            status: FeedStatus::Pending,
            last_success: None,
            last_failure: None,
            articles: 0,
        }
    }
}

impl FeedHealth {
    pub fn freshness(&self) -> Freshness {
        match (self.last_success, self.last_failure) {
            (Some(ok), Some(failed)) if ok > failed => Freshness::Fresh,
            (Some(_), None) => Freshness::Fresh,
            _ => Freshness::Stale,
        }
    }
}

/// Per-feed refresh state shared between the scheduler and the read path.
#[derive(Debug, Clone, Default)]
pub struct StatusTracker {
    feeds: Arc<DashMap<String, FeedHealth>>,
}

impl StatusTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> FeedHealth {
        self.feeds
            .get(name)
            .map(|h| h.value().clone())
            .unwrap_or_default()
    }

    pub fn freshness(&self, name: &str) -> Freshness {
        self.get(name).freshness()
    }

    pub fn mark_updating(&self, name: &str) {
        self.feeds.entry(name.to_string()).or_default().status = FeedStatus::Updating;
    }

    pub fn mark_active(&self, name: &str, articles: usize) {
        let mut health = self.feeds.entry(name.to_string()).or_default();
        health.status = FeedStatus::Active;
        health.last_success = Some(Utc::now());
        health.articles = articles;
    }

    /// Records a failed attempt that began at `started`. An attempt that began
    /// before the latest recorded success is ignored, so a slow unit from an
    /// older pass cannot mark a newer snapshot stale.
    pub fn mark_failed(&self, name: &str, error: &str, started: DateTime<Utc>) {
        let mut health = self.feeds.entry(name.to_string()).or_default();
        if health.last_success.map_or(false, |ok| ok > started) {
            debug!("Ignoring outdated failure for {}: {}", name, error);
            return;
        }
        health.status = FeedStatus::Error(error.to_string());
        health.last_failure = Some(Utc::now());
    }

    pub fn snapshot(&self) -> Vec<(String, FeedHealth)> {
        let mut all: Vec<_> = self
            .feeds
            .iter()
            .map(|e| (e.key().clone(), e.value().clone()))
            .collect();
        all.sort_by(|a, b| a.0.cmp(&b.0));
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_feed_is_pending_and_stale() {
        let tracker = StatusTracker::new();
        let health = tracker.get("reddit");

        assert_eq!(health.status, FeedStatus::Pending);
        assert_eq!(health.freshness(), Freshness::Stale);
    }

    #[test]
    fn test_success_then_failure_turns_stale() {
        let tracker = StatusTracker::new();

        tracker.mark_updating("reddit");
        assert_eq!(tracker.get("reddit").status, FeedStatus::Updating);

        tracker.mark_active("reddit", 25);
        assert_eq!(tracker.freshness("reddit"), Freshness::Fresh);
        assert_eq!(tracker.get("reddit").articles, 25);

        std::thread::sleep(std::time::Duration::from_millis(2));
        tracker.mark_failed("reddit", "HTTP 503", Utc::now());
        let health = tracker.get("reddit");
        assert_eq!(health.status, FeedStatus::Error("HTTP 503".to_string()));
        assert_eq!(health.freshness(), Freshness::Stale);
        assert_eq!(health.articles, 25);
    }

    #[test]
    fn test_recovery_after_failure_is_fresh() {
        let tracker = StatusTracker::new();

        tracker.mark_failed("reddit", "timeout", Utc::now());
        std::thread::sleep(std::time::Duration::from_millis(2));
        tracker.mark_active("reddit", 3);

        assert_eq!(tracker.freshness("reddit"), Freshness::Fresh);
    }

    #[test]
    fn test_failure_started_before_success_is_ignored() {
        let tracker = StatusTracker::new();

        let started = Utc::now();
        std::thread::sleep(std::time::Duration::from_millis(2));
        tracker.mark_active("reddit", 7);
        tracker.mark_failed("reddit", "timeout", started);

        let health = tracker.get("reddit");
        assert_eq!(health.status, FeedStatus::Active);
        assert!(health.last_failure.is_none());
        assert_eq!(health.freshness(), Freshness::Fresh);

        // A later attempt that fails still counts.
        std::thread::sleep(std::time::Duration::from_millis(2));
        tracker.mark_failed("reddit", "timeout", Utc::now());
        assert_eq!(tracker.freshness("reddit"), Freshness::Stale);
    }

    #[test]
    fn test_updating_keeps_previous_freshness() {
        let tracker = StatusTracker::new();
        tracker.mark_active("reddit", 3);
        tracker.mark_updating("reddit");

        assert_eq!(tracker.freshness("reddit"), Freshness::Fresh);
    }

    #[test]
    fn test_snapshot_is_sorted() {
        let tracker = StatusTracker::new();
        tracker.mark_active("b", 1);
        tracker.mark_active("a", 1);

        let names: Vec<_> = tracker.snapshot().into_iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["a", "b"]);
    }
}
