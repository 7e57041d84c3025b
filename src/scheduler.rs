use std::sync::Arc;
use std::time::Duration;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use crate::error::Result;
use crate::feed::fetcher::FeedFetcher;
use crate::feed::FeedResult;
use crate::storage::{FeedCache, RegistryEntry, RegistryStore, StatusTracker};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    /// At least one pass still has units in flight.
    Running,
}

#[derive(Debug, Clone, Default)]
pub struct RefreshStats {
    pub passes_started: u64,
    pub passes_completed: u64,
    pub feeds_refreshed: u64,
    pub feeds_failed: u64,
    pub last_pass_started: Option<DateTime<Utc>>,
    pub last_pass_finished: Option<DateTime<Utc>>,
}

/// Drives fetch → persist for every registry entry, once immediately and
/// then every `interval`.
#[derive(Clone)]
pub struct RefreshScheduler {
    registry: RegistryStore,
    fetcher: FeedFetcher,
    cache: FeedCache,
    status: StatusTracker,
    interval: Duration,
    stats: Arc<RwLock<RefreshStats>>,
}

impl RefreshScheduler {
    pub fn new(
        registry: RegistryStore,
        fetcher: FeedFetcher,
        cache: FeedCache,
        status: StatusTracker,
        interval: Duration,
    ) -> Self {
        Self {
            registry,
            fetcher,
            cache,
            status,
            interval,
            stats: Arc::new(RwLock::new(RefreshStats::default())),
        }
    }

    pub fn stats(&self) -> RefreshStats {
        self.stats.read().clone()
    }

    pub fn state(&self) -> SchedulerState {
        let stats = self.stats.read();
        if stats.passes_started > stats.passes_completed {
            SchedulerState::Running
        } else {
            SchedulerState::Idle
        }
    }

    /// Fetches one feed and replaces its snapshot.
    pub async fn refresh_entry(&self, entry: &RegistryEntry) -> Result<usize> {
        let started = Utc::now();
        self.status.mark_updating(&entry.name);

        let outcome = match self.fetcher.fetch(&entry.url).await {
            Ok(feed) => self.cache.persist(entry, &feed).map(|_| feed.items.len()),
            Err(e) => Err(e),
        };

        match &outcome {
            Ok(articles) => self.status.mark_active(&entry.name, *articles),
            Err(e) => self.status.mark_failed(&entry.name, &e.to_string(), started),
        }

        outcome
    }

    /// One full pass. Every entry is refreshed on its own task; the returned
    /// outcomes follow registry order.
    pub async fn run_pass(&self) -> Vec<FeedResult> {
        info!("Refreshing {} feeds", self.registry.len());
        let started = Utc::now();
        {
            let mut stats = self.stats.write();
            stats.passes_started += 1;
            stats.last_pass_started = Some(started);
        }

        let handles: Vec<_> = self
            .registry
            .list()
            .iter()
            .cloned()
            .map(|entry| {
                let scheduler = self.clone();
                tokio::spawn(async move {
                    debug!("Refreshing feed: {} from {}", entry.name, entry.url);
                    match scheduler.refresh_entry(&entry).await {
                        Ok(articles) => {
                            info!("Refreshed feed: {} ({} articles)", entry.name, articles);
                            FeedResult::ok(&entry.name, articles)
                        }
                        Err(e) => {
                            warn!("Failed to refresh feed {}: {}", entry.name, e);
                            FeedResult::failed(&entry.name, e.to_string())
                        }
                    }
                })
            })
            .collect();

        let names: Vec<String> = self.registry.list().iter().map(|e| e.name.clone()).collect();
        let results: Vec<FeedResult> = futures::future::join_all(handles)
            .await
            .into_iter()
            .zip(names)
            .map(|(joined, name)| {
                joined.unwrap_or_else(|e| {
                    error!("Refresh task for {} aborted: {}", name, e);
                    self.status.mark_failed(&name, "refresh task aborted", started);
                    FeedResult::failed(&name, e.to_string())
                })
            })
            .collect();

        let succeeded = results.iter().filter(|r| r.success).count() as u64;
        {
            let mut stats = self.stats.write();
            stats.passes_completed += 1;
            stats.feeds_refreshed += succeeded;
            stats.feeds_failed += results.len() as u64 - succeeded;
            stats.last_pass_finished = Some(Utc::now());
        }

        info!("Refresh pass finished: {}/{} feeds updated", succeeded, results.len());
        results
    }

    /// Starts the periodic loop on a background task. Each tick launches a
    /// pass without waiting for the previous one to finish.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.interval);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                // The first tick completes immediately.
                interval.tick().await;
                if self.state() == SchedulerState::Running {
                    warn!("Previous refresh pass still running; starting another");
                }
                let scheduler = self.clone();
                tokio::spawn(async move {
                    scheduler.run_pass().await;
                });
            }
        })
    }
}
