//! Pipeline orchestration.
//!
//! A run is one linear pass: resolve the location, fetch and rank the
//! canonical feed, refresh the two caches where the staleness policy says
//! so, reconcile cancellation announcements, and emit annotated rows. The
//! providers and the clock are injected so the whole pipeline runs against
//! in-memory substitutes in tests.

use std::collections::BTreeSet;
use std::path::PathBuf;

use anyhow::Result;
use tracing::{info, warn};

use crate::api::{
    CancellationAnnouncementProvider, CandidateFeedProvider, CompletionHistoryProvider,
    EventCountProvider, LocationResolver,
};
use crate::cache::{CacheStore, Clock, Populator, RefreshPolicy};
use crate::geo;
use crate::reconcile;
use crate::report::ReportRow;

/// File names for the two cache instances inside the cache directory.
const COUNTS_CACHE_FILE: &str = "event_counts.json";
const COMPLETIONS_CACHE_FILE: &str = "completions.json";

/// The external collaborators, one per boundary.
pub struct Providers {
    pub location: Box<dyn LocationResolver>,
    pub feed: Box<dyn CandidateFeedProvider>,
    pub counts: Box<dyn EventCountProvider>,
    pub completions: Box<dyn CompletionHistoryProvider>,
    pub cancellations: Box<dyn CancellationAnnouncementProvider>,
}

/// One invocation's worth of user input.
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub location: String,
    pub radius_km: f64,
    pub person_id: Option<String>,
    pub unvisited_only: bool,
}

pub struct App {
    providers: Providers,
    counts_store: CacheStore<u32>,
    completions_store: CacheStore<BTreeSet<String>>,
    policy: RefreshPolicy,
    populator: Populator,
    clock: Box<dyn Clock>,
    base_url: String,
}

impl App {
    pub fn new(
        providers: Providers,
        cache_dir: PathBuf,
        base_url: String,
        policy: RefreshPolicy,
        populator: Populator,
        clock: Box<dyn Clock>,
    ) -> Self {
        Self {
            providers,
            counts_store: CacheStore::new(cache_dir.join(COUNTS_CACHE_FILE)),
            completions_store: CacheStore::new(cache_dir.join(COMPLETIONS_CACHE_FILE)),
            policy,
            populator,
            clock,
            base_url,
        }
    }

    pub async fn run(&self, request: &SearchRequest) -> Result<Vec<ReportRow>> {
        // The one fatal boundary.
        let origin = self.providers.location.resolve(&request.location).await?;
        info!(location = %request.location, lat = origin.0, lon = origin.1, "Resolved search origin");

        // Everything downstream degrades instead of aborting.
        let events = match self.providers.feed.fetch_events().await {
            Ok(events) => events,
            Err(e) => {
                warn!(error = %e, "Canonical event feed unavailable");
                Vec::new()
            }
        };

        let ranked = geo::rank_by_distance(events.clone(), origin, request.radius_km);
        info!(candidates = events.len(), shortlisted = ranked.len(), "Ranked candidates");
        let slugs: Vec<String> = ranked.iter().map(|r| r.event.slug.clone()).collect();

        let now = self.clock.now();

        let mut counts = self.counts_store.load();
        if self.policy.is_stale(&counts, &slugs, now) {
            info!("Occurrence-count cache is stale, filling gaps");
            let provider = self.providers.counts.as_ref();
            self.populator
                .populate(&self.counts_store, &mut counts, &slugs, self.clock.as_ref(), {
                    move |slug: String| async move { provider.event_count(&slug).await }
                })
                .await?;
        }

        let completed = match request.person_id {
            Some(ref person_id) => self.completed_events(person_id, now).await?,
            None => BTreeSet::new(),
        };

        let announcements = match self.providers.cancellations.upcoming_cancellations().await {
            Ok(list) => list,
            Err(e) => {
                warn!(error = %e, "Cancellation announcements unavailable");
                Vec::new()
            }
        };
        let regional = reconcile::regional_subset(&events, &self.base_url);
        let cancelled = reconcile::reconcile(&announcements, &regional);

        let mut rows = Vec::new();
        for ranked_event in ranked {
            let slug = ranked_event.event.slug.clone();
            let is_completed = completed.contains(&slug);
            if request.unvisited_only && is_completed {
                continue;
            }
            rows.push(ReportRow {
                next_number: counts.value(&slug).map(|count| count + 1),
                cancelled: cancelled.get(&slug).cloned(),
                completed: is_completed,
                ranked: ranked_event,
            });
        }
        Ok(rows)
    }

    /// Completion set for one person, through the completion cache.
    async fn completed_events(
        &self,
        person_id: &str,
        now: chrono::DateTime<chrono::Utc>,
    ) -> Result<BTreeSet<String>> {
        let required = vec![person_id.to_string()];
        let mut record = self.completions_store.load();

        if self.policy.is_stale(&record, &required, now) {
            info!(person = %person_id, "Completion cache is stale, refreshing");
            let provider = self.providers.completions.as_ref();
            self.populator
                .populate(
                    &self.completions_store,
                    &mut record,
                    &required,
                    self.clock.as_ref(),
                    // The provider already degrades to an empty set on error.
                    move |pid: String| async move { Ok(provider.completed_events(&pid).await) },
                )
                .await?;
        }

        Ok(record.value(person_id).cloned().unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::{BTreeMap, BTreeSet};

    use async_trait::async_trait;
    use chrono::{DateTime, TimeZone, Utc};

    use crate::api::FetchError;
    use crate::models::{Announcement, Event};

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    /// A Wednesday, so staleness can only come from missing keys.
    fn midweek() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 7, 12, 0, 0).unwrap()
    }

    struct FixedLocation(f64, f64);

    #[async_trait]
    impl LocationResolver for FixedLocation {
        async fn resolve(&self, _query: &str) -> Result<(f64, f64)> {
            Ok((self.0, self.1))
        }
    }

    struct StaticFeed(Vec<Event>);

    #[async_trait]
    impl CandidateFeedProvider for StaticFeed {
        async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
            Ok(self.0.clone())
        }
    }

    struct StaticCounts(BTreeMap<String, u32>);

    #[async_trait]
    impl EventCountProvider for StaticCounts {
        async fn event_count(&self, slug: &str) -> Result<u32, FetchError> {
            self.0
                .get(slug)
                .copied()
                .ok_or_else(|| FetchError::Shape(format!("no history for {}", slug)))
        }
    }

    struct StaticCompletions(BTreeSet<String>);

    #[async_trait]
    impl CompletionHistoryProvider for StaticCompletions {
        async fn completed_events(&self, _person_id: &str) -> BTreeSet<String> {
            self.0.clone()
        }
    }

    struct StaticCancellations(Vec<Announcement>);

    #[async_trait]
    impl CancellationAnnouncementProvider for StaticCancellations {
        async fn upcoming_cancellations(&self) -> Result<Vec<Announcement>, FetchError> {
            Ok(self.0.clone())
        }
    }

    fn uk_event(slug: &str, name: &str, lat: f64, lon: f64) -> Event {
        Event {
            slug: slug.to_string(),
            name: name.to_string(),
            latitude: lat,
            longitude: lon,
            url: format!("https://www.parkrun.org.uk/{}/", slug),
        }
    }

    fn test_app(dir: &tempfile::TempDir, providers: Providers) -> App {
        App::new(
            providers,
            dir.path().to_path_buf(),
            "https://www.parkrun.org.uk".to_string(),
            RefreshPolicy::uk_weekly(),
            Populator::without_delay(),
            Box::new(FixedClock(midweek())),
        )
    }

    /// Origin (51.50, 0.10), radius 10 km: one event ~4 km away, one
    /// junior-series event ~1 km away, one event ~50 km away. Only the
    /// first survives ranking.
    fn spread_of_events() -> Vec<Event> {
        vec![
            uk_event("near", "Near parkrun", 51.53, 0.13),
            uk_event("near-juniors", "Near junior parkrun", 51.507, 0.10),
            uk_event("far", "Far parkrun", 51.95, 0.10),
        ]
    }

    #[tokio::test]
    async fn test_end_to_end_filters_and_annotates() {
        let dir = tempfile::tempdir().unwrap();
        let providers = Providers {
            location: Box::new(FixedLocation(51.50, 0.10)),
            feed: Box::new(StaticFeed(spread_of_events())),
            counts: Box::new(StaticCounts(BTreeMap::from([("near".to_string(), 49)]))),
            completions: Box::new(StaticCompletions(BTreeSet::new())),
            cancellations: Box::new(StaticCancellations(vec![Announcement::new(
                "Near parkrun",
                "Flooding",
            )])),
        };
        let app = test_app(&dir, providers);

        let rows = app
            .run(&SearchRequest {
                location: "SE6".to_string(),
                radius_km: 10.0,
                person_id: None,
                unvisited_only: false,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row.ranked.event.slug, "near");
        assert_eq!(row.next_number, Some(50));
        assert_eq!(row.cancelled.as_deref(), Some("Flooding"));
        assert!(!row.completed);

        // The count landed in the on-disk cache.
        let cached: crate::cache::CacheRecord<u32> =
            CacheStore::new(dir.path().join(COUNTS_CACHE_FILE)).load();
        assert_eq!(cached.value("near"), Some(&49));
    }

    #[tokio::test]
    async fn test_unvisited_only_drops_completed_events() {
        let dir = tempfile::tempdir().unwrap();
        let providers = Providers {
            location: Box::new(FixedLocation(51.50, 0.10)),
            feed: Box::new(StaticFeed(vec![
                uk_event("near", "Near parkrun", 51.53, 0.13),
                uk_event("other", "Other parkrun", 51.52, 0.08),
            ])),
            counts: Box::new(StaticCounts(BTreeMap::from([
                ("near".to_string(), 10),
                ("other".to_string(), 20),
            ]))),
            completions: Box::new(StaticCompletions(BTreeSet::from(["near".to_string()]))),
            cancellations: Box::new(StaticCancellations(Vec::new())),
        };
        let app = test_app(&dir, providers);

        let rows = app
            .run(&SearchRequest {
                location: "SE6".to_string(),
                radius_km: 10.0,
                person_id: Some("12345".to_string()),
                unvisited_only: true,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ranked.event.slug, "other");
        assert!(!rows[0].completed);
    }

    #[tokio::test]
    async fn test_failed_count_becomes_unknown_marker() {
        let dir = tempfile::tempdir().unwrap();
        let providers = Providers {
            location: Box::new(FixedLocation(51.50, 0.10)),
            feed: Box::new(StaticFeed(vec![uk_event("near", "Near parkrun", 51.53, 0.13)])),
            // No history for "near": every count fetch fails.
            counts: Box::new(StaticCounts(BTreeMap::new())),
            completions: Box::new(StaticCompletions(BTreeSet::new())),
            cancellations: Box::new(StaticCancellations(Vec::new())),
        };
        let app = test_app(&dir, providers);

        let rows = app
            .run(&SearchRequest {
                location: "SE6".to_string(),
                radius_km: 10.0,
                person_id: None,
                unvisited_only: false,
            })
            .await
            .unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].next_number, None);

        // The failure is recorded as the null sentinel, not silently lost.
        let cached: crate::cache::CacheRecord<u32> =
            CacheStore::new(dir.path().join(COUNTS_CACHE_FILE)).load();
        assert!(cached.is_attempted("near"));
        assert!(cached.value("near").is_none());
    }
}
