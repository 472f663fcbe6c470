//! Remote data providers.
//!
//! Every network-facing collaborator sits behind a narrow async trait so the
//! pipeline can be exercised with in-memory fakes. `HttpClient` is the real
//! implementation of all of them, one sequential HTTP request at a time.

pub mod client;
pub mod error;

use std::collections::BTreeSet;

use async_trait::async_trait;

use crate::models::{Announcement, Event};

pub use client::HttpClient;
pub use error::{FetchError, LocationNotFound};

/// Free-text location -> (latitude, longitude). The only fatal boundary:
/// an unresolvable location aborts the whole run.
#[async_trait]
pub trait LocationResolver: Send + Sync {
    async fn resolve(&self, query: &str) -> anyhow::Result<(f64, f64)>;
}

/// The full canonical set of events with identifiers, names, coordinates
/// and declared source URLs.
#[async_trait]
pub trait CandidateFeedProvider: Send + Sync {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError>;
}

/// Number of prior occurrences of one event.
#[async_trait]
pub trait EventCountProvider: Send + Sync {
    async fn event_count(&self, slug: &str) -> Result<u32, FetchError>;
}

/// The set of event identifiers a person has completed. Degrades to the
/// empty set on any fetch error; completion data is best-effort.
#[async_trait]
pub trait CompletionHistoryProvider: Send + Sync {
    async fn completed_events(&self, person_id: &str) -> BTreeSet<String>;
}

/// Cancellation announcements for the single upcoming designated day.
/// A page without a matching section yields an empty list, not an error.
#[async_trait]
pub trait CancellationAnnouncementProvider: Send + Sync {
    async fn upcoming_cancellations(&self) -> Result<Vec<Announcement>, FetchError>;
}
