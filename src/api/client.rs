//! HTTP implementation of the provider traits.
//!
//! One shared `reqwest` client with a bounded timeout. All requests are
//! issued sequentially; there is deliberately no concurrent fetching against
//! the rate-limited upstream. HTML pages are parsed with `scraper`, and the
//! parsing itself lives in pure functions over the page text so it can be
//! unit-tested without a network.

use std::collections::BTreeSet;

use anyhow::{Context, Result};
use async_trait::async_trait;
use scraper::{ElementRef, Html, Selector};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::models::{Announcement, Event, EventFeed};

use super::error::{FetchError, LocationNotFound};
use super::{
    CancellationAnnouncementProvider, CandidateFeedProvider, CompletionHistoryProvider,
    EventCountProvider, LocationResolver,
};

// ============================================================================
// Constants
// ============================================================================

/// Nominatim search endpoint for free-text geocoding.
const NOMINATIM_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Canonical event feed (GeoJSON feature collection).
const FEED_URL: &str = "https://images.parkrun.com/events.json";

/// HTTP request timeout in seconds. Scraped pages are small; anything slower
/// than this is treated as a failed fetch for that one key.
const REQUEST_TIMEOUT_SECS: u64 = 10;

/// Nominatim requires an identifying user agent.
const USER_AGENT: &str = concat!("runscout/", env!("CARGO_PKG_VERSION"));

/// Heading prefix marking the upcoming designated day's cancellation section.
const CANCELLATION_DAY_PREFIX: &str = "Saturday";

#[derive(Debug, Deserialize)]
struct NominatimPlace {
    lat: String,
    lon: String,
}

/// HTTP client for the event source and the geocoder.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    feed_url: String,
}

impl HttpClient {
    pub fn new(base_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            feed_url: FEED_URL.to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_text(&self, url: &str) -> Result<String, FetchError> {
        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl LocationResolver for HttpClient {
    async fn resolve(&self, query: &str) -> Result<(f64, f64)> {
        let response = self
            .client
            .get(NOMINATIM_URL)
            .query(&[("q", query), ("format", "json"), ("limit", "1")])
            .send()
            .await
            .context("Failed to reach the geocoding service")?;

        let places: Vec<NominatimPlace> = response
            .json()
            .await
            .context("Failed to parse geocoding response")?;

        let place = places
            .into_iter()
            .next()
            .ok_or_else(|| LocationNotFound(query.to_string()))?;

        let latitude: f64 = place.lat.parse().context("Geocoder returned a malformed latitude")?;
        let longitude: f64 = place.lon.parse().context("Geocoder returned a malformed longitude")?;
        debug!(query = %query, latitude, longitude, "Resolved location");
        Ok((latitude, longitude))
    }
}

#[async_trait]
impl CandidateFeedProvider for HttpClient {
    async fn fetch_events(&self) -> Result<Vec<Event>, FetchError> {
        let response = self.client.get(&self.feed_url).send().await?;
        if !response.status().is_success() {
            return Err(FetchError::Status(response.status()));
        }
        let feed: EventFeed = response.json().await?;
        debug!(count = feed.features.len(), "Fetched canonical event feed");
        Ok(feed
            .features
            .into_iter()
            .map(|f| f.into_event(&self.base_url))
            .collect())
    }
}

#[async_trait]
impl EventCountProvider for HttpClient {
    async fn event_count(&self, slug: &str) -> Result<u32, FetchError> {
        let url = format!("{}/{}/results/eventhistory/", self.base_url, slug);
        debug!(url = %url, "Fetching event history");
        let html = self.get_text(&url).await?;
        parse_event_history_count(&html)
    }
}

#[async_trait]
impl CompletionHistoryProvider for HttpClient {
    async fn completed_events(&self, person_id: &str) -> BTreeSet<String> {
        let url = format!("{}/parkrunner/{}/all/", self.base_url, person_id);
        match self.get_text(&url).await {
            Ok(html) => parse_completed_slugs(&html, &self.base_url),
            Err(e) => {
                warn!(person = %person_id, error = %e, "Completion history unavailable, assuming none");
                BTreeSet::new()
            }
        }
    }
}

#[async_trait]
impl CancellationAnnouncementProvider for HttpClient {
    async fn upcoming_cancellations(&self) -> Result<Vec<Announcement>, FetchError> {
        let url = format!("{}/cancellations/", self.base_url);
        let html = self.get_text(&url).await?;
        Ok(parse_cancellations(&html, CANCELLATION_DAY_PREFIX))
    }
}

// ============================================================================
// Page parsing (pure)
// ============================================================================

fn selector(s: &str) -> Result<Selector, FetchError> {
    Selector::parse(s).map_err(|_| FetchError::Shape(format!("invalid selector: {}", s)))
}

fn element_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

/// Count prior occurrences on an event-history page: the number of data rows
/// in the first table. A page without any table is malformed.
pub fn parse_event_history_count(html: &str) -> Result<u32, FetchError> {
    let document = Html::parse_document(html);
    let table = document
        .select(&selector("table")?)
        .next()
        .ok_or_else(|| FetchError::Shape("no results table on event history page".to_string()))?;

    let row_selector = selector("tr")?;
    let cell_selector = selector("td")?;
    // Header rows carry <th> cells only; count rows with at least one <td>.
    let rows = table
        .select(&row_selector)
        .filter(|row| row.select(&cell_selector).next().is_some())
        .count();
    Ok(rows as u32)
}

/// Extract the set of completed event identifiers from a person's
/// all-results page: every in-region link inside a table, reduced to the
/// first path segment of its URL.
pub fn parse_completed_slugs(html: &str, base_url: &str) -> BTreeSet<String> {
    let document = Html::parse_document(html);
    let anchor_selector = match selector("table a") {
        Ok(s) => s,
        Err(_) => return BTreeSet::new(),
    };

    document
        .select(&anchor_selector)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| slug_from_url(href, base_url))
        .collect()
}

/// First URL path segment under the region base, i.e. the event identifier.
/// Non-event paths (the person pages themselves) are skipped.
fn slug_from_url(url: &str, base_url: &str) -> Option<String> {
    let rest = url.strip_prefix(base_url)?.trim_start_matches('/');
    let segment = rest.split('/').next()?;
    if segment.is_empty() || segment == "parkrunner" || segment == "cancellations" {
        return None;
    }
    Some(segment.to_string())
}

/// Pull the announcement list for the upcoming designated day out of the
/// cancellations page: the first `<h3>` starting with `day_prefix`, then the
/// `<li>` items of the list that follows it (up to the next heading).
/// A page without a matching section yields an empty list.
pub fn parse_cancellations(html: &str, day_prefix: &str) -> Vec<Announcement> {
    let document = Html::parse_document(html);
    let heading_selector = match selector("h3") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    let item_selector = match selector("li") {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };

    let Some(heading) = document
        .select(&heading_selector)
        .find(|h| element_text(*h).starts_with(day_prefix))
    else {
        debug!(day = %day_prefix, "No cancellation section for the upcoming day");
        return Vec::new();
    };

    for sibling in heading.next_siblings().filter_map(ElementRef::wrap) {
        let tag = sibling.value().name();
        if tag == "h3" {
            break;
        }
        if tag == "ul" || tag == "ol" {
            return sibling
                .select(&item_selector)
                .filter_map(|li| Announcement::parse_line(&element_text(li)))
                .collect();
        }
    }

    Vec::new()
}
