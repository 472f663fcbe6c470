use serde::{Deserialize, Serialize};

/// One canonical recurring event from the feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    /// Short token naming the event, derived from its source URL path.
    pub slug: String,
    /// Human-readable display name, e.g. "Catford parkrun".
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Declared source URL; drives the regional subset check.
    pub url: String,
}

impl Event {
    pub fn coordinates(&self) -> (f64, f64) {
        (self.latitude, self.longitude)
    }
}

/// An event annotated with its distance from the search origin.
#[derive(Debug, Clone, PartialEq)]
pub struct RankedEvent {
    pub event: Event,
    pub distance_km: f64,
}

// ============================================================================
// Feed wire format
// ============================================================================

/// The canonical event feed, a GeoJSON-style feature collection.
#[derive(Debug, Clone, Deserialize)]
pub struct EventFeed {
    #[serde(default)]
    pub features: Vec<EventFeature>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventFeature {
    pub properties: EventProperties,
    pub geometry: EventGeometry,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventProperties {
    #[serde(rename = "eventname")]
    pub eventname: String,
    #[serde(rename = "EventLongName")]
    pub long_name: String,
    #[serde(default)]
    pub url: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EventGeometry {
    /// GeoJSON order: [longitude, latitude].
    pub coordinates: [f64; 2],
}

impl EventFeature {
    /// Flatten a feed feature into the domain model.
    ///
    /// Features without a declared source URL get one derived from the
    /// region base URL and the event slug, matching the feed's own layout.
    pub fn into_event(self, base_url: &str) -> Event {
        let url = self
            .properties
            .url
            .unwrap_or_else(|| format!("{}/{}/", base_url.trim_end_matches('/'), self.properties.eventname));
        Event {
            slug: self.properties.eventname,
            name: self.properties.long_name,
            latitude: self.geometry.coordinates[1],
            longitude: self.geometry.coordinates[0],
            url,
        }
    }
}
