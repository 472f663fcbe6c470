//! Geodesic distance and candidate ranking.

use crate::models::{Event, RankedEvent};

/// Mean Earth radius in kilometers.
const EARTH_RADIUS_KM: f64 = 6371.0;

/// Junior-series events use this identifier suffix and are excluded
/// unconditionally; they run on a different day with their own numbering.
const JUNIOR_SLUG_SUFFIX: &str = "-juniors";

/// Great-circle (haversine) distance between two (latitude, longitude)
/// pairs, in kilometers, rounded to two decimal places. Symmetric, and zero
/// for identical points.
pub fn distance_km(a: (f64, f64), b: (f64, f64)) -> f64 {
    let (lat1, lon1) = (a.0.to_radians(), a.1.to_radians());
    let (lat2, lon2) = (b.0.to_radians(), b.1.to_radians());

    let dlat = lat2 - lat1;
    let dlon = lon2 - lon1;

    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let distance = 2.0 * EARTH_RADIUS_KM * h.sqrt().asin();

    (distance * 100.0).round() / 100.0
}

pub fn is_junior_event(slug: &str) -> bool {
    slug.ends_with(JUNIOR_SLUG_SUFFIX)
}

/// Shortlist candidates around `origin`: drop junior-series events, keep
/// those within `radius_km`, and sort ascending by distance with display
/// name as the deterministic tie-break.
pub fn rank_by_distance(events: Vec<Event>, origin: (f64, f64), radius_km: f64) -> Vec<RankedEvent> {
    let mut ranked: Vec<RankedEvent> = events
        .into_iter()
        .filter(|e| !is_junior_event(&e.slug))
        .map(|event| {
            let distance_km = distance_km(origin, event.coordinates());
            RankedEvent { event, distance_km }
        })
        .filter(|r| r.distance_km <= radius_km)
        .collect();

    ranked.sort_by(|a, b| {
        a.distance_km
            .partial_cmp(&b.distance_km)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.event.name.cmp(&b.event.name))
    });
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;

    const LONDON: (f64, f64) = (51.5074, -0.1278);
    const OXFORD: (f64, f64) = (51.7520, -1.2577);

    fn event(slug: &str, name: &str, lat: f64, lon: f64) -> Event {
        Event {
            slug: slug.to_string(),
            name: name.to_string(),
            latitude: lat,
            longitude: lon,
            url: format!("https://www.parkrun.org.uk/{}/", slug),
        }
    }

    #[test]
    fn test_distance_london_to_oxford() {
        let d = distance_km(LONDON, OXFORD);
        assert!((d - 83.0).abs() <= 5.0, "got {}", d);
    }

    #[test]
    fn test_distance_is_symmetric() {
        assert_eq!(distance_km(LONDON, OXFORD), distance_km(OXFORD, LONDON));
    }

    #[test]
    fn test_distance_identical_points_is_zero() {
        assert_eq!(distance_km(LONDON, LONDON), 0.0);
    }

    #[test]
    fn test_distance_is_rounded_to_two_decimals() {
        let d = distance_km(LONDON, (51.51, -0.13));
        assert_eq!(d, (d * 100.0).round() / 100.0);
    }

    #[test]
    fn test_rank_excludes_juniors_and_far_events() {
        let origin = (51.50, 0.10);
        let events = vec![
            // ~4 km away
            event("near", "Near parkrun", 51.53, 0.13),
            // ~1 km away but junior series
            event("near-juniors", "Near juniors", 51.507, 0.10),
            // ~50 km away
            event("far", "Far parkrun", 51.95, 0.10),
        ];
        let ranked = rank_by_distance(events, origin, 10.0);
        assert_eq!(ranked.len(), 1);
        assert_eq!(ranked[0].event.slug, "near");
        assert!(ranked[0].distance_km <= 10.0);
    }

    #[test]
    fn test_rank_sorts_ascending_with_name_tie_break() {
        let origin = (51.50, 0.10);
        let events = vec![
            event("b", "Beta parkrun", 51.52, 0.10),
            event("a", "Alpha parkrun", 51.52, 0.10),
            event("c", "Close parkrun", 51.505, 0.10),
        ];
        let ranked = rank_by_distance(events, origin, 10.0);
        let order: Vec<&str> = ranked.iter().map(|r| r.event.slug.as_str()).collect();
        assert_eq!(order, vec!["c", "a", "b"]);
    }
}
