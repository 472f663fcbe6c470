//! Fuzzy reconciliation of free-text cancellation announcements against the
//! canonical event set.
//!
//! Announcements name events however the announcer felt like ("Catford
//! parkrun", "catford", sometimes with trailing notes). Matching is exact on
//! the lowercased display name first, then bidirectional substring
//! containment. Ties are broken deterministically: longest display name
//! first, then lexicographically smallest identifier. Announcements that
//! match nothing are dropped silently; they never surface as errors.

use std::collections::BTreeMap;

use tracing::debug;

use crate::models::{Announcement, Event};

/// Restrict the canonical set to events whose declared source URL belongs to
/// the target region. Performed once, before reconciliation, so an
/// announcement can never resolve to an out-of-region identifier.
pub fn regional_subset<'a>(events: &'a [Event], base_url: &str) -> Vec<&'a Event> {
    let base = base_url.trim_end_matches('/');
    events.iter().filter(|e| e.url.starts_with(base)).collect()
}

/// Map announcements onto canonical identifiers, keyed identifier -> reason.
pub fn reconcile(announcements: &[Announcement], canonical: &[&Event]) -> BTreeMap<String, String> {
    let exact: BTreeMap<String, &Event> = canonical
        .iter()
        .map(|e| (e.name.to_lowercase(), *e))
        .collect();

    let mut reconciled = BTreeMap::new();
    for announcement in announcements {
        let needle = announcement.raw_name.to_lowercase();

        let matched = exact
            .get(&needle)
            .copied()
            .or_else(|| substring_match(&needle, canonical));

        match matched {
            Some(event) => {
                reconciled.insert(event.slug.clone(), announcement.reason.clone());
            }
            None => {
                debug!(name = %announcement.raw_name, "Announcement matched no canonical event, dropping");
            }
        }
    }
    reconciled
}

/// Bidirectional containment over lowercased display names. Among multiple
/// hits, prefer the longest display name, then the smallest identifier.
fn substring_match<'a>(needle: &str, canonical: &[&'a Event]) -> Option<&'a Event> {
    canonical
        .iter()
        .filter(|e| {
            let name = e.name.to_lowercase();
            name.contains(needle) || needle.contains(&name)
        })
        .min_by(|a, b| {
            b.name
                .len()
                .cmp(&a.name.len())
                .then_with(|| a.slug.cmp(&b.slug))
        })
        .copied()
}
