//! Result rows: console rendering and milestone CSV export.

use std::path::Path;

use anyhow::{Context, Result};

use crate::models::RankedEvent;

/// One fully annotated result for a nearby event.
#[derive(Debug, Clone, PartialEq)]
pub struct ReportRow {
    pub ranked: RankedEvent,
    /// Upcoming occurrence number (prior count + 1), when known.
    pub next_number: Option<u32>,
    /// Announced cancellation reason for the upcoming occurrence, if any.
    pub cancelled: Option<String>,
    /// Whether the requesting person has completed this event.
    pub completed: bool,
}

impl ReportRow {
    pub fn is_milestone(&self, interval: u32) -> bool {
        match self.next_number {
            Some(n) if interval > 0 => n % interval == 0,
            _ => false,
        }
    }

    /// One console line per result, e.g.
    /// `[CANCELLED: Festival] Catford parkrun (catford)  4.20 km  next #412  (visited)`
    pub fn display_line(&self) -> String {
        let mut line = String::new();
        if let Some(ref reason) = self.cancelled {
            line.push_str(&format!("[CANCELLED: {}] ", reason));
        }
        let next = match self.next_number {
            Some(n) => format!("#{}", n),
            None => "#?".to_string(),
        };
        line.push_str(&format!(
            "{} ({})  {:.2} km  next {}",
            self.ranked.event.name, self.ranked.event.slug, self.ranked.distance_km, next
        ));
        if self.completed {
            line.push_str("  (visited)");
        }
        line
    }
}

/// Write milestone rows (upcoming number divisible by `interval`) to a CSV
/// file with a header row.
pub fn export_milestones(rows: &[ReportRow], interval: u32, path: &Path) -> Result<usize> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create CSV file {}", path.display()))?;

    writer.write_record(["name", "identifier", "event_number", "distance_km", "url"])?;

    let mut written = 0;
    for row in rows.iter().filter(|r| r.is_milestone(interval)) {
        let number = match row.next_number {
            Some(n) => n.to_string(),
            None => continue,
        };
        let distance = format!("{:.2}", row.ranked.distance_km);
        writer.write_record([
            row.ranked.event.name.as_str(),
            row.ranked.event.slug.as_str(),
            number.as_str(),
            distance.as_str(),
            row.ranked.event.url.as_str(),
        ])?;
        written += 1;
    }

    writer.flush()?;
    Ok(written)
}
