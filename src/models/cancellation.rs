/// One unstructured cancellation notice scraped from the announcements page.
///
/// `raw_name` is whatever the announcement called the event; it is matched
/// against canonical display names by the reconciler, not trusted as an
/// identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Announcement {
    pub raw_name: String,
    pub reason: String,
}

impl Announcement {
    pub fn new(raw_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            raw_name: raw_name.into(),
            reason: reason.into(),
        }
    }

    /// Parse a "<Event name>: <reason>" list item. Returns `None` when the
    /// line has no colon or an empty name.
    pub fn parse_line(line: &str) -> Option<Self> {
        let (name, reason) = line.split_once(':')?;
        let name = name.trim();
        if name.is_empty() {
            return None;
        }
        Some(Self::new(name, reason.trim()))
    }
}
