use chrono::{DateTime, Utc, Weekday};
use chrono::Datelike;
use chrono_tz::Tz;

use super::record::CacheRecord;

/// Injectable clock so staleness behavior can be asserted for arbitrary
/// simulated instants without touching real system time.
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Decides whether a cached aggregate is eligible for refresh.
///
/// A record is stale immediately when any required key is absent or mapped
/// to the null sentinel. Otherwise it is stale only on the designated
/// refresh weekday (evaluated in the fixed reference timezone) when time has
/// advanced past the last save. This does not dedupe repeated runs within
/// the same refresh day; a second run on that day will refresh again.
#[derive(Debug, Clone)]
pub struct RefreshPolicy {
    refresh_day: Weekday,
    timezone: Tz,
}

impl RefreshPolicy {
    pub fn new(refresh_day: Weekday, timezone: Tz) -> Self {
        Self {
            refresh_day,
            timezone,
        }
    }

    /// Weekly Sunday refresh in the UK reference timezone, the day after the
    /// events run.
    pub fn uk_weekly() -> Self {
        Self::new(Weekday::Sun, chrono_tz::Europe::London)
    }

    pub fn is_stale<V>(
        &self,
        record: &CacheRecord<V>,
        required_keys: &[String],
        now: DateTime<Utc>,
    ) -> bool {
        if required_keys.iter().any(|key| record.value(key).is_none()) {
            return true;
        }

        if now.with_timezone(&self.timezone).weekday() != self.refresh_day {
            return false;
        }

        match record.last_updated {
            None => true,
            Some(last) => now > last,
        }
    }
}
