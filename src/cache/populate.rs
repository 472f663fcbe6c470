use std::future::Future;
use std::time::Duration;

use anyhow::Result;
use rand::Rng;
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, warn};

use crate::api::FetchError;

use super::record::CacheRecord;
use super::staleness::Clock;
use super::store::CacheStore;

/// Fills cache gaps one key at a time.
///
/// The populator never consults staleness itself; the caller gates the whole
/// run on `RefreshPolicy` first. Keys that already hold a value are skipped,
/// so an interrupted run resumes from the first unpopulated key. The record
/// is persisted after every single fetch, success or failure, which is what
/// keeps the loss window to the one in-flight fetch.
///
/// A randomized delay separates consecutive external fetches. Skipped keys
/// incur no delay.
pub struct Populator {
    min_delay_ms: u64,
    max_delay_ms: u64,
}

/// Default politeness bounds between fetches. The source is rate-limited and
/// shared; one request every second or two is plenty.
const DEFAULT_MIN_DELAY_MS: u64 = 800;
const DEFAULT_MAX_DELAY_MS: u64 = 2000;

impl Default for Populator {
    fn default() -> Self {
        Self::new(DEFAULT_MIN_DELAY_MS, DEFAULT_MAX_DELAY_MS)
    }
}

impl Populator {
    pub fn new(min_delay_ms: u64, max_delay_ms: u64) -> Self {
        Self {
            min_delay_ms,
            max_delay_ms: max_delay_ms.max(min_delay_ms),
        }
    }

    /// No inter-fetch pause. Only sensible against in-memory fakes.
    #[cfg(test)]
    pub fn without_delay() -> Self {
        Self::new(0, 0)
    }

    async fn pause(&self) {
        if self.max_delay_ms == 0 {
            return;
        }
        let ms = rand::thread_rng().gen_range(self.min_delay_ms..=self.max_delay_ms);
        tokio::time::sleep(Duration::from_millis(ms)).await;
    }

    /// Fetch every required key that has no value yet, persisting after each
    /// attempt. Individual fetch failures are recorded as the null sentinel
    /// and never abort the run; only a failed save does.
    pub async fn populate<V, F, Fut>(
        &self,
        store: &CacheStore<V>,
        record: &mut CacheRecord<V>,
        required_keys: &[String],
        clock: &dyn Clock,
        fetch: F,
    ) -> Result<()>
    where
        V: Serialize + DeserializeOwned,
        F: Fn(String) -> Fut,
        Fut: Future<Output = Result<V, FetchError>>,
    {
        let mut fetched_any = false;

        for key in required_keys {
            if record.value(key).is_some() {
                debug!(key = %key, "Already populated, skipping");
                continue;
            }
            if record.is_attempted(key) {
                debug!(key = %key, "Re-attempting previously failed key");
            }

            if fetched_any {
                self.pause().await;
            }
            fetched_any = true;

            match fetch(key.clone()).await {
                Ok(value) => {
                    debug!(key = %key, "Fetched value");
                    record.insert(key.clone(), value);
                }
                Err(e) => {
                    warn!(key = %key, error = %e, "Fetch failed, recording as unknown");
                    record.record_failure(key.clone());
                }
            }

            record.touch(clock.now());
            store.save(record)?;
        }

        Ok(())
    }
}
