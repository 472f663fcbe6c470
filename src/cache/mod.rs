//! Staleness-aware on-disk caching.
//!
//! Two cache instances share this machinery: the occurrence-count cache
//! (event identifier -> count) and the completion cache (person identifier ->
//! set of completed event identifiers). Each is a single JSON file holding a
//! `CacheRecord`, refreshed at most once per weekly window by `RefreshPolicy`
//! and filled incrementally by `Populator`.

pub mod populate;
pub mod record;
pub mod staleness;
pub mod store;

pub use populate::Populator;
pub use record::CacheRecord;
pub use staleness::{Clock, RefreshPolicy, SystemClock};
pub use store::CacheStore;
