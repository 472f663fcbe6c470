//! Data models for runscout.
//!
//! This module contains the data structures flowing through the pipeline:
//!
//! - `Event`, `RankedEvent`: canonical events and their distance-annotated form
//! - `EventFeed` and friends: the wire shape of the canonical event feed
//! - `Announcement`: one unstructured cancellation notice

pub mod cancellation;
pub mod event;

pub use cancellation::Announcement;
pub use event::{Event, EventFeed, EventFeature, RankedEvent};
