use thiserror::Error;

/// A transient, per-key fetch failure. Recorded (as the null sentinel or a
/// dropped item) at the populator/reconciler boundary; never aborts a run.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    #[error("Unexpected status: {0}")]
    Status(reqwest::StatusCode),

    #[error("Missing expected content: {0}")]
    Shape(String),
}

/// The one fatal input error: the search location could not be resolved.
/// Propagated all the way out of the run.
#[derive(Error, Debug)]
#[error("Could not resolve location: {0}")]
pub struct LocationNotFound(pub String);
