/// Infrastructure-level store failures.
///
/// These are faults, not business outcomes: callers propagate them for
/// retry/backoff at the API layer instead of presenting them as declines.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),

    #[error("store operation timed out: {0}")]
    Timeout(String),

    #[error("store constraint conflict: {0}")]
    Conflict(String),
}
