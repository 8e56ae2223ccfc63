pub mod aggregator;
pub mod normalizer;
pub mod orchestrator;

use crate::datasource::DataSourceError;

pub use orchestrator::{ComparisonOrchestrator, ComparisonSession};

#[derive(Debug, thiserror::Error)]
pub enum CompareError {
    /// Missing or malformed input; surfaced immediately, never retried.
    #[error("invalid comparison request: {0}")]
    Validation(String),
    /// The candidate does not exist for that year. A comparison is
    /// meaningless with one side missing, so this fails the operation.
    #[error("candidate {candidate_id} not found for year {year}")]
    NotFound { candidate_id: i64, year: i32 },
    #[error("data source error: {0}")]
    DataSource(#[from] DataSourceError),
    /// A newer request superseded this one while it was in flight. Not a
    /// failure; callers discard the result silently.
    #[error("superseded by request {latest}")]
    Stale { latest: u64 },
}

pub type CompareResult<T> = std::result::Result<T, CompareError>;
