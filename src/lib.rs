//! Query-composition core for an election-results dashboard.
//!
//! The heavy lifting (vote aggregation, percentages, geospatial joins)
//! happens server-side in a managed Postgres backend; this crate fetches,
//! normalizes, and merges what comes back. The one real algorithm here is
//! the filter-driven comparative vote-aggregation pipeline in `comparison`.

pub mod cache;
pub mod comparison;
pub mod datasource;
pub mod model;
pub mod search;
pub mod util;
