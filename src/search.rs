//! Free-text candidate lookup backing a search-as-you-type box.

use crate::comparison::normalizer;
use crate::datasource::ElectionDataSource;
use crate::model::CandidateIdentity;
use log::warn;
use std::sync::Arc;

pub const DEFAULT_SEARCH_LIMIT: i64 = 10;

/// Minimum term length before the backing store is queried. Shorter terms
/// would turn into expensive unanchored matches server-side.
const MIN_TERM_LEN: usize = 3;

/// Resolves a search term plus a year into a bounded set of candidates.
///
/// This component deliberately fails soft: backend errors surface as an
/// empty result list, because error noise in an interactive search box
/// degrades the experience more than an empty list does. Read-only.
pub struct CandidateSearch {
    source: Arc<dyn ElectionDataSource>,
}

impl CandidateSearch {
    pub fn new(source: Arc<dyn ElectionDataSource>) -> Self {
        Self { source }
    }

    pub async fn search(&self, term: &str, year: i32) -> Vec<CandidateIdentity> {
        self.search_limited(term, year, DEFAULT_SEARCH_LIMIT).await
    }

    /// Case-insensitive substring match on the ballot name (and registered
    /// name); result order is backend-defined.
    pub async fn search_limited(&self, term: &str, year: i32, limit: i64) -> Vec<CandidateIdentity> {
        let term = term.trim();
        if term.chars().count() < MIN_TERM_LEN {
            return Vec::new();
        }

        match self.source.lookup_candidates(term, year, limit).await {
            Ok(rows) => rows
                .iter()
                .filter_map(normalizer::normalize_candidate)
                .collect(),
            Err(err) => {
                warn!("candidate search failed, returning no results: {}", err);
                Vec::new()
            }
        }
    }
}
