//! Entry point for candidate-versus-candidate comparisons.

use super::aggregator;
use super::normalizer;
use super::{CompareError, CompareResult};
use crate::datasource::{DataSourceError, ElectionDataSource, RawVoteRow};
use crate::model::{CandidateIdentity, ComparisonResult};
use log::warn;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

const MIN_ELECTION_YEAR: i32 = 1900;
const MAX_ELECTION_YEAR: i32 = 2100;

/// One fetched side of a comparison. The identity is mandatory; the vote
/// fetch outcome is kept as-is so the caller can decide how to degrade.
struct CandidateSide {
    identity: CandidateIdentity,
    votes: Result<Vec<RawVoteRow>, DataSourceError>,
}

/// Drives the external data source and the aggregator to produce a
/// `ComparisonResult`. Stateless apart from the data-source handle; every
/// invocation owns the result it produces.
pub struct ComparisonOrchestrator {
    source: Arc<dyn ElectionDataSource>,
}

impl ComparisonOrchestrator {
    pub fn new(source: Arc<dyn ElectionDataSource>) -> Self {
        Self { source }
    }

    /// Compares two candidates for one election year.
    ///
    /// The two per-candidate fetches are independent reads and run
    /// concurrently. A missing identity fails the whole operation; a failed
    /// vote fetch on one side degrades to an empty breakdown so the other
    /// side stays usable. No retries: a failed fetch is reported immediately.
    pub async fn compare(
        &self,
        candidate_a_id: i64,
        candidate_b_id: i64,
        year: i32,
    ) -> CompareResult<ComparisonResult> {
        validate_request(candidate_a_id, candidate_b_id, year)?;

        let (side_a, side_b) = tokio::join!(
            self.fetch_side(candidate_a_id, year),
            self.fetch_side(candidate_b_id, year),
        );
        let side_a = side_a?;
        let side_b = side_b?;

        // Both vote fetches failing means there is nothing left to show.
        if let (Err(_), Err(err_b)) = (&side_a.votes, &side_b.votes) {
            return Err(CompareError::DataSource(DataSourceError::Backend(
                format!("vote fetches failed for both candidates: {}", err_b),
            )));
        }

        let scale = self.source.vote_percent_scale();
        let rows_a = normalizer::normalize_scaled(
            &degraded(side_a.votes, side_a.identity.candidate_id),
            scale,
        );
        let rows_b = normalizer::normalize_scaled(
            &degraded(side_b.votes, side_b.identity.candidate_id),
            scale,
        );

        Ok(ComparisonResult {
            candidate_a: side_a.identity,
            candidate_b: side_b.identity,
            voting_comparison: aggregator::merge(&rows_a, &rows_b),
        })
    }

    /// Like `compare`, but tagged against `session` so a response that
    /// resolves after a newer request has been issued is discarded instead
    /// of overwriting the newer result.
    pub async fn compare_latest(
        &self,
        session: &ComparisonSession,
        candidate_a_id: i64,
        candidate_b_id: i64,
        year: i32,
    ) -> CompareResult<ComparisonResult> {
        let seq = session.begin();
        let result = self.compare(candidate_a_id, candidate_b_id, year).await;
        let latest = session.latest();
        if latest != seq {
            return Err(CompareError::Stale { latest });
        }
        result
    }

    async fn fetch_side(&self, candidate_id: i64, year: i32) -> CompareResult<CandidateSide> {
        let raw = self.source.candidate_identity(candidate_id, year).await?;
        let identity = raw
            .as_ref()
            .and_then(normalizer::normalize_candidate)
            .ok_or(CompareError::NotFound { candidate_id, year })?;

        let votes = self.source.votes_by_municipality(candidate_id, year).await;
        Ok(CandidateSide { identity, votes })
    }
}

/// Collapses a failed vote fetch into an empty breakdown, logging once.
fn degraded(votes: Result<Vec<RawVoteRow>, DataSourceError>, candidate_id: i64) -> Vec<RawVoteRow> {
    match votes {
        Ok(rows) => rows,
        Err(err) => {
            warn!(
                "vote fetch failed for candidate {}, degrading to empty breakdown: {}",
                candidate_id, err
            );
            Vec::new()
        }
    }
}

fn validate_request(candidate_a_id: i64, candidate_b_id: i64, year: i32) -> CompareResult<()> {
    if candidate_a_id <= 0 || candidate_b_id <= 0 {
        return Err(CompareError::Validation(
            "both candidate ids are required".to_string(),
        ));
    }
    if !(MIN_ELECTION_YEAR..=MAX_ELECTION_YEAR).contains(&year) {
        return Err(CompareError::Validation(format!(
            "implausible election year: {}",
            year
        )));
    }
    Ok(())
}

/// Stale-response guard for interactive callers.
///
/// Each request draws a monotonically increasing sequence number; a response
/// whose number is no longer the latest issued is dropped.
#[derive(Debug, Default)]
pub struct ComparisonSession {
    latest: AtomicU64,
}

impl ComparisonSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues the next sequence number, superseding all prior requests.
    pub fn begin(&self) -> u64 {
        self.latest.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn latest(&self) -> u64 {
        self.latest.load(Ordering::SeqCst)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::datasource::RawCandidateRow;
    use async_trait::async_trait;
    use std::collections::{HashMap, HashSet};
    use std::time::Duration;

    /// In-memory data source with controllable failures and latency.
    #[derive(Default)]
    struct FakeSource {
        candidates: HashMap<(i64, i32), RawCandidateRow>,
        votes: HashMap<i64, Vec<RawVoteRow>>,
        failing_vote_fetches: HashSet<i64>,
        failing_identity_fetches: HashSet<i64>,
        vote_fetch_delay: HashMap<i64, Duration>,
    }

    impl FakeSource {
        fn with_candidate(mut self, id: i64, year: i32, ballot_name: &str) -> Self {
            self.candidates.insert(
                (id, year),
                RawCandidateRow {
                    candidate_id: Some(id),
                    election_year: Some(year),
                    display_name: Some(ballot_name.to_string()),
                    ballot_name: Some(ballot_name.to_string()),
                    ..Default::default()
                },
            );
            self
        }

        fn with_votes(mut self, id: i64, rows: Vec<(&str, i64)>) -> Self {
            self.votes.insert(
                id,
                rows.into_iter()
                    .map(|(name, votes)| RawVoteRow {
                        location_name: Some(name.to_string()),
                        total_votes: Some(votes),
                        vote_percentage: Some(0.0),
                    })
                    .collect(),
            );
            self
        }

        fn failing_votes(mut self, id: i64) -> Self {
            self.failing_vote_fetches.insert(id);
            self
        }

        fn failing_identity(mut self, id: i64) -> Self {
            self.failing_identity_fetches.insert(id);
            self
        }

        fn slow_votes(mut self, id: i64, delay: Duration) -> Self {
            self.vote_fetch_delay.insert(id, delay);
            self
        }
    }

    #[async_trait]
    impl ElectionDataSource for FakeSource {
        async fn lookup_candidates(
            &self,
            _term: &str,
            _year: i32,
            _limit: i64,
        ) -> crate::datasource::Result<Vec<RawCandidateRow>> {
            Ok(Vec::new())
        }

        async fn candidate_identity(
            &self,
            candidate_id: i64,
            year: i32,
        ) -> crate::datasource::Result<Option<RawCandidateRow>> {
            if self.failing_identity_fetches.contains(&candidate_id) {
                return Err(DataSourceError::Backend("identity fetch failed".into()));
            }
            Ok(self.candidates.get(&(candidate_id, year)).cloned())
        }

        async fn votes_by_municipality(
            &self,
            candidate_id: i64,
            _year: i32,
        ) -> crate::datasource::Result<Vec<RawVoteRow>> {
            if let Some(delay) = self.vote_fetch_delay.get(&candidate_id) {
                tokio::time::sleep(*delay).await;
            }
            if self.failing_vote_fetches.contains(&candidate_id) {
                return Err(DataSourceError::Backend("vote fetch failed".into()));
            }
            Ok(self.votes.get(&candidate_id).cloned().unwrap_or_default())
        }
    }

    fn orchestrator(source: FakeSource) -> ComparisonOrchestrator {
        ComparisonOrchestrator::new(Arc::new(source))
    }

    #[tokio::test]
    async fn compares_two_candidates() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_candidate(2, 2022, "BELTRANO")
            .with_votes(1, vec![("Rio Branco", 100)])
            .with_votes(2, vec![("Rio Branco", 60), ("Cruzeiro do Sul", 80)]);

        let result = orchestrator(source).compare(1, 2, 2022).await.unwrap();

        assert_eq!(result.candidate_a.ballot_name, "FULANO");
        assert_eq!(result.voting_comparison.total_votes_a, 100);
        assert_eq!(result.voting_comparison.total_votes_b, 140);
        assert_eq!(result.voting_comparison.per_municipality.len(), 2);
    }

    #[tokio::test]
    async fn missing_identity_fails_the_comparison() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_votes(1, vec![("Rio Branco", 100)]);

        let err = orchestrator(source).compare(1, 2, 2022).await.unwrap_err();
        assert!(matches!(
            err,
            CompareError::NotFound {
                candidate_id: 2,
                year: 2022
            }
        ));
    }

    #[tokio::test]
    async fn identity_fetch_error_is_fatal() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_candidate(2, 2022, "BELTRANO")
            .failing_identity(2);

        let err = orchestrator(source).compare(1, 2, 2022).await.unwrap_err();
        assert!(matches!(err, CompareError::DataSource(_)));
    }

    #[tokio::test]
    async fn one_sided_vote_failure_degrades_to_zero() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_candidate(2, 2022, "BELTRANO")
            .with_votes(1, vec![("Rio Branco", 100)])
            .failing_votes(2);

        let result = orchestrator(source).compare(1, 2, 2022).await.unwrap();

        assert_eq!(result.voting_comparison.total_votes_a, 100);
        assert_eq!(result.voting_comparison.total_votes_b, 0);
        assert_eq!(result.voting_comparison.voting_percentage_diff, 100.0);
    }

    #[tokio::test]
    async fn both_vote_failures_fail_the_comparison() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_candidate(2, 2022, "BELTRANO")
            .failing_votes(1)
            .failing_votes(2);

        let err = orchestrator(source).compare(1, 2, 2022).await.unwrap_err();
        assert!(matches!(err, CompareError::DataSource(_)));
    }

    #[tokio::test]
    async fn rejects_missing_and_malformed_input() {
        let orch = orchestrator(FakeSource::default());

        assert!(matches!(
            orch.compare(0, 2, 2022).await.unwrap_err(),
            CompareError::Validation(_)
        ));
        assert!(matches!(
            orch.compare(1, 2, 12).await.unwrap_err(),
            CompareError::Validation(_)
        ));
    }

    #[tokio::test]
    async fn a_candidate_can_be_compared_against_themselves() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_votes(1, vec![("Rio Branco", 100)]);

        let result = orchestrator(source).compare(1, 1, 2022).await.unwrap();

        assert_eq!(result.candidate_a, result.candidate_b);
        assert_eq!(result.voting_comparison.total_votes_a, 100);
        assert_eq!(result.voting_comparison.total_votes_b, 100);
        assert_eq!(result.voting_comparison.voting_percentage_diff, 0.0);
    }

    #[tokio::test]
    async fn stale_response_is_discarded() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_candidate(2, 2022, "BELTRANO")
            .with_candidate(3, 2022, "SICRANO")
            .with_votes(1, vec![("Rio Branco", 100)])
            .with_votes(2, vec![("Rio Branco", 60)])
            .with_votes(3, vec![("Rio Branco", 30)])
            .slow_votes(2, Duration::from_millis(80));

        let orch = Arc::new(orchestrator(source));
        let session = Arc::new(ComparisonSession::new());

        // Request #1 (A vs B) is slow; request #2 (A vs C) supersedes it
        // while it is still in flight.
        let first = {
            let orch = Arc::clone(&orch);
            let session = Arc::clone(&session);
            tokio::spawn(async move { orch.compare_latest(&session, 1, 2, 2022).await })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        let second = orch.compare_latest(&session, 1, 3, 2022).await.unwrap();

        assert_eq!(second.candidate_b.ballot_name, "SICRANO");
        let first = first.await.unwrap();
        assert!(matches!(first, Err(CompareError::Stale { .. })));
    }

    #[tokio::test]
    async fn latest_request_wins_in_order_too() {
        let source = FakeSource::default()
            .with_candidate(1, 2022, "FULANO")
            .with_candidate(2, 2022, "BELTRANO")
            .with_votes(1, vec![("Rio Branco", 100)])
            .with_votes(2, vec![("Rio Branco", 60)]);

        let orch = orchestrator(source);
        let session = ComparisonSession::new();

        // Sequential requests never see each other as stale.
        assert!(orch.compare_latest(&session, 1, 2, 2022).await.is_ok());
        assert!(orch.compare_latest(&session, 2, 1, 2022).await.is_ok());
    }
}
