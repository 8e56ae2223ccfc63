//! Merges two candidates' per-municipality breakdowns into one comparison.

use crate::model::{MunicipalityVoteRow, MunicipalityVotes, VotingComparison};
use itertools::Itertools;
use std::collections::HashMap;

/// Merges the two vote distributions.
///
/// The result covers the union of municipalities seen on either side, with
/// the missing side defaulted to 0. Either input may be empty (a candidate
/// with zero recorded votes everywhere); the result is still well-formed.
/// Pure function; the output set carries no intrinsic order.
pub fn merge(rows_a: &[MunicipalityVoteRow], rows_b: &[MunicipalityVoteRow]) -> VotingComparison {
    let mut by_municipality: HashMap<String, MunicipalityVotes> =
        HashMap::with_capacity(rows_a.len() + rows_b.len());

    for row in rows_a {
        by_municipality.insert(
            row.municipality_name.clone(),
            MunicipalityVotes {
                municipality_name: row.municipality_name.clone(),
                votes_candidate_a: row.total_votes,
                votes_candidate_b: 0,
            },
        );
    }

    for row in rows_b {
        match by_municipality.get_mut(&row.municipality_name) {
            Some(entry) => entry.votes_candidate_b = row.total_votes,
            None => {
                by_municipality.insert(
                    row.municipality_name.clone(),
                    MunicipalityVotes {
                        municipality_name: row.municipality_name.clone(),
                        votes_candidate_a: 0,
                        votes_candidate_b: row.total_votes,
                    },
                );
            }
        }
    }

    let total_votes_a: i64 = rows_a.iter().map(|r| r.total_votes).sum();
    let total_votes_b: i64 = rows_b.iter().map(|r| r.total_votes).sum();

    VotingComparison {
        per_municipality: by_municipality.into_values().collect(),
        total_votes_a,
        total_votes_b,
        voting_percentage_diff: percentage_diff(total_votes_a, total_votes_b),
    }
}

/// `(a - b) / (a + b) * 100`, 0 when both totals are 0.
fn percentage_diff(total_a: i64, total_b: i64) -> f64 {
    let combined = total_a + total_b;
    if combined == 0 {
        return 0.0;
    }
    (total_a - total_b) as f64 / combined as f64 * 100.0
}

/// The `n` municipalities with the highest combined vote count, for charts.
///
/// Ranking is a presentation concern layered on top of `merge`; ties on
/// combined votes break by municipality name so chart output is stable.
pub fn top_municipalities(comparison: &VotingComparison, n: usize) -> Vec<MunicipalityVotes> {
    comparison
        .per_municipality
        .iter()
        .cloned()
        .sorted_by(|x, y| {
            let combined_x = x.votes_candidate_a + x.votes_candidate_b;
            let combined_y = y.votes_candidate_a + y.votes_candidate_b;
            combined_y
                .cmp(&combined_x)
                .then_with(|| x.municipality_name.cmp(&y.municipality_name))
        })
        .take(n)
        .collect()
}
