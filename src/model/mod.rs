use serde::{Deserialize, Serialize};

/// A candidate as registered for one election year.
///
/// Unique per (`candidate_id`, `election_year`); never mutated after it has
/// been fetched within a session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateIdentity {
    pub candidate_id: i64,
    pub election_year: i32,
    /// Full registered name (nm_candidato).
    pub display_name: String,
    /// Name as printed on the ballot (nm_urna_candidato); used for matching
    /// and on-screen labels.
    pub ballot_name: String,
    pub ballot_number: i32,
    pub party_abbreviation: String,
    pub party_number: Option<i32>,
    pub office_code: i32,
    pub office_label: String,
    /// Final round outcome label (e.g. "ELEITO", "NÃO ELEITO"), when known.
    pub situation_label: Option<String>,
}

/// Canonical per-municipality vote breakdown for one candidate.
///
/// Produced fresh on every fetch and replaced wholesale on refetch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityVoteRow {
    /// Natural key within one election year.
    pub municipality_name: String,
    pub total_votes: i64,
    /// Percentage of valid votes in this municipality cast for the
    /// candidate, in [0, 100].
    pub vote_percentage: f64,
}

/// One municipality's votes for both sides of a comparison.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MunicipalityVotes {
    pub municipality_name: String,
    pub votes_candidate_a: i64,
    pub votes_candidate_b: i64,
}

/// Merged vote distributions for two candidates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VotingComparison {
    /// Union of municipalities appearing for either candidate; carries no
    /// intrinsic order.
    pub per_municipality: Vec<MunicipalityVotes>,
    pub total_votes_a: i64,
    pub total_votes_b: i64,
    /// `(total_a - total_b) / (total_a + total_b) * 100`, 0 when both
    /// totals are 0.
    pub voting_percentage_diff: f64,
}

/// A full candidate-versus-candidate comparison.
///
/// Owned by the request that produced it and discarded when a new comparison
/// is issued; there is no write path behind it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComparisonResult {
    pub candidate_a: CandidateIdentity,
    pub candidate_b: CandidateIdentity,
    pub voting_comparison: VotingComparison,
}

/// An elected office (cargo) as listed for one election year.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Office {
    pub office_code: i32,
    pub office_label: String,
}
