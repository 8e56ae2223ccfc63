pub mod postgres;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub use postgres::ElectionsDatabase;

#[derive(Debug, thiserror::Error)]
pub enum DataSourceError {
    #[error("Postgres error: {0}")]
    Sqlx(#[from] sqlx::Error),
    #[error("data service timed out after {0} ms")]
    Timeout(u64),
    #[error("data service error: {0}")]
    Backend(String),
}

pub type Result<T> = std::result::Result<T, DataSourceError>;

/// A candidate row as the backend returns it.
///
/// Endpoints disagree on field names and on which fields they bother to
/// fill in, so everything beyond the id is optional and carries the known
/// aliases. The normalizer turns this into a `CandidateIdentity`.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawCandidateRow {
    #[serde(alias = "sq_candidato")]
    pub candidate_id: Option<i64>,
    #[serde(alias = "ano_eleicao")]
    pub election_year: Option<i32>,
    #[serde(alias = "nm_candidato")]
    pub display_name: Option<String>,
    #[serde(alias = "nm_urna_candidato")]
    pub ballot_name: Option<String>,
    #[serde(alias = "nr_candidato")]
    pub ballot_number: Option<i32>,
    #[serde(alias = "sg_partido")]
    pub party_abbreviation: Option<String>,
    #[serde(alias = "nr_partido")]
    pub party_number: Option<i32>,
    #[serde(alias = "cd_cargo")]
    pub office_code: Option<i32>,
    #[serde(alias = "ds_cargo")]
    pub office_label: Option<String>,
    #[serde(alias = "ds_sit_tot_turno")]
    pub situation_label: Option<String>,
}

/// Convention an endpoint uses for its percentage columns.
///
/// Each adapter knows which one its endpoints speak; the normalizer never
/// guesses from the values themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PercentScale {
    /// Values already in [0, 100]. The elections backend always returns
    /// these (`percentual_votos` comes pre-multiplied).
    #[default]
    PreMultiplied,
    /// Values in [0, 1], to be scaled by 100.
    Fraction,
}

/// A per-location vote row as the backend returns it.
///
/// The vote stored functions and the REST votes endpoints use different
/// field names for the same things (`nm_municipio`/`nm_bairro`/`name`,
/// `total_votos`/`votes`, `percentual_votos`/`percentage`); rows with no
/// resolvable location do occur and are dropped downstream.
#[derive(Debug, Clone, Default, Serialize, Deserialize, sqlx::FromRow)]
pub struct RawVoteRow {
    #[serde(alias = "nm_municipio", alias = "nm_bairro", alias = "name")]
    pub location_name: Option<String>,
    #[serde(alias = "total_votos", alias = "votes")]
    pub total_votes: Option<i64>,
    #[serde(alias = "percentual_votos", alias = "percentage")]
    pub vote_percentage: Option<f64>,
}

/// The three read operations the core needs from the election backend.
///
/// Transport and schema are the backend's concern; implementations adapt
/// whatever wire format they speak into the raw row shapes above.
#[async_trait]
pub trait ElectionDataSource: Send + Sync {
    /// Free-text candidate search, backend-ordered, at most `limit` rows.
    async fn lookup_candidates(
        &self,
        term: &str,
        year: i32,
        limit: i64,
    ) -> Result<Vec<RawCandidateRow>>;

    /// Single-candidate detail fetch; `None` when the candidate does not
    /// exist for that year.
    async fn candidate_identity(
        &self,
        candidate_id: i64,
        year: i32,
    ) -> Result<Option<RawCandidateRow>>;

    /// Per-municipality vote breakdown for one candidate.
    async fn votes_by_municipality(&self, candidate_id: i64, year: i32)
        -> Result<Vec<RawVoteRow>>;

    /// Which percentage convention this source's vote rows use.
    fn vote_percent_scale(&self) -> PercentScale {
        PercentScale::PreMultiplied
    }
}
