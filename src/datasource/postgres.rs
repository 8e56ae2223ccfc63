use super::{DataSourceError, ElectionDataSource, RawCandidateRow, RawVoteRow, Result};
use crate::model::Office;
use async_trait::async_trait;
use sqlx::PgPool;
use std::future::Future;
use std::time::Duration;

const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(10);

const CANDIDATE_COLUMNS: &str = "\
    sq_candidato      AS candidate_id, \
    ano_eleicao       AS election_year, \
    nm_candidato      AS display_name, \
    nm_urna_candidato AS ballot_name, \
    nr_candidato      AS ballot_number, \
    sg_partido        AS party_abbreviation, \
    nr_partido        AS party_number, \
    cd_cargo          AS office_code, \
    ds_cargo          AS office_label, \
    ds_sit_tot_turno  AS situation_label";

/// Remote elections database (managed Postgres with stored functions).
///
/// The schema and the vote-aggregation functions live server-side; this
/// type only composes queries against them.
#[derive(Clone)]
pub struct ElectionsDatabase {
    pool: PgPool,
    query_timeout: Duration,
}

impl ElectionsDatabase {
    pub async fn new(database_url: &str) -> Result<Self> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self {
            pool,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        })
    }

    pub fn with_query_timeout(mut self, timeout: Duration) -> Self {
        self.query_timeout = timeout;
        self
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Per-neighborhood vote breakdown for one candidate, optionally
    /// narrowed to one municipality by its code.
    pub async fn votes_by_neighborhood(
        &self,
        candidate_id: i64,
        year: i32,
        municipality_code: Option<i32>,
    ) -> Result<Vec<RawVoteRow>> {
        // Same server-side aggregation family as the municipality function;
        // a NULL municipality code means "all of them".
        let query = sqlx::query_as::<_, RawVoteRow>(
            r#"
            SELECT
                nm_bairro        AS location_name,
                total_votos      AS total_votes,
                percentual_votos AS vote_percentage
            FROM get_candidate_votes_by_neighborhood($1, $2, $3)
            "#,
        )
        .bind(candidate_id)
        .bind(year)
        .bind(municipality_code)
        .fetch_all(&self.pool);

        self.bounded(query).await
    }

    /// Distinct offices (cargos) contested in one election year; feeds the
    /// reference-data cache on the caller side.
    pub async fn list_offices(&self, year: i32) -> Result<Vec<Office>> {
        let query = sqlx::query_as::<_, Office>(
            r#"
            SELECT DISTINCT cd_cargo AS office_code, ds_cargo AS office_label
            FROM candidatos
            WHERE ano_eleicao = $1 AND cd_cargo IS NOT NULL AND ds_cargo IS NOT NULL
            ORDER BY office_label
            "#,
        )
        .bind(year)
        .fetch_all(&self.pool);

        self.bounded(query).await
    }

    /// Wraps a query future in the configured timeout; a timeout maps into
    /// the same failure path as any other backend error.
    async fn bounded<T, F>(&self, fut: F) -> Result<T>
    where
        F: Future<Output = std::result::Result<T, sqlx::Error>>,
    {
        match tokio::time::timeout(self.query_timeout, fut).await {
            Ok(result) => Ok(result?),
            Err(_) => Err(DataSourceError::Timeout(
                self.query_timeout.as_millis() as u64
            )),
        }
    }
}

#[async_trait]
impl ElectionDataSource for ElectionsDatabase {
    async fn lookup_candidates(
        &self,
        term: &str,
        year: i32,
        limit: i64,
    ) -> Result<Vec<RawCandidateRow>> {
        let pattern = format!("%{}%", term);
        let sql = format!(
            r#"
            SELECT {CANDIDATE_COLUMNS}
            FROM candidatos
            WHERE ano_eleicao = $1
              AND (nm_urna_candidato ILIKE $2 OR nm_candidato ILIKE $2)
            ORDER BY nm_urna_candidato
            LIMIT $3
            "#
        );

        let query = sqlx::query_as::<_, RawCandidateRow>(&sql)
            .bind(year)
            .bind(pattern)
            .bind(limit)
            .fetch_all(&self.pool);

        self.bounded(query).await
    }

    async fn candidate_identity(
        &self,
        candidate_id: i64,
        year: i32,
    ) -> Result<Option<RawCandidateRow>> {
        let sql = format!(
            r#"
            SELECT {CANDIDATE_COLUMNS}
            FROM candidatos
            WHERE sq_candidato = $1 AND ano_eleicao = $2
            "#
        );

        let query = sqlx::query_as::<_, RawCandidateRow>(&sql)
            .bind(candidate_id)
            .bind(year)
            .fetch_optional(&self.pool);

        self.bounded(query).await
    }

    async fn votes_by_municipality(
        &self,
        candidate_id: i64,
        year: i32,
    ) -> Result<Vec<RawVoteRow>> {
        // Aggregation happens server-side in this stored function.
        let query = sqlx::query_as::<_, RawVoteRow>(
            r#"
            SELECT
                nm_municipio     AS location_name,
                total_votos      AS total_votes,
                percentual_votos AS vote_percentage
            FROM get_candidate_votes_by_municipality($1, $2)
            "#,
        )
        .bind(candidate_id)
        .bind(year)
        .fetch_all(&self.pool);

        self.bounded(query).await
    }
}
