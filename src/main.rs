use clap::{Parser, Subcommand};
use colored::*;
use std::sync::Arc;
use std::time::Duration;

use tokio::io::AsyncBufReadExt;

use voto_report::cache::TtlCache;
use voto_report::comparison::{aggregator, normalizer, ComparisonOrchestrator};
use voto_report::datasource::{ElectionDataSource, ElectionsDatabase, RawVoteRow};
use voto_report::model::{CandidateIdentity, MunicipalityVoteRow, Office};
use voto_report::search::CandidateSearch;
use voto_report::util::debounce::Debouncer;

/// Reference data turns over once per election cycle; an hour is plenty.
const OFFICE_CACHE_TTL: Duration = Duration::from_secs(3600);

#[derive(Parser)]
struct Opts {
    /// Postgres connection string (falls back to DATABASE_URL).
    #[clap(long)]
    database_url: Option<String>,

    #[clap(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search candidates by ballot name.
    Search {
        /// Search term (3 characters minimum); omit with --interactive.
        term: Option<String>,
        /// Election year.
        #[clap(long)]
        year: i32,
        /// Maximum number of results.
        #[clap(long, default_value_t = 10)]
        limit: i64,
        /// Read terms from stdin, one per line, debounced.
        #[clap(long)]
        interactive: bool,
    },
    /// Compare two candidates' vote distributions for one year.
    Compare {
        /// First candidate id (sq_candidato).
        candidate_a: i64,
        /// Second candidate id.
        candidate_b: i64,
        /// Election year.
        #[clap(long)]
        year: i32,
        /// How many municipalities to show.
        #[clap(long, default_value_t = 10)]
        top: usize,
        /// Emit the full result as JSON instead of a summary.
        #[clap(long)]
        json: bool,
    },
    /// Per-municipality vote breakdown for one candidate.
    Votes {
        /// Candidate id (sq_candidato).
        candidate_id: i64,
        /// Election year.
        #[clap(long)]
        year: i32,
        /// How many municipalities to show.
        #[clap(long, default_value_t = 10)]
        top: usize,
    },
    /// Per-neighborhood vote breakdown for one candidate.
    Neighborhoods {
        /// Candidate id (sq_candidato).
        candidate_id: i64,
        /// Election year.
        #[clap(long)]
        year: i32,
        /// Restrict to one municipality by its code (cd_municipio).
        #[clap(long)]
        municipality_code: Option<i32>,
        /// How many neighborhoods to show.
        #[clap(long, default_value_t = 10)]
        top: usize,
    },
    /// List the offices (cargos) contested in one year.
    Offices {
        /// Election year.
        #[clap(long)]
        year: i32,
    },
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let opts = Opts::parse();

    let database_url = opts
        .database_url
        .or_else(|| std::env::var("DATABASE_URL").ok())
        .unwrap_or_else(|| {
            eprintln!("❌ No database URL; pass --database-url or set DATABASE_URL");
            std::process::exit(2);
        });

    let db = match ElectionsDatabase::new(&database_url).await {
        Ok(db) => db,
        Err(e) => {
            eprintln!("❌ Could not connect to the elections database: {}", e);
            std::process::exit(1);
        }
    };

    match opts.command {
        Command::Search {
            term,
            year,
            limit,
            interactive,
        } => {
            if interactive {
                run_search_interactive(db, year, limit).await;
            } else {
                match term {
                    Some(term) => run_search(db, &term, year, limit).await,
                    None => {
                        eprintln!("❌ A search term is required unless --interactive is set");
                        std::process::exit(2);
                    }
                }
            }
        }
        Command::Compare {
            candidate_a,
            candidate_b,
            year,
            top,
            json,
        } => {
            if let Err(e) = run_compare(db, candidate_a, candidate_b, year, top, json).await {
                eprintln!("❌ Comparison failed: {}", e);
                std::process::exit(1);
            }
        }
        Command::Votes {
            candidate_id,
            year,
            top,
        } => {
            if let Err(e) = run_votes(db, candidate_id, year, top).await {
                eprintln!("❌ Vote breakdown failed: {}", e);
                std::process::exit(1);
            }
        }
        Command::Neighborhoods {
            candidate_id,
            year,
            municipality_code,
            top,
        } => {
            if let Err(e) = run_neighborhoods(db, candidate_id, year, municipality_code, top).await
            {
                eprintln!("❌ Neighborhood breakdown failed: {}", e);
                std::process::exit(1);
            }
        }
        Command::Offices { year } => {
            if let Err(e) = run_offices(db, year).await {
                eprintln!("❌ Office listing failed: {}", e);
                std::process::exit(1);
            }
        }
    }
}

async fn run_search(db: ElectionsDatabase, term: &str, year: i32, limit: i64) {
    let search = CandidateSearch::new(Arc::new(db));
    let candidates = search.search_limited(term, year, limit).await;
    print_candidates(term, year, &candidates);
}

/// Debounced search loop over stdin, one term per line; empty line quits.
/// A burst of lines (a paste, a fast-typing user) issues only the last
/// lookup after the quiet period.
async fn run_search_interactive(db: ElectionsDatabase, year: i32, limit: i64) {
    let search = Arc::new(CandidateSearch::new(Arc::new(db)));
    let debouncer = Debouncer::new(Duration::from_millis(300));

    println!("Type a search term and press enter (empty line to quit).");
    let mut lines = tokio::io::BufReader::new(tokio::io::stdin()).lines();
    let mut last_lookup = None;

    while let Ok(Some(line)) = lines.next_line().await {
        let term = line.trim().to_string();
        if term.is_empty() {
            break;
        }
        let search = Arc::clone(&search);
        last_lookup = Some(debouncer.call(async move {
            let candidates = search.search_limited(&term, year, limit).await;
            print_candidates(&term, year, &candidates);
        }));
    }

    // Let a lookup still waiting out its quiet period run before exiting.
    if let Some(handle) = last_lookup {
        while !handle.is_finished() {
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

fn print_candidates(term: &str, year: i32, candidates: &[CandidateIdentity]) {
    if candidates.is_empty() {
        println!("No candidates matched {} in {}", term.cyan(), year);
        return;
    }

    println!(
        "🔍 {} candidates for {} in {}",
        candidates.len().to_string().bright_yellow(),
        term.cyan(),
        year
    );
    for c in candidates {
        println!(
            "  {:>10}  {}  {} ({})",
            c.candidate_id.to_string().bright_white(),
            c.ballot_name.bright_green(),
            c.office_label,
            c.party_abbreviation
        );
    }
}

async fn run_compare(
    db: ElectionsDatabase,
    candidate_a: i64,
    candidate_b: i64,
    year: i32,
    top: usize,
    json: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let orchestrator = ComparisonOrchestrator::new(Arc::new(db));
    let result = orchestrator.compare(candidate_a, candidate_b, year).await?;

    if json {
        println!("{}", serde_json::to_string_pretty(&result)?);
        return Ok(());
    }

    let comparison = &result.voting_comparison;
    println!(
        "Generated {}",
        chrono::Local::now()
            .format("%Y-%m-%d %H:%M:%S")
            .to_string()
            .dimmed()
    );
    println!(
        "🗳️  {} vs {} ({})",
        result.candidate_a.ballot_name.bright_green().bold(),
        result.candidate_b.ballot_name.bright_cyan().bold(),
        year
    );
    println!(
        "{}: {}   {}: {}   diff: {}",
        result.candidate_a.ballot_name.bright_green(),
        comparison.total_votes_a.to_string().bright_white().bold(),
        result.candidate_b.ballot_name.bright_cyan(),
        comparison.total_votes_b.to_string().bright_white().bold(),
        format!("{:+.2}%", comparison.voting_percentage_diff).bright_yellow()
    );

    println!("\nTop {} municipalities by combined votes:", top);
    for entry in aggregator::top_municipalities(comparison, top) {
        println!(
            "  {:<30} {:>8} {:>8}",
            entry.municipality_name,
            entry.votes_candidate_a.to_string().bright_green(),
            entry.votes_candidate_b.to_string().bright_cyan()
        );
    }

    Ok(())
}

async fn run_votes(
    db: ElectionsDatabase,
    candidate_id: i64,
    year: i32,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = db.votes_by_municipality(candidate_id, year).await?;
    let rows = sorted_breakdown(&raw);

    let total: i64 = rows.iter().map(|r| r.total_votes).sum();
    println!(
        "🗳️  Candidate {} in {}: {} votes across {} municipalities",
        candidate_id.to_string().bright_white(),
        year,
        total.to_string().bright_green().bold(),
        rows.len().to_string().bright_yellow()
    );

    for row in rows.iter().take(top) {
        println!(
            "  {:<30} {:>8}  {:>6.2}%",
            row.municipality_name,
            row.total_votes.to_string().bright_green(),
            row.vote_percentage
        );
    }

    Ok(())
}

async fn run_neighborhoods(
    db: ElectionsDatabase,
    candidate_id: i64,
    year: i32,
    municipality_code: Option<i32>,
    top: usize,
) -> Result<(), Box<dyn std::error::Error>> {
    let raw = db
        .votes_by_neighborhood(candidate_id, year, municipality_code)
        .await?;
    let rows = sorted_breakdown(&raw);

    let total: i64 = rows.iter().map(|r| r.total_votes).sum();
    let scope = match municipality_code {
        Some(code) => format!("municipality {}", code),
        None => "all municipalities".to_string(),
    };
    println!(
        "🗳️  Candidate {} in {} ({}): {} votes across {} neighborhoods",
        candidate_id.to_string().bright_white(),
        year,
        scope,
        total.to_string().bright_green().bold(),
        rows.len().to_string().bright_yellow()
    );

    for row in rows.iter().take(top) {
        println!(
            "  {:<30} {:>8}  {:>6.2}%",
            row.municipality_name,
            row.total_votes.to_string().bright_green(),
            row.vote_percentage
        );
    }

    Ok(())
}

fn sorted_breakdown(raw: &[RawVoteRow]) -> Vec<MunicipalityVoteRow> {
    let mut rows = normalizer::normalize(raw);
    rows.sort_by(|x, y| y.total_votes.cmp(&x.total_votes));
    rows
}

async fn run_offices(db: ElectionsDatabase, year: i32) -> Result<(), Box<dyn std::error::Error>> {
    let cache: TtlCache<i32, Vec<Office>> = TtlCache::new(OFFICE_CACHE_TTL);
    let offices = cache.get_or_load(year, || db.list_offices(year)).await?;

    println!(
        "🏛️  {} offices contested in {}",
        offices.len().to_string().bright_yellow(),
        year
    );
    for office in offices {
        println!(
            "  {:>3}  {}",
            office.office_code.to_string().bright_white(),
            office.office_label
        );
    }

    Ok(())
}
