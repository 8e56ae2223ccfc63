//! Canonicalizes raw backend rows.
//!
//! The backend endpoints do not agree on field names or on whether the
//! percentage column is pre-multiplied; everything downstream of this module
//! sees one shape only.

use crate::datasource::{PercentScale, RawCandidateRow, RawVoteRow};
use crate::model::{CandidateIdentity, MunicipalityVoteRow};
use log::debug;

/// Converts raw vote rows into canonical `MunicipalityVoteRow`s, assuming
/// the backend's pre-multiplied percentage convention.
pub fn normalize(raw: &[RawVoteRow]) -> Vec<MunicipalityVoteRow> {
    normalize_scaled(raw, PercentScale::PreMultiplied)
}

/// Converts raw vote rows into canonical `MunicipalityVoteRow`s.
///
/// Rows without a resolvable location name are dropped silently; they are
/// data-quality gaps in the upstream source, not application errors.
/// The percentage convention is the adapter's to declare; sub-1% values are
/// legitimate results, never rescaled on a guess.
/// Pure function: no I/O, input untouched.
pub fn normalize_scaled(raw: &[RawVoteRow], scale: PercentScale) -> Vec<MunicipalityVoteRow> {
    let mut rows = Vec::with_capacity(raw.len());
    let mut dropped = 0usize;

    for row in raw {
        let name = match &row.location_name {
            Some(name) if !name.trim().is_empty() => name.trim().to_string(),
            _ => {
                dropped += 1;
                continue;
            }
        };

        rows.push(MunicipalityVoteRow {
            municipality_name: name,
            total_votes: row.total_votes.unwrap_or(0).max(0),
            vote_percentage: normalize_percentage(row.vote_percentage.unwrap_or(0.0), scale),
        });
    }

    if dropped > 0 {
        debug!("dropped {} vote rows with no location", dropped);
    }
    rows
}

/// Canonicalizes a candidate row; `None` when the row lacks an id.
pub fn normalize_candidate(raw: &RawCandidateRow) -> Option<CandidateIdentity> {
    let candidate_id = raw.candidate_id?;
    Some(CandidateIdentity {
        candidate_id,
        election_year: raw.election_year.unwrap_or(0),
        display_name: raw.display_name.clone().unwrap_or_default(),
        // The ballot name is what the UI labels with; fall back to the
        // registered name when the backend left it out.
        ballot_name: raw
            .ballot_name
            .clone()
            .or_else(|| raw.display_name.clone())
            .unwrap_or_default(),
        ballot_number: raw.ballot_number.unwrap_or(0),
        party_abbreviation: raw.party_abbreviation.clone().unwrap_or_default(),
        party_number: raw.party_number,
        office_code: raw.office_code.unwrap_or(0),
        office_label: raw.office_label.clone().unwrap_or_default(),
        situation_label: raw.situation_label.clone(),
    })
}

/// Brings a percentage into [0, 100], scaling first when the source speaks
/// in fractions.
fn normalize_percentage(value: f64, scale: PercentScale) -> f64 {
    if !value.is_finite() || value <= 0.0 {
        return 0.0;
    }
    let scaled = match scale {
        PercentScale::PreMultiplied => value,
        PercentScale::Fraction => value * 100.0,
    };
    scaled.min(100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(name: Option<&str>, votes: Option<i64>, pct: Option<f64>) -> RawVoteRow {
        RawVoteRow {
            location_name: name.map(|s| s.to_string()),
            total_votes: votes,
            vote_percentage: pct,
        }
    }

    #[test]
    fn drops_rows_without_municipality() {
        let rows = normalize(&[
            raw(Some("Rio Branco"), Some(100), Some(50.0)),
            raw(None, Some(40), Some(20.0)),
            raw(Some("   "), Some(10), Some(5.0)),
        ]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].municipality_name, "Rio Branco");
    }

    #[test]
    fn defaults_missing_votes_to_zero() {
        let rows = normalize(&[raw(Some("Tarauacá"), None, None)]);
        assert_eq!(rows[0].total_votes, 0);
        assert_eq!(rows[0].vote_percentage, 0.0);
    }

    #[test]
    fn clamps_negative_votes() {
        let rows = normalize(&[raw(Some("Feijó"), Some(-3), Some(1.5))]);
        assert_eq!(rows[0].total_votes, 0);
    }

    #[test]
    fn sub_one_percent_shares_pass_through_untouched() {
        // Proportional races routinely leave candidates under 1% in a
        // municipality; the backend already pre-multiplies, so 0.42 means
        // 0.42%, not 42%.
        let rows = normalize(&[
            raw(Some("A"), Some(1), Some(0.42)),
            raw(Some("B"), Some(1), Some(1.0)),
            raw(Some("C"), Some(1), Some(42.0)),
        ]);
        assert_eq!(rows[0].vote_percentage, 0.42);
        assert_eq!(rows[1].vote_percentage, 1.0);
        assert_eq!(rows[2].vote_percentage, 42.0);
    }

    #[test]
    fn fraction_sources_are_scaled_when_declared() {
        let rows = normalize_scaled(
            &[
                raw(Some("A"), Some(1), Some(0.0042)),
                raw(Some("B"), Some(1), Some(0.42)),
            ],
            PercentScale::Fraction,
        );
        assert!((rows[0].vote_percentage - 0.42).abs() < 1e-9);
        assert!((rows[1].vote_percentage - 42.0).abs() < 1e-9);
    }

    #[test]
    fn out_of_range_percentages_are_clamped() {
        let rows = normalize(&[
            raw(Some("A"), Some(1), Some(250.0)),
            raw(Some("B"), Some(1), Some(-3.0)),
            raw(Some("C"), Some(1), Some(f64::NAN)),
        ]);
        assert_eq!(rows[0].vote_percentage, 100.0);
        assert_eq!(rows[1].vote_percentage, 0.0);
        assert_eq!(rows[2].vote_percentage, 0.0);
    }

    #[test]
    fn input_is_not_mutated() {
        let input = vec![raw(Some("Xapuri"), Some(7), Some(3.0))];
        let before = input.clone();
        let _ = normalize(&input);
        assert_eq!(
            input[0].location_name, before[0].location_name,
            "normalize must not touch its input"
        );
    }

    #[test]
    fn candidate_without_id_is_rejected() {
        let row = RawCandidateRow {
            display_name: Some("FULANO DA SILVA".to_string()),
            ..Default::default()
        };
        assert!(normalize_candidate(&row).is_none());
    }

    #[test]
    fn candidate_falls_back_to_display_name() {
        let row = RawCandidateRow {
            candidate_id: Some(10000612),
            display_name: Some("FULANO DA SILVA".to_string()),
            ballot_name: None,
            ..Default::default()
        };
        let identity = normalize_candidate(&row).unwrap();
        assert_eq!(identity.ballot_name, "FULANO DA SILVA");
    }
}
