//! String similarity between candidate citations and known papers
//!
//! The scoring function is a capability so the title heuristic can be
//! swapped for an embedding-based scorer without touching the matcher.

use super::parser::CandidateCitation;
use paperpulse_common::db::models::Paper;
use std::collections::HashSet;

/// Field weights; title dominates, year and authors nudge
pub const TITLE_WEIGHT: f64 = 0.8;
pub const YEAR_WEIGHT: f64 = 0.1;
pub const AUTHOR_WEIGHT: f64 = 0.1;

/// Component value when a field is absent on either side
const NEUTRAL: f64 = 50.0;

/// `score(candidate, known) -> 0..100`
pub trait SimilarityScorer: Send + Sync {
    fn score(&self, candidate: &CandidateCitation, known: &Paper) -> f64;
}

/// Dice coefficient over title tokens, weighted with year and author
/// agreement. Absent fields score neutral rather than penalizing.
#[derive(Debug, Clone, Copy, Default)]
pub struct TitleSimilarity;

impl SimilarityScorer for TitleSimilarity {
    fn score(&self, candidate: &CandidateCitation, known: &Paper) -> f64 {
        let title = 100.0 * dice(&tokenize(&candidate.title), &tokenize(&known.title));

        let year = match (candidate.year, known.year()) {
            (Some(a), Some(b)) if a == b => 100.0,
            (Some(_), Some(_)) => 0.0,
            _ => NEUTRAL,
        };

        let candidate_surnames = surnames(&candidate.authors);
        let known_surnames = surnames(&known.author_list());
        let authors = if candidate_surnames.is_empty() || known_surnames.is_empty() {
            NEUTRAL
        } else {
            100.0 * dice(&candidate_surnames, &known_surnames)
        };

        TITLE_WEIGHT * title + YEAR_WEIGHT * year + AUTHOR_WEIGHT * authors
    }
}

/// Lowercased alphanumeric token set
fn tokenize(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Last word of each author name, lowercased
fn surnames(authors: &[String]) -> HashSet<String> {
    authors
        .iter()
        .filter_map(|a| a.split_whitespace().last())
        .map(|s| s.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

fn dice(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let shared = a.intersection(b).count();
    2.0 * shared as f64 / (a.len() + b.len()) as f64
}
