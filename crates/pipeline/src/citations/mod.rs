//! Citation matcher
//!
//! Resolves a paper's raw reference list against the known-paper set.
//! Parsing and similarity live behind capability traits; this module
//! only orchestrates: parse candidates, score against every other
//! paper, accept the best match at or above the threshold, and emit
//! one edge per cited paper.

mod parser;
mod similarity;

pub use parser::{CandidateCitation, HeuristicParser, ReferenceParser};
pub use similarity::{SimilarityScorer, TitleSimilarity};

use paperpulse_common::db::models::Paper;
use paperpulse_common::store::NewEdge;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Resolution method recorded on edges produced by this matcher
pub const METHOD_TITLE_SIMILARITY: &str = "title-similarity";

pub struct CitationMatcher {
    parser: Arc<dyn ReferenceParser>,
    scorer: Arc<dyn SimilarityScorer>,
    accept_threshold: f64,
}

struct Match<'a> {
    paper: &'a Paper,
    score: f64,
    year_agrees: bool,
}

impl CitationMatcher {
    pub fn new(
        parser: Arc<dyn ReferenceParser>,
        scorer: Arc<dyn SimilarityScorer>,
        accept_threshold: f64,
    ) -> Self {
        Self {
            parser,
            scorer,
            accept_threshold,
        }
    }

    /// Default parser and scorer with the configured threshold
    pub fn with_defaults(accept_threshold: f64) -> Self {
        Self::new(
            Arc::new(HeuristicParser::new()),
            Arc::new(TitleSimilarity),
            accept_threshold,
        )
    }

    /// Resolve the citing paper's reference list to edges.
    ///
    /// A full recomputation: the result replaces the paper's previous
    /// outgoing edges wholesale. Sub-threshold candidates yield nothing.
    pub fn resolve(&self, citing: &Paper, known: &[Paper]) -> Vec<NewEdge> {
        let Some(raw) = citing.references_raw.as_deref() else {
            return Vec::new();
        };

        let candidates = self.parser.parse(raw);
        tracing::debug!(
            paper_id = %citing.id,
            candidates = candidates.len(),
            "resolving reference list"
        );

        // One edge per cited paper; a second candidate hitting the same
        // paper keeps the higher confidence
        let mut edges: HashMap<Uuid, NewEdge> = HashMap::new();

        for candidate in &candidates {
            let Some(best) = self.best_match(candidate, citing.id, known) else {
                continue;
            };
            if best.score < self.accept_threshold {
                continue;
            }

            let confidence = best.score.round().clamp(0.0, 100.0) as i16;
            edges
                .entry(best.paper.id)
                .and_modify(|e| e.confidence = e.confidence.max(confidence))
                .or_insert_with(|| NewEdge {
                    cited_paper_id: best.paper.id,
                    confidence,
                    method: METHOD_TITLE_SIMILARITY.to_string(),
                });
        }

        let mut edges: Vec<NewEdge> = edges.into_values().collect();
        edges.sort_by_key(|e| e.cited_paper_id);
        edges
    }

    /// Best match across the known set, with a deterministic tie-break:
    /// higher score, then matching publication year, then earliest
    /// paper creation time, then smallest id.
    fn best_match<'a>(
        &self,
        candidate: &CandidateCitation,
        citing_id: Uuid,
        known: &'a [Paper],
    ) -> Option<Match<'a>> {
        known
            .iter()
            .filter(|p| p.id != citing_id)
            .map(|paper| Match {
                paper,
                score: self.scorer.score(candidate, paper),
                year_agrees: matches!(
                    (candidate.year, paper.year()),
                    (Some(a), Some(b)) if a == b
                ),
            })
            .max_by(|a, b| {
                a.score
                    .partial_cmp(&b.score)
                    .unwrap_or(Ordering::Equal)
                    .then(a.year_agrees.cmp(&b.year_agrees))
                    // max_by keeps the later element on Equal, so invert
                    // to prefer the earlier-created, smaller-id paper
                    .then(b.paper.created_at.cmp(&a.paper.created_at))
                    .then(b.paper.id.cmp(&a.paper.id))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};

    fn paper_at(title: &str, year: i32, created_offset_secs: i64) -> Paper {
        let created = Utc::now() + Duration::seconds(created_offset_secs);
        Paper {
            id: Uuid::new_v4(),
            source_id: format!("{}-{}", title.len(), created_offset_secs),
            title: title.to_string(),
            authors: serde_json::json!([]),
            abstract_text: String::new(),
            published_at: Some(
                Utc.with_ymd_and_hms(year, 6, 1, 0, 0, 0).unwrap().into(),
            ),
            repo_url: None,
            references_raw: None,
            created_at: created.into(),
            updated_at: created.into(),
        }
    }

    fn citing_with_refs(refs: &str) -> Paper {
        let mut paper = paper_at("The Citing Paper Title", 2026, 0);
        paper.references_raw = Some(refs.to_string());
        paper
    }

    #[test]
    fn test_exact_title_and_year_resolves() {
        let cited = paper_at("Attention Is All You Need", 2017, -100);
        let citing = citing_with_refs("[1] Attention Is All You Need. 2017.");
        let matcher = CitationMatcher::with_defaults(85.0);

        let edges = matcher.resolve(&citing, &[citing.clone(), cited.clone()]);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].cited_paper_id, cited.id);
        assert!(edges[0].confidence >= 85);
        assert_eq!(edges[0].method, METHOD_TITLE_SIMILARITY);
    }

    #[test]
    fn test_sub_threshold_candidate_produces_no_edge() {
        let cited = paper_at("Attention Is All You Need", 2017, -100);
        let citing = citing_with_refs("[1] A Totally Different Subject Entirely. 2017.");
        let matcher = CitationMatcher::with_defaults(85.0);

        assert!(matcher.resolve(&citing, &[citing.clone(), cited]).is_empty());
    }

    #[test]
    fn test_tie_broken_by_year_then_creation_time() {
        // Two known papers with the same title, different years
        let right_year = paper_at("Deep Residual Learning", 2016, -50);
        let wrong_year = paper_at("Deep Residual Learning", 2019, -500);
        let citing = citing_with_refs("[1] Deep Residual Learning. 2016.");
        let matcher = CitationMatcher::with_defaults(85.0);

        let known = vec![citing.clone(), wrong_year.clone(), right_year.clone()];
        let edges = matcher.resolve(&citing, &known);
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].cited_paper_id, right_year.id);

        // Same title and year: the older row wins, independent of order
        let older = paper_at("Deep Residual Learning", 2016, -900);
        let known_a = vec![citing.clone(), right_year.clone(), older.clone()];
        let known_b = vec![citing.clone(), older.clone(), right_year.clone()];
        assert_eq!(
            matcher.resolve(&citing, &known_a)[0].cited_paper_id,
            older.id
        );
        assert_eq!(
            matcher.resolve(&citing, &known_b)[0].cited_paper_id,
            older.id
        );
    }

    #[test]
    fn test_never_cites_itself() {
        let citing = citing_with_refs("[1] The Citing Paper Title. 2026.");
        let matcher = CitationMatcher::with_defaults(85.0);
        assert!(matcher.resolve(&citing, &[citing.clone()]).is_empty());
    }

    #[test]
    fn test_no_references_no_edges() {
        let paper = paper_at("No References Here", 2026, 0);
        let matcher = CitationMatcher::with_defaults(85.0);
        assert!(matcher.resolve(&paper, &[paper.clone()]).is_empty());
    }

    #[test]
    fn test_duplicate_candidates_collapse_to_one_edge() {
        let cited = paper_at("Attention Is All You Need", 2017, -100);
        let citing = citing_with_refs(
            "[1] Attention Is All You Need. 2017.\n[2] Attention Is All You Need. 2017.",
        );
        let matcher = CitationMatcher::with_defaults(85.0);

        let edges = matcher.resolve(&citing, &[citing.clone(), cited]);
        assert_eq!(edges.len(), 1);
    }
}
