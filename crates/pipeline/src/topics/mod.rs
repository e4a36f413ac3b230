//! Topic relevance scoring
//!
//! Maps a topic's keyword set against a paper's title and abstract on
//! a 0-10 scale. The trait is the contract; a semantic matcher can sit
//! behind it without the pipeline noticing.

/// Relevance at or above this value counts as a match
pub const TOPIC_MATCH_THRESHOLD: f64 = 6.0;

/// Keyword credit when the hit is in the title
const TITLE_CREDIT: f64 = 1.0;
/// Keyword credit when the hit is only in the abstract
const ABSTRACT_CREDIT: f64 = 0.6;

/// `score(keywords, title, abstract) -> 0..10`
pub trait TopicScorer: Send + Sync {
    fn score(&self, keywords: &[String], title: &str, abstract_text: &str) -> f64;
}

/// Case-insensitive substring matching with naive plural stemming.
/// Title hits weigh more than abstract-only hits.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordScorer;

impl TopicScorer for KeywordScorer {
    fn score(&self, keywords: &[String], title: &str, abstract_text: &str) -> f64 {
        if keywords.is_empty() {
            return 0.0;
        }

        let title = title.to_lowercase();
        let abstract_text = abstract_text.to_lowercase();

        let credit: f64 = keywords
            .iter()
            .map(|keyword| {
                let stem = stem(&keyword.to_lowercase());
                if stem.is_empty() {
                    0.0
                } else if title.contains(&stem) {
                    TITLE_CREDIT
                } else if abstract_text.contains(&stem) {
                    ABSTRACT_CREDIT
                } else {
                    0.0
                }
            })
            .sum();

        10.0 * credit / keywords.len() as f64
    }
}

/// Trim a trailing plural "s" so "transformers" hits "transformer"
/// and vice versa. Keeps short words intact.
fn stem(keyword: &str) -> String {
    let trimmed = keyword.trim();
    if trimmed.len() > 4 && trimmed.ends_with('s') && !trimmed.ends_with("ss") {
        trimmed[..trimmed.len() - 1].to_string()
    } else {
        trimmed.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn keywords(words: &[&str]) -> Vec<String> {
        words.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_all_keywords_in_title_scores_ten() {
        let score = KeywordScorer.score(
            &keywords(&["diffusion", "image"]),
            "Scaling Diffusion Models for Image Synthesis",
            "",
        );
        assert_eq!(score, 10.0);
    }

    #[test]
    fn test_abstract_only_hits_reach_threshold() {
        let score = KeywordScorer.score(
            &keywords(&["transformer", "attention"]),
            "A Study of Sequence Models",
            "We revisit transformer attention mechanisms.",
        );
        assert_eq!(score, 6.0);
        assert!(score >= TOPIC_MATCH_THRESHOLD);
    }

    #[test]
    fn test_no_hits_scores_zero() {
        let score = KeywordScorer.score(
            &keywords(&["robotics", "manipulation"]),
            "A Survey of Language Models",
            "Text generation benchmarks.",
        );
        assert_eq!(score, 0.0);
    }

    #[test]
    fn test_case_insensitive_and_stemmed() {
        let score = KeywordScorer.score(
            &keywords(&["Transformers"]),
            "A Transformer Architecture",
            "",
        );
        assert_eq!(score, 10.0);
    }

    #[test]
    fn test_partial_overlap_scales() {
        let score = KeywordScorer.score(
            &keywords(&["diffusion", "robotics"]),
            "Diffusion Policies",
            "",
        );
        assert_eq!(score, 5.0);
    }

    #[test]
    fn test_empty_keywords() {
        assert_eq!(KeywordScorer.score(&[], "Any Title", "Any abstract"), 0.0);
    }
}
