//! Reference-list parsing
//!
//! Turning raw reference text into structured candidates is an external
//! collaborator's job; the matcher only depends on the trait. The
//! heuristic implementation shipped here segments on entry markers and
//! pulls out a title, a year, and whatever author names it can see.
//! Candidates are never guaranteed complete.

use regex_lite::Regex;

/// One parsed entry from a reference list
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateCitation {
    pub title: String,
    pub authors: Vec<String>,
    pub year: Option<i32>,
}

/// Raw reference text in, candidate citations out
pub trait ReferenceParser: Send + Sync {
    fn parse(&self, references_raw: &str) -> Vec<CandidateCitation>;
}

/// Line- and marker-based segmentation with regex field extraction
pub struct HeuristicParser {
    entry_marker: Regex,
    bracket_marker: Regex,
    year: Regex,
    author_name: Regex,
}

impl HeuristicParser {
    pub fn new() -> Self {
        Self {
            // "[12]" or "12." at the start of an entry
            entry_marker: Regex::new(r"^\s*(\[\d+\]|\d+\.)\s*").expect("entry marker pattern"),
            bracket_marker: Regex::new(r"\[\d+\]").expect("bracket marker pattern"),
            year: Regex::new(r"\b(19|20)\d{2}\b").expect("year pattern"),
            // "A. Author" or "A. B. Author" style name with initials
            author_name: Regex::new(r"[A-Z]\.(?:\s*[A-Z]\.)*\s*[A-Z][a-z]+")
                .expect("author name pattern"),
        }
    }

    /// Split the raw text into one string per reference entry.
    ///
    /// Newline-separated lists split on lines; a single run-on line
    /// splits on the "[n]" markers instead.
    fn segment(&self, raw: &str) -> Vec<String> {
        let lines: Vec<&str> = raw.lines().filter(|l| !l.trim().is_empty()).collect();
        if lines.len() > 1 {
            return lines.iter().map(|l| l.trim().to_string()).collect();
        }

        let text = raw.trim();
        let starts: Vec<usize> = self
            .bracket_marker
            .find_iter(text)
            .map(|m| m.start())
            .collect();

        if starts.len() < 2 {
            return if text.is_empty() {
                vec![]
            } else {
                vec![text.to_string()]
            };
        }

        let mut entries = Vec::with_capacity(starts.len());
        for (i, &start) in starts.iter().enumerate() {
            let end = starts.get(i + 1).copied().unwrap_or(text.len());
            entries.push(text[start..end].trim().to_string());
        }
        entries
    }

    fn parse_entry(&self, entry: &str) -> Option<CandidateCitation> {
        let body = self.entry_marker.replace(entry, "");
        let body = body.trim();
        if body.is_empty() {
            return None;
        }

        let year = self.year.find(body).and_then(|m| m.as_str().parse().ok());

        let authors: Vec<String> = self
            .author_name
            .find_iter(body)
            .map(|m| m.as_str().trim().to_string())
            .collect();

        // Quoted titles are unambiguous; otherwise take the longest
        // period-delimited segment, which is where titles tend to live
        let title = quoted_segment(body)
            .or_else(|| {
                body.split('.')
                    .map(str::trim)
                    .filter(|s| s.split_whitespace().count() >= 3)
                    .max_by_key(|s| s.len())
                    .map(str::to_string)
            })
            .unwrap_or_else(|| body.to_string());

        let title = title.trim().trim_end_matches(',').to_string();
        if title.split_whitespace().count() < 2 {
            return None;
        }

        Some(CandidateCitation {
            title,
            authors,
            year,
        })
    }
}

impl Default for HeuristicParser {
    fn default() -> Self {
        Self::new()
    }
}

impl ReferenceParser for HeuristicParser {
    fn parse(&self, references_raw: &str) -> Vec<CandidateCitation> {
        self.segment(references_raw)
            .iter()
            .filter_map(|entry| self.parse_entry(entry))
            .collect()
    }
}

fn quoted_segment(body: &str) -> Option<String> {
    let start = body.find('"')?;
    let end = body[start + 1..].find('"')? + start + 1;
    let inner = body[start + 1..end].trim();
    if inner.is_empty() {
        None
    } else {
        Some(inner.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parses_numbered_lines() {
        let raw = "\
[1] A. Vaswani et al. \"Attention Is All You Need\". NeurIPS, 2017.
[2] J. Devlin, M. Chang. BERT: Pre-training of Deep Bidirectional Transformers. 2019.";

        let parser = HeuristicParser::new();
        let candidates = parser.parse(raw);
        assert_eq!(candidates.len(), 2);

        assert_eq!(candidates[0].title, "Attention Is All You Need");
        assert_eq!(candidates[0].year, Some(2017));
        assert!(candidates[0].authors.iter().any(|a| a.contains("Vaswani")));

        assert_eq!(
            candidates[1].title,
            "BERT: Pre-training of Deep Bidirectional Transformers"
        );
        assert_eq!(candidates[1].year, Some(2019));
    }

    #[test]
    fn test_splits_run_on_line_by_markers() {
        let raw = "[1] First Reference Title Here, 2020. [2] Second Reference Title Here, 2021.";
        let candidates = HeuristicParser::new().parse(raw);
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].year, Some(2020));
        assert_eq!(candidates[1].year, Some(2021));
    }

    #[test]
    fn test_incomplete_entries_survive_with_missing_fields() {
        let raw = "Deep Residual Learning for Image Recognition";
        let candidates = HeuristicParser::new().parse(raw);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].year, None);
        assert!(candidates[0].authors.is_empty());
    }

    #[test]
    fn test_junk_entries_are_dropped() {
        let raw = "\
[1]
[2] ok
[3] A Real Paper Title With Words. 2022.";
        let candidates = HeuristicParser::new().parse(raw);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].year, Some(2022));
    }

    #[test]
    fn test_empty_input() {
        assert!(HeuristicParser::new().parse("").is_empty());
        assert!(HeuristicParser::new().parse("\n  \n").is_empty());
    }
}
