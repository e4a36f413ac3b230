//! arXiv discovery connector
//!
//! Polls the export API's Atom feed for recent submissions in the
//! configured categories, newest first. Cursors are numeric offsets
//! into that listing.

use crate::budget::RequestBudget;
use crate::connector::{DiscoveredPaper, FetchPage, SourceConnector};
use crate::errors::{SourceError, SourceResult};
use async_trait::async_trait;
use feed_rs::model::Entry;
use paperpulse_common::config::SourcesConfig;
use paperpulse_common::errors::AppError;
use paperpulse_common::metrics::SourceRequestTimer;
use paperpulse_common::Result;
use regex_lite::Regex;
use reqwest::StatusCode;
use std::time::Duration;

pub const SOURCE_NAME: &str = "arxiv";

const DEFAULT_BASE_URL: &str = "http://export.arxiv.org/api/query";

/// Connector for the arXiv export API
pub struct ArxivConnector {
    client: reqwest::Client,
    budget: RequestBudget,
    categories: Vec<String>,
    page_size: u32,
    base_url: String,
    repo_link: Regex,
}

impl ArxivConnector {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        let repo_link = Regex::new(r"https://github\.com/[A-Za-z0-9_.-]+/[A-Za-z0-9_.-]+")
            .map_err(|e| AppError::Internal {
                message: format!("invalid repo link pattern: {}", e),
            })?;

        Ok(Self {
            client,
            budget: RequestBudget::per_minute(config.arxiv.requests_per_minute),
            categories: config.arxiv.categories.clone(),
            page_size: config.arxiv.page_size,
            base_url: DEFAULT_BASE_URL.to_string(),
            repo_link,
        })
    }

    fn search_query(&self) -> String {
        self.categories
            .iter()
            .map(|c| format!("cat:{}", c))
            .collect::<Vec<_>>()
            .join(" OR ")
    }

    /// Map one Atom entry to a discovery record. The error is a human
    /// readable skip reason, not a run failure.
    fn entry_to_paper(&self, entry: Entry) -> std::result::Result<DiscoveredPaper, String> {
        let source_id = normalize_arxiv_id(&entry.id)
            .ok_or_else(|| format!("unrecognized entry id {:?}", entry.id))?;

        let title = entry
            .title
            .as_ref()
            .map(|t| collapse_whitespace(&t.content))
            .filter(|t| !t.is_empty())
            .ok_or_else(|| format!("{}: missing title", source_id))?;

        let abstract_text = entry
            .summary
            .as_ref()
            .map(|s| collapse_whitespace(&s.content))
            .unwrap_or_default();

        let authors: Vec<String> = entry.authors.iter().map(|a| a.name.clone()).collect();

        let published_at = entry.published.map(|dt| dt.fixed_offset());

        // Many ML papers put their code link in the abstract
        let repo_url = self
            .repo_link
            .find(&abstract_text)
            .map(|m| m.as_str().trim_end_matches('.').to_string());

        Ok(DiscoveredPaper {
            source_id,
            title,
            authors,
            abstract_text,
            published_at,
            repo_url,
            references_raw: None,
        })
    }
}

#[async_trait]
impl SourceConnector for ArxivConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn discovers(&self) -> bool {
        true
    }

    async fn fetch_page(&self, cursor: Option<&str>) -> SourceResult<FetchPage> {
        let offset: u32 = match cursor {
            Some(raw) => raw.parse().map_err(|_| SourceError::Malformed {
                provider: SOURCE_NAME.to_string(),
                reason: format!("cursor {:?} is not an offset", raw),
            })?,
            None => 0,
        };

        self.budget.acquire().await;
        let timer = SourceRequestTimer::start(SOURCE_NAME);

        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("search_query", self.search_query().as_str()),
                ("sortBy", "submittedDate"),
                ("sortOrder", "descending"),
                ("start", &offset.to_string()),
                ("max_results", &self.page_size.to_string()),
            ])
            .send()
            .await;

        let response = match response {
            Ok(r) => r,
            Err(e) => {
                timer.finish(false);
                return Err(SourceError::Unavailable {
                    provider: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                });
            }
        };

        let status = response.status();
        if status == StatusCode::TOO_MANY_REQUESTS {
            timer.finish(false);
            return Err(SourceError::RateLimited {
                provider: SOURCE_NAME.to_string(),
                retry_after: None,
            });
        }
        if !status.is_success() {
            timer.finish(false);
            return Err(SourceError::Unavailable {
                provider: SOURCE_NAME.to_string(),
                message: format!("HTTP {}", status),
            });
        }

        let bytes = match response.bytes().await {
            Ok(b) => b,
            Err(e) => {
                timer.finish(false);
                return Err(SourceError::Unavailable {
                    provider: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                });
            }
        };
        timer.finish(true);

        let feed = feed_rs::parser::parse(&bytes[..]).map_err(|e| SourceError::Malformed {
            provider: SOURCE_NAME.to_string(),
            reason: format!("atom parse failed: {}", e),
        })?;

        let fetched = feed.entries.len();
        let mut records = Vec::with_capacity(fetched);
        let mut skipped = Vec::new();
        for entry in feed.entries {
            match self.entry_to_paper(entry) {
                Ok(paper) => records.push(paper),
                Err(reason) => {
                    tracing::debug!(source = SOURCE_NAME, reason = %reason, "skipping entry");
                    skipped.push(reason);
                }
            }
        }

        // A short page means the listing is exhausted
        let next_cursor =
            (fetched as u32 >= self.page_size).then(|| (offset + self.page_size).to_string());

        Ok(FetchPage {
            records,
            skipped,
            next_cursor,
        })
    }
}

/// Reduce an Atom entry id like `http://arxiv.org/abs/2401.12345v2`
/// to the bare arXiv identifier.
fn normalize_arxiv_id(raw: &str) -> Option<String> {
    let tail = raw.split("/abs/").nth(1).unwrap_or(raw);
    if tail.is_empty() {
        return None;
    }

    let id = match tail.rfind('v') {
        Some(pos)
            if pos > 0
                && !tail[pos + 1..].is_empty()
                && tail[pos + 1..].chars().all(|c| c.is_ascii_digit()) =>
        {
            &tail[..pos]
        }
        _ => tail,
    };

    (!id.is_empty()).then(|| id.to_string())
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title>ArXiv Query Results</title>
  <id>http://arxiv.org/api/sample</id>
  <updated>2026-08-20T00:00:00Z</updated>
  <entry>
    <id>http://arxiv.org/abs/2608.01234v1</id>
    <title>Sparse  Attention
 at Scale</title>
    <summary>We study sparse attention. Code at https://github.com/acme/sparse-attn.</summary>
    <published>2026-08-18T17:00:00Z</published>
    <author><name>Ada Lovelace</name></author>
    <author><name>Kurt Godel</name></author>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2608.09999v2</id>
    <summary>This entry carries no title.</summary>
  </entry>
</feed>"#;

    fn connector() -> ArxivConnector {
        ArxivConnector::new(&SourcesConfig::default()).unwrap()
    }

    #[test]
    fn test_entry_mapping() {
        let feed = feed_rs::parser::parse(SAMPLE_FEED.as_bytes()).unwrap();
        let conn = connector();
        let mut entries = feed.entries.into_iter();

        let paper = conn.entry_to_paper(entries.next().unwrap()).unwrap();
        assert_eq!(paper.source_id, "2608.01234");
        assert_eq!(paper.title, "Sparse Attention at Scale");
        assert_eq!(paper.authors, vec!["Ada Lovelace", "Kurt Godel"]);
        assert_eq!(
            paper.repo_url.as_deref(),
            Some("https://github.com/acme/sparse-attn")
        );
        assert!(paper.published_at.is_some());

        let reason = conn.entry_to_paper(entries.next().unwrap()).unwrap_err();
        assert!(reason.contains("2608.09999"));
    }

    #[test]
    fn test_normalize_arxiv_id() {
        assert_eq!(
            normalize_arxiv_id("http://arxiv.org/abs/2401.12345v2").as_deref(),
            Some("2401.12345")
        );
        assert_eq!(
            normalize_arxiv_id("https://arxiv.org/abs/cond-mat/0001001v1").as_deref(),
            Some("cond-mat/0001001")
        );
        assert_eq!(normalize_arxiv_id("2401.12345").as_deref(), Some("2401.12345"));
        assert!(normalize_arxiv_id("").is_none());
    }

    #[test]
    fn test_search_query_joins_categories() {
        let conn = connector();
        assert_eq!(conn.search_query(), "cat:cs.LG OR cat:cs.CL OR cat:cs.CV");
    }

    #[tokio::test]
    async fn test_rejects_garbage_cursor() {
        let conn = connector();
        let err = conn.fetch_page(Some("not-a-number")).await.unwrap_err();
        assert!(!err.is_retryable());
    }
}
