//! Semantic Scholar citation-count connector
//!
//! Looks papers up by arXiv id through the Graph API.

use crate::budget::RequestBudget;
use crate::connector::SourceConnector;
use crate::errors::{SourceError, SourceResult};
use async_trait::async_trait;
use paperpulse_common::config::SourcesConfig;
use paperpulse_common::db::models::{MetricKind, Paper};
use paperpulse_common::errors::AppError;
use paperpulse_common::metrics::SourceRequestTimer;
use paperpulse_common::Result;
use reqwest::StatusCode;
use serde::Deserialize;
use std::time::Duration;

pub const SOURCE_NAME: &str = "semantic-scholar";

const DEFAULT_BASE_URL: &str = "https://api.semanticscholar.org/graph/v1";

/// Connector for the Semantic Scholar Graph API
pub struct SemanticScholarConnector {
    client: reqwest::Client,
    budget: RequestBudget,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct PaperResponse {
    #[serde(rename = "citationCount", default)]
    citation_count: u64,
}

impl SemanticScholarConnector {
    pub fn new(config: &SourcesConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("failed to build HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            budget: RequestBudget::per_minute(config.semantic_scholar.requests_per_minute),
            api_key: config.semantic_scholar.api_key.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

#[async_trait]
impl SourceConnector for SemanticScholarConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn metric_kind(&self) -> Option<MetricKind> {
        Some(MetricKind::Citations)
    }

    fn metric_locator(&self, paper: &Paper) -> Option<String> {
        Some(format!("arXiv:{}", paper.source_id))
    }

    async fn fetch_metric(&self, locator: &str) -> SourceResult<Option<u64>> {
        self.budget.acquire().await;
        let timer = SourceRequestTimer::start(SOURCE_NAME);

        let url = format!("{}/paper/{}", self.base_url, locator);
        let mut request = self
            .client
            .get(&url)
            .query(&[("fields", "citationCount")]);
        if let Some(key) = &self.api_key {
            request = request.header("x-api-key", key);
        }

        let response = match request.send().await {
            Ok(r) => r,
            Err(e) => {
                timer.finish(false);
                return Err(SourceError::Unavailable {
                    provider: SOURCE_NAME.to_string(),
                    message: e.to_string(),
                });
            }
        };

        match response.status() {
            // Paper not indexed (yet)
            StatusCode::NOT_FOUND => {
                timer.finish(true);
                Ok(None)
            }
            StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
                timer.finish(false);
                Err(SourceError::AuthRejected {
                    provider: SOURCE_NAME.to_string(),
                })
            }
            StatusCode::TOO_MANY_REQUESTS => {
                timer.finish(false);
                Err(SourceError::RateLimited {
                    provider: SOURCE_NAME.to_string(),
                    retry_after: None,
                })
            }
            status if !status.is_success() => {
                timer.finish(false);
                Err(SourceError::Unavailable {
                    provider: SOURCE_NAME.to_string(),
                    message: format!("HTTP {}", status),
                })
            }
            _ => match response.json::<PaperResponse>().await {
                Ok(paper) => {
                    timer.finish(true);
                    Ok(Some(paper.citation_count))
                }
                Err(e) => {
                    timer.finish(false);
                    Err(SourceError::Malformed {
                        provider: SOURCE_NAME.to_string(),
                        reason: format!("paper payload: {}", e),
                    })
                }
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use uuid::Uuid;

    #[test]
    fn test_paper_payload_parses() {
        let paper: PaperResponse =
            serde_json::from_str(r#"{"paperId": "abc", "citationCount": 87}"#).unwrap();
        assert_eq!(paper.citation_count, 87);

        // Missing count is treated as zero, not a parse failure
        let bare: PaperResponse = serde_json::from_str(r#"{"paperId": "abc"}"#).unwrap();
        assert_eq!(bare.citation_count, 0);
    }

    #[test]
    fn test_locator_uses_arxiv_prefix() {
        let conn = SemanticScholarConnector::new(&SourcesConfig::default()).unwrap();
        let paper = Paper {
            id: Uuid::from_u128(1),
            source_id: "1706.03762".to_string(),
            title: "Test Paper".to_string(),
            authors: serde_json::json!(["Test Author"]),
            abstract_text: String::new(),
            published_at: None,
            repo_url: None,
            references_raw: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        };

        assert_eq!(
            conn.metric_locator(&paper).as_deref(),
            Some("arXiv:1706.03762")
        );
    }
}
