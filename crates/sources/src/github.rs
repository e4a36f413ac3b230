//! GitHub star-count connector

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

pub const SOURCE_NAME: &str = "github";

const DEFAULT_BASE_URL: &str = "https://api.github.com";

/// Connector for the GitHub REST API
pub struct GithubConnector {
    client: reqwest::Client,
    budget: RequestBudget,
    token: Option<String>,
    base_url: String,
}

#[derive(Deserialize)]
struct RepoResponse {
    stargazers_count: u64,
}

impl GithubConnector {
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
            budget: RequestBudget::per_hour(config.github.requests_per_hour),
            token: config.github.token.clone(),
            base_url: DEFAULT_BASE_URL.to_string(),
        })
    }
}

fn retry_after(response: &reqwest::Response) -> Option<Duration> {
    response
        .headers()
        .get("retry-after")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse().ok())
        .map(Duration::from_secs)
}

#[async_trait]
impl SourceConnector for GithubConnector {
    fn name(&self) -> &str {
        SOURCE_NAME
    }

    fn metric_kind(&self) -> Option<MetricKind> {
        Some(MetricKind::Stars)
    }

    fn metric_locator(&self, paper: &Paper) -> Option<String> {
        paper.repo_full_name()
    }

    async fn fetch_metric(&self, locator: &str) -> SourceResult<Option<u64>> {
        self.budget.acquire().await;
        let timer = SourceRequestTimer::start(SOURCE_NAME);

        let url = format!("{}/repos/{}", self.base_url, locator);
        let mut request = self
            .client
            .get(&url)
            .header("accept", "application/vnd.github+json");
        if let Some(token) = &self.token {
            request = request.bearer_auth(token);
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
            // Deleted or renamed repo: the series simply stops
            StatusCode::NOT_FOUND | StatusCode::GONE => {
                timer.finish(true);
                Ok(None)
            }
            StatusCode::UNAUTHORIZED => {
                timer.finish(false);
                Err(SourceError::AuthRejected {
                    provider: SOURCE_NAME.to_string(),
                })
            }
            // Secondary rate limits surface as 403
            StatusCode::FORBIDDEN | StatusCode::TOO_MANY_REQUESTS => {
                let after = retry_after(&response);
                timer.finish(false);
                Err(SourceError::RateLimited {
                    provider: SOURCE_NAME.to_string(),
                    retry_after: after,
                })
            }
            status if !status.is_success() => {
                timer.finish(false);
                Err(SourceError::Unavailable {
                    provider: SOURCE_NAME.to_string(),
                    message: format!("HTTP {}", status),
                })
            }
            _ => match response.json::<RepoResponse>().await {
                Ok(repo) => {
                    timer.finish(true);
                    Ok(Some(repo.stargazers_count))
                }
                Err(e) => {
                    timer.finish(false);
                    Err(SourceError::Malformed {
                        provider: SOURCE_NAME.to_string(),
                        reason: format!("repo payload: {}", e),
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

    fn make_paper(repo_url: Option<&str>) -> Paper {
        Paper {
            id: Uuid::from_u128(1),
            source_id: "2401.00001".to_string(),
            title: "Test Paper".to_string(),
            authors: serde_json::json!(["Test Author"]),
            abstract_text: String::new(),
            published_at: None,
            repo_url: repo_url.map(Into::into),
            references_raw: None,
            created_at: Utc::now().into(),
            updated_at: Utc::now().into(),
        }
    }

    #[test]
    fn test_repo_payload_parses() {
        let repo: RepoResponse =
            serde_json::from_str(r#"{"stargazers_count": 1234, "forks_count": 5}"#).unwrap();
        assert_eq!(repo.stargazers_count, 1234);
    }

    #[test]
    fn test_locator_requires_github_repo() {
        let conn = GithubConnector::new(&SourcesConfig::default()).unwrap();

        let paper = make_paper(Some("https://github.com/acme/widgets"));
        assert_eq!(conn.metric_locator(&paper).as_deref(), Some("acme/widgets"));

        let elsewhere = make_paper(Some("https://gitlab.com/acme/widgets"));
        assert_eq!(conn.metric_locator(&elsewhere), None);

        let none = make_paper(None);
        assert_eq!(conn.metric_locator(&none), None);
    }
}
