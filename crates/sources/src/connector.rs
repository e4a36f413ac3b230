//! Source connector abstraction
//!
//! A connector either discovers new papers page by page, refreshes one
//! metric series, or both. Discovery and refresh jobs stay generic over
//! this trait; the scripted mock drives their tests.

use crate::arxiv::ArxivConnector;
use crate::errors::SourceResult;
use crate::github::GithubConnector;
use crate::semantic_scholar::SemanticScholarConnector;
use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use paperpulse_common::config::SourcesConfig;
use paperpulse_common::db::models::{MetricKind, Paper};
use paperpulse_common::Result;
use std::sync::Arc;

/// One paper as reported by an upstream source
#[derive(Debug, Clone)]
pub struct DiscoveredPaper {
    pub source_id: String,
    pub title: String,
    pub authors: Vec<String>,
    pub abstract_text: String,
    pub published_at: Option<DateTime<FixedOffset>>,
    pub repo_url: Option<String>,
    pub references_raw: Option<String>,
}

/// One page of discovery results
#[derive(Debug, Clone, Default)]
pub struct FetchPage {
    /// Well-formed records in feed order
    pub records: Vec<DiscoveredPaper>,

    /// Reasons for entries dropped as malformed
    pub skipped: Vec<String>,

    /// Cursor for the next page; None when the listing is exhausted
    pub next_cursor: Option<String>,
}

/// Trait for upstream sources
#[async_trait]
pub trait SourceConnector: Send + Sync {
    /// Stable name used in logs, metrics, and cursor rows
    fn name(&self) -> &str;

    /// Whether `fetch_page` yields new papers
    fn discovers(&self) -> bool {
        false
    }

    /// Metric series this connector refreshes, if any
    fn metric_kind(&self) -> Option<MetricKind> {
        None
    }

    /// Fetch one page of new papers starting at the given cursor
    async fn fetch_page(&self, _cursor: Option<&str>) -> SourceResult<FetchPage> {
        Ok(FetchPage::default())
    }

    /// Provider-side identifier for a paper's metric, if it has one
    fn metric_locator(&self, _paper: &Paper) -> Option<String> {
        None
    }

    /// Fetch the current metric value. `None` means the provider does
    /// not know the subject (deleted repo, unindexed paper).
    async fn fetch_metric(&self, _locator: &str) -> SourceResult<Option<u64>> {
        Ok(None)
    }
}

/// Build the connector set enabled by configuration
pub fn create_connectors(config: &SourcesConfig) -> Result<Vec<Arc<dyn SourceConnector>>> {
    let mut connectors: Vec<Arc<dyn SourceConnector>> = Vec::new();

    if config.arxiv.enabled {
        connectors.push(Arc::new(ArxivConnector::new(config)?));
    } else {
        tracing::info!(source = "arxiv", "source disabled by configuration");
    }

    if config.github.enabled {
        connectors.push(Arc::new(GithubConnector::new(config)?));
    } else {
        tracing::info!(source = "github", "source disabled by configuration");
    }

    if config.semantic_scholar.enabled {
        connectors.push(Arc::new(SemanticScholarConnector::new(config)?));
    } else {
        tracing::info!(source = "semantic-scholar", "source disabled by configuration");
    }

    if connectors.is_empty() {
        tracing::warn!("no sources enabled, discovery and refresh will be no-ops");
    }

    Ok(connectors)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_honors_enabled_flags() {
        let mut config = SourcesConfig::default();
        config.github.enabled = false;

        let connectors = create_connectors(&config).unwrap();
        let names: Vec<&str> = connectors.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["arxiv", "semantic-scholar"]);
    }

    #[test]
    fn test_factory_with_everything_disabled() {
        let mut config = SourcesConfig::default();
        config.arxiv.enabled = false;
        config.github.enabled = false;
        config.semantic_scholar.enabled = false;

        let connectors = create_connectors(&config).unwrap();
        assert!(connectors.is_empty());
    }

    #[test]
    fn test_default_set_covers_both_metrics() {
        let connectors = create_connectors(&SourcesConfig::default()).unwrap();

        let kinds: Vec<MetricKind> = connectors.iter().filter_map(|c| c.metric_kind()).collect();
        assert!(kinds.contains(&MetricKind::Stars));
        assert!(kinds.contains(&MetricKind::Citations));

        let discoverers = connectors.iter().filter(|c| c.discovers()).count();
        assert_eq!(discoverers, 1);
    }
}
