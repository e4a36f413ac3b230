//! Scripted connector for orchestration tests

use crate::connector::{DiscoveredPaper, FetchPage, SourceConnector};
use crate::errors::{SourceError, SourceResult};
use async_trait::async_trait;
use paperpulse_common::db::models::{MetricKind, Paper};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;

/// Connector whose pages and metric values are scripted up front.
///
/// Pages are served in push order and the feed reads as exhausted once
/// they run out. Metric lookups fall back to `Ok(None)` for locators
/// that were never scripted.
pub struct MockConnector {
    name: String,
    kind: Option<MetricKind>,
    discovers: bool,
    pages: Mutex<VecDeque<SourceResult<FetchPage>>>,
    metrics: Mutex<HashMap<String, SourceResult<Option<u64>>>>,
}

impl MockConnector {
    /// Discovery-only mock
    pub fn discovery(name: &str) -> Self {
        Self {
            name: name.to_string(),
            kind: None,
            discovers: true,
            pages: Mutex::new(VecDeque::new()),
            metrics: Mutex::new(HashMap::new()),
        }
    }

    /// Metric-only mock
    pub fn metric(name: &str, kind: MetricKind) -> Self {
        Self {
            name: name.to_string(),
            kind: Some(kind),
            discovers: false,
            pages: Mutex::new(VecDeque::new()),
            metrics: Mutex::new(HashMap::new()),
        }
    }

    pub fn push_page(self, page: FetchPage) -> Self {
        self.pages.lock().expect("mock lock").push_back(Ok(page));
        self
    }

    pub fn push_page_error(self, error: SourceError) -> Self {
        self.pages.lock().expect("mock lock").push_back(Err(error));
        self
    }

    pub fn set_metric(self, locator: &str, value: Option<u64>) -> Self {
        self.metrics
            .lock()
            .expect("mock lock")
            .insert(locator.to_string(), Ok(value));
        self
    }

    pub fn set_metric_error(self, locator: &str, error: SourceError) -> Self {
        self.metrics
            .lock()
            .expect("mock lock")
            .insert(locator.to_string(), Err(error));
        self
    }

    /// Minimal discovery record for tests
    pub fn record(source_id: &str, title: &str) -> DiscoveredPaper {
        DiscoveredPaper {
            source_id: source_id.to_string(),
            title: title.to_string(),
            authors: vec!["Test Author".to_string()],
            abstract_text: String::new(),
            published_at: None,
            repo_url: None,
            references_raw: None,
        }
    }
}

#[async_trait]
impl SourceConnector for MockConnector {
    fn name(&self) -> &str {
        &self.name
    }

    fn discovers(&self) -> bool {
        self.discovers
    }

    fn metric_kind(&self) -> Option<MetricKind> {
        self.kind
    }

    async fn fetch_page(&self, _cursor: Option<&str>) -> SourceResult<FetchPage> {
        match self.pages.lock().expect("mock lock").pop_front() {
            Some(result) => result,
            None => Ok(FetchPage::default()),
        }
    }

    fn metric_locator(&self, paper: &Paper) -> Option<String> {
        Some(paper.source_id.clone())
    }

    async fn fetch_metric(&self, locator: &str) -> SourceResult<Option<u64>> {
        self.metrics
            .lock()
            .expect("mock lock")
            .get(locator)
            .cloned()
            .unwrap_or(Ok(None))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_pages_served_in_order() {
        let connector = MockConnector::discovery("mock")
            .push_page(FetchPage {
                records: vec![MockConnector::record("a", "First")],
                skipped: vec![],
                next_cursor: Some("1".to_string()),
            })
            .push_page(FetchPage {
                records: vec![MockConnector::record("b", "Second")],
                skipped: vec![],
                next_cursor: None,
            });

        let first = connector.fetch_page(None).await.unwrap();
        assert_eq!(first.records[0].source_id, "a");
        assert_eq!(first.next_cursor.as_deref(), Some("1"));

        let second = connector.fetch_page(Some("1")).await.unwrap();
        assert_eq!(second.records[0].source_id, "b");
        assert!(second.next_cursor.is_none());

        // Exhausted script reads as an empty feed
        let empty = connector.fetch_page(None).await.unwrap();
        assert!(empty.records.is_empty());
        assert!(empty.next_cursor.is_none());
    }

    #[tokio::test]
    async fn test_scripted_metrics() {
        let connector = MockConnector::metric("mock-stars", MetricKind::Stars)
            .set_metric("known", Some(42))
            .set_metric("gone", None)
            .set_metric_error(
                "down",
                SourceError::Unavailable {
                    provider: "mock-stars".to_string(),
                    message: "offline".to_string(),
                },
            );

        assert_eq!(connector.fetch_metric("known").await.unwrap(), Some(42));
        assert_eq!(connector.fetch_metric("gone").await.unwrap(), None);
        assert!(connector.fetch_metric("down").await.is_err());
        assert_eq!(connector.fetch_metric("never-scripted").await.unwrap(), None);
    }
}
