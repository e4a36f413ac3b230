//! Metric refresh job
//!
//! Fans (paper, connector) pairs over the worker pool and appends one
//! sample per successful lookup, dated today. A provider answering
//! `None` is not a failure: the subject is simply gone upstream, and
//! the series keeps its history.

use super::{ItemError, JobError, JobHandler, RunContext, RunStats};
use crate::jobs::runner::process_items;
use async_trait::async_trait;
use chrono::Utc;
use paperpulse_common::db::models::{JobKind, MetricKind, Paper};
use paperpulse_common::metrics::{record_sample, record_source_error};
use paperpulse_common::store::Store;
use paperpulse_sources::{with_retry, SourceConnector};
use std::sync::Arc;
use std::time::Duration;

pub struct MetricRefreshHandler {
    store: Arc<dyn Store>,
    connectors: Vec<Arc<dyn SourceConnector>>,
    workers: usize,
    max_retries: u32,
    retry_base: Duration,
}

struct RefreshItem {
    paper: Paper,
    connector: Arc<dyn SourceConnector>,
    kind: MetricKind,
    locator: String,
}

impl MetricRefreshHandler {
    pub fn new(
        store: Arc<dyn Store>,
        connectors: Vec<Arc<dyn SourceConnector>>,
        workers: usize,
        max_retries: u32,
        retry_base: Duration,
    ) -> Self {
        Self {
            store,
            connectors,
            workers,
            max_retries,
            retry_base,
        }
    }

    async fn refresh_one(&self, item: RefreshItem) -> Result<(), ItemError> {
        let source = item.connector.name();
        let value = with_retry(self.max_retries, self.retry_base, || {
            item.connector.fetch_metric(&item.locator)
        })
        .await
        .map_err(|e| {
            record_source_error(source, e.reason_label());
            e
        })?;

        match value {
            Some(value) => {
                self.store
                    .append_sample(
                        item.paper.id,
                        item.kind,
                        Utc::now().date_naive(),
                        value as i64,
                    )
                    .await?;
                record_sample(source, item.kind.as_str());
            }
            None => {
                tracing::debug!(
                    source,
                    paper_id = %item.paper.id,
                    locator = item.locator,
                    "provider does not know the subject, series unchanged"
                );
            }
        }
        Ok(())
    }
}

#[async_trait]
impl JobHandler for MetricRefreshHandler {
    fn kind(&self) -> JobKind {
        JobKind::MetricRefresh
    }

    async fn execute(&self, ctx: &RunContext) -> Result<RunStats, JobError> {
        let papers = self.store.list_papers().await?;

        // One item per (paper, series) the connector can locate
        let mut items: Vec<RefreshItem> = Vec::new();
        for connector in &self.connectors {
            let Some(kind) = connector.metric_kind() else {
                continue;
            };
            for paper in &papers {
                if let Some(locator) = connector.metric_locator(paper) {
                    items.push(RefreshItem {
                        paper: paper.clone(),
                        connector: Arc::clone(connector),
                        kind,
                        locator,
                    });
                }
            }
        }

        process_items(ctx, self.workers, items, |item| self.refresh_one(item)).await
    }
}
