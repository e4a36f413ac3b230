//! Paper discovery job
//!
//! Walks every discovering connector page by page from its saved
//! cursor, upserts well-formed records, and scores each new paper
//! against the configured topics. Pages within one source are serial
//! because the cursor chains them; a page failure ends that source for
//! this run but never the others.

use super::{JobError, JobHandler, RunContext, RunStats};
use crate::topics::TopicScorer;
use async_trait::async_trait;
use paperpulse_common::db::models::{JobKind, Paper, Topic};
use paperpulse_common::metrics::{record_discovered, record_source_error};
use paperpulse_common::store::{NewPaper, Store};
use paperpulse_sources::{with_retry, DiscoveredPaper, SourceConnector};
use std::sync::Arc;
use std::time::Duration;

pub struct DiscoveryHandler {
    store: Arc<dyn Store>,
    connectors: Vec<Arc<dyn SourceConnector>>,
    scorer: Arc<dyn TopicScorer>,
    topic_min_score: f64,
    max_pages: u32,
    max_retries: u32,
    retry_base: Duration,
}

impl DiscoveryHandler {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        store: Arc<dyn Store>,
        connectors: Vec<Arc<dyn SourceConnector>>,
        scorer: Arc<dyn TopicScorer>,
        topic_min_score: f64,
        max_pages: u32,
        max_retries: u32,
        retry_base: Duration,
    ) -> Self {
        Self {
            store,
            connectors,
            scorer,
            topic_min_score,
            max_pages,
            max_retries,
            retry_base,
        }
    }

    fn limit_reached(&self, ctx: &RunContext, stats: &RunStats) -> bool {
        ctx.params
            .limit
            .is_some_and(|limit| stats.processed as usize >= limit)
    }

    async fn score_against_topics(&self, paper: &Paper, topics: &[Topic]) -> Result<(), JobError> {
        for topic in topics {
            let score = self.scorer.score(
                &topic.keyword_list(),
                &paper.title,
                &paper.abstract_text,
            );
            if score >= self.topic_min_score {
                self.store
                    .upsert_topic_match(topic.id, paper.id, score as f32)
                    .await?;
            }
        }
        Ok(())
    }
}

fn to_new_paper(record: DiscoveredPaper) -> NewPaper {
    NewPaper {
        source_id: record.source_id,
        title: record.title,
        authors: record.authors,
        abstract_text: record.abstract_text,
        published_at: record.published_at,
        repo_url: record.repo_url,
        references_raw: record.references_raw,
    }
}

#[async_trait]
impl JobHandler for DiscoveryHandler {
    fn kind(&self) -> JobKind {
        JobKind::Discovery
    }

    async fn execute(&self, ctx: &RunContext) -> Result<RunStats, JobError> {
        let mut stats = RunStats::default();
        let topics = self.store.list_topics().await?;

        'sources: for connector in self.connectors.iter().filter(|c| c.discovers()) {
            let source = connector.name();
            let mut cursor = self.store.source_cursor(source).await?;

            for _ in 0..self.max_pages {
                if ctx.should_stop() {
                    stats.stopped_early = true;
                    break 'sources;
                }
                if self.limit_reached(ctx, &stats) {
                    break 'sources;
                }

                let page = match with_retry(self.max_retries, self.retry_base, || {
                    connector.fetch_page(cursor.as_deref())
                })
                .await
                {
                    Ok(page) => page,
                    Err(e) => {
                        // Exhausted retries; give up on this source, the
                        // saved cursor resumes it next run
                        tracing::warn!(source, error = %e, "discovery page failed, skipping source");
                        record_source_error(source, e.reason_label());
                        stats.record_failure(ctx.error_sample_cap(), e.to_string());
                        continue 'sources;
                    }
                };

                let mut discovered: u64 = 0;
                for record in page.records {
                    if ctx.should_stop() {
                        stats.stopped_early = true;
                        record_discovered(source, discovered);
                        break 'sources;
                    }
                    if self.limit_reached(ctx, &stats) {
                        record_discovered(source, discovered);
                        break 'sources;
                    }

                    let paper = self.store.upsert_paper(to_new_paper(record)).await?;
                    stats.processed += 1;
                    discovered += 1;
                    self.score_against_topics(&paper, &topics).await?;
                }
                record_discovered(source, discovered);

                for reason in page.skipped {
                    stats.record_failure(ctx.error_sample_cap(), reason);
                }

                match page.next_cursor {
                    Some(next) => {
                        self.store.save_source_cursor(source, &next).await?;
                        cursor = Some(next);
                    }
                    None => break,
                }
            }
        }

        Ok(stats)
    }
}
