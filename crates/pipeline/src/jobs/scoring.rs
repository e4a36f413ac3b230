//! Scoring job
//!
//! Recomputes the hype score for every paper from its stored metric
//! history. The comparison set for the absolute-popularity term is the
//! configured topic's papers when one is set, otherwise the whole
//! corpus; a missing topic falls back to the corpus with a warning
//! rather than failing the run.

use super::{ItemError, JobError, JobHandler, RunContext, RunStats};
use crate::jobs::runner::process_items;
use crate::scoring::{compute, ScoreInput};
use async_trait::async_trait;
use chrono::{NaiveDate, Utc};
use paperpulse_common::db::models::{JobKind, MetricKind, Paper};
use paperpulse_common::metrics::record_score;
use paperpulse_common::store::{NewScore, Store};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

pub struct ScoringHandler {
    store: Arc<dyn Store>,
    comparison_topic: Option<String>,
    workers: usize,
}

impl ScoringHandler {
    pub fn new(store: Arc<dyn Store>, comparison_topic: Option<String>, workers: usize) -> Self {
        Self {
            store,
            comparison_topic,
            workers,
        }
    }

    /// Ids of the papers the absolute term normalizes against
    async fn comparison_set(&self, papers: &[Paper]) -> Result<HashSet<Uuid>, JobError> {
        if let Some(slug) = self.comparison_topic.as_deref() {
            match self.store.topic_by_slug(slug).await? {
                Some(topic) => {
                    let ids = self.store.papers_for_topic(topic.id).await?;
                    return Ok(ids.into_iter().collect());
                }
                None => {
                    tracing::warn!(slug, "comparison topic not found, using all papers");
                }
            }
        }
        Ok(papers.iter().map(|p| p.id).collect())
    }

    async fn max_stars(&self, ids: &HashSet<Uuid>) -> Result<i64, JobError> {
        let mut max = 0;
        for &id in ids {
            if let Some(point) = self.store.latest_sample(id, MetricKind::Stars).await? {
                max = max.max(point.value);
            }
        }
        Ok(max)
    }

    async fn score_one(
        &self,
        paper: Paper,
        as_of: NaiveDate,
        max_stars_in_set: i64,
    ) -> Result<(), ItemError> {
        let stars = self
            .store
            .sample_range(paper.id, MetricKind::Stars, epoch(), as_of)
            .await?;
        let citations = self
            .store
            .sample_range(paper.id, MetricKind::Citations, epoch(), as_of)
            .await?;

        let breakdown = compute(&ScoreInput {
            as_of,
            published: paper.published_at.map(|at| at.date_naive()),
            stars: &stars,
            citations: &citations,
            max_stars_in_set,
        });

        self.store
            .put_score(NewScore {
                paper_id: paper.id,
                score: breakdown.score,
                star_growth_7d: breakdown.star_growth_7d,
                citation_growth_30d: breakdown.citation_growth_30d,
                absolute_norm: breakdown.absolute_norm,
                recency_bonus: breakdown.recency_bonus,
                trend: breakdown.trend,
            })
            .await?;
        record_score(breakdown.trend.as_str());
        Ok(())
    }
}

fn epoch() -> NaiveDate {
    NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or_default()
}

#[async_trait]
impl JobHandler for ScoringHandler {
    fn kind(&self) -> JobKind {
        JobKind::Scoring
    }

    async fn execute(&self, ctx: &RunContext) -> Result<RunStats, JobError> {
        let papers = self.store.list_papers().await?;
        let set = self.comparison_set(&papers).await?;
        let max_stars_in_set = self.max_stars(&set).await?;
        let as_of = Utc::now().date_naive();

        process_items(ctx, self.workers, papers, |paper| {
            self.score_one(paper, as_of, max_stars_in_set)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::RunContext;
    use chrono::Duration;
    use paperpulse_common::db::models::{JobStatus, Trend};
    use paperpulse_common::store::{MemStore, NewPaper};

    fn new_paper(source_id: &str) -> NewPaper {
        NewPaper {
            source_id: source_id.to_string(),
            title: format!("Paper {}", source_id),
            authors: vec![],
            abstract_text: String::new(),
            published_at: Some(Utc::now().fixed_offset()),
            repo_url: None,
            references_raw: None,
        }
    }

    fn handler(store: Arc<MemStore>) -> ScoringHandler {
        ScoringHandler::new(store, None, 4)
    }

    async fn seed_week_of_stars(store: &MemStore, paper_id: Uuid, start: i64, end: i64) {
        let today = Utc::now().date_naive();
        store
            .append_sample(paper_id, MetricKind::Stars, today - Duration::days(7), start)
            .await
            .unwrap();
        store
            .append_sample(paper_id, MetricKind::Stars, today, end)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_every_paper_gets_a_score() {
        let store = Arc::new(MemStore::new());
        let hot = store.upsert_paper(new_paper("hot")).await.unwrap();
        let quiet = store.upsert_paper(new_paper("quiet")).await.unwrap();
        seed_week_of_stars(&store, hot.id, 100, 200).await;
        seed_week_of_stars(&store, quiet.id, 50, 50).await;

        let stats = handler(Arc::clone(&store))
            .execute(&RunContext::for_tests())
            .await
            .unwrap();

        assert_eq!(stats.processed, 2);
        assert_eq!(stats.status(), JobStatus::Succeeded);

        let hot_score = store.latest_score(hot.id).await.unwrap().unwrap();
        let quiet_score = store.latest_score(quiet.id).await.unwrap().unwrap();
        assert!(hot_score.score > quiet_score.score);
        assert_eq!(hot_score.trend_label(), Trend::Rising);
        assert_eq!(quiet_score.trend_label(), Trend::Stable);
    }

    #[tokio::test]
    async fn test_paper_without_history_scores_from_recency_alone() {
        let store = Arc::new(MemStore::new());
        let paper = store.upsert_paper(new_paper("fresh")).await.unwrap();

        handler(Arc::clone(&store))
            .execute(&RunContext::for_tests())
            .await
            .unwrap();

        let score = store.latest_score(paper.id).await.unwrap().unwrap();
        // Published today: only the recency term contributes
        assert_eq!(score.score, 10.0);
        assert_eq!(score.trend_label(), Trend::Stable);
    }

    #[tokio::test]
    async fn test_comparison_topic_narrows_the_set() {
        let store = Arc::new(MemStore::new());
        let topic = store.add_topic("diffusion", "Diffusion", &["diffusion"]);
        let inside = store.upsert_paper(new_paper("inside")).await.unwrap();
        let outside = store.upsert_paper(new_paper("outside")).await.unwrap();
        store
            .upsert_topic_match(topic.id, inside.id, 8.0)
            .await
            .unwrap();
        seed_week_of_stars(&store, inside.id, 100, 100).await;
        // The outsider is far more popular but is not in the set
        seed_week_of_stars(&store, outside.id, 100_000, 100_000).await;

        let handler = ScoringHandler::new(store.clone(), Some("diffusion".to_string()), 4);
        handler.execute(&RunContext::for_tests()).await.unwrap();

        let inside_score = store.latest_score(inside.id).await.unwrap().unwrap();
        // Normalized against the topic's own maximum, not the outsider's
        assert_eq!(inside_score.absolute_norm, 1.0);
    }

    #[tokio::test]
    async fn test_missing_topic_falls_back_to_all_papers() {
        let store = Arc::new(MemStore::new());
        store.upsert_paper(new_paper("only")).await.unwrap();

        let handler = ScoringHandler::new(store.clone(), Some("ghost".to_string()), 4);
        let stats = handler.execute(&RunContext::for_tests()).await.unwrap();

        assert_eq!(stats.processed, 1);
        assert_eq!(stats.status(), JobStatus::Succeeded);
    }

    #[tokio::test]
    async fn test_rescore_overwrites_previous() {
        let store = Arc::new(MemStore::new());
        let paper = store.upsert_paper(new_paper("p")).await.unwrap();
        seed_week_of_stars(&store, paper.id, 100, 100).await;

        let handler = handler(Arc::clone(&store));
        handler.execute(&RunContext::for_tests()).await.unwrap();
        let first = store.latest_score(paper.id).await.unwrap().unwrap();

        // Growth appears between runs
        store
            .append_sample(paper.id, MetricKind::Stars, Utc::now().date_naive(), 300)
            .await
            .unwrap();
        handler.execute(&RunContext::for_tests()).await.unwrap();
        let second = store.latest_score(paper.id).await.unwrap().unwrap();

        assert!(second.score > first.score);
        assert_eq!(second.paper_id, paper.id);
    }
}
