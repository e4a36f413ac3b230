//! Postgres-backed store
//!
//! Derived SeaORM queries where they fit, raw statements for the
//! last-write-wins upserts, the run-guard conditional insert, and
//! compaction.

use super::{MetricPoint, NewEdge, NewPaper, NewScore, RunOutcome, Store};
use crate::config::DatabaseConfig;
use crate::db::models::*;
use crate::db::DbPool;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, DbBackend, EntityTrait,
    QueryFilter, QueryOrder, Set, Statement,
};
use uuid::Uuid;

/// Store implementation over a Postgres connection pool
#[derive(Clone)]
pub struct PgStore {
    pool: DbPool,
}

impl PgStore {
    /// Wrap an existing pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    /// Connect from configuration
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let pool = DbPool::new(config).await?;
        Ok(Self::new(pool))
    }

    /// Get the read connection
    fn read_conn(&self) -> &DatabaseConnection {
        self.pool.read()
    }

    /// Get the write connection
    fn write_conn(&self) -> &DatabaseConnection {
        self.pool.write()
    }
}

#[async_trait]
impl Store for PgStore {
    async fn ping(&self) -> Result<()> {
        self.pool.ping().await
    }

    // ========================================================================
    // Papers
    // ========================================================================

    async fn upsert_paper(&self, new: NewPaper) -> Result<Paper> {
        let now = chrono::Utc::now();
        let authors = serde_json::json!(new.authors);

        // Single conditional insert so concurrent discoveries of the
        // same source_id cannot race the existence check. COALESCE
        // keeps the repo link, references, and publication date an
        // earlier discovery already found when the new record lacks
        // them; created_at never changes on conflict.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO papers
                (id, source_id, title, authors, abstract_text,
                 published_at, repo_url, references_raw, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $9)
            ON CONFLICT (source_id) DO UPDATE SET
                title = EXCLUDED.title,
                authors = EXCLUDED.authors,
                abstract_text = EXCLUDED.abstract_text,
                published_at = COALESCE(EXCLUDED.published_at, papers.published_at),
                repo_url = COALESCE(EXCLUDED.repo_url, papers.repo_url),
                references_raw = COALESCE(EXCLUDED.references_raw, papers.references_raw),
                updated_at = EXCLUDED.updated_at
            RETURNING *
            "#,
            vec![
                Uuid::new_v4().into(),
                new.source_id.into(),
                new.title.into(),
                authors.into(),
                new.abstract_text.into(),
                new.published_at.into(),
                new.repo_url.into(),
                new.references_raw.into(),
                now.into(),
            ],
        );

        PaperEntity::find()
            .from_raw_sql(stmt)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::Internal {
                message: "paper upsert returned no row".to_string(),
            })
    }

    async fn paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        PaperEntity::find_by_id(id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn paper_by_source_id(&self, source_id: &str) -> Result<Option<Paper>> {
        PaperEntity::find()
            .filter(PaperColumn::SourceId.eq(source_id))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn list_papers(&self) -> Result<Vec<Paper>> {
        PaperEntity::find()
            .order_by_asc(PaperColumn::CreatedAt)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Metric samples
    // ========================================================================

    async fn append_sample(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        date: NaiveDate,
        value: i64,
    ) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO metric_samples (id, paper_id, kind, sample_date, value, recorded_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (paper_id, kind, sample_date) DO UPDATE SET
                value = EXCLUDED.value,
                recorded_at = EXCLUDED.recorded_at
            "#,
            vec![
                Uuid::new_v4().into(),
                paper_id.into(),
                kind.as_str().into(),
                date.into(),
                value.into(),
                chrono::Utc::now().into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    async fn latest_sample(&self, paper_id: Uuid, kind: MetricKind) -> Result<Option<MetricPoint>> {
        let sample = MetricSampleEntity::find()
            .filter(MetricSampleColumn::PaperId.eq(paper_id))
            .filter(MetricSampleColumn::Kind.eq(kind.as_str()))
            .order_by_desc(MetricSampleColumn::SampleDate)
            .one(self.read_conn())
            .await?;

        Ok(sample.map(|s| MetricPoint {
            date: s.sample_date,
            value: s.value,
        }))
    }

    async fn sample_range(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MetricPoint>> {
        let samples = MetricSampleEntity::find()
            .filter(MetricSampleColumn::PaperId.eq(paper_id))
            .filter(MetricSampleColumn::Kind.eq(kind.as_str()))
            .filter(MetricSampleColumn::SampleDate.gte(from))
            .filter(MetricSampleColumn::SampleDate.lte(to))
            .order_by_asc(MetricSampleColumn::SampleDate)
            .all(self.read_conn())
            .await?;

        Ok(samples
            .into_iter()
            .map(|s| MetricPoint {
                date: s.sample_date,
                value: s.value,
            })
            .collect())
    }

    async fn value_as_of(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        date: NaiveDate,
    ) -> Result<Option<i64>> {
        let sample = MetricSampleEntity::find()
            .filter(MetricSampleColumn::PaperId.eq(paper_id))
            .filter(MetricSampleColumn::Kind.eq(kind.as_str()))
            .filter(MetricSampleColumn::SampleDate.lte(date))
            .order_by_desc(MetricSampleColumn::SampleDate)
            .one(self.read_conn())
            .await?;

        Ok(sample.map(|s| s.value))
    }

    async fn compact_samples(&self, older_than: NaiveDate) -> Result<u64> {
        // Keeps the newest row per (paper, kind, ISO week) below the cutoff.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            DELETE FROM metric_samples
            WHERE id IN (
                SELECT id FROM (
                    SELECT id,
                           ROW_NUMBER() OVER (
                               PARTITION BY paper_id, kind, DATE_TRUNC('week', sample_date)
                               ORDER BY sample_date DESC
                           ) AS rn
                    FROM metric_samples
                    WHERE sample_date < $1
                ) ranked
                WHERE ranked.rn > 1
            )
            "#,
            vec![older_than.into()],
        );

        let result = self.write_conn().execute(stmt).await?;
        Ok(result.rows_affected())
    }

    // ========================================================================
    // Citation edges
    // ========================================================================

    async fn replace_outgoing_edges(&self, citing_paper_id: Uuid, edges: Vec<NewEdge>) -> Result<()> {
        CitationEdgeEntity::delete_many()
            .filter(CitationEdgeColumn::CitingPaperId.eq(citing_paper_id))
            .exec(self.write_conn())
            .await?;

        if edges.is_empty() {
            return Ok(());
        }

        let now = chrono::Utc::now();
        let models: Vec<CitationEdgeActiveModel> = edges
            .into_iter()
            .map(|e| CitationEdgeActiveModel {
                id: Set(Uuid::new_v4()),
                citing_paper_id: Set(citing_paper_id),
                cited_paper_id: Set(e.cited_paper_id),
                confidence: Set(e.confidence),
                method: Set(e.method),
                resolved_at: Set(now.into()),
            })
            .collect();

        CitationEdgeEntity::insert_many(models)
            .exec(self.write_conn())
            .await?;

        Ok(())
    }

    async fn edges_from(&self, paper_id: Uuid) -> Result<Vec<CitationEdge>> {
        CitationEdgeEntity::find()
            .filter(CitationEdgeColumn::CitingPaperId.eq(paper_id))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn edges_to(&self, paper_id: Uuid) -> Result<Vec<CitationEdge>> {
        CitationEdgeEntity::find()
            .filter(CitationEdgeColumn::CitedPaperId.eq(paper_id))
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn all_edges(&self) -> Result<Vec<CitationEdge>> {
        CitationEdgeEntity::find()
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Hype scores
    // ========================================================================

    async fn put_score(&self, score: NewScore) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO hype_scores (
                paper_id, score, star_growth_7d, citation_growth_30d,
                absolute_norm, recency_bonus, trend, computed_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            ON CONFLICT (paper_id) DO UPDATE SET
                score = EXCLUDED.score,
                star_growth_7d = EXCLUDED.star_growth_7d,
                citation_growth_30d = EXCLUDED.citation_growth_30d,
                absolute_norm = EXCLUDED.absolute_norm,
                recency_bonus = EXCLUDED.recency_bonus,
                trend = EXCLUDED.trend,
                computed_at = EXCLUDED.computed_at
            "#,
            vec![
                score.paper_id.into(),
                score.score.into(),
                score.star_growth_7d.into(),
                score.citation_growth_30d.into(),
                score.absolute_norm.into(),
                score.recency_bonus.into(),
                score.trend.as_str().into(),
                chrono::Utc::now().into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    async fn latest_score(&self, paper_id: Uuid) -> Result<Option<HypeScore>> {
        HypeScoreEntity::find_by_id(paper_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Job runs
    // ========================================================================

    async fn begin_run(&self, kind: JobKind) -> Result<Option<JobRun>> {
        let run_id = Uuid::new_v4();

        // Inserts nothing when a running row for this kind exists, which
        // is what makes the guard hold across orchestrator instances.
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO job_runs (
                id, kind, status, started_at, completed_at,
                items_processed, items_failed, error_summary
            )
            SELECT $1, $2, 'running', $3, NULL, 0, 0, $4
            WHERE NOT EXISTS (
                SELECT 1 FROM job_runs WHERE kind = $2 AND status = 'running'
            )
            "#,
            vec![
                run_id.into(),
                kind.as_str().into(),
                chrono::Utc::now().into(),
                serde_json::json!([]).into(),
            ],
        );

        let result = self.write_conn().execute(stmt).await?;
        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.run_by_id(run_id).await
    }

    async fn finish_run(&self, run_id: Uuid, outcome: RunOutcome) -> Result<JobRun> {
        let run = JobRunEntity::find_by_id(run_id)
            .one(self.write_conn())
            .await?
            .ok_or_else(|| AppError::RunNotFound {
                id: run_id.to_string(),
            })?;

        // Terminal rows are never rewritten
        if run.is_terminal() {
            return Ok(run);
        }

        let mut active: JobRunActiveModel = run.into();
        active.status = Set(String::from(outcome.status));
        active.completed_at = Set(Some(chrono::Utc::now().into()));
        active.items_processed = Set(outcome.items_processed);
        active.items_failed = Set(outcome.items_failed);
        active.error_summary = Set(serde_json::json!(outcome.error_summary));

        active.update(self.write_conn()).await.map_err(Into::into)
    }

    async fn run_by_id(&self, run_id: Uuid) -> Result<Option<JobRun>> {
        JobRunEntity::find_by_id(run_id)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn latest_run(&self, kind: JobKind) -> Result<Option<JobRun>> {
        JobRunEntity::find()
            .filter(JobRunColumn::Kind.eq(kind.as_str()))
            .order_by_desc(JobRunColumn::StartedAt)
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    // ========================================================================
    // Topics
    // ========================================================================

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        TopicEntity::find()
            .order_by_asc(TopicColumn::Slug)
            .all(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn topic_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        TopicEntity::find()
            .filter(TopicColumn::Slug.eq(slug))
            .one(self.read_conn())
            .await
            .map_err(Into::into)
    }

    async fn upsert_topic_match(&self, topic_id: Uuid, paper_id: Uuid, score: f32) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO topic_matches (id, topic_id, paper_id, score, matched_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (topic_id, paper_id) DO UPDATE SET
                score = EXCLUDED.score,
                matched_at = EXCLUDED.matched_at
            "#,
            vec![
                Uuid::new_v4().into(),
                topic_id.into(),
                paper_id.into(),
                score.into(),
                chrono::Utc::now().into(),
            ],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }

    async fn papers_for_topic(&self, topic_id: Uuid) -> Result<Vec<Uuid>> {
        let matches = TopicMatchEntity::find()
            .filter(TopicMatchColumn::TopicId.eq(topic_id))
            .all(self.read_conn())
            .await?;

        Ok(matches.into_iter().map(|m| m.paper_id).collect())
    }

    // ========================================================================
    // Source cursors
    // ========================================================================

    async fn source_cursor(&self, source: &str) -> Result<Option<String>> {
        let row = SourceCursorEntity::find_by_id(source.to_string())
            .one(self.read_conn())
            .await?;

        Ok(row.map(|r| r.cursor))
    }

    async fn save_source_cursor(&self, source: &str, cursor: &str) -> Result<()> {
        let stmt = Statement::from_sql_and_values(
            DbBackend::Postgres,
            r#"
            INSERT INTO source_cursors (source, "cursor", updated_at)
            VALUES ($1, $2, $3)
            ON CONFLICT (source) DO UPDATE SET
                "cursor" = EXCLUDED."cursor",
                updated_at = EXCLUDED.updated_at
            "#,
            vec![source.into(), cursor.into(), chrono::Utc::now().into()],
        );

        self.write_conn().execute(stmt).await?;
        Ok(())
    }
}
