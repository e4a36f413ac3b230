//! In-memory store
//!
//! Backs tests and `backend = "memory"` trial runs. Same contract as the
//! Postgres store, including the run-guard and last-write-wins semantics;
//! a single lock stands in for the database's atomicity.

use super::{MetricPoint, NewEdge, NewPaper, NewScore, RunOutcome, Store};
use crate::db::models::*;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct Inner {
    papers: HashMap<Uuid, Paper>,
    by_source_id: HashMap<String, Uuid>,
    samples: HashMap<(Uuid, MetricKind), BTreeMap<NaiveDate, i64>>,
    edges: Vec<CitationEdge>,
    scores: HashMap<Uuid, HypeScore>,
    runs: Vec<JobRun>,
    topics: Vec<Topic>,
    topic_matches: HashMap<(Uuid, Uuid), TopicMatch>,
    cursors: HashMap<String, String>,
}

/// Store implementation over process memory
#[derive(Default)]
pub struct MemStore {
    inner: RwLock<Inner>,
}

impl MemStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read_inner(&self) -> std::sync::RwLockReadGuard<'_, Inner> {
        self.inner.read().expect("store lock poisoned")
    }

    fn write_inner(&self) -> std::sync::RwLockWriteGuard<'_, Inner> {
        self.inner.write().expect("store lock poisoned")
    }

    /// Seed a watched topic. Topics are created by the UI layer in
    /// production; tests and memory-mode trials create them here.
    pub fn add_topic(&self, slug: &str, name: &str, keywords: &[&str]) -> Topic {
        let topic = Topic {
            id: Uuid::new_v4(),
            slug: slug.to_string(),
            name: name.to_string(),
            keywords: serde_json::json!(keywords),
            created_at: Utc::now().into(),
        };
        self.write_inner().topics.push(topic.clone());
        topic
    }
}

#[async_trait]
impl Store for MemStore {
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    // ========================================================================
    // Papers
    // ========================================================================

    async fn upsert_paper(&self, new: NewPaper) -> Result<Paper> {
        let mut inner = self.write_inner();
        let now = Utc::now();
        let authors = serde_json::json!(new.authors);

        if let Some(&id) = inner.by_source_id.get(&new.source_id) {
            let paper = inner
                .papers
                .get_mut(&id)
                .ok_or_else(|| AppError::PaperNotFound { id: id.to_string() })?;
            paper.title = new.title;
            paper.authors = authors;
            paper.abstract_text = new.abstract_text;
            if new.published_at.is_some() {
                paper.published_at = new.published_at;
            }
            if new.repo_url.is_some() {
                paper.repo_url = new.repo_url;
            }
            if new.references_raw.is_some() {
                paper.references_raw = new.references_raw;
            }
            paper.updated_at = now.into();
            Ok(paper.clone())
        } else {
            let paper = Paper {
                id: Uuid::new_v4(),
                source_id: new.source_id.clone(),
                title: new.title,
                authors,
                abstract_text: new.abstract_text,
                published_at: new.published_at,
                repo_url: new.repo_url,
                references_raw: new.references_raw,
                created_at: now.into(),
                updated_at: now.into(),
            };
            inner.by_source_id.insert(new.source_id, paper.id);
            inner.papers.insert(paper.id, paper.clone());
            Ok(paper)
        }
    }

    async fn paper_by_id(&self, id: Uuid) -> Result<Option<Paper>> {
        Ok(self.read_inner().papers.get(&id).cloned())
    }

    async fn paper_by_source_id(&self, source_id: &str) -> Result<Option<Paper>> {
        let inner = self.read_inner();
        Ok(inner
            .by_source_id
            .get(source_id)
            .and_then(|id| inner.papers.get(id))
            .cloned())
    }

    async fn list_papers(&self) -> Result<Vec<Paper>> {
        let mut papers: Vec<Paper> = self.read_inner().papers.values().cloned().collect();
        papers.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        Ok(papers)
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
        self.write_inner()
            .samples
            .entry((paper_id, kind))
            .or_default()
            .insert(date, value);
        Ok(())
    }

    async fn latest_sample(&self, paper_id: Uuid, kind: MetricKind) -> Result<Option<MetricPoint>> {
        Ok(self
            .read_inner()
            .samples
            .get(&(paper_id, kind))
            .and_then(|series| series.iter().next_back())
            .map(|(&date, &value)| MetricPoint { date, value }))
    }

    async fn sample_range(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        from: NaiveDate,
        to: NaiveDate,
    ) -> Result<Vec<MetricPoint>> {
        Ok(self
            .read_inner()
            .samples
            .get(&(paper_id, kind))
            .map(|series| {
                series
                    .range(from..=to)
                    .map(|(&date, &value)| MetricPoint { date, value })
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn value_as_of(
        &self,
        paper_id: Uuid,
        kind: MetricKind,
        date: NaiveDate,
    ) -> Result<Option<i64>> {
        Ok(self
            .read_inner()
            .samples
            .get(&(paper_id, kind))
            .and_then(|series| series.range(..=date).next_back())
            .map(|(_, &value)| value))
    }

    async fn compact_samples(&self, older_than: NaiveDate) -> Result<u64> {
        let mut deleted = 0u64;
        let mut inner = self.write_inner();

        for series in inner.samples.values_mut() {
            // Last date per ISO week wins; everything else below the
            // cutoff goes.
            let mut keep_per_week: HashMap<(i32, u32), NaiveDate> = HashMap::new();
            for &date in series.keys().filter(|&&d| d < older_than) {
                let week = (date.iso_week().year(), date.iso_week().week());
                let entry = keep_per_week.entry(week).or_insert(date);
                if date > *entry {
                    *entry = date;
                }
            }

            let doomed: Vec<NaiveDate> = series
                .keys()
                .filter(|&&d| d < older_than)
                .filter(|&&d| {
                    let week = (d.iso_week().year(), d.iso_week().week());
                    keep_per_week.get(&week) != Some(&d)
                })
                .copied()
                .collect();

            for date in doomed {
                series.remove(&date);
                deleted += 1;
            }
        }

        Ok(deleted)
    }

    // ========================================================================
    // Citation edges
    // ========================================================================

    async fn replace_outgoing_edges(&self, citing_paper_id: Uuid, edges: Vec<NewEdge>) -> Result<()> {
        let mut inner = self.write_inner();
        let now = Utc::now();

        inner.edges.retain(|e| e.citing_paper_id != citing_paper_id);
        for edge in edges {
            inner.edges.push(CitationEdge {
                id: Uuid::new_v4(),
                citing_paper_id,
                cited_paper_id: edge.cited_paper_id,
                confidence: edge.confidence,
                method: edge.method,
                resolved_at: now.into(),
            });
        }

        Ok(())
    }

    async fn edges_from(&self, paper_id: Uuid) -> Result<Vec<CitationEdge>> {
        Ok(self
            .read_inner()
            .edges
            .iter()
            .filter(|e| e.citing_paper_id == paper_id)
            .cloned()
            .collect())
    }

    async fn edges_to(&self, paper_id: Uuid) -> Result<Vec<CitationEdge>> {
        Ok(self
            .read_inner()
            .edges
            .iter()
            .filter(|e| e.cited_paper_id == paper_id)
            .cloned()
            .collect())
    }

    async fn all_edges(&self) -> Result<Vec<CitationEdge>> {
        Ok(self.read_inner().edges.clone())
    }

    // ========================================================================
    // Hype scores
    // ========================================================================

    async fn put_score(&self, score: NewScore) -> Result<()> {
        self.write_inner().scores.insert(
            score.paper_id,
            HypeScore {
                paper_id: score.paper_id,
                score: score.score,
                star_growth_7d: score.star_growth_7d,
                citation_growth_30d: score.citation_growth_30d,
                absolute_norm: score.absolute_norm,
                recency_bonus: score.recency_bonus,
                trend: String::from(score.trend),
                computed_at: Utc::now().into(),
            },
        );
        Ok(())
    }

    async fn latest_score(&self, paper_id: Uuid) -> Result<Option<HypeScore>> {
        Ok(self.read_inner().scores.get(&paper_id).cloned())
    }

    // ========================================================================
    // Job runs
    // ========================================================================

    async fn begin_run(&self, kind: JobKind) -> Result<Option<JobRun>> {
        let mut inner = self.write_inner();

        let already_running = inner
            .runs
            .iter()
            .any(|r| r.job_kind() == kind && r.job_status() == JobStatus::Running);
        if already_running {
            return Ok(None);
        }

        let run = JobRun {
            id: Uuid::new_v4(),
            kind: String::from(kind),
            status: String::from(JobStatus::Running),
            started_at: Utc::now().into(),
            completed_at: None,
            items_processed: 0,
            items_failed: 0,
            error_summary: serde_json::json!([]),
        };
        inner.runs.push(run.clone());
        Ok(Some(run))
    }

    async fn finish_run(&self, run_id: Uuid, outcome: RunOutcome) -> Result<JobRun> {
        let mut inner = self.write_inner();
        let run = inner
            .runs
            .iter_mut()
            .find(|r| r.id == run_id)
            .ok_or_else(|| AppError::RunNotFound {
                id: run_id.to_string(),
            })?;

        if run.is_terminal() {
            return Ok(run.clone());
        }

        run.status = String::from(outcome.status);
        run.completed_at = Some(Utc::now().into());
        run.items_processed = outcome.items_processed;
        run.items_failed = outcome.items_failed;
        run.error_summary = serde_json::json!(outcome.error_summary);
        Ok(run.clone())
    }

    async fn run_by_id(&self, run_id: Uuid) -> Result<Option<JobRun>> {
        Ok(self.read_inner().runs.iter().find(|r| r.id == run_id).cloned())
    }

    async fn latest_run(&self, kind: JobKind) -> Result<Option<JobRun>> {
        Ok(self
            .read_inner()
            .runs
            .iter()
            .filter(|r| r.job_kind() == kind)
            .max_by_key(|r| r.started_at)
            .cloned())
    }

    // ========================================================================
    // Topics
    // ========================================================================

    async fn list_topics(&self) -> Result<Vec<Topic>> {
        let mut topics = self.read_inner().topics.clone();
        topics.sort_by(|a, b| a.slug.cmp(&b.slug));
        Ok(topics)
    }

    async fn topic_by_slug(&self, slug: &str) -> Result<Option<Topic>> {
        Ok(self
            .read_inner()
            .topics
            .iter()
            .find(|t| t.slug == slug)
            .cloned())
    }

    async fn upsert_topic_match(&self, topic_id: Uuid, paper_id: Uuid, score: f32) -> Result<()> {
        let mut inner = self.write_inner();
        let now = Utc::now();

        inner
            .topic_matches
            .entry((topic_id, paper_id))
            .and_modify(|m| {
                m.score = score;
                m.matched_at = now.into();
            })
            .or_insert_with(|| TopicMatch {
                id: Uuid::new_v4(),
                topic_id,
                paper_id,
                score,
                matched_at: now.into(),
            });

        Ok(())
    }

    async fn papers_for_topic(&self, topic_id: Uuid) -> Result<Vec<Uuid>> {
        Ok(self
            .read_inner()
            .topic_matches
            .values()
            .filter(|m| m.topic_id == topic_id)
            .map(|m| m.paper_id)
            .collect())
    }

    // ========================================================================
    // Source cursors
    // ========================================================================

    async fn source_cursor(&self, source: &str) -> Result<Option<String>> {
        Ok(self.read_inner().cursors.get(source).cloned())
    }

    async fn save_source_cursor(&self, source: &str, cursor: &str) -> Result<()> {
        self.write_inner()
            .cursors
            .insert(source.to_string(), cursor.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn sample_paper(source_id: &str) -> NewPaper {
        NewPaper {
            source_id: source_id.to_string(),
            title: "Attention Is All You Need".to_string(),
            authors: vec!["A. Vaswani".to_string()],
            abstract_text: "Transformers.".to_string(),
            published_at: None,
            repo_url: Some("https://github.com/tensorflow/tensor2tensor".to_string()),
            references_raw: None,
        }
    }

    #[tokio::test]
    async fn test_append_sample_last_write_wins() {
        let store = MemStore::new();
        let paper = store.upsert_paper(sample_paper("1706.03762")).await.unwrap();
        let day = date(2026, 8, 1);

        store
            .append_sample(paper.id, MetricKind::Stars, day, 100)
            .await
            .unwrap();
        store
            .append_sample(paper.id, MetricKind::Stars, day, 120)
            .await
            .unwrap();

        let latest = store
            .latest_sample(paper.id, MetricKind::Stars)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.value, 120);

        let range = store
            .sample_range(paper.id, MetricKind::Stars, day, day)
            .await
            .unwrap();
        assert_eq!(range.len(), 1);
    }

    #[tokio::test]
    async fn test_value_as_of_tolerates_backfill() {
        let store = MemStore::new();
        let paper = store.upsert_paper(sample_paper("2401.00001")).await.unwrap();

        // Later date written first, earlier date backfilled after
        store
            .append_sample(paper.id, MetricKind::Citations, date(2026, 8, 10), 50)
            .await
            .unwrap();
        store
            .append_sample(paper.id, MetricKind::Citations, date(2026, 8, 1), 30)
            .await
            .unwrap();

        let range = store
            .sample_range(
                paper.id,
                MetricKind::Citations,
                date(2026, 7, 1),
                date(2026, 9, 1),
            )
            .await
            .unwrap();
        assert_eq!(
            range.iter().map(|p| p.value).collect::<Vec<_>>(),
            vec![30, 50]
        );

        assert_eq!(
            store
                .value_as_of(paper.id, MetricKind::Citations, date(2026, 8, 5))
                .await
                .unwrap(),
            Some(30)
        );
        assert_eq!(
            store
                .value_as_of(paper.id, MetricKind::Citations, date(2026, 7, 31))
                .await
                .unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_begin_run_guard() {
        let store = MemStore::new();

        let first = store.begin_run(JobKind::Discovery).await.unwrap();
        assert!(first.is_some());

        let second = store.begin_run(JobKind::Discovery).await.unwrap();
        assert!(second.is_none());

        // A different kind is not blocked
        let other = store.begin_run(JobKind::Scoring).await.unwrap();
        assert!(other.is_some());

        // Finishing releases the guard
        let run = first.unwrap();
        store
            .finish_run(
                run.id,
                RunOutcome {
                    status: JobStatus::Succeeded,
                    items_processed: 3,
                    items_failed: 0,
                    error_summary: vec![],
                },
            )
            .await
            .unwrap();
        assert!(store.begin_run(JobKind::Discovery).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_finish_run_is_terminal_once() {
        let store = MemStore::new();
        let run = store.begin_run(JobKind::Scoring).await.unwrap().unwrap();

        let done = store
            .finish_run(
                run.id,
                RunOutcome {
                    status: JobStatus::Partial,
                    items_processed: 9,
                    items_failed: 1,
                    error_summary: vec!["bad record".to_string()],
                },
            )
            .await
            .unwrap();
        assert_eq!(done.job_status(), JobStatus::Partial);
        assert_eq!(done.error_samples(), vec!["bad record".to_string()]);

        // Second finish does not rewrite the terminal row
        let again = store
            .finish_run(
                run.id,
                RunOutcome {
                    status: JobStatus::Succeeded,
                    items_processed: 0,
                    items_failed: 0,
                    error_summary: vec![],
                },
            )
            .await
            .unwrap();
        assert_eq!(again.job_status(), JobStatus::Partial);
        assert_eq!(again.items_processed, 9);
    }

    #[tokio::test]
    async fn test_upsert_paper_idempotent() {
        let store = MemStore::new();
        let first = store.upsert_paper(sample_paper("1706.03762")).await.unwrap();

        let mut updated = sample_paper("1706.03762");
        updated.title = "Attention Is All You Need (v2)".to_string();
        updated.repo_url = None;
        let second = store.upsert_paper(updated).await.unwrap();

        assert_eq!(second.id, first.id);
        assert_eq!(second.created_at, first.created_at);
        assert_eq!(second.title, "Attention Is All You Need (v2)");
        // Absent fields do not erase earlier discoveries
        assert_eq!(second.repo_url, first.repo_url);

        assert_eq!(store.list_papers().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_concurrent_upserts_converge_to_one_row() {
        let store = MemStore::new();
        let mut sparse = sample_paper("2406.01234");
        sparse.repo_url = None;
        let full = sample_paper("2406.01234");

        let (a, b) = tokio::join!(store.upsert_paper(sparse), store.upsert_paper(full));
        let a = a.unwrap();
        let b = b.unwrap();

        assert_eq!(a.id, b.id);
        assert_eq!(store.list_papers().await.unwrap().len(), 1);

        // Whichever order won, the repo link survives
        let row = store
            .paper_by_source_id("2406.01234")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(
            row.repo_url.as_deref(),
            Some("https://github.com/tensorflow/tensor2tensor")
        );
    }

    #[tokio::test]
    async fn test_replace_outgoing_edges() {
        let store = MemStore::new();
        let a = store.upsert_paper(sample_paper("a")).await.unwrap();
        let b = store.upsert_paper(sample_paper("b")).await.unwrap();
        let c = store.upsert_paper(sample_paper("c")).await.unwrap();

        store
            .replace_outgoing_edges(
                a.id,
                vec![NewEdge {
                    cited_paper_id: b.id,
                    confidence: 92,
                    method: "title-similarity".to_string(),
                }],
            )
            .await
            .unwrap();
        assert_eq!(store.edges_from(a.id).await.unwrap().len(), 1);

        // Re-resolution replaces the set wholesale
        store
            .replace_outgoing_edges(
                a.id,
                vec![NewEdge {
                    cited_paper_id: c.id,
                    confidence: 88,
                    method: "title-similarity".to_string(),
                }],
            )
            .await
            .unwrap();

        let edges = store.edges_from(a.id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].cited_paper_id, c.id);
        assert_eq!(store.edges_to(b.id).await.unwrap().len(), 0);
    }

    #[tokio::test]
    async fn test_compaction_keeps_read_contract() {
        let store = MemStore::new();
        let paper = store.upsert_paper(sample_paper("2501.00001")).await.unwrap();

        // Daily samples across two ISO weeks (Mon 2025-01-06 .. Sun 2025-01-19)
        for day in 6..=19u32 {
            store
                .append_sample(paper.id, MetricKind::Stars, date(2025, 1, day), day as i64)
                .await
                .unwrap();
        }

        let deleted = store.compact_samples(date(2025, 2, 1)).await.unwrap();
        assert_eq!(deleted, 12);

        // One sample per week survives: the 12th and the 19th
        let range = store
            .sample_range(paper.id, MetricKind::Stars, date(2025, 1, 1), date(2025, 1, 31))
            .await
            .unwrap();
        assert_eq!(
            range.iter().map(|p| p.date).collect::<Vec<_>>(),
            vec![date(2025, 1, 12), date(2025, 1, 19)]
        );

        // as-of still answers from the surviving points
        assert_eq!(
            store
                .value_as_of(paper.id, MetricKind::Stars, date(2025, 1, 15))
                .await
                .unwrap(),
            Some(12)
        );
    }

    #[tokio::test]
    async fn test_topic_matches_upsert() {
        let store = MemStore::new();
        let topic = store.add_topic("llm", "Large Language Models", &["transformer"]);
        let paper = store.upsert_paper(sample_paper("x")).await.unwrap();

        store.upsert_topic_match(topic.id, paper.id, 7.5).await.unwrap();
        store.upsert_topic_match(topic.id, paper.id, 8.0).await.unwrap();

        let papers = store.papers_for_topic(topic.id).await.unwrap();
        assert_eq!(papers, vec![paper.id]);
    }

    #[tokio::test]
    async fn test_source_cursor_round_trip() {
        let store = MemStore::new();
        assert_eq!(store.source_cursor("arxiv").await.unwrap(), None);

        store.save_source_cursor("arxiv", "100").await.unwrap();
        store.save_source_cursor("arxiv", "200").await.unwrap();
        assert_eq!(
            store.source_cursor("arxiv").await.unwrap().as_deref(),
            Some("200")
        );
    }
}
