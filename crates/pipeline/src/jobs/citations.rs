//! Citation resolution job
//!
//! Re-resolves the reference list of every paper that has one against
//! the current known-paper set and replaces its outgoing edges
//! wholesale, so matches improve as the corpus grows.

use super::{ItemError, JobError, JobHandler, RunContext, RunStats};
use crate::citations::CitationMatcher;
use crate::jobs::runner::process_items;
use async_trait::async_trait;
use paperpulse_common::db::models::{JobKind, Paper};
use paperpulse_common::metrics::record_edges_resolved;
use paperpulse_common::store::Store;
use std::sync::Arc;

pub struct CitationResolutionHandler {
    store: Arc<dyn Store>,
    matcher: Arc<CitationMatcher>,
    workers: usize,
}

impl CitationResolutionHandler {
    pub fn new(store: Arc<dyn Store>, matcher: Arc<CitationMatcher>, workers: usize) -> Self {
        Self {
            store,
            matcher,
            workers,
        }
    }

    async fn resolve_one(&self, citing: Paper, known: Arc<Vec<Paper>>) -> Result<(), ItemError> {
        let edges = self.matcher.resolve(&citing, &known);
        let count = edges.len() as u64;
        self.store.replace_outgoing_edges(citing.id, edges).await?;
        record_edges_resolved(count);
        Ok(())
    }
}

#[async_trait]
impl JobHandler for CitationResolutionHandler {
    fn kind(&self) -> JobKind {
        JobKind::CitationResolution
    }

    async fn execute(&self, ctx: &RunContext) -> Result<RunStats, JobError> {
        let known = Arc::new(self.store.list_papers().await?);

        let items: Vec<Paper> = known
            .iter()
            .filter(|p| p.references_raw.is_some())
            .cloned()
            .collect();

        process_items(ctx, self.workers, items, |citing| {
            self.resolve_one(citing, Arc::clone(&known))
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::jobs::RunContext;
    use paperpulse_common::db::models::JobStatus;
    use paperpulse_common::store::{MemStore, NewPaper};

    fn new_paper(source_id: &str, title: &str, refs: Option<&str>) -> NewPaper {
        NewPaper {
            source_id: source_id.to_string(),
            title: title.to_string(),
            authors: vec![],
            abstract_text: String::new(),
            published_at: None,
            repo_url: None,
            references_raw: refs.map(str::to_string),
        }
    }

    fn handler(store: Arc<MemStore>) -> CitationResolutionHandler {
        CitationResolutionHandler::new(store, Arc::new(CitationMatcher::with_defaults(85.0)), 4)
    }

    #[tokio::test]
    async fn test_edges_written_for_resolved_references() {
        let store = Arc::new(MemStore::new());
        let cited = store
            .upsert_paper(new_paper("c1", "Attention Is All You Need", None))
            .await
            .unwrap();
        let citing = store
            .upsert_paper(new_paper(
                "c2",
                "A Follow-Up Architecture Study",
                Some("[1] Attention Is All You Need."),
            ))
            .await
            .unwrap();

        let stats = handler(Arc::clone(&store))
            .execute(&RunContext::for_tests())
            .await
            .unwrap();

        // Only the paper with a reference list is an item
        assert_eq!(stats.processed, 1);
        assert_eq!(stats.status(), JobStatus::Succeeded);

        let edges = store.edges_from(citing.id).await.unwrap();
        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].cited_paper_id, cited.id);
    }

    #[tokio::test]
    async fn test_rerun_replaces_rather_than_accumulates() {
        let store = Arc::new(MemStore::new());
        store
            .upsert_paper(new_paper("c1", "Attention Is All You Need", None))
            .await
            .unwrap();
        let citing = store
            .upsert_paper(new_paper(
                "c2",
                "A Follow-Up Architecture Study",
                Some("[1] Attention Is All You Need."),
            ))
            .await
            .unwrap();

        let handler = handler(Arc::clone(&store));
        handler.execute(&RunContext::for_tests()).await.unwrap();
        handler.execute(&RunContext::for_tests()).await.unwrap();

        assert_eq!(store.edges_from(citing.id).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unmatched_references_leave_no_edges() {
        let store = Arc::new(MemStore::new());
        store
            .upsert_paper(new_paper("c1", "Attention Is All You Need", None))
            .await
            .unwrap();
        let citing = store
            .upsert_paper(new_paper(
                "c2",
                "Unrelated Work",
                Some("[1] Some Paper Nobody Indexed Yet."),
            ))
            .await
            .unwrap();

        let stats = handler(Arc::clone(&store))
            .execute(&RunContext::for_tests())
            .await
            .unwrap();

        assert_eq!(stats.processed, 1);
        assert!(store.edges_from(citing.id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_no_reference_lists_is_an_empty_succeeded_run() {
        let store = Arc::new(MemStore::new());
        store
            .upsert_paper(new_paper("c1", "No References Here", None))
            .await
            .unwrap();

        let stats = handler(Arc::clone(&store))
            .execute(&RunContext::for_tests())
            .await
            .unwrap();

        assert_eq!(stats.processed, 0);
        assert_eq!(stats.status(), JobStatus::Succeeded);
    }
}
