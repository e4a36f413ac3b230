//! PaperPulse Pipeline
//!
//! The pipeline proper: citation matching, the hype score engine,
//! topic relevance, the citation graph, and the job orchestration that
//! drives them. Everything reaches storage through the store trait in
//! `paperpulse-common` and upstream providers through the connector
//! trait in `paperpulse-sources`.

pub mod api;
pub mod citations;
pub mod graph;
pub mod jobs;
pub mod scoring;
pub mod topics;

pub use api::PipelineApi;
pub use jobs::{Orchestrator, RunParams, TriggerOutcome};

use crate::citations::CitationMatcher;
use crate::jobs::{
    CitationResolutionHandler, DiscoveryHandler, MetricRefreshHandler, ScoringHandler,
};
use crate::topics::KeywordScorer;
use paperpulse_common::config::AppConfig;
use paperpulse_common::store::Store;
use paperpulse_sources::SourceConnector;
use std::sync::Arc;
use std::time::Duration;

/// Wire the four job handlers into an orchestrator
pub fn build_orchestrator(
    config: &AppConfig,
    store: Arc<dyn Store>,
    connectors: Vec<Arc<dyn SourceConnector>>,
) -> Orchestrator {
    let retry_base = Duration::from_millis(config.sources.retry_base_ms);
    let max_retries = config.sources.max_retries;
    let workers = config.jobs.workers;

    let mut orchestrator = Orchestrator::new(
        Arc::clone(&store),
        config.run_budget(),
        config.jobs.error_sample_cap,
    );

    orchestrator.register(Arc::new(DiscoveryHandler::new(
        Arc::clone(&store),
        connectors.clone(),
        Arc::new(KeywordScorer),
        config.matching.topic_min_score as f64,
        config.jobs.discovery_max_pages,
        max_retries,
        retry_base,
    )));
    orchestrator.register(Arc::new(MetricRefreshHandler::new(
        Arc::clone(&store),
        connectors,
        workers,
        max_retries,
        retry_base,
    )));
    orchestrator.register(Arc::new(CitationResolutionHandler::new(
        Arc::clone(&store),
        Arc::new(CitationMatcher::with_defaults(
            config.matching.accept_threshold as f64,
        )),
        workers,
    )));
    orchestrator.register(Arc::new(ScoringHandler::new(
        store,
        config.scoring.comparison_topic.clone(),
        workers,
    )));

    orchestrator
}
