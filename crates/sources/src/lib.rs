//! PaperPulse Source Connectors
//!
//! Upstream integrations for the pipeline:
//! - arXiv Atom feed discovery
//! - GitHub star counts
//! - Semantic Scholar citation counts
//! - A scripted mock for orchestration tests
//!
//! Every connector sits behind a per-source request budget and the
//! shared retry helper.

pub mod arxiv;
pub mod budget;
pub mod connector;
pub mod errors;
pub mod github;
pub mod mock;
pub mod retry;
pub mod semantic_scholar;

// Re-export commonly used types
pub use arxiv::ArxivConnector;
pub use budget::RequestBudget;
pub use connector::{create_connectors, DiscoveredPaper, FetchPage, SourceConnector};
pub use errors::{SourceError, SourceResult};
pub use github::GithubConnector;
pub use mock::MockConnector;
pub use retry::with_retry;
pub use semantic_scholar::SemanticScholarConnector;
