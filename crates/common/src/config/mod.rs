//! Configuration management for the PaperPulse pipeline
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{env}.toml)
//! - Default values

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AppConfig {
    /// Database configuration
    pub database: DatabaseConfig,

    /// External source configuration
    pub sources: SourcesConfig,

    /// Job orchestration configuration
    pub jobs: JobsConfig,

    /// Citation and topic matching configuration
    pub matching: MatchingConfig,

    /// Hype score configuration
    pub scoring: ScoringConfig,

    /// Observability configuration
    pub observability: ObservabilityConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Store backend: postgres, memory
    #[serde(default = "default_backend")]
    pub backend: String,

    /// Primary database URL (for writes)
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Read replica URL (optional, falls back to primary)
    pub read_url: Option<String>,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Minimum number of connections
    #[serde(default = "default_min_connections")]
    pub min_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,

    /// Idle timeout in seconds
    #[serde(default = "default_idle_timeout")]
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourcesConfig {
    /// User-Agent header sent to every provider
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-call timeout in seconds; must stay well below the run budget
    #[serde(default = "default_source_timeout")]
    pub request_timeout_secs: u64,

    /// Retry attempts after the first failure
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Initial backoff interval in milliseconds
    #[serde(default = "default_retry_base_ms")]
    pub retry_base_ms: u64,

    /// arXiv metadata feed
    #[serde(default)]
    pub arxiv: ArxivSourceConfig,

    /// GitHub star counts
    #[serde(default)]
    pub github: GithubSourceConfig,

    /// Semantic Scholar citation counts
    #[serde(default)]
    pub semantic_scholar: SemanticScholarSourceConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ArxivSourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Categories polled during discovery
    #[serde(default = "default_arxiv_categories")]
    pub categories: Vec<String>,

    /// Records per page
    #[serde(default = "default_arxiv_page_size")]
    pub page_size: u32,

    /// Documented courtesy limit is one request per three seconds
    #[serde(default = "default_arxiv_rpm")]
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct GithubSourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Bearer token; unauthenticated requests get 60/hour
    pub token: Option<String>,

    #[serde(default = "default_github_rph")]
    pub requests_per_hour: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SemanticScholarSourceConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// API key for the Graph API (optional, raises the rate limit)
    pub api_key: Option<String>,

    #[serde(default = "default_s2_rpm")]
    pub requests_per_minute: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct JobsConfig {
    /// Worker pool size per run
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Overall run budget in seconds
    #[serde(default = "default_run_budget")]
    pub run_budget_secs: u64,

    /// Maximum error messages kept on a JobRun
    #[serde(default = "default_error_sample_cap")]
    pub error_sample_cap: usize,

    /// Pages fetched per source per discovery run
    #[serde(default = "default_discovery_max_pages")]
    pub discovery_max_pages: u32,

    /// Samples older than this many days are downsampled by compaction
    #[serde(default = "default_compact_keep_days")]
    pub compact_keep_days: u32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct MatchingConfig {
    /// Citation acceptance threshold on the 0-100 similarity scale
    #[serde(default = "default_accept_threshold")]
    pub accept_threshold: f32,

    /// Topic relevance floor on the 0-10 scale
    #[serde(default = "default_topic_min_score")]
    pub topic_min_score: f32,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ScoringConfig {
    /// Topic slug bounding the comparison set; None means all papers
    pub comparison_topic: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log level (debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Metrics port (0 to disable)
    #[serde(default = "default_metrics_port")]
    pub metrics_port: u16,

    /// Service name for tracing
    #[serde(default = "default_service_name")]
    pub service_name: String,
}

// Default value functions
fn default_backend() -> String { "postgres".to_string() }
fn default_database_url() -> String { "postgres://localhost/paperpulse".to_string() }
fn default_max_connections() -> u32 { 20 }
fn default_min_connections() -> u32 { 2 }
fn default_connect_timeout() -> u64 { 10 }
fn default_idle_timeout() -> u64 { 300 }
fn default_user_agent() -> String { format!("paperpulse/{}", env!("CARGO_PKG_VERSION")) }
fn default_source_timeout() -> u64 { 30 }
fn default_max_retries() -> u32 { 3 }
fn default_retry_base_ms() -> u64 { 500 }
fn default_enabled() -> bool { true }
fn default_arxiv_categories() -> Vec<String> {
    vec!["cs.LG".to_string(), "cs.CL".to_string(), "cs.CV".to_string()]
}
fn default_arxiv_page_size() -> u32 { 100 }
fn default_arxiv_rpm() -> u32 { 20 }
fn default_github_rph() -> u32 { 5000 }
fn default_s2_rpm() -> u32 { 60 }
fn default_workers() -> usize { 8 }
fn default_run_budget() -> u64 { 1800 }
fn default_error_sample_cap() -> usize { 10 }
fn default_discovery_max_pages() -> u32 { 10 }
fn default_compact_keep_days() -> u32 { 90 }
fn default_accept_threshold() -> f32 { 85.0 }
fn default_topic_min_score() -> f32 { 6.0 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { true }
fn default_metrics_port() -> u16 { 9090 }
fn default_service_name() -> String { "paperpulse".to_string() }

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))
            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            // Load local overrides
            .add_source(File::with_name("config/local").required(false))
            // Load from environment variables with APP__ prefix
            // e.g., APP__DATABASE__URL=postgres://...
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: AppConfig = config.try_deserialize()?;
        cfg.apply_fallbacks();
        Ok(cfg)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let mut cfg: AppConfig = config.try_deserialize()?;
        cfg.apply_fallbacks();
        Ok(cfg)
    }

    fn apply_fallbacks(&mut self) {
        if self.sources.github.token.is_none() {
            if let Ok(token) = std::env::var("GITHUB_TOKEN") {
                self.sources.github.token = Some(token);
            }
        }
        if self.sources.semantic_scholar.api_key.is_none() {
            if let Ok(key) = std::env::var("S2_API_KEY") {
                self.sources.semantic_scholar.api_key = Some(key);
            }
        }
    }

    /// Get the per-call source timeout as Duration
    pub fn source_timeout(&self) -> Duration {
        Duration::from_secs(self.sources.request_timeout_secs)
    }

    /// Get the overall run budget as Duration
    pub fn run_budget(&self) -> Duration {
        Duration::from_secs(self.jobs.run_budget_secs)
    }

    /// Get the read database URL (falls back to primary)
    pub fn read_database_url(&self) -> &str {
        self.database.read_url.as_deref().unwrap_or(&self.database.url)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            database: DatabaseConfig::default(),
            sources: SourcesConfig::default(),
            jobs: JobsConfig::default(),
            matching: MatchingConfig::default(),
            scoring: ScoringConfig { comparison_topic: None },
            observability: ObservabilityConfig {
                log_level: default_log_level(),
                json_logging: default_json_logging(),
                metrics_port: default_metrics_port(),
                service_name: default_service_name(),
            },
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_backend(),
            url: default_database_url(),
            read_url: None,
            max_connections: default_max_connections(),
            min_connections: default_min_connections(),
            connect_timeout_secs: default_connect_timeout(),
            idle_timeout_secs: default_idle_timeout(),
        }
    }
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            request_timeout_secs: default_source_timeout(),
            max_retries: default_max_retries(),
            retry_base_ms: default_retry_base_ms(),
            arxiv: ArxivSourceConfig::default(),
            github: GithubSourceConfig::default(),
            semantic_scholar: SemanticScholarSourceConfig::default(),
        }
    }
}

impl Default for ArxivSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            categories: default_arxiv_categories(),
            page_size: default_arxiv_page_size(),
            requests_per_minute: default_arxiv_rpm(),
        }
    }
}

impl Default for GithubSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            token: None,
            requests_per_hour: default_github_rph(),
        }
    }
}

impl Default for SemanticScholarSourceConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            api_key: None,
            requests_per_minute: default_s2_rpm(),
        }
    }
}

impl Default for JobsConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            run_budget_secs: default_run_budget(),
            error_sample_cap: default_error_sample_cap(),
            discovery_max_pages: default_discovery_max_pages(),
            compact_keep_days: default_compact_keep_days(),
        }
    }
}

impl Default for MatchingConfig {
    fn default() -> Self {
        Self {
            accept_threshold: default_accept_threshold(),
            topic_min_score: default_topic_min_score(),
        }
    }
}
