use serde::Deserialize;

fn default_true() -> bool {
    true
}

/// Every tunable named by the environment-variable surface, loaded once via
/// [`AppConfig::from_env`] and threaded explicitly through the call tree —
/// never stashed behind a `OnceLock`/`lazy_static` global. Callers that need
/// a non-default config for a test construct one directly with
/// [`AppConfig::default`] and override fields.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub max_concurrent_jobs: usize,
    pub max_segment_parallelism: usize,
    pub max_workflow_iterations: u32,

    pub max_cost_usd: f64,
    pub cost_alert_threshold: f64,
    pub max_tokens_per_paper: u64,
    pub max_processing_time_s: u64,

    pub acc_threshold: f64,
    pub max_rewrites: u32,
    pub max_segment_retries: u32,
    pub max_state_retries: u32,

    pub min_index_coverage: f64,
    pub chunk_words: usize,
    pub chunk_overlap_words: usize,
    pub min_chunk_words: usize,

    pub default_style: String,
    pub default_target_duration_s: u64,
    pub reasoner_deadline_ms: u64,

    pub embed_batch_size: usize,
    pub embed_batch_delay_ms: u64,

    #[serde(default = "default_true")]
    pub enable_citation_tracking: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            max_segment_parallelism: 3,
            max_workflow_iterations: 50,

            max_cost_usd: 95.00,
            cost_alert_threshold: 80.00,
            max_tokens_per_paper: 50_000,
            max_processing_time_s: 3600,

            acc_threshold: 0.75,
            max_rewrites: 2,
            max_segment_retries: 2,
            max_state_retries: 3,

            min_index_coverage: 0.5,
            chunk_words: 300,
            chunk_overlap_words: 100,
            min_chunk_words: 50,

            default_style: "layperson".to_string(),
            default_target_duration_s: 900,
            reasoner_deadline_ms: 60_000,

            embed_batch_size: 16,
            embed_batch_delay_ms: 0,

            enable_citation_tracking: true,
        }
    }
}

impl AppConfig {
    /// Loads overrides from the process environment on top of the defaults
    /// above, the way `apps/api`'s `Env` loads via `envy::from_env()` — but
    /// returned as an owned value rather than stored behind a process-global,
    /// per the redesign note retiring module-level singletons in favor of
    /// explicit per-job context.
    pub fn from_env() -> Result<Self, envy::Error> {
        envy::from_env::<AppConfig>()
    }
}
