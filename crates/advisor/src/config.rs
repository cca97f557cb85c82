//! Advisor configuration
//!
//! Sources, lowest precedence first: built-in defaults, an optional
//! `advisor.toml` (or the file named by `ADVISOR_CONFIG_FILE`), then
//! `ADVISOR_*` environment variables with `__` separating nested keys,
//! e.g. `ADVISOR_ANALYSIS__CPU_HIGH_THRESHOLD=70`.

use advisor_lib::recommender::{PipelineConfig, DEFAULT_MAX_CONCURRENCY, DEFAULT_MODEL_TIMEOUT};
use advisor_lib::store::DEFAULT_RECOMMENDATION_TTL;
use advisor_lib::AnalysisConfig;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::time::Duration;

/// Advisor configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AdvisorConfig {
    /// Name attached to structured log events
    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    /// Port for the HTTP API, health and metrics
    #[serde(default = "default_api_port")]
    pub api_port: u16,

    /// Text-generation endpoint; without one every analysis uses the rule-based path
    #[serde(default)]
    pub model_endpoint: Option<String>,

    /// Bearer token for the text-generation endpoint
    #[serde(default)]
    pub model_api_token: Option<String>,

    #[serde(default = "default_model_timeout")]
    pub model_timeout_secs: u64,

    #[serde(default = "default_max_concurrency")]
    pub max_concurrency: usize,

    #[serde(default = "default_recommendation_ttl")]
    pub recommendation_ttl_secs: u64,

    /// Thresholds, window and log patterns
    #[serde(default)]
    pub analysis: AnalysisConfig,
}

fn default_instance_name() -> String {
    std::env::var("HOSTNAME").unwrap_or_else(|_| "ecs-advisor".to_string())
}

fn default_api_port() -> u16 {
    8080
}

fn default_model_timeout() -> u64 {
    DEFAULT_MODEL_TIMEOUT.as_secs()
}

fn default_max_concurrency() -> usize {
    DEFAULT_MAX_CONCURRENCY
}

fn default_recommendation_ttl() -> u64 {
    DEFAULT_RECOMMENDATION_TTL.as_secs()
}

impl AdvisorConfig {
    /// Load configuration from the config file and environment
    pub fn load() -> Result<Self> {
        let file = std::env::var("ADVISOR_CONFIG_FILE").unwrap_or_else(|_| "advisor".to_string());
        let builder = config::Config::builder()
            .add_source(config::File::with_name(&file).required(false))
            .add_source(
                config::Environment::with_prefix("ADVISOR")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            );
        Self::from_builder(builder)
    }

    fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self> {
        let config: Self = builder
            .build()
            .context("Failed to read configuration")?
            .try_deserialize()
            .context("Invalid configuration")?;
        config.pipeline_config().validate()?;
        Ok(config)
    }

    pub fn pipeline_config(&self) -> PipelineConfig {
        PipelineConfig {
            analysis: self.analysis.clone(),
            model_timeout: Duration::from_secs(self.model_timeout_secs),
            max_concurrency: self.max_concurrency,
            recommendation_ttl: Duration::from_secs(self.recommendation_ttl_secs),
        }
    }
}
