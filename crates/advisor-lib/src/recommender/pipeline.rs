//! Analysis pipeline
//!
//! Runs one service through aggregation, log scanning, the model call and
//! interpretation, then hands the record to the store. Batches run one task
//! per service, bounded by a semaphore.

use super::interpret::{InterpretContext, Interpretation, Interpreter};
use super::{Classifier, PromptBuilder, PromptPayload, TextGenerator};
use crate::aggregator::Aggregator;
use crate::config::AnalysisConfig;
use crate::error::{AnalysisError, InterpretationFallback, ValidationError};
use crate::health::{components, HealthRegistry};
use crate::logs::LogScanner;
use crate::models::{
    LogSummary, MetricsSummary, RecommendationRecord, ServiceAnalysisRequest, ServiceKey,
};
use crate::observability::{AdvisorMetrics, StructuredLogger};
use crate::store::{RecommendationStore, DEFAULT_RECOMMENDATION_TTL};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Semaphore;
use tracing::{debug, warn};

/// Upper bound on one text-generation call
pub const DEFAULT_MODEL_TIMEOUT: Duration = Duration::from_secs(60);

/// Services analysed at the same time
pub const DEFAULT_MAX_CONCURRENCY: usize = 4;

/// Configuration for the analysis pipeline
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub analysis: AnalysisConfig,
    pub model_timeout: Duration,
    pub max_concurrency: usize,
    pub recommendation_ttl: Duration,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig::default(),
            model_timeout: DEFAULT_MODEL_TIMEOUT,
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            recommendation_ttl: DEFAULT_RECOMMENDATION_TTL,
        }
    }
}

impl PipelineConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.analysis.validate()?;
        if self.max_concurrency == 0 {
            return Err(ValidationError::InvalidConfig(
                "max_concurrency must be at least 1".to_string(),
            ));
        }
        if self.model_timeout.is_zero() {
            return Err(ValidationError::InvalidConfig(
                "model_timeout must be positive".to_string(),
            ));
        }
        Ok(())
    }
}

/// Result for one service of a batch
#[derive(Debug)]
pub struct BatchOutcome {
    pub key: ServiceKey,
    pub result: Result<RecommendationRecord, AnalysisError>,
}

/// End-to-end analysis of ECS services
pub struct AnalysisPipeline {
    aggregator: Aggregator,
    scanner: LogScanner,
    prompts: PromptBuilder,
    interpreter: Interpreter,
    generator: Option<Arc<dyn TextGenerator>>,
    store: Arc<dyn RecommendationStore>,
    model_timeout: Duration,
    ttl: Duration,
    limiter: Arc<Semaphore>,
    health: HealthRegistry,
    metrics: AdvisorMetrics,
    logger: StructuredLogger,
}

impl AnalysisPipeline {
    /// Validate the configuration and compile the log patterns
    pub fn new(
        config: PipelineConfig,
        store: Arc<dyn RecommendationStore>,
    ) -> Result<Self, ValidationError> {
        config.validate()?;
        let analysis = &config.analysis;

        Ok(Self {
            aggregator: Aggregator::new(analysis.window.clone()),
            scanner: LogScanner::from_config(analysis)?,
            prompts: PromptBuilder::new(analysis.thresholds.clone(), analysis.window.clone()),
            interpreter: Interpreter::new(Classifier::new(analysis.thresholds.clone())),
            generator: None,
            store,
            model_timeout: config.model_timeout,
            ttl: config.recommendation_ttl,
            limiter: Arc::new(Semaphore::new(config.max_concurrency)),
            health: HealthRegistry::new(),
            metrics: AdvisorMetrics::new(),
            logger: StructuredLogger::new("ecs-advisor"),
        })
    }

    pub fn with_generator(mut self, generator: Arc<dyn TextGenerator>) -> Self {
        self.generator = Some(generator);
        self
    }

    pub fn with_health(mut self, health: HealthRegistry) -> Self {
        self.health = health;
        self
    }

    pub fn with_logger(mut self, logger: StructuredLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn health(&self) -> &HealthRegistry {
        &self.health
    }

    pub fn store(&self) -> &Arc<dyn RecommendationStore> {
        &self.store
    }

    pub fn has_generator(&self) -> bool {
        self.generator.is_some()
    }

    /// Register the pipeline's components with the health registry
    pub async fn register_components(&self) {
        self.health.register(components::PIPELINE).await;
        self.health.register(components::STORE).await;
        if self.generator.is_some() {
            self.health.register(components::MODEL).await;
        } else {
            self.health
                .set_degraded(components::MODEL, "no text-generation model configured")
                .await;
        }
    }

    /// Summaries and prompt payload for a request, without calling the model
    pub fn prepare(
        &self,
        request: &ServiceAnalysisRequest,
    ) -> Result<(MetricsSummary, LogSummary, PromptPayload), ValidationError> {
        let summary = self.aggregator.summarize(&request.metrics)?;
        let logs = self.scanner.scan(&request.logs);
        let payload = self.prompts.build(&request.key(), &summary, &logs);
        Ok((summary, logs, payload))
    }

    /// Analyse one service and store the resulting record
    ///
    /// Only malformed input fails; model and store problems still yield a record.
    pub async fn analyze(
        &self,
        request: &ServiceAnalysisRequest,
        generated_at: DateTime<Utc>,
    ) -> Result<RecommendationRecord, ValidationError> {
        // The semaphore is never closed
        let _permit = self.limiter.acquire().await.ok();
        let started = Instant::now();
        let key = request.key();

        let (summary, logs, payload) = match self.prepare(request) {
            Ok(prepared) => prepared,
            Err(e) => {
                self.metrics.inc_validation_rejections();
                self.logger.log_rejection(&key, &e.to_string());
                return Err(e);
            }
        };

        let ctx = InterpretContext::new(key.clone(), generated_at).with_logs(logs);
        let interpretation = match self.call_model(&payload).await {
            Ok(text) => self.interpreter.interpret_detailed(&text, &summary, &ctx),
            Err(cause) => Interpretation {
                record: self.interpreter.fallback(&summary, &ctx, &cause),
                fallback: Some(cause),
                agrees_with_rules: true,
            },
        };

        if let Some(cause) = &interpretation.fallback {
            self.metrics.inc_fallbacks(cause.label());
            self.logger
                .log_fallback(&key, cause.label(), &cause.to_string());
        }
        if !interpretation.agrees_with_rules {
            self.metrics.inc_classifier_disagreements();
        }

        let record = interpretation.record;
        self.metrics.inc_analyses(record.source.as_str());
        self.persist(&record).await;
        self.logger.log_recommendation(&record);
        self.health.set_healthy(components::PIPELINE).await;
        self.metrics
            .observe_analysis_latency(started.elapsed().as_secs_f64());

        Ok(record)
    }

    /// Analyse many services concurrently; outcomes keep the input order
    pub async fn analyze_batch(
        self: &Arc<Self>,
        requests: Vec<ServiceAnalysisRequest>,
        generated_at: DateTime<Utc>,
    ) -> Vec<BatchOutcome> {
        let handles: Vec<_> = requests
            .into_iter()
            .map(|request| {
                let pipeline = Arc::clone(self);
                let key = request.key();
                let handle =
                    tokio::spawn(async move { pipeline.analyze(&request, generated_at).await });
                (key, handle)
            })
            .collect();

        let mut outcomes = Vec::with_capacity(handles.len());
        for (key, handle) in handles {
            let result = match handle.await {
                Ok(result) => result.map_err(AnalysisError::from),
                Err(e) => {
                    warn!(service = %key, error = %e, "Analysis task failed");
                    Err(AnalysisError::Aborted(e.to_string()))
                }
            };
            outcomes.push(BatchOutcome { key, result });
        }

        debug!(services = outcomes.len(), "Batch analysis completed");
        outcomes
    }

    async fn call_model(&self, payload: &PromptPayload) -> Result<String, InterpretationFallback> {
        let Some(generator) = &self.generator else {
            return Err(InterpretationFallback::ModelUnavailable);
        };

        let started = Instant::now();
        let outcome = tokio::time::timeout(self.model_timeout, generator.generate(payload)).await;
        self.metrics
            .observe_model_latency(started.elapsed().as_secs_f64());

        match outcome {
            Ok(Ok(text)) => {
                self.health.set_healthy(components::MODEL).await;
                Ok(text)
            }
            Ok(Err(e)) => {
                warn!(model = %generator.name(), error = %e, "Text generation failed, using fallback");
                self.health
                    .set_degraded(components::MODEL, format!("text generation failed: {}", e))
                    .await;
                Err(InterpretationFallback::ModelFailed(format!("{:#}", e)))
            }
            Err(_) => {
                warn!(model = %generator.name(), timeout = ?self.model_timeout, "Text generation timeout, using fallback");
                self.health
                    .set_degraded(components::MODEL, "text generation timed out")
                    .await;
                Err(InterpretationFallback::ModelTimeout(self.model_timeout))
            }
        }
    }

    async fn persist(&self, record: &RecommendationRecord) {
        match self.store.put(record.clone(), self.ttl).await {
            Ok(()) => {
                self.health.set_healthy(components::STORE).await;
                self.metrics
                    .set_stored_recommendations(self.store.len().await as i64);
            }
            Err(e) => {
                self.metrics.inc_store_errors();
                self.logger.log_store_failure(&record.key, &e.to_string());
                self.health
                    .record_failure(components::STORE, e.to_string())
                    .await;
            }
        }
    }
}
