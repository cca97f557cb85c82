//! Observability infrastructure for the scaling advisor
//!
//! Provides:
//! - Prometheus metrics (analysis outcomes, model latency, fallback causes, store size)
//! - Structured JSON logging with tracing

use crate::models::{RecommendationRecord, ServiceKey};
use prometheus::{
    register_histogram, register_int_counter, register_int_counter_vec, register_int_gauge,
    Histogram, IntCounter, IntCounterVec, IntGauge,
};
use std::sync::OnceLock;
use tracing::{info, warn};

/// Histogram buckets for analysis and model latency (in seconds)
const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Global metrics instance (registered once)
static GLOBAL_METRICS: OnceLock<AdvisorMetricsInner> = OnceLock::new();

struct AdvisorMetricsInner {
    analyses_total: IntCounterVec,
    validation_rejections: IntCounter,
    fallbacks_total: IntCounterVec,
    classifier_disagreements: IntCounter,
    store_errors: IntCounter,
    analysis_latency_seconds: Histogram,
    model_latency_seconds: Histogram,
    stored_recommendations: IntGauge,
}

impl AdvisorMetricsInner {
    fn new() -> Self {
        Self {
            analyses_total: register_int_counter_vec!(
                "ecs_advisor_analyses_total",
                "Recommendations produced, by source",
                &["source"]
            )
            .expect("Failed to register analyses_total"),

            validation_rejections: register_int_counter!(
                "ecs_advisor_validation_rejections_total",
                "Analysis requests rejected because of malformed metrics or configuration"
            )
            .expect("Failed to register validation_rejections_total"),

            fallbacks_total: register_int_counter_vec!(
                "ecs_advisor_fallbacks_total",
                "Rule-based fallbacks, by cause",
                &["cause"]
            )
            .expect("Failed to register fallbacks_total"),

            classifier_disagreements: register_int_counter!(
                "ecs_advisor_classifier_disagreements_total",
                "Model recommendations whose triple differs from the rule-based classification"
            )
            .expect("Failed to register classifier_disagreements_total"),

            store_errors: register_int_counter!(
                "ecs_advisor_store_errors_total",
                "Failed recommendation store writes"
            )
            .expect("Failed to register store_errors_total"),

            analysis_latency_seconds: register_histogram!(
                "ecs_advisor_analysis_latency_seconds",
                "End-to-end time to analyze one service",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register analysis_latency_seconds"),

            model_latency_seconds: register_histogram!(
                "ecs_advisor_model_latency_seconds",
                "Time spent waiting on the text-generation model",
                LATENCY_BUCKETS.to_vec()
            )
            .expect("Failed to register model_latency_seconds"),

            stored_recommendations: register_int_gauge!(
                "ecs_advisor_stored_recommendations",
                "Unexpired recommendations held by the store"
            )
            .expect("Failed to register stored_recommendations"),
        }
    }
}

/// Advisor metrics for Prometheus exposition
///
/// Lightweight handle to the global metrics instance; clones share the
/// same underlying metrics.
#[derive(Clone)]
pub struct AdvisorMetrics {
    _private: (),
}

impl Default for AdvisorMetrics {
    fn default() -> Self {
        Self::new()
    }
}

impl AdvisorMetrics {
    /// Create a new metrics handle (initializes global metrics if needed)
    pub fn new() -> Self {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new);
        Self { _private: () }
    }

    fn inner(&self) -> &AdvisorMetricsInner {
        GLOBAL_METRICS.get_or_init(AdvisorMetricsInner::new)
    }

    pub fn inc_analyses(&self, source: &str) {
        self.inner().analyses_total.with_label_values(&[source]).inc();
    }

    pub fn inc_validation_rejections(&self) {
        self.inner().validation_rejections.inc();
    }

    pub fn inc_fallbacks(&self, cause: &str) {
        self.inner().fallbacks_total.with_label_values(&[cause]).inc();
    }

    pub fn inc_classifier_disagreements(&self) {
        self.inner().classifier_disagreements.inc();
    }

    pub fn inc_store_errors(&self) {
        self.inner().store_errors.inc();
    }

    pub fn observe_analysis_latency(&self, duration_secs: f64) {
        self.inner().analysis_latency_seconds.observe(duration_secs);
    }

    pub fn observe_model_latency(&self, duration_secs: f64) {
        self.inner().model_latency_seconds.observe(duration_secs);
    }

    pub fn set_stored_recommendations(&self, count: i64) {
        self.inner().stored_recommendations.set(count);
    }

    /// Current count for one source label
    pub fn analyses(&self, source: &str) -> u64 {
        self.inner().analyses_total.with_label_values(&[source]).get()
    }
}

/// Structured logger for advisor events
#[derive(Clone)]
pub struct StructuredLogger {
    instance: String,
}

impl StructuredLogger {
    pub fn new(instance: impl Into<String>) -> Self {
        Self {
            instance: instance.into(),
        }
    }

    /// Log a stored recommendation
    pub fn log_recommendation(&self, record: &RecommendationRecord) {
        info!(
            event = "recommendation_generated",
            instance = %self.instance,
            account_id = %record.key.account_id,
            cluster = %record.key.cluster_name,
            service = %record.key.service_name,
            service_health = %record.service_health,
            scaling_action = %record.scaling_action,
            priority = %record.priority,
            source = %record.source,
            "Generated scaling recommendation"
        );
    }

    /// Log that the rule-based path replaced the model answer
    pub fn log_fallback(&self, key: &ServiceKey, cause: &str, details: &str) {
        warn!(
            event = "fallback_used",
            instance = %self.instance,
            service = %key,
            cause = %cause,
            details = %details,
            "Model output unusable, using rule-based classification"
        );
    }

    /// Log a request rejected before any recommendation was produced
    pub fn log_rejection(&self, key: &ServiceKey, error: &str) {
        warn!(
            event = "analysis_rejected",
            instance = %self.instance,
            service = %key,
            error = %error,
            "Analysis request rejected"
        );
    }

    pub fn log_store_failure(&self, key: &ServiceKey, error: &str) {
        warn!(
            event = "store_write_failed",
            instance = %self.instance,
            service = %key,
            error = %error,
            "Failed to persist recommendation"
        );
    }

    pub fn log_startup(&self, version: &str, model_configured: bool) {
        info!(
            event = "advisor_started",
            instance = %self.instance,
            advisor_version = %version,
            model_configured = model_configured,
            "Scaling advisor started"
        );
    }

    pub fn log_shutdown(&self, reason: &str) {
        info!(
            event = "advisor_shutdown",
            instance = %self.instance,
            reason = %reason,
            "Scaling advisor shutting down"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_advisor_metrics_shared_handle() {
        let metrics = AdvisorMetrics::new();
        let clone = metrics.clone();

        let before = metrics.analyses("ai");
        clone.inc_analyses("ai");
        assert!(metrics.analyses("ai") > before);

        metrics.observe_analysis_latency(0.01);
        metrics.observe_model_latency(0.2);
        metrics.inc_fallbacks("model_timeout");
        metrics.set_stored_recommendations(3);
    }

    #[test]
    fn test_structured_logger_creation() {
        let logger = StructuredLogger::new("advisor-0");
        assert_eq!(logger.instance, "advisor-0");
    }
}
