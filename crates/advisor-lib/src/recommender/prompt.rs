//! Structured prompt payloads for the text-generation call
//!
//! The payload carries the thresholds in force and the exact response schema
//! so the model answers in the classifier's vocabulary.

use crate::config::{MetricsWindow, Thresholds};
use crate::models::{
    LogSummary, MetricsSummary, Priority, ScalingAction, ServiceHealth, ServiceKey,
};
use serde::{Deserialize, Serialize};

/// Payload format version
pub const PROMPT_VERSION: &str = "1";

/// Enumerated values the response must use
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSchema {
    pub required_fields: Vec<String>,
    pub optional_fields: Vec<String>,
    pub service_health: Vec<String>,
    pub scaling_action: Vec<String>,
    pub priority: Vec<String>,
    /// Shape of the optional `suggested_capacity` object
    pub suggested_capacity: Vec<String>,
}

impl Default for ResponseSchema {
    fn default() -> Self {
        let owned = |values: Vec<&str>| -> Vec<String> {
            values.into_iter().map(str::to_string).collect()
        };
        Self {
            required_fields: owned(vec![
                "service_health",
                "scaling_action",
                "priority",
                "reason",
                "recommendations",
            ]),
            optional_fields: owned(vec!["suggested_capacity"]),
            // "error" is reserved for missing data and never requested from the model
            service_health: owned(
                ServiceHealth::ALL
                    .iter()
                    .filter(|h| **h != ServiceHealth::Error)
                    .map(|h| h.as_str())
                    .collect(),
            ),
            scaling_action: owned(ScalingAction::allowed_values()),
            priority: owned(Priority::allowed_values()),
            suggested_capacity: owned(vec!["desired_count", "cpu_units", "memory_mb"]),
        }
    }
}

/// Structured, versioned input to the text-generation model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PromptPayload {
    pub version: String,
    pub context: ServiceKey,
    pub window: MetricsWindow,
    pub metrics: MetricsSummary,
    pub logs: LogSummary,
    pub thresholds: Thresholds,
    pub response_schema: ResponseSchema,
    pub instructions: Vec<String>,
}

impl PromptPayload {
    /// Text prompt for models that take a single message
    pub fn render(&self) -> String {
        let body = serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string());
        let mut prompt = String::from(
            "You are an AWS ECS infrastructure expert. Analyze the service described by the \
             JSON payload below and recommend a scaling decision.\n\n",
        );
        for (i, instruction) in self.instructions.iter().enumerate() {
            prompt.push_str(&format!("{}. {}\n", i + 1, instruction));
        }
        prompt.push_str("\nPAYLOAD:\n");
        prompt.push_str(&body);
        prompt.push('\n');
        prompt
    }
}

/// Builds prompt payloads from one configuration surface
#[derive(Debug, Clone, Default)]
pub struct PromptBuilder {
    thresholds: Thresholds,
    window: MetricsWindow,
}

impl PromptBuilder {
    pub fn new(thresholds: Thresholds, window: MetricsWindow) -> Self {
        Self { thresholds, window }
    }

    pub fn build(
        &self,
        context: &ServiceKey,
        metrics: &MetricsSummary,
        logs: &LogSummary,
    ) -> PromptPayload {
        PromptPayload {
            version: PROMPT_VERSION.to_string(),
            context: context.clone(),
            window: self.window.clone(),
            metrics: metrics.clone(),
            logs: logs.clone(),
            thresholds: self.thresholds.clone(),
            response_schema: ResponseSchema::default(),
            instructions: self.instructions(),
        }
    }

    fn instructions(&self) -> Vec<String> {
        let t = &self.thresholds;
        vec![
            format!(
                "Metrics cover the last {} days in {}-second buckets; absent (null) fields mean no data, not zero.",
                self.window.metrics_window_days, self.window.metrics_period_seconds
            ),
            format!(
                "An average of {} or more unhealthy targets makes the service critical with high priority.",
                t.unhealthy_host_threshold
            ),
            format!(
                "CPU >= {}% or memory >= {}% needs scale_up; with response time >= {}s the priority is high.",
                t.cpu_high_threshold, t.memory_high_threshold, t.response_time_high_threshold
            ),
            format!(
                "An error_percentage >= {}% is a warning even without a capacity change.",
                t.error_rate_high_threshold
            ),
            format!(
                "CPU below {}% and memory below {}% for the whole window may be over-provisioned (scale_down).",
                t.cpu_high_threshold / 2.0,
                t.memory_high_threshold / 2.0
            ),
            "Use the log summary to explain application-level issues.".to_string(),
            "Provide 5-10 specific, actionable recommendations.".to_string(),
            "Respond only with one JSON object using exactly the fields and values in response_schema.".to_string(),
        ]
    }
}

/// Build a payload with explicit thresholds and window
pub fn build_prompt(
    context: &ServiceKey,
    metrics: &MetricsSummary,
    logs: &LogSummary,
    thresholds: &Thresholds,
    window: &MetricsWindow,
) -> PromptPayload {
    PromptBuilder::new(thresholds.clone(), window.clone()).build(context, metrics, logs)
}
