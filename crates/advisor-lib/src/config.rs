//! Analysis configuration shared by the classifier, the prompt builder and
//! the log scanner.
//!
//! Thresholds live in exactly one place so the prompt sent to the model and
//! the rule-based fallback always agree.

use crate::error::ValidationError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Default CPU utilization threshold (percent)
pub const DEFAULT_CPU_HIGH: f64 = 80.0;

/// Default memory utilization threshold (percent)
pub const DEFAULT_MEMORY_HIGH: f64 = 80.0;

/// Default target response time threshold (seconds)
pub const DEFAULT_RESPONSE_TIME_HIGH: f64 = 1.0;

/// Default HTTP error rate threshold (percent)
pub const DEFAULT_ERROR_RATE_HIGH: f64 = 5.0;

/// Default average unhealthy target count that marks a service critical
pub const DEFAULT_UNHEALTHY_HOSTS: f64 = 1.0;

/// Lookback window (7 days)
pub const DEFAULT_WINDOW_DAYS: u32 = 7;

/// Bucket granularity (1 hour)
pub const DEFAULT_PERIOD_SECONDS: u32 = 3600;

/// Number of error signatures kept in a log summary
pub const DEFAULT_TOP_SIGNATURES: usize = 5;

/// Classification thresholds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Thresholds {
    pub cpu_high_threshold: f64,
    pub memory_high_threshold: f64,
    pub response_time_high_threshold: f64,
    pub error_rate_high_threshold: f64,
    pub unhealthy_host_threshold: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            cpu_high_threshold: DEFAULT_CPU_HIGH,
            memory_high_threshold: DEFAULT_MEMORY_HIGH,
            response_time_high_threshold: DEFAULT_RESPONSE_TIME_HIGH,
            error_rate_high_threshold: DEFAULT_ERROR_RATE_HIGH,
            unhealthy_host_threshold: DEFAULT_UNHEALTHY_HOSTS,
        }
    }
}

impl Thresholds {
    pub fn validate(&self) -> Result<(), ValidationError> {
        let named = [
            ("cpu_high_threshold", self.cpu_high_threshold),
            ("memory_high_threshold", self.memory_high_threshold),
            ("response_time_high_threshold", self.response_time_high_threshold),
            ("error_rate_high_threshold", self.error_rate_high_threshold),
            ("unhealthy_host_threshold", self.unhealthy_host_threshold),
        ];
        for (name, value) in named {
            if !value.is_finite() || value <= 0.0 {
                return Err(ValidationError::InvalidConfig(format!(
                    "{} must be a positive number, got {}",
                    name, value
                )));
            }
        }
        Ok(())
    }
}

/// Metrics lookback window and bucket size
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsWindow {
    pub metrics_window_days: u32,
    pub metrics_period_seconds: u32,
}

impl Default for MetricsWindow {
    fn default() -> Self {
        Self {
            metrics_window_days: DEFAULT_WINDOW_DAYS,
            metrics_period_seconds: DEFAULT_PERIOD_SECONDS,
        }
    }
}

impl MetricsWindow {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.metrics_window_days == 0 {
            return Err(ValidationError::InvalidConfig(
                "metrics_window_days must be at least 1".to_string(),
            ));
        }
        if self.metrics_period_seconds == 0 {
            return Err(ValidationError::InvalidConfig(
                "metrics_period_seconds must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    pub fn window_seconds(&self) -> i64 {
        i64::from(self.metrics_window_days) * 86_400
    }
}

/// What a log pattern signals when it matches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatternKind {
    #[default]
    Error,
    Warning,
}

/// Configured log matcher: exactly one of `substring` or `regex`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatternSpec {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub substring: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regex: Option<String>,
    #[serde(default)]
    pub kind: PatternKind,
    /// Only meaningful for substring matchers
    #[serde(default)]
    pub case_insensitive: bool,
}

impl PatternSpec {
    pub fn substring(needle: impl Into<String>) -> Self {
        Self {
            substring: Some(needle.into()),
            ..Default::default()
        }
    }

    pub fn regex(pattern: impl Into<String>) -> Self {
        Self {
            regex: Some(pattern.into()),
            ..Default::default()
        }
    }

    pub fn warning(mut self) -> Self {
        self.kind = PatternKind::Warning;
        self
    }

    pub fn ignore_case(mut self) -> Self {
        self.case_insensitive = true;
        self
    }
}

/// Default error signatures, tuned for ECS application logs
pub fn default_log_patterns() -> BTreeMap<String, PatternSpec> {
    let mut patterns = BTreeMap::new();
    patterns.insert(
        "GenericError".to_string(),
        PatternSpec::regex(r"(?i)\b(error|failed|failure)\b"),
    );
    patterns.insert("Exception".to_string(), PatternSpec::substring("exception").ignore_case());
    patterns.insert(
        "OutOfMemory".to_string(),
        PatternSpec::regex(r"(?i)out ?of ?memory|\bOOM\b"),
    );
    patterns.insert(
        "Connection".to_string(),
        PatternSpec::regex(r"(?i)connection (refused|reset|closed|error)"),
    );
    patterns.insert("Timeout".to_string(), PatternSpec::regex(r"(?i)time(d)? ?out"));
    patterns.insert(
        "PermissionDenied".to_string(),
        PatternSpec::regex(r"(?i)permission denied|access ?denied|unauthorized"),
    );
    patterns.insert(
        "Warning".to_string(),
        PatternSpec::regex(r"(?i)\bwarn(ing)?\b").warning(),
    );
    patterns
}

/// Full analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    #[serde(flatten)]
    pub thresholds: Thresholds,
    #[serde(flatten)]
    pub window: MetricsWindow,
    pub log_error_patterns: BTreeMap<String, PatternSpec>,
    pub top_signatures_limit: usize,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            thresholds: Thresholds::default(),
            window: MetricsWindow::default(),
            log_error_patterns: default_log_patterns(),
            top_signatures_limit: DEFAULT_TOP_SIGNATURES,
        }
    }
}

impl AnalysisConfig {
    /// Validate thresholds and window. Patterns are validated when compiled.
    pub fn validate(&self) -> Result<(), ValidationError> {
        self.thresholds.validate()?;
        self.window.validate()?;
        if self.top_signatures_limit == 0 {
            return Err(ValidationError::InvalidConfig(
                "top_signatures_limit must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
