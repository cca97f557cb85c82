//! Error taxonomy for the recommendation pipeline

use std::time::Duration;
use thiserror::Error;

/// Malformed primary input or configuration. The only error that leaves the core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("unknown metric '{0}'")]
    UnknownMetric(String),

    #[error("metric {metric}: value '{value}' is not numeric")]
    NonNumeric { metric: String, value: String },

    #[error("metric {metric}: value {value} is not finite")]
    NonFinite { metric: String, value: f64 },

    #[error("metric {metric}: value {value} is negative")]
    Negative { metric: String, value: f64 },

    #[error("metric {metric}: invalid timestamp '{timestamp}': {reason}")]
    InvalidTimestamp {
        metric: String,
        timestamp: String,
        reason: String,
    },

    #[error("log pattern '{name}': {reason}")]
    InvalidPattern { name: String, reason: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Why the interpreter switched to the rule-based classifier.
///
/// Always recovered locally; rendered into the fallback record's reason.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpretationFallback {
    #[error("the model response contained no structured object")]
    NoStructuredObject,

    #[error("the model response could not be decoded: {0}")]
    Decode(String),

    #[error("the model response failed validation: {0}")]
    Invalid(String),

    #[error("no text-generation model is configured")]
    ModelUnavailable,

    #[error("the text-generation call failed: {0}")]
    ModelFailed(String),

    #[error("the text-generation call timed out after {0:?}")]
    ModelTimeout(Duration),
}

impl InterpretationFallback {
    /// Short label used for metrics and structured logs
    pub fn label(&self) -> &'static str {
        match self {
            InterpretationFallback::NoStructuredObject => "no_object",
            InterpretationFallback::Decode(_) => "decode",
            InterpretationFallback::Invalid(_) => "invalid",
            InterpretationFallback::ModelUnavailable => "model_unavailable",
            InterpretationFallback::ModelFailed(_) => "model_failed",
            InterpretationFallback::ModelTimeout(_) => "model_timeout",
        }
    }
}

/// Failure reported by a recommendation store adapter
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// Why one service in a batch produced no record
#[derive(Debug, Error)]
pub enum AnalysisError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("analysis task aborted: {0}")]
    Aborted(String),
}
