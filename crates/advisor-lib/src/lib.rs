//! Advisor library for ECS service scaling recommendations
//!
//! This crate provides the core functionality for:
//! - Aggregating CloudWatch time series into per-service summaries
//! - Scanning application logs for error signatures
//! - Building model requests and interpreting free-text answers
//! - Rule-based classification when the model answer is unusable
//! - Recommendation storage, health checks and observability

pub mod aggregator;
pub mod config;
pub mod error;
pub mod health;
pub mod logs;
pub mod models;
pub mod observability;
pub mod recommender;
pub mod store;

pub use config::{AnalysisConfig, MetricsWindow, PatternKind, PatternSpec, Thresholds};
pub use error::{AnalysisError, InterpretationFallback, StoreError, ValidationError};
pub use health::{
    ComponentHealth, ComponentStatus, HealthRegistry, HealthResponse, ReadinessResponse,
};
pub use models::*;
pub use observability::{AdvisorMetrics, StructuredLogger};
pub use recommender::{
    AnalysisPipeline, Classifier, InterpretContext, Interpreter, PipelineConfig, PromptBuilder,
    PromptPayload, TextGenerator,
};
pub use store::{AccountOverview, InMemoryStore, RecommendationFilter, RecommendationStore};
