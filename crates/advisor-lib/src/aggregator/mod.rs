//! Metrics aggregation
//!
//! Reduces raw CloudWatch time series (ECS utilization and ALB target group
//! metrics) for one service into a compact [`MetricsSummary`](crate::models::MetricsSummary). Pure
//! computation: no external calls and no shared state.

mod metric;
mod summarize;


pub use metric::MetricKind;
pub use summarize::Aggregator;
