//! Core data models for the scaling advisor

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Identity of one analysed service
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ServiceKey {
    pub account_id: String,
    pub cluster_name: String,
    pub service_name: String,
}

impl ServiceKey {
    pub fn new(
        account_id: impl Into<String>,
        cluster_name: impl Into<String>,
        service_name: impl Into<String>,
    ) -> Self {
        Self {
            account_id: account_id.into(),
            cluster_name: cluster_name.into(),
            service_name: service_name.into(),
        }
    }
}

impl fmt::Display for ServiceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.account_id, self.cluster_name, self.service_name)
    }
}

/// Statistical summary of one service over the analysis window.
///
/// Every statistic is optional: `None` means "no data", which is never the
/// same thing as a measured zero.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MetricsSummary {
    pub cpu_avg: Option<f64>,
    pub cpu_max: Option<f64>,
    pub memory_avg: Option<f64>,
    pub memory_max: Option<f64>,
    pub desired_count: Option<u32>,
    pub running_count: Option<u32>,
    pub healthy_hosts_avg: Option<f64>,
    pub healthy_hosts_max: Option<f64>,
    pub unhealthy_hosts_avg: Option<f64>,
    pub unhealthy_hosts_max: Option<f64>,
    pub response_time_avg: Option<f64>,
    pub response_time_max: Option<f64>,
    pub request_count_avg: Option<f64>,
    pub request_count_max: Option<f64>,
    pub http_2xx: Option<u64>,
    pub http_3xx: Option<u64>,
    pub http_4xx: Option<u64>,
    /// `(3xx + 4xx) / 2xx * 100`, zero when no 2xx traffic was seen
    pub error_percentage: Option<f64>,
    /// Set when load balancer data exists but no successful requests were served
    #[serde(default)]
    pub traffic_absent: bool,
}

impl MetricsSummary {
    /// Set the HTTP status counters and derive `error_percentage` from them
    pub fn with_http_counts(mut self, http_2xx: u64, http_3xx: u64, http_4xx: u64) -> Self {
        self.http_2xx = Some(http_2xx);
        self.http_3xx = Some(http_3xx);
        self.http_4xx = Some(http_4xx);
        let (percentage, traffic_absent) = error_percentage(http_2xx, http_3xx, http_4xx);
        self.error_percentage = Some(percentage);
        self.traffic_absent = traffic_absent;
        self
    }

    /// True when any load balancer statistic is present
    pub fn has_alb_data(&self) -> bool {
        self.healthy_hosts_avg.is_some()
            || self.unhealthy_hosts_avg.is_some()
            || self.response_time_avg.is_some()
            || self.request_count_avg.is_some()
            || self.http_2xx.is_some()
            || self.http_3xx.is_some()
            || self.http_4xx.is_some()
    }

    /// True when neither CPU nor memory utilization is known
    pub fn utilization_unavailable(&self) -> bool {
        self.cpu_avg.is_none() && self.memory_avg.is_none()
    }
}

/// Error percentage rounded to two decimals, plus the "no traffic" flag
pub fn error_percentage(http_2xx: u64, http_3xx: u64, http_4xx: u64) -> (f64, bool) {
    if http_2xx == 0 {
        return (0.0, true);
    }
    let errors = http_3xx.saturating_add(http_4xx) as f64;
    let raw = errors / http_2xx as f64 * 100.0;
    ((raw * 100.0).round() / 100.0, false)
}

/// Summary of a window of log lines
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogSummary {
    pub total_count: u64,
    pub error_count: u64,
    pub warning_count: u64,
    pub top_error_signatures: Vec<ErrorSignature>,
}

/// One frequent error pattern and how often it matched
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorSignature {
    pub pattern: String,
    pub count: u64,
}

impl ErrorSignature {
    pub fn new(pattern: impl Into<String>, count: u64) -> Self {
        Self {
            pattern: pattern.into(),
            count,
        }
    }
}

/// Parse failure for one of the enumerated recommendation fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownVariant {
    pub field: &'static str,
    pub value: String,
}

impl fmt::Display for UnknownVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "'{}' is not an allowed {} value", self.value, self.field)
    }
}

impl std::error::Error for UnknownVariant {}

/// Declares a lowercase string enum with its allowed-value table
macro_rules! vocabulary {
    (
        $(#[$meta:meta])*
        $name:ident, $field:literal {
            $($variant:ident => $text:literal),+ $(,)?
        }
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(rename_all = "snake_case")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            /// Every allowed value, in declaration order
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            pub fn as_str(&self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }

            /// Allowed string values, as advertised to the model
            pub fn allowed_values() -> Vec<&'static str> {
                Self::ALL.iter().map(|v| v.as_str()).collect()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl FromStr for $name {
            type Err = UnknownVariant;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    other => Err(UnknownVariant {
                        field: $field,
                        value: other.to_string(),
                    }),
                }
            }
        }
    };
}

vocabulary! {
    /// Overall health verdict for a service
    ServiceHealth, "service_health" {
        Good => "good",
        Warning => "warning",
        Critical => "critical",
        Error => "error",
    }
}

vocabulary! {
    /// Capacity change to apply to a service
    ScalingAction, "scaling_action" {
        ScaleUp => "scale_up",
        ScaleDown => "scale_down",
        NoChange => "no_change",
    }
}

vocabulary! {
    /// Urgency of acting on a recommendation
    Priority, "priority" {
        High => "high",
        Medium => "medium",
        Low => "low",
    }
}

vocabulary! {
    /// Which path produced a recommendation
    RecommendationSource, "source" {
        Ai => "ai",
        Fallback => "fallback",
    }
}

impl ServiceHealth {
    /// Dashboard ordering: critical first, good last
    pub fn rank(&self) -> u8 {
        match self {
            ServiceHealth::Critical => 0,
            ServiceHealth::Warning => 1,
            ServiceHealth::Error => 2,
            ServiceHealth::Good => 3,
        }
    }
}

impl Priority {
    /// Dashboard ordering: high first
    pub fn rank(&self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }
}

/// Capacity the recommendation suggests moving to
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SuggestedCapacity {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub desired_count: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cpu_units: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_mb: Option<f64>,
}

/// Scaling recommendation for one service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommendationRecord {
    #[serde(flatten)]
    pub key: ServiceKey,
    pub service_health: ServiceHealth,
    pub scaling_action: ScalingAction,
    pub priority: Priority,
    pub reason: String,
    pub recommendations: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_capacity: Option<SuggestedCapacity>,
    pub generated_at: DateTime<Utc>,
    pub source: RecommendationSource,
}

impl RecommendationRecord {
    /// The `(health, action, priority)` triple of this record
    pub fn triple(&self) -> (ServiceHealth, ScalingAction, Priority) {
        (self.service_health, self.scaling_action, self.priority)
    }
}

/// Raw per-service metrics as fetched from CloudWatch
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawServiceMetrics {
    #[serde(default)]
    pub desired_count: Option<u32>,
    #[serde(default)]
    pub running_count: Option<u32>,
    #[serde(default)]
    pub series: Vec<MetricSeries>,
}

/// One metric time series, optionally scoped to a dimension such as a target group
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricSeries {
    pub metric: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dimension: Option<String>,
    #[serde(default)]
    pub samples: Vec<RawSample>,
}

/// A `(timestamp, value)` datapoint before validation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawSample {
    pub timestamp: String,
    pub value: RawValue,
}

impl RawSample {
    pub fn new(timestamp: impl Into<String>, value: f64) -> Self {
        Self {
            timestamp: timestamp.into(),
            value: RawValue::Number(value),
        }
    }
}

/// Sample value as it arrived; text must still parse as a number.
///
/// Any other JSON (`null`, booleans, objects) is kept as `Other` so the
/// aggregator rejects it per service instead of failing the whole payload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Number(f64),
    Text(String),
    Other(serde_json::Value),
}

/// Everything needed to analyse one service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceAnalysisRequest {
    pub account_id: String,
    pub cluster_name: String,
    pub service_name: String,
    #[serde(default)]
    pub metrics: RawServiceMetrics,
    #[serde(default)]
    pub logs: Vec<String>,
}

impl ServiceAnalysisRequest {
    pub fn key(&self) -> ServiceKey {
        ServiceKey::new(&self.account_id, &self.cluster_name, &self.service_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_percentage_scenario() {
        let summary = MetricsSummary::default().with_http_counts(1000, 20, 30);
        assert_eq!(summary.error_percentage, Some(5.0));
        assert!(!summary.traffic_absent);
        assert!(summary.has_alb_data());
    }

    #[test]
    fn test_error_percentage_without_traffic() {
        let summary = MetricsSummary::default().with_http_counts(0, 4, 9);
        assert_eq!(summary.error_percentage, Some(0.0));
        assert!(summary.traffic_absent);
    }

    #[test]
    fn test_error_percentage_rounding() {
        let (pct, absent) = error_percentage(3, 1, 0);
        assert_eq!(pct, 33.33);
        assert!(!absent);
    }

    #[test]
    fn test_default_summary_has_no_alb_data() {
        let summary = MetricsSummary::default();
        assert!(!summary.has_alb_data());
        assert!(summary.utilization_unavailable());
        assert_eq!(summary.error_percentage, None);
    }

    #[test]
    fn test_vocabulary_parsing_is_strict() {
        assert_eq!("scale_up".parse::<ScalingAction>().unwrap(), ScalingAction::ScaleUp);
        assert_eq!("critical".parse::<ServiceHealth>().unwrap(), ServiceHealth::Critical);
        let err = "High".parse::<Priority>().unwrap_err();
        assert_eq!(err.field, "priority");
        assert!("".parse::<ServiceHealth>().is_err());
    }

    #[test]
    fn test_allowed_values_follow_declaration_order() {
        assert_eq!(
            ServiceHealth::allowed_values(),
            vec!["good", "warning", "critical", "error"]
        );
        assert_eq!(Priority::allowed_values(), vec!["high", "medium", "low"]);
    }

    #[test]
    fn test_record_serializes_flat_identity() {
        let record = RecommendationRecord {
            key: ServiceKey::new("111122223333", "prod", "api"),
            service_health: ServiceHealth::Good,
            scaling_action: ScalingAction::NoChange,
            priority: Priority::Low,
            reason: "steady".to_string(),
            recommendations: vec![],
            suggested_capacity: None,
            generated_at: Utc::now(),
            source: RecommendationSource::Fallback,
        };
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["account_id"], "111122223333");
        assert_eq!(json["service_health"], "good");
        assert_eq!(json["source"], "fallback");

        let back: RecommendationRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }

    #[test]
    fn test_raw_value_accepts_numeric_text() {
        let sample: RawSample =
            serde_json::from_str(r#"{"timestamp":"2024-05-01T00:00:00Z","value":"12.5"}"#)
                .unwrap();
        assert_eq!(sample.value, RawValue::Text("12.5".to_string()));
    }

    #[test]
    fn test_raw_value_keeps_non_numeric_json() {
        let sample: RawSample =
            serde_json::from_str(r#"{"timestamp":"2024-05-01T00:00:00Z","value":null}"#).unwrap();
        assert_eq!(sample.value, RawValue::Other(serde_json::Value::Null));

        let sample: RawSample =
            serde_json::from_str(r#"{"timestamp":"2024-05-01T00:00:00Z","value":{"avg":3}}"#)
                .unwrap();
        assert!(matches!(sample.value, RawValue::Other(serde_json::Value::Object(_))));
    }
}
