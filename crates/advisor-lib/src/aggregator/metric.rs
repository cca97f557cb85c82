//! CloudWatch metric names understood by the aggregator

use crate::error::ValidationError;
use std::fmt;
use std::str::FromStr;

/// Metric kinds that contribute to a [`MetricsSummary`](crate::models::MetricsSummary)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum MetricKind {
    Cpu,
    Memory,
    HealthyHosts,
    UnhealthyHosts,
    ResponseTime,
    RequestCount,
    Http2xx,
    Http3xx,
    Http4xx,
}

impl MetricKind {
    pub const ALL: [MetricKind; 9] = [
        MetricKind::Cpu,
        MetricKind::Memory,
        MetricKind::HealthyHosts,
        MetricKind::UnhealthyHosts,
        MetricKind::ResponseTime,
        MetricKind::RequestCount,
        MetricKind::Http2xx,
        MetricKind::Http3xx,
        MetricKind::Http4xx,
    ];

    /// CloudWatch metric name (AWS/ECS or AWS/ApplicationELB namespace)
    pub fn cloudwatch_name(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "CPUUtilization",
            MetricKind::Memory => "MemoryUtilization",
            MetricKind::HealthyHosts => "HealthyHostCount",
            MetricKind::UnhealthyHosts => "UnHealthyHostCount",
            MetricKind::ResponseTime => "TargetResponseTime",
            MetricKind::RequestCount => "RequestCount",
            MetricKind::Http2xx => "HTTPCode_Target_2XX_Count",
            MetricKind::Http3xx => "HTTPCode_Target_3XX_Count",
            MetricKind::Http4xx => "HTTPCode_Target_4XX_Count",
        }
    }

    /// Short alias accepted in hand-written input files
    pub fn alias(&self) -> &'static str {
        match self {
            MetricKind::Cpu => "cpu",
            MetricKind::Memory => "memory",
            MetricKind::HealthyHosts => "healthy_hosts",
            MetricKind::UnhealthyHosts => "unhealthy_hosts",
            MetricKind::ResponseTime => "response_time",
            MetricKind::RequestCount => "request_count",
            MetricKind::Http2xx => "http_2xx",
            MetricKind::Http3xx => "http_3xx",
            MetricKind::Http4xx => "http_4xx",
        }
    }

    /// Load balancer metrics are absent for services without an ALB
    pub fn is_load_balancer(&self) -> bool {
        !matches!(self, MetricKind::Cpu | MetricKind::Memory)
    }
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.cloudwatch_name())
    }
}

impl FromStr for MetricKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        MetricKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.cloudwatch_name() == s || kind.alias() == s)
            .ok_or_else(|| ValidationError::UnknownMetric(s.to_string()))
    }
}
