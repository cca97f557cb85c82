//! Rule-based classification of a metrics summary
//!
//! The rules are evaluated in a fixed order and the first match wins. Several
//! conditions can hold at once, so the order itself is part of the contract.

use crate::config::Thresholds;
use crate::models::{MetricsSummary, Priority, ScalingAction, ServiceHealth};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which rule produced a classification
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassificationRule {
    UnhealthyTargets,
    SaturatedAndSlow,
    Saturated,
    HighErrorRate,
    Underutilized,
    MetricsUnavailable,
    Healthy,
}

impl ClassificationRule {
    pub fn describe(&self) -> &'static str {
        match self {
            ClassificationRule::UnhealthyTargets => {
                "Load balancer reports unhealthy targets for this service"
            }
            ClassificationRule::SaturatedAndSlow => {
                "Resource utilization is high and responses are slow"
            }
            ClassificationRule::Saturated => "Resource utilization is high",
            ClassificationRule::HighErrorRate => "HTTP error rate is above the threshold",
            ClassificationRule::Underutilized => {
                "CPU and memory stayed well below their thresholds for the whole window"
            }
            ClassificationRule::MetricsUnavailable => {
                "CPU and memory metrics are unavailable, service health cannot be assessed"
            }
            ClassificationRule::Healthy => "All observed metrics are within thresholds",
        }
    }
}

/// `(health, scaling_action, priority)` plus the rule that produced it
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    pub service_health: ServiceHealth,
    pub scaling_action: ScalingAction,
    pub priority: Priority,
    pub rule: ClassificationRule,
}

impl Classification {
    fn new(
        rule: ClassificationRule,
        service_health: ServiceHealth,
        scaling_action: ScalingAction,
        priority: Priority,
    ) -> Self {
        Self {
            service_health,
            scaling_action,
            priority,
            rule,
        }
    }

    pub fn triple(&self) -> (ServiceHealth, ScalingAction, Priority) {
        (self.service_health, self.scaling_action, self.priority)
    }
}

/// A single threshold observation used to explain a classification
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "finding", rename_all = "snake_case")]
pub enum Finding {
    UnhealthyTargets { avg: f64, threshold: f64 },
    HighCpu { avg: f64, threshold: f64 },
    HighMemory { avg: f64, threshold: f64 },
    SlowResponses { avg: f64, threshold: f64 },
    HighErrorRate { percentage: f64, threshold: f64 },
    NoSuccessfulTraffic,
    TasksBelowDesired { running: u32, desired: u32 },
    Underutilized { cpu_avg: f64, memory_avg: f64 },
    MetricsUnavailable,
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::UnhealthyTargets { avg, threshold } => write!(
                f,
                "{:.2} unhealthy targets on average (threshold {})",
                avg, threshold
            ),
            Finding::HighCpu { avg, threshold } => {
                write!(f, "CPU averaged {:.1}% (threshold {}%)", avg, threshold)
            }
            Finding::HighMemory { avg, threshold } => {
                write!(f, "memory averaged {:.1}% (threshold {}%)", avg, threshold)
            }
            Finding::SlowResponses { avg, threshold } => write!(
                f,
                "target response time averaged {:.3}s (threshold {}s)",
                avg, threshold
            ),
            Finding::HighErrorRate {
                percentage,
                threshold,
            } => write!(
                f,
                "3xx/4xx responses were {:.2}% of 2xx responses (threshold {}%)",
                percentage, threshold
            ),
            Finding::NoSuccessfulTraffic => {
                f.write_str("the load balancer served no successful requests in the window")
            }
            Finding::TasksBelowDesired { running, desired } => {
                write!(f, "{} of {} desired tasks are running", running, desired)
            }
            Finding::Underutilized {
                cpu_avg,
                memory_avg,
            } => write!(
                f,
                "CPU averaged {:.1}% and memory {:.1}%",
                cpu_avg, memory_avg
            ),
            Finding::MetricsUnavailable => f.write_str("no CPU or memory datapoints were returned"),
        }
    }
}

impl Finding {
    /// Action item suggested for this observation
    pub fn recommendation(&self) -> String {
        match self {
            Finding::UnhealthyTargets { .. } => {
                "Inspect failing target health checks and recent task stops".to_string()
            }
            Finding::HighCpu { .. } => {
                "High CPU usage detected - increase desired count or task CPU".to_string()
            }
            Finding::HighMemory { .. } => {
                "High memory usage detected - increase task memory or desired count".to_string()
            }
            Finding::SlowResponses { .. } => {
                "Slow target responses - prioritize scaling and profile slow endpoints".to_string()
            }
            Finding::HighErrorRate { .. } => {
                "Elevated 3xx/4xx rate - review client errors and redirects".to_string()
            }
            Finding::NoSuccessfulTraffic => {
                "Confirm the service is receiving traffic through its load balancer".to_string()
            }
            Finding::TasksBelowDesired { .. } => {
                "Investigate why running tasks are below the desired count".to_string()
            }
            Finding::Underutilized { .. } => {
                "Service looks over-provisioned - reduce desired count or task size".to_string()
            }
            Finding::MetricsUnavailable => {
                "Verify CloudWatch metrics collection and cloudwatch:GetMetricStatistics permissions"
                    .to_string()
            }
        }
    }
}

fn at_least(value: Option<f64>, threshold: f64) -> bool {
    value.map_or(false, |v| v >= threshold)
}

/// Maps a metrics summary to a classification using fixed thresholds
#[derive(Debug, Clone, Default)]
pub struct Classifier {
    thresholds: Thresholds,
}

impl Classifier {
    pub fn new(thresholds: Thresholds) -> Self {
        Self { thresholds }
    }

    /// Total over every summary, including one with all fields absent
    pub fn classify(&self, s: &MetricsSummary) -> Classification {
        use ClassificationRule as Rule;
        let t = &self.thresholds;

        if s.has_alb_data() && at_least(s.unhealthy_hosts_avg, t.unhealthy_host_threshold) {
            return Classification::new(
                Rule::UnhealthyTargets,
                ServiceHealth::Critical,
                ScalingAction::NoChange,
                Priority::High,
            );
        }

        let saturated = at_least(s.cpu_avg, t.cpu_high_threshold)
            || at_least(s.memory_avg, t.memory_high_threshold);

        if saturated && at_least(s.response_time_avg, t.response_time_high_threshold) {
            return Classification::new(
                Rule::SaturatedAndSlow,
                ServiceHealth::Warning,
                ScalingAction::ScaleUp,
                Priority::High,
            );
        }

        if saturated {
            return Classification::new(
                Rule::Saturated,
                ServiceHealth::Warning,
                ScalingAction::ScaleUp,
                Priority::Medium,
            );
        }

        if at_least(s.error_percentage, t.error_rate_high_threshold) {
            return Classification::new(
                Rule::HighErrorRate,
                ServiceHealth::Warning,
                ScalingAction::NoChange,
                Priority::Medium,
            );
        }

        if self.is_underutilized(s) {
            return Classification::new(
                Rule::Underutilized,
                ServiceHealth::Good,
                ScalingAction::ScaleDown,
                Priority::Low,
            );
        }

        if s.utilization_unavailable() {
            return Classification::new(
                Rule::MetricsUnavailable,
                ServiceHealth::Error,
                ScalingAction::NoChange,
                Priority::Low,
            );
        }

        Classification::new(
            Rule::Healthy,
            ServiceHealth::Good,
            ScalingAction::NoChange,
            Priority::Low,
        )
    }

    /// Both averages below half their threshold and no peak reaching the threshold
    fn is_underutilized(&self, s: &MetricsSummary) -> bool {
        let t = &self.thresholds;
        match (s.cpu_avg, s.memory_avg) {
            (Some(cpu), Some(memory)) => {
                cpu < t.cpu_high_threshold / 2.0
                    && memory < t.memory_high_threshold / 2.0
                    && s.cpu_max.map_or(true, |m| m < t.cpu_high_threshold)
                    && s.memory_max.map_or(true, |m| m < t.memory_high_threshold)
            }
            _ => false,
        }
    }

    /// Every observation worth reporting, not only the deciding one
    pub fn findings(&self, s: &MetricsSummary) -> Vec<Finding> {
        let t = &self.thresholds;
        let mut findings = Vec::new();

        if let Some(avg) = s.unhealthy_hosts_avg {
            if avg >= t.unhealthy_host_threshold {
                findings.push(Finding::UnhealthyTargets {
                    avg,
                    threshold: t.unhealthy_host_threshold,
                });
            }
        }
        if let Some(avg) = s.cpu_avg.filter(|v| *v >= t.cpu_high_threshold) {
            findings.push(Finding::HighCpu {
                avg,
                threshold: t.cpu_high_threshold,
            });
        }
        if let Some(avg) = s.memory_avg.filter(|v| *v >= t.memory_high_threshold) {
            findings.push(Finding::HighMemory {
                avg,
                threshold: t.memory_high_threshold,
            });
        }
        if let Some(avg) = s
            .response_time_avg
            .filter(|v| *v >= t.response_time_high_threshold)
        {
            findings.push(Finding::SlowResponses {
                avg,
                threshold: t.response_time_high_threshold,
            });
        }
        if let Some(percentage) = s
            .error_percentage
            .filter(|v| *v >= t.error_rate_high_threshold)
        {
            findings.push(Finding::HighErrorRate {
                percentage,
                threshold: t.error_rate_high_threshold,
            });
        }
        if s.traffic_absent {
            findings.push(Finding::NoSuccessfulTraffic);
        }
        if let (Some(running), Some(desired)) = (s.running_count, s.desired_count) {
            if running < desired {
                findings.push(Finding::TasksBelowDesired { running, desired });
            }
        }
        if self.is_underutilized(s) {
            if let (Some(cpu_avg), Some(memory_avg)) = (s.cpu_avg, s.memory_avg) {
                findings.push(Finding::Underutilized {
                    cpu_avg,
                    memory_avg,
                });
            }
        }
        if s.utilization_unavailable() {
            findings.push(Finding::MetricsUnavailable);
        }

        findings
    }
}

/// Classify with explicit thresholds
pub fn classify(summary: &MetricsSummary, thresholds: &Thresholds) -> Classification {
    Classifier::new(thresholds.clone()).classify(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classifier() -> Classifier {
        Classifier::default()
    }

    #[test]
    fn test_scenario_cpu_and_latency() {
        let summary = MetricsSummary {
            cpu_avg: Some(85.0),
            cpu_max: Some(92.0),
            memory_avg: Some(60.0),
            response_time_avg: Some(1.2),
            unhealthy_hosts_avg: Some(0.0),
            ..Default::default()
        }
        .with_http_counts(1000, 20, 30);

        assert_eq!(summary.error_percentage, Some(5.0));
        let c = classifier().classify(&summary);
        assert_eq!(c.rule, ClassificationRule::SaturatedAndSlow);
        assert_eq!(
            c.triple(),
            (ServiceHealth::Warning, ScalingAction::ScaleUp, Priority::High)
        );
    }

    #[test]
    fn test_unhealthy_targets_take_precedence() {
        let summary = MetricsSummary {
            cpu_avg: Some(95.0),
            memory_avg: Some(95.0),
            response_time_avg: Some(3.0),
            unhealthy_hosts_avg: Some(1.0),
            ..Default::default()
        };
        let c = classifier().classify(&summary);
        assert_eq!(c.service_health, ServiceHealth::Critical);
        assert_eq!(c.priority, Priority::High);
        assert_eq!(c.scaling_action, ScalingAction::NoChange);
    }

    #[test]
    fn test_high_cpu_without_alb() {
        let summary = MetricsSummary {
            cpu_avg: Some(80.0),
            memory_avg: Some(10.0),
            ..Default::default()
        };
        let c = classifier().classify(&summary);
        assert_eq!(c.rule, ClassificationRule::Saturated);
        assert_eq!(c.scaling_action, ScalingAction::ScaleUp);
        assert_eq!(c.priority, Priority::Medium);
    }

    #[test]
    fn test_high_memory_with_fast_responses() {
        let summary = MetricsSummary {
            cpu_avg: Some(20.0),
            memory_avg: Some(88.0),
            response_time_avg: Some(0.2),
            ..Default::default()
        };
        assert_eq!(classifier().classify(&summary).rule, ClassificationRule::Saturated);
    }

    #[test]
    fn test_high_cpu_outranks_error_rate() {
        let summary = MetricsSummary {
            cpu_avg: Some(90.0),
            memory_avg: Some(50.0),
            ..Default::default()
        }
        .with_http_counts(100, 10, 10);
        assert_eq!(classifier().classify(&summary).rule, ClassificationRule::Saturated);
    }

    #[test]
    fn test_error_rate_rule() {
        let summary = MetricsSummary {
            cpu_avg: Some(50.0),
            memory_avg: Some(50.0),
            ..Default::default()
        }
        .with_http_counts(100, 3, 3);
        let c = classifier().classify(&summary);
        assert_eq!(c.rule, ClassificationRule::HighErrorRate);
        assert_eq!(
            c.triple(),
            (ServiceHealth::Warning, ScalingAction::NoChange, Priority::Medium)
        );
    }

    #[test]
    fn test_no_traffic_is_not_an_error_rate() {
        let summary = MetricsSummary {
            cpu_avg: Some(50.0),
            memory_avg: Some(50.0),
            ..Default::default()
        }
        .with_http_counts(0, 50, 50);
        assert_eq!(classifier().classify(&summary).rule, ClassificationRule::Healthy);
        assert!(classifier()
            .findings(&summary)
            .contains(&Finding::NoSuccessfulTraffic));
    }

    #[test]
    fn test_underutilized_scales_down() {
        let summary = MetricsSummary {
            cpu_avg: Some(10.0),
            cpu_max: Some(30.0),
            memory_avg: Some(20.0),
            memory_max: Some(25.0),
            ..Default::default()
        };
        let c = classifier().classify(&summary);
        assert_eq!(c.rule, ClassificationRule::Underutilized);
        assert_eq!(c.scaling_action, ScalingAction::ScaleDown);
        assert_eq!(c.priority, Priority::Low);
    }

    #[test]
    fn test_underutilized_requires_sustained_low_usage() {
        let summary = MetricsSummary {
            cpu_avg: Some(10.0),
            cpu_max: Some(95.0),
            memory_avg: Some(20.0),
            ..Default::default()
        };
        assert_eq!(classifier().classify(&summary).rule, ClassificationRule::Healthy);
    }

    #[test]
    fn test_underutilized_requires_both_metrics() {
        let summary = MetricsSummary {
            cpu_avg: Some(5.0),
            ..Default::default()
        };
        assert_eq!(classifier().classify(&summary).rule, ClassificationRule::Healthy);
    }

    #[test]
    fn test_all_absent_is_error_not_good() {
        let c = classifier().classify(&MetricsSummary::default());
        assert_eq!(c.service_health, ServiceHealth::Error);
        assert_eq!(c.priority, Priority::Low);
        assert_eq!(c.scaling_action, ScalingAction::NoChange);
    }

    #[test]
    fn test_custom_thresholds() {
        let thresholds = Thresholds {
            cpu_high_threshold: 50.0,
            ..Default::default()
        };
        let summary = MetricsSummary {
            cpu_avg: Some(55.0),
            memory_avg: Some(10.0),
            ..Default::default()
        };
        assert_eq!(classify(&summary, &thresholds).rule, ClassificationRule::Saturated);
        assert_eq!(
            classify(&summary, &Thresholds::default()).rule,
            ClassificationRule::Healthy
        );
    }

    #[test]
    fn test_findings_list_every_breach() {
        let summary = MetricsSummary {
            cpu_avg: Some(85.0),
            memory_avg: Some(90.0),
            response_time_avg: Some(1.5),
            desired_count: Some(4),
            running_count: Some(3),
            ..Default::default()
        }
        .with_http_counts(100, 5, 5);
        let findings = classifier().findings(&summary);
        assert_eq!(findings.len(), 5);
        assert!(matches!(findings[0], Finding::HighCpu { .. }));
        assert!(matches!(findings[1], Finding::HighMemory { .. }));
        assert!(matches!(findings[2], Finding::SlowResponses { .. }));
        assert!(matches!(findings[3], Finding::HighErrorRate { .. }));
        assert_eq!(
            findings[4],
            Finding::TasksBelowDesired {
                running: 3,
                desired: 4
            }
        );
    }

    #[test]
    fn test_finding_text() {
        let f = Finding::HighCpu {
            avg: 85.04,
            threshold: 80.0,
        };
        assert_eq!(f.to_string(), "CPU averaged 85.0% (threshold 80%)");
        assert!(Finding::MetricsUnavailable.recommendation().contains("CloudWatch"));
    }
}
