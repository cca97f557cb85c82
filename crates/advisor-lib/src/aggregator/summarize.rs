//! Reduction of raw CloudWatch series into a [`MetricsSummary`]
//!
//! Samples are validated up front, then the window is anchored at the newest
//! sample so the same input always yields the same summary.

use super::MetricKind;
use crate::config::MetricsWindow;
use crate::error::ValidationError;
use crate::models::{error_percentage, MetricsSummary, RawSample, RawServiceMetrics, RawValue};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::collections::HashMap;
use tracing::debug;

/// Running average/maximum for one metric
#[derive(Debug, Clone, Copy, Default)]
struct Accumulator {
    sum: f64,
    count: u64,
    max: f64,
}

impl Accumulator {
    fn add(&mut self, value: f64) {
        if self.count == 0 || value > self.max {
            self.max = value;
        }
        self.sum += value;
        self.count += 1;
    }

    fn avg(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sum / self.count as f64)
    }

    fn max(&self) -> Option<f64> {
        (self.count > 0).then_some(self.max)
    }

    fn total(&self) -> Option<u64> {
        (self.count > 0).then(|| self.sum.round() as u64)
    }
}

/// A validated datapoint
#[derive(Debug, Clone, Copy)]
struct Sample {
    kind: MetricKind,
    timestamp: DateTime<Utc>,
    value: f64,
}

/// Turns raw time series for one service into a summary
#[derive(Debug, Clone, Default)]
pub struct Aggregator {
    window: MetricsWindow,
}

impl Aggregator {
    pub fn new(window: MetricsWindow) -> Self {
        Self { window }
    }

    /// Summarize every series of a service.
    ///
    /// Rejects the whole input on the first malformed sample.
    pub fn summarize(&self, raw: &RawServiceMetrics) -> Result<MetricsSummary, ValidationError> {
        self.window.validate()?;

        let mut samples = Vec::new();
        for series in &raw.series {
            let kind: MetricKind = series.metric.parse()?;
            for sample in &series.samples {
                samples.push(parse_sample(kind, sample)?);
            }
        }

        let mut accumulators: HashMap<MetricKind, Accumulator> = HashMap::new();
        if let Some(newest) = samples.iter().map(|s| s.timestamp).max() {
            // None when the window reaches past the calendar's start: keep everything
            let cutoff =
                newest.checked_sub_signed(Duration::seconds(self.window.window_seconds()));
            let in_window = |s: &&Sample| cutoff.map_or(true, |c| s.timestamp > c);
            for sample in samples.iter().filter(in_window) {
                accumulators.entry(sample.kind).or_default().add(sample.value);
            }
            debug!(
                samples = samples.len(),
                window_start = ?cutoff,
                window_end = %newest,
                "Aggregated metric samples"
            );
        }

        let stat = |kind: MetricKind| accumulators.get(&kind).copied().unwrap_or_default();

        let mut summary = MetricsSummary {
            cpu_avg: stat(MetricKind::Cpu).avg(),
            cpu_max: stat(MetricKind::Cpu).max(),
            memory_avg: stat(MetricKind::Memory).avg(),
            memory_max: stat(MetricKind::Memory).max(),
            desired_count: raw.desired_count,
            running_count: raw.running_count,
            healthy_hosts_avg: stat(MetricKind::HealthyHosts).avg(),
            healthy_hosts_max: stat(MetricKind::HealthyHosts).max(),
            unhealthy_hosts_avg: stat(MetricKind::UnhealthyHosts).avg(),
            unhealthy_hosts_max: stat(MetricKind::UnhealthyHosts).max(),
            response_time_avg: stat(MetricKind::ResponseTime).avg(),
            response_time_max: stat(MetricKind::ResponseTime).max(),
            request_count_avg: stat(MetricKind::RequestCount).avg(),
            request_count_max: stat(MetricKind::RequestCount).max(),
            http_2xx: stat(MetricKind::Http2xx).total(),
            http_3xx: stat(MetricKind::Http3xx).total(),
            http_4xx: stat(MetricKind::Http4xx).total(),
            error_percentage: None,
            traffic_absent: false,
        };

        // A service without a load balancer keeps every ALB field absent
        if accumulators.keys().any(MetricKind::is_load_balancer) {
            let (pct, traffic_absent) = error_percentage(
                summary.http_2xx.unwrap_or(0),
                summary.http_3xx.unwrap_or(0),
                summary.http_4xx.unwrap_or(0),
            );
            summary.error_percentage = Some(pct);
            summary.traffic_absent = traffic_absent;
        }

        Ok(summary)
    }
}

/// RFC 3339, or ISO 8601 without an offset read as UTC
fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    match DateTime::parse_from_rfc3339(text) {
        Ok(ts) => Ok(ts.with_timezone(&Utc)),
        Err(rfc_err) => NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S%.f")
            .map(|naive| Utc.from_utc_datetime(&naive))
            .map_err(|_| rfc_err),
    }
}

fn parse_sample(kind: MetricKind, sample: &RawSample) -> Result<Sample, ValidationError> {
    let metric = || kind.cloudwatch_name().to_string();

    let timestamp = parse_timestamp(sample.timestamp.trim()).map_err(|e| {
        ValidationError::InvalidTimestamp {
            metric: metric(),
            timestamp: sample.timestamp.clone(),
            reason: e.to_string(),
        }
    })?;

    let value = match &sample.value {
        RawValue::Number(v) => *v,
        RawValue::Text(text) => {
            text.trim()
                .parse::<f64>()
                .map_err(|_| ValidationError::NonNumeric {
                    metric: metric(),
                    value: text.clone(),
                })?
        }
        RawValue::Other(other) => {
            return Err(ValidationError::NonNumeric {
                metric: metric(),
                value: other.to_string(),
            })
        }
    };

    if !value.is_finite() {
        return Err(ValidationError::NonFinite {
            metric: metric(),
            value,
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative {
            metric: metric(),
            value,
        });
    }

    Ok(Sample {
        kind,
        timestamp,
        value,
    })
}
