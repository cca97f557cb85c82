//! Per-account rollups over stored recommendations

use crate::models::{
    Priority, RecommendationRecord, RecommendationSource, ScalingAction, ServiceHealth,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Distribution of an account's current recommendations
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountOverview {
    pub account_id: String,
    pub total_services: usize,
    pub health_distribution: BTreeMap<String, usize>,
    pub scaling_distribution: BTreeMap<String, usize>,
    pub priority_distribution: BTreeMap<String, usize>,
    pub source_distribution: BTreeMap<String, usize>,
    /// Newest `generated_at` among the records
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_generated_at: Option<DateTime<Utc>>,
}

fn zeroed(values: Vec<&'static str>) -> BTreeMap<String, usize> {
    values.into_iter().map(|v| (v.to_string(), 0)).collect()
}

impl AccountOverview {
    /// Every vocabulary value appears in the distributions, with zero counts included
    pub fn from_records(account_id: impl Into<String>, records: &[RecommendationRecord]) -> Self {
        let mut overview = Self {
            account_id: account_id.into(),
            total_services: records.len(),
            health_distribution: zeroed(ServiceHealth::allowed_values()),
            scaling_distribution: zeroed(ScalingAction::allowed_values()),
            priority_distribution: zeroed(Priority::allowed_values()),
            source_distribution: zeroed(RecommendationSource::allowed_values()),
            last_generated_at: records.iter().map(|r| r.generated_at).max(),
        };

        for record in records {
            *overview
                .health_distribution
                .entry(record.service_health.to_string())
                .or_default() += 1;
            *overview
                .scaling_distribution
                .entry(record.scaling_action.to_string())
                .or_default() += 1;
            *overview
                .priority_distribution
                .entry(record.priority.to_string())
                .or_default() += 1;
            *overview
                .source_distribution
                .entry(record.source.to_string())
                .or_default() += 1;
        }

        overview
    }

    /// Services needing attention soon (high priority)
    pub fn urgent(&self) -> usize {
        self.priority_distribution
            .get(Priority::High.as_str())
            .copied()
            .unwrap_or(0)
    }
}

/// Dashboard order: priority high..low, then health critical, warning, error, good, then key
pub fn sort_for_dashboard(records: &mut [RecommendationRecord]) {
    records.sort_by(|a, b| {
        a.priority
            .rank()
            .cmp(&b.priority.rank())
            .then_with(|| a.service_health.rank().cmp(&b.service_health.rank()))
            .then_with(|| a.key.cmp(&b.key))
    });
}
