//! Recommendation persistence
//!
//! The pipeline only depends on the [`RecommendationStore`] contract; the
//! in-memory adapter backs the service and the tests.

mod memory;
mod overview;


pub use memory::{InMemoryStore, DEFAULT_RECOMMENDATION_TTL};
pub use overview::{sort_for_dashboard, AccountOverview};

use crate::error::StoreError;
use crate::models::{Priority, RecommendationRecord, ServiceHealth, ServiceKey};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Optional health and priority constraints for account queries
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationFilter {
    #[serde(default)]
    pub health: Option<ServiceHealth>,
    #[serde(default)]
    pub priority: Option<Priority>,
}

impl RecommendationFilter {
    pub fn with_health(mut self, health: ServiceHealth) -> Self {
        self.health = Some(health);
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = Some(priority);
        self
    }

    pub fn matches(&self, record: &RecommendationRecord) -> bool {
        self.health.map_or(true, |h| record.service_health == h)
            && self.priority.map_or(true, |p| record.priority == p)
    }
}

/// Storage contract for recommendation records
///
/// A `put` replaces any record with the same key. Records past their TTL
/// are never returned. `query` ordering is unspecified.
#[async_trait]
pub trait RecommendationStore: Send + Sync {
    async fn put(&self, record: RecommendationRecord, ttl: Duration) -> Result<(), StoreError>;

    async fn get(&self, key: &ServiceKey) -> Result<Option<RecommendationRecord>, StoreError>;

    async fn query(
        &self,
        account_id: &str,
        filter: &RecommendationFilter,
    ) -> Result<Vec<RecommendationRecord>, StoreError>;

    /// Number of unexpired records
    async fn len(&self) -> usize;
}
