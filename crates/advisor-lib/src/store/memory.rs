//! Concurrent in-memory store with per-record expiry

use super::{RecommendationFilter, RecommendationStore};
use crate::error::StoreError;
use crate::models::{RecommendationRecord, ServiceKey};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default lifetime of a stored recommendation (7 days)
pub const DEFAULT_RECOMMENDATION_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

#[derive(Debug, Clone)]
struct StoredRecord {
    record: RecommendationRecord,
    /// `None` when the TTL is too large to represent
    expires_at: Option<Instant>,
}

impl StoredRecord {
    fn is_expired(&self, now: Instant) -> bool {
        self.expires_at.map_or(false, |at| now >= at)
    }
}

/// DashMap-backed store; expiry is evaluated on read
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    records: Arc<DashMap<ServiceKey, StoredRecord>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drop expired records, returning how many were removed
    pub fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let before = self.records.len();
        self.records.retain(|_, stored| !stored.is_expired(now));
        let removed = before.saturating_sub(self.records.len());
        if removed > 0 {
            debug!(removed = removed, "Purged expired recommendations");
        }
        removed
    }
}

#[async_trait]
impl RecommendationStore for InMemoryStore {
    async fn put(&self, record: RecommendationRecord, ttl: Duration) -> Result<(), StoreError> {
        let expires_at = Instant::now().checked_add(ttl);
        self.records
            .insert(record.key.clone(), StoredRecord { record, expires_at });
        Ok(())
    }

    async fn get(&self, key: &ServiceKey) -> Result<Option<RecommendationRecord>, StoreError> {
        let now = Instant::now();
        let found = self
            .records
            .get(key)
            .filter(|stored| !stored.is_expired(now))
            .map(|stored| stored.record.clone());
        Ok(found)
    }

    async fn query(
        &self,
        account_id: &str,
        filter: &RecommendationFilter,
    ) -> Result<Vec<RecommendationRecord>, StoreError> {
        let now = Instant::now();
        let records = self
            .records
            .iter()
            .filter(|entry| entry.key().account_id == account_id)
            .filter(|entry| !entry.value().is_expired(now))
            .map(|entry| entry.value().record.clone())
            .filter(|record| filter.matches(record))
            .collect();
        Ok(records)
    }

    async fn len(&self) -> usize {
        let now = Instant::now();
        self.records
            .iter()
            .filter(|entry| !entry.value().is_expired(now))
            .count()
    }
}
