use crate::models::{AggregatedSupplierData, SupplierApiResponse, SupplierResponseStatus};
use crate::suppliers::SupplierRegistry;
use dashmap::DashMap;
use futures::stream::{self, StreamExt};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{debug, warn};

/// Aggregator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AggregatorConfig {
    /// Per-supplier call timeout (milliseconds)
    pub call_timeout_ms: u64,

    /// Fan-out concurrency limit
    pub max_concurrent: usize,

    /// Response cache TTL (seconds); 0 disables the cache
    pub cache_ttl_secs: u64,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            call_timeout_ms: 10_000,
            max_concurrent: 8,
            cache_ttl_secs: 300,
        }
    }
}

/// Fans out one call per registered supplier, joins on all outcomes and
/// merges the successes into one best-effort record.
///
/// The join is a join-all, not a race: every supplier gets its full
/// timeout, and the aggregator finishes when the slowest call settles.
pub struct SupplierAggregator {
    registry: Arc<SupplierRegistry>,
    config: AggregatorConfig,
    /// (supplier, part) -> last successful response
    cache: DashMap<String, (SupplierApiResponse, Instant)>,
}

impl SupplierAggregator {
    pub fn new(registry: Arc<SupplierRegistry>, config: AggregatorConfig) -> Self {
        Self {
            registry,
            config,
            cache: DashMap::new(),
        }
    }

    /// Fan out to every registered supplier and merge the results
    pub async fn aggregate(
        &self,
        mpn: &str,
        manufacturer: Option<&str>,
    ) -> AggregatedSupplierData {
        let call_timeout = Duration::from_millis(self.config.call_timeout_ms);

        let adapters: Vec<Arc<dyn crate::suppliers::SupplierAdapter>> =
            self.registry.adapters().to_vec();
        let responses: Vec<SupplierApiResponse> = stream::iter(adapters)
            .map(|adapter| {
                let mpn = mpn.to_string();
                let manufacturer = manufacturer.map(String::from);

                async move {
                    match timeout(call_timeout, adapter.fetch(&mpn, manufacturer.as_deref())).await
                    {
                        Ok(response) => response,
                        Err(_) => SupplierApiResponse::error(
                            adapter.name().to_string(),
                            format!(
                                "Supplier call timed out after {}ms",
                                call_timeout.as_millis()
                            ),
                            call_timeout.as_millis() as u64,
                        ),
                    }
                }
            })
            .buffer_unordered(self.config.max_concurrent.max(1))
            .collect()
            .await;

        let responses = self.apply_cache(mpn, manufacturer, responses);

        for response in &responses {
            crate::metrics::record_supplier_response(
                &response.supplier,
                &response.status.to_string(),
            );
        }

        self.merge(mpn, manufacturer, responses)
    }

    /// Refresh the cache from live successes and backfill failed
    /// suppliers from previously cached data.
    ///
    /// `not_found` is authoritative and never backfilled.
    fn apply_cache(
        &self,
        mpn: &str,
        manufacturer: Option<&str>,
        responses: Vec<SupplierApiResponse>,
    ) -> Vec<SupplierApiResponse> {
        if self.config.cache_ttl_secs == 0 {
            return responses;
        }

        responses
            .into_iter()
            .map(|response| {
                let key = cache_key(&response.supplier, mpn, manufacturer);
                match response.status {
                    SupplierResponseStatus::Success => {
                        self.cache.insert(key, (response.clone(), Instant::now()));
                        response
                    }
                    SupplierResponseStatus::RateLimited | SupplierResponseStatus::Error => {
                        if let Some(mut cached) = self.cache_get(&key) {
                            warn!(
                                supplier = %response.supplier,
                                mpn,
                                error = response.error.as_deref().unwrap_or(""),
                                "Supplier failed, serving cached response"
                            );
                            cached.cached = true;
                            cached
                        } else {
                            response
                        }
                    }
                    SupplierResponseStatus::NotFound => response,
                }
            })
            .collect()
    }

    /// Deterministic merge over a response set.
    ///
    /// Depends only on the registry priority order: `best_source` is the
    /// success with the highest completeness (ties to the
    /// higher-priority supplier), `merged_data` fills gaps in priority
    /// order, first-writer-wins per field.
    pub fn merge(
        &self,
        mpn: &str,
        manufacturer: Option<&str>,
        mut responses: Vec<SupplierApiResponse>,
    ) -> AggregatedSupplierData {
        responses.sort_by_key(|r| self.registry.rank_of(&r.supplier).unwrap_or(usize::MAX));

        let mut best_source: Option<String> = None;
        let mut best_completeness = 0usize;
        let mut merged_data = None;

        for response in responses.iter().filter(|r| r.is_success()) {
            let data = match &response.data {
                Some(data) => data,
                None => continue,
            };

            let completeness = data.completeness();
            if best_source.is_none() || completeness > best_completeness {
                best_source = Some(response.supplier.clone());
                best_completeness = completeness;
            }

            match merged_data {
                None => merged_data = Some(data.clone()),
                Some(ref mut merged) => merged.merge_from(data),
            }
        }

        debug!(
            mpn,
            responses = responses.len(),
            successes = responses.iter().filter(|r| r.is_success()).count(),
            best_source = best_source.as_deref().unwrap_or("none"),
            "Supplier aggregation merged"
        );

        AggregatedSupplierData {
            mpn: mpn.to_string(),
            manufacturer: manufacturer.map(String::from),
            responses,
            best_source,
            merged_data,
        }
    }

    fn cache_get(&self, key: &str) -> Option<SupplierApiResponse> {
        let entry = self.cache.get(key)?;
        let (response, cached_at) = entry.value();

        if cached_at.elapsed().as_secs() < self.config.cache_ttl_secs {
            Some(response.clone())
        } else {
            drop(entry);
            self.cache.remove(key);
            None
        }
    }

    /// Drop expired cache entries
    pub fn clear_expired_cache(&self) {
        let ttl = self.config.cache_ttl_secs;
        self.cache
            .retain(|_, (_, cached_at)| cached_at.elapsed().as_secs() < ttl);
    }

    /// Number of cached responses
    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

fn cache_key(supplier: &str, mpn: &str, manufacturer: Option<&str>) -> String {
    format!(
        "{}|{}|{}",
        supplier,
        mpn.to_uppercase(),
        manufacturer.map(str::to_lowercase).unwrap_or_default()
    )
}
