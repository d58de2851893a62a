//! Supplier adapters and the fan-out aggregator.
//!
//! Each supplier backend is reached through a [`SupplierAdapter`]; the
//! registry fixes the priority order that drives merge determinism.

pub mod adapter;
pub mod aggregator;

pub use adapter::HttpSupplierAdapter;
pub use aggregator::{AggregatorConfig, SupplierAggregator};

use crate::models::SupplierApiResponse;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

/// One supplier backend.
///
/// `fetch` never returns an error: every outcome, including failures, is
/// encoded as a [`SupplierApiResponse`] so the aggregator can preserve it
/// for observability.
#[async_trait]
pub trait SupplierAdapter: Send + Sync + 'static {
    /// Supplier name as it appears in responses and merge provenance
    fn name(&self) -> &str;

    /// Merge priority (lower = higher priority)
    fn priority(&self) -> u32;

    /// Fetch component data for one part
    async fn fetch(&self, mpn: &str, manufacturer: Option<&str>) -> SupplierApiResponse;
}

/// Fixed table of registered suppliers, ordered by priority.
///
/// The order is the tie-break and fill order for the aggregator merge;
/// permuting response arrival order cannot change the merge outcome.
pub struct SupplierRegistry {
    adapters: Vec<Arc<dyn SupplierAdapter>>,
}

impl SupplierRegistry {
    pub fn new() -> Self {
        Self {
            adapters: Vec::new(),
        }
    }

    /// Register an adapter; ordering is fixed by a later `sort_by_priority`
    pub fn register(&mut self, adapter: Arc<dyn SupplierAdapter>) {
        debug!(supplier = adapter.name(), priority = adapter.priority(), "Registered supplier");
        self.adapters.push(adapter);
    }

    /// Sort adapters by priority (lower number first)
    pub fn sort_by_priority(&mut self) {
        self.adapters.sort_by_key(|a| a.priority());
    }

    /// Adapters in priority order
    pub fn adapters(&self) -> &[Arc<dyn SupplierAdapter>] {
        &self.adapters
    }

    /// Position of a supplier in the priority order
    pub fn rank_of(&self, name: &str) -> Option<usize> {
        self.adapters.iter().position(|a| a.name() == name)
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl Default for SupplierRegistry {
    fn default() -> Self {
        Self::new()
    }
}
