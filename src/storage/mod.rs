//! Catalog storage boundary.
//!
//! The pipeline treats storage as an opaque durable sink: records are
//! keyed by component ID and retrievable by canonical part identity
//! (MPN + manufacturer). Backends are selected by configuration through
//! [`factory::create_store`].

pub mod factory;
pub mod memory;
pub mod sled_store;

pub use factory::create_store;
pub use memory::InMemoryCatalogStore;
pub use sled_store::SledCatalogStore;

use crate::error::Result;
use crate::models::EnrichmentPipelineResult;
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Durable sink for terminal enrichment results
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Persist a terminal result, assigning a component ID on first save
    async fn save(&self, result: &EnrichmentPipelineResult) -> Result<Uuid>;

    /// Fetch a record by component ID
    async fn get(&self, component_id: &Uuid) -> Result<Option<EnrichmentPipelineResult>>;

    /// Fetch the record for a canonical part identity
    async fn find_by_part(
        &self,
        mpn: &str,
        manufacturer: Option<&str>,
    ) -> Result<Option<EnrichmentPipelineResult>>;

    /// Number of stored records
    async fn count(&self) -> Result<u64>;
}

/// Deterministic fingerprint of a part identity, the key of the
/// part-to-component index
pub fn part_fingerprint(mpn: &str, manufacturer: Option<&str>) -> String {
    let mut hasher = Sha256::new();
    hasher.update(mpn.to_uppercase().as_bytes());
    hasher.update(b"|");
    hasher.update(
        manufacturer
            .map(str::to_lowercase)
            .unwrap_or_default()
            .as_bytes(),
    );
    format!("{:x}", hasher.finalize())
}
