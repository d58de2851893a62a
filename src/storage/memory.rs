use crate::error::Result;
use crate::models::EnrichmentPipelineResult;
use crate::storage::{part_fingerprint, CatalogStore};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use uuid::Uuid;

/// In-memory catalog store (for development and testing)
#[derive(Clone)]
pub struct InMemoryCatalogStore {
    records: Arc<DashMap<Uuid, EnrichmentPipelineResult>>,
    part_index: Arc<DashMap<String, Uuid>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self {
            records: Arc::new(DashMap::new()),
            part_index: Arc::new(DashMap::new()),
        }
    }
}

impl Default for InMemoryCatalogStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    async fn save(&self, result: &EnrichmentPipelineResult) -> Result<Uuid> {
        let component_id = result.component_id.unwrap_or_else(Uuid::new_v4);

        let mut record = result.clone();
        record.component_id = Some(component_id);

        let fingerprint = part_fingerprint(&record.mpn, record.manufacturer.as_deref());
        self.part_index.insert(fingerprint, component_id);
        self.records.insert(component_id, record);

        tracing::debug!(component_id = %component_id, "Catalog record saved");
        Ok(component_id)
    }

    async fn get(&self, component_id: &Uuid) -> Result<Option<EnrichmentPipelineResult>> {
        Ok(self.records.get(component_id).map(|entry| entry.clone()))
    }

    async fn find_by_part(
        &self,
        mpn: &str,
        manufacturer: Option<&str>,
    ) -> Result<Option<EnrichmentPipelineResult>> {
        let fingerprint = part_fingerprint(mpn, manufacturer);
        match self.part_index.get(&fingerprint) {
            Some(component_id) => self.get(&component_id).await,
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records.len() as u64)
    }
}
