use crate::error::{AppError, Result};
use crate::models::EnrichmentPipelineResult;
use crate::storage::{part_fingerprint, CatalogStore};
use async_trait::async_trait;
use sled::Db;
use std::path::Path;
use std::sync::Arc;
use uuid::Uuid;

/// Persistent catalog store using the Sled embedded database.
///
/// Records are JSON-encoded (step logs carry dynamic JSON payloads);
/// the part index maps fingerprints to bincode-encoded component IDs.
#[derive(Clone)]
pub struct SledCatalogStore {
    db: Arc<Db>,
    records_tree: sled::Tree,
    part_index_tree: sled::Tree,
}

impl SledCatalogStore {
    /// Open or create a Sled store at the specified path
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let db = sled::open(&path)
            .map_err(|e| AppError::Storage(format!("Failed to open Sled database: {}", e)))?;

        let records_tree = db
            .open_tree("components")
            .map_err(|e| AppError::Storage(format!("Failed to open components tree: {}", e)))?;

        let part_index_tree = db
            .open_tree("part_index")
            .map_err(|e| AppError::Storage(format!("Failed to open part index tree: {}", e)))?;

        tracing::info!(path = ?path.as_ref(), "Initialized Sled catalog store");

        Ok(Self {
            db: Arc::new(db),
            records_tree,
            part_index_tree,
        })
    }

    fn serialize_record(record: &EnrichmentPipelineResult) -> Result<Vec<u8>> {
        serde_json::to_vec(record)
            .map_err(|e| AppError::Storage(format!("Failed to serialize record: {}", e)))
    }

    fn deserialize_record(bytes: &[u8]) -> Result<EnrichmentPipelineResult> {
        serde_json::from_slice(bytes)
            .map_err(|e| AppError::Storage(format!("Failed to deserialize record: {}", e)))
    }

    fn record_key(id: &Uuid) -> Vec<u8> {
        id.as_bytes().to_vec()
    }
}

#[async_trait]
impl CatalogStore for SledCatalogStore {
    async fn save(&self, result: &EnrichmentPipelineResult) -> Result<Uuid> {
        let component_id = result.component_id.unwrap_or_else(Uuid::new_v4);

        let mut record = result.clone();
        record.component_id = Some(component_id);

        let bytes = Self::serialize_record(&record)?;
        self.records_tree
            .insert(Self::record_key(&component_id), bytes)
            .map_err(|e| AppError::Storage(format!("Failed to write record: {}", e)))?;

        let fingerprint = part_fingerprint(&record.mpn, record.manufacturer.as_deref());
        let id_bytes = bincode::serialize(&component_id)
            .map_err(|e| AppError::Storage(format!("Failed to serialize index entry: {}", e)))?;
        self.part_index_tree
            .insert(fingerprint.as_bytes(), id_bytes)
            .map_err(|e| AppError::Storage(format!("Failed to write part index: {}", e)))?;

        self.db
            .flush_async()
            .await
            .map_err(|e| AppError::Storage(format!("Failed to flush database: {}", e)))?;

        tracing::debug!(component_id = %component_id, "Catalog record persisted");
        Ok(component_id)
    }

    async fn get(&self, component_id: &Uuid) -> Result<Option<EnrichmentPipelineResult>> {
        match self
            .records_tree
            .get(Self::record_key(component_id))
            .map_err(|e| AppError::Storage(format!("Failed to read record: {}", e)))?
        {
            Some(bytes) => Ok(Some(Self::deserialize_record(&bytes)?)),
            None => Ok(None),
        }
    }

    async fn find_by_part(
        &self,
        mpn: &str,
        manufacturer: Option<&str>,
    ) -> Result<Option<EnrichmentPipelineResult>> {
        let fingerprint = part_fingerprint(mpn, manufacturer);
        match self
            .part_index_tree
            .get(fingerprint.as_bytes())
            .map_err(|e| AppError::Storage(format!("Failed to read part index: {}", e)))?
        {
            Some(bytes) => {
                let component_id: Uuid = bincode::deserialize(&bytes).map_err(|e| {
                    AppError::Storage(format!("Corrupt part index entry: {}", e))
                })?;
                self.get(&component_id).await
            }
            None => Ok(None),
        }
    }

    async fn count(&self) -> Result<u64> {
        Ok(self.records_tree.len() as u64)
    }
}
