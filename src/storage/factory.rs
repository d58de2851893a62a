use crate::config::{StorageBackend, StorageConfig};
use crate::error::{AppError, Result};
use crate::storage::{CatalogStore, InMemoryCatalogStore, SledCatalogStore};
use std::sync::Arc;

/// Create a catalog store from configuration
pub fn create_store(config: &StorageConfig) -> Result<Arc<dyn CatalogStore>> {
    match config.backend {
        StorageBackend::Memory => {
            tracing::info!("Initializing in-memory catalog store");
            Ok(Arc::new(InMemoryCatalogStore::new()))
        }

        StorageBackend::Sled => {
            let path = config.path.as_ref().ok_or_else(|| {
                AppError::Configuration(
                    "Sled backend requires 'path' configuration".to_string(),
                )
            })?;

            tracing::info!(path = ?path, "Initializing Sled catalog store");

            let store = SledCatalogStore::new(path)?;
            Ok(Arc::new(store))
        }
    }
}
