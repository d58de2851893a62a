pub mod handlers;
pub mod routes;

pub use routes::*;

use crate::progress::ProgressBroadcaster;
use crate::service::EnrichmentService;
use crate::storage::CatalogStore;
use std::sync::Arc;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<EnrichmentService>,
    pub store: Arc<dyn CatalogStore>,
    pub broadcaster: Arc<ProgressBroadcaster>,
    pub prometheus_enabled: bool,
}

impl AppState {
    pub fn new(
        service: Arc<EnrichmentService>,
        store: Arc<dyn CatalogStore>,
        broadcaster: Arc<ProgressBroadcaster>,
    ) -> Self {
        Self {
            service,
            store,
            broadcaster,
            prometheus_enabled: true,
        }
    }

    pub fn with_prometheus(mut self, enabled: bool) -> Self {
        self.prometheus_enabled = enabled;
        self
    }
}
