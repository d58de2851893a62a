//! AI enhancement step contract and the HTTP-backed implementation.
//!
//! Model internals are out of scope; the enhancement service is an
//! external collaborator reached through the resilient client.

use crate::error::{AppError, Result};
use crate::httpclient::{OutboundRequest, ResilientHttpClient};
use crate::models::{AggregatedSupplierData, AiEnhancementResult, NormalizedComponentData};
use async_trait::async_trait;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

/// Produces enhanced/inferred fields from normalized + aggregated data
#[async_trait]
pub trait Enhancer: Send + Sync + 'static {
    async fn enhance(
        &self,
        normalized: &NormalizedComponentData,
        aggregated: &AggregatedSupplierData,
    ) -> Result<AiEnhancementResult>;
}

/// Enhancer backed by an external enhancement endpoint.
///
/// Posts the normalized triple plus the merged supplier record; the
/// endpoint answers with the [`AiEnhancementResult`] contract shape.
pub struct ApiEnhancer {
    endpoint: String,
    timeout: Duration,
    client: ResilientHttpClient,
}

impl ApiEnhancer {
    pub fn new(endpoint: String, timeout_secs: u64, client: ResilientHttpClient) -> Self {
        Self {
            endpoint,
            timeout: Duration::from_secs(timeout_secs),
            client,
        }
    }
}

#[async_trait]
impl Enhancer for ApiEnhancer {
    async fn enhance(
        &self,
        normalized: &NormalizedComponentData,
        aggregated: &AggregatedSupplierData,
    ) -> Result<AiEnhancementResult> {
        let payload = json!({
            "mpn": normalized.mpn,
            "manufacturer": normalized.manufacturer,
            "category": normalized.category,
            "merged_data": aggregated.merged_data,
            "best_source": aggregated.best_source,
        });

        let request =
            OutboundRequest::post(self.endpoint.clone(), payload).with_timeout(self.timeout);

        let response = self.client.execute(request).await.map_err(|e| {
            AppError::Upstream {
                source_name: "ai-enhancement".to_string(),
                message: e.to_string(),
            }
        })?;

        let result: AiEnhancementResult = response.json()?;

        debug!(
            mpn = %normalized.mpn,
            enhanced_fields = result.enhanced_fields.len(),
            suggested_category = result.suggested_category.as_deref().unwrap_or(""),
            "Enhancement completed"
        );

        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::httpclient::HttpClientConfig;

    #[test]
    fn test_enhancer_construction() {
        let client = ResilientHttpClient::new(HttpClientConfig::default()).unwrap();
        let enhancer = ApiEnhancer::new("https://ai.example.com/enhance".to_string(), 15, client);
        assert_eq!(enhancer.timeout, Duration::from_secs(15));
    }
}
