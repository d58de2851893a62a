//! Shared fixtures for integration tests.

#![allow(dead_code)]

use async_trait::async_trait;
use bom_enricher::config::PipelineConfig;
use bom_enricher::error::{AppError, Result};
use bom_enricher::models::{
    AggregatedSupplierData, AiEnhancementResult, ComponentFields, EnrichmentJob,
    EnrichmentPipelineResult, NormalizedComponentData, SupplierApiResponse,
};
use bom_enricher::pipeline::{
    Enhancer, PipelineOrchestrator, QualityScorer, QualityWeights, RuleBasedNormalizer,
};
use bom_enricher::progress::{BroadcasterConfig, ProgressBroadcaster};
use bom_enricher::storage::{CatalogStore, InMemoryCatalogStore};
use bom_enricher::suppliers::{
    AggregatorConfig, SupplierAdapter, SupplierAggregator, SupplierRegistry,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

/// Supplier adapter that always returns a clone of one response
pub struct FixedSupplier {
    name: String,
    priority: u32,
    response: SupplierApiResponse,
}

impl FixedSupplier {
    pub fn new(name: &str, priority: u32, response: SupplierApiResponse) -> Self {
        Self {
            name: name.to_string(),
            priority,
            response,
        }
    }
}

#[async_trait]
impl SupplierAdapter for FixedSupplier {
    fn name(&self) -> &str {
        &self.name
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn fetch(&self, _mpn: &str, _manufacturer: Option<&str>) -> SupplierApiResponse {
        self.response.clone()
    }
}

/// Enhancer that returns a fixed result
pub struct FixedEnhancer {
    result: AiEnhancementResult,
}

impl FixedEnhancer {
    pub fn new(description_quality: f64, confidences: Vec<(&str, f64)>) -> Self {
        let mut confidence_scores = HashMap::new();
        for (field, score) in confidences {
            confidence_scores.insert(field.to_string(), score);
        }
        Self {
            result: AiEnhancementResult {
                enhanced_fields: confidence_scores.keys().cloned().collect(),
                confidence_scores,
                suggested_category: Some("op-amp".to_string()),
                description_quality: Some(description_quality),
                data: serde_json::json!({}),
            },
        }
    }
}

#[async_trait]
impl Enhancer for FixedEnhancer {
    async fn enhance(
        &self,
        _normalized: &NormalizedComponentData,
        _aggregated: &AggregatedSupplierData,
    ) -> Result<AiEnhancementResult> {
        Ok(self.result.clone())
    }
}

/// Enhancer that never finishes inside any reasonable step deadline
pub struct StalledEnhancer;

#[async_trait]
impl Enhancer for StalledEnhancer {
    async fn enhance(
        &self,
        _normalized: &NormalizedComponentData,
        _aggregated: &AggregatedSupplierData,
    ) -> Result<AiEnhancementResult> {
        tokio::time::sleep(Duration::from_secs(60)).await;
        Ok(AiEnhancementResult::default())
    }
}

/// Store whose writes always fail
pub struct FailingStore;

#[async_trait]
impl CatalogStore for FailingStore {
    async fn save(&self, _result: &EnrichmentPipelineResult) -> Result<Uuid> {
        Err(AppError::Storage("disk unavailable".to_string()))
    }

    async fn get(&self, _component_id: &Uuid) -> Result<Option<EnrichmentPipelineResult>> {
        Ok(None)
    }

    async fn find_by_part(
        &self,
        _mpn: &str,
        _manufacturer: Option<&str>,
    ) -> Result<Option<EnrichmentPipelineResult>> {
        Ok(None)
    }

    async fn count(&self) -> Result<u64> {
        Ok(0)
    }
}

/// Rich component data for the primary supplier (5 of 7 known fields)
pub fn rich_fields() -> ComponentFields {
    ComponentFields {
        description: Some("Dual operational amplifier".to_string()),
        category: Some("op-amp".to_string()),
        datasheet_url: Some("https://supplier.example.com/ds/LM358.pdf".to_string()),
        package: Some("SOIC-8".to_string()),
        unit_price: Some(0.12),
        ..Default::default()
    }
}

/// Complementary data that fills the remaining known fields
pub fn sparse_fields() -> ComponentFields {
    ComponentFields {
        lifecycle_status: Some("active".to_string()),
        stock_qty: Some(54_000),
        ..Default::default()
    }
}

/// Everything needed to run jobs through a real pipeline in-process
pub struct TestPipeline {
    pub orchestrator: PipelineOrchestrator,
    pub broadcaster: Arc<ProgressBroadcaster>,
    pub store: Arc<dyn CatalogStore>,
}

pub struct TestPipelineBuilder {
    suppliers: Vec<FixedSupplier>,
    enhancer: Option<Arc<dyn Enhancer>>,
    store: Option<Arc<dyn CatalogStore>>,
    config: PipelineConfig,
}

impl TestPipelineBuilder {
    pub fn new() -> Self {
        Self {
            suppliers: Vec::new(),
            enhancer: None,
            store: None,
            config: PipelineConfig::default(),
        }
    }

    pub fn supplier(mut self, supplier: FixedSupplier) -> Self {
        self.suppliers.push(supplier);
        self
    }

    pub fn enhancer(mut self, enhancer: Arc<dyn Enhancer>) -> Self {
        self.enhancer = Some(enhancer);
        self
    }

    pub fn store(mut self, store: Arc<dyn CatalogStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn configure(mut self, f: impl FnOnce(&mut PipelineConfig)) -> Self {
        f(&mut self.config);
        self
    }

    pub fn build(self) -> TestPipeline {
        let mut registry = SupplierRegistry::new();
        for supplier in self.suppliers {
            registry.register(Arc::new(supplier));
        }
        registry.sort_by_priority();

        let aggregator = Arc::new(SupplierAggregator::new(
            Arc::new(registry),
            AggregatorConfig {
                cache_ttl_secs: 0,
                ..Default::default()
            },
        ));
        let broadcaster = Arc::new(ProgressBroadcaster::new(BroadcasterConfig::default()));
        let store = self
            .store
            .unwrap_or_else(|| Arc::new(InMemoryCatalogStore::new()));

        let orchestrator = PipelineOrchestrator::new(
            Arc::new(RuleBasedNormalizer::new()),
            aggregator,
            self.enhancer,
            QualityScorer::new(QualityWeights::default()),
            Arc::clone(&store),
            Arc::clone(&broadcaster),
            self.config,
        );

        TestPipeline {
            orchestrator,
            broadcaster,
            store,
        }
    }
}

pub fn job(mpn: &str, manufacturer: Option<&str>) -> EnrichmentJob {
    EnrichmentJob::new(
        Uuid::new_v4(),
        mpn.to_string(),
        manufacturer.map(String::from),
        10,
    )
}
