//! Enrichment service: job queue, worker pool and result lookup.

use crate::error::{AppError, Result};
use crate::models::{EnrichmentJob, EnrichmentPipelineResult};
use crate::pipeline::PipelineOrchestrator;
use crate::progress::{BomProgress, ProgressBroadcaster};
use crate::suppliers::SupplierAggregator;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::sync::Mutex;
use tracing::info;
use uuid::Uuid;

/// Interval for cache/channel maintenance
const MAINTENANCE_INTERVAL_SECS: u64 = 60;

/// Owns the bounded job queue and the worker pool that drains it.
///
/// Jobs run to a terminal state regardless of watchers; terminal results
/// are indexed by item for lookup before (and after) the catalog write.
pub struct EnrichmentService {
    orchestrator: Arc<PipelineOrchestrator>,
    broadcaster: Arc<ProgressBroadcaster>,
    job_tx: mpsc::Sender<EnrichmentJob>,
    // TODO: evict entries once the terminal record is readable from the
    // catalog store, so the index stays bounded
    results: Arc<DashMap<Uuid, EnrichmentPipelineResult>>,
}

impl EnrichmentService {
    /// Create the service and start its workers
    pub fn new(
        orchestrator: Arc<PipelineOrchestrator>,
        aggregator: Arc<SupplierAggregator>,
        broadcaster: Arc<ProgressBroadcaster>,
        worker_count: usize,
        queue_size: usize,
    ) -> Arc<Self> {
        let (job_tx, job_rx) = mpsc::channel(queue_size.max(1));
        let job_rx = Arc::new(Mutex::new(job_rx));
        let results = Arc::new(DashMap::new());

        let service = Arc::new(Self {
            orchestrator,
            broadcaster,
            job_tx,
            results,
        });

        for worker_id in 0..worker_count.max(1) {
            service.spawn_worker(worker_id, Arc::clone(&job_rx));
        }

        service.spawn_maintenance(aggregator);

        service
    }

    /// Queue one job. Fails fast when the queue is at capacity.
    pub fn submit(&self, job: EnrichmentJob) -> Result<()> {
        let bom_id = job.bom_id;

        self.job_tx.try_send(job).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => {
                AppError::QueueFull("Enrichment queue at capacity".to_string())
            }
            mpsc::error::TrySendError::Closed(_) => {
                AppError::Internal("Enrichment queue closed".to_string())
            }
        })?;

        self.broadcaster.register_items(bom_id, 1);
        crate::metrics::QUEUE_DEPTH.inc();
        Ok(())
    }

    /// Terminal result for an item, if it finished
    pub fn result_for_item(&self, item_id: &Uuid) -> Option<EnrichmentPipelineResult> {
        self.results.get(item_id).map(|entry| entry.clone())
    }

    /// Aggregate progress for a BOM
    pub fn snapshot(&self, bom_id: Uuid) -> Option<BomProgress> {
        self.broadcaster.snapshot(bom_id)
    }

    fn spawn_worker(&self, worker_id: usize, job_rx: Arc<Mutex<mpsc::Receiver<EnrichmentJob>>>) {
        let orchestrator = Arc::clone(&self.orchestrator);
        let results = Arc::clone(&self.results);

        tokio::spawn(async move {
            info!(worker_id, "Enrichment worker started");

            loop {
                // Hold the lock only while waiting for the next job, so
                // workers drain the queue concurrently
                let job = {
                    let mut rx = job_rx.lock().await;
                    rx.recv().await
                };

                let Some(job) = job else {
                    break;
                };
                crate::metrics::QUEUE_DEPTH.dec();

                let result = orchestrator.run(job).await;
                results.insert(result.item_id, result);
            }

            info!(worker_id, "Enrichment worker stopped");
        });
    }

    fn spawn_maintenance(&self, aggregator: Arc<SupplierAggregator>) {
        let broadcaster = Arc::clone(&self.broadcaster);

        tokio::spawn(async move {
            let mut interval = tokio::time::interval(std::time::Duration::from_secs(
                MAINTENANCE_INTERVAL_SECS,
            ));
            interval.tick().await;

            loop {
                interval.tick().await;
                aggregator.clear_expired_cache();
                broadcaster.reap_idle();
            }
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PipelineConfig;
    use crate::models::PipelineStatus;
    use crate::pipeline::{QualityScorer, QualityWeights, RuleBasedNormalizer};
    use crate::progress::BroadcasterConfig;
    use crate::storage::InMemoryCatalogStore;
    use crate::suppliers::{AggregatorConfig, SupplierRegistry};
    use std::time::Duration;

    fn service() -> (Arc<EnrichmentService>, Arc<ProgressBroadcaster>) {
        let registry = Arc::new(SupplierRegistry::new());
        let aggregator = Arc::new(SupplierAggregator::new(
            registry,
            AggregatorConfig::default(),
        ));
        let broadcaster = Arc::new(ProgressBroadcaster::new(BroadcasterConfig::default()));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            Arc::new(RuleBasedNormalizer::new()),
            Arc::clone(&aggregator),
            None,
            QualityScorer::new(QualityWeights::default()),
            Arc::new(InMemoryCatalogStore::new()),
            Arc::clone(&broadcaster),
            PipelineConfig::default(),
        ));

        (
            EnrichmentService::new(orchestrator, aggregator, Arc::clone(&broadcaster), 2, 16),
            broadcaster,
        )
    }

    #[tokio::test]
    async fn test_submit_runs_job_to_terminal_state() {
        let (service, _broadcaster) = service();
        let bom_id = Uuid::new_v4();

        // No suppliers registered, so the job lands failed; it must
        // still reach a terminal state with a full step log
        let job = EnrichmentJob::new(bom_id, "LM358".to_string(), Some("TI".to_string()), 1);
        let item_id = job.item_id;

        tokio_test::assert_ok!(service.submit(job));

        let mut result = None;
        for _ in 0..100 {
            if let Some(found) = service.result_for_item(&item_id) {
                result = Some(found);
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }

        let result = result.expect("job should finish");
        assert_eq!(result.status, PipelineStatus::Failed);
        assert_eq!(result.steps.len(), 5);

        let snapshot = service.snapshot(bom_id).unwrap();
        assert_eq!(snapshot.total, 1);
        assert_eq!(snapshot.failed, 1);
    }

    #[tokio::test]
    async fn test_queue_full_is_reported() {
        use crate::models::NormalizedComponentData;
        use crate::pipeline::Normalizer;
        use async_trait::async_trait;

        /// Keeps the single worker busy so the queue saturates
        struct StalledNormalizer;

        #[async_trait]
        impl Normalizer for StalledNormalizer {
            async fn normalize(
                &self,
                job: &EnrichmentJob,
            ) -> crate::error::Result<NormalizedComponentData> {
                tokio::time::sleep(Duration::from_secs(30)).await;
                Ok(NormalizedComponentData {
                    mpn: job.mpn.clone(),
                    manufacturer: "TI".to_string(),
                    category: None,
                    description: None,
                    confidence_score: Some(1.0),
                    normalized_fields: Vec::new(),
                })
            }
        }

        let registry = Arc::new(SupplierRegistry::new());
        let aggregator = Arc::new(SupplierAggregator::new(
            registry,
            AggregatorConfig::default(),
        ));
        let broadcaster = Arc::new(ProgressBroadcaster::new(BroadcasterConfig::default()));
        let orchestrator = Arc::new(PipelineOrchestrator::new(
            Arc::new(StalledNormalizer),
            Arc::clone(&aggregator),
            None,
            QualityScorer::new(QualityWeights::default()),
            Arc::new(InMemoryCatalogStore::new()),
            Arc::clone(&broadcaster),
            PipelineConfig::default(),
        ));

        let service = EnrichmentService::new(orchestrator, aggregator, broadcaster, 1, 1);

        // One job in flight, one queued, the rest rejected
        let bom_id = Uuid::new_v4();
        let mut saw_full = false;
        for _ in 0..3 {
            let job = EnrichmentJob::new(bom_id, "LM358".to_string(), None, 1);
            match service.submit(job) {
                Ok(()) => {}
                Err(AppError::QueueFull(_)) => {
                    saw_full = true;
                    break;
                }
                Err(other) => panic!("unexpected error: {}", other),
            }
        }
        assert!(saw_full);
    }
}
