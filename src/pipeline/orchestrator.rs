//! Pipeline orchestration: the fixed step sequence for one job.

use crate::config::PipelineConfig;
use crate::models::{
    AggregatedSupplierData, EnrichmentJob, EnrichmentPipelineResult, NormalizedComponentData,
    PipelineStep, PipelineStepResult, PipelineStatus, StepStatus, SupplierStepSummary,
};
use crate::pipeline::enhance::Enhancer;
use crate::pipeline::normalize::Normalizer;
use crate::pipeline::quality::QualityScorer;
use crate::progress::{EnrichmentProgressEvent, ProgressBroadcaster};
use crate::storage::CatalogStore;
use crate::suppliers::SupplierAggregator;
use chrono::Utc;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::time::timeout;
use tracing::{info, warn};

/// Runs the fixed step sequence for one job and owns its step log.
///
/// `run` never returns an error: every failure is recorded in the step
/// log and reflected in the terminal status, so callers always get a
/// well-formed [`EnrichmentPipelineResult`] to inspect.
pub struct PipelineOrchestrator {
    normalizer: Arc<dyn Normalizer>,
    aggregator: Arc<SupplierAggregator>,
    enhancer: Option<Arc<dyn Enhancer>>,
    scorer: QualityScorer,
    store: Arc<dyn CatalogStore>,
    broadcaster: Arc<ProgressBroadcaster>,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    pub fn new(
        normalizer: Arc<dyn Normalizer>,
        aggregator: Arc<SupplierAggregator>,
        enhancer: Option<Arc<dyn Enhancer>>,
        scorer: QualityScorer,
        store: Arc<dyn CatalogStore>,
        broadcaster: Arc<ProgressBroadcaster>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            normalizer,
            aggregator,
            enhancer,
            scorer,
            store,
            broadcaster,
            config,
        }
    }

    /// Run one job to a terminal state.
    ///
    /// Steps execute strictly in sequence; each step's deadline is
    /// independent, and a job always runs to a terminal result no matter
    /// who is watching the progress stream.
    pub async fn run(&self, job: EnrichmentJob) -> EnrichmentPipelineResult {
        let mut result = EnrichmentPipelineResult::started(&job);

        info!(
            bom_id = %job.bom_id,
            item_id = %job.item_id,
            mpn = %job.mpn,
            "Starting enrichment job"
        );

        let normalized = match self.run_normalization(&job, &mut result).await {
            Some(normalized) => normalized,
            None => {
                self.skip_from(
                    &mut result,
                    PipelineStep::SupplierApi,
                    "normalization failed",
                );
                return self.finish(&job, result);
            }
        };
        result.mpn = normalized.mpn.clone();
        result.manufacturer = Some(normalized.manufacturer.clone());

        let aggregated = match self.run_supplier_api(&job, &normalized, &mut result).await {
            Some(aggregated) => aggregated,
            None => {
                self.skip_from(
                    &mut result,
                    PipelineStep::AiEnhancement,
                    "no supplier data available",
                );
                return self.finish(&job, result);
            }
        };
        result.enrichment_source = aggregated.best_source.clone();

        self.run_enhancement(&job, &normalized, &aggregated, &mut result)
            .await;
        self.run_quality_check(&job, &mut result);
        self.run_storage(&job, &mut result).await;

        self.finish(&job, result)
    }

    async fn run_normalization(
        &self,
        job: &EnrichmentJob,
        result: &mut EnrichmentPipelineResult,
    ) -> Option<NormalizedComponentData> {
        let step = PipelineStep::Normalization;
        let deadline = Duration::from_secs(self.config.normalization_timeout_secs);
        self.emit_start(job, step);

        let started = Instant::now();
        match timeout(deadline, self.normalizer.normalize(job)).await {
            Ok(Ok(normalized)) => {
                let data = serde_json::to_value(&normalized).ok();
                let duration = started.elapsed().as_millis() as u64;
                self.record(job, result, PipelineStepResult::success(step, duration, data));
                Some(normalized)
            }
            Ok(Err(e)) => {
                let duration = started.elapsed().as_millis() as u64;
                self.record(
                    job,
                    result,
                    PipelineStepResult::failure(step, duration, e.to_string()),
                );
                None
            }
            Err(_) => {
                self.record(job, result, self.timeout_entry(step, deadline));
                None
            }
        }
    }

    async fn run_supplier_api(
        &self,
        job: &EnrichmentJob,
        normalized: &NormalizedComponentData,
        result: &mut EnrichmentPipelineResult,
    ) -> Option<AggregatedSupplierData> {
        let step = PipelineStep::SupplierApi;
        let deadline = Duration::from_secs(self.config.supplier_timeout_secs);
        self.emit_start(job, step);

        let started = Instant::now();
        let aggregated = match timeout(
            deadline,
            Box::pin(
                self.aggregator
                    .aggregate(&normalized.mpn, Some(normalized.manufacturer.as_str())),
            ),
        )
        .await
        {
            Ok(aggregated) => aggregated,
            Err(_) => {
                self.record(job, result, self.timeout_entry(step, deadline));
                return None;
            }
        };

        let duration = started.elapsed().as_millis() as u64;
        let summary = SupplierStepSummary::from(&aggregated);
        let data = serde_json::to_value(&summary).ok();

        if aggregated.merged_data.is_none() {
            self.record(
                job,
                result,
                PipelineStepResult::failure(
                    step,
                    duration,
                    format!(
                        "No supplier returned usable data ({} responses)",
                        aggregated.responses.len()
                    ),
                ),
            );
            return None;
        }

        self.record(job, result, PipelineStepResult::success(step, duration, data));
        Some(aggregated)
    }

    async fn run_enhancement(
        &self,
        job: &EnrichmentJob,
        normalized: &NormalizedComponentData,
        aggregated: &AggregatedSupplierData,
        result: &mut EnrichmentPipelineResult,
    ) {
        let step = PipelineStep::AiEnhancement;

        let enhancer = match (&self.enhancer, self.config.enable_ai_enhancement) {
            (Some(enhancer), true) => enhancer,
            _ => {
                self.record(
                    job,
                    result,
                    PipelineStepResult::skipped(step, "enhancement disabled".to_string()),
                );
                return;
            }
        };

        let deadline = Duration::from_secs(self.config.enhancement_timeout_secs);
        self.emit_start(job, step);

        let started = Instant::now();
        match timeout(deadline, enhancer.enhance(normalized, aggregated)).await {
            Ok(Ok(enhancement)) => {
                let data = serde_json::to_value(&enhancement).ok();
                let duration = started.elapsed().as_millis() as u64;
                self.record(job, result, PipelineStepResult::success(step, duration, data));
            }
            Ok(Err(e)) => {
                let duration = started.elapsed().as_millis() as u64;
                // Optional step: record the failure, keep going
                self.record(
                    job,
                    result,
                    PipelineStepResult::failure(step, duration, e.to_string()),
                );
            }
            Err(_) => {
                self.record(job, result, self.timeout_entry(step, deadline));
            }
        }
    }

    /// Pure function over already-recorded data; cannot fail.
    fn run_quality_check(&self, job: &EnrichmentJob, result: &mut EnrichmentPipelineResult) {
        let step = PipelineStep::QualityCheck;
        self.emit_start(job, step);

        let started = Instant::now();
        let score = self.scorer.score(result);
        result.quality_score = Some(score);

        let duration = started.elapsed().as_millis() as u64;
        self.record(
            job,
            result,
            PipelineStepResult::success(
                step,
                duration,
                Some(serde_json::json!({ "quality_score": score })),
            ),
        );
    }

    async fn run_storage(&self, job: &EnrichmentJob, result: &mut EnrichmentPipelineResult) {
        let step = PipelineStep::CatalogStorage;
        let deadline = Duration::from_secs(self.config.storage_timeout_secs);
        self.emit_start(job, step);

        // Persist the record as it will read once terminal: the storage
        // entry is part of the artifact, so it is stamped in before the
        // write. Its duration is unknowable from inside the write.
        let mut artifact = result.clone();
        artifact.record_step(PipelineStepResult {
            step,
            status: StepStatus::Success,
            duration_ms: None,
            error: None,
            data: None,
            timestamp: Utc::now(),
        });
        let status = artifact.derive_status();
        artifact.finalize(status);

        let started = Instant::now();
        match timeout(deadline, self.store.save(&artifact)).await {
            Ok(Ok(component_id)) => {
                result.component_id = Some(component_id);
                let duration = started.elapsed().as_millis() as u64;
                self.record(
                    job,
                    result,
                    PipelineStepResult::success(
                        step,
                        duration,
                        Some(serde_json::json!({ "component_id": component_id })),
                    ),
                );
            }
            Ok(Err(e)) => {
                let duration = started.elapsed().as_millis() as u64;
                self.record(
                    job,
                    result,
                    PipelineStepResult::failure(step, duration, e.to_string()),
                );
            }
            Err(_) => {
                self.record(job, result, self.timeout_entry(step, deadline));
            }
        }
    }

    /// Record a step entry: append to the log, count it, and publish the
    /// matching progress event (skipped steps never started, so they
    /// emit no event).
    fn record(
        &self,
        job: &EnrichmentJob,
        result: &mut EnrichmentPipelineResult,
        entry: PipelineStepResult,
    ) {
        crate::metrics::record_step_result(
            &entry.step.to_string(),
            &entry.status.to_string(),
            entry.duration_ms,
        );

        match entry.status {
            StepStatus::Failed => {
                warn!(
                    item_id = %job.item_id,
                    step = %entry.step,
                    error = entry.error.as_deref().unwrap_or(""),
                    "Pipeline step failed"
                );
                self.broadcaster.publish(
                    job.bom_id,
                    EnrichmentProgressEvent::step_error(
                        job,
                        entry.step,
                        entry.error.clone().unwrap_or_default(),
                    ),
                );
            }
            StepStatus::Skipped => {}
            _ => {
                self.broadcaster.publish(
                    job.bom_id,
                    EnrichmentProgressEvent::step_complete(job, entry.step, entry.status),
                );
            }
        }

        result.record_step(entry);
    }

    fn emit_start(&self, job: &EnrichmentJob, step: PipelineStep) {
        self.broadcaster
            .publish(job.bom_id, EnrichmentProgressEvent::step_start(job, step));
    }

    fn timeout_entry(&self, step: PipelineStep, deadline: Duration) -> PipelineStepResult {
        PipelineStepResult::failure(
            step,
            deadline.as_millis() as u64,
            format!("Step timed out after {}s", deadline.as_secs()),
        )
    }

    /// Mark every step from `from` onwards as skipped
    fn skip_from(&self, result: &mut EnrichmentPipelineResult, from: PipelineStep, reason: &str) {
        let start = PipelineStep::SEQUENCE
            .iter()
            .position(|s| *s == from)
            .unwrap_or(PipelineStep::SEQUENCE.len());

        for step in &PipelineStep::SEQUENCE[start..] {
            let entry = PipelineStepResult::skipped(*step, reason.to_string());
            crate::metrics::record_step_result(
                &entry.step.to_string(),
                &entry.status.to_string(),
                None,
            );
            result.record_step(entry);
        }
    }

    /// Finalize the result, publish the terminal event and account for
    /// the job.
    fn finish(
        &self,
        job: &EnrichmentJob,
        mut result: EnrichmentPipelineResult,
    ) -> EnrichmentPipelineResult {
        let status = result.derive_status();
        result.finalize(status);

        crate::metrics::record_job_result(&status.to_string(), result.total_duration_ms);

        let event = match status {
            PipelineStatus::Failed => {
                let error = result
                    .steps
                    .iter()
                    .rev()
                    .find(|s| s.status == StepStatus::Failed)
                    .and_then(|s| s.error.clone())
                    .unwrap_or_else(|| "enrichment failed".to_string());
                EnrichmentProgressEvent::error(job, error)
            }
            _ => EnrichmentProgressEvent::complete(job),
        };
        self.broadcaster.publish(job.bom_id, event);

        info!(
            bom_id = %job.bom_id,
            item_id = %job.item_id,
            mpn = %result.mpn,
            status = %status,
            quality_score = result.quality_score.unwrap_or(0),
            duration_ms = result.total_duration_ms.unwrap_or(0),
            "Enrichment job finished"
        );

        result
    }
}
