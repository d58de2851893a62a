use crate::models::job::EnrichmentJob;
use crate::models::step::{PipelineStep, PipelineStepResult, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Terminal outcome of one enrichment job
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStatus {
    Success,
    Partial,
    Failed,
}

/// The terminal, persisted artifact of an enrichment job.
///
/// Created when the orchestrator starts the job, finalized exactly once
/// when the job reaches a terminal state, immutable afterwards.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentPipelineResult {
    /// Assigned by the catalog store on save
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_id: Option<Uuid>,

    pub bom_id: Uuid,
    pub item_id: Uuid,

    /// Canonical MPN once normalization ran, raw MPN otherwise
    pub mpn: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub manufacturer: Option<String>,

    /// Quantity carried over from the BOM line
    pub quantity: u32,

    pub status: PipelineStatus,

    /// Append-only step log, in execution order
    pub steps: Vec<PipelineStepResult>,

    /// Composite quality score in [0, 100]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality_score: Option<u8>,

    /// Best supplier source chosen by the aggregator
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enrichment_source: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_duration_ms: Option<u64>,

    pub started_at: DateTime<Utc>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
}

impl EnrichmentPipelineResult {
    /// Create the in-flight result record for a starting job
    pub fn started(job: &EnrichmentJob) -> Self {
        Self {
            component_id: None,
            bom_id: job.bom_id,
            item_id: job.item_id,
            mpn: job.mpn.clone(),
            manufacturer: job.manufacturer.clone(),
            quantity: job.quantity,
            status: PipelineStatus::Failed,
            steps: Vec::with_capacity(PipelineStep::SEQUENCE.len()),
            quality_score: None,
            enrichment_source: None,
            total_duration_ms: None,
            started_at: Utc::now(),
            completed_at: None,
        }
    }

    /// Append a step entry to the log
    pub fn record_step(&mut self, entry: PipelineStepResult) {
        self.steps.push(entry);
    }

    /// Latest recorded status for a step, if any
    pub fn step_status(&self, step: PipelineStep) -> Option<StepStatus> {
        self.steps
            .iter()
            .rev()
            .find(|s| s.step == step)
            .map(|s| s.status)
    }

    /// Stamp the terminal status and duration. Called exactly once.
    pub fn finalize(&mut self, status: PipelineStatus) {
        let completed = Utc::now();
        self.status = status;
        self.total_duration_ms =
            Some((completed - self.started_at).num_milliseconds().max(0) as u64);
        self.completed_at = Some(completed);
    }

    /// Derive the terminal status from the step log.
    ///
    /// - `failed` when storage failed, or when a required step failed with
    ///   nothing usable downstream (everything after it skipped);
    /// - `success` when normalization, supplier_api and catalog_storage
    ///   succeeded and no step failed (optional steps may be skipped);
    /// - `partial` otherwise.
    pub fn derive_status(&self) -> PipelineStatus {
        if self.step_status(PipelineStep::CatalogStorage) == Some(StepStatus::Failed) {
            return PipelineStatus::Failed;
        }

        let any_success = self
            .steps
            .iter()
            .any(|s| s.status == StepStatus::Success);
        let required_ok = [
            PipelineStep::Normalization,
            PipelineStep::SupplierApi,
            PipelineStep::CatalogStorage,
        ]
        .iter()
        .all(|step| self.step_status(*step) == Some(StepStatus::Success));

        if required_ok {
            let any_failed = self
                .steps
                .iter()
                .any(|s| s.status == StepStatus::Failed);
            if any_failed || self.supplier_data_was_cache_only() {
                PipelineStatus::Partial
            } else {
                PipelineStatus::Success
            }
        } else if any_success {
            PipelineStatus::Partial
        } else {
            PipelineStatus::Failed
        }
    }

    /// True when the supplier step succeeded purely on cached responses.
    ///
    /// Stale data caps the terminal status at `partial` even though the
    /// step itself counts as a success.
    pub fn supplier_data_was_cache_only(&self) -> bool {
        self.steps
            .iter()
            .filter(|s| s.step == PipelineStep::SupplierApi && s.status == StepStatus::Success)
            .any(|s| {
                s.data
                    .as_ref()
                    .and_then(|d| d.get("cache_only"))
                    .and_then(|v| v.as_bool())
                    .unwrap_or(false)
            })
    }
}
