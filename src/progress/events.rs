//! Progress event types.
//!
//! Events are ephemeral: they exist only on the wire between the
//! broadcaster and its subscribers and are never persisted or replayed.

use crate::models::{EnrichmentJob, PipelineStep, StepStatus};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Progress event types
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ProgressEventType {
    StepStart,
    StepComplete,
    StepError,
    Complete,
    Error,
}

/// Aggregate position of a BOM's enrichment run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ProgressCounts {
    /// Items finished (success, partial or failed)
    pub current: u64,
    /// Items submitted for this BOM
    pub total: u64,
    pub percent: f64,
}

/// One progress event for one item
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentProgressEvent {
    #[serde(rename = "type")]
    pub event_type: ProgressEventType,

    pub item_id: Uuid,
    pub bom_id: Uuid,
    pub mpn: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub step: Option<PipelineStep>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<StepStatus>,

    /// Attached by the broadcaster to terminal events
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress: Option<ProgressCounts>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    pub timestamp: DateTime<Utc>,
}

impl EnrichmentProgressEvent {
    fn base(event_type: ProgressEventType, job: &EnrichmentJob) -> Self {
        Self {
            event_type,
            item_id: job.item_id,
            bom_id: job.bom_id,
            mpn: job.mpn.clone(),
            step: None,
            status: None,
            progress: None,
            error: None,
            timestamp: Utc::now(),
        }
    }

    pub fn step_start(job: &EnrichmentJob, step: PipelineStep) -> Self {
        let mut event = Self::base(ProgressEventType::StepStart, job);
        event.step = Some(step);
        event.status = Some(StepStatus::Running);
        event
    }

    pub fn step_complete(job: &EnrichmentJob, step: PipelineStep, status: StepStatus) -> Self {
        let mut event = Self::base(ProgressEventType::StepComplete, job);
        event.step = Some(step);
        event.status = Some(status);
        event
    }

    pub fn step_error(job: &EnrichmentJob, step: PipelineStep, error: String) -> Self {
        let mut event = Self::base(ProgressEventType::StepError, job);
        event.step = Some(step);
        event.status = Some(StepStatus::Failed);
        event.error = Some(error);
        event
    }

    /// Item reached a terminal state with a usable result
    pub fn complete(job: &EnrichmentJob) -> Self {
        Self::base(ProgressEventType::Complete, job)
    }

    /// Item reached a terminal failed state
    pub fn error(job: &EnrichmentJob, error: String) -> Self {
        let mut event = Self::base(ProgressEventType::Error, job);
        event.error = Some(error);
        event
    }

    /// Terminal events close out an item in the per-BOM ledger
    pub fn is_terminal(&self) -> bool {
        matches!(
            self.event_type,
            ProgressEventType::Complete | ProgressEventType::Error
        )
    }
}
