use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Pipeline steps in execution order
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum PipelineStep {
    Normalization,
    SupplierApi,
    AiEnhancement,
    QualityCheck,
    CatalogStorage,
}

impl PipelineStep {
    /// The fixed execution sequence
    pub const SEQUENCE: [PipelineStep; 5] = [
        PipelineStep::Normalization,
        PipelineStep::SupplierApi,
        PipelineStep::AiEnhancement,
        PipelineStep::QualityCheck,
        PipelineStep::CatalogStorage,
    ];

    /// Required steps must succeed for the job to be a full success;
    /// failure of an optional step degrades the job to partial instead.
    pub fn is_required(&self) -> bool {
        !matches!(self, PipelineStep::AiEnhancement)
    }
}

/// Status of a single step execution
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Success,
    Failed,
    Skipped,
}

/// One entry in a job's append-only step log.
///
/// Never mutated after being appended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineStepResult {
    /// Which step this entry records
    pub step: PipelineStep,

    /// Outcome status
    pub status: StepStatus,

    /// Wall-clock duration, when the step actually ran
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    /// Error message if failed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    /// Step output, when there is any worth recording
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// When the entry was recorded
    pub timestamp: DateTime<Utc>,
}

impl PipelineStepResult {
    pub fn success(step: PipelineStep, duration_ms: u64, data: Option<serde_json::Value>) -> Self {
        Self {
            step,
            status: StepStatus::Success,
            duration_ms: Some(duration_ms),
            error: None,
            data,
            timestamp: Utc::now(),
        }
    }

    pub fn failure(step: PipelineStep, duration_ms: u64, error: String) -> Self {
        Self {
            step,
            status: StepStatus::Failed,
            duration_ms: Some(duration_ms),
            error: Some(error),
            data: None,
            timestamp: Utc::now(),
        }
    }

    pub fn skipped(step: PipelineStep, reason: String) -> Self {
        Self {
            step,
            status: StepStatus::Skipped,
            duration_ms: None,
            error: Some(reason),
            data: None,
            timestamp: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_serialization() {
        let json = serde_json::to_string(&PipelineStep::SupplierApi).unwrap();
        assert_eq!(json, r#""supplier_api""#);

        let json = serde_json::to_string(&StepStatus::Running).unwrap();
        assert_eq!(json, r#""running""#);
    }

    #[test]
    fn test_step_display() {
        assert_eq!(PipelineStep::AiEnhancement.to_string(), "ai_enhancement");
        assert_eq!(StepStatus::Skipped.to_string(), "skipped");
    }

    #[test]
    fn test_required_steps() {
        assert!(PipelineStep::Normalization.is_required());
        assert!(PipelineStep::SupplierApi.is_required());
        assert!(PipelineStep::CatalogStorage.is_required());
        assert!(!PipelineStep::AiEnhancement.is_required());
    }

    #[test]
    fn test_sequence_order() {
        assert_eq!(PipelineStep::SEQUENCE[0], PipelineStep::Normalization);
        assert_eq!(PipelineStep::SEQUENCE[4], PipelineStep::CatalogStorage);
    }

    #[test]
    fn test_step_result_constructors() {
        let ok = PipelineStepResult::success(PipelineStep::Normalization, 12, None);
        assert_eq!(ok.status, StepStatus::Success);
        assert!(ok.error.is_none());

        let failed = PipelineStepResult::failure(
            PipelineStep::SupplierApi,
            30_000,
            "timed out".to_string(),
        );
        assert_eq!(failed.status, StepStatus::Failed);
        assert_eq!(failed.error.as_deref(), Some("timed out"));

        let skipped =
            PipelineStepResult::skipped(PipelineStep::CatalogStorage, "prior failure".to_string());
        assert_eq!(skipped.status, StepStatus::Skipped);
        assert!(skipped.duration_ms.is_none());
    }
}
