//! Quality scoring: a pure function over the terminal result.

use crate::models::{
    AiEnhancementResult, EnrichmentPipelineResult, NormalizedComponentData, PipelineStep,
    StepStatus, SupplierStepSummary,
};
use serde::{Deserialize, Serialize};

/// Weights for the composite score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QualityWeights {
    pub normalization: f64,
    pub supplier: f64,
    pub enhancement: f64,
    /// Dampening applied to the supplier term when every usable supplier
    /// response came from cache
    pub cached_freshness_factor: f64,
}

impl Default for QualityWeights {
    fn default() -> Self {
        Self {
            normalization: 0.35,
            supplier: 0.40,
            enhancement: 0.25,
            cached_freshness_factor: 0.8,
        }
    }
}

/// Scoring inputs extracted from a result's step log.
///
/// Only `success` entries contribute; failed or skipped steps leave
/// their input at `None`, which scores as zero without shrinking the
/// denominator, so skipping optional work can never inflate the score.
#[derive(Debug, Clone, Default)]
pub struct QualityInputs {
    pub normalization_confidence: Option<f64>,
    pub supplier_completeness: Option<f64>,
    pub cache_only: bool,
    pub enhancement_confidence: Option<f64>,
}

impl QualityInputs {
    /// Read scoring inputs back out of the step log
    pub fn from_result(result: &EnrichmentPipelineResult) -> Self {
        let mut inputs = QualityInputs::default();

        for entry in &result.steps {
            if entry.status != StepStatus::Success {
                continue;
            }
            let data = match &entry.data {
                Some(data) => data,
                None => continue,
            };

            match entry.step {
                PipelineStep::Normalization => {
                    if let Ok(normalized) =
                        serde_json::from_value::<NormalizedComponentData>(data.clone())
                    {
                        inputs.normalization_confidence = normalized.confidence_score;
                    }
                }
                PipelineStep::SupplierApi => {
                    if let Ok(summary) =
                        serde_json::from_value::<SupplierStepSummary>(data.clone())
                    {
                        inputs.supplier_completeness = Some(summary.completeness_ratio);
                        inputs.cache_only = summary.cache_only;
                    }
                }
                PipelineStep::AiEnhancement => {
                    if let Ok(enhancement) =
                        serde_json::from_value::<AiEnhancementResult>(data.clone())
                    {
                        inputs.enhancement_confidence = enhancement
                            .mean_confidence()
                            .or(enhancement.description_quality);
                    }
                }
                _ => {}
            }
        }

        inputs
    }
}

/// Derives a composite 0-100 score from step confidences and supplier
/// data completeness. Deterministic and side-effect free.
#[derive(Debug, Clone, Default)]
pub struct QualityScorer {
    weights: QualityWeights,
}

impl QualityScorer {
    pub fn new(weights: QualityWeights) -> Self {
        Self { weights }
    }

    /// Score a terminal result. Safe to recompute idempotently.
    pub fn score(&self, result: &EnrichmentPipelineResult) -> u8 {
        self.score_inputs(&QualityInputs::from_result(result))
    }

    /// Score from already-extracted inputs
    pub fn score_inputs(&self, inputs: &QualityInputs) -> u8 {
        let w = &self.weights;

        let normalization = inputs.normalization_confidence.unwrap_or(0.0);
        let supplier = inputs.supplier_completeness.unwrap_or(0.0)
            * if inputs.cache_only {
                w.cached_freshness_factor
            } else {
                1.0
            };
        let enhancement = inputs.enhancement_confidence.unwrap_or(0.0);

        let total_weight = w.normalization + w.supplier + w.enhancement;
        if total_weight <= 0.0 {
            return 0;
        }

        let weighted = w.normalization * normalization.clamp(0.0, 1.0)
            + w.supplier * supplier.clamp(0.0, 1.0)
            + w.enhancement * enhancement.clamp(0.0, 1.0);

        ((weighted / total_weight) * 100.0).round().clamp(0.0, 100.0) as u8
    }
}
