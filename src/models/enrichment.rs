use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical component identity produced by the normalization step
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizedComponentData {
    /// Canonical manufacturer part number
    pub mpn: String,

    /// Canonical manufacturer name
    pub manufacturer: String,

    /// Category inferred from the part reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,

    /// Short description inferred from the part reference
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Confidence in the normalization, in [0.0, 1.0]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence_score: Option<f64>,

    /// Names of fields that were rewritten during normalization
    #[serde(default)]
    pub normalized_fields: Vec<String>,
}

/// Output contract of the AI enhancement step.
///
/// Model internals are out of scope; only this shape is.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AiEnhancementResult {
    /// Fields the enhancement populated or improved
    #[serde(default)]
    pub enhanced_fields: Vec<String>,

    /// Per-field confidence, in [0.0, 1.0]
    #[serde(default)]
    pub confidence_scores: HashMap<String, f64>,

    /// Category suggestion, possibly overriding normalization
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<String>,

    /// Quality rating of the final description, in [0.0, 1.0]
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description_quality: Option<f64>,

    /// Raw enhancement payload
    #[serde(default)]
    pub data: serde_json::Value,
}

impl AiEnhancementResult {
    /// Mean of the per-field confidences, or None when empty
    pub fn mean_confidence(&self) -> Option<f64> {
        if self.confidence_scores.is_empty() {
            return None;
        }
        let sum: f64 = self.confidence_scores.values().sum();
        Some(sum / self.confidence_scores.len() as f64)
    }
}
