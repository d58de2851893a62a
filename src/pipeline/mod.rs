//! The enrichment pipeline: step implementations and the orchestrator.

pub mod enhance;
pub mod normalize;
pub mod orchestrator;
pub mod quality;

pub use enhance::{ApiEnhancer, Enhancer};
pub use normalize::{Normalizer, RuleBasedNormalizer};
pub use orchestrator::PipelineOrchestrator;
pub use quality::{QualityInputs, QualityScorer, QualityWeights};
