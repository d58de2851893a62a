//! End-to-end pipeline runs over the public API: a real orchestrator,
//! scripted suppliers/enhancers and an in-memory catalog store.

mod common;

use bom_enricher::models::{
    PipelineStatus, PipelineStep, StepStatus, SupplierApiResponse,
};
use common::{
    job, rich_fields, sparse_fields, FailingStore, FixedEnhancer, FixedSupplier,
    StalledEnhancer, TestPipelineBuilder,
};
use std::sync::Arc;

fn step_status(
    result: &bom_enricher::models::EnrichmentPipelineResult,
    step: PipelineStep,
) -> StepStatus {
    result
        .step_status(step)
        .unwrap_or_else(|| panic!("no entry for step {}", step))
}

#[tokio::test]
async fn happy_path_produces_high_quality_success() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::success("partstream".to_string(), rich_fields(), 12),
        ))
        .supplier(FixedSupplier::new(
            "componentdb",
            20,
            SupplierApiResponse::success("componentdb".to_string(), sparse_fields(), 18),
        ))
        .supplier(FixedSupplier::new(
            "stockhouse",
            30,
            SupplierApiResponse::not_found("stockhouse".to_string(), 9),
        ))
        .enhancer(Arc::new(FixedEnhancer::new(
            0.8,
            vec![("description", 0.8), ("category", 0.9)],
        )))
        .build();

    let result = pipeline
        .orchestrator
        .run(job("LM358", Some("Texas Instruments")))
        .await;

    assert_eq!(result.status, PipelineStatus::Success);
    assert_eq!(result.mpn, "LM358");
    assert_eq!(result.manufacturer.as_deref(), Some("TI"));
    assert_eq!(result.enrichment_source.as_deref(), Some("partstream"));
    assert!(result.component_id.is_some());
    assert!(result.completed_at.is_some());

    // All five steps ran and succeeded
    assert_eq!(result.steps.len(), 5);
    for step in PipelineStep::SEQUENCE {
        assert_eq!(step_status(&result, step), StepStatus::Success);
    }

    // Normalization confidence 0.95, full supplier completeness,
    // enhancement confidence 0.85: well inside the expected band
    let score = result.quality_score.unwrap();
    assert!(
        (70..=100).contains(&(score as i32)),
        "quality score {} out of range",
        score
    );

    // Terminal artifact is retrievable by part identity
    let stored = pipeline
        .store
        .find_by_part("LM358", Some("TI"))
        .await
        .unwrap()
        .expect("record should be stored");
    assert_eq!(stored.component_id, result.component_id);
    assert_eq!(stored.status, PipelineStatus::Success);
}

#[tokio::test]
async fn unparseable_mpn_fails_and_skips_everything() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::success("partstream".to_string(), rich_fields(), 5),
        ))
        .build();

    let result = pipeline.orchestrator.run(job("???", None)).await;

    assert_eq!(result.status, PipelineStatus::Failed);
    assert_eq!(
        step_status(&result, PipelineStep::Normalization),
        StepStatus::Failed
    );
    for step in [
        PipelineStep::SupplierApi,
        PipelineStep::AiEnhancement,
        PipelineStep::QualityCheck,
        PipelineStep::CatalogStorage,
    ] {
        assert_eq!(step_status(&result, step), StepStatus::Skipped);
    }

    // Storage never invoked
    assert_eq!(pipeline.store.count().await.unwrap(), 0);
    assert!(result.component_id.is_none());
}

#[tokio::test]
async fn all_suppliers_failing_fails_the_job_without_storage() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::error("partstream".to_string(), "HTTP 500".to_string(), 4),
        ))
        .supplier(FixedSupplier::new(
            "componentdb",
            20,
            SupplierApiResponse::rate_limited("componentdb".to_string(), "HTTP 429".to_string(), 3),
        ))
        .supplier(FixedSupplier::new(
            "stockhouse",
            30,
            SupplierApiResponse::error("stockhouse".to_string(), "HTTP 503".to_string(), 6),
        ))
        .build();

    let result = pipeline.orchestrator.run(job("LM358", Some("TI"))).await;

    assert_eq!(result.status, PipelineStatus::Failed);
    assert_eq!(
        step_status(&result, PipelineStep::SupplierApi),
        StepStatus::Failed
    );
    assert_eq!(
        step_status(&result, PipelineStep::AiEnhancement),
        StepStatus::Skipped
    );
    assert_eq!(
        step_status(&result, PipelineStep::CatalogStorage),
        StepStatus::Skipped
    );
    assert_eq!(pipeline.store.count().await.unwrap(), 0);
}

#[tokio::test]
async fn enhancement_timeout_degrades_to_partial_with_storage() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::success("partstream".to_string(), rich_fields(), 7),
        ))
        .enhancer(Arc::new(StalledEnhancer))
        .configure(|config| config.enhancement_timeout_secs = 1)
        .build();

    let result = pipeline.orchestrator.run(job("LM358", Some("TI"))).await;

    assert_eq!(result.status, PipelineStatus::Partial);

    let enhancement = result
        .steps
        .iter()
        .find(|s| s.step == PipelineStep::AiEnhancement)
        .unwrap();
    assert_eq!(enhancement.status, StepStatus::Failed);
    assert!(enhancement.error.as_deref().unwrap().contains("timed out"));

    // Storage still attempted with partial data
    assert_eq!(
        step_status(&result, PipelineStep::CatalogStorage),
        StepStatus::Success
    );
    assert_eq!(pipeline.store.count().await.unwrap(), 1);
    assert!(result.quality_score.is_some());
}

#[tokio::test]
async fn enhancement_disabled_is_skipped_not_failed() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::success("partstream".to_string(), rich_fields(), 7),
        ))
        .configure(|config| config.enable_ai_enhancement = false)
        .build();

    let result = pipeline.orchestrator.run(job("LM358", Some("TI"))).await;

    // A skipped optional step does not cost the success status
    assert_eq!(result.status, PipelineStatus::Success);
    assert_eq!(
        step_status(&result, PipelineStep::AiEnhancement),
        StepStatus::Skipped
    );
}

#[tokio::test]
async fn storage_failure_is_terminal_for_the_job() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::success("partstream".to_string(), rich_fields(), 7),
        ))
        .enhancer(Arc::new(FixedEnhancer::new(0.8, vec![("description", 0.8)])))
        .store(Arc::new(FailingStore))
        .build();

    let result = pipeline.orchestrator.run(job("LM358", Some("TI"))).await;

    // Every prior step succeeded, but an unsaved result has no
    // observable value to callers
    assert_eq!(result.status, PipelineStatus::Failed);
    assert_eq!(
        step_status(&result, PipelineStep::CatalogStorage),
        StepStatus::Failed
    );
    assert_eq!(
        step_status(&result, PipelineStep::SupplierApi),
        StepStatus::Success
    );
    assert!(result.component_id.is_none());
}

#[tokio::test]
async fn quality_score_is_stable_across_reruns() {
    let build = || {
        TestPipelineBuilder::new()
            .supplier(FixedSupplier::new(
                "partstream",
                10,
                SupplierApiResponse::success("partstream".to_string(), rich_fields(), 7),
            ))
            .enhancer(Arc::new(FixedEnhancer::new(
                0.8,
                vec![("description", 0.8), ("category", 0.9)],
            )))
            .build()
    };

    let first = build().orchestrator.run(job("LM358", Some("TI"))).await;
    let second = build().orchestrator.run(job("LM358", Some("TI"))).await;

    assert_eq!(first.quality_score, second.quality_score);
}

#[tokio::test]
async fn step_log_is_ordered_and_complete() {
    let pipeline = TestPipelineBuilder::new()
        .supplier(FixedSupplier::new(
            "partstream",
            10,
            SupplierApiResponse::success("partstream".to_string(), rich_fields(), 7),
        ))
        .build();

    let result = pipeline.orchestrator.run(job("LM358", Some("TI"))).await;

    // One entry per step, in the fixed execution order
    let steps: Vec<PipelineStep> = result.steps.iter().map(|s| s.step).collect();
    assert_eq!(steps, PipelineStep::SEQUENCE.to_vec());

    // No entry is ever left in a non-terminal state
    for entry in &result.steps {
        assert!(
            matches!(
                entry.status,
                StepStatus::Success | StepStatus::Failed | StepStatus::Skipped
            ),
            "step {} left as {}",
            entry.step,
            entry.status
        );
    }
}
