//! Progress delivery end to end: events observed while real jobs run
//! through the worker pool, snapshot reads for reconnecting clients.

mod common;

use bom_enricher::config::PipelineConfig;
use bom_enricher::models::{PipelineStep, SupplierApiResponse};
use bom_enricher::pipeline::{PipelineOrchestrator, QualityScorer, QualityWeights, RuleBasedNormalizer};
use bom_enricher::progress::{
    BroadcasterConfig, EnrichmentProgressEvent, ProgressBroadcaster, ProgressEventType,
};
use bom_enricher::service::EnrichmentService;
use bom_enricher::storage::InMemoryCatalogStore;
use bom_enricher::suppliers::{AggregatorConfig, SupplierAggregator, SupplierRegistry};
use common::{job, rich_fields, FixedSupplier};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use uuid::Uuid;

fn build_service() -> (Arc<EnrichmentService>, Arc<ProgressBroadcaster>) {
    let mut registry = SupplierRegistry::new();
    registry.register(Arc::new(FixedSupplier::new(
        "partstream",
        10,
        SupplierApiResponse::success("partstream".to_string(), rich_fields(), 5),
    )));
    registry.sort_by_priority();

    let aggregator = Arc::new(SupplierAggregator::new(
        Arc::new(registry),
        AggregatorConfig {
            cache_ttl_secs: 0,
            ..Default::default()
        },
    ));
    let broadcaster = Arc::new(ProgressBroadcaster::new(BroadcasterConfig::default()));
    let orchestrator = Arc::new(PipelineOrchestrator::new(
        Arc::new(RuleBasedNormalizer::new()),
        Arc::clone(&aggregator),
        None,
        QualityScorer::new(QualityWeights::default()),
        Arc::new(InMemoryCatalogStore::new()),
        Arc::clone(&broadcaster),
        PipelineConfig {
            enable_ai_enhancement: false,
            ..Default::default()
        },
    ));

    (
        EnrichmentService::new(orchestrator, aggregator, Arc::clone(&broadcaster), 4, 64),
        broadcaster,
    )
}

/// Drain events until the expected number of terminal events is seen
async fn collect_until_terminal(
    rx: &mut broadcast::Receiver<EnrichmentProgressEvent>,
    terminal_count: usize,
) -> Vec<EnrichmentProgressEvent> {
    let mut events = Vec::new();
    let mut terminals = 0;

    while terminals < terminal_count {
        let event = tokio::time::timeout(Duration::from_secs(10), rx.recv())
            .await
            .expect("timed out waiting for progress events")
            .expect("stream closed early");
        if event.is_terminal() {
            terminals += 1;
        }
        events.push(event);
    }

    events
}

#[tokio::test]
async fn subscriber_sees_ordered_step_events_for_an_item() {
    let (service, broadcaster) = build_service();
    let bom_id = Uuid::new_v4();

    let mut rx = broadcaster.subscribe(bom_id);

    let job = job("LM358", Some("TI"));
    let job = bom_enricher::models::EnrichmentJob { bom_id, ..job };
    let item_id = job.item_id;
    service.submit(job).unwrap();

    let events = collect_until_terminal(&mut rx, 1).await;

    // Every event belongs to the one submitted item
    assert!(events.iter().all(|e| e.item_id == item_id));

    // Steps are reported in the fixed execution order; each step_start
    // precedes its step_complete
    let starts: Vec<PipelineStep> = events
        .iter()
        .filter(|e| e.event_type == ProgressEventType::StepStart)
        .filter_map(|e| e.step)
        .collect();
    let expected: Vec<PipelineStep> = PipelineStep::SEQUENCE
        .iter()
        .copied()
        .filter(|s| *s != PipelineStep::AiEnhancement) // disabled, never starts
        .collect();
    assert_eq!(starts, expected);

    for step in expected {
        let start_pos = events
            .iter()
            .position(|e| e.event_type == ProgressEventType::StepStart && e.step == Some(step))
            .unwrap();
        let complete_pos = events
            .iter()
            .position(|e| {
                e.event_type == ProgressEventType::StepComplete && e.step == Some(step)
            })
            .unwrap();
        assert!(start_pos < complete_pos, "step {} out of order", step);
    }

    // The terminal event closes out the item
    let last = events.last().unwrap();
    assert_eq!(last.event_type, ProgressEventType::Complete);
    assert_eq!(last.progress.unwrap().current, 1);
}

#[tokio::test]
async fn concurrent_items_multiplex_into_one_bom_stream() {
    let (service, broadcaster) = build_service();
    let bom_id = Uuid::new_v4();

    let mut rx = broadcaster.subscribe(bom_id);

    let mut item_ids = Vec::new();
    for mpn in ["LM358", "NE555", "LM317"] {
        let job = bom_enricher::models::EnrichmentJob {
            bom_id,
            ..job(mpn, Some("TI"))
        };
        item_ids.push(job.item_id);
        service.submit(job).unwrap();
    }

    let events = collect_until_terminal(&mut rx, 3).await;

    // Per-item ordering holds even with interleaving: for each item the
    // first event is its normalization step_start
    for item_id in &item_ids {
        let first = events.iter().find(|e| e.item_id == *item_id).unwrap();
        assert_eq!(first.event_type, ProgressEventType::StepStart);
        assert_eq!(first.step, Some(PipelineStep::Normalization));
    }

    let snapshot = broadcaster.snapshot(bom_id).unwrap();
    assert_eq!(snapshot.total, 3);
    assert_eq!(snapshot.completed, 3);
    assert!((snapshot.percent() - 100.0).abs() < f64::EPSILON);
}

#[tokio::test]
async fn two_subscribers_receive_independent_copies() {
    let (service, broadcaster) = build_service();
    let bom_id = Uuid::new_v4();

    let mut rx1 = broadcaster.subscribe(bom_id);
    let mut rx2 = broadcaster.subscribe(bom_id);

    let job = bom_enricher::models::EnrichmentJob {
        bom_id,
        ..job("LM358", Some("TI"))
    };
    service.submit(job).unwrap();

    let events1 = collect_until_terminal(&mut rx1, 1).await;
    let events2 = collect_until_terminal(&mut rx2, 1).await;

    assert_eq!(events1.len(), events2.len());
    for (a, b) in events1.iter().zip(events2.iter()) {
        assert_eq!(a.event_type, b.event_type);
        assert_eq!(a.step, b.step);
        assert_eq!(a.item_id, b.item_id);
    }
}

#[tokio::test]
async fn reconnecting_client_resyncs_from_snapshot() {
    let (service, broadcaster) = build_service();
    let bom_id = Uuid::new_v4();

    // First connection watches the first item to completion, then drops
    let mut rx = broadcaster.subscribe(bom_id);
    let first = bom_enricher::models::EnrichmentJob {
        bom_id,
        ..job("LM358", Some("TI"))
    };
    service.submit(first).unwrap();
    collect_until_terminal(&mut rx, 1).await;
    drop(rx);

    // A second item finishes while nobody is connected; its events are
    // gone for good
    let second = bom_enricher::models::EnrichmentJob {
        bom_id,
        ..job("NE555", Some("TI"))
    };
    service.submit(second).unwrap();

    let mut waited = 0;
    while broadcaster.snapshot(bom_id).unwrap().finished() < 2 {
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
        assert!(waited < 500, "second item never finished");
    }

    // Reconnect: the snapshot carries the missed progress, the new
    // stream starts from now
    let snapshot = broadcaster.snapshot(bom_id).unwrap();
    assert_eq!(snapshot.total, 2);
    assert_eq!(snapshot.completed, 2);

    let mut rx = broadcaster.subscribe(bom_id);
    let third = bom_enricher::models::EnrichmentJob {
        bom_id,
        ..job("LM317", Some("TI"))
    };
    service.submit(third).unwrap();

    let events = collect_until_terminal(&mut rx, 1).await;
    let third_ids: Vec<Uuid> = events.iter().map(|e| e.item_id).collect();
    assert!(third_ids.iter().all(|id| *id == events[0].item_id));

    let final_snapshot = broadcaster.snapshot(bom_id).unwrap();
    assert_eq!(final_snapshot.finished(), 3);
}

#[tokio::test]
async fn disconnecting_subscriber_does_not_stop_the_job() {
    let (service, broadcaster) = build_service();
    let bom_id = Uuid::new_v4();

    let rx = broadcaster.subscribe(bom_id);
    let job = bom_enricher::models::EnrichmentJob {
        bom_id,
        ..job("LM358", Some("TI"))
    };
    service.submit(job).unwrap();

    // Client goes away immediately; the job still runs to terminal
    drop(rx);

    let mut waited = 0;
    loop {
        if let Some(snapshot) = broadcaster.snapshot(bom_id) {
            if snapshot.finished() == 1 {
                assert_eq!(snapshot.completed, 1);
                break;
            }
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
        waited += 1;
        assert!(waited < 500, "job never reached a terminal state");
    }
}
