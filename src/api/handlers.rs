use crate::api::AppState;
use crate::error::{AppError, Result};
use crate::models::{EnrichmentJob, EnrichmentPipelineResult};
use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::sse::{Event, KeepAlive, Sse},
    response::IntoResponse,
    Json,
};
use futures::stream::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_stream::wrappers::errors::BroadcastStreamRecvError;
use tokio_stream::wrappers::BroadcastStream;
use uuid::Uuid;
use validator::Validate;

/// Health check endpoint
pub async fn health_check() -> Result<Json<HealthResponse>> {
    Ok(Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Submit BOM line items for enrichment
pub async fn submit_items(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
    Json(request): Json<SubmitItemsRequest>,
) -> Result<(StatusCode, Json<SubmitItemsResponse>)> {
    request.validate()?;

    if request.items.is_empty() {
        return Err(AppError::Validation("No items submitted".to_string()));
    }

    let mut item_ids = Vec::with_capacity(request.items.len());
    for item in request.items {
        let job = EnrichmentJob::new(
            bom_id,
            item.mpn,
            item.manufacturer,
            item.quantity.unwrap_or(1),
        );
        item_ids.push(job.item_id);
        state.service.submit(job)?;
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(SubmitItemsResponse { bom_id, item_ids }),
    ))
}

#[derive(Debug, Deserialize, Validate)]
pub struct SubmitItemsRequest {
    #[validate(nested)]
    pub items: Vec<ItemSpec>,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ItemSpec {
    #[validate(length(min = 1, max = 64))]
    pub mpn: String,
    #[validate(length(min = 1, max = 128))]
    pub manufacturer: Option<String>,
    #[validate(range(min = 1))]
    pub quantity: Option<u32>,
}

#[derive(Debug, Serialize)]
pub struct SubmitItemsResponse {
    pub bom_id: Uuid,
    pub item_ids: Vec<Uuid>,
}

/// Terminal result for one item
pub async fn get_item_result(
    State(state): State<AppState>,
    Path((_bom_id, item_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<EnrichmentPipelineResult>> {
    state
        .service
        .result_for_item(&item_id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("No result for item {}", item_id)))
}

/// Aggregate progress snapshot for a BOM.
///
/// Reconnecting stream clients read this first, then resume streaming;
/// events missed while disconnected are not replayed.
pub async fn bom_status(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> Result<Json<BomStatusResponse>> {
    let snapshot = state
        .service
        .snapshot(bom_id)
        .ok_or_else(|| AppError::NotFound(format!("Unknown BOM {}", bom_id)))?;

    Ok(Json(BomStatusResponse {
        bom_id,
        total: snapshot.total,
        completed: snapshot.completed,
        failed: snapshot.failed,
        percent: snapshot.percent(),
    }))
}

#[derive(Debug, Serialize)]
pub struct BomStatusResponse {
    pub bom_id: Uuid,
    pub total: u64,
    pub completed: u64,
    pub failed: u64,
    pub percent: f64,
}

/// Decrements the subscriber gauge when the SSE connection drops
struct SubscriberGuard;

impl SubscriberGuard {
    fn new() -> Self {
        crate::metrics::SSE_SUBSCRIBERS.inc();
        Self
    }
}

impl Drop for SubscriberGuard {
    fn drop(&mut self) {
        crate::metrics::SSE_SUBSCRIBERS.dec();
    }
}

/// Live progress stream for a BOM (SSE).
///
/// Each subscriber gets its own copy of every event published after it
/// connected. A lagging client drops events rather than stalling the
/// pipeline; a disconnect has no effect on running jobs.
pub async fn stream_progress(
    State(state): State<AppState>,
    Path(bom_id): Path<Uuid>,
) -> Sse<impl Stream<Item = std::result::Result<Event, std::convert::Infallible>>> {
    let rx = state.broadcaster.subscribe(bom_id);
    let guard = SubscriberGuard::new();

    let stream = BroadcastStream::new(rx).filter_map(move |event| {
        let _connected = &guard;
        futures::future::ready(match event {
            Ok(event) => serde_json::to_string(&event).ok().map(|json| {
                Ok(Event::default()
                    .event(event.event_type.to_string())
                    .data(json))
            }),
            // Dropped events are not replayed; clients resync via the
            // snapshot endpoint
            Err(BroadcastStreamRecvError::Lagged(_)) => None,
        })
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// Catalog record by component ID
pub async fn get_component(
    State(state): State<AppState>,
    Path(component_id): Path<Uuid>,
) -> Result<Json<EnrichmentPipelineResult>> {
    state
        .store
        .get(&component_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Component {} not found", component_id)))
}

#[derive(Debug, Deserialize)]
pub struct FindComponentQuery {
    pub mpn: String,
    pub manufacturer: Option<String>,
}

/// Catalog record by part identity
pub async fn find_component(
    State(state): State<AppState>,
    Query(query): Query<FindComponentQuery>,
) -> Result<Json<EnrichmentPipelineResult>> {
    state
        .store
        .find_by_part(&query.mpn, query.manufacturer.as_deref())
        .await?
        .map(Json)
        .ok_or_else(|| {
            AppError::NotFound(format!("No catalog record for MPN {}", query.mpn))
        })
}

/// Prometheus metrics export
pub async fn metrics_export(State(state): State<AppState>) -> impl IntoResponse {
    if !state.prometheus_enabled {
        return (StatusCode::NOT_FOUND, String::new()).into_response();
    }

    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        crate::metrics::gather_metrics(),
    )
        .into_response()
}
