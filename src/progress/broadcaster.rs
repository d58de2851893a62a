//! Per-BOM progress broadcasting.
//!
//! One logical stream per BOM multiplexes events from every item
//! enriching under it. Publishing never blocks: each subscriber reads
//! its own buffered broadcast receiver, and a slow subscriber lags and
//! drops rather than stalling the pipeline or its peers.

use crate::progress::events::{EnrichmentProgressEvent, ProgressCounts};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

/// Broadcaster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BroadcasterConfig {
    /// Per-BOM channel capacity; lagging subscribers drop oldest events
    pub channel_capacity: usize,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 256,
        }
    }
}

/// Per-BOM progress ledger, the source for snapshot reads
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BomProgress {
    /// Items submitted
    pub total: u64,
    /// Items that finished with a usable result
    pub completed: u64,
    /// Items that finished failed
    pub failed: u64,
}

impl BomProgress {
    pub fn finished(&self) -> u64 {
        self.completed + self.failed
    }

    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            0.0
        } else {
            self.finished() as f64 / self.total as f64 * 100.0
        }
    }

    pub fn counts(&self) -> ProgressCounts {
        ProgressCounts {
            current: self.finished(),
            total: self.total,
            percent: self.percent(),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.total > 0 && self.finished() >= self.total
    }
}

/// Event statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventStats {
    pub total_events: u64,
    pub events_by_type: HashMap<String, u64>,
    pub last_event_time: Option<DateTime<Utc>>,
}

impl EventStats {
    fn record(&mut self, event_type: &str) {
        self.total_events += 1;
        *self
            .events_by_type
            .entry(event_type.to_string())
            .or_insert(0) += 1;
        self.last_event_time = Some(Utc::now());
    }
}

/// Multiplexes per-item progress events into per-BOM broadcast streams.
///
/// Safe for concurrent subscribe/unsubscribe/publish; events are copied
/// per subscriber, never shared mutably.
pub struct ProgressBroadcaster {
    channels: DashMap<Uuid, broadcast::Sender<EnrichmentProgressEvent>>,
    progress: DashMap<Uuid, BomProgress>,
    stats: Arc<RwLock<EventStats>>,
    capacity: usize,
}

impl ProgressBroadcaster {
    pub fn new(config: BroadcasterConfig) -> Self {
        Self {
            channels: DashMap::new(),
            progress: DashMap::new(),
            stats: Arc::new(RwLock::new(EventStats::default())),
            capacity: config.channel_capacity.max(16),
        }
    }

    /// Account for newly submitted items so snapshots report a total
    pub fn register_items(&self, bom_id: Uuid, count: u64) {
        self.progress.entry(bom_id).or_default().total += count;
    }

    /// Publish one event to every subscriber of the BOM's stream.
    ///
    /// Terminal events update the per-BOM ledger and carry the resulting
    /// aggregate counts. Never blocks and never fails: without
    /// subscribers the event is simply dropped.
    pub fn publish(&self, bom_id: Uuid, mut event: EnrichmentProgressEvent) {
        if event.is_terminal() {
            let mut entry = self.progress.entry(bom_id).or_default();
            if event.error.is_some() {
                entry.failed += 1;
            } else {
                entry.completed += 1;
            }
            event.progress = Some(entry.counts());
        }

        self.stats.write().record(&event.event_type.to_string());

        if let Some(tx) = self.channels.get(&bom_id) {
            // Err means no live receivers, which is fine
            let _ = tx.send(event);
        }
    }

    /// Subscribe to a BOM's stream, creating it on demand.
    ///
    /// Each subscriber receives its own copy of every event published
    /// after the subscription. There is no replay across reconnects;
    /// reconnecting clients should read `snapshot` first.
    pub fn subscribe(&self, bom_id: Uuid) -> broadcast::Receiver<EnrichmentProgressEvent> {
        let tx = self
            .channels
            .entry(bom_id)
            .or_insert_with(|| broadcast::channel(self.capacity).0);
        tx.subscribe()
    }

    /// Current aggregate status for a BOM
    pub fn snapshot(&self, bom_id: Uuid) -> Option<BomProgress> {
        self.progress.get(&bom_id).map(|entry| *entry.value())
    }

    /// Live receivers on a BOM's stream
    pub fn subscriber_count(&self, bom_id: Uuid) -> usize {
        self.channels
            .get(&bom_id)
            .map(|tx| tx.receiver_count())
            .unwrap_or(0)
    }

    /// Drop channels for BOMs that finished and lost their last subscriber
    pub fn reap_idle(&self) {
        self.channels.retain(|bom_id, tx| {
            if tx.receiver_count() > 0 {
                return true;
            }
            let complete = self
                .progress
                .get(bom_id)
                .map(|p| p.is_complete())
                .unwrap_or(false);
            if complete {
                debug!(bom_id = %bom_id, "Reaping idle progress channel");
            }
            !complete
        });
    }

    /// Event statistics
    pub fn stats(&self) -> EventStats {
        self.stats.read().clone()
    }

    /// Number of live per-BOM channels
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }
}
