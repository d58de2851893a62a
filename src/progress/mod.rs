pub mod broadcaster;
pub mod events;

pub use broadcaster::{BomProgress, BroadcasterConfig, EventStats, ProgressBroadcaster};
pub use events::{EnrichmentProgressEvent, ProgressCounts, ProgressEventType};
