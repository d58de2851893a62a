use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// One unit of enrichment work: a single BOM line item.
///
/// Immutable once created; every downstream record references it by
/// `bom_id`/`item_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichmentJob {
    /// BOM this line item belongs to
    pub bom_id: Uuid,

    /// Line item identifier
    pub item_id: Uuid,

    /// Raw manufacturer part number as entered by the user
    pub mpn: String,

    /// Manufacturer name, if the user supplied one
    pub manufacturer: Option<String>,

    /// Quantity from the BOM line
    pub quantity: u32,

    /// When the item was queued
    pub requested_at: DateTime<Utc>,
}

impl EnrichmentJob {
    /// Create a new job for a BOM line item
    pub fn new(bom_id: Uuid, mpn: String, manufacturer: Option<String>, quantity: u32) -> Self {
        Self {
            bom_id,
            item_id: Uuid::new_v4(),
            mpn,
            manufacturer,
            quantity,
            requested_at: Utc::now(),
        }
    }
}
